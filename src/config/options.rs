//! Names of the options a `Config` may carry.

pub const MW_ID: &str = "mw-id";
pub const MW_SERVER: &str = "mw-server";
pub const LOG_LEVEL: &str = "LOGLEVEL";

pub const MULTI_RESP: &str = "MW-MULTI-RESP";
pub const SUBSCRIBE_FOR_RESP: &str = "MW-SUBSCRIBE-FOR-RESP";
pub const REPLY_STRING: &str = "MW-REPLY-STRING";
pub const REPUBLISH_MS: &str = "MW-REPUBLISH-MS";

pub const MSG_CONTENT_VALIDATE: &str = "GMSEC-MSG-CONTENT-VALIDATE";
pub const MSG_CONTENT_VALIDATE_ALL: &str = "GMSEC-MSG-CONTENT-VALIDATE-ALL";
pub const MSG_CONTENT_VALIDATE_SEND: &str = "GMSEC-MSG-CONTENT-VALIDATE-SEND";
pub const MSG_CONTENT_VALIDATE_RECV: &str = "GMSEC-MSG-CONTENT-VALIDATE-RECV";
pub const SPECIFICATION_VERSION: &str = "GMSEC-SPECIFICATION-VERSION";
pub const LENIENT_SUBJECTS: &str = "GMSEC-LENIENT-SUBJECTS";

pub const TRACKING: &str = "TRACKING";
pub const TRACKING_NODE: &str = "TRACKING-NODE";
pub const TRACKING_PROCESS_ID: &str = "TRACKING-PROCESS-ID";
pub const TRACKING_USER_NAME: &str = "TRACKING-USER-NAME";
pub const TRACKING_CONNECTION_ID: &str = "TRACKING-CONNECTION-ID";
pub const TRACKING_PUBLISH_TIME: &str = "TRACKING-PUBLISH-TIME";
pub const TRACKING_UNIQUE_ID: &str = "TRACKING-UNIQUE-ID";
pub const TRACKING_MW_INFO: &str = "TRACKING-MW-INFO";

pub const DURABLE_SUBSCRIBE: &str = "mw-durable-subscribe";
pub const DURABLE_PUBLISH: &str = "mw-durable-publish";

pub const SIM_CONNECT_FAILURE: &str = "MW-SIM-CONNECT-FAILURE";
pub const SIM_SUBSCRIBE_FAILURE: &str = "MW-SIM-SUBSCRIBE-FAILURE";
pub const SIM_UNSUBSCRIBE_FAILURE: &str = "MW-SIM-UNSUBSCRIBE-FAILURE";
pub const SIM_PUBLISH_FAILURE: &str = "MW-SIM-PUBLISH-FAILURE";
pub const SIM_REQUEST_FAILURE: &str = "MW-SIM-REQUEST-FAILURE";
pub const SIM_REPLY_FAILURE: &str = "MW-SIM-REPLY-FAILURE";
pub const SIM_PUBLISH_DELAY_MS: &str = "MW-SIM-PUBLISH-DELAY-MS";
