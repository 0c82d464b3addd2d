//! Tracking fields stamped onto outgoing messages.

use std::env;

use crate::config::{Config, options};
use crate::message::Message;
use crate::message::field::{Field, FieldValue};
use crate::utils::Result;
use crate::utils::time::now_string;

pub const CONNECTION_ID_FIELD: &str = "CONNECTION-ID";
pub const MW_INFO_FIELD: &str = "MW-INFO";
pub const NODE_FIELD: &str = "NODE";
pub const PROCESS_ID_FIELD: &str = "PROCESS-ID";
pub const PUBLISH_TIME_FIELD: &str = "PUBLISH-TIME";
pub const UNIQUE_ID_FIELD: &str = "UNIQUE-ID";
pub const USER_NAME_FIELD: &str = "USER-NAME";

/// Which tracking fields to add. `TRACKING` switches them all; each
/// `TRACKING-*` option overrides it for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tracking {
    connection_id: bool,
    mw_info: bool,
    node: bool,
    process_id: bool,
    publish_time: bool,
    unique_id: bool,
    user_name: bool,
}

impl Tracking {
    pub(crate) fn from_config(config: &Config) -> Self {
        let all = config.get_boolean_value_or(options::TRACKING, true);
        let flag = |key| config.get_boolean_value_or(key, all);
        Self {
            connection_id: flag(options::TRACKING_CONNECTION_ID),
            mw_info: flag(options::TRACKING_MW_INFO),
            node: flag(options::TRACKING_NODE),
            process_id: flag(options::TRACKING_PROCESS_ID),
            publish_time: flag(options::TRACKING_PUBLISH_TIME),
            unique_id: flag(options::TRACKING_UNIQUE_ID),
            user_name: flag(options::TRACKING_USER_NAME),
        }
    }

    pub(crate) fn apply(
        &self,
        msg: &mut Message,
        connection_id: &str,
        mw_info: &str,
        sequence: u64,
    ) -> Result<()> {
        let mut add = |enabled: bool, name: &str, value: FieldValue| -> Result<()> {
            if enabled {
                msg.put_field(Field::new(name, value)?.with_header(true));
            }
            Ok(())
        };

        add(self.connection_id, CONNECTION_ID_FIELD, connection_id.into())?;
        add(self.mw_info, MW_INFO_FIELD, mw_info.into())?;
        add(self.node, NODE_FIELD, node_name().into())?;
        add(self.process_id, PROCESS_ID_FIELD, std::process::id().into())?;
        add(self.publish_time, PUBLISH_TIME_FIELD, now_string().into())?;
        add(
            self.unique_id,
            UNIQUE_ID_FIELD,
            format!("{connection_id}_{sequence}").into(),
        )?;
        add(self.user_name, USER_NAME_FIELD, user_name().into())?;
        Ok(())
    }
}

fn node_name() -> String {
    env::var("HOSTNAME")
        .or_else(|_| env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

fn user_name() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
