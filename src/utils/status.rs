use std::fmt;

/// Broad area a `Status` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusClass {
    #[default]
    NoError,
    Config,
    Connection,
    Message,
    Validation,
    Dispatcher,
    Request,
}

/// Specific condition a `Status` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusCode {
    #[default]
    NoError,
    UnknownSchema,
    MissingRequiredField,
    IncorrectFieldType,
    IncorrectFieldValue,
    InvalidSubject,
    CustomValidation,
    TimeoutOccurred,
    RequestCancelled,
    ConnectionEstablished,
    ConnectionLost,
    PublishFailed,
    /// The middleware rejected an operation after it had returned.
    OperationRejected,
    CallbackFailed,
    InvalidMessage,
}

/// Outcome of a validation or the payload of a connection event.
///
/// Unlike `GmsecError` this is a value, so validators can compose their
/// results and events can carry it to callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    class: StatusClass,
    code: StatusCode,
    reason: String,
}

impl Status {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn new(class: StatusClass, code: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            class,
            code,
            reason: reason.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.class != StatusClass::NoError
    }

    pub fn class(&self) -> StatusClass {
        self.class
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?},{:?}]: {}", self.class, self.code, self.reason)
    }
}
