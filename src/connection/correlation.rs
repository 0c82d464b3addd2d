//! How replies are matched to the requests they answer.

use std::fmt;

use crate::message::Message;
use crate::message::field::Field;
use crate::utils::{GmsecError, Result};

/// Name of the field carrying the correlation ID.
pub const REPLY_UNIQUE_ID_FIELD: &str = "__GMSEC-REPLY-UNIQUE-ID__";

/// Links a reply to its request.
///
/// `attach` marks an outgoing request, `propagate` copies the mark onto a
/// reply, `extract` reads it back on receipt and `strip` removes it before
/// the reply reaches the requester.
pub trait CorrelationStrategy: Send + Sync + fmt::Debug {
    fn attach(&self, msg: &mut Message, id: &str) -> Result<()>;

    fn extract(&self, msg: &Message) -> Option<String>;

    fn strip(&self, msg: &mut Message);

    fn propagate(&self, request: &Message, reply: &mut Message) -> Result<()> {
        let id = self.extract(request).ok_or_else(|| {
            GmsecError::invalid_state("Request does not carry a correlation ID")
        })?;
        self.attach(reply, &id)
    }
}

/// Carries the ID in a hidden string field.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldCorrelation;

impl CorrelationStrategy for FieldCorrelation {
    fn attach(&self, msg: &mut Message, id: &str) -> Result<()> {
        msg.put_field(Field::new(REPLY_UNIQUE_ID_FIELD, id)?.with_header(true));
        Ok(())
    }

    fn extract(&self, msg: &Message) -> Option<String> {
        msg.get_field(REPLY_UNIQUE_ID_FIELD)
            .map(|f| f.get_string_value())
            .filter(|id| !id.is_empty())
    }

    fn strip(&self, msg: &mut Message) {
        msg.clear_field(REPLY_UNIQUE_ID_FIELD);
    }
}
