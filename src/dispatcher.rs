use tracing::debug;

use crate::error::{Error, Result};
use crate::event::{decode, RawEvent, TYPE_ERROR, TYPE_MESSAGE};
use crate::moderation::{Moderator, Verdict};

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Moderated(Verdict),
    /// Neither a `message` nor an `error` event.
    Ignored,
}

/// Decodes raw events and routes `message` events to the moderator.
pub struct Dispatcher {
    moderator: Moderator,
}

impl Dispatcher {
    pub fn new(moderator: Moderator) -> Self {
        Self { moderator }
    }

    /// Error frames come back as [`Error::RemoteProtocol`]; the session that
    /// sent one should not be read from again.
    pub async fn dispatch(&self, raw: &RawEvent) -> Result<Dispatch> {
        let message = decode(raw);
        debug!("Incoming event: {}", raw);

        if message.is_type(TYPE_ERROR) {
            let msg = message
                .error
                .and_then(|e| e.msg)
                .unwrap_or_else(|| raw.to_string());
            return Err(Error::RemoteProtocol(msg));
        }

        if message.is_type(TYPE_MESSAGE) {
            let verdict = self.moderator.moderate(&message).await?;
            return Ok(Dispatch::Moderated(verdict));
        }

        Ok(Dispatch::Ignored)
    }
}
