pub mod policy;

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::event::StructuredMessage;
use crate::slack::SlackMethods;

use self::policy::ModerationPolicy;

/// Arguments for one `chat.delete` call. Built right before the call and
/// never retried or queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCommand {
    pub channel: String,
    pub ts: String,
}

/// What happened to a `message` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Deleted,
    Allowed,
    /// Posted by the bot itself.
    OwnMessage,
}

/// Applies the policy to messages and deletes the ones that violate it.
pub struct Moderator {
    policy: Arc<ModerationPolicy>,
    api: Arc<dyn SlackMethods>,
    self_id: Option<String>,
}

impl Moderator {
    pub fn new(policy: Arc<ModerationPolicy>, api: Arc<dyn SlackMethods>) -> Self {
        Self {
            policy,
            api,
            self_id: None,
        }
    }

    /// Never moderate messages authored by this user id.
    pub fn with_self_id(mut self, id: impl Into<String>) -> Self {
        self.self_id = Some(id.into());
        self
    }

    pub fn evaluate(&self, message: &StructuredMessage) -> bool {
        self.policy.evaluate(message)
    }

    /// Delete `message`. A failure is logged here and handed back unchanged;
    /// there is no second attempt.
    pub async fn act(&self, message: &StructuredMessage) -> Result<()> {
        let Some(channel) = message.channel.as_deref() else {
            let err = Error::remote_call("chat.delete", "message has no channel");
            error!("Cannot delete message {:?}: {}", message.ts, err);
            return Err(err);
        };
        let Some(ts) = message.ts.clone() else {
            let err = Error::remote_call("chat.delete", "message has no ts");
            error!("Cannot delete message in {}: {}", channel, err);
            return Err(err);
        };

        let command = DeleteCommand {
            channel: channel.to_string(),
            ts,
        };
        debug!("TS of message to delete: {}", command.ts);

        match self.api.delete_message(&command).await {
            Ok(()) => {
                info!(
                    "Deleted message {} from {:?} in {}",
                    command.ts, message.user, command.channel
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    "Failed to delete message {} in {}: {}",
                    command.ts, command.channel, e
                );
                Err(e)
            }
        }
    }

    /// Evaluate, then act on a match.
    pub async fn moderate(&self, message: &StructuredMessage) -> Result<Verdict> {
        if self.self_id.is_some() && message.user == self.self_id {
            return Ok(Verdict::OwnMessage);
        }
        if !self.evaluate(message) {
            return Ok(Verdict::Allowed);
        }
        self.act(message).await?;
        Ok(Verdict::Deleted)
    }
}
