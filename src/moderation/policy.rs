use std::collections::BTreeSet;
use std::str::FromStr;

use serde::Deserialize;

use crate::event::StructuredMessage;

/// How a message author is compared against the restricted users.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserMatch {
    /// The author id must equal one of the restricted ids.
    #[default]
    Exact,
    /// The author id only has to occur inside one of the configured values.
    /// Kept for deployments that relied on the old single-string check, where
    /// a partial id such as `U1` also matches `U12`.
    Substring,
}

impl std::fmt::Display for UserMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserMatch::Exact => write!(f, "exact"),
            UserMatch::Substring => write!(f, "substring"),
        }
    }
}

impl FromStr for UserMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(UserMatch::Exact),
            "substring" => Ok(UserMatch::Substring),
            other => Err(format!(
                "unknown user match mode '{}' (expected 'exact' or 'substring')",
                other
            )),
        }
    }
}

/// Which messages get deleted. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationPolicy {
    channels: BTreeSet<String>,
    restricted_users: BTreeSet<String>,
    match_mode: UserMatch,
}

impl ModerationPolicy {
    pub fn new<C, U>(channels: C, restricted_users: U, match_mode: UserMatch) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
            restricted_users: restricted_users.into_iter().map(Into::into).collect(),
            match_mode,
        }
    }

    pub fn channels(&self) -> &BTreeSet<String> {
        &self.channels
    }

    pub fn restricted_users(&self) -> &BTreeSet<String> {
        &self.restricted_users
    }

    pub fn match_mode(&self) -> UserMatch {
        self.match_mode
    }

    pub fn is_moderated_channel(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }

    /// An empty id never matches, in either mode.
    pub fn is_restricted(&self, user: &str) -> bool {
        if user.is_empty() {
            return false;
        }
        match self.match_mode {
            UserMatch::Exact => self.restricted_users.contains(user),
            UserMatch::Substring => self.restricted_users.iter().any(|r| r.contains(user)),
        }
    }

    /// True iff the message sits in a moderated channel and its author is
    /// present and restricted.
    pub fn evaluate(&self, message: &StructuredMessage) -> bool {
        let in_channel = message
            .channel
            .as_deref()
            .is_some_and(|c| self.is_moderated_channel(c));
        in_channel
            && message
                .user
                .as_deref()
                .is_some_and(|u| self.is_restricted(u))
    }
}
