use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLink {
    pub domain: String,
    pub url: String,
}

impl SharedLink {
    pub fn new<S: Into<String>>(domain: S, url: S) -> Self {
        Self { domain: domain.into(), url: url.into() }
    }
}

/// Someone posted one or more links in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSharedEvent {
    pub channel: String,
    /// The id of the message holding the links. Replies are threaded under it.
    pub message_ts: String,
    pub links: Vec<SharedLink>,
}

/// Someone reacted to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionAddedEvent {
    /// Emoji name without colons.
    pub reaction: String,
    /// Chat id of the person who reacted.
    pub from_user: String,
    pub channel: String,
    pub message_ts: String,
    /// Chat id of whoever wrote the message that was reacted to.
    pub message_author: String,
    pub message_text: String,
}
