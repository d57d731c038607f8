use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    #[error("Could not deliver message to {receiver}: {reason}")]
    SendFailed { receiver: String, reason: String },
    #[error("Could not edit message {message_id}: {reason}")]
    EditFailed { message_id: String, reason: String },
    #[error("Could not add reaction to message {message_id}: {reason}")]
    ReactionFailed { message_id: String, reason: String },
}

/// The outbound side of a chat transport.
///
/// A `receiver` is a channel or a user id. Message ids are opaque strings handed out by the transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Posts `text` to the receiver, threaded under `in_reply_to` if given, and returns the new message's id.
    async fn send_message(&self, receiver: &str, text: &str, in_reply_to: Option<&str>) -> Result<String, NotifierError>;

    async fn edit_message(&self, receiver: &str, text: &str, message_id: &str) -> Result<(), NotifierError>;

    async fn add_reaction(&self, receiver: &str, message_id: &str, reaction: &str) -> Result<(), NotifierError>;
}
