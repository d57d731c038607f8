use thiserror::Error;
use wolt_tools::WoltApiError;

use crate::traits::NotifierError;

/// Everything that can end a coordinator run early.
///
/// Storage and directory failures never end a run. They are logged where they happen and the run carries on.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Could not join group {group_id}. {reason}")]
    Join { group_id: String, reason: String },
    #[error("Could not announce group {0}, so it won't be tracked")]
    Announce(String),
    #[error("Group order API error. {0}")]
    ExternalApi(#[from] WoltApiError),
    #[error("Chat transport error. {0}")]
    Transport(#[from] NotifierError),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Order for group {0} was canceled")]
    Canceled(String),
    #[error("Group {group_id} finished with unexpected status {status}")]
    UnexpectedStatus { group_id: String, status: String },
    #[error("Interrupted by shutdown")]
    Interrupted,
}
