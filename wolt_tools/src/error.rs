use thiserror::Error;

#[derive(Debug, Error)]
pub enum WoltApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Query failed. Error {status}. {message}")]
    Status { status: u16, message: String },
    #[error("Could not deserialize JSON: {0}")]
    Json(String),
    #[error("Could not find the bootstrap script in the group page")]
    BootstrapNotFound,
    #[error("Invalid bootstrap script: {0}")]
    InvalidBootstrap(String),
    #[error("The group {0} has not been joined yet")]
    NotJoined(String),
    #[error("Venue {0} was not found")]
    VenueNotFound(String),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}
