use thiserror::Error;

/// Errors surfaced by the chat pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    /// The inbound message is not text the analyzer can read.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Authentication, network, or non-success response from the inference service.
    #[error("remote service error: {0}")]
    RemoteService(String),

    /// Missing or unreadable startup configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
