use thiserror::Error;

#[derive(Error, Debug)]
pub enum BroadcasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Event stream server not started")]
    NotStarted,

    #[error("Event stream server already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, BroadcasterError>;
