use std::path::PathBuf;

use thiserror::Error;

use crate::models::GameType;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("A session is already active")]
    AlreadyActive,

    #[error("No active session")]
    NotActive,

    #[error("Game type conflict: session is {session}, event declared {declared}")]
    TypeConflict { session: GameType, declared: GameType },

    #[error("Unrecognized event shape: {0}")]
    UnrecognizedShape(String),

    #[error("Unknown game type '{0}' (expected 2D or 3D)")]
    InvalidGameType(String),

    #[error("Failed to write session artifact {path:?}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to parse session artifact {path:?}: {source}")]
    ArtifactParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecorderError {
    /// Stable outcome name reported to callers
    pub fn kind(&self) -> &'static str {
        match self {
            RecorderError::AlreadyActive => "AlreadyActiveError",
            RecorderError::NotActive => "NotActiveError",
            RecorderError::TypeConflict { .. } => "TypeConflictError",
            RecorderError::UnrecognizedShape(_) => "UnrecognizedShapeError",
            RecorderError::InvalidGameType(_) => "InvalidGameTypeError",
            RecorderError::ArtifactWrite { .. } => "ArtifactWriteError",
            RecorderError::ArtifactParse { .. } => "ArtifactParseError",
            RecorderError::Io(_) => "IoError",
        }
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;
