//! Crate-wide error type
//!
//! Gameplay rejections (a failed placement, a wrong tool) are not errors and
//! never reach this type; they come back as `bool`, `Option` or an empty
//! `Vec`. What lands here is configuration, I/O and room protocol failures.

use crate::config::ConfigError;
use crate::network::RoomError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("Codec error: {message}")]
    Codec { message: String },
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Codec {
            message: err.to_string(),
        }
    }
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        EngineError::Codec {
            message: err.to_string(),
        }
    }
}

/// Type alias for engine results
pub type EngineResult<T> = Result<T, EngineError>;
