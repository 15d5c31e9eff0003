//! Room protocol errors
//!
//! Every [`RoomError`] maps to a stable [`ErrorCode`] that is sent to the
//! client. The connection stays open after any of them.

use crate::network::room::{RoomCode, RoomStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire error code carried by `ServerMessage::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    RoomClosed,
    NotHost,
    NotAllReady,
    InvalidState,
    NotInRoom,
    AlreadyInRoom,
    InvalidName,
    InvalidChat,
    InvalidBlock,
    MalformedMessage,
    ReconnectFailed,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::RoomFull => "ROOM_FULL",
            ErrorCode::RoomClosed => "ROOM_CLOSED",
            ErrorCode::NotHost => "NOT_HOST",
            ErrorCode::NotAllReady => "NOT_ALL_READY",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::NotInRoom => "NOT_IN_ROOM",
            ErrorCode::AlreadyInRoom => "ALREADY_IN_ROOM",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::InvalidChat => "INVALID_CHAT",
            ErrorCode::InvalidBlock => "INVALID_BLOCK",
            ErrorCode::MalformedMessage => "MALFORMED_MESSAGE",
            ErrorCode::ReconnectFailed => "RECONNECT_FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    #[error("Room {code} does not exist")]
    RoomNotFound { code: String },

    #[error("Room {code} is full ({max} players)")]
    RoomFull { code: RoomCode, max: usize },

    #[error("Room {code} is {status} and no longer accepts players")]
    RoomClosed { code: RoomCode, status: RoomStatus },

    #[error("Only the host can {action}")]
    NotHost { action: &'static str },

    #[error("Not every player is ready")]
    NotAllReady,

    #[error("Cannot {action} while the room is {status}")]
    InvalidState {
        action: &'static str,
        status: RoomStatus,
    },

    #[error("Connection is not in a room")]
    NotInRoom,

    #[error("Connection is already in room {code}")]
    AlreadyInRoom { code: RoomCode },

    #[error("Invalid player name: {reason}")]
    InvalidName { reason: String },

    #[error("Invalid chat message: {reason}")]
    InvalidChat { reason: String },

    #[error("Invalid block change: {reason}")]
    InvalidBlock { reason: String },

    #[error("Malformed message: {reason}")]
    Malformed { reason: String },

    #[error("Reconnect failed: {reason}")]
    ReconnectFailed { reason: String },
}

impl RoomError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RoomError::RoomNotFound { .. } => ErrorCode::RoomNotFound,
            RoomError::RoomFull { .. } => ErrorCode::RoomFull,
            RoomError::RoomClosed { .. } => ErrorCode::RoomClosed,
            RoomError::NotHost { .. } => ErrorCode::NotHost,
            RoomError::NotAllReady => ErrorCode::NotAllReady,
            RoomError::InvalidState { .. } => ErrorCode::InvalidState,
            RoomError::NotInRoom => ErrorCode::NotInRoom,
            RoomError::AlreadyInRoom { .. } => ErrorCode::AlreadyInRoom,
            RoomError::InvalidName { .. } => ErrorCode::InvalidName,
            RoomError::InvalidChat { .. } => ErrorCode::InvalidChat,
            RoomError::InvalidBlock { .. } => ErrorCode::InvalidBlock,
            RoomError::Malformed { .. } => ErrorCode::MalformedMessage,
            RoomError::ReconnectFailed { .. } => ErrorCode::ReconnectFailed,
        }
    }
}

/// Type alias for room operation results
pub type RoomResult<T> = Result<T, RoomError>;

/// Create a reconnect failure
pub fn reconnect_failed(reason: impl Into<String>) -> RoomError {
    RoomError::ReconnectFailed {
        reason: reason.into(),
    }
}
