//! Multiplayer rooms
//!
//! Room lifecycle, reconnection and the position, block and time relays.
//! [`RoomManager`] holds all of the logic; [`RoomServer`] (feature `native`)
//! runs it over TCP with newline-delimited JSON.

pub mod error;
pub mod packet;
pub mod protocol;
pub mod room;
pub mod room_manager;

#[cfg(feature = "native")]
mod connection;
#[cfg(feature = "native")]
pub mod server;

pub use error::{ErrorCode, RoomError, RoomResult};
pub use packet::{ClientMessage, Packet, ServerMessage};
pub use protocol::{Protocol, DEFAULT_TCP_PORT, PROTOCOL_VERSION};
pub use room::{
    BlockChange, ConnectionId, PlayerId, PlayerPosition, PlayerSnapshot, Room, RoomCode,
    RoomSnapshot, RoomStatus,
};
pub use room_manager::{Dispatch, Outcome, RoomEvent, RoomManager};
#[cfg(feature = "native")]
pub use server::RoomServer;
