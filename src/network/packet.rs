use crate::network::error::ErrorCode;
use crate::network::room::{BlockChange, PlayerId, PlayerPosition, RoomSnapshot};
use crate::world::BlockId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        name: String,
    },
    JoinRoom {
        code: String,
        name: String,
    },
    LeaveRoom,
    SetReady {
        ready: bool,
    },
    StartGame,
    EndGame,
    Reconnect {
        token: String,
    },
    Position {
        x: f32,
        y: f32,
        z: f32,
        rx: f32,
        ry: f32,
    },
    BlockBreak {
        x: i32,
        y: i32,
        z: i32,
    },
    BlockPlace {
        x: i32,
        y: i32,
        z: i32,
        block_type: BlockId,
    },
    Chat {
        message: String,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated {
        room: RoomSnapshot,
        player_id: PlayerId,
        token: String,
    },
    RoomJoined {
        room: RoomSnapshot,
        player_id: PlayerId,
        token: String,
    },
    RoomUpdate {
        room: RoomSnapshot,
    },
    LeftRoom,
    GameCountdown {
        seconds: u64,
    },
    GameStarted {
        game_start_time: i64,
        day_cycle_secs: u64,
    },
    GameFinished {
        room: RoomSnapshot,
    },
    PlayerMoved {
        id: PlayerId,
        x: f32,
        y: f32,
        z: f32,
        rx: f32,
        ry: f32,
    },
    BlockChanged {
        change: BlockChange,
    },
    /// Full change log, sent to a player rejoining a running game
    BlockReplay {
        changes: Vec<BlockChange>,
    },
    Chat {
        player_id: PlayerId,
        name: String,
        message: String,
    },
    TimeSync {
        day_phase: f32,
    },
    Reconnected {
        room: RoomSnapshot,
        player_id: PlayerId,
    },
    ReconnectFailed {
        reason: String,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerMessage {
    pub fn player_moved(id: PlayerId, pos: PlayerPosition) -> Self {
        ServerMessage::PlayerMoved {
            id,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            rx: pos.rx,
            ry: pos.ry,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }
}

/// Wire encodings shared by both message directions.
///
/// JSON lines serve browser clients; bincode is the compact form for native
/// peers.
pub trait Packet: Serialize + DeserializeOwned {
    /// Serialize packet to bytes
    fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize packet from bytes
    fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Single newline-terminated JSON line
    fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = self.to_json()?;
        line.push('\n');
        Ok(line)
    }
}

impl Packet for ClientMessage {}
impl Packet for ServerMessage {}
