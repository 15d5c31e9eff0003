//! Room state machine
//!
//! A [`Room`] owns its roster, block-change log and cached positions. It is
//! plain data: the [`RoomManager`](super::RoomManager) serialises every
//! mutation of one room, so nothing in here locks.

use crate::constants::rooms::{PLAYER_COLORS, ROOM_CODE_ALPHABET, ROOM_CODE_LENGTH};
use crate::network::error::{reconnect_failed, RoomError, RoomResult};
use crate::time::day_phase;
use crate::world::{BlockId, VoxelPos};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Five character room code from an unambiguous alphabet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let code = (0..ROOM_CODE_LENGTH)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        RoomCode(code)
    }

    /// Accepts user input in any case, rejects anything outside the alphabet
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == ROOM_CODE_LENGTH
            && code.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b));
        valid.then_some(RoomCode(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable logical identity of a player inside a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Transport-level connection handle; changes on every reconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Countdown,
    Playing,
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Countdown => "countdown",
            RoomStatus::Playing => "playing",
            RoomStatus::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Last reported feet position and look angles
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
}

impl PlayerPosition {
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.z, self.rx, self.ry]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// One accepted break or place, in the order the room applied it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockChange {
    pub player_id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub block_type: BlockId,
    pub tick: u64,
}

impl BlockChange {
    pub fn position(&self) -> VoxelPos {
        VoxelPos::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: PlayerId,
    pub name: String,
    pub color: &'static str,
    pub ready: bool,
    pub connected: bool,
    pub connection: Option<ConnectionId>,
    pub token: String,
    pub position: Option<PlayerPosition>,
    last_relay_ms: Option<i64>,
}

/// Complete room state as sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub host_id: PlayerId,
    pub players: Vec<PlayerSnapshot>,
    pub max_players: usize,
    pub game_start_time: Option<i64>,
    pub tick: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub ready: bool,
    pub connected: bool,
    pub is_host: bool,
    pub position: Option<PlayerPosition>,
}

#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    status: RoomStatus,
    host: PlayerId,
    players: Vec<RoomPlayer>,
    next_player_id: u32,
    change_log: Vec<BlockChange>,
    tick: u64,
    max_players: usize,
    created_at_ms: i64,
    last_activity_ms: i64,
    game_start_time: Option<i64>,
}

impl Room {
    /// New waiting room with its creator as host
    pub fn create(
        code: RoomCode,
        host_name: String,
        connection: ConnectionId,
        token: String,
        max_players: usize,
        now_ms: i64,
    ) -> (Self, PlayerId) {
        let mut room = Self {
            code,
            status: RoomStatus::Waiting,
            host: PlayerId(1),
            players: Vec::new(),
            next_player_id: 1,
            change_log: Vec::new(),
            tick: 0,
            max_players: max_players.max(1),
            created_at_ms: now_ms,
            last_activity_ms: now_ms,
            game_start_time: None,
        };
        let host = room.push_player(host_name, connection, token);
        room.host = host;
        (room, host)
    }

    /// Add a player to a waiting room
    pub fn join(
        &mut self,
        name: String,
        connection: ConnectionId,
        token: String,
        now_ms: i64,
    ) -> RoomResult<PlayerId> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::RoomClosed {
                code: self.code.clone(),
                status: self.status,
            });
        }
        if self.players.len() >= self.max_players {
            return Err(RoomError::RoomFull {
                code: self.code.clone(),
                max: self.max_players,
            });
        }
        self.touch(now_ms);
        Ok(self.push_player(name, connection, token))
    }

    fn push_player(&mut self, name: String, connection: ConnectionId, token: String) -> PlayerId {
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        let color = self.next_color();
        self.players.push(RoomPlayer {
            id,
            name,
            color,
            ready: false,
            connected: true,
            connection: Some(connection),
            token,
            position: None,
            last_relay_ms: None,
        });
        id
    }

    /// Palette slot at the player-count index, skipping colors still in use
    fn next_color(&self) -> &'static str {
        let start = self.players.len();
        (0..PLAYER_COLORS.len())
            .map(|i| PLAYER_COLORS[(start + i) % PLAYER_COLORS.len()])
            .find(|color| self.players.iter().all(|p| p.color != *color))
            .unwrap_or(PLAYER_COLORS[start % PLAYER_COLORS.len()])
    }

    /// Remove a player for good. Hands the host role on if needed.
    pub fn remove_player(&mut self, id: PlayerId, now_ms: i64) -> Option<RoomPlayer> {
        let index = self.players.iter().position(|p| p.id == id)?;
        let removed = self.players.remove(index);
        self.touch(now_ms);

        if removed.id == self.host {
            self.pass_host(removed.id, false);
        }
        Some(removed)
    }

    /// Keep the player but drop their connection. A disconnected host hands
    /// the role to another connected player when there is one.
    pub fn mark_disconnected(&mut self, id: PlayerId, now_ms: i64) -> bool {
        self.touch(now_ms);
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        player.connected = false;
        player.connection = None;
        if id == self.host {
            self.pass_host(id, true);
        }
        true
    }

    /// Move the host role off `from`: first connected player, else (unless
    /// `connected_only`) the first remaining one
    fn pass_host(&mut self, from: PlayerId, connected_only: bool) {
        let next = self
            .players
            .iter()
            .filter(|p| p.id != from)
            .find(|p| p.connected)
            .or_else(|| {
                if connected_only {
                    None
                } else {
                    self.players.iter().find(|p| p.id != from)
                }
            })
            .map(|p| p.id);
        if let Some(next) = next {
            log::info!("Room {}: host passed from {} to {}", self.code, from, next);
            self.host = next;
        }
    }

    /// Bind a player to a new connection, returning the one it replaced
    pub fn transfer_player(
        &mut self,
        id: PlayerId,
        connection: ConnectionId,
        now_ms: i64,
    ) -> RoomResult<Option<ConnectionId>> {
        self.touch(now_ms);
        let player = self
            .player_mut(id)
            .ok_or_else(|| reconnect_failed("player no longer in room"))?;
        let previous = player.connection.replace(connection);
        player.connected = true;
        Ok(previous)
    }

    pub fn set_ready(&mut self, id: PlayerId, ready: bool, now_ms: i64) -> RoomResult<()> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::InvalidState {
                action: "change ready state",
                status: self.status,
            });
        }
        self.touch(now_ms);
        let player = self.player_mut(id).ok_or(RoomError::NotInRoom)?;
        player.ready = ready;
        Ok(())
    }

    /// Every connected non-host player is ready and someone is connected
    pub fn can_start(&self) -> bool {
        self.status == RoomStatus::Waiting
            && self.connected_count() > 0
            && self
                .players
                .iter()
                .filter(|p| p.connected && p.id != self.host)
                .all(|p| p.ready)
    }

    /// `waiting -> countdown`
    pub fn start_countdown(&mut self, requester: PlayerId, now_ms: i64) -> RoomResult<()> {
        if requester != self.host {
            return Err(RoomError::NotHost {
                action: "start the game",
            });
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::InvalidState {
                action: "start the game",
                status: self.status,
            });
        }
        if !self.can_start() {
            return Err(RoomError::NotAllReady);
        }
        self.touch(now_ms);
        self.status = RoomStatus::Countdown;
        log::info!("Room {}: countdown started", self.code);
        Ok(())
    }

    /// `countdown -> playing`, stamping the game start time
    pub fn begin_playing(&mut self, now_ms: i64) -> RoomResult<i64> {
        if self.status != RoomStatus::Countdown {
            return Err(RoomError::InvalidState {
                action: "begin playing",
                status: self.status,
            });
        }
        self.touch(now_ms);
        self.status = RoomStatus::Playing;
        self.game_start_time = Some(now_ms);
        log::info!("Room {}: game started", self.code);
        Ok(now_ms)
    }

    /// `playing -> finished`
    pub fn finish(&mut self, now_ms: i64) -> RoomResult<()> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::InvalidState {
                action: "finish the game",
                status: self.status,
            });
        }
        self.touch(now_ms);
        self.status = RoomStatus::Finished;
        log::info!("Room {}: game finished after {} block changes", self.code, self.tick);
        Ok(())
    }

    /// Append an accepted break/place under the next tick number
    pub fn record_block_change(
        &mut self,
        player_id: PlayerId,
        pos: VoxelPos,
        block_type: BlockId,
        now_ms: i64,
    ) -> RoomResult<BlockChange> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::InvalidState {
                action: "change blocks",
                status: self.status,
            });
        }
        self.touch(now_ms);
        self.tick += 1;
        let change = BlockChange {
            player_id,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            block_type,
            tick: self.tick,
        };
        self.change_log.push(change);
        Ok(change)
    }

    /// Store the latest position. Returns true when it is due for relay.
    pub fn update_position(
        &mut self,
        id: PlayerId,
        position: PlayerPosition,
        min_interval_ms: i64,
        now_ms: i64,
    ) -> bool {
        self.touch(now_ms);
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        player.position = Some(position);
        let due = player
            .last_relay_ms
            .map_or(true, |last| now_ms - last >= min_interval_ms);
        if due {
            player.last_relay_ms = Some(now_ms);
        }
        due
    }

    /// Day fraction derived from the game start time
    pub fn day_phase(&self, now_ms: i64, cycle_secs: u64) -> Option<f32> {
        self.game_start_time
            .map(|start| day_phase(start, now_ms, cycle_secs))
    }

    /// Connections of connected players, optionally leaving one out
    pub fn connections(&self, except: Option<PlayerId>) -> Vec<ConnectionId> {
        self.players
            .iter()
            .filter(|p| p.connected && Some(p.id) != except)
            .filter_map(|p| p.connection)
            .collect()
    }

    pub fn is_stale(&self, now_ms: i64, timeout_ms: i64) -> bool {
        self.connected_count() == 0 && now_ms - self.last_activity_ms > timeout_ms
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.last_activity_ms = self.last_activity_ms.max(now_ms);
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            status: self.status,
            host_id: self.host,
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    id: p.id,
                    name: p.name.clone(),
                    color: p.color.to_string(),
                    ready: p.ready,
                    connected: p.connected,
                    is_host: p.id == self.host,
                    position: p.position,
                })
                .collect(),
            max_players: self.max_players,
            game_start_time: self.game_start_time,
            tick: self.tick,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn host(&self) -> PlayerId {
        self.host
    }

    pub fn players(&self) -> &[RoomPlayer] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut RoomPlayer> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn change_log(&self) -> &[BlockChange] {
        &self.change_log
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn game_start_time(&self) -> Option<i64> {
        self.game_start_time
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    pub fn last_activity_ms(&self) -> i64 {
        self.last_activity_ms
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn room_with(names: &[&str]) -> (Room, Vec<PlayerId>) {
        let code = RoomCode::parse("ABCDE").expect("valid code");
        let (mut room, host) = Room::create(
            code,
            names[0].to_string(),
            ConnectionId(1),
            "t1".to_string(),
            8,
            0,
        );
        let mut ids = vec![host];
        for (i, name) in names.iter().enumerate().skip(1) {
            let id = room
                .join(
                    name.to_string(),
                    ConnectionId(i as u64 + 1),
                    format!("t{}", i + 1),
                    0,
                )
                .expect("join");
            ids.push(id);
        }
        (room, ids)
    }

    #[test]
    fn test_generated_codes_use_the_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), ROOM_CODE_LENGTH);
            assert_eq!(RoomCode::parse(code.as_str()), Some(code.clone()));
            assert!(!code.as_str().chars().any(|c| "0O1I".contains(c)));
        }
    }

    #[test]
    fn test_code_parse_normalises_case() {
        assert_eq!(
            RoomCode::parse(" abcde ").map(|c| c.to_string()),
            Some("ABCDE".to_string())
        );
        assert!(RoomCode::parse("ABCD").is_none());
        assert!(RoomCode::parse("ABCD0").is_none());
    }

    #[test]
    fn test_colors_follow_join_order_and_skip_used() {
        let (mut room, ids) = room_with(&["a", "b", "c"]);
        assert_eq!(room.player(ids[0]).map(|p| p.color), Some(PLAYER_COLORS[0]));
        assert_eq!(room.player(ids[2]).map(|p| p.color), Some(PLAYER_COLORS[2]));

        room.remove_player(ids[0], 0);
        let d = room
            .join("d".to_string(), ConnectionId(9), "t9".to_string(), 0)
            .expect("join");
        // index 2 is taken by "c", so the next free slot is used
        assert_eq!(room.player(d).map(|p| p.color), Some(PLAYER_COLORS[3]));
    }

    #[test]
    fn test_host_ready_flag_not_required() {
        let (mut room, ids) = room_with(&["host", "guest"]);
        assert!(!room.can_start());
        room.set_ready(ids[1], true, 0).expect("ready");
        assert!(room.can_start());
        assert_eq!(
            room.start_countdown(ids[1], 0),
            Err(RoomError::NotHost {
                action: "start the game"
            })
        );
        room.start_countdown(ids[0], 0).expect("host starts");
        assert_eq!(room.status(), RoomStatus::Countdown);
    }

    #[test]
    fn test_disconnected_players_do_not_block_start() {
        let (mut room, ids) = room_with(&["host", "guest"]);
        room.mark_disconnected(ids[1], 0);
        assert!(room.can_start());
        assert_eq!(room.connected_count(), 1);
        assert_eq!(room.len(), 2);
    }

    #[test]
    fn test_host_reassigned_on_leave() {
        let (mut room, ids) = room_with(&["a", "b", "c"]);
        room.mark_disconnected(ids[1], 0);
        room.remove_player(ids[0], 0);
        // first connected player wins over first in order
        assert_eq!(room.host(), ids[2]);
        assert!(room.snapshot().players.iter().any(|p| p.is_host && p.id == ids[2]));
    }

    #[test]
    fn test_host_reassigned_on_disconnect() {
        let (mut room, ids) = room_with(&["a", "b", "c"]);
        room.mark_disconnected(ids[1], 0);
        room.mark_disconnected(ids[0], 0);
        assert_eq!(room.host(), ids[2]);

        // Nobody connected to take over: the role stays put
        room.mark_disconnected(ids[2], 0);
        assert_eq!(room.host(), ids[2]);

        // The old host coming back does not reclaim it
        room.transfer_player(ids[0], ConnectionId(9), 0).expect("transfer");
        assert_eq!(room.host(), ids[2]);
    }

    #[test]
    fn test_join_rejected_when_full_or_started() {
        let code = RoomCode::parse("ZZZZZ").expect("valid code");
        let (mut room, host) =
            Room::create(code, "a".to_string(), ConnectionId(1), "t".to_string(), 2, 0);
        room.join("b".to_string(), ConnectionId(2), "u".to_string(), 0)
            .expect("join");
        let full = room.join("c".to_string(), ConnectionId(3), "v".to_string(), 0);
        assert!(matches!(full, Err(RoomError::RoomFull { max: 2, .. })));

        room.remove_player(PlayerId(2), 0);
        room.start_countdown(host, 0).expect("start");
        let closed = room.join("c".to_string(), ConnectionId(3), "v".to_string(), 0);
        assert!(matches!(closed, Err(RoomError::RoomClosed { .. })));
    }

    #[test]
    fn test_block_ticks_strictly_increase() {
        let (mut room, ids) = room_with(&["a"]);
        let pos = VoxelPos::new(1, 2, 3);
        assert!(room.record_block_change(ids[0], pos, BlockId::STONE, 0).is_err());

        room.start_countdown(ids[0], 0).expect("start");
        room.begin_playing(5_000).expect("play");
        let ticks: Vec<u64> = (0..5)
            .map(|_| {
                room.record_block_change(ids[0], pos, BlockId::AIR, 5_000)
                    .expect("change")
                    .tick
            })
            .collect();
        assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
        assert_eq!(room.change_log().len(), 5);
        assert_eq!(room.game_start_time(), Some(5_000));
    }

    #[test]
    fn test_position_relay_is_throttled() {
        let (mut room, ids) = room_with(&["a"]);
        let pos = PlayerPosition {
            x: 1.0,
            ..PlayerPosition::default()
        };
        assert!(room.update_position(ids[0], pos, 100, 1_000));
        let later = PlayerPosition { x: 2.0, ..pos };
        assert!(!room.update_position(ids[0], later, 100, 1_050));
        // stored even when not relayed
        assert_eq!(room.player(ids[0]).and_then(|p| p.position), Some(later));
        assert!(room.update_position(ids[0], later, 100, 1_100));
    }

    #[test]
    fn test_transfer_keeps_identity_and_position() {
        let (mut room, ids) = room_with(&["a", "b"]);
        let pos = PlayerPosition {
            x: 4.0,
            y: 70.0,
            ..PlayerPosition::default()
        };
        room.update_position(ids[1], pos, 100, 0);
        room.mark_disconnected(ids[1], 10);
        assert!(room.connections(None).iter().all(|c| *c != ConnectionId(2)));

        let previous = room
            .transfer_player(ids[1], ConnectionId(42), 20)
            .expect("transfer");
        assert_eq!(previous, None);
        let player = room.player(ids[1]).expect("player");
        assert!(player.connected);
        assert_eq!(player.connection, Some(ConnectionId(42)));
        assert_eq!(player.position, Some(pos));
    }

    #[test]
    fn test_staleness_needs_zero_connected() {
        let (mut room, ids) = room_with(&["a"]);
        assert!(!room.is_stale(1_000_000, 1_000));
        room.mark_disconnected(ids[0], 0);
        assert!(!room.is_stale(500, 1_000));
        assert!(room.is_stale(1_001, 1_000));
    }
}
