//! Room registry and message handling
//!
//! [`RoomManager`] turns one client message into an [`Outcome`]: the messages
//! to deliver and the timer events the runtime has to act on. It never does
//! I/O itself, so it is driven the same way by the TCP server and by tests.
//!
//! Rooms live in a [`DashMap`]; holding a room's entry serialises everything
//! done to that room, which is what keeps block ticks unique. Session and
//! token refs are never held while a room entry is acquired.

use crate::config::ServerConfig;
use crate::constants::world::WORLD_HEIGHT;
use crate::network::error::{reconnect_failed, RoomError, RoomResult};
use crate::network::packet::{ClientMessage, ServerMessage};
use crate::network::protocol::{Protocol, RECONNECT_TOKEN_BYTES};
use crate::network::room::{
    BlockChange, ConnectionId, PlayerId, PlayerPosition, Room, RoomCode, RoomSnapshot, RoomStatus,
};
use crate::time::Clock;
use crate::world::{BlockId, VoxelPos};
use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One message addressed to one connection
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

/// Room transitions that start or stop timers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    CountdownStarted { code: RoomCode, seconds: u64 },
    GameStarted { code: RoomCode },
    GameFinished { code: RoomCode },
    RoomClosed { code: RoomCode },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub dispatches: Vec<Dispatch>,
    pub events: Vec<RoomEvent>,
}

impl Outcome {
    fn reply(to: ConnectionId, message: ServerMessage) -> Self {
        let mut outcome = Self::default();
        outcome.send(to, message);
        outcome
    }

    fn send(&mut self, to: ConnectionId, message: ServerMessage) {
        self.dispatches.push(Dispatch { to, message });
    }

    fn broadcast(&mut self, to: &[ConnectionId], message: ServerMessage) {
        for conn in to {
            self.send(*conn, message.clone());
        }
    }

    fn event(&mut self, event: RoomEvent) {
        self.events.push(event);
    }

    /// Messages addressed to one connection, in send order
    pub fn messages_for(&self, to: ConnectionId) -> Vec<&ServerMessage> {
        self.dispatches
            .iter()
            .filter(|d| d.to == to)
            .map(|d| &d.message)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatches.is_empty() && self.events.is_empty()
    }
}

/// Which player a connection (or a token) speaks for
#[derive(Debug, Clone, PartialEq, Eq)]
struct Session {
    room: RoomCode,
    player: PlayerId,
}

pub struct RoomManager {
    rooms: DashMap<RoomCode, Room>,
    sessions: DashMap<ConnectionId, Session>,
    tokens: DashMap<String, Session>,
    config: ServerConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    next_connection: AtomicU64,
}

impl RoomManager {
    pub fn new(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(config, clock, StdRng::from_entropy())
    }

    /// Deterministic room codes and tokens
    pub fn with_seed(config: ServerConfig, clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self::with_rng(config, clock, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ServerConfig, clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self {
            rooms: DashMap::new(),
            sessions: DashMap::new(),
            tokens: DashMap::new(),
            config,
            clock,
            rng: Mutex::new(rng),
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed))
    }

    fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Route one decoded client message
    pub fn handle(&self, conn: ConnectionId, message: ClientMessage) -> Outcome {
        let result = match message {
            ClientMessage::CreateRoom { name } => self.create_room(conn, &name),
            ClientMessage::JoinRoom { code, name } => self.join_room(conn, &code, &name),
            ClientMessage::LeaveRoom => self.leave_room(conn),
            ClientMessage::SetReady { ready } => self.set_ready(conn, ready),
            ClientMessage::StartGame => self.start_game(conn),
            ClientMessage::EndGame => self.end_game(conn),
            ClientMessage::Reconnect { token } => self.reconnect(conn, &token),
            ClientMessage::Position { x, y, z, rx, ry } => {
                self.update_position(conn, PlayerPosition { x, y, z, rx, ry })
            }
            ClientMessage::BlockBreak { x, y, z } => {
                self.change_block(conn, VoxelPos::new(x, y, z), BlockId::AIR)
            }
            ClientMessage::BlockPlace {
                x,
                y,
                z,
                block_type,
            } => self.change_block(conn, VoxelPos::new(x, y, z), block_type),
            ClientMessage::Chat { message } => self.chat(conn, &message),
        };
        result.unwrap_or_else(|err| self.reject(conn, err))
    }

    /// Turn a failed operation into the reply for its sender
    pub fn reject(&self, conn: ConnectionId, err: RoomError) -> Outcome {
        log::warn!("Rejected message from {}: {}", conn, err);
        let message = match err {
            RoomError::ReconnectFailed { reason } => ServerMessage::ReconnectFailed { reason },
            other => ServerMessage::error(other.code(), other.to_string()),
        };
        Outcome::reply(conn, message)
    }

    pub fn create_room(&self, conn: ConnectionId, name: &str) -> RoomResult<Outcome> {
        self.ensure_free(conn)?;
        let name = validated_name(name)?;
        let now = self.now();
        let token = self.issue_token();

        let (code, room, player_id) = loop {
            let code = RoomCode::generate(&mut *self.rng.lock());
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => {
                    log::debug!("Room code {} already live, regenerating", code);
                }
                Entry::Vacant(slot) => {
                    let (room, host) = Room::create(
                        code.clone(),
                        name.clone(),
                        conn,
                        token.clone(),
                        self.config.max_players_per_room,
                        now,
                    );
                    let snapshot = room.snapshot();
                    slot.insert(room);
                    break (code, snapshot, host);
                }
            }
        };

        let session = Session {
            room: code.clone(),
            player: player_id,
        };
        self.sessions.insert(conn, session.clone());
        self.tokens.insert(token.clone(), session);
        log::info!("Room {} created by {} ({})", code, name, player_id);

        Ok(Outcome::reply(
            conn,
            ServerMessage::RoomCreated {
                room,
                player_id,
                token,
            },
        ))
    }

    pub fn join_room(&self, conn: ConnectionId, code: &str, name: &str) -> RoomResult<Outcome> {
        self.ensure_free(conn)?;
        let name = validated_name(name)?;
        let code = RoomCode::parse(code).ok_or_else(|| RoomError::RoomNotFound {
            code: code.trim().to_string(),
        })?;
        let now = self.now();
        let token = self.issue_token();

        let mut room = self
            .rooms
            .get_mut(&code)
            .ok_or_else(|| RoomError::RoomNotFound {
                code: code.to_string(),
            })?;
        let player_id = room.join(name.clone(), conn, token.clone(), now)?;
        let snapshot = room.snapshot();
        let others = room.connections(Some(player_id));
        drop(room);

        let session = Session {
            room: code.clone(),
            player: player_id,
        };
        self.sessions.insert(conn, session.clone());
        self.tokens.insert(token.clone(), session);
        log::info!("{} joined room {} as {}", name, code, player_id);

        let mut outcome = Outcome::reply(
            conn,
            ServerMessage::RoomJoined {
                room: snapshot.clone(),
                player_id,
                token,
            },
        );
        outcome.broadcast(&others, ServerMessage::RoomUpdate { room: snapshot });
        Ok(outcome)
    }

    /// Explicit leave: removes the player and invalidates their token
    pub fn leave_room(&self, conn: ConnectionId) -> RoomResult<Outcome> {
        let (_, session) = self.sessions.remove(&conn).ok_or(RoomError::NotInRoom)?;
        let now = self.now();
        let mut outcome = Outcome::reply(conn, ServerMessage::LeftRoom);

        let Some(mut room) = self.rooms.get_mut(&session.room) else {
            return Ok(outcome);
        };
        if let Some(player) = room.remove_player(session.player, now) {
            self.tokens.remove(&player.token);
            log::info!("{} left room {}", player.name, session.room);
        }

        if room.is_empty() {
            drop(room);
            if self
                .rooms
                .remove_if(&session.room, |_, room| room.is_empty())
                .is_some()
            {
                log::info!("Room {} closed, no players left", session.room);
                outcome.event(RoomEvent::RoomClosed { code: session.room });
            }
        } else {
            let snapshot = room.snapshot();
            outcome.broadcast(
                &room.connections(None),
                ServerMessage::RoomUpdate { room: snapshot },
            );
        }
        Ok(outcome)
    }

    /// Transport dropped: keep the player, flag them disconnected
    pub fn disconnect(&self, conn: ConnectionId) -> Outcome {
        let mut outcome = Outcome::default();
        let Some((_, session)) = self.sessions.remove(&conn) else {
            return outcome;
        };
        let now = self.now();
        if let Some(mut room) = self.rooms.get_mut(&session.room) {
            let bound = room
                .player(session.player)
                .map_or(false, |p| p.connection == Some(conn));
            if bound && room.mark_disconnected(session.player, now) {
                log::info!(
                    "{} disconnected from room {} ({} still connected)",
                    session.player,
                    session.room,
                    room.connected_count()
                );
                let snapshot = room.snapshot();
                outcome.broadcast(
                    &room.connections(None),
                    ServerMessage::RoomUpdate { room: snapshot },
                );
            }
        }
        outcome
    }

    /// Resume a player identity on a new connection
    pub fn reconnect(&self, conn: ConnectionId, token: &str) -> RoomResult<Outcome> {
        self.ensure_free(conn)?;
        let session = self
            .tokens
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| reconnect_failed("unknown or expired token"))?;
        let now = self.now();

        let Some(mut room) = self.rooms.get_mut(&session.room) else {
            self.tokens.remove(token);
            return Err(reconnect_failed(format!(
                "room {} no longer exists",
                session.room
            )));
        };
        let previous = room.transfer_player(session.player, conn, now)?;
        if let Some(old) = previous.filter(|old| *old != conn) {
            self.sessions.remove(&old);
        }

        let snapshot = room.snapshot();
        let replay = (room.status() == RoomStatus::Playing).then(|| room.change_log().to_vec());
        let phase = room.day_phase(now, self.config.day_cycle_secs);
        let others = room.connections(Some(session.player));
        drop(room);

        self.sessions.insert(conn, session.clone());
        log::info!(
            "{} reconnected to room {} on {}",
            session.player,
            session.room,
            conn
        );

        let mut outcome = Outcome::reply(
            conn,
            ServerMessage::Reconnected {
                room: snapshot.clone(),
                player_id: session.player,
            },
        );
        if let Some(changes) = replay {
            outcome.send(conn, ServerMessage::BlockReplay { changes });
            if let Some(day_phase) = phase {
                outcome.send(conn, ServerMessage::TimeSync { day_phase });
            }
        }
        outcome.broadcast(&others, ServerMessage::RoomUpdate { room: snapshot });
        Ok(outcome)
    }

    pub fn set_ready(&self, conn: ConnectionId, ready: bool) -> RoomResult<Outcome> {
        let session = self.session(conn)?;
        let now = self.now();
        let mut room = self.room_mut(&session)?;
        room.set_ready(session.player, ready, now)?;
        Ok(self.room_update(&room))
    }

    /// Host request: `waiting -> countdown`
    pub fn start_game(&self, conn: ConnectionId) -> RoomResult<Outcome> {
        let session = self.session(conn)?;
        let now = self.now();
        let mut room = self.room_mut(&session)?;
        room.start_countdown(session.player, now)?;

        let seconds = self.config.countdown_secs;
        let mut outcome = self.room_update(&room);
        outcome.broadcast(
            &room.connections(None),
            ServerMessage::GameCountdown { seconds },
        );
        outcome.event(RoomEvent::CountdownStarted {
            code: session.room,
            seconds,
        });
        Ok(outcome)
    }

    /// Countdown elapsed: `countdown -> playing`
    pub fn begin_playing(&self, code: &RoomCode) -> RoomResult<Outcome> {
        let now = self.now();
        let mut room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::RoomNotFound {
                code: code.to_string(),
            })?;
        let game_start_time = room.begin_playing(now)?;

        let mut outcome = self.room_update(&room);
        outcome.broadcast(
            &room.connections(None),
            ServerMessage::GameStarted {
                game_start_time,
                day_cycle_secs: self.config.day_cycle_secs,
            },
        );
        outcome.event(RoomEvent::GameStarted { code: code.clone() });
        Ok(outcome)
    }

    /// Host request: `playing -> finished`
    pub fn end_game(&self, conn: ConnectionId) -> RoomResult<Outcome> {
        let session = self.session(conn)?;
        let now = self.now();
        let mut room = self.room_mut(&session)?;
        if room.host() != session.player {
            return Err(RoomError::NotHost {
                action: "end the game",
            });
        }
        self.finish_locked(&mut room, now)
    }

    /// `playing -> finished`, stopping the room's timers
    pub fn finish_game(&self, code: &RoomCode) -> RoomResult<Outcome> {
        let now = self.now();
        let mut room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::RoomNotFound {
                code: code.to_string(),
            })?;
        self.finish_locked(&mut room, now)
    }

    fn finish_locked(&self, room: &mut Room, now: i64) -> RoomResult<Outcome> {
        room.finish(now)?;
        let mut outcome = Outcome::default();
        outcome.broadcast(
            &room.connections(None),
            ServerMessage::GameFinished {
                room: room.snapshot(),
            },
        );
        outcome.event(RoomEvent::GameFinished {
            code: room.code().clone(),
        });
        Ok(outcome)
    }

    /// Accepted break or place, echoed to every member including the sender
    pub fn change_block(
        &self,
        conn: ConnectionId,
        pos: VoxelPos,
        block_type: BlockId,
    ) -> RoomResult<Outcome> {
        if !(0..WORLD_HEIGHT).contains(&pos.y) {
            return Err(RoomError::InvalidBlock {
                reason: format!("y={} is outside the world", pos.y),
            });
        }
        if block_type.kind().is_none() {
            return Err(RoomError::InvalidBlock {
                reason: format!("unknown block id {}", block_type.0),
            });
        }

        let session = self.session(conn)?;
        let now = self.now();
        let mut room = self.room_mut(&session)?;
        let change = room.record_block_change(session.player, pos, block_type, now)?;
        log::debug!(
            "Room {} tick {}: {} set ({}, {}, {}) to {}",
            session.room,
            change.tick,
            change.player_id,
            change.x,
            change.y,
            change.z,
            change.block_type
        );

        let mut outcome = Outcome::default();
        outcome.broadcast(
            &room.connections(None),
            ServerMessage::BlockChanged { change },
        );
        Ok(outcome)
    }

    /// Store the latest position; relay it to others when due
    pub fn update_position(
        &self,
        conn: ConnectionId,
        position: PlayerPosition,
    ) -> RoomResult<Outcome> {
        if !position.is_finite() {
            return Err(RoomError::Malformed {
                reason: "position is not finite".to_string(),
            });
        }
        let session = self.session(conn)?;
        let now = self.now();
        let interval = Protocol::relay_interval(self.config.position_relay_hz).as_millis() as i64;
        let mut room = self.room_mut(&session)?;

        let due = room.update_position(session.player, position, interval, now);
        let mut outcome = Outcome::default();
        if due && room.status() == RoomStatus::Playing {
            log::trace!("Relaying position of {} in {}", session.player, session.room);
            outcome.broadcast(
                &room.connections(Some(session.player)),
                ServerMessage::player_moved(session.player, position),
            );
        }
        Ok(outcome)
    }

    pub fn chat(&self, conn: ConnectionId, message: &str) -> RoomResult<Outcome> {
        Protocol::validate_chat_message(message)
            .map_err(|reason| RoomError::InvalidChat { reason })?;
        let session = self.session(conn)?;
        let now = self.now();
        let mut room = self.room_mut(&session)?;
        room.touch(now);
        let name = room
            .player(session.player)
            .map(|p| p.name.clone())
            .unwrap_or_default();

        let mut outcome = Outcome::default();
        outcome.broadcast(
            &room.connections(None),
            ServerMessage::Chat {
                player_id: session.player,
                name,
                message: message.to_string(),
            },
        );
        Ok(outcome)
    }

    /// Day phase broadcast. `None` once the room is gone or not playing.
    pub fn time_sync(&self, code: &RoomCode) -> Option<Outcome> {
        let now = self.now();
        let room = self.rooms.get(code)?;
        if room.status() != RoomStatus::Playing {
            return None;
        }
        let day_phase = room.day_phase(now, self.config.day_cycle_secs)?;
        let mut outcome = Outcome::default();
        outcome.broadcast(&room.connections(None), ServerMessage::TimeSync { day_phase });
        Some(outcome)
    }

    /// Destroy rooms with nobody connected and no activity within the timeout
    pub fn cleanup_stale(&self) -> Outcome {
        let now = self.now();
        let timeout_ms = self.config.stale_room_timeout_secs as i64 * 1000;
        let stale: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|entry| entry.value().is_stale(now, timeout_ms))
            .map(|entry| entry.key().clone())
            .collect();

        let mut outcome = Outcome::default();
        for code in stale {
            let Some((code, room)) = self
                .rooms
                .remove_if(&code, |_, room| room.is_stale(now, timeout_ms))
            else {
                continue;
            };
            for player in room.players() {
                self.tokens.remove(&player.token);
            }
            log::info!(
                "Reaped stale room {} ({} players, {} block changes)",
                code,
                room.len(),
                room.tick()
            );
            outcome.event(RoomEvent::RoomClosed { code });
        }
        outcome
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn snapshot(&self, code: &RoomCode) -> Option<RoomSnapshot> {
        self.rooms.get(code).map(|room| room.snapshot())
    }

    pub fn change_log(&self, code: &RoomCode) -> Option<Vec<BlockChange>> {
        self.rooms.get(code).map(|room| room.change_log().to_vec())
    }

    /// Room code and player id a connection currently speaks for
    pub fn session_of(&self, conn: ConnectionId) -> Option<(RoomCode, PlayerId)> {
        self.sessions
            .get(&conn)
            .map(|s| (s.room.clone(), s.player))
    }

    pub fn token_is_live(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    fn room_update(&self, room: &Room) -> Outcome {
        let mut outcome = Outcome::default();
        outcome.broadcast(
            &room.connections(None),
            ServerMessage::RoomUpdate {
                room: room.snapshot(),
            },
        );
        outcome
    }

    fn session(&self, conn: ConnectionId) -> RoomResult<Session> {
        self.sessions
            .get(&conn)
            .map(|entry| entry.value().clone())
            .ok_or(RoomError::NotInRoom)
    }

    fn room_mut(&self, session: &Session) -> RoomResult<RefMut<'_, RoomCode, Room>> {
        self.rooms.get_mut(&session.room).ok_or(RoomError::NotInRoom)
    }

    fn ensure_free(&self, conn: ConnectionId) -> RoomResult<()> {
        match self.session_of(conn) {
            Some((code, _)) => Err(RoomError::AlreadyInRoom { code }),
            None => Ok(()),
        }
    }

    fn issue_token(&self) -> String {
        let bytes: [u8; RECONNECT_TOKEN_BYTES] = self.rng.lock().gen();
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

fn validated_name(name: &str) -> RoomResult<String> {
    let name = name.trim();
    Protocol::validate_player_name(name).map_err(|reason| RoomError::InvalidName { reason })?;
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::error::ErrorCode;
    use crate::time::ManualClock;

    const HOST: ConnectionId = ConnectionId(1);
    const GUEST: ConnectionId = ConnectionId(2);

    fn manager() -> (RoomManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let manager = RoomManager::with_seed(ServerConfig::default(), clock.clone(), 42);
        (manager, clock)
    }

    fn create(manager: &RoomManager, conn: ConnectionId) -> (RoomCode, String) {
        let outcome = manager.create_room(conn, "host").expect("create");
        match outcome.messages_for(conn).first() {
            Some(ServerMessage::RoomCreated { room, token, .. }) => (room.code.clone(), token.clone()),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    fn join(manager: &RoomManager, conn: ConnectionId, code: &RoomCode) -> String {
        let outcome = manager.join_room(conn, code.as_str(), "guest").expect("join");
        match outcome.messages_for(conn).first() {
            Some(ServerMessage::RoomJoined { token, .. }) => token.clone(),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    fn start_playing(manager: &RoomManager, code: &RoomCode) {
        manager.set_ready(GUEST, true).expect("ready");
        manager.start_game(HOST).expect("start");
        manager.begin_playing(code).expect("play");
    }

    fn error_code(outcome: &Outcome, conn: ConnectionId) -> Option<ErrorCode> {
        outcome.messages_for(conn).iter().find_map(|m| match m {
            ServerMessage::Error { code, .. } => Some(*code),
            _ => None,
        })
    }

    #[test]
    fn test_join_notifies_existing_members() {
        let (manager, _) = manager();
        let (code, _) = create(&manager, HOST);
        let outcome = manager.join_room(GUEST, &code.as_str().to_lowercase(), "guest").expect("join");

        let host_msgs = outcome.messages_for(HOST);
        assert_eq!(host_msgs.len(), 1);
        match host_msgs[0] {
            ServerMessage::RoomUpdate { room } => {
                assert_eq!(room.players.len(), 2);
                assert!(room.players[0].is_host);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_protocol_errors_become_error_codes() {
        let (manager, _) = manager();
        let outcome = manager.handle(
            GUEST,
            ClientMessage::JoinRoom {
                code: "QQQQQ".to_string(),
                name: "guest".to_string(),
            },
        );
        assert_eq!(error_code(&outcome, GUEST), Some(ErrorCode::RoomNotFound));

        let outcome = manager.handle(GUEST, ClientMessage::StartGame);
        assert_eq!(error_code(&outcome, GUEST), Some(ErrorCode::NotInRoom));

        let (code, _) = create(&manager, HOST);
        join(&manager, GUEST, &code);
        let outcome = manager.handle(GUEST, ClientMessage::StartGame);
        assert_eq!(error_code(&outcome, GUEST), Some(ErrorCode::NotHost));
        let outcome = manager.handle(HOST, ClientMessage::StartGame);
        assert_eq!(error_code(&outcome, HOST), Some(ErrorCode::NotAllReady));

        let outcome = manager.handle(HOST, ClientMessage::CreateRoom { name: "again".to_string() });
        assert_eq!(error_code(&outcome, HOST), Some(ErrorCode::AlreadyInRoom));
    }

    #[test]
    fn test_start_flow_emits_timer_events() {
        let (manager, clock) = manager();
        let (code, _) = create(&manager, HOST);
        join(&manager, GUEST, &code);
        manager.set_ready(GUEST, true).expect("ready");

        let outcome = manager.start_game(HOST).expect("start");
        assert_eq!(
            outcome.events,
            vec![RoomEvent::CountdownStarted {
                code: code.clone(),
                seconds: 3
            }]
        );
        assert!(outcome
            .messages_for(GUEST)
            .iter()
            .any(|m| matches!(m, ServerMessage::GameCountdown { seconds: 3 })));

        clock.advance_secs(3);
        let outcome = manager.begin_playing(&code).expect("play");
        assert_eq!(outcome.events, vec![RoomEvent::GameStarted { code: code.clone() }]);
        let snapshot = manager.snapshot(&code).expect("room");
        assert_eq!(snapshot.status, RoomStatus::Playing);
        assert_eq!(snapshot.game_start_time, Some(1_003_000));
    }

    #[test]
    fn test_block_changes_echo_to_sender_with_ticks() {
        let (manager, _) = manager();
        let (code, _) = create(&manager, HOST);
        join(&manager, GUEST, &code);

        let early = manager.handle(GUEST, ClientMessage::BlockBreak { x: 0, y: 10, z: 0 });
        assert_eq!(error_code(&early, GUEST), Some(ErrorCode::InvalidState));

        start_playing(&manager, &code);
        let first = manager.handle(GUEST, ClientMessage::BlockBreak { x: 0, y: 10, z: 0 });
        let second = manager.handle(
            HOST,
            ClientMessage::BlockPlace {
                x: 0,
                y: 10,
                z: 0,
                block_type: BlockId::STONE,
            },
        );
        for (outcome, tick) in [(&first, 1u64), (&second, 2u64)] {
            for conn in [HOST, GUEST] {
                match outcome.messages_for(conn).as_slice() {
                    [ServerMessage::BlockChanged { change }] => assert_eq!(change.tick, tick),
                    other => panic!("unexpected {:?}", other),
                }
            }
        }
        let log = manager.change_log(&code).expect("room");
        assert_eq!(log[0].block_type, BlockId::AIR);
        assert_eq!(log[1].block_type, BlockId::STONE);
    }

    #[test]
    fn test_bad_block_changes_are_refused() {
        let (manager, _) = manager();
        let (code, _) = create(&manager, HOST);
        join(&manager, GUEST, &code);
        start_playing(&manager, &code);

        let out_of_world = manager.handle(HOST, ClientMessage::BlockBreak { x: 0, y: -1, z: 0 });
        assert_eq!(error_code(&out_of_world, HOST), Some(ErrorCode::InvalidBlock));
        let unknown = manager.handle(
            HOST,
            ClientMessage::BlockPlace {
                x: 0,
                y: 5,
                z: 0,
                block_type: BlockId(u16::MAX),
            },
        );
        assert_eq!(error_code(&unknown, HOST), Some(ErrorCode::InvalidBlock));
        assert_eq!(manager.change_log(&code).map(|l| l.len()), Some(0));
    }

    #[test]
    fn test_position_relay_is_throttled_and_excludes_sender() {
        let (manager, clock) = manager();
        let (code, _) = create(&manager, HOST);
        join(&manager, GUEST, &code);
        start_playing(&manager, &code);

        let pos = PlayerPosition {
            x: 1.0,
            y: 65.0,
            z: 2.0,
            rx: 0.1,
            ry: 0.2,
        };
        let first = manager.update_position(GUEST, pos).expect("relay");
        assert!(first.messages_for(GUEST).is_empty());
        assert_eq!(first.messages_for(HOST).len(), 1);

        clock.advance_ms(20);
        let throttled = manager.update_position(GUEST, pos).expect("stored");
        assert!(throttled.is_empty());

        clock.advance_ms(100);
        let again = manager.update_position(GUEST, pos).expect("relay");
        assert_eq!(again.messages_for(HOST).len(), 1);

        let nan = PlayerPosition { x: f32::NAN, ..pos };
        assert!(matches!(
            manager.update_position(GUEST, nan),
            Err(RoomError::Malformed { .. })
        ));
    }

    #[test]
    fn test_leave_tears_down_empty_room_and_kills_token() {
        let (manager, _) = manager();
        let (code, host_token) = create(&manager, HOST);
        let guest_token = join(&manager, GUEST, &code);

        manager.leave_room(GUEST).expect("leave");
        assert!(!manager.token_is_live(&guest_token));
        let outcome = manager.handle(ConnectionId(9), ClientMessage::Reconnect { token: guest_token });
        assert!(matches!(
            outcome.messages_for(ConnectionId(9)).as_slice(),
            [ServerMessage::ReconnectFailed { .. }]
        ));

        let outcome = manager.leave_room(HOST).expect("leave");
        assert_eq!(outcome.events, vec![RoomEvent::RoomClosed { code: code.clone() }]);
        assert_eq!(manager.room_count(), 0);
        assert!(!manager.token_is_live(&host_token));
    }

    #[test]
    fn test_host_leaving_hands_over_host() {
        let (manager, _) = manager();
        let (code, _) = create(&manager, HOST);
        join(&manager, GUEST, &code);
        let outcome = manager.leave_room(HOST).expect("leave");
        match outcome.messages_for(GUEST).as_slice() {
            [ServerMessage::RoomUpdate { room }] => {
                assert_eq!(room.players.len(), 1);
                assert!(room.players[0].is_host);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_host_dropping_lets_guest_start() {
        let (manager, _) = manager();
        let (code, _) = create(&manager, HOST);
        join(&manager, GUEST, &code);
        let guest_id = manager.session_of(GUEST).map(|(_, id)| id).expect("session");

        let outcome = manager.disconnect(HOST);
        match outcome.messages_for(GUEST).as_slice() {
            [ServerMessage::RoomUpdate { room }] => assert_eq!(room.host_id, guest_id),
            other => panic!("unexpected {:?}", other),
        }

        let outcome = manager.start_game(GUEST).expect("new host starts");
        assert_eq!(
            outcome.events,
            vec![RoomEvent::CountdownStarted { code, seconds: 3 }]
        );
    }

    #[test]
    fn test_reconnect_restores_identity_and_replays_log() {
        let (manager, _) = manager();
        let (code, _) = create(&manager, HOST);
        let token = join(&manager, GUEST, &code);
        start_playing(&manager, &code);
        manager.change_block(HOST, VoxelPos::new(3, 4, 5), BlockId::AIR).expect("break");

        let guest_id = manager.session_of(GUEST).map(|(_, id)| id).expect("session");
        manager.disconnect(GUEST);
        let snapshot = manager.snapshot(&code).expect("room");
        assert_eq!(snapshot.players.len(), 2);
        assert!(!snapshot.players[1].connected);

        let fresh = ConnectionId(77);
        let outcome = manager.reconnect(fresh, &token).expect("reconnect");
        match outcome.messages_for(fresh).as_slice() {
            [ServerMessage::Reconnected { player_id, .. }, ServerMessage::BlockReplay { changes }, ServerMessage::TimeSync { .. }] =>
            {
                assert_eq!(*player_id, guest_id);
                assert_eq!(changes.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(manager.session_of(fresh).map(|(_, id)| id), Some(guest_id));
        assert!(manager.session_of(GUEST).is_none());
    }

    #[test]
    fn test_stale_rooms_are_reaped_regardless_of_tokens() {
        let (manager, clock) = manager();
        let (code, token) = create(&manager, HOST);
        manager.disconnect(HOST);

        clock.advance_secs(299);
        assert!(manager.cleanup_stale().is_empty());

        clock.advance_secs(2);
        let outcome = manager.cleanup_stale();
        assert_eq!(outcome.events, vec![RoomEvent::RoomClosed { code }]);
        assert_eq!(manager.room_count(), 0);

        let outcome = manager.handle(ConnectionId(5), ClientMessage::Reconnect { token });
        assert!(matches!(
            outcome.messages_for(ConnectionId(5)).as_slice(),
            [ServerMessage::ReconnectFailed { .. }]
        ));
    }

    #[test]
    fn test_connected_rooms_are_never_reaped() {
        let (manager, clock) = manager();
        create(&manager, HOST);
        clock.advance_secs(10_000);
        assert!(manager.cleanup_stale().is_empty());
        assert_eq!(manager.room_count(), 1);
    }

    #[test]
    fn test_chat_goes_to_everyone() {
        let (manager, _) = manager();
        let (code, _) = create(&manager, HOST);
        join(&manager, GUEST, &code);
        let outcome = manager.chat(GUEST, "hello").expect("chat");
        assert_eq!(outcome.dispatches.len(), 2);
        assert!(matches!(
            manager.chat(GUEST, &"x".repeat(300)),
            Err(RoomError::InvalidChat { .. })
        ));
    }

    #[test]
    fn test_time_sync_only_while_playing() {
        let (manager, clock) = manager();
        let (code, _) = create(&manager, HOST);
        join(&manager, GUEST, &code);
        assert!(manager.time_sync(&code).is_none());

        start_playing(&manager, &code);
        clock.advance_secs(300);
        let outcome = manager.time_sync(&code).expect("playing");
        match outcome.messages_for(HOST).as_slice() {
            [ServerMessage::TimeSync { day_phase }] => assert!((day_phase - 0.25).abs() < 1e-6),
            other => panic!("unexpected {:?}", other),
        }

        let outcome = manager.end_game(HOST).expect("finish");
        assert_eq!(outcome.events, vec![RoomEvent::GameFinished { code: code.clone() }]);
        assert!(manager.time_sync(&code).is_none());
    }

    #[test]
    fn test_full_room_rejects_join() {
        let clock = Arc::new(ManualClock::new(0));
        let config = ServerConfig {
            max_players_per_room: 1,
            ..ServerConfig::default()
        };
        let manager = RoomManager::with_seed(config, clock, 1);
        let (code, _) = create(&manager, HOST);
        let outcome = manager.handle(
            GUEST,
            ClientMessage::JoinRoom {
                code: code.to_string(),
                name: "guest".to_string(),
            },
        );
        assert_eq!(error_code(&outcome, GUEST), Some(ErrorCode::RoomFull));
    }
}
