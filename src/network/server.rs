//! Tokio room server
//!
//! Owns the [`RoomManager`], one outbox per live connection and the timers
//! each room needs: the start countdown, the periodic time sync and the
//! stale-room sweep. Timers are aborted as soon as their room stops playing
//! or is destroyed.

use crate::config::ServerConfig;
use crate::error::EngineResult;
use crate::network::connection::serve_connection;
use crate::network::packet::ServerMessage;
use crate::network::room::{ConnectionId, RoomCode};
use crate::network::room_manager::{Outcome, RoomEvent, RoomManager};
use crate::time::Clock;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Default)]
struct RoomTimers {
    countdown: Option<JoinHandle<()>>,
    time_sync: Option<JoinHandle<()>>,
}

impl RoomTimers {
    fn abort_all(&mut self) {
        for handle in [self.countdown.take(), self.time_sync.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

pub struct RoomServer {
    manager: RoomManager,
    outboxes: DashMap<ConnectionId, UnboundedSender<ServerMessage>>,
    timers: Mutex<HashMap<RoomCode, RoomTimers>>,
}

impl RoomServer {
    pub fn new(config: ServerConfig, clock: Arc<dyn Clock>) -> Arc<Self> {
        Self::with_manager(RoomManager::new(config, clock))
    }

    pub fn with_manager(manager: RoomManager) -> Arc<Self> {
        Arc::new(Self {
            manager,
            outboxes: DashMap::new(),
            timers: Mutex::new(HashMap::new()),
        })
    }

    pub fn manager(&self) -> &RoomManager {
        &self.manager
    }

    /// Bind the configured address and serve connections
    pub async fn run(self: Arc<Self>) -> EngineResult<()> {
        let listener = TcpListener::bind(&self.manager.config().bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve an already bound listener
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> EngineResult<()> {
        log::info!("Room server listening on {}", listener.local_addr()?);
        let _cleanup = self.spawn_cleanup();

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(server, stream, addr).await {
                            log::debug!("Connection from {} ended with error: {}", addr, err);
                        }
                    });
                }
                Err(err) => {
                    // Usually fd exhaustion; back off instead of spinning
                    log::warn!("Failed to accept connection: {}", err);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    pub(crate) fn register(&self, conn: ConnectionId) -> UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outboxes.insert(conn, tx);
        rx
    }

    pub(crate) fn unregister(&self, conn: ConnectionId) {
        self.outboxes.remove(&conn);
    }

    /// Queue every message and start or stop the timers the events call for
    pub fn deliver(self: &Arc<Self>, outcome: Outcome) {
        for dispatch in outcome.dispatches {
            if let Some(outbox) = self.outboxes.get(&dispatch.to) {
                if outbox.send(dispatch.message).is_err() {
                    log::debug!("Outbox for {} already closed", dispatch.to);
                }
            }
        }
        for event in outcome.events {
            self.apply_event(event);
        }
    }

    fn apply_event(self: &Arc<Self>, event: RoomEvent) {
        match event {
            RoomEvent::CountdownStarted { code, seconds } => {
                let handle = self.spawn_countdown(code.clone(), seconds);
                let mut timers = self.timers.lock();
                let entry = timers.entry(code).or_default();
                if let Some(previous) = entry.countdown.replace(handle) {
                    previous.abort();
                }
            }
            RoomEvent::GameStarted { code } => {
                let handle = self.spawn_time_sync(code.clone());
                let mut timers = self.timers.lock();
                let entry = timers.entry(code).or_default();
                entry.countdown = None;
                if let Some(previous) = entry.time_sync.replace(handle) {
                    previous.abort();
                }
            }
            RoomEvent::GameFinished { code } => {
                if let Some(mut timers) = self.timers.lock().remove(&code) {
                    timers.abort_all();
                }
            }
            RoomEvent::RoomClosed { code } => {
                if let Some(mut timers) = self.timers.lock().remove(&code) {
                    timers.abort_all();
                }
                log::debug!("Timers for room {} cancelled", code);
            }
        }
    }

    fn spawn_countdown(self: &Arc<Self>, code: RoomCode, seconds: u64) -> JoinHandle<()> {
        let server = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            match server.manager.begin_playing(&code) {
                Ok(outcome) => server.deliver(outcome),
                Err(err) => log::debug!("Countdown for {} ended without a game: {}", code, err),
            }
        })
    }

    fn spawn_time_sync(self: &Arc<Self>, code: RoomCode) -> JoinHandle<()> {
        let server = Arc::clone(self);
        let period = Duration::from_secs(server.manager.config().time_sync_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match server.manager.time_sync(&code) {
                    Some(outcome) => server.deliver(outcome),
                    None => break,
                }
            }
        })
    }

    fn spawn_cleanup(self: &Arc<Self>) -> JoinHandle<()> {
        let server = Arc::clone(self);
        let period = Duration::from_secs(server.manager.config().cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let outcome = server.manager.cleanup_stale();
                server.deliver(outcome);
            }
        })
    }

    /// Rooms that currently have a timer attached
    pub fn timed_rooms(&self) -> usize {
        self.timers.lock().len()
    }

    pub fn connection_count(&self) -> usize {
        self.outboxes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::packet::{ClientMessage, Packet};
    use crate::network::room::RoomStatus;
    use crate::time::SystemClock;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::TcpStream;

    struct TestClient {
        lines: Lines<BufReader<OwnedReadHalf>>,
        writer: OwnedWriteHalf,
    }

    impl TestClient {
        async fn connect(addr: std::net::SocketAddr) -> Self {
            let stream = TcpStream::connect(addr).await.expect("connect");
            let (reader, writer) = stream.into_split();
            Self {
                lines: BufReader::new(reader).lines(),
                writer,
            }
        }

        async fn send(&mut self, message: &ClientMessage) {
            let line = message.to_json_line().expect("encode");
            self.writer.write_all(line.as_bytes()).await.expect("write");
        }

        async fn send_raw(&mut self, bytes: &[u8]) {
            self.writer.write_all(bytes).await.expect("write");
        }

        /// Read until a message matches, skipping the rest
        async fn expect<F>(&mut self, mut pred: F) -> ServerMessage
        where
            F: FnMut(&ServerMessage) -> bool,
        {
            let read = async {
                loop {
                    let line = self
                        .lines
                        .next_line()
                        .await
                        .expect("read")
                        .expect("connection open");
                    let message = ServerMessage::from_json(&line).expect("decode");
                    if pred(&message) {
                        return message;
                    }
                }
            };
            tokio::time::timeout(Duration::from_secs(5), read)
                .await
                .expect("message in time")
        }
    }

    async fn start_server(config: ServerConfig) -> (Arc<RoomServer>, std::net::SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = RoomServer::new(config, Arc::new(SystemClock));
        tokio::spawn(Arc::clone(&server).serve(listener));
        (server, addr)
    }

    fn fast_config() -> ServerConfig {
        ServerConfig {
            countdown_secs: 0,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_room_lifecycle_over_tcp() {
        let (server, addr) = start_server(fast_config()).await;
        let mut host = TestClient::connect(addr).await;
        let mut guest = TestClient::connect(addr).await;

        host.send(&ClientMessage::CreateRoom {
            name: "host".to_string(),
        })
        .await;
        let code = match host
            .expect(|m| matches!(m, ServerMessage::RoomCreated { .. }))
            .await
        {
            ServerMessage::RoomCreated { room, .. } => room.code,
            _ => unreachable!(),
        };

        guest
            .send(&ClientMessage::JoinRoom {
                code: code.to_string(),
                name: "guest".to_string(),
            })
            .await;
        guest
            .expect(|m| matches!(m, ServerMessage::RoomJoined { .. }))
            .await;
        guest.send(&ClientMessage::SetReady { ready: true }).await;
        host.expect(|m| match m {
            ServerMessage::RoomUpdate { room } => room.players.iter().all(|p| p.is_host || p.ready),
            _ => false,
        })
        .await;

        host.send(&ClientMessage::StartGame).await;
        guest
            .expect(|m| matches!(m, ServerMessage::GameStarted { .. }))
            .await;
        guest
            .expect(|m| matches!(m, ServerMessage::TimeSync { .. }))
            .await;
        assert_eq!(
            server.manager().snapshot(&code).map(|r| r.status),
            Some(RoomStatus::Playing)
        );

        guest
            .send(&ClientMessage::BlockBreak { x: 1, y: 20, z: 1 })
            .await;
        for client in [&mut host, &mut guest] {
            match client
                .expect(|m| matches!(m, ServerMessage::BlockChanged { .. }))
                .await
            {
                ServerMessage::BlockChanged { change } => assert_eq!(change.tick, 1),
                _ => unreachable!(),
            }
        }
        assert_eq!(server.timed_rooms(), 1);
    }

    #[tokio::test]
    async fn test_malformed_line_keeps_connection_open() {
        let (_server, addr) = start_server(fast_config()).await;
        let mut client = TestClient::connect(addr).await;

        client.send_raw(b"this is not json\n").await;
        match client
            .expect(|m| matches!(m, ServerMessage::Error { .. }))
            .await
        {
            ServerMessage::Error { code, .. } => {
                assert_eq!(code, crate::network::error::ErrorCode::MalformedMessage)
            }
            _ => unreachable!(),
        }

        client
            .send(&ClientMessage::CreateRoom {
                name: "still here".to_string(),
            })
            .await;
        client
            .expect(|m| matches!(m, ServerMessage::RoomCreated { .. }))
            .await;
    }

    #[tokio::test]
    async fn test_garbage_bytes_and_huge_lines_are_rejected_not_fatal() {
        use crate::network::error::ErrorCode;
        use crate::network::protocol::MAX_LINE_LENGTH;

        let (server, addr) = start_server(fast_config()).await;
        let mut client = TestClient::connect(addr).await;

        client.send_raw(b"\xff\xfe\n").await;
        let huge = format!("{}\n", "a".repeat(MAX_LINE_LENGTH + 10));
        client.send_raw(huge.as_bytes()).await;
        for _ in 0..2 {
            match client
                .expect(|m| matches!(m, ServerMessage::Error { .. }))
                .await
            {
                ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::MalformedMessage),
                _ => unreachable!(),
            }
        }

        client
            .send(&ClientMessage::CreateRoom {
                name: "survivor".to_string(),
            })
            .await;
        client
            .expect(|m| matches!(m, ServerMessage::RoomCreated { .. }))
            .await;
        assert_eq!(server.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_dropped_connection_marks_player_disconnected() {
        let (server, addr) = start_server(fast_config()).await;
        let mut host = TestClient::connect(addr).await;
        let mut guest = TestClient::connect(addr).await;

        host.send(&ClientMessage::CreateRoom {
            name: "host".to_string(),
        })
        .await;
        let code = match host
            .expect(|m| matches!(m, ServerMessage::RoomCreated { .. }))
            .await
        {
            ServerMessage::RoomCreated { room, .. } => room.code,
            _ => unreachable!(),
        };
        guest
            .send(&ClientMessage::JoinRoom {
                code: code.to_string(),
                name: "guest".to_string(),
            })
            .await;
        let token = match guest
            .expect(|m| matches!(m, ServerMessage::RoomJoined { .. }))
            .await
        {
            ServerMessage::RoomJoined { token, .. } => token,
            _ => unreachable!(),
        };

        drop(guest);
        host.expect(|m| match m {
            ServerMessage::RoomUpdate { room } => room.players.iter().any(|p| !p.connected),
            _ => false,
        })
        .await;
        assert_eq!(server.manager().snapshot(&code).map(|r| r.players.len()), Some(2));

        let mut back = TestClient::connect(addr).await;
        back.send(&ClientMessage::Reconnect { token }).await;
        back.expect(|m| matches!(m, ServerMessage::Reconnected { .. }))
            .await;
    }
}
