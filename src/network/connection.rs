//! One client connection: newline-delimited JSON in, queued JSON lines out

use crate::network::error::RoomError;
use crate::network::packet::{ClientMessage, Packet, ServerMessage};
use crate::network::protocol::MAX_LINE_LENGTH;
use crate::network::room::ConnectionId;
use crate::network::server::RoomServer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;

/// Drive a connection until the peer hangs up
pub(crate) async fn serve_connection(
    server: Arc<RoomServer>,
    stream: TcpStream,
    addr: SocketAddr,
) -> std::io::Result<()> {
    stream.set_nodelay(true)?; // Disable Nagle's algorithm
    let conn = server.manager().next_connection_id();
    log::info!("Connection {} opened from {}", conn, addr);

    let (reader, writer) = stream.into_split();
    let outbox = server.register(conn);
    let writer_task = tokio::spawn(write_loop(conn, writer, outbox));

    let result = read_loop(&server, conn, reader).await;

    // The player stays in their room; only the connected flag changes
    let outcome = server.manager().disconnect(conn);
    server.unregister(conn);
    server.deliver(outcome);
    if writer_task.await.is_err() {
        log::debug!("Writer for {} did not finish cleanly", conn);
    }
    log::info!("Connection {} closed", conn);
    result
}

async fn read_loop(
    server: &Arc<RoomServer>,
    conn: ConnectionId,
    reader: OwnedReadHalf,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        // One byte past the limit tells an oversized line from a full one
        let read = (&mut reader)
            .take(MAX_LINE_LENGTH as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(());
        }
        if buf.last() != Some(&b'\n') && buf.len() > MAX_LINE_LENGTH {
            skip_line(&mut reader).await?;
            server.deliver(server.manager().reject(conn, oversized()));
            continue;
        }

        let outcome = match std::str::from_utf8(&buf) {
            Ok(text) if text.trim().is_empty() => continue,
            Ok(text) => match decode(text.trim()) {
                Ok(message) => {
                    log::trace!("{} -> {:?}", conn, message);
                    server.manager().handle(conn, message)
                }
                Err(err) => server.manager().reject(conn, err),
            },
            Err(err) => server.manager().reject(
                conn,
                RoomError::Malformed {
                    reason: format!("message is not UTF-8: {}", err),
                },
            ),
        };
        server.deliver(outcome);
    }
}

/// Drop everything up to and including the next newline
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}

fn oversized() -> RoomError {
    RoomError::Malformed {
        reason: format!("message exceeds {} bytes", MAX_LINE_LENGTH),
    }
}

fn decode(line: &str) -> Result<ClientMessage, RoomError> {
    if line.len() > MAX_LINE_LENGTH {
        return Err(oversized());
    }
    ClientMessage::from_json(line).map_err(|err| RoomError::Malformed {
        reason: err.to_string(),
    })
}

async fn write_loop(
    conn: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut outbox: UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = outbox.recv().await {
        let line = match message.to_json_line() {
            Ok(line) => line,
            Err(err) => {
                log::error!("Failed to encode message for {}: {}", conn, err);
                continue;
            }
        };
        if let Err(err) = writer.write_all(line.as_bytes()).await {
            log::debug!("Write to {} failed: {}", conn, err);
            break;
        }
    }
    let _ = writer.shutdown().await;
}
