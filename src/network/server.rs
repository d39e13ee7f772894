use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::dataset::SortField;
use crate::error::MetricsError;
use crate::protocol::{ClientRequest, ServerMessage};
use crate::session::manager::SessionManager;
use crate::session::SessionId;

/// Session cache shared by every connection.
pub type SharedSessions = Arc<Mutex<SessionManager>>;

/// Channel for sending serialized frames to one connected client.
type FrameTx = mpsc::UnboundedSender<Vec<u8>>;

pub(crate) fn lock(sessions: &SharedSessions) -> MutexGuard<'_, SessionManager> {
    // A panic while holding the lock leaves the cache usable.
    sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Accept WebSocket clients forever. Each connection gets its own session
/// and is served on a spawned task.
pub async fn run(addr: SocketAddr, sessions: SharedSessions) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Dashboard server listening on ws://{}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Accept error: {}", e);
                continue;
            }
        };
        info!("Client connected from {}", peer);
        let sessions = sessions.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, sessions).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, sessions: SharedSessions) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    let (mut ws_write, mut ws_read) = ws_stream.split();

    // ── Write task ──────────────────────────────────────────────
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let writer = tokio::spawn(async move {
        while let Some(bytes) = frame_rx.recv().await {
            if let Err(e) = ws_write.send(Message::Binary(bytes.into())).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    let opened = {
        let mut manager = lock(&sessions);
        manager
            .open()
            .and_then(|id| welcome(&manager, id).map(|msg| (id, msg)))
    };
    let mut session_id = match opened {
        Ok((id, msg)) => {
            send_message(&frame_tx, &msg);
            id
        }
        Err(e) => {
            error!("Could not open session for {}: {}", peer, e);
            send_message(&frame_tx, &ServerMessage::from(e));
            drop(frame_tx);
            let _ = writer.await;
            return;
        }
    };

    // ── Read loop ───────────────────────────────────────────────
    while let Some(result) = ws_read.next().await {
        match result {
            Ok(msg) if msg.is_binary() => {
                let data = msg.into_data();
                let request = match rmp_serde::from_slice::<ClientRequest>(&data) {
                    Ok(request) => request,
                    Err(e) => {
                        warn!("Failed to decode ClientRequest from {}: {}", peer, e);
                        continue;
                    }
                };
                debug!("Session {} request: {:?}", session_id, request);
                let reply = {
                    let mut manager = lock(&sessions);
                    dispatch(&mut manager, &mut session_id, request)
                };
                send_message(&frame_tx, &reply);
            }
            Ok(msg) if msg.is_close() => break,
            Ok(_) => {}
            Err(e) => {
                error!("WebSocket read error from {}: {}", peer, e);
                break;
            }
        }
    }

    lock(&sessions).detach(session_id);
    drop(frame_tx);
    let _ = writer.await;
    info!("Client {} disconnected (session {})", peer, session_id);
}

fn send_message(tx: &FrameTx, msg: &ServerMessage) {
    match rmp_serde::to_vec_named(msg) {
        Ok(bytes) => {
            if tx.send(bytes).is_err() {
                warn!("Client disconnected, dropping message");
            }
        }
        Err(e) => error!("Failed to serialize ServerMessage: {}", e),
    }
}

fn welcome(manager: &SessionManager, session_id: SessionId) -> Result<ServerMessage, MetricsError> {
    let session = manager.get(session_id)?;
    let config = session.config();
    Ok(ServerMessage::Welcome {
        session_id,
        title: config.title.clone(),
        metric: config.metric.clone(),
        periods: config.periods.clone(),
        districts: session
            .table()
            .records()
            .iter()
            .map(|r| r.name.clone())
            .collect(),
        generation: session.generation(),
    })
}

/// Apply one request to the connection's current session. Errors come back
/// as `ServerMessage::Error` rather than closing the connection.
pub fn dispatch(
    manager: &mut SessionManager,
    session_id: &mut SessionId,
    request: ClientRequest,
) -> ServerMessage {
    handle_request(manager, session_id, request).unwrap_or_else(ServerMessage::from)
}

fn handle_request(
    manager: &mut SessionManager,
    session_id: &mut SessionId,
    request: ClientRequest,
) -> Result<ServerMessage, MetricsError> {
    match request {
        ClientRequest::Resume { session_id: id } => {
            if id == *session_id {
                manager.get_mut(id)?;
            } else {
                manager.attach(id)?;
                manager.detach(*session_id);
                *session_id = id;
            }
            welcome(manager, id)
        }
        ClientRequest::Table => Ok(ServerMessage::Table(manager.get_mut(*session_id)?.snapshot())),
        ClientRequest::Sort { field, direction } => {
            let field: SortField = field.parse()?;
            let session = manager.get_mut(*session_id)?;
            session.set_sort(field, direction);
            Ok(ServerMessage::Table(session.snapshot()))
        }
        ClientRequest::Select { name } => {
            let session = manager.get_mut(*session_id)?;
            let record = session.select(&name)?;
            Ok(ServerMessage::District {
                progress: record.progress(),
                record: record.clone(),
            })
        }
        ClientRequest::Summary => Ok(ServerMessage::Summary(manager.get_mut(*session_id)?.summary())),
        ClientRequest::Chart => Ok(ServerMessage::Chart(manager.get_mut(*session_id)?.chart())),
        ClientRequest::Regenerate => {
            let session = manager.get_mut(*session_id)?;
            session.regenerate()?;
            Ok(ServerMessage::Table(session.snapshot()))
        }
        ClientRequest::Recompute => {
            let session = manager.get_mut(*session_id)?;
            session.recompute();
            Ok(ServerMessage::Table(session.snapshot()))
        }
    }
}
