//! WebSocket end of a terminal session: authorization gate, then a duplex
//! byte relay between the socket and the PTY until either side terminates.

use crate::server::AppState;
use crate::terminal::session::{default_shell, ShellSession};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

/// `GET /ws/terminal`. The bearer check runs before the upgrade completes,
/// so unauthorized clients never cause a shell process to be spawned.
pub async fn terminal_ws(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    if let Err(e) = state.authorizer.check(&headers) {
        return e.into_response();
    }
    let Some(ws) = ws else {
        return (StatusCode::BAD_REQUEST, "websocket upgrade required").into_response();
    };
    let workdir = state.root.path().to_path_buf();
    let shell = state
        .cfg
        .terminal
        .shell
        .clone()
        .unwrap_or_else(default_shell);
    ws.on_upgrade(move |socket| bridge(socket, workdir, shell))
}

async fn bridge(mut socket: WebSocket, workdir: PathBuf, shell: String) {
    let conn = Uuid::new_v4();
    let mut session = match ShellSession::spawn(&workdir, &shell) {
        Ok(s) => s,
        Err(e) => {
            warn!(conn = %conn, shell = %shell, error = %e, "shell spawn failed, closing connection");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    info!(conn = %conn, pid = ?session.process_id(), shell = %shell, "terminal session opened");

    let input = session.writer();
    let mut output = match session.take_output() {
        Some(rx) => rx,
        None => return,
    };
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            chunk = output.recv() => match chunk {
                Some(data) => {
                    if ws_tx.send(Message::Binary(data.to_vec())).await.is_err() {
                        break;
                    }
                }
                None => {
                    // shell exited on its own; close the peer rather than
                    // leaving the connection dangling
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            },
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Binary(data))) => {
                    if input.send(Bytes::from(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Text(text))) => {
                    if input.send(Bytes::from(text)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break,
            },
        }
    }

    info!(conn = %conn, exited = session.has_exited(), "terminal session closed");
    // session drops here; a still-running shell is killed and reaped
}
