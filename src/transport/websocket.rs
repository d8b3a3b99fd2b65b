//! WebSocket transport
//!
//! Translates JSON frames into relay operations. Responsibilities:
//! - Accept TCP/WebSocket connections
//! - Create a `Client` per connection and hand it to the relay, which queues
//!   the history backlog before anything else
//! - Run one writer task per connection that drains its outbound channel, so
//!   a slow socket never holds up the relay
//! - Parse client frames and report refusals back as `error` events
//! - Unregister the connection when the socket closes

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Client, ConnectionId};
use crate::relay::message::Submission;
use crate::relay::{Relay, SharedRelay, lock_relay};
use crate::transport::message::ClientMessage;
use crate::utils::RelayError;

/// Bind `addr` and serve connections until the listener fails.
pub async fn start_websocket_server(addr: &str, relay: SharedRelay) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket relay listening on ws://{}", listener.local_addr()?);
    serve(listener, relay).await;
    Ok(())
}

/// Accept connections from an already bound listener.
pub async fn serve(listener: TcpListener, relay: SharedRelay) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                spawn(handle_connection(stream, peer, relay.clone()));
            }
            Err(e) => {
                warn!("failed to accept connection: {e}");
                return;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, relay: SharedRelay) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {peer} failed: {e}");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    let client_id = client.id.clone();
    info!("{client_id} connected from {peer}");

    lock_relay(&relay).on_connect(client);

    {
        let client_id = client_id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    debug!("failed to send to {client_id}: {e}");
                    break;
                }
            }
            let _ = ws_sender.close().await;
            debug!("send loop closed for {client_id}");
        });
    }

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!("{client_id} read error: {e}");
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        let mut guard = lock_relay(&relay);
        handle_client_text(&mut guard, &client_id, text);
    }

    // dropping the client's sender ends the writer task
    lock_relay(&relay).on_disconnect(&client_id);
}

/// Parse one text frame from `client_id` and apply it, answering refusals
/// with an `error` event to that connection only.
pub fn handle_client_text(relay: &mut Relay, client_id: &ConnectionId, text: &str) {
    let result = serde_json::from_str::<ClientMessage>(text)
        .map_err(|e| RelayError::InvalidFrame(e.to_string()))
        .and_then(|msg| handle_client_message(relay, client_id, msg));

    if let Err(e) = result {
        warn!(
            "rejected frame from {client_id}: {e} | {}",
            text.chars().take(100).collect::<String>()
        );
        relay.notify_error(client_id, &e);
    }
}

pub fn handle_client_message(
    relay: &mut Relay,
    client_id: &ConnectionId,
    msg: ClientMessage,
) -> Result<(), RelayError> {
    match msg {
        ClientMessage::SetUsername { username } => relay.on_declare_identity(client_id, username),
        ClientMessage::JoinRoom { room } => {
            relay.join_room(client_id, &room);
            Ok(())
        }
        ClientMessage::LeaveRoom { room } => {
            relay.leave_room(client_id, &room);
            Ok(())
        }
        ClientMessage::Submit {
            sender,
            message,
            target,
            room,
        } => {
            let submission = Submission {
                sender,
                body: message,
                target,
                room,
            };
            relay.on_submit(client_id, submission).map(|_| ())
        }
    }
}
