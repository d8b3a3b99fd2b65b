//! CLI for chatrelay
//!
//! Subcommands:
//! - `server`: run the WebSocket relay
//! - `add-user`: record a username for identity validation
//! - `client`: connect, send one message and print the replies (smoke test)

use std::sync::Arc;
use std::time::Duration;

use chatrelay::config::{Settings, load_config};
use chatrelay::persistence::{MessageStore, SledStore};
use chatrelay::relay::{FlushOutcome, Relay, flush_once, restore_history, run_flush_loop};
use chatrelay::transport::start_websocket_server;
use chatrelay::utils::logging;
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "chatrelay")]
enum Command {
    /// Start the WebSocket relay
    Server,
    /// Record a username so it passes identity validation
    AddUser { username: String },
    /// Run a small client: declare a username, send a message, print replies
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:3000")]
        url: String,
        #[arg(long, default_value = "guest")]
        username: String,
        /// Deliver only to this user instead of broadcasting
        #[arg(long)]
        target: Option<String>,
        #[arg(long, default_value = "Hello from chatrelay")]
        message: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cmd = Command::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&settings.log.level);

    let result = match cmd {
        Command::Server => run_server(settings).await,
        Command::AddUser { username } => add_user(&settings, &username),
        Command::Client {
            url,
            username,
            target,
            message,
        } => run_client(&url, &username, target, &message).await,
    };

    if let Err(e) = result {
        error!("chatrelay failed: {e}");
        std::process::exit(1);
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let store = Arc::new(SledStore::open(
        &settings.storage.path,
        settings.storage.max_stored_messages,
    )?);

    let mut relay = Relay::new(&settings.relay);
    if settings.relay.validate_identities {
        relay = relay.with_directory(store.clone());
    }
    let relay = relay.shared();
    let message_store: Arc<dyn MessageStore> = store;

    restore_history(&relay, &message_store).await;

    let period = Duration::from_secs(settings.relay.flush_interval_secs.max(1));
    let write_timeout = Duration::from_secs(settings.relay.flush_timeout_secs.max(1));
    let flusher = tokio::spawn(run_flush_loop(
        relay.clone(),
        message_store.clone(),
        period,
        write_timeout,
    ));

    tokio::select! {
        res = start_websocket_server(&addr, relay.clone()) => {
            match res {
                Ok(()) => error!("WebSocket server exited unexpectedly."),
                Err(e) => error!("WebSocket server failed: {e}"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Flushing and exiting.");
        }
    }

    flusher.abort();
    if let FlushOutcome::Failed(count) = flush_once(&relay, &message_store, write_timeout).await {
        warn!("{count} buffered messages could not be persisted before exit");
    }

    Ok(())
}

fn add_user(settings: &Settings, username: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = SledStore::open(&settings.storage.path, settings.storage.max_stored_messages)?;
    if store.add_user(username)? {
        info!("added user {username}");
    } else {
        info!("user {username} already exists");
    }
    Ok(())
}

async fn run_client(
    url: &str,
    username: &str,
    target: Option<String>,
    message: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    // 1. Backlog
    if let Some(Ok(WsMessage::Text(backlog))) = ws_stream.next().await {
        println!("History: {backlog}");
    }

    // 2. Declare identity
    let declare = json!({ "type": "set-username", "username": username });
    ws_stream
        .send(WsMessage::Text(declare.to_string().into()))
        .await?;

    // 3. Send
    let mut submit = json!({ "type": "msg-event", "message": message });
    if let Some(target) = target {
        submit["target"] = json!(target);
    }
    ws_stream
        .send(WsMessage::Text(submit.to_string().into()))
        .await?;

    // 4. Print whatever arrives within a second
    while let Ok(Some(Ok(frame))) =
        tokio::time::timeout(Duration::from_secs(1), ws_stream.next()).await
    {
        if let WsMessage::Text(text) = frame {
            println!("Received: {text}");
        }
    }

    ws_stream.close(None).await?;
    Ok(())
}
