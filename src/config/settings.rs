use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the WebSocket server, the relay core, durable
/// storage and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub storage: StorageSettings,
    pub log: LogSettings,
}

/// Host and port the WebSocket server binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// What the relay does when the durable buffer is at capacity.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest unflushed message to make room.
    DropOldest,
    /// Refuse the new message and report the error to its sender.
    RejectNew,
}

/// Configuration for buffering, replay and the flush cycle.
#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    pub flush_interval_secs: u64,
    pub flush_timeout_secs: u64,
    pub max_buffered_messages: usize,
    pub overflow_policy: OverflowPolicy,
    pub history_limit: usize,
    pub validate_identities: bool,
}

/// Location and retention of the sled database.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub path: String,
    pub max_stored_messages: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values are filled from
/// `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
    pub storage: Option<PartialStorageSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRelaySettings {
    pub flush_interval_secs: Option<u64>,
    pub flush_timeout_secs: Option<u64>,
    pub max_buffered_messages: Option<usize>,
    pub overflow_policy: Option<OverflowPolicy>,
    pub history_limit: Option<usize>,
    pub validate_identities: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PartialStorageSettings {
    pub path: Option<String>,
    pub max_stored_messages: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            relay: RelaySettings::default(),
            storage: StorageSettings {
                path: "chatrelay_db".to_string(),
                max_stored_messages: None,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            flush_interval_secs: 60,
            flush_timeout_secs: 10,
            max_buffered_messages: 10_000,
            overflow_policy: OverflowPolicy::DropOldest,
            history_limit: 500,
            validate_identities: false,
        }
    }
}

impl Settings {
    /// Fill every missing field of `partial` from the defaults.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let server = partial.server;
        let relay = partial.relay;
        let storage = partial.storage;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
            },
            relay: RelaySettings {
                flush_interval_secs: relay
                    .as_ref()
                    .and_then(|r| r.flush_interval_secs)
                    .unwrap_or(default.relay.flush_interval_secs),
                flush_timeout_secs: relay
                    .as_ref()
                    .and_then(|r| r.flush_timeout_secs)
                    .unwrap_or(default.relay.flush_timeout_secs),
                max_buffered_messages: relay
                    .as_ref()
                    .and_then(|r| r.max_buffered_messages)
                    .unwrap_or(default.relay.max_buffered_messages),
                overflow_policy: relay
                    .as_ref()
                    .and_then(|r| r.overflow_policy)
                    .unwrap_or(default.relay.overflow_policy),
                history_limit: relay
                    .as_ref()
                    .and_then(|r| r.history_limit)
                    .unwrap_or(default.relay.history_limit),
                validate_identities: relay
                    .as_ref()
                    .and_then(|r| r.validate_identities)
                    .unwrap_or(default.relay.validate_identities),
            },
            storage: StorageSettings {
                path: storage
                    .as_ref()
                    .and_then(|s| s.path.clone())
                    .unwrap_or(default.storage.path),
                max_stored_messages: storage
                    .as_ref()
                    .and_then(|s| s.max_stored_messages)
                    .or(default.storage.max_stored_messages),
            },
            log: LogSettings {
                level: partial
                    .log
                    .and_then(|l| l.level)
                    .unwrap_or(default.log.level),
            },
        }
    }
}
