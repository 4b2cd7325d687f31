//! Room service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use crate::actors::RoomSettings;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address (API, WebSocket, health and metrics).
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:9000";

/// Default Redis key prefix for room records.
pub const DEFAULT_REDIS_PREFIX_ROOM: &str = "room:";

/// Default Redis key prefix for session hashes.
pub const DEFAULT_REDIS_PREFIX_SESSION: &str = "sessions:";

/// Default length of generated room IDs.
pub const DEFAULT_ROOM_ID_LENGTH: usize = 10;

/// Default number of broadcasts replayed to new peers.
pub const DEFAULT_MAX_CACHED_MESSAGES: usize = 50;

/// Default maximum inbound frame size in bytes.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 2048;

/// Default maximum peer handle length in characters.
pub const DEFAULT_MAX_HANDLE_LENGTH: usize = 30;

/// Default per-write WebSocket timeout in seconds.
pub const DEFAULT_WS_TIMEOUT_SECONDS: u64 = 5;

/// Default per-peer outbound mailbox capacity.
pub const DEFAULT_MAX_MESSAGE_QUEUE: usize = 32;

/// Default rate limit window in milliseconds.
pub const DEFAULT_RATE_LIMIT_INTERVAL_MS: u64 = 1000;

/// Default number of messages allowed per rate limit window.
pub const DEFAULT_RATE_LIMIT_MESSAGES: u64 = 10;

/// Default maximum number of concurrently active rooms.
pub const DEFAULT_MAX_ROOMS: usize = 1000;

/// Default maximum number of peers in one room.
pub const DEFAULT_MAX_PEERS_PER_ROOM: usize = 50;

/// Default idle period after which a room disposes itself (seconds).
pub const DEFAULT_ROOM_TIMEOUT_SECONDS: u64 = 1200;

/// Default lifetime of persisted room and session records (seconds).
pub const DEFAULT_ROOM_AGE_SECONDS: u64 = 86_400;

/// Default session cookie name.
pub const DEFAULT_SESSION_COOKIE: &str = "hushsess";

/// Default bcrypt cost for room passwords.
pub const DEFAULT_BCRYPT_COST: u32 = 8;

/// Lowest bcrypt cost accepted by `HUSH_BCRYPT_COST`.
pub const MIN_BCRYPT_COST: u32 = 4;

/// Highest bcrypt cost accepted by `HUSH_BCRYPT_COST`.
pub const MAX_BCRYPT_COST: u32 = 31;

/// Which persistence backend the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

impl StoreBackend {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(ConfigError::InvalidValue(format!(
                "HUSH_STORE must be 'memory' or 'redis', got '{other}'"
            ))),
        }
    }
}

/// Room service configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// HTTP bind address (default: "0.0.0.0:9000").
    pub bind_address: String,

    /// Persistence backend (default: memory).
    pub store_backend: StoreBackend,

    /// Redis connection URL. Required when `store_backend` is Redis.
    /// Protected by `SecretString` to prevent accidental logging.
    pub redis_url: Option<SecretString>,

    /// Redis key prefix for room records.
    pub redis_prefix_room: String,

    /// Redis key prefix for session hashes.
    pub redis_prefix_session: String,

    /// Length of generated room IDs.
    pub room_id_length: usize,

    /// Replay cache capacity per room (0 disables replay).
    pub max_cached_messages: usize,

    /// Maximum inbound frame size in bytes.
    pub max_message_length: usize,

    /// Maximum peer handle length in characters.
    pub max_handle_length: usize,

    /// Timeout applied to every outbound WebSocket write.
    pub ws_timeout: Duration,

    /// Outbound mailbox capacity per peer.
    pub max_message_queue: usize,

    /// Rate limit window.
    pub rate_limit_interval: Duration,

    /// Messages allowed per rate limit window.
    pub rate_limit_messages: u64,

    /// Maximum number of concurrently active rooms.
    pub max_rooms: usize,

    /// Maximum number of peers in one room.
    pub max_peers_per_room: usize,

    /// Idle period after which a room disposes itself.
    pub room_timeout: Duration,

    /// TTL of persisted room and session records.
    pub room_age: Duration,

    /// Name of the session cookie.
    pub session_cookie: String,

    /// bcrypt cost for room passwords.
    pub bcrypt_cost: u32,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("store_backend", &self.store_backend)
            .field(
                "redis_url",
                &self.redis_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redis_prefix_room", &self.redis_prefix_room)
            .field("redis_prefix_session", &self.redis_prefix_session)
            .field("room_id_length", &self.room_id_length)
            .field("max_cached_messages", &self.max_cached_messages)
            .field("max_message_length", &self.max_message_length)
            .field("max_handle_length", &self.max_handle_length)
            .field("ws_timeout", &self.ws_timeout)
            .field("max_message_queue", &self.max_message_queue)
            .field("rate_limit_interval", &self.rate_limit_interval)
            .field("rate_limit_messages", &self.rate_limit_messages)
            .field("max_rooms", &self.max_rooms)
            .field("max_peers_per_room", &self.max_peers_per_room)
            .field("room_timeout", &self.room_timeout)
            .field("room_age", &self.room_age)
            .field("session_cookie", &self.session_cookie)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

fn parse_or<T: std::str::FromStr>(vars: &HashMap<String, String>, key: &str, default: T) -> T {
    vars.get(key)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("HUSH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let store_backend = match vars.get("HUSH_STORE") {
            Some(value) => StoreBackend::parse(value)?,
            None => StoreBackend::Memory,
        };

        let redis_url = vars.get("REDIS_URL").cloned().map(SecretString::from);
        if store_backend == StoreBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingEnvVar("REDIS_URL".to_string()));
        }

        let redis_prefix_room = vars
            .get("HUSH_REDIS_PREFIX_ROOM")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIS_PREFIX_ROOM.to_string());

        let redis_prefix_session = vars
            .get("HUSH_REDIS_PREFIX_SESSION")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIS_PREFIX_SESSION.to_string());

        let room_id_length = parse_or(vars, "HUSH_ROOM_ID_LENGTH", DEFAULT_ROOM_ID_LENGTH);
        let max_cached_messages =
            parse_or(vars, "HUSH_MAX_CACHED_MESSAGES", DEFAULT_MAX_CACHED_MESSAGES);
        let max_message_length =
            parse_or(vars, "HUSH_MAX_MESSAGE_LENGTH", DEFAULT_MAX_MESSAGE_LENGTH);
        let max_handle_length = parse_or(vars, "HUSH_MAX_HANDLE_LENGTH", DEFAULT_MAX_HANDLE_LENGTH);
        let ws_timeout_seconds =
            parse_or(vars, "HUSH_WS_TIMEOUT_SECONDS", DEFAULT_WS_TIMEOUT_SECONDS);
        let max_message_queue = parse_or(vars, "HUSH_MAX_MESSAGE_QUEUE", DEFAULT_MAX_MESSAGE_QUEUE);
        let rate_limit_interval_ms = parse_or(
            vars,
            "HUSH_RATE_LIMIT_INTERVAL_MS",
            DEFAULT_RATE_LIMIT_INTERVAL_MS,
        );
        let rate_limit_messages =
            parse_or(vars, "HUSH_RATE_LIMIT_MESSAGES", DEFAULT_RATE_LIMIT_MESSAGES);
        let max_rooms = parse_or(vars, "HUSH_MAX_ROOMS", DEFAULT_MAX_ROOMS);
        let max_peers_per_room =
            parse_or(vars, "HUSH_MAX_PEERS_PER_ROOM", DEFAULT_MAX_PEERS_PER_ROOM);
        let room_timeout_seconds =
            parse_or(vars, "HUSH_ROOM_TIMEOUT_SECONDS", DEFAULT_ROOM_TIMEOUT_SECONDS);
        let room_age_seconds = parse_or(vars, "HUSH_ROOM_AGE_SECONDS", DEFAULT_ROOM_AGE_SECONDS);

        let session_cookie = vars
            .get("HUSH_SESSION_COOKIE")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());

        let bcrypt_cost = parse_or(vars, "HUSH_BCRYPT_COST", DEFAULT_BCRYPT_COST);

        // Values that would make the room loop spin or never admit anyone.
        if room_id_length == 0 {
            return Err(ConfigError::InvalidValue(
                "HUSH_ROOM_ID_LENGTH must be greater than 0".to_string(),
            ));
        }
        if max_message_queue == 0 {
            return Err(ConfigError::InvalidValue(
                "HUSH_MAX_MESSAGE_QUEUE must be greater than 0".to_string(),
            ));
        }
        if rate_limit_messages == 0 {
            return Err(ConfigError::InvalidValue(
                "HUSH_RATE_LIMIT_MESSAGES must be greater than 0".to_string(),
            ));
        }
        if room_timeout_seconds == 0 || room_age_seconds == 0 || ws_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "room timeout, room age and websocket timeout must be at least 1 second"
                    .to_string(),
            ));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "HUSH_BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"
            )));
        }

        Ok(Config {
            bind_address,
            store_backend,
            redis_url,
            redis_prefix_room,
            redis_prefix_session,
            room_id_length,
            max_cached_messages,
            max_message_length,
            max_handle_length,
            ws_timeout: Duration::from_secs(ws_timeout_seconds),
            max_message_queue,
            rate_limit_interval: Duration::from_millis(rate_limit_interval_ms),
            rate_limit_messages,
            max_rooms,
            max_peers_per_room,
            room_timeout: Duration::from_secs(room_timeout_seconds),
            room_age: Duration::from_secs(room_age_seconds),
            session_cookie,
            bcrypt_cost,
        })
    }

    /// Settings consumed by the hub and the room/peer actors.
    #[must_use]
    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            room_id_length: self.room_id_length,
            max_cached_messages: self.max_cached_messages,
            ws_timeout: self.ws_timeout,
            max_message_queue: self.max_message_queue,
            rate_limit_interval: self.rate_limit_interval,
            rate_limit_messages: self.rate_limit_messages,
            max_rooms: self.max_rooms,
            max_peers_per_room: self.max_peers_per_room,
            room_timeout: self.room_timeout,
            room_age: self.room_age,
        }
    }
}
