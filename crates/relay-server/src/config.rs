//! Server configuration.
//!
//! Resolution order, lowest to highest priority:
//! 1. Compiled [`ServerConfig::default()`]
//! 2. An optional JSON file, deep-merged over the defaults
//! 3. `RELAY_*` environment variables
//! 4. Command-line flags (applied by the binary)

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ServerError;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 9001;
/// Default idle timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 16;
/// Default max inbound message size (100 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;
/// Default per-connection outbound queue capacity.
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 1024;

/// Configuration for the relay server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` picks an ephemeral port).
    pub port: u16,
    /// Close a connection after this many seconds without inbound frames.
    pub idle_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound messages buffered per client before new ones are dropped.
    pub send_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            send_queue_capacity: DEFAULT_SEND_QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// `host:port` as a bind address string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Idle timeout as a `Duration`.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Interval between server pings and idle checks: half the idle timeout.
    pub fn ping_interval(&self) -> Duration {
        (self.idle_timeout() / 2).max(Duration::from_millis(500))
    }
}

/// Load configuration from defaults, an optional file, and the environment.
///
/// A path that was given but cannot be read is an error, as is invalid JSON.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ServerError> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => ServerConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

fn load_file(path: &Path) -> Result<ServerConfig, ServerError> {
    debug!(?path, "loading config file");
    let parse_err = |source| ServerError::ConfigParse {
        path: path.to_path_buf(),
        source,
    };
    let content = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    let defaults = serde_json::to_value(ServerConfig::default()).map_err(parse_err)?;
    let user: Value = serde_json::from_str(&content).map_err(parse_err)?;
    serde_json::from_value(deep_merge(defaults, user)).map_err(parse_err)
}

/// Recursive merge of two JSON values.
///
/// Objects merge per key, anything else is replaced by `source`, and nulls
/// in `source` leave `target` untouched.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `RELAY_*` environment variables.
pub fn apply_env_overrides(config: &mut ServerConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Apply overrides read through `lookup`. Unparsable or out-of-range values
/// are logged and ignored.
pub fn apply_overrides(config: &mut ServerConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("RELAY_HOST").filter(|v| !v.trim().is_empty()) {
        config.host = v.trim().to_owned();
    }
    if let Some(v) = read_ranged(&lookup, "RELAY_PORT", 0, u64::from(u16::MAX)) {
        config.port = u16::try_from(v).unwrap_or(config.port);
    }
    if let Some(v) = read_ranged(&lookup, "RELAY_IDLE_TIMEOUT_SECS", 1, 86_400) {
        config.idle_timeout_secs = v;
    }
    if let Some(v) = read_ranged(&lookup, "RELAY_MAX_MESSAGE_SIZE", 1024, 1 << 30) {
        config.max_message_size = usize::try_from(v).unwrap_or(config.max_message_size);
    }
    if let Some(v) = read_ranged(&lookup, "RELAY_SEND_QUEUE", 1, 1 << 20) {
        config.send_queue_capacity = usize::try_from(v).unwrap_or(config.send_queue_capacity);
    }
}

fn read_ranged(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    min: u64,
    max: u64,
) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(v) if (min..=max).contains(&v) => Some(v),
        _ => {
            warn!(key, value = %raw, min, max, "ignoring invalid config override");
            None
        }
    }
}
