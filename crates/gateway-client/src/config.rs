//! Configuration for the gateway client.
//!
//! Use the defaults, override via environment variables, or load a TOML
//! file:
//!
//! - `GATEWAY_HOST`               (default: "127.0.0.1")
//! - `GATEWAY_PORT`               (default: "7497")
//! - `GATEWAY_CLIENT_ID`          (default: "0")
//! - `GATEWAY_READ_TIMEOUT_MS`    (default: "1000")
//! - `GATEWAY_REQUEST_TIMEOUT_MS` (default: "10000")
//! - `GATEWAY_CONNECT_TIMEOUT_MS` (default: "5000")
//!
//! ```toml
//! host = "10.0.0.5"
//! port = 4002
//! client_id = 7
//! request_timeout_ms = 30000
//! ```

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ClientError, ClientResult};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7497;
const DEFAULT_READ_TIMEOUT_MS: u64 = 1_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,

    /// Identifies this API session to the gateway; must be unique among
    /// concurrently connected clients.
    pub client_id: i32,

    /// Upper bound on one socket read. Also the polling granularity of
    /// a waiting call.
    pub read_timeout: Duration,

    /// How long a correlated call waits for its terminal message.
    pub request_timeout: Duration,

    pub connect_timeout: Duration,

    /// Appended to the handshake version range when non-empty.
    pub connect_options: String,

    /// Sent with `start_api` on gateways that accept it.
    pub optional_capabilities: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            client_id: 0,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            connect_options: String::new(),
            optional_capabilities: String::new(),
        }
    }
}

/// On-disk shape; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    client_id: Option<i32>,
    read_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    connect_options: Option<String>,
    optional_capabilities: Option<String>,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, client_id: i32) -> Self {
        ClientConfig {
            host: host.into(),
            port,
            client_id,
            ..Default::default()
        }
    }

    /// Construct a `ClientConfig` from environment variables, falling
    /// back to the defaults. A variable that is set but unparsable is an
    /// error.
    pub fn from_env() -> ClientResult<Self> {
        let defaults = ClientConfig::default();
        let host = env::var("GATEWAY_HOST").unwrap_or(defaults.host);
        let port = read_env_or_default("GATEWAY_PORT", DEFAULT_PORT)?;
        let client_id = read_env_or_default("GATEWAY_CLIENT_ID", 0i32)?;
        let read_timeout = read_env_or_default("GATEWAY_READ_TIMEOUT_MS", DEFAULT_READ_TIMEOUT_MS)?;
        let request_timeout =
            read_env_or_default("GATEWAY_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;
        let connect_timeout =
            read_env_or_default("GATEWAY_CONNECT_TIMEOUT_MS", DEFAULT_CONNECT_TIMEOUT_MS)?;

        ClientConfig {
            host,
            port,
            client_id,
            read_timeout: Duration::from_millis(read_timeout),
            request_timeout: Duration::from_millis(request_timeout),
            connect_timeout: Duration::from_millis(connect_timeout),
            ..defaults
        }
        .validated()
    }

    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| ClientError::Config(e.to_string()))?;
        let d = ClientConfig::default();

        ClientConfig {
            host: file.host.unwrap_or(d.host),
            port: file.port.unwrap_or(d.port),
            client_id: file.client_id.unwrap_or(d.client_id),
            read_timeout: file
                .read_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(d.read_timeout),
            request_timeout: file
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(d.request_timeout),
            connect_timeout: file
                .connect_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(d.connect_timeout),
            connect_options: file.connect_options.unwrap_or(d.connect_options),
            optional_capabilities: file
                .optional_capabilities
                .unwrap_or(d.optional_capabilities),
        }
        .validated()
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Convenience: `host:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validated(self) -> ClientResult<Self> {
        if self.read_timeout.is_zero() {
            return Err(ClientError::Config("read timeout must be non-zero".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::Config("request timeout must be non-zero".into()));
        }
        Ok(self)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> ClientResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| ClientError::Config(format!("{key}={val:?}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.socket_addr_string(), "127.0.0.1:7497");
        assert_eq!(c.read_timeout, Duration::from_secs(1));
        assert_eq!(c.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let c = ClientConfig::from_toml_str(
            r#"
            host = "10.0.0.5"
            port = 4002
            request_timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(c.host, "10.0.0.5");
        assert_eq!(c.port, 4002);
        assert_eq!(c.request_timeout, Duration::from_millis(250));
        assert_eq!(c.client_id, 0);
        assert_eq!(c.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn toml_rejects_unknown_keys_and_zero_timeouts() {
        assert!(matches!(
            ClientConfig::from_toml_str("hostname = \"x\""),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_toml_str("read_timeout_ms = 0"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        assert!(matches!(
            ClientConfig::from_toml_file("/definitely/not/here.toml"),
            Err(ClientError::Config(_))
        ));
    }
}
