//! Transport configuration.
//!
//! Timeouts are expressed in milliseconds when deserialized:
//!
//! ```json
//! { "connect_timeout_ms": 1000, "read_timeout_ms": 5000, "user_agent": "app/1.0" }
//! ```
//!
//! Missing fields take their defaults.

use crate::base::neterror::NetError;
use crate::http::headerparser::DEFAULT_CHARSET;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default for each timeout, matching the classic request-queue default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2500);

/// Connect/read/write timeouts forwarded to a backend with each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_TIMEOUT,
            read: DEFAULT_TIMEOUT,
            write: DEFAULT_TIMEOUT,
        }
    }
}

impl Timeouts {
    /// Apply a per-request override to the read and write phases.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        if let Some(t) = timeout {
            self.read = t;
            self.write = t;
        }
        self
    }
}

/// Configuration for a `TransportAdapter` and the backend it builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,

    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,

    #[serde(rename = "write_timeout_ms", with = "millis")]
    pub write_timeout: Duration,

    /// User-Agent sent when the request does not set one.
    pub user_agent: Option<String>,

    /// Charset assumed for responses that do not declare one.
    pub default_charset: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            default_charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        let config: Self = serde_json::from_str(json).map_err(|e| NetError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn default_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_charset = charset.into();
        self
    }

    /// The configured timeouts as a forwardable value.
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: self.connect_timeout,
            read: self.read_timeout,
            write: self.write_timeout,
        }
    }

    /// Reject zero timeouts and an empty default charset.
    pub fn validate(&self) -> Result<(), NetError> {
        for (name, value) in [
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if value.is_zero() {
                return Err(NetError::InvalidConfig {
                    reason: format!("{} must be non-zero", name),
                });
            }
        }
        if self.default_charset.trim().is_empty() {
            return Err(NetError::InvalidConfig {
                reason: "default_charset must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
        assert_eq!(config.read_timeout, Duration::from_millis(2500));
        assert_eq!(config.write_timeout, Duration::from_millis(2500));
        assert!(config.user_agent.is_none());
        assert_eq!(config.default_charset, "ISO-8859-1");
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            TransportConfig::from_json(r#"{"read_timeout_ms": 10000, "user_agent": "app/1.0"}"#)
                .unwrap();
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.user_agent.as_deref(), Some("app/1.0"));
    }

    #[test]
    fn test_from_json_rejects_zero_timeout() {
        let err = TransportConfig::from_json(r#"{"connect_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, NetError::InvalidConfig { .. }));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            TransportConfig::from_json("not json"),
            Err(NetError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_serialize_roundtrip_in_millis() {
        let config = TransportConfig::new().connect_timeout(Duration::from_millis(750));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["connect_timeout_ms"], 750);
    }

    #[test]
    fn test_request_timeout_override() {
        let timeouts = TransportConfig::default()
            .timeouts()
            .with_request_timeout(Some(Duration::from_secs(9)));
        assert_eq!(timeouts.connect, DEFAULT_TIMEOUT);
        assert_eq!(timeouts.read, Duration::from_secs(9));
        assert_eq!(timeouts.write, Duration::from_secs(9));
    }
}
