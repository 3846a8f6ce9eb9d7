use std::time::Duration;

use anyhow::bail;
use serde::Deserialize;

/// Relay hub settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Shared secret required on display registrations. Empty disables the
    /// check.
    pub token: String,
    /// Upper bound on a single inbound WebSocket frame, in bytes.
    pub max_message_size: usize,
    /// Capacity of each connection's outbound queue. Producers never block;
    /// envelopes beyond this bound are dropped.
    pub send_queue_size: usize,
    /// Idle read deadline. A connection that misses pongs for this long is
    /// dropped.
    pub pong_wait_secs: u64,
    /// Per-write deadline for the writer pump.
    pub write_wait_secs: u64,
    /// Timeout for the command-schema HTTP fetch at display registration.
    pub schema_fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            max_message_size: 64 * 1024,
            send_queue_size: 256,
            pong_wait_secs: 60,
            write_wait_secs: 10,
            schema_fetch_timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_message_size == 0 {
            bail!("max_message_size must be positive");
        }
        if self.send_queue_size == 0 {
            bail!("send_queue_size must be positive");
        }
        if self.pong_wait_secs == 0 || self.write_wait_secs == 0 {
            bail!("pong_wait_secs and write_wait_secs must be positive");
        }
        if self.write_wait_secs >= self.pong_wait_secs {
            bail!("write_wait_secs must be below pong_wait_secs");
        }
        if self.schema_fetch_timeout_secs == 0 {
            bail!("schema_fetch_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn token_required(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }

    /// Pings go out slightly faster than the pong deadline expires.
    pub fn ping_period(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs * 9 / 10)
    }

    pub fn schema_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.schema_fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.token_required());
        assert_eq!(config.ping_period(), Duration::from_secs(54));
    }

    #[test]
    fn test_zero_queue_rejected() {
        let config = Config {
            send_queue_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_write_wait_must_undercut_pong_wait() {
        let config = Config {
            write_wait_secs: 60,
            pong_wait_secs: 60,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_enables_auth() {
        let config = Config {
            token: "secret".to_owned(),
            ..Config::default()
        };
        assert!(config.token_required());
    }
}
