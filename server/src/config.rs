//! Runtime settings of the arena server.
//!
//! Defaults mirror the constants in `shared`. A JSON file may override any
//! subset of fields; command-line flags are applied on top in `main`.

use serde::{Deserialize, Serialize};
use shared::{
    BOARD_HEIGHT, BOARD_WIDTH, LEADERBOARD_INTERVAL, MOVE_COOLDOWN, NEUTRAL_PIECE_COUNT,
    RESPAWN_TIME,
};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// The respawn timer fires this much earlier than the nominal respawn time.
pub const RESPAWN_LEAD: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Connections beyond this many teams are closed right after accept.
    pub max_clients: usize,
    pub move_cooldown_ms: u64,
    pub respawn_time_ms: u64,
    pub leaderboard_interval_ms: u64,
    pub neutral_pieces: usize,
    /// Capacity of each connection's outbound frame queue.
    pub outbound_queue: usize,
    /// Chat messages are cut to this many UTF-16 units.
    pub max_chat_units: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2388,
            max_clients: 256,
            move_cooldown_ms: MOVE_COOLDOWN.as_millis() as u64,
            respawn_time_ms: RESPAWN_TIME.as_millis() as u64,
            leaderboard_interval_ms: LEADERBOARD_INTERVAL.as_millis() as u64,
            neutral_pieces: NEUTRAL_PIECE_COUNT,
            outbound_queue: 1024,
            max_chat_units: 256,
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid("max_clients must be at least 1".into()));
        }
        if self.max_clients >= shared::MAX_TEAM_ID as usize {
            return Err(ConfigError::Invalid(format!(
                "max_clients must be below {}",
                shared::MAX_TEAM_ID
            )));
        }
        if self.leaderboard_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "leaderboard_interval_ms must be positive".into(),
            ));
        }
        if self.respawn_time() <= RESPAWN_LEAD {
            return Err(ConfigError::Invalid(format!(
                "respawn_time_ms must exceed {}",
                RESPAWN_LEAD.as_millis()
            )));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::Invalid("outbound_queue must be at least 1".into()));
        }
        if self.neutral_pieces > BOARD_WIDTH * BOARD_HEIGHT / 2 {
            return Err(ConfigError::Invalid(format!(
                "neutral_pieces must not exceed half of the {} squares",
                BOARD_WIDTH * BOARD_HEIGHT
            )));
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn move_cooldown(&self) -> Duration {
        Duration::from_millis(self.move_cooldown_ms)
    }

    pub fn respawn_time(&self) -> Duration {
        Duration::from_millis(self.respawn_time_ms)
    }

    /// Delay between a team's death and the respawn timer firing.
    pub fn respawn_delay(&self) -> Duration {
        self.respawn_time().saturating_sub(RESPAWN_LEAD)
    }

    pub fn leaderboard_interval(&self) -> Duration {
        Duration::from_millis(self.leaderboard_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_game_constants() {
        let config = ServerConfig::default();
        assert_eq!(config.move_cooldown(), Duration::from_millis(800));
        assert_eq!(config.respawn_time(), Duration::from_millis(5000));
        assert_eq!(config.respawn_delay(), Duration::from_millis(4900));
        assert_eq!(config.leaderboard_interval(), Duration::from_millis(1000));
        assert_eq!(config.neutral_pieces, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "port": 9000, "move_cooldown_ms": 250 }"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.move_cooldown_ms, 250);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.neutral_pieces, 300);
    }

    #[test]
    fn test_address() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 1234,
            ..ServerConfig::default()
        };
        assert_eq!(config.address(), "0.0.0.0:1234");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = vec![
            ServerConfig {
                max_clients: 0,
                ..ServerConfig::default()
            },
            ServerConfig {
                leaderboard_interval_ms: 0,
                ..ServerConfig::default()
            },
            ServerConfig {
                respawn_time_ms: 100,
                ..ServerConfig::default()
            },
            ServerConfig {
                outbound_queue: 0,
                ..ServerConfig::default()
            },
            ServerConfig {
                neutral_pieces: BOARD_WIDTH * BOARD_HEIGHT,
                ..ServerConfig::default()
            },
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "accepted {:?}",
                config
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::from_file("/nonexistent/arena.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_malformed_file() {
        let path = std::env::temp_dir().join(format!("arena-config-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = ServerConfig::from_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
