//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration: `from_env` with CLI overrides, then a separate
//! `validate` pass.

use std::net::SocketAddr;
use std::time::Duration;

use liap_core::bot::BotTiming;
use liap_core::events::EventLogConfig;
use liap_core::room::RoomConfig;

/// Complete server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address.
    pub bind: SocketAddr,
    /// Per-room game rules tuning.
    pub room: RoomConfig,
    /// Per-room event log tuning (ring size, offline queue size, retransmit
    /// timing).
    pub event_log: EventLogConfig,
    /// Per-connection rate limiter configuration.
    pub rate_limit: RateLimitConfig,
    /// Heartbeat interval for detecting dead websocket connections.
    pub heartbeat_interval: Duration,
    /// How long a connection may go without a received frame before the
    /// heartbeat loop closes it as unresponsive.
    pub idle_disconnect: Duration,
    /// Capacity of a connection's outbound queue. A full queue closes the
    /// connection as slow rather than blocking the room actor.
    pub outbound_queue_size: usize,
    /// Delay range before a bot submits its decision.
    pub bot_timing: BotTiming,
}

/// Token-bucket rate limiter tuning, applied per connection at the gateway.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub refill_per_sec: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// `bind_override` takes precedence over `SERVER_BIND`, mirroring the
    /// CLI-override-before-env-before-default chain of the bind address
    /// everywhere else in this module.
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| std::env::var("SERVER_BIND").ok().and_then(|s| s.parse().ok()))
            .unwrap_or_else(|| "127.0.0.1:6969".parse().expect("default bind address is valid"));

        let room = RoomConfig {
            win_threshold: parse_env_or("ROOM_WIN_THRESHOLD", 50),
            redeal_cap: parse_env_or("ROOM_REDEAL_CAP", 3),
            turn_results_display: Duration::from_millis(parse_env_or("ROOM_TURN_RESULTS_DISPLAY_MS", 7000)),
            inbound_queue_size: parse_env_or("INBOUND_QUEUE_SIZE", 256),
        };

        let event_log = EventLogConfig {
            ring_capacity: parse_env_or("EVENT_RING_CAPACITY", 1000),
            offline_queue_capacity: parse_env_or("EVENT_OFFLINE_QUEUE_CAPACITY", 200),
            retransmit_timeout: Duration::from_millis(parse_env_or("EVENT_RETRANSMIT_TIMEOUT_MS", 2000)),
            retransmit_limit: parse_env_or("EVENT_RETRANSMIT_LIMIT", 5),
        };

        let rate_limit = RateLimitConfig {
            capacity: parse_env_or("RATE_LIMIT_CAPACITY", 20),
            refill_per_sec: parse_env_or("RATE_LIMIT_REFILL_PER_SEC", 10),
        };

        let heartbeat_interval = Duration::from_millis(parse_env_or("HEARTBEAT_INTERVAL_MS", 15_000));
        let idle_disconnect = Duration::from_millis(parse_env_or("IDLE_DISCONNECT_MS", 30_000));
        let outbound_queue_size = parse_env_or("OUTBOUND_QUEUE_SIZE", 1024);

        let bot_timing = BotTiming {
            min_delay: Duration::from_millis(parse_env_or("BOT_DELAY_MIN_MS", 500)),
            max_delay: Duration::from_millis(parse_env_or("BOT_DELAY_MAX_MS", 1500)),
        };

        let config = ServerConfig {
            bind,
            room,
            event_log,
            rate_limit,
            heartbeat_interval,
            idle_disconnect,
            outbound_queue_size,
            bot_timing,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room.win_threshold <= 0 {
            return Err(ConfigError::Invalid {
                var: "ROOM_WIN_THRESHOLD".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.room.redeal_cap == 0 {
            return Err(ConfigError::Invalid {
                var: "ROOM_REDEAL_CAP".to_string(),
                reason: "must be at least 1, or no redeal would ever be possible".to_string(),
            });
        }

        if self.event_log.ring_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "EVENT_RING_CAPACITY".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.event_log.offline_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "EVENT_OFFLINE_QUEUE_CAPACITY".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.rate_limit.capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_CAPACITY".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.room.inbound_queue_size == 0 {
            return Err(ConfigError::Invalid {
                var: "INBOUND_QUEUE_SIZE".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.outbound_queue_size == 0 {
            return Err(ConfigError::Invalid {
                var: "OUTBOUND_QUEUE_SIZE".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.idle_disconnect <= self.heartbeat_interval {
            return Err(ConfigError::Invalid {
                var: "IDLE_DISCONNECT_MS".to_string(),
                reason: "must be greater than HEARTBEAT_INTERVAL_MS, or a live connection would be disconnected between heartbeats".to_string(),
            });
        }

        if self.bot_timing.min_delay >= self.bot_timing.max_delay {
            return Err(ConfigError::Invalid {
                var: "BOT_DELAY_MIN_MS".to_string(),
                reason: "must be less than BOT_DELAY_MAX_MS".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse an environment variable with a default fallback.
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            room: RoomConfig::default(),
            event_log: EventLogConfig::default(),
            rate_limit: RateLimitConfig { capacity: 20, refill_per_sec: 10 },
            heartbeat_interval: Duration::from_millis(15_000),
            idle_disconnect: Duration::from_millis(30_000),
            outbound_queue_size: 1024,
            bot_timing: BotTiming { min_delay: Duration::from_millis(500), max_delay: Duration::from_millis(1500) },
        }
    }

    #[test]
    fn config_error_display_names_the_offending_var() {
        let err = ConfigError::Invalid {
            var: "ROOM_WIN_THRESHOLD".to_string(),
            reason: "must be greater than 0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ROOM_WIN_THRESHOLD"));
    }

    #[test]
    fn zero_win_threshold_is_invalid() {
        let mut config = base_config();
        config.room.win_threshold = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_redeal_cap_is_invalid() {
        let mut config = base_config();
        config.room.redeal_cap = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn default_config_validates() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn inverted_bot_delay_range_is_invalid() {
        let mut config = base_config();
        config.bot_timing.min_delay = Duration::from_millis(2000);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_outbound_queue_size_is_invalid() {
        let mut config = base_config();
        config.outbound_queue_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_inbound_queue_size_is_invalid() {
        let mut config = base_config();
        config.room.inbound_queue_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn idle_disconnect_below_heartbeat_interval_is_invalid() {
        let mut config = base_config();
        config.idle_disconnect = Duration::from_millis(1000);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }
}
