//! Conversation session settings

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Settings for open conversation sessions and their streams.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Sessions untouched this long are closed by the sweeper
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// How often the sweeper runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Events buffered per turn before the reconciler waits on the client
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_timeout_secs == 0 {
            return Err(ValidationError::InvalidSessionSetting("idle_timeout_secs"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidSessionSetting("sweep_interval_secs"));
        }
        if self.stream_buffer == 0 {
            return Err(ValidationError::InvalidSessionSetting("stream_buffer"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    1800
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_stream_buffer() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.idle_timeout(), Duration::from_secs(1800));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.stream_buffer, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let config = SessionConfig {
            stream_buffer: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidSessionSetting("stream_buffer"))
        );
    }
}
