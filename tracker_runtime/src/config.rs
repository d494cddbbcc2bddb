use std::env;

use chrono::{FixedOffset, Weekday};
use thiserror::Error;

use tracker_engine::period::PeriodCalendar;

pub const DEFAULT_LOG_FILTER: &str = "tracker_runtime=info,tracker_engine=info";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Minutes east of UTC used for period boundaries.
    pub utc_offset_minutes: i32,
    pub week_starts_on: Weekday,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            week_starts_on: Weekday::Mon,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables. Unset vars keep
    /// their defaults; set but unparsable vars are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("TRACKER_UTC_OFFSET_MINUTES") {
            let minutes: i32 = value.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: "TRACKER_UTC_OFFSET_MINUTES",
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
            if offset(minutes).is_none() {
                return Err(ConfigError::InvalidValue {
                    key: "TRACKER_UTC_OFFSET_MINUTES",
                    value,
                    reason: "must be within +/- 24 hours".to_string(),
                });
            }
            config.utc_offset_minutes = minutes;
        }

        if let Some(value) = lookup("TRACKER_WEEK_STARTS_ON") {
            config.week_starts_on = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "TRACKER_WEEK_STARTS_ON",
                value: value.clone(),
                reason: "expected a weekday name such as monday or sun".to_string(),
            })?;
        }

        if let Some(value) = lookup("TRACKER_LOG") {
            config.log_filter = value;
        }

        Ok(config)
    }

    pub fn calendar(&self) -> PeriodCalendar {
        let fixed = offset(self.utc_offset_minutes).unwrap_or_else(|| PeriodCalendar::default().offset);
        PeriodCalendar::new(fixed, self.week_starts_on)
    }
}

fn offset(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}
