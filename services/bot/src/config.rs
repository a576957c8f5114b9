//! services/bot/src/config.rs
//!
//! Defines the service's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use attendance_core::{DedupWindows, FingerprintResolution, Templates, UserId};
use chrono::FixedOffset;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which members are tracked. An empty allow list admits everyone; the deny list wins.
#[derive(Clone, Debug, Default)]
pub struct UserFilter {
    pub allow: HashSet<String>,
    pub deny: HashSet<String>,
}

impl UserFilter {
    pub fn permits(&self, user_id: &UserId) -> bool {
        if self.deny.contains(user_id.as_str()) {
            return false;
        }
        self.allow.is_empty() || self.allow.contains(user_id.as_str())
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub slack_bot_token: String,
    pub slack_channel_id: String,
    pub daily_report_channel_id: String,
    pub slack_api_base: String,
    pub ingest_token: Option<String>,
    pub rest_channel_name: String,
    pub dedup_windows: DedupWindows,
    pub dedup_resolution: FingerprintResolution,
    pub sweep_interval: Duration,
    pub sweep_grace: chrono::Duration,
    pub state_retention: chrono::Duration,
    pub notify_max_attempts: u32,
    pub notify_backoff_base: Duration,
    pub follow_up_delay: Duration,
    pub utc_offset: FixedOffset,
    pub user_filter: UserFilter,
    /// Display name -> spreadsheet webhook URL.
    pub attendance_webhooks: HashMap<String, String>,
    /// Display name -> chat mention id, consulted before the directory.
    pub identity_overrides: HashMap<String, String>,
    pub identity_refresh: Duration,
    pub templates: Templates,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = get("BIND_ADDRESS").unwrap_or_else(|| {
            let port = get("PORT").unwrap_or_else(|| "5000".to_string());
            format!("0.0.0.0:{}", port)
        });
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = get("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Chat Platform ---
        let slack_bot_token = required(&get, "SLACK_BOT_TOKEN")?;
        let slack_channel_id = required(&get, "SLACK_CHANNEL_ID")?;
        let daily_report_channel_id = required(&get, "DAILY_REPORT_CHANNEL_ID")?;
        let slack_api_base = get("SLACK_API_BASE")
            .unwrap_or_else(|| "https://slack.com/api".to_string())
            .trim_end_matches('/')
            .to_string();
        let ingest_token = get("INGEST_TOKEN").filter(|token| !token.is_empty());

        // --- Attendance Rules ---
        let rest_channel_name = get("REST_CHANNEL_NAME").unwrap_or_else(|| "休憩".to_string());

        let dedup_windows = DedupWindows {
            clock_in: span(&get, "DEDUP_CLOCK_IN_SECS", 60, chrono::Duration::try_seconds)?,
            clock_out: span(&get, "DEDUP_CLOCK_OUT_SECS", 60, chrono::Duration::try_seconds)?,
            movement: span(&get, "DEDUP_MOVE_SECS", 3, chrono::Duration::try_seconds)?,
        };
        let dedup_resolution = match get("DEDUP_RESOLUTION")
            .unwrap_or_else(|| "seconds".to_string())
            .to_lowercase()
            .as_str()
        {
            "seconds" => FingerprintResolution::Seconds,
            "micros" => FingerprintResolution::Micros,
            other => {
                return Err(ConfigError::InvalidValue(
                    "DEDUP_RESOLUTION".to_string(),
                    format!("'{}' is not one of seconds, micros", other),
                ))
            }
        };

        let sweep_interval = Duration::from_secs(parsed(&get, "SWEEP_INTERVAL_SECS", 15)?);
        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let sweep_grace = span(&get, "SWEEP_GRACE_SECS", 60, chrono::Duration::try_seconds)?;
        let state_retention =
            span(&get, "STATE_RETENTION_HOURS", 12, chrono::Duration::try_hours)?;

        // --- Delivery ---
        let notify_max_attempts: u32 = parsed(&get, "NOTIFY_MAX_ATTEMPTS", 3)?;
        if notify_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "NOTIFY_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let notify_backoff_base =
            Duration::from_millis(parsed(&get, "NOTIFY_BACKOFF_BASE_MS", 1000)?);
        let follow_up_delay = Duration::from_millis(parsed(&get, "FOLLOW_UP_DELAY_MS", 1500)?);

        let offset_hours: i32 = parsed(&get, "UTC_OFFSET_HOURS", 9)?;
        let utc_offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "UTC_OFFSET_HOURS".to_string(),
                    format!("{} is out of range", offset_hours),
                )
            })?;

        // --- Members and Identities ---
        let user_filter = UserFilter {
            allow: id_list(get("TRACKED_USERS")),
            deny: id_list(get("IGNORED_USERS")),
        };

        let attendance_webhooks = match get("ATTENDANCE_WEBHOOKS") {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).map_err(|e| {
                ConfigError::InvalidValue("ATTENDANCE_WEBHOOKS".to_string(), e.to_string())
            })?,
            _ => HashMap::new(),
        };
        let identity_overrides = pairs(get("IDENTITY_OVERRIDES"), "IDENTITY_OVERRIDES")?;
        let identity_refresh = Duration::from_secs(parsed(&get, "IDENTITY_REFRESH_SECS", 300)?);

        // --- Message Templates ---
        let defaults = Templates::default();
        let templates = Templates {
            clock_in: get("TEMPLATE_CLOCK_IN").unwrap_or(defaults.clock_in),
            movement: get("TEMPLATE_MOVE").unwrap_or(defaults.movement),
            rest_start: get("TEMPLATE_REST_START").unwrap_or(defaults.rest_start),
            rest_end: get("TEMPLATE_REST_END").unwrap_or(defaults.rest_end),
            clock_out: get("TEMPLATE_CLOCK_OUT").unwrap_or(defaults.clock_out),
            clock_out_inferred: get("TEMPLATE_CLOCK_OUT_INFERRED")
                .unwrap_or(defaults.clock_out_inferred),
            follow_up: get("TEMPLATE_FOLLOW_UP").unwrap_or(defaults.follow_up),
        };

        Ok(Self {
            bind_address,
            log_level,
            slack_bot_token,
            slack_channel_id,
            daily_report_channel_id,
            slack_api_base,
            ingest_token,
            rest_channel_name,
            dedup_windows,
            dedup_resolution,
            sweep_interval,
            sweep_grace,
            state_retention,
            notify_max_attempts,
            notify_backoff_base,
            follow_up_delay,
            utc_offset,
            user_filter,
            attendance_webhooks,
            identity_overrides,
            identity_refresh,
            templates,
        })
    }
}

fn required<F>(get: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

fn parsed<F, T>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Reads a non-negative amount and converts it with a fallible `chrono` constructor.
fn span<F>(
    get: &F,
    key: &str,
    default: i64,
    unit: fn(i64) -> Option<chrono::Duration>,
) -> Result<chrono::Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let amount: i64 = parsed(get, key, default)?;
    if amount < 0 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    unit(amount).ok_or_else(|| {
        ConfigError::InvalidValue(key.to_string(), format!("{} is out of range", amount))
    })
}

fn id_list(raw: Option<String>) -> HashSet<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parses `name=value,name=value`.
fn pairs(raw: Option<String>, key: &str) -> Result<HashMap<String, String>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(HashMap::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(key.to_string(), format!("'{}' is not name=value", entry))
                })
        })
        .collect()
}
