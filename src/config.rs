use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::TrackerError;

/// Thresholds and cadences for the flight tracker.
///
/// Every field has a serde default so a TOML file may override any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub poll_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub altitude_change_ft: f64,
    pub speed_change_kts: f64,
    pub position_change_nm: f64,
    pub crash_descent_ft: f64,
    pub crash_window_secs: i64,
    pub altitude_history_secs: i64,
    pub airborne_altitude_ft: f64,
    pub vertical_phase_threshold_fpm: i32,
    pub cruise_band_fpm: i32,
    /// Number of consecutive empty polls before all tracking state is dropped.
    pub empty_polls_before_reset: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 120,
            heartbeat_interval_secs: 120,
            altitude_change_ft: 2_000.0,
            speed_change_kts: 50.0,
            position_change_nm: 10.0,
            crash_descent_ft: 10_000.0,
            crash_window_secs: 60,
            altitude_history_secs: 120,
            airborne_altitude_ft: 500.0,
            vertical_phase_threshold_fpm: 500,
            cruise_band_fpm: 200,
            empty_polls_before_reset: 1,
        }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.heartbeat_interval_secs as i64)
    }

    pub fn crash_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.crash_window_secs)
    }

    pub fn altitude_history_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.altitude_history_secs)
    }

    /// Reject combinations the detector cannot work with.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.poll_interval_secs == 0 {
            return Err(TrackerError::Config(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.crash_window_secs > self.altitude_history_secs {
            return Err(TrackerError::Config(format!(
                "crash_window_secs ({}) must not exceed altitude_history_secs ({})",
                self.crash_window_secs, self.altitude_history_secs
            )));
        }
        if self.cruise_band_fpm > self.vertical_phase_threshold_fpm {
            return Err(TrackerError::Config(format!(
                "cruise_band_fpm ({}) must not exceed vertical_phase_threshold_fpm ({})",
                self.cruise_band_fpm, self.vertical_phase_threshold_fpm
            )));
        }
        if self.empty_polls_before_reset == 0 {
            return Err(TrackerError::Config(
                "empty_polls_before_reset must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level TOML configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl ConfigFile {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: ConfigFile =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }
}

/// Resolve the optional config file path.
///
/// Priority:
/// 1. `ACARS_CONFIG` env var
/// 2. `/etc/acars/acars.toml` (production)
/// 3. `./acars.toml` (development)
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("ACARS_CONFIG") {
        return PathBuf::from(path);
    }

    match std::env::var("ACARS_ENV").as_deref() {
        Ok("production") => PathBuf::from("/etc/acars/acars.toml"),
        _ => PathBuf::from("./acars.toml"),
    }
}

/// Supabase project credentials, used for both the flight feed and bearer auth.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

/// Everything the bot reads from its environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: Option<String>,
    pub supabase: Option<SupabaseConfig>,
    pub flight_status_channel_id: Option<String>,
    pub announcement_channel_id: Option<String>,
    pub admin_password: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub quote_user_ids: Vec<String>,
    pub quote_interval_secs: u64,
    pub sentry_dsn: Option<String>,
    pub tracker: TrackerConfig,
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    /// Read the environment, then overlay tracker thresholds from the TOML
    /// file if one exists.
    pub fn from_env() -> Result<Self> {
        let path = config_path();
        let mut tracker = if path.exists() {
            ConfigFile::load(&path)?.tracker
        } else {
            TrackerConfig::default()
        };

        if let Some(secs) = non_empty_var("FLIGHT_POLL_INTERVAL_SECS") {
            tracker.poll_interval_secs = secs
                .parse()
                .with_context(|| format!("Invalid FLIGHT_POLL_INTERVAL_SECS: {}", secs))?;
        }
        tracker.validate()?;

        let supabase = match (non_empty_var("SUPABASE_URL"), non_empty_var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            _ => None,
        };

        let port = match non_empty_var("PORT") {
            Some(p) => p.parse().with_context(|| format!("Invalid PORT: {}", p))?,
            None => 3000,
        };

        let quote_interval_secs = match non_empty_var("QUOTE_INTERVAL_SECS") {
            Some(s) => s
                .parse()
                .with_context(|| format!("Invalid QUOTE_INTERVAL_SECS: {}", s))?,
            None => 86_400,
        };
        if quote_interval_secs == 0 {
            anyhow::bail!("QUOTE_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            discord_token: non_empty_var("DISCORD_TOKEN"),
            supabase,
            flight_status_channel_id: non_empty_var("FLIGHT_STATUS_CHANNEL_ID"),
            announcement_channel_id: non_empty_var("ANNOUNCEMENT_CHANNEL_ID"),
            admin_password: non_empty_var("ADMIN_PASSWORD")
                .unwrap_or_else(|| "admin123".to_string()),
            port,
            allowed_origins: non_empty_var("ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]),
            quote_user_ids: non_empty_var("QUOTE_USER_IDS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            quote_interval_secs,
            sentry_dsn: non_empty_var("SENTRY_DSN"),
            tracker,
        })
    }

    /// The Discord token, or an error explaining how to set it.
    pub fn require_discord_token(&self) -> Result<&str> {
        self.discord_token.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "DISCORD_TOKEN is not set. Add it to your .env file or the process environment"
            )
        })
    }
}
