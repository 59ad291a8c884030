// Process configuration for svtplay-arr
// Environment-derived settings, read once at startup. The runtime-editable
// downloader settings live in settings.rs.

use chrono::NaiveTime;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG_DIR: &str = "/config";
const DEFAULT_PORT: u16 = 2626;
const DEFAULT_DOWNLOADER: &str = "svtplay-dl";
const DEFAULT_UPDATE_TIME: &str = "02:00";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Connection details for one Sonarr/Radarr instance
#[derive(Debug, Clone, Default)]
pub struct ArrEndpoint {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

impl ArrEndpoint {
    fn from_env(url_var: &str, key_var: &str) -> Self {
        Self {
            url: non_empty_env(url_var).map(|u| u.trim_end_matches('/').to_string()),
            api_key: non_empty_env(key_var),
        }
    }

    /// Both URL and API key are present
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.api_key.is_some()
    }
}

/// Application configuration - environment with defaults
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding config.yml
    pub config_dir: PathBuf,

    /// Server port
    pub port: u16,

    /// Bind address
    pub bind_address: String,

    /// Downloader executable (name on PATH or absolute path)
    pub downloader: String,

    /// Local time of day for the daily downloader self-update
    pub update_time: NaiveTime,

    /// Timeout applied to catalog and Sonarr/Radarr requests
    pub http_timeout: Duration,

    pub sonarr: ArrEndpoint,
    pub radarr: ArrEndpoint,

    /// JustWatch GraphQL endpoint override (defaults to the public API)
    pub justwatch_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (including a .env file loaded by main)
    /// 2. Default values
    pub fn load() -> Self {
        let portable_mode = std::env::var("SVTPLAYARR_PORTABLE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let config_dir = if portable_mode {
            tracing::info!("Running in portable mode (using current directory)");
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            non_empty_env("SVTPLAYARR_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))
        };

        Self {
            config_dir,
            port: Self::env_port().unwrap_or(DEFAULT_PORT),
            bind_address: non_empty_env("SVTPLAYARR_BIND_ADDRESS")
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            downloader: non_empty_env("SVTPLAYARR_DOWNLOADER")
                .unwrap_or_else(|| DEFAULT_DOWNLOADER.to_string()),
            update_time: Self::env_update_time(),
            http_timeout: Duration::from_secs(
                non_empty_env("SVTPLAYARR_HTTP_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            sonarr: ArrEndpoint::from_env("SONARR_URL", "SONARR_API_KEY"),
            radarr: ArrEndpoint::from_env("RADARR_URL", "RADARR_API_KEY"),
            justwatch_url: non_empty_env("SVTPLAYARR_JUSTWATCH_URL"),
        }
    }

    fn env_port() -> Option<u16> {
        std::env::var("SVTPLAYARR_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
    }

    fn env_update_time() -> NaiveTime {
        let raw = non_empty_env("SVTPLAYARR_UPDATE_TIME")
            .unwrap_or_else(|| DEFAULT_UPDATE_TIME.to_string());
        parse_time_of_day(&raw).unwrap_or_else(|| {
            tracing::warn!(
                "Invalid SVTPLAYARR_UPDATE_TIME '{}', falling back to {}",
                raw,
                DEFAULT_UPDATE_TIME
            );
            NaiveTime::from_hms_opt(2, 0, 0).unwrap_or_default()
        })
    }

    /// Path of the persisted settings file
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(crate::settings::SETTINGS_FILENAME)
    }

    /// Log configuration status
    pub fn log_config(&self) {
        tracing::info!("Configuration directory: {}", self.config_dir.display());
        tracing::info!("Server listening on {}:{}", self.bind_address, self.port);
        tracing::info!("Downloader: {}", self.downloader);
        tracing::info!(
            "Daily downloader update at {}",
            self.update_time.format("%H:%M")
        );

        if self.sonarr.is_configured() {
            tracing::info!("Sonarr: {}", self.sonarr.url.as_deref().unwrap_or_default());
        } else {
            tracing::info!("Sonarr: not configured (set SONARR_URL and SONARR_API_KEY)");
        }

        if self.radarr.is_configured() {
            tracing::info!("Radarr: {}", self.radarr.url.as_deref().unwrap_or_default());
        } else {
            tracing::info!("Radarr: not configured (set RADARR_URL and RADARR_API_KEY)");
        }

        if let Some(ref url) = self.justwatch_url {
            tracing::debug!("JustWatch endpoint override: {}", url);
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse "HH:MM" (or "HH:MM:SS") into a time of day
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("02:00"), NaiveTime::from_hms_opt(2, 0, 0));
        assert_eq!(
            parse_time_of_day(" 23:15:30 "),
            NaiveTime::from_hms_opt(23, 15, 30)
        );
        assert!(parse_time_of_day("25:00").is_none());
        assert!(parse_time_of_day("soon").is_none());
    }

    #[test]
    fn test_arr_endpoint_configured() {
        let mut endpoint = ArrEndpoint::default();
        assert!(!endpoint.is_configured());

        endpoint.url = Some("http://sonarr:8989".to_string());
        assert!(!endpoint.is_configured());

        endpoint.api_key = Some("abc".to_string());
        assert!(endpoint.is_configured());
    }
}
