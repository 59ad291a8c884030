// Runtime settings for the downloader, persisted as YAML (config.yml)
//
// Loaded once at startup, editable through POST /config. Every update
// rewrites the whole file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::MediaType;

pub const SETTINGS_FILENAME: &str = "config.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid yaml at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Top-level settings file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Flags passed to svtplay-dl
    pub svtplay_dl: DownloaderSettings,

    /// Which catalogs/providers to search
    pub providers: ProviderSettings,

    /// Base output directory per media type
    pub paths: PathSettings,

    /// Top-level sections this build does not use, kept as posted
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderSettings {
    /// Value for -q (empty to let svtplay-dl decide)
    pub quality: String,
    pub subtitle: bool,
    pub force_subtitle: bool,
    /// Informational output template; the effective path is built from `paths`
    pub output: String,
    pub remux: bool,
    pub merge_subtitle: bool,
    pub thumbnail: bool,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self {
            quality: "best".to_string(),
            subtitle: true,
            force_subtitle: false,
            output: "/downloads/{type}/{title}".to_string(),
            remux: false,
            merge_subtitle: false,
            thumbnail: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub svt_play: bool,
    pub nrk: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            svt_play: true,
            nrk: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub movies: PathBuf,
    pub tv: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            movies: PathBuf::from("/downloads/movies"),
            tv: PathBuf::from("/downloads/tv"),
        }
    }
}

impl PathSettings {
    pub fn base_for(&self, media_type: MediaType) -> &Path {
        match media_type {
            MediaType::Movie => &self.movies,
            MediaType::Tv => &self.tv,
        }
    }
}

impl Settings {
    /// Shallow merge: each top-level key in `partial` replaces the whole section.
    /// Fields missing from a replaced section take their defaults. Unknown
    /// sections are stored in `extra` and persisted with the rest.
    pub fn merged(&self, partial: serde_json::Value) -> Result<Self, ConfigError> {
        let serde_json::Value::Object(patch) = partial else {
            return Err(ConfigError::Validation("configuration must be a mapping".to_string()));
        };

        let mut current = serde_json::to_value(self)
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        if let serde_json::Value::Object(ref mut map) = current {
            for (key, value) in patch {
                if !map.contains_key(&key) {
                    tracing::debug!("Keeping unrecognised configuration section '{}'", key);
                }
                map.insert(key, value);
            }
        }

        serde_json::from_value(current).map_err(|err| ConfigError::Validation(err.to_string()))
    }
}

/// Owns the live settings and the file they persist to
pub struct SettingsStore {
    path: PathBuf,
    settings: RwLock<Settings>,
}

impl SettingsStore {
    /// Read the settings file, or write and use defaults when it does not exist.
    /// An unreadable or malformed file is reported and defaults are used in memory.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();

        let settings = if path.exists() {
            read_settings(&path).unwrap_or_else(|e| {
                tracing::warn!("{}. Using defaults.", e);
                Settings::default()
            })
        } else {
            let defaults = Settings::default();
            write_settings(&path, &defaults)?;
            tracing::info!("Created default configuration at {}", path.display());
            defaults
        };

        Ok(Self {
            path,
            settings: RwLock::new(settings),
        })
    }

    /// Snapshot of the current settings
    pub async fn current(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Merge `partial` into the live settings and rewrite the file.
    /// The in-memory settings are left untouched if persisting fails.
    pub async fn update(&self, partial: serde_json::Value) -> Result<Settings, ConfigError> {
        let mut guard = self.settings.write().await;
        let updated = guard.merged(partial)?;

        let yaml = serde_yaml::to_string(&updated)
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        tokio::fs::write(&self.path, yaml)
            .await
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })?;

        *guard = updated.clone();
        tracing::info!("Configuration updated and saved to {}", self.path.display());
        Ok(updated)
    }
}

fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // An empty file parses as null rather than a mapping
    if raw.trim().is_empty() {
        return Ok(Settings::default());
    }

    let settings = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Loaded configuration from {}", path.display());
    Ok(settings)
}

fn write_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let yaml =
        serde_yaml::to_string(settings).map_err(|err| ConfigError::Validation(err.to_string()))?;
    std::fs::write(path, yaml).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.svtplay_dl.quality, "best");
        assert!(settings.svtplay_dl.subtitle);
        assert!(!settings.svtplay_dl.remux);
        assert!(settings.providers.svt_play);
        assert!(settings.providers.nrk);
        assert_eq!(settings.paths.tv, PathBuf::from("/downloads/tv"));
        assert_eq!(settings.paths.movies, PathBuf::from("/downloads/movies"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILENAME);

        SettingsStore::load(&path).unwrap();
        assert!(path.exists());

        let raw = std::fs::read_to_string(&path).unwrap();
        let on_disk: Settings = serde_yaml::from_str(&raw).unwrap();
        assert_eq!(on_disk, Settings::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        std::fs::write(&path, "svtplay_dl:\n  quality: \"720\"\n  remux: true\n").unwrap();

        let settings = read_settings(&path).unwrap();
        assert_eq!(settings.svtplay_dl.quality, "720");
        assert!(settings.svtplay_dl.remux);
        assert!(settings.svtplay_dl.subtitle);
        assert_eq!(settings.providers, ProviderSettings::default());
    }

    #[tokio::test]
    async fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        std::fs::write(&path, "providers: [not, a, mapping").unwrap();

        assert!(matches!(read_settings(&path), Err(ConfigError::Parse { .. })));

        let store = SettingsStore::load(&path).unwrap();
        assert_eq!(store.current().await, Settings::default());
    }

    #[test]
    fn test_merge_replaces_whole_section() {
        let mut base = Settings::default();
        base.providers.nrk = false;

        let merged = base
            .merged(json!({"providers": {"svt_play": false}}))
            .unwrap();
        assert!(!merged.providers.svt_play);
        // replaced section: omitted field goes back to its default
        assert!(merged.providers.nrk);
        assert_eq!(merged.svtplay_dl, base.svtplay_dl);
    }

    #[test]
    fn test_merge_rejects_bad_values() {
        let base = Settings::default();
        assert!(matches!(
            base.merged(json!({"providers": {"svt_play": "nope"}})),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            base.merged(json!(["providers"])),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_merge_keeps_unknown_sections() {
        let base = Settings::default();
        let merged = base.merged(json!({"notifications": {"x": 1}})).unwrap();
        assert_eq!(merged.extra["notifications"], json!({"x": 1}));
        assert_eq!(merged.providers, base.providers);

        // replaced wholesale like any other section
        let merged = merged.merged(json!({"notifications": {"y": true}})).unwrap();
        assert_eq!(merged.extra["notifications"], json!({"y": true}));
    }

    #[tokio::test]
    async fn test_unknown_sections_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);

        let store = SettingsStore::load(&path).unwrap();
        store
            .update(json!({"notifications": {"enabled": true}}))
            .await
            .unwrap();

        let reloaded = SettingsStore::load(&path).unwrap().current().await;
        assert_eq!(reloaded.extra["notifications"], json!({"enabled": true}));
        assert_eq!(reloaded.svtplay_dl, DownloaderSettings::default());
    }

    #[tokio::test]
    async fn test_update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);

        let store = SettingsStore::load(&path).unwrap();
        let updated = store
            .update(json!({"providers": {"svt_play": false}}))
            .await
            .unwrap();
        assert!(!updated.providers.svt_play);
        assert!(!store.current().await.providers.svt_play);

        let reloaded = SettingsStore::load(&path).unwrap().current().await;
        assert!(!reloaded.providers.svt_play);
        assert!(reloaded.providers.nrk);
        assert_eq!(reloaded.svtplay_dl, DownloaderSettings::default());
        assert_eq!(reloaded.paths, PathSettings::default());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_settings_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        let store = SettingsStore::load(&path).unwrap();

        let result = store
            .update(json!({"svtplay_dl": {"remux": "yes please"}}))
            .await;
        assert!(result.is_err());
        assert_eq!(store.current().await, Settings::default());
    }
}
