use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::{geocoder::GeocoderId, model::Coordinate};

pub const DEFAULT_TABLE: &str = "MasjidList";

pub const ENV_BACKEND_URL: &str = "MASJID_SUPABASE_URL";
pub const ENV_BACKEND_ANON_KEY: &str = "MASJID_SUPABASE_ANON_KEY";
pub const ENV_GOOGLE_API_KEY: &str = "MASJID_GOOGLE_API_KEY";

/// Connection settings for the hosted table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

/// Credentials for a single geocoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub backend: Option<BackendConfig>,

    /// Geocoder tried first, e.g. "nominatim". Defaults to Nominatim.
    pub primary_geocoder: Option<String>,

    /// Geocoder used when the primary one finds nothing. Defaults to Google.
    pub fallback_geocoder: Option<String>,

    /// Example TOML:
    /// [geocoders.google]
    /// api_key = "..."
    #[serde(default)]
    pub geocoders: HashMap<String, GeocoderConfig>,

    /// Position used when none is given on the command line.
    pub home: Option<Coordinate>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "masjid", "masjid-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply `MASJID_*` environment variables on top of the file contents.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let url = var(ENV_BACKEND_URL);
        let anon_key = var(ENV_BACKEND_ANON_KEY);

        if let Some(backend) = self.backend.as_mut() {
            if let Some(url) = url {
                backend.url = url;
            }
            if let Some(key) = anon_key {
                backend.anon_key = key;
            }
        } else if let (Some(url), Some(anon_key)) = (url, anon_key) {
            self.backend = Some(BackendConfig { url, anon_key, table: default_table() });
        }

        if let Some(key) = var(ENV_GOOGLE_API_KEY) {
            self.geocoders.insert(GeocoderId::Google.as_str().to_string(), GeocoderConfig {
                api_key: key,
            });
        }

        self
    }

    pub fn backend_config(&self) -> Result<&BackendConfig> {
        self.backend.as_ref().ok_or_else(|| {
            anyhow!(
                "No backend configured.\n\
                 Hint: run `masjid configure` or set {ENV_BACKEND_URL} and {ENV_BACKEND_ANON_KEY}."
            )
        })
    }

    pub fn set_backend(&mut self, backend: BackendConfig) {
        self.backend = Some(backend);
    }

    pub fn primary_geocoder_id(&self) -> Result<GeocoderId> {
        self.primary_geocoder
            .as_deref()
            .map_or(Ok(GeocoderId::Nominatim), GeocoderId::try_from)
    }

    pub fn fallback_geocoder_id(&self) -> Result<GeocoderId> {
        self.fallback_geocoder
            .as_deref()
            .map_or(Ok(GeocoderId::Google), GeocoderId::try_from)
    }

    /// Set/replace a geocoder API key.
    pub fn upsert_geocoder_api_key(&mut self, id: GeocoderId, api_key: String) {
        self.geocoders.insert(id.as_str().to_string(), GeocoderConfig { api_key });
    }

    /// Returns API key for a geocoder, if present.
    pub fn geocoder_api_key(&self, id: GeocoderId) -> Option<&str> {
        self.geocoders.get(id.as_str()).map(|cfg| cfg.api_key.as_str())
    }
}
