use std::path::PathBuf;

use dirs::home_dir;
use log::error;

use crate::places::PlacesClientConfig;

/// Host/application configuration for the demo binary and embedders
/// that want file-based provider setup. Merged env over file over
/// defaults; the config file is seeded on first run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
  pub config_path: Option<PathBuf>,
  pub places_provider: Option<PlacesClientConfig>,
  pub country: Option<String>,
  pub min_chars: Option<usize>,
}

impl Config {
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_env();
    let from_file = Self::from_file();
    let default = Self::default();

    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged = merged.merge(&default);

    if merged.config_path.is_some() && from_file.is_none() {
      merged.init_cfg_file();
    }

    merged
  }

  fn from_env() -> Self {
    let config_path = std::env::var("PLACEFIELD_CONFIG").ok().map(PathBuf::from);

    let places_provider = std::env::var("PLACEFIELD_API_KEY")
      .ok()
      .map(|api_key| PlacesClientConfig::Google {
        api_key,
        base_url: std::env::var("PLACEFIELD_BASE_URL").ok(),
      });

    let country = std::env::var("PLACEFIELD_COUNTRY").ok();

    Self {
      config_path,
      places_provider,
      country,
      min_chars: None,
    }
  }

  fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or(other.config_path.clone());
    self.places_provider = self.places_provider.or(other.places_provider.clone());
    self.country = self.country.or(other.country.clone());
    self.min_chars = self.min_chars.or(other.min_chars);
    self
  }

  fn from_file() -> Option<Self> {
    let config_path = std::env::var("PLACEFIELD_CONFIG")
      .ok()
      .map(PathBuf::from)
      .or_else(|| home_dir().map(|p| p.join(".config").join("placefield")))?;
    let config_path = config_path.join("config.json");

    serde_json::from_str(&std::fs::read_to_string(&config_path).ok()?)
      .inspect_err(|e| error!("Failed to read config file: {e}"))
      .ok()?
  }

  fn init_cfg_file(&self) {
    if let Some(path) = &self.config_path {
      if !path.exists() {
        let _ = std::fs::create_dir_all(path).inspect_err(|e| {
          error!("Failed to create config directory: {e}");
        });
      }

      let path = path.join("config.json");
      if !path.exists() {
        match serde_json::to_string_pretty(self) {
          Ok(config) => {
            let _ = std::fs::write(path, config).inspect_err(|e| {
              error!("Failed to write config file: {e}");
            });
          }
          Err(e) => error!("Failed to serialize config: {e}"),
        }
      }
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      config_path: home_dir().map(|p| p.join(".config").join("placefield")),
      places_provider: None,
      country: None,
      min_chars: Some(crate::style::defaults::MIN_CHARS),
    }
  }
}
