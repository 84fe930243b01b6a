//! Configuration loader and validator for the imagegram service and converter.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the YAML config file.
pub const CONFIG_ENV: &str = "IMAGEGRAM_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub server: Server,
    pub database: Database,
    pub images: Images,
    pub feed: Feed,
    pub conversion: Conversion,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub addr: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub url: String,
}

/// Where uploads are stored and where the converter reads them from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Images {
    pub dir: String,
}

/// Feed pagination defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

/// Target dimensions of converted images.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversion {
    pub width: u32,
    pub height: u32,
}

impl Config {
    /// Ensure required directories exist (creates `images.dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.images.dir)
    }

    pub fn image_dir(&self) -> PathBuf {
        PathBuf::from(&self.images.dir)
    }

    /// `DATABASE_URL` wins over the configured URL.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `$IMAGEGRAM_CONFIG`, falling back to `config.yaml`.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
    };
    let content = fs::read_to_string(&path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.server.addr.trim().is_empty() {
        return Err(ConfigError::Invalid("server.addr must be non-empty"));
    }
    if cfg.server.max_upload_bytes == 0 {
        return Err(ConfigError::Invalid("server.max_upload_bytes must be > 0"));
    }
    if cfg.database.url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }
    if cfg.images.dir.trim().is_empty() {
        return Err(ConfigError::Invalid("images.dir must be non-empty"));
    }
    if cfg.feed.default_page_size <= 0 {
        return Err(ConfigError::Invalid("feed.default_page_size must be > 0"));
    }
    if cfg.feed.max_page_size < cfg.feed.default_page_size {
        return Err(ConfigError::Invalid(
            "feed.max_page_size must be >= feed.default_page_size",
        ));
    }
    if cfg.conversion.width == 0 || cfg.conversion.height == 0 {
        return Err(ConfigError::Invalid(
            "conversion.width and conversion.height must be > 0",
        ));
    }
    Ok(())
}

/// Example configuration document.
pub fn example() -> &'static str {
    r#"server:
  addr: "0.0.0.0:8080"
  max_upload_bytes: 104857600

database:
  url: "sqlite://./data/imagegram.db"

images:
  dir: "./data/images"

feed:
  default_page_size: 10
  max_page_size: 100

conversion:
  width: 600
  height: 600
"#
}
