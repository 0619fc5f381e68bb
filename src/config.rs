use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::forecast::{ForecastPipeline, WindowBound};
use crate::ml::{ModelStore, TrainingOptions};

pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "LOAD_FORECAST__";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub store: StoreConfig,
    #[validate(nested)]
    pub forecast: ForecastConfig,
    #[validate(nested)]
    pub training: TrainingOptions,
    #[validate(nested)]
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StoreConfig {
    pub root: PathBuf,
    #[validate(range(min = 1))]
    pub retain_generations: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("models"),
            retain_generations: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ForecastConfig {
    #[validate(range(min = 1))]
    pub default_horizon_days: u32,
    pub window_bound: WindowBound,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_horizon_days: 1,
            window_bound: WindowBound::HalfOpen,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 60,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid server address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// JSON lines when true, human-readable text otherwise
    pub json: bool,
    /// Filter used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: true,
            filter: "info,tower_http=info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file, then `LOAD_FORECAST__*` variables.
    ///
    /// With `path == None` the default file is optional; an explicit path must
    /// exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            anyhow::ensure!(path.is_file(), "config file {} not found", path.display());
        }

        let cfg: Config = Self::figment(path)
            .extract()
            .context("failed to read configuration")?;
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn model_store(&self) -> ModelStore {
        ModelStore::new(&self.store.root, self.store.retain_generations)
    }

    pub fn pipeline(&self) -> ForecastPipeline {
        ForecastPipeline::new(self.model_store(), self.forecast.window_bound)
    }
}
