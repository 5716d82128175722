//! Layered service configuration
//!
//! `defaults/pipi.default.toml` is embedded into the binary. Callers layer an
//! optional user file, `PIPI_*` environment variables and command line
//! overrides on top of it via [`Loader`] before deserializing into
//! [`PipiConfig`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, Map, ValueKind};
use serde::Deserialize;

use crate::fetch::FetchOptions;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/pipi.default.toml");

/// Prefix of environment variables picked up by [`Loader::with_environment`]
pub const ENV_PREFIX: &str = "PIPI";

/// Picked up from the working directory when no file is named explicitly
pub const LOCAL_CONFIG_FILE: &str = "pipi.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct PipiConfig {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

/// Where and how product pages are obtained.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Product ids are appended to this URL
    pub product_base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_page_bytes: usize,
    /// Read pages from disk instead of the network
    #[serde(default)]
    pub pages_dir: Option<PathBuf>,
}

impl FetchConfig {
    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_page_bytes: self.max_page_bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub level: String,
}

/// Builds a [`PipiConfig`] from the embedded defaults plus whatever layers
/// the caller adds, later layers winning.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a TOML file that must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a TOML file if it exists, e.g. `pipi.toml` in the working
    /// directory.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer the process environment, e.g. `PIPI_SERVER__BIND=127.0.0.1:3000`.
    pub fn with_environment(mut self) -> Self {
        self.builder = self.builder.add_source(environment(None));
        self
    }

    /// Layer an explicit set of `PIPI_*` variables instead of the process
    /// environment.
    pub fn with_environment_from(mut self, vars: Map<String, String>) -> Self {
        self.builder = self.builder.add_source(environment(Some(vars)));
        self
    }

    /// Force `key` (dotted path, e.g. `server.bind`) to `value`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Like [`Loader::set_override`] but skips `None`.
    pub fn set_override_option<I>(self, key: &str, value: Option<I>) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        match value {
            Some(value) => self.set_override(key, value),
            None => Ok(self),
        }
    }

    pub fn build(self) -> Result<PipiConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn environment(source: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .source(source)
}
