use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_timeout, serialize_timeout};
use crate::portfolio::SymbolTable;
use crate::valuation::DEFAULT_REFRESH_TIMEOUT;

/// Environment variable overriding the settlement currency.
pub const CURRENCY_ENV: &str = "CURRENCY";

const CONFIG_FILE_NAME: &str = "coinfolio.toml";

/// Default settlement currency.
fn default_currency() -> String {
    "usd".to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_REFRESH_TIMEOUT
}

/// Price source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSourceConfig {
    /// Override for the CoinGecko API root (mirrors, proxies).
    pub base_url: Option<String>,

    /// Upper bound on the batched price request, e.g. "10s".
    #[serde(
        default = "default_timeout",
        deserialize_with = "deserialize_timeout",
        serialize_with = "serialize_timeout"
    )]
    pub timeout: Duration,
}

impl Default for PriceSourceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: default_timeout(),
        }
    }
}

/// Application configuration as written in `coinfolio.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settlement currency for prices and totals (e.g. "usd").
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Where snapshots are written. If relative, resolved from the config
    /// file location. Defaults to the current directory.
    pub snapshot_dir: Option<PathBuf>,

    #[serde(default)]
    pub price_source: PriceSourceConfig,

    /// Extra ticker → CoinGecko id mappings, e.g. `pepe = "pepe"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub symbols: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            snapshot_dir: None,
            price_source: PriceSourceConfig::default(),
            symbols: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the snapshot directory.
    ///
    /// A relative `snapshot_dir` is joined onto `config_dir`; when unset,
    /// snapshots go to `working_dir`.
    pub fn resolve_snapshot_dir(&self, config_dir: &Path, working_dir: &Path) -> PathBuf {
        match &self.snapshot_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => config_dir.join(dir),
            None => working_dir.to_path_buf(),
        }
    }
}

/// Configuration with paths resolved and environment applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Lowercase settlement currency code.
    pub currency: String,

    pub snapshot_dir: PathBuf,

    pub price_source: PriceSourceConfig,

    pub symbols: BTreeMap<String, String>,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./coinfolio.toml` if it exists in current directory
/// 2. `<config dir>/coinfolio/coinfolio.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(CONFIG_FILE_NAME);
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("coinfolio").join(CONFIG_FILE_NAME);
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Self::from_config(config, config_dir)
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            let working_dir = std::env::current_dir().context("Failed to get current directory")?;
            Self::from_config(Config::default(), &working_dir)
        }
    }

    fn from_config(config: Config, config_dir: &Path) -> Result<Self> {
        let working_dir = std::env::current_dir().context("Failed to get current directory")?;
        let snapshot_dir = config.resolve_snapshot_dir(config_dir, &working_dir);

        Ok(Self {
            currency: normalize_currency(&config.currency),
            snapshot_dir,
            price_source: config.price_source,
            symbols: config.symbols,
        })
    }

    /// Apply `CURRENCY` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_currency_override(std::env::var(CURRENCY_ENV).ok())
    }

    /// Replace the currency when `value` is a non-blank code.
    pub fn with_currency_override(mut self, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.currency = normalize_currency(&value);
        }
        self
    }

    /// Build the symbol table from built-ins plus configured overrides.
    pub fn symbol_table(&self) -> SymbolTable {
        SymbolTable::with_overrides(&self.symbols)
    }
}

fn normalize_currency(value: &str) -> String {
    value.trim().to_lowercase()
}
