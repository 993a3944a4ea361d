//! Rollup Configuration
//!
//! Shared configuration crate for the rollup engine and its binary.
//!
//! Handles loading configuration from:
//! 1. ROLLUP_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.rollup/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<RollupConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".rollup";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_DB_PATH: &str = "./rollup-db";
const DEFAULT_MIN_TRANSACTIONS: usize = 1;
const DEFAULT_MAX_TRANSACTIONS: usize = 64;
/// Label the default operator identity is derived from
const DEFAULT_OPERATOR_LABEL: &str = "rollup-operator";

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollupConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub batch: BatchTomlConfig,
    #[serde(default)]
    pub gate: GateTomlConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.into(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

/// Batch size bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTomlConfig {
    #[serde(default = "default_min_transactions")]
    pub min_transactions: usize,
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
}

impl Default for BatchTomlConfig {
    fn default() -> Self {
        Self {
            min_transactions: DEFAULT_MIN_TRANSACTIONS,
            max_transactions: DEFAULT_MAX_TRANSACTIONS,
        }
    }
}

fn default_min_transactions() -> usize {
    DEFAULT_MIN_TRANSACTIONS
}
fn default_max_transactions() -> usize {
    DEFAULT_MAX_TRANSACTIONS
}

/// Proof verifier selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerifierModeToml {
    #[default]
    Mock,
    Groth16,
}

impl std::str::FromStr for VerifierModeToml {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "groth16" => Ok(Self::Groth16),
            other => Err(format!("unknown verifier mode: {}", other)),
        }
    }
}

/// Proof gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateTomlConfig {
    /// Operator identity as hex. Falls back to an identity derived from
    /// `operator_label` when unset.
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default = "default_operator_label")]
    pub operator_label: String,
    /// Genesis root (decimal or 0x-hex). When unset the genesis root is
    /// computed from the first batch's initial accounts. When set it must equal
    /// the root of those accounts, otherwise no batch could ever link to it.
    #[serde(default)]
    pub genesis_root: Option<String>,
    #[serde(default)]
    pub verifier: VerifierModeToml,
    /// Compressed Groth16 verifying key (verifier = "groth16")
    #[serde(default)]
    pub verifying_key_path: Option<String>,
}

impl Default for GateTomlConfig {
    fn default() -> Self {
        Self {
            operator: None,
            operator_label: DEFAULT_OPERATOR_LABEL.into(),
            genesis_root: None,
            verifier: VerifierModeToml::Mock,
            verifying_key_path: None,
        }
    }
}

fn default_operator_label() -> String {
    DEFAULT_OPERATOR_LABEL.into()
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        parse_override(key, &v, field);
    }
}

/// Overwrite `field` with `value` if it parses; otherwise keep the current value
fn parse_override<T: std::str::FromStr>(key: &str, value: &str, field: &mut T) {
    match value.parse() {
        Ok(parsed) => *field = parsed,
        Err(_) => log::warn!("Ignoring unparseable {}={}", key, value),
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl RollupConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check ROLLUP_CONFIG env var
        if let Ok(path) = env::var("ROLLUP_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.rollup/config.toml
        dirs::home_dir()
            .map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        env_string("ROLLUP_DB_PATH", &mut self.database.path);

        env_parse("BATCH_MIN_TXS", &mut self.batch.min_transactions);
        env_parse("BATCH_MAX_TXS", &mut self.batch.max_transactions);

        env_option_string("ROLLUP_OPERATOR", &mut self.gate.operator);
        env_option_string("ROLLUP_GENESIS_ROOT", &mut self.gate.genesis_root);
        env_option_string("ROLLUP_VERIFYING_KEY", &mut self.gate.verifying_key_path);
        env_parse("ROLLUP_VERIFIER", &mut self.gate.verifier);
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static RollupConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Try to get the global config instance.
    ///
    /// Returns `None` if config hasn't been initialized yet.
    pub fn try_global() -> Option<&'static RollupConfig> {
        GLOBAL_CONFIG.get()
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: RollupConfig) -> Result<(), RollupConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `RollupConfig::global()`.
#[inline]
pub fn global_config() -> &'static RollupConfig {
    RollupConfig::global()
}

// ============================================================================
// Tests
// ============================================================================
