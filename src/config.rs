//! Configuration
//!
//! Sources, highest priority first:
//! 1. Command-line flags (`--database`, `--config`)
//! 2. Environment (`NUTRISEED_DATABASE_PATH`, `NUTRISEED_CONFIG`, `USDA_API_KEY`)
//! 3. TOML file
//! 4. Built-in defaults
//!
//! Flags and their environment fallbacks are resolved by clap; this module
//! layers the result over the TOML file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::glycemic::GlycemicTable;

pub const ENV_DATABASE_PATH: &str = "NUTRISEED_DATABASE_PATH";
pub const ENV_CONFIG: &str = "NUTRISEED_CONFIG";
pub const ENV_USDA_API_KEY: &str = "USDA_API_KEY";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file to build
    pub database_path: PathBuf,
    pub usda: UsdaConfig,
    pub openfoodfacts: OpenFoodFactsConfig,
    pub glycemic: GlycemicConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("nutrients.db"),
            usda: UsdaConfig::default(),
            openfoodfacts: OpenFoodFactsConfig::default(),
            glycemic: GlycemicConfig::default(),
        }
    }
}

/// USDA FoodData Central settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UsdaConfig {
    pub api_key: String,
    pub base_url: String,
    /// "Foundation", "SR Legacy", "Branded", ...
    pub data_types: Vec<String>,
    pub page_size: u32,
    pub max_pages: u32,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            api_key: "DEMO_KEY".to_string(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_string(),
            data_types: vec![
                "Foundation".to_string(),
                "SR Legacy".to_string(),
                "Branded".to_string(),
            ],
            page_size: 50,
            max_pages: 100,
            request_delay_ms: 1000,
            timeout_secs: 30,
        }
    }
}

impl UsdaConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// OpenFoodFacts settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OpenFoodFactsConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Category tags searched by popularity
    pub categories: Vec<String>,
    /// Individual products fetched after the category search
    pub barcodes: Vec<String>,
    /// Maximum products taken from category searches
    pub limit: usize,
    pub page_size: u32,
    pub request_delay_ms: u64,
    pub barcode_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for OpenFoodFactsConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            base_url: "https://world.openfoodfacts.org/api/v2".to_string(),
            user_agent: format!("nutriseed/{} (nutrition database builder)", env!("CARGO_PKG_VERSION")),
            categories: strings(&[
                "beverages",
                "breakfast-cereals",
                "chocolates",
                "cookies",
                "dairy",
                "frozen-foods",
                "fruits",
                "meats",
                "snacks",
                "sodas",
                "yogurts",
                "breads",
                "cheeses",
            ]),
            barcodes: strings(&[
                "012000001772",
                "049000006346",
                "012000809965",
                "070847811169",
                "028400064057",
                "028400040402",
                "030100106012",
                "038000845512",
                "016000275270",
                "038000201103",
                "030000066102",
                "040000017702",
                "034000002009",
                "034000232901",
                "034000440016",
                "053600000277",
                "036632039323",
                "038000357213",
                "750049000454",
                "638102202116",
            ]),
            limit: 500,
            page_size: 50,
            request_delay_ms: 500,
            barcode_delay_ms: 200,
            timeout_secs: 10,
        }
    }
}

impl OpenFoodFactsConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn barcode_delay(&self) -> Duration {
        Duration::from_millis(self.barcode_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Glycemic reference adjustments
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GlycemicConfig {
    /// keyword → index, added to or replacing the built-in table
    pub overrides: BTreeMap<String, u32>,
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Build the effective configuration
    ///
    /// `config_path` and `database_path` are the already-resolved flag/env
    /// values; `env` looks up the remaining environment overrides.
    pub fn resolve<F>(
        config_path: Option<&Path>,
        database_path: Option<PathBuf>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                debug!("no config file, using defaults");
                Self::default()
            }
        };

        if let Some(key) = env(ENV_USDA_API_KEY).filter(|k| !k.trim().is_empty()) {
            config.usda.api_key = key.trim().to_string();
        }
        if let Some(path) = database_path {
            config.database_path = path;
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolve without clap: the config file and database path fall back to
    /// `NUTRISEED_CONFIG` and `NUTRISEED_DATABASE_PATH`
    pub fn from_env<F>(database_path: Option<PathBuf>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = env(ENV_CONFIG).filter(|p| !p.trim().is_empty()).map(PathBuf::from);
        let database_path = database_path.or_else(|| {
            env(ENV_DATABASE_PATH)
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
        });
        Self::resolve(config_path.as_deref(), database_path, env)
    }

    /// Reject values no importer can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database_path is empty".to_string()));
        }
        for (section, url) in [
            ("usda", &self.usda.base_url),
            ("openfoodfacts", &self.openfoodfacts.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "[{}] base_url must be an http(s) URL, got '{}'",
                    section, url
                )));
            }
        }
        if self.usda.page_size == 0 || self.openfoodfacts.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".to_string()));
        }
        self.glycemic_table()?;
        Ok(())
    }

    /// Built-in glycemic table with the configured overrides applied
    pub fn glycemic_table(&self) -> Result<GlycemicTable, ConfigError> {
        GlycemicTable::builtin()
            .with_overrides(&self.glycemic.overrides)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database_path, PathBuf::from("nutrients.db"));
        assert_eq!(config.usda.page_size, 50);
        assert_eq!(config.openfoodfacts.categories.len(), 13);
        assert_eq!(config.openfoodfacts.barcodes.len(), 20);
        assert_eq!(config.openfoodfacts.timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            database_path = "build/foods.db"

            [usda]
            data_types = ["Foundation"]
            max_pages = 2

            [glycemic.overrides]
            jicama = 17
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("build/foods.db"));
        assert_eq!(config.usda.data_types, vec!["Foundation".to_string()]);
        assert_eq!(config.usda.max_pages, 2);
        assert_eq!(config.usda.page_size, 50);
        assert_eq!(config.openfoodfacts.limit, 500);
        assert_eq!(config.glycemic_table().unwrap().get("jicama").unwrap().index, 17);
    }

    #[test]
    fn test_override_above_range_rejected() {
        let result = Config::from_toml_str("[glycemic.overrides]\ndates = 103\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let result = Config::from_toml_str("database_path = [");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_bad_url_rejected() {
        let result = Config::from_toml_str("[usda]\nbase_url = \"ftp://example\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_layering_flag_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nutriseed.toml");
        fs::write(
            &path,
            "database_path = \"from-file.db\"\n[usda]\napi_key = \"file-key\"\n",
        )
        .unwrap();

        let from_file = Config::resolve(Some(path.as_path()), None, no_env).unwrap();
        assert_eq!(from_file.database_path, PathBuf::from("from-file.db"));
        assert_eq!(from_file.usda.api_key, "file-key");

        let env = |key: &str| (key == ENV_USDA_API_KEY).then(|| "env-key".to_string());
        let layered = Config::resolve(Some(path.as_path()), Some(PathBuf::from("flag.db")), env).unwrap();
        assert_eq!(layered.database_path, PathBuf::from("flag.db"));
        assert_eq!(layered.usda.api_key, "env-key");
    }

    #[test]
    fn test_from_env_reads_config_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nutriseed.toml");
        fs::write(&path, "database_path = \"from-file.db\"\n[glycemic.overrides]\ntaco = 40\n").unwrap();

        let config_path = path.to_string_lossy().into_owned();
        let env = move |key: &str| match key {
            ENV_CONFIG => Some(config_path.clone()),
            ENV_DATABASE_PATH => Some("from-env.db".to_string()),
            _ => None,
        };

        let config = Config::from_env(None, &env).unwrap();
        assert_eq!(config.database_path, PathBuf::from("from-env.db"));
        assert_eq!(config.glycemic_table().unwrap().get("taco").unwrap().index, 40);

        let with_arg = Config::from_env(Some(PathBuf::from("arg.db")), &env).unwrap();
        assert_eq!(with_arg.database_path, PathBuf::from("arg.db"));

        let bare = Config::from_env(None, no_env).unwrap();
        assert_eq!(bare.database_path, PathBuf::from("nutrients.db"));
        assert_eq!(bare.glycemic_table().unwrap().get("taco").unwrap().index, 52);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::resolve(Some(dir.path().join("absent.toml").as_path()), None, no_env);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
