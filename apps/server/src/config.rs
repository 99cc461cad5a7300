use crate::error::{Result, WrapErr};
use config::{AppStrategy, create_strategy, resolve_dir};
use planet::PlanetConfig;
use search_core::IndexConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default = "default_config", deny_unknown_fields)]
pub struct Config {
    /// Base directory for the index and the planet database
    pub cache_dir: PathBuf,
    pub search: IndexConfig,
    pub planet: PlanetConfig,
}

fn default_config() -> Config {
    let cache_dir = match create_strategy() {
        Ok(strategy) => resolve_dir("CACHE_DIRECTORY", &strategy, |s| Some(s.cache_dir())),
        Err(_) => std::env::temp_dir().join(config::constants::APP_NAME),
    };

    Config {
        cache_dir,
        search: IndexConfig::default().with_storage_path(config::constants::INDEX_DIR_NAME),
        planet: PlanetConfig::default(),
    }
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

impl Config {
    fn load_str(user_config_str: &str) -> Result<Config> {
        let user_config: Config = toml::from_str(user_config_str)?;
        user_config.search.validate()?;
        user_config.planet.validate()?;
        Ok(user_config)
    }

    /// Load `path`, or the platform config file. A missing platform config
    /// file is created from the example and defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        if let Some(path) = path {
            let user_config_str = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Read configuration file {}", path.display()))?;
            return Self::load_str(&user_config_str);
        }

        let strategy = create_strategy()?;
        let config_path = strategy
            .config_dir()
            .join(config::constants::SERVER_CONFIG_FILE_NAME);

        match std::fs::read_to_string(&config_path) {
            Ok(user_config_str) => Self::load_str(&user_config_str),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::create_example_config(&config_path)?;
                Self::load_str("")
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Index settings with a relative storage path resolved against `cache-dir`
    pub fn index_config(&self) -> IndexConfig {
        let mut search = self.search.clone();
        if search.storage_path.is_relative() {
            search.storage_path = self.cache_dir.join(&search.storage_path);
        }
        search
    }

    pub fn planet_db_dir(&self) -> PathBuf {
        self.cache_dir.join(config::constants::PLANET_DB_DIR_NAME)
    }

    fn create_example_config(config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(config_path, EXAMPLE_CONFIG)?;

        eprintln!("\nCreated configuration file: {}", config_path.display());
        eprintln!("Add the feeds to aggregate under [[planet.subscriptions]], then run:");
        eprintln!("   roller-search serve\n");
        Ok(())
    }
}

const EXAMPLE_CONFIG: &str = r#"# roller-search configuration
#
# Created on first run. Restart the daemon after editing.

# Base directory for the search index and the planet database
# cache-dir = "/var/cache/roller-search"

[search]
# Relative paths are resolved against cache-dir
# storage-path = "search-index"
# writer-memory = 50000000
# writer-threads = 1
# "standard" or "jieba" (Chinese word segmentation)
# tokenizer = "standard"
# rebuild-batch-size = 500

# [search.write-retry]
# attempts = 5
# initial-backoff-ms = 50
# max-backoff-ms = 2000

[planet]
# tick-secs = 60
# min-interval-secs = 300
# default-interval-secs = 3600
# failure-threshold = 5
# max-entries-per-fetch = 50
# max-concurrent-fetches = 4
# connect-timeout-secs = 10
# fetch-timeout-secs = 30
# max-body-bytes = 5242880

# [[planet.subscriptions]]
# url = "https://blogs.example.org/roller/feed/entries/atom"
# title = "Example weblog"
# site = "planet"
# interval-secs = 3600
"#;
