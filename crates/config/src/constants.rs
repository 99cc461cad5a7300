pub const TOP_LEVEL_DOMAIN: &str = "org";
pub const AUTHOR: &str = "roller";
pub const APP_NAME: &str = "roller-search";

/// Name of the daemon configuration file inside the config directory
pub const SERVER_CONFIG_FILE_NAME: &str = "server.toml";

/// Sub-directory of the cache directory holding the tantivy index
pub const INDEX_DIR_NAME: &str = "search-index";

/// Sub-directory of the cache directory holding the planet sled database
pub const PLANET_DB_DIR_NAME: &str = "planet";
