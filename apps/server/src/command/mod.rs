pub mod rebuild;
pub mod reset;
pub mod serve;
pub mod status;

use crate::config::Config;
use crate::error::{Result, WrapErr};
use planet::SledPlanetStore;
use search_core::IndexStore;

pub use rebuild::RebuildCommand;
pub use reset::ResetSubscriptionCommand;
pub use serve::ServeCommand;
pub use status::StatusCommand;

#[async_trait::async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

fn open_index(config: &Config) -> Result<IndexStore> {
    let index_config = config.index_config();
    let path = index_config.storage_path.clone();
    IndexStore::open(index_config)
        .wrap_err_with(|| format!("Open search index at {}", path.display()))
}

fn open_planet_store(config: &Config) -> Result<SledPlanetStore> {
    let path = config.planet_db_dir();
    SledPlanetStore::open(&path)
        .wrap_err_with(|| format!("Open planet database at {}", path.display()))
}
