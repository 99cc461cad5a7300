use super::{Command, open_index, open_planet_store};
use crate::config::Config;
use crate::error::{Result, WrapErr};
use planet::{FeedUpdater, HttpFeedFetcher, PlanetScheduler, register_declared};
use search_core::rebuild_all;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

pub struct ServeCommand {
    config: Config,
}

impl ServeCommand {
    pub fn new(cfg: Config) -> Self {
        Self { config: cfg }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}

#[async_trait::async_trait]
impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let index = Arc::new(open_index(&self.config)?);
        let store = Arc::new(open_planet_store(&self.config)?);

        let added = register_declared(store.as_ref(), &self.config.planet)
            .wrap_err("Register declared subscriptions")?;
        info!(added, declared = self.config.planet.subscriptions.len(), "Subscriptions registered");

        if index.needs_rebuild() {
            warn!("Search index left inconsistent by an interrupted rebuild, rebuilding");
            let report = {
                let index = Arc::clone(&index);
                let store = Arc::clone(&store);
                tokio::task::spawn_blocking(move || {
                    rebuild_all(&index, store.as_ref(), &AtomicBool::new(false), |_| {})
                })
                .await?
                .wrap_err("Startup rebuild")?
            };
            info!(indexed = report.indexed, batches = report.batches, "Startup rebuild finished");
        }

        let fetcher = Arc::new(HttpFeedFetcher::new(&self.config.planet)?);
        let updater = FeedUpdater::new(
            fetcher,
            Arc::clone(&store),
            Arc::clone(&index),
            self.config.planet.clone(),
        );

        println!("Planet scheduler running, press Ctrl-C to stop");
        PlanetScheduler::new(updater).run(shutdown_signal()).await;

        index.close().wrap_err("Close search index")?;
        store.flush()?;
        info!("Server stopped");
        Ok(())
    }
}
