use super::{Command, open_index, open_planet_store};
use crate::config::Config;
use crate::error::Result;
use chrono::Utc;
use planet::{PlanetStore, SubscriptionStatus};

pub struct StatusCommand {
    config: Config,
}

impl StatusCommand {
    pub fn new(cfg: Config) -> Self {
        Self { config: cfg }
    }
}

#[async_trait::async_trait]
impl Command for StatusCommand {
    async fn execute(&self) -> Result<()> {
        let index = open_index(&self.config)?;
        let stats = index.stats();
        println!("Search index: {}", self.config.index_config().storage_path.display());
        println!("  documents: {}", stats.num_docs);
        println!("  segments:  {}", stats.num_segments);
        if index.needs_rebuild() {
            println!("  an interrupted rebuild left the index inconsistent; run `roller-search rebuild`");
        }
        index.close()?;

        let store = open_planet_store(&self.config)?;
        let subscriptions = store.subscriptions()?;
        println!(
            "Planet: {} subscriptions, {} entries",
            subscriptions.len(),
            store.entry_count()?
        );

        let now = Utc::now();
        let floor = self.config.planet.min_interval_secs;
        for sub in &subscriptions {
            let status = match sub.status {
                SubscriptionStatus::Active if sub.is_due(now, floor) => "due",
                SubscriptionStatus::Active => "active",
                SubscriptionStatus::Failed => "FAILED",
            };
            let last = sub
                .last_fetched
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  {}  {:<6}  failures={}  last-fetched={}  [{}] {}",
                sub.id, status, sub.failure_count, last, sub.site_id, sub.url
            );
        }
        Ok(())
    }
}
