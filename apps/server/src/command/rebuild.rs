use super::{Command, open_index, open_planet_store};
use crate::config::Config;
use crate::error::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use planet::PlanetStore;
use search_core::{CancelFlag, RebuildProgress, rebuild_all, rebuild_site};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct RebuildCommand {
    config: Config,
    site: Option<String>,
}

impl RebuildCommand {
    pub fn new(cfg: Config, site: Option<String>) -> Self {
        Self { config: cfg, site }
    }

    fn progress_bar(&self, total: u64) -> Result<ProgressBar> {
        let (bar, template) = match self.site {
            None => (
                ProgressBar::new(total),
                "{spinner} Rebuilding [{elapsed}] | items {pos}/{len} ({percent}%) {msg}",
            ),
            Some(_) => (
                ProgressBar::new_spinner(),
                "{spinner} Rebuilding site [{elapsed}] | items {pos} {msg}",
            ),
        };
        bar.set_style(ProgressStyle::with_template(template)?.tick_strings(SPINNER));
        bar.enable_steady_tick(Duration::from_millis(120));
        Ok(bar)
    }
}

#[async_trait::async_trait]
impl Command for RebuildCommand {
    async fn execute(&self) -> Result<()> {
        let index = Arc::new(open_index(&self.config)?);
        let store = Arc::new(open_planet_store(&self.config)?);
        let bar = self.progress_bar(store.entry_count()? as u64)?;

        let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
        let watcher = {
            let cancel = Arc::clone(&cancel);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.store(true, Ordering::SeqCst);
                }
            })
        };

        let task = {
            let index = Arc::clone(&index);
            let store = Arc::clone(&store);
            let bar = bar.clone();
            let site = self.site.clone();
            tokio::task::spawn_blocking(move || {
                let progress = |p: RebuildProgress| {
                    bar.set_position((p.indexed + p.skipped) as u64);
                    bar.set_message(format!("batch {}", p.batches));
                };
                match site {
                    Some(site) => rebuild_site(&index, store.as_ref(), &site, &cancel, progress),
                    None => rebuild_all(&index, store.as_ref(), &cancel, progress),
                }
            })
        };
        let report = task.await?.wrap_err("Rebuild search index")?;
        watcher.abort();
        bar.finish_and_clear();
        index.close().wrap_err("Close search index")?;

        info!(
            indexed = report.indexed,
            skipped = report.skipped,
            batches = report.batches,
            cancelled = report.cancelled,
            "Rebuild finished"
        );
        if report.cancelled {
            println!(
                "Rebuild cancelled after {} batches; the index stays marked for rebuild",
                report.batches
            );
        } else {
            println!(
                "Rebuilt search index: {} items indexed, {} skipped, {} batches",
                report.indexed, report.skipped, report.batches
            );
        }
        Ok(())
    }
}
