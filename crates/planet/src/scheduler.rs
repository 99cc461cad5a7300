// planet/src/scheduler.rs
//! 调度器 - 定时轮询到期的订阅

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::error::PlanetError;
use crate::fetch::FeedFetcher;
use crate::registry::InFlightRegistry;
use crate::store::PlanetStore;
use crate::updater::{FeedUpdater, UpdateOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub due: usize,
    /// Due but still being fetched by an earlier cycle
    pub in_flight: usize,
    pub updated: usize,
    pub not_modified: usize,
    pub failed: usize,
    /// Store or index errors
    pub errors: usize,
    pub indexed: usize,
}

pub struct PlanetScheduler<F, S> {
    updater: Arc<FeedUpdater<F, S>>,
    registry: InFlightRegistry,
}

impl<F, S> Clone for PlanetScheduler<F, S> {
    fn clone(&self) -> Self {
        Self {
            updater: Arc::clone(&self.updater),
            registry: self.registry.clone(),
        }
    }
}

impl<F, S> PlanetScheduler<F, S>
where
    F: FeedFetcher + 'static,
    S: PlanetStore + 'static,
{
    pub fn new(updater: FeedUpdater<F, S>) -> Self {
        Self {
            updater: Arc::new(updater),
            registry: InFlightRegistry::new(),
        }
    }

    pub fn registry(&self) -> &InFlightRegistry {
        &self.registry
    }

    /// Update every due subscription once, at most `max-concurrent-fetches`
    /// at a time
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, PlanetError> {
        let config = self.updater.config();
        let due: Vec<_> = self
            .updater
            .store()
            .subscriptions()?
            .into_iter()
            .filter(|sub| sub.is_due(now, config.min_interval_secs))
            .collect();

        let mut report = CycleReport {
            due: due.len(),
            ..CycleReport::default()
        };
        let claimed: Vec<_> = due
            .into_iter()
            .filter_map(|sub| match self.registry.try_claim(&sub.id) {
                Some(guard) => Some((sub, guard)),
                None => {
                    debug!(subscription = %sub.id, "Update already in flight");
                    report.in_flight += 1;
                    None
                }
            })
            .collect();

        let outcomes: Vec<_> = stream::iter(claimed)
            .map(|(sub, guard)| {
                let updater = Arc::clone(&self.updater);
                async move {
                    let id = guard.id().to_string();
                    let outcome = updater.update(sub, now).await;
                    drop(guard);
                    (id, outcome)
                }
            })
            .buffer_unordered(config.max_concurrent_fetches)
            .collect()
            .await;

        for (id, outcome) in outcomes {
            match outcome {
                Ok(UpdateOutcome::NotModified) => report.not_modified += 1,
                Ok(UpdateOutcome::Updated { indexed, .. }) => {
                    report.updated += 1;
                    report.indexed += indexed;
                }
                Ok(UpdateOutcome::Failed { .. }) => report.failed += 1,
                Err(e) => {
                    report.errors += 1;
                    error!(subscription = %id, error = %e, "Subscription update aborted");
                }
            }
        }

        if report.due > 0 {
            info!(
                due = report.due,
                updated = report.updated,
                not_modified = report.not_modified,
                failed = report.failed,
                errors = report.errors,
                indexed = report.indexed,
                "Planet cycle finished"
            );
        }
        Ok(report)
    }

    /// Run a cycle every tick until `shutdown` resolves, then wait for the
    /// cycles still running.
    pub async fn run<Fut>(self, shutdown: Fut)
    where
        Fut: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.updater.config().tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = JoinSet::new();
        tokio::pin!(shutdown);

        info!(tick = ?self.updater.config().tick(), "Planet scheduler started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    while let Some(finished) = cycles.try_join_next() {
                        if let Err(e) = finished {
                            error!(error = %e, "Planet cycle panicked");
                        }
                    }
                    let scheduler = self.clone();
                    cycles.spawn(async move {
                        if let Err(e) = scheduler.run_cycle(Utc::now()).await {
                            error!(error = %e, "Planet cycle failed");
                        }
                    });
                }
            }
        }

        info!(running = cycles.len(), "Planet scheduler stopping");
        while let Some(finished) = cycles.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "Planet cycle panicked");
            }
        }
    }
}
