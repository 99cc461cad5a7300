// planet/src/subscription.rs
//! Subscriptions and their polling state

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::DeclaredSubscription;
use crate::entry::digest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    #[default]
    Active,
    /// Too many consecutive failures; skipped until reset
    Failed,
}

/// HTTP cache validators from the last successful download
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub url: String,
    pub title: String,
    /// Planet group handle used as the entries' site
    pub site_id: String,
    pub last_fetched: Option<DateTime<Utc>>,
    pub interval_secs: u64,
    pub failure_count: u32,
    pub status: SubscriptionStatus,
    pub validators: Validators,
}

/// Identity derived from the feed url, stable across restarts
pub fn subscription_id(url: &str) -> String {
    format!("sub-{}", &digest(&[url.trim()])[..16])
}

impl Subscription {
    pub fn new(url: impl Into<String>, site_id: impl Into<String>, interval_secs: u64) -> Self {
        let url = url.into();
        Self {
            id: subscription_id(&url),
            title: url.clone(),
            url,
            site_id: site_id.into(),
            last_fetched: None,
            interval_secs,
            failure_count: 0,
            status: SubscriptionStatus::Active,
            validators: Validators::default(),
        }
    }

    pub fn from_declared(declared: &DeclaredSubscription, default_interval_secs: u64) -> Self {
        let mut sub = Self::new(
            declared.url.trim(),
            declared.site.clone(),
            declared.interval_secs.unwrap_or(default_interval_secs),
        );
        if let Some(title) = &declared.title {
            sub.title = title.clone();
        }
        sub
    }

    /// Due when active and never fetched, or when more than
    /// `max(interval_secs, min_interval_secs)` has passed since the last success.
    pub fn is_due(&self, now: DateTime<Utc>, min_interval_secs: u64) -> bool {
        if self.status == SubscriptionStatus::Failed {
            return false;
        }
        let Some(last) = self.last_fetched else {
            return true;
        };
        let interval = self.interval_secs.max(min_interval_secs);
        let interval = Duration::seconds(i64::try_from(interval).unwrap_or(i64::MAX));
        now.signed_duration_since(last) > interval
    }

    pub fn record_success(&mut self, now: DateTime<Utc>, validators: Validators) {
        self.last_fetched = Some(now);
        self.failure_count = 0;
        self.validators = validators;
    }

    /// Count a failed attempt. Returns true when this failure flipped the
    /// subscription to `Failed`.
    pub fn record_failure(&mut self, threshold: u32) -> bool {
        self.failure_count = self.failure_count.saturating_add(1);
        if self.status == SubscriptionStatus::Active && self.failure_count >= threshold {
            self.status = SubscriptionStatus::Failed;
            warn!(
                subscription = %self.id,
                url = %self.url,
                failures = self.failure_count,
                "Subscription marked failed"
            );
            return true;
        }
        false
    }

    /// Back to `Active` with a clean failure count
    pub fn reset(&mut self) {
        self.status = SubscriptionStatus::Active;
        self.failure_count = 0;
    }

    /// Take over title, site and interval from the configuration file,
    /// keeping the polling state.
    pub fn apply_declared(&mut self, declared: &DeclaredSubscription, default_interval_secs: u64) {
        if let Some(title) = &declared.title {
            self.title = title.clone();
        }
        self.site_id = declared.site.clone();
        self.interval_secs = declared.interval_secs.unwrap_or(default_interval_secs);
    }
}
