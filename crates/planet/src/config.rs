// planet/src/config.rs
//! 配置模块

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PlanetError;

pub const DEFAULT_MAX_ENTRIES_PER_FETCH: usize = 50;
pub const MAX_ENTRIES_PER_FETCH_LIMIT: usize = 500;
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PlanetConfig {
    /// Seconds between scheduler passes
    pub tick_secs: u64,
    /// Floor applied to every subscription's interval
    pub min_interval_secs: u64,
    /// Interval for declared subscriptions that do not set one
    pub default_interval_secs: u64,
    /// Consecutive failures after which a subscription is marked failed
    pub failure_threshold: u32,
    pub max_entries_per_fetch: usize,
    pub max_concurrent_fetches: usize,
    pub connect_timeout_secs: u64,
    /// Whole-request limit, connect included
    pub fetch_timeout_secs: u64,
    pub max_body_bytes: u64,
    pub user_agent: String,
    pub subscriptions: Vec<DeclaredSubscription>,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            min_interval_secs: 300,
            default_interval_secs: 3_600,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            max_entries_per_fetch: DEFAULT_MAX_ENTRIES_PER_FETCH,
            max_concurrent_fetches: 4,
            connect_timeout_secs: 10,
            fetch_timeout_secs: 30,
            max_body_bytes: 5 * 1024 * 1024,
            user_agent: format!("roller-planet/{}", env!("CARGO_PKG_VERSION")),
            subscriptions: Vec::new(),
        }
    }
}

/// A feed listed in the configuration file
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DeclaredSubscription {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Planet group the entries are indexed under
    #[serde(default = "default_site")]
    pub site: String,
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

fn default_site() -> String {
    "planet".to_string()
}

impl PlanetConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), PlanetError> {
        if !(1..=MAX_ENTRIES_PER_FETCH_LIMIT).contains(&self.max_entries_per_fetch) {
            return Err(PlanetError::Config(format!(
                "max-entries-per-fetch {} is outside 1..={MAX_ENTRIES_PER_FETCH_LIMIT}",
                self.max_entries_per_fetch
            )));
        }
        let positive = [
            ("tick-secs", self.tick_secs),
            ("connect-timeout-secs", self.connect_timeout_secs),
            ("fetch-timeout-secs", self.fetch_timeout_secs),
            ("max-body-bytes", self.max_body_bytes),
            ("failure-threshold", u64::from(self.failure_threshold)),
            ("max-concurrent-fetches", self.max_concurrent_fetches as u64),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(PlanetError::Config(format!("{key} must be at least 1")));
        }
        if let Some(declared) = self.subscriptions.iter().find(|s| s.url.trim().is_empty()) {
            return Err(PlanetError::Config(format!(
                "subscription in site {:?} has an empty url",
                declared.site
            )));
        }
        if let Some(declared) = self
            .subscriptions
            .iter()
            .find(|s| s.site.is_empty() || s.site.trim() != s.site)
        {
            return Err(PlanetError::Config(format!(
                "subscription {} has an invalid site {:?}",
                declared.url, declared.site
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_valid() {
        assert!(PlanetConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(50, true)]
    #[case(500, true)]
    #[case(501, false)]
    fn test_entry_cap_bounds(#[case] cap: usize, #[case] ok: bool) {
        let config = PlanetConfig {
            max_entries_per_fetch: cap,
            ..PlanetConfig::default()
        };
        assert_eq!(config.validate().is_ok(), ok);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = PlanetConfig {
            max_concurrent_fetches: 0,
            ..PlanetConfig::default()
        };
        assert!(matches!(config.validate(), Err(PlanetError::Config(_))));
    }

    #[test]
    fn test_parse_declared_subscriptions() {
        let config: PlanetConfig = toml::from_str(
            r#"
            min-interval-secs = 600

            [[subscriptions]]
            url = "https://example.org/feed.xml"
            title = "Example"

            [[subscriptions]]
            url = "https://blogs.example.com/atom"
            site = "java"
            interval-secs = 7200
            "#,
        )
        .unwrap();
        assert_eq!(config.min_interval_secs, 600);
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.subscriptions.len(), 2);
        assert_eq!(config.subscriptions[0].site, "planet");
        assert_eq!(config.subscriptions[1].interval_secs, Some(7200));
    }

    #[rstest]
    #[case("")]
    #[case(" planet")]
    #[case("planet ")]
    fn test_padded_site_rejected(#[case] site: &str) {
        let config = PlanetConfig {
            subscriptions: vec![DeclaredSubscription {
                url: "https://example.org/feed.xml".to_string(),
                title: None,
                site: site.to_string(),
                interval_secs: None,
            }],
            ..PlanetConfig::default()
        };
        assert!(matches!(config.validate(), Err(PlanetError::Config(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<PlanetConfig, _> = toml::from_str("poll = 5");
        assert!(result.is_err());
    }
}
