// search-core/src/config.rs
//! 配置模块

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::IndexError;

/// Smallest per-thread writer heap tantivy accepts
pub const MIN_WRITER_MEMORY_PER_THREAD: usize = 15_000_000;
pub const DEFAULT_REBUILD_BATCH_SIZE: usize = 500;
pub const MAX_REBUILD_BATCH_SIZE: usize = 10_000;

/// Word segmentation used for every tokenized field, at index and query time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenizerKind {
    /// Unicode word boundaries, lowercased
    #[default]
    Standard,
    /// Chinese segmentation via jieba, lowercased
    Jieba,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct IndexConfig {
    /// Index directory
    pub storage_path: PathBuf,
    /// Total writer heap in bytes, split across writer threads
    pub writer_memory: usize,
    pub writer_threads: usize,
    pub tokenizer: TokenizerKind,
    /// Repository page size used by rebuilds
    pub rebuild_batch_size: usize,
    pub write_retry: RetryPolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("search-index"),
            writer_memory: 50_000_000,
            writer_threads: 1,
            tokenizer: TokenizerKind::default(),
            rebuild_batch_size: DEFAULT_REBUILD_BATCH_SIZE,
            write_retry: RetryPolicy::default(),
        }
    }
}

impl IndexConfig {
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        validate_batch_size(self.rebuild_batch_size)?;
        if self.writer_threads == 0 {
            return Err(IndexError::Config("writer-threads must be at least 1".into()));
        }
        if self.writer_memory / self.writer_threads < MIN_WRITER_MEMORY_PER_THREAD {
            return Err(IndexError::Config(format!(
                "writer-memory must give each of the {} writer threads at least {} bytes",
                self.writer_threads, MIN_WRITER_MEMORY_PER_THREAD
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_batch_size(batch_size: usize) -> Result<(), IndexError> {
    if (1..=MAX_REBUILD_BATCH_SIZE).contains(&batch_size) {
        Ok(())
    } else {
        Err(IndexError::Config(format!(
            "rebuild batch size {batch_size} is outside 1..={MAX_REBUILD_BATCH_SIZE}"
        )))
    }
}

/// Bounded exponential backoff for writer contention
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_backoff_ms: 50,
            max_backoff_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once
    pub fn none() -> Self {
        Self {
            attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Delay before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config_is_valid() {
        assert!(IndexConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(500, true)]
    #[case(10_000, true)]
    #[case(10_001, false)]
    fn test_batch_size_bounds(#[case] size: usize, #[case] ok: bool) {
        assert_eq!(validate_batch_size(size).is_ok(), ok);
    }

    #[test]
    fn test_writer_memory_per_thread() {
        let config = IndexConfig {
            writer_memory: 20_000_000,
            writer_threads: 2,
            ..IndexConfig::default()
        };
        assert!(matches!(config.validate(), Err(IndexError::Config(_))));
    }

    #[test]
    fn test_backoff_grows_until_cap() {
        let policy = RetryPolicy {
            attempts: 10,
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(500));
        assert_eq!(policy.backoff(70), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_kebab_case_toml() {
        let config: IndexConfig = toml::from_str(
            r#"
            storage-path = "/var/lib/roller/index"
            tokenizer = "jieba"
            rebuild-batch-size = 200

            [write-retry]
            attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.tokenizer, TokenizerKind::Jieba);
        assert_eq!(config.rebuild_batch_size, 200);
        assert_eq!(config.write_retry.attempts, 3);
        assert_eq!(config.write_retry.initial_backoff_ms, 50);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<IndexConfig, _> = toml::from_str("heap = 1");
        assert!(result.is_err());
    }
}
