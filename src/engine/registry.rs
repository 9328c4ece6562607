//! Executor registry
//!
//! One [`Executor`] per remote endpoint, created on first use and kept for
//! the registry's lifetime. Unrelated endpoints never share a queue.

use super::error::{CollectError, Result};
use super::executor::{Executor, ExecutorStats};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Default number of concurrent calls per endpoint
pub const DEFAULT_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => panic!("default concurrency must be non-zero"),
};

/// Endpoint key used when a client does not name its host
pub const DEFAULT_ENDPOINT: &str = "default";

pub struct ExecutorRegistry {
    concurrency: NonZeroUsize,
    executors: Mutex<HashMap<String, Executor>>,
}

impl ExecutorRegistry {
    /// Build an empty registry; fails when `concurrency` is below one
    pub fn with_concurrency(concurrency: usize) -> Result<Self> {
        let concurrency = NonZeroUsize::new(concurrency)
            .ok_or_else(|| CollectError::InvalidConcurrency(concurrency.to_string()))?;

        Ok(Self {
            concurrency,
            executors: Mutex::new(HashMap::new()),
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    /// Get (or lazily create) the executor for an endpoint
    pub fn for_endpoint(&self, endpoint: &str) -> Executor {
        let key = if endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            endpoint
        };

        let mut executors = self
            .executors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        executors
            .entry(key.to_string())
            .or_insert_with(|| {
                tracing::debug!(endpoint = key, max = self.concurrency.get(), "creating executor");
                Executor::bounded(self.concurrency)
            })
            .clone()
    }

    /// Counters for every endpoint seen so far, sorted by endpoint
    pub fn inspect(&self) -> Vec<(String, ExecutorStats)> {
        let executors = self
            .executors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut stats: Vec<_> = executors
            .iter()
            .map(|(key, executor)| (key.clone(), executor.inspect()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            executors: Mutex::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_endpoint_shares_executor() {
        let registry = ExecutorRegistry::with_concurrency(3).unwrap();
        registry.for_endpoint("sqs.eu-west-1.amazonaws.com");
        registry.for_endpoint("sqs.eu-west-1.amazonaws.com");
        registry.for_endpoint("sqs.us-east-1.amazonaws.com");

        let stats = registry.inspect();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].0, "sqs.eu-west-1.amazonaws.com");
        assert_eq!(stats[0].1.max, 3);
    }

    #[test]
    fn test_empty_endpoint_uses_default_key() {
        let registry = ExecutorRegistry::default();
        registry.for_endpoint("");
        assert_eq!(registry.inspect()[0].0, DEFAULT_ENDPOINT);
        assert_eq!(registry.concurrency(), 10);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        assert!(ExecutorRegistry::with_concurrency(0).is_err());
    }
}
