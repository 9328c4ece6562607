//! Collection engine
//!
//! The pieces every collector is built from.
//!
//! # Module Structure
//!
//! - [`executor`] - Bounded FIFO job queue per endpoint
//! - [`registry`] - Lazily created executors keyed by endpoint host
//! - [`pagination`] - Page-walking descriptors for the two AWS idioms
//! - [`retry`] - Throttling and retryable-error policy
//! - [`collect`] - One logical remote operation, all pages, with retries
//! - [`expander`] - Exhaustive listing for truncating APIs with no token
//!
//! # Example
//!
//! ```ignore
//! use awsinv::engine::{CollectEngine, ExecutorRegistry, Paginator};
//!
//! async fn example(client: &awsinv::aws::AwsClient) -> anyhow::Result<()> {
//!     let engine = CollectEngine::new(std::sync::Arc::new(ExecutorRegistry::default()));
//!     let paginator = Paginator::new("NextToken", "NextToken", "Reservations");
//!     let instances = engine
//!         .collect_from_aws(client, "describeInstances", Default::default(), Some(&paginator))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod collect;
pub mod error;
pub mod executor;
pub mod expander;
pub mod pagination;
pub mod registry;
pub mod retry;

pub use collect::CollectEngine;
pub use error::{CollectError, Result};
pub use executor::{Completion, Executor, ExecutorStats};
pub use expander::PrefixTruncationExpander;
pub use pagination::Paginator;
pub use registry::ExecutorRegistry;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
