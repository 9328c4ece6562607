//! awsinv - snapshot an AWS account into a tree of canonical JSON files
//!
//! - [`engine`] - bounded per-endpoint scheduling, paginated collection with
//!   retries, prefix expansion
//! - [`store`] - atomic writes under the output directory
//! - [`aws`] - capability-map clients and their SDK backing
//! - [`collectors`] - per-service collection built on the engine

pub mod aws;
pub mod collectors;
pub mod config;
pub mod engine;
pub mod resource;
pub mod store;

/// Version injected at compile time via AWSINV_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AWSINV_VERSION") {
    Some(v) => v,
    None => "dev",
};
