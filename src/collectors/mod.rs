//! Resource collectors
//!
//! Each collector is a short composition of "call operation X, shape the
//! result, save it to path Z" on top of the engine. Collectors only talk to
//! the remote side through [`CollectEngine::collect_from_aws`] and only write
//! through the shared [`AtomicFile`].

pub mod s3;
pub mod sqs;

use crate::aws::regions::{filter_regions, regions_for_service};
use crate::aws::{sdk_dispatch, AwsClient};
use crate::engine::CollectEngine;
use crate::store::AtomicFile;
use anyhow::Result;
use aws_config::SdkConfig;
use std::sync::Arc;

/// Source of clients for a (service, region) pair
pub trait ClientProvider: Send + Sync {
    fn client(&self, service: &str, region: &str) -> AwsClient;
}

/// Clients backed by the AWS SDK
pub struct SdkClients {
    sdk: SdkConfig,
}

impl SdkClients {
    pub fn new(sdk: SdkConfig) -> Self {
        Self { sdk }
    }
}

impl ClientProvider for SdkClients {
    fn client(&self, service: &str, region: &str) -> AwsClient {
        match service {
            "sqs" => sdk_dispatch::sqs_client(&self.sdk, region),
            "s3" => sdk_dispatch::s3_client(&self.sdk, region),
            // every call on it fails with UnknownOperation
            _ => AwsClient::builder(service, region).build(),
        }
    }
}

/// Everything a collector needs for one run
pub struct CollectContext {
    pub engine: CollectEngine,
    pub store: AtomicFile,
    pub clients: Arc<dyn ClientProvider>,
    pub region_patterns: Vec<String>,
}

impl CollectContext {
    /// Regions to visit for `service` after applying the region filter
    pub fn regions(&self, service: &str) -> Vec<&'static str> {
        filter_regions(regions_for_service(service), &self.region_patterns)
    }

    pub fn client(&self, service: &str, region: &str) -> AwsClient {
        self.clients.client(service, region)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collector {
    S3,
    Sqs,
}

impl Collector {
    pub const ALL: &'static [Collector] = &[Collector::S3, Collector::Sqs];

    pub fn name(self) -> &'static str {
        match self {
            Collector::S3 => "s3",
            Collector::Sqs => "sqs",
        }
    }

    pub async fn collect(self, ctx: &CollectContext) -> Result<()> {
        match self {
            Collector::S3 => s3::collect_all(ctx).await,
            Collector::Sqs => sqs::collect_all(ctx).await,
        }
    }
}

/// Collectors whose name contains any of `patterns`; no patterns selects all
pub fn select(patterns: &[String]) -> Vec<Collector> {
    Collector::ALL
        .iter()
        .copied()
        .filter(|c| patterns.is_empty() || patterns.iter().any(|p| c.name().contains(p.as_str())))
        .collect()
}

/// Run `collectors` concurrently and wait for all of them
///
/// A failing collector does not stop the others, and what they already wrote
/// stays on disk.
pub async fn run_all(
    ctx: &CollectContext,
    collectors: &[Collector],
) -> Vec<(Collector, Result<()>)> {
    let runs = collectors.iter().map(|&collector| async move {
        tracing::info!("Starting {} collector", collector.name());
        let result = collector.collect(ctx).await;
        match &result {
            Ok(()) => tracing::info!("Finished {} collector", collector.name()),
            Err(e) => tracing::error!("{} collector failed: {:#}", collector.name(), e),
        }
        (collector, result)
    });
    futures::future::join_all(runs).await
}
