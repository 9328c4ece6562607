//! AWS Client
//!
//! A client is one (service, region, endpoint) triple plus a capability map
//! from operation name to an async function. The map is filled once when the
//! client is built and never changes afterwards.

use super::error::RemoteError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Named arguments for one remote call
pub type Request = Map<String, Value>;

/// One callable remote operation
pub type Operation = Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Value, RemoteError>> + Send + Sync>;

/// Cloneable handle to a remote service in one region
#[derive(Clone)]
pub struct AwsClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    service: String,
    region: String,
    endpoint: String,
    operations: HashMap<String, Operation>,
}

impl AwsClient {
    pub fn builder(service: &str, region: &str) -> AwsClientBuilder {
        AwsClientBuilder {
            service: service.to_string(),
            region: region.to_string(),
            endpoint: None,
            operations: HashMap::new(),
        }
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn region(&self) -> &str {
        &self.inner.region
    }

    /// Host name used to pick this client's executor
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn operation(&self, name: &str) -> Option<Operation> {
        self.inner.operations.get(name).cloned()
    }

    /// Operation names, sorted
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.operations.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for AwsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsClient")
            .field("service", &self.inner.service)
            .field("region", &self.inner.region)
            .field("endpoint", &self.inner.endpoint)
            .field("operations", &self.operation_names())
            .finish()
    }
}

pub struct AwsClientBuilder {
    service: String,
    region: String,
    endpoint: Option<String>,
    operations: HashMap<String, Operation>,
}

impl AwsClientBuilder {
    /// Override the endpoint host (defaults to `<service>.<region>.amazonaws.com`)
    pub fn endpoint(mut self, host: impl Into<String>) -> Self {
        self.endpoint = Some(host.into());
        self
    }

    /// Register an operation under `name`
    pub fn operation<F, Fut>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + Send + 'static,
    {
        let op: Operation = Arc::new(move |request| f(request).boxed());
        self.operations.insert(name.to_string(), op);
        self
    }

    pub fn build(self) -> AwsClient {
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| format!("{}.{}.amazonaws.com", self.service, self.region));

        AwsClient {
            inner: Arc::new(ClientInner {
                service: self.service,
                region: self.region,
                endpoint,
                operations: self.operations,
            }),
        }
    }
}
