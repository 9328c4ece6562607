//! Paginated remote collection
//!
//! [`CollectEngine::collect_from_aws`] runs one logical remote operation to
//! completion: each page is one job on the client's endpoint executor, failed
//! calls are retried inside that job (keeping its slot), and pages are walked
//! and joined until no continuation remains.

use super::error::{CollectError, Result};
use super::pagination::{unhandled_pagination, Paginator};
use super::registry::ExecutorRegistry;
use super::retry::{ErrorClass, RetryPolicy, Sleeper, TokioSleeper};
use crate::aws::client::{AwsClient, Operation, Request};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Shared entry point for every collector
#[derive(Clone)]
pub struct CollectEngine {
    registry: Arc<ExecutorRegistry>,
    retry: Arc<RetryPolicy>,
    sleeper: Arc<dyn Sleeper>,
}

impl CollectEngine {
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self {
            registry,
            retry: Arc::new(RetryPolicy::default()),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Arc::new(retry);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    /// Call `operation` with `request`, following pages when `paginator` is given
    ///
    /// Without a paginator, a response that looks like one page of many is an
    /// error rather than a silently partial result.
    pub async fn collect_from_aws(
        &self,
        client: &AwsClient,
        operation: &str,
        request: Request,
        paginator: Option<&Paginator>,
    ) -> Result<Value> {
        let mut request = request;
        let mut page = self.fetch_page(client, operation, &request).await?;

        let Some(paginator) = paginator else {
            if let Some(message) = unhandled_pagination(&page) {
                tracing::error!(
                    service = client.service(),
                    region = client.region(),
                    operation,
                    "{}",
                    message
                );
                return Err(CollectError::pagination(operation, message));
            }
            return Ok(page);
        };

        let mut joined: Option<Value> = None;
        loop {
            let next = paginator.next_request(operation, &request, &page)?;
            let combined = match joined.take() {
                Some(earlier) => paginator.join(operation, earlier, page)?,
                None => page,
            };

            match next {
                None => {
                    paginator.check_list(operation, &combined)?;
                    return Ok(combined);
                }
                Some(next) => {
                    joined = Some(combined);
                    request = next;
                    page = self.fetch_page(client, operation, &request).await?;
                }
            }
        }
    }

    /// One page: a single executor job that keeps its slot across retries
    async fn fetch_page(&self, client: &AwsClient, operation: &str, request: &Request) -> Result<Value> {
        let op = client
            .operation(operation)
            .ok_or_else(|| CollectError::UnknownOperation {
                service: client.service().to_string(),
                operation: operation.to_string(),
            })?;

        let call = PageCall {
            service: client.service().to_string(),
            region: client.region().to_string(),
            operation: operation.to_string(),
            request: request.clone(),
            op,
            retry: self.retry.clone(),
            sleeper: self.sleeper.clone(),
        };

        let (tx, rx) = oneshot::channel();
        self.registry
            .for_endpoint(client.endpoint())
            .submit(move |done| async move {
                let outcome = call.run().await;
                done.done();
                let _ = tx.send(outcome);
            });

        rx.await.map_err(|_| CollectError::Abandoned {
            operation: operation.to_string(),
        })?
    }
}

enum CallState {
    Requesting,
    BackingOff(Duration),
}

struct PageCall {
    service: String,
    region: String,
    operation: String,
    request: Request,
    op: Operation,
    retry: Arc<RetryPolicy>,
    sleeper: Arc<dyn Sleeper>,
}

impl PageCall {
    async fn run(self) -> Result<Value> {
        let args = serde_json::to_string(&self.request).unwrap_or_default();
        tracing::info!(
            service = %self.service,
            region = %self.region,
            operation = %self.operation,
            args = %args,
            "collectFromAws"
        );

        let mut attempts = 0u32;
        let mut state = CallState::Requesting;

        loop {
            state = match state {
                CallState::Requesting => {
                    attempts += 1;
                    let err = match (self.op)(self.request.clone()).await {
                        Ok(response) => return Ok(response),
                        Err(err) => err,
                    };

                    let class = self.retry.classify(&err);
                    let Some(delay) = self.retry.delay_for(class) else {
                        tracing::error!(
                            service = %self.service,
                            region = %self.region,
                            operation = %self.operation,
                            args = %args,
                            error = %err,
                            "collectFromAws failed"
                        );
                        return Err(CollectError::Remote {
                            service: self.service,
                            region: self.region,
                            operation: self.operation,
                            source: err,
                        });
                    };

                    if !self.retry.allows_attempt(attempts) {
                        tracing::error!(
                            operation = %self.operation,
                            attempts,
                            error = %err,
                            "collectFromAws out of retries"
                        );
                        return Err(CollectError::RetriesExhausted {
                            operation: self.operation,
                            attempts,
                            last: err,
                        });
                    }

                    if class == ErrorClass::Throttling {
                        tracing::warn!(
                            operation = %self.operation,
                            delay_ms = delay.as_millis() as u64,
                            "throttled; will try again"
                        );
                    } else {
                        tracing::warn!(
                            service = %self.service,
                            region = %self.region,
                            operation = %self.operation,
                            error = %err,
                            "collectFromAws failed but will retry shortly"
                        );
                    }
                    CallState::BackingOff(delay)
                }
                CallState::BackingOff(delay) => {
                    self.sleeper.sleep(delay).await;
                    CallState::Requesting
                }
            };
        }
    }
}
