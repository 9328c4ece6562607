//! Bounded Concurrency Executor
//!
//! A FIFO job queue that admits at most `max` running jobs. A job receives a
//! [`Completion`] and frees its slot by signaling it (or dropping it, which
//! includes panicking). Its slot then goes straight to the next queued job.
//! Jobs only start on a spawned runner task and never inside `submit`.

use super::error::{CollectError, Result};
use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

type Job = Box<dyn FnOnce(Completion) -> BoxFuture<'static, ()> + Send>;

/// Snapshot of an executor's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    pub queue: usize,
    pub running: usize,
    pub max: usize,
}

/// Signal handed to every job; consuming or dropping it frees the slot
pub struct Completion {
    tx: Option<oneshot::Sender<()>>,
}

impl Completion {
    /// Tell the executor this job is finished with its slot
    pub fn done(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

struct State {
    queue: VecDeque<Job>,
    running: usize,
}

struct Inner {
    state: Mutex<State>,
    max: usize,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Per-endpoint job queue with a concurrency ceiling
#[derive(Clone)]
pub struct Executor {
    inner: Arc<Inner>,
}

impl Executor {
    /// Create an executor that runs at most `max` jobs at once
    pub fn new(max: usize) -> Result<Self> {
        NonZeroUsize::new(max)
            .map(Self::bounded)
            .ok_or_else(|| CollectError::InvalidConcurrency(max.to_string()))
    }

    pub fn bounded(max: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    running: 0,
                }),
                max: max.get(),
            }),
        }
    }

    pub fn inspect(&self) -> ExecutorStats {
        let state = self.inner.lock();
        ExecutorStats {
            queue: state.queue.len(),
            running: state.running,
            max: self.inner.max,
        }
    }

    /// Queue a job. Returns immediately; must be called inside a tokio runtime.
    pub fn submit<F, Fut>(&self, job: F)
    where
        F: FnOnce(Completion) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Box::new(move |completion| Box::pin(job(completion)));

        let start_runner = {
            let mut state = self.inner.lock();
            state.queue.push_back(job);
            if state.running < self.inner.max {
                state.running += 1;
                true
            } else {
                false
            }
        };

        if start_runner {
            tokio::spawn(run_jobs(self.inner.clone()));
        }
    }
}

/// One slot: keep pulling jobs until the queue is empty
async fn run_jobs(inner: Arc<Inner>) {
    loop {
        let job = {
            let mut state = inner.lock();
            match state.queue.pop_front() {
                Some(job) => job,
                None => {
                    state.running -= 1;
                    return;
                }
            }
        };

        let (tx, rx) = oneshot::channel();
        let completion = Completion { tx: Some(tx) };

        match catch_unwind(AssertUnwindSafe(|| job(completion))) {
            Ok(fut) => {
                tokio::spawn(fut);
            }
            Err(_) => {
                tracing::warn!("executor job panicked while starting; moving on");
            }
        }

        // Err means the completion was dropped, which also frees the slot
        let _ = rx.await;
    }
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = serde_json::to_string(&self.inspect()).map_err(|_| fmt::Error)?;
        write!(f, "Executor{}", stats)
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
