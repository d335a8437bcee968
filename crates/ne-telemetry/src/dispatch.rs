// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Asynchronous delivery queue with a synchronous fallback under backpressure.
//!
//! ```text
//!   push() ──try_send──> bounded queue ──> worker 0..N ──POST (3s)──> OMC
//!      │                                        │
//!      │ queue full                             └─ failure: log + hook, dropped
//!      v
//!   POST on the caller's task (caller deadline) ──> Ok / FallbackFailed
//! ```
//!
//! A queued job is fire-and-forget: the caller gets `Ok(())` as soon as the job is in the queue
//! and never learns whether a worker delivered it. Only the fallback path reports an outcome.
//! There is no retry and no dead-letter queue.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::constants::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_COUNT, WORKER_POST_TIMEOUT};
use crate::errors::{DispatchError, PostError};
use crate::http::{post_with_deadline, HttpPoster};

/// Called for every job a worker fails to deliver.
pub type FailureHook = Arc<dyn Fn(&DeliveryFailure) + Send + Sync>;

#[derive(Debug)]
pub struct DeliveryFailure {
    pub url: String,
    pub error: PostError,
}

/// A serialized record on its way to `url`.
#[derive(Debug)]
pub struct PushJob {
    pub url: String,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct DispatcherConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
    /// Deadline of each worker POST, independent of the submitting caller's deadline.
    pub worker_timeout: Duration,
    pub failure_hook: Option<FailureHook>,
}

impl DispatcherConfig {
    #[must_use]
    pub fn with_failure_hook(mut self, hook: FailureHook) -> Self {
        self.failure_hook = Some(hook);
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_timeout: WORKER_POST_TIMEOUT,
            failure_hook: None,
        }
    }
}

impl fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue_capacity)
            .field("worker_timeout", &self.worker_timeout)
            .field("failure_hook", &self.failure_hook.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Jobs accepted by the queue.
    pub queued: u64,
    /// Jobs sent on the caller's task because the queue was full.
    pub fallback: u64,
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    fallback: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

pub struct Dispatcher {
    poster: Arc<dyn HttpPoster>,
    queue: OnceLock<mpsc::Sender<PushJob>>,
    worker_timeout: Duration,
    failure_hook: Option<FailureHook>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// A dispatcher with the default worker settings. Workers start on the first
    /// [`Dispatcher::initialize`] or push.
    pub fn new(poster: Arc<dyn HttpPoster>) -> Self {
        Self::with_config(poster, DispatcherConfig::default())
    }

    /// Keeps the worker timeout and failure hook of `config` without starting any worker; the
    /// counts are left to [`Dispatcher::initialize`].
    pub fn with_config(poster: Arc<dyn HttpPoster>, config: DispatcherConfig) -> Self {
        let worker_timeout = if config.worker_timeout.is_zero() {
            WORKER_POST_TIMEOUT
        } else {
            config.worker_timeout
        };
        Self {
            poster,
            queue: OnceLock::new(),
            worker_timeout,
            failure_hook: config.failure_hook,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Creates a dispatcher and starts its workers right away. Must run inside a Tokio runtime.
    pub fn from_config(poster: Arc<dyn HttpPoster>, config: DispatcherConfig) -> Self {
        let (worker_count, queue_capacity) = (config.worker_count, config.queue_capacity);
        let dispatcher = Self::with_config(poster, config);
        dispatcher.initialize(worker_count, queue_capacity);
        dispatcher
    }

    /// Starts `worker_count` workers sharing one queue of `queue_capacity` jobs.
    ///
    /// Only the first call has any effect; it returns `true`. Zero values fall back to two
    /// workers and a capacity of 500. Must run inside a Tokio runtime.
    pub fn initialize(&self, worker_count: usize, queue_capacity: usize) -> bool {
        let mut initialized = false;
        self.queue.get_or_init(|| {
            initialized = true;
            self.start_workers(worker_count, queue_capacity)
        });
        initialized
    }

    pub fn is_initialized(&self) -> bool {
        self.queue.get().is_some()
    }

    fn start_workers(&self, worker_count: usize, queue_capacity: usize) -> mpsc::Sender<PushJob> {
        let worker_count = if worker_count == 0 {
            DEFAULT_WORKER_COUNT
        } else {
            worker_count
        };
        let queue_capacity = if queue_capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            queue_capacity
        };

        let (tx, rx) = mpsc::channel(queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        for id in 0..worker_count {
            let worker = Worker {
                id,
                rx: Arc::clone(&rx),
                poster: Arc::clone(&self.poster),
                timeout: self.worker_timeout,
                failure_hook: self.failure_hook.clone(),
                counters: Arc::clone(&self.counters),
            };
            tokio::spawn(worker.run());
        }
        debug!("Dispatcher started {worker_count} workers with queue capacity {queue_capacity}");
        tx
    }

    fn sender(&self) -> &mpsc::Sender<PushJob> {
        self.queue
            .get_or_init(|| self.start_workers(DEFAULT_WORKER_COUNT, DEFAULT_QUEUE_CAPACITY))
    }

    /// Serializes `payload` and submits it for delivery to `url`.
    ///
    /// Returns as soon as the job is queued. When the queue is full the POST runs on the calling
    /// task under `deadline` and its outcome is returned.
    pub async fn push<P>(&self, url: &str, payload: &P, deadline: Duration) -> Result<(), DispatchError>
    where
        P: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(payload)?;
        self.push_raw(url, body, deadline).await
    }

    /// Same as [`Dispatcher::push`] for a body that is already JSON encoded.
    pub async fn push_raw(
        &self,
        url: &str,
        body: Vec<u8>,
        deadline: Duration,
    ) -> Result<(), DispatchError> {
        let job = PushJob {
            url: url.to_string(),
            body,
        };
        let job = match self.sender().try_send(job) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!("Dispatch queue saturated, delivering to {} synchronously", job.url);
                job
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                error!("Dispatch queue closed, delivering to {} synchronously", job.url);
                job
            }
        };
        self.counters.fallback.fetch_add(1, Ordering::Relaxed);

        let PushJob { url, body } = job;
        let result = post_with_deadline(self.poster.as_ref(), &url, body, deadline).await;
        match result {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(source) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                Err(DispatchError::FallbackFailed { url, source })
            }
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            fallback: self.counters.fallback.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("initialized", &self.is_initialized())
            .field("worker_timeout", &self.worker_timeout)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

struct Worker {
    id: usize,
    rx: Arc<Mutex<mpsc::Receiver<PushJob>>>,
    poster: Arc<dyn HttpPoster>,
    timeout: Duration,
    failure_hook: Option<FailureHook>,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(self) {
        debug!("Dispatch worker {} started", self.id);

        loop {
            // the lock is only held while waiting for the next job, never across a POST
            let job = self.rx.lock().await.recv().await;
            let Some(PushJob { url, body }) = job else {
                break;
            };

            let result = post_with_deadline(self.poster.as_ref(), &url, body, self.timeout).await;
            match result {
                Ok(()) => {
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!("Worker {} delivered telemetry to {url}", self.id);
                }
                Err(error) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!("Failed to deliver telemetry to {url}: {error}. Data dropped");
                    if let Some(hook) = &self.failure_hook {
                        hook(&DeliveryFailure { url, error });
                    }
                }
            }
        }

        debug!("Dispatch worker {} stopped", self.id);
    }
}
