// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! KPI counters and their periodic flush.
//!
//! Counters live in a concurrent map of atomic cells holding the value scaled by
//! [`KPI_SCALE`], so the hot path (`add`, `increment`, ...) is a single atomic add with no map-wide
//! lock. Negative deltas rely on two's-complement wrapping of the unsigned cell.
//!
//! The flush loop ticks every `granularity`. Each tick snapshots the counters and, when there is
//! anything to send, POSTs them as one [`KpiRecord`]. On success the snapshot is taken out of the
//! live cells: accumulated deltas that raced with the send stay for the next period, and a cell
//! overwritten by `set` during the send keeps its new value. On failure the next tick backs off to
//! 2x the granularity, then 4x from the second consecutive failure on.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::clock::{Clock, SystemClock};
use crate::constants::{
    DEFAULT_KPI_FLUSH_TIMEOUT, DEFAULT_KPI_GRANULARITY, DEFAULT_KPI_HISTORY_CAPACITY,
    KPI_MAX_BACKOFF_FACTOR, KPI_SCALE,
};
use crate::http::{post_with_deadline, HttpPoster};
use crate::identity::NeIdentity;
use crate::records::{KpiRecord, TelemetryRecord};
use crate::ring_buffer::RingBuffer;

#[derive(Debug, Clone, Copy)]
pub struct KpiConfig {
    pub granularity: Duration,
    /// Deadline of each flush POST.
    pub flush_timeout: Duration,
    pub history_capacity: usize,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            granularity: DEFAULT_KPI_GRANULARITY,
            flush_timeout: DEFAULT_KPI_FLUSH_TIMEOUT,
            history_capacity: DEFAULT_KPI_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Nothing accumulated, nothing sent.
    Empty,
    Sent(KpiRecord),
    Failed,
}

/// Interval before the next flush tick after `failures` consecutive failed sends.
pub fn backoff_interval(granularity: Duration, failures: u32) -> Duration {
    let factor = match failures {
        0 => 1,
        1 => 2,
        _ => KPI_MAX_BACKOFF_FACTOR,
    };
    granularity * factor
}

#[allow(clippy::cast_possible_truncation)]
fn encode(value: f64) -> u64 {
    (value * KPI_SCALE).round() as i64 as u64
}

#[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
fn decode(raw: u64) -> f64 {
    raw as i64 as f64 / KPI_SCALE
}

/// One counter. `stamp` changes whenever the cell is created or overwritten by `set`, which lets
/// a flush tell an overwrite apart from accumulation.
struct Cell {
    raw: AtomicU64,
    stamp: AtomicU64,
}

impl Cell {
    fn new(stamp: u64) -> Self {
        Self {
            raw: AtomicU64::new(0),
            stamp: AtomicU64::new(stamp),
        }
    }

    // value before stamp; `Inner::snapshot` reads them in the opposite order
    fn overwrite(&self, raw: u64, stamp: u64) {
        self.raw.store(raw, Ordering::SeqCst);
        self.stamp.store(stamp, Ordering::SeqCst);
    }

    /// Takes a flushed sample out of the cell and tells whether the cell is now empty.
    /// Only called under the shard write lock, so no writer interleaves.
    fn settle(&self, sample: &Sample) -> bool {
        if self.stamp.load(Ordering::SeqCst) != sample.stamp {
            return false;
        }
        self.raw.fetch_sub(sample.raw, Ordering::SeqCst) == sample.raw
    }
}

struct Sample {
    key: String,
    raw: u64,
    stamp: u64,
}

/// Handle on a running flush loop.
struct FlushLoop {
    token: CancellationToken,
    failures: Arc<AtomicU32>,
}

pub struct KpiAggregator {
    inner: Arc<Inner>,
    flush_loop: Mutex<Option<FlushLoop>>,
}

struct Inner {
    counters: DashMap<String, Cell>,
    stamps: AtomicU64,
    granularity: Duration,
    flush_timeout: Duration,
    poster: Arc<dyn HttpPoster>,
    identity: NeIdentity,
    clock: Arc<dyn Clock>,
    history: RingBuffer<KpiRecord>,
    // held from snapshot to settle
    flush_lock: tokio::sync::Mutex<()>,
}

impl KpiAggregator {
    pub fn new(poster: Arc<dyn HttpPoster>, identity: NeIdentity, config: KpiConfig) -> Self {
        Self::with_clock(poster, identity, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        poster: Arc<dyn HttpPoster>,
        identity: NeIdentity,
        config: KpiConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let granularity = if config.granularity.is_zero() {
            DEFAULT_KPI_GRANULARITY
        } else {
            config.granularity
        };
        let flush_timeout = if config.flush_timeout.is_zero() {
            DEFAULT_KPI_FLUSH_TIMEOUT
        } else {
            config.flush_timeout
        };
        Self {
            inner: Arc::new(Inner {
                counters: DashMap::new(),
                stamps: AtomicU64::new(0),
                granularity,
                flush_timeout,
                poster,
                identity,
                clock,
                history: RingBuffer::new(config.history_capacity),
                flush_lock: tokio::sync::Mutex::new(()),
            }),
            flush_loop: Mutex::new(None),
        }
    }

    pub fn granularity(&self) -> Duration {
        self.inner.granularity
    }

    pub fn set(&self, key: &str, value: f64) {
        self.inner.set_raw(key, encode(value));
    }

    /// Current value of `key`, 0 when absent.
    pub fn get(&self, key: &str) -> f64 {
        self.inner
            .counters
            .get(key)
            .map_or(0.0, |cell| decode(cell.raw.load(Ordering::SeqCst)))
    }

    pub fn add(&self, key: &str, delta: f64) {
        self.inner.add_raw(key, encode(delta));
    }

    pub fn increment(&self, key: &str) {
        self.add(key, 1.0);
    }

    pub fn decrement(&self, key: &str) {
        self.add(key, -1.0);
    }

    pub fn delete(&self, key: &str) {
        self.inner.counters.remove(key);
    }

    pub fn len(&self) -> usize {
        self.inner.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.counters.is_empty()
    }

    /// Best-effort copy of every counter; concurrent writers are not blocked.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.inner
            .snapshot()
            .into_iter()
            .map(|sample| (sample.key, decode(sample.raw)))
            .collect()
    }

    /// Runs a single flush tick against `url`. Flushes never overlap: a call made while another
    /// flush is in flight waits for it and then snapshots what is left.
    pub async fn flush_once(&self, url: &str) -> FlushOutcome {
        self.inner.flush_once(url).await
    }

    /// Consecutive failed flushes of the running loop, 0 when no loop runs.
    #[allow(clippy::expect_used)]
    pub fn failure_streak(&self) -> u32 {
        self.flush_loop
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .map_or(0, |running| running.failures.load(Ordering::Relaxed))
    }

    /// Starts flushing to `url` every granularity period, replacing any running flush loop.
    /// Must run inside a Tokio runtime.
    pub fn start_periodic_flush(&self, url: &str) {
        let token = CancellationToken::new();
        let failures = Arc::new(AtomicU32::new(0));
        if let Some(previous) = self.swap_loop(Some(FlushLoop {
            token: token.clone(),
            failures: Arc::clone(&failures),
        })) {
            previous.token.cancel();
        }

        let inner = Arc::clone(&self.inner);
        let url = url.to_string();
        tokio::spawn(async move {
            debug!("KPI flush to {url} started every {:?}", inner.granularity);
            loop {
                let streak = failures.load(Ordering::Relaxed);
                let interval = backoff_interval(inner.granularity, streak);
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }

                let outcome = tokio::select! {
                    () = token.cancelled() => break,
                    outcome = inner.flush_once(&url) => outcome,
                };
                match outcome {
                    FlushOutcome::Empty | FlushOutcome::Sent(_) => {
                        failures.store(0, Ordering::Relaxed);
                    }
                    FlushOutcome::Failed => {
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            debug!("KPI flush to {url} stopped");
        });
    }

    /// Stops the flush loop. Safe to call when no loop is running.
    pub fn stop_periodic_flush(&self) {
        if let Some(running) = self.swap_loop(None) {
            running.token.cancel();
        }
    }

    #[allow(clippy::expect_used)]
    pub fn is_flushing(&self) -> bool {
        self.flush_loop.lock().expect("lock poisoned").is_some()
    }

    /// Successfully sent KPI records: `n < 0` yields nothing, `0` everything, otherwise the
    /// `n` most recent.
    pub fn history_list(&self, n: i64) -> Vec<KpiRecord> {
        match usize::try_from(n) {
            Err(_) => Vec::new(),
            Ok(0) => self.inner.history.get_all(),
            Ok(n) => self.inner.history.get_last(n),
        }
    }

    /// Resizes the KPI history, dropping the oldest records when shrinking. `n <= 0` is ignored.
    pub fn history_set_capacity(&self, n: i64) {
        if let Ok(capacity) = usize::try_from(n) {
            self.inner.history.resize(capacity);
        }
    }

    #[allow(clippy::expect_used)]
    fn swap_loop(&self, next: Option<FlushLoop>) -> Option<FlushLoop> {
        let mut guard = self.flush_loop.lock().expect("lock poisoned");
        std::mem::replace(&mut *guard, next)
    }
}

impl Drop for KpiAggregator {
    fn drop(&mut self) {
        self.stop_periodic_flush();
    }
}

impl fmt::Debug for KpiAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KpiAggregator")
            .field("granularity", &self.inner.granularity)
            .field("counters", &self.inner.counters.len())
            .field("flushing", &self.is_flushing())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn next_stamp(&self) -> u64 {
        self.stamps.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn set_raw(&self, key: &str, raw: u64) {
        let stamp = self.next_stamp();
        if let Some(cell) = self.counters.get(key) {
            cell.overwrite(raw, stamp);
            return;
        }
        self.counters
            .entry(key.to_string())
            .or_insert_with(|| Cell::new(stamp))
            .overwrite(raw, stamp);
    }

    fn add_raw(&self, key: &str, raw: u64) {
        if let Some(cell) = self.counters.get(key) {
            cell.raw.fetch_add(raw, Ordering::SeqCst);
            return;
        }
        self.counters
            .entry(key.to_string())
            .or_insert_with(|| Cell::new(self.next_stamp()))
            .raw
            .fetch_add(raw, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Vec<Sample> {
        self.counters
            .iter()
            .map(|entry| {
                let stamp = entry.value().stamp.load(Ordering::SeqCst);
                let raw = entry.value().raw.load(Ordering::SeqCst);
                Sample {
                    key: entry.key().clone(),
                    raw,
                    stamp,
                }
            })
            .collect()
    }

    /// Removes a sent snapshot from the live counters. Deltas added after the snapshot survive,
    /// a cell overwritten or recreated since keeps its current value, and a cell drops out of the
    /// map once it is back to zero.
    fn settle(&self, snapshot: &[Sample]) {
        for sample in snapshot {
            self.counters
                .remove_if(&sample.key, |_, cell| cell.settle(sample));
        }
    }

    async fn flush_once(&self, url: &str) -> FlushOutcome {
        let _flushing = self.flush_lock.lock().await;

        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            debug!("No KPI accumulated, skipping flush");
            return FlushOutcome::Empty;
        }

        let mut record = KpiRecord {
            granularity: self.granularity.as_secs(),
            kpis: snapshot
                .iter()
                .map(|sample| (sample.key.clone(), decode(sample.raw)))
                .collect(),
            ..Default::default()
        };
        record.set_ne_uid(self.identity.ne_uid());
        record.stamp(self.clock.now_millis());

        let body = match serde_json::to_vec(&record) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize KPI record: {e}");
                return FlushOutcome::Failed;
            }
        };

        match post_with_deadline(self.poster.as_ref(), url, body, self.flush_timeout).await {
            Ok(()) => {
                self.settle(&snapshot);
                debug!("Flushed {} KPIs to {url}", record.kpis.len());
                self.history.push(record.clone());
                FlushOutcome::Sent(record)
            }
            Err(e) => {
                error!("Failed to flush {} KPIs to {url}: {e}", record.kpis.len());
                FlushOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::errors::PostError;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use tokio::sync::{mpsc, Notify, Semaphore};
    use tokio::time::Instant;

    /// Fails the first `fail_first` posts, then succeeds. Reports every attempt.
    struct ScriptedPoster {
        fail_first: u32,
        attempts: AtomicU32,
        seen: mpsc::UnboundedSender<(Instant, KpiRecord)>,
    }

    #[async_trait]
    impl HttpPoster for ScriptedPoster {
        async fn post_json(&self, _: &str, body: Vec<u8>, _: Duration) -> Result<(), PostError> {
            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
            let record: KpiRecord = serde_json::from_slice(&body).expect("kpi record body");
            let _ = self.seen.send((Instant::now(), record));
            if attempt < self.fail_first {
                Err(PostError::Status(StatusCode::SERVICE_UNAVAILABLE))
            } else {
                Ok(())
            }
        }
    }

    /// Accepts every post, but each one waits for a permit on `gate` before answering.
    struct GatedPoster {
        entered: Notify,
        gate: Semaphore,
        posts: AtomicU32,
    }

    #[async_trait]
    impl HttpPoster for GatedPoster {
        async fn post_json(&self, _: &str, _: Vec<u8>, _: Duration) -> Result<(), PostError> {
            self.posts.fetch_add(1, Ordering::Relaxed);
            self.entered.notify_one();
            self.gate.acquire().await.expect("gate open").forget();
            Ok(())
        }
    }

    fn aggregator(
        fail_first: u32,
        granularity: Duration,
    ) -> (KpiAggregator, mpsc::UnboundedReceiver<(Instant, KpiRecord)>) {
        let (seen, rx) = mpsc::unbounded_channel();
        let poster = Arc::new(ScriptedPoster {
            fail_first,
            attempts: AtomicU32::new(0),
            seen,
        });
        let aggregator = KpiAggregator::with_clock(
            poster,
            NeIdentity::new("4400HX1", "4400HX1NE001"),
            KpiConfig {
                granularity,
                ..Default::default()
            },
            Arc::new(ManualClock::new(1_700_000_000_000)),
        );
        (aggregator, rx)
    }

    #[test]
    fn test_set_get_round_trip() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        for value in [0.0, 1.0, 1.234, -2.5, 99_999.999, -0.001] {
            kpi.set("SMF.01", value);
            assert_eq!(kpi.get("SMF.01"), value);
        }
    }

    #[test]
    fn test_increment_then_decrement_restores() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        kpi.set("AMF.RegSucc", 12.345);
        kpi.increment("AMF.RegSucc");
        assert_eq!(kpi.get("AMF.RegSucc"), 13.345);
        kpi.decrement("AMF.RegSucc");
        assert_eq!(kpi.get("AMF.RegSucc"), 12.345);
    }

    #[test]
    fn test_negative_values_wrap_through_unsigned_cell() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        kpi.decrement("fresh");
        assert_eq!(kpi.get("fresh"), -1.0);
        kpi.add("fresh", 0.5);
        assert_eq!(kpi.get("fresh"), -0.5);
    }

    #[test]
    fn test_absent_and_deleted_keys_read_zero() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        assert_eq!(kpi.get("missing"), 0.0);
        kpi.set("gone", 3.0);
        kpi.delete("gone");
        assert_eq!(kpi.get("gone"), 0.0);
        assert!(kpi.is_empty());
    }

    #[test]
    fn test_concurrent_increments() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        let kpi = Arc::new(kpi);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let kpi = Arc::clone(&kpi);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        kpi.increment("hits");
                        kpi.add("bytes", 0.5);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer panicked");
        }
        assert_eq!(kpi.get("hits"), 8000.0);
        assert_eq!(kpi.get("bytes"), 4000.0);
    }

    #[test]
    fn test_backoff_interval() {
        let base = Duration::from_secs(60);
        assert_eq!(backoff_interval(base, 0), base);
        assert_eq!(backoff_interval(base, 1), base * 2);
        assert_eq!(backoff_interval(base, 2), base * 4);
        assert_eq!(backoff_interval(base, 9), base * 4);
    }

    #[tokio::test]
    async fn test_flush_once_skips_when_empty() {
        let (kpi, mut rx) = aggregator(0, Duration::from_secs(60));
        assert_eq!(kpi.flush_once("http://omc/kpi").await, FlushOutcome::Empty);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_flush_once_sends_and_clears() {
        let (kpi, mut rx) = aggregator(0, Duration::from_secs(60));
        kpi.set("UPF.Throughput", 12.5);
        kpi.increment("UPF.Sessions");

        let FlushOutcome::Sent(record) = kpi.flush_once("http://omc/kpi").await else {
            panic!("flush should succeed");
        };
        assert_eq!(record.ne_uid, "4400HX1NE001");
        assert_eq!(record.granularity, 60);
        assert_eq!(record.record_time, 1_700_000_000_000);
        assert_eq!(record.kpis.get("UPF.Throughput"), Some(&12.5));
        assert_eq!(record.kpis.get("UPF.Sessions"), Some(&1.0));

        let (_, posted) = rx.recv().await.expect("posted");
        assert_eq!(posted, record);
        assert!(kpi.is_empty());
        assert_eq!(kpi.history_list(0), vec![record]);
        assert!(kpi.history_list(-1).is_empty());
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_counters() {
        let (kpi, _rx) = aggregator(1, Duration::from_secs(60));
        kpi.add("SMF.Pdu", 5.0);
        assert_eq!(kpi.flush_once("http://omc/kpi").await, FlushOutcome::Failed);
        assert_eq!(kpi.get("SMF.Pdu"), 5.0);
        assert!(kpi.history_list(0).is_empty());
    }

    #[test]
    fn test_settle_keeps_writes_after_snapshot() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        kpi.add("a", 3.0);
        kpi.add("b", 1.0);
        let snapshot = kpi.inner.snapshot();

        kpi.add("a", 2.0);
        kpi.add("c", 7.0);
        kpi.inner.settle(&snapshot);

        assert_eq!(kpi.get("a"), 2.0);
        assert_eq!(kpi.get("c"), 7.0);
        assert_eq!(kpi.len(), 2);
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        kpi.stop_periodic_flush();
        kpi.stop_periodic_flush();
        assert!(!kpi.is_flushing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_flush_backs_off_and_recovers() {
        let granularity = Duration::from_secs(10);
        let (kpi, mut rx) = aggregator(3, granularity);
        kpi.increment("AMF.RegAtt");

        let start = Instant::now();
        kpi.start_periodic_flush("http://omc/kpi");
        assert!(kpi.is_flushing());

        let mut ticks = Vec::new();
        for _ in 0..4 {
            let (at, _) = rx.recv().await.expect("flush attempt");
            ticks.push(at - start);
        }
        // three failures then a success
        assert_eq!(ticks[0], granularity);
        assert_eq!(ticks[1] - ticks[0], granularity * 2);
        assert_eq!(ticks[2] - ticks[1], granularity * 4);
        assert_eq!(ticks[3] - ticks[2], granularity * 4);

        kpi.increment("AMF.RegAtt");
        let (at, record) = rx.recv().await.expect("flush after recovery");
        assert_eq!(at - start - ticks[3], granularity);
        assert_eq!(record.kpis.get("AMF.RegAtt"), Some(&1.0));

        kpi.stop_periodic_flush();
        assert!(!kpi.is_flushing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_running_loop() {
        let granularity = Duration::from_secs(10);
        let (kpi, mut rx) = aggregator(0, granularity);
        kpi.start_periodic_flush("http://omc/old");
        kpi.start_periodic_flush("http://omc/new");
        kpi.set("x", 1.0);

        let (_, record) = rx.recv().await.expect("one flush");
        assert_eq!(record.kpis.get("x"), Some(&1.0));
        tokio::time::sleep(granularity * 3).await;
        // the replaced loop never sent a duplicate
        assert!(rx.try_recv().is_err());
        kpi.stop_periodic_flush();
    }

    #[test]
    fn test_set_during_flush_keeps_new_value() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        kpi.set("UPF.Throughput", 5.0);
        let snapshot = kpi.inner.snapshot();
        kpi.set("UPF.Throughput", 3.0);
        kpi.inner.settle(&snapshot);
        assert_eq!(kpi.get("UPF.Throughput"), 3.0);

        let snapshot = kpi.inner.snapshot();
        kpi.set("UPF.Throughput", 8.0);
        kpi.add("UPF.Throughput", 1.0);
        kpi.inner.settle(&snapshot);
        assert_eq!(kpi.get("UPF.Throughput"), 9.0);
    }

    #[test]
    fn test_recreated_key_is_not_settled_against_old_snapshot() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        kpi.add("AMF.Sessions", 4.0);
        let snapshot = kpi.inner.snapshot();
        kpi.delete("AMF.Sessions");
        kpi.increment("AMF.Sessions");
        kpi.inner.settle(&snapshot);
        assert_eq!(kpi.get("AMF.Sessions"), 1.0);
    }

    #[tokio::test]
    async fn test_overlapping_flushes_send_each_value_once() {
        let poster = Arc::new(GatedPoster {
            entered: Notify::new(),
            gate: Semaphore::new(0),
            posts: AtomicU32::new(0),
        });
        let kpi = KpiAggregator::new(
            Arc::clone(&poster) as Arc<dyn HttpPoster>,
            NeIdentity::new("4400HX1", "4400HX1NE001"),
            KpiConfig::default(),
        );
        kpi.add("SMF.Pdu", 5.0);

        let (first, second, ()) = tokio::join!(
            kpi.flush_once("http://omc/kpi"),
            kpi.flush_once("http://omc/kpi"),
            async {
                poster.entered.notified().await;
                kpi.add("SMF.Pdu", 2.0);
                poster.gate.add_permits(2);
            }
        );

        let sent: Vec<f64> = [first, second]
            .into_iter()
            .map(|outcome| match outcome {
                FlushOutcome::Sent(record) => record.kpis["SMF.Pdu"],
                other => panic!("expected a sent record, got {other:?}"),
            })
            .collect();
        assert_eq!(sent, vec![5.0, 2.0]);
        assert_eq!(poster.posts.load(Ordering::Relaxed), 2);
        assert_eq!(kpi.get("SMF.Pdu"), 0.0);
        assert!(kpi.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_failure_streak() {
        let granularity = Duration::from_secs(10);
        let (kpi, mut rx) = aggregator(1, granularity);
        kpi.increment("AMF.RegAtt");

        kpi.start_periodic_flush("http://omc/kpi");
        rx.recv().await.expect("failed attempt");
        tokio::task::yield_now().await;
        assert_eq!(kpi.failure_streak(), 1);

        let restarted = Instant::now();
        kpi.start_periodic_flush("http://omc/kpi");
        assert_eq!(kpi.failure_streak(), 0);

        let (at, record) = rx.recv().await.expect("attempt after restart");
        assert_eq!(at - restarted, granularity);
        assert_eq!(record.kpis.get("AMF.RegAtt"), Some(&1.0));
        assert_eq!(kpi.failure_streak(), 0);
        kpi.stop_periodic_flush();
        assert_eq!(kpi.failure_streak(), 0);
    }

    #[tokio::test]
    async fn test_history_set_capacity() {
        let (kpi, _rx) = aggregator(0, Duration::from_secs(60));
        for value in 1..=5 {
            kpi.set("k", f64::from(value));
            assert!(matches!(
                kpi.flush_once("http://omc/kpi").await,
                FlushOutcome::Sent(_)
            ));
        }

        kpi.history_set_capacity(0);
        kpi.history_set_capacity(-1);
        assert_eq!(kpi.history_list(0).len(), 5);

        kpi.history_set_capacity(2);
        let kept: Vec<f64> = kpi
            .history_list(0)
            .iter()
            .map(|record| record.kpis["k"])
            .collect();
        assert_eq!(kept, vec![4.0, 5.0]);
    }
}
