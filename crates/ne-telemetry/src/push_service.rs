// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-record-type push services.
//!
//! A [`PushService`] stamps a record, keeps a copy in its bounded history and hands the record to
//! the shared [`Dispatcher`]. Recording and delivery are independent: a record is in the history
//! even when its delivery later fails.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::clock::Clock;
use crate::constants::DEFAULT_PUSH_TIMEOUT;
use crate::dispatch::Dispatcher;
use crate::errors::DispatchError;
use crate::identity::NeIdentity;
use crate::records::{
    Alarm, BaseStationState, Cdr, CommonRecord, RecordKind, TelemetryRecord, TerminalAccess,
};
use crate::ring_buffer::RingBuffer;

pub type AlarmService = PushService<Alarm>;
pub type CdrService = PushService<Cdr>;
pub type CommonService = PushService<CommonRecord>;
pub type BaseStationStateService = PushService<BaseStationState>;
pub type TerminalAccessService = PushService<TerminalAccess>;

pub struct PushService<T> {
    dispatcher: Arc<Dispatcher>,
    identity: NeIdentity,
    clock: Arc<dyn Clock>,
    history: RingBuffer<T>,
    sequence: AtomicU64,
}

impl<T: TelemetryRecord> PushService<T> {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        identity: NeIdentity,
        clock: Arc<dyn Clock>,
        history_capacity: usize,
    ) -> Self {
        Self {
            dispatcher,
            identity,
            clock,
            history: RingBuffer::new(history_capacity),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> RecordKind {
        T::KIND
    }

    /// Stamps `record`, records it in the history and submits it for delivery to `url`.
    ///
    /// A zero `timeout` means one minute. The timeout only bounds the synchronous fallback; a
    /// queued record returns `Ok(())` right away.
    pub async fn push_to_url(
        &self,
        url: &str,
        mut record: T,
        timeout: Duration,
    ) -> Result<(), DispatchError> {
        let timeout = if timeout.is_zero() {
            DEFAULT_PUSH_TIMEOUT
        } else {
            timeout
        };

        record.stamp(self.clock.now_millis());
        record.set_sequence(self.sequence.fetch_add(1, Ordering::Relaxed) + 1);
        if record.ne_uid().is_empty() {
            record.set_ne_uid(self.identity.ne_uid());
        }

        self.history.push(record.clone());
        debug!("Pushing {} record to {url}", T::KIND);

        self.dispatcher.push(url, &record, timeout).await
    }

    /// `n < 0` yields nothing, `0` the whole history, otherwise the `n` most recent records.
    pub fn history_list(&self, n: i64) -> Vec<T> {
        match usize::try_from(n) {
            Err(_) => Vec::new(),
            Ok(0) => self.history.get_all(),
            Ok(n) => self.history.get_last(n),
        }
    }

    /// Resizes the history, dropping the oldest records when shrinking. `n <= 0` is ignored.
    pub fn history_set_capacity(&self, n: i64) {
        if let Ok(capacity) = usize::try_from(n) {
            self.history.resize(capacity);
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }
}

impl<T> fmt::Debug for PushService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushService")
            .field("record", &std::any::type_name::<T>())
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
