// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Capacity used when a ring buffer is created with a capacity of zero.
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// History retained by each push service unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 4096;

pub const DEFAULT_WORKER_COUNT: usize = 2;
pub const DEFAULT_QUEUE_CAPACITY: usize = 500;

/// Deadline applied to every delivery performed by a dispatch worker,
/// independent of the deadline the submitting caller used.
pub const WORKER_POST_TIMEOUT: Duration = Duration::from_secs(3);

/// Substituted when a push service is called with a zero timeout.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_KPI_GRANULARITY: Duration = Duration::from_secs(60);
pub const DEFAULT_KPI_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_KPI_HISTORY_CAPACITY: usize = 1024;

/// Fixed-point scale of KPI counter cells: three decimal digits.
pub const KPI_SCALE: f64 = 1000.0;

/// Upper bound of the KPI flush backoff, as a multiple of the granularity.
pub const KPI_MAX_BACKOFF_FACTOR: u32 = 4;
