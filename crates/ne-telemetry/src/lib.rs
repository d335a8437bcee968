// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Telemetry SDK for network-element software.
//!
//! Records (alarms, CDRs, generic events, base-station state changes, terminal access events and
//! KPI aggregates) are stamped, kept in a bounded per-type history and delivered best-effort to an
//! OMC endpoint as JSON over HTTP. Delivery goes through a shared worker pool; when its queue is
//! full the caller delivers synchronously instead of blocking or dropping.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod clock;
pub mod constants;
pub mod dispatch;
pub mod errors;
pub mod http;
pub mod identity;
pub mod kpi;
pub mod push_service;
pub mod records;
pub mod ring_buffer;
pub mod telemetry;

pub use telemetry::{Telemetry, TelemetryConfig};
