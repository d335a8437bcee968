// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Telemetry record types.
//!
//! Every record carries the NE unique id and an epoch-millisecond timestamp that the push
//! service overwrites at submission time. Records serialize to camelCase JSON.

use derive_more::Display;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub mod alarm;
pub mod base_station;
pub mod cdr;
pub mod common;
pub mod kpi;
pub mod terminal_access;

pub use alarm::{Alarm, AlarmStatus, AlarmType, Severity};
pub use base_station::{BaseStationState, BaseStationStatus};
pub use cdr::{Cdr, CdrFields};
pub use common::{CommonFields, CommonRecord};
pub use kpi::KpiRecord;
pub use terminal_access::{AccessEvent, TerminalAccess};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    #[display("alarm")]
    Alarm,
    #[display("cdr")]
    Cdr,
    #[display("common")]
    Common,
    #[display("nb-state")]
    BaseStationState,
    #[display("ue-access")]
    TerminalAccess,
    #[display("kpi")]
    Kpi,
}

/// Behaviour the push services need from a record.
pub trait TelemetryRecord:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    const KIND: RecordKind;

    fn ne_uid(&self) -> &str;

    fn set_ne_uid(&mut self, ne_uid: String);

    /// Overwrites the record or event time.
    fn stamp(&mut self, now_millis: i64);

    /// Receives the per-service sequence number. Most records have no use for it.
    fn set_sequence(&mut self, _sequence: u64) {}
}

/// Payload of free-form records: either typed fields or an opaque key/value map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordBody<F> {
    Fields(F),
    Map(serde_json::Map<String, serde_json::Value>),
}

impl<F> RecordBody<F> {
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }
}

impl<F> From<serde_json::Map<String, serde_json::Value>> for RecordBody<F> {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::Map(map)
    }
}
