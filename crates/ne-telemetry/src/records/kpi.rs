// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{RecordKind, TelemetryRecord};

/// Aggregate of KPI counters over one granularity period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiRecord {
    pub ne_uid: String,
    pub record_time: i64,
    /// Period length in seconds.
    pub granularity: u64,
    pub kpis: BTreeMap<String, f64>,
}

impl TelemetryRecord for KpiRecord {
    const KIND: RecordKind = RecordKind::Kpi;

    fn ne_uid(&self) -> &str {
        &self.ne_uid
    }

    fn set_ne_uid(&mut self, ne_uid: String) {
        self.ne_uid = ne_uid;
    }

    fn stamp(&mut self, now_millis: i64) {
        self.record_time = now_millis;
    }
}
