// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{RecordBody, RecordKind, TelemetryRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonFields {
    pub event: String,
    pub level: String,
    pub detail: String,
}

/// Generic event record for anything without a dedicated type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonRecord {
    pub ne_uid: String,
    pub record_time: i64,
    pub event_type: String,
    pub data: RecordBody<CommonFields>,
}

impl CommonRecord {
    pub fn new(event_type: &str, data: impl Into<RecordBody<CommonFields>>) -> Self {
        Self {
            ne_uid: String::new(),
            record_time: 0,
            event_type: event_type.to_string(),
            data: data.into(),
        }
    }
}

impl From<CommonFields> for RecordBody<CommonFields> {
    fn from(fields: CommonFields) -> Self {
        Self::Fields(fields)
    }
}

impl TelemetryRecord for CommonRecord {
    const KIND: RecordKind = RecordKind::Common;

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
