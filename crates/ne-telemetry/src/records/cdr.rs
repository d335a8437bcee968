// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{RecordBody, RecordKind, TelemetryRecord};

/// Typed call detail fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdrFields {
    pub record_type: String,
    pub calling_number: String,
    pub called_number: String,
    pub seizure_time: i64,
    pub release_time: i64,
    pub duration_secs: u64,
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cdr {
    pub ne_uid: String,
    pub record_time: i64,
    pub cdr: RecordBody<CdrFields>,
}

impl Cdr {
    pub fn new(cdr: impl Into<RecordBody<CdrFields>>) -> Self {
        Self {
            ne_uid: String::new(),
            record_time: 0,
            cdr: cdr.into(),
        }
    }
}

impl From<CdrFields> for RecordBody<CdrFields> {
    fn from(fields: CdrFields) -> Self {
        Self::Fields(fields)
    }
}

impl TelemetryRecord for Cdr {
    const KIND: RecordKind = RecordKind::Cdr;

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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_cdr() {
        let cdr = Cdr::new(CdrFields {
            record_type: "MOC".to_string(),
            calling_number: "8613800000001".to_string(),
            called_number: "8613800000002".to_string(),
            duration_secs: 42,
            ..Default::default()
        });
        let value = serde_json::to_value(&cdr).expect("serializes");
        assert_eq!(value["cdr"]["recordType"], "MOC");
        assert_eq!(value["cdr"]["durationSecs"], 42);
    }

    #[test]
    fn test_opaque_cdr_is_passed_through() {
        let map = json!({"SMSRecord": {"serviceCentre": "8613800"}})
            .as_object()
            .cloned()
            .expect("object");
        let cdr = Cdr::new(map);
        let value = serde_json::to_value(&cdr).expect("serializes");
        assert_eq!(value["cdr"]["SMSRecord"]["serviceCentre"], "8613800");
    }
}
