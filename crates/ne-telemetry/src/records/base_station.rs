// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{RecordKind, TelemetryRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseStationStatus {
    Online,
    #[default]
    Offline,
}

/// Connection state transition of a base station served by this NE.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseStationState {
    pub ne_uid: String,
    pub record_time: i64,
    pub address: String,
    pub device_name: String,
    pub rat_type: String,
    pub state: BaseStationStatus,
}

impl BaseStationState {
    pub fn new(address: &str, device_name: &str, state: BaseStationStatus) -> Self {
        Self {
            address: address.to_string(),
            device_name: device_name.to_string(),
            state,
            ..Default::default()
        }
    }
}

impl TelemetryRecord for BaseStationState {
    const KIND: RecordKind = RecordKind::BaseStationState;

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
