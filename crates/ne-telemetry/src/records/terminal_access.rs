// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{RecordKind, TelemetryRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessEvent {
    #[default]
    Register,
    Deregister,
    Authentication,
    ConnectionEstablished,
    ConnectionReleased,
}

/// Terminal (UE) access event observed by the NE.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalAccess {
    pub ne_uid: String,
    pub record_time: i64,
    pub imsi: String,
    pub cell_id: String,
    pub event: AccessEvent,
    pub result: String,
}

impl TerminalAccess {
    pub fn new(imsi: &str, cell_id: &str, event: AccessEvent, result: &str) -> Self {
        Self {
            imsi: imsi.to_string(),
            cell_id: cell_id.to_string(),
            event,
            result: result.to_string(),
            ..Default::default()
        }
    }
}

impl TelemetryRecord for TerminalAccess {
    const KIND: RecordKind = RecordKind::TerminalAccess;

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
