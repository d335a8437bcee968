// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{RecordKind, TelemetryRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Major,
    Minor,
    #[default]
    Warning,
    Event,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmStatus {
    Clear,
    #[default]
    Active,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmType {
    #[default]
    CommunicationAlarm,
    EquipmentAlarm,
    ProcessingFailure,
    EnvironmentalAlarm,
    QualityOfServiceAlarm,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub ne_uid: String,
    /// Assigned by the alarm push service.
    pub alarm_seq: u64,
    pub alarm_id: String,
    pub alarm_code: i64,
    pub alarm_title: String,
    pub alarm_type: AlarmType,
    pub severity: Severity,
    pub alarm_status: AlarmStatus,
    pub specific_problem: String,
    pub specific_problem_id: String,
    pub add_info: String,
    pub location_info: String,
    pub alarm_time: i64,
}

impl Alarm {
    pub fn new(alarm_id: &str, alarm_code: i64, alarm_title: &str, severity: Severity) -> Self {
        Self {
            alarm_id: alarm_id.to_string(),
            alarm_code,
            alarm_title: alarm_title.to_string(),
            severity,
            ..Default::default()
        }
    }

    /// A clear notification for this alarm, sharing its id and code.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self {
            alarm_status: AlarmStatus::Clear,
            severity: Severity::Event,
            ..self.clone()
        }
    }
}

impl TelemetryRecord for Alarm {
    const KIND: RecordKind = RecordKind::Alarm;

    fn ne_uid(&self) -> &str {
        &self.ne_uid
    }

    fn set_ne_uid(&mut self, ne_uid: String) {
        self.ne_uid = ne_uid;
    }

    fn stamp(&mut self, now_millis: i64) {
        self.alarm_time = now_millis;
    }

    fn set_sequence(&mut self, sequence: u64) {
        self.alarm_seq = sequence;
    }
}
