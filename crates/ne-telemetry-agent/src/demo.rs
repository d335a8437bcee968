// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Synthetic traffic for exercising an OMC endpoint without a live network element.

use ne_telemetry::{
    records::{
        AccessEvent, Alarm, BaseStationState, BaseStationStatus, Cdr, CdrFields, CommonFields,
        CommonRecord, RecordKind, Severity, TerminalAccess,
    },
    Telemetry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::AgentConfig;

pub struct DemoGenerator {
    telemetry: Arc<Telemetry>,
    config: AgentConfig,
    round: u64,
}

impl DemoGenerator {
    pub fn new(telemetry: Arc<Telemetry>, config: AgentConfig) -> Self {
        Self {
            telemetry,
            config,
            round: 0,
        }
    }

    /// Pushes one record of every kind and bumps the demo KPI counters.
    /// Returns how many pushes reported an error.
    pub async fn tick(&mut self) -> usize {
        self.round += 1;
        let round = self.round;
        let timeout = self.config.push_timeout();
        let mut failures = 0;

        let severity = if round % 10 == 0 {
            Severity::Critical
        } else {
            Severity::Minor
        };
        let alarm = Alarm::new(
            &format!("{}", 10_000 + round),
            10_000 + (round % 100) as i64,
            "Demo alarm",
            severity,
        );
        if let Err(e) = self
            .telemetry
            .alarm()
            .push_to_url(&self.config.endpoint(RecordKind::Alarm), alarm, timeout)
            .await
        {
            warn!("Demo alarm push failed: {e}");
            failures += 1;
        }

        let cdr = Cdr::new(CdrFields {
            record_type: "MOC".to_string(),
            calling_number: format!("1380000{round:04}"),
            called_number: "13900000000".to_string(),
            duration_secs: round % 300,
            cause: "normal".to_string(),
            ..Default::default()
        });
        if let Err(e) = self
            .telemetry
            .cdr()
            .push_to_url(&self.config.endpoint(RecordKind::Cdr), cdr, timeout)
            .await
        {
            warn!("Demo CDR push failed: {e}");
            failures += 1;
        }

        let common = CommonRecord::new(
            "heartbeat",
            CommonFields {
                event: "demo".to_string(),
                level: "info".to_string(),
                detail: format!("round {round}"),
            },
        );
        if let Err(e) = self
            .telemetry
            .common()
            .push_to_url(&self.config.endpoint(RecordKind::Common), common, timeout)
            .await
        {
            warn!("Demo common push failed: {e}");
            failures += 1;
        }

        let state = if round % 2 == 0 {
            BaseStationStatus::Online
        } else {
            BaseStationStatus::Offline
        };
        let station =
            BaseStationState::new(&format!("192.168.1.{}", round % 254 + 1), "gNB-demo", state);
        if let Err(e) = self
            .telemetry
            .base_station_state()
            .push_to_url(
                &self.config.endpoint(RecordKind::BaseStationState),
                station,
                timeout,
            )
            .await
        {
            warn!("Demo base station push failed: {e}");
            failures += 1;
        }

        let access = TerminalAccess::new(
            &format!("4600000{round:08}"),
            "0x0001",
            AccessEvent::Register,
            "success",
        );
        if let Err(e) = self
            .telemetry
            .terminal_access()
            .push_to_url(
                &self.config.endpoint(RecordKind::TerminalAccess),
                access,
                timeout,
            )
            .await
        {
            warn!("Demo terminal access push failed: {e}");
            failures += 1;
        }

        let kpi = self.telemetry.kpi();
        kpi.increment("DEMO.Rounds");
        kpi.add("DEMO.Records", 5.0);
        if failures > 0 {
            kpi.add("DEMO.PushFailures", failures as f64);
        }

        debug!("Demo round {round} submitted with {failures} failures");
        failures
    }

    /// Ticks every `every` until `cancel` fires.
    pub async fn run(mut self, every: Duration, cancel: CancellationToken) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Demo generator stopped after {} rounds", self.round);
                    return;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }
}
