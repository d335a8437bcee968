// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Application-wide telemetry context.
//!
//! [`Telemetry`] is built once at startup and owns the dispatcher shared by the five push
//! services, plus the KPI aggregator. Independent instances do not share any state.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::constants::DEFAULT_HISTORY_CAPACITY;
use crate::dispatch::{Dispatcher, DispatcherConfig};
use crate::http::HttpPoster;
use crate::identity::NeIdentity;
use crate::kpi::{KpiAggregator, KpiConfig};
use crate::push_service::{
    AlarmService, BaseStationStateService, CdrService, CommonService, PushService,
    TerminalAccessService,
};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub dispatcher: DispatcherConfig,
    /// History capacity of each push service.
    pub history_capacity: usize,
    pub kpi: KpiConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            kpi: KpiConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct Telemetry {
    dispatcher: Arc<Dispatcher>,
    identity: NeIdentity,
    alarm: AlarmService,
    cdr: CdrService,
    common: CommonService,
    base_station_state: BaseStationStateService,
    terminal_access: TerminalAccessService,
    kpi: KpiAggregator,
}

impl Telemetry {
    /// Builds the context and starts the dispatch workers. Must run inside a Tokio runtime.
    pub fn new(config: TelemetryConfig, poster: Arc<dyn HttpPoster>, identity: NeIdentity) -> Self {
        let dispatcher = Arc::new(Dispatcher::from_config(
            Arc::clone(&poster),
            config.dispatcher.clone(),
        ));
        Self::with_dispatcher(config, dispatcher, poster, identity, Arc::new(SystemClock))
    }

    /// Builds the context around an existing dispatcher, e.g. one carrying a failure hook.
    /// The dispatcher is initialized from `config` if nothing initialized it yet.
    pub fn with_dispatcher(
        config: TelemetryConfig,
        dispatcher: Arc<Dispatcher>,
        poster: Arc<dyn HttpPoster>,
        identity: NeIdentity,
        clock: Arc<dyn Clock>,
    ) -> Self {
        dispatcher.initialize(
            config.dispatcher.worker_count,
            config.dispatcher.queue_capacity,
        );

        let capacity = config.history_capacity;
        Self {
            alarm: PushService::new(
                Arc::clone(&dispatcher),
                identity.clone(),
                Arc::clone(&clock),
                capacity,
            ),
            cdr: PushService::new(
                Arc::clone(&dispatcher),
                identity.clone(),
                Arc::clone(&clock),
                capacity,
            ),
            common: PushService::new(
                Arc::clone(&dispatcher),
                identity.clone(),
                Arc::clone(&clock),
                capacity,
            ),
            base_station_state: PushService::new(
                Arc::clone(&dispatcher),
                identity.clone(),
                Arc::clone(&clock),
                capacity,
            ),
            terminal_access: PushService::new(
                Arc::clone(&dispatcher),
                identity.clone(),
                Arc::clone(&clock),
                capacity,
            ),
            kpi: KpiAggregator::with_clock(poster, identity.clone(), config.kpi, clock),
            dispatcher,
            identity,
        }
    }

    pub fn alarm(&self) -> &AlarmService {
        &self.alarm
    }

    pub fn cdr(&self) -> &CdrService {
        &self.cdr
    }

    pub fn common(&self) -> &CommonService {
        &self.common
    }

    pub fn base_station_state(&self) -> &BaseStationStateService {
        &self.base_station_state
    }

    pub fn terminal_access(&self) -> &TerminalAccessService {
        &self.terminal_access
    }

    pub fn kpi(&self) -> &KpiAggregator {
        &self.kpi
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn identity(&self) -> &NeIdentity {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PostError;
    use crate::identity::Identity;
    use crate::records::{Alarm, Severity};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Accepting;

    #[async_trait]
    impl HttpPoster for Accepting {
        async fn post_json(&self, _: &str, _: Vec<u8>, _: Duration) -> Result<(), PostError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_services_share_one_dispatcher() {
        let telemetry = Telemetry::new(
            TelemetryConfig::default(),
            Arc::new(Accepting),
            NeIdentity::new("4400HX1", "4400HX1NE001"),
        );
        assert!(telemetry.dispatcher().is_initialized());
        assert!(!telemetry.dispatcher().initialize(9, 9));
        assert_eq!(telemetry.alarm().history_capacity(), DEFAULT_HISTORY_CAPACITY);

        telemetry
            .alarm()
            .push_to_url(
                "http://omc/alarm",
                Alarm::new("1", 1, "test", Severity::Minor),
                Duration::from_secs(1),
            )
            .await
            .expect("queued");
        assert_eq!(telemetry.dispatcher().stats().queued, 1);
    }

    #[tokio::test]
    async fn test_identity_is_read_at_push_time() {
        let telemetry = Telemetry::new(
            TelemetryConfig::default(),
            Arc::new(Accepting),
            NeIdentity::new("4400HX1", "4400HX1NE001"),
        );
        telemetry.identity().set(Identity {
            org_uid: "4400HX1".to_string(),
            ne_uid: "4400HX1NE009".to_string(),
        });

        telemetry
            .alarm()
            .push_to_url(
                "http://omc/alarm",
                Alarm::new("1", 1, "test", Severity::Minor),
                Duration::from_secs(1),
            )
            .await
            .expect("queued");
        assert_eq!(telemetry.alarm().history_list(1)[0].ne_uid, "4400HX1NE009");
    }
}
