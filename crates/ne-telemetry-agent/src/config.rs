// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::AgentError;
use ne_telemetry::{
    constants::{DEFAULT_HISTORY_CAPACITY, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_COUNT},
    dispatch::DispatcherConfig,
    kpi::KpiConfig,
    TelemetryConfig,
};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_OMC_URL: &str = "http://127.0.0.1:33030";
const DEFAULT_ORG_UID: &str = "4400HX1";
const DEFAULT_NE_UID: &str = "4400HX1NE001";
const DEFAULT_KPI_GRANULARITY_SECS: u64 = 60;
const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 60;
const QUIET_CRATES: &str = "h2=off,hyper=off,rustls=off,reqwest=off";

/// Configuration of the telemetry agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base URL of the OMC receiving telemetry
    pub omc_url: String,
    pub org_uid: String,
    pub ne_uid: String,
    pub dispatch_workers: usize,
    pub dispatch_queue_capacity: usize,
    /// History retained per record type
    pub history_capacity: usize,
    pub kpi_granularity_secs: u64,
    pub push_timeout_secs: u64,
    /// Seconds between demo records, 0 disables the generator
    pub demo_interval_secs: u64,
    pub https_proxy: Option<String>,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            omc_url: DEFAULT_OMC_URL.to_string(),
            org_uid: DEFAULT_ORG_UID.to_string(),
            ne_uid: DEFAULT_NE_UID.to_string(),
            dispatch_workers: DEFAULT_WORKER_COUNT,
            dispatch_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            kpi_granularity_secs: DEFAULT_KPI_GRANULARITY_SECS,
            push_timeout_secs: DEFAULT_PUSH_TIMEOUT_SECS,
            demo_interval_secs: 0,
            https_proxy: None,
            log_level: "info".to_string(),
        }
    }
}

fn parse_env<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl AgentConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, AgentError> {
        let defaults = Self::default();
        let config = Self {
            omc_url: env::var("NE_OMC_URL").unwrap_or(defaults.omc_url),
            org_uid: env::var("NE_ORG_UID").unwrap_or(defaults.org_uid),
            ne_uid: env::var("NE_UID").unwrap_or(defaults.ne_uid),
            dispatch_workers: parse_env("NE_DISPATCH_WORKERS", defaults.dispatch_workers),
            dispatch_queue_capacity: parse_env(
                "NE_DISPATCH_QUEUE_CAPACITY",
                defaults.dispatch_queue_capacity,
            ),
            history_capacity: parse_env("NE_HISTORY_CAPACITY", defaults.history_capacity),
            kpi_granularity_secs: parse_env(
                "NE_KPI_GRANULARITY_SECS",
                defaults.kpi_granularity_secs,
            ),
            push_timeout_secs: parse_env("NE_PUSH_TIMEOUT_SECS", defaults.push_timeout_secs),
            demo_interval_secs: parse_env("NE_DEMO_INTERVAL_SECS", defaults.demo_interval_secs),
            https_proxy: env::var("NE_PROXY_HTTPS")
                .or_else(|_| env::var("HTTPS_PROXY"))
                .ok(),
            log_level: env::var("NE_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        let omc_url = self.omc_url.trim();
        if omc_url.is_empty() {
            return Err(AgentError::InvalidConfig(
                "NE_OMC_URL cannot be empty".to_string(),
            ));
        }
        if !omc_url.starts_with("http://") && !omc_url.starts_with("https://") {
            return Err(AgentError::InvalidConfig(format!(
                "NE_OMC_URL must be an http(s) URL, got '{omc_url}'"
            )));
        }

        if self.ne_uid.trim().is_empty() {
            return Err(AgentError::InvalidConfig("NE_UID cannot be empty".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(AgentError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Library configuration; zero values are left for the library to default.
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            dispatcher: DispatcherConfig {
                worker_count: self.dispatch_workers,
                queue_capacity: self.dispatch_queue_capacity,
                ..Default::default()
            },
            history_capacity: self.history_capacity,
            kpi: KpiConfig {
                granularity: Duration::from_secs(self.kpi_granularity_secs),
                ..Default::default()
            },
        }
    }

    /// `EnvFilter` directives for the validated log level, with HTTP stack internals silenced.
    pub fn log_filter(&self) -> String {
        format!("{QUIET_CRATES},{}", self.log_level)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    /// Endpoint for one kind of record, e.g. `<omc>/upload-ne/v1/alarm`.
    pub fn endpoint(&self, kind: impl std::fmt::Display) -> String {
        format!("{}/upload-ne/v1/{kind}", self.omc_url.trim().trim_end_matches('/'))
    }
}
