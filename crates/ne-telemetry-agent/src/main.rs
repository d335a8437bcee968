// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod config;
mod demo;
mod error;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use ne_telemetry::{
    http::{HttpPoster, ReqwestPoster},
    identity::NeIdentity,
    records::RecordKind,
    Telemetry,
};
use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::demo::DemoGenerator;
use crate::error::AgentError;

#[tokio::main]
pub async fn main() {
    let config = AgentConfig::from_env();
    // a rejected configuration is still reported, at the default level
    let log_filter = match &config {
        Ok(c) => c.log_filter(),
        Err(_) => AgentConfig::default().log_filter(),
    };

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(log_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("Error creating config on telemetry agent startup: {e}");
            return;
        }
    };

    if let Err(e) = run(config).await {
        error!("Telemetry agent stopped: {e}");
    }
}

async fn run(config: AgentConfig) -> Result<(), AgentError> {
    let poster = ReqwestPoster::new(config.https_proxy.as_deref())
        .map_err(|e| AgentError::HttpClient(e.to_string()))?;
    let poster: Arc<dyn HttpPoster> = Arc::new(poster);

    let identity = NeIdentity::new(&config.org_uid, &config.ne_uid);
    let telemetry = Arc::new(Telemetry::new(
        config.telemetry_config(),
        poster,
        identity,
    ));
    info!(
        "Telemetry agent for NE {} reporting to {}",
        config.ne_uid, config.omc_url
    );

    telemetry
        .kpi()
        .start_periodic_flush(&config.endpoint(RecordKind::Kpi));

    let cancel = CancellationToken::new();
    if config.demo_interval_secs > 0 {
        let demo = DemoGenerator::new(Arc::clone(&telemetry), config.clone());
        let every = Duration::from_secs(config.demo_interval_secs);
        info!("Demo generator enabled, one round every {every:?}");
        tokio::spawn(demo.run(every, cancel.clone()));
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for shutdown signal: {e}");
    }

    info!("Shutting down telemetry agent");
    cancel.cancel();
    telemetry.kpi().stop_periodic_flush();
    let stats = telemetry.dispatcher().stats();
    debug!("Dispatcher totals at shutdown: {stats:?}");
    Ok(())
}
