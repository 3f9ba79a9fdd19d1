//! HIV/AIDS Discovery Monitor: binary entrypoint
//! Boots the Axum HTTP server, the hourly refresh task and `/metrics`.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use discovery_monitor::analyze::{build_classifier, EvidenceAnalyzer};
use discovery_monitor::ingest::scheduler::spawn_refresh_scheduler;
use discovery_monitor::metrics::Metrics;
use discovery_monitor::{create_router, AppState, DiscoveryMonitor, MonitorConfig};

/// Enable local tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DISCOVERY_DEV_LOG=1
/// `LOG_FORMAT=json` switches to JSON lines.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("DISCOVERY_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("discovery_monitor=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = MonitorConfig::load().context("loading monitor config")?;
    let metrics = Metrics::init(cfg.cache.ttl())?;

    let monitor = Arc::new(DiscoveryMonitor::from_config(&cfg)?);
    spawn_refresh_scheduler(monitor.clone(), &cfg.schedule);

    let analyzer = Arc::new(EvidenceAnalyzer::new(
        build_classifier(&cfg.classifier).context("building analysis classifier")?,
        &cfg.analyze,
    ));

    let state = AppState {
        monitor,
        serve_seed: cfg.api.serve_seed_when_empty,
        analyzer,
    };
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
