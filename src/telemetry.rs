// src/telemetry.rs
use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "SCRAPER_LOG_JSON";

/// Compact logs by default, JSON lines when `SCRAPER_LOG_JSON=1`.
/// Filter from `RUST_LOG`, else `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(ENV_LOG_JSON).ok().as_deref() == Some("1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// Install a process-wide Prometheus recorder.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")
}

/// Write the exposition text atomically, for a node-exporter textfile collector.
pub fn write_metrics_textfile(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    std::fs::write(&tmp, handle.render())
        .with_context(|| format!("writing metrics to {}", Path::new(&tmp).display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
