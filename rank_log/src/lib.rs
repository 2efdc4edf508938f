//! Logging bootstrap for RankDB binaries.
use anyhow::Result;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Initialize structured JSON logging with hourly rolling files and a
/// runtime-reloadable level filter.
/// `dir` – log directory, `level` – initial log level.
/// Returns the reload handle for updating the filter at runtime.
pub fn init(dir: &str, level: Level) -> Result<reload::Handle<EnvFilter, Registry>> {
    let file_appender = RollingFileAppender::new(Rotation::HOURLY, dir, "rankdb.log");
    let (filter, handle) = reload::Layer::new(EnvFilter::default().add_directive(level.into()));
    let fmt_layer = fmt::layer()
        .with_writer(file_appender)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_filter(filter);

    tracing_subscriber::registry().with(fmt_layer).init();
    Ok(handle)
}
