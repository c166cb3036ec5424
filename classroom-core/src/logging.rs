//! Log output for the relay server
//!
//! `json` is meant for log shipping, `pretty` for a terminal. Either one can
//! be redirected to an append-only file instead of stdout.

use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where formatted events go
struct Sink {
    writer: BoxMakeWriter,
    ansi: bool,
}

/// Install the global subscriber described by `config`
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = build_filter(config)?;
    let sink = open_sink(config.file_path.as_deref())?;

    tracing_subscriber::registry()
        .with(output_layer(&config.format, sink))
        .with(filter)
        .try_init()?;

    Ok(())
}

/// `RUST_LOG` directives win; the configured level is the fallback
fn build_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    let level = parse_log_level(&config.level)?;
    Ok(EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy())
}

fn open_sink(file_path: Option<&str>) -> std::io::Result<Sink> {
    let Some(path) = file_path else {
        return Ok(Sink {
            writer: BoxMakeWriter::new(std::io::stdout),
            ansi: true,
        });
    };

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    Ok(Sink {
        writer: BoxMakeWriter::new(Arc::new(file)),
        ansi: false,
    })
}

fn output_layer(format: &str, sink: Sink) -> OutputLayer {
    let layer = fmt::layer()
        .with_writer(sink.writer)
        .with_ansi(sink.ansi)
        .with_target(true)
        .with_line_number(true);

    if format == "json" {
        layer
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_file(true)
            .boxed()
    } else {
        layer.pretty().with_file(false).boxed()
    }
}

fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
