//! Formatter selection

use chrono::Local;
use rotalog_core::{constants::LOG_TIME_FORMAT, LogFormat, Severity};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::Layer;

/// Local wall-clock timestamps with millisecond precision
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format(LOG_TIME_FORMAT))
    }
}

/// Filter letting `severity` and anything more severe through
///
/// `tracing` has no fatal level, so fatal filters like error.
pub fn level_filter(severity: Severity) -> LevelFilter {
    match severity {
        Severity::Debug => LevelFilter::DEBUG,
        Severity::Info => LevelFilter::INFO,
        Severity::Warn => LevelFilter::WARN,
        Severity::Error | Severity::Fatal => LevelFilter::ERROR,
    }
}

/// Build the formatting layer for `format`, writing to `writer`
pub fn build_layer<S>(
    format: LogFormat,
    writer: BoxMakeWriter,
    ansi: bool,
) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer().with_timer(LocalTimer);

    match format {
        LogFormat::Json => layer
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Console => layer.with_ansi(ansi).with_writer(writer).boxed(),
        LogFormat::Text => layer
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer)
            .boxed(),
    }
}
