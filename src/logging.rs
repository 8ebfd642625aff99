use std::fmt;
use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use camino::Utf8Path;
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::SwarmError;

const LOG_TAG: &str = "[Swarm]";

/// `2026-10-18 09:14:03,117 INFO     [Swarm] message`
#[derive(Debug, Clone, Copy, Default)]
pub struct SwarmFormat;

impl<S, N> FormatEvent<S, N> for SwarmFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} {:<8} {LOG_TAG} ",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            event.metadata().level().as_str()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

type FileLayer<S> = tracing_subscriber::fmt::Layer<S, DefaultFields, SwarmFormat, Mutex<File>>;
type AttachFn = dyn Fn(File) -> Result<(), reload::Error> + Send + Sync;

/// Late binding for the run log file. Until [`RunLog::attach`] succeeds only
/// the console sink receives events.
pub struct RunLog {
    attach: Box<AttachFn>,
}

impl RunLog {
    pub fn attach(&self, path: &Utf8Path) -> Result<(), SwarmError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| SwarmError::Logging(format!("open {path}: {err}")))?;
        (self.attach)(file).map_err(|err| SwarmError::Logging(err.to_string()))
    }
}

/// Console sink plus an empty slot for the run log file.
pub fn subscriber<W>(
    filter: EnvFilter,
    console: W,
) -> (impl Subscriber + Send + Sync + 'static, RunLog)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (file_layer, handle) = reload::Layer::<Option<FileLayer<_>>, _>::new(None);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(SwarmFormat)
                .with_writer(console),
        )
        .with(file_layer);

    let run_log = RunLog {
        attach: Box::new(move |file| {
            handle.reload(Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .event_format(SwarmFormat)
                    .with_writer(Mutex::new(file)),
            ))
        }),
    };
    (subscriber, run_log)
}

/// Installs the global subscriber writing to stderr. Level comes from
/// `RUST_LOG`, default `info`.
pub fn init() -> Result<RunLog, SwarmError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (subscriber, run_log) = subscriber(filter, std::io::stderr);
    subscriber
        .try_init()
        .map_err(|err| SwarmError::Logging(err.to_string()))?;
    Ok(run_log)
}
