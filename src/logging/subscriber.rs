//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;

use super::utils::{HEADER_TIME, LINE_TIME, strip_ansi, utc_now};

/// Target used for phase banners.
pub(super) const STAGE_TARGET: &str = "bootstrap::stage";
/// Target used for dry-run action lines.
pub(super) const DRY_RUN_TARGET: &str = "bootstrap::dry_run";

/// How an event is rendered, derived from its level and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Stage,
    DryRun,
    Info,
    Debug,
    Warn,
    Error,
}

impl Line {
    fn of(event: &tracing::Event<'_>) -> Self {
        let metadata = event.metadata();
        match (*metadata.level(), metadata.target()) {
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, STAGE_TARGET) => Self::Stage,
            (Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }
}

/// Pulls the `message` field out of an event.
#[derive(Default)]
struct Message(String);

impl Message {
    fn of(event: &tracing::Event<'_>) -> String {
        let mut visitor = Self::default();
        event.record(&mut visitor);
        visitor.0
    }
}

impl tracing::field::Visit for Message {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.0);
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Appends every event to the log file, timestamped and with ANSI codes
/// stripped.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate `path`, write the run header, and return a layer appending
    /// to it. `None` if the file cannot be written.
    pub(super) fn create(path: &Path) -> Option<Self> {
        let rule = "=".repeat(48);
        let header = format!(
            "{rule}\nbootstrap {} started {}\n{rule}\n",
            crate::VERSION,
            utc_now(HEADER_TIME)
        );
        fs::write(path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let msg = strip_ansi(&Message::of(event));
        let tag = match Line::of(event) {
            Line::Stage => "==> ",
            Line::DryRun => "    [dry run] ",
            Line::Info => "    ",
            Line::Debug => "    [debug] ",
            Line::Warn => "    [warn] ",
            Line::Error => "    [error] ",
        };
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "[{}] {tag}{msg}", utc_now(LINE_TIME)).ok();
        }
    }
}

/// Console rendering: bold blue phase banners, yellow dry-run markers,
/// colored warning and error prefixes, dimmed debug lines.
struct BootstrapFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for BootstrapFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let msg = Message::of(event);
        match Line::of(event) {
            Line::Stage => writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Line::DryRun => writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}"),
            Line::Info => writeln!(writer, "  {msg}"),
            Line::Debug => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
            Line::Warn => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            Line::Error => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Info and debug go to stdout, warnings and errors to stderr; debug is
/// shown only when `verbose`. When `log_file` is given, every event down to
/// debug is also appended there. Call once, before any logging.
pub fn init_subscriber(verbose: bool, log_file: Option<&Path>) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));
    let console = fmt::layer()
        .event_format(BootstrapFormatter)
        .with_writer(writer)
        .with_filter(console_level);

    let file = log_file
        .and_then(FileLayer::create)
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();
}
