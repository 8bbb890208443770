//! Logging infrastructure for structured console and file output.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, TaskEntry, TaskStatus};
pub use utils::log_file_path;

/// Build a [`Logger`] whose events reach a file layer writing into `dir`.
///
/// The returned guard scopes the subscriber to the current thread; keep it
/// alive for the duration of the test.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn file_backed_logger(
    dir: &std::path::Path,
) -> (Logger, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};

    let path = dir.join("bootstrap.log");
    let layer = subscriber::FileLayer::create(&path).expect("log file should open");
    let subscriber = tracing_subscriber::registry().with(layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (Logger::new(Some(path)), guard)
}
