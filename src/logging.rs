use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Installs the global fmt subscriber writing to stderr. A second call is a
/// no-op, which keeps tests and in-process restarts safe.
pub(crate) fn init(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
