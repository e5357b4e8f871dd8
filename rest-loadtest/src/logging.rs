use crate::config::LogLevel;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Filter for the given level. `RUST_LOG` takes precedence when set.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.level_filter().into())
        .from_env_lossy()
}

/// Install the global subscriber, writing to stderr. Only the first call has an effect.
pub fn init(level: LogLevel) {
    let _ = FmtSubscriber::builder()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .try_init();
}
