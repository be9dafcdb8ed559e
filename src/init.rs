use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Console logging configuration.
///
/// **Fields**
/// - `default_directive`: filter used when `RUST_LOG` is unset, e.g.
///   `"info"` or `"bulk_index_sink=debug"`.
/// - `ansi`: colourise output.
/// - `with_target`: print the event target (module path).
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub default_directive: String,
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            ansi: true,
            with_target: true,
        }
    }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    build_filter(from_env.as_deref(), &config.default_directive)
}

/// `RUST_LOG` wins, then the configured default, then plain `info`.
fn build_filter(from_env: Option<&str>, default_directive: &str) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(default_directive).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install a global `tracing` subscriber that prints to stdout.
///
/// **Returns**
/// - `Err(..)` if a global subscriber is already installed; the existing
///   one stays in place.
pub fn init_logging_with_config(config: LoggingConfig) -> Result<(), TryInitError> {
    let fmt_layer = fmt::layer()
        .with_ansi(config.ansi)
        .with_target(config.with_target);

    Registry::default()
        .with(env_filter(&config))
        .with(fmt_layer)
        .try_init()
}

/// Initialize logging with sensible defaults.
///
/// Equivalent to calling [`init_logging_with_config`] with
/// [`LoggingConfig::default`].
pub fn init_logging() -> Result<(), TryInitError> {
    init_logging_with_config(LoggingConfig::default())
}
