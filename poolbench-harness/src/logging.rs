use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Build the stderr log filter.
///
/// Directives from `rust_log` win. The default level (`info`, or `debug` when
/// `verbose`) only applies when `rust_log` is unset or holds no valid directive.
pub fn env_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

/// Install the global subscriber, reading `RUST_LOG` from the environment.
pub fn init(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}
