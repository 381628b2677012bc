//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;

const FILTER_ENV: &str = "DBHIVE_LOG";

/// Install the global subscriber, writing to stderr.
///
/// The filter comes from `DBHIVE_LOG`, then `RUST_LOG`, then `info`;
/// `verbose` overrides all of them with `debug`.
pub fn init(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(FILTER_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
