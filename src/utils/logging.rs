use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber. `RUST_LOG` wins over the
/// configured level so operators can raise verbosity without editing config.
pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
