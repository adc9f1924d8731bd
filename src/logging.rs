//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` from config. Logs go to stderr so
/// command output stays pipeable.
pub fn init(cfg: &Config, verbose: u8) {
    let fallback = match verbose {
        0 => cfg.get("LOG_LEVEL").unwrap_or_else(|| "warn".into()),
        1 => "info".into(),
        _ => "debug".into(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
