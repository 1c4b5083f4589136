use tracing_subscriber::EnvFilter;

/// Variable consulted before `RUST_LOG` for the log filter.
pub const LOG_ENV: &str = "SUPAHOST_LOG";

/// Default filter directive for a `-v` count.
#[must_use]
pub const fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the stderr subscriber. An explicit filter in the
/// environment wins over `-v`.
pub fn init(verbosity: u8) {
    let filter = [LOG_ENV, "RUST_LOG"]
        .iter()
        .find_map(|var| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .and_then(|v| EnvFilter::try_new(v).ok())
        })
        .unwrap_or_else(|| EnvFilter::new(default_level(verbosity)));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
