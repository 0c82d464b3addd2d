/// Maps a level name (`error`, `warn`, `info`, `debug`, `trace`) to a
/// `tracing::Level`. Unknown names map to `INFO`.
pub fn parse_level(name: &str) -> tracing::Level {
    match name.trim().to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" | "verbose" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Initialize tracing/logging for the application.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init(default_level: &str) {
    let lvl = parse_level(default_level);

    let _ = tracing_subscriber::fmt()
        .with_max_level(lvl)
        .with_target(false)
        .try_init();
}
