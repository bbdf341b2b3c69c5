use std::str::FromStr;

use tracing::Level;

/// Initialize tracing for the gateway.
///
/// `level` is one of `error`, `warn`, `info`, `debug` or `trace`; anything
/// else falls back to `info`. Safe to call more than once.
pub fn init(level: &str) {
    let lvl = parse_level(level);

    let _ = tracing_subscriber::fmt()
        .with_max_level(lvl)
        .with_target(false)
        .try_init();
}

pub(crate) fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "warning" => Level::WARN,
        other => Level::from_str(other).unwrap_or(Level::INFO),
    }
}
