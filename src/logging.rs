//! Logging initialization utilities.

use env_logger::Env;

/// Initialize logging with a default filter level.
///
/// Later calls are no-ops, so library consumers and test binaries can both
/// call this without coordinating.
pub fn init() {
    let env = Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}
