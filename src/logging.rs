use log::LevelFilter;

/// Initializes the global logger at the given verbosity. Every stage and
/// every external tool invocation logs through this (§4.7's "log facade +
/// env_logger backend"); nothing in the engine writes to stdout/stderr
/// directly.
pub fn init(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .init();
}
