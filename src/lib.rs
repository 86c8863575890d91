pub mod config;
pub mod error;
pub mod feed;
pub mod footage;
pub mod recording;

#[cfg(test)]
pub(crate) mod testing;

pub use config::FootageConfig;
pub use error::{FootageError, FootageResult};

/// Install the global logger
///
/// `RUST_LOG` overrides the levels set here. Calling this more than once
/// is harmless; only the first call installs a logger.
pub fn init_logging(level: log::LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        // Set specific levels for modules
        .filter_module("footage_lib::feed", level.min(log::LevelFilter::Info))
        .filter_module("footage_lib::footage", level)
        .filter_module("footage_lib::recording", level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();

    if result.is_ok() {
        log::debug!("Logging initialized at {}", level);
    }
}
