//! Installs the `log` backend: `console_log` in the browser, `env_logger` elsewhere.
use std::str::FromStr;

use log::{LevelFilter, SetLoggerError};

// Both backends defer to `log::max_level`, so the level can change after install.
#[cfg(target_arch = "wasm32")]
fn install() -> Result<(), SetLoggerError> {
    console_log::init_with_level(log::Level::Trace)
}

#[cfg(not(target_arch = "wasm32"))]
fn install() -> Result<(), SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Trace)
        .is_test(cfg!(test))
        .try_init()
}

/// Maps a level name from the page; unknown names fall back to `Info`.
pub fn parse_level(name: &str) -> LevelFilter {
    LevelFilter::from_str(name.trim()).unwrap_or(LevelFilter::Info)
}

/// Installs the logger once; later calls only adjust the level.
pub fn init(level: LevelFilter) {
    if install().is_err() {
        log::trace!("logger already installed");
    }
    log::set_max_level(level);
}
