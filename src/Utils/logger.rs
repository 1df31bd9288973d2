//! Logger setup for the drivers and examples.
//!
//! The library itself only talks to the `log` facade. Binaries call [`init_logger`]
//! once; it installs a terminal logger and, if a file name is given, a file logger
//! next to it (per-run logs of long parameter searches). A second call is a no-op.

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;
use std::path::Path;

/// Returns `Ok(true)` when a logger was installed by this call and `Ok(false)` when
/// some logger was already set.
pub fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> Result<bool, std::io::Error> {
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .set_time_level(LevelFilter::Off)
        .build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        loggers.push(WriteLogger::new(level, config, File::create(path)?));
    }
    Ok(CombinedLogger::init(loggers).is_ok())
}
