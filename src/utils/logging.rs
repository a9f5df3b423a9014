// src/utils/logging.rs
use std::io::Write;
use chrono::Local;
use env_logger::Builder;
use log::LevelFilter;

use crate::error::{Error, Result};

fn builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level);
    builder
}

/// Installs the global logger. Panics if one is already installed, so call
/// it once at application start.
pub fn init_logging(level: LevelFilter) {
    builder(level).init();
}

/// Like [`init_logging`] but reports an already-installed logger as an error.
pub fn try_init_logging(level: LevelFilter) -> Result<()> {
    builder(level)
        .try_init()
        .map_err(|e| Error::config(format!("Logger already initialized: {}", e)))
}
