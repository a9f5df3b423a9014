// src/config/subsystems/manager.rs

use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::FromIni;
use log::LevelFilter;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    // Quiet period after the last zoom change before reclustering
    pub debounce_ms: u64,

    // Background clustering workers
    pub worker_threads: usize,

    // Log level
    pub log_level: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            worker_threads: num_cpus::get(),
            log_level: "info".to_string(),
        }
    }
}

impl FromIni for ManagerConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "manager" {
            return None;
        }

        match key {
            "debounce_ms" => {
                match value.parse::<u64>() {
                    Ok(ms) if ms > 0 => {
                        self.debounce_ms = ms;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid debounce_ms (must be > 0): {}", value)
                    ))),
                }
            },
            "worker_threads" => {
                match value.parse::<usize>() {
                    // 0 means one worker per logical CPU
                    Ok(0) => {
                        self.worker_threads = num_cpus::get();
                        Some(Ok(()))
                    },
                    Ok(threads) => {
                        self.worker_threads = threads;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid worker_threads: {}", value)
                    ))),
                }
            },
            "log_level" => {
                self.log_level = value.trim_matches('"').to_string();
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl ManagerConfig {
    pub fn get_log_level(&self) -> LevelFilter {
        match self.log_level.trim().to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "none" => LevelFilter::Off,
            _ => LevelFilter::Info, // Default to Info if invalid
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(Error::Config(
                "debounce_ms must be greater than 0".to_string()
            ));
        }
        if self.worker_threads == 0 {
            return Err(Error::Config(
                "worker_threads must be greater than 0".to_string()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        let mut config = ManagerConfig::default();
        assert_eq!(config.get_log_level(), LevelFilter::Info);
        config.log_level = "DEBUG".to_string();
        assert_eq!(config.get_log_level(), LevelFilter::Debug);
        config.log_level = "none".to_string();
        assert_eq!(config.get_log_level(), LevelFilter::Off);
        config.log_level = "loud".to_string();
        assert_eq!(config.get_log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_worker_threads_zero_means_cpu_count() {
        let mut config = ManagerConfig::default();
        assert!(matches!(config.from_ini_section("manager", "worker_threads", "0"), Some(Ok(()))));
        assert_eq!(config.worker_threads, num_cpus::get());
        assert!(config.validate().is_ok());
    }
}
