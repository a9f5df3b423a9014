// src/config/subsystems/algorithm.rs

use serde::{Serialize, Deserialize};
use crate::algo::grid::DEFAULT_GRID_SIZE;
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    // Cell edge length in screen pixels
    pub grid_size: u32,

    // Zoom gating; None leaves that side unbounded
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            min_zoom: None,
            max_zoom: None,
        }
    }
}

/// Negative values and "unbounded" map to `None`, matching the `-1`
/// sentinel used by map SDK configs.
fn parse_zoom_bound(key: &str, value: &str) -> Result<Option<f64>> {
    let value = value.trim_matches('"');
    if value.eq_ignore_ascii_case("unbounded") || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    match value.parse::<f64>() {
        Ok(zoom) if zoom.is_finite() && zoom < 0.0 => Ok(None),
        Ok(zoom) if zoom.is_finite() => Ok(Some(zoom)),
        _ => Err(Error::Config(format!("Invalid {}: {}", key, value))),
    }
}

impl FromIni for AlgorithmConfig {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        if section_name != "algorithm" {
            return None;
        }

        match key {
            "grid_size" => {
                match value.parse::<u32>() {
                    Ok(size) if size > 0 => {
                        self.grid_size = size;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid grid_size (must be > 0): {}", value)
                    ))),
                }
            },
            "min_zoom" => Some(parse_zoom_bound(key, value).map(|zoom| self.min_zoom = zoom)),
            "max_zoom" => Some(parse_zoom_bound(key, value).map(|zoom| self.max_zoom = zoom)),
            _ => None,
        }
    }
}

impl AlgorithmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(Error::Config(
                "grid_size must be greater than 0".to_string()
            ));
        }

        if let (Some(min), Some(max)) = (self.min_zoom, self.max_zoom) {
            if min > max {
                return Err(Error::Config(
                    format!("min_zoom ({}) cannot be greater than max_zoom ({})", min, max)
                ));
            }
        }

        Ok(())
    }
}
