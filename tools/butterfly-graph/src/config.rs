//! Reader configuration, loadable from a TOML file

use std::path::Path;

use butterfly_common::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Threads decoding PBF blobs
    pub worker_threads: usize,
    /// Decoded blocks buffered between producer and reader
    pub queue_capacity: usize,
    /// Maximum perpendicular deviation (metres) kept when simplifying edge geometry; 0 disables
    pub max_way_point_distance: f64,
    /// Maximum elevation deviation (metres); absent disables the elevation bound
    pub elevation_max_way_point_distance: Option<f64>,
    /// Log progress every N elements per handler; 0 disables
    pub log_every: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            queue_capacity: 64,
            max_way_point_distance: 1.0,
            elevation_max_way_point_distance: None,
            log_every: 10_000_000,
        }
    }
}

impl ReaderConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ReaderConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::Config("worker_threads must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".into()));
        }
        if self.max_way_point_distance.is_nan() || self.max_way_point_distance < 0.0 {
            return Err(Error::Config(format!(
                "max_way_point_distance must be >= 0, got {}",
                self.max_way_point_distance
            )));
        }
        if let Some(ele) = self.elevation_max_way_point_distance {
            if ele < 0.0 {
                return Err(Error::Config(format!(
                    "elevation_max_way_point_distance must be >= 0, got {ele}"
                )));
            }
        }
        Ok(())
    }
}
