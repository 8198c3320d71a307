use crate::error::{ProcessError, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service settings, loaded from an optional JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory artifacts are written to and swept from.
    pub storage_dir: PathBuf,
    /// Age after which artifacts are deleted.
    pub retention_secs: u64,
    /// How often the `serve` process sweeps `storage_dir`.
    pub sweep_interval_secs: u64,
    /// Fail on malformed or out-of-range page ranges instead of producing
    /// empty parts.
    pub strict_ranges: bool,
    pub watermark_font_size: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: std::env::temp_dir().join("quire"),
            retention_secs: 3600,
            sweep_interval_secs: 300,
            strict_ranges: false,
            watermark_font_size: 48.0,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| ProcessError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&data)
            .map_err(|e| ProcessError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(data).map_err(|e| ProcessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            return Err(ProcessError::Config("sweep_interval_secs must be positive".into()));
        }
        // also rejects NaN and infinity
        if !(self.watermark_font_size.is_finite() && self.watermark_font_size > 0.0) {
            return Err(ProcessError::Config("watermark_font_size must be positive".into()));
        }
        self.retention()?;
        Ok(())
    }

    pub fn retention(&self) -> Result<TimeDelta> {
        TimeDelta::from_std(Duration::from_secs(self.retention_secs))
            .map_err(|e| ProcessError::Config(format!("retention_secs: {}", e)))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
