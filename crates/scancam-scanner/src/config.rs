//! Scanner configuration.
//!
//! # Examples
//!
//! ```
//! use scancam_scanner::ScannerConfig;
//! use scancam_core::SymbolType;
//!
//! let config = ScannerConfig::default()
//!     .with_camera_id(1)
//!     .with_scan_modes([SymbolType::QrCode, SymbolType::Ean13]);
//!
//! assert_eq!(config.scan_modes, vec![64, 13]);
//! assert!(config.validate().is_ok());
//! ```

use scancam_core::constants::{
    DEFAULT_AUTOFOCUS_INTERVAL_MS, DEFAULT_CAMERA_ID, DEFAULT_EVENT_CAPACITY,
    DEFAULT_PREVIEW_SCALE, DEFAULT_X_DENSITY, DEFAULT_Y_DENSITY,
};
use scancam_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a scan session.
///
/// Missing fields take their default when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Logical camera index.
    pub camera_id: u32,

    /// Delay between autofocus attempts, in milliseconds.
    pub autofocus_interval_ms: u64,

    /// Factor applied to the measured surface size to form the target
    /// preview size.
    pub preview_scale: u32,

    /// Enabled symbol-type codes, passed to the decoder unmodified.
    /// Empty enables every symbology.
    pub scan_modes: Vec<i32>,

    /// Horizontal scan density passed to the decoder.
    pub x_density: u32,

    /// Vertical scan density passed to the decoder.
    pub y_density: u32,

    /// Capacity of the session event queue.
    pub event_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            camera_id: DEFAULT_CAMERA_ID,
            autofocus_interval_ms: DEFAULT_AUTOFOCUS_INTERVAL_MS,
            preview_scale: DEFAULT_PREVIEW_SCALE,
            scan_modes: Vec::new(),
            x_density: DEFAULT_X_DENSITY,
            y_density: DEFAULT_Y_DENSITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ScannerConfig {
    /// Parse a configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on malformed JSON or invalid values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the preview scale, autofocus interval or
    /// event capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.preview_scale == 0 {
            return Err(Error::Config("preview_scale must be at least 1".into()));
        }
        if self.autofocus_interval_ms == 0 {
            return Err(Error::Config(
                "autofocus_interval_ms must be greater than zero".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_camera_id(mut self, camera_id: u32) -> Self {
        self.camera_id = camera_id;
        self
    }

    pub fn with_autofocus_interval(mut self, interval: Duration) -> Self {
        self.autofocus_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_preview_scale(mut self, scale: u32) -> Self {
        self.preview_scale = scale;
        self
    }

    /// Restrict decoding to the given symbologies.
    pub fn with_scan_modes<I, T>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<i32>,
    {
        self.scan_modes = modes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_density(mut self, x_density: u32, y_density: u32) -> Self {
        self.x_density = x_density;
        self.y_density = y_density;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn autofocus_interval(&self) -> Duration {
        Duration::from_millis(self.autofocus_interval_ms)
    }
}
