//! Shared defaults for the scanning pipeline.
//!
//! These values describe how a scan session behaves when the embedding host
//! does not override them through `ScannerConfig`.
//!
//! # Usage
//!
//! ```
//! use scancam_core::constants::*;
//! use std::time::Duration;
//!
//! let interval = Duration::from_millis(DEFAULT_AUTOFOCUS_INTERVAL_MS);
//! assert_eq!(interval.as_secs(), 1);
//! assert_eq!(LUMINANCE_FORMAT, "Y800");
//! ```

// ============================================================================
// Camera selection
// ============================================================================

/// Logical index of the first/default (rear-facing) camera.
pub const DEFAULT_CAMERA_ID: u32 = 0;

// ============================================================================
// Autofocus
// ============================================================================

/// Delay between two consecutive autofocus attempts while previewing.
///
/// Continuous autofocus is emulated by re-triggering a single-shot focus
/// cycle after each completion, successful or not.
pub const DEFAULT_AUTOFOCUS_INTERVAL_MS: u64 = 1000;

// ============================================================================
// Preview geometry
// ============================================================================

/// Multiplier applied to the measured surface size to form the target
/// preview size.
///
/// Asking the hardware for twice the on-screen size favours capture sizes
/// large enough for the decoder to resolve fine barcode modules.
pub const DEFAULT_PREVIEW_SCALE: u32 = 2;

/// Display transforms (degrees) that put the preview in portrait.
pub const PORTRAIT_TRANSFORMS: [u16; 2] = [90, 270];

/// Sensor orientation value meaning "device orientation is unknown"
/// (for example when the device lies flat).
pub const ORIENTATION_UNKNOWN: i32 = -1;

// ============================================================================
// Decoder pass-through
// ============================================================================

/// FourCC of the luminance-only frame format handed to the decoder.
pub const LUMINANCE_FORMAT: &str = "Y800";

/// Default horizontal scan density passed to the decoder.
pub const DEFAULT_X_DENSITY: u32 = 3;

/// Default vertical scan density passed to the decoder.
pub const DEFAULT_Y_DENSITY: u32 = 3;

// ============================================================================
// Session plumbing
// ============================================================================

/// Capacity of the serialized session event queue.
pub const DEFAULT_EVENT_CAPACITY: usize = 32;
