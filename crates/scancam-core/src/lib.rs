//! Core types for the scancam camera scanning pipeline.
//!
//! This crate holds the pure, hardware-free part of the scanner: the geometry
//! and orientation math that decides how a camera preview is configured, plus
//! the shared error type and the value types exchanged between the hardware
//! layer and the resource coordinator.
//!
//! # Modules
//!
//! - [`orientation`]: discrete display rotations and the resolver that maps a
//!   device rotation onto a camera display transform.
//! - [`geometry`]: preview size selection and preview layout fitting.
//! - [`types`]: preview sizes, surface lifecycle, decode results and symbol
//!   type codes.
//! - [`constants`]: defaults shared by every crate in the workspace.
//!
//! # Example
//!
//! ```
//! use scancam_core::{Facing, PreviewSize, Rotation, orientation, geometry};
//!
//! let transform = orientation::resolve(Rotation::Deg0, Facing::Back, 90);
//! assert!(transform.is_portrait());
//!
//! let supported = [PreviewSize::new(640, 480), PreviewSize::new(1280, 720)];
//! let chosen = geometry::select_preview_size(PreviewSize::new(480, 640), &supported, transform);
//! assert_eq!(chosen, Some(PreviewSize::new(640, 480)));
//! ```

pub mod constants;
pub mod error;
pub mod geometry;
pub mod orientation;
pub mod types;

pub use error::{Error, Result};
pub use geometry::{LayoutRect, PreviewGeometry, fit_preview, select_preview_size};
pub use orientation::{DisplayTransform, OrientationState, Rotation};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
