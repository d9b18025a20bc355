//! Mock camera implementation for testing and development.
//!
//! This module provides a simulated camera service that can be controlled
//! programmatically without requiring physical hardware.

pub mod camera;

pub use camera::{CameraCall, MockCamera, MockCameraBackend, MockCameraControl, MockOperation};
