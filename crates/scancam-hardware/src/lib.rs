//! Camera hardware abstraction layer for the scancam scanner.
//!
//! This crate provides the trait-based seam between the resource coordinator
//! and a platform camera service, plus [`CameraHandle`], the exclusive owner
//! of one opened camera.
//!
//! # Design Philosophy
//!
//! - **Async-first**: driver calls are native `async fn` in traits (Rust 1.90 +
//!   Edition 2024 RPITIT).
//! - **Enum dispatch**: the traits are not object-safe, so concrete drivers
//!   are wrapped in [`AnyCameraBackend`] / [`AnyCameraDevice`].
//! - **Thread-safe**: all traits require `Send + Sync` for use with Tokio.
//! - **No-op after close**: a closed [`CameraHandle`] never reaches the driver.
//!
//! # Example
//!
//! ```no_run
//! use scancam_hardware::{AnyCameraBackend, CameraHandle};
//! use scancam_core::PreviewSize;
//!
//! async fn preview_vga(backend: &AnyCameraBackend) -> scancam_hardware::Result<()> {
//!     let mut handle = CameraHandle::open(backend, 0).await?;
//!     handle.configure(PreviewSize::new(640, 480)).await?;
//!     handle.start().await?;
//!     handle.close().await
//! }
//! ```
//!
//! # Mock Implementation
//!
//! [`mock::MockCameraBackend`] simulates a camera service: sizes and sensor
//! description are scriptable, driver calls are recorded, failures can be
//! injected and frames pushed into the preview callback.

pub mod devices;
pub mod error;
pub mod handle;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyCameraBackend, AnyCameraDevice};
pub use error::{HardwareError, Result};
pub use handle::CameraHandle;
pub use traits::{CameraBackend, CameraDevice};
pub use types::{CameraInfo, DisplayTarget, FocusCompletion, FocusNotifier, FrameCallback};
