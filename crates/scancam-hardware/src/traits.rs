//! Camera driver trait definitions.
//!
//! These traits establish the contract between the resource coordinator and a
//! camera driver. They mirror the primitive operations every platform camera
//! service offers (open, configure, start, stop, focus, release) and nothing
//! more; sequencing and state live in the coordinator.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{CameraInfo, DisplayTarget, FocusCompletion, FrameCallback};
use scancam_core::{DisplayTransform, PreviewSize};

/// An opened camera.
///
/// A `CameraDevice` value represents exclusive ownership of one camera. It is
/// obtained from [`CameraBackend::open`] and given back with
/// [`release`](CameraDevice::release).
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic parameters, or the enum wrapper from the
/// [`devices`](crate::devices) module for dispatch over concrete drivers.
///
/// # Examples
///
/// ```no_run
/// use scancam_hardware::traits::CameraDevice;
/// use scancam_hardware::error::Result;
/// use scancam_core::PreviewSize;
///
/// async fn start_vga<C: CameraDevice>(camera: &mut C) -> Result<()> {
///     camera.set_preview_size(PreviewSize::new(640, 480)).await?;
///     camera.start_preview().await
/// }
/// ```
pub trait CameraDevice: Send + Sync {
    /// Describe the sensor (facing, mount angle).
    async fn get_info(&self) -> Result<CameraInfo>;

    /// Preview sizes the driver can stream at, in driver enumeration order.
    async fn supported_preview_sizes(&self) -> Result<Vec<PreviewSize>>;

    /// Configure the preview stream size.
    ///
    /// Drivers may reject reconfiguration while a preview is running.
    async fn set_preview_size(&mut self, size: PreviewSize) -> Result<()>;

    /// Rotate the preview as displayed.
    ///
    /// Drivers may reject this while a preview is running.
    async fn set_display_orientation(&mut self, transform: DisplayTransform) -> Result<()>;

    /// Attach (`Some`) or detach (`None`) the preview display target.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::DisplayAttach`](crate::HardwareError::DisplayAttach)
    /// when the surface cannot be used.
    async fn set_preview_display(&mut self, target: Option<&DisplayTarget>) -> Result<()>;

    /// Start streaming preview frames.
    ///
    /// Starting an already running preview is undefined for most drivers and
    /// must be avoided by the caller.
    async fn start_preview(&mut self) -> Result<()>;

    /// Stop streaming preview frames.
    async fn stop_preview(&mut self) -> Result<()>;

    /// Begin a single autofocus cycle.
    ///
    /// The returned completion resolves when the cycle ends.
    async fn auto_focus(&mut self) -> Result<FocusCompletion>;

    /// Abort any autofocus cycle in progress.
    async fn cancel_auto_focus(&mut self) -> Result<()>;

    /// Install (`Some`) or remove (`None`) the per-frame callback.
    ///
    /// The callback runs on the driver's capture thread.
    fn set_frame_callback(&mut self, callback: Option<FrameCallback>);

    /// Give the camera back to the platform.
    ///
    /// After this call the device must not be used again.
    async fn release(&mut self) -> Result<()>;
}

/// Source of camera devices.
///
/// # Examples
///
/// ```no_run
/// use scancam_hardware::traits::{CameraBackend, CameraDevice};
///
/// # async fn example<B: CameraBackend>(backend: &B) -> scancam_hardware::Result<()> {
/// if backend.camera_count() > 0 {
///     let mut camera = backend.open(0).await?;
///     camera.release().await?;
/// }
/// # Ok(())
/// # }
/// ```
pub trait CameraBackend: Send + Sync {
    /// Device type produced by this backend.
    type Device: CameraDevice;

    /// Number of cameras present.
    fn camera_count(&self) -> u32;

    /// Acquire exclusive use of camera `camera_id`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Unavailable`](crate::HardwareError::Unavailable)
    /// if the camera does not exist or is held by another session.
    async fn open(&self, camera_id: u32) -> Result<Self::Device>;
}
