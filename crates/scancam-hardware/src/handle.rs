//! Exclusive owner of one camera session.
//!
//! [`CameraHandle`] wraps an opened [`AnyCameraDevice`] and tracks the
//! preview-running and autofocus-armed flags. Once the handle is closed every
//! operation turns into a no-op, so teardown paths can call into it without
//! checking state first.
//!
//! The handle itself is not synchronized; its owner serializes access.

use crate::devices::{AnyCameraBackend, AnyCameraDevice};
use crate::error::Result;
use crate::traits::{CameraBackend, CameraDevice};
use crate::types::{CameraInfo, DisplayTarget, FocusCompletion, FrameCallback};
use scancam_core::{DisplayTransform, PreviewSize};
use tracing::{debug, warn};

/// Owner of a single hardware camera session.
///
/// # Examples
///
/// ```
/// use scancam_hardware::{AnyCameraBackend, CameraHandle};
/// use scancam_hardware::mock::MockCameraBackend;
///
/// #[tokio::main]
/// async fn main() -> scancam_hardware::Result<()> {
///     let (backend, control) = MockCameraBackend::new();
///     let backend = AnyCameraBackend::Mock(backend);
///
///     let mut handle = CameraHandle::open(&backend, 0).await?;
///     handle.start().await?;
///     assert!(control.is_previewing());
///
///     handle.close().await?;
///     handle.start().await?; // no-op once closed
///     assert!(!control.is_previewing());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct CameraHandle {
    camera_id: u32,
    device: Option<AnyCameraDevice>,
    info: Option<CameraInfo>,
    preview_running: bool,
    autofocus_armed: bool,
}

impl CameraHandle {
    /// A handle that owns nothing. Every operation on it is a no-op.
    pub fn closed(camera_id: u32) -> Self {
        Self {
            camera_id,
            device: None,
            info: None,
            preview_running: false,
            autofocus_armed: false,
        }
    }

    /// Acquire camera `camera_id` from `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Unavailable`](crate::HardwareError::Unavailable)
    /// when the camera is absent or held elsewhere. If the sensor cannot be
    /// described after acquisition the camera is given back before the error
    /// is returned.
    pub async fn open(backend: &AnyCameraBackend, camera_id: u32) -> Result<Self> {
        let mut device = backend.open(camera_id).await?;

        let info = match device.get_info().await {
            Ok(info) => info,
            Err(e) => {
                if let Err(release_err) = device.release().await {
                    warn!(camera_id, error = %release_err, "Release after failed open also failed");
                }
                return Err(e);
            }
        };

        debug!(
            camera_id,
            facing = ?info.facing,
            mount_angle = info.orientation,
            "Camera opened"
        );

        Ok(Self {
            camera_id,
            device: Some(device),
            info: Some(info),
            preview_running: false,
            autofocus_armed: false,
        })
    }

    pub fn camera_id(&self) -> u32 {
        self.camera_id
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Sensor description captured at open time.
    pub fn info(&self) -> Option<&CameraInfo> {
        self.info.as_ref()
    }

    pub fn is_preview_running(&self) -> bool {
        self.preview_running
    }

    pub fn is_autofocus_armed(&self) -> bool {
        self.autofocus_armed
    }

    /// Preview sizes advertised by the driver. Empty once closed.
    pub async fn supported_preview_sizes(&self) -> Result<Vec<PreviewSize>> {
        match &self.device {
            Some(device) => device.supported_preview_sizes().await,
            None => Ok(Vec::new()),
        }
    }

    /// Configure the preview stream size.
    pub async fn configure(&mut self, size: PreviewSize) -> Result<()> {
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };
        device.set_preview_size(size).await?;
        debug!(camera_id = self.camera_id, %size, "Preview size configured");
        Ok(())
    }

    pub async fn set_display_transform(&mut self, transform: DisplayTransform) -> Result<()> {
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };
        device.set_display_orientation(transform).await?;
        debug!(camera_id = self.camera_id, %transform, "Display transform applied");
        Ok(())
    }

    /// Attach (`Some`) or detach (`None`) the display target.
    pub async fn attach_display(&mut self, target: Option<&DisplayTarget>) -> Result<()> {
        match self.device.as_mut() {
            Some(device) => device.set_preview_display(target).await,
            None => Ok(()),
        }
    }

    /// Start streaming. No-op when closed or already running.
    pub async fn start(&mut self) -> Result<()> {
        if self.preview_running {
            return Ok(());
        }
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };
        device.start_preview().await?;
        self.preview_running = true;
        Ok(())
    }

    /// Stop streaming. No-op when closed or not running.
    ///
    /// The preview is considered stopped even if the driver reports a fault.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.preview_running {
            return Ok(());
        }
        self.preview_running = false;
        match self.device.as_mut() {
            Some(device) => device.stop_preview().await,
            None => Ok(()),
        }
    }

    /// Allow autofocus cycles to be started. Ignored when closed.
    pub fn arm_autofocus(&mut self) {
        if self.device.is_some() {
            self.autofocus_armed = true;
        }
    }

    pub fn disarm_autofocus(&mut self) {
        self.autofocus_armed = false;
    }

    /// Begin one autofocus cycle.
    ///
    /// Returns `Ok(None)` without touching the driver unless the handle is
    /// open, previewing and armed.
    pub async fn auto_focus(&mut self) -> Result<Option<FocusCompletion>> {
        if !(self.autofocus_armed && self.preview_running) {
            return Ok(None);
        }
        match self.device.as_mut() {
            Some(device) => device.auto_focus().await.map(Some),
            None => Ok(None),
        }
    }

    /// Disarm autofocus and abort any cycle in flight.
    pub async fn cancel_auto_focus(&mut self) -> Result<()> {
        self.autofocus_armed = false;
        match self.device.as_mut() {
            Some(device) => device.cancel_auto_focus().await,
            None => Ok(()),
        }
    }

    /// Install (`Some`) or remove (`None`) the frame callback.
    pub fn register_frame_callback(&mut self, callback: Option<FrameCallback>) {
        if let Some(device) = self.device.as_mut() {
            device.set_frame_callback(callback);
        }
    }

    /// Tear the session down and give the camera back.
    ///
    /// Idempotent. The device is dropped from the handle whatever the driver
    /// reports; the first error met on the way is returned.
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut device) = self.device.take() else {
            return Ok(());
        };

        let mut first_err = None;

        if self.autofocus_armed {
            self.autofocus_armed = false;
            if let Err(e) = device.cancel_auto_focus().await {
                first_err.get_or_insert(e);
            }
        }

        device.set_frame_callback(None);

        if self.preview_running {
            self.preview_running = false;
            if let Err(e) = device.stop_preview().await {
                first_err.get_or_insert(e);
            }
        }

        if let Err(e) = device.release().await {
            first_err.get_or_insert(e);
        }

        self.info = None;
        debug!(camera_id = self.camera_id, "Camera released");

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HardwareError;
    use crate::mock::{CameraCall, MockCameraBackend, MockCameraControl, MockOperation};

    async fn open_handle() -> (CameraHandle, MockCameraControl) {
        let (backend, control) = MockCameraBackend::new();
        let backend = AnyCameraBackend::Mock(backend);
        let handle = CameraHandle::open(&backend, 0).await.unwrap();
        (handle, control)
    }

    #[tokio::test]
    async fn test_open_captures_info() {
        let (handle, _control) = open_handle().await;

        assert!(handle.is_open());
        assert_eq!(handle.camera_id(), 0);
        assert_eq!(handle.info().map(|i| i.orientation), Some(90));
        assert!(!handle.is_preview_running());
    }

    #[tokio::test]
    async fn test_open_unavailable() {
        let (backend, control) = MockCameraBackend::new();
        control.occupy();

        let result = CameraHandle::open(&AnyCameraBackend::Mock(backend), 0).await;
        assert!(matches!(result, Err(HardwareError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_start_is_not_repeated() {
        let (mut handle, control) = open_handle().await;

        handle.start().await.unwrap();
        handle.start().await.unwrap();

        assert_eq!(control.count(&CameraCall::StartPreview), 1);
        assert!(handle.is_preview_running());
    }

    #[tokio::test]
    async fn test_failed_start_leaves_preview_stopped() {
        let (mut handle, control) = open_handle().await;
        control.fail_next(MockOperation::StartPreview);

        assert!(handle.start().await.is_err());
        assert!(!handle.is_preview_running());
    }

    #[tokio::test]
    async fn test_auto_focus_requires_armed_preview() {
        let (mut handle, control) = open_handle().await;

        assert!(handle.auto_focus().await.unwrap().is_none());
        handle.start().await.unwrap();
        assert!(handle.auto_focus().await.unwrap().is_none());

        handle.arm_autofocus();
        let completion = handle.auto_focus().await.unwrap();
        assert!(completion.is_some());
        assert_eq!(control.count(&CameraCall::AutoFocus), 1);

        handle.cancel_auto_focus().await.unwrap();
        assert!(!handle.is_autofocus_armed());
    }

    #[tokio::test]
    async fn test_close_tears_down_in_order() {
        let (mut handle, control) = open_handle().await;
        handle.start().await.unwrap();
        handle.arm_autofocus();
        control.clear_calls();

        handle.close().await.unwrap();

        assert_eq!(
            control.calls(),
            vec![
                CameraCall::CancelAutoFocus,
                CameraCall::SetFrameCallback(false),
                CameraCall::StopPreview,
                CameraCall::Release,
            ]
        );
        assert!(!handle.is_open());
        assert!(!control.is_in_use());
    }

    #[tokio::test]
    async fn test_close_nulls_device_on_release_fault() {
        let (mut handle, control) = open_handle().await;
        control.fail_next(MockOperation::Release);

        assert!(handle.close().await.is_err());
        assert!(!handle.is_open());
        assert!(handle.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_handle_makes_no_driver_calls() {
        let (mut handle, control) = open_handle().await;
        handle.close().await.unwrap();
        control.clear_calls();

        handle.start().await.unwrap();
        handle.configure(PreviewSize::new(640, 480)).await.unwrap();
        handle
            .set_display_transform(DisplayTransform::new(90))
            .await
            .unwrap();
        handle.attach_display(Some(&DisplayTarget::new(1))).await.unwrap();
        handle.arm_autofocus();
        assert!(handle.auto_focus().await.unwrap().is_none());
        assert!(handle.supported_preview_sizes().await.unwrap().is_empty());
        handle.register_frame_callback(None);
        handle.stop().await.unwrap();

        assert!(control.calls().is_empty());
        assert!(!handle.is_preview_running());
    }
}
