//! Enum wrappers for camera driver dispatch.
//!
//! Native `async fn` in traits is not object-safe, so a `Box<dyn CameraDevice>`
//! is not an option. The enums in this module provide concrete type dispatch
//! over the drivers compiled into the crate instead.
//!
//! # Examples
//!
//! ```
//! use scancam_hardware::devices::AnyCameraBackend;
//! use scancam_hardware::mock::MockCameraBackend;
//! use scancam_hardware::traits::CameraBackend;
//!
//! let (backend, _control) = MockCameraBackend::new();
//! let backend = AnyCameraBackend::Mock(backend);
//!
//! assert_eq!(backend.camera_count(), 1);
//! ```

use crate::Result;
use crate::mock::{MockCamera, MockCameraBackend};
use crate::traits::{CameraBackend, CameraDevice};
use crate::types::{CameraInfo, DisplayTarget, FocusCompletion, FrameCallback};
use scancam_core::{DisplayTransform, PreviewSize};

/// Enum wrapper for camera service dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyCameraBackend {
    /// Mock camera service for development and testing.
    Mock(MockCameraBackend),
}

impl From<MockCameraBackend> for AnyCameraBackend {
    fn from(backend: MockCameraBackend) -> Self {
        Self::Mock(backend)
    }
}

impl CameraBackend for AnyCameraBackend {
    type Device = AnyCameraDevice;

    fn camera_count(&self) -> u32 {
        match self {
            Self::Mock(backend) => backend.camera_count(),
        }
    }

    async fn open(&self, camera_id: u32) -> Result<AnyCameraDevice> {
        match self {
            Self::Mock(backend) => backend.open(camera_id).await.map(AnyCameraDevice::Mock),
        }
    }
}

/// Enum wrapper for opened camera dispatch.
///
/// # Examples
///
/// ```
/// use scancam_hardware::devices::{AnyCameraBackend, AnyCameraDevice};
/// use scancam_hardware::mock::MockCameraBackend;
/// use scancam_hardware::traits::{CameraBackend, CameraDevice};
///
/// #[tokio::main]
/// async fn main() -> scancam_hardware::Result<()> {
///     let (backend, _control) = MockCameraBackend::new();
///     let backend = AnyCameraBackend::Mock(backend);
///
///     let mut camera: AnyCameraDevice = backend.open(0).await?;
///     let info = camera.get_info().await?;
///     println!("Camera {} faces {:?}", info.camera_id, info.facing);
///
///     camera.release().await
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCameraDevice {
    /// Mock camera for development and testing.
    Mock(MockCamera),
}

impl CameraDevice for AnyCameraDevice {
    async fn get_info(&self) -> Result<CameraInfo> {
        match self {
            Self::Mock(device) => device.get_info().await,
        }
    }

    async fn supported_preview_sizes(&self) -> Result<Vec<PreviewSize>> {
        match self {
            Self::Mock(device) => device.supported_preview_sizes().await,
        }
    }

    async fn set_preview_size(&mut self, size: PreviewSize) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_preview_size(size).await,
        }
    }

    async fn set_display_orientation(&mut self, transform: DisplayTransform) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_display_orientation(transform).await,
        }
    }

    async fn set_preview_display(&mut self, target: Option<&DisplayTarget>) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_preview_display(target).await,
        }
    }

    async fn start_preview(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.start_preview().await,
        }
    }

    async fn stop_preview(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.stop_preview().await,
        }
    }

    async fn auto_focus(&mut self) -> Result<FocusCompletion> {
        match self {
            Self::Mock(device) => device.auto_focus().await,
        }
    }

    async fn cancel_auto_focus(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.cancel_auto_focus().await,
        }
    }

    fn set_frame_callback(&mut self, callback: Option<FrameCallback>) {
        match self {
            Self::Mock(device) => device.set_frame_callback(callback),
        }
    }

    async fn release(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.release().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::CameraCall;

    #[tokio::test]
    async fn test_any_device_dispatches_to_mock() {
        let (backend, control) = MockCameraBackend::new();
        let backend = AnyCameraBackend::from(backend);

        let mut camera = backend.open(0).await.unwrap();
        camera
            .set_preview_size(PreviewSize::new(640, 480))
            .await
            .unwrap();
        camera.start_preview().await.unwrap();

        assert!(control.is_previewing());
        assert_eq!(control.preview_size(), Some(PreviewSize::new(640, 480)));
        assert_eq!(control.count(&CameraCall::StartPreview), 1);
    }

    #[tokio::test]
    async fn test_any_backend_propagates_unavailable() {
        let (backend, control) = MockCameraBackend::new();
        control.occupy();
        let backend = AnyCameraBackend::Mock(backend);

        assert!(backend.open(0).await.is_err());
    }
}
