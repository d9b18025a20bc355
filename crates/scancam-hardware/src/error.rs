//! Error types for camera hardware operations.
//!
//! This module defines the errors a camera driver can report, covering device
//! acquisition failures, faults raised by individual driver calls and display
//! target attachment problems.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during camera hardware operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Camera could not be acquired (absent or held by another session).
    #[error("Camera {camera_id} unavailable: {reason}")]
    Unavailable { camera_id: u32, reason: String },

    /// Operation attempted on a handle whose device was already released.
    #[error("Camera handle is closed")]
    Closed,

    /// A driver call failed.
    #[error("Driver fault in {operation}: {message}")]
    Fault { operation: String, message: String },

    /// The display target could not be attached to the camera.
    #[error("Display attach failed: {message}")]
    DisplayAttach { message: String },

    /// Invalid data received from the device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new unavailable error.
    pub fn unavailable(camera_id: u32, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            camera_id,
            reason: reason.into(),
        }
    }

    /// Create a new driver fault for the named operation.
    pub fn fault(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a new display attach error.
    pub fn display_attach(message: impl Into<String>) -> Self {
        Self::DisplayAttach {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

impl From<HardwareError> for scancam_core::Error {
    fn from(error: HardwareError) -> Self {
        match error {
            HardwareError::Unavailable { camera_id, reason } => {
                scancam_core::Error::DeviceUnavailable { camera_id, reason }
            }
            HardwareError::DisplayAttach { message } => {
                scancam_core::Error::DisplayAttachFailure(message)
            }
            HardwareError::Fault { operation, message } => {
                scancam_core::Error::TransientHardwareFault { operation, message }
            }
            HardwareError::Io(e) => scancam_core::Error::Io(e),
            other => scancam_core::Error::fault("driver", other.to_string()),
        }
    }
}
