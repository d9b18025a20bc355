use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Session-level failures
    #[error("Camera {camera_id} unavailable: {reason}")]
    DeviceUnavailable { camera_id: u32, reason: String },

    #[error("Display attach failed: {0}")]
    DisplayAttachFailure(String),

    #[error("Transient hardware fault during {operation}: {message}")]
    TransientHardwareFault { operation: String, message: String },

    // State errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Validation errors
    #[error("Invalid rotation: {0} degrees")]
    InvalidRotation(i32),

    #[error("Invalid preview size: {0}")]
    InvalidSize(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scan session closed")]
    SessionClosed,
}

impl Error {
    /// Create a transient hardware fault for the named operation.
    pub fn fault(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientHardwareFault {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether this error should end a scan session as a cancellation.
    ///
    /// Unavailability and hardware faults never crash the host; they end the
    /// session the same way a user backing out of the scanner would.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable { .. }
                | Self::DisplayAttachFailure(_)
                | Self::TransientHardwareFault { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_unavailable_display() {
        let error = Error::DeviceUnavailable {
            camera_id: 0,
            reason: "in use".to_string(),
        };
        assert_eq!(error.to_string(), "Camera 0 unavailable: in use");
        assert!(error.is_cancellation());
    }

    #[test]
    fn test_fault_helper() {
        let error = Error::fault("start_preview", "driver returned -19");
        assert!(matches!(error, Error::TransientHardwareFault { .. }));
        assert_eq!(
            error.to_string(),
            "Transient hardware fault during start_preview: driver returned -19"
        );
    }

    #[test]
    fn test_config_error_is_not_cancellation() {
        assert!(!Error::Config("preview_scale must be > 0".into()).is_cancellation());
        assert!(!Error::InvalidRotation(45).is_cancellation());
    }
}
