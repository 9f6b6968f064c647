use crate::types::CameraPosition;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CameraError>;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Permission denied error: {0}")]
    PermissionDenied(String),
    #[error("No camera device found for position {position}")]
    NoDeviceFound { position: CameraPosition },
    #[error("Cannot setup input: {0}")]
    CannotSetupInput(String),
    #[error("Session attach error: {0}")]
    SessionAttachFailed(String),
    #[error("Physical zoom {physical} is outside device range [{min}, {max}]")]
    ZoomOutOfRange { physical: f64, min: f64, max: f64 },
    #[error("Device configuration lock error: {0}")]
    ConfigurationLocked(String),
    #[error("Camera hardware error: {0}")]
    HardwareError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Camera session is closed")]
    SessionClosed,
}

impl CameraError {
    /// True for failures that abort session setup or the zoom request in progress:
    /// missing device, input construction, pipeline attach, and fused-path range violations.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            CameraError::NoDeviceFound { .. }
                | CameraError::CannotSetupInput(_)
                | CameraError::SessionAttachFailed(_)
                | CameraError::ZoomOutOfRange { .. }
        )
    }

    pub fn is_permission_error(&self) -> bool {
        matches!(self, CameraError::PermissionDenied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = CameraError::ZoomOutOfRange {
            physical: 12.0,
            min: 1.0,
            max: 10.0,
        };
        assert_eq!(
            err.to_string(),
            "Physical zoom 12 is outside device range [1, 10]"
        );

        let err = CameraError::NoDeviceFound {
            position: CameraPosition::Front,
        };
        assert!(err.to_string().contains("front"));
    }

    #[test]
    fn test_setup_classification() {
        assert!(CameraError::CannotSetupInput("x".into()).is_setup_error());
        assert!(CameraError::SessionAttachFailed("x".into()).is_setup_error());
        assert!(CameraError::ZoomOutOfRange {
            physical: 0.1,
            min: 1.0,
            max: 2.0
        }
        .is_setup_error());
        assert!(!CameraError::PermissionDenied("camera".into()).is_setup_error());
        assert!(CameraError::PermissionDenied("camera".into()).is_permission_error());
        assert!(!CameraError::HardwareError("x".into()).is_setup_error());
    }
}
