use crate::errors::{CameraError, Result};
use crate::types::MediaType;
use std::sync::Mutex;

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
    /// Permission restricted (parental controls, etc)
    Restricted,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// Detailed permission information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PermissionInfo {
    pub media_type: MediaType,
    pub status: PermissionStatus,
    pub message: String,
    pub can_request: bool,
}

/// Source of capture permissions. The platform's authorization API sits behind this.
pub trait PermissionsProvider: Send + Sync {
    fn status(&self, media_type: MediaType) -> PermissionStatus;

    /// Prompts the user if the status is undetermined and returns the resulting status.
    fn request_access(&self, media_type: MediaType) -> PermissionStatus;

    fn info(&self, media_type: MediaType) -> PermissionInfo {
        let status = self.status(media_type);
        let message = match status {
            PermissionStatus::Granted => format!("{:?} access granted", media_type),
            PermissionStatus::Denied => format!("{:?} access denied by the user", media_type),
            PermissionStatus::NotDetermined => {
                format!("{:?} access has not been requested yet", media_type)
            }
            PermissionStatus::Restricted => {
                format!("{:?} access is restricted on this device", media_type)
            }
        };
        PermissionInfo {
            media_type,
            status,
            message,
            can_request: status == PermissionStatus::NotDetermined,
        }
    }
}

fn media_name(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Video => "camera",
        MediaType::Audio => "microphone",
    }
}

/// Fails with [`CameraError::PermissionDenied`] unless access is (or becomes) granted.
pub fn ensure_access(provider: &dyn PermissionsProvider, media_type: MediaType) -> Result<()> {
    let status = match provider.status(media_type) {
        PermissionStatus::NotDetermined => {
            log::info!("Requesting {} permission", media_name(media_type));
            provider.request_access(media_type)
        }
        status => status,
    };

    if status == PermissionStatus::Granted {
        Ok(())
    } else {
        log::warn!("{} permission is {}", media_name(media_type), status);
        Err(CameraError::PermissionDenied(format!(
            "{} access is {}",
            media_name(media_type),
            status
        )))
    }
}

/// Fixed permission answers, resolved on request to a preset outcome.
#[derive(Debug)]
pub struct StaticPermissions {
    video: Mutex<PermissionStatus>,
    audio: Mutex<PermissionStatus>,
    outcome_on_request: PermissionStatus,
}

impl StaticPermissions {
    pub fn new(video: PermissionStatus, audio: PermissionStatus) -> Self {
        Self {
            video: Mutex::new(video),
            audio: Mutex::new(audio),
            outcome_on_request: PermissionStatus::Granted,
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    /// Status every undetermined permission resolves to when requested.
    pub fn resolving_to(mut self, outcome: PermissionStatus) -> Self {
        self.outcome_on_request = outcome;
        self
    }

    fn slot(&self, media_type: MediaType) -> &Mutex<PermissionStatus> {
        match media_type {
            MediaType::Video => &self.video,
            MediaType::Audio => &self.audio,
        }
    }
}

impl Default for StaticPermissions {
    fn default() -> Self {
        Self::granted()
    }
}

impl PermissionsProvider for StaticPermissions {
    fn status(&self, media_type: MediaType) -> PermissionStatus {
        *self
            .slot(media_type)
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn request_access(&self, media_type: MediaType) -> PermissionStatus {
        let mut status = self
            .slot(media_type)
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *status == PermissionStatus::NotDetermined {
            *status = self.outcome_on_request;
        }
        *status
    }
}
