//! Contracts for the platform capture stack.
//!
//! The session never talks to a concrete camera API. Devices, inputs, the
//! capture session and the device catalog are all reached through the traits
//! below, so a real backend and the in-memory [`simulated`] platform are
//! interchangeable.

pub mod simulated;

use crate::errors::Result;
use crate::types::{
    CameraPosition, ExposureMode, ExposureSettings, HdrMode, LensKind, LightMode, MediaType,
    SessionPreset,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub use simulated::{
    DeviceSpec, Journal, RigDescription, SimulatedCatalog, SimulatedDevice, SimulatedSession,
};

/// Shared handle to a capture device.
pub type SharedDevice = Arc<dyn CaptureDevice>;

/// One physical lens, or one fused virtual unit spanning several lenses.
///
/// Configuration writes (`set_*`) are only legal between
/// [`lock_for_configuration`](Self::lock_for_configuration) and
/// [`unlock_for_configuration`](Self::unlock_for_configuration). Use
/// [`crate::session::ConfigurationLock`] rather than pairing the calls by hand.
pub trait CaptureDevice: Send + Sync {
    fn unique_id(&self) -> &str;
    fn position(&self) -> CameraPosition;
    fn lens_kind(&self) -> LensKind;

    fn min_available_zoom_factor(&self) -> f64;
    fn max_available_zoom_factor(&self) -> f64;
    /// Live physical zoom as reported by the driver.
    fn video_zoom_factor(&self) -> f64;

    fn lock_for_configuration(&self) -> Result<()>;
    fn unlock_for_configuration(&self);

    fn set_zoom_factor(&self, factor: f64) -> Result<()>;

    fn exposure(&self) -> ExposureSettings;
    fn set_exposure(&self, mode: ExposureMode, duration: Duration, iso: f32) -> Result<()>;
    fn set_exposure_target_bias(&self, bias: f32) -> Result<()>;

    fn frame_rate(&self) -> u32;
    fn set_frame_rate(&self, frame_rate: u32) -> Result<()>;

    fn has_flash(&self) -> bool;
    fn has_torch(&self) -> bool;
    fn light_mode(&self) -> LightMode;
    fn set_light_mode(&self, mode: LightMode) -> Result<()>;

    fn hdr_mode(&self) -> HdrMode;
    fn set_hdr_mode(&self, mode: HdrMode) -> Result<()>;

    /// Fused devices expose their lens topology here; single lenses return `None`.
    fn as_virtual(&self) -> Option<&dyn SupportsVirtualZoom> {
        None
    }
}

/// Capability of a fused device that hands off between constituent lenses.
pub trait SupportsVirtualZoom {
    /// Ascending physical zoom thresholds at which the device switches lens.
    fn switch_over_zoom_factors(&self) -> Vec<f64>;

    /// Constituent lenses, widest first.
    fn constituent_devices(&self) -> Vec<ConstituentLens>;

    /// Lens currently feeding frames, when the driver reports it.
    fn active_constituent(&self) -> Option<LensKind> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConstituentLens {
    pub unique_id: String,
    pub kind: LensKind,
}

/// An input that can be attached to a capture session.
#[derive(Clone)]
pub struct DeviceInput {
    id: Uuid,
    media_type: MediaType,
    device_id: String,
    device: Option<SharedDevice>,
}

impl DeviceInput {
    pub fn video(device: SharedDevice) -> Self {
        Self {
            id: Uuid::new_v4(),
            media_type: MediaType::Video,
            device_id: device.unique_id().to_string(),
            device: Some(device),
        }
    }

    pub fn audio(device_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            media_type: MediaType::Audio,
            device_id: device_id.into(),
            device: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The camera behind a video input. Audio inputs have none.
    pub fn device(&self) -> Option<&SharedDevice> {
        self.device.as_ref()
    }
}

impl fmt::Debug for DeviceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceInput")
            .field("id", &self.id)
            .field("media_type", &self.media_type)
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// The capture pipeline the inputs feed.
pub trait CaptureSession: Send + Sync {
    fn add_input(&self, input: &DeviceInput) -> Result<()>;
    fn remove_input(&self, input: &DeviceInput);
    fn inputs(&self) -> Vec<DeviceInput>;

    fn session_preset(&self) -> SessionPreset;
    fn set_session_preset(&self, preset: SessionPreset);

    fn is_running(&self) -> bool;
    /// Blocks until the pipeline is running. Never call on the coordination task.
    fn start_running(&self);
    fn stop_running(&self);
}

/// The platform's device catalog.
pub trait DeviceCatalog: Send + Sync {
    /// Devices of one lens kind at a position, in enumeration order.
    fn devices(&self, kind: LensKind, position: CameraPosition) -> Vec<SharedDevice>;

    /// Builds a session input bound to `device`.
    fn make_input(&self, device: &SharedDevice) -> Result<DeviceInput>;

    /// Default microphone input, if the platform has one.
    fn audio_input(&self) -> Option<DeviceInput>;
}
