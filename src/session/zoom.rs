//! Zoom reconciliation.
//!
//! A zoom request passes through
//! `Idle -> Validating -> [DeviceMismatchDetected -> Switching -> Recovering] -> Applying -> Idle`.
//! The bracketed phases only run when the device discovery would pick for the
//! current position is not the one feeding the session. Whatever happens,
//! the controller ends in `Idle`.

use super::config_lock::with_configuration;
use super::manager::CameraManager;
use crate::errors::{CameraError, Result};
use crate::platform::{CaptureDevice, SharedDevice};
use crate::types::CameraPosition;
use crate::zoom::{physical_from_logical, scale_to_logical, LensTopology, ZoomFactorSet};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ZoomPhase {
    Idle,
    Validating,
    DeviceMismatchDetected,
    Switching,
    Recovering,
    Applying,
}

impl fmt::Display for ZoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZoomPhase::Idle => "idle",
            ZoomPhase::Validating => "validating",
            ZoomPhase::DeviceMismatchDetected => "device-mismatch",
            ZoomPhase::Switching => "switching",
            ZoomPhase::Recovering => "recovering",
            ZoomPhase::Applying => "applying",
        };
        f.write_str(name)
    }
}

/// Why a zoom request was dropped without touching anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GuardRejection {
    /// The session is mid-transition.
    Transitioning,
    /// The requested factor is already current.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ZoomOutcome {
    Applied {
        logical: f64,
        physical: f64,
        switched_device: bool,
    },
    Ignored(GuardRejection),
}

impl ZoomOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ZoomOutcome::Applied { .. })
    }
}

impl CameraManager {
    pub fn zoom_phase(&self) -> ZoomPhase {
        self.phase
    }

    fn enter(&mut self, phase: ZoomPhase) {
        if self.phase != phase {
            log::debug!("zoom: {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Requests a logical zoom factor.
    ///
    /// Guard rejections return `Ok(ZoomOutcome::Ignored(_))`. A fused-device
    /// request whose physical value falls outside the device range fails with
    /// [`CameraError::ZoomOutOfRange`] and changes nothing.
    pub fn set_zoom_factor(&mut self, logical: f64) -> Result<ZoomOutcome> {
        if self.is_changing() {
            log::trace!("zoom: {}x ignored, session is changing", logical);
            return Ok(ZoomOutcome::Ignored(GuardRejection::Transitioning));
        }
        if self.attributes.get().zoom_factor == logical {
            log::trace!("zoom: {}x ignored, already current", logical);
            return Ok(ZoomOutcome::Ignored(GuardRejection::Unchanged));
        }

        let outcome = self.reconcile_zoom(logical);
        self.enter(ZoomPhase::Idle);
        outcome
    }

    fn reconcile_zoom(&mut self, logical: f64) -> Result<ZoomOutcome> {
        self.enter(ZoomPhase::Validating);
        let position = self.attributes.get().camera_position;
        let expected = self.discovery.discover(position);
        let live = self.live_device();

        let (device, switched_device) = match (expected, live) {
            (Some(expected), Some(live)) if expected.unique_id() == live.unique_id() => {
                (live, false)
            }
            (Some(expected), live) => {
                self.enter(ZoomPhase::DeviceMismatchDetected);
                log::info!(
                    "zoom: session uses {} but {} is preferred for the {} camera",
                    live.as_ref().map(|d| d.unique_id()).unwrap_or("nothing"),
                    expected.unique_id(),
                    position
                );
                self.enter(ZoomPhase::Switching);
                self.switch_to_device(position, &expected)?;

                self.enter(ZoomPhase::Recovering);
                let recovered = self
                    .live_device()
                    .filter(|d| d.unique_id() == expected.unique_id())
                    .ok_or(CameraError::NoDeviceFound { position })?;
                (recovered, true)
            }
            (None, Some(live)) => {
                log::warn!(
                    "zoom: discovery found no {} camera, using live device {}",
                    position,
                    live.unique_id()
                );
                (live, false)
            }
            (None, None) => return Err(CameraError::NoDeviceFound { position }),
        };

        self.enter(ZoomPhase::Applying);
        let (logical, physical) = self.apply_zoom(device.as_ref(), logical)?;
        self.attributes.update(|a| a.zoom_factor = logical);
        if switched_device {
            self.refresh_zoom_factors();
        }

        Ok(ZoomOutcome::Applied {
            logical,
            physical,
            switched_device,
        })
    }

    /// Replaces the session's video input with one bound to `device`.
    ///
    /// On failure the previous input stays detached.
    fn switch_to_device(&mut self, position: CameraPosition, device: &SharedDevice) -> Result<()> {
        if let Some(current) = self.live_video_input() {
            self.session.remove_input(&current);
        }
        self.mapping.unbind(position);

        let input = self.discovery.make_input(device).map_err(|e| match e {
            CameraError::CannotSetupInput(_) => e,
            other => CameraError::CannotSetupInput(other.to_string()),
        })?;
        self.session.add_input(&input).map_err(|e| match e {
            CameraError::SessionAttachFailed(_) => e,
            other => CameraError::SessionAttachFailed(other.to_string()),
        })?;
        self.mapping.bind(position, input);
        log::info!("zoom: switched {} camera to {}", position, device.unique_id());
        Ok(())
    }

    /// Converts and writes a logical zoom to `device`.
    ///
    /// Returns the logical zoom now in effect and the physical value written.
    /// Fused devices reject out-of-range values; single lenses clamp, and the
    /// clamped value is the one in effect since physical and logical agree there.
    pub(super) fn apply_zoom(
        &self,
        device: &dyn CaptureDevice,
        logical: f64,
    ) -> Result<(f64, f64)> {
        let topology = LensTopology::of(device);
        let (min, max) = (topology.min_zoom, topology.max_zoom);

        let (applied, physical) = if topology.reference_factor().is_some() {
            let physical = physical_from_logical(logical, &topology);
            if !(physical.is_finite() && physical >= min && physical <= max) {
                log::warn!(
                    "zoom: {}x maps to physical {} outside [{}, {}] on {}",
                    logical,
                    physical,
                    min,
                    max,
                    device.unique_id()
                );
                return Err(CameraError::ZoomOutOfRange { physical, min, max });
            }
            (logical, physical)
        } else {
            if !(logical.is_finite() && logical > 0.0) {
                return Err(CameraError::ZoomOutOfRange {
                    physical: logical,
                    min,
                    max,
                });
            }
            let clamped = logical.clamp(min, max);
            (clamped, clamped)
        };

        with_configuration(device, |d| d.set_zoom_factor(physical))?;
        Ok((applied, physical))
    }

    /// Recomputes the zoom factor set for the current position and returns it.
    pub fn refresh_zoom_factors(&mut self) -> &ZoomFactorSet {
        let position = self.attributes.get().camera_position;
        let device = self.discovery.discover(position).or_else(|| self.live_device());
        self.available_zoom_factors = match device {
            Some(device) => self.prober.probe(&LensTopology::of(device.as_ref())),
            None => ZoomFactorSet::default(),
        };
        log::debug!(
            "zoom: available factors for {} camera: {:?}",
            position,
            self.available_zoom_factors.as_slice()
        );
        &self.available_zoom_factors
    }

    pub fn available_zoom_factors(&self) -> &ZoomFactorSet {
        &self.available_zoom_factors
    }

    pub fn supports_ultra_wide(&self) -> bool {
        self.available_zoom_factors.supports_ultra_wide()
    }

    pub fn supports_telephoto(&self) -> bool {
        self.available_zoom_factors.supports_telephoto()
    }

    /// Smallest logical zoom the live device can reach.
    pub fn min_zoom_factor(&self) -> f64 {
        self.live_device()
            .map(|d| {
                let topology = LensTopology::of(d.as_ref());
                scale_to_logical(topology.min_zoom, &topology)
            })
            .unwrap_or(1.0)
    }

    /// Largest logical zoom the live device can reach.
    pub fn max_zoom_factor(&self) -> f64 {
        self.live_device()
            .map(|d| {
                let topology = LensTopology::of(d.as_ref());
                scale_to_logical(topology.max_zoom, &topology)
            })
            .unwrap_or(1.0)
    }
}
