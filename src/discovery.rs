//! Device discovery and selection.
//!
//! Discovery walks the platform catalog in a fixed preference order (fused
//! multi-lens units first, single wide lens last) and takes the first match.
//! There is no scoring: ties go to catalog enumeration order, so repeated
//! calls against unchanged hardware pick the same device.

use crate::errors::{CameraError, Result};
use crate::platform::{DeviceCatalog, DeviceInput, SharedDevice};
use crate::types::{CameraPosition, LensKind, MediaType};
use crate::zoom::{LensTopology, ZoomFactorSet, ZoomPolicy, ZoomProber};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Catalog entry as presented to a camera picker.
#[derive(Debug, Clone, Serialize)]
pub struct CameraDeviceInfo {
    pub id: String,
    pub display_name: String,
    pub position: CameraPosition,
    pub kind: LensKind,
    pub zoom_factors: ZoomFactorSet,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

pub fn display_name(position: CameraPosition, kind: LensKind) -> String {
    let side = match position {
        CameraPosition::Back => "Back",
        CameraPosition::Front => "Front",
    };
    format!("{} {}", side, kind.display_name())
}

/// Selects devices from an injected catalog.
#[derive(Clone)]
pub struct DeviceDiscovery {
    catalog: Arc<dyn DeviceCatalog>,
}

impl DeviceDiscovery {
    pub fn new(catalog: Arc<dyn DeviceCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn DeviceCatalog> {
        &self.catalog
    }

    /// Best device for `position`, or `None` when the position has no camera.
    pub fn discover(&self, position: CameraPosition) -> Option<SharedDevice> {
        LensKind::DISCOVERY_PREFERENCE.iter().find_map(|kind| {
            self.catalog
                .devices(*kind, position)
                .into_iter()
                .next()
        })
    }

    /// Like [`discover`](Self::discover), but a missing device is a setup error.
    pub fn require(&self, position: CameraPosition) -> Result<SharedDevice> {
        self.discover(position)
            .ok_or(CameraError::NoDeviceFound { position })
    }

    pub fn make_input(&self, device: &SharedDevice) -> Result<DeviceInput> {
        self.catalog.make_input(device)
    }

    /// Session input for a media type. Video inputs are bound to the discovered device.
    pub fn input(&self, media_type: MediaType, position: CameraPosition) -> Option<DeviceInput> {
        match media_type {
            MediaType::Audio => self.catalog.audio_input(),
            MediaType::Video => {
                let device = self.discover(position)?;
                match self.catalog.make_input(&device) {
                    Ok(input) => Some(input),
                    Err(e) => {
                        log::warn!(
                            "Failed to build input for {} camera {}: {}",
                            position,
                            device.unique_id(),
                            e
                        );
                        None
                    }
                }
            }
        }
    }

    /// Looks a device up by identifier across every lens kind and position.
    pub fn find(&self, unique_id: &str) -> Option<SharedDevice> {
        [CameraPosition::Back, CameraPosition::Front]
            .into_iter()
            .flat_map(|position| {
                LensKind::ALL
                    .into_iter()
                    .flat_map(move |kind| self.catalog.devices(kind, position))
            })
            .find(|device| device.unique_id() == unique_id)
    }

    /// Every device of every lens kind, optionally restricted to one position.
    pub fn list_cameras(
        &self,
        position: Option<CameraPosition>,
        policy: &ZoomPolicy,
    ) -> Vec<CameraDeviceInfo> {
        let positions: Vec<CameraPosition> = match position {
            Some(position) => vec![position],
            None => vec![CameraPosition::Back, CameraPosition::Front],
        };
        let prober = ZoomProber::new(policy.clone());

        let mut cameras = Vec::new();
        for position in positions {
            for kind in LensKind::ALL {
                for device in self.catalog.devices(kind, position) {
                    let topology = LensTopology::of(device.as_ref());
                    cameras.push(CameraDeviceInfo {
                        id: device.unique_id().to_string(),
                        display_name: display_name(position, kind),
                        position,
                        kind,
                        zoom_factors: prober.probe(&topology),
                        min_zoom: topology.min_zoom,
                        max_zoom: topology.max_zoom,
                    });
                }
            }
        }
        log::debug!("Listed {} cameras", cameras.len());
        cameras
    }
}

#[derive(Debug, Clone)]
struct Binding {
    input: DeviceInput,
    bound_at: DateTime<Utc>,
}

/// Which input currently feeds the session for each camera position.
#[derive(Debug, Clone, Default)]
pub struct DeviceMapping {
    front: Option<Binding>,
    back: Option<Binding>,
}

impl DeviceMapping {
    fn slot(&mut self, position: CameraPosition) -> &mut Option<Binding> {
        match position {
            CameraPosition::Front => &mut self.front,
            CameraPosition::Back => &mut self.back,
        }
    }

    fn get(&self, position: CameraPosition) -> Option<&Binding> {
        match position {
            CameraPosition::Front => self.front.as_ref(),
            CameraPosition::Back => self.back.as_ref(),
        }
    }

    /// Binds `input` to `position`, returning the input it replaces.
    pub fn bind(&mut self, position: CameraPosition, input: DeviceInput) -> Option<DeviceInput> {
        log::debug!("Mapping {} camera to {}", position, input.device_id());
        self.slot(position)
            .replace(Binding {
                input,
                bound_at: Utc::now(),
            })
            .map(|previous| previous.input)
    }

    pub fn unbind(&mut self, position: CameraPosition) -> Option<DeviceInput> {
        self.slot(position).take().map(|binding| binding.input)
    }

    pub fn input(&self, position: CameraPosition) -> Option<&DeviceInput> {
        self.get(position).map(|binding| &binding.input)
    }

    pub fn device(&self, position: CameraPosition) -> Option<&SharedDevice> {
        self.input(position).and_then(DeviceInput::device)
    }

    pub fn bound_at(&self, position: CameraPosition) -> Option<DateTime<Utc>> {
        self.get(position).map(|binding| binding.bound_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{DeviceSpec, Journal, RigDescription, SimulatedCatalog};

    fn phone() -> Arc<SimulatedCatalog> {
        Arc::new(
            SimulatedCatalog::from_rig(&RigDescription::triple_camera_phone(), &Journal::new())
                .unwrap(),
        )
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(CameraPosition::Back, LensKind::Triple), "Back Triple");
        assert_eq!(display_name(CameraPosition::Front, LensKind::UltraWide), "Front Ultra Wide");
    }

    #[test]
    fn test_prefers_fused_devices() {
        let discovery = DeviceDiscovery::new(phone());
        let back = discovery.discover(CameraPosition::Back).unwrap();
        assert_eq!(back.unique_id(), "back-triple");
        let front = discovery.discover(CameraPosition::Front).unwrap();
        assert_eq!(front.unique_id(), "front-wide");
    }

    #[test]
    fn test_ties_follow_enumeration_order() {
        let catalog = Arc::new(SimulatedCatalog::new());
        for id in ["wide-a", "wide-b"] {
            catalog.push(
                DeviceSpec::single(id, CameraPosition::Back, LensKind::Wide, 1.0, 5.0)
                    .build()
                    .unwrap(),
            );
        }
        let discovery = DeviceDiscovery::new(catalog);
        for _ in 0..3 {
            assert_eq!(discovery.discover(CameraPosition::Back).unwrap().unique_id(), "wide-a");
        }
    }

    #[test]
    fn test_missing_position_is_setup_error() {
        let discovery = DeviceDiscovery::new(Arc::new(SimulatedCatalog::new()));
        let err = discovery.require(CameraPosition::Front).err().unwrap();
        assert!(err.is_setup_error());
        assert!(discovery.input(MediaType::Video, CameraPosition::Front).is_none());
        assert!(discovery.input(MediaType::Audio, CameraPosition::Front).is_none());
    }

    #[test]
    fn test_ultra_wide_only_is_not_selected() {
        let catalog = Arc::new(SimulatedCatalog::new());
        catalog.push(
            DeviceSpec::single("uw", CameraPosition::Back, LensKind::UltraWide, 1.0, 2.0)
                .build()
                .unwrap(),
        );
        let discovery = DeviceDiscovery::new(catalog);
        assert!(discovery.discover(CameraPosition::Back).is_none());
        assert!(discovery.find("uw").is_some());
    }

    #[test]
    fn test_mapping_replaces_binding() {
        let catalog = phone();
        let discovery = DeviceDiscovery::new(catalog);
        let first = discovery.input(MediaType::Video, CameraPosition::Back).unwrap();
        let second = discovery.input(MediaType::Video, CameraPosition::Back).unwrap();

        let mut mapping = DeviceMapping::default();
        assert!(mapping.bind(CameraPosition::Back, first.clone()).is_none());
        let replaced = mapping.bind(CameraPosition::Back, second.clone()).unwrap();
        assert_eq!(replaced.id(), first.id());
        assert_eq!(mapping.input(CameraPosition::Back).unwrap().id(), second.id());
        assert!(mapping.bound_at(CameraPosition::Back).is_some());
        assert!(mapping.input(CameraPosition::Front).is_none());
        assert_eq!(
            mapping.device(CameraPosition::Back).unwrap().unique_id(),
            "back-triple"
        );
    }
}
