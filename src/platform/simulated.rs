//! In-memory capture platform.
//!
//! Backs the CLI and every session test. Devices are described by
//! [`DeviceSpec`] (also the `[[device]]` table of a rig file), count their
//! configuration calls, and refuse writes outside a configuration lock the
//! same way real drivers do.

use super::{
    CaptureDevice, CaptureSession, ConstituentLens, DeviceCatalog, DeviceInput, SharedDevice,
    SupportsVirtualZoom,
};
use crate::errors::{CameraError, Result};
use crate::types::{
    CameraPosition, ExposureMode, ExposureSettings, HdrMode, LensKind, LightMode, SessionPreset,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered record of platform calls, shared between simulated components.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        guard(&self.entries).push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        guard(&self.entries).clone()
    }

    /// Index of the first entry starting with `prefix`.
    pub fn position_of(&self, prefix: &str) -> Option<usize> {
        guard(&self.entries)
            .iter()
            .position(|entry| entry.starts_with(prefix))
    }

    pub fn clear(&self) {
        guard(&self.entries).clear();
    }
}

/// Static description of a simulated device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub id: String,
    pub position: CameraPosition,
    pub kind: LensKind,
    pub min_zoom: f64,
    pub max_zoom: f64,
    #[serde(default)]
    pub switch_over: Vec<f64>,
    #[serde(default)]
    pub constituents: Vec<LensKind>,
    #[serde(default)]
    pub has_flash: bool,
    #[serde(default)]
    pub has_torch: bool,
    #[serde(default)]
    pub reports_active_lens: bool,
}

impl DeviceSpec {
    pub fn single(
        id: impl Into<String>,
        position: CameraPosition,
        kind: LensKind,
        min_zoom: f64,
        max_zoom: f64,
    ) -> Self {
        Self {
            id: id.into(),
            position,
            kind,
            min_zoom,
            max_zoom,
            switch_over: Vec::new(),
            constituents: Vec::new(),
            has_flash: false,
            has_torch: false,
            reports_active_lens: false,
        }
    }

    pub fn fused(
        id: impl Into<String>,
        position: CameraPosition,
        kind: LensKind,
        switch_over: &[f64],
        constituents: &[LensKind],
        min_zoom: f64,
        max_zoom: f64,
    ) -> Self {
        Self {
            switch_over: switch_over.to_vec(),
            constituents: constituents.to_vec(),
            ..Self::single(id, position, kind, min_zoom, max_zoom)
        }
    }

    pub fn with_flash(mut self) -> Self {
        self.has_flash = true;
        self
    }

    pub fn with_torch(mut self) -> Self {
        self.has_torch = true;
        self
    }

    pub fn reporting_active_lens(mut self) -> Self {
        self.reports_active_lens = true;
        self
    }

    /// A device is either single-lens (no constituents, no switch-over points)
    /// or properly fused (both present).
    pub fn validate(&self) -> Result<()> {
        if self.constituents.is_empty() != self.switch_over.is_empty() {
            return Err(CameraError::InvalidConfig(format!(
                "device {}: constituents and switch-over factors must both be empty or both be present",
                self.id
            )));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(CameraError::InvalidConfig(format!(
                "device {}: invalid zoom range [{}, {}]",
                self.id, self.min_zoom, self.max_zoom
            )));
        }
        if self.switch_over.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(CameraError::InvalidConfig(format!(
                "device {}: switch-over factors must be ascending",
                self.id
            )));
        }
        Ok(())
    }

    pub fn build(self) -> Result<Arc<SimulatedDevice>> {
        self.build_with(&Journal::new())
    }

    pub fn build_with(self, journal: &Journal) -> Result<Arc<SimulatedDevice>> {
        SimulatedDevice::new(self, journal.clone()).map(Arc::new)
    }
}

#[derive(Debug)]
struct DeviceState {
    zoom: f64,
    locked: bool,
    exposure: ExposureSettings,
    frame_rate: u32,
    light_mode: LightMode,
    hdr_mode: HdrMode,
}

/// A capture device living entirely in memory.
#[derive(Debug)]
pub struct SimulatedDevice {
    spec: DeviceSpec,
    state: Mutex<DeviceState>,
    journal: Journal,
    lock_count: AtomicUsize,
    unlock_count: AtomicUsize,
    zoom_writes: AtomicUsize,
    fail_next_lock: AtomicBool,
}

impl SimulatedDevice {
    pub fn new(spec: DeviceSpec, journal: Journal) -> Result<Self> {
        spec.validate()?;
        let zoom = 1.0_f64.max(spec.min_zoom).min(spec.max_zoom);
        Ok(Self {
            state: Mutex::new(DeviceState {
                zoom,
                locked: false,
                exposure: ExposureSettings {
                    mode: ExposureMode::ContinuousAutoExposure,
                    duration: Duration::from_micros(16_667),
                    iso: 100.0,
                    target_bias: 0.0,
                },
                frame_rate: 30,
                light_mode: LightMode::Off,
                hdr_mode: HdrMode::Off,
            }),
            spec,
            journal,
            lock_count: AtomicUsize::new(0),
            unlock_count: AtomicUsize::new(0),
            zoom_writes: AtomicUsize::new(0),
            fail_next_lock: AtomicBool::new(false),
        })
    }

    pub fn spec(&self) -> &DeviceSpec {
        &self.spec
    }

    pub fn lock_count(&self) -> usize {
        self.lock_count.load(Ordering::SeqCst)
    }

    pub fn unlock_count(&self) -> usize {
        self.unlock_count.load(Ordering::SeqCst)
    }

    pub fn zoom_writes(&self) -> usize {
        self.zoom_writes.load(Ordering::SeqCst)
    }

    pub fn is_locked(&self) -> bool {
        guard(&self.state).locked
    }

    /// Makes the next `lock_for_configuration` fail, as when another client holds the device.
    pub fn fail_next_lock(&self) {
        self.fail_next_lock.store(true, Ordering::SeqCst);
    }

    /// Overrides the live zoom reading without going through a configuration lock.
    pub fn force_zoom_reading(&self, zoom: f64) {
        guard(&self.state).zoom = zoom;
    }

    fn ensure_locked(&self, operation: &str) -> Result<MutexGuard<'_, DeviceState>> {
        let state = guard(&self.state);
        if !state.locked {
            return Err(CameraError::ConfigurationLocked(format!(
                "{} on {} without holding the configuration lock",
                operation, self.spec.id
            )));
        }
        Ok(state)
    }
}

impl CaptureDevice for SimulatedDevice {
    fn unique_id(&self) -> &str {
        &self.spec.id
    }

    fn position(&self) -> CameraPosition {
        self.spec.position
    }

    fn lens_kind(&self) -> LensKind {
        self.spec.kind
    }

    fn min_available_zoom_factor(&self) -> f64 {
        self.spec.min_zoom
    }

    fn max_available_zoom_factor(&self) -> f64 {
        self.spec.max_zoom
    }

    fn video_zoom_factor(&self) -> f64 {
        guard(&self.state).zoom
    }

    fn lock_for_configuration(&self) -> Result<()> {
        if self.fail_next_lock.swap(false, Ordering::SeqCst) {
            return Err(CameraError::ConfigurationLocked(format!(
                "{} is in use by another client",
                self.spec.id
            )));
        }
        let mut state = guard(&self.state);
        if state.locked {
            return Err(CameraError::ConfigurationLocked(format!(
                "{} is already locked for configuration",
                self.spec.id
            )));
        }
        state.locked = true;
        self.lock_count.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("device.lock {}", self.spec.id));
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        guard(&self.state).locked = false;
        self.unlock_count.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("device.unlock {}", self.spec.id));
    }

    fn set_zoom_factor(&self, factor: f64) -> Result<()> {
        let mut state = self.ensure_locked("set_zoom_factor")?;
        if factor < self.spec.min_zoom || factor > self.spec.max_zoom {
            return Err(CameraError::HardwareError(format!(
                "zoom {} outside [{}, {}] on {}",
                factor, self.spec.min_zoom, self.spec.max_zoom, self.spec.id
            )));
        }
        state.zoom = factor;
        self.zoom_writes.fetch_add(1, Ordering::SeqCst);
        self.journal
            .record(format!("device.zoom {} {}", self.spec.id, factor));
        Ok(())
    }

    fn exposure(&self) -> ExposureSettings {
        guard(&self.state).exposure
    }

    fn set_exposure(&self, mode: ExposureMode, duration: Duration, iso: f32) -> Result<()> {
        let mut state = self.ensure_locked("set_exposure")?;
        state.exposure.mode = mode;
        if mode == ExposureMode::Custom {
            state.exposure.duration = duration;
            state.exposure.iso = iso;
        }
        self.journal
            .record(format!("device.exposure {} {:?}", self.spec.id, mode));
        Ok(())
    }

    fn set_exposure_target_bias(&self, bias: f32) -> Result<()> {
        let mut state = self.ensure_locked("set_exposure_target_bias")?;
        state.exposure.target_bias = bias.clamp(-8.0, 8.0);
        Ok(())
    }

    fn frame_rate(&self) -> u32 {
        guard(&self.state).frame_rate
    }

    fn set_frame_rate(&self, frame_rate: u32) -> Result<()> {
        let mut state = self.ensure_locked("set_frame_rate")?;
        state.frame_rate = frame_rate.clamp(1, 240);
        Ok(())
    }

    fn has_flash(&self) -> bool {
        self.spec.has_flash
    }

    fn has_torch(&self) -> bool {
        self.spec.has_torch
    }

    fn light_mode(&self) -> LightMode {
        guard(&self.state).light_mode
    }

    fn set_light_mode(&self, mode: LightMode) -> Result<()> {
        let mut state = self.ensure_locked("set_light_mode")?;
        if self.spec.has_torch {
            state.light_mode = mode;
        }
        Ok(())
    }

    fn hdr_mode(&self) -> HdrMode {
        guard(&self.state).hdr_mode
    }

    fn set_hdr_mode(&self, mode: HdrMode) -> Result<()> {
        let mut state = self.ensure_locked("set_hdr_mode")?;
        state.hdr_mode = mode;
        Ok(())
    }

    fn as_virtual(&self) -> Option<&dyn SupportsVirtualZoom> {
        if self.spec.switch_over.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl SupportsVirtualZoom for SimulatedDevice {
    fn switch_over_zoom_factors(&self) -> Vec<f64> {
        self.spec.switch_over.clone()
    }

    fn constituent_devices(&self) -> Vec<ConstituentLens> {
        self.spec
            .constituents
            .iter()
            .enumerate()
            .map(|(index, kind)| ConstituentLens {
                unique_id: format!("{}:{}", self.spec.id, index),
                kind: *kind,
            })
            .collect()
    }

    fn active_constituent(&self) -> Option<LensKind> {
        if !self.spec.reports_active_lens {
            return None;
        }
        let zoom = guard(&self.state).zoom;
        let index = self
            .spec
            .switch_over
            .iter()
            .filter(|threshold| zoom >= **threshold)
            .count();
        self.spec.constituents.get(index).copied()
    }
}

/// A capture session that only tracks which inputs are attached.
#[derive(Debug)]
pub struct SimulatedSession {
    inputs: Mutex<Vec<DeviceInput>>,
    preset: Mutex<SessionPreset>,
    running: AtomicBool,
    start_delay: Duration,
    journal: Journal,
    adds: AtomicUsize,
    removes: AtomicUsize,
    fail_next_add: AtomicBool,
}

impl Default for SimulatedSession {
    fn default() -> Self {
        Self::new(Journal::new())
    }
}

impl SimulatedSession {
    pub fn new(journal: Journal) -> Self {
        Self {
            inputs: Mutex::new(Vec::new()),
            preset: Mutex::new(SessionPreset::default()),
            running: AtomicBool::new(false),
            start_delay: Duration::ZERO,
            journal,
            adds: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            fail_next_add: AtomicBool::new(false),
        }
    }

    /// Makes `start_running` block for `delay`, like a real pipeline warming up.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn add_count(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn fail_next_add(&self) {
        self.fail_next_add.store(true, Ordering::SeqCst);
    }

    /// Ids of the devices behind the currently attached video inputs.
    pub fn video_device_ids(&self) -> Vec<String> {
        guard(&self.inputs)
            .iter()
            .filter(|input| input.device().is_some())
            .map(|input| input.device_id().to_string())
            .collect()
    }
}

impl CaptureSession for SimulatedSession {
    fn add_input(&self, input: &DeviceInput) -> Result<()> {
        if self.fail_next_add.swap(false, Ordering::SeqCst) {
            return Err(CameraError::SessionAttachFailed(format!(
                "session refused input {}",
                input.device_id()
            )));
        }
        let mut inputs = guard(&self.inputs);
        if inputs.iter().any(|existing| existing.id() == input.id()) {
            return Err(CameraError::SessionAttachFailed(format!(
                "input {} is already attached",
                input.device_id()
            )));
        }
        inputs.push(input.clone());
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.journal
            .record(format!("session.add {}", input.device_id()));
        Ok(())
    }

    fn remove_input(&self, input: &DeviceInput) {
        let mut inputs = guard(&self.inputs);
        let before = inputs.len();
        inputs.retain(|existing| existing.id() != input.id());
        if inputs.len() != before {
            self.removes.fetch_add(1, Ordering::SeqCst);
            self.journal
                .record(format!("session.remove {}", input.device_id()));
        }
    }

    fn inputs(&self) -> Vec<DeviceInput> {
        guard(&self.inputs).clone()
    }

    fn session_preset(&self) -> SessionPreset {
        *guard(&self.preset)
    }

    fn set_session_preset(&self, preset: SessionPreset) {
        *guard(&self.preset) = preset;
        self.journal.record(format!("session.preset {:?}", preset));
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn start_running(&self) {
        if !self.start_delay.is_zero() {
            std::thread::sleep(self.start_delay);
        }
        self.running.store(true, Ordering::SeqCst);
        self.journal.record("session.start_running");
    }

    fn stop_running(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.journal.record("session.stop_running");
    }
}

/// Description of a whole simulated handset, loadable from TOML.
///
/// ```toml
/// microphone = true
///
/// [[device]]
/// id = "back-triple"
/// position = "back"
/// kind = "triple"
/// min_zoom = 1.0
/// max_zoom = 15.0
/// switch_over = [2.0, 6.0]
/// constituents = ["ultra_wide", "wide", "telephoto"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RigDescription {
    #[serde(default)]
    pub microphone: bool,
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceSpec>,
}

impl RigDescription {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            CameraError::InvalidConfig(format!("Failed to read rig file {:?}: {}", path, e))
        })?;
        let rig: RigDescription = toml::from_str(&contents).map_err(|e| {
            CameraError::InvalidConfig(format!("Failed to parse rig file {:?}: {}", path, e))
        })?;
        log::info!("Loaded rig with {} devices from {:?}", rig.devices.len(), path);
        Ok(rig)
    }

    /// Triple-camera back unit, wide front camera, microphone.
    pub fn triple_camera_phone() -> Self {
        Self {
            microphone: true,
            devices: vec![
                DeviceSpec::fused(
                    "back-triple",
                    CameraPosition::Back,
                    LensKind::Triple,
                    &[2.0, 6.0],
                    &[LensKind::UltraWide, LensKind::Wide, LensKind::Telephoto],
                    1.0,
                    15.0,
                )
                .with_flash()
                .with_torch(),
                DeviceSpec::single("back-wide", CameraPosition::Back, LensKind::Wide, 1.0, 10.0)
                    .with_flash()
                    .with_torch(),
                DeviceSpec::single(
                    "back-ultra-wide",
                    CameraPosition::Back,
                    LensKind::UltraWide,
                    1.0,
                    4.0,
                ),
                DeviceSpec::single("front-wide", CameraPosition::Front, LensKind::Wide, 1.0, 3.0),
            ],
        }
    }
}

/// A device catalog over a mutable list of simulated devices.
#[derive(Debug, Default)]
pub struct SimulatedCatalog {
    devices: Mutex<Vec<Arc<SimulatedDevice>>>,
    microphone: AtomicBool,
    failing_inputs: Mutex<HashSet<String>>,
}

impl SimulatedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rig(rig: &RigDescription, journal: &Journal) -> Result<Self> {
        let catalog = Self::new();
        for spec in &rig.devices {
            catalog.push(spec.clone().build_with(journal)?);
        }
        catalog.microphone.store(rig.microphone, Ordering::SeqCst);
        Ok(catalog)
    }

    pub fn with_microphone(self) -> Self {
        self.microphone.store(true, Ordering::SeqCst);
        self
    }

    /// Appends a device to the enumeration, as when hardware is attached.
    pub fn push(&self, device: Arc<SimulatedDevice>) {
        log::debug!("Simulated catalog: added {}", device.unique_id());
        guard(&self.devices).push(device);
    }

    pub fn remove(&self, unique_id: &str) -> Option<Arc<SimulatedDevice>> {
        let mut devices = guard(&self.devices);
        let index = devices.iter().position(|d| d.unique_id() == unique_id)?;
        Some(devices.remove(index))
    }

    pub fn device(&self, unique_id: &str) -> Option<Arc<SimulatedDevice>> {
        guard(&self.devices)
            .iter()
            .find(|d| d.unique_id() == unique_id)
            .cloned()
    }

    /// Makes input construction fail for one device.
    pub fn fail_inputs_for(&self, unique_id: &str) {
        guard(&self.failing_inputs).insert(unique_id.to_string());
    }
}

impl DeviceCatalog for SimulatedCatalog {
    fn devices(&self, kind: LensKind, position: CameraPosition) -> Vec<SharedDevice> {
        guard(&self.devices)
            .iter()
            .filter(|d| d.lens_kind() == kind && d.position() == position)
            .map(|d| Arc::clone(d) as SharedDevice)
            .collect()
    }

    fn make_input(&self, device: &SharedDevice) -> Result<DeviceInput> {
        if guard(&self.failing_inputs).contains(device.unique_id()) {
            return Err(CameraError::CannotSetupInput(format!(
                "device {} refused input construction",
                device.unique_id()
            )));
        }
        Ok(DeviceInput::video(Arc::clone(device)))
    }

    fn audio_input(&self) -> Option<DeviceInput> {
        if self.microphone.load(Ordering::SeqCst) {
            Some(DeviceInput::audio("microphone"))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_rejects_half_fused_device() {
        let mut spec = DeviceSpec::single("x", CameraPosition::Back, LensKind::Triple, 1.0, 10.0);
        spec.switch_over = vec![2.0];
        assert!(spec.build().is_err());

        let spec = DeviceSpec::fused(
            "y",
            CameraPosition::Back,
            LensKind::Dual,
            &[],
            &[LensKind::Wide, LensKind::Telephoto],
            1.0,
            10.0,
        );
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_writes_require_configuration_lock() {
        let device = DeviceSpec::single("w", CameraPosition::Back, LensKind::Wide, 1.0, 5.0)
            .build()
            .unwrap();
        assert!(matches!(
            device.set_zoom_factor(2.0),
            Err(CameraError::ConfigurationLocked(_))
        ));

        device.lock_for_configuration().unwrap();
        device.set_zoom_factor(2.0).unwrap();
        device.unlock_for_configuration();

        assert_eq!(device.video_zoom_factor(), 2.0);
        assert_eq!(device.zoom_writes(), 1);
        assert_eq!(device.lock_count(), device.unlock_count());
    }

    #[test]
    fn test_active_constituent_follows_switch_over() {
        let device = DeviceSpec::fused(
            "t",
            CameraPosition::Back,
            LensKind::Triple,
            &[2.0, 6.0],
            &[LensKind::UltraWide, LensKind::Wide, LensKind::Telephoto],
            1.0,
            15.0,
        )
        .reporting_active_lens()
        .build()
        .unwrap();

        let virtual_zoom = device.as_virtual().unwrap();
        assert_eq!(virtual_zoom.active_constituent(), Some(LensKind::UltraWide));
        device.force_zoom_reading(2.0);
        assert_eq!(virtual_zoom.active_constituent(), Some(LensKind::Wide));
        device.force_zoom_reading(7.5);
        assert_eq!(virtual_zoom.active_constituent(), Some(LensKind::Telephoto));
    }

    #[test]
    fn test_catalog_filters_by_kind_and_position() {
        let journal = Journal::new();
        let catalog =
            SimulatedCatalog::from_rig(&RigDescription::triple_camera_phone(), &journal).unwrap();

        let triples = catalog.devices(LensKind::Triple, CameraPosition::Back);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].unique_id(), "back-triple");
        assert!(catalog
            .devices(LensKind::Triple, CameraPosition::Front)
            .is_empty());
        assert!(catalog.audio_input().is_some());
    }

    #[test]
    fn test_rig_toml_parses() {
        let rig: RigDescription = toml::from_str(
            r#"
            [[device]]
            id = "back-dual"
            position = "back"
            kind = "dual"
            min_zoom = 1.0
            max_zoom = 10.0
            switch_over = [2.0]
            constituents = ["wide", "telephoto"]
            "#,
        )
        .unwrap();
        assert!(!rig.microphone);
        assert_eq!(rig.devices.len(), 1);
        assert_eq!(rig.devices[0].constituents, vec![LensKind::Wide, LensKind::Telephoto]);
    }

    #[test]
    fn test_session_tracks_inputs() {
        let journal = Journal::new();
        let session = SimulatedSession::new(journal.clone());
        let device: SharedDevice =
            DeviceSpec::single("w", CameraPosition::Back, LensKind::Wide, 1.0, 5.0)
                .build()
                .unwrap();
        let input = DeviceInput::video(device);

        session.add_input(&input).unwrap();
        assert!(session.add_input(&input).is_err());
        assert_eq!(session.video_device_ids(), vec!["w".to_string()]);

        session.remove_input(&input);
        assert!(session.inputs().is_empty());
        assert_eq!(session.remove_count(), 1);
        assert_eq!(journal.position_of("session.add"), Some(0));
    }
}
