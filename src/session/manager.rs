//! Capture session lifecycle and attribute setters.
//!
//! [`CameraManager`] is the single writer of session state. Drive it from
//! several tasks through a [`super::CameraHandle`].

use super::attributes::{admits, AttributeStore, CameraSessionAttributes};
use super::config_lock::with_configuration;
use super::zoom::ZoomPhase;
use crate::config::LensCamConfig;
use crate::discovery::{DeviceDiscovery, DeviceMapping};
use crate::errors::{CameraError, Result};
use crate::permissions::{ensure_access, PermissionsProvider};
use crate::platform::{CaptureDevice, CaptureSession, DeviceCatalog, DeviceInput, SharedDevice};
use crate::types::{
    CameraPosition, ExposureMode, FlashMode, HdrMode, LightMode, MediaType, OutputType,
    SessionPreset,
};
use crate::zoom::{logical_from_physical, LensTopology, ZoomFactorSet, ZoomPolicy, ZoomProber};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Marks the session as changing until dropped.
struct Transition {
    flag: Arc<AtomicBool>,
}

impl Transition {
    fn begin(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self {
            flag: Arc::clone(flag),
        }
    }
}

impl Drop for Transition {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct CameraManager {
    pub(super) session: Arc<dyn CaptureSession>,
    pub(super) discovery: DeviceDiscovery,
    pub(super) permissions: Arc<dyn PermissionsProvider>,
    pub(super) config: LensCamConfig,
    pub(super) policy: ZoomPolicy,
    pub(super) prober: ZoomProber,
    pub(super) mapping: DeviceMapping,
    pub(super) audio_input: Option<DeviceInput>,
    pub(super) attributes: AttributeStore,
    pub(super) available_zoom_factors: ZoomFactorSet,
    pub(super) phase: ZoomPhase,
    pub(super) changing: Arc<AtomicBool>,
}

impl CameraManager {
    /// Builds a manager over injected platform collaborators. Nothing is touched until [`setup`](Self::setup).
    pub fn new(
        session: Arc<dyn CaptureSession>,
        catalog: Arc<dyn DeviceCatalog>,
        permissions: Arc<dyn PermissionsProvider>,
        config: LensCamConfig,
    ) -> Self {
        let policy = config.zoom.policy();
        Self {
            session,
            discovery: DeviceDiscovery::new(catalog),
            permissions,
            attributes: AttributeStore::new(CameraSessionAttributes::from_config(&config)),
            prober: ZoomProber::new(policy.clone()),
            policy,
            config,
            mapping: DeviceMapping::default(),
            audio_input: None,
            available_zoom_factors: ZoomFactorSet::default(),
            phase: ZoomPhase::Idle,
            changing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn attributes(&self) -> &CameraSessionAttributes {
        self.attributes.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<CameraSessionAttributes> {
        self.attributes.subscribe()
    }

    pub fn config(&self) -> &LensCamConfig {
        &self.config
    }

    pub fn discovery(&self) -> &DeviceDiscovery {
        &self.discovery
    }

    pub fn mapping(&self) -> &DeviceMapping {
        &self.mapping
    }

    /// Microphone input attached during setup, if audio is enabled and available.
    pub fn audio_input(&self) -> Option<&DeviceInput> {
        self.audio_input.as_ref()
    }

    /// True while a camera switch or session start is in flight.
    pub fn is_changing(&self) -> bool {
        self.changing.load(Ordering::SeqCst)
    }

    /// Marks the session busy or idle from outside, e.g. while the UI animates a transition.
    pub fn mark_transition(&self, changing: bool) {
        self.changing.store(changing, Ordering::SeqCst);
    }

    pub(crate) fn changing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.changing)
    }

    /// Device behind the session's attached video input.
    pub fn live_device(&self) -> Option<SharedDevice> {
        self.live_video_input()
            .and_then(|input| input.device().cloned())
    }

    pub(super) fn live_video_input(&self) -> Option<DeviceInput> {
        self.session
            .inputs()
            .into_iter()
            .find(|input| input.media_type() == MediaType::Video)
    }

    /// Checks permissions, attaches inputs and starts the session.
    pub async fn setup(&mut self) -> Result<()> {
        log::info!("Setting up camera session");
        ensure_access(self.permissions.as_ref(), MediaType::Video)?;
        if self.config.camera.audio_enabled {
            ensure_access(self.permissions.as_ref(), MediaType::Audio)?;
        }

        self.session.set_session_preset(self.attributes.get().resolution);

        let position = self.attributes.get().camera_position;
        let device = self.discovery.require(position)?;
        let input = self.discovery.make_input(&device)?;
        self.session.add_input(&input)?;
        self.mapping.bind(position, input);
        log::info!("Attached {} camera {}", position, device.unique_id());

        let audio_available = if self.config.camera.audio_enabled {
            self.attach_audio()?
        } else {
            false
        };
        self.attributes
            .update(|a| a.is_audio_source_available = audio_available);

        self.refresh_zoom_factors();
        self.start_session().await
    }

    fn attach_audio(&mut self) -> Result<bool> {
        match self.discovery.input(MediaType::Audio, CameraPosition::Back) {
            Some(input) => {
                self.session.add_input(&input)?;
                self.audio_input = Some(input);
                Ok(true)
            }
            None => {
                log::warn!("Audio requested but no microphone is available");
                Ok(false)
            }
        }
    }

    /// Starts the pipeline off the coordination task, then configures the device,
    /// forces the initial zoom and refreshes attributes, in that order.
    pub async fn start_session(&mut self) -> Result<()> {
        let device = self
            .live_device()
            .ok_or(CameraError::NoDeviceFound {
                position: self.attributes.get().camera_position,
            })?;
        let _transition = Transition::begin(&self.changing);

        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || session.start_running())
            .await
            .map_err(|e| CameraError::HardwareError(format!("Session start task failed: {}", e)))?;
        log::debug!("Capture session running");

        self.setup_device(device.as_ref())?;
        self.set_initial_zoom_level(device.as_ref());
        self.reset_attributes_from(device.as_ref(), true);
        Ok(())
    }

    fn setup_device(&self, device: &dyn CaptureDevice) -> Result<()> {
        let attributes = self.attributes.get();
        let exposure = attributes.exposure;
        let frame_rate = attributes.frame_rate;
        let light_mode = attributes.light_mode;
        let hdr_mode = attributes.hdr_mode;

        with_configuration(device, |d| {
            d.set_exposure(exposure.mode, exposure.duration, exposure.iso)?;
            d.set_exposure_target_bias(exposure.target_bias)?;
            d.set_frame_rate(frame_rate)?;
            if d.has_torch() {
                d.set_light_mode(light_mode)?;
            }
            d.set_hdr_mode(hdr_mode)
        })?;
        log::debug!("Configured {}", device.unique_id());
        Ok(())
    }

    /// Publishes the initial logical zoom before touching hardware so the UI
    /// never shows a stale value. A hardware failure keeps the logical value.
    fn set_initial_zoom_level(&mut self, device: &dyn CaptureDevice) {
        let logical = self.config.camera.initial_zoom;
        self.attributes.update(|a| a.zoom_factor = logical);

        match self.apply_zoom(device, logical) {
            Ok((applied, physical)) => {
                if applied != logical {
                    self.attributes.update(|a| a.zoom_factor = applied);
                }
                log::debug!("Initial zoom {}x (physical {})", applied, physical)
            }
            Err(e) => log::warn!("Failed to set initial zoom {}x: {}", logical, e),
        }
    }

    /// Re-reads device state into the attributes of the live device.
    pub fn reset_attributes(&mut self, preserve_zoom: bool) -> Result<()> {
        let device = self.live_device().ok_or(CameraError::NoDeviceFound {
            position: self.attributes.get().camera_position,
        })?;
        self.reset_attributes_from(device.as_ref(), preserve_zoom);
        Ok(())
    }

    fn reset_attributes_from(&mut self, device: &dyn CaptureDevice, preserve_zoom: bool) {
        let exposure = device.exposure();
        let frame_rate = device.frame_rate();
        let light_mode = if device.has_torch() {
            device.light_mode()
        } else {
            LightMode::Off
        };
        let hdr_mode = device.hdr_mode();
        let has_flash = device.has_flash();
        let zoom = if preserve_zoom {
            None
        } else {
            Some(self.logical_zoom_of(device))
        };

        self.attributes.update(|a| {
            a.exposure = exposure;
            a.frame_rate = frame_rate;
            a.light_mode = light_mode;
            a.hdr_mode = hdr_mode;
            if !has_flash {
                a.flash_mode = FlashMode::Off;
            }
            if let Some(zoom) = zoom {
                a.zoom_factor = zoom;
            }
        });
    }

    /// Logical zoom matching the device's live physical reading.
    fn logical_zoom_of(&self, device: &dyn CaptureDevice) -> f64 {
        let topology = LensTopology::of(device);
        let active_lens = if self.policy.prefer_active_lens_signal {
            device.as_virtual().and_then(|v| v.active_constituent())
        } else {
            None
        };
        logical_from_physical(device.video_zoom_factor(), &topology, active_lens)
    }

    /// Switches the session to the best camera at `position`.
    pub async fn set_camera_position(&mut self, position: CameraPosition) -> Result<()> {
        if !admits(
            self.is_changing(),
            &self.attributes.get().camera_position,
            &position,
        ) {
            log::trace!("Camera position change to {} ignored", position);
            return Ok(());
        }
        let _transition = Transition::begin(&self.changing);
        let previous = self.attributes.get().camera_position;
        log::info!("Switching camera {} -> {}", previous, position);

        let device = self.discovery.require(position)?;
        let input = self.discovery.make_input(&device)?;
        if let Some(current) = self.live_video_input() {
            self.session.remove_input(&current);
        }
        self.mapping.unbind(previous);
        self.session.add_input(&input)?;
        self.mapping.bind(position, input);

        self.attributes.update(|a| a.camera_position = position);
        self.reset_attributes_from(device.as_ref(), true);
        self.refresh_zoom_factors();

        let mut zoom = self.attributes.get().zoom_factor;
        if !self
            .available_zoom_factors
            .contains_approx(zoom, self.policy.tolerance)
        {
            log::debug!("{}x not offered by {}, falling back to 1x", zoom, device.unique_id());
            zoom = 1.0;
            self.attributes.update(|a| a.zoom_factor = zoom);
        }
        match self.apply_zoom(device.as_ref(), zoom) {
            Ok((applied, _)) if applied != zoom => {
                self.attributes.update(|a| a.zoom_factor = applied);
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Failed to carry {}x over to {}: {}", zoom, device.unique_id(), e)
            }
        }
        Ok(())
    }

    /// Stops the session and discards inputs and attribute state.
    pub fn cancel(&mut self) {
        log::info!("Cancelling camera session");
        self.session.stop_running();
        for input in self.session.inputs() {
            self.session.remove_input(&input);
        }
        self.mapping = DeviceMapping::default();
        self.audio_input = None;
        self.phase = ZoomPhase::Idle;
        self.changing.store(false, Ordering::SeqCst);
        let defaults = CameraSessionAttributes::from_config(&self.config);
        self.attributes.update(|a| *a = defaults);
        self.available_zoom_factors = ZoomFactorSet::default();
    }

    /// Writes to the live device under its configuration lock, then re-reads its state.
    fn configure_live_device<F>(&mut self, configure: F) -> Result<()>
    where
        F: FnOnce(&dyn CaptureDevice) -> Result<()>,
    {
        let device = self.live_device().ok_or(CameraError::NoDeviceFound {
            position: self.attributes.get().camera_position,
        })?;
        with_configuration(device.as_ref(), configure)?;
        self.reset_attributes_from(device.as_ref(), true);
        Ok(())
    }

    pub fn set_output_type(&mut self, output_type: OutputType) {
        if admits(self.is_changing(), &self.attributes.get().output_type, &output_type) {
            self.attributes.update(|a| a.output_type = output_type);
        }
    }

    pub fn set_flash_mode(&mut self, flash_mode: FlashMode) {
        let has_flash = self.has_flash();
        if has_flash && admits(self.is_changing(), &self.attributes.get().flash_mode, &flash_mode) {
            self.attributes.update(|a| a.flash_mode = flash_mode);
        } else if !has_flash {
            log::debug!("Flash mode {:?} ignored, device has no flash", flash_mode);
        }
    }

    pub fn set_light_mode(&mut self, light_mode: LightMode) -> Result<()> {
        if !self.has_light()
            || !admits(self.is_changing(), &self.attributes.get().light_mode, &light_mode)
        {
            return Ok(());
        }
        self.configure_live_device(|d| d.set_light_mode(light_mode))
    }

    pub fn set_mirror_output(&mut self, mirror_output: bool) {
        if admits(self.is_changing(), &self.attributes.get().mirror_output, &mirror_output) {
            self.attributes.update(|a| a.mirror_output = mirror_output);
        }
    }

    pub fn set_grid_visibility(&mut self, grid_visible: bool) {
        if admits(self.is_changing(), &self.attributes.get().grid_visible, &grid_visible) {
            self.attributes.update(|a| a.grid_visible = grid_visible);
        }
    }

    /// Color filter strength in percent, clamped to `0..=100`.
    pub fn set_filter_intensity(&mut self, intensity: f32) {
        let intensity = intensity.clamp(0.0, 100.0);
        if admits(self.is_changing(), &self.attributes.get().filter_intensity, &intensity) {
            self.attributes.update(|a| a.filter_intensity = intensity);
        }
    }

    pub fn set_exposure_mode(&mut self, mode: ExposureMode) -> Result<()> {
        let exposure = self.attributes.get().exposure;
        if !admits(self.is_changing(), &exposure.mode, &mode) {
            return Ok(());
        }
        self.configure_live_device(|d| d.set_exposure(mode, exposure.duration, exposure.iso))
    }

    /// Switches to custom exposure with the given shutter duration.
    pub fn set_exposure_duration(&mut self, duration: Duration) -> Result<()> {
        let exposure = self.attributes.get().exposure;
        if !admits(self.is_changing(), &exposure.duration, &duration) {
            return Ok(());
        }
        self.configure_live_device(|d| d.set_exposure(ExposureMode::Custom, duration, exposure.iso))
    }

    /// Switches to custom exposure with the given ISO.
    pub fn set_iso(&mut self, iso: f32) -> Result<()> {
        let exposure = self.attributes.get().exposure;
        if !admits(self.is_changing(), &exposure.iso, &iso) {
            return Ok(());
        }
        self.configure_live_device(|d| d.set_exposure(ExposureMode::Custom, exposure.duration, iso))
    }

    pub fn set_exposure_target_bias(&mut self, bias: f32) -> Result<()> {
        if !admits(self.is_changing(), &self.attributes.get().exposure.target_bias, &bias) {
            return Ok(());
        }
        self.configure_live_device(|d| d.set_exposure_target_bias(bias))
    }

    pub fn set_hdr_mode(&mut self, hdr_mode: HdrMode) -> Result<()> {
        if !admits(self.is_changing(), &self.attributes.get().hdr_mode, &hdr_mode) {
            return Ok(());
        }
        self.configure_live_device(|d| d.set_hdr_mode(hdr_mode))
    }

    pub fn set_resolution(&mut self, resolution: SessionPreset) {
        if admits(self.is_changing(), &self.attributes.get().resolution, &resolution) {
            self.session.set_session_preset(resolution);
            self.attributes.update(|a| a.resolution = resolution);
        }
    }

    pub fn set_frame_rate(&mut self, frame_rate: u32) -> Result<()> {
        if !admits(self.is_changing(), &self.attributes.get().frame_rate, &frame_rate) {
            return Ok(());
        }
        self.configure_live_device(|d| d.set_frame_rate(frame_rate))
    }

    pub fn has_flash(&self) -> bool {
        self.live_device().map(|d| d.has_flash()).unwrap_or(false)
    }

    pub fn has_light(&self) -> bool {
        self.live_device().map(|d| d.has_torch()).unwrap_or(false)
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }
}
