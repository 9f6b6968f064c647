//! Observable session state.

use crate::config::LensCamConfig;
use crate::types::{
    CameraPosition, ExposureSettings, FlashMode, HdrMode, LightMode, OutputType, SessionPreset,
};
use serde::Serialize;
use tokio::sync::watch;

/// Current camera configuration as the UI should render it.
///
/// `zoom_factor` is always logical.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraSessionAttributes {
    pub zoom_factor: f64,
    pub camera_position: CameraPosition,
    pub output_type: OutputType,
    pub exposure: ExposureSettings,
    pub resolution: SessionPreset,
    pub frame_rate: u32,
    pub flash_mode: FlashMode,
    pub light_mode: LightMode,
    pub hdr_mode: HdrMode,
    pub mirror_output: bool,
    pub grid_visible: bool,
    pub filter_intensity: f32,
    pub is_audio_source_available: bool,
}

impl Default for CameraSessionAttributes {
    fn default() -> Self {
        Self::from_config(&LensCamConfig::default())
    }
}

impl CameraSessionAttributes {
    pub fn from_config(config: &LensCamConfig) -> Self {
        Self {
            zoom_factor: config.camera.initial_zoom,
            camera_position: config.camera.default_position,
            output_type: OutputType::Photo,
            exposure: ExposureSettings::default(),
            resolution: config.camera.resolution,
            frame_rate: config.camera.frame_rate,
            flash_mode: FlashMode::Off,
            light_mode: LightMode::Off,
            hdr_mode: HdrMode::Off,
            mirror_output: config.camera.mirror_output,
            grid_visible: config.camera.grid_visible,
            filter_intensity: 100.0,
            is_audio_source_available: false,
        }
    }
}

/// Uniform setter guard: a write is admitted only when the session is idle
/// and the value actually changes.
pub fn admits<T: PartialEq>(is_changing: bool, current: &T, new: &T) -> bool {
    !is_changing && current != new
}

/// Owns the attribute record and publishes every committed change.
#[derive(Debug)]
pub struct AttributeStore {
    current: CameraSessionAttributes,
    tx: watch::Sender<CameraSessionAttributes>,
}

impl AttributeStore {
    pub fn new(initial: CameraSessionAttributes) -> Self {
        let (tx, _rx) = watch::channel(initial.clone());
        Self { current: initial, tx }
    }

    pub fn get(&self) -> &CameraSessionAttributes {
        &self.current
    }

    /// Applies `change` and publishes the result if anything differs.
    pub fn update<F>(&mut self, change: F)
    where
        F: FnOnce(&mut CameraSessionAttributes),
    {
        let before = self.current.clone();
        change(&mut self.current);
        if self.current != before {
            self.tx.send_replace(self.current.clone());
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CameraSessionAttributes> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard() {
        assert!(admits(false, &1.0, &2.0));
        assert!(!admits(false, &1.0, &1.0));
        assert!(!admits(true, &1.0, &2.0));
    }

    #[test]
    fn test_update_publishes_changes_only() {
        let mut store = AttributeStore::new(CameraSessionAttributes::default());
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.update(|a| a.grid_visible = true);
        assert!(!rx.has_changed().unwrap());

        store.update(|a| a.zoom_factor = 2.0);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().zoom_factor, 2.0);
        assert_eq!(store.get().zoom_factor, 2.0);
    }

    #[test]
    fn test_from_config() {
        let mut config = LensCamConfig::default();
        config.camera.default_position = CameraPosition::Front;
        config.camera.mirror_output = true;
        let attributes = CameraSessionAttributes::from_config(&config);
        assert_eq!(attributes.camera_position, CameraPosition::Front);
        assert!(attributes.mirror_output);
        assert_eq!(attributes.zoom_factor, 1.0);
    }
}
