//! Value types shared by the platform contracts, the zoom core and the session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which side of the handset a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Front,
    #[default]
    Back,
}

impl CameraPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraPosition::Front => "front",
            CameraPosition::Back => "back",
        }
    }
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lens type of a device handle. The last three are fused virtual devices
/// spanning several physical lenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensKind {
    UltraWide,
    Wide,
    Telephoto,
    Dual,
    DualWide,
    Triple,
}

impl LensKind {
    /// Every lens type, in the order a full catalog enumeration walks them.
    pub const ALL: [LensKind; 6] = [
        LensKind::Wide,
        LensKind::UltraWide,
        LensKind::Telephoto,
        LensKind::Dual,
        LensKind::DualWide,
        LensKind::Triple,
    ];

    /// Selection order when choosing the device that drives a session:
    /// fused devices first, single wide lens last.
    pub const DISCOVERY_PREFERENCE: [LensKind; 4] = [
        LensKind::Triple,
        LensKind::DualWide,
        LensKind::Dual,
        LensKind::Wide,
    ];

    pub fn is_fused(&self) -> bool {
        matches!(self, LensKind::Dual | LensKind::DualWide | LensKind::Triple)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LensKind::UltraWide => "Ultra Wide",
            LensKind::Wide => "Wide",
            LensKind::Telephoto => "Telephoto",
            LensKind::Dual => "Dual",
            LensKind::DualWide => "Dual Wide",
            LensKind::Triple => "Triple",
        }
    }
}

impl fmt::Display for LensKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureMode {
    Locked,
    AutoExpose,
    #[default]
    ContinuousAutoExposure,
    Custom,
}

/// Exposure parameters as last read back from the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureSettings {
    pub mode: ExposureMode,
    pub duration: Duration,
    pub iso: f32,
    pub target_bias: f32,
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            mode: ExposureMode::default(),
            duration: Duration::ZERO,
            iso: 0.0,
            target_bias: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

/// Torch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightMode {
    #[default]
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HdrMode {
    #[default]
    Off,
    On,
    Auto,
}

/// Capture-session quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPreset {
    Photo,
    High,
    Medium,
    Low,
    Hd1280x720,
    #[default]
    Hd1920x1080,
    Hd4k3840x2160,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Photo,
    Video,
}
