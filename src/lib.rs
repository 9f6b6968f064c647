//! lenscam: multi-lens camera session control with logical zoom reconciliation
//!
//! Phones fuse several physical lenses (ultra-wide, wide, telephoto) into one
//! virtual capture device whose driver speaks in *physical* zoom factors. Users
//! think in *logical* stops where 1x is always the main wide lens. This crate
//! keeps the two in agreement across camera switches, session restarts and
//! device mismatches.
//!
//! # Features
//! - Zoom stop computation per device (`zoom::prober`)
//! - Logical/physical conversion with a reference-factor model (`zoom::converter`)
//! - Device discovery preferring fused multi-lens units (`discovery`)
//! - A zoom reconciliation state machine with device-mismatch recovery (`session::zoom`)
//! - A single-writer coordination task with observable attributes (`session::handle`)
//! - An in-memory platform for tests and the CLI (`platform::simulated`)
//!
//! # Usage
//! ```rust,ignore
//! use lenscam::platform::{Journal, RigDescription, SimulatedCatalog, SimulatedSession};
//! use lenscam::{CameraHandle, CameraManager, LensCamConfig, StaticPermissions};
//! use std::sync::Arc;
//!
//! let journal = Journal::new();
//! let catalog = SimulatedCatalog::from_rig(&RigDescription::triple_camera_phone(), &journal)?;
//! let manager = CameraManager::new(
//!     Arc::new(SimulatedSession::new(journal)),
//!     Arc::new(catalog),
//!     Arc::new(StaticPermissions::granted()),
//!     LensCamConfig::default(),
//! );
//! let (camera, _task) = CameraHandle::spawn(manager);
//! camera.setup().await?;
//! camera.set_zoom_factor_smooth(0.5);
//! ```
pub mod config;
pub mod discovery;
pub mod errors;
pub mod invariant_ppt;
pub mod permissions;
pub mod platform;
pub mod session;
pub mod types;
pub mod zoom;

// Re-exports for convenience
pub use config::LensCamConfig;
pub use discovery::{CameraDeviceInfo, DeviceDiscovery, DeviceMapping};
pub use errors::{CameraError, Result};
pub use permissions::{PermissionStatus, PermissionsProvider, StaticPermissions};
pub use session::{
    CameraHandle, CameraManager, CameraSessionAttributes, CameraTask, GuardRejection,
    ZoomOutcome, ZoomPhase,
};
pub use types::{CameraPosition, LensKind};
pub use zoom::{LensTopology, ZoomFactorSet, ZoomPolicy};

/// Initialize logging for the camera system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "lenscam=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        canonical_stops: zoom::CANONICAL_STOPS.to_vec(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub canonical_stops: Vec<f64>,
}
