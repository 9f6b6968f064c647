//! Camera session: observable attributes, lifecycle, zoom reconciliation and
//! the coordination task that serializes them.

pub mod attributes;
pub mod config_lock;
pub mod handle;
pub mod manager;
pub mod zoom;

pub use attributes::{AttributeStore, CameraSessionAttributes};
pub use config_lock::{with_configuration, ConfigurationLock};
pub use handle::{CameraHandle, CameraTask};
pub use manager::CameraManager;
pub use zoom::{GuardRejection, ZoomOutcome, ZoomPhase};
