//! Coordination task for a [`CameraManager`].
//!
//! The manager lives on one tokio task and every mutation reaches it over a
//! channel, so requests from several callers are applied one at a time.
//! Zoom and position requests that arrive while the session is changing are
//! dropped at the handle instead of being queued behind the transition.

use super::attributes::CameraSessionAttributes;
use super::manager::CameraManager;
use super::zoom::{GuardRejection, ZoomOutcome};
use crate::errors::{CameraError, Result};
use crate::types::CameraPosition;
use crate::zoom::ZoomFactorSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 32;

enum Command {
    Setup(oneshot::Sender<Result<()>>),
    SetZoom {
        logical: f64,
        reply: Option<oneshot::Sender<Result<ZoomOutcome>>>,
    },
    SetPosition {
        position: CameraPosition,
        reply: oneshot::Sender<Result<()>>,
    },
    AvailableZoomFactors(oneshot::Sender<ZoomFactorSet>),
    Cancel(oneshot::Sender<()>),
}

/// Cloneable front end to a manager running on its own task.
#[derive(Clone)]
pub struct CameraHandle {
    tx: mpsc::Sender<Command>,
    attributes: watch::Receiver<CameraSessionAttributes>,
    changing: Arc<AtomicBool>,
}

/// Owns the coordination task; yields the manager back on shutdown.
pub struct CameraTask {
    task: JoinHandle<CameraManager>,
}

impl CameraHandle {
    /// Moves `manager` onto a new task. Must be called inside a tokio runtime.
    pub fn spawn(manager: CameraManager) -> (Self, CameraTask) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = Self {
            tx,
            attributes: manager.subscribe(),
            changing: manager.changing_flag(),
        };
        let task = tokio::spawn(run(manager, rx));
        (handle, CameraTask { task })
    }

    /// Latest published attributes; `changed().await` on the receiver to follow updates.
    pub fn attributes(&self) -> watch::Receiver<CameraSessionAttributes> {
        self.attributes.clone()
    }

    pub fn is_changing(&self) -> bool {
        self.changing.load(Ordering::SeqCst)
    }

    /// Marks the session busy or idle, e.g. while the UI animates a camera flip.
    pub fn mark_transition(&self, changing: bool) {
        self.changing.store(changing, Ordering::SeqCst);
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| CameraError::SessionClosed)?;
        response.await.map_err(|_| CameraError::SessionClosed)
    }

    pub async fn setup(&self) -> Result<()> {
        self.request(Command::Setup).await?
    }

    /// Requests a logical zoom and waits for the outcome.
    ///
    /// Returns `Ignored(Transitioning)` without touching the task while the session is changing.
    pub async fn set_zoom_factor(&self, logical: f64) -> Result<ZoomOutcome> {
        if self.is_changing() {
            log::trace!("zoom: {}x dropped, session is changing", logical);
            return Ok(ZoomOutcome::Ignored(GuardRejection::Transitioning));
        }
        self.request(|reply| Command::SetZoom {
            logical,
            reply: Some(reply),
        })
        .await?
    }

    /// Fire-and-forget zoom request. Failures are logged, never returned.
    pub fn set_zoom_factor_smooth(&self, logical: f64) {
        if self.is_changing() {
            log::trace!("zoom: smooth {}x dropped, session is changing", logical);
            return;
        }
        let command = Command::SetZoom {
            logical,
            reply: None,
        };
        if let Err(e) = self.tx.try_send(command) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    log::warn!("zoom: smooth {}x dropped, coordinator is busy", logical)
                }
                mpsc::error::TrySendError::Closed(_) => {
                    log::error!("zoom: smooth {}x dropped, session is closed", logical)
                }
            }
        }
    }

    /// Switches to the camera at `position`; a no-op while the session is changing.
    pub async fn set_camera_position(&self, position: CameraPosition) -> Result<()> {
        if self.is_changing() {
            log::trace!("Switch to {} camera dropped, session is changing", position);
            return Ok(());
        }
        self.request(|reply| Command::SetPosition { position, reply })
            .await?
    }

    pub async fn available_zoom_factors(&self) -> Result<ZoomFactorSet> {
        self.request(Command::AvailableZoomFactors).await
    }

    pub async fn cancel(&self) -> Result<()> {
        self.request(Command::Cancel).await
    }
}

impl CameraTask {
    /// Stops the task without waiting for handles; pending requests fail with `SessionClosed`.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Waits for every handle to be dropped and returns the manager.
    pub async fn join(self) -> Result<CameraManager> {
        self.task
            .await
            .map_err(|e| CameraError::HardwareError(format!("Camera task failed: {}", e)))
    }
}

async fn run(mut manager: CameraManager, mut rx: mpsc::Receiver<Command>) -> CameraManager {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Setup(reply) => {
                let _ = reply.send(manager.setup().await);
            }
            Command::SetZoom { logical, reply } => {
                let result = manager.set_zoom_factor(logical);
                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => log_smooth_result(logical, result),
                }
            }
            Command::SetPosition { position, reply } => {
                let _ = reply.send(manager.set_camera_position(position).await);
            }
            Command::AvailableZoomFactors(reply) => {
                let _ = reply.send(manager.available_zoom_factors().clone());
            }
            Command::Cancel(reply) => {
                manager.cancel();
                let _ = reply.send(());
            }
        }
    }
    log::debug!("Camera coordination task finished");
    manager
}

fn log_smooth_result(logical: f64, result: Result<ZoomOutcome>) {
    match result {
        Ok(ZoomOutcome::Applied {
            physical,
            switched_device,
            ..
        }) => log::debug!(
            "zoom: smooth {}x applied (physical {}, switched device: {})",
            logical,
            physical,
            switched_device
        ),
        Ok(ZoomOutcome::Ignored(reason)) => {
            log::trace!("zoom: smooth {}x ignored: {:?}", logical, reason)
        }
        Err(e) if e.is_setup_error() => log::error!("zoom: smooth {}x failed: {}", logical, e),
        Err(e) => log::warn!("zoom: smooth {}x failed: {}", logical, e),
    }
}
