//! Scoped device configuration access.

use crate::errors::Result;
use crate::platform::CaptureDevice;

/// Holds a device's configuration lock until dropped.
pub struct ConfigurationLock<'a> {
    device: &'a dyn CaptureDevice,
}

impl<'a> ConfigurationLock<'a> {
    pub fn acquire(device: &'a dyn CaptureDevice) -> Result<Self> {
        device.lock_for_configuration()?;
        log::trace!("Configuration lock acquired on {}", device.unique_id());
        Ok(Self { device })
    }

    pub fn device(&self) -> &'a dyn CaptureDevice {
        self.device
    }
}

impl Drop for ConfigurationLock<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
        log::trace!("Configuration lock released on {}", self.device.unique_id());
    }
}

/// Runs `configure` with the device locked. The lock is released on every path out.
pub fn with_configuration<T, F>(device: &dyn CaptureDevice, configure: F) -> Result<T>
where
    F: FnOnce(&dyn CaptureDevice) -> Result<T>,
{
    let lock = ConfigurationLock::acquire(device)?;
    configure(lock.device())
}
