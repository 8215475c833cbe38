//! Process-wide device registry
//!
//! A [`Platform`] is constructed once at startup, handed to the code that needs devices,
//! and torn down once with [`Platform::shutdown`]. There is no implicit global instance.

use super::config::DeviceConfig;
use super::cpu::CpuDevice;
use super::{Device, Queue};
use crate::error::{Error, Result};
use crate::policy::ExecutionContext;
use tracing::debug;

/// Registry of the devices and default queues of this process
#[derive(Debug)]
pub struct Platform {
    devices: Vec<CpuDevice>,
    queues: Vec<Queue>,
}

impl Platform {
    /// Bring up one device per configuration, each with a default queue
    pub fn init(configs: impl IntoIterator<Item = DeviceConfig>) -> Result<Self> {
        let devices = configs
            .into_iter()
            .enumerate()
            .map(|(id, config)| CpuDevice::new(id, config))
            .collect::<Result<Vec<_>>>()?;
        if devices.is_empty() {
            return Err(Error::invalid_argument(
                "configs",
                "a platform needs at least one device",
            ));
        }
        for device in &devices {
            debug!(
                device = %device.name(),
                compute_units = device.compute_units(),
                max_work_group_size = device.max_work_group_size(),
                "device ready"
            );
        }
        let queues = devices.iter().cloned().map(Queue::new).collect::<Result<Vec<_>>>()?;
        Ok(Self { devices, queues })
    }

    /// Platform with a single device modeled on the host machine
    pub fn host() -> Result<Self> {
        Self::init([DeviceConfig::host()])
    }

    /// Platform with a single host device configured from `DEVPAR_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::init([DeviceConfig::from_env()?])
    }

    /// All devices, indexed by device id
    pub fn devices(&self) -> &[CpuDevice] {
        &self.devices
    }

    /// Default queue of the first device
    pub fn queue(&self) -> &Queue {
        &self.queues[0]
    }

    /// Default queue of device `index`
    pub fn device_queue(&self, index: usize) -> Result<&Queue> {
        self.queues.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            size: self.queues.len(),
        })
    }

    /// Execution context on the default queue of the first device
    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.queue().clone())
    }

    /// Wait for all outstanding work on every default queue and release the devices
    ///
    /// Returns the first failure observed. Queues created separately with
    /// [`Queue::new`] must be waited by their owners.
    pub fn shutdown(self) -> Result<()> {
        let mut first = Ok(());
        for queue in &self.queues {
            let result = queue.wait();
            if first.is_ok() {
                first = result;
            }
        }
        debug!(devices = self.devices.len(), "platform shut down");
        first
    }
}
