//! CPU device implementation

use crate::error::{Error, Result};
use crate::runtime::config::DeviceConfig;
use crate::runtime::{Device, KernelRegistry, TrackingAllocator};
use std::sync::Arc;

/// Emulated accelerator backed by host threads
///
/// Each compute unit is one thread of a dedicated rayon pool. Clones share the pool,
/// the memory accounting and the kernel registry.
#[derive(Clone, Debug)]
pub struct CpuDevice {
    id: usize,
    config: Arc<DeviceConfig>,
    pool: Arc<rayon::ThreadPool>,
    allocator: TrackingAllocator,
    kernels: Arc<KernelRegistry>,
}

impl CpuDevice {
    /// Create a device with the given limits
    ///
    /// Spawns `config.compute_units` worker threads.
    pub fn new(id: usize, config: DeviceConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.compute_units)
            .thread_name(move |i| format!("devpar-{id}-cu{i}"))
            .build()
            .map_err(|e| Error::Backend(format!("failed to start compute units: {e}")))?;
        let config = Arc::new(config);
        Ok(Self {
            id,
            allocator: TrackingAllocator::new(config.global_mem_size),
            kernels: Arc::new(KernelRegistry::new(config.clone())),
            pool: Arc::new(pool),
            config,
        })
    }

    /// Device limits
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Global memory accounting
    pub fn allocator(&self) -> &TrackingAllocator {
        &self.allocator
    }

    /// Kernels submitted to this device
    pub fn kernels(&self) -> &KernelRegistry {
        &self.kernels
    }

    pub(crate) fn pool(&self) -> &Arc<rayon::ThreadPool> {
        &self.pool
    }
}

impl Device for CpuDevice {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> String {
        self.config.name.clone()
    }

    fn compute_units(&self) -> usize {
        self.config.compute_units
    }

    fn max_work_group_size(&self) -> usize {
        self.config.max_work_group_size
    }

    fn local_mem_size(&self) -> usize {
        self.config.local_mem_size
    }

    fn is_cpu(&self) -> bool {
        self.config.kind.is_cpu()
    }
}
