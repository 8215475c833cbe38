//! Kernel registry
//!
//! Every kernel body submitted to a device is registered under its kernel id. The
//! registry serves two purposes:
//!
//! - Detect kernel-identity collisions: two different bodies submitted under the same
//!   explicitly chosen kernel name. A collision is logged, since the name no longer
//!   identifies one kernel.
//! - Answer the compiled-kernel work-group size query (feature `compile-kernel`), cached
//!   per kernel id.

use super::config::DeviceConfig;
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug)]
struct KernelEntry {
    body: TypeId,
    #[cfg_attr(not(feature = "compile-kernel"), allow(dead_code))]
    work_group_size: Option<usize>,
}

/// Registry of the kernels submitted to one device
#[derive(Debug)]
pub struct KernelRegistry {
    #[cfg_attr(not(feature = "compile-kernel"), allow(dead_code))]
    config: Arc<DeviceConfig>,
    entries: Mutex<HashMap<Arc<str>, KernelEntry>>,
}

impl KernelRegistry {
    pub(crate) fn new(config: Arc<DeviceConfig>) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record that `body` was submitted under `kernel`
    ///
    /// Returns false if an explicitly named kernel was already registered with a
    /// different body.
    pub(crate) fn register(&self, kernel: &Arc<str>, body: TypeId, explicit: bool) -> bool {
        let mut entries = self.entries.lock();
        match entries.entry(kernel.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(KernelEntry {
                    body,
                    work_group_size: None,
                });
                true
            }
            Entry::Occupied(mut slot) => {
                if slot.get().body == body {
                    return true;
                }
                if explicit {
                    warn!(
                        kernel = %kernel,
                        "kernel name reused for a different kernel body; derive a distinct name"
                    );
                }
                slot.get_mut().body = body;
                !explicit
            }
        }
    }

    /// Returns true if a kernel was submitted under `kernel`
    pub fn is_registered(&self, kernel: &str) -> bool {
        self.entries.lock().contains_key(kernel)
    }

    /// Number of distinct kernel ids submitted so far
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was submitted yet
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Work-group size a compiled kernel can actually use on this device
    ///
    /// CPU-like devices need extra resources per worker, so the theoretical maximum is
    /// divided by the device's `kernel_group_size_divisor`. The answer is cached per
    /// kernel id.
    #[cfg(feature = "compile-kernel")]
    pub fn kernel_work_group_size(&self, kernel: &str) -> usize {
        let compute = || {
            let max = self.config.max_work_group_size;
            if self.config.kind.is_cpu() {
                (max / self.config.kernel_group_size_divisor).max(1)
            } else {
                max
            }
        };
        let mut entries = self.entries.lock();
        match entries.get_mut(kernel) {
            Some(entry) => *entry.work_group_size.get_or_insert_with(compute),
            None => {
                let size = compute();
                entries.insert(
                    Arc::from(kernel),
                    KernelEntry {
                        body: TypeId::of::<()>(),
                        work_group_size: Some(size),
                    },
                );
                size
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> KernelRegistry {
        KernelRegistry::new(Arc::new(DeviceConfig::host().with_max_work_group_size(64)))
    }

    #[test]
    fn test_collision_detection() {
        let reg = registry();
        let name: Arc<str> = Arc::from("sum::reduce");
        assert!(reg.register(&name, TypeId::of::<u8>(), true));
        assert!(reg.register(&name, TypeId::of::<u8>(), true));
        assert!(!reg.register(&name, TypeId::of::<u16>(), true));
        assert!(reg.register(&name, TypeId::of::<u32>(), false));
        assert!(reg.is_registered("sum::reduce"));
        assert_eq!(reg.len(), 1);
    }

    #[cfg(feature = "compile-kernel")]
    #[test]
    fn test_compiled_group_size_uses_divisor() {
        let reg = registry();
        assert_eq!(reg.kernel_work_group_size("k"), 16);
        assert!(reg.is_registered("k"));
    }
}
