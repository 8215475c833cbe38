//! Common test utilities
#![allow(dead_code)]

use devpar::policy::ExecutionContext;
use devpar::runtime::{DeviceConfig, DeviceKind, Platform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Context on a host-like device with four compute units
pub fn create_context(name: &str) -> ExecutionContext {
    let config = DeviceConfig::host().with_compute_units(4);
    Platform::init([config])
        .expect("platform init")
        .context()
        .with_kernel_name(name)
}

/// Context whose work-groups hold at most four workers
///
/// Forces many groups on small inputs, so multi-group code paths (scan lookback,
/// reduce passes, radix block offsets) run in every test.
pub fn small_group_context(name: &str) -> ExecutionContext {
    let config = DeviceConfig::host()
        .with_compute_units(3)
        .with_max_work_group_size(4);
    Platform::init([config])
        .expect("platform init")
        .context()
        .with_kernel_name(name)
}

/// Context on a GPU-like device
pub fn gpu_context(name: &str) -> ExecutionContext {
    let config = DeviceConfig::host()
        .with_kind(DeviceKind::Gpu)
        .with_compute_units(2)
        .with_max_work_group_size(8);
    Platform::init([config])
        .expect("platform init")
        .context()
        .with_kernel_name(name)
}

/// Reproducible random integers in `[-1000, 1000)`
pub fn random_i32(n: usize, seed: u64) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(-1000..1000)).collect()
}

/// Reproducible random floats in `[0, 1)`
pub fn random_f64(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random::<f64>()).collect()
}
