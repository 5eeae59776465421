use bmm_core::{BatchedMultiplier, HostDeviceConfig, HostPlatform};

use crate::types::BmmDeviceParams;

/// Opaque context handle that owns the offload engine.
pub struct BmmContext {
    pub multiplier: BatchedMultiplier<HostPlatform>,
}

impl Default for BmmContext {
    fn default() -> Self {
        Self::new(BmmDeviceParams::default())
    }
}

impl BmmContext {
    pub fn new(params: BmmDeviceParams) -> Self {
        let config = HostDeviceConfig {
            memory_limit_bytes: params.memory_limit_bytes,
            max_workers_per_block: params.max_workers_per_block,
            ..HostDeviceConfig::default()
        };
        Self {
            multiplier: BatchedMultiplier::new(HostPlatform::new(config)),
        }
    }
}
