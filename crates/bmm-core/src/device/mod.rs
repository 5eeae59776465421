pub mod host;

use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::dtype::DType;
use crate::error::DeviceError;

/// Opaque handle to a buffer in an accelerator's memory space.
///
/// Handles are only meaningful to the accelerator that issued them.
/// `DevicePtr::NULL` never refers to memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DevicePtr(u64);

impl DevicePtr {
    pub const NULL: DevicePtr = DevicePtr(0);

    pub fn from_raw(raw: u64) -> Self {
        DevicePtr(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Execution grid for one kernel launch: `grid_dim` blocks of `block_dim`
/// workers each. Worker `(block, thread)` handles batch index
/// `block * block_dim + thread`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    pub grid_dim: usize,
    pub block_dim: usize,
}

impl LaunchConfig {
    /// Tile `batch_size` workers over as many blocks as needed so that no
    /// block exceeds `max_workers_per_block`.
    ///
    /// An empty batch gets an empty grid.
    pub fn for_batch(batch_size: usize, max_workers_per_block: usize) -> Self {
        if batch_size == 0 {
            return LaunchConfig {
                grid_dim: 0,
                block_dim: 0,
            };
        }
        let block_dim = batch_size.min(max_workers_per_block.max(1));
        LaunchConfig {
            grid_dim: batch_size.div_ceil(block_dim),
            block_dim,
        }
    }

    /// Total number of workers in the grid, including idle tail workers.
    pub fn total_workers(&self) -> usize {
        self.grid_dim * self.block_dim
    }

    /// Batch index owned by worker `thread` of block `block`.
    pub fn worker_index(&self, block: usize, thread: usize) -> usize {
        block * self.block_dim + thread
    }
}

/// Arguments of the batched multiply kernel: three device buffers holding
/// `batch_size` matrices of `order` x `order` elements of `dtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelArgs {
    pub a: DevicePtr,
    pub b: DevicePtr,
    pub dest: DevicePtr,
    pub order: usize,
    pub batch_size: usize,
    pub dtype: DType,
}

/// A massively parallel device with its own memory space.
///
/// All copies are synchronous. `launch` only enqueues work; the host must call
/// `synchronize` before reading results back.
pub trait Accelerator: Send + Sync + Debug {
    /// Returns the name of this accelerator (e.g., "host:0").
    fn name(&self) -> &str;

    /// Largest number of workers a single block may hold.
    fn max_workers_per_block(&self) -> usize;

    /// Allocate `bytes` of device memory.
    fn allocate(&self, bytes: usize) -> Result<DevicePtr, DeviceError>;

    /// Free a buffer. Releasing a null, unknown or already-released handle is
    /// a no-op.
    fn release(&self, ptr: DevicePtr);

    /// Copy `src` into the device buffer `dst`. `src.len()` must equal the
    /// buffer's allocated size.
    fn upload(&self, src: &[u8], dst: DevicePtr) -> Result<(), DeviceError>;

    /// Copy the device buffer `src` into `dst`. `dst.len()` must equal the
    /// buffer's allocated size.
    fn download(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), DeviceError>;

    /// Enqueue one batched multiply over the given grid.
    fn launch(&self, args: &KernelArgs, config: LaunchConfig) -> Result<(), DeviceError>;

    /// Block until every enqueued worker has finished. No timeout.
    fn synchronize(&self) -> Result<(), DeviceError>;

    /// Return the device to a clean state at the end of an operation.
    fn reset(&self) -> Result<(), DeviceError>;
}

/// Source of accelerators. Selection is performed once per offload and never
/// cached by the caller.
pub trait Platform: Send + Sync + Debug {
    /// Returns the name of this platform (e.g., "host").
    fn name(&self) -> &str;

    /// Number of selectable devices.
    fn device_count(&self) -> usize;

    /// Open device `ordinal`.
    fn select(&self, ordinal: usize) -> Result<Arc<dyn Accelerator>, DeviceError>;
}
