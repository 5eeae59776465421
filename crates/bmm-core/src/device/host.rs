use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use super::{Accelerator, DevicePtr, KernelArgs, LaunchConfig, Platform};
use crate::dtype::{DType, Element};
use crate::error::DeviceError;
use crate::kernel;

const HANDLE_BASE: u64 = 0x1000;
const HANDLE_STRIDE: u64 = 0x100;

/// Limits of a simulated host accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDeviceConfig {
    /// Number of devices the platform exposes.
    pub device_count: usize,
    /// Total device memory per device, in bytes.
    pub memory_limit_bytes: usize,
    /// Largest block a launch may request.
    pub max_workers_per_block: usize,
}

impl Default for HostDeviceConfig {
    fn default() -> Self {
        Self {
            device_count: 1,
            memory_limit_bytes: 256 * 1024 * 1024,
            max_workers_per_block: 1024,
        }
    }
}

/// Platform exposing `device_count` host accelerators.
///
/// Every `select` opens a fresh device with empty memory.
#[derive(Debug, Clone, Default)]
pub struct HostPlatform {
    config: HostDeviceConfig,
}

impl HostPlatform {
    pub fn new(config: HostDeviceConfig) -> Self {
        Self { config }
    }
}

impl Platform for HostPlatform {
    fn name(&self) -> &str {
        "host"
    }

    fn device_count(&self) -> usize {
        self.config.device_count
    }

    fn select(&self, ordinal: usize) -> Result<Arc<dyn Accelerator>, DeviceError> {
        if ordinal >= self.config.device_count {
            return Err(DeviceError::Unavailable(format!(
                "device {} requested but the host platform exposes {}",
                ordinal, self.config.device_count
            )));
        }
        Ok(Arc::new(HostAccelerator::new(ordinal, self.config.clone())))
    }
}

/// Word-aligned backing store so typed views of any supported dtype are valid.
#[derive(Debug)]
struct DeviceBlock {
    words: Vec<u64>,
    len: usize,
}

impl DeviceBlock {
    fn zeroed(len: usize) -> Self {
        DeviceBlock {
            words: vec![0u64; len.div_ceil(8)],
            len,
        }
    }

    fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
    }
}

#[derive(Debug)]
struct DeviceState {
    next_handle: u64,
    used_bytes: usize,
    blocks: HashMap<u64, DeviceBlock>,
    stream: Vec<(KernelArgs, LaunchConfig)>,
}

/// Accelerator backed by host memory and a `rayon` worker pool.
///
/// Device memory is a private arena reachable only through `DevicePtr`
/// handles; handles are never reused, so a stale handle is always invalid.
/// Launches are queued and run when the host synchronizes.
#[derive(Debug)]
pub struct HostAccelerator {
    name: String,
    config: HostDeviceConfig,
    state: Mutex<DeviceState>,
}

impl HostAccelerator {
    pub fn new(ordinal: usize, config: HostDeviceConfig) -> Self {
        HostAccelerator {
            name: format!("host:{}", ordinal),
            config,
            state: Mutex::new(DeviceState {
                next_handle: HANDLE_BASE,
                used_bytes: 0,
                blocks: HashMap::new(),
                stream: Vec::new(),
            }),
        }
    }

    /// Number of buffers currently allocated.
    pub fn live_allocations(&self) -> usize {
        self.state().blocks.len()
    }

    /// Bytes currently allocated.
    pub fn used_bytes(&self) -> usize {
        self.state().used_bytes
    }

    // Recover from poisoning so `release` stays infallible.
    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn buffer_len(state: &DeviceState, ptr: DevicePtr) -> Result<usize, DeviceError> {
    state
        .blocks
        .get(&ptr.as_raw())
        .map(|b| b.len)
        .ok_or(DeviceError::InvalidHandle(ptr.as_raw()))
}

fn typed<'a, T: Element>(bytes: &'a [u8], what: &str) -> Result<&'a [T], DeviceError> {
    bytemuck::try_cast_slice(bytes).map_err(|e| {
        DeviceError::Fault(format!("{} is not a valid {} buffer: {}", what, T::DTYPE, e))
    })
}

fn execute<T: Element>(
    a: &[u8],
    b: &[u8],
    dest: &mut [u8],
    args: &KernelArgs,
    config: LaunchConfig,
) -> Result<(), DeviceError> {
    let a = typed::<T>(a, "operand A")?;
    let b = typed::<T>(b, "operand B")?;
    let dest: &mut [T] = bytemuck::try_cast_slice_mut(dest).map_err(|e| {
        DeviceError::Fault(format!("destination is not a valid {} buffer: {}", T::DTYPE, e))
    })?;
    kernel::run_grid(a, b, dest, args.order, args.batch_size, config);
    Ok(())
}

impl Accelerator for HostAccelerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_workers_per_block(&self) -> usize {
        self.config.max_workers_per_block
    }

    fn allocate(&self, bytes: usize) -> Result<DevicePtr, DeviceError> {
        let mut state = self.state();
        let available = self.config.memory_limit_bytes.saturating_sub(state.used_bytes);
        if bytes > available {
            return Err(DeviceError::OutOfMemory {
                requested: bytes,
                available,
            });
        }

        let handle = state.next_handle;
        state.next_handle += HANDLE_STRIDE;
        state.used_bytes += bytes;
        state.blocks.insert(handle, DeviceBlock::zeroed(bytes));
        trace!(device = %self.name, handle, bytes, "allocated device buffer");
        Ok(DevicePtr::from_raw(handle))
    }

    fn release(&self, ptr: DevicePtr) {
        if ptr.is_null() {
            return;
        }
        let mut state = self.state();
        if let Some(block) = state.blocks.remove(&ptr.as_raw()) {
            state.used_bytes -= block.len;
            trace!(device = %self.name, handle = ptr.as_raw(), "released device buffer");
        }
    }

    fn upload(&self, src: &[u8], dst: DevicePtr) -> Result<(), DeviceError> {
        let mut state = self.state();
        let block = state
            .blocks
            .get_mut(&dst.as_raw())
            .ok_or(DeviceError::InvalidHandle(dst.as_raw()))?;
        if block.len != src.len() {
            return Err(DeviceError::SizeMismatch {
                expected: block.len,
                got: src.len(),
            });
        }
        block.bytes_mut().copy_from_slice(src);
        Ok(())
    }

    fn download(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), DeviceError> {
        let state = self.state();
        let block = state
            .blocks
            .get(&src.as_raw())
            .ok_or(DeviceError::InvalidHandle(src.as_raw()))?;
        if block.len != dst.len() {
            return Err(DeviceError::SizeMismatch {
                expected: block.len,
                got: dst.len(),
            });
        }
        dst.copy_from_slice(block.bytes());
        Ok(())
    }

    fn launch(&self, args: &KernelArgs, config: LaunchConfig) -> Result<(), DeviceError> {
        if config.block_dim > self.config.max_workers_per_block {
            return Err(DeviceError::InvalidLaunch(format!(
                "block of {} workers exceeds the device limit of {}",
                config.block_dim, self.config.max_workers_per_block
            )));
        }
        if args.dest == args.a || args.dest == args.b {
            return Err(DeviceError::InvalidLaunch(
                "destination aliases an operand buffer".to_string(),
            ));
        }

        let covered = config
            .grid_dim
            .checked_mul(config.block_dim)
            .unwrap_or(usize::MAX);
        if args.batch_size > 0 && (config.block_dim == 0 || covered < args.batch_size) {
            return Err(DeviceError::InvalidLaunch(format!(
                "grid of {} x {} workers does not cover a batch of {}",
                config.grid_dim, config.block_dim, args.batch_size
            )));
        }
        let expected = args
            .batch_size
            .checked_mul(args.order)
            .and_then(|n| n.checked_mul(args.order))
            .and_then(|n| n.checked_mul(args.dtype.size_in_bytes()))
            .ok_or_else(|| {
                DeviceError::InvalidLaunch(format!(
                    "{} matrices of order {} overflow the address space",
                    args.batch_size, args.order
                ))
            })?;

        let mut state = self.state();
        for ptr in [args.a, args.b, args.dest] {
            let len = buffer_len(&state, ptr)?;
            if len != expected {
                return Err(DeviceError::InvalidLaunch(format!(
                    "buffer {} holds {} bytes, kernel expects {}",
                    ptr, len, expected
                )));
            }
        }
        trace!(
            device = %self.name,
            grid = config.grid_dim,
            block = config.block_dim,
            "enqueued batched multiply"
        );
        state.stream.push((*args, config));
        Ok(())
    }

    fn synchronize(&self) -> Result<(), DeviceError> {
        let mut state = self.state();
        let pending = std::mem::take(&mut state.stream);
        for (args, config) in pending {
            // Buffers may have been released after the launch was queued.
            let mut dest = state.blocks.remove(&args.dest.as_raw()).ok_or_else(|| {
                DeviceError::Fault(format!("destination {} released while in flight", args.dest))
            })?;
            let a = state.blocks.get(&args.a.as_raw());
            let b = state.blocks.get(&args.b.as_raw());
            let result = match (a, b) {
                (Some(a), Some(b)) => match args.dtype {
                    DType::I32 => {
                        execute::<i32>(a.bytes(), b.bytes(), dest.bytes_mut(), &args, config)
                    }
                    DType::I64 => {
                        execute::<i64>(a.bytes(), b.bytes(), dest.bytes_mut(), &args, config)
                    }
                },
                _ => Err(DeviceError::Fault(
                    "operand buffer released while in flight".to_string(),
                )),
            };
            state.blocks.insert(args.dest.as_raw(), dest);
            result?;
        }
        Ok(())
    }

    fn reset(&self) -> Result<(), DeviceError> {
        let mut state = self.state();
        state.stream.clear();
        let leaked = state.blocks.len();
        state.blocks.clear();
        state.used_bytes = 0;
        if leaked > 0 {
            return Err(DeviceError::Other(format!(
                "reset reclaimed {} leaked device allocations",
                leaked
            )));
        }
        Ok(())
    }
}
