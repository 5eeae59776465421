use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::batch::Batch;
use crate::device::host::HostPlatform;
use crate::device::{Accelerator, KernelArgs, LaunchConfig, Platform};
use crate::dtype::Element;
use crate::error::{DeviceError, OffloadError, Result};
use crate::memory::{DeviceBuffer, OperandBuffers};
use crate::transfer;

/// Steps of the offload pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    SelectDevice,
    AllocateA,
    AllocateB,
    AllocateDest,
    UploadA,
    UploadB,
    Dispatch,
    Synchronize,
    Download,
    ReleaseAll,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::SelectDevice => "select device",
            Stage::AllocateA => "allocate A",
            Stage::AllocateB => "allocate B",
            Stage::AllocateDest => "allocate destination",
            Stage::UploadA => "upload A",
            Stage::UploadB => "upload B",
            Stage::Dispatch => "dispatch",
            Stage::Synchronize => "synchronize",
            Stage::Download => "download",
            Stage::ReleaseAll => "release",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Settings for a [`BatchedMultiplier`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffloadConfig {
    /// Ordinal of the device selected on each call.
    pub device_ordinal: usize,
}

/// Runs batched multiplies on devices from a [`Platform`].
///
/// Each call selects a device, allocates the three device mirrors, uploads
/// both operands, launches one worker per matrix, waits for the barrier,
/// downloads the result and tears everything down. Any failure aborts the
/// call; device memory is released on every path and nothing is retried.
#[derive(Debug, Clone, Default)]
pub struct BatchedMultiplier<P: Platform = HostPlatform> {
    platform: P,
    config: OffloadConfig,
}

impl<P: Platform> BatchedMultiplier<P> {
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, OffloadConfig::default())
    }

    pub fn with_config(platform: P, config: OffloadConfig) -> Self {
        BatchedMultiplier { platform, config }
    }

    /// Compute `C[i] = A[i] x B[i]` for every matrix in the batch.
    ///
    /// # Errors
    /// `InvalidInput` if the operands differ in shape; otherwise the error of
    /// the first pipeline stage that failed. No partial result is returned.
    pub fn multiply<T: Element>(&self, a: &Batch<T>, b: &Batch<T>) -> Result<Batch<T>> {
        if a.shape() != b.shape() {
            return Err(OffloadError::InvalidInput(format!(
                "operand shapes differ: A is {}, B is {}",
                a.shape(),
                b.shape()
            )));
        }

        let start = Instant::now();
        debug!(
            stage = %Stage::SelectDevice,
            platform = self.platform.name(),
            devices = self.platform.device_count(),
            ordinal = self.config.device_ordinal
        );
        let device = self
            .platform
            .select(self.config.device_ordinal)
            .map_err(|source| OffloadError::DeviceSelection { source })?;

        // Device buffers live inside `run_on_device` and are gone by the time
        // it returns, whatever the outcome.
        let outcome = run_on_device(device.as_ref(), a, b);

        debug!(stage = %Stage::ReleaseAll, device = device.name(), "resetting device");
        let teardown = device.reset();

        match (outcome, teardown) {
            (Ok(result), Ok(())) => {
                info!(
                    device = device.name(),
                    shape = %a.shape(),
                    dtype = %a.dtype(),
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "batched multiply complete"
                );
                debug!(stage = %Stage::Done);
                Ok(result)
            }
            (Ok(_), Err(source)) => Err(OffloadError::Teardown { source }),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(reset_err)) => {
                warn!(error = %reset_err, "device reset failed after an earlier error");
                Err(e)
            }
        }
    }
}

/// Multiply with a default host platform. `a` and `b` each hold `batch_size`
/// row-major matrices of `order` x `order` elements.
pub fn batched_multiply<T: Element>(
    a: &[T],
    b: &[T],
    order: usize,
    batch_size: usize,
) -> Result<Vec<T>> {
    let a = Batch::from_vec(a.to_vec(), order, batch_size)?;
    let b = Batch::from_vec(b.to_vec(), order, batch_size)?;
    let multiplier: BatchedMultiplier = BatchedMultiplier::default();
    Ok(multiplier.multiply(&a, &b)?.into_vec())
}

fn allocate(device: &dyn Accelerator, bytes: usize, stage: Stage) -> Result<DeviceBuffer<'_>> {
    debug!(stage = %stage, bytes);
    DeviceBuffer::allocate(device, bytes).map_err(|source| OffloadError::Allocation { stage, source })
}

fn transfer_error(stage: Stage) -> impl FnOnce(DeviceError) -> OffloadError {
    move |source| OffloadError::Transfer { stage, source }
}

fn compute_error(stage: Stage) -> impl FnOnce(DeviceError) -> OffloadError {
    move |source| OffloadError::Synchronization { stage, source }
}

fn run_on_device<T: Element>(
    device: &dyn Accelerator,
    a: &Batch<T>,
    b: &Batch<T>,
) -> Result<Batch<T>> {
    let shape = a.shape();
    let bytes = a.byte_len();

    let buffers = OperandBuffers {
        a: allocate(device, bytes, Stage::AllocateA)?,
        b: allocate(device, bytes, Stage::AllocateB)?,
        dest: allocate(device, bytes, Stage::AllocateDest)?,
    };

    debug!(stage = %Stage::UploadA);
    transfer::upload(a, &buffers.a).map_err(transfer_error(Stage::UploadA))?;
    debug!(stage = %Stage::UploadB);
    transfer::upload(b, &buffers.b).map_err(transfer_error(Stage::UploadB))?;

    let config = LaunchConfig::for_batch(shape.batch_size(), device.max_workers_per_block());
    let args = KernelArgs {
        a: buffers.a.ptr(),
        b: buffers.b.ptr(),
        dest: buffers.dest.ptr(),
        order: shape.order(),
        batch_size: shape.batch_size(),
        dtype: T::DTYPE,
    };
    debug!(
        stage = %Stage::Dispatch,
        grid = config.grid_dim,
        block = config.block_dim,
        workers = config.total_workers()
    );
    device
        .launch(&args, config)
        .map_err(compute_error(Stage::Dispatch))?;

    debug!(stage = %Stage::Synchronize);
    device.synchronize().map_err(compute_error(Stage::Synchronize))?;

    debug!(stage = %Stage::Download);
    let mut result = Batch::zeros(shape);
    transfer::download(&buffers.dest, &mut result).map_err(transfer_error(Stage::Download))?;

    buffers.release_all();
    Ok(result)
}
