//! `bmm-core` - Batched small-matrix multiply offload engine.
//!
//! This crate provides:
//! - A flat `Batch` buffer of N square matrices with explicit indexing
//! - An `Accelerator` trait for pluggable devices, and a reference `HostAccelerator`
//! - Scoped device buffers that are released on every exit path
//! - The one-worker-per-matrix batched multiply kernel
//! - `BatchedMultiplier`, the offload pipeline tying it all together

pub mod batch;
pub mod device;
pub mod dtype;
pub mod error;
pub mod kernel;
pub mod memory;
pub mod offload;
pub mod reference;
pub mod shape;
pub mod transfer;

#[cfg(test)]
mod testing;

// Re-export primary types at the crate root for convenience.
pub use batch::Batch;
pub use device::host::{HostAccelerator, HostDeviceConfig, HostPlatform};
pub use device::{Accelerator, DevicePtr, KernelArgs, LaunchConfig, Platform};
pub use dtype::{DType, Element};
pub use error::{DeviceError, ErrorKind, OffloadError, Result};
pub use offload::{batched_multiply, BatchedMultiplier, OffloadConfig, Stage};
pub use shape::{index, BatchShape};
