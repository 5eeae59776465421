use std::fmt;

use crate::device::{Accelerator, DevicePtr};
use crate::error::DeviceError;

/// A device allocation scoped to one offload.
///
/// The buffer is released when the guard is dropped, so every exit path of
/// the operation that owns it (including `?` and panics) frees device memory.
pub struct DeviceBuffer<'d> {
    device: &'d dyn Accelerator,
    ptr: DevicePtr,
    len: usize,
}

impl<'d> DeviceBuffer<'d> {
    /// Allocate `len` bytes on `device`.
    pub fn allocate(device: &'d dyn Accelerator, len: usize) -> Result<Self, DeviceError> {
        let ptr = device.allocate(len)?;
        Ok(DeviceBuffer { device, ptr, len })
    }

    pub fn ptr(&self) -> DevicePtr {
        self.ptr
    }

    /// Allocated size in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn device(&self) -> &'d dyn Accelerator {
        self.device
    }

    /// Release the buffer now rather than at the end of scope.
    pub fn release(self) {
        drop(self)
    }
}

impl Drop for DeviceBuffer<'_> {
    fn drop(&mut self) {
        self.device.release(self.ptr);
    }
}

impl fmt::Debug for DeviceBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("device", &self.device.name())
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// The three device mirrors of one batched multiply.
#[derive(Debug)]
pub struct OperandBuffers<'d> {
    pub a: DeviceBuffer<'d>,
    pub b: DeviceBuffer<'d>,
    pub dest: DeviceBuffer<'d>,
}

impl OperandBuffers<'_> {
    /// Release all three buffers, destination first.
    pub fn release_all(self) {
        let OperandBuffers { a, b, dest } = self;
        dest.release();
        b.release();
        a.release();
    }
}
