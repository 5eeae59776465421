//! Allocation-tracking accelerator double with failure injection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::device::host::{HostDeviceConfig, HostPlatform};
use crate::device::{Accelerator, DevicePtr, KernelArgs, LaunchConfig, Platform};
use crate::error::DeviceError;

/// A device operation; `Allocate(n)` and `Upload(n)` name the n-th call
/// (zero-based) within one selected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Allocate(usize),
    Upload(usize),
    Launch,
    Synchronize,
    Download,
    Reset,
}

#[derive(Debug, Default)]
struct Counters {
    selections: AtomicUsize,
    outstanding: AtomicUsize,
    resets: AtomicUsize,
}

#[derive(Debug, Clone)]
pub(crate) struct TrackingPlatform {
    host: HostPlatform,
    failures: Vec<Op>,
    counters: Arc<Counters>,
}

impl TrackingPlatform {
    pub(crate) fn new(config: HostDeviceConfig) -> Self {
        TrackingPlatform {
            host: HostPlatform::new(config),
            failures: Vec::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub(crate) fn failing_at(config: HostDeviceConfig, op: Op) -> Self {
        let mut p = Self::new(config);
        p.failures.push(op);
        p
    }

    pub(crate) fn failing_at_both(config: HostDeviceConfig, first: Op, second: Op) -> Self {
        let mut p = Self::failing_at(config, first);
        p.failures.push(second);
        p
    }

    pub(crate) fn selections(&self) -> usize {
        self.counters.selections.load(Ordering::SeqCst)
    }

    /// Allocations made through any selected device and not yet released.
    pub(crate) fn outstanding(&self) -> usize {
        self.counters.outstanding.load(Ordering::SeqCst)
    }

    pub(crate) fn resets(&self) -> usize {
        self.counters.resets.load(Ordering::SeqCst)
    }
}

impl Platform for TrackingPlatform {
    fn name(&self) -> &str {
        "tracking"
    }

    fn device_count(&self) -> usize {
        self.host.device_count()
    }

    fn select(&self, ordinal: usize) -> Result<Arc<dyn Accelerator>, DeviceError> {
        self.counters.selections.fetch_add(1, Ordering::SeqCst);
        let inner = self.host.select(ordinal)?;
        Ok(Arc::new(TrackingAccelerator {
            inner,
            failures: self.failures.clone(),
            counters: Arc::clone(&self.counters),
            live: Mutex::new(HashSet::new()),
            allocations: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
        }))
    }
}

#[derive(Debug)]
struct TrackingAccelerator {
    inner: Arc<dyn Accelerator>,
    failures: Vec<Op>,
    counters: Arc<Counters>,
    live: Mutex<HashSet<u64>>,
    allocations: AtomicUsize,
    uploads: AtomicUsize,
}

impl TrackingAccelerator {
    fn check(&self, op: Op) -> Result<(), DeviceError> {
        if self.failures.contains(&op) {
            return Err(DeviceError::Other(format!("injected failure at {:?}", op)));
        }
        Ok(())
    }
}

impl Accelerator for TrackingAccelerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn max_workers_per_block(&self) -> usize {
        self.inner.max_workers_per_block()
    }

    fn allocate(&self, bytes: usize) -> Result<DevicePtr, DeviceError> {
        let n = self.allocations.fetch_add(1, Ordering::SeqCst);
        self.check(Op::Allocate(n))?;
        let ptr = self.inner.allocate(bytes)?;
        self.live.lock().unwrap().insert(ptr.as_raw());
        self.counters.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(ptr)
    }

    fn release(&self, ptr: DevicePtr) {
        if self.live.lock().unwrap().remove(&ptr.as_raw()) {
            self.counters.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
        self.inner.release(ptr);
    }

    fn upload(&self, src: &[u8], dst: DevicePtr) -> Result<(), DeviceError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        self.check(Op::Upload(n))?;
        self.inner.upload(src, dst)
    }

    fn download(&self, src: DevicePtr, dst: &mut [u8]) -> Result<(), DeviceError> {
        self.check(Op::Download)?;
        self.inner.download(src, dst)
    }

    fn launch(&self, args: &KernelArgs, config: LaunchConfig) -> Result<(), DeviceError> {
        self.check(Op::Launch)?;
        self.inner.launch(args, config)
    }

    fn synchronize(&self) -> Result<(), DeviceError> {
        self.check(Op::Synchronize)?;
        self.inner.synchronize()
    }

    fn reset(&self) -> Result<(), DeviceError> {
        self.counters.resets.fetch_add(1, Ordering::SeqCst);
        self.check(Op::Reset)?;
        self.inner.reset()
    }
}
