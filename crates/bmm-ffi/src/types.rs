use bmm_core::{ErrorKind, Stage};

/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmmStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorDeviceSelection = 2,
    ErrorAllocation = 3,
    ErrorTransfer = 4,
    ErrorSynchronization = 5,
    ErrorTeardown = 6,
    ErrorInternal = 7,
}

impl From<ErrorKind> for BmmStatus {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidInput => BmmStatus::ErrorInvalidArgument,
            ErrorKind::DeviceSelection => BmmStatus::ErrorDeviceSelection,
            ErrorKind::Allocation => BmmStatus::ErrorAllocation,
            ErrorKind::Transfer => BmmStatus::ErrorTransfer,
            ErrorKind::Synchronization => BmmStatus::ErrorSynchronization,
            ErrorKind::Teardown => BmmStatus::ErrorTeardown,
        }
    }
}

/// Pipeline step an error was raised in. `None` means the error did not come
/// from the pipeline (bad arguments, panics) or no error has occurred.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmmStage {
    None = 0,
    SelectDevice = 1,
    AllocateA = 2,
    AllocateB = 3,
    AllocateDest = 4,
    UploadA = 5,
    UploadB = 6,
    Dispatch = 7,
    Synchronize = 8,
    Download = 9,
    ReleaseAll = 10,
}

impl From<Stage> for BmmStage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::SelectDevice => BmmStage::SelectDevice,
            Stage::AllocateA => BmmStage::AllocateA,
            Stage::AllocateB => BmmStage::AllocateB,
            Stage::AllocateDest => BmmStage::AllocateDest,
            Stage::UploadA => BmmStage::UploadA,
            Stage::UploadB => BmmStage::UploadB,
            Stage::Dispatch => BmmStage::Dispatch,
            Stage::Synchronize => BmmStage::Synchronize,
            Stage::Download => BmmStage::Download,
            Stage::ReleaseAll => BmmStage::ReleaseAll,
            Stage::Done => BmmStage::None,
        }
    }
}

/// Limits of the host accelerator created by `bmm_context_create_with`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BmmDeviceParams {
    pub memory_limit_bytes: usize,
    pub max_workers_per_block: usize,
}

impl Default for BmmDeviceParams {
    fn default() -> Self {
        let host = bmm_core::HostDeviceConfig::default();
        Self {
            memory_limit_bytes: host.memory_limit_bytes,
            max_workers_per_block: host.max_workers_per_block,
        }
    }
}
