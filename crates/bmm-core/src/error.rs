use thiserror::Error;

use crate::offload::Stage;

/// Failures reported by an accelerator for a single device operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("no usable accelerator: {0}")]
    Unavailable(String),
    #[error("out of device memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },
    #[error("invalid device buffer handle {0:#x}")]
    InvalidHandle(u64),
    #[error("transfer size mismatch: device buffer holds {expected} bytes, copy is {got} bytes")]
    SizeMismatch { expected: usize, got: usize },
    #[error("invalid launch configuration: {0}")]
    InvalidLaunch(String),
    #[error("kernel fault: {0}")]
    Fault(String),
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`OffloadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    DeviceSelection,
    Allocation,
    Transfer,
    Synchronization,
    Teardown,
}

/// Error returned by a batched offload. Every variant except `InvalidInput`
/// names the pipeline stage that failed; by the time the caller sees it all
/// device resources of the operation have been released.
#[derive(Error, Debug)]
pub enum OffloadError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("device selection failed: {source}")]
    DeviceSelection {
        #[source]
        source: DeviceError,
    },
    #[error("{stage} failed: {source}")]
    Allocation {
        stage: Stage,
        #[source]
        source: DeviceError,
    },
    #[error("{stage} failed: {source}")]
    Transfer {
        stage: Stage,
        #[source]
        source: DeviceError,
    },
    #[error("{stage} failed: {source}")]
    Synchronization {
        stage: Stage,
        #[source]
        source: DeviceError,
    },
    #[error("teardown failed: {source}")]
    Teardown {
        #[source]
        source: DeviceError,
    },
}

impl OffloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OffloadError::InvalidInput(_) => ErrorKind::InvalidInput,
            OffloadError::DeviceSelection { .. } => ErrorKind::DeviceSelection,
            OffloadError::Allocation { .. } => ErrorKind::Allocation,
            OffloadError::Transfer { .. } => ErrorKind::Transfer,
            OffloadError::Synchronization { .. } => ErrorKind::Synchronization,
            OffloadError::Teardown { .. } => ErrorKind::Teardown,
        }
    }

    /// The pipeline stage that failed, or `None` when the call was rejected
    /// before the pipeline started.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            OffloadError::InvalidInput(_) => None,
            OffloadError::DeviceSelection { .. } => Some(Stage::SelectDevice),
            OffloadError::Allocation { stage, .. }
            | OffloadError::Transfer { stage, .. }
            | OffloadError::Synchronization { stage, .. } => Some(*stage),
            OffloadError::Teardown { .. } => Some(Stage::ReleaseAll),
        }
    }

    /// The underlying device error, if any.
    pub fn device_error(&self) -> Option<&DeviceError> {
        match self {
            OffloadError::InvalidInput(_) => None,
            OffloadError::DeviceSelection { source }
            | OffloadError::Allocation { source, .. }
            | OffloadError::Transfer { source, .. }
            | OffloadError::Synchronization { source, .. }
            | OffloadError::Teardown { source } => Some(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, OffloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_stage() {
        let e = OffloadError::Transfer {
            stage: Stage::UploadB,
            source: DeviceError::Other("bus error".to_string()),
        };
        assert_eq!(e.kind(), ErrorKind::Transfer);
        assert_eq!(e.stage(), Some(Stage::UploadB));
        assert_eq!(e.to_string(), "upload B failed: bus error");
    }

    #[test]
    fn test_invalid_input_has_no_stage() {
        let e = OffloadError::InvalidInput("order must be > 0".to_string());
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
        assert!(e.stage().is_none());
        assert!(e.device_error().is_none());
    }

    #[test]
    fn test_teardown_maps_to_release_stage() {
        let e = OffloadError::Teardown {
            source: DeviceError::Other("reset refused".to_string()),
        };
        assert_eq!(e.stage(), Some(Stage::ReleaseAll));
        assert_eq!(
            e.device_error(),
            Some(&DeviceError::Other("reset refused".to_string()))
        );
    }
}
