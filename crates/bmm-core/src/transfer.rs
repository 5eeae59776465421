use tracing::debug;

use crate::batch::Batch;
use crate::dtype::Element;
use crate::error::DeviceError;
use crate::memory::DeviceBuffer;

/// Copy a whole host batch into its device mirror. Blocks until the copy has
/// completed or failed.
///
/// The device buffer must have been allocated for exactly this batch; a size
/// mismatch is rejected before the device is touched.
pub fn upload<T: Element>(host: &Batch<T>, dst: &DeviceBuffer<'_>) -> Result<(), DeviceError> {
    check_len(dst, host.byte_len())?;
    debug!(ptr = %dst.ptr(), bytes = dst.len(), "host -> device");
    dst.device().upload(host.as_bytes(), dst.ptr())
}

/// Copy a whole device mirror back into a host batch. Blocks until the copy
/// has completed or failed.
pub fn download<T: Element>(src: &DeviceBuffer<'_>, host: &mut Batch<T>) -> Result<(), DeviceError> {
    check_len(src, host.byte_len())?;
    debug!(ptr = %src.ptr(), bytes = src.len(), "device -> host");
    src.device().download(src.ptr(), host.as_bytes_mut())
}

fn check_len(buf: &DeviceBuffer<'_>, host_len: usize) -> Result<(), DeviceError> {
    if buf.len() != host_len {
        return Err(DeviceError::SizeMismatch {
            expected: buf.len(),
            got: host_len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::host::{HostAccelerator, HostDeviceConfig};
    use crate::shape::BatchShape;

    #[test]
    fn test_roundtrip() {
        let d = HostAccelerator::new(0, HostDeviceConfig::default());
        let host = Batch::from_vec(vec![1, 2, 3, 4, 5, 6, 7, 8], 2, 2).unwrap();
        let buf = DeviceBuffer::allocate(&d, host.byte_len()).unwrap();
        upload(&host, &buf).unwrap();

        let mut back: Batch = Batch::zeros(host.shape());
        download(&buf, &mut back).unwrap();
        assert_eq!(back, host);
    }

    #[test]
    fn test_size_mismatch_rejected_before_copy() {
        let d = HostAccelerator::new(0, HostDeviceConfig::default());
        let host: Batch = Batch::zeros(BatchShape::new(3, 4).unwrap());
        let buf = DeviceBuffer::allocate(&d, host.byte_len() - 4).unwrap();
        assert_eq!(
            upload(&host, &buf),
            Err(DeviceError::SizeMismatch {
                expected: host.byte_len() - 4,
                got: host.byte_len()
            })
        );

        let mut wide: Batch<i64> = Batch::zeros(host.shape());
        assert!(download(&buf, &mut wide).is_err());
    }
}
