use std::fmt;

use crate::error::{OffloadError, Result};

// Widest supported element; keeps byte sizes representable for every dtype.
const MAX_ELEMENT_BYTES: usize = 8;

/// Flat offset of element `(row, col)` of matrix `batch` in a row-major batch
/// of square matrices of the given order.
///
/// `batch * order² + row * order + col`
#[inline]
pub fn index(batch: usize, row: usize, col: usize, order: usize) -> usize {
    batch * order * order + row * order + col
}

/// Shape of a batch: `batch_size` square matrices of `order` x `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchShape {
    order: usize,
    batch_size: usize,
}

impl BatchShape {
    /// Create a new batch shape.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `order` is zero.
    pub fn new(order: usize, batch_size: usize) -> Result<Self> {
        if order == 0 {
            return Err(OffloadError::InvalidInput(
                "matrix order must be > 0".to_string(),
            ));
        }
        order
            .checked_mul(order)
            .and_then(|m| m.checked_mul(batch_size))
            .and_then(|n| n.checked_mul(MAX_ELEMENT_BYTES))
            .ok_or_else(|| {
                OffloadError::InvalidInput(format!(
                    "batch of {} matrices of order {} overflows usize",
                    batch_size, order
                ))
            })?;
        Ok(BatchShape { order, batch_size })
    }

    /// Matrix order (rows == cols).
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of matrices in the batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of elements in one matrix (order²).
    pub fn matrix_len(&self) -> usize {
        self.order * self.order
    }

    /// Total number of elements in the batch.
    pub fn numel(&self) -> usize {
        self.batch_size * self.matrix_len()
    }

    /// Size in bytes of the whole batch for elements of `elem_size` bytes.
    pub fn byte_len(&self, elem_size: usize) -> usize {
        self.numel() * elem_size
    }

    /// Flat offset of `(batch, row, col)` within a buffer of this shape.
    pub fn index(&self, batch: usize, row: usize, col: usize) -> usize {
        debug_assert!(batch < self.batch_size && row < self.order && col < self.order);
        index(batch, row, col, self.order)
    }

    /// Returns true if the batch contains no matrices.
    pub fn is_empty(&self) -> bool {
        self.batch_size == 0
    }
}

impl fmt::Display for BatchShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x[{}x{}]", self.batch_size, self.order, self.order)
    }
}
