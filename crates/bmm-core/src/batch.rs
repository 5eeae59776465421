use crate::dtype::{DType, Element};
use crate::error::{OffloadError, Result};
use crate::shape::BatchShape;

/// Host-resident storage for a batch of square matrices.
///
/// Holds contiguous, row-major data: matrix `i` occupies
/// `[i * order², (i + 1) * order²)` of the flat buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T: Element = i32> {
    data: Vec<T>,
    shape: BatchShape,
}

impl<T: Element> Batch<T> {
    /// Wrap a flat buffer as a batch of `batch_size` matrices of `order`.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `order` is zero or the buffer does not hold
    /// exactly `batch_size * order²` elements.
    pub fn from_vec(data: Vec<T>, order: usize, batch_size: usize) -> Result<Self> {
        let shape = BatchShape::new(order, batch_size)?;
        Self::with_shape(data, shape)
    }

    /// Wrap a flat buffer with an already-validated shape.
    pub fn with_shape(data: Vec<T>, shape: BatchShape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(OffloadError::InvalidInput(format!(
                "buffer holds {} elements but shape {} needs {}",
                data.len(),
                shape,
                shape.numel()
            )));
        }
        Ok(Batch { data, shape })
    }

    /// Create a zero-filled batch.
    pub fn zeros(shape: BatchShape) -> Self {
        Batch {
            data: vec![T::zero(); shape.numel()],
            shape,
        }
    }

    /// Create a batch where every matrix is the identity.
    pub fn identity(shape: BatchShape) -> Self {
        let mut batch = Self::zeros(shape);
        for i in 0..shape.batch_size() {
            for d in 0..shape.order() {
                batch.set(i, d, d, T::one());
            }
        }
        batch
    }

    /// Build a batch from individual row-major matrices.
    ///
    /// # Errors
    /// Returns `InvalidInput` if any matrix does not hold `order²` elements.
    pub fn from_matrices(matrices: &[Vec<T>], order: usize) -> Result<Self> {
        let shape = BatchShape::new(order, matrices.len())?;
        let mut data = Vec::with_capacity(shape.numel());
        for (i, m) in matrices.iter().enumerate() {
            if m.len() != shape.matrix_len() {
                return Err(OffloadError::InvalidInput(format!(
                    "matrix {} holds {} elements, expected {}",
                    i,
                    m.len(),
                    shape.matrix_len()
                )));
            }
            data.extend_from_slice(m);
        }
        Ok(Batch { data, shape })
    }

    pub fn shape(&self) -> BatchShape {
        self.shape
    }

    pub fn order(&self) -> usize {
        self.shape.order()
    }

    pub fn batch_size(&self) -> usize {
        self.shape.batch_size()
    }

    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Element `(row, col)` of matrix `batch`.
    ///
    /// # Panics
    /// Panics if any coordinate is out of range.
    pub fn get(&self, batch: usize, row: usize, col: usize) -> T {
        self.data[self.shape.index(batch, row, col)]
    }

    /// Overwrite element `(row, col)` of matrix `batch`.
    ///
    /// # Panics
    /// Panics if any coordinate is out of range.
    pub fn set(&mut self, batch: usize, row: usize, col: usize, value: T) {
        let idx = self.shape.index(batch, row, col);
        self.data[idx] = value;
    }

    /// Row-major elements of matrix `i`.
    pub fn matrix(&self, i: usize) -> &[T] {
        let len = self.shape.matrix_len();
        &self.data[i * len..(i + 1) * len]
    }

    /// Mutable row-major elements of matrix `i`.
    pub fn matrix_mut(&mut self, i: usize) -> &mut [T] {
        let len = self.shape.matrix_len();
        &mut self.data[i * len..(i + 1) * len]
    }

    /// Iterate over the matrices in batch order.
    pub fn matrices(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact(0) panics; an empty batch has nothing to yield anyway
        let len = self.shape.matrix_len().max(1);
        self.data.chunks_exact(len)
    }

    /// The whole flat buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Byte view of the flat buffer, as copied to the device.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.data.as_slice())
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(self.data.as_mut_slice())
    }

    /// Size of the flat buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.shape.byte_len(T::DTYPE.size_in_bytes())
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}
