use std::ops::RangeInclusive;

use bmm_core::{Batch, BatchShape};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{GenError, Result};

/// Default inclusive range of generated elements.
pub const DEFAULT_RANGE: RangeInclusive<i32> = 1..=200;

/// Fills batches with uniformly distributed integers.
///
/// A seeded generator is reproducible: two generators built with the same seed
/// and range produce the same sequence of batches.
pub struct MatrixGenerator {
    rng: StdRng,
    dist: Uniform<i32>,
}

impl MatrixGenerator {
    /// Create a generator with the given seed and the default range [1, 200].
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            dist: Uniform::from(DEFAULT_RANGE),
        }
    }

    /// Create an unseeded generator.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            dist: Uniform::from(DEFAULT_RANGE),
        }
    }

    /// Replace the value range. Returns self for builder-style usage.
    ///
    /// # Errors
    /// Returns `EmptyRange` if `min > max`.
    pub fn with_range(mut self, min: i32, max: i32) -> Result<Self> {
        if min > max {
            return Err(GenError::EmptyRange { min, max });
        }
        self.dist = Uniform::from(min..=max);
        Ok(self)
    }

    /// Generate one batch of the given shape.
    pub fn generate(&mut self, shape: BatchShape) -> Batch<i32> {
        let mut batch = Batch::zeros(shape);
        for v in batch.as_mut_slice() {
            *v = self.dist.sample(&mut self.rng);
        }
        batch
    }

    /// Generate an operand pair A, B of the given shape.
    pub fn generate_pair(&mut self, shape: BatchShape) -> (Batch<i32>, Batch<i32>) {
        let a = self.generate(shape);
        let b = self.generate(shape);
        (a, b)
    }
}

/// A batch whose every matrix is the identity of the given order.
pub fn identity_batch(order: usize, batch_size: usize) -> Result<Batch<i32>> {
    Ok(Batch::identity(BatchShape::new(order, batch_size)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(order: usize, batch_size: usize) -> BatchShape {
        BatchShape::new(order, batch_size).unwrap()
    }

    #[test]
    fn test_default_range() {
        let mut g = MatrixGenerator::new(42);
        let b = g.generate(shape(3, 1024));
        assert_eq!(b.as_slice().len(), 9 * 1024);
        assert!(b.as_slice().iter().all(|v| (1..=200).contains(v)));
    }

    #[test]
    fn test_seed_reproducible() {
        let a = MatrixGenerator::new(7).generate(shape(3, 16));
        let b = MatrixGenerator::new(7).generate(shape(3, 16));
        let c = MatrixGenerator::new(8).generate(shape(3, 16));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_pair_differs() {
        let (a, b) = MatrixGenerator::new(1).generate_pair(shape(3, 64));
        assert_eq!(a.shape(), b.shape());
        assert_ne!(a, b);
    }

    #[test]
    fn test_custom_range() {
        let mut g = MatrixGenerator::new(3).with_range(-2, 2).unwrap();
        let b = g.generate(shape(2, 256));
        assert!(b.as_slice().iter().all(|v| (-2..=2).contains(v)));

        let mut single = MatrixGenerator::new(3).with_range(5, 5).unwrap();
        assert!(single.generate(shape(2, 4)).as_slice().iter().all(|&v| v == 5));
    }

    #[test]
    fn test_empty_range() {
        assert!(matches!(
            MatrixGenerator::new(0).with_range(3, 2),
            Err(GenError::EmptyRange { min: 3, max: 2 })
        ));
    }

    #[test]
    fn test_identity_batch() {
        let b = identity_batch(2, 3).unwrap();
        for m in b.matrices() {
            assert_eq!(m, &[1, 0, 0, 1]);
        }
        assert!(identity_batch(0, 3).is_err());
    }

    #[test]
    fn test_empty_batch() {
        let b = MatrixGenerator::from_entropy().generate(shape(3, 0));
        assert!(b.is_empty());
    }
}
