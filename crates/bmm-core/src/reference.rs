use num_traits::{WrappingAdd, WrappingMul};

use crate::batch::Batch;
use crate::dtype::Element;

/// Host-only batched multiply, written independently of the device kernel so
/// results can be checked against it.
///
/// # Panics
/// Panics if `a` and `b` differ in shape.
pub fn reference_multiply<T: Element>(a: &Batch<T>, b: &Batch<T>) -> Batch<T> {
    assert_eq!(a.shape(), b.shape(), "operand shapes differ");
    let shape = a.shape();
    let n = shape.order();
    let mut c = Batch::zeros(shape);
    for i in 0..shape.batch_size() {
        for row in 0..n {
            for col in 0..n {
                let value = (0..n).fold(T::zero(), |acc, k| {
                    acc.wrapping_add(&a.get(i, row, k).wrapping_mul(&b.get(i, k, col)))
                });
                c.set(i, row, col, value);
            }
        }
    }
    c
}

/// Indices of matrices where `actual` differs from `expected`.
pub fn mismatches<T: Element>(expected: &Batch<T>, actual: &Batch<T>) -> Vec<usize> {
    if expected.shape() != actual.shape() {
        return (0..expected.batch_size().max(actual.batch_size())).collect();
    }
    (0..expected.batch_size())
        .filter(|&i| expected.matrix(i) != actual.matrix(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_2x2() {
        let a = Batch::from_vec(vec![1, 2, 3, 4], 2, 1).unwrap();
        let b = Batch::from_vec(vec![5, 6, 7, 8], 2, 1).unwrap();
        assert_eq!(reference_multiply(&a, &b).as_slice(), &[19, 22, 43, 50]);
    }

    #[test]
    fn test_reference_non_commutative() {
        let a = Batch::from_vec(vec![0, 1, 0, 0], 2, 1).unwrap();
        let b = Batch::from_vec(vec![0, 0, 1, 0], 2, 1).unwrap();
        assert_eq!(reference_multiply(&a, &b).as_slice(), &[1, 0, 0, 0]);
        assert_eq!(reference_multiply(&b, &a).as_slice(), &[0, 0, 0, 1]);
    }

    #[test]
    fn test_mismatches() {
        let a = Batch::from_vec(vec![1, 2, 3], 1, 3).unwrap();
        let b = Batch::from_vec(vec![1, 9, 3], 1, 3).unwrap();
        assert_eq!(mismatches(&a, &b), vec![1]);
        assert!(mismatches(&a, &a).is_empty());
        let c = Batch::from_vec(vec![1, 2], 1, 2).unwrap();
        assert_eq!(mismatches(&a, &c), vec![0, 1, 2]);
    }
}
