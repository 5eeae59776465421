use num_traits::{WrappingAdd, WrappingMul};
use rayon::prelude::*;

use crate::device::LaunchConfig;
use crate::dtype::Element;

/// Multiply one pair of row-major `order` x `order` matrices into `dest`.
///
/// `dest[r][c] = Σ_k a[r][k] * b[k][c]`, wrapping on overflow. This is the
/// body of a single worker.
pub fn multiply_one<T: Element>(a: &[T], b: &[T], dest: &mut [T], order: usize) {
    debug_assert_eq!(a.len(), order * order);
    debug_assert_eq!(b.len(), order * order);
    debug_assert_eq!(dest.len(), order * order);

    for r in 0..order {
        for c in 0..order {
            let mut sum = T::zero();
            for k in 0..order {
                sum = sum.wrapping_add(&a[r * order + k].wrapping_mul(&b[k * order + c]));
            }
            dest[r * order + c] = sum;
        }
    }
}

/// Execute the batched multiply over `config`'s grid.
///
/// Blocks run in parallel and so do the workers inside each block. Each
/// worker owns exactly the `order²` slice of `dest` at its batch index, so no
/// two workers ever write the same element. Workers whose index falls past
/// `batch_size` do nothing.
pub fn run_grid<T: Element>(
    a: &[T],
    b: &[T],
    dest: &mut [T],
    order: usize,
    batch_size: usize,
    config: LaunchConfig,
) {
    let m2 = order * order;
    for_each_worker(dest, m2, batch_size, config, |i, out| {
        let span = i * m2..(i + 1) * m2;
        multiply_one(&a[span.clone()], &b[span], out, order);
    });
}

/// Hand every live worker of the grid its batch index and output slice.
fn for_each_worker<T, F>(
    dest: &mut [T],
    matrix_len: usize,
    batch_size: usize,
    config: LaunchConfig,
    work: F,
) where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    if batch_size == 0 || matrix_len == 0 || config.block_dim == 0 {
        return;
    }

    dest[..batch_size * matrix_len]
        .par_chunks_mut(config.block_dim * matrix_len)
        .enumerate()
        .take(config.grid_dim)
        .for_each(|(block, block_out)| {
            block_out
                .par_chunks_mut(matrix_len)
                .enumerate()
                .for_each(|(thread, out)| work(config.worker_index(block, thread), out));
        });
}
