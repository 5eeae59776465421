pub mod error;
pub mod format;
pub mod generator;

pub use error::{GenError, Result};
pub use format::{format_matrix, render_triples};
pub use generator::{identity_batch, MatrixGenerator};
