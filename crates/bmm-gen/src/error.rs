use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("empty value range: min {min} > max {max}")]
    EmptyRange { min: i32, max: i32 },
    #[error("batch error: {0}")]
    Batch(#[from] bmm_core::OffloadError),
}

pub type Result<T> = std::result::Result<T, GenError>;
