use thiserror::Error;

pub type QuantResult<T> = Result<T, QuantError>;

#[derive(Debug, Error)]
pub enum QuantError {
    #[error("Shape mismatch for {buffer}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        buffer: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Block alignment error: {0}")]
    BlockAlignment(String),

    #[error("Unsupported block axis for {op}: {axis}")]
    UnsupportedAxis { op: &'static str, axis: String },

    #[error("Zero point error: {0}")]
    ZeroPoint(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}
