use thiserror::Error;

/// Error type for buffer read operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("unexpected end of input")]
    EndOfBuffer,
    #[error("invalid UTF-8")]
    InvalidUtf8,
}
