//! Low-level binary buffer primitives for the bindoc document format.
//!
//! The document format is little-endian, so all multi-byte reads and writes
//! here are little-endian.

mod error;
mod reader;
mod writer;

pub use error::BufferError;
pub use reader::Reader;
pub use writer::Writer;
