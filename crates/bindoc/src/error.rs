//! Codec error type.

use std::any::TypeId;

use thiserror::Error;

use bindoc_buffers::BufferError;

use crate::element::ElementType;
use crate::values::DocValue;

/// Error type for document codec operations.
///
/// Structural variants carry the expected and found tokens so that decode
/// failures name exactly which part of the document shape was violated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("unsupported element type: 0x{0:02x}")]
    UnsupportedType(u8),
    #[error("expected a document value, found {0:?}")]
    ExpectedDocument(ElementType),
    #[error("expected a value of type {expected}, found {found:?}")]
    ValueType {
        expected: &'static str,
        found: ElementType,
    },
    #[error("expected an array of exactly {expected} elements, found {found}")]
    WrongArity { expected: usize, found: usize },
    #[error("document ended before the expected field")]
    UnexpectedEndOfDocument,
    #[error("expected end of document, found {0:?}")]
    ExpectedEndOfDocument(ElementType),
    #[error("document size does not match its contents")]
    SizeMismatch,
    #[error("expected the first field of a tagged document to be '{expected}', not '{found}'")]
    FirstFieldName { expected: String, found: String },
    #[error("expected the second field of a tagged document to be '_v', not '{found}'")]
    SecondFieldName { found: String },
    #[error("a tagged document must contain exactly two fields, '{element_name}' and '_v'")]
    ExtraField { element_name: String },
    #[error("discriminator value {0:?} does not name a registered type")]
    UnknownDiscriminator(DocValue),
    #[error(
        "discriminator field '{element_name}' holds a {found:?}, expected a string or an array of strings"
    )]
    BadDiscriminator {
        element_name: String,
        found: ElementType,
    },
    #[error("no codec registered for type '{0}'")]
    NoCodecForType(String),
    #[error("runtime type {0:?} was never registered")]
    UnregisteredRuntimeType(TypeId),
    #[error("codec for '{expected}' received a value of a different runtime type")]
    RuntimeTypeMismatch { expected: &'static str },
}
