//! Codec capability interface and call-scoped context.

use std::any::Any;

use crate::error::CodecError;
use crate::reader::DocReader;
use crate::registry::CodecRegistry;
use crate::writer::DocWriter;

/// Call-scoped codec context: the nominal (declared) type at the current
/// serialization site and the registry in effect.
///
/// Contexts are cheap borrow bundles; nothing outlives the encode or decode
/// call that created it.
pub struct CodecCx<'c> {
    pub registry: &'c CodecRegistry,
    pub nominal: &'c str,
}

impl<'c> CodecCx<'c> {
    pub fn new(registry: &'c CodecRegistry, nominal: &'c str) -> Self {
        Self { registry, nominal }
    }

    /// Re-scopes the context to the actual runtime type of the value at hand.
    pub fn child<'a>(&'a self, actual: &'a str) -> CodecCx<'a> {
        CodecCx {
            registry: self.registry,
            nominal: actual,
        }
    }
}

/// A value codec for one runtime type.
///
/// Values cross the trait boundary as `dyn Any` so a single registry can
/// dispatch over arbitrary concrete types: a codec downcasts to its own type
/// on encode and boxes a fresh value on decode.
pub trait ValueCodec: Send + Sync {
    /// Writes `value` at the writer's current position.
    fn encode(
        &self,
        writer: &mut DocWriter,
        cx: &CodecCx<'_>,
        value: &dyn Any,
    ) -> Result<(), CodecError>;

    /// Reads a value from the reader's current position.
    fn decode(
        &self,
        reader: &mut DocReader<'_>,
        cx: &CodecCx<'_>,
    ) -> Result<Box<dyn Any>, CodecError>;
}
