//! Discriminated wrapper codec.
//!
//! A tagged document wraps a polymorphic value in a two-field document:
//!
//! ```text
//! { <discriminator field>: <opaque discriminator>, "_v": <payload> }
//! ```
//!
//! Exactly two fields, in exactly that order. The discriminator identifies
//! the concrete runtime type so it can be recovered from the bytes alone
//! when the declared field type is a base type; the payload is encoded by
//! that type's own codec. Any deviation from the shape is a format error,
//! never a silent fallback.

use std::any::Any;
use std::sync::Arc;

use crate::codec::{CodecCx, ValueCodec};
use crate::convention::DiscriminatorConvention;
use crate::element::ElementType;
use crate::error::CodecError;
use crate::reader::DocReader;
use crate::writer::DocWriter;

/// Reserved name of the payload field. Not configurable.
pub const PAYLOAD_FIELD: &str = "_v";

/// Codec that encodes values as discriminator/payload pairs.
///
/// Immutable after construction; holds no per-call state, so one instance
/// may be shared across threads operating on distinct readers and writers.
pub struct DiscriminatedWrapperCodec {
    convention: Arc<dyn DiscriminatorConvention>,
    wrapped: Arc<dyn ValueCodec>,
}

impl DiscriminatedWrapperCodec {
    /// Creates a wrapper codec around `wrapped`, the codec used to write
    /// payloads on encode.
    pub fn new(
        convention: Arc<dyn DiscriminatorConvention>,
        wrapped: Arc<dyn ValueCodec>,
    ) -> Self {
        Self {
            convention,
            wrapped,
        }
    }

    /// Decodes a tagged document into a value of the actual type named by its
    /// discriminator.
    pub fn decode(
        &self,
        reader: &mut DocReader<'_>,
        cx: &CodecCx<'_>,
    ) -> Result<Box<dyn Any>, CodecError> {
        let actual = self
            .convention
            .actual_type(reader, cx.registry, cx.nominal)?;

        reader.read_start_document()?;

        if reader.read_type()? == ElementType::EndOfDocument {
            return Err(CodecError::UnexpectedEndOfDocument);
        }
        let first = reader.read_name()?;
        if first != self.convention.element_name() {
            return Err(CodecError::FirstFieldName {
                expected: self.convention.element_name().to_string(),
                found: first.to_string(),
            });
        }
        // The resolver already interpreted the discriminator in this same
        // forward pass; only its bytes remain to be passed over.
        reader.skip_value()?;

        if reader.read_type()? == ElementType::EndOfDocument {
            return Err(CodecError::UnexpectedEndOfDocument);
        }
        let second = reader.read_name()?;
        if second != PAYLOAD_FIELD {
            return Err(CodecError::SecondFieldName {
                found: second.to_string(),
            });
        }
        let value = cx
            .registry
            .codec_for(&actual)?
            .decode(reader, &cx.child(&actual))?;

        if reader.read_type()? != ElementType::EndOfDocument {
            return Err(CodecError::ExtraField {
                element_name: self.convention.element_name().to_string(),
            });
        }
        reader.read_end_document()?;

        Ok(value)
    }

    /// Encodes `value` as a tagged document under the context's nominal type.
    pub fn encode(
        &self,
        writer: &mut DocWriter,
        cx: &CodecCx<'_>,
        value: &dyn Any,
    ) -> Result<(), CodecError> {
        let actual = cx.registry.name_of(value.type_id())?.to_string();
        let discriminator = self.convention.discriminator(cx.nominal, &actual);

        writer.write_start_document();
        writer.write_name(self.convention.element_name());
        writer.write_value(&discriminator);
        writer.write_name(PAYLOAD_FIELD);
        self.wrapped.encode(writer, &cx.child(&actual), value)?;
        writer.write_end_document();
        Ok(())
    }

    /// Whether the reader is positioned at a structurally valid tagged
    /// document.
    ///
    /// Purely structural: field names and arity are checked, type resolution
    /// is not attempted. Structural mismatches yield `Ok(false)`; errors that
    /// indicate stream corruption (truncation, invalid UTF-8, unknown element
    /// tags) propagate. The reader's position is restored on every exit path.
    pub fn is_positioned_at_wrapper(
        &self,
        reader: &mut DocReader<'_>,
    ) -> Result<bool, CodecError> {
        let mut r = reader.rewinding();
        if r.read_type()? != ElementType::Document {
            return Ok(false);
        }
        r.read_start_document()?;
        if r.read_type()? == ElementType::EndOfDocument {
            return Ok(false);
        }
        if r.read_name()? != self.convention.element_name() {
            return Ok(false);
        }
        r.skip_value()?;
        if r.read_type()? == ElementType::EndOfDocument {
            return Ok(false);
        }
        if r.read_name()? != PAYLOAD_FIELD {
            return Ok(false);
        }
        r.skip_value()?;
        Ok(r.read_type()? == ElementType::EndOfDocument)
    }
}

impl ValueCodec for DiscriminatedWrapperCodec {
    fn encode(
        &self,
        writer: &mut DocWriter,
        cx: &CodecCx<'_>,
        value: &dyn Any,
    ) -> Result<(), CodecError> {
        DiscriminatedWrapperCodec::encode(self, writer, cx, value)
    }

    fn decode(
        &self,
        reader: &mut DocReader<'_>,
        cx: &CodecCx<'_>,
    ) -> Result<Box<dyn Any>, CodecError> {
        DiscriminatedWrapperCodec::decode(self, reader, cx)
    }
}
