//! Codecs for concrete leaf types.

use std::any::Any;

use crate::codec::{CodecCx, ValueCodec};
use crate::error::CodecError;
use crate::reader::DocReader;
use crate::values::DocValue;
use crate::writer::DocWriter;

/// Generic passthrough codec: the value *is* a [`DocValue`] tree.
pub struct DocValueCodec;

impl ValueCodec for DocValueCodec {
    fn encode(
        &self,
        writer: &mut DocWriter,
        _cx: &CodecCx<'_>,
        value: &dyn Any,
    ) -> Result<(), CodecError> {
        let value = value
            .downcast_ref::<DocValue>()
            .ok_or(CodecError::RuntimeTypeMismatch {
                expected: "DocValue",
            })?;
        writer.write_value(value);
        Ok(())
    }

    fn decode(
        &self,
        reader: &mut DocReader<'_>,
        _cx: &CodecCx<'_>,
    ) -> Result<Box<dyn Any>, CodecError> {
        Ok(Box::new(reader.read_value()?))
    }
}

/// Codec for `[f64; 3]` coordinate triples, stored as a three-element array
/// of doubles. Decoding validates the arity and accepts integer elements.
pub struct CoordTripleCodec;

impl ValueCodec for CoordTripleCodec {
    fn encode(
        &self,
        writer: &mut DocWriter,
        _cx: &CodecCx<'_>,
        value: &dyn Any,
    ) -> Result<(), CodecError> {
        let triple = value
            .downcast_ref::<[f64; 3]>()
            .ok_or(CodecError::RuntimeTypeMismatch {
                expected: "[f64; 3]",
            })?;
        writer.write_value(&DocValue::Array(
            triple.iter().map(|v| DocValue::Float(*v)).collect(),
        ));
        Ok(())
    }

    fn decode(
        &self,
        reader: &mut DocReader<'_>,
        _cx: &CodecCx<'_>,
    ) -> Result<Box<dyn Any>, CodecError> {
        let items = match reader.read_value()? {
            DocValue::Array(items) => items,
            other => {
                return Err(CodecError::ValueType {
                    expected: "array",
                    found: other.element_type(),
                })
            }
        };
        if items.len() != 3 {
            return Err(CodecError::WrongArity {
                expected: 3,
                found: items.len(),
            });
        }
        let mut out = [0f64; 3];
        for (slot, item) in out.iter_mut().zip(&items) {
            *slot = match item {
                DocValue::Float(f) => *f,
                DocValue::Int32(n) => *n as f64,
                DocValue::Int64(n) => *n as f64,
                other => {
                    return Err(CodecError::ValueType {
                        expected: "double",
                        found: other.element_type(),
                    })
                }
            };
        }
        Ok(Box::new(out))
    }
}
