//! Explicit codec registry.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::{CodecCx, ValueCodec};
use crate::error::CodecError;
use crate::reader::DocReader;
use crate::writer::DocWriter;

/// Maps registered type names to codecs, and runtime `TypeId`s back to their
/// registered names.
///
/// The registry is a plain value passed by reference into codecs; there is no
/// global registration.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn ValueCodec>>,
    names: HashMap<TypeId, String>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `codec` for the runtime type `T` under `name`.
    pub fn register<T: Any>(&mut self, name: impl Into<String>, codec: Arc<dyn ValueCodec>) {
        let name = name.into();
        self.names.insert(TypeId::of::<T>(), name.clone());
        self.codecs.insert(name, codec);
    }

    /// Whether `name` names a registered type.
    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    /// The codec registered under `name`.
    pub fn codec_for(&self, name: &str) -> Result<&dyn ValueCodec, CodecError> {
        self.codecs
            .get(name)
            .map(|c| c.as_ref())
            .ok_or_else(|| CodecError::NoCodecForType(name.to_string()))
    }

    /// The registered name of a runtime type.
    pub fn name_of(&self, type_id: TypeId) -> Result<&str, CodecError> {
        self.names
            .get(&type_id)
            .map(String::as_str)
            .ok_or(CodecError::UnregisteredRuntimeType(type_id))
    }
}

/// Codec that dispatches to the registered codec for the value's runtime type
/// on encode, and for the context's nominal type on decode.
///
/// Useful as the wrapped codec of a discriminated wrapper whose nominal type
/// is a base type with several registered concrete types.
pub struct RegistryDispatchCodec;

impl ValueCodec for RegistryDispatchCodec {
    fn encode(
        &self,
        writer: &mut DocWriter,
        cx: &CodecCx<'_>,
        value: &dyn Any,
    ) -> Result<(), CodecError> {
        let name = cx.registry.name_of(value.type_id())?;
        cx.registry.codec_for(name)?.encode(writer, cx, value)
    }

    fn decode(
        &self,
        reader: &mut DocReader<'_>,
        cx: &CodecCx<'_>,
    ) -> Result<Box<dyn Any>, CodecError> {
        cx.registry.codec_for(cx.nominal)?.decode(reader, cx)
    }
}
