//! Self-describing binary document codec with discriminator-tagged
//! polymorphic values.
//!
//! A document is an ordered list of named fields in a compact little-endian
//! binary layout. When a field's declared type is a base type, the concrete
//! runtime type of its value is recoverable from the bytes alone: the value
//! is wrapped in a *tagged document* — `{<discriminator>: tag, _v: payload}`
//! — by [`DiscriminatedWrapperCodec`], which also offers a side-effect-free
//! lookahead to decide whether a position holds such a wrapper before
//! committing to a parse path.

mod codec;
mod convention;
mod element;
mod error;
mod leaf;
mod reader;
mod registry;
mod values;
mod wrapped;
mod writer;

pub use codec::{CodecCx, ValueCodec};
pub use convention::{
    DiscriminatorConvention, HierarchicalDiscriminatorConvention, ScalarDiscriminatorConvention,
    DEFAULT_DISCRIMINATOR_NAME,
};
pub use element::ElementType;
pub use error::CodecError;
pub use leaf::{CoordTripleCodec, DocValueCodec};
pub use reader::{Bookmark, DocReader, Rewind};
pub use registry::{CodecRegistry, RegistryDispatchCodec};
pub use values::{Binary, DocValue, ObjectId};
pub use wrapped::{DiscriminatedWrapperCodec, PAYLOAD_FIELD};
pub use writer::DocWriter;
