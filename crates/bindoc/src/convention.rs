//! Discriminator conventions.
//!
//! A convention owns the discriminator field name and the mapping between
//! runtime type names and the opaque discriminator values stored in tagged
//! documents. The wrapper codec never interprets a discriminator itself.

use std::collections::HashMap;

use crate::element::ElementType;
use crate::error::CodecError;
use crate::reader::DocReader;
use crate::registry::CodecRegistry;
use crate::values::DocValue;

/// Default discriminator field name.
pub const DEFAULT_DISCRIMINATOR_NAME: &str = "_t";

/// Decides which concrete runtime type applies at a polymorphic site, and
/// what discriminator value to emit for it.
pub trait DiscriminatorConvention: Send + Sync {
    /// The discriminator field name this convention reads and writes.
    fn element_name(&self) -> &str;

    /// Resolves the actual runtime type of the value the reader is positioned
    /// at, given the nominal (declared) type of the site.
    ///
    /// The discriminator is consumed logically here, in the same forward pass
    /// the wrapper codec later drives over the document; the wrapper only
    /// skips its bytes afterwards. Implementations must leave the reader
    /// where they found it.
    fn actual_type(
        &self,
        reader: &mut DocReader<'_>,
        registry: &CodecRegistry,
        nominal: &str,
    ) -> Result<String, CodecError>;

    /// The opaque discriminator to emit for `actual` at a site declared as
    /// `nominal`.
    fn discriminator(&self, nominal: &str, actual: &str) -> DocValue;
}

/// Looks for the discriminator field in the document at the cursor and maps
/// it to a registered type name; falls back to the nominal type when the
/// value is not a document or carries no discriminator.
fn scan_actual_type(
    element_name: &str,
    reader: &mut DocReader<'_>,
    registry: &CodecRegistry,
    nominal: &str,
) -> Result<String, CodecError> {
    let mut r = reader.rewinding();
    if r.read_type()? != ElementType::Document {
        return Ok(nominal.to_string());
    }
    r.read_start_document()?;
    while r.read_type()? != ElementType::EndOfDocument {
        let name = r.read_name()?;
        if name == element_name {
            let value = r.read_value()?;
            return resolve_discriminator(element_name, registry, value);
        }
        r.skip_value()?;
    }
    Ok(nominal.to_string())
}

/// Maps an already-read discriminator value to a registered type name.
///
/// Accepts a string, or an array of strings denoting a type-hierarchy path
/// whose last element is the concrete type.
fn resolve_discriminator(
    element_name: &str,
    registry: &CodecRegistry,
    value: DocValue,
) -> Result<String, CodecError> {
    let actual = match value {
        DocValue::Str(s) => s,
        DocValue::Array(items) => match items.last() {
            Some(DocValue::Str(s)) => s.clone(),
            _ => return Err(CodecError::UnknownDiscriminator(DocValue::Array(items))),
        },
        other => {
            return Err(CodecError::BadDiscriminator {
                element_name: element_name.to_string(),
                found: other.element_type(),
            })
        }
    };
    if !registry.contains(&actual) {
        return Err(CodecError::UnknownDiscriminator(DocValue::Str(actual)));
    }
    Ok(actual)
}

/// Convention that stores the concrete type name as a plain string.
pub struct ScalarDiscriminatorConvention {
    element_name: String,
}

impl ScalarDiscriminatorConvention {
    pub fn new(element_name: impl Into<String>) -> Self {
        Self {
            element_name: element_name.into(),
        }
    }
}

impl Default for ScalarDiscriminatorConvention {
    fn default() -> Self {
        Self::new(DEFAULT_DISCRIMINATOR_NAME)
    }
}

impl DiscriminatorConvention for ScalarDiscriminatorConvention {
    fn element_name(&self) -> &str {
        &self.element_name
    }

    fn actual_type(
        &self,
        reader: &mut DocReader<'_>,
        registry: &CodecRegistry,
        nominal: &str,
    ) -> Result<String, CodecError> {
        scan_actual_type(&self.element_name, reader, registry, nominal)
    }

    fn discriminator(&self, _nominal: &str, actual: &str) -> DocValue {
        DocValue::Str(actual.to_string())
    }
}

/// Convention that stores the full type-hierarchy path as an array of
/// strings, base-most first, and resolves by the last element.
pub struct HierarchicalDiscriminatorConvention {
    element_name: String,
    paths: HashMap<String, Vec<String>>,
}

impl HierarchicalDiscriminatorConvention {
    pub fn new(element_name: impl Into<String>) -> Self {
        Self {
            element_name: element_name.into(),
            paths: HashMap::new(),
        }
    }

    /// Declares the hierarchy path of a type, base-most first; the last
    /// element is the type's own name. Types without a declared path fall
    /// back to a plain string discriminator.
    pub fn with_path(mut self, path: &[&str]) -> Self {
        if let Some(last) = path.last() {
            self.paths.insert(
                (*last).to_string(),
                path.iter().map(|s| (*s).to_string()).collect(),
            );
        }
        self
    }
}

impl DiscriminatorConvention for HierarchicalDiscriminatorConvention {
    fn element_name(&self) -> &str {
        &self.element_name
    }

    fn actual_type(
        &self,
        reader: &mut DocReader<'_>,
        registry: &CodecRegistry,
        nominal: &str,
    ) -> Result<String, CodecError> {
        scan_actual_type(&self.element_name, reader, registry, nominal)
    }

    fn discriminator(&self, _nominal: &str, actual: &str) -> DocValue {
        match self.paths.get(actual) {
            Some(path) => {
                DocValue::Array(path.iter().map(|s| DocValue::Str(s.clone())).collect())
            }
            None => DocValue::Str(actual.to_string()),
        }
    }
}
