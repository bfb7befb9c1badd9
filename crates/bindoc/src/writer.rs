//! Structural document writer.

use bindoc_buffers::Writer;

use crate::element::ElementType;
use crate::values::{DocValue, ObjectId};

/// Forward-oriented writer producing an encoded document.
///
/// The wire layout puts the element tag byte before the field name, but the
/// tag is only known once the value is written. `write_name` therefore parks
/// the name, and the next value write emits tag + name + value together.
///
/// Unbalanced documents and values written without a preceding `write_name`
/// are programming errors and panic.
#[derive(Default)]
pub struct DocWriter {
    w: Writer,
    pending: Option<String>,
    /// Offsets of the size placeholders of the open documents.
    starts: Vec<usize>,
}

impl DocWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks the field name for the next value write.
    pub fn write_name(&mut self, name: &str) {
        assert!(
            self.pending.is_none(),
            "write_name called twice without a value in between"
        );
        assert!(
            !self.starts.is_empty(),
            "write_name called outside of a document"
        );
        self.pending = Some(name.to_string());
    }

    /// Emits the element prefix (tag + name) for a value write.
    fn element(&mut self, t: ElementType) {
        match self.pending.take() {
            Some(name) => {
                self.w.u8(t.tag());
                self.w.cstr(&name);
            }
            None => {
                // Only the top-level document has no element prefix.
                assert!(
                    self.starts.is_empty() && t == ElementType::Document,
                    "value written without a preceding write_name"
                );
            }
        }
    }

    fn begin_sized(&mut self, t: ElementType) {
        self.element(t);
        self.starts.push(self.w.x());
        self.w.i32(0); // size placeholder
    }

    /// Opens a document, at the top level or as the parked field's value.
    pub fn write_start_document(&mut self) {
        self.begin_sized(ElementType::Document);
    }

    /// Closes the innermost open document and back-patches its size.
    pub fn write_end_document(&mut self) {
        self.w.u8(0); // terminator
        let start = match self.starts.pop() {
            Some(start) => start,
            None => panic!("write_end_document without a matching write_start_document"),
        };
        self.w.patch_i32(start, (self.w.x() - start) as i32);
    }

    pub fn write_f64(&mut self, val: f64) {
        self.element(ElementType::Float);
        self.w.f64(val);
    }

    pub fn write_str(&mut self, val: &str) {
        self.element(ElementType::Str);
        self.w.str32(val);
    }

    pub fn write_i32(&mut self, val: i32) {
        self.element(ElementType::Int32);
        self.w.i32(val);
    }

    pub fn write_i64(&mut self, val: i64) {
        self.element(ElementType::Int64);
        self.w.i64(val);
    }

    pub fn write_bool(&mut self, val: bool) {
        self.element(ElementType::Boolean);
        self.w.u8(if val { 1 } else { 0 });
    }

    pub fn write_null(&mut self) {
        self.element(ElementType::Null);
    }

    /// Writes any value generically.
    pub fn write_value(&mut self, value: &DocValue) {
        match value {
            DocValue::Float(f) => self.write_f64(*f),
            DocValue::Str(s) => self.write_str(s),
            DocValue::Document(fields) => {
                self.write_start_document();
                for (name, val) in fields {
                    self.write_name(name);
                    self.write_value(val);
                }
                self.write_end_document();
            }
            DocValue::Array(items) => {
                // An array is a document with numeric string keys.
                self.begin_sized(ElementType::Array);
                for (i, item) in items.iter().enumerate() {
                    self.write_name(&i.to_string());
                    self.write_value(item);
                }
                self.write_end_document();
            }
            DocValue::Binary(bin) => {
                self.element(ElementType::Binary);
                self.w.i32(bin.data.len() as i32);
                self.w.u8(bin.subtype);
                self.w.buf(&bin.data);
            }
            DocValue::ObjectId(id) => {
                self.element(ElementType::ObjectId);
                self.write_object_id_bytes(id);
            }
            DocValue::Boolean(b) => self.write_bool(*b),
            DocValue::DateTime(ms) => {
                self.element(ElementType::DateTime);
                self.w.i64(*ms);
            }
            DocValue::Null => self.write_null(),
            DocValue::Int32(n) => self.write_i32(*n),
            DocValue::Int64(n) => self.write_i64(*n),
            DocValue::MaxKey => self.element(ElementType::MaxKey),
            DocValue::MinKey => self.element(ElementType::MinKey),
        }
    }

    fn write_object_id_bytes(&mut self, id: &ObjectId) {
        // Timestamp: 4 bytes big-endian
        self.w.buf(&id.timestamp.to_be_bytes());
        // Process: 4 bytes LE + 1 high byte
        self.w.buf(&(id.process as u32).to_le_bytes());
        self.w.u8((id.process >> 32) as u8);
        // Counter: 3 bytes big-endian
        self.w.u8((id.counter >> 16) as u8);
        self.w.u8((id.counter >> 8) as u8);
        self.w.u8(id.counter as u8);
    }

    /// Returns the encoded bytes. Panics if a document is still open.
    pub fn into_bytes(self) -> Vec<u8> {
        assert!(
            self.starts.is_empty() && self.pending.is_none(),
            "unfinished document"
        );
        self.w.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_layout() {
        let mut w = DocWriter::new();
        w.write_start_document();
        w.write_end_document();
        // 4-byte size + terminator
        assert_eq!(w.into_bytes(), [5, 0, 0, 0, 0]);
    }

    #[test]
    fn scalar_field_layout() {
        let mut w = DocWriter::new();
        w.write_start_document();
        w.write_name("a");
        w.write_i32(1);
        w.write_end_document();
        // size(4) + tag(1) + "a\0"(2) + i32(4) + terminator(1) = 12
        assert_eq!(
            w.into_bytes(),
            [12, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0]
        );
    }

    #[test]
    fn string_field_layout() {
        let mut w = DocWriter::new();
        w.write_start_document();
        w.write_name("s");
        w.write_str("hi");
        w.write_end_document();
        assert_eq!(
            w.into_bytes(),
            [15, 0, 0, 0, 0x02, b's', 0, 3, 0, 0, 0, b'h', b'i', 0, 0]
        );
    }

    #[test]
    fn nested_document_sizes_are_patched() {
        let mut w = DocWriter::new();
        w.write_start_document();
        w.write_name("d");
        w.write_start_document();
        w.write_end_document();
        w.write_end_document();
        let bytes = w.into_bytes();
        // Outer: 4 + (1 + 2 + 5) + 1 = 13; inner: 5.
        assert_eq!(bytes[0], 13);
        assert_eq!(bytes[7], 5);
    }

    #[test]
    #[should_panic(expected = "value written without a preceding write_name")]
    fn value_without_name_panics() {
        let mut w = DocWriter::new();
        w.write_start_document();
        w.write_i32(1);
    }
}
