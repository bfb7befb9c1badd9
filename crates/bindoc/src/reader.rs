//! Structural document reader.
//!
//! `DocReader` exposes the stream as structural tokens (document start/end,
//! element type, field name, value) over a forward byte cursor, plus a
//! bookmark primitive for non-destructive lookahead.

use std::ops::{Deref, DerefMut};

use bindoc_buffers::Reader;

use crate::element::ElementType;
use crate::error::CodecError;
use crate::values::{Binary, DocValue, ObjectId};

/// Forward-oriented reader over an encoded document.
///
/// The reader is positioned at a value; `read_type` reports that value's
/// element type without consuming it (the tag byte is cached once read), and
/// the value reads and `skip_value` consume it. A freshly constructed reader
/// is positioned at the top-level document.
pub struct DocReader<'a> {
    r: Reader<'a>,
    /// Element type of the value at the cursor, once its tag byte is read.
    current: Option<ElementType>,
    /// Exclusive end offsets of the open documents, outermost first.
    ends: Vec<usize>,
}

/// Opaque snapshot of a reader's position.
///
/// Captured with [`DocReader::bookmark`] and applied with
/// [`DocReader::restore`]; restoring undoes every read performed since the
/// capture.
#[derive(Debug, Clone)]
pub struct Bookmark {
    x: usize,
    current: Option<ElementType>,
    ends: Vec<usize>,
}

impl<'a> DocReader<'a> {
    /// Creates a reader positioned at the top-level document of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            r: Reader::new(data),
            current: Some(ElementType::Document),
            ends: Vec::new(),
        }
    }

    /// Byte offset of the cursor.
    pub fn pos(&self) -> usize {
        self.r.x
    }

    /// Element type of the value the cursor is positioned at.
    ///
    /// Reads the tag byte on first call and caches it; the cursor is
    /// logically still positioned at the same value until the value itself is
    /// consumed. Returns [`ElementType::EndOfDocument`] at a document
    /// terminator.
    pub fn read_type(&mut self) -> Result<ElementType, CodecError> {
        if let Some(t) = self.current {
            return Ok(t);
        }
        let t = ElementType::from_u8(self.r.u8()?)?;
        self.current = Some(t);
        Ok(t)
    }

    /// Reads the current element's field name.
    pub fn read_name(&mut self) -> Result<&'a str, CodecError> {
        match self.read_type()? {
            ElementType::EndOfDocument => Err(CodecError::UnexpectedEndOfDocument),
            _ => Ok(self.r.cstr()?),
        }
    }

    /// Opens the document (or array) the cursor is positioned at.
    pub fn read_start_document(&mut self) -> Result<(), CodecError> {
        match self.read_type()? {
            ElementType::Document | ElementType::Array => {}
            t => return Err(CodecError::ExpectedDocument(t)),
        }
        let start = self.r.x;
        let size = self.r.i32()?;
        // Minimum document: size field + terminator.
        if size < 5 {
            return Err(CodecError::SizeMismatch);
        }
        let end = start + size as usize;
        if end > self.r.uint8.len() {
            return Err(bindoc_buffers::BufferError::EndOfBuffer.into());
        }
        self.ends.push(end);
        self.current = None;
        Ok(())
    }

    /// Closes the innermost open document. The cursor must be at its
    /// terminator.
    pub fn read_end_document(&mut self) -> Result<(), CodecError> {
        match self.read_type()? {
            ElementType::EndOfDocument => {}
            t => return Err(CodecError::ExpectedEndOfDocument(t)),
        }
        // read_type consumed the terminator byte.
        let end = self.ends.pop().ok_or(CodecError::SizeMismatch)?;
        if self.r.x != end {
            return Err(CodecError::SizeMismatch);
        }
        self.current = None;
        Ok(())
    }

    fn expect_type(
        &mut self,
        expected: ElementType,
        name: &'static str,
    ) -> Result<(), CodecError> {
        let t = self.read_type()?;
        if t != expected {
            return Err(CodecError::ValueType {
                expected: name,
                found: t,
            });
        }
        self.current = None;
        Ok(())
    }

    /// Reads a string value.
    pub fn read_str(&mut self) -> Result<&'a str, CodecError> {
        self.expect_type(ElementType::Str, "string")?;
        self.read_str_bytes()
    }

    fn read_str_bytes(&mut self) -> Result<&'a str, CodecError> {
        let len = self.r.i32()?;
        if len < 1 {
            return Err(CodecError::SizeMismatch);
        }
        let s = self.r.utf8(len as usize - 1)?; // length includes the terminator
        self.r.skip(1)?;
        Ok(s)
    }

    /// Reads a 64-bit float value.
    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        self.expect_type(ElementType::Float, "double")?;
        Ok(self.r.f64()?)
    }

    /// Reads a 32-bit integer value.
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.expect_type(ElementType::Int32, "int32")?;
        Ok(self.r.i32()?)
    }

    /// Reads a 64-bit integer value.
    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        self.expect_type(ElementType::Int64, "int64")?;
        Ok(self.r.i64()?)
    }

    /// Reads a boolean value.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        self.expect_type(ElementType::Boolean, "boolean")?;
        Ok(self.r.u8()? == 1)
    }

    /// Reads any value generically.
    pub fn read_value(&mut self) -> Result<DocValue, CodecError> {
        match self.read_type()? {
            ElementType::EndOfDocument => Err(CodecError::UnexpectedEndOfDocument),
            ElementType::Float => {
                self.current = None;
                Ok(DocValue::Float(self.r.f64()?))
            }
            ElementType::Str => {
                self.current = None;
                Ok(DocValue::Str(self.read_str_bytes()?.to_string()))
            }
            ElementType::Document => {
                self.read_start_document()?;
                let mut fields = Vec::new();
                while self.read_type()? != ElementType::EndOfDocument {
                    let name = self.read_name()?.to_string();
                    fields.push((name, self.read_value()?));
                }
                self.read_end_document()?;
                Ok(DocValue::Document(fields))
            }
            ElementType::Array => {
                self.read_start_document()?;
                let mut items = Vec::new();
                while self.read_type()? != ElementType::EndOfDocument {
                    // Index keys are positional on the wire.
                    self.read_name()?;
                    items.push(self.read_value()?);
                }
                self.read_end_document()?;
                Ok(DocValue::Array(items))
            }
            ElementType::Binary => {
                self.current = None;
                let len = self.r.i32()?;
                if len < 0 {
                    return Err(CodecError::SizeMismatch);
                }
                let subtype = self.r.u8()?;
                let data = self.r.buf(len as usize)?.to_vec();
                Ok(DocValue::Binary(Binary { subtype, data }))
            }
            ElementType::ObjectId => {
                self.current = None;
                Ok(DocValue::ObjectId(self.read_object_id_bytes()?))
            }
            ElementType::Boolean => {
                self.current = None;
                Ok(DocValue::Boolean(self.r.u8()? == 1))
            }
            ElementType::DateTime => {
                self.current = None;
                Ok(DocValue::DateTime(self.r.i64()?))
            }
            ElementType::Null => {
                self.current = None;
                Ok(DocValue::Null)
            }
            ElementType::Int32 => {
                self.current = None;
                Ok(DocValue::Int32(self.r.i32()?))
            }
            ElementType::Int64 => {
                self.current = None;
                Ok(DocValue::Int64(self.r.i64()?))
            }
            ElementType::MaxKey => {
                self.current = None;
                Ok(DocValue::MaxKey)
            }
            ElementType::MinKey => {
                self.current = None;
                Ok(DocValue::MinKey)
            }
        }
    }

    fn read_object_id_bytes(&mut self) -> Result<ObjectId, CodecError> {
        let bytes = self.r.buf(12)?;
        // Timestamp: 4 bytes big-endian
        let timestamp = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        // Process: 4 bytes LE + 1 high byte
        let lo32 = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as u64;
        let process = lo32 | ((bytes[8] as u64) << 32);
        // Counter: 3 bytes big-endian
        let counter =
            ((bytes[9] as u32) << 16) | ((bytes[10] as u32) << 8) | (bytes[11] as u32);
        Ok(ObjectId {
            timestamp,
            process,
            counter,
        })
    }

    /// Skips the value the cursor is positioned at without decoding it.
    pub fn skip_value(&mut self) -> Result<(), CodecError> {
        match self.read_type()? {
            ElementType::EndOfDocument => return Err(CodecError::UnexpectedEndOfDocument),
            ElementType::Float | ElementType::DateTime | ElementType::Int64 => {
                self.r.skip(8)?
            }
            ElementType::Int32 => self.r.skip(4)?,
            ElementType::Boolean => self.r.skip(1)?,
            ElementType::Null | ElementType::MinKey | ElementType::MaxKey => {}
            ElementType::ObjectId => self.r.skip(12)?,
            ElementType::Str => {
                let len = self.r.i32()?;
                if len < 1 {
                    return Err(CodecError::SizeMismatch);
                }
                self.r.skip(len as usize)?;
            }
            ElementType::Document | ElementType::Array => {
                let size = self.r.i32()?;
                if size < 5 {
                    return Err(CodecError::SizeMismatch);
                }
                self.r.skip(size as usize - 4)?;
            }
            ElementType::Binary => {
                let len = self.r.i32()?;
                if len < 0 {
                    return Err(CodecError::SizeMismatch);
                }
                self.r.skip(len as usize + 1)?; // subtype byte + data
            }
        }
        self.current = None;
        Ok(())
    }

    /// Captures the reader's position.
    pub fn bookmark(&self) -> Bookmark {
        Bookmark {
            x: self.r.x,
            current: self.current,
            ends: self.ends.clone(),
        }
    }

    /// Restores a previously captured position, undoing all reads performed
    /// since the capture.
    pub fn restore(&mut self, bookmark: &Bookmark) {
        self.r.x = bookmark.x;
        self.current = bookmark.current;
        self.ends = bookmark.ends.clone();
    }

    /// Returns a guard that restores the current position when dropped.
    ///
    /// All reads performed through the guard are undone on every exit path,
    /// including early returns and unwinding, which makes speculative
    /// inspection side-effect-free for the caller.
    pub fn rewinding(&mut self) -> Rewind<'_, 'a> {
        let bookmark = self.bookmark();
        Rewind {
            reader: self,
            bookmark,
        }
    }
}

/// Scoped rewind guard returned by [`DocReader::rewinding`].
pub struct Rewind<'r, 'a> {
    reader: &'r mut DocReader<'a>,
    bookmark: Bookmark,
}

impl<'r, 'a> Deref for Rewind<'r, 'a> {
    type Target = DocReader<'a>;

    fn deref(&self) -> &Self::Target {
        self.reader
    }
}

impl<'r, 'a> DerefMut for Rewind<'r, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.reader
    }
}

impl<'r, 'a> Drop for Rewind<'r, 'a> {
    fn drop(&mut self) {
        self.reader.restore(&self.bookmark);
    }
}
