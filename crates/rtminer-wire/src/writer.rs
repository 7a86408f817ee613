//! Stream encoder for the value shapes the client sends.

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};

use crate::constants::*;
use crate::error::{CodecError, CodecResult};
use crate::mutf8;
use crate::value::Value;

/// Static description of a class the writer knows how to emit.
#[derive(Debug)]
struct ClassSpec {
    name: &'static str,
    uid: i64,
    flags: u8,
    fields: &'static [(u8, &'static str)],
    super_class: Option<&'static ClassSpec>,
}

static NUMBER: ClassSpec = ClassSpec {
    name: NUMBER_CLASS,
    uid: NUMBER_UID,
    flags: SC_SERIALIZABLE,
    fields: &[],
    super_class: None,
};

static INTEGER: ClassSpec = ClassSpec {
    name: INTEGER_CLASS,
    uid: INTEGER_UID,
    flags: SC_SERIALIZABLE,
    fields: &[(b'I', "value")],
    super_class: Some(&NUMBER),
};

static LINKED_LIST: ClassSpec = ClassSpec {
    name: LINKED_LIST_CLASS,
    uid: LINKED_LIST_UID,
    flags: SC_SERIALIZABLE | SC_WRITE_METHOD,
    fields: &[],
    super_class: None,
};

/// Encodes values into a serialization stream.
///
/// Class descriptors are written once and referenced afterwards, so a
/// writer must be kept for the lifetime of the stream it feeds.
#[derive(Debug)]
pub struct ObjectWriter {
    next_handle: u32,
    class_handles: HashMap<&'static str, u32>,
}

impl Default for ObjectWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectWriter {
    /// Creates a writer with an empty handle table.
    pub fn new() -> Self {
        Self {
            next_handle: BASE_WIRE_HANDLE,
            class_handles: HashMap::new(),
        }
    }

    /// Writes the stream header.
    pub fn write_header(&self, buf: &mut BytesMut) {
        buf.put_u16(STREAM_MAGIC);
        buf.put_u16(STREAM_VERSION);
    }

    /// Writes a reset marker and forgets every assigned handle.
    pub fn reset(&mut self, buf: &mut BytesMut) {
        buf.put_u8(TC_RESET);
        self.next_handle = BASE_WIRE_HANDLE;
        self.class_handles.clear();
    }

    /// Appends `value` to `buf`.
    ///
    /// Strings, integers, lists and null are supported.
    pub fn encode(&mut self, value: &Value, buf: &mut BytesMut) -> CodecResult<()> {
        match value {
            Value::Null => buf.put_u8(TC_NULL),
            Value::String(s) => self.write_string(s, buf),
            Value::Integer(n) => {
                buf.put_u8(TC_OBJECT);
                self.write_class_desc(&INTEGER, buf);
                self.assign();
                buf.put_i32(*n);
            }
            Value::List(items) => {
                buf.put_u8(TC_OBJECT);
                self.write_class_desc(&LINKED_LIST, buf);
                self.assign();
                buf.put_u8(TC_BLOCKDATA);
                buf.put_u8(4);
                buf.put_i32(i32::try_from(items.len()).map_err(|_| CodecError::TooLarge {
                    what: "list",
                    len: items.len() as u64,
                    max: i32::MAX as usize,
                })?);
                for item in items {
                    self.encode(item, buf)?;
                }
                buf.put_u8(TC_ENDBLOCKDATA);
            }
            other => return Err(CodecError::Unencodable(other.type_name())),
        }
        Ok(())
    }

    fn assign(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn write_string(&mut self, s: &str, buf: &mut BytesMut) {
        let bytes = mutf8::encode(s);
        match u16::try_from(bytes.len()) {
            Ok(len) => {
                buf.put_u8(TC_STRING);
                buf.put_u16(len);
            }
            Err(_) => {
                buf.put_u8(TC_LONGSTRING);
                buf.put_u64(bytes.len() as u64);
            }
        }
        buf.put_slice(&bytes);
        self.assign();
    }

    fn write_utf(name: &str, buf: &mut BytesMut) {
        let bytes = mutf8::encode(name);
        buf.put_u16(bytes.len() as u16);
        buf.put_slice(&bytes);
    }

    fn write_class_desc(&mut self, spec: &'static ClassSpec, buf: &mut BytesMut) {
        if let Some(&handle) = self.class_handles.get(spec.name) {
            buf.put_u8(TC_REFERENCE);
            buf.put_u32(handle);
            return;
        }
        buf.put_u8(TC_CLASSDESC);
        Self::write_utf(spec.name, buf);
        buf.put_i64(spec.uid);
        let handle = self.assign();
        self.class_handles.insert(spec.name, handle);
        buf.put_u8(spec.flags);
        buf.put_u16(spec.fields.len() as u16);
        for (type_code, name) in spec.fields {
            buf.put_u8(*type_code);
            Self::write_utf(name, buf);
        }
        buf.put_u8(TC_ENDBLOCKDATA);
        match spec.super_class {
            Some(parent) => self.write_class_desc(parent, buf),
            None => buf.put_u8(TC_NULL),
        }
    }
}
