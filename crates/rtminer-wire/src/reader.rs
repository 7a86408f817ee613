//! Stream decoder.

use std::io::{self, Read};
use std::sync::Arc;

use crate::constants::*;
use crate::error::{CodecError, CodecResult};
use crate::mutf8;
use crate::value::{Annotation, Object, Primitive, Value};

#[derive(Debug)]
struct FieldDesc {
    type_code: u8,
    name: String,
}

#[derive(Debug)]
struct ClassDesc {
    name: String,
    flags: u8,
    fields: Vec<FieldDesc>,
    super_desc: Option<Arc<ClassDesc>>,
    /// Descriptors in the superclass chain, this one included.
    chain_len: usize,
}

impl ClassDesc {
    /// Descriptors from the topmost superclass down to `self`.
    fn hierarchy(self: &Arc<Self>) -> Vec<Arc<ClassDesc>> {
        let mut chain = vec![Arc::clone(self)];
        let mut current = self.super_desc.clone();
        while let Some(desc) = current {
            current = desc.super_desc.clone();
            chain.push(desc);
        }
        chain.reverse();
        chain
    }
}

#[derive(Debug)]
enum Handle {
    /// Assigned but still being read.
    Pending,
    Desc(Arc<ClassDesc>),
    /// A finished value and the number of nodes it spans.
    Value(Value, usize),
}

/// Reads values from a serialization stream.
///
/// The handle table lives as long as the reader, so one reader must be used
/// for the whole stream.
#[derive(Debug)]
pub struct ObjectReader<R> {
    input: R,
    handles: Vec<Handle>,
    depth: usize,
    /// Nodes produced by the current top-level read.
    nodes: usize,
}

impl<R: Read> ObjectReader<R> {
    /// Wraps a byte source positioned at the stream header.
    pub fn new(input: R) -> Self {
        Self {
            input,
            handles: Vec::new(),
            depth: 0,
            nodes: 0,
        }
    }

    /// Reads and validates the four-byte stream header.
    pub fn read_header(&mut self) -> CodecResult<()> {
        let magic = self.read_u16()?;
        let version = self.read_u16()?;
        if magic != STREAM_MAGIC || version != STREAM_VERSION {
            return Err(CodecError::BadHeader { magic, version });
        }
        Ok(())
    }

    /// Reads the next top-level value.
    pub fn read_value(&mut self) -> CodecResult<Value> {
        self.nodes = 0;
        loop {
            let tc = self.read_u8()?;
            match tc {
                TC_RESET => self.handles.clear(),
                TC_BLOCKDATA | TC_BLOCKDATALONG => {
                    return Err(CodecError::Unsupported(
                        "primitive data outside an object".into(),
                    ));
                }
                _ => return self.read_content(tc),
            }
        }
    }

    /// Borrows the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.input
    }

    /// Mutably borrows the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.input
    }

    /// Unwraps the underlying source.
    pub fn into_inner(self) -> R {
        self.input
    }

    fn read_content(&mut self, tc: u8) -> CodecResult<Value> {
        self.nested(|r| r.read_content_inner(tc))
    }

    /// Runs `read` one level deeper, failing past [`MAX_DEPTH`].
    fn nested<T>(&mut self, read: impl FnOnce(&mut Self) -> CodecResult<T>) -> CodecResult<T> {
        self.depth += 1;
        let result = if self.depth > MAX_DEPTH {
            Err(CodecError::TooDeep(MAX_DEPTH))
        } else {
            read(self)
        };
        self.depth -= 1;
        result
    }

    fn charge(&mut self, nodes: usize) -> CodecResult<()> {
        self.nodes = add_nodes(self.nodes, nodes)?;
        Ok(())
    }

    fn read_content_inner(&mut self, tc: u8) -> CodecResult<Value> {
        match tc {
            TC_NULL => {
                self.charge(1)?;
                Ok(Value::Null)
            }
            TC_REFERENCE => self.read_reference(),
            TC_STRING | TC_LONGSTRING => {
                self.charge(1)?;
                Ok(Value::String(self.read_new_string(tc)?))
            }
            TC_OBJECT => self.read_new_object(),
            TC_ARRAY => self.read_new_array(),
            TC_ENUM => self.read_new_enum(),
            TC_CLASS => {
                let desc = self.read_required_desc()?;
                self.charge(1)?;
                let value = Value::Class(desc.name.clone());
                self.handles.push(Handle::Value(value.clone(), 1));
                Ok(value)
            }
            TC_CLASSDESC | TC_PROXYCLASSDESC => Err(CodecError::Unsupported(
                "class descriptor as a value".into(),
            )),
            TC_EXCEPTION => Err(CodecError::Unsupported(
                "exception written by the peer during serialization".into(),
            )),
            code => Err(CodecError::UnexpectedTypeCode {
                code,
                context: "content",
            }),
        }
    }

    fn read_reference(&mut self) -> CodecResult<Value> {
        let idx = self.lookup()?;
        match &self.handles[idx] {
            // Charged before the clone
            Handle::Value(v, size) => {
                self.nodes = add_nodes(self.nodes, *size)?;
                Ok(v.clone())
            }
            Handle::Desc(_) => Err(CodecError::Unsupported(
                "class descriptor as a value".into(),
            )),
            Handle::Pending => Err(CodecError::Unsupported(
                "reference to an object still being read".into(),
            )),
        }
    }

    /// Reads a wire handle and returns its index in the handle table.
    fn lookup(&mut self) -> CodecResult<usize> {
        let raw = self.read_u32()?;
        raw.checked_sub(BASE_WIRE_HANDLE)
            .map(|idx| idx as usize)
            .filter(|&idx| idx < self.handles.len())
            .ok_or(CodecError::UnknownHandle(raw))
    }

    fn reserve(&mut self) -> usize {
        self.handles.push(Handle::Pending);
        self.handles.len() - 1
    }

    fn read_new_string(&mut self, tc: u8) -> CodecResult<String> {
        let len = if tc == TC_STRING {
            u64::from(self.read_u16()?)
        } else {
            let len = self.read_i64()?;
            u64::try_from(len).map_err(|_| CodecError::TooLarge {
                what: "string",
                len: len as u64,
                max: MAX_CHUNK_LEN,
            })?
        };
        let bytes = self.read_chunk("string", len)?;
        let s = mutf8::decode(&bytes)?;
        self.handles.push(Handle::Value(Value::String(s.clone()), 1));
        Ok(s)
    }

    fn read_utf(&mut self) -> CodecResult<String> {
        let len = self.read_u16()?;
        let bytes = self.read_chunk("string", u64::from(len))?;
        mutf8::decode(&bytes)
    }

    fn read_desc(&mut self) -> CodecResult<Option<Arc<ClassDesc>>> {
        match self.read_u8()? {
            TC_NULL => Ok(None),
            TC_REFERENCE => {
                let idx = self.lookup()?;
                match &self.handles[idx] {
                    Handle::Desc(desc) => Ok(Some(Arc::clone(desc))),
                    _ => Err(CodecError::mismatch("class descriptor", "other handle")),
                }
            }
            TC_CLASSDESC => self.read_new_desc().map(Some),
            TC_PROXYCLASSDESC => Err(CodecError::Unsupported("proxy class".into())),
            code => Err(CodecError::UnexpectedTypeCode {
                code,
                context: "class descriptor",
            }),
        }
    }

    fn read_required_desc(&mut self) -> CodecResult<Arc<ClassDesc>> {
        self.read_desc()?
            .ok_or_else(|| CodecError::mismatch("class descriptor", "null"))
    }

    fn read_new_desc(&mut self) -> CodecResult<Arc<ClassDesc>> {
        let name = self.read_utf()?;
        let _uid = self.read_i64()?;
        let handle = self.reserve();
        let flags = self.read_u8()?;
        if flags & SC_EXTERNALIZABLE != 0 && flags & SC_SERIALIZABLE != 0 {
            return Err(CodecError::Unsupported(format!(
                "class {name} is both serializable and externalizable"
            )));
        }

        let count = self.read_u16()?;
        let mut fields = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let type_code = self.read_u8()?;
            let field_name = self.read_utf()?;
            match type_code {
                b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => {}
                b'L' | b'[' => {
                    self.read_type_string()?;
                }
                code => {
                    return Err(CodecError::UnexpectedTypeCode {
                        code,
                        context: "field type",
                    });
                }
            }
            fields.push(FieldDesc {
                type_code,
                name: field_name,
            });
        }

        self.skip_annotation()?;
        let super_desc = self.nested(Self::read_desc)?;
        // Chains assembled from back-references never pass through `nested`
        let chain_len = super_desc.as_ref().map_or(1, |s| s.chain_len + 1);
        if chain_len > MAX_DEPTH {
            return Err(CodecError::TooDeep(MAX_DEPTH));
        }

        let desc = Arc::new(ClassDesc {
            name,
            flags,
            fields,
            super_desc,
            chain_len,
        });
        self.handles[handle] = Handle::Desc(Arc::clone(&desc));
        Ok(desc)
    }

    fn read_type_string(&mut self) -> CodecResult<String> {
        match self.read_u8()? {
            tc @ (TC_STRING | TC_LONGSTRING) => self.read_new_string(tc),
            TC_REFERENCE => {
                let idx = self.lookup()?;
                match &self.handles[idx] {
                    Handle::Value(Value::String(s), _) => Ok(s.clone()),
                    _ => Err(CodecError::mismatch("field type string", "other handle")),
                }
            }
            code => Err(CodecError::UnexpectedTypeCode {
                code,
                context: "field type string",
            }),
        }
    }

    fn skip_annotation(&mut self) -> CodecResult<()> {
        self.read_annotation().map(drop)
    }

    /// Reads custom data up to and including the end-of-block marker.
    fn read_annotation(&mut self) -> CodecResult<Vec<Annotation>> {
        let mut out = Vec::new();
        loop {
            match self.read_u8()? {
                TC_ENDBLOCKDATA => return Ok(out),
                TC_BLOCKDATA => {
                    let len = self.read_u8()?;
                    out.push(Annotation::Block(self.read_chunk("block", u64::from(len))?));
                }
                TC_BLOCKDATALONG => {
                    let len = self.read_i32()?;
                    let len = u64::try_from(len).map_err(|_| CodecError::TooLarge {
                        what: "block",
                        len: len as u64,
                        max: MAX_CHUNK_LEN,
                    })?;
                    out.push(Annotation::Block(self.read_chunk("block", len)?));
                }
                TC_RESET => {
                    return Err(CodecError::Unsupported(
                        "reset inside an object's data".into(),
                    ));
                }
                tc => out.push(Annotation::Value(self.read_content(tc)?)),
            }
        }
    }

    fn read_new_object(&mut self) -> CodecResult<Value> {
        let desc = self.read_required_desc()?;
        if desc.flags & SC_ENUM != 0 {
            return Err(CodecError::mismatch("object class", "enum class"));
        }
        let handle = self.reserve();
        let start = self.nodes;
        self.charge(1)?;

        let mut fields = Vec::new();
        let mut annotations = Vec::new();
        for class in desc.hierarchy() {
            if class.flags & SC_EXTERNALIZABLE != 0 {
                if class.flags & SC_BLOCK_DATA == 0 {
                    return Err(CodecError::Unsupported(format!(
                        "externalizable class {} without block data",
                        class.name
                    )));
                }
                annotations.extend(self.read_annotation()?);
                continue;
            }
            if class.flags & SC_SERIALIZABLE == 0 {
                continue;
            }
            for field in &class.fields {
                let value = self.read_field(field.type_code)?;
                fields.push((field.name.clone(), value));
            }
            if class.flags & SC_WRITE_METHOD != 0 {
                annotations.extend(self.read_annotation()?);
            }
        }

        let value = if desc.name == INTEGER_CLASS {
            match fields.iter().find(|(name, _)| name == "value") {
                Some((_, Value::Primitive(Primitive::Int(n)))) => Value::Integer(*n),
                _ => return Err(CodecError::mismatch("Integer value field", "missing")),
            }
        } else if LIST_CLASSES.contains(&desc.name.as_str()) {
            Value::List(
                annotations
                    .into_iter()
                    .filter_map(|a| match a {
                        Annotation::Value(v) => Some(v),
                        Annotation::Block(_) => None,
                    })
                    .collect(),
            )
        } else {
            Value::Object(Box::new(Object {
                class_name: desc.name.clone(),
                fields,
                annotations,
            }))
        };
        self.handles[handle] = Handle::Value(value.clone(), self.nodes - start);
        Ok(value)
    }

    fn read_field(&mut self, type_code: u8) -> CodecResult<Value> {
        let prim = match type_code {
            b'B' => Primitive::Byte(self.read_u8()? as i8),
            b'C' => Primitive::Char(self.read_u16()?),
            b'D' => Primitive::Double(f64::from_bits(self.read_i64()? as u64)),
            b'F' => Primitive::Float(f32::from_bits(self.read_u32()?)),
            b'I' => Primitive::Int(self.read_i32()?),
            b'J' => Primitive::Long(self.read_i64()?),
            b'S' => Primitive::Short(self.read_u16()? as i16),
            b'Z' => Primitive::Boolean(self.read_u8()? != 0),
            b'L' | b'[' => {
                let tc = self.read_u8()?;
                return self.read_content(tc);
            }
            code => {
                return Err(CodecError::UnexpectedTypeCode {
                    code,
                    context: "field value",
                });
            }
        };
        self.charge(1)?;
        Ok(Value::Primitive(prim))
    }

    fn read_new_array(&mut self) -> CodecResult<Value> {
        let desc = self.read_required_desc()?;
        let handle = self.reserve();
        let start = self.nodes;
        self.charge(1)?;
        let component = desc
            .name
            .strip_prefix('[')
            .ok_or_else(|| CodecError::mismatch("array class", desc.name.clone()))?
            .to_string();
        let element_code = component.as_bytes().first().copied().unwrap_or(0);

        let len = self.read_i32()?;
        let len = usize::try_from(len)
            .ok()
            .filter(|&n| n <= MAX_CHUNK_LEN)
            .ok_or(CodecError::TooLarge {
                what: "array",
                len: len as u64,
                max: MAX_CHUNK_LEN,
            })?;

        let mut elements = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            elements.push(self.read_field(element_code)?);
        }
        let value = Value::Array {
            component,
            elements,
        };
        self.handles[handle] = Handle::Value(value.clone(), self.nodes - start);
        Ok(value)
    }

    fn read_new_enum(&mut self) -> CodecResult<Value> {
        let desc = self.read_required_desc()?;
        let handle = self.reserve();
        let start = self.nodes;
        self.charge(1)?;
        let tc = self.read_u8()?;
        let constant = self.read_content(tc)?.into_string()?;
        let value = Value::Enum {
            class_name: desc.name.clone(),
            constant,
        };
        self.handles[handle] = Handle::Value(value.clone(), self.nodes - start);
        Ok(value)
    }

    fn read_chunk(&mut self, what: &'static str, len: u64) -> CodecResult<Vec<u8>> {
        let len = usize::try_from(len)
            .ok()
            .filter(|&n| n <= MAX_CHUNK_LEN)
            .ok_or(CodecError::TooLarge {
                what,
                len,
                max: MAX_CHUNK_LEN,
            })?;
        let mut buf = vec![0; len];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn fill(&mut self, buf: &mut [u8]) -> CodecResult<()> {
        self.input.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                CodecError::UnexpectedEof
            } else {
                CodecError::Io(e)
            }
        })
    }

    fn read_u8(&mut self) -> CodecResult<u8> {
        let mut b = [0; 1];
        self.fill(&mut b)?;
        Ok(b[0])
    }

    fn read_u16(&mut self) -> CodecResult<u16> {
        let mut b = [0; 2];
        self.fill(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    fn read_u32(&mut self) -> CodecResult<u32> {
        let mut b = [0; 4];
        self.fill(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    fn read_i32(&mut self) -> CodecResult<i32> {
        self.read_u32().map(|n| n as i32)
    }

    fn read_i64(&mut self) -> CodecResult<i64> {
        let mut b = [0; 8];
        self.fill(&mut b)?;
        Ok(i64::from_be_bytes(b))
    }
}

fn add_nodes(nodes: usize, more: usize) -> CodecResult<usize> {
    nodes
        .checked_add(more)
        .filter(|&n| n <= MAX_VALUES)
        .ok_or(CodecError::TooManyValues(MAX_VALUES))
}
