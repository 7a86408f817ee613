//! Grammar constants of the object serialization stream, protocol version 5.

/// Stream magic written at the start of every stream.
pub const STREAM_MAGIC: u16 = 0xACED;
/// Stream protocol version.
pub const STREAM_VERSION: u16 = 5;

pub(crate) const TC_NULL: u8 = 0x70;
pub(crate) const TC_REFERENCE: u8 = 0x71;
pub(crate) const TC_CLASSDESC: u8 = 0x72;
pub(crate) const TC_OBJECT: u8 = 0x73;
pub(crate) const TC_STRING: u8 = 0x74;
pub(crate) const TC_ARRAY: u8 = 0x75;
pub(crate) const TC_CLASS: u8 = 0x76;
pub(crate) const TC_BLOCKDATA: u8 = 0x77;
pub(crate) const TC_ENDBLOCKDATA: u8 = 0x78;
pub(crate) const TC_RESET: u8 = 0x79;
pub(crate) const TC_BLOCKDATALONG: u8 = 0x7A;
pub(crate) const TC_EXCEPTION: u8 = 0x7B;
pub(crate) const TC_LONGSTRING: u8 = 0x7C;
pub(crate) const TC_PROXYCLASSDESC: u8 = 0x7D;
pub(crate) const TC_ENUM: u8 = 0x7E;

/// First handle assigned to a serialized entity.
pub(crate) const BASE_WIRE_HANDLE: u32 = 0x7E_0000;

pub(crate) const SC_WRITE_METHOD: u8 = 0x01;
pub(crate) const SC_SERIALIZABLE: u8 = 0x02;
pub(crate) const SC_EXTERNALIZABLE: u8 = 0x04;
pub(crate) const SC_BLOCK_DATA: u8 = 0x08;
pub(crate) const SC_ENUM: u8 = 0x10;

pub(crate) const INTEGER_CLASS: &str = "java.lang.Integer";
pub(crate) const INTEGER_UID: i64 = 0x12E2_A0A4_F781_8738;
pub(crate) const NUMBER_CLASS: &str = "java.lang.Number";
pub(crate) const NUMBER_UID: i64 = 0x86AC_951D_0B94_E08B_u64 as i64;
pub(crate) const LINKED_LIST_CLASS: &str = "java.util.LinkedList";
pub(crate) const LINKED_LIST_UID: i64 = 0x0C29_535D_4A60_8822;

/// Collection classes whose custom write data is a size followed by the elements.
pub(crate) const LIST_CLASSES: &[&str] = &[
    LINKED_LIST_CLASS,
    "java.util.ArrayList",
    "java.util.ArrayDeque",
];

/// Largest single string or block accepted from the peer.
pub const MAX_CHUNK_LEN: usize = 16 * 1024 * 1024;
/// Deepest object nesting accepted from the peer. Superclass chains count too.
pub const MAX_DEPTH: usize = 64;
/// Most values one top-level read may produce. A back-reference counts as
/// every value in its target.
pub const MAX_VALUES: usize = 1 << 20;
