//! # rtminer Wire Codec
//!
//! Reader and writer for the Java object serialization stream protocol
//! (version 5), the framing the rtminer server speaks on its socket.
//!
//! ## Design Philosophy
//!
//! - **Closed value model**: decoded content becomes a [`Value`] tree
//! - **Client-shaped writer**: only strings, integers, lists and null are encoded
//! - **Bounded**: lengths are capped at [`MAX_CHUNK_LEN`], nesting at [`MAX_DEPTH`]
//!   and the size of one decoded value at [`MAX_VALUES`]
//! - **Stateful**: handles persist across values, so one reader and one writer
//!   serve a whole connection
//!
//! ## Usage
//!
//! ```rust
//! use bytes::BytesMut;
//! use rtminer_wire::{ObjectReader, ObjectWriter, Value};
//!
//! let mut writer = ObjectWriter::new();
//! let mut buf = BytesMut::new();
//! writer.write_header(&mut buf);
//! writer.encode(&Value::Integer(1), &mut buf).unwrap();
//! writer.encode(&Value::from("iris"), &mut buf).unwrap();
//!
//! let mut reader = ObjectReader::new(&buf[..]);
//! reader.read_header().unwrap();
//! assert_eq!(reader.read_value().unwrap().into_int().unwrap(), 1);
//! assert_eq!(reader.read_value().unwrap().into_string().unwrap(), "iris");
//! ```
//!
//! ## Decoded shapes
//!
//! `java.lang.Integer` decodes to [`Value::Integer`]. `LinkedList`,
//! `ArrayList` and `ArrayDeque` decode to [`Value::List`]. Other serializable
//! classes are kept as a generic [`Object`]. Proxy classes and exceptions
//! raised by the peer mid-write are rejected.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod constants;
pub mod error;
pub mod mutf8;
pub mod reader;
pub mod value;
pub mod writer;

pub use constants::{MAX_CHUNK_LEN, MAX_DEPTH, MAX_VALUES, STREAM_MAGIC, STREAM_VERSION};
pub use error::{CodecError, CodecResult};
pub use reader::ObjectReader;
pub use value::{Annotation, Object, Primitive, Value};
pub use writer::ObjectWriter;

/// The four bytes every stream starts with.
pub const STREAM_HEADER: [u8; 4] = [0xAC, 0xED, 0x00, 0x05];
