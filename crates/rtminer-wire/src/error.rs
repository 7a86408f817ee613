//! Codec error types.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding an object stream.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    /// The underlying reader failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended in the middle of a value.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The peer did not start its stream with the expected magic and version.
    #[error("bad stream header: magic {magic:#06x}, version {version}")]
    BadHeader {
        /// Magic number found
        magic: u16,
        /// Version found
        version: u16,
    },

    /// A type code that is not legal at this point of the grammar.
    #[error("unexpected type code {code:#04x} while reading {context}")]
    UnexpectedTypeCode {
        /// The offending code
        code: u8,
        /// What the reader expected
        context: &'static str,
    },

    /// A back-reference to a handle that was never assigned.
    #[error("reference to unknown handle {0:#x}")]
    UnknownHandle(u32),

    /// String bytes were not valid modified UTF-8.
    #[error("invalid modified UTF-8 data")]
    InvalidUtf8,

    /// Stream content this codec does not interpret.
    #[error("unsupported stream content: {0}")]
    Unsupported(String),

    /// A length prefix beyond [`crate::MAX_CHUNK_LEN`].
    #[error("{what} of {len} bytes exceeds the limit of {max} bytes")]
    TooLarge {
        /// What was being read
        what: &'static str,
        /// Announced length
        len: u64,
        /// Limit
        max: usize,
    },

    /// Object graph nested deeper than [`crate::MAX_DEPTH`].
    #[error("object nesting exceeds depth {0}")]
    TooDeep(usize),

    /// A decoded value, with back-references expanded, beyond [`crate::MAX_VALUES`].
    #[error("decoded value exceeds {0} nodes")]
    TooManyValues(usize),

    /// A decoded value did not have the shape the caller asked for.
    #[error("expected {expected}, found {found}")]
    Mismatch {
        /// Shape requested by the caller
        expected: &'static str,
        /// Description of what arrived
        found: String,
    },

    /// A value this codec cannot write.
    #[error("cannot encode {0}")]
    Unencodable(&'static str),
}

impl CodecError {
    /// True when the error comes from the byte source rather than from the content.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::UnexpectedEof)
    }

    pub(crate) fn mismatch(expected: &'static str, found: impl Into<String>) -> Self {
        Self::Mismatch {
            expected,
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        assert!(CodecError::UnexpectedEof.is_io());
        assert!(CodecError::Io(std::io::Error::other("reset")).is_io());
        assert!(!CodecError::InvalidUtf8.is_io());
        assert!(!CodecError::mismatch("string", "integer 4").is_io());
    }

    #[test]
    fn test_display() {
        let err = CodecError::UnexpectedTypeCode {
            code: 0x7b,
            context: "content",
        };
        assert_eq!(err.to_string(), "unexpected type code 0x7b while reading content");
        assert_eq!(
            CodecError::mismatch("string", "integer 4").to_string(),
            "expected string, found integer 4"
        );
    }
}
