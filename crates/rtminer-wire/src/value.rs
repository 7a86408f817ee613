//! Decoded stream values and the coercions the client protocol relies on.

use std::fmt;

use crate::error::{CodecError, CodecResult};

/// A primitive field or array element.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum Primitive {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Boolean(bool),
}

/// One entry of an object's custom-written data.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Raw bytes from a block-data record.
    Block(Vec<u8>),
    /// An object written between block records.
    Value(Value),
}

/// A serializable object the codec has no dedicated mapping for.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// Fully qualified class name of the most derived class.
    pub class_name: String,
    /// Field values, from the topmost superclass down.
    pub fields: Vec<(String, Value)>,
    /// Custom data written by `writeObject`/`writeExternal`.
    pub annotations: Vec<Annotation>,
}

impl Object {
    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// A value read from or written to an object stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `null`
    Null,
    /// `java.lang.String`
    String(String),
    /// `java.lang.Integer`
    Integer(i32),
    /// A list collection (`LinkedList`, `ArrayList`, `ArrayDeque`).
    List(Vec<Value>),
    /// An array; `component` is the element type descriptor (`I`, `Ljava.lang.String;`, ...).
    Array {
        /// Element type descriptor
        component: String,
        /// Elements in order
        elements: Vec<Value>,
    },
    /// A primitive, only found inside objects and arrays.
    Primitive(Primitive),
    /// An enum constant.
    Enum {
        /// Enum class name
        class_name: String,
        /// Constant name
        constant: String,
    },
    /// A `java.lang.Class` literal.
    Class(String),
    /// Any other serializable object.
    Object(Box<Object>),
}

impl Value {
    /// Short description of the value's shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::List(_) => "list",
            Self::Array { .. } => "array",
            Self::Primitive(_) => "primitive",
            Self::Enum { .. } => "enum",
            Self::Class(_) => "class",
            Self::Object(_) => "object",
        }
    }

    /// Borrows the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts a string.
    pub fn into_string(self) -> CodecResult<String> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(CodecError::mismatch("string", other.describe())),
        }
    }

    /// Extracts an integer from a boxed or primitive int, or from decimal text.
    pub fn into_int(self) -> CodecResult<i32> {
        match self {
            Self::Integer(n) | Self::Primitive(Primitive::Int(n)) => Ok(n),
            Self::Primitive(Primitive::Short(n)) => Ok(i32::from(n)),
            Self::Primitive(Primitive::Byte(n)) => Ok(i32::from(n)),
            Self::String(s) => s
                .trim()
                .parse()
                .map_err(|_| CodecError::mismatch("integer", format!("string {s:?}"))),
            other => Err(CodecError::mismatch("integer", other.describe())),
        }
    }

    /// Extracts a list whose elements are all strings.
    pub fn into_string_list(self) -> CodecResult<Vec<String>> {
        match self {
            Self::List(items) | Self::Array { elements: items, .. } => items
                .into_iter()
                .map(|item| match item {
                    Self::String(s) => Ok(s),
                    other => Err(CodecError::mismatch("list of strings", other.describe())),
                })
                .collect(),
            other => Err(CodecError::mismatch("list of strings", other.describe())),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::String(s) => format!("string {s:?}"),
            Self::Integer(n) => format!("integer {n}"),
            Self::List(items) => format!("list of {} elements", items.len()),
            Self::Object(obj) => format!("object {}", obj.class_name),
            Self::Enum { class_name, .. } => format!("enum {class_name}"),
            other => other.type_name().to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(n)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Renders the way `toString()` would on the sending side.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::String(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::List(items) | Self::Array { elements: items, .. } => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Primitive(p) => match p {
                Primitive::Byte(v) => write!(f, "{v}"),
                Primitive::Char(v) => match char::from_u32(u32::from(*v)) {
                    Some(c) => write!(f, "{c}"),
                    None => write!(f, "\\u{v:04x}"),
                },
                Primitive::Double(v) => write!(f, "{v}"),
                Primitive::Float(v) => write!(f, "{v}"),
                Primitive::Int(v) => write!(f, "{v}"),
                Primitive::Long(v) => write!(f, "{v}"),
                Primitive::Short(v) => write!(f, "{v}"),
                Primitive::Boolean(v) => write!(f, "{v}"),
            },
            Self::Enum { constant, .. } => f.write_str(constant),
            Self::Class(name) => write!(f, "class {name}"),
            Self::Object(obj) => write!(f, "{}@object", obj.class_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_int_accepts_boxed_primitive_and_text() {
        assert_eq!(Value::Integer(3).into_int().unwrap(), 3);
        assert_eq!(Value::Primitive(Primitive::Int(-2)).into_int().unwrap(), -2);
        assert_eq!(Value::Primitive(Primitive::Short(7)).into_int().unwrap(), 7);
        assert_eq!(Value::from(" 12 ").into_int().unwrap(), 12);
    }

    #[test]
    fn test_into_int_rejects_other_shapes() {
        assert!(Value::from("two").into_int().is_err());
        assert!(Value::Null.into_int().is_err());
        assert!(Value::List(vec![]).into_int().is_err());
    }

    #[test]
    fn test_into_string() {
        assert_eq!(Value::from("ok").into_string().unwrap(), "ok");
        let err = Value::Integer(4).into_string().unwrap_err();
        assert_eq!(err.to_string(), "expected string, found integer 4");
    }

    #[test]
    fn test_into_string_list() {
        let list = Value::from(vec!["iris", "golf"]);
        assert_eq!(list.into_string_list().unwrap(), vec!["iris", "golf"]);

        let array = Value::Array {
            component: "Ljava/lang/String;".into(),
            elements: vec![Value::from("a")],
        };
        assert_eq!(array.into_string_list().unwrap(), vec!["a"]);

        let mixed = Value::List(vec![Value::from("a"), Value::Integer(1)]);
        assert!(mixed.into_string_list().is_err());
        assert!(Value::from("a").into_string_list().is_err());
    }

    #[test]
    fn test_display_matches_java_to_string() {
        assert_eq!(Value::from(vec!["NoTablesFound"]).to_string(), "[NoTablesFound]");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[a, b]");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_object_field_lookup() {
        let obj = Object {
            class_name: "demo.Point".into(),
            fields: vec![("x".into(), Value::Primitive(Primitive::Int(1)))],
            annotations: vec![],
        };
        assert_eq!(obj.field("x"), Some(&Value::Primitive(Primitive::Int(1))));
        assert!(obj.field("y").is_none());
    }
}
