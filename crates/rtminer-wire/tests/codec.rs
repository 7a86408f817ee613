//! Reader/writer interplay over a shared stream.

use bytes::BytesMut;
use pretty_assertions::assert_eq;
use rtminer_wire::{CodecError, ObjectReader, ObjectWriter, Primitive, Value};

fn stream(values: &[Value]) -> Vec<u8> {
    let mut writer = ObjectWriter::new();
    let mut buf = BytesMut::new();
    writer.write_header(&mut buf);
    for value in values {
        writer.encode(value, &mut buf).unwrap();
    }
    buf.to_vec()
}

#[test]
fn test_request_sequence_decodes_in_order() {
    // Shape of a learn request followed by a predict request and a choice.
    let bytes = stream(&[
        Value::Integer(3),
        Value::from("iris"),
        Value::Integer(6),
        Value::from("iris"),
        Value::Integer(1),
    ]);
    let mut reader = ObjectReader::new(&bytes[..]);
    reader.read_header().unwrap();
    assert_eq!(reader.read_value().unwrap(), Value::Integer(3));
    assert_eq!(reader.read_value().unwrap(), Value::from("iris"));
    assert_eq!(reader.read_value().unwrap(), Value::Integer(6));
    assert_eq!(reader.read_value().unwrap(), Value::from("iris"));
    assert_eq!(reader.read_value().unwrap(), Value::Integer(1));
    assert!(matches!(
        reader.read_value(),
        Err(CodecError::UnexpectedEof)
    ));
}

#[test]
fn test_string_list_reply() {
    let tables = Value::from(vec!["iris", "golf", "weather"]);
    let bytes = stream(&[tables.clone(), Value::from(vec!["NoFilesFound"])]);
    let mut reader = ObjectReader::new(&bytes[..]);
    reader.read_header().unwrap();
    assert_eq!(reader.read_value().unwrap(), tables);
    assert_eq!(
        reader.read_value().unwrap().into_string_list().unwrap(),
        vec!["NoFilesFound"]
    );
}

#[test]
fn test_nested_lists_and_nulls() {
    let value = Value::List(vec![
        Value::Null,
        Value::List(vec![Value::Integer(-7)]),
        Value::from("\u{0}\u{1F333}"),
    ]);
    let bytes = stream(&[value.clone()]);
    let mut reader = ObjectReader::new(&bytes[..]);
    reader.read_header().unwrap();
    assert_eq!(reader.read_value().unwrap(), value);
}

/// ArrayList as written by the JDK: a `size` field, then capacity and elements.
#[test]
fn test_array_list_from_jdk() {
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, 0x73, 0x72, 0x00, 0x13];
    bytes.extend_from_slice(b"java.util.ArrayList");
    bytes.extend_from_slice(&[0x78, 0x81, 0xD2, 0x1D, 0x99, 0xC7, 0x61, 0x9D]);
    bytes.extend_from_slice(&[0x03, 0x00, 0x01, b'I', 0x00, 0x04]);
    bytes.extend_from_slice(b"size");
    bytes.extend_from_slice(&[0x78, 0x70]);
    bytes.extend_from_slice(&2i32.to_be_bytes());
    bytes.extend_from_slice(&[0x77, 0x04, 0x00, 0x00, 0x00, 0x02]);
    bytes.extend_from_slice(&[0x74, 0x00, 0x01, b'a']);
    // second element is a back-reference to the first string
    bytes.extend_from_slice(&[0x71, 0x00, 0x7E, 0x00, 0x02]);
    bytes.push(0x78);

    let mut reader = ObjectReader::new(&bytes[..]);
    reader.read_header().unwrap();
    assert_eq!(
        reader.read_value().unwrap().into_string_list().unwrap(),
        vec!["a", "a"]
    );
}

/// A plain serializable class with a primitive and an object field.
#[test]
fn test_generic_object_fields() {
    let mut bytes = vec![0xAC, 0xED, 0x00, 0x05, 0x73, 0x72, 0x00, 0x09];
    bytes.extend_from_slice(b"demo.Leaf");
    bytes.extend_from_slice(&1i64.to_be_bytes());
    bytes.extend_from_slice(&[0x02, 0x00, 0x02]);
    bytes.extend_from_slice(&[b'I', 0x00, 0x05]);
    bytes.extend_from_slice(b"count");
    bytes.extend_from_slice(&[b'L', 0x00, 0x05]);
    bytes.extend_from_slice(b"label");
    bytes.extend_from_slice(&[0x74, 0x00, 0x12]);
    bytes.extend_from_slice(b"Ljava/lang/String;");
    bytes.extend_from_slice(&[0x78, 0x70]);
    bytes.extend_from_slice(&9i32.to_be_bytes());
    bytes.extend_from_slice(&[0x74, 0x00, 0x03]);
    bytes.extend_from_slice(b"yes");

    let mut reader = ObjectReader::new(&bytes[..]);
    reader.read_header().unwrap();
    let Value::Object(obj) = reader.read_value().unwrap() else {
        panic!("expected a generic object");
    };
    assert_eq!(obj.class_name, "demo.Leaf");
    assert_eq!(obj.field("count"), Some(&Value::Primitive(Primitive::Int(9))));
    assert_eq!(obj.field("label"), Some(&Value::from("yes")));
}

#[test]
fn test_truncated_integer_is_eof() {
    let bytes = stream(&[Value::Integer(5)]);
    let mut reader = ObjectReader::new(&bytes[..bytes.len() - 2]);
    reader.read_header().unwrap();
    let err = reader.read_value().unwrap_err();
    assert!(err.is_io());
}
