mod common;

use common::*;
use hpkg_reader::hpkg::format::value::ValueDecoder;
use hpkg_reader::{AttributeValue, ErrorKind, StringTable};

fn table() -> StringTable {
    StringTable::new(vec!["zero".to_string(), "one".to_string()])
}

#[test]
fn integers_are_extended_to_64_bits() {
    let strings = table();
    let decoder = ValueDecoder::new(&strings, 0, 8);

    let bytes = [0xffu8, 0xff, 0xfe, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2a];
    let mut cursor = &bytes[..];
    assert_eq!(decoder.decode(TYPE_UINT, 0, &mut cursor).unwrap(), AttributeValue::Uint(0xff));
    assert_eq!(decoder.decode(TYPE_INT, 0, &mut cursor).unwrap(), AttributeValue::Int(-1));
    assert_eq!(decoder.decode(TYPE_INT, 1, &mut cursor).unwrap(), AttributeValue::Int(-384));
    assert_eq!(decoder.decode(TYPE_UINT, 3, &mut cursor).unwrap(), AttributeValue::Uint(0x2a));
    assert!(cursor.is_empty());
}

#[test]
fn truncated_integer_is_malformed() {
    let strings = table();
    let decoder = ValueDecoder::new(&strings, 0, 8);
    let bytes = [0u8, 1, 2];
    let mut cursor = &bytes[..];
    let err = decoder.decode(TYPE_UINT, 2, &mut cursor).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn strings_inline_and_from_table() {
    let strings = table();
    let decoder = ValueDecoder::new(&strings, 0, 8);

    let bytes = b"inline\0\x01";
    let mut cursor = &bytes[..];
    assert_eq!(
        decoder.decode(TYPE_STRING, 0, &mut cursor).unwrap(),
        AttributeValue::String("inline")
    );
    assert_eq!(decoder.decode(TYPE_STRING, 1, &mut cursor).unwrap(), AttributeValue::String("one"));
    assert!(cursor.is_empty());
}

#[test]
fn string_index_out_of_range_is_malformed() {
    let strings = table();
    let decoder = ValueDecoder::new(&strings, 0, 8);
    let bytes = [2u8];
    let mut cursor = &bytes[..];
    let err = decoder.decode(TYPE_STRING, 1, &mut cursor).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn inline_raw_data_is_bounded() {
    let strings = table();
    let decoder = ValueDecoder::new(&strings, 0, 8);

    let mut bytes = vec![3u8, 0xaa, 0xbb, 0xcc];
    let mut cursor = &bytes[..];
    assert_eq!(
        decoder.decode(TYPE_RAW, 0, &mut cursor).unwrap(),
        AttributeValue::Raw(&[0xaa, 0xbb, 0xcc])
    );

    bytes = vec![9u8];
    bytes.extend_from_slice(&[0u8; 9]);
    let mut cursor = &bytes[..];
    let err = decoder.decode(TYPE_RAW, 0, &mut cursor).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData, "oversized inline data");

    let bytes = [4u8, 1, 2];
    let mut cursor = &bytes[..];
    assert!(decoder.decode(TYPE_RAW, 0, &mut cursor).is_err(), "truncated inline data");
}

#[test]
fn heap_reference_must_stay_inside_heap() {
    let strings = table();
    let heap_size = 1000u64;
    let decoder = ValueDecoder::new(&strings, heap_size, 8);

    let mut bytes = Vec::new();
    leb128(2, &mut bytes);
    leb128(heap_size - 2, &mut bytes);
    let mut cursor = &bytes[..];
    assert_eq!(
        decoder.decode(TYPE_RAW, 1, &mut cursor).unwrap(),
        AttributeValue::HeapData { offset: heap_size - 2, size: 2 }
    );

    // One byte past the end of the heap
    let mut bytes = Vec::new();
    leb128(2, &mut bytes);
    leb128(heap_size - 1, &mut bytes);
    let mut cursor = &bytes[..];
    let err = decoder.decode(TYPE_RAW, 1, &mut cursor).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);

    let mut bytes = Vec::new();
    leb128(u64::MAX, &mut bytes);
    leb128(1, &mut bytes);
    let mut cursor = &bytes[..];
    assert!(decoder.decode(TYPE_RAW, 1, &mut cursor).is_err(), "overflowing range");
}

#[test]
fn unknown_type_or_encoding_is_malformed() {
    let strings = table();
    let decoder = ValueDecoder::new(&strings, 100, 8);
    let bytes = [0u8; 16];

    for (type_code, encoding) in [(0u8, 0u8), (5, 0), (TYPE_STRING, 2), (TYPE_RAW, 3), (TYPE_INT, 4)] {
        let mut cursor = &bytes[..];
        match decoder.decode(type_code, encoding, &mut cursor) {
            Err(e) => assert_eq!(e.kind(), ErrorKind::MalformedData, "({}, {})", type_code, encoding),
            Ok(value) => panic!("({}, {}) decoded as {:?}", type_code, encoding, value),
        }
    }
}
