// Copyright 2026 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! RFC 8949 compliance tests
//! Tests encoding/decoding against known CBOR byte sequences from the RFC
//!
//! Note: These tests require the `compact_floats` feature to pass, as RFC 8949
//! examples use optimal float encoding (f16/f32/f64 based on precision needed).
//!
//! - Integers (positive and negative)
//! - Simple values (bool, null/Option)
//! - Floats (with optimal f16/f32/f64 encoding)
//! - Text strings (UTF-8 encoded)
//! - Byte strings (using serde_bytes::ByteBuf)
//! - Arrays (including nested heterogeneous)
//! - Maps (with mixed key/value types)
//! - Tags (standard CBOR tags 0, 1, 32)
//! - Newtype converters (transparent encoding through `TypeShape::custom`)
//! - Value roundtrips, including indefinite-length input

#![cfg(feature = "compact_floats")]

use std::fmt::Debug;

use typed_cbor::{
    CborType, Converter, Reader, Result, Tagged, TypeShape, Writer, from_slice, to_vec,
    value::Value,
};

/// Test vectors from RFC 8949 Appendix A
/// Each test specifies the expected hex bytes and decoded value
#[test]
fn test_rfc8949_integers() {
    // Test unsigned integers
    assert_encode_decode(0u64, "00");
    assert_encode_decode(1u64, "01");
    assert_encode_decode(10u64, "0a");
    assert_encode_decode(23u64, "17");
    assert_encode_decode(24u64, "1818");
    assert_encode_decode(25u64, "1819");
    assert_encode_decode(100u64, "1864");
    assert_encode_decode(1000u64, "1903e8");
    assert_encode_decode(1000000u64, "1a000f4240");
    assert_encode_decode(1000000000000u64, "1b000000e8d4a51000");
    assert_encode_decode(18446744073709551615u64, "1bffffffffffffffff");

    // Test negative integers
    assert_encode_decode(-1i64, "20");
    assert_encode_decode(-10i64, "29");
    assert_encode_decode(-100i64, "3863");
    assert_encode_decode(-1000i64, "3903e7");
    assert_encode_decode(-18446744073709551616i128, "3bffffffffffffffff");
}

#[test]
fn test_rfc8949_simple_values() {
    // Test booleans
    assert_encode_decode(false, "f4");
    assert_encode_decode(true, "f5");

    // Test null represented as Option<u8>
    let none: Option<u8> = None;
    assert_encode_decode(none, "f6");

    let some: Option<u8> = Some(42);
    assert_encode_decode(some, "182a");

    // undefined reads as None as well
    assert_eq!(from_slice::<Option<u8>>(&hex_to_bytes("f7")).unwrap(), None);
    assert_eq!(
        from_slice::<Value>(&hex_to_bytes("f0")).unwrap(),
        Value::Simple(16)
    );
}

#[test]
fn test_rfc8949_floats() {
    // Test floating point numbers
    assert_encode_decode(0.0f64, "f90000");
    assert_encode_decode(-0.0f64, "f98000");
    assert_encode_decode(1.0f64, "f93c00");
    assert_encode_decode(1.5f64, "f93e00");
    assert_encode_decode(65504.0f64, "f97bff");
    assert_encode_decode(100000.0f64, "fa47c35000");
    assert_encode_decode(3.4028234663852886e+38f64, "fa7f7fffff");
    assert_encode_decode(1.0e+300f64, "fb7e37e43c8800759c");
    assert_encode_decode(-4.1f64, "fbc010666666666666");

    // Special values
    assert_eq!(to_vec(&f64::INFINITY).unwrap(), hex_to_bytes("f97c00"));
    assert_eq!(to_vec(&f64::NEG_INFINITY).unwrap(), hex_to_bytes("f9fc00"));
    assert!(from_slice::<f64>(&hex_to_bytes("f97e00")).unwrap().is_nan());

    // Wider encodings decode to the same value
    assert_eq!(from_slice::<f64>(&hex_to_bytes("fa3fc00000")).unwrap(), 1.5);
    assert_eq!(
        from_slice::<f64>(&hex_to_bytes("fb3ff8000000000000")).unwrap(),
        1.5
    );
}

#[test]
fn test_rfc8949_strings() {
    // Test text strings
    assert_encode_decode("".to_string(), "60");
    assert_encode_decode("a".to_string(), "6161");
    assert_encode_decode("IETF".to_string(), "6449455446");
    assert_encode_decode("\"\\".to_string(), "62225c");
    assert_encode_decode("\u{00fc}".to_string(), "62c3bc");
    assert_encode_decode("\u{6c34}".to_string(), "63e6b0b4");

    // Test byte strings using serde_bytes::ByteBuf
    use serde_bytes::ByteBuf;
    assert_encode_decode(ByteBuf::from(vec![]), "40");
    assert_encode_decode(ByteBuf::from(vec![0x01, 0x02, 0x03, 0x04]), "4401020304");

    // Indefinite-length strings decode to their concatenated chunks
    assert_eq!(
        from_slice::<ByteBuf>(&hex_to_bytes("5f42010243030405ff")).unwrap(),
        ByteBuf::from(vec![1, 2, 3, 4, 5])
    );
    assert_eq!(
        from_slice::<String>(&hex_to_bytes("7f657374726561646d696e67ff")).unwrap(),
        "streaming"
    );
}

#[test]
fn test_rfc8949_arrays() {
    // Test arrays
    let empty: Vec<u8> = vec![];
    assert_encode_decode(empty, "80");

    assert_encode_decode(vec![1, 2, 3], "83010203");

    // Nested arrays - use Value for heterogeneous structures
    let nested = vec![
        Value::Integer(1),
        Value::Array(vec![Value::Integer(2), Value::Integer(3)]),
        Value::Array(vec![Value::Integer(4), Value::Integer(5)]),
    ];
    assert_encode_decode(nested, "8301820203820405");

    assert_encode_decode(
        vec![
            1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
            25,
        ],
        "98190102030405060708090a0b0c0d0e0f101112131415161718181819",
    );

    // Indefinite forms from Appendix A decode like their definite counterparts
    for hex in [
        "9fff",
        "9f018202039f0405ffff",
        "9f01820203820405ff",
        "83018202039f0405ff",
        "83019f0203ff820405",
    ] {
        let value: Value = from_slice(&hex_to_bytes(hex)).unwrap();
        assert!(value.is_array(), "not an array: {}", hex);
    }
    let nested: Vec<Vec<u8>> = from_slice(&hex_to_bytes("9f820102829f0304ffff")).unwrap();
    assert_eq!(nested, vec![vec![1, 2], vec![3, 4]]);
}

#[test]
fn test_rfc8949_maps() {
    use std::collections::BTreeMap;

    // Test empty map
    let empty: BTreeMap<String, u64> = BTreeMap::new();
    assert_encode_decode(empty, "a0");

    // Test simple maps
    let mut map = BTreeMap::new();
    map.insert(1, 2);
    map.insert(3, 4);
    assert_encode_decode(map, "a201020304");

    // Test string keys with heterogeneous values - use Value
    let mut map2 = BTreeMap::new();
    map2.insert("a".to_string(), Value::Integer(1));
    map2.insert(
        "b".to_string(),
        Value::Array(vec![Value::Integer(2), Value::Integer(3)]),
    );
    assert_encode_decode(map2, "a26161016162820203");

    // {_ "a": 1, "b": [_ 2, 3]}
    let value: Value = from_slice(&hex_to_bytes("bf61610161629f0203ffff")).unwrap();
    assert_eq!(value.get("a"), Some(&Value::Integer(1)));
    assert_eq!(
        value.get("b"),
        Some(&Value::Array(vec![Value::Integer(2), Value::Integer(3)]))
    );
}

#[test]
fn test_rfc8949_tags() {
    // Tag 0: Standard date/time string
    let tagged = Tagged::new(Some(0), "2013-03-21T20:04:00Z".to_string());
    let cbor = to_vec(&tagged).unwrap();
    assert_eq!(
        hex_from_bytes(&cbor),
        "c074323031332d30332d32315432303a30343a30305a"
    );

    // Tag 1: Epoch-based date/time
    let tagged_ts = Tagged::new(Some(1), 1363896240u64);
    let cbor_ts = to_vec(&tagged_ts).unwrap();
    assert_eq!(hex_from_bytes(&cbor_ts), "c11a514b67b0");

    // Tag 23: Expected conversion to base16
    let tagged_23 = Tagged::new(Some(23), serde_bytes::ByteBuf::from(vec![1, 2, 3, 4]));
    assert_eq!(hex_from_bytes(&to_vec(&tagged_23).unwrap()), "d74401020304");

    // Tag 32: URI
    let tagged_uri = Tagged::new(Some(32), "http://www.example.com".to_string());
    let cbor_uri = to_vec(&tagged_uri).unwrap();
    assert_eq!(
        hex_from_bytes(&cbor_uri),
        "d82076687474703a2f2f7777772e6578616d706c652e636f6d"
    );

    // Both date/time tags decode into a typed timestamp
    use chrono::{DateTime, Utc};
    let from_text: DateTime<Utc> = from_slice(&cbor).unwrap();
    let from_epoch: DateTime<Utc> = from_slice(&cbor_ts).unwrap();
    assert_eq!(from_text, from_epoch);
}

#[derive(Debug, PartialEq)]
struct UserId(u64);

struct UserIdConverter(std::sync::Arc<dyn Converter<u64>>);

impl Converter<UserId> for UserIdConverter {
    fn read(&self, reader: &mut Reader<'_>) -> Result<UserId> {
        self.0.read(reader).map(UserId)
    }

    fn write(&self, writer: &mut Writer<'_>, value: &UserId) -> Result<()> {
        self.0.write(writer, &value.0)
    }
}

impl CborType for UserId {
    fn shape() -> TypeShape<Self> {
        TypeShape::custom(|registry| Ok(UserIdConverter(registry.converter::<u64>()?)))
    }
}

#[test]
fn test_newtype_encoding() {
    // Newtypes with a delegating converter encode as their inner value, not as a map
    let user_id = UserId(42);
    let cbor = to_vec(&user_id).unwrap();

    // Should encode as just the integer, not a map
    assert_eq!(hex_from_bytes(&cbor), "182a"); // 42

    // Should roundtrip correctly
    let decoded: UserId = from_slice(&cbor).unwrap();
    assert_eq!(decoded, user_id);
}

#[test]
fn test_tagged_value_encoding() {
    // Test that Tagged properly encodes as CBOR tag + value, not as a map
    let tagged = Tagged::new(Some(32), "https://example.com".to_string());
    let cbor = to_vec(&tagged).unwrap();

    // 0xd8 0x20 for tag 32
    assert_eq!(cbor[0], 0xd8);
    assert_eq!(cbor[1], 0x20); // tag 32

    // Should NOT start with 0xa2 (map with 2 items)
    assert_ne!(cbor[0], 0xa2);

    // Verify roundtrip with explicit tag capture
    let decoded: Tagged<String> = from_slice(&cbor).unwrap();
    assert_eq!(decoded.tag, Some(32));
    assert_eq!(decoded.value, "https://example.com");
}

#[test]
fn test_value_roundtrip() {
    // Test that Value enum handles all CBOR types correctly
    let test_cases = vec![
        "00",         // 0
        "01",         // 1
        "20",         // -1
        "f4",         // false
        "f5",         // true
        "f6",         // null
        "f7",         // undefined
        "6161",       // "a"
        "4401020304", // h'01020304'
        "80",         // []
        "a0",         // {}
        "c11a514b67b0",
    ];

    for hex in test_cases {
        let bytes = hex_to_bytes(hex);
        let value: Value = from_slice(&bytes).unwrap();
        let encoded = to_vec(&value).unwrap();
        assert_eq!(
            hex_from_bytes(&encoded),
            hex,
            "Failed roundtrip for {}",
            hex
        );
    }
}

#[test]
fn test_malformed_input() {
    for hex in [
        "1c",   // reserved additional info
        "1f",   // indefinite unsigned
        "18",   // truncated argument
        "62c3", // truncated text
        "9f01", // missing break
        "ff",   // break outside of a container
        "5f6161ff", // text chunk inside a byte string
    ] {
        let err = from_slice::<Value>(&hex_to_bytes(hex)).unwrap_err();
        assert!(
            matches!(err, typed_cbor::Error::MalformedHeader { .. }),
            "{} gave {:?}",
            hex,
            err
        );
    }
}

// Helper functions

fn assert_encode_decode<T>(value: T, expected_hex: &str)
where
    T: CborType + Debug + PartialEq,
{
    let expected_bytes = hex_to_bytes(expected_hex);

    // Test encoding
    let encoded = to_vec(&value).unwrap();
    assert_eq!(
        hex_from_bytes(&encoded),
        expected_hex,
        "Encoding mismatch for {:?}",
        value
    );

    // Test decoding
    let decoded: T = from_slice(&expected_bytes).unwrap();
    assert_eq!(decoded, value, "Decoding mismatch for {}", expected_hex);
}

fn hex_to_bytes(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

fn hex_from_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
