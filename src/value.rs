use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::converter::Converter;
use crate::error::Result;
use crate::reader::Reader;
use crate::shape::{CborType, TypeShape};
use crate::wire::{FALSE, FLOAT16, FLOAT32, FLOAT64, MajorType, NULL, TRUE, UNDEFINED};
use crate::writer::Writer;

/// Dynamic CBOR value type for working with untyped CBOR data
///
/// This type can represent any well-formed CBOR item without knowing its
/// type at compile time. Members typed as `Value` accept whatever the peer
/// sends, which makes it the escape hatch for open-ended payloads.
///
/// # Example
/// ```
/// use typed_cbor::{Value, to_vec, from_slice};
/// use std::collections::BTreeMap;
///
/// // Create a dynamic value
/// let mut map = BTreeMap::new();
/// map.insert(Value::Text("name".to_string()), Value::Text("Alice".to_string()));
/// map.insert(Value::Text("age".to_string()), Value::Integer(30));
/// let value = Value::Map(map);
///
/// // Serialize and deserialize
/// let bytes = to_vec(&value).unwrap();
/// let decoded: Value = from_slice(&bytes).unwrap();
/// assert_eq!(value, decoded);
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Undefined,
    Bool(bool),
    /// Major types 0 and 1, covering -2^64 ..= 2^64 - 1
    Integer(i128),
    /// Half, single or double precision, widened
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    /// Map of values; a repeated key keeps its last value
    Map(BTreeMap<Value, Value>),
    /// Tagged value (tag number, boxed content)
    Tag(u64, Box<Value>),
    /// Unassigned simple value
    Simple(u8),
}

/// Reads any item into a [`Value`] and writes it back unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueConverter;

impl ValueConverter {
    fn read_array(reader: &mut Reader<'_>) -> Result<Value> {
        let mut len = reader.read_array_header()?;
        let mut items = Vec::new();
        while reader.has_next(&mut len)? {
            items.push(Self::read_value(reader)?);
        }
        Ok(Value::Array(items))
    }

    fn read_map(reader: &mut Reader<'_>) -> Result<Value> {
        let mut len = reader.read_map_header()?;
        let mut map = BTreeMap::new();
        while reader.has_next(&mut len)? {
            let key = Self::read_value(reader)?;
            let value = Self::read_value(reader)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn read_value(reader: &mut Reader<'_>) -> Result<Value> {
        match reader.peek_major_type()? {
            MajorType::Unsigned | MajorType::Negative => reader.read_integer().map(Value::Integer),
            MajorType::Bytes => Ok(Value::Bytes(reader.read_byte_string()?.into_owned())),
            MajorType::Text => Ok(Value::Text(reader.read_text_string()?.into_owned())),
            MajorType::Array | MajorType::Map | MajorType::Tag => {
                reader.enter()?;
                let value = match reader.peek_major_type()? {
                    MajorType::Array => Self::read_array(reader)?,
                    MajorType::Map => Self::read_map(reader)?,
                    _ => {
                        let tag = reader.read_tag()?;
                        Value::Tag(tag, Box::new(Self::read_value(reader)?))
                    }
                };
                reader.leave();
                Ok(value)
            }
            MajorType::Simple => {
                let head = reader.clone().read_head()?;
                match head.info {
                    FALSE | TRUE => reader.read_boolean().map(Value::Bool),
                    NULL => reader.read_null().map(|_| Value::Null),
                    UNDEFINED => reader.read_undefined().map(|_| Value::Undefined),
                    FLOAT16 | FLOAT32 | FLOAT64 => reader.read_f64().map(Value::Float),
                    _ => reader.read_simple().map(Value::Simple),
                }
            }
        }
    }

    fn write_value(writer: &mut Writer<'_>, value: &Value) -> Result<()> {
        match value {
            Value::Null => writer.write_null(),
            Value::Undefined => writer.write_undefined(),
            Value::Bool(b) => writer.write_boolean(*b),
            Value::Integer(i) => writer.write_integer(*i)?,
            Value::Float(f) => writer.write_f64(*f),
            Value::Bytes(b) => writer.write_byte_string(b),
            Value::Text(s) => writer.write_text_string(s),
            Value::Array(items) => {
                writer.begin_array(items.len());
                for item in items {
                    Self::write_value(writer, item)?;
                }
                writer.end_array();
            }
            Value::Map(map) => {
                writer.begin_map(map.len());
                for (k, v) in map {
                    Self::write_value(writer, k)?;
                    Self::write_value(writer, v)?;
                }
                writer.end_map();
            }
            Value::Tag(tag, inner) => {
                writer.write_tag(*tag);
                Self::write_value(writer, inner)?;
            }
            Value::Simple(simple) => writer.write_simple(*simple)?,
        }
        Ok(())
    }
}

impl Converter<Value> for ValueConverter {
    fn read(&self, reader: &mut Reader<'_>) -> Result<Value> {
        Self::read_value(reader)
    }

    fn write(&self, writer: &mut Writer<'_>, value: &Value) -> Result<()> {
        Self::write_value(writer, value)
    }
}

impl CborType for Value {
    fn shape() -> TypeShape<Self> {
        TypeShape::Primitive
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null | Value::Undefined => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => {
                if let Ok(i) = i64::try_from(*i) {
                    serializer.serialize_i64(i)
                } else if let Ok(u) = u64::try_from(*i) {
                    serializer.serialize_u64(u)
                } else {
                    serializer.serialize_i128(*i)
                }
            }
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Array(a) => a.serialize(serializer),
            Value::Map(m) => m.serialize(serializer),
            // formats without tags see the content only
            Value::Tag(_, value) => value.serialize(serializer),
            Value::Simple(simple) => serializer.serialize_u8(*simple),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any value representable in CBOR")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
                Ok(Value::Integer(value.into()))
            }

            fn visit_i128<E>(self, value: i128) -> std::result::Result<Value, E> {
                Ok(Value::Integer(value))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
                Ok(Value::Integer(value.into()))
            }

            fn visit_u128<E>(self, value: u128) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                i128::try_from(value)
                    .map(Value::Integer)
                    .map_err(|_| E::custom(format!("integer {} out of CBOR range", value)))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::Float(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Text(value.to_owned()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
                Ok(Value::Text(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<Value, E>
            where
                E: de::Error,
            {
                Ok(Value::Bytes(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<Value, E> {
                Ok(Value::Bytes(value))
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_seq<V>(self, mut visitor: V) -> std::result::Result<Value, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = visitor.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::Array(vec))
            }

            fn visit_map<V>(self, mut visitor: V) -> std::result::Result<Value, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut map = BTreeMap::new();
                while let Some((key, value)) = visitor.next_entry()? {
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The integer value, if it fits an `i64`
    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(|i| i64::try_from(i).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the tag number and inner value, if this is a tagged value
    pub fn as_tag(&self) -> Option<(u64, &Value)> {
        match self {
            Value::Tag(tag, value) => Some((*tag, value)),
            _ => None,
        }
    }

    /// Looks up a text key in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Integer(_) => 0,
            Value::Bytes(_) => 1,
            Value::Text(_) => 2,
            Value::Array(_) => 3,
            Value::Map(_) => 4,
            Value::Tag(_, _) => 5,
            Value::Simple(_) => 6,
            Value::Bool(_) => 7,
            Value::Null => 8,
            Value::Undefined => 9,
            Value::Float(_) => 10,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

// Total order so values can key a map; floats compare by `total_cmp`
impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Tag(ta, a), Value::Tag(tb, b)) => ta.cmp(tb).then_with(|| a.cmp(b)),
            (Value::Simple(a), Value::Simple(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Integer, i16 => Integer, i32 => Integer, i64 => Integer,
    u8 => Integer, u16 => Integer, u32 => Integer, u64 => Integer,
    f32 => Float, f64 => Float,
    String => Text, &str => Text,
    Vec<u8> => Bytes,
    Vec<Value> => Array,
}
