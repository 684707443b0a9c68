//! # Typed CBOR
//!
//! A CBOR (Concise Binary Object Representation, RFC 8949) codec that maps
//! Rust types to wire items through a registry of per-type converters.
//!
//! ## Features
//! - Full support for CBOR major types 0-7, definite and indefinite lengths
//! - Objects as text-keyed maps, integer-keyed maps or positional arrays
//! - Naming conventions, explicit wire names, required and skippable members
//! - Constructor-based decoding for types without setters
//! - Polymorphic bases resolved through a discriminator
//! - Date/times as RFC 3339 text or epoch numbers (tags 0 and 1 are accepted)
//! - Dynamic [`Value`] for untyped data, [`Tagged`] for semantic tags
//!
//! Types opt in by implementing [`CborType`]. Converters are built on first
//! use, cached per [`Registry`] and shared across threads.
//!
//! ## Example
//! ```rust
//! use typed_cbor::{CborType, Member, ObjectDescriptor, TypeShape, from_slice, to_vec};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u8,
//! }
//!
//! impl CborType for Person {
//!     fn shape() -> TypeShape<Self> {
//!         TypeShape::Object(
//!             ObjectDescriptor::with_default()
//!                 .member(Member::new("name", |p: &Person| &p.name, |p, v| p.name = v))
//!                 .member(Member::new("age", |p: &Person| &p.age, |p, v| p.age = v)),
//!         )
//!     }
//! }
//!
//! let alice = Person { name: "Alice".into(), age: 30 };
//! let bytes = to_vec(&alice).unwrap();
//! assert_eq!(bytes[0], 0xa2); // map of two entries
//! assert_eq!(from_slice::<Person>(&bytes).unwrap(), alice);
//! ```

use std::io::{self, Read, Write};

use once_cell::sync::Lazy;

pub mod converter;
pub mod error;
pub mod naming;
pub mod options;
pub mod provider;
pub mod reader;
pub mod registry;
pub mod shape;
pub mod tags;
pub mod value;
pub mod wire;
pub mod writer;

pub use converter::Converter;
pub use error::{Error, Result};
pub use naming::NamingConvention;
pub use options::{
    ConverterOverrides, DateTimeFormat, DiscriminatorPolicy, EnumFormat, LengthMode,
    ObjectFormat, Options, UnhandledNameMode, UnqualifiedTimeZoneKind,
};
pub use reader::{Length, Reader};
pub use registry::Registry;
pub use shape::{
    Arguments, CborType, CollectionKind, Discriminator, EnumDescriptor, Member, MemberRef,
    ObjectDescriptor, TypeShape, UnionDescriptor,
};
pub use tags::Tagged;
pub use value::Value;
pub use writer::Writer;

static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::default);

/// The process-wide registry with default [`Options`].
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

/// Encodes `value` with the default registry.
pub fn to_vec<T: CborType>(value: &T) -> Result<Vec<u8>> {
    DEFAULT_REGISTRY.to_vec(value)
}

pub fn to_vec_with<T: CborType>(value: &T, registry: &Registry) -> Result<Vec<u8>> {
    registry.to_vec(value)
}

/// Encodes `value` into `writer` with the default registry.
pub fn to_writer<W: Write, T: CborType>(writer: W, value: &T) -> Result<()> {
    to_writer_with(writer, value, &DEFAULT_REGISTRY)
}

pub fn to_writer_with<W: Write, T: CborType>(
    mut writer: W,
    value: &T,
    registry: &Registry,
) -> Result<()> {
    writer.write_all(&registry.to_vec(value)?)?;
    Ok(())
}

/// Encodes `value` behind semantic tag `tag`.
pub fn encode_tagged<W: Write, T: CborType>(mut sink: W, tag: u64, value: &T) -> Result<()> {
    let registry = default_registry();
    let converter = registry.converter::<T>()?;
    let mut writer = Writer::new(registry.options());
    writer.write_tag(tag);
    converter.write(&mut writer, value)?;
    sink.write_all(writer.as_bytes())?;
    Ok(())
}

/// Decodes exactly one item from `slice` with the default registry.
pub fn from_slice<T: CborType>(slice: &[u8]) -> Result<T> {
    DEFAULT_REGISTRY.from_slice(slice)
}

pub fn from_slice_with<T: CborType>(slice: &[u8], registry: &Registry) -> Result<T> {
    registry.from_slice(slice)
}

/// Reads `reader` to the end, then decodes exactly one item.
pub fn from_reader<R: Read, T: CborType>(mut reader: R) -> Result<T> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).map_err(Error::from)?;
    from_slice(&buf)
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
