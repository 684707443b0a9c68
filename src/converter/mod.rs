//! Per-type encoders/decoders.
//!
//! A converter is built once per type by the [`Registry`](crate::Registry),
//! cached, and shared between threads. Converters hold no per-call state; all
//! cursor state lives in the [`Reader`] and [`Writer`] they are handed.

use crate::error::Result;
use crate::reader::Reader;
use crate::writer::Writer;

pub mod collection;
pub mod datetime;
pub mod enums;
pub mod nullable;
pub mod object;
pub mod polymorphic;
pub mod primitive;
pub mod tuple;

pub use collection::{MapConverter, SequenceConverter};
pub use enums::EnumConverter;
pub use object::ObjectConverter;
pub use polymorphic::UnionConverter;

/// Reads and writes exactly one CBOR data item as a `T`.
pub trait Converter<T>: Send + Sync {
    fn read(&self, reader: &mut Reader<'_>) -> Result<T>;

    fn write(&self, writer: &mut Writer<'_>, value: &T) -> Result<()>;
}
