//! Converter providers, consulted in a fixed order on a cache miss.
//!
//! Each provider recognizes a family of [`TypeShape`]s. The first one that
//! accepts a shape supplies the converter; a failure from that provider is
//! final and later providers are not tried.

use std::sync::Arc;

use crate::converter::Converter;
use crate::error::Result;
use crate::registry::Registry;
use crate::shape::{CborType, TypeShape};

mod collection;
mod explicit;
mod object;
mod primitive;
mod tuple;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Converters registered in `Options::overrides` or declared by the type itself.
    Explicit,
    /// Scalars, strings, date/times, enums and `Value`.
    Primitive,
    /// Tuples of two to eight elements.
    Tuple,
    /// Sequences, sets and maps.
    Collection,
    /// Objects, polymorphic bases, nullable and wrapper types.
    Object,
}

pub const PROVIDER_CHAIN: [Provider; 5] = [
    Provider::Explicit,
    Provider::Primitive,
    Provider::Tuple,
    Provider::Collection,
    Provider::Object,
];

impl Provider {
    /// `None` when the provider does not handle the shape.
    pub(crate) fn provide<T: CborType>(
        self,
        registry: &Registry,
        shape: &TypeShape<T>,
    ) -> Option<Result<Arc<dyn Converter<T>>>> {
        match self {
            Provider::Explicit => explicit::provide(registry, shape),
            Provider::Primitive => primitive::provide(registry, shape),
            Provider::Tuple => tuple::provide(registry, shape),
            Provider::Collection => collection::provide(registry, shape),
            Provider::Object => object::provide(registry, shape),
        }
    }
}
