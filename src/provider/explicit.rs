use std::sync::Arc;

use crate::converter::Converter;
use crate::error::Result;
use crate::registry::Registry;
use crate::shape::{CborType, TypeShape};

/// Overrides registered on the options win over a converter the type declares.
pub(super) fn provide<T: CborType>(
    registry: &Registry,
    shape: &TypeShape<T>,
) -> Option<Result<Arc<dyn Converter<T>>>> {
    if let Some(factory) = registry.options().overrides.get::<T>() {
        return Some(factory(registry));
    }
    match shape {
        TypeShape::Custom(factory) => Some(factory(registry)),
        _ => None,
    }
}
