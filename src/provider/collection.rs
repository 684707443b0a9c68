use std::sync::Arc;

use crate::converter::Converter;
use crate::error::Result;
use crate::registry::Registry;
use crate::shape::{CborType, TypeShape};

pub(super) fn provide<T: CborType>(
    registry: &Registry,
    shape: &TypeShape<T>,
) -> Option<Result<Arc<dyn Converter<T>>>> {
    match shape {
        TypeShape::Collection { build, .. } => Some(build(registry)),
        _ => None,
    }
}
