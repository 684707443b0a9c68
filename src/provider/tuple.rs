use std::sync::Arc;

use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::shape::{CborType, TypeShape};

pub(super) const MIN_ARITY: usize = 2;
pub(super) const MAX_ARITY: usize = 8;

pub(super) fn provide<T: CborType>(
    registry: &Registry,
    shape: &TypeShape<T>,
) -> Option<Result<Arc<dyn Converter<T>>>> {
    let TypeShape::Tuple { arity, build } = shape else {
        return None;
    };
    if !(MIN_ARITY..=MAX_ARITY).contains(arity) {
        return Some(Err(Error::configuration(
            std::any::type_name::<T>(),
            format!(
                "tuples of {} elements are not supported, expected {} to {}",
                arity, MIN_ARITY, MAX_ARITY
            ),
        )));
    }
    Some(build(registry))
}
