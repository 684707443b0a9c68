use std::sync::Arc;

use crate::converter::{Converter, ObjectConverter, UnionConverter};
use crate::error::Result;
use crate::registry::Registry;
use crate::shape::{CborType, TypeShape};

pub(super) fn provide<T: CborType>(
    registry: &Registry,
    shape: &TypeShape<T>,
) -> Option<Result<Arc<dyn Converter<T>>>> {
    match shape {
        TypeShape::Object(descriptor) => {
            let converter: Arc<dyn Converter<T>> =
                Arc::new(ObjectConverter::new(registry, descriptor.clone()));
            Some(Ok(converter))
        }
        TypeShape::Union(descriptor) => Some(
            UnionConverter::new(registry, descriptor.clone())
                .map(|converter| Arc::new(converter) as Arc<dyn Converter<T>>),
        ),
        TypeShape::Nullable { build } | TypeShape::Wrapper { build } => Some(build(registry)),
        _ => None,
    }
}
