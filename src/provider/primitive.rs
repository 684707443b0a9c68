use std::any::{Any, TypeId};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use half::f16;
use serde_bytes::ByteBuf;

use crate::converter::datetime::DateTimeConverter;
use crate::converter::primitive::{
    BooleanConverter, ByteStringConverter, CharConverter, FloatConverter, IntConverter,
    StringConverter,
};
use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::shape::{CborType, TypeShape};
use crate::value::{Value, ValueConverter};

pub(super) fn provide<T: CborType>(
    registry: &Registry,
    shape: &TypeShape<T>,
) -> Option<Result<Arc<dyn Converter<T>>>> {
    match shape {
        TypeShape::Enum(descriptor) => Some((descriptor.build)(descriptor, registry.options())),
        TypeShape::Primitive => Some(builtin::<T>().ok_or_else(|| {
            Error::configuration(
                std::any::type_name::<T>(),
                "declared primitive but is not a built-in scalar",
            )
        })),
        _ => None,
    }
}

fn erase<P: 'static, C: Converter<P> + 'static>(converter: C) -> Box<dyn Any> {
    let converter: Arc<dyn Converter<P>> = Arc::new(converter);
    Box::new(converter)
}

macro_rules! builtins {
    ($id:expr; $($ty:ty => $converter:expr),* $(,)?) => {
        $(
            if $id == TypeId::of::<$ty>() {
                return Some(erase::<$ty, _>($converter));
            }
        )*
    };
}

fn lookup(id: TypeId) -> Option<Box<dyn Any>> {
    builtins!(id;
        bool => BooleanConverter,
        i8 => IntConverter::<i8>::new(),
        i16 => IntConverter::<i16>::new(),
        i32 => IntConverter::<i32>::new(),
        i64 => IntConverter::<i64>::new(),
        i128 => IntConverter::<i128>::new(),
        isize => IntConverter::<isize>::new(),
        u8 => IntConverter::<u8>::new(),
        u16 => IntConverter::<u16>::new(),
        u32 => IntConverter::<u32>::new(),
        u64 => IntConverter::<u64>::new(),
        u128 => IntConverter::<u128>::new(),
        usize => IntConverter::<usize>::new(),
        f16 => FloatConverter::<f16>::new(),
        f32 => FloatConverter::<f32>::new(),
        f64 => FloatConverter::<f64>::new(),
        char => CharConverter,
        String => StringConverter,
        ByteBuf => ByteStringConverter,
        DateTime<Utc> => DateTimeConverter::<DateTime<Utc>>::new(),
        DateTime<FixedOffset> => DateTimeConverter::<DateTime<FixedOffset>>::new(),
        NaiveDateTime => DateTimeConverter::<NaiveDateTime>::new(),
        Value => ValueConverter,
    );
    None
}

fn builtin<T: 'static>() -> Option<Arc<dyn Converter<T>>> {
    lookup(TypeId::of::<T>())?
        .downcast::<Arc<dyn Converter<T>>>()
        .ok()
        .map(|converter| *converter)
}
