use std::marker::PhantomData;

use half::f16;
use serde_bytes::ByteBuf;

use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::shape::{CborType, TypeShape};
use crate::writer::Writer;

#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanConverter;

impl Converter<bool> for BooleanConverter {
    fn read(&self, reader: &mut Reader<'_>) -> Result<bool> {
        reader.read_boolean()
    }

    fn write(&self, writer: &mut Writer<'_>, value: &bool) -> Result<()> {
        writer.write_boolean(*value);
        Ok(())
    }
}

/// Integers of any width, written in the shortest head that holds the value.
pub struct IntConverter<N>(PhantomData<fn() -> N>);

impl<N> IntConverter<N> {
    pub fn new() -> Self {
        IntConverter(PhantomData)
    }
}

impl<N> Default for IntConverter<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Floats keep their declared width unless `compact_floats` narrows them.
pub struct FloatConverter<N>(PhantomData<fn() -> N>);

impl<N> FloatConverter<N> {
    pub fn new() -> Self {
        FloatConverter(PhantomData)
    }
}

impl<N> Default for FloatConverter<N> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_int {
    ($($ty:ty),*) => {
        $(
            impl Converter<$ty> for IntConverter<$ty> {
                fn read(&self, reader: &mut Reader<'_>) -> Result<$ty> {
                    reader.read_int::<$ty>()
                }

                fn write(&self, writer: &mut Writer<'_>, value: &$ty) -> Result<()> {
                    let value = i128::try_from(*value)
                        .map_err(|_| Error::out_of_range(writer.as_bytes().len(), "i128"))?;
                    writer.write_integer(value)
                }
            }

            impl CborType for $ty {
                fn shape() -> TypeShape<Self> {
                    TypeShape::Primitive
                }
            }
        )*
    };
}

impl_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! impl_float {
    ($($ty:ty => $read:ident, $write:ident);* $(;)?) => {
        $(
            impl Converter<$ty> for FloatConverter<$ty> {
                fn read(&self, reader: &mut Reader<'_>) -> Result<$ty> {
                    reader.$read()
                }

                fn write(&self, writer: &mut Writer<'_>, value: &$ty) -> Result<()> {
                    writer.$write(*value);
                    Ok(())
                }
            }

            impl CborType for $ty {
                fn shape() -> TypeShape<Self> {
                    TypeShape::Primitive
                }
            }
        )*
    };
}

impl_float! {
    f16 => read_f16, write_f16;
    f32 => read_f32, write_f32;
    f64 => read_f64, write_f64;
}

/// A `char` travels as a one-character text string.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharConverter;

impl Converter<char> for CharConverter {
    fn read(&self, reader: &mut Reader<'_>) -> Result<char> {
        let offset = reader.position();
        let text = reader.read_text_string()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::type_mismatch(
                offset,
                "single character",
                format!("text of {} characters", text.chars().count()),
            )),
        }
    }

    fn write(&self, writer: &mut Writer<'_>, value: &char) -> Result<()> {
        let mut buf = [0u8; 4];
        writer.write_text_string(value.encode_utf8(&mut buf));
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl Converter<String> for StringConverter {
    fn read(&self, reader: &mut Reader<'_>) -> Result<String> {
        Ok(reader.read_text_string()?.into_owned())
    }

    fn write(&self, writer: &mut Writer<'_>, value: &String) -> Result<()> {
        writer.write_text_string(value);
        Ok(())
    }
}

/// Byte strings (major type 2). `Vec<u8>` is an array of integers instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteStringConverter;

impl Converter<ByteBuf> for ByteStringConverter {
    fn read(&self, reader: &mut Reader<'_>) -> Result<ByteBuf> {
        Ok(ByteBuf::from(reader.read_byte_string()?.into_owned()))
    }

    fn write(&self, writer: &mut Writer<'_>, value: &ByteBuf) -> Result<()> {
        writer.write_byte_string(value);
        Ok(())
    }
}

macro_rules! impl_primitive {
    ($($ty:ty),*) => {
        $(
            impl CborType for $ty {
                fn shape() -> TypeShape<Self> {
                    TypeShape::Primitive
                }
            }
        )*
    };
}

impl_primitive!(bool, char, String, ByteBuf);
