use std::sync::Arc;

use crate::converter::Converter;
use crate::error::Result;
use crate::reader::Reader;
use crate::registry::Registry;
use crate::shape::{CborType, TypeShape};
use crate::writer::Writer;

/// `None` is written as null; null and undefined both read back as `None`.
pub struct OptionConverter<T> {
    inner: Arc<dyn Converter<T>>,
}

impl<T: CborType> OptionConverter<T> {
    pub fn build(registry: &Registry) -> Result<Arc<dyn Converter<Option<T>>>> {
        let converter: Arc<dyn Converter<Option<T>>> = Arc::new(OptionConverter {
            inner: registry.converter::<T>()?,
        });
        Ok(converter)
    }
}

impl<T: CborType> Converter<Option<T>> for OptionConverter<T> {
    fn read(&self, reader: &mut Reader<'_>) -> Result<Option<T>> {
        if reader.try_read_null()? {
            return Ok(None);
        }
        self.inner.read(reader).map(Some)
    }

    fn write(&self, writer: &mut Writer<'_>, value: &Option<T>) -> Result<()> {
        match value {
            Some(value) => self.inner.write(writer, value),
            None => {
                writer.write_null();
                Ok(())
            }
        }
    }
}

impl<T: CborType> CborType for Option<T> {
    fn shape() -> TypeShape<Self> {
        TypeShape::Nullable {
            build: OptionConverter::<T>::build,
        }
    }
}

macro_rules! transparent {
    ($name:ident, $wrapper:ident) => {
        /// Encodes the pointee in place.
        pub struct $name<T> {
            inner: Arc<dyn Converter<T>>,
        }

        impl<T: CborType> $name<T> {
            pub fn build(registry: &Registry) -> Result<Arc<dyn Converter<$wrapper<T>>>> {
                let converter: Arc<dyn Converter<$wrapper<T>>> = Arc::new($name {
                    inner: registry.converter::<T>()?,
                });
                Ok(converter)
            }
        }

        impl<T: CborType> Converter<$wrapper<T>> for $name<T> {
            fn read(&self, reader: &mut Reader<'_>) -> Result<$wrapper<T>> {
                self.inner.read(reader).map($wrapper::new)
            }

            fn write(&self, writer: &mut Writer<'_>, value: &$wrapper<T>) -> Result<()> {
                self.inner.write(writer, value)
            }
        }

        impl<T: CborType> CborType for $wrapper<T> {
            fn shape() -> TypeShape<Self> {
                TypeShape::Wrapper {
                    build: $name::<T>::build,
                }
            }
        }
    };
}

transparent!(BoxConverter, Box);
transparent!(ArcConverter, Arc);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option() {
        let registry = Registry::default();
        assert_eq!(registry.to_vec(&None::<u8>).unwrap(), [0xf6]);
        assert_eq!(registry.to_vec(&Some(7u8)).unwrap(), [0x07]);
        assert_eq!(registry.from_slice::<Option<u8>>(&[0xf7]).unwrap(), None);
        assert_eq!(registry.from_slice::<Option<u8>>(&[0x07]).unwrap(), Some(7));
    }

    #[test]
    fn test_wrappers_are_transparent() {
        let registry = Registry::default();
        let boxed = Box::new("x".to_string());
        assert_eq!(registry.to_vec(&boxed).unwrap(), [0x61, b'x']);
        let shared: Arc<u32> = registry.from_slice(&[0x18, 0x64]).unwrap();
        assert_eq!(*shared, 100);
    }
}
