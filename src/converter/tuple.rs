//! Tuples travel as fixed-length arrays.
//!
//! One-element tuples implement [`CborType`] so they can be named in a type,
//! but the tuple provider refuses them with a configuration error.

use std::sync::Arc;

use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::reader::{Length, Reader};
use crate::registry::Registry;
use crate::shape::{CborType, TypeShape};
use crate::writer::Writer;

fn arity_mismatch(offset: usize, arity: usize, len: &Length) -> Error {
    let found = match len {
        Length::Definite(n) => format!("array of {} items", n),
        Length::Indefinite => "indefinite array of another length".to_string(),
    };
    Error::type_mismatch(offset, format!("array of {} items", arity), found)
}

macro_rules! tuple_converter {
    ($name:ident, $arity:expr; $($ty:ident . $idx:tt),+) => {
        #[allow(non_snake_case)]
        pub struct $name<$($ty),+> {
            $($ty: Arc<dyn Converter<$ty>>,)+
        }

        impl<$($ty: CborType),+> $name<$($ty),+> {
            pub fn build(registry: &Registry) -> Result<Arc<dyn Converter<($($ty,)+)>>> {
                let converter: Arc<dyn Converter<($($ty,)+)>> = Arc::new($name {
                    $($ty: registry.converter::<$ty>()?,)+
                });
                Ok(converter)
            }
        }

        impl<$($ty: CborType),+> Converter<($($ty,)+)> for $name<$($ty),+> {
            fn read(&self, reader: &mut Reader<'_>) -> Result<($($ty,)+)> {
                let offset = reader.position();
                reader.enter()?;
                let header = reader.read_array_header()?;
                let mut len = header;
                if let Length::Definite(n) = header {
                    if n != $arity {
                        return Err(arity_mismatch(offset, $arity, &header));
                    }
                }
                let value = ($(
                    {
                        if !reader.has_next(&mut len)? {
                            return Err(arity_mismatch(offset, $arity, &header));
                        }
                        self.$ty.read(reader)?
                    },
                )+);
                if reader.has_next(&mut len)? {
                    return Err(arity_mismatch(offset, $arity, &header));
                }
                reader.leave();
                Ok(value)
            }

            fn write(&self, writer: &mut Writer<'_>, value: &($($ty,)+)) -> Result<()> {
                writer.begin_array($arity);
                $(self.$ty.write(writer, &value.$idx)?;)+
                writer.end_array();
                Ok(())
            }
        }

        impl<$($ty: CborType),+> CborType for ($($ty,)+) {
            fn shape() -> TypeShape<Self> {
                TypeShape::Tuple {
                    arity: $arity,
                    build: $name::<$($ty),+>::build,
                }
            }
        }
    };
}

tuple_converter!(Tuple1Converter, 1; A.0);
tuple_converter!(Tuple2Converter, 2; A.0, B.1);
tuple_converter!(Tuple3Converter, 3; A.0, B.1, C.2);
tuple_converter!(Tuple4Converter, 4; A.0, B.1, C.2, D.3);
tuple_converter!(Tuple5Converter, 5; A.0, B.1, C.2, D.3, E.4);
tuple_converter!(Tuple6Converter, 6; A.0, B.1, C.2, D.3, E.4, F.5);
tuple_converter!(Tuple7Converter, 7; A.0, B.1, C.2, D.3, E.4, F.5, G.6);
tuple_converter!(Tuple8Converter, 8; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
