use std::collections::HashMap;

use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::options::{EnumFormat, Options};
use crate::reader::Reader;
use crate::shape::EnumDescriptor;
use crate::wire::MajorType;
use crate::writer::Writer;

/// Unit-only enums. Written per `Options::enum_format`; either form is accepted on read.
pub struct EnumConverter<T> {
    type_name: &'static str,
    variants: Vec<(T, String, i64)>,
    by_name: HashMap<String, usize>,
    by_discriminant: HashMap<i64, usize>,
    format: EnumFormat,
}

impl<T: Copy + PartialEq + Send + Sync + 'static> EnumConverter<T> {
    pub fn new(descriptor: &EnumDescriptor<T>, options: &Options) -> Result<Self> {
        let type_name = std::any::type_name::<T>();
        let mut converter = EnumConverter {
            type_name,
            variants: Vec::with_capacity(descriptor.variants.len()),
            by_name: HashMap::new(),
            by_discriminant: HashMap::new(),
            format: options.enum_format,
        };
        for (i, variant) in descriptor.variants.iter().enumerate() {
            let name = match (variant.wire_name, descriptor.naming) {
                (Some(wire_name), _) => wire_name.to_string(),
                (None, Some(convention)) => convention.apply(variant.name),
                (None, None) => variant.name.to_string(),
            };
            if converter.by_name.insert(name.clone(), i).is_some() {
                return Err(Error::configuration(
                    type_name,
                    format!("duplicate variant name `{}`", name),
                ));
            }
            if converter
                .by_discriminant
                .insert(variant.discriminant, i)
                .is_some()
            {
                return Err(Error::configuration(
                    type_name,
                    format!("duplicate discriminant {}", variant.discriminant),
                ));
            }
            converter
                .variants
                .push((variant.value, name, variant.discriminant));
        }
        Ok(converter)
    }
}

impl<T: Copy + PartialEq + Send + Sync + 'static> Converter<T> for EnumConverter<T> {
    fn read(&self, reader: &mut Reader<'_>) -> Result<T> {
        let offset = reader.position();
        let found = match reader.peek_major_type()? {
            MajorType::Text => {
                let name = reader.read_text_string()?;
                match self.by_name.get(name.as_ref()) {
                    Some(&i) => return Ok(self.variants[i].0),
                    None => format!("\"{}\"", name),
                }
            }
            MajorType::Unsigned | MajorType::Negative => {
                let discriminant: i64 = reader.read_int()?;
                match self.by_discriminant.get(&discriminant) {
                    Some(&i) => return Ok(self.variants[i].0),
                    None => discriminant.to_string(),
                }
            }
            major => return Err(Error::unexpected(offset, "enum name or integer", major)),
        };
        Err(Error::type_mismatch(
            offset,
            format!("variant of {}", self.type_name),
            found,
        ))
    }

    fn write(&self, writer: &mut Writer<'_>, value: &T) -> Result<()> {
        let Some((_, name, discriminant)) = self.variants.iter().find(|(v, _, _)| v == value)
        else {
            return Err(Error::configuration(self.type_name, "value has no registered variant"));
        };
        match self.format {
            EnumFormat::WriteToInt => writer.write_i64(*discriminant),
            EnumFormat::WriteToString => writer.write_text_string(name),
        }
        Ok(())
    }
}
