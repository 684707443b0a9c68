//! Polymorphic bases dispatched on a discriminator.
//!
//! Subtypes are ordinary objects. Through the base, a subtype in a map layout
//! carries its discriminator under `Options::discriminator_member` as the
//! first entry; in the array layout the array is wrapped in
//! `Options::discriminator_semantic_tag` and the discriminator is element 0.
//! On read the discriminator is located by a look-ahead on a cloned reader,
//! then the chosen subtype reads the item from the original position.

use std::any::TypeId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::converter::{Converter, ObjectConverter};
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::registry::{Registry, WeakRegistry};
use crate::shape::{CborType, Discriminator, TypeShape, UnionDescriptor};
use crate::wire::MajorType;
use crate::writer::Writer;

pub(crate) trait BoundSubtype<T>: Send + Sync {
    fn discriminator(&self) -> &Discriminator;

    /// Writes `value` if it holds this subtype; `Ok(false)` otherwise.
    fn write(&self, writer: &mut Writer<'_>, value: &T) -> Result<bool>;

    fn read(&self, reader: &mut Reader<'_>) -> Result<T>;
}

pub(crate) struct TypedSubtype<T, S> {
    wrap: fn(S) -> T,
    unwrap: fn(&T) -> Option<&S>,
    discriminator: Discriminator,
    object: Arc<ObjectConverter<S>>,
}

impl<T: 'static, S: CborType> TypedSubtype<T, S> {
    pub(crate) fn bind(
        registry: &Registry,
        wrap: fn(S) -> T,
        unwrap: fn(&T) -> Option<&S>,
    ) -> Result<Self> {
        let type_name = std::any::type_name::<S>();
        let TypeShape::Object(descriptor) = S::shape() else {
            return Err(Error::configuration(
                type_name,
                "subtypes of a polymorphic base must be objects",
            ));
        };
        let Some(discriminator) = descriptor.discriminator.clone() else {
            return Err(Error::configuration(type_name, "subtype has no discriminator"));
        };
        Ok(TypedSubtype {
            wrap,
            unwrap,
            discriminator,
            object: Arc::new(ObjectConverter::new(registry, descriptor)),
        })
    }
}

impl<T: 'static, S: 'static> BoundSubtype<T> for TypedSubtype<T, S> {
    fn discriminator(&self) -> &Discriminator {
        &self.discriminator
    }

    fn write(&self, writer: &mut Writer<'_>, value: &T) -> Result<bool> {
        match (self.unwrap)(value) {
            Some(subtype) => {
                self.object.write_value(writer, subtype, true)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn read(&self, reader: &mut Reader<'_>) -> Result<T> {
        self.object.read(reader).map(self.wrap)
    }
}

struct Subtypes<T> {
    bound: Vec<Box<dyn BoundSubtype<T>>>,
    by_discriminator: HashMap<Discriminator, usize>,
}

pub struct UnionConverter<T> {
    type_name: &'static str,
    descriptor: UnionDescriptor<T>,
    registry: WeakRegistry,
    subtypes: OnceCell<Subtypes<T>>,
}

impl<T: 'static> UnionConverter<T> {
    pub fn new(registry: &Registry, descriptor: UnionDescriptor<T>) -> Result<Self> {
        let type_name = std::any::type_name::<T>();
        if descriptor.subtypes.is_empty() {
            return Err(Error::configuration(type_name, "polymorphic base without subtypes"));
        }
        let mut seen: Vec<TypeId> = Vec::with_capacity(descriptor.subtypes.len());
        for subtype in &descriptor.subtypes {
            if seen.contains(&subtype.type_id) {
                return Err(Error::configuration(
                    type_name,
                    format!("subtype {} registered twice", subtype.type_name),
                ));
            }
            seen.push(subtype.type_id);
        }
        Ok(UnionConverter {
            type_name,
            descriptor,
            registry: registry.downgrade(),
            subtypes: OnceCell::new(),
        })
    }

    /// Subtypes are bound lazily so they may refer back to the base.
    fn subtypes(&self) -> Result<&Subtypes<T>> {
        self.subtypes.get_or_try_init(|| {
            let registry = self.registry.upgrade(self.type_name)?;
            let mut bound = Vec::with_capacity(self.descriptor.subtypes.len());
            let mut by_discriminator = HashMap::with_capacity(self.descriptor.subtypes.len());
            for (i, subtype) in self.descriptor.subtypes.iter().enumerate() {
                let converter = (subtype.bind)(&registry)?;
                match by_discriminator.entry(converter.discriminator().clone()) {
                    Entry::Occupied(entry) => {
                        return Err(Error::configuration(
                            self.type_name,
                            format!(
                                "discriminator {} is used by more than one subtype",
                                entry.key()
                            ),
                        ));
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(i);
                    }
                }
                bound.push(converter);
            }
            Ok(Subtypes {
                bound,
                by_discriminator,
            })
        })
    }

    /// Finds the discriminator without consuming anything from `reader`.
    fn peek_discriminator(&self, reader: &Reader<'_>) -> Result<Option<Discriminator>> {
        let options = reader.options();
        let mut probe = reader.clone();
        let offset = probe.position();
        match probe.peek_major_type()? {
            MajorType::Tag => {
                if probe.read_tag()? != options.discriminator_semantic_tag {
                    return Ok(None);
                }
                let mut len = probe.read_array_header()?;
                if !probe.has_next(&mut len)? {
                    return Ok(None);
                }
                Discriminator::read(&mut probe, self.type_name).map(Some)
            }
            MajorType::Map => {
                let mut len = probe.read_map_header()?;
                while probe.has_next(&mut len)? {
                    if probe.peek_major_type()? == MajorType::Text {
                        if probe.read_text_string()? == options.discriminator_member.as_str() {
                            return Discriminator::read(&mut probe, self.type_name).map(Some);
                        }
                    } else {
                        probe.skip_value()?;
                    }
                    probe.skip_value()?;
                }
                Ok(None)
            }
            major => Err(Error::unexpected(offset, "polymorphic object", major)),
        }
    }
}

impl<T: 'static> Converter<T> for UnionConverter<T> {
    fn read(&self, reader: &mut Reader<'_>) -> Result<T> {
        let subtypes = self.subtypes()?;
        let offset = reader.position();
        let Some(discriminator) = self.peek_discriminator(reader)? else {
            return Err(Error::unresolved_discriminator(self.type_name, "<missing>", offset));
        };
        match subtypes.by_discriminator.get(&discriminator) {
            Some(&i) => subtypes.bound[i].read(reader),
            None => Err(Error::unresolved_discriminator(
                self.type_name,
                discriminator.to_string(),
                offset,
            )),
        }
    }

    fn write(&self, writer: &mut Writer<'_>, value: &T) -> Result<()> {
        for subtype in &self.subtypes()?.bound {
            if subtype.write(writer, value)? {
                return Ok(());
            }
        }
        Err(Error::configuration(
            self.type_name,
            "value matches no registered subtype",
        ))
    }
}
