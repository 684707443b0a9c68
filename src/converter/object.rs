//! Schema-driven converter for record types.
//!
//! The schema (bound member converters, wire names, lookup tables) is built
//! on first use rather than when the converter is created. A type that refers
//! to itself through a `Box`, `Option` or collection therefore resolves
//! without recursing into its own, still unfinished, converter.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::options::{DiscriminatorPolicy, LengthMode, ObjectFormat, UnhandledNameMode};
use crate::reader::Reader;
use crate::registry::{Registry, WeakRegistry};
use crate::shape::{Arguments, Creator, Discriminator, MemberRef, ObjectDescriptor};
use crate::wire::MajorType;
use crate::writer::Writer;

/// A member with its converter resolved, erased over the member type.
pub(crate) trait BoundMember<T>: Send + Sync {
    fn write(&self, writer: &mut Writer<'_>, owner: &T) -> Result<()>;

    /// True only for members marked `ignore_if_default` currently holding the default.
    fn is_default(&self, owner: &T) -> bool;

    fn has_setter(&self) -> bool;

    fn read_into(&self, reader: &mut Reader<'_>, owner: &mut T) -> Result<()>;

    fn read_boxed(&self, reader: &mut Reader<'_>) -> Result<Box<dyn Any>>;

    fn assign(&self, owner: &mut T, value: Box<dyn Any>) -> Result<()>;
}

pub(crate) struct TypedMember<T, F> {
    pub(crate) get: fn(&T) -> &F,
    pub(crate) set: Option<fn(&mut T, F)>,
    pub(crate) converter: Arc<dyn Converter<F>>,
    pub(crate) is_default: Option<fn(&F) -> bool>,
    pub(crate) length_mode: Option<LengthMode>,
}

impl<T: 'static, F: 'static> BoundMember<T> for TypedMember<T, F> {
    fn write(&self, writer: &mut Writer<'_>, owner: &T) -> Result<()> {
        if self.length_mode.is_some() {
            writer.set_next_length_mode(self.length_mode);
        }
        self.converter.write(writer, (self.get)(owner))
    }

    fn is_default(&self, owner: &T) -> bool {
        self.is_default.is_some_and(|is_default| is_default((self.get)(owner)))
    }

    fn has_setter(&self) -> bool {
        self.set.is_some()
    }

    fn read_into(&self, reader: &mut Reader<'_>, owner: &mut T) -> Result<()> {
        let value = self.converter.read(reader)?;
        if let Some(set) = self.set {
            set(owner, value);
        }
        Ok(())
    }

    fn read_boxed(&self, reader: &mut Reader<'_>) -> Result<Box<dyn Any>> {
        Ok(Box::new(self.converter.read(reader)?))
    }

    fn assign(&self, owner: &mut T, value: Box<dyn Any>) -> Result<()> {
        let value = value.downcast::<F>().map_err(|_| {
            Error::configuration(std::any::type_name::<T>(), "member value of the wrong type")
        })?;
        if let Some(set) = self.set {
            set(owner, *value);
        }
        Ok(())
    }
}

struct Property<T> {
    name: &'static str,
    wire_name: String,
    index: u64,
    required: bool,
    access: Box<dyn BoundMember<T>>,
}

struct Schema<T> {
    layout: ObjectFormat,
    properties: Vec<Property<T>>,
    by_name: HashMap<String, usize>,
    by_index: HashMap<u64, usize>,
    length_mode: Option<LengthMode>,
    policy: DiscriminatorPolicy,
    /// Property positions feeding the constructor, in parameter order.
    parameters: Vec<usize>,
}

pub struct ObjectConverter<T> {
    type_name: &'static str,
    descriptor: ObjectDescriptor<T>,
    registry: WeakRegistry,
    schema: OnceCell<Schema<T>>,
}

enum Target<T> {
    Instance(T),
    Slots(Vec<Option<Box<dyn Any>>>),
}

/// Per-read progress: the instance (or constructor slots) and which members were seen.
struct ReadState<T> {
    target: Target<T>,
    seen: Vec<bool>,
}

impl<T: 'static> ObjectConverter<T> {
    pub fn new(registry: &Registry, descriptor: ObjectDescriptor<T>) -> Self {
        ObjectConverter {
            type_name: std::any::type_name::<T>(),
            descriptor,
            registry: registry.downgrade(),
            schema: OnceCell::new(),
        }
    }

    pub fn discriminator(&self) -> Option<&Discriminator> {
        self.descriptor.discriminator.as_ref()
    }

    fn schema(&self) -> Result<&Schema<T>> {
        self.schema.get_or_try_init(|| self.build_schema())
    }

    fn build_schema(&self) -> Result<Schema<T>> {
        let type_name = self.type_name;
        let registry = self.registry.upgrade(type_name)?;
        let options = registry.options();
        let descriptor = &self.descriptor;
        let layout = descriptor.layout.unwrap_or(options.object_format);
        let naming = descriptor.naming.or(options.default_naming_convention);

        let mut properties = Vec::with_capacity(descriptor.members.len());
        for (position, member) in descriptor.members.iter().enumerate() {
            let wire_name = match (member.wire_name, naming) {
                (Some(wire_name), _) => wire_name.to_string(),
                (None, Some(convention)) => convention.apply(member.name),
                (None, None) => member.name.to_string(),
            };
            properties.push(Property {
                name: member.name,
                wire_name,
                index: member.index.map_or(position as u64, u64::from),
                required: member.required,
                access: (member.bind)(&registry)?,
            });
        }
        if layout != ObjectFormat::StringKeyMap {
            properties.sort_by_key(|p| p.index);
        }

        let mut by_name = HashMap::with_capacity(properties.len());
        let mut by_index = HashMap::with_capacity(properties.len());
        for (i, property) in properties.iter().enumerate() {
            match layout {
                ObjectFormat::StringKeyMap => {
                    if property.wire_name == options.discriminator_member {
                        return Err(Error::configuration(
                            type_name,
                            format!(
                                "member `{}` collides with the discriminator key",
                                property.name
                            ),
                        ));
                    }
                    if by_name.insert(property.wire_name.clone(), i).is_some() {
                        return Err(Error::configuration(
                            type_name,
                            format!("duplicate member name `{}`", property.wire_name),
                        ));
                    }
                }
                ObjectFormat::IntKeyMap | ObjectFormat::Array => {
                    if by_index.insert(property.index, i).is_some() {
                        return Err(Error::configuration(
                            type_name,
                            format!("duplicate member index {}", property.index),
                        ));
                    }
                }
            }
        }

        let mut parameters = Vec::new();
        if let Creator::Constructor {
            parameters: refs, ..
        } = &descriptor.creator
        {
            for member in refs {
                let position = properties.iter().position(|p| match member {
                    MemberRef::Name(name) => p.name == *name,
                    MemberRef::Index(index) => p.index == u64::from(*index),
                });
                let Some(position) = position else {
                    return Err(Error::configuration(
                        type_name,
                        format!("constructor parameter {:?} matches no member", member),
                    ));
                };
                parameters.push(position);
            }
        }

        debug!(
            type_name,
            members = properties.len(),
            layout = ?layout,
            "built object schema"
        );
        Ok(Schema {
            layout,
            properties,
            by_name,
            by_index,
            length_mode: descriptor.length_mode,
            policy: descriptor
                .discriminator_policy
                .unwrap_or(options.discriminator_policy),
            parameters,
        })
    }

    /// Writes `value`; `through_base` is set when it is written as a subtype of a polymorphic base.
    pub(crate) fn write_value(
        &self,
        writer: &mut Writer<'_>,
        value: &T,
        through_base: bool,
    ) -> Result<()> {
        let schema = self.schema()?;
        let options = writer.options();
        let discriminator = self
            .descriptor
            .discriminator
            .as_ref()
            .filter(|_| schema.policy.writes(through_base));
        let extra = usize::from(discriminator.is_some());

        match schema.layout {
            ObjectFormat::Array => {
                if discriminator.is_some() {
                    writer.write_tag(options.discriminator_semantic_tag);
                }
                writer.default_next_length_mode(schema.length_mode);
                writer.begin_array(schema.properties.len() + extra);
                if let Some(discriminator) = discriminator {
                    discriminator.write(writer);
                }
                for property in &schema.properties {
                    property.access.write(writer, value)?;
                }
                writer.end_array();
            }
            layout => {
                let count = schema
                    .properties
                    .iter()
                    .filter(|p| !p.access.is_default(value))
                    .count();
                writer.default_next_length_mode(schema.length_mode);
                writer.begin_map(count + extra);
                if let Some(discriminator) = discriminator {
                    writer.write_text_string(&options.discriminator_member);
                    discriminator.write(writer);
                }
                for property in schema.properties.iter().filter(|p| !p.access.is_default(value)) {
                    if layout == ObjectFormat::IntKeyMap {
                        writer.write_u64(property.index);
                    } else {
                        writer.write_text_string(&property.wire_name);
                    }
                    property.access.write(writer, value)?;
                }
                writer.end_map();
            }
        }
        Ok(())
    }

    fn begin(&self, schema: &Schema<T>) -> Result<ReadState<T>> {
        let target = match &self.descriptor.creator {
            Creator::None => {
                return Err(Error::configuration(
                    self.type_name,
                    "no default factory or constructor to create instances",
                ));
            }
            Creator::Factory(factory) => Target::Instance(factory()),
            Creator::Constructor { .. } => {
                Target::Slots((0..schema.properties.len()).map(|_| None).collect())
            }
        };
        Ok(ReadState {
            target,
            seen: vec![false; schema.properties.len()],
        })
    }

    fn read_member(
        &self,
        schema: &Schema<T>,
        state: &mut ReadState<T>,
        position: usize,
        reader: &mut Reader<'_>,
    ) -> Result<()> {
        let property = &schema.properties[position];
        match &mut state.target {
            Target::Instance(instance) if property.access.has_setter() => {
                property.access.read_into(reader, instance)?
            }
            // read-only and not a constructor parameter
            Target::Instance(_) => reader.skip_value()?,
            Target::Slots(slots) => slots[position] = Some(property.access.read_boxed(reader)?),
        }
        state.seen[position] = true;
        Ok(())
    }

    fn unknown_member(&self, reader: &mut Reader<'_>, member: String, offset: usize) -> Result<()> {
        match reader.options().unhandled_name_mode {
            UnhandledNameMode::Silent => {
                trace!(
                    type_name = self.type_name,
                    member = %member,
                    offset,
                    "skipping unknown member"
                );
                reader.skip_value()
            }
            UnhandledNameMode::ThrowException => {
                Err(Error::unknown_member(self.type_name, member, offset))
            }
        }
    }

    fn read_map(
        &self,
        schema: &Schema<T>,
        state: &mut ReadState<T>,
        reader: &mut Reader<'_>,
    ) -> Result<()> {
        let options = reader.options();
        let mut len = reader.read_map_header()?;
        while reader.has_next(&mut len)? {
            let offset = reader.position();
            let found = match reader.peek_major_type()? {
                MajorType::Text => {
                    let key = reader.read_text_string()?;
                    if self.descriptor.discriminator.is_some()
                        && key == options.discriminator_member.as_str()
                    {
                        // already resolved by the polymorphic base
                        reader.skip_value()?;
                        continue;
                    }
                    let position = match schema.layout {
                        ObjectFormat::StringKeyMap => schema.by_name.get(key.as_ref()).copied(),
                        _ => None,
                    };
                    position.ok_or_else(|| format!("\"{}\"", key))
                }
                MajorType::Unsigned | MajorType::Negative => {
                    let key = reader.read_integer()?;
                    let position = match schema.layout {
                        ObjectFormat::IntKeyMap => u64::try_from(key)
                            .ok()
                            .and_then(|index| schema.by_index.get(&index).copied()),
                        _ => None,
                    };
                    position.ok_or_else(|| key.to_string())
                }
                major => {
                    reader.skip_value()?;
                    Err(format!("<{} key>", major))
                }
            };
            match found {
                Ok(position) => self.read_member(schema, state, position, reader)?,
                Err(member) => self.unknown_member(reader, member, offset)?,
            }
        }
        Ok(())
    }

    fn read_array(
        &self,
        schema: &Schema<T>,
        state: &mut ReadState<T>,
        reader: &mut Reader<'_>,
    ) -> Result<()> {
        let options = reader.options();
        let tagged = reader.peek_tag()? == Some(options.discriminator_semantic_tag);
        if tagged {
            reader.read_tag()?;
        }
        let header = reader.position();
        let mut len = reader.read_array_header()?;
        if tagged {
            if !reader.has_next(&mut len)? {
                return Err(Error::unresolved_discriminator(self.type_name, "<missing>", header));
            }
            let offset = reader.position();
            let discriminator = Discriminator::read(reader, self.type_name)?;
            if self.descriptor.discriminator.as_ref() != Some(&discriminator) {
                return Err(Error::unresolved_discriminator(
                    self.type_name,
                    discriminator.to_string(),
                    offset,
                ));
            }
        }

        let mut position = 0;
        while reader.has_next(&mut len)? {
            if position < schema.properties.len() {
                self.read_member(schema, state, position, reader)?;
            } else {
                let offset = reader.position();
                self.unknown_member(reader, format!("[{}]", position), offset)?;
            }
            position += 1;
        }
        Ok(())
    }

    fn finish(&self, schema: &Schema<T>, state: ReadState<T>) -> Result<T> {
        for (property, seen) in schema.properties.iter().zip(&state.seen) {
            if property.required && !seen {
                return Err(Error::missing_member(self.type_name, property.wire_name.clone()));
            }
        }
        let mut slots = match state.target {
            Target::Instance(instance) => return Ok(instance),
            Target::Slots(slots) => slots,
        };
        let Creator::Constructor { construct, .. } = &self.descriptor.creator else {
            return Err(Error::configuration(
                self.type_name,
                "constructor slots without a constructor",
            ));
        };
        let mut arguments = Arguments {
            type_name: self.type_name,
            entries: schema
                .parameters
                .iter()
                .map(|&position| (schema.properties[position].name, slots[position].take()))
                .collect(),
        };
        let mut instance = construct(&mut arguments)?;
        for (property, slot) in schema.properties.iter().zip(slots) {
            if let Some(value) = slot {
                if property.access.has_setter() {
                    property.access.assign(&mut instance, value)?;
                }
            }
        }
        Ok(instance)
    }
}

impl<T: 'static> Converter<T> for ObjectConverter<T> {
    fn read(&self, reader: &mut Reader<'_>) -> Result<T> {
        let schema = self.schema()?;
        let offset = reader.position();
        let mut state = self.begin(schema)?;
        reader.enter()?;
        match reader.peek_major_type()? {
            MajorType::Map if schema.layout != ObjectFormat::Array => {
                self.read_map(schema, &mut state, reader)?
            }
            MajorType::Array | MajorType::Tag if schema.layout == ObjectFormat::Array => {
                self.read_array(schema, &mut state, reader)?
            }
            major => {
                let expected = if schema.layout == ObjectFormat::Array { "array" } else { "map" };
                return Err(Error::unexpected(offset, expected, major));
            }
        }
        reader.leave();
        self.finish(schema, state)
    }

    fn write(&self, writer: &mut Writer<'_>, value: &T) -> Result<()> {
        self.write_value(writer, value, false)
    }
}
