//! Declarative type descriptions consumed by the registry.
//!
//! A type opts into the codec by implementing [`CborType`]. The returned
//! [`TypeShape`] is inert configuration: the registry reads it once when the
//! type's converter is first requested and never again.
//!
//! ```
//! use typed_cbor::{CborType, Member, ObjectDescriptor, TypeShape};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl CborType for Point {
//!     fn shape() -> TypeShape<Self> {
//!         TypeShape::Object(
//!             ObjectDescriptor::with_default()
//!                 .member(Member::new("x", |p: &Point| &p.x, |p, v| p.x = v))
//!                 .member(Member::new("y", |p: &Point| &p.y, |p, v| p.y = v)),
//!         )
//!     }
//! }
//!
//! let bytes = typed_cbor::to_vec(&Point { x: 1, y: -2 }).unwrap();
//! let point: Point = typed_cbor::from_slice(&bytes).unwrap();
//! assert_eq!(point, Point { x: 1, y: -2 });
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::converter::{Converter, EnumConverter};
use crate::converter::object::{BoundMember, TypedMember};
use crate::converter::polymorphic::{BoundSubtype, TypedSubtype};
use crate::error::{Error, Result};
use crate::naming::NamingConvention;
use crate::options::{ConverterFactory, DiscriminatorPolicy, LengthMode, ObjectFormat, Options};
use crate::reader::Reader;
use crate::registry::Registry;
use crate::writer::Writer;

/// A type the codec can encode and decode.
pub trait CborType: Sized + 'static {
    fn shape() -> TypeShape<Self>;
}

/// Builds a converter once the provider that owns the shape accepted it.
pub type BuildFn<T> = fn(&Registry) -> Result<Arc<dyn Converter<T>>>;

/// Broad family of a collection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Sequence,
    Set,
    Map,
}

/// How a type is represented, grouped by the provider that handles it.
pub enum TypeShape<T> {
    /// A built-in scalar recognized by the primitive provider.
    Primitive,
    Enum(EnumDescriptor<T>),
    Tuple { arity: usize, build: BuildFn<T> },
    Collection { kind: CollectionKind, build: BuildFn<T> },
    Object(ObjectDescriptor<T>),
    /// A polymorphic base resolved through discriminators.
    Union(UnionDescriptor<T>),
    Nullable { build: BuildFn<T> },
    /// A transparent wrapper such as `Box<T>`.
    Wrapper { build: BuildFn<T> },
    /// An explicit per-type converter.
    Custom(ConverterFactory<T>),
}

impl<T> TypeShape<T> {
    pub fn name(&self) -> &'static str {
        match self {
            TypeShape::Primitive => "primitive",
            TypeShape::Enum(_) => "enum",
            TypeShape::Tuple { .. } => "tuple",
            TypeShape::Collection { .. } => "collection",
            TypeShape::Object(_) => "object",
            TypeShape::Union(_) => "union",
            TypeShape::Nullable { .. } => "nullable",
            TypeShape::Wrapper { .. } => "wrapper",
            TypeShape::Custom(_) => "custom",
        }
    }

    /// Shape backed by a converter type constructed from the registry.
    pub fn custom<C, F>(factory: F) -> Self
    where
        C: Converter<T> + 'static,
        F: Fn(&Registry) -> Result<C> + Send + Sync + 'static,
    {
        TypeShape::Custom(Arc::new(move |registry: &Registry| {
            let converter: Arc<dyn Converter<T>> = Arc::new(factory(registry)?);
            Ok(converter)
        }))
    }
}

impl<T> fmt::Debug for TypeShape<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One variant of a unit-only enum.
#[derive(Clone)]
pub struct EnumVariant<T> {
    pub value: T,
    pub name: &'static str,
    pub wire_name: Option<&'static str>,
    pub discriminant: i64,
}

type EnumBuildFn<T> = fn(&EnumDescriptor<T>, &Options) -> Result<Arc<dyn Converter<T>>>;

/// Variants of a unit-only enum, written as an integer or a name per `EnumFormat`.
pub struct EnumDescriptor<T> {
    pub(crate) variants: Vec<EnumVariant<T>>,
    pub(crate) naming: Option<NamingConvention>,
    pub(crate) build: EnumBuildFn<T>,
}

impl<T: Copy + PartialEq + Send + Sync + 'static> EnumDescriptor<T> {
    pub fn new() -> Self {
        EnumDescriptor {
            variants: Vec::new(),
            naming: None,
            build: |descriptor, options| {
                let converter: Arc<dyn Converter<T>> =
                    Arc::new(EnumConverter::new(descriptor, options)?);
                Ok(converter)
            },
        }
    }
}

impl<T: Copy + PartialEq + Send + Sync + 'static> Default for EnumDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EnumDescriptor<T> {
    pub fn variant(mut self, value: T, name: &'static str, discriminant: i64) -> Self {
        self.variants.push(EnumVariant {
            value,
            name,
            wire_name: None,
            discriminant,
        });
        self
    }

    /// A variant whose text form is `wire_name` instead of its declared name.
    pub fn renamed(
        mut self,
        value: T,
        name: &'static str,
        wire_name: &'static str,
        discriminant: i64,
    ) -> Self {
        self.variants.push(EnumVariant {
            value,
            name,
            wire_name: Some(wire_name),
            discriminant,
        });
        self
    }

    pub fn naming(mut self, convention: NamingConvention) -> Self {
        self.naming = Some(convention);
        self
    }
}

/// Refers to a member by declared name or by its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRef {
    Name(&'static str),
    Index(u32),
}

impl From<&'static str> for MemberRef {
    fn from(name: &'static str) -> Self {
        MemberRef::Name(name)
    }
}

impl From<u32> for MemberRef {
    fn from(index: u32) -> Self {
        MemberRef::Index(index)
    }
}

type ConstructFn<T> = Arc<dyn Fn(&mut Arguments) -> Result<T> + Send + Sync>;

/// How a decoded object instance comes into existence.
pub enum Creator<T> {
    /// Not constructible; reading the type is a configuration error.
    None,
    /// Parameterless construction followed by member assignment.
    Factory(fn() -> T),
    /// A constructor receiving decoded values for the listed members.
    Constructor {
        parameters: Vec<MemberRef>,
        construct: ConstructFn<T>,
    },
}

impl<T> Clone for Creator<T> {
    fn clone(&self) -> Self {
        match self {
            Creator::None => Creator::None,
            Creator::Factory(factory) => Creator::Factory(*factory),
            Creator::Constructor {
                parameters,
                construct,
            } => Creator::Constructor {
                parameters: parameters.clone(),
                construct: construct.clone(),
            },
        }
    }
}

/// Decoded constructor arguments, in parameter order.
pub struct Arguments {
    pub(crate) type_name: &'static str,
    pub(crate) entries: Vec<(&'static str, Option<Box<dyn Any>>)>,
}

impl Arguments {
    fn position(&self, name: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|(n, _)| *n == name)
            .ok_or_else(|| {
                Error::configuration(
                    self.type_name,
                    format!("`{}` is not a constructor parameter", name),
                )
            })
    }

    fn downcast<F: 'static>(&self, name: &'static str, value: Box<dyn Any>) -> Result<F> {
        value.downcast::<F>().map(|v| *v).map_err(|_| {
            Error::configuration(
                self.type_name,
                format!(
                    "constructor parameter `{}` is not a {}",
                    name,
                    std::any::type_name::<F>()
                ),
            )
        })
    }

    /// Takes the value decoded for `name`, if the payload carried it.
    pub fn take_optional<F: 'static>(&mut self, name: &str) -> Result<Option<F>> {
        let position = self.position(name)?;
        self.take_optional_at(position)
    }

    /// Takes the value for the parameter at `position`.
    pub fn take_optional_at<F: 'static>(&mut self, position: usize) -> Result<Option<F>> {
        let Some((name, slot)) = self.entries.get_mut(position) else {
            return Err(Error::configuration(
                self.type_name,
                format!("no constructor parameter at position {}", position),
            ));
        };
        let name = *name;
        match slot.take() {
            Some(value) => self.downcast(name, value).map(Some),
            None => Ok(None),
        }
    }

    /// Takes the value for `name`; absence is a missing-member error.
    pub fn take<F: 'static>(&mut self, name: &str) -> Result<F> {
        let position = self.position(name)?;
        self.take_at(position)
    }

    pub fn take_at<F: 'static>(&mut self, position: usize) -> Result<F> {
        match self.take_optional_at(position)? {
            Some(value) => Ok(value),
            None => Err(Error::missing_member(
                self.type_name,
                self.entries[position].0,
            )),
        }
    }

    pub fn take_or_default<F: Default + 'static>(&mut self, name: &str) -> Result<F> {
        Ok(self.take_optional(name)?.unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type MemberBindFn<T> = Arc<dyn Fn(&Registry) -> Result<Box<dyn BoundMember<T>>> + Send + Sync>;

/// Type-erased member description stored on an [`ObjectDescriptor`].
pub struct MemberDescriptor<T> {
    pub(crate) name: &'static str,
    pub(crate) wire_name: Option<&'static str>,
    pub(crate) index: Option<u32>,
    pub(crate) required: bool,
    pub(crate) bind: MemberBindFn<T>,
}

impl<T> Clone for MemberDescriptor<T> {
    fn clone(&self) -> Self {
        MemberDescriptor {
            name: self.name,
            wire_name: self.wire_name,
            index: self.index,
            required: self.required,
            bind: self.bind.clone(),
        }
    }
}

/// A readable (and optionally writable) member of type `F` on object `T`.
pub struct Member<T, F> {
    name: &'static str,
    wire_name: Option<&'static str>,
    index: Option<u32>,
    required: bool,
    length_mode: Option<LengthMode>,
    is_default: Option<fn(&F) -> bool>,
    get: fn(&T) -> &F,
    set: Option<fn(&mut T, F)>,
    converter: Option<ConverterFactory<F>>,
}

impl<T: 'static, F: CborType> Member<T, F> {
    pub fn new(name: &'static str, get: fn(&T) -> &F, set: fn(&mut T, F)) -> Self {
        Member {
            name,
            wire_name: None,
            index: None,
            required: false,
            length_mode: None,
            is_default: None,
            get,
            set: Some(set),
            converter: None,
        }
    }

    /// A member without a setter, populated through a constructor (or write-only).
    pub fn getter(name: &'static str, get: fn(&T) -> &F) -> Self {
        Member {
            set: None,
            ..Member::new(name, get, |_, _| {})
        }
    }

    /// Explicit wire name, bypassing the naming convention.
    pub fn rename(mut self, wire_name: &'static str) -> Self {
        self.wire_name = Some(wire_name);
        self
    }

    /// Key for `IntKeyMap` and position for `Array` layouts.
    pub fn index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn length_mode(mut self, mode: LengthMode) -> Self {
        self.length_mode = Some(mode);
        self
    }

    /// Omits the member from map layouts when it equals `F::default()`.
    pub fn ignore_if_default(mut self) -> Self
    where
        F: Default + PartialEq,
    {
        self.is_default = Some(|value: &F| *value == F::default());
        self
    }

    /// Uses a dedicated converter for this member instead of the registry's.
    pub fn converter<C, G>(mut self, factory: G) -> Self
    where
        C: Converter<F> + 'static,
        G: Fn(&Registry) -> Result<C> + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(move |registry: &Registry| {
            let converter: Arc<dyn Converter<F>> = Arc::new(factory(registry)?);
            Ok(converter)
        }));
        self
    }
}

impl<T: 'static, F: CborType> From<Member<T, F>> for MemberDescriptor<T> {
    fn from(member: Member<T, F>) -> Self {
        let Member {
            name,
            wire_name,
            index,
            required,
            length_mode,
            is_default,
            get,
            set,
            converter,
        } = member;
        MemberDescriptor {
            name,
            wire_name,
            index,
            required,
            bind: Arc::new(move |registry: &Registry| {
                let converter = match &converter {
                    Some(factory) => factory(registry)?,
                    None => registry.converter::<F>()?,
                };
                let bound: Box<dyn BoundMember<T>> = Box::new(TypedMember {
                    get,
                    set,
                    converter,
                    is_default,
                    length_mode,
                });
                Ok(bound)
            }),
        }
    }
}

/// A discriminator value identifying a concrete subtype on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Discriminator {
    Text(String),
    Int(i64),
}

impl Discriminator {
    pub(crate) fn write(&self, writer: &mut Writer<'_>) {
        match self {
            Discriminator::Text(text) => writer.write_text_string(text),
            Discriminator::Int(value) => writer.write_i64(*value),
        }
    }

    /// Reads a discriminator of the polymorphic type `type_name`. Integers
    /// outside the `i64` range cannot name a subtype.
    pub(crate) fn read(reader: &mut Reader<'_>, type_name: &'static str) -> Result<Discriminator> {
        use crate::wire::MajorType;
        let offset = reader.position();
        match reader.peek_major_type()? {
            MajorType::Text => Ok(Discriminator::Text(reader.read_text_string()?.into_owned())),
            MajorType::Unsigned | MajorType::Negative => {
                let value = reader.read_integer()?;
                i64::try_from(value).map(Discriminator::Int).map_err(|_| {
                    Error::unresolved_discriminator(type_name, value.to_string(), offset)
                })
            }
            major => Err(Error::unexpected(offset, "discriminator", major)),
        }
    }
}

impl From<&str> for Discriminator {
    fn from(value: &str) -> Self {
        Discriminator::Text(value.to_string())
    }
}

impl From<i64> for Discriminator {
    fn from(value: i64) -> Self {
        Discriminator::Int(value)
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discriminator::Text(text) => write!(f, "\"{}\"", text),
            Discriminator::Int(value) => write!(f, "{}", value),
        }
    }
}

/// Members, construction strategy and layout of an object type.
pub struct ObjectDescriptor<T> {
    pub(crate) members: Vec<MemberDescriptor<T>>,
    pub(crate) creator: Creator<T>,
    pub(crate) layout: Option<ObjectFormat>,
    pub(crate) naming: Option<NamingConvention>,
    pub(crate) length_mode: Option<LengthMode>,
    pub(crate) discriminator: Option<Discriminator>,
    pub(crate) discriminator_policy: Option<DiscriminatorPolicy>,
}

impl<T> Clone for ObjectDescriptor<T> {
    fn clone(&self) -> Self {
        ObjectDescriptor {
            members: self.members.clone(),
            creator: self.creator.clone(),
            layout: self.layout,
            naming: self.naming,
            length_mode: self.length_mode,
            discriminator: self.discriminator.clone(),
            discriminator_policy: self.discriminator_policy,
        }
    }
}

impl<T: 'static> ObjectDescriptor<T> {
    /// An object with no construction strategy (write-only until one is set).
    pub fn new() -> Self {
        ObjectDescriptor {
            members: Vec::new(),
            creator: Creator::None,
            layout: None,
            naming: None,
            length_mode: None,
            discriminator: None,
            discriminator_policy: None,
        }
    }

    /// An object constructed with `T::default()` and populated through setters.
    pub fn with_default() -> Self
    where
        T: Default,
    {
        Self::new().factory(T::default)
    }

    pub fn factory(mut self, factory: fn() -> T) -> Self {
        self.creator = Creator::Factory(factory);
        self
    }

    /// Marks a constructor for deserialization. It receives the decoded values
    /// of `parameters`; every other member is assigned afterwards.
    pub fn constructor<P, C>(mut self, parameters: P, construct: C) -> Self
    where
        P: IntoIterator,
        P::Item: Into<MemberRef>,
        C: Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    {
        self.creator = Creator::Constructor {
            parameters: parameters.into_iter().map(Into::into).collect(),
            construct: Arc::new(construct),
        };
        self
    }

    pub fn member<M: Into<MemberDescriptor<T>>>(mut self, member: M) -> Self {
        self.members.push(member.into());
        self
    }

    pub fn layout(mut self, layout: ObjectFormat) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn naming(mut self, convention: NamingConvention) -> Self {
        self.naming = Some(convention);
        self
    }

    pub fn length_mode(mut self, mode: LengthMode) -> Self {
        self.length_mode = Some(mode);
        self
    }

    /// Registers the value identifying this type among its base's subtypes.
    pub fn discriminator<D: Into<Discriminator>>(mut self, value: D) -> Self {
        self.discriminator = Some(value.into());
        self
    }

    pub fn discriminator_policy(mut self, policy: DiscriminatorPolicy) -> Self {
        self.discriminator_policy = Some(policy);
        self
    }
}

impl<T: 'static> Default for ObjectDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

type SubtypeBindFn<T> = Arc<dyn Fn(&Registry) -> Result<Box<dyn BoundSubtype<T>>> + Send + Sync>;

pub(crate) struct SubtypeDescriptor<T> {
    pub(crate) type_name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) bind: SubtypeBindFn<T>,
}

impl<T> Clone for SubtypeDescriptor<T> {
    fn clone(&self) -> Self {
        SubtypeDescriptor {
            type_name: self.type_name,
            type_id: self.type_id,
            bind: self.bind.clone(),
        }
    }
}

/// A polymorphic base: a closed set of object subtypes told apart by their discriminators.
///
/// In Rust the base is usually an enum whose variants wrap the subtype structs.
pub struct UnionDescriptor<T> {
    pub(crate) subtypes: Vec<SubtypeDescriptor<T>>,
}

impl<T> Clone for UnionDescriptor<T> {
    fn clone(&self) -> Self {
        UnionDescriptor {
            subtypes: self.subtypes.clone(),
        }
    }
}

impl<T: 'static> UnionDescriptor<T> {
    pub fn new() -> Self {
        UnionDescriptor {
            subtypes: Vec::new(),
        }
    }

    /// Registers subtype `S`. `S` must describe itself as an object with a discriminator.
    pub fn subtype<S: CborType>(mut self, wrap: fn(S) -> T, unwrap: fn(&T) -> Option<&S>) -> Self {
        self.subtypes.push(SubtypeDescriptor {
            type_name: std::any::type_name::<S>(),
            type_id: TypeId::of::<S>(),
            bind: Arc::new(move |registry: &Registry| {
                let bound: Box<dyn BoundSubtype<T>> =
                    Box::new(TypedSubtype::<T, S>::bind(registry, wrap, unwrap)?);
                Ok(bound)
            }),
        });
        self
    }
}

impl<T: 'static> Default for UnionDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}
