use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::converter::Converter;
use crate::error::Result;
use crate::naming::NamingConvention;
use crate::registry::Registry;
use crate::wire::TAG_DISCRIMINATOR;

/// What to do with a map key or array position the object schema does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnhandledNameMode {
    /// Skip the value and keep reading.
    #[default]
    Silent,
    /// Fail with `Error::UnknownMember`.
    ThrowException,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnumFormat {
    WriteToInt,
    #[default]
    WriteToString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateTimeFormat {
    /// RFC 3339 text.
    #[default]
    Iso8601,
    /// Integer seconds since the Unix epoch.
    Unix,
    /// Integer milliseconds since the Unix epoch.
    UnixMilliseconds,
}

/// How date/times without an offset are interpreted and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnqualifiedTimeZoneKind {
    #[default]
    Utc,
    Local,
    /// Written without an offset; read as wall-clock time.
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiscriminatorPolicy {
    /// Same as `Auto`.
    #[default]
    Default,
    /// Write the discriminator when a value goes through its polymorphic base.
    Auto,
    Never,
    /// Also write it when a subtype is serialized directly.
    Always,
}

impl DiscriminatorPolicy {
    /// Whether the discriminator is written for a value serialized as itself
    /// (`through_base == false`) or through its polymorphic base.
    pub fn writes(self, through_base: bool) -> bool {
        match self {
            DiscriminatorPolicy::Default | DiscriminatorPolicy::Auto => through_base,
            DiscriminatorPolicy::Never => false,
            DiscriminatorPolicy::Always => true,
        }
    }
}

/// How an object's members are positioned on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ObjectFormat {
    #[default]
    StringKeyMap,
    IntKeyMap,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LengthMode {
    /// Definite length.
    #[default]
    Default,
    Definite,
    Indefinite,
}

impl LengthMode {
    pub fn is_indefinite(self) -> bool {
        matches!(self, LengthMode::Indefinite)
    }
}

/// Builds a converter for one type, with access to the registry for nested lookups.
pub type ConverterFactory<T> =
    Arc<dyn Fn(&Registry) -> Result<Arc<dyn Converter<T>>> + Send + Sync>;

/// Per-type explicit converters, consulted before any other provider.
#[derive(Clone, Default)]
pub struct ConverterOverrides {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ConverterOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a converter constructed from the registry.
    pub fn insert<T, C, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static,
        C: Converter<T> + 'static,
        F: Fn(&Registry) -> Result<C> + Send + Sync + 'static,
    {
        let factory: ConverterFactory<T> = Arc::new(move |registry: &Registry| {
            let converter: Arc<dyn Converter<T>> = Arc::new(factory(registry)?);
            Ok(converter)
        });
        self.entries.insert(TypeId::of::<T>(), Arc::new(factory));
        self
    }

    /// Registers a converter that needs no nested lookups.
    pub fn insert_default<T, C>(&mut self) -> &mut Self
    where
        T: 'static,
        C: Converter<T> + Default + 'static,
    {
        self.insert::<T, C, _>(|_| Ok(C::default()))
    }

    pub fn get<T: 'static>(&self) -> Option<ConverterFactory<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<ConverterFactory<T>>())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ConverterOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterOverrides")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// Configuration shared by every reader, writer and converter built from one registry.
///
/// Options are immutable once a [`Registry`] has been created from them. They
/// can be loaded from any serde format; converter overrides are code-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub unhandled_name_mode: UnhandledNameMode,
    pub enum_format: EnumFormat,
    pub date_time_format: DateTimeFormat,
    pub unqualified_time_zone_kind: UnqualifiedTimeZoneKind,
    pub discriminator_policy: DiscriminatorPolicy,
    pub object_format: ObjectFormat,
    pub array_length_mode: LengthMode,
    pub map_length_mode: LengthMode,
    /// Tag wrapping array-layout polymorphic values.
    pub discriminator_semantic_tag: u64,
    /// Reserved key carrying the discriminator in map layouts.
    pub discriminator_member: String,
    pub default_naming_convention: Option<NamingConvention>,
    /// Maximum nesting of containers and tags accepted while reading.
    pub max_depth: usize,
    #[serde(skip)]
    pub overrides: ConverterOverrides,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            unhandled_name_mode: UnhandledNameMode::default(),
            enum_format: EnumFormat::default(),
            date_time_format: DateTimeFormat::default(),
            unqualified_time_zone_kind: UnqualifiedTimeZoneKind::default(),
            discriminator_policy: DiscriminatorPolicy::default(),
            object_format: ObjectFormat::default(),
            array_length_mode: LengthMode::default(),
            map_length_mode: LengthMode::default(),
            discriminator_semantic_tag: TAG_DISCRIMINATOR,
            discriminator_member: "_t".to_string(),
            default_naming_convention: None,
            max_depth: 256,
            overrides: ConverterOverrides::default(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether arrays are written indefinite, honoring a per-type/member override.
    pub fn indefinite_arrays(&self, override_mode: Option<LengthMode>) -> bool {
        match override_mode {
            Some(LengthMode::Default) | None => self.array_length_mode.is_indefinite(),
            Some(mode) => mode.is_indefinite(),
        }
    }

    pub fn indefinite_maps(&self, override_mode: Option<LengthMode>) -> bool {
        match override_mode {
            Some(LengthMode::Default) | None => self.map_length_mode.is_indefinite(),
            Some(mode) => mode.is_indefinite(),
        }
    }
}
