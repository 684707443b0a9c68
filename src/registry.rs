//! Converter registry: resolves and caches one converter per type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::provider::{PROVIDER_CHAIN, Provider};
use crate::reader::Reader;
use crate::shape::CborType;
use crate::writer::Writer;

type CacheEntry = Arc<dyn Any + Send + Sync>;

struct Inner {
    options: Options,
    providers: Vec<Provider>,
    cache: RwLock<HashMap<TypeId, CacheEntry>>,
}

/// Owns the [`Options`] and the converter cache.
///
/// Cloning is cheap; clones share the same cache. Lookups are safe from any
/// number of threads. When two threads build the same converter concurrently
/// both builds succeed and the first one installed is kept.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

/// Non-owning handle held by lazily initialized converters, so that a
/// converter cached inside the registry does not keep it alive.
#[derive(Clone)]
pub(crate) struct WeakRegistry(Weak<Inner>);

impl WeakRegistry {
    pub(crate) fn upgrade(&self, type_name: &'static str) -> Result<Registry> {
        self.0
            .upgrade()
            .map(|inner| Registry { inner })
            .ok_or_else(|| Error::configuration(type_name, "registry was dropped"))
    }
}

impl Registry {
    pub fn new(options: Options) -> Self {
        Registry {
            inner: Arc::new(Inner {
                options,
                providers: PROVIDER_CHAIN.to_vec(),
                cache: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// The providers consulted, in order, for a type not yet cached.
    pub fn providers(&self) -> &[Provider] {
        &self.inner.providers
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry(Arc::downgrade(&self.inner))
    }

    /// Number of types with a cached converter.
    pub fn cached(&self) -> usize {
        self.inner.cache.read().len()
    }

    /// Returns the converter for `T`, building and caching it on first use.
    pub fn converter<T: CborType>(&self) -> Result<Arc<dyn Converter<T>>> {
        let id = TypeId::of::<T>();
        if let Some(entry) = self.inner.cache.read().get(&id) {
            return Self::downcast::<T>(entry);
        }

        // built without holding the lock: nested lookups re-enter the cache
        let converter = self.build::<T>()?;

        let mut cache = self.inner.cache.write();
        match cache.entry(id) {
            Entry::Occupied(existing) => {
                debug!(
                    type_name = std::any::type_name::<T>(),
                    "converter installed concurrently, discarding ours"
                );
                Self::downcast::<T>(existing.get())
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(converter.clone()));
                Ok(converter)
            }
        }
    }

    fn downcast<T: 'static>(entry: &CacheEntry) -> Result<Arc<dyn Converter<T>>> {
        entry
            .downcast_ref::<Arc<dyn Converter<T>>>()
            .cloned()
            .ok_or_else(|| {
                Error::configuration(std::any::type_name::<T>(), "cache entry of the wrong type")
            })
    }

    fn build<T: CborType>(&self) -> Result<Arc<dyn Converter<T>>> {
        let type_name = std::any::type_name::<T>();
        let shape = T::shape();
        for provider in &self.inner.providers {
            if let Some(converter) = provider.provide::<T>(self, &shape) {
                let converter = converter?;
                debug!(type_name, provider = ?provider, shape = shape.name(), "built converter");
                return Ok(converter);
            }
        }
        Err(Error::configuration(
            type_name,
            format!("no converter available for {} shape", shape.name()),
        ))
    }

    pub fn to_vec<T: CborType>(&self, value: &T) -> Result<Vec<u8>> {
        let converter = self.converter::<T>()?;
        let mut writer = Writer::new(self.options());
        converter.write(&mut writer, value)?;
        Ok(writer.into_inner())
    }

    /// Decodes exactly one item; trailing bytes are an error.
    pub fn from_slice<T: CborType>(&self, bytes: &[u8]) -> Result<T> {
        let converter = self.converter::<T>()?;
        let mut reader = Reader::new(bytes, self.options());
        let value = converter.read(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(Options::default())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("options", &self.inner.options)
            .field("cached", &self.cached())
            .finish()
    }
}
