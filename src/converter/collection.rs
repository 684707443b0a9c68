//! Sequence, set and map converters.
//!
//! Element converters are resolved eagerly, when the collection converter is
//! built. Sequences and sets are arrays; maps are CBOR maps with keys of any
//! registered type.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::reader::{Length, Reader};
use crate::registry::Registry;
use crate::shape::{CborType, CollectionKind, TypeShape};
use crate::writer::Writer;

/// Caps preallocation so a hostile length prefix cannot reserve huge buffers.
const MAX_PREALLOCATE: u64 = 4096;

fn capacity(len: Length) -> usize {
    match len {
        Length::Definite(n) => n.min(MAX_PREALLOCATE) as usize,
        Length::Indefinite => 0,
    }
}

/// A container written as a CBOR array.
pub trait Sequence: Sized + 'static {
    type Item: CborType;

    fn len(&self) -> usize;

    fn items(&self) -> impl Iterator<Item = &Self::Item>;

    /// `None` when the decoded items cannot form the container.
    fn from_items(items: Vec<Self::Item>) -> Option<Self>;
}

impl<E: CborType> Sequence for Vec<E> {
    type Item = E;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn items(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }

    fn from_items(items: Vec<E>) -> Option<Self> {
        Some(items)
    }
}

impl<E: CborType> Sequence for VecDeque<E> {
    type Item = E;

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn items(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }

    fn from_items(items: Vec<E>) -> Option<Self> {
        Some(items.into())
    }
}

impl<E: CborType> Sequence for Box<[E]> {
    type Item = E;

    fn len(&self) -> usize {
        <[E]>::len(self)
    }

    fn items(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }

    fn from_items(items: Vec<E>) -> Option<Self> {
        Some(items.into_boxed_slice())
    }
}

impl<E: CborType, const N: usize> Sequence for [E; N] {
    type Item = E;

    fn len(&self) -> usize {
        N
    }

    fn items(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }

    fn from_items(items: Vec<E>) -> Option<Self> {
        items.try_into().ok()
    }
}

impl<E: CborType + Eq + Hash, S: BuildHasher + Default + 'static> Sequence for HashSet<E, S> {
    type Item = E;

    fn len(&self) -> usize {
        HashSet::len(self)
    }

    fn items(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }

    fn from_items(items: Vec<E>) -> Option<Self> {
        Some(items.into_iter().collect())
    }
}

impl<E: CborType + Ord> Sequence for BTreeSet<E> {
    type Item = E;

    fn len(&self) -> usize {
        BTreeSet::len(self)
    }

    fn items(&self) -> impl Iterator<Item = &E> {
        self.iter()
    }

    fn from_items(items: Vec<E>) -> Option<Self> {
        Some(items.into_iter().collect())
    }
}

pub struct SequenceConverter<S: Sequence> {
    element: Arc<dyn Converter<S::Item>>,
    _marker: PhantomData<fn() -> S>,
}

impl<S: Sequence> SequenceConverter<S> {
    pub fn new(element: Arc<dyn Converter<S::Item>>) -> Self {
        SequenceConverter {
            element,
            _marker: PhantomData,
        }
    }

    pub fn build(registry: &Registry) -> Result<Arc<dyn Converter<S>>> {
        let converter: Arc<dyn Converter<S>> =
            Arc::new(Self::new(registry.converter::<S::Item>()?));
        Ok(converter)
    }
}

impl<S: Sequence> Converter<S> for SequenceConverter<S> {
    fn read(&self, reader: &mut Reader<'_>) -> Result<S> {
        let offset = reader.position();
        reader.enter()?;
        let mut len = reader.read_array_header()?;
        let mut items = Vec::with_capacity(capacity(len));
        while reader.has_next(&mut len)? {
            items.push(self.element.read(reader)?);
        }
        reader.leave();
        let count = items.len();
        S::from_items(items).ok_or_else(|| {
            Error::type_mismatch(
                offset,
                std::any::type_name::<S>(),
                format!("array of {} items", count),
            )
        })
    }

    fn write(&self, writer: &mut Writer<'_>, value: &S) -> Result<()> {
        writer.begin_array(value.len());
        for item in value.items() {
            self.element.write(writer, item)?;
        }
        writer.end_array();
        Ok(())
    }
}

/// A container written as a CBOR map.
pub trait MapLike: Sized + 'static {
    type Key: CborType;
    type Value: CborType;

    fn len(&self) -> usize;

    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;

    fn from_entries(entries: Vec<(Self::Key, Self::Value)>) -> Self;
}

impl<K, V, S> MapLike for HashMap<K, V, S>
where
    K: CborType + Eq + Hash,
    V: CborType,
    S: BuildHasher + Default + 'static,
{
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }

    fn from_entries(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K: CborType + Ord, V: CborType> MapLike for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }

    fn from_entries(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

pub struct MapConverter<M: MapLike> {
    key: Arc<dyn Converter<M::Key>>,
    value: Arc<dyn Converter<M::Value>>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: MapLike> MapConverter<M> {
    pub fn build(registry: &Registry) -> Result<Arc<dyn Converter<M>>> {
        let converter: Arc<dyn Converter<M>> = Arc::new(MapConverter::<M> {
            key: registry.converter::<M::Key>()?,
            value: registry.converter::<M::Value>()?,
            _marker: PhantomData,
        });
        Ok(converter)
    }
}

impl<M: MapLike> Converter<M> for MapConverter<M> {
    /// Duplicate keys keep the last value.
    fn read(&self, reader: &mut Reader<'_>) -> Result<M> {
        reader.enter()?;
        let mut len = reader.read_map_header()?;
        let mut entries = Vec::with_capacity(capacity(len));
        while reader.has_next(&mut len)? {
            let key = self.key.read(reader)?;
            let value = self.value.read(reader)?;
            entries.push((key, value));
        }
        reader.leave();
        Ok(M::from_entries(entries))
    }

    fn write(&self, writer: &mut Writer<'_>, value: &M) -> Result<()> {
        writer.begin_map(value.len());
        for (k, v) in value.entries() {
            self.key.write(writer, k)?;
            self.value.write(writer, v)?;
        }
        writer.end_map();
        Ok(())
    }
}

impl<E: CborType> CborType for Vec<E> {
    fn shape() -> TypeShape<Self> {
        TypeShape::Collection {
            kind: CollectionKind::Sequence,
            build: SequenceConverter::<Self>::build,
        }
    }
}

impl<E: CborType> CborType for VecDeque<E> {
    fn shape() -> TypeShape<Self> {
        TypeShape::Collection {
            kind: CollectionKind::Sequence,
            build: SequenceConverter::<Self>::build,
        }
    }
}

impl<E: CborType> CborType for Box<[E]> {
    fn shape() -> TypeShape<Self> {
        TypeShape::Collection {
            kind: CollectionKind::Sequence,
            build: SequenceConverter::<Self>::build,
        }
    }
}

impl<E: CborType, const N: usize> CborType for [E; N] {
    fn shape() -> TypeShape<Self> {
        TypeShape::Collection {
            kind: CollectionKind::Sequence,
            build: SequenceConverter::<Self>::build,
        }
    }
}

impl<E: CborType + Eq + Hash, S: BuildHasher + Default + 'static> CborType for HashSet<E, S> {
    fn shape() -> TypeShape<Self> {
        TypeShape::Collection {
            kind: CollectionKind::Set,
            build: SequenceConverter::<Self>::build,
        }
    }
}

impl<E: CborType + Ord> CborType for BTreeSet<E> {
    fn shape() -> TypeShape<Self> {
        TypeShape::Collection {
            kind: CollectionKind::Set,
            build: SequenceConverter::<Self>::build,
        }
    }
}

impl<K, V, S> CborType for HashMap<K, V, S>
where
    K: CborType + Eq + Hash,
    V: CborType,
    S: BuildHasher + Default + 'static,
{
    fn shape() -> TypeShape<Self> {
        TypeShape::Collection {
            kind: CollectionKind::Map,
            build: MapConverter::<Self>::build,
        }
    }
}

impl<K: CborType + Ord, V: CborType> CborType for BTreeMap<K, V> {
    fn shape() -> TypeShape<Self> {
        TypeShape::Collection {
            kind: CollectionKind::Map,
            build: MapConverter::<Self>::build,
        }
    }
}
