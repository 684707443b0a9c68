use std::sync::Arc;

use crate::converter::Converter;
use crate::error::Result;
use crate::reader::Reader;
use crate::registry::Registry;
use crate::shape::{CborType, TypeShape};
use crate::writer::Writer;

/// A value with an optional semantic tag in front of it.
///
/// Untagged input reads as `tag: None`, so a `Tagged<T>` member accepts
/// payloads from peers that omit the tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub tag: Option<u64>,
    pub value: T,
}

impl<T> Tagged<T> {
    pub fn new(tag: Option<u64>, value: T) -> Self {
        Tagged { tag, value }
    }
}

pub struct TaggedConverter<T> {
    inner: Arc<dyn Converter<T>>,
}

impl<T: CborType> TaggedConverter<T> {
    pub fn build(registry: &Registry) -> Result<Arc<dyn Converter<Tagged<T>>>> {
        let converter: Arc<dyn Converter<Tagged<T>>> = Arc::new(TaggedConverter {
            inner: registry.converter::<T>()?,
        });
        Ok(converter)
    }
}

impl<T: CborType> Converter<Tagged<T>> for TaggedConverter<T> {
    fn read(&self, reader: &mut Reader<'_>) -> Result<Tagged<T>> {
        let tag = reader.try_read_tag()?;
        reader.enter()?;
        let value = self.inner.read(reader)?;
        reader.leave();
        Ok(Tagged { tag, value })
    }

    fn write(&self, writer: &mut Writer<'_>, value: &Tagged<T>) -> Result<()> {
        if let Some(tag) = value.tag {
            writer.write_tag(tag);
        }
        self.inner.write(writer, &value.value)
    }
}

impl<T: CborType> CborType for Tagged<T> {
    fn shape() -> TypeShape<Self> {
        TypeShape::Wrapper {
            build: TaggedConverter::<T>::build,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_round_trip() {
        let tagged_original = Tagged::new(Some(32), "https://example.com".to_string());
        let cbor = crate::to_vec(&tagged_original).unwrap();
        assert_eq!(&cbor[..3], [0xd8, 0x20, 0x73]);
        let tagged_decoded: Tagged<String> = crate::from_slice(&cbor).unwrap();
        assert_eq!(tagged_decoded, tagged_original);
    }

    #[test]
    fn test_untagged_input() {
        let tagged: Tagged<u32> = crate::from_slice(&[0x18, 0x2a]).unwrap();
        assert_eq!(tagged.tag, None);
        assert_eq!(tagged.value, 42);
        assert_eq!(crate::to_vec(&tagged).unwrap(), [0x18, 0x2a]);
    }

    #[test]
    fn test_nested_tags() {
        // 1(24(h'00')): the outer tag is kept, the inner one belongs to the content
        let tagged: Tagged<Tagged<serde_bytes::ByteBuf>> =
            crate::from_slice(&[0xc1, 0xd8, 0x18, 0x41, 0x00]).unwrap();
        assert_eq!(tagged.tag, Some(1));
        assert_eq!(tagged.value.tag, Some(24));
    }
}
