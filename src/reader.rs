use std::borrow::Cow;

use half::f16;

use crate::error::{Error, Result};
use crate::options::Options;
use crate::wire::{
    AdditionalInfo, BREAK, FALSE, FLOAT16, FLOAT32, FLOAT64, MajorType, NULL, TRUE, UNDEFINED,
};

/// Element count of an array or map header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Definite(u64),
    /// Items follow until a break byte.
    Indefinite,
}

/// A decoded initial byte plus its argument.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Head {
    pub offset: usize,
    pub major: MajorType,
    pub info: u8,
    /// `None` for indefinite length (or the break code under major type 7).
    pub argument: Option<u64>,
}

/// Forward-only cursor over a fully materialized CBOR buffer.
///
/// Cloning a reader is cheap and gives an independent cursor, which is how
/// converters look ahead without consuming input.
#[derive(Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    options: &'a Options,
    depth: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], options: &'a Options) -> Self {
        Reader {
            data,
            pos: 0,
            options,
            depth: 0,
        }
    }

    pub fn options(&self) -> &'a Options {
        self.options
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Fails if anything follows the last decoded item.
    pub fn finish(&self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(Error::malformed(
                self.pos,
                format!("{} trailing bytes after value", self.data.len() - self.pos),
            ))
        }
    }

    fn peek_u8(&self) -> Result<u8> {
        self.data.get(self.pos).copied().ok_or_else(|| Error::eof(self.pos))
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_u8()?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: u64) -> Result<&'a [u8]> {
        let available = (self.data.len() - self.pos) as u64;
        if len > available {
            return Err(Error::malformed(
                self.pos,
                format!("length {} exceeds the {} remaining bytes", len, available),
            ));
        }
        let start = self.pos;
        self.pos += len as usize;
        Ok(&self.data[start..self.pos])
    }

    fn read_uint_be(&mut self, width: usize) -> Result<u64> {
        let bytes = self.take(width as u64)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    pub(crate) fn read_head(&mut self) -> Result<Head> {
        let offset = self.pos;
        let initial = self.read_u8()?;
        let major = MajorType::from_initial(initial);
        let info = initial & 0x1f;
        let argument = match AdditionalInfo::from_initial(initial) {
            AdditionalInfo::Embedded(value) => Some(value as u64),
            AdditionalInfo::FollowOn(width) => {
                let value = self.read_uint_be(width)?;
                // simple values below 32 only have the one-byte form
                if major == MajorType::Simple && width == 1 && value < 32 {
                    return Err(Error::malformed(
                        offset,
                        format!("two-byte encoding of simple value {}", value),
                    ));
                }
                Some(value)
            }
            AdditionalInfo::Indefinite => {
                if !major.allows_indefinite() && major != MajorType::Simple {
                    return Err(Error::malformed(
                        offset,
                        format!("indefinite length is not allowed for {}", major),
                    ));
                }
                None
            }
            AdditionalInfo::Reserved(value) => {
                return Err(Error::malformed(
                    offset,
                    format!("reserved additional info {}", value),
                ));
            }
        };
        Ok(Head {
            offset,
            major,
            info,
            argument,
        })
    }

    /// Inspects the next item's major type without consuming it.
    pub fn peek_major_type(&self) -> Result<MajorType> {
        Ok(MajorType::from_initial(self.peek_u8()?))
    }

    /// Whether the next byte is the break code of an indefinite container.
    pub fn is_break(&self) -> Result<bool> {
        Ok(self.peek_u8()? == BREAK)
    }

    pub fn read_break(&mut self) -> Result<()> {
        let offset = self.pos;
        if self.read_u8()? != BREAK {
            return Err(Error::malformed(offset, "expected break"));
        }
        Ok(())
    }

    /// Advances a container cursor. Returns `false` once a definite count is
    /// exhausted or the break byte of an indefinite container was consumed.
    pub fn has_next(&mut self, remaining: &mut Length) -> Result<bool> {
        match remaining {
            Length::Definite(0) => Ok(false),
            Length::Definite(n) => {
                *n -= 1;
                Ok(true)
            }
            Length::Indefinite => {
                if self.is_break()? {
                    self.pos += 1;
                    Ok(false)
                } else {
                    Ok(true)
                }
            }
        }
    }

    fn definite(head: &Head, what: &'static str) -> Result<u64> {
        head.argument
            .ok_or_else(|| Error::malformed(head.offset, format!("indefinite {}", what)))
    }

    pub fn read_boolean(&mut self) -> Result<bool> {
        let head = self.read_head()?;
        match (head.major, head.info) {
            (MajorType::Simple, FALSE) => Ok(false),
            (MajorType::Simple, TRUE) => Ok(true),
            (major, _) => Err(Error::unexpected(head.offset, "boolean", major)),
        }
    }

    pub fn read_null(&mut self) -> Result<()> {
        let head = self.read_head()?;
        match (head.major, head.info) {
            (MajorType::Simple, NULL) => Ok(()),
            (major, _) => Err(Error::unexpected(head.offset, "null", major)),
        }
    }

    pub fn read_undefined(&mut self) -> Result<()> {
        let head = self.read_head()?;
        match (head.major, head.info) {
            (MajorType::Simple, UNDEFINED) => Ok(()),
            (major, _) => Err(Error::unexpected(head.offset, "undefined", major)),
        }
    }

    /// Consumes a null (or undefined) if one is next.
    pub fn try_read_null(&mut self) -> Result<bool> {
        let initial = self.peek_u8()?;
        if initial == 0xf6 || initial == 0xf7 {
            self.pos += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Reads a simple value (major type 7, excluding floats and break).
    pub fn read_simple(&mut self) -> Result<u8> {
        let head = self.read_head()?;
        match (head.major, head.info, head.argument) {
            (MajorType::Simple, 0..=24, Some(value)) => Ok(value as u8),
            (MajorType::Simple, _, None) => Err(Error::malformed(head.offset, "unexpected break")),
            (major, _, _) => Err(Error::unexpected(head.offset, "simple value", major)),
        }
    }

    /// Reads major type 0 or 1 as a signed 128-bit value.
    pub fn read_integer(&mut self) -> Result<i128> {
        let head = self.read_head()?;
        match head.major {
            MajorType::Unsigned => Ok(Self::definite(&head, "integer")? as i128),
            MajorType::Negative => Ok(-1 - Self::definite(&head, "integer")? as i128),
            major => Err(Error::unexpected(head.offset, "integer", major)),
        }
    }

    /// Reads an integer and narrows it to `T`.
    pub fn read_int<T: TryFrom<i128>>(&mut self) -> Result<T> {
        let offset = self.pos;
        let value = self.read_integer()?;
        T::try_from(value).map_err(|_| Error::out_of_range(offset, std::any::type_name::<T>()))
    }

    pub fn read_unsigned(&mut self) -> Result<u64> {
        let head = self.read_head()?;
        match head.major {
            MajorType::Unsigned => Self::definite(&head, "integer"),
            major => Err(Error::unexpected(head.offset, "unsigned integer", major)),
        }
    }

    /// Reads any float width (integers are accepted and converted).
    pub fn read_f64(&mut self) -> Result<f64> {
        let head = self.read_head()?;
        match (head.major, head.info, head.argument) {
            (MajorType::Simple, FLOAT16, Some(bits)) => Ok(f16::from_bits(bits as u16).to_f64()),
            (MajorType::Simple, FLOAT32, Some(bits)) => Ok(f32::from_bits(bits as u32) as f64),
            (MajorType::Simple, FLOAT64, Some(bits)) => Ok(f64::from_bits(bits)),
            (MajorType::Unsigned, _, Some(value)) => Ok(value as f64),
            (MajorType::Negative, _, Some(value)) => Ok((-1 - value as i128) as f64),
            (major, _, _) => Err(Error::unexpected(head.offset, "float", major)),
        }
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.read_f64()? as f32)
    }

    pub fn read_f16(&mut self) -> Result<f16> {
        Ok(f16::from_f64(self.read_f64()?))
    }

    fn read_string_payload(&mut self, expected: MajorType) -> Result<Cow<'a, [u8]>> {
        let head = self.read_head()?;
        if head.major != expected {
            return Err(Error::unexpected(head.offset, expected.name(), head.major));
        }
        match head.argument {
            Some(len) => Ok(Cow::Borrowed(self.take(len)?)),
            None => {
                let mut buf = Vec::new();
                loop {
                    if self.is_break()? {
                        self.pos += 1;
                        break;
                    }
                    let chunk = self.read_head()?;
                    if chunk.major != expected {
                        return Err(Error::malformed(
                            chunk.offset,
                            format!("{} chunk inside indefinite {}", chunk.major, expected),
                        ));
                    }
                    let len = chunk.argument.ok_or_else(|| {
                        Error::malformed(chunk.offset, "nested indefinite-length chunk")
                    })?;
                    buf.extend_from_slice(self.take(len)?);
                }
                Ok(Cow::Owned(buf))
            }
        }
    }

    /// Reads a byte string, concatenating indefinite-length chunks.
    pub fn read_byte_string(&mut self) -> Result<Cow<'a, [u8]>> {
        self.read_string_payload(MajorType::Bytes)
    }

    /// Reads a UTF-8 text string, concatenating indefinite-length chunks.
    pub fn read_text_string(&mut self) -> Result<Cow<'a, str>> {
        let offset = self.pos;
        match self.read_string_payload(MajorType::Text)? {
            Cow::Borrowed(bytes) => std::str::from_utf8(bytes)
                .map(Cow::Borrowed)
                .map_err(|_| Error::malformed(offset, "invalid UTF-8 in text string")),
            Cow::Owned(bytes) => String::from_utf8(bytes)
                .map(Cow::Owned)
                .map_err(|_| Error::malformed(offset, "invalid UTF-8 in text string")),
        }
    }

    fn read_container_header(&mut self, expected: MajorType) -> Result<Length> {
        let head = self.read_head()?;
        if head.major != expected {
            return Err(Error::unexpected(head.offset, expected.name(), head.major));
        }
        Ok(match head.argument {
            Some(count) => Length::Definite(count),
            None => Length::Indefinite,
        })
    }

    pub fn read_array_header(&mut self) -> Result<Length> {
        self.read_container_header(MajorType::Array)
    }

    /// Returns the number of key/value pairs.
    pub fn read_map_header(&mut self) -> Result<Length> {
        self.read_container_header(MajorType::Map)
    }

    pub fn read_tag(&mut self) -> Result<u64> {
        let head = self.read_head()?;
        match head.major {
            MajorType::Tag => Self::definite(&head, "tag"),
            major => Err(Error::unexpected(head.offset, "tag", major)),
        }
    }

    /// Returns the tag number if the next item is a tag, without consuming it.
    pub fn peek_tag(&self) -> Result<Option<u64>> {
        if self.peek_major_type()? != MajorType::Tag {
            return Ok(None);
        }
        self.clone().read_tag().map(Some)
    }

    /// Consumes a tag if one is next and returns its number.
    pub fn try_read_tag(&mut self) -> Result<Option<u64>> {
        if self.peek_major_type()? == MajorType::Tag {
            self.read_tag().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Enters one nesting level, failing beyond `Options::max_depth`.
    pub fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(Error::depth_exceeded(self.pos, self.options.max_depth));
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Structurally consumes and discards the next item of any type.
    pub fn skip_value(&mut self) -> Result<()> {
        self.enter()?;
        let result = self.skip_item();
        self.leave();
        result
    }

    fn skip_item(&mut self) -> Result<()> {
        let head = self.read_head()?;
        match head.major {
            MajorType::Unsigned | MajorType::Negative => Ok(()),
            MajorType::Bytes | MajorType::Text => {
                self.pos = head.offset;
                self.read_string_payload(head.major).map(|_| ())
            }
            MajorType::Array | MajorType::Map => {
                let per_entry = if head.major == MajorType::Map { 2 } else { 1 };
                match head.argument {
                    Some(count) => {
                        for _ in 0..count.saturating_mul(per_entry) {
                            self.skip_value()?;
                        }
                    }
                    None => {
                        while !self.is_break()? {
                            for _ in 0..per_entry {
                                self.skip_value()?;
                            }
                        }
                        self.pos += 1;
                    }
                }
                Ok(())
            }
            MajorType::Tag => self.skip_value(),
            MajorType::Simple => match head.argument {
                Some(_) => Ok(()),
                None => Err(Error::malformed(head.offset, "unexpected break")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(bytes: &[u8]) -> Reader<'_> {
        static OPTIONS: once_cell::sync::Lazy<Options> =
            once_cell::sync::Lazy::new(Options::default);
        Reader::new(bytes, &OPTIONS)
    }

    #[test]
    fn test_integer_widths() {
        assert_eq!(reader(&[0x17]).read_integer().unwrap(), 23);
        assert_eq!(reader(&[0x18, 0x18]).read_integer().unwrap(), 24);
        assert_eq!(reader(&[0x19, 0x01, 0x00]).read_integer().unwrap(), 256);
        assert_eq!(
            reader(&[0x1a, 0x00, 0x01, 0x00, 0x00]).read_integer().unwrap(),
            65536
        );
        assert_eq!(
            reader(&[0x1b, 0, 0, 0, 1, 0, 0, 0, 0]).read_integer().unwrap(),
            4294967296
        );
        assert_eq!(reader(&[0x38, 0x63]).read_integer().unwrap(), -100);
        assert_eq!(
            reader(&[0x3b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
                .read_integer()
                .unwrap(),
            -18446744073709551616
        );
    }

    #[test]
    fn test_reserved_additional_info_fails() {
        for initial in [0x1c, 0x1d, 0x1e, 0x5c, 0x9d, 0xfe] {
            let err = reader(&[initial, 0, 0, 0]).skip_value().unwrap_err();
            assert!(matches!(err, Error::MalformedHeader { offset: 0, .. }), "{:#x}", initial);
        }
    }

    #[test]
    fn test_two_byte_simple_values() {
        for value in [0x00, 0x14, 0x17, 0x1f] {
            let err = reader(&[0xf8, value]).read_simple().unwrap_err();
            assert!(matches!(err, Error::MalformedHeader { offset: 0, .. }), "{:#x}", value);
        }
        assert_eq!(reader(&[0xf8, 0x20]).read_simple().unwrap(), 32);
        assert_eq!(reader(&[0xf8, 0xff]).read_simple().unwrap(), 255);
    }

    #[test]
    fn test_indefinite_not_allowed_for_integers() {
        assert!(matches!(
            reader(&[0x1f]).read_integer(),
            Err(Error::MalformedHeader { .. })
        ));
        assert!(matches!(
            reader(&[0xdf, 0x00]).read_tag(),
            Err(Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_narrowing_out_of_range() {
        let err = reader(&[0x19, 0x01, 0x2c]).read_int::<u8>().unwrap_err();
        assert!(matches!(err, Error::OutOfRange { offset: 0, .. }));
        assert_eq!(reader(&[0x20]).read_int::<i8>().unwrap(), -1);
    }

    #[test]
    fn test_half_float_widening() {
        assert_eq!(reader(&[0xf9, 0x3c, 0x00]).read_f64().unwrap(), 1.0);
        assert_eq!(reader(&[0xf9, 0x7b, 0xff]).read_f32().unwrap(), 65504.0);
        assert!(reader(&[0xf9, 0x7c, 0x00]).read_f64().unwrap().is_infinite());
        assert_eq!(
            reader(&[0xfa, 0x47, 0xc3, 0x50, 0x00]).read_f64().unwrap(),
            100000.0
        );
    }

    #[test]
    fn test_indefinite_text_chunks() {
        // (_ "strea", "ming")
        let bytes = [
            0x7f, 0x65, b's', b't', b'r', b'e', b'a', 0x64, b'm', b'i', b'n', b'g', 0xff,
        ];
        let mut r = reader(&bytes);
        assert_eq!(r.read_text_string().unwrap(), "streaming");
        assert!(r.is_at_end());
    }

    #[test]
    fn test_indefinite_chunk_major_mismatch() {
        // indefinite text containing a byte-string chunk
        let bytes = [0x7f, 0x41, 0x00, 0xff];
        let err = reader(&bytes).read_text_string().unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { offset: 1, .. }));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = reader(&[0x62, 0xc3, 0x28]).read_text_string().unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { .. }));
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(
            reader(&[0x19, 0x01]).read_integer(),
            Err(Error::MalformedHeader { .. })
        ));
        assert!(matches!(
            reader(&[0x65, b'a']).read_text_string(),
            Err(Error::MalformedHeader { .. })
        ));
        assert!(matches!(reader(&[]).peek_major_type(), Err(Error::MalformedHeader { .. })));
    }

    #[test]
    fn test_skip_value_nested() {
        // [1, {"a": [2, 3]}, tag(1) 4, (_ h'01')] followed by 0x05
        let bytes = [
            0x84, 0x01, 0xa1, 0x61, b'a', 0x82, 0x02, 0x03, 0xc1, 0x04, 0x5f, 0x41, 0x01, 0xff,
            0x05,
        ];
        let mut r = reader(&bytes);
        r.skip_value().unwrap();
        assert_eq!(r.read_integer().unwrap(), 5);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn test_skip_indefinite_map() {
        let bytes = [0xbf, 0x61, b'k', 0x9f, 0x01, 0xff, 0xff, 0xf5];
        let mut r = reader(&bytes);
        r.skip_value().unwrap();
        assert!(r.read_boolean().unwrap());
    }

    #[test]
    fn test_has_next() {
        let bytes = [0x9f, 0x01, 0x02, 0xff];
        let mut r = reader(&bytes);
        let mut len = r.read_array_header().unwrap();
        assert_eq!(len, Length::Indefinite);
        let mut items = Vec::new();
        while r.has_next(&mut len).unwrap() {
            items.push(r.read_integer().unwrap());
        }
        assert_eq!(items, vec![1, 2]);
        assert!(r.is_at_end());
    }

    #[test]
    fn test_depth_limit() {
        let options = Options {
            max_depth: 3,
            ..Options::default()
        };
        let bytes = [0x81, 0x81, 0x81, 0x81, 0x00];
        let err = Reader::new(&bytes, &options).skip_value().unwrap_err();
        assert!(matches!(err, Error::DepthLimitExceeded { limit: 3, .. }));
    }

    #[test]
    fn test_peek_tag_does_not_consume() {
        let bytes = [0xd8, 0x27, 0x80];
        let mut r = reader(&bytes);
        assert_eq!(r.peek_tag().unwrap(), Some(39));
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_tag().unwrap(), 39);
        assert_eq!(r.read_array_header().unwrap(), Length::Definite(0));
    }
}
