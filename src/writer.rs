use half::f16;

use crate::error::{Error, Result};
use crate::options::{LengthMode, Options};
use crate::wire::{
    BREAK, FALSE, FLOAT16, FLOAT32, FLOAT64, INFO_INDEFINITE, INFO_UINT8, INFO_UINT16,
    INFO_UINT32, INFO_UINT64, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_SIMPLE,
    MAJOR_TAG, MAJOR_TEXT, MAJOR_UNSIGNED, NULL, SIMPLE_EXTENDED, TRUE, UNDEFINED, Width,
    initial_byte,
};

/// An open array or map.
#[derive(Debug)]
struct Frame {
    map: bool,
    indefinite: bool,
    /// Items still owed to a definite container (map entries count twice).
    remaining: u64,
}

/// Encodes CBOR items into a growable in-memory buffer.
///
/// The writer never reads back what it produced. Callers write a header,
/// then exactly the declared number of items, then close the container;
/// definite counts are checked in debug builds.
pub struct Writer<'o> {
    buf: Vec<u8>,
    options: &'o Options,
    frames: Vec<Frame>,
    next_length_mode: Option<LengthMode>,
}

impl<'o> Writer<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self::with_capacity(64, options)
    }

    pub fn with_capacity(capacity: usize, options: &'o Options) -> Self {
        Writer {
            buf: Vec::with_capacity(capacity),
            options,
            frames: Vec::new(),
            next_length_mode: None,
        }
    }

    pub fn options(&self) -> &'o Options {
        self.options
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        debug_assert!(self.frames.is_empty(), "{} containers left open", self.frames.len());
        self.buf
    }

    /// Counts one complete item against the innermost open container. A
    /// pending length override only applies to the item that follows it.
    fn item(&mut self) {
        self.next_length_mode = None;
        if let Some(frame) = self.frames.last_mut() {
            if !frame.indefinite {
                debug_assert!(
                    frame.remaining > 0,
                    "more items written than the declared {} length",
                    if frame.map { "map" } else { "array" }
                );
                frame.remaining = frame.remaining.saturating_sub(1);
            }
        }
    }

    fn write_type_value(&mut self, major: u8, value: u64) {
        self.write_type_value_with_width(major, value, Width::Minimal)
    }

    fn write_type_value_with_width(&mut self, major: u8, value: u64, width: Width) {
        let width = match width {
            Width::Minimal if value < 24 => None,
            Width::Minimal if value < 256 => Some(Width::U8),
            Width::Minimal if value < 65536 => Some(Width::U16),
            Width::Minimal if value < 4294967296 => Some(Width::U32),
            Width::Minimal => Some(Width::U64),
            // a forced width never truncates
            forced => Some(forced.max(match value {
                0..=255 => Width::U8,
                256..=65535 => Width::U16,
                65536..=4294967295 => Width::U32,
                _ => Width::U64,
            })),
        };
        match width {
            None => self.buf.push(initial_byte(major, value as u8)),
            Some(Width::U8) => {
                self.buf.extend_from_slice(&[initial_byte(major, INFO_UINT8), value as u8])
            }
            Some(Width::U16) => {
                self.buf.push(initial_byte(major, INFO_UINT16));
                self.buf.extend_from_slice(&(value as u16).to_be_bytes());
            }
            Some(Width::U32) => {
                self.buf.push(initial_byte(major, INFO_UINT32));
                self.buf.extend_from_slice(&(value as u32).to_be_bytes());
            }
            Some(_) => {
                self.buf.push(initial_byte(major, INFO_UINT64));
                self.buf.extend_from_slice(&value.to_be_bytes());
            }
        }
    }

    pub fn write_boolean(&mut self, v: bool) {
        self.item();
        let val = if v { TRUE } else { FALSE };
        self.buf.push(initial_byte(MAJOR_SIMPLE, val));
    }

    pub fn write_null(&mut self) {
        self.item();
        self.buf.push(initial_byte(MAJOR_SIMPLE, NULL));
    }

    pub fn write_undefined(&mut self) {
        self.item();
        self.buf.push(initial_byte(MAJOR_SIMPLE, UNDEFINED));
    }

    /// Writes a simple value; 24..=31 are not valid simple values.
    pub fn write_simple(&mut self, value: u8) -> Result<()> {
        match value {
            0..=23 => {
                self.item();
                self.buf.push(initial_byte(MAJOR_SIMPLE, value));
            }
            32..=255 => {
                self.item();
                self.buf.extend_from_slice(&[initial_byte(MAJOR_SIMPLE, SIMPLE_EXTENDED), value]);
            }
            _ => {
                return Err(Error::malformed(
                    self.buf.len(),
                    format!("simple value {} is reserved", value),
                ));
            }
        }
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) {
        self.item();
        self.write_type_value(MAJOR_UNSIGNED, v);
    }

    /// Writes an unsigned integer with at least the given argument width.
    pub fn write_u64_with_width(&mut self, v: u64, width: Width) {
        self.item();
        self.write_type_value_with_width(MAJOR_UNSIGNED, v, width);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.item();
        if v >= 0 {
            self.write_type_value(MAJOR_UNSIGNED, v as u64)
        } else {
            self.write_type_value(MAJOR_NEGATIVE, (-1 - v) as u64)
        }
    }

    /// Writes any integer in the CBOR range `-2^64 ..= 2^64 - 1`.
    pub fn write_integer(&mut self, v: i128) -> Result<()> {
        if v >= 0 {
            let value = u64::try_from(v)
                .map_err(|_| Error::out_of_range(self.buf.len(), "CBOR integer"))?;
            self.write_u64(value);
        } else {
            let value = u64::try_from(-1 - v)
                .map_err(|_| Error::out_of_range(self.buf.len(), "CBOR integer"))?;
            self.item();
            self.write_type_value(MAJOR_NEGATIVE, value);
        }
        Ok(())
    }

    pub fn write_f16(&mut self, v: f16) {
        self.item();
        self.buf.push(initial_byte(MAJOR_SIMPLE, FLOAT16));
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.item();
        self.buf.push(initial_byte(MAJOR_SIMPLE, FLOAT32));
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    fn write_double(&mut self, v: f64) {
        self.item();
        self.buf.push(initial_byte(MAJOR_SIMPLE, FLOAT64));
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    /// Writes a double; with `compact_floats` the narrowest lossless width is used.
    #[cfg(not(feature = "compact_floats"))]
    pub fn write_f64(&mut self, v: f64) {
        self.write_double(v)
    }

    /// Writes a double; with `compact_floats` the narrowest lossless width is used.
    #[cfg(feature = "compact_floats")]
    pub fn write_f64(&mut self, v: f64) {
        if v.is_nan() {
            return self.write_f16(f16::NAN);
        }
        let half = f16::from_f64(v);
        if half.to_f64() == v {
            return self.write_f16(half);
        }
        let single = v as f32;
        if single as f64 == v {
            return self.write_f32(single);
        }
        self.write_double(v)
    }

    pub fn write_byte_string(&mut self, v: &[u8]) {
        self.item();
        self.write_type_value(MAJOR_BYTES, v.len() as u64);
        self.buf.extend_from_slice(v);
    }

    pub fn write_text_string(&mut self, v: &str) {
        self.item();
        self.write_type_value(MAJOR_TEXT, v.len() as u64);
        self.buf.extend_from_slice(v.as_bytes());
    }

    /// Writes a tag; the next item written is the tagged value.
    pub fn write_tag(&mut self, tag: u64) {
        self.write_type_value(MAJOR_TAG, tag);
    }

    /// Overrides the length mode of the next array or map header only.
    pub fn set_next_length_mode(&mut self, mode: Option<LengthMode>) {
        self.next_length_mode = mode;
    }

    /// Like [`Writer::set_next_length_mode`], but keeps an override already pending.
    pub fn default_next_length_mode(&mut self, mode: Option<LengthMode>) {
        if self.next_length_mode.is_none() {
            self.next_length_mode = mode;
        }
    }

    fn begin(&mut self, major: u8, len: usize, indefinite: bool) {
        self.item();
        let map = major == MAJOR_MAP;
        if indefinite {
            self.buf.push(initial_byte(major, INFO_INDEFINITE));
        } else {
            self.write_type_value(major, len as u64);
        }
        self.frames.push(Frame {
            map,
            indefinite,
            remaining: if map { len as u64 * 2 } else { len as u64 },
        });
    }

    /// Opens an array of `len` items, definite or indefinite per options.
    pub fn begin_array(&mut self, len: usize) {
        let indefinite = self.options.indefinite_arrays(self.next_length_mode.take());
        self.begin(MAJOR_ARRAY, len, indefinite);
    }

    /// Opens a map of `len` key/value pairs, definite or indefinite per options.
    pub fn begin_map(&mut self, len: usize) {
        let indefinite = self.options.indefinite_maps(self.next_length_mode.take());
        self.begin(MAJOR_MAP, len, indefinite);
    }

    fn end(&mut self, map: bool) {
        let Some(frame) = self.frames.pop() else {
            debug_assert!(false, "no open container to close");
            return;
        };
        debug_assert_eq!(frame.map, map, "closing a container of the wrong kind");
        if frame.indefinite {
            self.buf.push(BREAK);
        } else {
            debug_assert_eq!(frame.remaining, 0, "fewer items written than declared");
        }
    }

    pub fn end_array(&mut self) {
        self.end(false)
    }

    pub fn end_map(&mut self) {
        self.end(true)
    }
}
