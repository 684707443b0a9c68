//! CBOR wire value model (RFC 8949): major types, additional-information
//! widths and the simple values of major type 7.

use std::fmt;

// CBOR major types
pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

// Additional info values
pub const INFO_UINT8: u8 = 24;
pub const INFO_UINT16: u8 = 25;
pub const INFO_UINT32: u8 = 26;
pub const INFO_UINT64: u8 = 27;
pub const INFO_INDEFINITE: u8 = 31;

// Simple values (major type 7)
pub const FALSE: u8 = 20;
pub const TRUE: u8 = 21;
pub const NULL: u8 = 22;
pub const UNDEFINED: u8 = 23;
pub const SIMPLE_EXTENDED: u8 = 24;
pub const FLOAT16: u8 = 25;
pub const FLOAT32: u8 = 26;
pub const FLOAT64: u8 = 27;

/// The "break" stop code terminating indefinite-length items.
pub const BREAK: u8 = 0xff;

// Standard CBOR tags (RFC 8949)
pub const TAG_DATETIME_STRING: u64 = 0; // Standard date/time string (RFC 3339)
pub const TAG_EPOCH_DATETIME: u64 = 1; // Epoch-based date/time

/// Default tag wrapping an array-layout polymorphic value.
pub const TAG_DISCRIMINATOR: u64 = 39;

/// One of the eight top-level wire categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorType {
    Unsigned,
    Negative,
    Bytes,
    Text,
    Array,
    Map,
    Tag,
    Simple,
}

impl MajorType {
    /// Extracts the major type from an initial byte.
    pub fn from_initial(initial: u8) -> MajorType {
        match initial >> 5 {
            MAJOR_UNSIGNED => MajorType::Unsigned,
            MAJOR_NEGATIVE => MajorType::Negative,
            MAJOR_BYTES => MajorType::Bytes,
            MAJOR_TEXT => MajorType::Text,
            MAJOR_ARRAY => MajorType::Array,
            MAJOR_MAP => MajorType::Map,
            MAJOR_TAG => MajorType::Tag,
            _ => MajorType::Simple,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            MajorType::Unsigned => MAJOR_UNSIGNED,
            MajorType::Negative => MAJOR_NEGATIVE,
            MajorType::Bytes => MAJOR_BYTES,
            MajorType::Text => MAJOR_TEXT,
            MajorType::Array => MAJOR_ARRAY,
            MajorType::Map => MAJOR_MAP,
            MajorType::Tag => MAJOR_TAG,
            MajorType::Simple => MAJOR_SIMPLE,
        }
    }

    /// Whether additional info 31 (indefinite length) is legal for this major type.
    pub fn allows_indefinite(self) -> bool {
        matches!(
            self,
            MajorType::Bytes | MajorType::Text | MajorType::Array | MajorType::Map
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            MajorType::Unsigned => "unsigned integer",
            MajorType::Negative => "negative integer",
            MajorType::Bytes => "byte string",
            MajorType::Text => "text string",
            MajorType::Array => "array",
            MajorType::Map => "map",
            MajorType::Tag => "tag",
            MajorType::Simple => "simple/float",
        }
    }
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded meaning of the low five bits of an initial byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalInfo {
    /// Value 0..=23 carried in the initial byte itself.
    Embedded(u8),
    /// 1, 2, 4 or 8 big-endian bytes follow.
    FollowOn(usize),
    Indefinite,
    /// 28..=30, never valid.
    Reserved(u8),
}

impl AdditionalInfo {
    pub fn from_initial(initial: u8) -> AdditionalInfo {
        match initial & 0x1f {
            info @ 0..=23 => AdditionalInfo::Embedded(info),
            INFO_UINT8 => AdditionalInfo::FollowOn(1),
            INFO_UINT16 => AdditionalInfo::FollowOn(2),
            INFO_UINT32 => AdditionalInfo::FollowOn(4),
            INFO_UINT64 => AdditionalInfo::FollowOn(8),
            INFO_INDEFINITE => AdditionalInfo::Indefinite,
            info => AdditionalInfo::Reserved(info),
        }
    }
}

/// Packs a major type and additional info into an initial byte.
#[inline]
pub const fn initial_byte(major: u8, info: u8) -> u8 {
    (major << 5) | info
}

/// Integer argument widths a writer can be forced to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Width {
    Minimal,
    U8,
    U16,
    U32,
    U64,
}

/// Number of bytes the minimal encoding of `value` occupies after the initial byte.
pub fn follow_on_len(value: u64) -> usize {
    if value < 24 {
        0
    } else if value < 256 {
        1
    } else if value < 65536 {
        2
    } else if value < 4294967296 {
        4
    } else {
        8
    }
}
