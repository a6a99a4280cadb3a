// ABOUTME: PackStream marker byte constants, the lead-byte classifier and default limits.
// ABOUTME: Partitions the whole byte space into non-overlapping type bands.

use crate::error::{Error, Result};

/// Marker byte values.
/// These match the PackStream wire format exactly.
pub mod marker {
    // Tiny integers: 0x00-0x7f (0 to 127), 0xf0-0xff (-16 to -1)
    pub const TINY_INT_MAX: u8 = 0x7f;
    pub const TINY_INT_MIN: u8 = 0xf0; // -16 as i8

    // Tiny forms carry a 0-15 count in the low nibble
    pub const TINY_STRING: u8 = 0x80;
    pub const TINY_LIST: u8 = 0x90;
    pub const TINY_MAP: u8 = 0xa0;
    pub const TINY_STRUCT: u8 = 0xb0;

    pub const NULL: u8 = 0xc0;
    pub const FLOAT_64: u8 = 0xc1;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;

    pub const INT_8: u8 = 0xc8;
    pub const INT_16: u8 = 0xc9;
    pub const INT_32: u8 = 0xca;
    pub const INT_64: u8 = 0xcb;

    pub const BYTES_8: u8 = 0xcc;
    pub const BYTES_16: u8 = 0xcd;
    pub const BYTES_32: u8 = 0xce;

    pub const STRING_8: u8 = 0xd0;
    pub const STRING_16: u8 = 0xd1;
    pub const STRING_32: u8 = 0xd2;

    pub const LIST_8: u8 = 0xd4;
    pub const LIST_16: u8 = 0xd5;
    pub const LIST_32: u8 = 0xd6;

    pub const MAP_8: u8 = 0xd8;
    pub const MAP_16: u8 = 0xd9;
    pub const MAP_32: u8 = 0xda;

    pub const STRUCT_8: u8 = 0xdc;
    pub const STRUCT_16: u8 = 0xdd;

    /// High nibble selecting the tiny band of a marker.
    pub const HIGH_NIBBLE: u8 = 0xf0;
    /// Low nibble holding the inline count of a tiny marker.
    pub const LOW_NIBBLE: u8 = 0x0f;

    /// Check if a marker is a tiny integer (-16 to 127)
    #[inline]
    pub const fn is_tiny_int(byte: u8) -> bool {
        byte <= TINY_INT_MAX || byte >= TINY_INT_MIN
    }

    /// Decode a tiny integer marker to its value
    #[inline]
    pub const fn tiny_int_value(byte: u8) -> i8 {
        byte as i8
    }

    /// Get the inline count of a tiny string/list/map/struct marker
    #[inline]
    pub const fn tiny_size(byte: u8) -> u8 {
        byte & LOW_NIBBLE
    }
}

/// Width of an explicit length or integer field that follows a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    /// Number of big-endian bytes the field occupies.
    #[inline]
    #[must_use]
    pub const fn byte_len(self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }
}

/// How the size of a string, byte array, list, map or struct is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    /// Count packed into the marker's low nibble.
    Tiny(u8),
    /// Count held in an unsigned big-endian field after the marker.
    Explicit(Width),
}

/// Classification of a lead byte into a type category and size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Null,
    Bool(bool),
    Float64,
    TinyInt(i8),
    Int(Width),
    Bytes(Width),
    String(Size),
    List(Size),
    Map(Size),
    Struct(Size),
}

impl Marker {
    /// Classify a lead byte, returning `None` for bytes outside every band.
    #[must_use]
    pub const fn classify(byte: u8) -> Option<Marker> {
        use marker::*;

        if is_tiny_int(byte) {
            return Some(Marker::TinyInt(tiny_int_value(byte)));
        }

        let tiny = Size::Tiny(tiny_size(byte));
        match byte & HIGH_NIBBLE {
            TINY_STRING => return Some(Marker::String(tiny)),
            TINY_LIST => return Some(Marker::List(tiny)),
            TINY_MAP => return Some(Marker::Map(tiny)),
            TINY_STRUCT => return Some(Marker::Struct(tiny)),
            _ => {}
        }

        let marker = match byte {
            NULL => Marker::Null,
            FLOAT_64 => Marker::Float64,
            FALSE => Marker::Bool(false),
            TRUE => Marker::Bool(true),

            INT_8 => Marker::Int(Width::W8),
            INT_16 => Marker::Int(Width::W16),
            INT_32 => Marker::Int(Width::W32),
            INT_64 => Marker::Int(Width::W64),

            BYTES_8 => Marker::Bytes(Width::W8),
            BYTES_16 => Marker::Bytes(Width::W16),
            BYTES_32 => Marker::Bytes(Width::W32),

            STRING_8 => Marker::String(Size::Explicit(Width::W8)),
            STRING_16 => Marker::String(Size::Explicit(Width::W16)),
            STRING_32 => Marker::String(Size::Explicit(Width::W32)),

            LIST_8 => Marker::List(Size::Explicit(Width::W8)),
            LIST_16 => Marker::List(Size::Explicit(Width::W16)),
            LIST_32 => Marker::List(Size::Explicit(Width::W32)),

            MAP_8 => Marker::Map(Size::Explicit(Width::W8)),
            MAP_16 => Marker::Map(Size::Explicit(Width::W16)),
            MAP_32 => Marker::Map(Size::Explicit(Width::W32)),

            STRUCT_8 => Marker::Struct(Size::Explicit(Width::W8)),
            STRUCT_16 => Marker::Struct(Size::Explicit(Width::W16)),

            _ => return None,
        };
        Some(marker)
    }

    /// Short lowercase name of the marker's category, for error messages.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Marker::Null => "null",
            Marker::Bool(_) => "boolean",
            Marker::Float64 => "float",
            Marker::TinyInt(_) | Marker::Int(_) => "integer",
            Marker::Bytes(_) => "bytes",
            Marker::String(_) => "string",
            Marker::List(_) => "list",
            Marker::Map(_) => "map",
            Marker::Struct(_) => "struct",
        }
    }
}

/// Classify a lead byte, failing with `UnknownMarker` for undefined bytes.
#[inline]
pub fn classify(byte: u8) -> Result<Marker> {
    Marker::classify(byte).ok_or(Error::UnknownMarker(byte))
}

/// Default resource limits.
pub mod limits {
    /// Maximum composite nesting depth
    pub const MAX_DEPTH: usize = 512;

    /// No limit beyond what the wire format's 32-bit size fields allow
    pub const UNBOUNDED: usize = usize::MAX;
}
