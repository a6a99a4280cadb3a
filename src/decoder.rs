// ABOUTME: PackStream binary decoder over a borrowed byte slice.
// ABOUTME: Recursive descent with an explicit depth ceiling; every call reports exact consumption.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::types::{classify, limits, Marker, Size, Width};
use crate::value::{Map, Struct, Value};

/// Validate and convert bytes to a UTF-8 string.
/// Uses simdutf8 for SIMD-accelerated validation when the feature is enabled.
#[cfg(feature = "simd-utf8")]
#[inline]
fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}

#[cfg(not(feature = "simd-utf8"))]
#[inline]
fn validate_utf8(bytes: &[u8]) -> Result<&str> {
    Ok(std::str::from_utf8(bytes)?)
}

/// How to handle duplicate keys in maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeyMode {
    /// Raise an error on duplicate keys
    Error,
    /// Keep the first value, ignore subsequent duplicates
    KeepFirst,
    /// Overwrite earlier values; the key keeps its first position
    #[default]
    KeepLast,
}

/// How to handle string payloads that are not valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Utf8Mode {
    /// Fail with `Error::InvalidUtf8`
    #[default]
    Strict,
    /// Replace invalid sequences with U+FFFD
    Lossy,
}

/// Configuration options for the decoder.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Maximum list/map/struct nesting depth
    pub max_depth: usize,
    /// Maximum entries in a single list, map or struct
    pub max_container_size: usize,
    /// Maximum string or byte array length in bytes
    pub max_string_length: usize,
    /// How to handle duplicate map keys (default: `KeepLast`)
    pub duplicate_key_mode: DuplicateKeyMode,
    /// How to handle invalid UTF-8 in strings (default: `Strict`)
    pub utf8: Utf8Mode,
    /// Allow bytes after the value in whole-buffer decoding (default: false)
    pub allow_trailing_bytes: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: limits::MAX_DEPTH,
            max_container_size: limits::UNBOUNDED,
            max_string_length: limits::UNBOUNDED,
            duplicate_key_mode: DuplicateKeyMode::default(),
            utf8: Utf8Mode::default(),
            allow_trailing_bytes: false,
        }
    }
}

/// A PackStream decoder that reads from a byte slice.
///
/// The decoder never copies or retains the input beyond its own lifetime;
/// decoded [`Value`]s own their data.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
    config: DecoderConfig,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder for the given data.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, DecoderConfig::default())
    }

    /// Create a new decoder with custom configuration.
    #[must_use]
    pub fn with_config(data: &'a [u8], config: DecoderConfig) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
            config,
        }
    }

    /// Get the current position in the input.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the remaining bytes.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Check if we've reached the end of input.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get the decoder configuration.
    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Read a single byte, advancing position.
    #[inline]
    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.data.get(self.pos).ok_or(Error::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read exactly n bytes.
    #[inline]
    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.data.len() - self.pos {
            return Err(Error::Truncated);
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    // =========================================================================
    // Building blocks shared with the serde deserializer
    // =========================================================================

    /// Classify the next marker without consuming it.
    #[inline]
    pub(crate) fn peek_marker(&self) -> Result<Marker> {
        let byte = *self.data.get(self.pos).ok_or(Error::Truncated)?;
        classify(byte)
    }

    /// Read and classify the next marker.
    #[inline]
    pub(crate) fn read_marker(&mut self) -> Result<Marker> {
        classify(self.read_byte()?)
    }

    /// Read a big-endian two's-complement integer, sign-extended to 64 bits.
    #[inline]
    pub(crate) fn read_int(&mut self, width: Width) -> Result<i64> {
        let size = width.byte_len();
        let bytes = self.read_bytes(size)?;
        let fill: u8 = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
        let mut buf = [fill; 8];
        buf[8 - size..].copy_from_slice(bytes);
        Ok(i64::from_be_bytes(buf))
    }

    /// Read a big-endian IEEE-754 binary64 value.
    #[inline]
    pub(crate) fn read_float64(&mut self) -> Result<f64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(f64::from_be_bytes(buf))
    }

    /// Read an unsigned big-endian length field.
    #[inline]
    fn read_length(&mut self, width: Width) -> Result<usize> {
        let size = width.byte_len();
        let bytes = self.read_bytes(size)?;
        let mut buf = [0u8; 8];
        buf[8 - size..].copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf) as usize)
    }

    #[inline]
    fn read_size(&mut self, size: Size) -> Result<usize> {
        match size {
            Size::Tiny(n) => Ok(usize::from(n)),
            Size::Explicit(width) => self.read_length(width),
        }
    }

    /// Read the entry count of a list, map or struct.
    pub(crate) fn read_container_len(&mut self, size: Size) -> Result<usize> {
        let count = self.read_size(size)?;
        if count > self.config.max_container_size {
            return Err(Error::MaxContainerSizeExceeded);
        }
        Ok(count)
    }

    /// Read the length and payload of a string.
    pub(crate) fn read_str(&mut self, size: Size) -> Result<Cow<'a, str>> {
        let len = self.read_size(size)?;
        if len > self.config.max_string_length {
            return Err(Error::MaxStringLengthExceeded);
        }
        let bytes = self.read_bytes(len)?;
        match self.config.utf8 {
            Utf8Mode::Strict => validate_utf8(bytes).map(Cow::Borrowed),
            Utf8Mode::Lossy => Ok(String::from_utf8_lossy(bytes)),
        }
    }

    /// Read the length and payload of a byte array.
    pub(crate) fn read_byte_array(&mut self, width: Width) -> Result<&'a [u8]> {
        let len = self.read_length(width)?;
        if len > self.config.max_string_length {
            return Err(Error::MaxStringLengthExceeded);
        }
        self.read_bytes(len)
    }

    /// Read the opaque tag byte that follows a struct marker.
    #[inline]
    pub(crate) fn read_struct_tag(&mut self) -> Result<u8> {
        self.read_byte()
    }

    /// Enter one level of composite nesting.
    pub(crate) fn enter_composite(&mut self) -> Result<()> {
        if self.depth >= self.config.max_depth {
            tracing::debug!(
                max_depth = self.config.max_depth,
                position = self.pos,
                "packstream nesting limit reached"
            );
            return Err(Error::RecursionLimitExceeded);
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave a level entered with `enter_composite`.
    pub(crate) fn leave_composite(&mut self) {
        self.depth -= 1;
    }

    /// Upper bound for pre-allocating `count` entries of at least `min_len` bytes each.
    #[inline]
    fn capacity_hint(&self, count: usize, min_len: usize) -> usize {
        count.min(self.remaining().len() / min_len)
    }

    // =========================================================================
    // Value decoding
    // =========================================================================

    /// Decode the next value from the input.
    pub fn decode_value(&mut self) -> Result<Value> {
        let marker = self.read_marker()?;
        self.decode_value_with_marker(marker)
    }

    /// Decode a value whose marker has already been consumed.
    fn decode_value_with_marker(&mut self, marker: Marker) -> Result<Value> {
        match marker {
            Marker::Null => Ok(Value::Null),
            Marker::Bool(b) => Ok(Value::Bool(b)),
            Marker::TinyInt(n) => Ok(Value::Int(i64::from(n))),
            Marker::Int(width) => Ok(Value::Int(self.read_int(width)?)),
            Marker::Float64 => Ok(Value::Float(self.read_float64()?)),
            Marker::String(size) => Ok(Value::String(self.read_str(size)?.into_owned())),
            Marker::Bytes(width) => Ok(Value::Bytes(self.read_byte_array(width)?.to_vec())),
            Marker::List(size) => self.nested(|dec| dec.decode_list(size)).map(Value::List),
            Marker::Map(size) => self.nested(|dec| dec.decode_map(size)).map(Value::Map),
            Marker::Struct(size) => self.nested(|dec| dec.decode_struct(size)).map(Value::Struct),
        }
    }

    /// Run a composite decode one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.enter_composite()?;
        let result = f(self);
        self.leave_composite();
        result
    }

    fn decode_list(&mut self, size: Size) -> Result<Vec<Value>> {
        let count = self.read_container_len(size)?;
        let mut list = Vec::with_capacity(self.capacity_hint(count, 1));
        for _ in 0..count {
            list.push(self.decode_value()?);
        }
        Ok(list)
    }

    fn decode_map(&mut self, size: Size) -> Result<Map> {
        let count = self.read_container_len(size)?;
        let mut map = Map::with_capacity(self.capacity_hint(count, 2));
        for _ in 0..count {
            let key = match self.decode_value()? {
                Value::String(s) => s,
                _ => return Err(Error::InvalidMapKey),
            };
            let value = self.decode_value()?;
            match self.config.duplicate_key_mode {
                DuplicateKeyMode::KeepLast => {
                    map.insert(key, value);
                }
                DuplicateKeyMode::KeepFirst => {
                    map.entry(key).or_insert(value);
                }
                DuplicateKeyMode::Error => {
                    if map.contains_key(&key) {
                        return Err(Error::DuplicateKey);
                    }
                    map.insert(key, value);
                }
            }
        }
        Ok(map)
    }

    fn decode_struct(&mut self, size: Size) -> Result<Struct> {
        let count = self.read_container_len(size)?;
        let tag = self.read_struct_tag()?;
        let mut fields = Vec::with_capacity(self.capacity_hint(count, 1));
        for _ in 0..count {
            fields.push(self.decode_value()?);
        }
        Ok(Struct { tag, fields })
    }

    /// Check that the whole input was consumed.
    pub fn finish(&self) -> Result<()> {
        if !self.config.allow_trailing_bytes && self.pos < self.data.len() {
            return Err(Error::TrailingBytes);
        }
        Ok(())
    }
}
