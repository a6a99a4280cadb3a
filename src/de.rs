// ABOUTME: Serde Deserializer implementation for PackStream decoding.
// ABOUTME: Allows PackStream bytes to be decoded into any serde-deserializable Rust type.

use std::borrow::Cow;

use crate::decoder::{Decoder, DecoderConfig};
use crate::error::{Error, Result};
use crate::types::{Marker, Size};
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

/// A serde Deserializer that reads PackStream.
///
/// Lists and struct fields are presented as sequences, maps as maps. A
/// struct's tag byte is consumed but not passed to the visitor; decode into
/// [`crate::Value`] through [`crate::decode`] when the tag matters.
pub struct Deserializer<'de> {
    decoder: Decoder<'de>,
}

impl<'de> Deserializer<'de> {
    /// Create a new Deserializer from a byte slice.
    #[must_use]
    pub fn from_slice(data: &'de [u8]) -> Self {
        Self {
            decoder: Decoder::new(data),
        }
    }

    /// Create a new Deserializer with custom configuration.
    #[must_use]
    pub fn from_slice_with_config(data: &'de [u8], config: DecoderConfig) -> Self {
        Self {
            decoder: Decoder::with_config(data, config),
        }
    }

    /// Get the underlying decoder (consumes self).
    #[must_use]
    pub fn into_decoder(self) -> Decoder<'de> {
        self.decoder
    }

    fn visit_str<V: Visitor<'de>>(&mut self, size: Size, visitor: V) -> Result<V::Value> {
        match self.decoder.read_str(size)? {
            Cow::Borrowed(s) => visitor.visit_borrowed_str(s),
            Cow::Owned(s) => visitor.visit_string(s),
        }
    }

    /// Visit `count` values as a sequence, one nesting level deeper.
    fn visit_counted_seq<V: Visitor<'de>>(&mut self, count: usize, visitor: V) -> Result<V::Value> {
        self.decoder.enter_composite()?;
        let mut seq = CountedAccess::new(self, count);
        let value = visitor.visit_seq(&mut seq)?;
        let remaining = seq.remaining;
        self.decoder.leave_composite();
        if remaining > 0 {
            return Err(de::Error::invalid_length(count, &"fewer elements"));
        }
        Ok(value)
    }

    fn visit_counted_map<V: Visitor<'de>>(&mut self, count: usize, visitor: V) -> Result<V::Value> {
        self.decoder.enter_composite()?;
        let mut map = CountedAccess::new(self, count);
        let value = visitor.visit_map(&mut map)?;
        let remaining = map.remaining;
        self.decoder.leave_composite();
        if remaining > 0 {
            return Err(de::Error::invalid_length(count, &"fewer entries"));
        }
        Ok(value)
    }
}

/// Deserialize a value from a PackStream byte slice.
///
/// # Errors
///
/// Returns an error if:
/// - The data is malformed or truncated
/// - The data doesn't match the expected type `T`
/// - There are trailing bytes after the value
pub fn from_slice<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<T> {
    from_slice_with_config(data, DecoderConfig::default())
}

/// Deserialize a value from a PackStream byte slice with custom configuration.
///
/// # Errors
///
/// As [`from_slice`], with the configured limits applied; trailing bytes are
/// accepted when `allow_trailing_bytes` is set.
pub fn from_slice_with_config<'de, T: Deserialize<'de>>(
    data: &'de [u8],
    config: DecoderConfig,
) -> Result<T> {
    let mut de = Deserializer::from_slice_with_config(data, config);
    let value = T::deserialize(&mut de)?;
    de.decoder.finish()?;
    Ok(value)
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decoder.read_marker()? {
            Marker::Null => visitor.visit_unit(),
            Marker::Bool(b) => visitor.visit_bool(b),
            Marker::TinyInt(n) => visitor.visit_i64(i64::from(n)),
            Marker::Int(width) => visitor.visit_i64(self.decoder.read_int(width)?),
            Marker::Float64 => visitor.visit_f64(self.decoder.read_float64()?),
            Marker::Bytes(width) => visitor.visit_borrowed_bytes(self.decoder.read_byte_array(width)?),
            Marker::String(size) => self.visit_str(size, visitor),
            Marker::List(size) => {
                let count = self.decoder.read_container_len(size)?;
                self.visit_counted_seq(count, visitor)
            }
            Marker::Map(size) => {
                let count = self.decoder.read_container_len(size)?;
                self.visit_counted_map(count, visitor)
            }
            Marker::Struct(size) => {
                let count = self.decoder.read_container_len(size)?;
                self.decoder.read_struct_tag()?;
                self.visit_counted_seq(count, visitor)
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.decoder.peek_marker()? == Marker::Null {
            self.decoder.read_marker()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.decoder.read_marker()? {
            Marker::Null => visitor.visit_unit(),
            other => Err(Error::Custom(format!("expected null, found {}", other.category()))),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.decoder.peek_marker()? {
            // Unit variant: just a string
            Marker::String(_) => visitor.visit_enum(UnitVariantAccess { de: self }),
            // Other variants: map with a single key
            Marker::Map(size) => {
                self.decoder.read_marker()?;
                let count = self.decoder.read_container_len(size)?;
                if count != 1 {
                    return Err(Error::Custom(format!(
                        "expected map with a single entry for enum, found {count} entries"
                    )));
                }
                self.decoder.enter_composite()?;
                let value = visitor.visit_enum(VariantAccess { de: &mut *self })?;
                self.decoder.leave_composite();
                Ok(value)
            }
            other => Err(Error::Custom(format!(
                "expected string or map for enum, found {}",
                other.category()
            ))),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_any(visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf seq tuple tuple_struct map struct identifier
    }
}

/// Sequence and map access over a counted list, map or struct body.
struct CountedAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
}

impl<'a, 'de> CountedAccess<'a, 'de> {
    fn new(de: &'a mut Deserializer<'de>, remaining: usize) -> Self {
        CountedAccess { de, remaining }
    }
}

impl<'de> SeqAccess<'de> for CountedAccess<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

impl<'de> MapAccess<'de> for CountedAccess<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        if !matches!(self.de.decoder.peek_marker()?, Marker::String(_)) {
            return Err(Error::InvalidMapKey);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

struct UnitVariantAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'de> de::EnumAccess<'de> for UnitVariantAccess<'_, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'de> de::VariantAccess<'de> for UnitVariantAccess<'_, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, _seed: T) -> Result<T::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::Custom("expected unit variant".into()))
    }
}

struct VariantAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'de> de::EnumAccess<'de> for VariantAccess<'_, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        if !matches!(self.de.decoder.peek_marker()?, Marker::String(_)) {
            return Err(Error::InvalidMapKey);
        }
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'de> de::VariantAccess<'de> for VariantAccess<'_, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        de::Deserialize::deserialize(&mut *self.de)
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_map(&mut *self.de, visitor)
    }
}
