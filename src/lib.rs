// ABOUTME: PackStream (Bolt protocol value encoding) decoder for Rust.
// ABOUTME: Decodes tag-prefixed binary values into a dynamic Value tree or serde types.

//! # PackStream
//!
//! A strict decoder for PackStream, the self-describing binary encoding that
//! carries Bolt protocol messages. Input is a single message buffer that has
//! already been reassembled from its transport chunks.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_packstream::{decode, Value};
//!
//! // SUCCESS {"t_first": 8}, followed by the start of another message
//! let buf = [0xb1, 0x70, 0xa1, 0x87, b't', b'_', b'f', b'i', b'r', b's', b't', 0x08, 0xb0];
//!
//! let (value, consumed) = decode(&buf, 0).unwrap();
//! assert_eq!(consumed, 12);
//! assert_eq!(value.tag(), Some(0x70));
//! assert_eq!(value.get(0).and_then(|m| m.get_key("t_first")), Some(&Value::Int(8)));
//! ```
//!
//! ## Typed decoding
//!
//! ```rust
//! use serde::Deserialize;
//! use serde_packstream::from_slice;
//!
//! #[derive(Deserialize)]
//! struct Auth {
//!     scheme: String,
//!     principal: String,
//! }
//!
//! let buf = [
//!     0xa2,
//!     0x86, b's', b'c', b'h', b'e', b'm', b'e', 0x85, b'b', b'a', b's', b'i', b'c',
//!     0x89, b'p', b'r', b'i', b'n', b'c', b'i', b'p', b'a', b'l', 0x85, b'n', b'e', b'o', b'4', b'j',
//! ];
//! let auth: Auth = from_slice(&buf).unwrap();
//! assert_eq!(auth.principal, "neo4j");
//! ```
//!
//! ## Resource Limits
//!
//! - Maximum nesting depth: 512 (`RecursionLimitExceeded` beyond it)
//! - Container and string sizes: bounded only by the 32-bit size fields
//!   unless configured through [`DecoderConfig`]

pub mod de;
pub mod decoder;
pub mod error;
pub mod types;
pub mod value;

// Re-export commonly used items at the crate root
pub use de::{from_slice, from_slice_with_config, Deserializer};
pub use decoder::{Decoder, DecoderConfig, DuplicateKeyMode, Utf8Mode};
pub use error::{Error, Result};
pub use types::{classify, limits, marker, Marker, Size, Width};
pub use value::{Map, Struct, Value};

// The packstream! macro is automatically exported at crate root via #[macro_export]

/// Decode one value starting at `offset`, returning it with the number of bytes it occupied.
///
/// Bytes after the value are ignored, so a buffer holding several
/// consecutive values can be walked by advancing `offset` by the returned
/// length.
///
/// # Example
///
/// ```rust
/// use serde_packstream::{decode, Value};
///
/// let buf = [0x01, 0xc9, 0xfa, 0xc7];
/// assert_eq!(decode(&buf, 1).unwrap(), (Value::Int(-1337), 3));
/// ```
///
/// # Errors
///
/// Fails with `Truncated` if `offset` is at or past the end of `buffer` or
/// the value runs past it, and with the matching error for any malformed
/// value. No partial value is returned.
pub fn decode(buffer: &[u8], offset: usize) -> Result<(Value, usize)> {
    decode_with_config(buffer, offset, DecoderConfig::default())
}

/// Decode one value starting at `offset` with custom configuration.
///
/// `allow_trailing_bytes` has no effect here; trailing bytes are always allowed.
///
/// # Errors
///
/// As [`decode`], plus the configured limit errors.
pub fn decode_with_config(
    buffer: &[u8],
    offset: usize,
    config: DecoderConfig,
) -> Result<(Value, usize)> {
    let data = buffer.get(offset..).unwrap_or_default();
    let mut decoder = Decoder::with_config(data, config);
    match decoder.decode_value() {
        Ok(value) => {
            let consumed = decoder.position();
            tracing::trace!(offset, consumed, "decoded packstream value");
            Ok((value, consumed))
        }
        Err(err) => {
            tracing::debug!(offset, error = err.error_type(), "packstream decode failed: {err}");
            Err(err)
        }
    }
}

/// Decode a buffer that holds exactly one value.
///
/// # Example
///
/// ```rust
/// use serde_packstream::{decode_value, Value};
///
/// let value = decode_value(&[0x93, 0x01, 0x02, 0x03]).unwrap();
/// assert_eq!(value, Value::from(vec![1, 2, 3]));
/// ```
///
/// # Errors
///
/// As [`decode`], plus `TrailingBytes` if the value does not span the buffer.
pub fn decode_value(data: &[u8]) -> Result<Value> {
    decode_value_with_config(data, DecoderConfig::default())
}

/// Decode a buffer that holds exactly one value, with custom configuration.
///
/// # Errors
///
/// As [`decode_value`]; trailing bytes are accepted when `allow_trailing_bytes` is set.
pub fn decode_value_with_config(data: &[u8], config: DecoderConfig) -> Result<Value> {
    let mut decoder = Decoder::with_config(data, config);
    let result = decoder.decode_value().and_then(|value| {
        decoder.finish()?;
        Ok(value)
    });
    if let Err(err) = &result {
        tracing::debug!(
            len = data.len(),
            error = err.error_type(),
            "packstream decode failed: {err}"
        );
    }
    result
}
