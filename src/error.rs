// ABOUTME: Error types for PackStream decoding.
// ABOUTME: Each variant has a stable snake_case name used by the conformance vectors.

use std::fmt;

/// The result type for PackStream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding PackStream data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The buffer ended before a declared length, value or field was present.
    Truncated,

    /// The lead byte does not belong to any defined marker band.
    UnknownMarker(u8),

    /// A map key decoded to something other than a string.
    InvalidMapKey,

    /// Nested composites went deeper than `DecoderConfig::max_depth`.
    RecursionLimitExceeded,

    /// String payload is not valid UTF-8 (strict mode only).
    InvalidUtf8,

    /// A map repeated a key while `DuplicateKeyMode::Error` was configured.
    DuplicateKey,

    /// Unconsumed bytes after a value that was required to span the buffer.
    TrailingBytes,

    /// String or byte array longer than `DecoderConfig::max_string_length`.
    MaxStringLengthExceeded,

    /// Collection declared more entries than `DecoderConfig::max_container_size`.
    MaxContainerSizeExceeded,

    /// Custom error message (for serde integration).
    Custom(String),
}

impl Error {
    /// Returns the standardized error type name for test matching.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Truncated => "truncated",
            Error::UnknownMarker(_) => "unknown_marker",
            Error::InvalidMapKey => "invalid_map_key",
            Error::RecursionLimitExceeded => "recursion_limit_exceeded",
            Error::InvalidUtf8 => "invalid_utf8",
            Error::DuplicateKey => "duplicate_key",
            Error::TrailingBytes => "trailing_bytes",
            Error::MaxStringLengthExceeded => "max_string_length_exceeded",
            Error::MaxContainerSizeExceeded => "max_container_size_exceeded",
            Error::Custom(_) => "custom",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "unexpected end of input"),
            Error::UnknownMarker(byte) => write!(f, "unknown marker byte: 0x{byte:02x}"),
            Error::InvalidMapKey => write!(f, "map key is not a string"),
            Error::RecursionLimitExceeded => write!(f, "maximum nesting depth exceeded"),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 sequence"),
            Error::DuplicateKey => write!(f, "duplicate key in map"),
            Error::TrailingBytes => write!(f, "trailing bytes after value"),
            Error::MaxStringLengthExceeded => write!(f, "maximum string length exceeded"),
            Error::MaxContainerSizeExceeded => write!(f, "maximum container size exceeded"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
