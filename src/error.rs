use std::borrow::Cow;
use std::io;

use thiserror::Error;

use crate::wire::MajorType;

/// Error type for every encoding, decoding and configuration failure.
///
/// Prefer the constructor functions (`Error::malformed`, `Error::type_mismatch`, ...)
/// over building variants by hand; they take anything convertible into
/// `Cow<'static, str>` so call sites stay short.
///
/// Every decoding error aborts the whole call. No partially decoded value is
/// ever returned alongside an error.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid additional info, truncated input, invalid UTF-8, or an
    /// indefinite-length chunk whose major type differs from its parent.
    #[error("malformed CBOR at offset {offset}: {reason}")]
    MalformedHeader {
        offset: usize,
        reason: Cow<'static, str>,
    },

    /// The wire item is incompatible with the converter reading it.
    #[error("type mismatch at offset {offset}: expected {expected}, found {found}")]
    TypeMismatch {
        offset: usize,
        expected: Cow<'static, str>,
        found: Cow<'static, str>,
    },

    /// An integer was well formed but does not fit the requested type.
    #[error("value at offset {offset} is out of range for {target}")]
    OutOfRange { offset: usize, target: &'static str },

    /// No provider matched, no usable constructor, duplicate discriminator,
    /// unsupported tuple arity, and similar schema problems.
    #[error("configuration error for `{type_name}`: {reason}")]
    Configuration {
        type_name: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    /// Only raised under `UnhandledNameMode::ThrowException`.
    #[error("unknown member `{member}` for `{type_name}` at offset {offset}")]
    UnknownMember {
        type_name: &'static str,
        member: String,
        offset: usize,
    },

    #[error("unresolved discriminator {value} for `{type_name}` at offset {offset}")]
    UnresolvedDiscriminator {
        type_name: &'static str,
        value: String,
        offset: usize,
    },

    #[error("missing required member `{member}` for `{type_name}`")]
    MissingRequiredMember {
        type_name: &'static str,
        member: String,
    },

    #[error("nesting depth limit {limit} exceeded at offset {offset}")]
    DepthLimitExceeded { offset: usize, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    #[cold]
    pub fn malformed<S: Into<Cow<'static, str>>>(offset: usize, reason: S) -> Self {
        Error::MalformedHeader {
            offset,
            reason: reason.into(),
        }
    }

    #[cold]
    pub fn eof(offset: usize) -> Self {
        Error::malformed(offset, "unexpected end of input")
    }

    #[cold]
    pub fn type_mismatch<E, F>(offset: usize, expected: E, found: F) -> Self
    where
        E: Into<Cow<'static, str>>,
        F: Into<Cow<'static, str>>,
    {
        Error::TypeMismatch {
            offset,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Type mismatch where the observed item is described by its major type.
    #[cold]
    pub fn unexpected<E: Into<Cow<'static, str>>>(
        offset: usize,
        expected: E,
        found: MajorType,
    ) -> Self {
        Error::type_mismatch(offset, expected, found.name())
    }

    #[cold]
    pub fn out_of_range(offset: usize, target: &'static str) -> Self {
        Error::OutOfRange { offset, target }
    }

    #[cold]
    pub fn configuration<T, R>(type_name: T, reason: R) -> Self
    where
        T: Into<Cow<'static, str>>,
        R: Into<Cow<'static, str>>,
    {
        Error::Configuration {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    #[cold]
    pub fn unknown_member(
        type_name: &'static str,
        member: impl Into<String>,
        offset: usize,
    ) -> Self {
        Error::UnknownMember {
            type_name,
            member: member.into(),
            offset,
        }
    }

    #[cold]
    pub fn unresolved_discriminator(
        type_name: &'static str,
        value: impl Into<String>,
        offset: usize,
    ) -> Self {
        Error::UnresolvedDiscriminator {
            type_name,
            value: value.into(),
            offset,
        }
    }

    #[cold]
    pub fn missing_member(type_name: &'static str, member: impl Into<String>) -> Self {
        Error::MissingRequiredMember {
            type_name,
            member: member.into(),
        }
    }

    #[cold]
    pub fn depth_exceeded(offset: usize, limit: usize) -> Self {
        Error::DepthLimitExceeded { offset, limit }
    }

    /// Whether the error comes from schema or registry problems rather than the payload.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = Error::unexpected(7, "text string", MajorType::Array);
        assert_eq!(
            err.to_string(),
            "type mismatch at offset 7: expected text string, found array"
        );

        let err = Error::configuration("my::Type", "no converter available");
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "configuration error for `my::Type`: no converter available"
        );
    }
}
