use std::collections::TryReserveError;

use thiserror::Error;

use crate::registry::{ERROR_INVALID_PARAMETER, ERROR_NOT_ENOUGH_MEMORY};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("memory allocation failed")]
    Allocation,

    #[error("string cannot be encoded as a NUL-terminated wide string: {source}")]
    WideEncoding {
        source: widestring::error::ContainsNul<u16>,
    },

    #[error("wide string cannot be decoded as UTF-8: {source}")]
    WideDecoding {
        source: widestring::error::Utf16Error,
    },

    #[error("platform call `{operation}` failed with code {code}")]
    Registry { operation: &'static str, code: u32 },

    #[error("the Sources MULTI_SZ value is neither empty nor terminated with two NUL characters")]
    InvalidMultiSz,

    #[error("insertion string index {index} is out of bounds (count is {count})")]
    IndexOutOfBounds { index: u16, count: u16 },

    #[error("{name} must not be empty")]
    EmptyArgument { name: &'static str },
}

/// Coarse classification of an [`Error`], stored in the thread-local
/// last-error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Allocation,
    Encoding,
    Registry,
    InvalidEncoding,
    IndexOutOfBounds,
    EmptyArgument,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Allocation => ErrorKind::Allocation,
            Error::WideEncoding { .. } | Error::WideDecoding { .. } => ErrorKind::Encoding,
            Error::Registry { .. } => ErrorKind::Registry,
            Error::InvalidMultiSz => ErrorKind::InvalidEncoding,
            Error::IndexOutOfBounds { .. } => ErrorKind::IndexOutOfBounds,
            Error::EmptyArgument { .. } => ErrorKind::EmptyArgument,
        }
    }

    /// The platform error code this error maps to, if it has one.
    ///
    /// Allocation failures report `ERROR_NOT_ENOUGH_MEMORY` and a malformed
    /// `Sources` list reports `ERROR_INVALID_PARAMETER`, matching the codes
    /// an installer on a live registry would surface for the same failures.
    pub fn platform_code(&self) -> Option<u32> {
        match self {
            Error::Allocation => Some(ERROR_NOT_ENOUGH_MEMORY),
            Error::Registry { code, .. } => Some(*code),
            Error::InvalidMultiSz => Some(ERROR_INVALID_PARAMETER),
            _ => None,
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::Allocation
    }
}
