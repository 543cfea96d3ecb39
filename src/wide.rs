//! Strict conversion between UTF-8 and NUL-terminated wide (UTF-16) strings.
//!
//! Both directions either produce a fully converted, freshly allocated buffer
//! or fail without producing anything. No best-fit substitution is performed:
//! an unpaired surrogate on the wide side or an interior NUL on the UTF-8
//! side is an error, not a replacement character.

use widestring::{U16CStr, U16CString};

use crate::err::{Error, Result};

/// Converts a UTF-8 string into a newly allocated, NUL-terminated wide string.
///
/// Rust guarantees `text` is well-formed UTF-8; the remaining failure mode is
/// an interior NUL, which cannot be represented in a NUL-terminated buffer.
pub fn to_wide(text: &str) -> Result<U16CString> {
    U16CString::from_str(text).map_err(|source| Error::WideEncoding { source })
}

/// Converts a wide string back into UTF-8.
///
/// Fails if the wide string contains code units that do not form valid
/// UTF-16, such as unpaired surrogates.
pub fn to_utf8(text: &U16CStr) -> Result<String> {
    text.to_string().map_err(|source| Error::WideDecoding { source })
}
