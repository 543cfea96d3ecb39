//! Helpers for REG_MULTI_SZ payloads.
//!
//! A multi-string value is a sequence of NUL-terminated wide strings with an
//! extra NUL after the last one. All functions here work on raw code units
//! exactly as read from or written to the registry, terminators included.

use widestring::U16CStr;

use crate::err::{Error, Result};

/// Checks that `units` is either empty or properly double-NUL terminated.
///
/// An empty value, a lone terminator, or a leading NUL all count as an empty
/// list. Anything else must end in two NULs to be readable by the log
/// viewer; a truncated or unterminated payload is rejected before any
/// mutation happens.
pub(crate) fn validate(units: &[u16]) -> Result<()> {
    if units.is_empty() || units[0] == 0 {
        return Ok(());
    }

    let n = units.len();
    if n >= 2 && units[n - 2] == 0 && units[n - 1] == 0 {
        Ok(())
    } else {
        Err(Error::InvalidMultiSz)
    }
}

/// Iterates the strings of a validated multi-string payload as unit slices
/// without their terminators.
pub(crate) fn entries(units: &[u16]) -> impl Iterator<Item = &[u16]> {
    let mut rest = units;
    std::iter::from_fn(move || {
        if rest.first().copied().unwrap_or(0) == 0 {
            return None;
        }
        let end = rest.iter().position(|&u| u == 0).unwrap_or(rest.len());
        let entry = &rest[..end];
        rest = &rest[(end + 1).min(rest.len())..];
        Some(entry)
    })
}

/// Whether the list already contains `name`.
pub(crate) fn contains(units: &[u16], name: &U16CStr) -> bool {
    entries(units).any(|entry| entry == name.as_slice())
}

/// Rebuilds the list with `name` appended, preserving every existing entry.
pub(crate) fn append(units: &[u16], name: &U16CStr) -> Vec<u16> {
    let mut extended = Vec::new();
    for entry in entries(units) {
        extended.extend_from_slice(entry);
        extended.push(0);
    }
    extended.extend_from_slice(name.as_slice());
    extended.push(0);
    extended.push(0);
    extended
}

/// A list holding only `name`.
pub(crate) fn single(name: &U16CStr) -> Vec<u16> {
    append(&[], name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::ErrorKind;
    use crate::wide::to_wide;
    use pretty_assertions::assert_eq;

    fn list(names: &[&str]) -> Vec<u16> {
        let mut units = Vec::new();
        for name in names {
            units.extend(name.encode_utf16());
            units.push(0);
        }
        units.push(0);
        units
    }

    #[test]
    fn empty_forms_are_valid() {
        assert!(validate(&[]).is_ok());
        assert!(validate(&[0]).is_ok());
        assert!(validate(&[0, 0]).is_ok());
    }

    #[test]
    fn well_formed_lists_are_valid() {
        assert!(validate(&list(&["One"])).is_ok());
        assert!(validate(&list(&["One", "Two"])).is_ok());
    }

    #[test]
    fn missing_double_terminator_is_invalid() {
        let mut units = list(&["One"]);
        units.pop();
        assert_eq!(validate(&units).unwrap_err().kind(), ErrorKind::InvalidEncoding);

        // No terminators at all.
        let bare: Vec<u16> = "One".encode_utf16().collect();
        assert_eq!(validate(&bare).unwrap_err().kind(), ErrorKind::InvalidEncoding);
    }

    #[test]
    fn entries_walks_every_string() {
        let units = list(&["One", "Two", "Three"]);
        let found: Vec<String> = entries(&units)
            .map(|e| String::from_utf16(e).unwrap())
            .collect();
        assert_eq!(found, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn contains_matches_whole_names_only() {
        let units = list(&["Acme", "AcmeAgent"]);
        assert!(contains(&units, &to_wide("Acme").unwrap()));
        assert!(contains(&units, &to_wide("AcmeAgent").unwrap()));
        assert!(!contains(&units, &to_wide("Agent").unwrap()));
        assert!(!contains(&units, &to_wide("Acm").unwrap()));
    }

    #[test]
    fn append_preserves_existing_names() {
        let units = list(&["One"]);
        let extended = append(&units, &to_wide("Two").unwrap());
        assert_eq!(extended, list(&["One", "Two"]));
    }

    #[test]
    fn append_to_an_empty_list_yields_a_single_entry() {
        let name = to_wide("Only").unwrap();
        assert_eq!(append(&[0], &name), list(&["Only"]));
        assert_eq!(single(&name), list(&["Only"]));
    }
}
