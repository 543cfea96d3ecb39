//! Thread-local record of the most recent failure.
//!
//! Every public operation that can fail updates this slot before returning:
//! a failure stores its classification, platform code, and rendered message,
//! and the next successful operation on the same thread clears it. This is
//! the only cross-call state the crate keeps outside the registry itself.

use std::cell::RefCell;

use crate::err::{Error, ErrorKind, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    pub kind: ErrorKind,
    pub code: Option<u32>,
    pub message: String,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

/// Returns the error recorded by the most recent failed operation on this
/// thread, or `None` if the most recent operation succeeded.
pub fn last_error() -> Option<LastError> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

pub(crate) fn clear() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

pub(crate) fn record(err: &Error) {
    let snapshot = LastError {
        kind: err.kind(),
        code: err.platform_code(),
        message: err.to_string(),
    };
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(snapshot));
}

/// Mirrors `result` into the slot and passes it through.
pub(crate) fn track<T>(result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => clear(),
        Err(err) => record(err),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_recorded_and_success_clears_it() {
        let failed: Result<()> = track(Err(Error::InvalidMultiSz));
        assert!(failed.is_err());

        let recorded = last_error().expect("slot should hold the failure");
        assert_eq!(recorded.kind, ErrorKind::InvalidEncoding);
        assert_eq!(recorded.code, Some(crate::registry::ERROR_INVALID_PARAMETER));

        let succeeded: Result<u32> = track(Ok(7));
        assert_eq!(succeeded.unwrap(), 7);
        assert_eq!(last_error(), None);
    }

    #[test]
    fn slot_is_thread_local() {
        record(&Error::Allocation);

        std::thread::spawn(|| {
            assert_eq!(last_error(), None);
        })
        .join()
        .unwrap();

        assert!(last_error().is_some());
        clear();
    }
}
