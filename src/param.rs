//! Minimal structured-data parameter.
//!
//! Entries own their params as `Arc<Param>`; the insertion table only ever
//! holds weak references to them, so removing a param from an entry's
//! structured data is always safe while insertion slots still point at it.

use std::sync::Mutex;

/// A name-value pair from an entry's structured data.
///
/// The value has its own lock so that reads through an insertion slot always
/// observe the param's current value, even while another thread updates it.
#[derive(Debug)]
pub struct Param {
    name: String,
    value: Mutex<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Param {
        Param {
            name: name.into(),
            value: Mutex::new(value.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A copy of the current value.
    pub fn value(&self) -> String {
        self.value.lock().expect("lock poisoned").clone()
    }

    pub fn set_value(&self, value: impl Into<String>) {
        *self.value.lock().expect("lock poisoned") = value.into();
    }
}
