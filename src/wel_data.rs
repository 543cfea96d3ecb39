//! The mutex-guarded metadata record attached to a log entry.
//!
//! A `WelData` lives alongside exactly one entry: created with it, cloned
//! when it is copied, dropped when it is destroyed. One mutex guards the
//! scalar overrides and the insertion table together, so every read-modify-
//! write sequence is a single critical section. Operations never touch two
//! records' locks at once.

use std::sync::{Arc, Mutex, MutexGuard};

use log::trace;
use widestring::{U16CStr, U16CString};

use crate::err::Result;
use crate::insertion::{InsertionSlot, InsertionTable};
use crate::last_error;
use crate::param::Param;
use crate::prival;
use crate::wide;

#[derive(Debug, Clone, Default)]
struct WelFields {
    category: Option<u16>,
    event_type: Option<u16>,
    event_id: Option<u32>,
    insertions: InsertionTable,
}

/// Windows Event Log metadata for a single entry.
///
/// Category, event type and event id may each be explicitly overridden;
/// otherwise the getters derive them on demand from the entry's current
/// prival. The two are never cached together: a getter returns either the
/// override or a fresh derivation.
#[derive(Debug, Default)]
pub struct WelData {
    fields: Mutex<WelFields>,
}

impl WelData {
    pub fn new() -> WelData {
        WelData::default()
    }

    fn lock(&self) -> MutexGuard<'_, WelFields> {
        self.fields.lock().expect("lock poisoned")
    }

    /// The category for an entry with the given prival: the explicit
    /// override if one was set, otherwise derived.
    pub fn category(&self, prival: u32) -> u16 {
        let fields = self.lock();
        fields.category.unwrap_or_else(|| prival::category(prival))
    }

    /// The event type for an entry with the given prival.
    pub fn event_type(&self, prival: u32) -> u16 {
        let fields = self.lock();
        fields
            .event_type
            .unwrap_or_else(|| prival::event_type(prival) as u16)
    }

    /// The event id for an entry with the given prival.
    pub fn event_id(&self, prival: u32) -> u32 {
        let fields = self.lock();
        fields.event_id.unwrap_or_else(|| prival::event_id(prival))
    }

    pub fn set_category(&self, category: u16) {
        self.lock().category = Some(category);
        last_error::clear();
    }

    pub fn set_event_type(&self, event_type: u16) {
        self.lock().event_type = Some(event_type);
        last_error::clear();
    }

    pub fn set_event_id(&self, event_id: u32) {
        self.lock().event_id = Some(event_id);
        last_error::clear();
    }

    /// Sets the insertion string at `index`, converting `text` to a wide
    /// string and growing the table if needed. The table is unchanged if the
    /// conversion fails.
    pub fn set_insertion_string(&self, index: u16, text: &str) -> Result<()> {
        last_error::track((|| {
            let wide = wide::to_wide(text)?;
            self.lock().insertions.put_text(index, wide)
        })())
    }

    /// Sets the insertion string at `index` from an already wide string,
    /// avoiding a conversion round trip. A copy of `text` is stored.
    pub fn set_insertion_wide_string(&self, index: u16, text: &U16CStr) -> Result<()> {
        last_error::track(self.lock().insertions.put_text(index, text.to_ucstring()))
    }

    /// Points the insertion slot at `index` at a param owned by the entry's
    /// structured data. Only a weak reference is kept: if the param is later
    /// removed from the entry, the slot reads as absent.
    pub fn set_insertion_param(&self, index: u16, param: &Arc<Param>) -> Result<()> {
        last_error::track(self.lock().insertions.put_param(index, Arc::downgrade(param)))
    }

    /// Sets insertion strings for indices `0..strings.len()` under a single
    /// lock acquisition.
    ///
    /// The first conversion failure stops the sequence; slots already
    /// written stay written. Holding the lock across the whole loop means no
    /// other thread can observe the half-applied prefix mid-flight.
    pub fn set_insertion_strings(&self, strings: &[&str]) -> Result<()> {
        last_error::track((|| {
            let mut fields = self.lock();
            for (index, text) in strings.iter().enumerate() {
                let wide = wide::to_wide(text)?;
                fields.insertions.put_text(index as u16, wide)?;
            }
            Ok(())
        })())
    }

    /// Wide-string counterpart of [`WelData::set_insertion_strings`].
    pub fn set_insertion_wide_strings(&self, strings: &[&U16CStr]) -> Result<()> {
        last_error::track((|| {
            let mut fields = self.lock();
            for (index, text) in strings.iter().enumerate() {
                fields.insertions.put_text(index as u16, text.to_ucstring())?;
            }
            Ok(())
        })())
    }

    /// Reads the insertion string at `index` as UTF-8.
    ///
    /// A slot backed by a param yields the param's current value; a slot
    /// whose param has since been removed from the entry yields `None`, as
    /// does an empty slot. An index beyond the table is an error.
    pub fn insertion_string(&self, index: u16) -> Result<Option<String>> {
        last_error::track((|| {
            let fields = self.lock();
            match fields.insertions.slot(index)? {
                InsertionSlot::Empty => Ok(None),
                InsertionSlot::Text(text) => wide::to_utf8(text).map(Some),
                InsertionSlot::ParamRef(param) => match param.upgrade() {
                    Some(param) => Ok(Some(param.value())),
                    None => {
                        trace!("insertion param at index {index} is gone, reading as absent");
                        Ok(None)
                    }
                },
            }
        })())
    }

    /// Reads the insertion string at `index` as a fresh wide string, with
    /// the same precedence as [`WelData::insertion_string`].
    pub fn insertion_wide_string(&self, index: u16) -> Result<Option<U16CString>> {
        last_error::track((|| {
            let fields = self.lock();
            match fields.insertions.slot(index)? {
                InsertionSlot::Empty => Ok(None),
                InsertionSlot::Text(text) => Ok(Some(text.clone())),
                InsertionSlot::ParamRef(param) => match param.upgrade() {
                    Some(param) => wide::to_wide(&param.value()).map(Some),
                    None => Ok(None),
                },
            }
        })())
    }

    /// The param backing the insertion slot at `index`, if the slot holds a
    /// param reference that is still alive.
    pub fn insertion_param(&self, index: u16) -> Result<Option<Arc<Param>>> {
        last_error::track((|| {
            let fields = self.lock();
            match fields.insertions.slot(index)? {
                InsertionSlot::ParamRef(param) => Ok(param.upgrade()),
                _ => Ok(None),
            }
        })())
    }

    /// The number of insertion slots, including empty ones.
    pub fn insertion_count(&self) -> u16 {
        self.lock().insertions.len()
    }
}

impl Clone for WelData {
    /// Deep-copies the record under the source's lock: scalar overrides and
    /// owned strings are duplicated, param references stay references. The
    /// new record is not visible to any other thread during construction,
    /// so only the source side needs locking.
    fn clone(&self) -> WelData {
        let fields = self.lock();
        WelData {
            fields: Mutex::new(fields.clone()),
        }
    }
}
