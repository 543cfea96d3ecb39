//! The per-entry insertion string table.
//!
//! Slots are sparse but the table is contiguous: setting index `k` grows the
//! table to exactly `k + 1` slots, the gap filled with empty slots. A slot
//! holds either an owned wide string or a weak reference to a param, never
//! both; installing one representation drops the other.

use std::sync::Weak;

use widestring::U16CString;

use crate::err::{Error, Result};
use crate::param::Param;

#[derive(Debug, Clone, Default)]
pub(crate) enum InsertionSlot {
    #[default]
    Empty,
    Text(U16CString),
    ParamRef(Weak<Param>),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct InsertionTable {
    slots: Vec<InsertionSlot>,
}

impl InsertionTable {
    pub(crate) fn len(&self) -> u16 {
        self.slots.len() as u16
    }

    /// Grows the table so that `index` is valid, filling new slots with
    /// `Empty`. On allocation failure the table keeps its previous length.
    fn grow_for(&mut self, index: u16) -> Result<()> {
        let needed = index as usize + 1;
        if needed > self.slots.len() {
            self.slots
                .try_reserve_exact(needed - self.slots.len())
                .map_err(Error::from)?;
            self.slots.resize_with(needed, InsertionSlot::default);
        }
        Ok(())
    }

    /// Installs an owned wide string at `index`, releasing whatever the slot
    /// held before.
    pub(crate) fn put_text(&mut self, index: u16, text: U16CString) -> Result<()> {
        self.grow_for(index)?;
        self.slots[index as usize] = InsertionSlot::Text(text);
        Ok(())
    }

    /// Installs a param reference at `index`, releasing whatever the slot
    /// held before.
    pub(crate) fn put_param(&mut self, index: u16, param: Weak<Param>) -> Result<()> {
        self.grow_for(index)?;
        self.slots[index as usize] = InsertionSlot::ParamRef(param);
        Ok(())
    }

    pub(crate) fn slot(&self, index: u16) -> Result<&InsertionSlot> {
        self.slots
            .get(index as usize)
            .ok_or(Error::IndexOutOfBounds {
                index,
                count: self.len(),
            })
    }
}
