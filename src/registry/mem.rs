//! In-memory registry backend.
//!
//! Stores keys as full paths in a single map and stages transacted
//! operations in the transaction value itself, applying them in one locked
//! sweep on commit. Dropping an uncommitted [`MemTxn`] discards its staged
//! operations, which is exactly the rollback-on-close behavior of the live
//! backend. The value-write failure hook lets tests drive the installer
//! down its abort paths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::debug;
use widestring::U16CStr;

use crate::err::{Error, Result};
use crate::registry::{RegValue, Registry, ERROR_FILE_NOT_FOUND, ERROR_UNSUPPORTED_TYPE};

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Dword(u32),
    /// Wide code units without the terminator.
    Sz(Vec<u16>),
    /// Raw multi-string code units, terminators included.
    MultiSz(Vec<u16>),
}

impl StoredValue {
    fn from_reg(value: RegValue<'_>) -> StoredValue {
        match value {
            RegValue::Dword(v) => StoredValue::Dword(v),
            RegValue::Sz(s) => StoredValue::Sz(s.as_slice().to_vec()),
            RegValue::MultiSz(units) => StoredValue::MultiSz(units.to_vec()),
        }
    }
}

#[derive(Debug)]
enum StagedOp {
    CreateKey(String),
    SetValue {
        key: String,
        name: String,
        value: StoredValue,
    },
}

/// A staged, not-yet-visible set of registry mutations.
#[derive(Debug, Default)]
pub struct MemTxn {
    ops: Vec<StagedOp>,
}

#[derive(Debug)]
struct FailPlan {
    writes_until_failure: u32,
    code: u32,
}

#[derive(Debug, Default)]
struct MemInner {
    keys: HashMap<String, HashMap<String, StoredValue>>,
    fail_plan: Option<FailPlan>,
}

/// A process-local registry with the same observable semantics as the live
/// backend: probe-able keys, typed values, and atomic transactions.
#[derive(Debug, Default)]
pub struct MemRegistry {
    inner: Mutex<MemInner>,
}

fn path_of(path: &U16CStr) -> Result<String> {
    path.to_string().map_err(|source| Error::WideDecoding { source })
}

impl MemRegistry {
    pub fn new() -> MemRegistry {
        MemRegistry::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemInner> {
        self.inner.lock().expect("lock poisoned")
    }

    fn take_injected_failure(&self, operation: &'static str) -> Result<()> {
        let mut inner = self.lock();
        if let Some(plan) = &mut inner.fail_plan {
            plan.writes_until_failure -= 1;
            if plan.writes_until_failure == 0 {
                let code = plan.code;
                inner.fail_plan = None;
                debug!("injecting failure {code} into {operation}");
                return Err(Error::Registry { operation, code });
            }
        }
        Ok(())
    }

    /// Makes the next value write (transacted or not) fail with `code`.
    pub fn fail_next_value_write(&self, code: u32) {
        self.fail_value_write(1, code);
    }

    /// Makes the `nth` upcoming value write fail with `code`, counting from
    /// one. Earlier writes proceed normally.
    pub fn fail_value_write(&self, nth: u32, code: u32) {
        assert!(nth > 0, "write numbering starts at one");
        self.lock().fail_plan = Some(FailPlan {
            writes_until_failure: nth,
            code,
        });
    }

    /// Whether a key exists at `path`.
    pub fn key_exists(&self, path: &str) -> bool {
        self.lock().keys.contains_key(path)
    }

    /// A DWORD value, if the key and value exist with that type.
    pub fn dword(&self, path: &str, name: &str) -> Option<u32> {
        match self.lock().keys.get(path)?.get(name)? {
            StoredValue::Dword(v) => Some(*v),
            _ => None,
        }
    }

    /// A string value decoded to UTF-8, if present.
    pub fn string_value(&self, path: &str, name: &str) -> Option<String> {
        match self.lock().keys.get(path)?.get(name)? {
            StoredValue::Sz(units) => String::from_utf16(units).ok(),
            _ => None,
        }
    }

    /// The names held in a multi-string value, if present and well formed.
    pub fn multi_sz_names(&self, path: &str, name: &str) -> Option<Vec<String>> {
        let inner = self.lock();
        match inner.keys.get(path)?.get(name)? {
            StoredValue::MultiSz(units) => crate::multi_sz::entries(units)
                .map(|entry| String::from_utf16(entry).ok())
                .collect(),
            _ => None,
        }
    }

    /// Plants a raw multi-string value, creating the key if needed. Tests
    /// use this to persist deliberately malformed payloads.
    pub fn put_raw_multi_sz(&self, path: &str, name: &str, units: Vec<u16>) {
        self.lock()
            .keys
            .entry(path.to_string())
            .or_default()
            .insert(name.to_string(), StoredValue::MultiSz(units));
    }

    /// The number of existing keys, the whole tree included.
    pub fn key_count(&self) -> usize {
        self.lock().keys.len()
    }
}

impl Registry for MemRegistry {
    type Key = String;
    type Txn = MemTxn;

    fn open_key(&self, path: &U16CStr) -> Result<Option<String>> {
        let path = path_of(path)?;
        if self.lock().keys.contains_key(&path) {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    fn read_multi_sz(&self, key: &String, name: &str) -> Result<Vec<u16>> {
        let inner = self.lock();
        let values = inner.keys.get(key).ok_or(Error::Registry {
            operation: "read value",
            code: ERROR_FILE_NOT_FOUND,
        })?;
        match values.get(name) {
            Some(StoredValue::MultiSz(units)) => Ok(units.clone()),
            Some(_) => Err(Error::Registry {
                operation: "read value",
                code: ERROR_UNSUPPORTED_TYPE,
            }),
            None => Err(Error::Registry {
                operation: "read value",
                code: ERROR_FILE_NOT_FOUND,
            }),
        }
    }

    fn set_value(&self, key: &String, name: &str, value: RegValue<'_>) -> Result<()> {
        self.take_injected_failure("set value")?;
        let mut inner = self.lock();
        let values = inner.keys.get_mut(key).ok_or(Error::Registry {
            operation: "set value",
            code: ERROR_FILE_NOT_FOUND,
        })?;
        values.insert(name.to_string(), StoredValue::from_reg(value));
        Ok(())
    }

    fn begin(&self, description: &str) -> Result<MemTxn> {
        debug!("beginning in-memory transaction: {description}");
        Ok(MemTxn::default())
    }

    fn create_key(&self, txn: &mut MemTxn, path: &U16CStr) -> Result<String> {
        let path = path_of(path)?;
        txn.ops.push(StagedOp::CreateKey(path.clone()));
        Ok(path)
    }

    fn create_subkey(&self, txn: &mut MemTxn, parent: &String, name: &U16CStr) -> Result<String> {
        let path = format!("{parent}\\{}", path_of(name)?);
        txn.ops.push(StagedOp::CreateKey(path.clone()));
        Ok(path)
    }

    fn set_value_txn(
        &self,
        txn: &mut MemTxn,
        key: &String,
        name: &str,
        value: RegValue<'_>,
    ) -> Result<()> {
        self.take_injected_failure("set value")?;
        txn.ops.push(StagedOp::SetValue {
            key: key.clone(),
            name: name.to_string(),
            value: StoredValue::from_reg(value),
        });
        Ok(())
    }

    fn commit(&self, txn: MemTxn) -> Result<()> {
        let mut inner = self.lock();
        for op in txn.ops {
            match op {
                StagedOp::CreateKey(path) => {
                    inner.keys.entry(path).or_default();
                }
                StagedOp::SetValue { key, name, value } => {
                    inner.keys.entry(key).or_default().insert(name, value);
                }
            }
        }
        Ok(())
    }

    fn delete_tree(&self, path: &U16CStr) -> Result<()> {
        let path = path_of(path)?;
        let prefix = format!("{path}\\");
        let mut inner = self.lock();

        if !inner.keys.contains_key(&path) {
            return Err(Error::Registry {
                operation: "delete tree",
                code: ERROR_FILE_NOT_FOUND,
            });
        }
        inner.keys.retain(|key, _| key != &path && !key.starts_with(&prefix));
        Ok(())
    }
}
