//! Registry access behind a trait, so the installer's transactional state
//! machine runs unchanged against the live Windows registry or the
//! in-memory backend used in tests and on non-Windows hosts.
//!
//! Transactions are scoped resources: a backend's `Txn` type must roll the
//! transaction back when dropped without [`Registry::commit`]. The abort
//! path on every error exit is therefore simply "return early".

use widestring::U16CStr;

use crate::err::Result;

pub mod mem;
#[cfg(windows)]
pub mod windows;

// The platform codes shared by both backends.
pub const ERROR_FILE_NOT_FOUND: u32 = 2;
pub const ERROR_NOT_ENOUGH_MEMORY: u32 = 8;
pub const ERROR_INVALID_PARAMETER: u32 = 87;
pub const ERROR_UNSUPPORTED_TYPE: u32 = 1630;

/// A typed value payload, borrowed from the installer for the duration of a
/// single write.
#[derive(Debug, Clone, Copy)]
pub enum RegValue<'a> {
    Dword(u32),
    /// A NUL-terminated wide string.
    Sz(&'a U16CStr),
    /// Raw multi-string code units, terminators included.
    MultiSz(&'a [u16]),
}

/// Mutation surface of a registry rooted at the machine hive.
///
/// `Key` is an open handle with query and write access; backends release it
/// when it is dropped. All paths are relative to the root and separated
/// with backslashes.
pub trait Registry {
    type Key;
    type Txn;

    /// Opens an existing key. `Ok(None)` means the key does not exist,
    /// which is a normal outcome for the installer's probe; any other
    /// failure is an error.
    fn open_key(&self, path: &U16CStr) -> Result<Option<Self::Key>>;

    /// Reads a multi-string value as raw code units, terminators included.
    /// No shape validation is performed here; malformed persisted data is
    /// the caller's problem to detect.
    fn read_multi_sz(&self, key: &Self::Key, name: &str) -> Result<Vec<u16>>;

    /// Writes a value directly, outside any transaction.
    fn set_value(&self, key: &Self::Key, name: &str, value: RegValue<'_>) -> Result<()>;

    /// Begins a transaction. Dropping the returned handle without committing
    /// rolls every operation made under it back.
    fn begin(&self, description: &str) -> Result<Self::Txn>;

    /// Creates (or opens) the key at `path` within the transaction.
    fn create_key(&self, txn: &mut Self::Txn, path: &U16CStr) -> Result<Self::Key>;

    /// Creates (or opens) a direct subkey of `parent` within the
    /// transaction. `parent` itself may have been opened outside it.
    fn create_subkey(
        &self,
        txn: &mut Self::Txn,
        parent: &Self::Key,
        name: &U16CStr,
    ) -> Result<Self::Key>;

    /// Writes a value to a key created under the transaction.
    fn set_value_txn(
        &self,
        txn: &mut Self::Txn,
        key: &Self::Key,
        name: &str,
        value: RegValue<'_>,
    ) -> Result<()>;

    /// Commits the transaction, making all of its operations visible
    /// atomically.
    fn commit(&self, txn: Self::Txn) -> Result<()>;

    /// Deletes the key at `path` together with its whole subtree. Fails
    /// with the platform's not-found code if the key does not exist.
    fn delete_tree(&self, path: &U16CStr) -> Result<()>;
}
