//! Event source installation.
//!
//! An event source is registered under the event-log services key so the
//! platform log viewer can resolve a process's events against its message
//! files. Installation either creates the whole subkey from scratch or
//! merges a new source into an existing one; both paths populate the
//! per-source typed values inside a registry transaction, so a failure
//! partway through leaves no partially populated source behind.

use bitflags::bitflags;
use log::{debug, warn};
use widestring::{U16CStr, U16CString};

use crate::err::{Error, Result};
use crate::last_error;
use crate::multi_sz;
use crate::registry::{RegValue, Registry};
use crate::wide;

/// The services subkey all event sources live under, trailing backslash
/// included.
pub const BASE_SOURCE_SUBKEY: &str = "SYSTEM\\CurrentControlSet\\Services\\EventLog\\";

/// Subkey and source name used by [`install_default_source_in`].
pub const DEFAULT_SOURCE_NAME: &str = "Welter";

/// Categories in the default source's message file, one per syslog severity.
pub const DEFAULT_CATEGORY_COUNT: u32 = 8;

const SOURCES_VALUE: &str = "Sources";
const TXN_DESCRIPTION: &str = "Welter event source registration";

bitflags! {
    /// Event type flags for the `TypesSupported` registry value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SupportedTypes: u32 {
        const ERROR = 0x0001;
        const WARNING = 0x0002;
        const INFORMATION = 0x0004;
        const AUDIT_SUCCESS = 0x0008;
        const AUDIT_FAILURE = 0x0010;
    }
}

/// The type mask the default source is installed with.
pub const DEFAULT_TYPES_SUPPORTED: SupportedTypes = SupportedTypes::from_bits_truncate(0x001f);

/// Everything needed to register one event source.
///
/// The optional message-file paths each control whether the corresponding
/// registry value is written at all; an absent path writes nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistration {
    /// Name of the subkey under [`BASE_SOURCE_SUBKEY`], typically the
    /// owning application.
    pub subkey_name: String,
    /// The source name added to `Sources` and created as a nested subkey.
    pub source_name: String,
    /// Value of `CategoryCount`.
    pub category_count: u32,
    /// Path written to `CategoryMessageFile`, if any.
    pub category_file: Option<String>,
    /// Path written to `EventMessageFile`, if any.
    pub event_file: Option<String>,
    /// Path written to `ParameterMessageFile`, if any.
    pub parameter_file: Option<String>,
    /// Value of `TypesSupported`.
    pub types_supported: SupportedTypes,
}

struct MessageFiles {
    category: Option<U16CString>,
    event: Option<U16CString>,
    parameter: Option<U16CString>,
}

impl MessageFiles {
    fn convert(registration: &SourceRegistration) -> Result<MessageFiles> {
        let convert = |file: &Option<String>| file.as_deref().map(wide::to_wide).transpose();
        Ok(MessageFiles {
            category: convert(&registration.category_file)?,
            event: convert(&registration.event_file)?,
            parameter: convert(&registration.parameter_file)?,
        })
    }
}

/// Registers an event source in `registry`.
///
/// If the application subkey does not exist yet it is created, along with
/// its `Sources` list and the nested source subkey, inside one transaction.
/// If it does exist, the source name is appended to `Sources` (unless
/// already present) and the nested subkey is then created and populated
/// inside a fresh transaction.
///
/// The merge path's `Sources` append deliberately happens outside that
/// transaction: re-adding an existing name is a no-op, so concurrent
/// installers can race on it safely. The cost is a small window in which a
/// crash leaves the name listed without its subkey; a later install of the
/// same source closes it.
///
/// Installation is idempotent: repeating a registration leaves one
/// occurrence of the name and the same typed values.
pub fn install_source_in<R: Registry>(
    registry: &R,
    registration: &SourceRegistration,
) -> Result<()> {
    last_error::track(add_event_source(registry, registration))
}

/// Registers the default source, pointing every message-file value at the
/// module this crate is linked into.
pub fn install_default_source_in<R: Registry>(registry: &R) -> Result<()> {
    last_error::track((|| {
        let module_path = installing_module_path()?;
        let registration = SourceRegistration {
            subkey_name: DEFAULT_SOURCE_NAME.to_string(),
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            category_count: DEFAULT_CATEGORY_COUNT,
            category_file: Some(module_path.clone()),
            event_file: Some(module_path.clone()),
            parameter_file: Some(module_path),
            types_supported: DEFAULT_TYPES_SUPPORTED,
        };
        add_event_source(registry, &registration)
    })())
}

/// Deletes the default source's whole subtree. Fails if it is not
/// installed.
pub fn remove_default_source_in<R: Registry>(registry: &R) -> Result<()> {
    last_error::track((|| {
        let path = wide::to_wide(&format!("{BASE_SOURCE_SUBKEY}{DEFAULT_SOURCE_NAME}"))?;
        registry.delete_tree(&path)
    })())
}

/// Registers an event source in the live registry.
#[cfg(windows)]
pub fn install_source(registration: &SourceRegistration) -> Result<()> {
    install_source_in(&crate::registry::windows::WinRegistry, registration)
}

/// Registers the default source in the live registry.
#[cfg(windows)]
pub fn install_default_source() -> Result<()> {
    install_default_source_in(&crate::registry::windows::WinRegistry)
}

/// Removes the default source from the live registry.
#[cfg(windows)]
pub fn remove_default_source() -> Result<()> {
    remove_default_source_in(&crate::registry::windows::WinRegistry)
}

fn add_event_source<R: Registry>(
    registry: &R,
    registration: &SourceRegistration,
) -> Result<()> {
    if registration.subkey_name.is_empty() {
        return Err(Error::EmptyArgument { name: "subkey_name" });
    }
    if registration.source_name.is_empty() {
        return Err(Error::EmptyArgument { name: "source_name" });
    }

    let source = wide::to_wide(&registration.source_name)?;
    let files = MessageFiles::convert(registration)?;
    let path = wide::to_wide(&format!(
        "{BASE_SOURCE_SUBKEY}{}",
        registration.subkey_name
    ))?;

    // Probe before any mutation: the subkey's existence decides the path.
    match registry.open_key(&path)? {
        None => {
            debug!(
                "subkey {} not found, creating it for source {}",
                registration.subkey_name, registration.source_name
            );
            create_fresh(registry, &path, &source, registration, &files)
        }
        Some(key) => {
            debug!(
                "subkey {} exists, merging source {}",
                registration.subkey_name, registration.source_name
            );
            merge_into_existing(registry, &key, &source, registration, &files)
        }
    }
}

/// The create-fresh path: subkey, `Sources` list and nested source subkey
/// all come into existence in one transaction.
fn create_fresh<R: Registry>(
    registry: &R,
    path: &U16CStr,
    source: &U16CStr,
    registration: &SourceRegistration,
    files: &MessageFiles,
) -> Result<()> {
    let mut txn = registry.begin(TXN_DESCRIPTION)?;

    let key = registry.create_key(&mut txn, path)?;
    let sources = multi_sz::single(source);
    registry.set_value_txn(&mut txn, &key, SOURCES_VALUE, RegValue::MultiSz(&sources))?;

    let source_key = registry.create_subkey(&mut txn, &key, source)?;
    populate_source_values(registry, &mut txn, &source_key, registration, files)?;

    registry.commit(txn)
}

/// The merge path: validate the existing `Sources` list, append the new
/// name if needed, then create and populate the nested subkey transacted.
fn merge_into_existing<R: Registry>(
    registry: &R,
    key: &R::Key,
    source: &U16CStr,
    registration: &SourceRegistration,
    files: &MessageFiles,
) -> Result<()> {
    let sources = registry.read_multi_sz(key, SOURCES_VALUE)?;
    if let Err(err) = multi_sz::validate(&sources) {
        warn!(
            "refusing to touch subkey {}: persisted Sources list is malformed",
            registration.subkey_name
        );
        return Err(err);
    }

    if multi_sz::contains(&sources, source) {
        debug!(
            "source {} already listed under {}",
            registration.source_name, registration.subkey_name
        );
    } else {
        let extended = multi_sz::append(&sources, source);
        registry.set_value(key, SOURCES_VALUE, RegValue::MultiSz(&extended))?;
        debug!(
            "appended {} to the Sources list of {}",
            registration.source_name, registration.subkey_name
        );
    }

    let mut txn = registry.begin(TXN_DESCRIPTION)?;
    let source_key = registry.create_subkey(&mut txn, key, source)?;
    populate_source_values(registry, &mut txn, &source_key, registration, files)?;
    registry.commit(txn)
}

/// Writes the typed values of one source subkey. The first failing write
/// propagates; the surrounding transaction, aborted by the caller, unwinds
/// the earlier ones.
fn populate_source_values<R: Registry>(
    registry: &R,
    txn: &mut R::Txn,
    key: &R::Key,
    registration: &SourceRegistration,
    files: &MessageFiles,
) -> Result<()> {
    registry.set_value_txn(
        txn,
        key,
        "CategoryCount",
        RegValue::Dword(registration.category_count),
    )?;

    if let Some(file) = &files.category {
        registry.set_value_txn(txn, key, "CategoryMessageFile", RegValue::Sz(file))?;
    }
    if let Some(file) = &files.event {
        registry.set_value_txn(txn, key, "EventMessageFile", RegValue::Sz(file))?;
    }
    if let Some(file) = &files.parameter {
        registry.set_value_txn(txn, key, "ParameterMessageFile", RegValue::Sz(file))?;
    }

    registry.set_value_txn(
        txn,
        key,
        "TypesSupported",
        RegValue::Dword(registration.types_supported.bits()),
    )
}

#[cfg(windows)]
use crate::registry::windows::installing_module_path;

#[cfg(not(windows))]
fn installing_module_path() -> Result<String> {
    let path = std::env::current_exe().map_err(|err| Error::Registry {
        operation: "current_exe",
        code: err.raw_os_error().unwrap_or(0) as u32,
    })?;
    Ok(path.to_string_lossy().into_owned())
}
