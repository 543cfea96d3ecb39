//! Windows Event Log source registration and per-entry event metadata.
//!
//! Two halves, usable independently:
//!
//! - [`WelData`] is the metadata record a log entry carries for the event
//!   log: category, event type, event id (each either explicitly set or
//!   derived from the entry's syslog priority value) and an indexed table
//!   of insertion strings resolved by the log viewer at read time.
//! - [`install_source_in`] and friends perform the one-time, transactional
//!   registration of a named event source in the registry, so the viewer
//!   can find the message files for this process's events.
//!
//! The installer is generic over a [`Registry`] backend. On Windows the
//! [`install_source`] wrappers bind it to the live registry; everywhere,
//! [`MemRegistry`] provides the same semantics in memory:
//!
//! ```
//! use welter::{MemRegistry, SourceRegistration, SupportedTypes};
//!
//! let registry = MemRegistry::new();
//! let registration = SourceRegistration {
//!     subkey_name: "Acme".to_string(),
//!     source_name: "AcmeAgent".to_string(),
//!     category_count: 4,
//!     category_file: None,
//!     event_file: Some(r"C:\acme\agent.dll".to_string()),
//!     parameter_file: None,
//!     types_supported: SupportedTypes::ERROR | SupportedTypes::WARNING,
//! };
//! welter::install_source_in(&registry, &registration)?;
//!
//! let key = r"SYSTEM\CurrentControlSet\Services\EventLog\Acme";
//! assert_eq!(
//!     registry.multi_sz_names(key, "Sources"),
//!     Some(vec!["AcmeAgent".to_string()])
//! );
//! # Ok::<(), welter::Error>(())
//! ```

pub mod err;
mod insertion;
pub mod last_error;
mod multi_sz;
pub mod param;
pub mod prival;
pub mod registry;
pub mod source;
pub mod wel_data;
pub mod wide;

pub use err::{Error, ErrorKind, Result};
pub use last_error::{last_error, LastError};
pub use param::Param;
pub use prival::{EventType, Severity};
pub use registry::mem::MemRegistry;
pub use registry::{RegValue, Registry};
pub use source::{
    install_default_source_in, install_source_in, remove_default_source_in, SourceRegistration,
    SupportedTypes, BASE_SOURCE_SUBKEY, DEFAULT_CATEGORY_COUNT, DEFAULT_SOURCE_NAME,
    DEFAULT_TYPES_SUPPORTED,
};
#[cfg(windows)]
pub use source::{install_default_source, install_source, remove_default_source};
pub use wel_data::WelData;
