//! Derivation of event metadata from a syslog priority value.
//!
//! A prival packs a facility and a severity as `facility * 8 + severity`.
//! When an entry carries no explicit override, its category, event type and
//! event id are computed from the prival with the functions here. The
//! arithmetic is load-bearing: event ids must land on the same values as the
//! message catalogs that were compiled against them.

/// Syslog severities, per RFC 5424.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl Severity {
    /// Extracts the severity from a prival. Total: only the low three bits
    /// are consulted.
    pub fn from_prival(prival: u32) -> Severity {
        match prival & 0x7 {
            0 => Severity::Emergency,
            1 => Severity::Alert,
            2 => Severity::Critical,
            3 => Severity::Error,
            4 => Severity::Warning,
            5 => Severity::Notice,
            6 => Severity::Info,
            _ => Severity::Debug,
        }
    }
}

/// Windows event types. The discriminants are the `EVENTLOG_*` constants,
/// which is what makes [`event_id`] reproduce catalog-compatible values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EventType {
    Success = 0x0000,
    Error = 0x0001,
    Warning = 0x0002,
    Information = 0x0004,
    AuditSuccess = 0x0008,
    AuditFailure = 0x0010,
}

/// The severity bits of a prival.
pub fn severity(prival: u32) -> u32 {
    prival & 0x7
}

/// The facility bits of a prival, still shifted left by three.
pub fn facility(prival: u32) -> u32 {
    prival & !0x7
}

/// Categories enumerate the eight severities one-based.
pub fn category(prival: u32) -> u16 {
    severity(prival) as u16 + 1
}

/// Maps a prival onto the event type the log viewer should display.
///
/// Severities with no natural event type (EMERG, ALERT, CRIT, ERR) all fall
/// through to `Error`, which keeps this total.
pub fn event_type(prival: u32) -> EventType {
    match Severity::from_prival(prival) {
        Severity::Debug => EventType::Success,
        Severity::Notice | Severity::Info => EventType::Information,
        Severity::Warning => EventType::Warning,
        Severity::Emergency | Severity::Alert | Severity::Critical | Severity::Error => {
            EventType::Error
        }
    }
}

/// Packs facility and event type into a single identifier space.
pub fn event_id(prival: u32) -> u32 {
    (facility(prival) >> 3) + (event_type(prival) as u32 * 23) + 1
}
