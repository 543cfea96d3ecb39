
use std::sync::Arc;

use fixtures::ensure_env_logger_initialized;
use pretty_assertions::assert_eq;

use welter::{EventType, Param, WelData};

// An entry as a caller of this crate would model it: some generic log
// record owning its prival, its structured-data params, and the attached
// metadata record.
struct Entry {
    prival: u32,
    params: Vec<Arc<Param>>,
    wel_data: WelData,
}

impl Entry {
    fn new(facility: u32, severity: u32) -> Entry {
        Entry {
            prival: facility * 8 + severity,
            params: Vec::new(),
            wel_data: WelData::new(),
        }
    }
}

#[test]
fn metadata_follows_the_entry_priority_until_overridden() {
    ensure_env_logger_initialized();
    let mut entry = Entry::new(1, 3);

    assert_eq!(entry.wel_data.category(entry.prival), 4);
    assert_eq!(
        entry.wel_data.event_type(entry.prival),
        EventType::Error as u16
    );
    assert_eq!(entry.wel_data.event_id(entry.prival), 25);

    // An explicit override sticks even when the priority changes.
    entry.wel_data.set_event_id(6000);
    entry.prival = 1 * 8 + 6;
    assert_eq!(entry.wel_data.event_id(entry.prival), 6000);
    assert_eq!(
        entry.wel_data.event_type(entry.prival),
        EventType::Information as u16
    );
}

#[test]
fn insertion_slots_survive_structured_data_churn() {
    ensure_env_logger_initialized();
    let mut entry = Entry::new(4, 4);

    let user = Arc::new(Param::new("user", "alice"));
    entry.params.push(Arc::clone(&user));
    entry.wel_data.set_insertion_param(0, &user).unwrap();
    entry.wel_data.set_insertion_string(1, "logged in").unwrap();

    assert_eq!(
        entry.wel_data.insertion_string(0).unwrap().as_deref(),
        Some("alice")
    );

    // Removing the param from the entry's structured data turns the slot
    // into an absent value; the owned string at index 1 is unaffected.
    entry.params.clear();
    drop(user);
    assert_eq!(entry.wel_data.insertion_string(0).unwrap(), None);
    assert_eq!(
        entry.wel_data.insertion_string(1).unwrap().as_deref(),
        Some("logged in")
    );
}

#[test]
fn copied_entries_share_params_but_not_strings() {
    ensure_env_logger_initialized();
    let mut entry = Entry::new(0, 6);

    let session = Arc::new(Param::new("session", "s-1"));
    entry.params.push(Arc::clone(&session));
    entry.wel_data.set_insertion_param(0, &session).unwrap();
    entry.wel_data.set_insertion_string(1, "original").unwrap();

    let copy = Entry {
        prival: entry.prival,
        params: entry.params.clone(),
        wel_data: entry.wel_data.clone(),
    };

    entry.wel_data.set_insertion_string(1, "changed").unwrap();
    session.set_value("s-2");

    assert_eq!(
        copy.wel_data.insertion_string(0).unwrap().as_deref(),
        Some("s-2")
    );
    assert_eq!(
        copy.wel_data.insertion_string(1).unwrap().as_deref(),
        Some("original")
    );
}
