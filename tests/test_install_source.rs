
use fixtures::*;
use pretty_assertions::assert_eq;

use welter::registry::{ERROR_FILE_NOT_FOUND, ERROR_INVALID_PARAMETER};
use welter::{
    install_default_source_in, install_source_in, last_error, remove_default_source_in,
    ErrorKind, MemRegistry, DEFAULT_CATEGORY_COUNT, DEFAULT_SOURCE_NAME,
};

#[test]
fn fresh_install_creates_the_full_layout() {
    ensure_env_logger_initialized();
    let registry = MemRegistry::new();

    install_source_in(&registry, &acme_registration("AcmeAgent")).unwrap();

    assert_eq!(
        registry.multi_sz_names(&app_key(), "Sources"),
        Some(vec!["AcmeAgent".to_string()])
    );

    let source = source_key("AcmeAgent");
    assert_eq!(registry.dword(&source, "CategoryCount"), Some(8));
    assert_eq!(
        registry.string_value(&source, "CategoryMessageFile").as_deref(),
        Some(r"C:\acme\categories.dll")
    );
    assert_eq!(
        registry.string_value(&source, "EventMessageFile").as_deref(),
        Some(r"C:\acme\messages.dll")
    );
    // No parameter file was supplied, so the value must not exist.
    assert_eq!(registry.string_value(&source, "ParameterMessageFile"), None);
    assert_eq!(registry.dword(&source, "TypesSupported"), Some(0x0007));
}

#[test]
fn repeated_install_is_idempotent() {
    ensure_env_logger_initialized();
    let registry = MemRegistry::new();
    let registration = acme_registration("AcmeAgent");

    install_source_in(&registry, &registration).unwrap();
    install_source_in(&registry, &registration).unwrap();

    assert_eq!(
        registry.multi_sz_names(&app_key(), "Sources"),
        Some(vec!["AcmeAgent".to_string()])
    );
    let source = source_key("AcmeAgent");
    assert_eq!(registry.dword(&source, "CategoryCount"), Some(8));
    assert_eq!(registry.dword(&source, "TypesSupported"), Some(0x0007));
}

#[test]
fn merge_preserves_existing_sources() {
    ensure_env_logger_initialized();
    let registry = MemRegistry::new();

    install_source_in(&registry, &acme_registration("First")).unwrap();
    install_source_in(&registry, &acme_registration("Second")).unwrap();

    assert_eq!(
        registry.multi_sz_names(&app_key(), "Sources"),
        Some(vec!["First".to_string(), "Second".to_string()])
    );
    assert!(registry.key_exists(&source_key("First")));
    assert!(registry.key_exists(&source_key("Second")));
}

#[test]
fn malformed_sources_list_blocks_the_install() {
    ensure_env_logger_initialized();
    let registry = MemRegistry::new();

    // Non-empty but missing the double-NUL termination.
    let malformed: Vec<u16> = "Rogue".encode_utf16().collect();
    registry.put_raw_multi_sz(&app_key(), "Sources", malformed.clone());

    let err = install_source_in(&registry, &acme_registration("AcmeAgent")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
    assert_eq!(err.platform_code(), Some(ERROR_INVALID_PARAMETER));
    // Nothing was mutated: the malformed value is untouched and no source
    // subkey appeared.
    assert!(!registry.key_exists(&source_key("AcmeAgent")));
    assert_eq!(registry.key_count(), 1);
}

#[test]
fn create_fresh_failure_rolls_back_completely() {
    ensure_env_logger_initialized();
    let registry = MemRegistry::new();

    // The first transacted value write (the Sources list) fails; the
    // transaction is dropped uncommitted and nothing becomes visible.
    registry.fail_next_value_write(5);
    let err = install_source_in(&registry, &acme_registration("AcmeAgent")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Registry);
    assert_eq!(registry.key_count(), 0);
}

#[test]
fn merge_failure_leaves_sources_window() {
    ensure_env_logger_initialized();
    let registry = MemRegistry::new();
    install_source_in(&registry, &acme_registration("First")).unwrap();

    // Let the non-transacted Sources append (write 1) succeed, then fail
    // the first transacted populate write (CategoryCount, write 2).
    let registration = acme_registration("Second");
    registry.fail_value_write(2, 5);
    let err = install_source_in(&registry, &registration).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Registry);

    // The documented inconsistency window: the name is listed, but its
    // subkey never appeared because the transaction rolled back.
    assert_eq!(
        registry.multi_sz_names(&app_key(), "Sources"),
        Some(vec!["First".to_string(), "Second".to_string()])
    );
    assert!(!registry.key_exists(&source_key("Second")));

    // A later install of the same source closes the window.
    install_source_in(&registry, &registration).unwrap();
    assert_eq!(
        registry.multi_sz_names(&app_key(), "Sources"),
        Some(vec!["First".to_string(), "Second".to_string()])
    );
    assert!(registry.key_exists(&source_key("Second")));
}

#[test]
fn default_source_round_trip() {
    ensure_env_logger_initialized();
    let registry = MemRegistry::new();

    install_default_source_in(&registry).unwrap();

    let key = format!(r"{EVENTLOG_BASE}\{DEFAULT_SOURCE_NAME}");
    let source = format!(r"{key}\{DEFAULT_SOURCE_NAME}");
    assert_eq!(
        registry.multi_sz_names(&key, "Sources"),
        Some(vec![DEFAULT_SOURCE_NAME.to_string()])
    );
    assert_eq!(
        registry.dword(&source, "CategoryCount"),
        Some(DEFAULT_CATEGORY_COUNT)
    );
    assert_eq!(registry.dword(&source, "TypesSupported"), Some(0x001f));

    // All three message files point at the installing module.
    let module = registry.string_value(&source, "EventMessageFile").unwrap();
    assert!(!module.is_empty());
    assert_eq!(
        registry.string_value(&source, "CategoryMessageFile"),
        Some(module.clone())
    );
    assert_eq!(
        registry.string_value(&source, "ParameterMessageFile"),
        Some(module)
    );

    remove_default_source_in(&registry).unwrap();
    assert!(!registry.key_exists(&key));
    assert!(!registry.key_exists(&source));
}

#[test]
fn removing_an_absent_default_source_fails() {
    ensure_env_logger_initialized();
    let registry = MemRegistry::new();

    let err = remove_default_source_in(&registry).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Registry);
    assert_eq!(err.platform_code(), Some(ERROR_FILE_NOT_FOUND));
}

#[test]
fn last_error_slot_tracks_the_latest_outcome() {
    ensure_env_logger_initialized();
    let registry = MemRegistry::new();

    let err = remove_default_source_in(&registry).unwrap_err();
    let recorded = last_error().expect("failure should be recorded");
    assert_eq!(recorded.kind, ErrorKind::Registry);
    assert_eq!(recorded.code, err.platform_code());

    install_source_in(&registry, &acme_registration("AcmeAgent")).unwrap();
    assert_eq!(last_error(), None);
}
