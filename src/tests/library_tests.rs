/// Library tests: the scripted scenario, copy-on-write isolation and error paths
use super::init_logging;
use crate::{Library, ReclaimConfig, RetireMode, ShelfError, demo};

fn manual_library() -> Library {
    Library::builder()
        .reclaim(ReclaimConfig::new().auto_reclaim_threshold(None))
        .build()
        .unwrap()
}

/// Add, borrow twice, return, delete, checking state after each step.
fn run_scenario(library: &Library, mode: RetireMode) {
    let reader = library.register_reader();

    library.add(0, "book1", "jb").unwrap();
    assert_eq!(library.lookup_state(&reader, 0), Some(false));

    library.transition(&reader, 0, true, mode).unwrap();
    assert_eq!(library.lookup_state(&reader, 0), Some(true));

    assert!(matches!(
        library.transition(&reader, 0, true, mode),
        Err(ShelfError::AlreadyInState {
            id: 0,
            borrowed: true
        })
    ));

    library.transition(&reader, 0, false, mode).unwrap();
    assert_eq!(library.lookup_state(&reader, 0), Some(false));

    library.delete(0, mode).unwrap();
    assert_eq!(library.lookup_state(&reader, 0), None);
}

#[test]
fn test_scenario_synchronous() {
    init_logging();
    let library = manual_library();

    run_scenario(&library, RetireMode::Synchronous);

    let stats = library.reclaim_stats();
    assert_eq!(stats.pending, 0);
    // Two transitions and one delete, each reclaimed inline.
    assert_eq!(stats.reclaimed, 3);
    assert_eq!(stats.grace_periods, 3);
}

#[test]
fn test_scenario_deferred() {
    init_logging();
    let library = manual_library();

    run_scenario(&library, RetireMode::Deferred);

    let stats = library.reclaim_stats();
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.reclaimed, 0);

    assert_eq!(library.barrier(), 3);
    assert_eq!(library.reclaim_stats().pending, 0);
}

#[test]
fn test_deferred_entry_pending_until_reader_closes() {
    let library = manual_library();
    let reader = library.register_reader();
    let writer = library.register_reader();
    library.add(0, "book1", "jb").unwrap();

    let guard = reader.read();
    let old = library.get(&guard, 0).unwrap();

    library
        .transition(&writer, 0, true, RetireMode::Deferred)
        .unwrap();
    assert_eq!(library.collect(), 0);
    assert_eq!(library.reclaim_stats().pending, 1);

    // The superseded copy is still intact.
    assert_eq!(old.id(), 0);
    assert_eq!(old.name(), "book1");
    assert!(!old.is_borrowed());

    drop(guard);
    assert_eq!(library.collect(), 1);
    assert_eq!(library.reclaim_stats().pending, 0);
}

#[test]
fn test_copy_on_write_isolation() {
    let library = manual_library();
    let reader = library.register_reader();
    library.add(5, "book", "author").unwrap();

    let before = reader.read();
    let held = library.get(&before, 5).unwrap();

    library.borrow(&reader, 5, RetireMode::Deferred).unwrap();

    let after = reader.read();
    assert!(!held.is_borrowed());
    assert!(library.get(&after, 5).unwrap().is_borrowed());
    assert!(!std::ptr::eq(held, library.get(&after, 5).unwrap()));
}

#[test]
fn test_already_in_state_both_directions() {
    let library = manual_library();
    let reader = library.register_reader();
    library.add(1, "book2", "jb").unwrap();

    assert!(matches!(
        library.give_back(&reader, 1, RetireMode::Synchronous),
        Err(ShelfError::AlreadyInState {
            id: 1,
            borrowed: false
        })
    ));

    library.borrow(&reader, 1, RetireMode::Synchronous).unwrap();
    assert!(matches!(
        library.borrow(&reader, 1, RetireMode::Synchronous),
        Err(ShelfError::AlreadyInState { id: 1, borrowed: true })
    ));
    assert_eq!(library.lookup_state(&reader, 1), Some(true));
}

#[test]
fn test_not_found_errors() {
    let library = manual_library();
    let reader = library.register_reader();

    assert!(matches!(
        library.borrow(&reader, 42, RetireMode::Deferred),
        Err(ShelfError::NotFound { id: 42 })
    ));
    assert!(matches!(
        library.delete(42, RetireMode::Synchronous),
        Err(ShelfError::NotFound { id: 42 })
    ));
    assert_eq!(library.lookup_state(&reader, 42), None);
    assert!(library.print_snapshot(&reader, 42).is_none());
}

#[test]
fn test_delete_then_lookup_stays_absent() {
    let library = manual_library();
    let reader = library.register_reader();
    library.add(0, "book1", "jb").unwrap();
    library.add(1, "book2", "jb").unwrap();

    library.delete(0, RetireMode::Deferred).unwrap();
    for _ in 0..3 {
        assert_eq!(library.lookup_state(&reader, 0), None);
    }
    assert_eq!(library.lookup_state(&reader, 1), Some(false));
    assert_eq!(library.ids(&reader), [1]);
}

#[test]
fn test_ids_front_to_back_and_duplicates() {
    let library = manual_library();
    let reader = library.register_reader();

    library.add(0, "first", "a").unwrap();
    library.add(1, "second", "b").unwrap();
    library.add(0, "shadow", "c").unwrap();

    assert_eq!(library.ids(&reader), [0, 1, 0]);
    assert_eq!(library.len(), 3);

    let snapshot = library.print_snapshot(&reader, 0).unwrap();
    assert_eq!(snapshot.name(), "shadow");

    // Delete removes the most recent one first.
    library.delete(0, RetireMode::Synchronous).unwrap();
    assert_eq!(library.print_snapshot(&reader, 0).unwrap().name(), "first");
}

#[test]
fn test_capacity_limits_adds() {
    let library = Library::builder().capacity(2).build().unwrap();

    library.add(0, "a", "x").unwrap();
    library.add(1, "b", "x").unwrap();

    assert!(matches!(
        library.add(2, "c", "x"),
        Err(ShelfError::ResourceExhausted {
            capacity: 2,
            live: 2,
            pending: 0
        })
    ));
    assert_eq!(library.len(), 2);
}

#[test]
fn test_capacity_counts_unreclaimed_entries() {
    let library = Library::builder()
        .capacity(2)
        .reclaim(ReclaimConfig::new().auto_reclaim_threshold(None))
        .build()
        .unwrap();
    let reader = library.register_reader();

    library.add(0, "a", "x").unwrap();
    library.add(1, "b", "x").unwrap();

    let guard = reader.read();
    library.delete(1, RetireMode::Deferred).unwrap();

    // The deleted entry cannot be reclaimed while the reader is open.
    assert!(matches!(
        library.add(2, "c", "x"),
        Err(ShelfError::ResourceExhausted { live: 1, pending: 1, .. })
    ));

    drop(guard);
    // Admission collects first, which now frees the deleted entry.
    library.add(2, "c", "x").unwrap();
    assert_eq!(library.ids(&reader), [2, 0]);
}

#[test]
fn test_capacity_limits_transition_copy() {
    let library = Library::builder().capacity(1).build().unwrap();
    let reader = library.register_reader();
    library.add(0, "a", "x").unwrap();

    assert!(matches!(
        library.borrow(&reader, 0, RetireMode::Synchronous),
        Err(ShelfError::ResourceExhausted { capacity: 1, .. })
    ));
    assert_eq!(library.lookup_state(&reader, 0), Some(false));
}

#[test]
fn test_long_text_is_truncated() {
    let library = manual_library();
    let reader = library.register_reader();
    let title = "t".repeat(100);

    library.add(3, &title, "jb").unwrap();
    let book = library.print_snapshot(&reader, 3).unwrap();
    assert_eq!(book.name().len(), crate::TEXT_CAPACITY);
}

#[test]
fn test_demo_script_both_modes() {
    init_logging();
    let library = Library::new();
    let reader = library.register_reader();

    demo::run_script(&library, &reader, RetireMode::Synchronous).unwrap();
    assert!(library.is_empty());

    demo::run_script(&library, &reader, RetireMode::Deferred).unwrap();
    assert!(library.is_empty());

    library.barrier();
    assert_eq!(library.reclaim_stats().pending, 0);
}

#[test]
fn test_background_reclaimer_frees_deferred_entries() {
    init_logging();
    let library = Library::builder()
        .reclaim(ReclaimConfig::new().auto_reclaim_threshold(None))
        .background_reclaim(std::time::Duration::from_millis(1))
        .build()
        .unwrap();
    let reader = library.register_reader();

    library.add(0, "book1", "jb").unwrap();
    library.borrow(&reader, 0, RetireMode::Deferred).unwrap();
    library.delete(0, RetireMode::Deferred).unwrap();

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while library.reclaim_stats().pending > 0 {
        assert!(std::time::Instant::now() < deadline, "background reclaimer stalled");
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    assert_eq!(library.reclaim_stats().reclaimed, 2);
}

#[test]
fn test_error_messages() {
    assert_eq!(
        ShelfError::NotFound { id: 3 }.to_string(),
        "book 3 does not exist"
    );
    assert_eq!(
        ShelfError::AlreadyInState {
            id: 0,
            borrowed: true
        }
        .to_string(),
        "book 0 is already borrowed"
    );
    assert_eq!(
        ShelfError::AlreadyInState {
            id: 0,
            borrowed: false
        }
        .to_string(),
        "book 0 is already returned"
    );
}
