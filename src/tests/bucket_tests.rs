/// Locked hash table tests
use super::init_logging;
use crate::LockedHashTable;
use crate::bucket::bucket_of;
use crate::demo;
use std::sync::Arc;
use std::thread;

#[test]
fn test_hash_spreads_small_keys() {
    assert_eq!(bucket_of(0, 2), 0);
    assert_eq!(bucket_of(1, 2), 1);
    assert_eq!(bucket_of(2, 2), 3);
    assert_eq!(bucket_of(3, 2), 0);
    assert_eq!(bucket_of(12345, 0), 0);
}

#[test]
fn test_print_order_follows_buckets_newest_first() {
    init_logging();
    let table = LockedHashTable::new(2);
    assert_eq!(table.bucket_count(), 4);

    for key in 0..4 {
        table.add_item(key);
    }

    // Bucket 0 holds 3 then 0, bucket 1 holds 1, bucket 3 holds 2.
    assert_eq!(table.print_all_items(), [3, 0, 1, 2]);
}

#[test]
fn test_add_then_delete_leaves_table_empty() {
    let table = LockedHashTable::new(2);
    for key in 0..1000 {
        table.add_item(key);
    }
    assert_eq!(table.len(), 1000);
    assert!(table.contains(999));

    for key in 0..1000 {
        assert!(table.del_item(key));
    }
    assert!(table.is_empty());
    assert!(table.print_all_items().is_empty());
}

#[test]
fn test_delete_missing_and_duplicate_keys() {
    let table = LockedHashTable::new(3);
    assert!(!table.del_item(5));

    table.add_item(5);
    table.add_item(5);
    assert_eq!(table.len(), 2);

    assert!(table.del_item(5));
    assert!(table.contains(5));
    assert!(table.del_item(5));
    assert!(!table.contains(5));
    assert!(!table.del_item(5));
}

#[test]
fn test_negative_keys() {
    let table = LockedHashTable::new(4);
    table.add_item(-1);
    table.add_item(i32::MIN);

    assert!(table.contains(-1));
    assert!(table.del_item(i32::MIN));
    assert_eq!(table.len(), 1);
}

#[test]
#[should_panic(expected = "bits must be below 32")]
fn test_rejects_oversized_table() {
    let _ = LockedHashTable::new(32);
}

#[test]
fn test_concurrent_disjoint_writers() {
    let table = Arc::new(LockedHashTable::new(4));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for key in (t * 250)..((t + 1) * 250) {
                    table.add_item(key);
                }
                for key in (t * 250)..((t + 1) * 250) {
                    assert!(table.del_item(key));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(table.is_empty());
}

#[test]
fn test_demo_hash_table_run() {
    assert!(demo::run_hash_table(2, 1000));
}
