//! The scripted walk-through run by the `shelf-demo` binary.

use crate::bucket::LockedHashTable;
use crate::error::Result;
use crate::library::Library;
use crate::reader::Reader;
use crate::reclaim::RetireMode;

const BOOKS: [(i32, &str, &str); 2] = [(0, "book1", "jb"), (1, "book2", "jb")];

/// Add two books, then borrow, return and delete each, printing the shelf between
/// steps. Every step must succeed; the first failure is returned.
pub fn run_script(library: &Library, reader: &Reader, mode: RetireMode) -> Result<()> {
    log::info!("running script with {mode} reclamation");

    for (id, name, author) in BOOKS {
        library.add(id, name, author)?;
    }
    print_all(library, reader);

    for (id, name, _) in BOOKS {
        log::info!("{name} borrow : {:?}", library.lookup_state(reader, id));
    }

    for (id, _, _) in BOOKS {
        library.borrow(reader, id, mode)?;
    }
    print_all(library, reader);

    for (id, _, _) in BOOKS {
        library.give_back(reader, id, mode)?;
    }
    print_all(library, reader);

    for (id, _, _) in BOOKS {
        library.delete(id, mode)?;
    }
    print_all(library, reader);

    Ok(())
}

fn print_all(library: &Library, reader: &Reader) {
    for (id, _, _) in BOOKS {
        library.print_snapshot(reader, id);
    }
}

/// Fill a table with `count` keys, print it, then remove them all.
/// Returns whether the table ended up empty.
pub fn run_hash_table(bits: u32, count: i32) -> bool {
    let table = LockedHashTable::new(bits);
    for key in 0..count {
        table.add_item(key);
    }

    log::info!("hash table:");
    table.print_all_items();

    for key in 0..count {
        table.del_item(key);
    }

    let empty = table.is_empty();
    log::info!("hash table is empty: {empty}");
    empty
}
