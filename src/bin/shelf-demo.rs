#[cfg(not(feature = "loom"))]
use std::time::Duration;

#[cfg(not(feature = "loom"))]
use rcu_shelf::{Library, RetireMode, ShelfError, demo};

// loom primitives only work inside a loom model.
#[cfg(feature = "loom")]
fn main() {
    eprintln!("shelf-demo is not available with the loom feature");
}

#[cfg(not(feature = "loom"))]
fn main() -> Result<(), ShelfError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let library = Library::builder()
        .background_reclaim(Duration::from_millis(10))
        .build()?;
    let reader = library.register_reader();

    demo::run_script(&library, &reader, RetireMode::Synchronous)?;
    demo::run_script(&library, &reader, RetireMode::Deferred)?;

    let reclaimed = library.barrier();
    let stats = library.reclaim_stats();
    log::info!(
        "barrier reclaimed {reclaimed}; {} reclaimed in total over {} grace periods",
        stats.reclaimed,
        stats.grace_periods
    );

    demo::run_hash_table(2, 1000);
    Ok(())
}
