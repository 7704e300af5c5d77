use thiserror::Error;

/// Errors returned by [`Library`](crate::Library) operations.
///
/// None of them leave the library in a partially updated state.
#[derive(Debug, Error)]
pub enum ShelfError {
    /// No live book has this id.
    #[error("book {id} does not exist")]
    NotFound { id: i32 },

    /// The book is already in the requested state.
    #[error("book {id} is already {}", state_name(.borrowed))]
    AlreadyInState { id: i32, borrowed: bool },

    /// Live plus not-yet-reclaimed books reached the configured capacity.
    #[error("capacity of {capacity} books reached ({live} live, {pending} awaiting reclamation)")]
    ResourceExhausted {
        capacity: usize,
        live: usize,
        pending: usize,
    },

    /// The background reclamation thread could not be started.
    #[error("failed to spawn background reclaimer")]
    Spawn(#[from] std::io::Error),
}

fn state_name(borrowed: &bool) -> &'static str {
    if *borrowed { "borrowed" } else { "returned" }
}

pub type Result<T, E = ShelfError> = std::result::Result<T, E>;
