//! Tracked-file context management: the budgeted file set, lenses, and
//! persistence.
//!
//! The context sent with every chat turn is assembled from a mutable set of
//! tracked files. This module provides the pieces:
//!
//! 1. **[`store`]** — [`TrackedContextStore`], the owner of the tracked set
//!    and its running token total. Enforces the global [`TOKEN_LIMIT`] by
//!    rejecting any addition that would cross it, and builds the context
//!    string prepended to outbound requests.
//!
//! 2. **[`lens`]** — [`LensCollection`], named subsets of the tracked set.
//!    When a lens is active, the context narrows to only its members.
//!
//! 3. **[`persist`]** — [`PersistedState`], the JSON snapshot rewritten in
//!    full after every mutation and reloaded at startup.
//!
//! All operations are synchronous and single-threaded; the store is owned
//! exclusively by one session and never shared.

pub mod lens;
pub mod persist;
pub mod store;

pub use lens::LensCollection;
pub use persist::PersistedState;
pub use store::{TrackOutcome, TrackedContextStore};

use std::path::PathBuf;

/// Maximum tokens the tracked set may hold in total.
pub const TOKEN_LIMIT: usize = 100_000;

/// Default per-file ceiling applied during directory tracking.
pub const PER_FILE_TOKEN_LIMIT: usize = 20_000;

/// Filename of the persisted snapshot, relative to the working directory.
pub const STATE_FILENAME: &str = ".lenschat-tracking.json";

/// Failures of tracked-context operations.
///
/// Every variant is a user-facing message: the REPL prints it and the
/// failed operation is a no-op on store state. Only [`ContextError::Io`]
/// signals an unexpected condition (a file vanishing between track time
/// and read time, an unwritable snapshot) and may abort the current turn.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("File {path} does not exist.")]
    FileNotFound { path: String },

    #[error("Directory {path} does not exist.")]
    DirectoryNotFound { path: String },

    #[error("File {path} is not being tracked.")]
    NotTracked { path: String },

    #[error("Adding {path} would exceed the token limit. Not added.")]
    BudgetExceeded { path: String, tokens: usize },

    #[error("Lens '{name}' already exists.")]
    LensExists { name: String },

    #[error("Lens '{name}' does not exist.")]
    LensNotFound { name: String },

    #[error("No active lens. Please switch to or create a lens first.")]
    NoActiveLens,

    #[error("File {path} is not part of the active lens.")]
    NotInLens { path: String },

    #[error("Error processing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
