//! Named subsets of the tracked set.
//!
//! A lens is a user-curated view over the tracked files: when one is
//! active, the chat context narrows to only its members. Lens entries are
//! snapshots — the token count is copied from the tracked set at add time
//! and never updated afterwards, even if the file is re-tracked at a
//! different size or removed from the tracked set entirely.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ContextError;

/// The literal `switch` argument that deactivates the current lens.
pub const NO_LENS: &str = "none";

/// Collection of named lenses plus the optional active lens.
///
/// Invariant: `active`, when set, names a key present in `lenses`. The
/// mutating methods uphold this; [`LensCollection::from_parts`] enforces it
/// on untrusted (persisted) input.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LensCollection {
    lenses: IndexMap<String, IndexMap<String, usize>>,
    active: Option<String>,
}

impl LensCollection {
    /// Rebuild a collection from persisted parts, dropping an active-lens
    /// name that no longer resolves to an existing lens.
    pub fn from_parts(
        lenses: IndexMap<String, IndexMap<String, usize>>,
        active: Option<String>,
    ) -> Self {
        let active = match active {
            Some(name) if lenses.contains_key(&name) => Some(name),
            Some(name) => {
                warn!("persisted active lens '{name}' no longer exists, clearing");
                None
            }
            None => None,
        };
        Self { lenses, active }
    }

    /// Clone out the persisted parts (lens mappings, active name).
    pub fn to_parts(&self) -> (IndexMap<String, IndexMap<String, usize>>, Option<String>) {
        (self.lenses.clone(), self.active.clone())
    }

    /// Create an empty lens and make it the active one.
    pub fn create(&mut self, name: &str) -> Result<(), ContextError> {
        if self.lenses.contains_key(name) {
            return Err(ContextError::LensExists { name: name.into() });
        }
        self.lenses.insert(name.to_string(), IndexMap::new());
        self.active = Some(name.to_string());
        Ok(())
    }

    /// Switch the active lens. The literal name [`NO_LENS`] always succeeds
    /// and clears the active lens.
    pub fn switch(&mut self, name: &str) -> Result<(), ContextError> {
        if name == NO_LENS {
            self.active = None;
            return Ok(());
        }
        if !self.lenses.contains_key(name) {
            return Err(ContextError::LensNotFound { name: name.into() });
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    /// Add a file with its snapshot token count to the active lens.
    ///
    /// The caller is responsible for checking that `path` is currently
    /// tracked; this method only requires an active lens.
    pub fn add_file(&mut self, path: &str, tokens: usize) -> Result<String, ContextError> {
        let name = self.active.clone().ok_or(ContextError::NoActiveLens)?;
        if let Some(lens) = self.lenses.get_mut(&name) {
            lens.insert(path.to_string(), tokens);
        }
        Ok(name)
    }

    /// Remove a file from the active lens. Fails with the same message
    /// whether there is no active lens or the path is not a member.
    pub fn remove_file(&mut self, path: &str) -> Result<String, ContextError> {
        let not_in_lens = || ContextError::NotInLens {
            path: path.to_string(),
        };
        let name = self.active.clone().ok_or_else(not_in_lens)?;
        let lens = self.lenses.get_mut(&name).ok_or_else(not_in_lens)?;
        if lens.shift_remove(path).is_none() {
            return Err(not_in_lens());
        }
        Ok(name)
    }

    /// Membership and snapshot counts of a named lens.
    pub fn files(&self, name: &str) -> Result<&IndexMap<String, usize>, ContextError> {
        self.lenses
            .get(name)
            .ok_or(ContextError::LensNotFound { name: name.into() })
    }

    /// Membership of the active lens, or `None` when no lens is active.
    pub fn active_files(&self) -> Option<&IndexMap<String, usize>> {
        self.active.as_ref().and_then(|name| self.lenses.get(name))
    }

    /// Name of the active lens.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Lens names in creation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lenses.keys().map(String::as_str)
    }
}
