//! The tracked-context store: a budget-constrained set of files whose
//! contents are prepended to every chat turn.
//!
//! Token counts are cached at track time and only invalidated by removal or
//! re-tracking; file *contents* are never cached — context assembly reads
//! from disk at call time, so an edited file contributes its current text.
//! All mutations enforce the global [`TOKEN_LIMIT`](super::TOKEN_LIMIT) by
//! rejecting the whole operation, and rewrite the persisted snapshot before
//! returning when persistence is enabled.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use super::lens::LensCollection;
use super::persist::PersistedState;
use super::{ContextError, STATE_FILENAME, TOKEN_LIMIT};
use crate::tokens::TokenCounter;

/// Per-file result of a directory walk.
///
/// The walk never aborts on a per-file condition; each file produces one
/// outcome and the caller reports them.
#[derive(Debug)]
pub enum TrackOutcome {
    /// File tracked; `tokens` counts against the global budget.
    Tracked { path: String, tokens: usize },
    /// File skipped: its own token count exceeds the per-file limit.
    TooLarge {
        path: String,
        tokens: usize,
        limit: usize,
    },
    /// File skipped: tracking it would cross the global budget.
    OverBudget { path: String },
    /// File skipped: it could not be read.
    Unreadable { path: String, error: String },
}

/// Owner of the tracked set, its token total, and the lens collection.
///
/// Constructed with an explicit working directory; relative paths given by
/// the user resolve against it, and the user-supplied string is the map
/// key. The process's current directory is never consulted or changed.
pub struct TrackedContextStore {
    counter: Box<dyn TokenCounter>,
    workdir: PathBuf,
    /// `Some` when persistence is enabled.
    persist_path: Option<PathBuf>,
    tracked: IndexMap<String, usize>,
    total_tokens: usize,
    lenses: LensCollection,
}

impl TrackedContextStore {
    /// Create a store rooted at `workdir`. With `persist` set, an existing
    /// snapshot in the working directory is loaded (a missing file means
    /// empty state) and every subsequent mutation rewrites it.
    pub fn new(
        counter: Box<dyn TokenCounter>,
        workdir: impl Into<PathBuf>,
        persist: bool,
    ) -> Result<Self, ContextError> {
        let workdir = workdir.into();
        let persist_path = persist.then(|| workdir.join(STATE_FILENAME));

        let mut store = Self {
            counter,
            workdir,
            persist_path,
            tracked: IndexMap::new(),
            total_tokens: 0,
            lenses: LensCollection::default(),
        };

        if let Some(path) = store.persist_path.clone()
            && let Some(state) = PersistedState::load(&path)?
        {
            // The stored aggregate is never trusted; recompute the total
            // from the loaded counts.
            store.total_tokens = state.total_tokens();
            store.tracked = state.tracked_files;
            store.lenses = LensCollection::from_parts(state.lenses, state.active_lens);
            debug!(
                "loaded {} tracked file(s), {} lens(es) from {}",
                store.tracked.len(),
                store.lenses.names().count(),
                path.display()
            );
        }

        Ok(store)
    }

    // ── Tracking ───────────────────────────────────────────────────

    /// Track a file, caching its token count.
    ///
    /// Re-tracking an already-tracked path replaces its entry; the budget
    /// check uses the adjusted total so the sum invariant holds. A file
    /// that would push the total past the limit is rejected whole and the
    /// store is left untouched.
    pub fn track(&mut self, path: &str) -> Result<usize, ContextError> {
        let resolved = self.resolve(path);
        if !resolved.is_file() {
            return Err(ContextError::FileNotFound { path: path.into() });
        }
        let content = fs::read_to_string(&resolved).map_err(|source| ContextError::Io {
            path: resolved.clone(),
            source,
        })?;
        let tokens = self.counter.count(&content);

        let previous = self.tracked.get(path).copied().unwrap_or(0);
        let new_total = self.total_tokens - previous + tokens;
        if new_total > TOKEN_LIMIT {
            return Err(ContextError::BudgetExceeded {
                path: path.into(),
                tokens,
            });
        }

        self.tracked.insert(path.to_string(), tokens);
        self.total_tokens = new_total;
        self.persist()?;
        Ok(tokens)
    }

    /// Track every regular file under `dir`, recursively.
    ///
    /// Dot-prefixed directories and files are skipped at every level, and
    /// symlinked directories are never descended (a symlink cycle would
    /// otherwise re-track the same files once per traversal level). A
    /// file whose own count exceeds `per_file_limit` is skipped with a
    /// reason; a file rejected by the *global* budget is likewise reported
    /// and the walk continues, as it does for unreadable files and
    /// unlistable subdirectories. Entries are visited in sorted name
    /// order.
    pub fn track_directory(
        &mut self,
        dir: &str,
        per_file_limit: usize,
    ) -> Result<Vec<TrackOutcome>, ContextError> {
        let resolved = self.resolve(dir);
        if !resolved.is_dir() {
            return Err(ContextError::DirectoryNotFound { path: dir.into() });
        }
        let mut outcomes = Vec::new();
        self.walk(Path::new(dir), &resolved, per_file_limit, &mut outcomes);
        Ok(outcomes)
    }

    fn walk(
        &mut self,
        display_dir: &Path,
        resolved_dir: &Path,
        per_file_limit: usize,
        outcomes: &mut Vec<TrackOutcome>,
    ) {
        let reader = match fs::read_dir(resolved_dir) {
            Ok(reader) => reader,
            // An unlistable subdirectory is one failure outcome; outcomes
            // already collected stay reportable.
            Err(e) => {
                outcomes.push(TrackOutcome::Unreadable {
                    path: display_dir.to_string_lossy().to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };
        let mut entries: Vec<_> = reader.filter_map(Result::ok).collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let resolved = entry.path();
            let display = display_dir.join(&name);

            // Recurse only into real directories. file_type() does not
            // follow symlinks, so a symlinked directory falls through to
            // the file checks below and is skipped there.
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    outcomes.push(TrackOutcome::Unreadable {
                        path: display.to_string_lossy().to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            if file_type.is_dir() {
                self.walk(&display, &resolved, per_file_limit, outcomes);
                continue;
            }
            // Symlinks to regular files are tracked like the file itself;
            // symlinks to directories (and other specials) are not.
            if !resolved.is_file() {
                continue;
            }

            let path = display.to_string_lossy().to_string();
            let content = match fs::read_to_string(&resolved) {
                Ok(content) => content,
                Err(e) => {
                    outcomes.push(TrackOutcome::Unreadable {
                        path,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let tokens = self.counter.count(&content);
            if tokens > per_file_limit {
                outcomes.push(TrackOutcome::TooLarge {
                    path,
                    tokens,
                    limit: per_file_limit,
                });
                continue;
            }

            outcomes.push(match self.track(&path) {
                Ok(tokens) => TrackOutcome::Tracked { path, tokens },
                Err(ContextError::BudgetExceeded { .. }) => TrackOutcome::OverBudget { path },
                Err(e) => TrackOutcome::Unreadable {
                    path,
                    error: e.to_string(),
                },
            });
        }
    }

    /// Stop tracking a file, releasing its cached count from the total.
    pub fn remove(&mut self, path: &str) -> Result<usize, ContextError> {
        match self.tracked.shift_remove(path) {
            Some(tokens) => {
                self.total_tokens -= tokens;
                self.persist()?;
                Ok(tokens)
            }
            None => Err(ContextError::NotTracked { path: path.into() }),
        }
    }

    /// Remove every tracked file whose absolute path starts with the
    /// absolute form of `dir`. Returns the number removed (0 is a no-op).
    ///
    /// The comparison is a plain string prefix, not segment-aware: `/a/b`
    /// also matches a sibling `/a/bc`.
    pub fn remove_directory(&mut self, dir: &str) -> Result<usize, ContextError> {
        let prefix = self.absolute(dir).to_string_lossy().to_string();

        let doomed: Vec<String> = self
            .tracked
            .keys()
            .filter(|path| {
                self.absolute(path)
                    .to_string_lossy()
                    .starts_with(&prefix)
            })
            .cloned()
            .collect();

        if doomed.is_empty() {
            return Ok(0);
        }
        for path in &doomed {
            if let Some(tokens) = self.tracked.shift_remove(path) {
                self.total_tokens -= tokens;
            }
        }
        self.persist()?;
        Ok(doomed.len())
    }

    /// Empty the tracked set. Lenses are untouched.
    pub fn clear(&mut self) -> Result<(), ContextError> {
        self.tracked.clear();
        self.total_tokens = 0;
        self.persist()
    }

    // ── Inspection ─────────────────────────────────────────────────

    /// Tracked files and cached counts, in tracking order.
    pub fn files(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tracked.iter().map(|(path, tokens)| (path.as_str(), *tokens))
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn remaining_budget(&self) -> usize {
        TOKEN_LIMIT - self.total_tokens
    }

    // ── Lenses ─────────────────────────────────────────────────────

    /// Create an empty lens and make it active.
    pub fn create_lens(&mut self, name: &str) -> Result<(), ContextError> {
        self.lenses.create(name)?;
        self.persist()
    }

    /// Switch the active lens; the literal name `"none"` clears it.
    pub fn switch_lens(&mut self, name: &str) -> Result<(), ContextError> {
        self.lenses.switch(name)?;
        self.persist()
    }

    /// Copy a tracked file's cached count into the active lens.
    /// Returns the lens name.
    pub fn add_file_to_lens(&mut self, path: &str) -> Result<String, ContextError> {
        if self.lenses.active().is_none() {
            return Err(ContextError::NoActiveLens);
        }
        let tokens = *self
            .tracked
            .get(path)
            .ok_or_else(|| ContextError::NotTracked { path: path.into() })?;
        let name = self.lenses.add_file(path, tokens)?;
        self.persist()?;
        Ok(name)
    }

    /// Remove a file from the active lens. Returns the lens name.
    pub fn remove_file_from_lens(&mut self, path: &str) -> Result<String, ContextError> {
        let name = self.lenses.remove_file(path)?;
        self.persist()?;
        Ok(name)
    }

    /// Membership and snapshot counts of a named lens.
    pub fn lens_files(&self, name: &str) -> Result<&IndexMap<String, usize>, ContextError> {
        self.lenses.files(name)
    }

    pub fn lens_names(&self) -> impl Iterator<Item = &str> {
        self.lenses.names()
    }

    pub fn active_lens(&self) -> Option<&str> {
        self.lenses.active()
    }

    // ── Context assembly ───────────────────────────────────────────

    /// Build the context string prepended to outbound chat requests.
    ///
    /// Members come from the active lens when one is set, else from the
    /// full tracked set. Contents are read fresh from disk, so a tracked
    /// file modified since track time contributes its current text — and
    /// one deleted since then surfaces as an I/O error that aborts the
    /// turn.
    pub fn current_context(&self) -> Result<String, ContextError> {
        let members = match self.lenses.active_files() {
            Some(files) => files,
            None => &self.tracked,
        };

        let mut context = String::from("Tracked file context:\n\n");
        for path in members.keys() {
            let resolved = self.resolve(path);
            let content = fs::read_to_string(&resolved).map_err(|source| ContextError::Io {
                path: resolved.clone(),
                source,
            })?;
            context.push_str(&format!("File: {path}\n\n```\n{content}```\n\n"));
        }
        Ok(context)
    }

    // ── Internals ──────────────────────────────────────────────────

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.workdir.join(p)
        }
    }

    fn absolute(&self, path: &str) -> PathBuf {
        let resolved = self.resolve(path);
        std::path::absolute(&resolved).unwrap_or(resolved)
    }

    fn snapshot(&self) -> PersistedState {
        let (lenses, active_lens) = self.lenses.to_parts();
        PersistedState {
            tracked_files: self.tracked.clone(),
            lenses,
            active_lens,
        }
    }

    fn persist(&self) -> Result<(), ContextError> {
        if let Some(path) = &self.persist_path {
            self.snapshot().save(path)?;
        }
        Ok(())
    }
}
