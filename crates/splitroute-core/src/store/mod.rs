//! Persistent storage for the selection, the filter mode and the sort options.
//!
//! Everything is read once when a session starts and written back once at
//! teardown. Load failures never reach the session: they degrade to the
//! defaults (empty selection, [`FilterMode::AcceptAll`], label ascending with
//! system components hidden).

mod json;

pub use json::JsonStore;

use crate::Result;
use splitroute_types::{FilterMode, SortOptions};
use std::collections::BTreeSet;
use tracing::{debug, error};

pub trait PersistentStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if stored state exists but cannot be read.
    fn load_selection(&self) -> Result<BTreeSet<String>>;

    /// # Errors
    ///
    /// Returns an error if stored state exists but cannot be read.
    fn load_mode(&self) -> Result<FilterMode>;

    /// # Errors
    ///
    /// Returns an error if stored state exists but cannot be read.
    fn load_sort_options(&self) -> Result<SortOptions>;

    /// # Errors
    ///
    /// Returns an error if the selection cannot be written.
    fn save_selection(&self, selected: &BTreeSet<String>) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the mode cannot be written.
    fn save_mode(&self, mode: FilterMode) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the sort options cannot be written.
    fn save_sort_options(&self, options: SortOptions) -> Result<()>;
}

/// State read at session start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredState {
    pub selected: BTreeSet<String>,
    pub mode: FilterMode,
    pub sort: SortOptions,
}

impl StoredState {
    /// Load every piece independently, falling back to its default on error
    pub fn load(store: &dyn PersistentStore) -> Self {
        let selected = store.load_selection().unwrap_or_else(|e| {
            error!("Failed to load selection, starting empty: {e}");
            BTreeSet::new()
        });
        let mode = store.load_mode().unwrap_or_else(|e| {
            error!("Failed to load filter mode, using {}: {e}", FilterMode::default());
            FilterMode::default()
        });
        let sort = store.load_sort_options().unwrap_or_else(|e| {
            error!("Failed to load sort options, using defaults: {e}");
            SortOptions::default()
        });

        debug!(
            "Loaded state: {} selected, mode={mode}, sort={}",
            selected.len(),
            sort.key
        );
        Self {
            selected,
            mode,
            sort,
        }
    }
}
