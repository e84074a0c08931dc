//! Selection store: the set of selected package identifiers and the filter mode.
//!
//! The store is owned by the session worker and only mutated there. Every
//! mutation publishes an immutable snapshot on a `watch` channel so readers
//! on other tasks (the search loop, the visible counter) never observe a
//! half-applied bulk operation.

use splitroute_types::FilterMode;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;

/// Read-only view of the selection shared with other tasks
pub type SelectionSnapshot = Arc<BTreeSet<String>>;

pub struct SelectionStore {
    selected: BTreeSet<String>,
    mode: FilterMode,
    snapshots: watch::Sender<SelectionSnapshot>,
}

impl SelectionStore {
    #[must_use]
    pub fn new(selected: BTreeSet<String>, mode: FilterMode) -> Self {
        let (snapshots, _) = watch::channel(Arc::new(selected.clone()));
        Self {
            selected,
            mode,
            snapshots,
        }
    }

    /// Subscribe to selection changes. The receiver starts at the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SelectionSnapshot> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }

    /// Whether selection editing is enabled under the current mode
    #[must_use]
    pub fn can_select(&self) -> bool {
        self.mode.can_select()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Number of selected ids among `ids`. Selected packages that are no
    /// longer listed stay in the set but are not counted.
    #[must_use]
    pub fn count_within<'a, I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().filter(|id| self.selected.contains(*id)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> &BTreeSet<String> {
        &self.selected
    }

    /// Current selection as a shareable snapshot
    #[must_use]
    pub fn snapshot(&self) -> SelectionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Flip membership of `id`. Returns the new membership.
    pub fn toggle(&mut self, id: &str) -> bool {
        let selected = if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        };
        self.publish();
        selected
    }

    /// Select exactly `ids`
    pub fn select_all<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replace(ids);
    }

    pub fn select_none(&mut self) {
        self.selected.clear();
        self.publish();
    }

    /// Select every id in `ids` that is not currently selected.
    /// Selected ids outside `ids` are dropped.
    pub fn select_invert<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inverted: BTreeSet<String> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| !self.selected.contains(id))
            .collect();
        self.selected = inverted;
        self.publish();
    }

    /// Replace the selection wholesale
    pub fn replace<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected = ids.into_iter().map(Into::into).collect();
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(Arc::new(self.selected.clone()));
    }
}
