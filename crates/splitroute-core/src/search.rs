//! Debounced search over the loaded candidate list.
//!
//! Keyword changes land in a `watch` slot holding one value, so a burst of
//! keystrokes collapses into the latest keyword. A single loop drains the
//! slot, filters the current list snapshot on the blocking pool, patches its
//! own result list and then sleeps for the configured interval before looking
//! at the slot again. Only one pass ever runs at a time; the sleep bounds how
//! often the list is refiltered.
//!
//! A selection change after the first pass re-emits the shown rows with their
//! new selected state and an empty patch. It does not refilter.

use crate::reconcile::{diff, row_states};
use crate::selection::SelectionSnapshot;
use splitroute_types::{CandidateApp, SessionUpdate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, warn};

/// Case-insensitive substring match on label or package id.
/// An empty keyword matches nothing.
#[must_use]
pub fn filter_apps(apps: &[CandidateApp], keyword: &str) -> Vec<CandidateApp> {
    if keyword.is_empty() {
        return Vec::new();
    }

    let needle = keyword.to_lowercase();
    apps.iter()
        .filter(|app| {
            app.label.to_lowercase().contains(&needle) || app.id.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// A running search view
pub struct SearchHandle {
    keyword: watch::Sender<String>,
    cancel: CancellationToken,
    task: JoinHandle<u64>,
    _guard: DropGuard,
}

impl SearchHandle {
    /// Start the search loop over `source`, emitting `SearchPatched` updates
    #[must_use]
    pub fn spawn(
        source: watch::Receiver<Arc<[CandidateApp]>>,
        selection: watch::Receiver<SelectionSnapshot>,
        interval: Duration,
        updates: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Self {
        let (keyword, keyword_rx) = watch::channel(String::new());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_search_loop(
            keyword_rx,
            source,
            selection,
            interval,
            updates,
            cancel.clone(),
        ));

        debug!("Search view opened (interval {}ms)", interval.as_millis());

        Self {
            keyword,
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    /// Replace the pending keyword. An undelivered earlier keyword is dropped.
    pub fn set_keyword(&self, keyword: &str) {
        self.keyword.send_replace(keyword.to_string());
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the loop, abandoning any pass in flight. Returns the number of
    /// filter passes the loop completed.
    pub async fn dismiss(self) -> u64 {
        self.cancel.cancel();
        match self.task.await {
            Ok(passes) => passes,
            Err(e) => {
                warn!("Search loop ended abnormally: {e}");
                0
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Keyword,
    Selection,
}

async fn run_search_loop(
    mut keyword_rx: watch::Receiver<String>,
    source: watch::Receiver<Arc<[CandidateApp]>>,
    mut selection: watch::Receiver<SelectionSnapshot>,
    interval: Duration,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    cancel: CancellationToken,
) -> u64 {
    let mut shown: Vec<CandidateApp> = Vec::new();
    let mut current = String::new();
    let mut passes = 0;

    loop {
        let wake = tokio::select! {
            () = cancel.cancelled() => break,
            changed = keyword_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                Wake::Keyword
            }
            changed = selection.changed(), if passes > 0 => {
                if changed.is_err() {
                    break;
                }
                Wake::Selection
            }
        };

        if wake == Wake::Selection {
            let rows = row_states(&shown, &selection.borrow_and_update());
            debug!("Search rows rebound for {current:?}");
            let refresh = SessionUpdate::SearchPatched {
                keyword: current.clone(),
                ops: Vec::new(),
                rows,
            };
            if updates.send(refresh).is_err() {
                break;
            }
            continue;
        }

        let keyword = keyword_rx.borrow_and_update().clone();
        let apps = source.borrow().clone();

        let filtered = {
            let keyword = keyword.clone();
            tokio::select! {
                () = cancel.cancelled() => break,
                result = tokio::task::spawn_blocking(move || filter_apps(&apps, &keyword)) => {
                    result.unwrap_or_else(|e| {
                        error!("Failed to filter apps: {e}");
                        Vec::new()
                    })
                }
            }
        };
        passes += 1;

        let ops = diff(&shown, &filtered);
        shown = filtered;
        current.clone_from(&keyword);
        let rows = row_states(&shown, &selection.borrow_and_update());
        debug!(
            "Search pass {passes} for {keyword:?}: {} matches, {} ops",
            rows.len(),
            ops.len()
        );

        if updates
            .send(SessionUpdate::SearchPatched { keyword, ops, rows })
            .is_err()
        {
            break;
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }

    debug!("Search view closed after {passes} passes");
    passes
}
