//! The session worker.
//!
//! One task owns the selection, the display list and the search view, and
//! drains requests one at a time. Builds and filters run on the blocking pool
//! and are awaited, so nothing the worker owns is ever touched concurrently.
//! Teardown runs when the request channel closes, even after a panic in a
//! handler; dropping an unfinished session still persists the selection.

use crate::builder::build_list;
use crate::clipboard::{Clipboard, export_text, parse_import};
use crate::config::Config;
use crate::coordinator::{
    FinalState, RestartPolicy, ServiceControl, SessionState, TeardownReport, persist, teardown,
};
use crate::provider::CandidateProvider;
use crate::reconcile::DisplayList;
use crate::search::SearchHandle;
use crate::selection::SelectionStore;
use crate::store::{PersistentStore, StoredState};
use futures_util::FutureExt;
use splitroute_types::{Request, SessionUpdate, SortOptions};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const REQUEST_QUEUE_CAPACITY: usize = 64;

/// Tunables for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Host application, never listed
    pub host_package: Option<String>,
    pub search_interval: Duration,
    pub restart: RestartPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            host_package: None,
            search_interval: Duration::from_millis(200),
            restart: RestartPolicy::default(),
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            host_package: config.host_package.clone(),
            search_interval: config.search_interval(),
            restart: config.restart_policy(),
        }
    }
}

/// Collaborators a session talks to
pub struct Collaborators<V> {
    pub provider: Arc<dyn CandidateProvider>,
    pub store: Arc<dyn PersistentStore>,
    pub clipboard: Arc<dyn Clipboard>,
    pub service: V,
}

pub struct Session<V: ServiceControl> {
    provider: Arc<dyn CandidateProvider>,
    store: Arc<dyn PersistentStore>,
    clipboard: Arc<dyn Clipboard>,
    service: V,
    options: SessionOptions,

    selection: SelectionStore,
    display: DisplayList,
    sort: SortOptions,
    original: SessionState,
    search: Option<SearchHandle>,

    updates: mpsc::UnboundedSender<SessionUpdate>,
    finished: bool,
}

impl<V: ServiceControl> Session<V> {
    /// Create a session from the stored state. Returns the session and the
    /// receiver for everything it wants the UI to show.
    pub fn new(
        collaborators: Collaborators<V>,
        options: SessionOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SessionUpdate>) {
        let stored = StoredState::load(collaborators.store.as_ref());
        let (updates, updates_rx) = mpsc::unbounded_channel();

        info!(
            "Session started: {} selected, mode={}",
            stored.selected.len(),
            stored.mode
        );

        let session = Self {
            provider: collaborators.provider,
            store: collaborators.store,
            clipboard: collaborators.clipboard,
            service: collaborators.service,
            options,
            original: SessionState::new(stored.selected.clone(), stored.mode),
            selection: SelectionStore::new(stored.selected, stored.mode),
            display: DisplayList::new(),
            sort: stored.sort,
            search: None,
            updates,
            finished: false,
        };
        (session, updates_rx)
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    #[must_use]
    pub fn display(&self) -> &DisplayList {
        &self.display
    }

    #[must_use]
    pub fn sort_options(&self) -> SortOptions {
        self.sort
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.search.is_some()
    }

    /// Reload, drain `requests` until every sender is gone, then tear down
    pub async fn run(mut self, mut requests: mpsc::Receiver<Request>) -> TeardownReport {
        let drained = AssertUnwindSafe(async {
            self.handle(Request::Reload).await;
            while let Some(request) = requests.recv().await {
                self.handle(request).await;
            }
        })
        .catch_unwind()
        .await;

        if drained.is_err() {
            error!("Session request loop panicked, tearing down");
        }
        self.finish().await
    }

    /// Run the session on its own task
    pub fn spawn(self) -> (mpsc::Sender<Request>, JoinHandle<TeardownReport>)
    where
        V: 'static,
    {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let task = tokio::spawn(self.run(rx));
        (tx, task)
    }

    /// Handle one request. Selection edits are dropped while the mode
    /// disables selection.
    pub async fn handle(&mut self, request: Request) {
        if request.edits_selection() && !self.selection.can_select() {
            debug!(
                "Ignoring {request:?} while mode is {}",
                self.selection.mode()
            );
            return;
        }

        match request {
            Request::Reload => self.reload().await,
            Request::SelectAll => {
                let ids: Vec<String> = self.display.ids().map(ToString::to_string).collect();
                self.selection.select_all(ids);
                self.rebind();
            }
            Request::SelectNone => {
                self.selection.select_none();
                self.rebind();
            }
            Request::SelectInvert => {
                self.selection.select_invert(self.display.ids());
                self.rebind();
            }
            Request::Import => self.import(),
            Request::Export => self.export(),
            Request::ChangeMode { mode } => {
                debug!("Filter mode {} -> {mode}", self.selection.mode());
                self.selection.set_mode(mode);
                self.send_count();
            }
            Request::ToggleItem { id } => self.toggle(&id),
            Request::SearchKeyword { keyword } => self.search(&keyword),
            Request::DismissSearch => self.dismiss_search().await,
            Request::SetSortKey { key } => {
                self.sort.key = key;
                self.reload().await;
            }
            Request::SetReverse { reverse } => {
                self.sort.reverse = reverse;
                self.reload().await;
            }
            Request::SetIncludeSystem { include } => {
                self.sort.include_system = include;
                self.reload().await;
            }
        }
    }

    /// Persist, restart the service if needed and mark the session finished
    pub async fn finish(mut self) -> TeardownReport {
        if let Some(search) = self.search.take() {
            search.dismiss().await;
        }

        let state = self.final_state();
        let report = AssertUnwindSafe(teardown(
            &self.original,
            state,
            Arc::clone(&self.store),
            &self.service,
            &self.options.restart,
        ))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            error!("Teardown panicked");
            TeardownReport::default()
        });
        self.finished = true;

        info!(
            "Session finished: changed={}, persisted={}, restarted={}",
            report.changed, report.persisted, report.restarted
        );
        report
    }

    async fn reload(&mut self) {
        let provider = Arc::clone(&self.provider);
        let host = self.options.host_package.clone();
        let selected = self.selection.snapshot();
        let sort = self.sort;

        let apps = match tokio::task::spawn_blocking(move || {
            build_list(provider.as_ref(), host.as_deref(), &selected, sort)
        })
        .await
        {
            Ok(apps) => apps,
            Err(e) => {
                error!("Failed to build candidate list: {e}");
                return;
            }
        };

        let ops = self.display.patch(apps);
        self.emit(SessionUpdate::ListPatched {
            ops,
            apps: self.display.apps().to_vec(),
        });
        self.send_count();
    }

    fn toggle(&mut self, id: &str) {
        let Some(index) = self.display.position(id) else {
            debug!("Ignoring toggle of unlisted package {id}");
            return;
        };

        let selected = self.selection.toggle(id);
        self.emit(SessionUpdate::RowToggled {
            index,
            id: id.to_string(),
            selected,
        });
        self.send_count();
    }

    fn import(&mut self) {
        match self.clipboard.read() {
            Ok(Some(text)) if !text.is_empty() => {
                let imported = parse_import(&text, self.display.ids());
                debug!("Imported {} packages from clipboard", imported.len());
                self.selection.replace(imported);
            }
            Ok(_) => debug!("Clipboard is empty, selection unchanged"),
            Err(e) => {
                error!("Failed to import from clipboard: {e}");
                return;
            }
        }
        self.rebind();
    }

    fn export(&mut self) {
        let text = export_text(self.selection.ids());
        match self.clipboard.write(&text) {
            Ok(()) => {
                debug!("Exported {} packages to clipboard", self.selection.len());
                self.emit(SessionUpdate::Exported {
                    count: self.selection.len(),
                });
            }
            Err(e) => error!("Failed to export to clipboard: {e}"),
        }
    }

    fn search(&mut self, keyword: &str) {
        let search = self.search.get_or_insert_with(|| {
            SearchHandle::spawn(
                self.display.subscribe(),
                self.selection.subscribe(),
                self.options.search_interval,
                self.updates.clone(),
            )
        });
        search.set_keyword(keyword);
    }

    async fn dismiss_search(&mut self) {
        let Some(search) = self.search.take() else {
            return;
        };
        let passes = search.dismiss().await;
        debug!("Search dismissed after {passes} filter passes");
        self.emit(SessionUpdate::SearchClosed);
        self.rebind();
    }

    /// Refresh every row's selection state without touching the order.
    /// Selected rows are not moved up until the next reload.
    fn rebind(&mut self) {
        let rows = self.display.rebind(self.selection.ids());
        self.emit(SessionUpdate::RowsRebound { rows });
        self.send_count();
    }

    /// Publish the visible counter: selected packages that are currently listed
    fn send_count(&self) {
        self.emit(SessionUpdate::SelectedCount {
            count: self.selection.count_within(self.display.ids()),
            can_select: self.selection.can_select(),
        });
    }

    fn emit(&self, update: SessionUpdate) {
        // The UI may already be gone during shutdown
        let _ = self.updates.send(update);
    }

    fn final_state(&self) -> FinalState {
        FinalState {
            selected: self.selection.ids().clone(),
            mode: self.selection.mode(),
            sort: self.sort,
        }
    }
}

impl<V: ServiceControl> Drop for Session<V> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Session dropped before teardown, saving state without restart");
        persist(self.store.as_ref(), &self.final_state());
    }
}
