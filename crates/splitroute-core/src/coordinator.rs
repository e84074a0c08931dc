//! Session teardown: persist the final state and restart the tunnel service
//! when the access-control state actually changed.
//!
//! Teardown never fails. Every store and service error is logged and the
//! sequence moves on; the restart wait is bounded by [`RestartPolicy`] and
//! exhausting it means "start anyway".

use crate::Result;
use crate::store::PersistentStore;
use splitroute_types::{FilterMode, SortOptions};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The external tunnel service, seen as a black box
pub trait ServiceControl: Send + Sync {
    fn is_active(&self) -> impl Future<Output = Result<bool>> + Send;

    fn stop(&self) -> impl Future<Output = Result<()>> + Send;

    fn start(&self) -> impl Future<Output = Result<()>> + Send;
}

impl<S: ServiceControl> ServiceControl for Arc<S> {
    async fn is_active(&self) -> Result<bool> {
        self.as_ref().is_active().await
    }

    async fn stop(&self) -> Result<()> {
        self.as_ref().stop().await
    }

    async fn start(&self) -> Result<()> {
        self.as_ref().start().await
    }
}

/// Bounds on the stop/poll/start sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Pause between two status polls after stop
    pub poll_interval: Duration,
    /// Status polls before giving up and starting anyway
    pub max_polls: u32,
    /// Ceiling on any single service call
    pub call_timeout: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            max_polls: 50,
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Selection and mode captured when the session started. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub original_selection: BTreeSet<String>,
    pub original_mode: FilterMode,
}

impl SessionState {
    #[must_use]
    pub fn new(original_selection: BTreeSet<String>, original_mode: FilterMode) -> Self {
        Self {
            original_selection,
            original_mode,
        }
    }

    #[must_use]
    pub fn is_changed(&self, selected: &BTreeSet<String>, mode: FilterMode) -> bool {
        *selected != self.original_selection || mode != self.original_mode
    }
}

/// Final in-memory state handed to teardown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalState {
    pub selected: BTreeSet<String>,
    pub mode: FilterMode,
    pub sort: SortOptions,
}

/// What teardown did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub changed: bool,
    pub persisted: bool,
    /// A start request succeeded after a stop
    pub restarted: bool,
    /// Status polls issued while waiting for the service to stop
    pub polls: u32,
}

/// Write the final state. Each write is attempted even if an earlier one
/// failed. Returns whether all of them succeeded.
pub fn persist(store: &dyn PersistentStore, state: &FinalState) -> bool {
    let mut ok = true;

    if let Err(e) = store.save_selection(&state.selected) {
        error!("Failed to save selection: {e}");
        ok = false;
    }
    if let Err(e) = store.save_mode(state.mode) {
        error!("Failed to save filter mode: {e}");
        ok = false;
    }
    if let Err(e) = store.save_sort_options(state.sort) {
        error!("Failed to save sort options: {e}");
        ok = false;
    }

    if ok {
        debug!(
            "Persisted {} selected packages, mode={}",
            state.selected.len(),
            state.mode
        );
    }
    ok
}

/// Persist, then restart the service if the state changed and it is active
pub async fn teardown<V: ServiceControl>(
    original: &SessionState,
    state: FinalState,
    store: Arc<dyn PersistentStore>,
    service: &V,
    policy: &RestartPolicy,
) -> TeardownReport {
    let changed = original.is_changed(&state.selected, state.mode);

    let persisted = match tokio::task::spawn_blocking(move || persist(store.as_ref(), &state)).await
    {
        Ok(persisted) => persisted,
        Err(e) => {
            error!("Persist task failed: {e}");
            false
        }
    };

    let mut report = TeardownReport {
        changed,
        persisted,
        ..TeardownReport::default()
    };

    if !changed {
        debug!("Access-control state unchanged, leaving service alone");
        return report;
    }

    match call(policy, "status", service.is_active()).await {
        Some(true) => {}
        Some(false) => {
            debug!("Service inactive, no restart needed");
            return report;
        }
        None => return report,
    }

    info!("Access-control state changed, restarting service");
    call(policy, "stop", service.stop()).await;

    let mut stopped = false;
    while report.polls < policy.max_polls {
        report.polls += 1;
        if call(policy, "status", service.is_active()).await == Some(false) {
            stopped = true;
            break;
        }
        if report.polls < policy.max_polls {
            tokio::time::sleep(policy.poll_interval).await;
        }
    }
    if !stopped {
        warn!(
            "Service still reported active after {} polls, starting anyway",
            report.polls
        );
    }

    report.restarted = call(policy, "start", service.start()).await.is_some();
    if report.restarted {
        info!("Service restarted after {} status polls", report.polls);
    }
    report
}

async fn call<T>(
    policy: &RestartPolicy,
    what: &str,
    request: impl Future<Output = Result<T>>,
) -> Option<T> {
    match tokio::time::timeout(policy.call_timeout, request).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("Service {what} failed: {e}");
            None
        }
        Err(_) => {
            warn!(
                "Service {what} timed out after {}ms",
                policy.call_timeout.as_millis()
            );
            None
        }
    }
}
