//! Per-row busy flags for actions that share one executor.
//!
//! A single executor's `in_flight` flag cannot tell which row started a
//! request, so the view tracks `(action, item)` pairs separately. The flag
//! is raised before the operation starts and lowered by a drop guard, so it
//! comes down on success, on an error value, on panic, and when the
//! tracking future is dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

/// Row actions that are tracked individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Put,
    Patch,
    Delete,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Put, Action::Patch, Action::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Put => "put",
            Action::Patch => "patch",
            Action::Delete => "delete",
        }
    }
}

pub type BusyState = HashMap<Action, HashMap<u64, bool>>;

/// Shared `action -> item -> busy` map. Clones share the same map.
#[derive(Debug, Clone)]
pub struct BusyMap {
    state: Arc<watch::Sender<BusyState>>,
}

impl Default for BusyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl BusyMap {
    pub fn new() -> Self {
        let initial = Action::ALL
            .into_iter()
            .map(|action| (action, HashMap::new()))
            .collect();
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
        }
    }

    /// Run `operation` with `(action, item_id)` marked busy for its duration.
    ///
    /// The operation's output is returned untouched; errors it carries are
    /// not interpreted here.
    pub async fn run_tracked<F, Fut, T>(&self, action: Action, item_id: u64, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _busy = self.mark(action, item_id);
        operation().await
    }

    pub fn is_busy(&self, action: Action, item_id: u64) -> bool {
        self.state
            .borrow()
            .get(&action)
            .and_then(|items| items.get(&item_id))
            .copied()
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> BusyState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BusyState> {
        self.state.subscribe()
    }

    fn set(&self, action: Action, item_id: u64, busy: bool) {
        trace!(action = action.as_str(), item_id, busy, "busy flag");
        self.state.send_modify(|state| {
            state.entry(action).or_default().insert(item_id, busy);
        });
    }

    fn mark(&self, action: Action, item_id: u64) -> Busy<'_> {
        self.set(action, item_id, true);
        Busy {
            map: self,
            action,
            item_id,
        }
    }
}

struct Busy<'a> {
    map: &'a BusyMap,
    action: Action,
    item_id: u64,
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.map.set(self.action, self.item_id, false);
    }
}
