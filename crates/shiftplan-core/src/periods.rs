//! Planning-period store: the cached list of periods and the active one.
//!
//! Loads lazily and keeps at most one fetch in flight: concurrent
//! `ensure_loaded` callers share the same future. `invalidate` bumps an epoch
//! so a fetch that started under a previous session cannot write its result.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use crate::api::{ApiClient, ApiError, ApiResult, PlanningPeriod};
use crate::reactive::{Listeners, Subscription};

/// Immutable read of the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub periods: Vec<PlanningPeriod>,
    pub active_id: Option<i64>,
}

impl SelectionSnapshot {
    /// Builds a snapshot, keeping `preferred` active if it is still listed and
    /// otherwise defaulting to the first period.
    pub fn new(periods: Vec<PlanningPeriod>, preferred: Option<i64>) -> Self {
        let active_id = preferred
            .filter(|id| periods.iter().any(|p| p.id == *id))
            .or_else(|| periods.first().map(|p| p.id));
        Self { periods, active_id }
    }

    pub fn active(&self) -> Option<&PlanningPeriod> {
        let id = self.active_id?;
        self.periods.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.periods.iter().any(|p| p.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Rejected selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    /// The id is not among the loaded periods.
    UnknownPeriod(i64),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::UnknownPeriod(id) => write!(f, "Unknown planning period {id}"),
        }
    }
}

impl std::error::Error for SelectionError {}

type LoadFuture = Shared<BoxFuture<'static, ApiResult<Arc<SelectionSnapshot>>>>;

struct Inner {
    snapshot: Arc<SelectionSnapshot>,
    loaded: bool,
    in_flight: Option<LoadFuture>,
    epoch: u64,
    version: u64,
}

/// Reactive cache of planning periods.
pub struct PlanningPeriodStore {
    client: Arc<ApiClient>,
    inner: Mutex<Inner>,
    listeners: Listeners<SelectionSnapshot>,
}

impl PlanningPeriodStore {
    pub fn new(client: Arc<ApiClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            inner: Mutex::new(Inner {
                snapshot: Arc::new(SelectionSnapshot::default()),
                loaded: false,
                in_flight: None,
                epoch: 0,
                version: 0,
            }),
            listeners: Listeners::new(),
        })
    }

    pub fn snapshot(&self) -> Arc<SelectionSnapshot> {
        Arc::clone(&self.lock().snapshot)
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    pub fn is_loading(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SelectionSnapshot) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Loads the periods unless they are cached or already loading.
    ///
    /// # Errors
    /// Returns the fetch failure (shared by all concurrent callers), or
    /// `Superseded` if the cache was invalidated while the fetch was running.
    pub async fn ensure_loaded(self: &Arc<Self>) -> ApiResult<Arc<SelectionSnapshot>> {
        let load = {
            let mut inner = self.lock();
            if inner.loaded {
                return Ok(Arc::clone(&inner.snapshot));
            }
            match &inner.in_flight {
                Some(load) => load.clone(),
                None => {
                    let store = Arc::clone(self);
                    let epoch = inner.epoch;
                    tracing::debug!(epoch, "loading planning periods");
                    let load = async move { store.fetch(epoch).await }.boxed().shared();
                    inner.in_flight = Some(load.clone());
                    load
                }
            }
        };
        load.await
    }

    /// Manual refresh: refetches even if cached, joining any fetch in flight.
    ///
    /// # Errors
    /// Same as [`ensure_loaded`](Self::ensure_loaded).
    pub async fn reload(self: &Arc<Self>) -> ApiResult<Arc<SelectionSnapshot>> {
        self.lock().loaded = false;
        self.ensure_loaded().await
    }

    /// Changes the active period. `None` restores the default selection.
    ///
    /// # Errors
    /// Returns [`SelectionError::UnknownPeriod`] if `id` is not loaded; the
    /// snapshot is left untouched.
    pub fn set_active(&self, id: Option<i64>) -> Result<Arc<SelectionSnapshot>, SelectionError> {
        let inner = self.lock();
        if let Some(id) = id
            && !inner.snapshot.contains(id)
        {
            tracing::debug!(id, "rejecting unknown planning period");
            return Err(SelectionError::UnknownPeriod(id));
        }

        let next = SelectionSnapshot::new(inner.snapshot.periods.clone(), id);
        Ok(self.replace_snapshot(inner, next))
    }

    /// Drops cached data and detaches any in-flight fetch.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.loaded = false;
        inner.in_flight = None;
        tracing::debug!(epoch = inner.epoch, "planning periods invalidated");
        self.replace_snapshot(inner, SelectionSnapshot::default());
    }

    async fn fetch(self: Arc<Self>, epoch: u64) -> ApiResult<Arc<SelectionSnapshot>> {
        let result = self.client.list_planning_periods().await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            tracing::debug!(epoch, "discarding planning periods from an invalidated load");
            return Err(ApiError::superseded());
        }
        inner.in_flight = None;

        match result {
            Ok(periods) => {
                tracing::info!(count = periods.len(), "planning periods loaded");
                inner.loaded = true;
                let next = SelectionSnapshot::new(periods, inner.snapshot.active_id);
                Ok(self.replace_snapshot(inner, next))
            }
            Err(err) => {
                tracing::warn!(kind = %err.kind, error = %err, "planning periods load failed");
                Err(err)
            }
        }
    }

    /// Swaps in `next`, releases the lock, then notifies on change. A
    /// notification overtaken by a newer snapshot from another thread is
    /// dropped.
    fn replace_snapshot(
        &self,
        mut inner: MutexGuard<'_, Inner>,
        next: SelectionSnapshot,
    ) -> Arc<SelectionSnapshot> {
        if *inner.snapshot == next {
            return Arc::clone(&inner.snapshot);
        }
        let snapshot = Arc::new(next);
        inner.snapshot = Arc::clone(&snapshot);
        inner.version += 1;
        let version = inner.version;
        drop(inner);
        self.listeners.notify_versioned(version, &snapshot);
        snapshot
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
