//! Composition root: builds the client, stores and bus, and wires them.
//!
//! Wiring owned here:
//! - session becomes authenticated: the planning-period cache starts loading
//! - session becomes anonymous: the cache is invalidated

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tokio::runtime::Handle;

use crate::api::ApiClient;
use crate::config::Config;
use crate::events::EventBus;
use crate::periods::PlanningPeriodStore;
use crate::reactive::Subscription;
use crate::routing::{Navigator, Router};
use crate::session::{AuthPhase, SessionState, SessionStore};
use crate::storage::{DurableStore, FileStore};
use crate::theme::ThemeStore;

pub struct App {
    config: Config,
    client: Arc<ApiClient>,
    storage: Arc<dyn DurableStore>,
    bus: EventBus,
    session: Arc<SessionStore>,
    periods: Arc<PlanningPeriodStore>,
    theme: ThemeStore,
    _wiring: Subscription,
}

impl App {
    /// Builds the application around `storage`.
    ///
    /// # Errors
    /// Returns an error if the API URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: Config, storage: Arc<dyn DurableStore>) -> Result<Self> {
        let client = Arc::new(ApiClient::from_config(&config)?);
        let bus = EventBus::new();
        let session = SessionStore::new(Arc::clone(&client), Arc::clone(&storage), bus.clone())?;
        let periods = PlanningPeriodStore::new(Arc::clone(&client));
        let theme = ThemeStore::new(Arc::clone(&storage));
        let wiring = wire_period_cache(&session, &periods);

        tracing::debug!(api_url = client.base_url(), "app assembled");
        Ok(Self {
            config,
            client,
            storage,
            bus,
            session,
            periods,
            theme,
            _wiring: wiring,
        })
    }

    /// Builds the application with the state file under `SHIFTPLAN_HOME`.
    ///
    /// # Errors
    /// Same as [`App::new`].
    pub fn from_config(config: Config) -> Result<Self> {
        Self::new(config, Arc::new(FileStore::open_default()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn storage(&self) -> &Arc<dyn DurableStore> {
        &self.storage
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn periods(&self) -> &Arc<PlanningPeriodStore> {
        &self.periods
    }

    pub fn theme(&self) -> &ThemeStore {
        &self.theme
    }

    /// Restores the persisted session.
    pub async fn start(&self) -> Arc<SessionState> {
        self.session.init().await
    }

    /// Creates a navigator over `router` at `initial`.
    pub fn navigator<V: Send + Sync + 'static>(
        &self,
        router: Router<V>,
        initial: &str,
    ) -> Arc<Navigator<V>> {
        Navigator::attach(router, &self.session, &self.bus, initial)
    }
}

fn wire_period_cache(session: &Arc<SessionStore>, periods: &Arc<PlanningPeriodStore>) -> Subscription {
    let last_phase = Mutex::new(session.state().phase());
    let periods = Arc::clone(periods);

    session.subscribe(move |state| {
        let phase = state.phase();
        let previous = {
            let mut last = last_phase.lock().unwrap_or_else(PoisonError::into_inner);
            mem::replace(&mut *last, phase)
        };
        if previous == phase {
            return;
        }

        match phase {
            AuthPhase::Authenticated => preload(&periods),
            AuthPhase::Anonymous => periods.invalidate(),
            AuthPhase::Loading => {}
        }
    })
}

fn preload(periods: &Arc<PlanningPeriodStore>) {
    let Ok(handle) = Handle::try_current() else {
        tracing::debug!("no runtime; planning periods load on first use");
        return;
    };
    let periods = Arc::clone(periods);
    handle.spawn(async move {
        if let Err(err) = periods.ensure_loaded().await {
            tracing::warn!(error = %err, "planning period preload failed");
        }
    });
}
