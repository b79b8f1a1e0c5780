use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::router::{RouteMatch, RouteOutcome, Router};
use super::{LOGIN_KEY, Location};
use crate::events::{AppEvent, EventBus, NavigationTarget};
use crate::reactive::{Listeners, Subscription};
use crate::session::{AuthPhase, SessionStore};

/// Redirect hops followed before giving up on a location.
const MAX_REDIRECTS: usize = 4;

/// What the navigator currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<V> {
    /// Session is loading; `location` is re-evaluated once it settles.
    Interstitial { location: Location },
    Rendered { matched: RouteMatch, view: V },
}

impl<V> Resolution<V> {
    pub fn location(&self) -> &Location {
        match self {
            Resolution::Interstitial { location } => location,
            Resolution::Rendered { matched, .. } => &matched.location,
        }
    }

    pub fn view(&self) -> Option<&V> {
        match self {
            Resolution::Interstitial { .. } => None,
            Resolution::Rendered { view, .. } => Some(view),
        }
    }

    pub fn is_interstitial(&self) -> bool {
        matches!(self, Resolution::Interstitial { .. })
    }
}

struct NavState<V> {
    phase: AuthPhase,
    current: Arc<Resolution<V>>,
}

/// Holds the current location and keeps it consistent with the session.
///
/// Re-evaluates on every session change and follows navigation requests from
/// the event bus. Each resolution step (including redirect hops) publishes
/// [`AppEvent::RouteChanged`].
pub struct Navigator<V> {
    router: Router<V>,
    session: Arc<SessionStore>,
    bus: EventBus,
    state: Mutex<NavState<V>>,
    listeners: Listeners<Resolution<V>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl<V: Send + Sync + 'static> Navigator<V> {
    /// Creates a navigator at `initial` and wires it to the session and bus.
    pub fn attach(
        router: Router<V>,
        session: &Arc<SessionStore>,
        bus: &EventBus,
        initial: &str,
    ) -> Arc<Self> {
        let phase = session.state().phase();
        let (resolution, steps) = settle(&router, phase, Location::parse(initial));
        let current = Arc::new(resolution);

        let navigator = Arc::new(Self {
            router,
            session: Arc::clone(session),
            bus: bus.clone(),
            state: Mutex::new(NavState {
                phase,
                current: Arc::clone(&current),
            }),
            listeners: Listeners::new(),
            subscriptions: Mutex::new(Vec::new()),
        });

        let on_session = {
            let weak: Weak<Self> = Arc::downgrade(&navigator);
            session.subscribe(move |_| {
                if let Some(navigator) = weak.upgrade() {
                    navigator.refresh();
                }
            })
        };
        let on_event = {
            let weak: Weak<Self> = Arc::downgrade(&navigator);
            bus.subscribe(move |event| {
                if let AppEvent::NavigationRequested(target) = event
                    && let Some(navigator) = weak.upgrade()
                {
                    navigator.navigate_to(*target);
                }
            })
        };
        navigator
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([on_session, on_event]);

        navigator.announce(phase, &steps, &current);
        navigator
    }

    pub fn current(&self) -> Arc<Resolution<V>> {
        Arc::clone(&self.lock().current)
    }

    pub fn router(&self) -> &Router<V> {
        &self.router
    }

    /// Registers a callback invoked with every new resolution.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Resolution<V>) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Moves to `raw` (a fragment such as `#/plans/3`). Navigating to the
    /// current location under an unchanged auth phase is a no-op.
    pub fn navigate(&self, raw: &str) -> Arc<Resolution<V>> {
        self.evaluate(Location::parse(raw))
    }

    pub fn navigate_to(&self, target: NavigationTarget) -> Arc<Resolution<V>> {
        match target {
            NavigationTarget::Login => self.evaluate(Location::parse(LOGIN_KEY)),
            NavigationTarget::Home => self.evaluate(Location::parse(self.router.default_key())),
        }
    }

    /// Re-evaluates the current location against the current session.
    pub fn refresh(&self) -> Arc<Resolution<V>> {
        let location = self.current().location().clone();
        self.evaluate(location)
    }

    fn evaluate(&self, location: Location) -> Arc<Resolution<V>> {
        let phase = self.session.state().phase();

        let mut state = self.lock();
        if state.phase == phase && *state.current.location() == location {
            return Arc::clone(&state.current);
        }

        let (resolution, steps) = settle(&self.router, phase, location);
        let resolution = Arc::new(resolution);
        state.phase = phase;
        state.current = Arc::clone(&resolution);
        drop(state);

        self.announce(phase, &steps, &resolution);
        resolution
    }

    fn announce(&self, phase: AuthPhase, steps: &[String], resolution: &Resolution<V>) {
        for key in steps {
            self.bus.publish(&AppEvent::RouteChanged {
                key: key.clone(),
                phase,
            });
        }
        self.listeners.notify(resolution);
    }

    fn lock(&self) -> MutexGuard<'_, NavState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves `location`, following redirects. Returns the final resolution and
/// every key visited on the way.
fn settle<V>(router: &Router<V>, phase: AuthPhase, mut location: Location) -> (Resolution<V>, Vec<String>) {
    let mut steps = Vec::new();
    for _ in 0..MAX_REDIRECTS {
        steps.push(location.key().to_string());
        match router.resolve(phase, &location) {
            RouteOutcome::Interstitial => return (Resolution::Interstitial { location }, steps),
            RouteOutcome::Redirect(target) => {
                tracing::debug!(from = %location, to = %target, %phase, "redirect");
                location = target;
            }
            RouteOutcome::Render { matched, view } => {
                tracing::debug!(key = %matched.key, %phase, "route resolved");
                return (Resolution::Rendered { matched, view }, steps);
            }
        }
    }

    tracing::warn!(location = %location, %phase, "redirect loop; holding at interstitial");
    (Resolution::Interstitial { location }, steps)
}
