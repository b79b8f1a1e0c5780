//! Typed application events.
//!
//! Replaces ad-hoc broadcast signals between components: the session store
//! asks for navigation, the navigator announces route changes and layout code
//! toggles chrome from them.

use std::fmt;

use crate::reactive::{Listeners, Subscription};
use crate::session::AuthPhase;

/// Where the session store wants the user to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    /// The login route.
    Login,
    /// The configured default authenticated route.
    Home,
}

/// Events published on the [`EventBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A session transition requires navigation.
    NavigationRequested(NavigationTarget),
    /// A location was resolved (including redirect steps).
    RouteChanged {
        /// Normalized route key that was resolved.
        key: String,
        /// Auth phase the resolution was made under.
        phase: AuthPhase,
    },
    /// The network layer ended the session after an unauthorized response.
    SessionExpired,
}

impl AppEvent {
    /// Whether layout chrome for a signed-in user should be shown.
    pub fn shows_authenticated_chrome(&self) -> Option<bool> {
        match self {
            AppEvent::RouteChanged { phase, .. } => Some(*phase == AuthPhase::Authenticated),
            _ => None,
        }
    }
}

impl fmt::Display for AppEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEvent::NavigationRequested(NavigationTarget::Login) => write!(f, "navigate:login"),
            AppEvent::NavigationRequested(NavigationTarget::Home) => write!(f, "navigate:home"),
            AppEvent::RouteChanged { key, phase } => write!(f, "route:{key} ({phase})"),
            AppEvent::SessionExpired => write!(f, "session:expired"),
        }
    }
}

/// Process-wide event bus. Cheap to clone; clones share listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Listeners<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: &AppEvent) {
        tracing::debug!(event = %event, "publish");
        self.listeners.notify(event);
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_clones_share_listeners() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _sub = {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |event| seen.lock().unwrap().push(event.clone()))
        };

        bus.clone().publish(&AppEvent::SessionExpired);
        assert_eq!(*seen.lock().unwrap(), vec![AppEvent::SessionExpired]);
    }

    #[test]
    fn test_route_changed_drives_chrome() {
        let signed_in = AppEvent::RouteChanged {
            key: "plans".into(),
            phase: AuthPhase::Authenticated,
        };
        let signed_out = AppEvent::RouteChanged {
            key: "login".into(),
            phase: AuthPhase::Anonymous,
        };
        assert_eq!(signed_in.shows_authenticated_chrome(), Some(true));
        assert_eq!(signed_out.shows_authenticated_chrome(), Some(false));
        assert_eq!(AppEvent::SessionExpired.shows_authenticated_chrome(), None);
    }
}
