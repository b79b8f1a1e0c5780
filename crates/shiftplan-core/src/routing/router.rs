use std::collections::BTreeMap;

use super::guard::{GuardDecision, guard};
use super::{LOGIN_KEY, Location};
use crate::session::AuthPhase;

type ViewFactory<V> = Box<dyn Fn(&RouteMatch) -> V + Send + Sync>;

/// A location matched against a registered route key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Registered key that matched (`plans` for `plans/12`).
    pub key: String,
    pub location: Location,
    /// Segments after the matched key.
    pub params: Vec<String>,
}

impl RouteMatch {
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// First parameter parsed as a numeric id.
    pub fn id(&self) -> Option<i64> {
        self.param(0)?.parse().ok()
    }
}

/// Result of resolving one location under one auth phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome<V> {
    Interstitial,
    Redirect(Location),
    Render { matched: RouteMatch, view: V },
}

/// Registry of view factories keyed by route key.
///
/// Dispatch picks the longest registered key that is a segment prefix of the
/// location, so `plans` also serves `plans/12`. Unknown keys render the
/// default route.
pub struct Router<V> {
    routes: BTreeMap<String, ViewFactory<V>>,
    default_key: String,
    default_factory: ViewFactory<V>,
}

impl<V> Router<V> {
    /// Creates a router whose fallback view is `default_key`.
    pub fn new<F>(default_key: impl Into<String>, default_factory: F) -> Self
    where
        F: Fn(&RouteMatch) -> V + Send + Sync + 'static,
    {
        Self {
            routes: BTreeMap::new(),
            default_key: Location::parse(&default_key.into()).key().to_string(),
            default_factory: Box::new(default_factory),
        }
    }

    /// Registers (or replaces) the factory for `key`.
    #[must_use]
    pub fn register<F>(mut self, key: &str, factory: F) -> Self
    where
        F: Fn(&RouteMatch) -> V + Send + Sync + 'static,
    {
        let key = Location::parse(key).key().to_string();
        if key == self.default_key {
            self.default_factory = Box::new(factory);
        } else {
            self.routes.insert(key, Box::new(factory));
        }
        self
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    pub fn is_registered(&self, key: &str) -> bool {
        let location = Location::parse(key);
        let key = location.key();
        key == self.default_key || self.routes.contains_key(key)
    }

    /// Applies the auth guard, then dispatches to a view when allowed.
    pub fn resolve(&self, phase: AuthPhase, location: &Location) -> RouteOutcome<V> {
        match guard(phase, location.is_login()) {
            GuardDecision::Interstitial => RouteOutcome::Interstitial,
            GuardDecision::RedirectToLogin => RouteOutcome::Redirect(Location::parse(LOGIN_KEY)),
            GuardDecision::RedirectToDefault => {
                RouteOutcome::Redirect(Location::parse(&self.default_key))
            }
            GuardDecision::Proceed => {
                let (matched, factory) = self.dispatch(location);
                let view = factory(&matched);
                RouteOutcome::Render { matched, view }
            }
        }
    }

    fn dispatch(&self, location: &Location) -> (RouteMatch, &ViewFactory<V>) {
        let segments: Vec<&str> = location.segments().collect();
        for len in (1..=segments.len()).rev() {
            let candidate = segments[..len].join("/");
            let factory = if candidate == self.default_key {
                Some(&self.default_factory)
            } else {
                self.routes.get(&candidate)
            };
            if let Some(factory) = factory {
                let matched = RouteMatch {
                    key: candidate,
                    location: location.clone(),
                    params: segments[len..].iter().map(|s| (*s).to_string()).collect(),
                };
                return (matched, factory);
            }
        }

        tracing::debug!(location = %location, default = %self.default_key, "unknown route; rendering default");
        let matched = RouteMatch {
            key: self.default_key.clone(),
            location: location.clone(),
            params: Vec::new(),
        };
        (matched, &self.default_factory)
    }
}
