//! Route resolution guarded by authentication state.
//!
//! - `guard`: the (auth phase × location) transition table
//! - `router`: view registry with prefix matching for detail routes
//! - `navigator`: current location, re-evaluated on session changes

mod guard;
mod navigator;
mod router;

use std::fmt;

pub use guard::{GuardDecision, guard};
pub use navigator::{Navigator, Resolution};
pub use router::{RouteMatch, RouteOutcome, Router};

/// Route key of the login view.
pub const LOGIN_KEY: &str = "login";

/// A normalized location: path key plus query pairs.
///
/// Accepts fragments such as `#/plans/12?tab=shifts`, `/plans/12/` or
/// `plans/12`; all normalize to the key `plans/12`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: Vec<(String, String)>,
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let raw = raw.strip_prefix('#').unwrap_or(raw);
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (raw, None),
        };

        let path = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        let query = query
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self { path, query }
    }

    /// Normalized route key (query excluded).
    pub fn key(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|segment| !segment.is_empty())
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_login(&self) -> bool {
        self.path == LOGIN_KEY
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#/{}", self.path)?;
        if !self.query.is_empty() {
            let query: String = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_forms_normalize_to_same_key() {
        for raw in ["#/plans/12", "/plans/12/", "plans/12", "  #plans//12  "] {
            assert_eq!(Location::parse(raw).key(), "plans/12", "input: {raw:?}");
        }
    }

    #[test]
    fn test_query_is_split_off() {
        let location = Location::parse("#/login?next=%2Fplans&x=1");
        assert_eq!(location.key(), "login");
        assert!(location.is_login());
        assert_eq!(location.query_value("next"), Some("/plans"));
        assert_eq!(location.query_value("x"), Some("1"));
        assert_eq!(location.query_value("missing"), None);
    }

    #[test]
    fn test_login_detection_uses_normalized_key() {
        assert!(Location::parse("/login/").is_login());
        assert!(!Location::parse("login-help").is_login());
        assert!(!Location::parse("").is_login());
    }

    #[test]
    fn test_display_round_trips() {
        let location = Location::parse("plans/3?tab=a b");
        assert_eq!(location.to_string(), "#/plans/3?tab=a+b");
        assert_eq!(Location::parse(&location.to_string()), location);
    }
}
