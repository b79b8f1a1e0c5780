//! Visual theme preference persisted in durable storage.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::storage::{DurableStore, THEME_KEY};

/// Selected visual theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => bail!("Unknown theme \"{other}\" (expected light or dark)"),
        }
    }
}

/// Reads and writes the theme key.
#[derive(Clone)]
pub struct ThemeStore {
    storage: Arc<dyn DurableStore>,
}

impl ThemeStore {
    pub fn new(storage: Arc<dyn DurableStore>) -> Self {
        Self { storage }
    }

    /// Current theme. Unknown or unreadable values fall back to the default.
    pub fn current(&self) -> Theme {
        match self.storage.get(THEME_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|_| {
                tracing::debug!(value = %raw, "ignoring unknown stored theme");
                Theme::default()
            }),
            Ok(None) => Theme::default(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read theme preference");
                Theme::default()
            }
        }
    }

    /// # Errors
    /// Returns an error if the preference cannot be persisted.
    pub fn set(&self, theme: Theme) -> Result<()> {
        self.storage.set(THEME_KEY, theme.as_str())
    }

    /// Flips between light and dark, returning the new theme.
    ///
    /// # Errors
    /// Returns an error if the preference cannot be persisted.
    pub fn toggle(&self) -> Result<Theme> {
        let next = self.current().toggled();
        self.set(next)?;
        Ok(next)
    }
}
