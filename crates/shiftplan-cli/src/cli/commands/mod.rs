//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod open;
pub mod periods;
pub mod plans;
pub mod theme;
pub mod users;

use std::sync::Arc;

use anyhow::{Result, bail};
use shiftplan_core::app::App;
use shiftplan_core::session::SessionState;

/// Restores the session and fails unless it is authenticated.
async fn require_session(app: &App) -> Result<Arc<SessionState>> {
    let state = app.start().await;
    if !state.is_authenticated() {
        bail!("Not logged in. Run `shiftplan login --identifier <ID>`.");
    }
    Ok(state)
}
