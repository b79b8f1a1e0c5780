//! Planning-period listing.

use anyhow::Result;
use shiftplan_core::app::App;

use crate::cli::output;

pub async fn list(app: &App, select: Option<i64>) -> Result<()> {
    super::require_session(app).await?;

    // Joins the load started when the session was restored.
    let mut snapshot = app.periods().ensure_loaded().await?;
    if let Some(id) = select {
        snapshot = app.periods().set_active(Some(id))?;
    }

    if snapshot.is_empty() {
        println!("No planning periods.");
    } else {
        println!("{}", output::periods_table(&snapshot.periods, snapshot.active_id));
    }
    Ok(())
}
