//! Plan command handlers.

use anyhow::{Context, Result};
use shiftplan_core::app::App;

use crate::cli::output;

pub async fn list(app: &App, period: Option<i64>) -> Result<()> {
    super::require_session(app).await?;

    let period = match period {
        Some(id) => Some(id),
        None => app.periods().ensure_loaded().await?.active_id,
    };
    let plans = app.client().list_plans(period).await?;

    if plans.is_empty() {
        println!("No plans found.");
    } else {
        println!("{}", output::plans_table(&plans));
    }
    Ok(())
}

pub async fn show(app: &App, id: i64) -> Result<()> {
    super::require_session(app).await?;
    let plan = app
        .client()
        .get_plan(id)
        .await
        .with_context(|| format!("load plan {id}"))?;
    output::print_plan(&plan);
    Ok(())
}

pub async fn delete(app: &App, id: i64) -> Result<()> {
    super::require_session(app).await?;
    app.client()
        .delete_plan(id)
        .await
        .with_context(|| format!("delete plan {id}"))?;
    println!("Deleted plan {id}");
    Ok(())
}
