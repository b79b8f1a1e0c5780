//! User administration.

use anyhow::{Result, bail};
use shiftplan_core::api::NewUser;
use shiftplan_core::app::App;

use crate::cli::output;

async fn require_admin(app: &App) -> Result<()> {
    let state = super::require_session(app).await?;
    if !state.profile.as_ref().is_some_and(|p| p.is_admin) {
        bail!("Administrator access required");
    }
    Ok(())
}

pub async fn list(app: &App) -> Result<()> {
    require_admin(app).await?;
    let users = app.client().list_users().await?;
    if users.is_empty() {
        println!("No users found.");
    } else {
        println!("{}", output::users_table(&users));
    }
    Ok(())
}

pub async fn create(
    app: &App,
    identifier: String,
    secret: String,
    display_name: String,
    is_admin: bool,
) -> Result<()> {
    require_admin(app).await?;
    let user = app
        .client()
        .create_user(&NewUser {
            identifier,
            secret,
            display_name,
            is_admin,
        })
        .await?;
    println!("Created user {} (id {})", user.identifier, user.id);
    Ok(())
}
