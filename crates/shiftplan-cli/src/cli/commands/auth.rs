//! Login, logout and identity.

use anyhow::{Context, Result, bail};
use shiftplan_core::app::App;
use shiftplan_core::storage::CREDENTIAL_KEY;

pub async fn login(app: &App, identifier: &str, secret: Option<String>) -> Result<()> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        bail!("Missing secret: pass --secret or set SHIFTPLAN_SECRET");
    };

    app.start().await;
    let state = app.session().login(identifier, &secret).await?;

    match &state.profile {
        Some(profile) => println!("Logged in as {}", profile.display_name),
        None => println!("Logged in"),
    }
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    let had_credential = app
        .storage()
        .get(CREDENTIAL_KEY)
        .context("read stored credential")?
        .is_some();

    app.session().logout();

    if had_credential {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub async fn whoami(app: &App) -> Result<()> {
    let state = super::require_session(app).await?;
    if let Some(profile) = &state.profile {
        let role = if profile.is_admin { "administrator" } else { "user" };
        println!("{} (id {}, {role})", profile.display_name, profile.id);
    }
    Ok(())
}
