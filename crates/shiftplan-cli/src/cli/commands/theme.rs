//! Theme preference handlers.

use anyhow::Result;
use shiftplan_core::app::App;
use shiftplan_core::theme::Theme;

pub fn show(app: &App) -> Result<()> {
    println!("{}", app.theme().current());
    Ok(())
}

pub fn set(app: &App, theme: Theme) -> Result<()> {
    app.theme().set(theme)?;
    println!("Theme set to {theme}");
    Ok(())
}

pub fn toggle(app: &App) -> Result<()> {
    let theme = app.theme().toggle()?;
    println!("Theme set to {theme}");
    Ok(())
}
