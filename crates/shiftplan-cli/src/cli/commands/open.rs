//! `open`: resolves a location through the navigator and shows its screen.

use anyhow::{Result, bail};
use shiftplan_core::app::App;
use shiftplan_core::routing::{LOGIN_KEY, Location, RouteMatch, Router};

/// Registered route keys besides the login route.
const ROUTES: [&str; 5] = ["plans", "settings", "admin", "maintenance", "backup"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Plans,
    Plan(i64),
    Settings,
    Admin,
    Maintenance,
    Backup,
}

fn screen_for(matched: &RouteMatch) -> Screen {
    match matched.key.as_str() {
        LOGIN_KEY => Screen::Login,
        "settings" => Screen::Settings,
        "admin" => Screen::Admin,
        "maintenance" => Screen::Maintenance,
        "backup" => Screen::Backup,
        _ => matched.id().map_or(Screen::Plans, Screen::Plan),
    }
}

pub fn router(default_route: &str) -> Router<Screen> {
    ROUTES
        .iter()
        .fold(Router::new(default_route, screen_for), |router, key| {
            router.register(key, screen_for)
        })
        .register(LOGIN_KEY, screen_for)
}

pub async fn run(app: &App, location: Option<&str>) -> Result<()> {
    app.start().await;

    let requested = Location::parse(location.unwrap_or(&app.config().default_route));
    tracing::debug!(location = %requested, "opening");
    let navigator = app.navigator(router(&app.config().default_route), &requested.to_string());
    let resolution = navigator.current();
    let Some(screen) = resolution.view().copied() else {
        bail!("Session is still loading");
    };
    if resolution.location().key() != requested.key() {
        eprintln!("Redirected to {}", resolution.location());
    }

    render(app, screen).await
}

async fn render(app: &App, screen: Screen) -> Result<()> {
    match screen {
        Screen::Login => {
            println!("Not logged in. Run `shiftplan login --identifier <ID>`.");
            Ok(())
        }
        Screen::Plans => super::plans::list(app, None).await,
        Screen::Plan(id) => super::plans::show(app, id).await,
        Screen::Settings => {
            println!("API URL:       {}", app.client().base_url());
            println!("Default route: {}", app.config().default_route);
            println!("Theme:         {}", app.theme().current());
            Ok(())
        }
        Screen::Admin => super::users::list(app).await,
        Screen::Maintenance | Screen::Backup => {
            let title = if screen == Screen::Maintenance { "Maintenance" } else { "Backup" };
            println!("{title} is only available in the web client.");
            Ok(())
        }
    }
}
