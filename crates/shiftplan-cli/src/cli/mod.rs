//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use shiftplan_core::app::App;
use shiftplan_core::config;
use shiftplan_core::events::AppEvent;
use shiftplan_core::theme::Theme;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "SHIFTPLAN_LOG";

#[derive(Parser)]
#[command(name = "shiftplan")]
#[command(version)]
#[command(about = "Terminal client for the shiftplan scheduling backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in and store the access token
    Login {
        /// Account identifier
        #[arg(long, value_name = "ID")]
        identifier: String,
        /// Account secret
        #[arg(long, env = "SHIFTPLAN_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },
    /// Log out (clear the stored access token)
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Resolve a location (e.g. `#/plans/3`) and show its screen
    Open {
        /// Location to open (default route if omitted)
        #[arg(value_name = "LOCATION")]
        location: Option<String>,
    },
    /// List planning periods
    Periods {
        /// Mark this period as active in the listing
        #[arg(long, value_name = "ID")]
        select: Option<i64>,
    },
    /// Manage plans
    Plans {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Manage users (administrators only)
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Show or change the color theme
    Theme {
        #[command(subcommand)]
        command: Option<ThemeCommands>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum PlanCommands {
    /// List plans (of the active planning period by default)
    List {
        /// Planning period to list
        #[arg(long, value_name = "ID")]
        period: Option<i64>,
    },
    /// Show a plan
    Show {
        #[arg(value_name = "PLAN_ID")]
        id: i64,
    },
    /// Delete a plan
    Delete {
        #[arg(value_name = "PLAN_ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum UserCommands {
    /// List users
    List,
    /// Create a user
    Create {
        #[arg(long)]
        identifier: String,
        #[arg(long)]
        secret: String,
        #[arg(long)]
        display_name: String,
        /// Grant administrator rights
        #[arg(long)]
        admin: bool,
    },
}

#[derive(clap::Subcommand)]
enum ThemeCommands {
    /// Show the current theme
    Show,
    /// Set the theme
    Set {
        #[arg(value_name = "THEME")]
        theme: Theme,
    },
    /// Switch between light and dark
    Toggle,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("shiftplan=debug,shiftplan_core=debug,warn")
        } else {
            EnvFilter::new("warn")
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { identifier, secret } => {
            commands::auth::login(&connect()?, &identifier, secret).await
        }
        Commands::Logout => commands::auth::logout(&connect()?),
        Commands::Whoami => commands::auth::whoami(&connect()?).await,
        Commands::Open { location } => commands::open::run(&connect()?, location.as_deref()).await,
        Commands::Periods { select } => commands::periods::list(&connect()?, select).await,
        Commands::Plans { command } => {
            let app = connect()?;
            match command {
                PlanCommands::List { period } => commands::plans::list(&app, period).await,
                PlanCommands::Show { id } => commands::plans::show(&app, id).await,
                PlanCommands::Delete { id } => commands::plans::delete(&app, id).await,
            }
        }
        Commands::Users { command } => {
            let app = connect()?;
            match command {
                UserCommands::List => commands::users::list(&app).await,
                UserCommands::Create {
                    identifier,
                    secret,
                    display_name,
                    admin,
                } => commands::users::create(&app, identifier, secret, display_name, admin).await,
            }
        }
        Commands::Theme { command } => {
            let app = connect()?;
            match command.unwrap_or(ThemeCommands::Show) {
                ThemeCommands::Show => commands::theme::show(&app),
                ThemeCommands::Set { theme } => commands::theme::set(&app, theme),
                ThemeCommands::Toggle => commands::theme::toggle(&app),
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}

/// Loads config and assembles the client. Also reports forced logouts: the
/// backend may end the session in the middle of any command.
fn connect() -> Result<App> {
    let config = config::Config::load().context("load config")?;
    let app = App::from_config(config).context("start client")?;
    app.bus()
        .subscribe(|event| {
            if *event == AppEvent::SessionExpired {
                eprintln!("Session expired. Run `shiftplan login`.");
            }
        })
        .detach();
    Ok(app)
}
