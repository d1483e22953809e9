//! `postdash` - Terminal dashboard for Postal delivery statistics
//!
//! Reads from the statistics backend through the cached query layer in
//! `postdash-core` and prints each view as text.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod render;

use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Result, bail};
use postdash_core::{
    Config, Dashboard, Error, KeyringTokenStorage, LoginForm, MemoryPeriodStorage, ServerForm,
    SessionState,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Command, Invocation};

/// Environment variable holding the sign-in password.
const PASSWORD_VAR: &str = "POSTDASH_PASSWORD";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postdash=info,postdash_core=info,postdash_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<()> {
    let invocation = cli::parse(args)?;
    if invocation.command == Command::Help {
        print!("{}", cli::USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    debug!(?config, "Loaded configuration");
    let dashboard = open_dashboard(config, &invocation)?;

    if invocation.command.needs_session() && dashboard.session().restore() == SessionState::Anonymous {
        bail!("Not signed in, run `postdash login <email>` first");
    }

    let result = execute(&dashboard, &invocation).await;
    if let Err(e) = &result
        && let Some(err) = e.downcast_ref::<Error>()
        && dashboard.handle_error(err)
    {
        eprintln!("Session ended, sign in again");
    }
    result
}

/// A `--period` flag applies to this run only and leaves the saved period alone.
fn open_dashboard(config: Config, invocation: &Invocation) -> Result<Dashboard> {
    let dashboard = match invocation.period {
        Some(period) => Dashboard::new(
            config,
            Arc::new(KeyringTokenStorage::new()),
            Arc::new(MemoryPeriodStorage::with_value(period.as_str())),
        )?,
        None => Dashboard::from_config(config)?,
    };
    Ok(dashboard)
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_VAR) {
        return Ok(password);
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn execute(dashboard: &Dashboard, invocation: &Invocation) -> Result<()> {
    let queries = dashboard.queries();

    match &invocation.command {
        Command::Help => print!("{}", cli::USAGE),
        Command::Login { email } => {
            let password = read_password()?;
            let identity = dashboard.login(&LoginForm::new(email.as_str(), password)).await?;
            print!("Signed in as {}", render::identity(&identity));
        }
        Command::Logout => {
            dashboard.session().restore();
            dashboard.session().logout().await;
            println!("Signed out");
        }
        Command::Whoami => {
            let identity = dashboard.session().confirm().await.map_err(Error::from)?;
            print!("{}", render::identity(&identity));
        }
        Command::Servers => {
            let mut view = dashboard.server_list_view();
            view.settle().await;
            print!("{}", render::view_state(view.state(), |s| render::servers(s)));
            fail_on_error(view.state().error.as_ref())?;
        }
        Command::Stats(id) => {
            let mut view = dashboard.server_detail_view(id.clone());
            view.settle().await;
            print!("{}", render::view_state(view.server(), render::server));
            println!();
            print!("{}", render::view_state(view.stats(), render::stat_cards));
            println!();
            print!("{}", render::view_state(view.bounces(), render::breakdown));
            fail_on_error(view.error())?;
        }
        Command::Domains(id) => {
            let mut view = dashboard.domain_listing(id.clone(), invocation.page, &invocation.search);
            view.settle().await;
            print!("{}", render::view_state(view.state(), render::domain_page));
            print_pager(view.pager(), &view.page_range());
            fail_on_error(view.state().error.as_ref())?;
        }
        Command::Emails(id) => {
            let mut view = dashboard.email_listing(id.clone(), invocation.page, &invocation.search);
            view.settle().await;
            print!("{}", render::view_state(view.state(), render::email_page));
            print_pager(view.pager(), &view.page_range());
            fail_on_error(view.state().error.as_ref())?;
        }
        Command::Opens(id) => {
            let period = dashboard.period().period();
            let report = queries.opens(id, period).await.map_err(Error::from)?;
            println!("{}", period.label());
            print!("{}", render::opens(&report));
        }
        Command::Period(None) => print!("{}", render::periods(dashboard.period().period())),
        Command::Period(Some(value)) => {
            if !dashboard.period().set_period_str(value) {
                bail!("unknown period {value}, expected today, yesterday, 7d, 14d or 30d");
            }
            print!("{}", render::periods(dashboard.period().period()));
        }
        Command::Toggle(id) => {
            let server = dashboard.toggle_server(id).await?;
            println!("{} is now {}", server.name, server.status.display_name());
        }
        Command::Test(id) => {
            if dashboard.test_connection(id).await?.connection_successful {
                println!("Connection successful");
            } else {
                bail!("Connection failed");
            }
        }
        Command::Delete(id) => {
            dashboard.delete_server(id).await?;
            println!("Deleted server {id}");
        }
        Command::Add => {
            let mut form = ServerForm::new();
            invocation.fields.apply(&mut form);
            let server = dashboard.add_server(&form).await?;
            print!("Added {}", render::server(&server));
        }
        Command::Edit(id) => {
            let current = queries.server(id).await.map_err(Error::from)?;
            let mut form = ServerForm::from_server(&current);
            invocation.fields.apply(&mut form);
            let server = dashboard.edit_server(id, &form).await?;
            print!("Updated {}", render::server(&server));
        }
        Command::Export(id) => {
            let path = dashboard.export_bounced_emails(id).await?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn print_pager(pager: &postdash_core::Pager, items: &[postdash_core::PageItem]) {
    if pager.total_pages().is_some_and(|total| total > 1) {
        print!(
            "{}",
            render::pagination(pager.page(), items, pager.can_prev(), pager.can_next())
        );
    }
}

/// Turns an error shown in a view into the command's failure.
fn fail_on_error(error: Option<&postdash_core::QueryError>) -> Result<()> {
    match error {
        Some(err) => Err(Error::from(Arc::clone(err)).into()),
        None => Ok(()),
    }
}
