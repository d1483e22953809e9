//! Command-line parsing.

use anyhow::{Context, Result, anyhow, bail};
use postdash_api::{ReportingPeriod, ServerId};
use postdash_core::ServerForm;

pub const USAGE: &str = "\
Usage: postdash <command> [options]

Commands:
  login <email>        Sign in (password from POSTDASH_PASSWORD or stdin)
  logout               Sign out
  whoami               Show the signed-in operator
  servers              List servers
  stats <id>           Delivery statistics and bounce breakdown
  domains <id>         Bounced domains
  emails <id>          Bounced addresses
  opens <id>           Open statistics
  period [value]       Show or set the reporting period
  toggle <id>          Enable or disable a server
  test <id>            Test a server's database connection
  delete <id>          Delete a server
  add                  Add a server
  edit <id>            Edit a server
  export <id>          Export bounced addresses as CSV

Options:
  --period <p>         today, yesterday, 7d, 14d or 30d
  --page <n>           Listing page (default 1)
  --search <term>      Listing filter
  --name, --host, --port, --database, --username, --password <value>
  --inactive           Create or leave the server disabled
  -h, --help           Show this help
";

/// A parsed subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String },
    Logout,
    Whoami,
    Servers,
    Stats(ServerId),
    Domains(ServerId),
    Emails(ServerId),
    Opens(ServerId),
    Period(Option<String>),
    Toggle(ServerId),
    Test(ServerId),
    Delete(ServerId),
    Add,
    Edit(ServerId),
    Export(ServerId),
    Help,
}

impl Command {
    /// Returns true if the command needs a stored session.
    pub const fn needs_session(&self) -> bool {
        !matches!(self, Self::Login { .. } | Self::Period(_) | Self::Help | Self::Logout)
    }
}

/// Server form fields given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerFields {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub inactive: bool,
}

impl ServerFields {
    /// Overwrites the form fields that were given.
    pub fn apply(&self, form: &mut ServerForm) {
        let fields = [
            (&self.name, &mut form.name),
            (&self.host, &mut form.host),
            (&self.port, &mut form.port),
            (&self.database, &mut form.database),
            (&self.username, &mut form.username),
            (&self.password, &mut form.password),
        ];
        for (given, target) in fields {
            if let Some(value) = given {
                target.clone_from(value);
            }
        }
        if self.inactive {
            form.is_active = false;
        }
    }
}

/// Everything given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub period: Option<ReportingPeriod>,
    pub page: u32,
    pub search: String,
    pub fields: ServerFields,
}

fn server_id(positional: &[String], command: &str) -> Result<ServerId> {
    positional
        .first()
        .map(|id| ServerId::new(id.as_str()))
        .ok_or_else(|| anyhow!("{command} requires a server id"))
}

/// Parses arguments, excluding the program name.
pub fn parse(args: &[String]) -> Result<Invocation> {
    let mut period = None;
    let mut page = 1;
    let mut search = String::new();
    let mut fields = ServerFields::default();
    let mut positional = Vec::new();
    let mut help = false;

    let mut i = 0usize;
    while i < args.len() {
        let arg = args[i].as_str();
        let mut value = |flag: &str| -> Result<String> {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| anyhow!("{flag} requires a value"))
        };
        match arg {
            "-h" | "--help" => help = true,
            "--period" => {
                let raw = value("--period")?;
                period = Some(
                    raw.parse::<ReportingPeriod>()
                        .context("--period must be today, yesterday, 7d, 14d or 30d")?,
                );
            }
            "--page" => {
                page = value("--page")?
                    .parse::<u32>()
                    .ok()
                    .filter(|p| *p > 0)
                    .ok_or_else(|| anyhow!("--page must be a positive integer"))?;
            }
            "--search" => search = value("--search")?,
            "--name" => fields.name = Some(value("--name")?),
            "--host" => fields.host = Some(value("--host")?),
            "--port" => fields.port = Some(value("--port")?),
            "--database" => fields.database = Some(value("--database")?),
            "--username" => fields.username = Some(value("--username")?),
            "--password" => fields.password = Some(value("--password")?),
            "--inactive" => fields.inactive = true,
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            _ => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let command = if help || positional.is_empty() {
        Command::Help
    } else {
        let name = positional.remove(0);
        match name.as_str() {
            "login" => Command::Login {
                email: positional
                    .first()
                    .cloned()
                    .ok_or_else(|| anyhow!("login requires an email address"))?,
            },
            "logout" => Command::Logout,
            "whoami" => Command::Whoami,
            "servers" => Command::Servers,
            "stats" => Command::Stats(server_id(&positional, "stats")?),
            "domains" => Command::Domains(server_id(&positional, "domains")?),
            "emails" => Command::Emails(server_id(&positional, "emails")?),
            "opens" => Command::Opens(server_id(&positional, "opens")?),
            "period" => Command::Period(positional.first().cloned()),
            "toggle" => Command::Toggle(server_id(&positional, "toggle")?),
            "test" => Command::Test(server_id(&positional, "test")?),
            "delete" => Command::Delete(server_id(&positional, "delete")?),
            "add" => Command::Add,
            "edit" => Command::Edit(server_id(&positional, "edit")?),
            "export" => Command::Export(server_id(&positional, "export")?),
            other => bail!("unknown command {other}"),
        }
    };

    Ok(Invocation {
        command,
        period,
        page,
        search,
        fields,
    })
}
