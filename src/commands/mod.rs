//! Command-line interface and dispatch.
//!
//! Global options carry the credentials (`-c` company, `-u` user, `-p`
//! password); each falls back to the stored configuration, and the password
//! additionally to the encrypted secret cache with an interactive prompt.
//! Command-line values always win over stored ones.

pub mod entries;
pub mod init;
pub mod record;

use crate::api::attendance::{Attendance, AttendanceConfig, AttendanceSession, EventType};
use crate::libs::config::Config;
use crate::libs::messages::Message;
use crate::libs::secret::Secret;
use crate::{msg_error, msg_error_anyhow};
use anyhow::Result;
use clap::{Parser, Subcommand};

const SECRET_FILE: &str = ".attendance_secret";

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configuration initialization")]
    Init,
    #[command(about = "Record clock-in (start job)")]
    Startjob,
    #[command(about = "Record clock-out (finish job)")]
    Finishjob,
    #[command(about = "Record the start of a break")]
    Startbreak,
    #[command(about = "Record the end of a break")]
    Finishbreak,
    #[command(about = "Post a day's time entries retroactively")]
    Postentries(entries::PostEntriesArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    /// Company account name (overrides the stored configuration)
    #[arg(short = 'c', long, global = true)]
    company: Option<String>,
    /// Account name or email (overrides the stored configuration)
    #[arg(short = 'u', long, global = true)]
    user: Option<String>,
    /// Password (falls back to the encrypted cache, prompting on first use)
    #[arg(short = 'p', long, global = true)]
    password: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> Result<()> {
        init_tracing();
        let cli = Self::parse();
        let globals = Globals {
            company: cli.company,
            user: cli.user,
            password: cli.password,
        };

        match cli.command {
            Commands::Init => init::cmd(),
            Commands::Startjob => record::cmd(&globals.resolve()?, EventType::ClockIn).await,
            Commands::Finishjob => record::cmd(&globals.resolve()?, EventType::ClockOut).await,
            Commands::Startbreak => record::cmd(&globals.resolve()?, EventType::StartBreak).await,
            Commands::Finishbreak => record::cmd(&globals.resolve()?, EventType::EndBreak).await,
            Commands::Postentries(args) => entries::cmd(&globals.resolve()?, args).await,
        }
    }
}

/// Global credential options, resolved against the stored configuration.
struct Globals {
    company: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

impl Globals {
    fn resolve(&self) -> Result<Credentials> {
        let config = Config::read()?.attendance.unwrap_or_default();

        let company = self
            .company
            .clone()
            .or_else(|| non_empty(&config.office_account_name))
            .ok_or_else(|| msg_error_anyhow!(Message::CredentialsMissing("company account name (-c)".to_string())))?;
        let user = self
            .user
            .clone()
            .or_else(|| non_empty(&config.account_name_or_email))
            .ok_or_else(|| msg_error_anyhow!(Message::CredentialsMissing("account name or email (-u)".to_string())))?;
        let password = match &self.password {
            Some(password) => password.clone(),
            None => Secret::new(SECRET_FILE, "Enter your attendance service password").get_or_prompt()?,
        };

        Ok(Credentials {
            company,
            user,
            password,
            config,
        })
    }
}

/// Fully resolved credentials plus the service connection settings.
pub struct Credentials {
    pub company: String,
    pub user: String,
    pub password: String,
    pub config: AttendanceConfig,
}

/// Establishes a fresh session for one command invocation.
///
/// Every subcommand logs in anew and discards the session at process exit;
/// nothing is persisted between runs.
async fn login(creds: &Credentials) -> Result<(Attendance, AttendanceSession)> {
    let attendance = Attendance::new(&creds.config)?;
    match attendance.login(&creds.company, &creds.user, &creds.password).await {
        Ok(session) => Ok((attendance, session)),
        Err(err) => {
            msg_error!(Message::LoginFailed);
            Err(err.into())
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Routes `tracing` output to the console when debug mode is on. Without
/// this the `msg_*!` macros fall back to plain printing, so normal runs
/// stay quiet.
fn init_tracing() {
    if crate::libs::messages::macros::is_debug_mode() {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
