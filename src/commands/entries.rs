//! The `postentries` subcommand: retroactive posting of a day's entries.
//!
//! Entries are given as `"HH:MM,HH:MM"` intervals in chronological order;
//! the service infers clock-in/break/clock-out semantics from each entry's
//! position, so ordering is the caller's responsibility.

use super::Credentials;
use crate::api::attendance::status_ok;
use crate::libs::entry::TimeEntry;
use crate::libs::messages::Message;
use crate::{msg_error, msg_error_anyhow, msg_print, msg_success};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Args;

#[derive(Debug, Args)]
pub struct PostEntriesArgs {
    /// Date the entries belong to (YYYY-MM-DD, defaults to today)
    #[arg(short, long)]
    date: Option<String>,
    /// Work intervals as "HH:MM,HH:MM", in chronological order
    entries: Vec<String>,
}

pub async fn cmd(creds: &Credentials, args: PostEntriesArgs) -> Result<()> {
    if args.entries.is_empty() {
        msg_error!(Message::NoEntriesProvided);
        msg_print!(Message::PostEntriesUsage);
        std::process::exit(1);
    }

    let date = match &args.date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| msg_error_anyhow!(Message::InvalidDateFormat(raw.clone())))?,
        None => Local::now().date_naive(),
    };
    let entries = args
        .entries
        .iter()
        .map(|raw| TimeEntry::parse(raw, date))
        .collect::<Result<Vec<_>>>()?;

    let (attendance, session) = super::login(creds).await?;

    msg_print!(Message::PostingEntries(date.format("%Y-%m-%d").to_string()));
    let status = attendance.post_entries(&session, &entries).await?;
    if status_ok(status) {
        msg_success!(Message::OperationOk);
    } else {
        msg_error!(Message::OperationFailed(status.as_u16()));
    }

    Ok(())
}
