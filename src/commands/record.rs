//! Point-in-time event recording shared by the four record subcommands.

use super::Credentials;
use crate::api::attendance::{status_ok, EventType};
use crate::libs::messages::Message;
use crate::{msg_error, msg_print, msg_success};
use anyhow::Result;

pub async fn cmd(creds: &Credentials, event: EventType) -> Result<()> {
    let (attendance, session) = super::login(creds).await?;

    msg_print!(Message::Recording(event.label().to_string()));
    let status = attendance.record(&session, event).await?;
    if status_ok(status) {
        msg_success!(Message::OperationOk);
    } else {
        msg_error!(Message::OperationFailed(status.as_u16()));
    }

    Ok(())
}
