//! Display implementation for mfcli application messages.
//!
//! Converts structured [`Message`] values into the human-readable text shown
//! on the terminal. All wording lives here; call sites only pick variants.

use super::types::Message;
use std::fmt;

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            // === CONFIGURATION MESSAGES ===
            Message::ConfigSaved => "Configuration saved successfully".to_string(),
            Message::ConfigModuleAttendance => "Money Forward attendance settings".to_string(),
            Message::CredentialsMissing(option) => {
                format!("Missing {}: pass it on the command line or run `mfcli init`", option)
            }

            // === ATTENDANCE MESSAGES ===
            Message::Recording(label) => format!("{} ...", label),
            Message::PostingEntries(date) => format!("Posting {} ...", date),
            Message::OperationOk => "OK!".to_string(),
            Message::OperationFailed(status) => format!("Failed ({})", status),
            Message::LoginFailed => "Failed to login to the attendance service".to_string(),

            // === ENTRY PARSING MESSAGES ===
            Message::NoEntriesProvided => "Fatal: no entries are specified".to_string(),
            Message::PostEntriesUsage => {
                "Usage: mfcli postentries [--date YYYY-MM-DD] \"HH:MM,HH:MM\"...".to_string()
            }
            Message::InvalidEntryFormat(entry) => {
                format!("Invalid entry \"{}\": expected \"HH:MM,HH:MM\"", entry)
            }
            Message::InvalidDateFormat(date) => format!("Invalid date \"{}\": expected YYYY-MM-DD", date),
        };
        write!(f, "{}", text)
    }
}
