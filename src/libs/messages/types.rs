//! Structured message definitions for all user-facing text.
//!
//! Every string mfcli prints passes through this enum so that wording lives
//! in one place (`display.rs`) and call sites stay type-checked. Variants
//! carry their dynamic parts as typed fields.

#[derive(Debug, Clone)]
pub enum Message {
    // === CONFIGURATION MESSAGES ===
    ConfigSaved,
    ConfigModuleAttendance,
    CredentialsMissing(String), // option name

    // === ATTENDANCE MESSAGES ===
    Recording(String),      // progress label, e.g. "Starting job"
    PostingEntries(String), // date
    OperationOk,
    OperationFailed(u16), // HTTP status
    LoginFailed,

    // === ENTRY PARSING MESSAGES ===
    NoEntriesProvided,
    PostEntriesUsage,
    InvalidEntryFormat(String),
    InvalidDateFormat(String),
}
