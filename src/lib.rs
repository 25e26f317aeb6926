//! # Mfcli - Money Forward attendance automation
//!
//! A command-line client for the Money Forward attendance service. It drives
//! the service's HTML login form, extracts the anti-forgery tokens embedded
//! in rendered pages, and replays them in the form submissions that mutate
//! attendance records.
//!
//! ## Features
//!
//! - **Session Establishment**: Login form → CSRF token → credential POST → rotated session cookie
//! - **Event Recording**: Clock-in, clock-out, break start and break end
//! - **Retroactive Posting**: Batch submission of a day's time entries
//! - **Credential Storage**: Encrypted password cache and JSON configuration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mfcli::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Cli::menu().await
//! }
//! ```

pub mod api;
pub mod commands;
pub mod libs;
