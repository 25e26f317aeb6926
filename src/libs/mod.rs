//! Core library modules for the mfcli application.
//!
//! - **Infrastructure**: configuration, data storage, messaging, secrets
//! - **Domain**: time entries and the positional event rules
//! - **Extraction**: tolerant HTML scraping for the service's pages

pub mod config;
pub mod data_storage;
pub mod entry;
pub mod messages;
pub mod scrape;
pub mod secret;
