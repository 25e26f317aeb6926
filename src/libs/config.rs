//! Configuration management for the mfcli application.
//!
//! Settings are stored as JSON in the platform data directory and edited
//! through the interactive `mfcli init` wizard. The file holds per-module
//! sections; today the only module is the attendance service connection.
//! The password is never written here — it lives in the encrypted secret
//! cache (`libs::secret`).

use super::data_storage::DataStorage;
use crate::api::attendance::AttendanceConfig;
use crate::libs::messages::Message;
use crate::{msg_print, msg_success};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};

/// Configuration file name inside the platform data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<AttendanceConfig>,
}

impl Config {
    /// Reads the configuration file, falling back to defaults when absent.
    pub fn read() -> Result<Self> {
        let path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes the configuration file, creating the data directory if needed.
    pub fn save(&self) -> Result<()> {
        let path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Runs the interactive configuration wizard and persists the result.
    pub fn init() -> Result<Self> {
        let current = Self::read()?;

        msg_print!(Message::ConfigModuleAttendance);
        let config = Self {
            attendance: Some(AttendanceConfig::init(&current.attendance)?),
        };
        config.save()?;
        msg_success!(Message::ConfigSaved);

        Ok(config)
    }
}
