//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;

use crate::source::Credentials;

/// Longest accepted refresh interval or fetch timeout, in seconds
const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// Server configuration parameters.
///
/// All values can be configured via environment variables. Everything except
/// the sheet id and a credential has a sensible default.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Spreadsheet holding the score rows
    pub sheet_id: Option<String>,
    /// Range of `amount, team` rows within the spreadsheet
    pub sheet_range: String,
    /// Base URL of the Sheets REST API
    pub sheets_api_url: String,
    /// API key credential
    pub sheets_api_key: Option<String>,
    /// Bearer token credential, preferred over the API key
    pub sheets_access_token: Option<String>,
    /// Seconds between refresh cycles
    pub refresh_interval: u64,
    /// Seconds before a fetch is abandoned
    pub fetch_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `SHEET_ID` - Spreadsheet id (required)
    /// - `SHEET_RANGE` - Row range (default: `Score!A2:C`)
    /// - `SHEETS_API_URL` - API base (default: `https://sheets.googleapis.com/v4`)
    /// - `SHEETS_API_KEY` - API key
    /// - `SHEETS_ACCESS_TOKEN` - OAuth bearer token
    /// - `REFRESH_INTERVAL` - Seconds between refreshes (default: 60)
    /// - `FETCH_TIMEOUT` - Seconds per fetch (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            sheet_id: non_empty_var("SHEET_ID"),
            sheet_range: non_empty_var("SHEET_RANGE").unwrap_or(defaults.sheet_range),
            sheets_api_url: non_empty_var("SHEETS_API_URL").unwrap_or(defaults.sheets_api_url),
            sheets_api_key: non_empty_var("SHEETS_API_KEY"),
            sheets_access_token: non_empty_var("SHEETS_ACCESS_TOKEN"),
            refresh_interval: parse_var("REFRESH_INTERVAL").unwrap_or(defaults.refresh_interval),
            fetch_timeout: parse_var("FETCH_TIMEOUT").unwrap_or(defaults.fetch_timeout),
        }
    }

    /// Returns the credential to use, preferring the access token.
    pub fn credentials(&self) -> Option<Credentials> {
        self.sheets_access_token
            .clone()
            .map(Credentials::AccessToken)
            .or_else(|| self.sheets_api_key.clone().map(Credentials::ApiKey))
    }

    /// Checks that the configuration can drive a refresh.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sheet_id.is_none() {
            anyhow::bail!("SHEET_ID is required");
        }
        if self.credentials().is_none() {
            anyhow::bail!("One of SHEETS_ACCESS_TOKEN or SHEETS_API_KEY is required");
        }
        if !(1..=MAX_DURATION_SECS).contains(&self.refresh_interval) {
            anyhow::bail!("REFRESH_INTERVAL must be between 1 and {}", MAX_DURATION_SECS);
        }
        if !(1..=MAX_DURATION_SECS).contains(&self.fetch_timeout) {
            anyhow::bail!("FETCH_TIMEOUT must be between 1 and {}", MAX_DURATION_SECS);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            sheet_id: None,
            sheet_range: "Score!A2:C".to_string(),
            sheets_api_url: "https://sheets.googleapis.com/v4".to_string(),
            sheets_api_key: None,
            sheets_access_token: None,
            refresh_interval: 60,
            fetch_timeout: 30,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
