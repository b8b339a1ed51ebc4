//! Spreadsheet Client
//!
//! Reads a value range through the Google Sheets v4 REST API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::{FetchError, Result};
use crate::score::RawRow;
use crate::source::RowSource;

// == Credentials ==
/// How requests are authorized against the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Bearer access token obtained out of band
    AccessToken(String),
    /// Plain API key, enough for link-shared sheets
    ApiKey(String),
}

/// Body of a `values.get` response. `values` is omitted for an empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

// == Sheets Client ==
/// Client for the Sheets `spreadsheets.values.get` endpoint.
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    api_url: Url,
    credentials: Credentials,
}

impl SheetsClient {
    /// Creates a client against `api_url` (e.g. `https://sheets.googleapis.com/v4`).
    ///
    /// `request_timeout` bounds each HTTP call independently of the
    /// scheduler's own fetch timeout.
    pub fn new(
        api_url: &str,
        credentials: Credentials,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let api_url = Url::parse(api_url)
            .with_context(|| format!("Invalid spreadsheet API url: {}", api_url))?;
        if api_url.cannot_be_a_base() {
            anyhow::bail!("Spreadsheet API url cannot be a base: {}", api_url);
        }

        Ok(Self {
            http,
            api_url,
            credentials,
        })
    }

    /// Builds the `values.get` url. Sheet id and range go in as single path
    /// segments so characters like `#`, `?` or spaces in a tab name are
    /// percent-encoded instead of changing the url's meaning.
    fn values_url(&self, source_id: &str, range: &str) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Transient(format!("bad base url {}", self.api_url)))?
            .pop_if_empty()
            .extend(["spreadsheets", source_id, "values", range]);
        Ok(url)
    }
}

#[async_trait]
impl RowSource for SheetsClient {
    async fn fetch_rows(&self, source_id: &str, range: &str) -> Result<Vec<RawRow>> {
        let url = self.values_url(source_id, range)?;
        debug!("Fetching sheet range: {}", url);

        let request = match &self.credentials {
            Credentials::AccessToken(token) => self.http.get(url).bearer_auth(token),
            Credentials::ApiKey(key) => self.http.get(url).query(&[("key", key)]),
        };

        let resp = request
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Auth(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Transient(format!("{}: {}", status, body)));
        }

        let body: ValueRange = resp
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        Ok(into_raw_rows(body.values))
    }

    fn name(&self) -> &str {
        "google-sheets"
    }
}

/// Maps sheet rows to `(amount, team, reason)`. Sheets trims trailing empty
/// cells, so short rows are padded with empty strings and left for the
/// parser to reject. A blank reason cell means no reason.
fn into_raw_rows(values: Vec<Vec<String>>) -> Vec<RawRow> {
    values
        .into_iter()
        .map(|row| {
            let mut cells = row.into_iter();
            let amount = cells.next().unwrap_or_default();
            let team = cells.next().unwrap_or_default();
            let reason = cells.next().filter(|r| !r.trim().is_empty());
            RawRow {
                amount,
                team,
                reason,
            }
        })
        .collect()
}
