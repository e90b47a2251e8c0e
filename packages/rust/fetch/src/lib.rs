//! Bounded-time HTTP fetching of roster and league pages.
//!
//! [`RosterFetcher`] issues one GET per call with a profile-dependent
//! timeout; reqwest cancels the in-flight request when the bound is hit, and
//! the failure is surfaced as a typed [`RosterLensError`] so the aggregator's
//! accounting is driven by outcomes rather than swallowed exceptions:
//! - [`RosterLensError::Timeout`] — the bound elapsed
//! - [`RosterLensError::Status`] — non-2xx response
//! - [`RosterLensError::Network`] — transport failure
//! - [`RosterLensError::ParseEmpty`] — 2xx but no extractable records

mod parser;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use rosterlens_shared::{PlayerRecord, Result, RosterLensError, SeasonId};

/// User-Agent string for outbound requests.
const USER_AGENT: &str = concat!("RosterLens/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// HTTP client for roster detail pages and league/directory pages.
pub struct RosterFetcher {
    client: Client,
    base_url: String,
}

impl RosterFetcher {
    /// Build a fetcher against `base_url` with the given per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| RosterLensError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The templated roster page address for a team within a season.
    pub fn roster_url(&self, team_id: &str, season: &SeasonId) -> String {
        format!("{}/roster/show/{team_id}?subseason={season}", self.base_url)
    }

    /// The templated team page address for a directory identifier.
    pub fn team_page_url(&self, page_id: &str, season: &SeasonId) -> String {
        format!("{}/page/show/{page_id}?subseason={season}", self.base_url)
    }

    /// Fetch one team's roster and parse it into player records.
    #[instrument(skip(self))]
    pub async fn fetch_roster(
        &self,
        team_id: &str,
        season: &SeasonId,
    ) -> Result<Vec<PlayerRecord>> {
        let url = self.roster_url(team_id, season);
        let html = self.fetch_page(&url).await?;

        let records = parser::parse_roster(&html, team_id);
        if records.is_empty() {
            return Err(RosterLensError::ParseEmpty { url });
        }

        debug!(team_id, count = records.len(), "roster parsed");
        Ok(records)
    }

    /// Fetch raw HTML from `url` with the taxonomy above (minus parsing).
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_request_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RosterLensError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_request_error(e, url))
    }
}

/// Map a reqwest error onto the fetch taxonomy.
fn classify_request_error(e: reqwest::Error, url: &str) -> RosterLensError {
    if e.is_timeout() {
        RosterLensError::Timeout {
            url: url.to_string(),
        }
    } else {
        RosterLensError::Network(format!("{url}: {e}"))
    }
}
