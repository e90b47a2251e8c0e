//! Core domain types for RosterLens enrichment.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Cache time-to-live: 7 days, in milliseconds.
pub const CACHE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Cache key prefix for a whole-season lookup.
const LEAGUE_KEY_PREFIX: &str = "league";

/// Cache key prefix for a single team's roster batch.
const ROSTER_KEY_PREFIX: &str = "roster";

// ---------------------------------------------------------------------------
// SeasonId
// ---------------------------------------------------------------------------

/// Matches the `subseason=<digits>` query token on league and roster URLs.
static SUBSEASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"subseason=(\d+)").expect("subseason regex"));

/// The season/period token that partitions cache keys and remote requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonId(pub String);

impl SeasonId {
    /// Extract the season token from a page URL, if present.
    ///
    /// Returns `None` when the URL carries no `subseason` parameter, which
    /// means there is nothing to enrich on that page.
    pub fn from_page_url(url: &str) -> Option<Self> {
        SUBSEASON_RE
            .captures(url)
            .map(|caps| Self(caps[1].to_string()))
    }

    /// Cache key for the whole-season player lookup.
    pub fn league_cache_key(&self) -> String {
        format!("{LEAGUE_KEY_PREFIX}:{}", self.0)
    }

    /// Cache key for one team's roster batch within this season.
    pub fn roster_cache_key(&self, team_id: &str) -> String {
        format!("{ROSTER_KEY_PREFIX}:{team_id}:{}", self.0)
    }
}

impl std::fmt::Display for SeasonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Link tokens
// ---------------------------------------------------------------------------

/// Matches a player detail link (`.../roster_players/<id>`).
static PLAYER_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"roster_players/(\d+)").expect("player link regex"));

/// Matches a team page link (`.../page/show/<id>`).
static TEAM_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"page/show/(\d+)").expect("team link regex"));

/// Extract the player id from a roster-player detail href, if present.
pub fn player_id_from_href(href: &str) -> Option<String> {
    PLAYER_LINK_RE
        .captures(href)
        .map(|caps| caps[1].to_string())
}

/// Extract the team page id from a team link href, if present.
pub fn team_id_from_href(href: &str) -> Option<String> {
    TEAM_LINK_RE.captures(href).map(|caps| caps[1].to_string())
}

// ---------------------------------------------------------------------------
// PlayerRecord / PlayerLookup
// ---------------------------------------------------------------------------

/// One player's roster attributes, extracted from a team roster page.
///
/// `id` is the stable identifier from the player's `roster_players/<id>`
/// detail link; it is unique within a season and non-empty by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Stable remote player identifier.
    pub id: String,
    /// Jersey number as displayed (kept as text; may be blank).
    pub number: String,
    /// Playing position (e.g. "F", "D", "G").
    pub position: String,
    /// Grade level as displayed on the roster.
    pub grade: String,
    /// Full team display name from the roster page heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    /// Identifier of the team page the record came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

/// Mapping from player id to record, built fresh per season-fetch cycle.
pub type PlayerLookup = HashMap<String, PlayerRecord>;

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

/// A cached value with its write timestamp (epoch milliseconds).
///
/// Freshness is the *caller's* responsibility: the store hands back stale
/// entries so they can serve as an explicit fallback when refetching fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    /// Wrap `data` with the current timestamp.
    pub fn new(data: T) -> Self {
        Self {
            data,
            timestamp: now_ms(),
        }
    }

    /// Whether the entry has outlived `ttl_ms` as of `now`.
    pub fn is_stale(&self, now: i64, ttl_ms: i64) -> bool {
        now - self.timestamp >= ttl_ms
    }
}

/// Current time as epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
