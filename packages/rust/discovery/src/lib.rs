//! Team discovery: which roster pages are relevant to the current season.
//!
//! Two strategies, chosen by the caller:
//! - **Page-link scan** — enumerate team page ids already linked from the
//!   stats page being enhanced ([`scan_page_links`]).
//! - **Directory scan** — fetch a fixed list of directory pages and collect
//!   the team ids each references for the season ([`scan_directories`]).
//!
//! Both return a deduplicated set. An empty set is a valid outcome meaning
//! "nothing to enrich", never an error by itself.

use std::collections::BTreeSet;

use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use rosterlens_fetch::RosterFetcher;
use rosterlens_shared::{SeasonId, team_id_from_href};

/// Query marker carried by abbreviated team links on stats pages.
const ABBREV_MARKER: &str = "use_abbrev=true";

/// Collect distinct team page ids linked from `html` for the given season.
///
/// Only links carrying both the active `subseason` token and the
/// abbreviated-name marker count; everything else on the page (schedule
/// links, other seasons) is ignored.
pub fn scan_page_links(html: &str, season: &SeasonId) -> BTreeSet<String> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("link selector");
    let season_token = format!("subseason={season}");

    let mut ids = BTreeSet::new();
    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if !href.contains(&season_token) || !href.contains(ABBREV_MARKER) {
            continue;
        }
        if let Some(id) = team_id_from_href(href) {
            ids.insert(id);
        }
    }

    debug!(count = ids.len(), %season, "page-link scan complete");
    ids
}

/// Fetch each directory page and collect the team ids it references for the
/// season, deduplicated across directories.
///
/// A directory's self-reference is excluded from its contribution. An
/// unreachable directory is logged and skipped; it never aborts discovery.
#[instrument(skip(fetcher, directory_ids), fields(directories = directory_ids.len()))]
pub async fn scan_directories(
    fetcher: &RosterFetcher,
    directory_ids: &[String],
    season: &SeasonId,
) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();

    for dir_id in directory_ids {
        let url = fetcher.team_page_url(dir_id, season);
        let html = match fetcher.fetch_page(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(directory = %dir_id, error = %e, "directory unreachable, skipping");
                continue;
            }
        };

        let mut found = scan_page_links(&html, season);
        found.remove(dir_id);
        debug!(directory = %dir_id, count = found.len(), "directory scanned");
        ids.extend(found);
    }

    ids
}
