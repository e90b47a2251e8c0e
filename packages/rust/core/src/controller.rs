//! Run orchestration for a single stats page.
//!
//! [`Enricher`] owns the pipeline: season extraction, readiness polling,
//! cache consultation, discovery, aggregation, and table enhancement. It
//! also carries the re-entrancy guards — one run at a time, and a season
//! already enriched in this process is skipped until [`Enricher::reset`].

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use rosterlens_fetch::RosterFetcher;
use rosterlens_shared::{
    EnrichOptions, PlayerLookup, Result, RosterLensError, SeasonId, now_ms,
};
use rosterlens_storage::CacheStore;

use crate::aggregator;
use crate::enhancer::{self, EnhanceOutcome};
use crate::sink::NotificationSink;
use crate::sort::{SortDirection, sort_by_column};
use crate::table::{LeaguePage, TableModel};

// ---------------------------------------------------------------------------
// Run outcome types
// ---------------------------------------------------------------------------

/// Why a run was skipped without touching the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The page URL carries no season token.
    NoSeason,
    /// Another run is already underway.
    InProgress,
    /// This season was already enriched in this process.
    SeasonAlreadyEnriched,
}

/// What one enrichment run produced.
#[derive(Debug, Clone)]
pub struct EnrichReport {
    pub season: SeasonId,
    /// Tables that gained derived columns this run.
    pub tables_enhanced: usize,
    /// Rows that joined a player record, across all tables.
    pub rows_matched: usize,
    /// Data rows considered, across all tables.
    pub rows_total: usize,
    pub rosters_fetched: usize,
    pub rosters_failed: usize,
    pub rosters_from_cache: usize,
    /// True when the lookup came from an expired cache entry after every
    /// fetch failed.
    pub used_stale_cache: bool,
}

/// Outcome of [`Enricher::run`].
#[derive(Debug, Clone)]
pub enum RunSummary {
    Enriched(EnrichReport),
    Skipped(SkipReason),
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// Pipeline controller. One instance per process; holds the cross-run
/// guards.
pub struct Enricher {
    opts: EnrichOptions,
    fetcher: Arc<RosterFetcher>,
    cache: Option<CacheStore>,
    sink: Box<dyn NotificationSink>,
    in_progress: bool,
    last_enriched: Option<SeasonId>,
}

impl Enricher {
    /// Build a controller from resolved options, an optional cache store,
    /// and a notification sink.
    pub fn new(
        opts: EnrichOptions,
        cache: Option<CacheStore>,
        sink: Box<dyn NotificationSink>,
    ) -> Result<Self> {
        let fetcher = Arc::new(RosterFetcher::new(&opts.base_url, opts.timeout)?);
        Ok(Self {
            opts,
            fetcher,
            cache,
            sink,
            in_progress: false,
            last_enriched: None,
        })
    }

    /// Enrich every table on `page`. Skips (without touching the page) when
    /// the URL has no season, a run is underway, or the season was already
    /// enriched; errors only when no player data can be obtained at all.
    #[instrument(skip_all, fields(url = %page.url))]
    pub async fn run(&mut self, page: &mut LeaguePage) -> Result<RunSummary> {
        let Some(season) = SeasonId::from_page_url(&page.url) else {
            debug!("no season token in page url, skipping");
            return Ok(RunSummary::Skipped(SkipReason::NoSeason));
        };
        if self.in_progress {
            return Ok(RunSummary::Skipped(SkipReason::InProgress));
        }
        if self.last_enriched.as_ref() == Some(&season) {
            debug!(%season, "season already enriched, skipping");
            return Ok(RunSummary::Skipped(SkipReason::SeasonAlreadyEnriched));
        }

        self.in_progress = true;
        let result = self.run_inner(page, &season).await;
        self.in_progress = false;

        if result.is_ok() {
            self.last_enriched = Some(season);
        }
        result
    }

    async fn run_inner(&mut self, page: &mut LeaguePage, season: &SeasonId) -> Result<RunSummary> {
        self.await_readiness(page).await;

        let (lookup, fetched, failed, from_cache, used_stale_cache) =
            self.obtain_lookup(page, season).await?;

        let mut report = EnrichReport {
            season: season.clone(),
            tables_enhanced: 0,
            rows_matched: 0,
            rows_total: 0,
            rosters_fetched: fetched,
            rosters_failed: failed,
            rosters_from_cache: from_cache,
            used_stale_cache,
        };

        for table in &mut page.tables {
            match enhancer::enhance(table, &lookup) {
                EnhanceOutcome::Enhanced { matched, total } => {
                    report.tables_enhanced += 1;
                    report.rows_matched += matched;
                    report.rows_total += total;
                }
                outcome => debug!(?outcome, "table skipped"),
            }
        }

        info!(
            %season,
            tables = report.tables_enhanced,
            matched = report.rows_matched,
            "enrichment complete"
        );
        Ok(RunSummary::Enriched(report))
    }

    /// Poll until the page holds enough data rows, refetching between
    /// attempts. Proceeds with whatever is present once attempts run out.
    async fn await_readiness(&self, page: &mut LeaguePage) {
        for attempt in 1..=self.opts.ready_attempts {
            if page.data_row_count() >= self.opts.ready_min_rows {
                return;
            }
            debug!(attempt, rows = page.data_row_count(), "page not ready, refetching");
            tokio::time::sleep(std::time::Duration::from_millis(self.opts.ready_delay_ms)).await;

            match self.fetcher.fetch_page(&page.url).await {
                Ok(html) => *page = LeaguePage::parse(page.url.clone(), html),
                Err(e) => warn!(error = %e, "readiness refetch failed"),
            }
        }
        warn!(
            rows = page.data_row_count(),
            min = self.opts.ready_min_rows,
            "proceeding without full readiness"
        );
    }

    /// Produce the season lookup: fresh season cache, else discover and
    /// aggregate, else fall back to an expired cache entry.
    async fn obtain_lookup(
        &self,
        page: &LeaguePage,
        season: &SeasonId,
    ) -> Result<(PlayerLookup, usize, usize, usize, bool)> {
        let key = season.league_cache_key();

        if let Some(entry) = self.read_league_cache(&key).await {
            if !entry_is_stale(entry.1, self.opts.cache_ttl_ms) {
                debug!(%season, "season lookup served from cache");
                return Ok((entry.0, 0, 0, 0, false));
            }
        }

        let team_ids: Vec<String> = if self.opts.directory_ids.is_empty() {
            rosterlens_discovery::scan_page_links(&page.html, season)
                .into_iter()
                .collect()
        } else {
            rosterlens_discovery::scan_directories(&self.fetcher, &self.opts.directory_ids, season)
                .await
                .into_iter()
                .collect()
        };

        match aggregator::aggregate(
            Arc::clone(&self.fetcher),
            self.cache.as_ref(),
            &team_ids,
            season,
            &self.opts,
            self.sink.as_ref(),
        )
        .await
        {
            Ok(report) => {
                self.write_league_cache(&key, &report.lookup).await;
                Ok((
                    report.lookup,
                    report.success_count,
                    report.error_count,
                    report.from_cache_count,
                    false,
                ))
            }
            Err(e @ RosterLensError::NoCandidates { .. }) => {
                // Expired data beats no data, as long as the user hears
                // about it.
                if let Some((lookup, _)) = self.read_league_cache(&key).await {
                    warn!(%season, "all fetches failed, using expired cache entry");
                    self.sink
                        .error("live roster data unavailable; showing expired cached data");
                    return Ok((lookup, 0, 0, 0, true));
                }
                self.sink
                    .error("no roster data could be fetched and nothing is cached");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn read_league_cache(&self, key: &str) -> Option<(PlayerLookup, i64)> {
        if !self.opts.use_cache {
            return None;
        }
        let store = self.cache.as_ref()?;
        match store.get_entry::<PlayerLookup>(key).await {
            Ok(Some(entry)) => Some((entry.data, entry.timestamp)),
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "season cache read failed");
                None
            }
        }
    }

    async fn write_league_cache(&self, key: &str, lookup: &PlayerLookup) {
        if !self.opts.use_cache {
            return;
        }
        let Some(store) = self.cache.as_ref() else {
            return;
        };
        if let Err(e) = store.put_entry(key, lookup).await {
            warn!(key, error = %e, "season cache write failed");
        }
    }

    /// Forget the enriched-season guard so the next run refetches.
    pub fn reset(&mut self) {
        self.last_enriched = None;
        self.in_progress = false;
    }

    /// Sort one of the page's tables by column, toggling direction.
    pub fn sort_column(&self, table: &mut TableModel, column_index: usize) -> SortDirection {
        sort_by_column(table, column_index)
    }
}

fn entry_is_stale(timestamp: i64, ttl_ms: i64) -> bool {
    now_ms() - timestamp >= ttl_ms
}
