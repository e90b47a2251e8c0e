//! Concurrent roster aggregation.
//!
//! Fans out roster fetches in fixed-size batches, merges every successful
//! roster into one season-wide [`PlayerLookup`], and accounts for failures
//! without letting a bad team sink the run. Per-team cache entries are
//! consulted before the network and written back after a successful fetch.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use rosterlens_fetch::RosterFetcher;
use rosterlens_shared::{
    EnrichOptions, PlayerLookup, PlayerRecord, Result, RosterLensError, SeasonId,
};
use rosterlens_storage::CacheStore;

use crate::sink::NotificationSink;

/// Result of one aggregation pass over a season's team ids.
#[derive(Debug, Default)]
pub struct AggregateReport {
    /// Merged player lookup across every roster that produced records.
    pub lookup: PlayerLookup,
    /// Teams whose roster was fetched and parsed.
    pub success_count: usize,
    /// Teams that failed (timeout, status, transport, empty parse).
    pub error_count: usize,
    /// Teams satisfied from a fresh cache entry without a fetch.
    pub from_cache_count: usize,
}

impl AggregateReport {
    /// Teams that produced usable records, by either path.
    pub fn satisfied(&self) -> usize {
        self.success_count + self.from_cache_count
    }
}

/// Fetch and merge rosters for `team_ids` within `season`.
///
/// Individual failures are counted and reported, not propagated; the run
/// only errors when *no* team produces records ([`RosterLensError::NoCandidates`]).
/// A success fraction under the configured threshold is surfaced through the
/// sink as a low-confidence warning, with results returned regardless.
#[instrument(skip_all, fields(%season, teams = team_ids.len()))]
pub async fn aggregate(
    fetcher: Arc<RosterFetcher>,
    cache: Option<&CacheStore>,
    team_ids: &[String],
    season: &SeasonId,
    opts: &EnrichOptions,
    sink: &dyn NotificationSink,
) -> Result<AggregateReport> {
    if team_ids.is_empty() {
        return Err(RosterLensError::no_candidates(format!(
            "no team pages discovered for season {season}"
        )));
    }

    let cache = if opts.use_cache { cache } else { None };
    let mut report = AggregateReport::default();

    // Hard ceiling on fan-out, independent of what discovery found.
    let capped = &team_ids[..team_ids.len().min(opts.max_teams)];
    if capped.len() < team_ids.len() {
        warn!(
            discovered = team_ids.len(),
            cap = opts.max_teams,
            "team list truncated to fetch cap"
        );
    }

    // Serve what we can from fresh per-team cache entries first.
    let mut to_fetch: Vec<String> = Vec::with_capacity(capped.len());
    for team_id in capped {
        match cached_roster(cache, team_id, season, opts).await {
            Some(records) => {
                merge(&mut report.lookup, records);
                report.from_cache_count += 1;
            }
            None => to_fetch.push(team_id.clone()),
        }
    }

    let total = capped.len();
    let mut batches = to_fetch.chunks(opts.batch_size.max(1)).peekable();
    while let Some(batch) = batches.next() {
        let handles: Vec<JoinHandle<(String, Result<Vec<PlayerRecord>>)>> = batch
            .iter()
            .map(|team_id| {
                let fetcher = Arc::clone(&fetcher);
                let team_id = team_id.clone();
                let season = season.clone();
                tokio::spawn(async move {
                    let outcome = fetcher.fetch_roster(&team_id, &season).await;
                    (team_id, outcome)
                })
            })
            .collect();

        for handle in handles {
            let (team_id, outcome) = handle
                .await
                .map_err(|e| RosterLensError::Network(format!("fetch task panicked: {e}")))?;

            match outcome {
                Ok(records) => {
                    report.success_count += 1;
                    write_back(cache, &team_id, season, &records).await;
                    merge(&mut report.lookup, records);
                }
                Err(e) => {
                    report.error_count += 1;
                    warn!(team_id, error = %e, "roster fetch failed");
                }
            }
        }

        sink.progress(&format!(
            "fetched {} of {total} rosters",
            report.satisfied() + report.error_count
        ));

        if batches.peek().is_some() && opts.pacing_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(opts.pacing_ms)).await;
        }
    }

    if report.satisfied() == 0 {
        return Err(RosterLensError::no_candidates(format!(
            "all {total} roster fetches failed for season {season}"
        )));
    }

    let fraction = report.satisfied() as f64 / total as f64;
    if fraction < opts.min_success_fraction {
        sink.error(&format!(
            "only {} of {total} rosters loaded; results may be incomplete",
            report.satisfied()
        ));
    }

    debug!(
        success = report.success_count,
        errors = report.error_count,
        cached = report.from_cache_count,
        players = report.lookup.len(),
        "aggregation complete"
    );
    Ok(report)
}

/// Fresh per-team cache read. Any miss, staleness, or cache error reads as
/// "fetch it".
async fn cached_roster(
    cache: Option<&CacheStore>,
    team_id: &str,
    season: &SeasonId,
    opts: &EnrichOptions,
) -> Option<Vec<PlayerRecord>> {
    let store = cache?;
    let key = season.roster_cache_key(team_id);
    match store.get_entry::<Vec<PlayerRecord>>(&key).await {
        Ok(Some(entry)) if !entry.is_stale(rosterlens_shared::now_ms(), opts.cache_ttl_ms) => {
            debug!(team_id, "roster served from cache");
            Some(entry.data)
        }
        Ok(_) => None,
        Err(e) => {
            warn!(team_id, error = %e, "roster cache read failed");
            None
        }
    }
}

/// Best-effort cache write: a rejected write is a warning, never a failure.
async fn write_back(
    cache: Option<&CacheStore>,
    team_id: &str,
    season: &SeasonId,
    records: &[PlayerRecord],
) {
    let Some(store) = cache else { return };
    let key = season.roster_cache_key(team_id);
    if let Err(e) = store.put_entry(&key, &records.to_vec()).await {
        warn!(team_id, error = %e, "roster cache write failed");
    }
}

/// Merge records into the lookup, keyed by player id. Later batches win on
/// collision.
fn merge(lookup: &mut PlayerLookup, records: Vec<PlayerRecord>) {
    for record in records {
        lookup.insert(record.id.clone(), record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SilentSink;
    use std::sync::Mutex;
    use std::time::Duration;

    fn season() -> SeasonId {
        SeasonId("867530".into())
    }

    fn test_opts() -> EnrichOptions {
        let mut opts = EnrichOptions::from(&rosterlens_shared::AppConfig::default());
        opts.pacing_ms = 0;
        opts
    }

    fn roster_fixture() -> String {
        std::fs::read_to_string("../../../fixtures/html/roster.html").expect("read fixture")
    }

    async fn mock_roster(server: &wiremock::MockServer, team_id: &str, status: u16) {
        let template = if status == 200 {
            wiremock::ResponseTemplate::new(200).set_body_string(roster_fixture())
        } else {
            wiremock::ResponseTemplate::new(status)
        };
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(format!("/roster/show/{team_id}")))
            .respond_with(template)
            .mount(server)
            .await;
    }

    async fn fetcher_for(server: &wiremock::MockServer) -> Arc<RosterFetcher> {
        Arc::new(RosterFetcher::new(&server.uri(), Duration::from_secs(5)).unwrap())
    }

    /// Sink that records every message for assertions.
    #[derive(Default)]
    struct CapturingSink {
        progress: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl NotificationSink for CapturingSink {
        fn progress(&self, message: &str) {
            self.progress.lock().unwrap().push(message.to_string());
        }
        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn partial_failures_are_counted_not_fatal() {
        let server = wiremock::MockServer::start().await;
        let ids: Vec<String> = (1..=10).map(|n| n.to_string()).collect();
        for id in &ids {
            let status = if id == "3" || id == "7" { 404 } else { 200 };
            mock_roster(&server, id, status).await;
        }

        let report = aggregate(
            fetcher_for(&server).await,
            None,
            &ids,
            &season(),
            &test_opts(),
            &SilentSink,
        )
        .await
        .expect("partial failure still succeeds");

        assert_eq!(report.success_count, 8);
        assert_eq!(report.error_count, 2);
        assert_eq!(report.from_cache_count, 0);
        // Every team serves the same fixture, so the merged lookup holds the
        // fixture's three players.
        assert_eq!(report.lookup.len(), 3);
        assert_eq!(report.lookup["991"].position, "D");
    }

    #[tokio::test]
    async fn all_failures_is_no_candidates() {
        let server = wiremock::MockServer::start().await;
        let ids: Vec<String> = vec!["1".into(), "2".into()];
        for id in &ids {
            mock_roster(&server, id, 500).await;
        }

        let err = aggregate(
            fetcher_for(&server).await,
            None,
            &ids,
            &season(),
            &test_opts(),
            &SilentSink,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RosterLensError::NoCandidates { .. }));
    }

    #[tokio::test]
    async fn empty_team_list_is_no_candidates() {
        let server = wiremock::MockServer::start().await;
        let err = aggregate(
            fetcher_for(&server).await,
            None,
            &[],
            &season(),
            &test_opts(),
            &SilentSink,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RosterLensError::NoCandidates { .. }));
    }

    #[tokio::test]
    async fn fresh_cache_entry_skips_the_network() {
        let server = wiremock::MockServer::start().await;
        // No mock mounted: a fetch for team 42 would fail.

        let tmp = std::env::temp_dir().join(format!(
            "rosterlens_agg_{}_{}.db",
            std::process::id(),
            rosterlens_shared::now_ms()
        ));
        let _ = std::fs::remove_file(&tmp);
        let store = CacheStore::open(&tmp).await.unwrap();

        let records = vec![PlayerRecord {
            id: "991".into(),
            number: "17".into(),
            position: "D".into(),
            grade: "11".into(),
            team_name: Some("Ridgeview Wolves".into()),
            team_id: Some("42".into()),
        }];
        store
            .put_entry(&season().roster_cache_key("42"), &records)
            .await
            .unwrap();

        let report = aggregate(
            fetcher_for(&server).await,
            Some(&store),
            &["42".to_string()],
            &season(),
            &test_opts(),
            &SilentSink,
        )
        .await
        .expect("cache satisfies the run");

        assert_eq!(report.from_cache_count, 1);
        assert_eq!(report.success_count, 0);
        assert_eq!(report.lookup["991"].grade, "11");
    }

    #[tokio::test]
    async fn successful_fetch_writes_back_to_cache() {
        let server = wiremock::MockServer::start().await;
        mock_roster(&server, "42", 200).await;

        let tmp = std::env::temp_dir().join(format!(
            "rosterlens_agg_wb_{}_{}.db",
            std::process::id(),
            rosterlens_shared::now_ms()
        ));
        let _ = std::fs::remove_file(&tmp);
        let store = CacheStore::open(&tmp).await.unwrap();

        aggregate(
            fetcher_for(&server).await,
            Some(&store),
            &["42".to_string()],
            &season(),
            &test_opts(),
            &SilentSink,
        )
        .await
        .unwrap();

        let entry = store
            .get_entry::<Vec<PlayerRecord>>(&season().roster_cache_key("42"))
            .await
            .unwrap()
            .expect("write-back happened");
        assert_eq!(entry.data.len(), 3);
    }

    #[tokio::test]
    async fn low_success_fraction_warns_but_returns() {
        let server = wiremock::MockServer::start().await;
        let ids: Vec<String> = (1..=5).map(|n| n.to_string()).collect();
        for id in &ids {
            let status = if id == "1" { 200 } else { 404 };
            mock_roster(&server, id, status).await;
        }

        let sink = CapturingSink::default();
        let report = aggregate(
            fetcher_for(&server).await,
            None,
            &ids,
            &season(),
            &test_opts(),
            &sink,
        )
        .await
        .expect("low confidence still returns results");

        assert_eq!(report.success_count, 1);
        let errors = sink.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("1 of 5"));
        assert!(!sink.progress.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn team_list_capped_at_max_teams() {
        let server = wiremock::MockServer::start().await;
        let ids: Vec<String> = (1..=8).map(|n| n.to_string()).collect();
        for id in &ids {
            mock_roster(&server, id, 200).await;
        }

        let mut opts = test_opts();
        opts.max_teams = 4;
        let report = aggregate(
            fetcher_for(&server).await,
            None,
            &ids,
            &season(),
            &opts,
            &SilentSink,
        )
        .await
        .unwrap();

        assert_eq!(report.success_count, 4);
    }
}
