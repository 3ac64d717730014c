pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod metrics;
pub mod quality;
pub mod query;
pub mod storage;

pub use cache::{CacheKey, CacheStats, TtlCache};
pub use config::{EngineConfig, OversWindow};
pub use error::{Error, Result};
pub use format::{Cell, Table, Tabular};
pub use metrics::{
    ChaseDefendMetrics, HeadToHeadMetrics, NrrMetrics, Phase, PhaseMetrics, SeasonSummary,
    TeamSummary, TossImpactMetrics,
};
pub use quality::{QualityReport, QualityWeights};
pub use query::executor::{MatchRow, QueryExecutor};
pub use query::filter::MatchFilter;
pub use query::season::Season;
pub use storage::Database;

/// Main entry point for the cricket analytics engine.
///
/// Holds the store handle, the configuration, and the result cache with an
/// explicit lifecycle: construct once at process start, clear the cache via
/// `clear_cache`. There is no module-level state; two engines over the same
/// store are fully independent.
pub struct CricketDW {
    executor: QueryExecutor,
    config: EngineConfig,
    quality_weights: QualityWeights,
    tables: TtlCache<Table>,
    quality: TtlCache<QualityReport>,
}

impl CricketDW {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let executor = QueryExecutor::new(db, config.query_timeout);
        let tables = TtlCache::new(config.cache_ttl);
        let quality = TtlCache::new(config.cache_ttl);
        Self {
            executor,
            config,
            quality_weights: QualityWeights::default(),
            tables,
            quality,
        }
    }

    pub fn with_quality_weights(mut self, weights: QualityWeights) -> Self {
        self.quality_weights = weights;
        self
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        self.executor.db()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Calculators ────────────────────────────────────────────────
    // Each public method memoizes the formatted table under a key derived
    // from the calculator name and the normalized filter. Errors are never
    // cached; a failed call recomputes on the next attempt.

    pub async fn net_run_rate(&self, team: &str, filter: &MatchFilter) -> Result<Table> {
        let scoped = filter.clone().team(team);
        let key = CacheKey::new("net_run_rate", &scoped.key_params());
        self.tables
            .get_or_compute(key, || async {
                let m =
                    metrics::compute_net_run_rate(&self.executor, &self.config, team, filter)
                        .await?;
                Ok(m.to_table())
            })
            .await
    }

    pub async fn powerplay_stats(&self, filter: &MatchFilter) -> Result<Table> {
        let key = CacheKey::new("powerplay", &filter.key_params());
        self.tables
            .get_or_compute(key, || async {
                let m = metrics::compute_phase_stats(
                    &self.executor,
                    &self.config,
                    Phase::Powerplay,
                    filter,
                )
                .await?;
                Ok(m.to_table())
            })
            .await
    }

    pub async fn death_overs_stats(&self, filter: &MatchFilter) -> Result<Table> {
        let key = CacheKey::new("death_overs", &filter.key_params());
        self.tables
            .get_or_compute(key, || async {
                let m = metrics::compute_phase_stats(
                    &self.executor,
                    &self.config,
                    Phase::DeathOvers,
                    filter,
                )
                .await?;
                Ok(m.to_table())
            })
            .await
    }

    pub async fn chase_vs_defend(&self, team: &str, filter: &MatchFilter) -> Result<Table> {
        let scoped = filter.clone().team(team);
        let key = CacheKey::new("chase_vs_defend", &scoped.key_params());
        self.tables
            .get_or_compute(key, || async {
                let m = metrics::compute_chase_vs_defend(&self.executor, team, filter).await?;
                Ok(m.to_table())
            })
            .await
    }

    pub async fn team_summary(&self, team: &str, filter: &MatchFilter) -> Result<Table> {
        let scoped = filter.clone().team(team);
        let key = CacheKey::new("team_summary", &scoped.key_params());
        self.tables
            .get_or_compute(key, || async {
                let m = metrics::compute_team_summary(&self.executor, team, filter).await?;
                Ok(m.to_table())
            })
            .await
    }

    /// Win-percentage leaderboard across all teams in the filtered
    /// matches, truncated to the configured `top_n`.
    pub async fn team_leaderboard(&self, filter: &MatchFilter) -> Result<Table> {
        let key = CacheKey::new("team_leaderboard", &filter.key_params());
        self.tables
            .get_or_compute(key, || async {
                let board =
                    metrics::compute_team_leaderboard(&self.executor, &self.config, filter)
                        .await?;
                let mut t = Table::new("team_leaderboard", filter.clone());
                for summary in &board {
                    t.num(&summary.team, summary.win_pct);
                }
                Ok(t)
            })
            .await
    }

    pub async fn head_to_head(
        &self,
        team1: &str,
        team2: &str,
        filter: &MatchFilter,
    ) -> Result<Table> {
        let mut params = filter.key_params();
        params.push(("team1", team1.to_string()));
        params.push(("team2", team2.to_string()));
        let key = CacheKey::new("head_to_head", &params);
        self.tables
            .get_or_compute(key, || async {
                let m =
                    metrics::compute_head_to_head(&self.executor, team1, team2, filter).await?;
                Ok(m.to_table())
            })
            .await
    }

    pub async fn season_summary(&self, season: &Season) -> Result<Table> {
        let key = CacheKey::new("season_summary", &[("season", season.to_key())]);
        self.tables
            .get_or_compute(key, || async {
                let m = metrics::compute_season_summary(&self.executor, season).await?;
                Ok(m.to_table())
            })
            .await
    }

    pub async fn toss_impact(&self, filter: &MatchFilter) -> Result<Table> {
        let key = CacheKey::new("toss_impact", &filter.key_params());
        self.tables
            .get_or_compute(key, || async {
                let m = metrics::compute_toss_impact(&self.executor, filter).await?;
                Ok(m.to_table())
            })
            .await
    }

    /// Full-dataset quality report with component metrics and the weighted
    /// composite. Cached like any calculator; not parameter-scoped.
    pub async fn quality_report(&self) -> Result<QualityReport> {
        let key = CacheKey::new("quality_report", &[]);
        self.quality
            .get_or_compute(key, || async {
                quality::compute_quality_report(&self.executor, &self.quality_weights).await
            })
            .await
    }

    pub async fn quality_table(&self) -> Result<Table> {
        Ok(self.quality_report().await?.to_table())
    }

    /// Raw match listing for explorer-style views. Uncached; this is a
    /// passthrough, not a derived metric.
    pub async fn matches(&self, filter: &MatchFilter) -> Result<Vec<MatchRow>> {
        self.executor.validate(filter).await?;
        self.executor.matches(filter).await
    }

    // ── Cache administration ───────────────────────────────────────

    /// Drop every memoized result. The next call of each calculator goes
    /// back to the store.
    pub fn clear_cache(&self) {
        self.tables.clear();
        self.quality.clear();
        log::info!("result cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        let t = self.tables.stats();
        let q = self.quality.stats();
        CacheStats {
            hits: t.hits + q.hits,
            misses: t.misses + q.misses,
            entries: t.entries + q.entries,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::seed_basic_dataset;

    async fn fixture_engine() -> CricketDW {
        let db = Database::open_memory().await.unwrap();
        seed_basic_dataset(&db).await;
        CricketDW::new(db, EngineConfig::default())
    }

    #[tokio::test]
    async fn test_results_identical_with_and_without_cache() {
        let engine = fixture_engine().await;
        let filter = MatchFilter::new();

        let cold = engine.net_run_rate("Alpha", &filter).await.unwrap();
        let warm = engine.net_run_rate("Alpha", &filter).await.unwrap();
        engine.clear_cache();
        let recomputed = engine.net_run_rate("Alpha", &filter).await.unwrap();

        assert_eq!(cold, warm);
        assert_eq!(cold, recomputed);
    }

    #[tokio::test]
    async fn test_cache_serves_stored_result_until_cleared() {
        let engine = fixture_engine().await;
        let filter = MatchFilter::new();

        let before = engine.team_summary("Alpha", &filter).await.unwrap();
        assert_eq!(before.get("matches_played"), Some(&Cell::Int(4)));

        // a store refresh is invisible inside the TTL window
        engine
            .db()
            .writer()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO matches (match_id, season, match_date, venue, team1, team2, winner)
                     VALUES (6, '2024', '2024-05-20', 'Garden Oval', 'Alpha', 'Beta', 'Alpha')",
                    [],
                )
            })
            .await
            .unwrap();
        let cached = engine.team_summary("Alpha", &filter).await.unwrap();
        assert_eq!(cached, before);

        // an explicit clear picks up the refresh
        engine.clear_cache();
        let after = engine.team_summary("Alpha", &filter).await.unwrap();
        assert_eq!(after.get("matches_played"), Some(&Cell::Int(5)));
        assert_eq!(after.get("wins"), Some(&Cell::Int(3)));
    }

    #[tokio::test]
    async fn test_distinct_filters_do_not_share_entries() {
        let engine = fixture_engine().await;
        let alpha = engine.team_summary("Alpha", &MatchFilter::new()).await.unwrap();
        let beta = engine.team_summary("Beta", &MatchFilter::new()).await.unwrap();
        assert_ne!(alpha, beta);
        assert_eq!(beta.get("wins"), Some(&Cell::Int(1)));
    }

    #[tokio::test]
    async fn test_quality_report_and_table() {
        let engine = fixture_engine().await;
        let report = engine.quality_report().await.unwrap();
        assert_eq!(report.total_matches, 5);
        assert_eq!(report.matches_with_deliveries, 3);
        assert_eq!(report.null_venues, 1);
        assert_eq!(report.null_winners, 1);
        assert!(report.quality_score > 0.0 && report.quality_score < 100.0);

        let table = engine.quality_table().await.unwrap();
        assert_eq!(table.calculator, "quality_report");
        assert_eq!(table.get("total_matches"), Some(&Cell::Int(5)));
    }

    #[tokio::test]
    async fn test_invalid_parameter_not_cached() {
        let engine = fixture_engine().await;
        let err = engine
            .net_run_rate("Unknown XI", &MatchFilter::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
        assert_eq!(engine.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_leaderboard_table_shape() {
        let engine = fixture_engine().await;
        let table = engine.team_leaderboard(&MatchFilter::new()).await.unwrap();
        assert_eq!(table.columns, format::COLUMNS);
        // Alpha 2/4 leads Beta 1/4; Gamma has no decided matches
        assert_eq!(table.rows[0].metric, "Alpha");
        assert_eq!(table.get("Alpha"), Some(&Cell::Num(50.0)));
    }

    #[tokio::test]
    async fn test_matches_passthrough_validates() {
        let engine = fixture_engine().await;
        let rows = engine
            .matches(&MatchFilter::new().team("Alpha").limit(2))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let err = engine
            .matches(&MatchFilter::new().venue("Nowhere Field"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "venue", .. }));
    }
}
