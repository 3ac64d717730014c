use serde::Serialize;

use crate::error::Result;
use crate::query::executor::QueryExecutor;

/// Whole-dataset counts gathered by grouped aggregation (see
/// `QueryExecutor::quality_counts`). `unexplained_null_winners` excludes
/// matches whose margin marks a legitimate no-result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityCounts {
    pub total_matches: i64,
    pub matches_with_deliveries: i64,
    pub null_venues: i64,
    pub unexplained_null_winners: i64,
    pub seasons: i64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

/// Weighting policy for the composite score. The default leans on delivery
/// coverage; callers auditing or replacing the policy supply their own
/// weights without touching the component metrics.
#[derive(Debug, Clone, Serialize)]
pub struct QualityWeights {
    pub delivery_coverage: f64,
    pub venue_completeness: f64,
    pub winner_completeness: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            delivery_coverage: 0.7,
            venue_completeness: 0.15,
            winner_completeness: 0.15,
        }
    }
}

/// Component metrics plus the weighted composite, regenerated wholesale on
/// every computation.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub total_matches: u64,
    pub matches_with_deliveries: u64,
    pub matches_with_deliveries_pct: Option<f64>,
    pub null_venues: u64,
    pub null_winners: u64,
    pub seasons: u64,
    pub date_range: Option<(String, String)>,
    pub quality_score: f64,
}

/// Grade the dataset. Pure function of the counts so policies can be
/// compared side by side.
pub fn score(counts: &QualityCounts, weights: &QualityWeights) -> QualityReport {
    let total = counts.total_matches.max(0) as f64;

    let (coverage, venue_ok, winner_ok) = if total > 0.0 {
        (
            counts.matches_with_deliveries as f64 / total,
            1.0 - counts.null_venues as f64 / total,
            1.0 - counts.unexplained_null_winners as f64 / total,
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    let weight_sum =
        weights.delivery_coverage + weights.venue_completeness + weights.winner_completeness;
    let composite = if weight_sum > 0.0 {
        (weights.delivery_coverage * coverage
            + weights.venue_completeness * venue_ok
            + weights.winner_completeness * winner_ok)
            / weight_sum
    } else {
        0.0
    };
    let quality_score = (composite * 100.0).clamp(0.0, 100.0);

    let date_range = match (&counts.first_date, &counts.last_date) {
        (Some(first), Some(last)) => Some((first.clone(), last.clone())),
        _ => None,
    };

    QualityReport {
        total_matches: counts.total_matches.max(0) as u64,
        matches_with_deliveries: counts.matches_with_deliveries.max(0) as u64,
        matches_with_deliveries_pct: if total > 0.0 {
            Some(coverage * 100.0)
        } else {
            None
        },
        null_venues: counts.null_venues.max(0) as u64,
        null_winners: counts.unexplained_null_winners.max(0) as u64,
        seasons: counts.seasons.max(0) as u64,
        date_range,
        quality_score,
    }
}

/// Run the full-dataset quality pass. Not parameter-scoped; the one
/// full-history aggregate in the engine.
pub async fn compute_quality_report(
    exec: &QueryExecutor,
    weights: &QualityWeights,
) -> Result<QualityReport> {
    let counts = exec.quality_counts().await?;
    Ok(score(&counts, weights))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(
        total: i64,
        with_deliveries: i64,
        null_venues: i64,
        null_winners: i64,
    ) -> QualityCounts {
        QualityCounts {
            total_matches: total,
            matches_with_deliveries: with_deliveries,
            null_venues,
            unexplained_null_winners: null_winners,
            seasons: 1,
            first_date: Some("2024-04-01".into()),
            last_date: Some("2024-05-30".into()),
        }
    }

    #[test]
    fn test_complete_dataset_scores_100() {
        let report = score(&counts(60, 60, 0, 0), &QualityWeights::default());
        assert_eq!(report.quality_score, 100.0);
        assert_eq!(report.matches_with_deliveries_pct, Some(100.0));
        assert_eq!(
            report.date_range,
            Some(("2024-04-01".into(), "2024-05-30".into()))
        );
    }

    #[test]
    fn test_empty_dataset_scores_zero() {
        let report = score(&counts(0, 0, 0, 0), &QualityWeights::default());
        assert_eq!(report.quality_score, 0.0);
        assert_eq!(report.matches_with_deliveries_pct, None);
    }

    #[test]
    fn test_null_venue_never_raises_score() {
        // adding one null-venue match (with no deliveries) to a complete
        // dataset must not increase the composite
        let before = score(&counts(60, 60, 0, 0), &QualityWeights::default());
        let after = score(&counts(61, 60, 1, 0), &QualityWeights::default());
        assert!(after.quality_score < before.quality_score);
    }

    #[test]
    fn test_components_survive_weight_change() {
        let c = counts(100, 80, 5, 10);
        let default = score(&c, &QualityWeights::default());
        let coverage_only = score(
            &c,
            &QualityWeights {
                delivery_coverage: 1.0,
                venue_completeness: 0.0,
                winner_completeness: 0.0,
            },
        );
        // the composite moves, the components do not
        assert_eq!(default.null_venues, coverage_only.null_venues);
        assert_eq!(default.null_winners, coverage_only.null_winners);
        assert!((coverage_only.quality_score - 80.0).abs() < 1e-9);
        assert_ne!(default.quality_score, coverage_only.quality_score);
    }

    #[test]
    fn test_score_clamped() {
        // degenerate weights cannot push the score outside [0, 100]
        let report = score(
            &counts(10, 10, 0, 0),
            &QualityWeights {
                delivery_coverage: 1000.0,
                venue_completeness: 0.0,
                winner_completeness: 0.0,
            },
        );
        assert!(report.quality_score <= 100.0);
        let report = score(
            &counts(10, 0, 10, 10),
            &QualityWeights::default(),
        );
        assert!(report.quality_score >= 0.0);
    }
}
