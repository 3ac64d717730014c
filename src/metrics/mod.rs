pub mod types;

pub use types::*;

use std::collections::HashSet;

use crate::config::{EngineConfig, OversWindow};
use crate::error::{Error, Result};
use crate::query::executor::{
    InningsTotals, MatchRole, PhaseInnings, QueryExecutor, TeamRecordRow,
};
use crate::query::filter::MatchFilter;
use crate::query::season::Season;

/// Compute net run rate for a team over the filtered matches.
pub async fn compute_net_run_rate(
    exec: &QueryExecutor,
    config: &EngineConfig,
    team: &str,
    filter: &MatchFilter,
) -> Result<NrrMetrics> {
    let scoped = filter.clone().team(team);
    exec.validate(&scoped).await?;
    let rows = exec.innings_totals(&scoped).await?;
    Ok(fold_net_run_rate(team, &scoped, &rows, config.allotted_overs))
}

/// Compute powerplay or death-overs aggregates over the filtered matches.
/// A team in the filter restricts the batting side within the window.
pub async fn compute_phase_stats(
    exec: &QueryExecutor,
    config: &EngineConfig,
    phase: Phase,
    filter: &MatchFilter,
) -> Result<PhaseMetrics> {
    exec.validate(filter).await?;
    let window = match phase {
        Phase::Powerplay => config.powerplay_overs,
        Phase::DeathOvers => config.death_overs,
    };
    let rows = exec.phase_totals(filter, window).await?;
    Ok(fold_phase(phase, window, filter, &rows))
}

/// Compute win percentage batting first vs batting second for a team.
pub async fn compute_chase_vs_defend(
    exec: &QueryExecutor,
    team: &str,
    filter: &MatchFilter,
) -> Result<ChaseDefendMetrics> {
    let scoped = filter.clone().team(team);
    exec.validate(&scoped).await?;
    let roles = exec.match_roles(&scoped).await?;
    Ok(fold_chase_defend(team, &scoped, &roles))
}

/// Compute a single team's win/loss record.
pub async fn compute_team_summary(
    exec: &QueryExecutor,
    team: &str,
    filter: &MatchFilter,
) -> Result<TeamSummary> {
    let scoped = filter.clone().team(team);
    exec.validate(&scoped).await?;
    let records = exec.team_records(&scoped).await?;
    Ok(fold_team_summary(team, &scoped, &records))
}

/// Compute records for every team in the filtered matches, best win
/// percentage first, truncated to the configured leaderboard size.
pub async fn compute_team_leaderboard(
    exec: &QueryExecutor,
    config: &EngineConfig,
    filter: &MatchFilter,
) -> Result<Vec<TeamSummary>> {
    exec.validate(filter).await?;
    let records = exec.team_records(filter).await?;
    Ok(leaderboard_from_records(filter, &records, config.top_n))
}

/// Compute the head-to-head record for a pair of teams.
pub async fn compute_head_to_head(
    exec: &QueryExecutor,
    team1: &str,
    team2: &str,
    filter: &MatchFilter,
) -> Result<HeadToHeadMetrics> {
    if team1 == team2 {
        return Err(Error::invalid("team", "head-to-head requires two distinct teams"));
    }
    exec.ensure_team(team1).await?;
    exec.ensure_team(team2).await?;
    exec.validate(&filter.without_team()).await?;

    let counts = exec.head_to_head_counts(team1, team2, filter).await?;
    Ok(HeadToHeadMetrics {
        team1: team1.to_string(),
        team2: team2.to_string(),
        filter: filter.clone(),
        matches: counts.matches as u64,
        team1_wins: counts.team1_wins as u64,
        team2_wins: counts.team2_wins as u64,
        no_results: counts.no_results as u64,
    })
}

/// Compute one season's shape: volume, participants, venues, margins.
pub async fn compute_season_summary(
    exec: &QueryExecutor,
    season: &Season,
) -> Result<SeasonSummary> {
    let scoped = MatchFilter::new().season(season);
    exec.validate(&scoped).await?;
    let counts = exec.season_counts(&season.to_key()).await?;
    Ok(SeasonSummary {
        season: season.to_key(),
        matches: counts.matches as u64,
        teams: counts.teams as u64,
        venues: counts.venues as u64,
        avg_runs_margin: counts.avg_runs_margin,
        first_date: counts.first_date,
        last_date: counts.last_date,
    })
}

/// Compute how often the toss winner went on to win, over decided matches.
pub async fn compute_toss_impact(
    exec: &QueryExecutor,
    filter: &MatchFilter,
) -> Result<TossImpactMetrics> {
    exec.validate(filter).await?;
    let counts = exec.toss_counts(filter).await?;
    Ok(TossImpactMetrics {
        filter: filter.clone(),
        decided_matches: counts.decided as u64,
        toss_winner_wins: counts.toss_winner_wins as u64,
        toss_winner_win_pct: pct(counts.toss_winner_wins as u64, counts.decided as u64),
        bat_first_decisions: counts.bat_first_decisions as u64,
        field_first_decisions: counts.field_first_decisions as u64,
    })
}

// ── Pure folds ─────────────────────────────────────────────────────
// Everything below is a function of rows + parameters, unit-testable
// without a store.

/// Decimal overs for an innings. A side bowled out before its full
/// allotment is charged the full allotment, per the standings convention
/// that penalizes conceding quickly.
fn effective_overs(legal_balls: i64, wickets: i64, allotted_overs: u32) -> f64 {
    if wickets >= 10 {
        f64::from(allotted_overs)
    } else {
        legal_balls as f64 / 6.0
    }
}

fn pct(num: u64, den: u64) -> Option<f64> {
    if den > 0 {
        Some(num as f64 / den as f64 * 100.0)
    } else {
        None
    }
}

fn rate(runs: i64, overs: f64) -> Option<f64> {
    if overs > 0.0 {
        Some(runs as f64 / overs)
    } else {
        None
    }
}

pub fn fold_net_run_rate(
    team: &str,
    filter: &MatchFilter,
    rows: &[InningsTotals],
    allotted_overs: u32,
) -> NrrMetrics {
    let mut matches: HashSet<i64> = HashSet::new();
    let mut runs_scored = 0i64;
    let mut overs_faced = 0.0f64;
    let mut runs_conceded = 0i64;
    let mut overs_bowled = 0.0f64;

    for row in rows {
        if row.batting_team == team {
            matches.insert(row.match_id);
            runs_scored += row.runs;
            overs_faced += effective_overs(row.legal_balls, row.wickets, allotted_overs);
        } else if row.bowling_team == team {
            matches.insert(row.match_id);
            runs_conceded += row.runs;
            overs_bowled += effective_overs(row.legal_balls, row.wickets, allotted_overs);
        }
    }

    let scoring_rate = rate(runs_scored, overs_faced);
    let concession_rate = rate(runs_conceded, overs_bowled);
    // Undefined when either side of the differential has no overs; never
    // infinity or NaN.
    let nrr = match (scoring_rate, concession_rate) {
        (Some(s), Some(c)) => Some(s - c),
        _ => None,
    };

    NrrMetrics {
        team: team.to_string(),
        filter: filter.clone(),
        matches: matches.len() as u64,
        runs_scored,
        overs_faced,
        runs_conceded,
        overs_bowled,
        scoring_rate,
        concession_rate,
        nrr,
    }
}

pub fn fold_phase(
    phase: Phase,
    window: OversWindow,
    filter: &MatchFilter,
    rows: &[PhaseInnings],
) -> PhaseMetrics {
    let innings = rows.len() as u64;
    let runs: i64 = rows.iter().map(|r| r.runs).sum();
    let wickets: i64 = rows.iter().map(|r| r.wickets).sum();
    let legal_balls: i64 = rows.iter().map(|r| r.legal_balls).sum();

    let avg_runs_per_innings = if innings > 0 {
        Some(runs as f64 / innings as f64)
    } else {
        None
    };
    let run_rate = rate(runs, legal_balls as f64 / 6.0);

    PhaseMetrics {
        phase,
        window: window.label(),
        filter: filter.clone(),
        innings,
        runs,
        wickets,
        avg_runs_per_innings,
        run_rate,
    }
}

pub fn fold_chase_defend(
    team: &str,
    filter: &MatchFilter,
    roles: &[MatchRole],
) -> ChaseDefendMetrics {
    let mut defend_matches = 0u64;
    let mut defend_wins = 0u64;
    let mut chase_matches = 0u64;
    let mut chase_wins = 0u64;
    let mut no_results = 0u64;

    for role in roles {
        let winner = match role.winner.as_deref() {
            // Abandoned/no-result matches count in neither numerator nor
            // denominator.
            None => {
                no_results += 1;
                continue;
            }
            Some(w) => w,
        };
        if role.first_batting == team {
            defend_matches += 1;
            if winner == team {
                defend_wins += 1;
            }
        } else {
            chase_matches += 1;
            if winner == team {
                chase_wins += 1;
            }
        }
    }

    ChaseDefendMetrics {
        team: team.to_string(),
        filter: filter.clone(),
        defend_matches,
        defend_wins,
        chase_matches,
        chase_wins,
        no_results,
        defend_win_pct: pct(defend_wins, defend_matches),
        chase_win_pct: pct(chase_wins, chase_matches),
    }
}

pub fn fold_team_summary(
    team: &str,
    filter: &MatchFilter,
    records: &[TeamRecordRow],
) -> TeamSummary {
    let record = records.iter().find(|r| r.team == team);
    match record {
        Some(r) => TeamSummary {
            team: team.to_string(),
            filter: filter.clone(),
            matches_played: r.played as u64,
            wins: r.wins as u64,
            losses: r.losses as u64,
            no_results: r.no_results as u64,
            win_pct: pct(r.wins as u64, r.played as u64),
        },
        None => TeamSummary {
            team: team.to_string(),
            filter: filter.clone(),
            matches_played: 0,
            wins: 0,
            losses: 0,
            no_results: 0,
            win_pct: None,
        },
    }
}

pub fn leaderboard_from_records(
    filter: &MatchFilter,
    records: &[TeamRecordRow],
    top_n: usize,
) -> Vec<TeamSummary> {
    let mut summaries: Vec<TeamSummary> = records
        .iter()
        .map(|r| fold_team_summary(&r.team, filter, std::slice::from_ref(r)))
        .collect();
    summaries.sort_by(|a, b| {
        b.win_pct
            .unwrap_or(-1.0)
            .partial_cmp(&a.win_pct.unwrap_or(-1.0))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.wins.cmp(&a.wins))
            .then(a.team.cmp(&b.team))
    });
    summaries.truncate(top_n);
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::storage::Database;
    use crate::test_fixtures::{seed_basic_dataset, seed_innings};

    fn innings(
        match_id: i64,
        inning: i64,
        batting: &str,
        bowling: &str,
        runs: i64,
        legal_balls: i64,
        wickets: i64,
    ) -> InningsTotals {
        InningsTotals {
            match_id,
            inning,
            batting_team: batting.to_string(),
            bowling_team: bowling.to_string(),
            runs,
            legal_balls,
            wickets,
        }
    }

    fn role(match_id: i64, winner: Option<&str>, first_batting: &str) -> MatchRole {
        MatchRole {
            match_id,
            winner: winner.map(|w| w.to_string()),
            first_batting: first_batting.to_string(),
        }
    }

    #[test]
    fn test_nrr_basic_differential() {
        // 180 off 20 overs for, 150 off 20 overs against
        let rows = vec![
            innings(1, 1, "A", "B", 180, 120, 6),
            innings(1, 2, "B", "A", 150, 120, 7),
        ];
        let m = fold_net_run_rate("A", &MatchFilter::new(), &rows, 20);
        assert_eq!(m.matches, 1);
        assert_eq!(m.runs_scored, 180);
        assert_eq!(m.runs_conceded, 150);
        assert_eq!(m.nrr, Some(1.5));
    }

    #[test]
    fn test_nrr_partial_overs_fractional() {
        // 95 balls = 15.833... overs, not rounded
        let rows = vec![
            innings(1, 1, "A", "B", 120, 95, 4),
            innings(1, 2, "B", "A", 121, 93, 3),
        ];
        let m = fold_net_run_rate("A", &MatchFilter::new(), &rows, 20);
        assert!((m.overs_faced - 95.0 / 6.0).abs() < 1e-9);
        assert!((m.overs_bowled - 93.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_nrr_all_out_uses_full_allotment() {
        // Opposition bowled out in 18.3 overs (111 balls): conceded runs
        // divide by the full 20, not 18.5.
        let rows = vec![
            innings(1, 1, "B", "A", 140, 111, 10),
            innings(1, 2, "A", "B", 141, 100, 2),
        ];
        let m = fold_net_run_rate("A", &MatchFilter::new(), &rows, 20);
        assert_eq!(m.overs_bowled, 20.0);
        assert_eq!(m.concession_rate, Some(7.0));
        // A's own innings was not all out, so its actual balls count
        assert!((m.overs_faced - 100.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_nrr_all_out_applies_to_batting_side_too() {
        let rows = vec![innings(1, 1, "A", "B", 90, 80, 10)];
        let m = fold_net_run_rate("A", &MatchFilter::new(), &rows, 20);
        assert_eq!(m.overs_faced, 20.0);
        // never bowled: differential is undefined, not infinite
        assert_eq!(m.overs_bowled, 0.0);
        assert_eq!(m.nrr, None);
        assert_eq!(m.scoring_rate, Some(4.5));
        assert_eq!(m.concession_rate, None);
    }

    #[test]
    fn test_nrr_empty_rows_insufficient_data() {
        let m = fold_net_run_rate("A", &MatchFilter::new(), &[], 20);
        assert_eq!(m.matches, 0);
        assert_eq!(m.nrr, None);
        assert_eq!(m.scoring_rate, None);
        assert_eq!(m.concession_rate, None);
    }

    #[test]
    fn test_phase_fold_empty_is_insufficient() {
        let m = fold_phase(
            Phase::Powerplay,
            OversWindow::new(1, 6),
            &MatchFilter::new(),
            &[],
        );
        assert_eq!(m.innings, 0);
        assert_eq!(m.runs, 0);
        assert_eq!(m.avg_runs_per_innings, None);
        assert_eq!(m.run_rate, None);
    }

    #[test]
    fn test_phase_fold_averages() {
        let rows = vec![
            PhaseInnings {
                match_id: 1,
                inning: 1,
                batting_team: "A".into(),
                runs: 54,
                legal_balls: 36,
                wickets: 1,
            },
            PhaseInnings {
                match_id: 2,
                inning: 1,
                batting_team: "A".into(),
                runs: 42,
                legal_balls: 36,
                wickets: 2,
            },
        ];
        let m = fold_phase(
            Phase::Powerplay,
            OversWindow::new(1, 6),
            &MatchFilter::new(),
            &rows,
        );
        assert_eq!(m.innings, 2);
        assert_eq!(m.runs, 96);
        assert_eq!(m.wickets, 3);
        assert_eq!(m.avg_runs_per_innings, Some(48.0));
        assert_eq!(m.run_rate, Some(8.0));
    }

    #[test]
    fn test_chase_defend_scenario() {
        // 2 wins batting first, 1 loss batting second
        let roles = vec![
            role(1, Some("A"), "A"),
            role(2, Some("A"), "A"),
            role(3, Some("B"), "B"),
        ];
        let m = fold_chase_defend("A", &MatchFilter::new(), &roles);
        assert_eq!(m.defend_matches, 2);
        assert_eq!(m.defend_wins, 2);
        assert_eq!(m.defend_win_pct, Some(100.0));
        assert_eq!(m.chase_matches, 1);
        assert_eq!(m.chase_wins, 0);
        assert_eq!(m.chase_win_pct, Some(0.0));
    }

    #[test]
    fn test_chase_defend_excludes_no_results() {
        let decided = vec![
            role(1, Some("A"), "A"),
            role(2, Some("A"), "A"),
            role(3, Some("B"), "B"),
        ];
        let with_washout = {
            let mut r = decided.clone();
            r.push(role(4, None, "A"));
            r
        };
        let base = fold_chase_defend("A", &MatchFilter::new(), &decided);
        let m = fold_chase_defend("A", &MatchFilter::new(), &with_washout);
        // role totals unaffected by the abandoned match
        assert_eq!(m.defend_matches, base.defend_matches);
        assert_eq!(m.chase_matches, base.chase_matches);
        assert_eq!(m.defend_win_pct, base.defend_win_pct);
        assert_eq!(m.no_results, 1);
    }

    #[test]
    fn test_chase_defend_no_decided_matches() {
        let roles = vec![role(1, None, "A")];
        let m = fold_chase_defend("A", &MatchFilter::new(), &roles);
        assert_eq!(m.defend_win_pct, None);
        assert_eq!(m.chase_win_pct, None);
    }

    #[test]
    fn test_team_summary_absent_team_has_no_rate() {
        let m = fold_team_summary("A", &MatchFilter::new(), &[]);
        assert_eq!(m.matches_played, 0);
        assert_eq!(m.win_pct, None);
    }

    #[test]
    fn test_leaderboard_sorted_and_truncated() {
        let records = vec![
            TeamRecordRow {
                team: "A".into(),
                played: 10,
                wins: 6,
                losses: 4,
                no_results: 0,
            },
            TeamRecordRow {
                team: "B".into(),
                played: 10,
                wins: 8,
                losses: 2,
                no_results: 0,
            },
            TeamRecordRow {
                team: "C".into(),
                played: 10,
                wins: 2,
                losses: 8,
                no_results: 0,
            },
        ];
        let board = leaderboard_from_records(&MatchFilter::new(), &records, 2);
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].team, "B");
        assert_eq!(board[1].team, "A");
    }

    // ── Store-backed calculator tests ──────────────────────────────

    async fn fixture_executor() -> QueryExecutor {
        let db = Database::open_memory().await.unwrap();
        seed_basic_dataset(&db).await;
        QueryExecutor::new(db, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_compute_nrr_over_fixture() {
        let exec = fixture_executor().await;
        let cfg = EngineConfig::default();
        let m = compute_net_run_rate(&exec, &cfg, "Alpha", &MatchFilter::new())
            .await
            .unwrap();
        // scored 180+150+130 over 60 overs; conceded 150+140+140 over 60
        assert_eq!(m.matches, 3);
        assert_eq!(m.runs_scored, 460);
        assert_eq!(m.runs_conceded, 430);
        assert!((m.nrr.unwrap() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_compute_nrr_unknown_team_fails_fast() {
        let exec = fixture_executor().await;
        let cfg = EngineConfig::default();
        let err = compute_net_run_rate(&exec, &cfg, "Nairobi", &MatchFilter::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "team", .. }));
    }

    #[tokio::test]
    async fn test_compute_chase_defend_over_fixture() {
        let exec = fixture_executor().await;
        let m = compute_chase_vs_defend(&exec, "Alpha", &MatchFilter::new())
            .await
            .unwrap();
        assert_eq!(m.defend_matches, 2);
        assert_eq!(m.defend_win_pct, Some(100.0));
        assert_eq!(m.chase_matches, 1);
        assert_eq!(m.chase_win_pct, Some(0.0));
    }

    #[tokio::test]
    async fn test_powerplay_excludes_later_overs() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO matches (match_id, season, match_date, venue, team1, team2, winner)
                     VALUES (10, '2024', '2024-04-20', 'Fort Ground', 'Xray', 'Yankee', 'Xray')",
                    [],
                )?;
                // 8 runs per over in overs 1-6, a 20-run burst in over 7,
                // 12 per over at the death
                for over in 1..=6 {
                    seed_over(conn, 10, 1, "Xray", "Yankee", over, 8, 0)?;
                }
                seed_over(conn, 10, 1, "Xray", "Yankee", 7, 20, 0)?;
                for over in 16..=20 {
                    seed_over(conn, 10, 1, "Xray", "Yankee", over, 12, 1)?;
                }
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        let exec = QueryExecutor::new(db, Duration::from_secs(5));
        let cfg = EngineConfig::default();

        let pp = compute_phase_stats(&exec, &cfg, Phase::Powerplay, &MatchFilter::new().team("Xray"))
            .await
            .unwrap();
        assert_eq!(pp.runs, 48);
        assert_eq!(pp.innings, 1);
        assert_eq!(pp.run_rate, Some(8.0));

        let death =
            compute_phase_stats(&exec, &cfg, Phase::DeathOvers, &MatchFilter::new().team("Xray"))
                .await
                .unwrap();
        assert_eq!(death.runs, 60);
        assert_eq!(death.wickets, 5);
        assert_eq!(death.run_rate, Some(12.0));
    }

    #[tokio::test]
    async fn test_compute_head_to_head() {
        let exec = fixture_executor().await;
        let m = compute_head_to_head(&exec, "Alpha", "Beta", &MatchFilter::new())
            .await
            .unwrap();
        assert_eq!(m.matches, 3);
        assert_eq!(m.team1_wins, 2);
        assert_eq!(m.team2_wins, 1);
        assert_eq!(m.no_results, 0);

        let err = compute_head_to_head(&exec, "Alpha", "Alpha", &MatchFilter::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn test_compute_season_summary() {
        let exec = fixture_executor().await;
        let season = Season::parse("2024").unwrap();
        let m = compute_season_summary(&exec, &season).await.unwrap();
        assert_eq!(m.matches, 5);
        assert_eq!(m.teams, 3);
        assert_eq!(m.first_date.as_deref(), Some("2024-04-01"));
    }

    #[tokio::test]
    async fn test_compute_toss_impact() {
        let exec = fixture_executor().await;
        let m = compute_toss_impact(&exec, &MatchFilter::new()).await.unwrap();
        // fixture: 3 decided matches with toss data, toss winner won 2
        assert_eq!(m.decided_matches, 3);
        assert_eq!(m.toss_winner_wins, 2);
        assert!((m.toss_winner_win_pct.unwrap() - 200.0 / 3.0).abs() < 1e-9);
    }

    /// Insert one over as six legal balls, runs on the first ball, an
    /// optional wicket on the last.
    fn seed_over(
        conn: &rusqlite::Connection,
        match_id: i64,
        inning: i64,
        batting: &str,
        bowling: &str,
        over: i64,
        runs: i64,
        wickets: i64,
    ) -> rusqlite::Result<()> {
        for ball in 1..=6 {
            let runs_off_bat = if ball == 1 { runs } else { 0 };
            let wicket_type = if ball == 6 && wickets > 0 {
                Some("bowled")
            } else {
                None
            };
            conn.execute(
                "INSERT INTO deliveries (match_id, inning, over, ball, batting_team, bowling_team,
                                         runs_off_bat, extras, wides, noballs, wicket_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, 0, ?8)",
                rusqlite::params![match_id, inning, over, ball, batting, bowling, runs_off_bat, wicket_type],
            )?;
        }
        Ok(())
    }

    // keep the shared seeder linked so fixture drift shows up here too
    #[tokio::test]
    async fn test_fixture_innings_shape() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO matches (match_id, season, team1, team2) VALUES (1, '2024', 'A', 'B')",
                    [],
                )?;
                seed_innings(conn, 1, 1, "A", "B", 100, 120, 3)?;
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();
        let exec = QueryExecutor::new(db, Duration::from_secs(5));
        let rows = exec.innings_totals(&MatchFilter::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].runs, 100);
        assert_eq!(rows[0].legal_balls, 120);
        assert_eq!(rows[0].wickets, 3);
    }
}
