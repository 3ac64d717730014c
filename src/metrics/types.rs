use serde::Serialize;

use crate::query::filter::MatchFilter;

/// Net run rate for one team over a filtered set of matches.
///
/// Rates are `None` when the underlying denominator is zero — the
/// insufficient-data state, distinct from a computed 0.0.
#[derive(Debug, Clone, Serialize)]
pub struct NrrMetrics {
    pub team: String,
    pub filter: MatchFilter,
    pub matches: u64,
    pub runs_scored: i64,
    pub overs_faced: f64,
    pub runs_conceded: i64,
    pub overs_bowled: f64,
    pub scoring_rate: Option<f64>,
    pub concession_rate: Option<f64>,
    pub nrr: Option<f64>,
}

/// Which innings window a phase aggregate covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Powerplay,
    DeathOvers,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Powerplay => "powerplay",
            Phase::DeathOvers => "death_overs",
        }
    }
}

/// Aggregate scoring inside an overs window (powerplay or death overs).
#[derive(Debug, Clone, Serialize)]
pub struct PhaseMetrics {
    pub phase: Phase,
    pub window: String,
    pub filter: MatchFilter,
    pub innings: u64,
    pub runs: i64,
    pub wickets: i64,
    pub avg_runs_per_innings: Option<f64>,
    pub run_rate: Option<f64>,
}

/// Win percentage split by batting role. Matches with no recorded winner
/// sit in `no_results` and are excluded from both rate denominators.
#[derive(Debug, Clone, Serialize)]
pub struct ChaseDefendMetrics {
    pub team: String,
    pub filter: MatchFilter,
    pub defend_matches: u64,
    pub defend_wins: u64,
    pub chase_matches: u64,
    pub chase_wins: u64,
    pub no_results: u64,
    pub defend_win_pct: Option<f64>,
    pub chase_win_pct: Option<f64>,
}

/// Overall record for one team.
#[derive(Debug, Clone, Serialize)]
pub struct TeamSummary {
    pub team: String,
    pub filter: MatchFilter,
    pub matches_played: u64,
    pub wins: u64,
    pub losses: u64,
    pub no_results: u64,
    pub win_pct: Option<f64>,
}

/// Head-to-head record for a pair of teams.
#[derive(Debug, Clone, Serialize)]
pub struct HeadToHeadMetrics {
    pub team1: String,
    pub team2: String,
    pub filter: MatchFilter,
    pub matches: u64,
    pub team1_wins: u64,
    pub team2_wins: u64,
    pub no_results: u64,
}

/// One season's shape: volume, participants, venues, margins.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonSummary {
    pub season: String,
    pub matches: u64,
    pub teams: u64,
    pub venues: u64,
    pub avg_runs_margin: Option<f64>,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

/// Share of decided matches won by the side that won the toss.
#[derive(Debug, Clone, Serialize)]
pub struct TossImpactMetrics {
    pub filter: MatchFilter,
    pub decided_matches: u64,
    pub toss_winner_wins: u64,
    pub toss_winner_win_pct: Option<f64>,
    pub bat_first_decisions: u64,
    pub field_first_decisions: u64,
}
