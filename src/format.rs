//! Normalizes calculator output into one stable tabular shape.
//!
//! Every calculator renders to the same two columns, so export and chart
//! consumers never branch on which calculator produced a table and never
//! see raw query column names. Rates are rounded to two decimals here and
//! only here; calculators keep full precision.

use serde::Serialize;

use crate::metrics::{
    ChaseDefendMetrics, HeadToHeadMetrics, NrrMetrics, PhaseMetrics, SeasonSummary,
    TeamSummary, TossImpactMetrics,
};
use crate::quality::QualityReport;
use crate::query::filter::MatchFilter;

/// Fixed column set shared by every formatted table.
pub const COLUMNS: [&str; 2] = ["metric", "value"];

/// A single formatted value. `Null` is the insufficient-data marker,
/// distinct from a numeric zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Int(i64),
    Num(f64),
    Null,
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Int(n) => write!(f, "{n}"),
            Cell::Num(n) => write!(f, "{n:.2}"),
            Cell::Null => write!(f, "insufficient data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub metric: String,
    pub value: Cell,
}

/// The engine's normalized output shape: which calculator ran, the filter
/// parameters it ran with, and metric/value rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub calculator: &'static str,
    pub filter: MatchFilter,
    pub columns: [&'static str; 2],
    pub rows: Vec<Row>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl Table {
    pub fn new(calculator: &'static str, filter: MatchFilter) -> Self {
        Self {
            calculator,
            filter,
            columns: COLUMNS,
            rows: Vec::new(),
        }
    }

    pub fn text(&mut self, metric: &str, value: impl Into<String>) {
        self.rows.push(Row {
            metric: metric.to_string(),
            value: Cell::Text(value.into()),
        });
    }

    pub fn int(&mut self, metric: &str, value: i64) {
        self.rows.push(Row {
            metric: metric.to_string(),
            value: Cell::Int(value),
        });
    }

    /// Push a rate-like value at fixed two-decimal precision, or the
    /// insufficient-data marker.
    pub fn num(&mut self, metric: &str, value: Option<f64>) {
        self.rows.push(Row {
            metric: metric.to_string(),
            value: match value {
                Some(v) => Cell::Num(round2(v)),
                None => Cell::Null,
            },
        });
    }

    pub fn get(&self, metric: &str) -> Option<&Cell> {
        self.rows
            .iter()
            .find(|r| r.metric == metric)
            .map(|r| &r.value)
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::Error::Other(e.to_string()))
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("metric,value\n");
        for row in &self.rows {
            let value = match &row.value {
                Cell::Null => String::new(),
                other => other.to_string(),
            };
            out.push_str(&format!(
                "{},{}\n",
                csv_escape(&row.metric),
                csv_escape(&value)
            ));
        }
        out
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// The formatter seam: anything the engine serves converts to the one
/// table shape here.
pub trait Tabular {
    fn to_table(&self) -> Table;
}

impl Tabular for NrrMetrics {
    fn to_table(&self) -> Table {
        let mut t = Table::new("net_run_rate", self.filter.clone());
        t.text("team", &self.team);
        t.int("matches", self.matches as i64);
        t.int("runs_scored", self.runs_scored);
        t.num("overs_faced", Some(self.overs_faced));
        t.int("runs_conceded", self.runs_conceded);
        t.num("overs_bowled", Some(self.overs_bowled));
        t.num("scoring_rate", self.scoring_rate);
        t.num("concession_rate", self.concession_rate);
        t.num("net_run_rate", self.nrr);
        t
    }
}

impl Tabular for PhaseMetrics {
    fn to_table(&self) -> Table {
        let mut t = Table::new(self.phase.name(), self.filter.clone());
        t.text("window", &self.window);
        t.int("innings", self.innings as i64);
        t.int("runs", self.runs);
        t.int("wickets", self.wickets);
        t.num("avg_runs_per_innings", self.avg_runs_per_innings);
        t.num("run_rate", self.run_rate);
        t
    }
}

impl Tabular for ChaseDefendMetrics {
    fn to_table(&self) -> Table {
        let mut t = Table::new("chase_vs_defend", self.filter.clone());
        t.text("team", &self.team);
        t.int("defend_matches", self.defend_matches as i64);
        t.int("defend_wins", self.defend_wins as i64);
        t.num("defend_win_pct", self.defend_win_pct);
        t.int("chase_matches", self.chase_matches as i64);
        t.int("chase_wins", self.chase_wins as i64);
        t.num("chase_win_pct", self.chase_win_pct);
        t.int("no_results", self.no_results as i64);
        t
    }
}

impl Tabular for TeamSummary {
    fn to_table(&self) -> Table {
        let mut t = Table::new("team_summary", self.filter.clone());
        t.text("team", &self.team);
        t.int("matches_played", self.matches_played as i64);
        t.int("wins", self.wins as i64);
        t.int("losses", self.losses as i64);
        t.int("no_results", self.no_results as i64);
        t.num("win_pct", self.win_pct);
        t
    }
}

impl Tabular for HeadToHeadMetrics {
    fn to_table(&self) -> Table {
        let mut t = Table::new("head_to_head", self.filter.clone());
        t.text("team1", &self.team1);
        t.text("team2", &self.team2);
        t.int("matches", self.matches as i64);
        t.int("team1_wins", self.team1_wins as i64);
        t.int("team2_wins", self.team2_wins as i64);
        t.int("no_results", self.no_results as i64);
        t
    }
}

impl Tabular for SeasonSummary {
    fn to_table(&self) -> Table {
        let mut t = Table::new("season_summary", MatchFilter::new());
        t.text("season", &self.season);
        t.int("matches", self.matches as i64);
        t.int("teams", self.teams as i64);
        t.int("venues", self.venues as i64);
        t.num("avg_runs_margin", self.avg_runs_margin);
        match &self.first_date {
            Some(d) => t.text("first_match", d),
            None => t.num("first_match", None),
        }
        match &self.last_date {
            Some(d) => t.text("last_match", d),
            None => t.num("last_match", None),
        }
        t
    }
}

impl Tabular for TossImpactMetrics {
    fn to_table(&self) -> Table {
        let mut t = Table::new("toss_impact", self.filter.clone());
        t.int("decided_matches", self.decided_matches as i64);
        t.int("toss_winner_wins", self.toss_winner_wins as i64);
        t.num("toss_winner_win_pct", self.toss_winner_win_pct);
        t.int("bat_first_decisions", self.bat_first_decisions as i64);
        t.int("field_first_decisions", self.field_first_decisions as i64);
        t
    }
}

impl Tabular for QualityReport {
    fn to_table(&self) -> Table {
        let mut t = Table::new("quality_report", MatchFilter::new());
        t.int("total_matches", self.total_matches as i64);
        t.int("matches_with_deliveries", self.matches_with_deliveries as i64);
        t.num("matches_with_deliveries_pct", self.matches_with_deliveries_pct);
        t.int("null_venues", self.null_venues as i64);
        t.int("null_winners", self.null_winners as i64);
        t.int("seasons", self.seasons as i64);
        match &self.date_range {
            Some((first, last)) => t.text("date_range", format!("{first}..{last}")),
            None => t.num("date_range", None),
        }
        t.num("quality_score", Some(self.quality_score));
        t
    }
}
