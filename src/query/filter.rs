use chrono::NaiveDate;
use serde::Serialize;

use crate::query::season::Season;

/// Filter over the `matches` table, echoed back on every result for
/// traceability. An empty filter selects the full dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchFilter {
    pub team: Option<String>,
    pub season: Option<String>,
    pub venue: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl MatchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(mut self, team: &str) -> Self {
        self.team = Some(team.to_string());
        self
    }

    pub fn season(mut self, season: &Season) -> Self {
        self.season = Some(season.to_key());
        self
    }

    pub fn venue(mut self, venue: &str) -> Self {
        self.venue = Some(venue.to_string());
        self
    }

    pub fn date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn date_to(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Same filter without the team restriction; used where the team is
    /// applied to a different column than `matches.team1/team2`.
    pub fn without_team(&self) -> Self {
        let mut f = self.clone();
        f.team = None;
        f
    }

    /// Assemble WHERE clauses against a `matches m` alias, with numbered
    /// placeholders starting at `start_idx`. Returns the clauses and the
    /// bound values in order.
    pub(crate) fn build_where(&self, start_idx: usize) -> (Vec<String>, Vec<String>) {
        let mut clauses = Vec::new();
        let mut params: Vec<String> = Vec::new();
        let mut idx = start_idx;

        if let Some(ref team) = self.team {
            clauses.push(format!("(m.team1 = ?{idx} OR m.team2 = ?{idx})"));
            params.push(team.clone());
            idx += 1;
        }
        if let Some(ref season) = self.season {
            clauses.push(format!("m.season = ?{idx}"));
            params.push(season.clone());
            idx += 1;
        }
        if let Some(ref venue) = self.venue {
            clauses.push(format!("m.venue = ?{idx}"));
            params.push(venue.clone());
            idx += 1;
        }
        if let Some(date) = self.date_from {
            clauses.push(format!("m.match_date >= ?{idx}"));
            params.push(date.format("%Y-%m-%d").to_string());
            idx += 1;
        }
        if let Some(date) = self.date_to {
            clauses.push(format!("m.match_date <= ?{idx}"));
            params.push(date.format("%Y-%m-%d").to_string());
        }

        (clauses, params)
    }

    /// Normalized (name, value) pairs for cache keying. Ordering is fixed
    /// so equivalent filters always produce the same key.
    pub fn key_params(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(ref v) = self.team {
            out.push(("team", v.clone()));
        }
        if let Some(ref v) = self.season {
            out.push(("season", v.clone()));
        }
        if let Some(ref v) = self.venue {
            out.push(("venue", v.clone()));
        }
        if let Some(d) = self.date_from {
            out.push(("date_from", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = self.date_to {
            out.push(("date_to", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(n) = self.limit {
            out.push(("limit", n.to_string()));
        }
        out
    }
}
