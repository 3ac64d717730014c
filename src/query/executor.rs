use std::time::Duration;

use rusqlite::params_from_iter;
use serde::Serialize;

use crate::config::OversWindow;
use crate::error::{Error, Result};
use crate::query::filter::MatchFilter;
use crate::quality::QualityCounts;
use crate::storage::{repository, Database};

/// A row from the `matches` table with raw column values resolved.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRow {
    pub match_id: i64,
    pub season: String,
    pub match_date: Option<String>,
    pub venue: Option<String>,
    pub team1: String,
    pub team2: String,
    pub winner: Option<String>,
    pub margin_type: Option<String>,
    pub margin_value: Option<i64>,
    pub toss_winner: Option<String>,
    pub toss_decision: Option<String>,
}

/// Per-innings aggregate used by the NRR calculator. `legal_balls` counts
/// deliveries with no wide or no-ball; retirements do not count as wickets.
#[derive(Debug, Clone, PartialEq)]
pub struct InningsTotals {
    pub match_id: i64,
    pub inning: i64,
    pub batting_team: String,
    pub bowling_team: String,
    pub runs: i64,
    pub legal_balls: i64,
    pub wickets: i64,
}

/// Per-innings aggregate restricted to an overs window.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseInnings {
    pub match_id: i64,
    pub inning: i64,
    pub batting_team: String,
    pub runs: i64,
    pub legal_balls: i64,
    pub wickets: i64,
}

/// Winner plus which side batted first, for role partitioning.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRole {
    pub match_id: i64,
    pub winner: Option<String>,
    pub first_batting: String,
}

/// One team's win/loss record over the filtered matches.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamRecordRow {
    pub team: String,
    pub played: i64,
    pub wins: i64,
    pub losses: i64,
    pub no_results: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadToHeadCounts {
    pub matches: i64,
    pub team1_wins: i64,
    pub team2_wins: i64,
    pub no_results: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonCounts {
    pub matches: i64,
    pub teams: i64,
    pub venues: i64,
    pub avg_runs_margin: Option<f64>,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TossCounts {
    pub decided: i64,
    pub toss_winner_wins: i64,
    pub bat_first_decisions: i64,
    pub field_first_decisions: i64,
}

/// Margin types that mark a match legitimately without a winner. A NULL
/// winner on any other margin is a data defect the quality scorer counts.
const NO_RESULT_MARGINS: &str = "('no result', 'abandoned', 'tie')";

/// Runs parameterized aggregation queries on the reader connection.
/// Every store call is bounded by a timeout and every failure is folded
/// into the typed error taxonomy; raw `rusqlite` errors never escape.
#[derive(Clone)]
pub struct QueryExecutor {
    db: Database,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(db: Database, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Connection) -> std::result::Result<T, rusqlite::Error>
            + Send
            + 'static,
        T: Send + 'static,
    {
        let fut = self.db.reader().call(move |conn| f(conn));
        match tokio::time::timeout(self.timeout, fut).await {
            Err(_) => Err(Error::StoreUnavailable(format!(
                "store call exceeded {}s timeout",
                self.timeout.as_secs()
            ))),
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(translate_store_error(&e.to_string())),
        }
    }

    // ── Parameter validation ───────────────────────────────────────

    /// Check every supplied filter value against the known domains before
    /// running any aggregation. Out-of-domain values fail as
    /// `InvalidParameter` without touching the aggregate queries.
    pub async fn validate(&self, filter: &MatchFilter) -> Result<()> {
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
            if from > to {
                return Err(Error::invalid(
                    "date_range",
                    format!("start {from} is after end {to}"),
                ));
            }
        }

        let filter = filter.clone();
        let issue = self
            .run(move |conn| {
                if let Some(ref team) = filter.team {
                    if !repository::team_exists(conn, team)? {
                        return Ok(Some(("team", format!("unknown team: {team}"))));
                    }
                }
                if let Some(ref season) = filter.season {
                    if !repository::season_exists(conn, season)? {
                        return Ok(Some(("season", format!("unknown season: {season}"))));
                    }
                }
                if let Some(ref venue) = filter.venue {
                    if !repository::venue_exists(conn, venue)? {
                        return Ok(Some(("venue", format!("unknown venue: {venue}"))));
                    }
                }
                Ok(None)
            })
            .await?;

        match issue {
            None => Ok(()),
            Some((name, message)) => Err(Error::InvalidParameter { name, message }),
        }
    }

    /// Validate a team name outside of a filter (head-to-head opponents).
    pub async fn ensure_team(&self, team: &str) -> Result<()> {
        let name = team.to_string();
        let exists = self
            .run(move |conn| repository::team_exists(conn, &name))
            .await?;
        if exists {
            Ok(())
        } else {
            Err(Error::invalid("team", format!("unknown team: {team}")))
        }
    }

    // ── Aggregation queries ────────────────────────────────────────

    pub async fn matches(&self, filter: &MatchFilter) -> Result<Vec<MatchRow>> {
        let (clauses, params) = filter.build_where(1);
        let mut sql = String::from(
            "SELECT m.match_id, m.season, m.match_date, m.venue, m.team1, m.team2,
                    m.winner, m.margin_type, m.margin_value, m.toss_winner, m.toss_decision
             FROM matches m",
        );
        push_where(&mut sql, &clauses);
        sql.push_str(" ORDER BY m.match_date DESC, m.match_id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                Ok(MatchRow {
                    match_id: row.get(0)?,
                    season: row.get(1)?,
                    match_date: row.get(2)?,
                    venue: row.get(3)?,
                    team1: row.get(4)?,
                    team2: row.get(5)?,
                    winner: row.get(6)?,
                    margin_type: row.get(7)?,
                    margin_value: row.get(8)?,
                    toss_winner: row.get(9)?,
                    toss_decision: row.get(10)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    /// One row per (match, innings) with runs, legal balls, and wickets,
    /// grouped store-side so the calculators fold small inputs.
    pub async fn innings_totals(&self, filter: &MatchFilter) -> Result<Vec<InningsTotals>> {
        let (clauses, params) = filter.build_where(1);
        let mut sql = String::from(
            "SELECT d.match_id, d.inning, d.batting_team, d.bowling_team,
                    SUM(d.runs_off_bat + d.extras) AS runs,
                    SUM(CASE WHEN d.wides = 0 AND d.noballs = 0 THEN 1 ELSE 0 END) AS legal_balls,
                    SUM(CASE WHEN d.wicket_type IS NOT NULL AND d.wicket_type != 'retired hurt'
                             THEN 1 ELSE 0 END) AS wickets
             FROM deliveries d
             JOIN matches m ON m.match_id = d.match_id",
        );
        push_where(&mut sql, &clauses);
        sql.push_str(" GROUP BY d.match_id, d.inning, d.batting_team, d.bowling_team");
        sql.push_str(" ORDER BY d.match_id, d.inning");

        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                Ok(InningsTotals {
                    match_id: row.get(0)?,
                    inning: row.get(1)?,
                    batting_team: row.get(2)?,
                    bowling_team: row.get(3)?,
                    runs: row.get(4)?,
                    legal_balls: row.get(5)?,
                    wickets: row.get(6)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    /// Innings totals restricted to an overs window. When the filter names
    /// a team it is applied to the batting side within the window, not
    /// just to match participation.
    pub async fn phase_totals(
        &self,
        filter: &MatchFilter,
        window: OversWindow,
    ) -> Result<Vec<PhaseInnings>> {
        let (clauses, mut params) = filter.without_team().build_where(1);
        let mut idx = params.len() + 1;

        let mut sql = String::from(
            "SELECT d.match_id, d.inning, d.batting_team,
                    SUM(d.runs_off_bat + d.extras) AS runs,
                    SUM(CASE WHEN d.wides = 0 AND d.noballs = 0 THEN 1 ELSE 0 END) AS legal_balls,
                    SUM(CASE WHEN d.wicket_type IS NOT NULL AND d.wicket_type != 'retired hurt'
                             THEN 1 ELSE 0 END) AS wickets
             FROM deliveries d
             JOIN matches m ON m.match_id = d.match_id",
        );

        let mut all_clauses = clauses;
        if let Some(ref team) = filter.team {
            all_clauses.push(format!("d.batting_team = ?{idx}"));
            params.push(team.clone());
            idx += 1;
        }
        all_clauses.push(format!("d.over >= ?{idx} AND d.over <= ?{}", idx + 1));
        params.push(window.first.to_string());
        params.push(window.last.to_string());

        push_where(&mut sql, &all_clauses);
        sql.push_str(" GROUP BY d.match_id, d.inning, d.batting_team");
        sql.push_str(" ORDER BY d.match_id, d.inning");

        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                Ok(PhaseInnings {
                    match_id: row.get(0)?,
                    inning: row.get(1)?,
                    batting_team: row.get(2)?,
                    runs: row.get(3)?,
                    legal_balls: row.get(4)?,
                    wickets: row.get(5)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    /// Winner and first-innings batting side per match. Matches with no
    /// delivery data cannot be role-partitioned and are omitted.
    pub async fn match_roles(&self, filter: &MatchFilter) -> Result<Vec<MatchRole>> {
        let (clauses, params) = filter.build_where(1);
        let mut sql = String::from(
            "SELECT m.match_id, m.winner, fi.batting_team
             FROM matches m
             JOIN (SELECT match_id, MIN(batting_team) AS batting_team
                   FROM deliveries WHERE inning = 1 GROUP BY match_id) fi
               ON fi.match_id = m.match_id",
        );
        push_where(&mut sql, &clauses);
        sql.push_str(" ORDER BY m.match_id");

        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                Ok(MatchRole {
                    match_id: row.get(0)?,
                    winner: row.get(1)?,
                    first_batting: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    /// Win/loss/no-result record for every team in the filtered matches,
    /// via the UNION ALL pivot of team1/team2 participation.
    pub async fn team_records(&self, filter: &MatchFilter) -> Result<Vec<TeamRecordRow>> {
        let (clauses, params) = filter.without_team().build_where(1);
        let mut branch = String::new();
        push_where(&mut branch, &clauses);

        let sql = format!(
            "WITH team_matches AS (
                SELECT m.team1 AS team, m.winner AS winner FROM matches m{branch}
                UNION ALL
                SELECT m.team2 AS team, m.winner AS winner FROM matches m{branch}
             )
             SELECT team, COUNT(*) AS played,
                    SUM(CASE WHEN winner = team THEN 1 ELSE 0 END) AS wins,
                    SUM(CASE WHEN winner IS NOT NULL AND winner != team THEN 1 ELSE 0 END) AS losses,
                    SUM(CASE WHEN winner IS NULL THEN 1 ELSE 0 END) AS no_results
             FROM team_matches
             GROUP BY team
             ORDER BY team"
        );

        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                Ok(TeamRecordRow {
                    team: row.get(0)?,
                    played: row.get(1)?,
                    wins: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    losses: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    no_results: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                })
            })?;
            rows.collect()
        })
        .await
    }

    pub async fn head_to_head_counts(
        &self,
        team1: &str,
        team2: &str,
        filter: &MatchFilter,
    ) -> Result<HeadToHeadCounts> {
        let (clauses, extra) = filter.without_team().build_where(3);
        let mut sql = String::from(
            "SELECT COUNT(*),
                    SUM(CASE WHEN m.winner = ?1 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN m.winner = ?2 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN m.winner IS NULL THEN 1 ELSE 0 END)
             FROM matches m
             WHERE ((m.team1 = ?1 AND m.team2 = ?2) OR (m.team1 = ?2 AND m.team2 = ?1))",
        );
        for clause in &clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }

        let mut params = vec![team1.to_string(), team2.to_string()];
        params.extend(extra);

        self.run(move |conn| {
            conn.query_row(&sql, params_from_iter(params.iter()), |row| {
                Ok(HeadToHeadCounts {
                    matches: row.get(0)?,
                    team1_wins: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    team2_wins: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    no_results: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                })
            })
        })
        .await
    }

    pub async fn season_counts(&self, season: &str) -> Result<SeasonCounts> {
        let key = season.to_string();
        self.run(move |conn| {
            let (matches, venues, avg_runs_margin, first_date, last_date) = conn.query_row(
                "SELECT COUNT(*), COUNT(DISTINCT venue),
                        AVG(CASE WHEN margin_type = 'runs' THEN margin_value END),
                        MIN(match_date), MAX(match_date)
                 FROM matches WHERE season = ?1",
                [&key],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )?;
            let teams: i64 = conn.query_row(
                "SELECT COUNT(*) FROM (
                    SELECT team1 FROM matches WHERE season = ?1
                    UNION
                    SELECT team2 FROM matches WHERE season = ?1
                 )",
                [&key],
                |row| row.get(0),
            )?;
            Ok(SeasonCounts {
                matches,
                teams,
                venues,
                avg_runs_margin,
                first_date,
                last_date,
            })
        })
        .await
    }

    pub async fn toss_counts(&self, filter: &MatchFilter) -> Result<TossCounts> {
        let (clauses, params) = filter.build_where(1);
        let mut sql = String::from(
            "SELECT COUNT(*),
                    SUM(CASE WHEN m.winner = m.toss_winner THEN 1 ELSE 0 END),
                    SUM(CASE WHEN m.toss_decision = 'bat' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN m.toss_decision = 'field' THEN 1 ELSE 0 END)
             FROM matches m
             WHERE m.winner IS NOT NULL AND m.toss_winner IS NOT NULL",
        );
        for clause in &clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }

        self.run(move |conn| {
            conn.query_row(&sql, params_from_iter(params.iter()), |row| {
                Ok(TossCounts {
                    decided: row.get(0)?,
                    toss_winner_wins: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    bat_first_decisions: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    field_first_decisions: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                })
            })
        })
        .await
    }

    /// Whole-dataset counts for the quality scorer, computed as grouped
    /// aggregates so cost stays bounded on full-history stores.
    pub async fn quality_counts(&self) -> Result<QualityCounts> {
        let sql = format!(
            "SELECT COUNT(*),
                    (SELECT COUNT(DISTINCT d.match_id)
                     FROM deliveries d JOIN matches m2 ON m2.match_id = d.match_id),
                    SUM(CASE WHEN venue IS NULL OR venue = '' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN winner IS NULL
                             AND (margin_type IS NULL OR lower(margin_type) NOT IN {NO_RESULT_MARGINS})
                             THEN 1 ELSE 0 END),
                    COUNT(DISTINCT season),
                    MIN(match_date), MAX(match_date)
             FROM matches"
        );

        self.run(move |conn| {
            conn.query_row(&sql, [], |row| {
                Ok(QualityCounts {
                    total_matches: row.get(0)?,
                    matches_with_deliveries: row.get(1)?,
                    null_venues: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                    unexplained_null_winners: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                    seasons: row.get(4)?,
                    first_date: row.get(5)?,
                    last_date: row.get(6)?,
                })
            })
        })
        .await
    }
}

fn push_where(sql: &mut String, clauses: &[String]) {
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
}

/// Fold a store failure into the typed taxonomy. Missing tables/columns
/// mean the ingestion side drifted; lock and open failures mean the store
/// is unreachable right now.
fn translate_store_error(msg: &str) -> Error {
    if msg.contains("no such table") || msg.contains("no such column") {
        log::error!("schema mismatch reported by store: {msg}");
        Error::SchemaMismatch(msg.to_string())
    } else if msg.contains("database is locked") || msg.contains("unable to open database") {
        Error::StoreUnavailable(msg.to_string())
    } else {
        Error::Database(msg.to_string())
    }
}
