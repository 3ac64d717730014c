use std::collections::HashSet;

use rusqlite::Connection;

/// Columns each calculator assumes are present. Ingestion owns the store;
/// if it drifts, the engine must fail with a named table/column rather than
/// a raw SQL error mid-computation.
pub const MATCHES_COLUMNS: &[&str] = &[
    "match_id",
    "tournament",
    "season",
    "match_date",
    "venue",
    "team1",
    "team2",
    "winner",
    "margin_type",
    "margin_value",
    "toss_winner",
    "toss_decision",
];

pub const DELIVERIES_COLUMNS: &[&str] = &[
    "match_id",
    "inning",
    "over",
    "ball",
    "batting_team",
    "bowling_team",
    "runs_off_bat",
    "extras",
    "wides",
    "noballs",
    "wicket_type",
];

/// Returns the first missing required item as `"table"` or `"table.column"`,
/// or `None` when the store satisfies the contract.
pub fn missing_schema_item(conn: &Connection) -> Result<Option<String>, rusqlite::Error> {
    for (table, required) in [
        ("matches", MATCHES_COLUMNS),
        ("deliveries", DELIVERIES_COLUMNS),
    ] {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type IN ('table','view') AND name = ?1)",
            [table],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(Some(table.to_string()));
        }

        let mut stmt = conn.prepare(&format!("SELECT name FROM pragma_table_info('{table}')"))?;
        let present: HashSet<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for col in required {
            if !present.contains(*col) {
                return Ok(Some(format!("{table}.{col}")));
            }
        }
    }
    Ok(None)
}
