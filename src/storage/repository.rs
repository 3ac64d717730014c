use rusqlite::{params, Connection, OptionalExtension};

// ── Known-domain lookups ───────────────────────────────────────────
// Filter parameters are validated against these before any aggregation
// query runs, so an unknown team/season/venue never reaches the store as
// a silently-empty WHERE clause.

pub fn list_teams(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT team1 FROM matches UNION SELECT team2 FROM matches ORDER BY 1",
    )?;
    let teams: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(teams)
}

pub fn team_exists(conn: &Connection, team: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM matches WHERE team1 = ?1 OR team2 = ?1)",
        params![team],
        |row| row.get(0),
    )
}

pub fn list_seasons(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT DISTINCT season FROM matches ORDER BY season")?;
    let seasons: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(seasons)
}

pub fn season_exists(conn: &Connection, season: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM matches WHERE season = ?1)",
        params![season],
        |row| row.get(0),
    )
}

pub fn list_venues(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT venue FROM matches WHERE venue IS NOT NULL ORDER BY venue",
    )?;
    let venues: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(venues)
}

pub fn venue_exists(conn: &Connection, venue: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM matches WHERE venue = ?1)",
        params![venue],
        |row| row.get(0),
    )
}

// ── Store counts (status surface) ──────────────────────────────────

pub fn match_count(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))
}

pub fn delivery_count(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("SELECT COUNT(*) FROM deliveries", [], |row| row.get(0))
}

// ── App config ─────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO app_config (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let items: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(items)
}
