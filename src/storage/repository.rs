use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::progress::{AccountKind, ProgressRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date_column(row: &Row<'_>, idx: usize) -> Result<Option<NaiveDate>, rusqlite::Error> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

// ── Progress ───────────────────────────────────────────────────────

pub fn get_progress(
    conn: &Connection,
    kind: AccountKind,
) -> Result<Option<ProgressRecord>, rusqlite::Error> {
    conn.query_row(
        "SELECT account_id, username, experience_points, level, streak_length,
                last_streak_activity_date
         FROM progress WHERE account_kind = ?1",
        params![kind.as_str()],
        |row| {
            Ok(ProgressRecord {
                account_id: row.get(0)?,
                username: row.get(1)?,
                experience_points: row.get(2)?,
                level: row.get(3)?,
                streak_length: row.get(4)?,
                last_streak_activity_date: parse_date_column(row, 5)?,
                account_kind: kind,
            })
        },
    )
    .optional()
}

/// Insert or replace the row for `record.account_kind`.
pub fn put_progress(conn: &Connection, record: &ProgressRecord) -> Result<(), rusqlite::Error> {
    let last_date = record
        .last_streak_activity_date
        .map(|d| d.format(DATE_FORMAT).to_string());
    conn.execute(
        "INSERT INTO progress (
            account_kind, account_id, username, experience_points, level,
            streak_length, last_streak_activity_date, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))
        ON CONFLICT(account_kind) DO UPDATE SET
            account_id=excluded.account_id, username=excluded.username,
            experience_points=excluded.experience_points, level=excluded.level,
            streak_length=excluded.streak_length,
            last_streak_activity_date=excluded.last_streak_activity_date,
            updated_at=excluded.updated_at",
        params![
            record.account_kind.as_str(),
            record.account_id,
            record.username,
            record.experience_points,
            record.level,
            record.streak_length,
            last_date,
        ],
    )?;
    Ok(())
}

/// Returns true if a row was removed.
pub fn delete_progress(conn: &Connection, kind: AccountKind) -> Result<bool, rusqlite::Error> {
    let n = conn.execute(
        "DELETE FROM progress WHERE account_kind = ?1",
        params![kind.as_str()],
    )?;
    Ok(n > 0)
}

// ── Config ─────────────────────────────────────────────────────────

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
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Link events ────────────────────────────────────────────────────

/// Audit row written once per completed account link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEvent {
    pub id: i64,
    pub account_id: Option<String>,
    pub merged_guest: bool,
    pub guest_experience: u64,
    pub server_experience: u64,
    pub merged_experience: u64,
    pub merged_streak: u32,
    pub linked_on: String,
    pub created_at: String,
}

#[allow(clippy::too_many_arguments)]
pub fn insert_link_event(
    conn: &Connection,
    account_id: Option<&str>,
    merged_guest: bool,
    guest_experience: u64,
    server_experience: u64,
    merged_experience: u64,
    merged_streak: u32,
    linked_on: NaiveDate,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO link_events (
            account_id, merged_guest, guest_experience, server_experience,
            merged_experience, merged_streak, linked_on, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))",
        params![
            account_id,
            merged_guest as i32,
            guest_experience,
            server_experience,
            merged_experience,
            merged_streak,
            linked_on.format(DATE_FORMAT).to_string(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_link_events(conn: &Connection) -> Result<Vec<LinkEvent>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, merged_guest, guest_experience, server_experience,
                merged_experience, merged_streak, linked_on, created_at
         FROM link_events ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(LinkEvent {
            id: row.get(0)?,
            account_id: row.get(1)?,
            merged_guest: row.get::<_, i32>(2)? != 0,
            guest_experience: row.get(3)?,
            server_experience: row.get(4)?,
            merged_experience: row.get(5)?,
            merged_streak: row.get(6)?,
            linked_on: row.get(7)?,
            created_at: row.get(8)?,
        })
    })?;
    rows.collect()
}
