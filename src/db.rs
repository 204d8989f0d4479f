use chrono::{NaiveDate, NaiveTime};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error::ApiError;
use crate::models::{hhmm, CalendarEvent, EventColor};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        event_date TEXT NOT NULL,
        event_time TEXT NOT NULL,
        color TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_events_user ON events(user_id)",
];

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Single-connection in-memory pool for tests: every handle sees the same
/// database, which a multi-connection `sqlite::memory:` pool would not.
pub async fn memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

pub async fn init(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
}

#[derive(sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub event_date: String,
    pub event_time: String,
    pub color: String,
}

impl TryFrom<EventRow> for CalendarEvent {
    type Error = ApiError;

    fn try_from(row: EventRow) -> Result<Self, ApiError> {
        let date = NaiveDate::parse_from_str(&row.event_date, "%Y-%m-%d")
            .map_err(|err| corrupt(&row.id, "event_date", &err.to_string()))?;
        let time = NaiveTime::parse_from_str(&row.event_time, hhmm::FORMAT)
            .map_err(|err| corrupt(&row.id, "event_time", &err.to_string()))?;
        let color = EventColor::parse(&row.color)
            .ok_or_else(|| corrupt(&row.id, "color", &row.color))?;
        Ok(CalendarEvent {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            date,
            time,
            color,
        })
    }
}

fn corrupt(id: &str, column: &str, detail: &str) -> ApiError {
    ApiError::Internal(format!("corrupt event row {id}, column {column}: {detail}"))
}
