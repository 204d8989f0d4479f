use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::ai::{self, GeminiClient, ParsedEvent};
use crate::calendar;
use crate::crypto;
use crate::db::{EventRow, UserRow};
use crate::error::ApiError;
use crate::models::{CalendarEvent, User};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Absent when no GEMINI_API_KEY is configured; smart add then answers 503.
    pub ai: Option<GeminiClient>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/events", get(list_events).post(save_event))
        .route("/api/events/:id", delete(delete_event))
        .route("/api/calendar", get(month_view))
        .route("/api/ai/parse", post(parse_event))
        .nest_service("/static", ServeDir::new("static"))
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024)) // 2MB limit
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn serve_index() -> Html<String> {
    let html = tokio::fs::read_to_string("static/index.html")
        .await
        .unwrap_or_else(|_| include_str!("../static/index.html").to_string());
    Html(html)
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<User>, ApiError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let password_hash = crypto::hash_password(&req.password)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    let id = Uuid::new_v4().to_string();

    let result = sqlx::query("INSERT INTO users (id, username, password_hash) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(&req.username)
        .bind(&password_hash)
        .execute(&state.db)
        .await;

    match result {
        Ok(_) => {
            log::info!("registered user {}", req.username);
            Ok(Json(User {
                id,
                username: req.username,
            }))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(ApiError::Conflict)
        }
        Err(err) => Err(err.into()),
    }
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> Result<Json<User>, ApiError> {
    let user = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash FROM users WHERE username = ?",
    )
    .bind(&req.username)
    .fetch_optional(&state.db)
    .await?;

    match user {
        Some(user) => {
            let valid = crypto::verify_password(&req.password, &user.password_hash)
                .await
                .unwrap_or(false);
            if valid {
                Ok(Json(User {
                    id: user.id,
                    username: user.username,
                }))
            } else {
                Err(ApiError::Unauthorized)
            }
        }
        None => {
            // burn a verify so unknown users take as long as wrong passwords
            let _ = crypto::verify_password(&req.password, crypto::DUMMY_HASH).await;
            Err(ApiError::Unauthorized)
        }
    }
}

const SELECT_EVENTS: &str = "SELECT id, user_id, title, description, event_date, event_time, color
     FROM events WHERE user_id = ?";

#[derive(Deserialize)]
struct EventsQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    let user_id = query
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing userId".to_string()))?;

    let events = fetch_events(&state.db, &user_id).await?;
    Ok(Json(events))
}

async fn fetch_events(db: &SqlitePool, user_id: &str) -> Result<Vec<CalendarEvent>, ApiError> {
    let rows = sqlx::query_as::<_, EventRow>(SELECT_EVENTS)
        .bind(user_id)
        .fetch_all(db)
        .await?;
    rows.into_iter().map(CalendarEvent::try_from).collect()
}

async fn save_event(
    State(state): State<AppState>,
    Json(event): Json<CalendarEvent>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if event.id.trim().is_empty() || event.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Event id and userId are required".to_string(),
        ));
    }

    // Upsert keyed on id; user_id stays whatever it was at creation.
    sqlx::query(
        "INSERT INTO events (id, user_id, title, description, event_date, event_time, color)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             description = excluded.description,
             event_date = excluded.event_date,
             event_time = excluded.event_time,
             color = excluded.color",
    )
    .bind(&event.id)
    .bind(&event.user_id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.date.format("%Y-%m-%d").to_string())
    .bind(event.time.format("%H:%M").to_string())
    .bind(event.color.as_str())
    .execute(&state.db)
    .await?;

    Ok(Json(json!({ "success": true })))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // deleting a missing id is fine
    sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(&event_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
struct MonthQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    year: i32,
    month: u32,
    /// The viewer's current local date; the server clock may sit in a
    /// different timezone.
    today: Option<NaiveDate>,
}

/// Precomputed month grid for the SPA: cell counts plus per-day event
/// buckets, so the client renders without date arithmetic of its own.
async fn month_view(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = query
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing userId".to_string()))?;
    let layout = calendar::month_layout(query.year, query.month)
        .ok_or_else(|| ApiError::BadRequest("Invalid year or month".to_string()))?;

    let events = fetch_events(&state.db, &user_id).await?;
    let grouped = calendar::group_by_date(&events, query.year, query.month);
    let reference = query.today.unwrap_or_else(|| Local::now().date_naive());
    let today = calendar::day_in_month(reference, query.year, query.month);

    Ok(Json(json!({
        "year": query.year,
        "month": query.month,
        "daysInMonth": layout.days_in_month,
        "leadingBlanks": layout.leading_blanks,
        "today": today,
        "events": grouped,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParseRequest {
    prompt: String,
    reference_date: String,
}

async fn parse_event(
    State(state): State<AppState>,
    Json(req): Json<ParseRequest>,
) -> Result<Json<ParsedEvent>, ApiError> {
    let client = state.ai.as_ref().ok_or(ApiError::AiUnavailable)?;
    if req.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing prompt".to_string()));
    }
    let reference = ai::parse_reference_date(&req.reference_date)
        .ok_or_else(|| ApiError::BadRequest("Invalid referenceDate".to_string()))?;

    match client.parse_event(&req.prompt, reference).await {
        Ok(parsed) => Ok(Json(parsed)),
        Err(err) => {
            log::warn!("smart add failed: {err}");
            Err(ApiError::AiUnavailable)
        }
    }
}
