//! Natural-language "smart add": hands free text to Gemini and gets back
//! structured event fields. Best effort only; every failure collapses into
//! one outcome so the event form is never blocked on the model.

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::hhmm;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("request to language model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("language model returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed model output: {0}")]
    Malformed(String),
}

/// Extracted event fields, normalized: missing date falls back to the
/// reference date, missing time to 09:00, missing description to "".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEvent {
    pub title: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct RawParsedEvent {
    title: String,
    date: Option<String>,
    time: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Same client against a different endpoint; tests point this at a
    /// local mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    pub async fn parse_event(
        &self,
        prompt: &str,
        reference_date: NaiveDate,
    ) -> Result<ParsedEvent, AiError> {
        let url = format!("{}/v1beta/models/{MODEL}:generateContent", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(prompt, reference_date))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Status(status));
        }

        let payload: GenerateContentResponse = response.json().await?;
        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| AiError::Malformed("no candidates in response".to_string()))?;

        let raw: RawParsedEvent = serde_json::from_str(text.trim())
            .map_err(|err| AiError::Malformed(err.to_string()))?;
        Ok(normalize(raw, reference_date))
    }
}

/// Accepts either a bare ISO date or a full RFC 3339 timestamp, which is
/// what a browser produces when it serializes `new Date()`.
pub fn parse_reference_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn request_body(prompt: &str, reference_date: NaiveDate) -> serde_json::Value {
    let instructions = format!(
        "You are a calendar event extraction engine.\n\
         Reference date: {reference}\n\
         Task: from the user text below, extract a single calendar event as JSON with\n\
         fields \"title\", \"date\", \"time\" and optionally \"description\".\n\
         Rules:\n\
         - \"date\" must be an ISO date (YYYY-MM-DD). Resolve relative phrases like\n\
           \"tomorrow\" or weekday names against the reference date.\n\
         - If the year is omitted, use the reference date's year.\n\
         - If no date is given at all, use the reference date.\n\
         - \"time\" must be 24h HH:MM. If no time is given, use 09:00.\n\
         - \"title\" is the event itself with the scheduling words removed.\n\
         - Output ONLY raw JSON, no prose, markdown, or code fences.\n\
         User text: \"{prompt}\"",
        reference = reference_date.format("%Y-%m-%d"),
    );

    json!({
        "contents": [{ "parts": [{ "text": instructions }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "date": { "type": "STRING" },
                    "time": { "type": "STRING" },
                    "description": { "type": "STRING" }
                },
                "required": ["title", "date", "time"]
            }
        }
    })
}

fn normalize(raw: RawParsedEvent, reference_date: NaiveDate) -> ParsedEvent {
    let date = raw
        .date
        .as_deref()
        .and_then(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
        .unwrap_or(reference_date);
    let time = raw
        .time
        .as_deref()
        .and_then(parse_time)
        .unwrap_or_else(default_time);
    ParsedEvent {
        title: raw.title,
        date,
        time,
        description: raw.description.unwrap_or_default(),
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 is a valid time")
}
