use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// User as returned to the client. The password hash never leaves the
/// database layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// A single calendar entry. Event ids are assigned client-side at creation
/// time and stay stable across edits; `user_id` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub color: EventColor,
}

/// Fixed color palette for event chips. Deserialization rejects anything
/// outside the palette, so a stored color is always a valid tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventColor {
    #[serde(rename = "bg-blue-500")]
    Blue,
    #[serde(rename = "bg-green-500")]
    Green,
    #[serde(rename = "bg-red-500")]
    Red,
    #[serde(rename = "bg-yellow-500")]
    Yellow,
    #[serde(rename = "bg-purple-500")]
    Purple,
    #[serde(rename = "bg-pink-500")]
    Pink,
}

impl EventColor {
    pub const ALL: [EventColor; 6] = [
        EventColor::Blue,
        EventColor::Green,
        EventColor::Red,
        EventColor::Yellow,
        EventColor::Purple,
        EventColor::Pink,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventColor::Blue => "bg-blue-500",
            EventColor::Green => "bg-green-500",
            EventColor::Red => "bg-red-500",
            EventColor::Yellow => "bg-yellow-500",
            EventColor::Purple => "bg-purple-500",
            EventColor::Pink => "bg-pink-500",
        }
    }

    pub fn parse(tag: &str) -> Option<EventColor> {
        Self::ALL.into_iter().find(|color| color.as_str() == tag)
    }
}

/// Serde format for clock times on the wire: "HH:mm", 24h, no seconds.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
