//! Backend response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub profile as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
}

impl User {
    /// Name to show, falling back to the login
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.login)
    }
}

/// GET /api/auth/status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<User>,
}

/// GET /api/protected/data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedData {
    pub message: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub data: Option<ProtectedPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtectedPayload {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: Option<Timestamp>,
}

/// GET /api/public/health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicData {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub timestamp: Timestamp,
}

/// POST /logout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// The backend sends timestamps either as epoch milliseconds or as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Millis(millis) => DateTime::from_timestamp_millis(*millis),
            Timestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc)),
        }
    }

    /// Human readable form; unparseable text is shown as sent
    pub fn display(&self) -> String {
        match (self.to_datetime(), self) {
            (Some(datetime), _) => datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            (None, Timestamp::Text(text)) => text.clone(),
            (None, Timestamp::Millis(millis)) => millis.to_string(),
        }
    }
}
