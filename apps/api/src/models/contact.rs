use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a contact request.
/// `InProgress` and `Cancelled` are reserved terminal/intermediate states
/// reachable only by external tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contact_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// A contact request captured either through the conversational flow or
/// the contact form. The optional fields fill in fixed order
/// name -> phone -> email -> contact_date; see `contact::flow`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequestRow {
    pub id: i64,
    pub session_id: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact_date: Option<String>,
    pub message: Option<String>,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
