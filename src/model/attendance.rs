use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One row per login event. `login_time` is set at creation and never
/// changes; `logout_time` stays NULL until checkout.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub login_time: NaiveDateTime,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub logout_time: Option<NaiveDateTime>,
    pub ip_address: Option<String>,
    pub logout_ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Raw JSON side-document; use [`AttendanceRecord::metadata`] to read it.
    pub metadata: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

impl AttendanceRecord {
    /// Parses the side-document. Rows written by older deployments may carry
    /// malformed JSON; those read as the empty state rather than failing.
    pub fn metadata(&self) -> AttendanceMetadata {
        AttendanceMetadata::parse(self.metadata.as_deref(), self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpHistoryEntry {
    pub timestamp: NaiveDateTime,
    pub ip: String,
}

/// Structured view of the `metadata` JSON column. Field names stay camelCase
/// on the wire so rows written by the previous system keep deserializing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceMetadata {
    /// Authoritative once set; wins over rule-derived status downstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Shift name captured at login time, not re-resolved later.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_history: Vec<IpHistoryEntry>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub checkout_reminder_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

impl AttendanceMetadata {
    pub fn parse(raw: Option<&str>, record_id: u64) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        if raw.is_empty() {
            return Self::default();
        }
        match serde_json::from_str(raw) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(record_id, error = %e, "Malformed attendance metadata, using empty state");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("attendance metadata serializes")
    }
}
