// File: src/model.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Notified,
    Completed,
    /// Anything the backend sends that we don't know. Kept verbatim so the
    /// record still renders (in the upcoming bucket).
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Notified => "notified",
            TaskStatus::Completed => "completed",
            TaskStatus::Other(s) => s,
        }
    }

    pub fn is_done(&self) -> bool {
        *self == TaskStatus::Completed
    }

    /// `pending` and `notified` render identically.
    pub fn is_upcoming(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Notified)
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => TaskStatus::Pending,
            "notified" => TaskStatus::Notified,
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Other(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(s: TaskStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A missing/null status is what the backend stores as its default.
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(TaskStatus::from).unwrap_or(TaskStatus::Pending))
    }
}

// Backend ids are strings (document ids) but older rows used integers.
fn id_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported task id: {}",
            other
        ))),
    }
}

fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(rename = "mata_kuliah", deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(
        rename = "deskripsi_tugas",
        default,
        deserialize_with = "string_or_null"
    )]
    pub description: String,
    #[serde(default)]
    pub deadline_timestamp: i64,
    #[serde(
        rename = "tanggal_deadline_str",
        default,
        deserialize_with = "string_or_null"
    )]
    pub deadline_display: String,
    #[serde(rename = "deadline_iso_str", default)]
    pub deadline_date: Option<String>,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<serde_json::Value>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

impl Task {
    pub fn new(id: &str, title: &str, status: TaskStatus) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            deadline_timestamp: 0,
            deadline_display: String::new(),
            deadline_date: None,
            status,
            user_id: None,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.deadline_timestamp, 0)
    }

    /// Calendar-ready date, if the backend sent one we can read.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        let raw = self.deadline_date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        // Accept a full ISO timestamp too; only the date part matters.
        let date_part = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    /// Overdue is derived, never stored: it depends on the render time.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_done() && now.timestamp() >= self.deadline_timestamp
    }

    /// Current values as an edit form payload.
    pub fn to_fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            description: self.description.clone(),
            deadline: self.deadline_display.clone(),
        }
    }
}

/// Body for create and update requests. The deadline is free text; the
/// backend parses it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFields {
    #[serde(rename = "mata_kuliah")]
    pub title: String,
    #[serde(rename = "deskripsi_tugas")]
    pub description: String,
    pub deadline: String,
}

impl TaskFields {
    pub fn new(title: &str, description: &str, deadline: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            deadline: deadline.to_string(),
        }
    }

    /// All three fields are required before anything is sent.
    pub fn validate(&self) -> Result<(), ApiError> {
        let missing: Vec<&str> = [
            ("subject", &self.title),
            ("description", &self.description),
            ("deadline", &self.deadline),
        ]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(format!(
                "All fields must be filled in (missing: {})",
                missing.join(", ")
            )))
        }
    }

    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            deadline: self.deadline.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "setting_text")]
    pub telegram_token: String,
    #[serde(default, deserialize_with = "setting_text")]
    pub telegram_id: String,
}

// Unset settings come back as null; chat ids are sometimes stored as numbers.
fn setting_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(String::new()),
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported setting value: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_deserializes_backend_shape() {
        let json = r#"{
            "id": "abc",
            "mata_kuliah": "Algorithms",
            "deskripsi_tugas": "Problem set 3",
            "deadline_timestamp": 1700000000,
            "tanggal_deadline_str": "14 November 2023 22:13",
            "deadline_iso_str": "2023-11-14",
            "status": "notified",
            "user_id": 42
        }"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.id, "abc");
        assert_eq!(t.title, "Algorithms");
        assert_eq!(t.status, TaskStatus::Notified);
        assert_eq!(
            t.calendar_date(),
            NaiveDate::from_ymd_opt(2023, 11, 14)
        );
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let json = r#"{"id": 7, "mata_kuliah": "X", "status": "archived"}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.id, "7");
        assert_eq!(t.status, TaskStatus::Other("archived".into()));
        assert!(!t.status.is_upcoming());
        assert_eq!(serde_json::to_value(&t.status).unwrap(), "archived");
    }

    #[test]
    fn test_null_fields_default() {
        let json = r#"{"id": "a", "mata_kuliah": "X", "deskripsi_tugas": null,
                       "tanggal_deadline_str": null, "deadline_iso_str": null, "status": null}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.description, "");
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.calendar_date(), None);
    }

    #[test]
    fn test_settings_accept_null_and_numbers() {
        let s: Settings =
            serde_json::from_str(r#"{"telegram_token": null, "telegram_id": 123456}"#).unwrap();
        assert_eq!(s.telegram_token, "");
        assert_eq!(s.telegram_id, "123456");

        let empty: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Settings::default());
    }

    #[test]
    fn test_overdue_boundary() {
        let mut t = Task::new("1", "X", TaskStatus::Pending);
        t.deadline_timestamp = 1_000;
        let before = DateTime::from_timestamp(999, 0).unwrap();
        let at = DateTime::from_timestamp(1_000, 0).unwrap();
        assert!(!t.is_overdue_at(before));
        assert!(t.is_overdue_at(at));

        t.status = TaskStatus::Completed;
        assert!(!t.is_overdue_at(at));
    }

    #[test]
    fn test_fields_validation() {
        assert!(TaskFields::new("a", "b", "tomorrow").validate().is_ok());
        let err = TaskFields::new("a", "  ", "").validate().unwrap_err();
        match err {
            ApiError::Validation(msg) => {
                assert!(msg.contains("description"));
                assert!(msg.contains("deadline"));
                assert!(!msg.contains("subject"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fields_wire_names() {
        let v = serde_json::to_value(TaskFields::new("a", "b", "c")).unwrap();
        assert_eq!(v["mata_kuliah"], "a");
        assert_eq!(v["deskripsi_tugas"], "b");
        assert_eq!(v["deadline"], "c");
    }
}
