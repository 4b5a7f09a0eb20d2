use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};

use super::id_string;
use crate::progress::parse_timestamp;

/// Completion snapshot for a whole project.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectProgress {
    #[serde(deserialize_with = "lenient_percent")]
    pub progress_percent: f64,
    #[serde(default)]
    pub project_duration: Option<i64>,
    #[serde(deserialize_with = "timestamp")]
    pub project_start_date: NaiveDateTime,
    #[serde(deserialize_with = "timestamp")]
    pub project_end_date: NaiveDateTime,
}

/// Schedule entry for one construction category.
///
/// The dates are kept as the raw strings the server sent: an unparseable
/// category date only hides that category's bar.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CategoryProgress {
    #[serde(deserialize_with = "id_string")]
    pub cc_id: String,
    pub cc_name: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub category_status: CategoryStatus,
}

#[derive(Deserialize, Debug)]
pub struct CategoryProgressList {
    pub category_progress_info: Vec<CategoryProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryStatus {
    Completed,
    Risky,
    Upcoming,
    /// Any status value this client does not know about yet.
    Unrecognized(String),
}

impl Default for CategoryStatus {
    fn default() -> Self {
        CategoryStatus::Unrecognized(String::new())
    }
}

impl From<&str> for CategoryStatus {
    fn from(value: &str) -> Self {
        match value {
            "completed" => CategoryStatus::Completed,
            "risky" => CategoryStatus::Risky,
            "upcoming" => CategoryStatus::Upcoming,
            other => CategoryStatus::Unrecognized(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for CategoryStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(CategoryStatus::from).unwrap_or_default())
    }
}

impl CategoryStatus {
    pub fn label(&self) -> &str {
        match self {
            CategoryStatus::Completed => "completed",
            CategoryStatus::Risky => "risky",
            CategoryStatus::Upcoming => "upcoming",
            CategoryStatus::Unrecognized(raw) => raw,
        }
    }
}

// Numbers, numeric strings and null all show up here; anything unparseable is 0.
fn lenient_percent<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let percent = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if percent.is_nan() { 0.0 } else { percent })
}

fn timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_accepts_strings_and_numbers() {
        let body = r#"{"progress_percent": "67.2", "project_duration": 30,
            "project_start_date": "2024-01-01", "project_end_date": "2024-01-31"}"#;
        let p: ProjectProgress = serde_json::from_str(body).unwrap();
        assert_eq!(p.progress_percent, 67.2);
        assert_eq!(p.project_duration, Some(30));

        let body = r#"{"progress_percent": 12,
            "project_start_date": "2024-01-01", "project_end_date": "2024-01-31"}"#;
        let p: ProjectProgress = serde_json::from_str(body).unwrap();
        assert_eq!(p.progress_percent, 12.0);
    }

    #[test]
    fn garbage_percent_becomes_zero() {
        let body = r#"{"progress_percent": "n/a",
            "project_start_date": "2024-01-01", "project_end_date": "2024-01-31"}"#;
        let p: ProjectProgress = serde_json::from_str(body).unwrap();
        assert_eq!(p.progress_percent, 0.0);
    }

    #[test]
    fn bad_project_date_is_a_decode_error() {
        let body = r#"{"progress_percent": 1,
            "project_start_date": "soon", "project_end_date": "2024-01-31"}"#;
        assert!(serde_json::from_str::<ProjectProgress>(body).is_err());
    }

    #[test]
    fn status_strings_map_to_variants() {
        assert_eq!(CategoryStatus::from("completed"), CategoryStatus::Completed);
        assert_eq!(CategoryStatus::from("risky"), CategoryStatus::Risky);
        assert_eq!(CategoryStatus::from("upcoming"), CategoryStatus::Upcoming);
        assert_eq!(
            CategoryStatus::from("on_hold"),
            CategoryStatus::Unrecognized("on_hold".to_string())
        );
    }

    #[test]
    fn missing_status_is_unrecognized() {
        let body = r#"{"cc_id": "c1", "cc_name": "Plumbing",
            "start_date": "2024-01-02", "end_date": "2024-01-05", "category_status": null}"#;
        let c: CategoryProgress = serde_json::from_str(body).unwrap();
        assert_eq!(c.category_status, CategoryStatus::Unrecognized(String::new()));
    }
}
