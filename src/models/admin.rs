use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One user-search log row as the admin table shows it, flattened from the
/// backend's enhanced-search record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSearchRow {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub exam: String,
    pub rank: String,
    pub category: String,
    pub state: String,
    pub specialization: String,
    pub course: String,
    pub search_time: String,
    pub results: i64,
    pub has_results: bool,
}

impl UserSearchRow {
    /// Maps a raw backend record. Absent fields become empty strings, a
    /// missing exam type is labelled "Unknown" — same defaults the admin
    /// table always rendered.
    pub fn from_backend(item: &Value) -> Self {
        let text = |key: &str| {
            item.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let results = item
            .get("results_count")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        UserSearchRow {
            id: item.get("seqno").and_then(Value::as_i64).unwrap_or(0),
            name: text("name"),
            phone: text("phone_number"),
            email: text("email"),
            exam: item
                .get("exam_type")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            rank: match item.get("rank_no") {
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            },
            category: text("category"),
            state: text("state"),
            specialization: text("specialization"),
            course: text("qualifying_group_or_course"),
            search_time: text("search_time"),
            results,
            has_results: item
                .get("has_results")
                .and_then(Value::as_bool)
                .unwrap_or(results > 0),
        }
    }
}

/// Result-presence narrowing for the searches table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultsFilter {
    #[default]
    #[serde(rename = "All Results")]
    All,
    #[serde(rename = "Has Results")]
    HasResults,
    #[serde(rename = "Zero Results")]
    ZeroResults,
}

/// Active narrowing over the loaded page of search rows. "All ..." selects
/// are modelled as `None` so serde round-trips the sentinel labels the page
/// used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub exam: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub results: ResultsFilter,
}

/// One upload-history row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadRecord {
    pub id: i64,
    pub file_name: String,
    pub exam: String,
    pub year: String,
    pub records: i64,
    pub date: String,
    pub status: String,
}

/// A single pre-validation or backend-reported upload failure, renderable
/// as one line of the dismissible error report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
    pub field: String,
    pub message: String,
}

impl UploadIssue {
    pub fn file_level(field: &str, message: impl Into<String>) -> Self {
        UploadIssue {
            row: None,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Mutually-exclusive active-year selections plus the two notification
/// toggles from the settings page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemSettings {
    pub neet_pg_active_year: u16,
    pub neet_ss_active_year: u16,
    pub data_source_priority: String,
    pub automatic_backup: bool,
    pub email_notifications: bool,
}

impl Default for SystemSettings {
    /// The fixed baseline that "Reset to Defaults" restores without a
    /// network call.
    fn default() -> Self {
        SystemSettings {
            neet_pg_active_year: 2024,
            neet_ss_active_year: 2024,
            data_source_priority: "latest".to_string(),
            automatic_backup: true,
            email_notifications: true,
        }
    }
}

impl SystemSettings {
    /// At most one active year per exam type; setting a year replaces the
    /// previous selection for that exam and leaves the other exam alone.
    pub fn set_active_year(&mut self, exam_type: &str, year: u16) -> bool {
        match exam_type {
            "NEET-PG" => {
                self.neet_pg_active_year = year;
                true
            }
            "NEET-SS" => {
                self.neet_ss_active_year = year;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankBand {
    pub range: String,
    pub searches: i64,
    pub avg_results: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub label: String,
    pub searches: i64,
    pub zero_results: i64,
    pub avg_results: i64,
}

/// Aggregate analytics for the dashboard page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_searches: i64,
    pub unique_users: i64,
    pub success_results: i64,
    pub zero_results: i64,
    pub rank_bands: Vec<RankBand>,
    pub states: Vec<BreakdownRow>,
    pub specializations: Vec<BreakdownRow>,
    pub courses: Vec<BreakdownRow>,
    pub categories: Vec<BreakdownRow>,
    // Stamped by the gateway, never present in a backend response.
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
    /// True when the numbers are the built-in placeholder rather than a
    /// live backend aggregate.
    #[serde(default)]
    pub placeholder: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_record_maps_with_defaults() {
        let row = UserSearchRow::from_backend(&json!({
            "seqno": 42,
            "name": "Priya",
            "phone_number": "9000000001",
            "rank_no": 1200,
            "results_count": 3,
        }));
        assert_eq!(row.id, 42);
        assert_eq!(row.exam, "Unknown");
        assert_eq!(row.rank, "1200");
        assert_eq!(row.email, "");
        assert!(row.has_results);
    }

    #[test]
    fn has_results_falls_back_to_count() {
        let row = UserSearchRow::from_backend(&json!({"seqno": 1, "results_count": 0}));
        assert!(!row.has_results);
        let row = UserSearchRow::from_backend(&json!({"seqno": 2, "results_count": 0, "has_results": true}));
        assert!(row.has_results);
    }

    #[test]
    fn active_year_is_per_exam() {
        let mut settings = SystemSettings::default();
        assert!(settings.set_active_year("NEET-PG", 2023));
        assert_eq!(settings.neet_pg_active_year, 2023);
        assert_eq!(settings.neet_ss_active_year, 2024);
        assert!(!settings.set_active_year("NEET-UG", 2023));
    }

    #[test]
    fn backend_stats_parse_without_gateway_fields() {
        // a live backend aggregate carries none of the gateway-stamped
        // fields and must still parse as live data
        let stats: DashboardStats = serde_json::from_value(json!({
            "total_searches": 10,
            "unique_users": 8,
            "success_results": 6,
            "zero_results": 2,
            "rank_bands": [{"range": "<5k", "searches": 4, "avg_results": 2}],
            "states": [],
            "specializations": [],
            "courses": [],
            "categories": [],
        }))
        .unwrap();
        assert!(!stats.placeholder);
        assert_eq!(stats.total_searches, 10);
    }

    #[test]
    fn results_filter_serde_uses_page_labels() {
        let f: ResultsFilter = serde_json::from_value(json!("Zero Results")).unwrap();
        assert_eq!(f, ResultsFilter::ZeroResults);
        assert_eq!(serde_json::to_value(ResultsFilter::All).unwrap(), json!("All Results"));
    }
}
