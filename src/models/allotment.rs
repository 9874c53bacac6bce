use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of the backend's `filtered_results`. The backend owns the schema;
/// anything beyond the four displayed columns rides along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllotmentRow {
    #[serde(default)]
    pub rank_no: Value,
    #[serde(default)]
    pub allotted_institute: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub candidate_category: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AllotmentRow {
    pub fn rank(&self) -> i64 {
        match &self.rank_no {
            Value::Number(n) => n.as_i64().unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Display form of the rank, thousands-separated the way the results
    /// table prints it.
    pub fn rank_display(&self) -> String {
        group_thousands(self.rank())
    }
}

/// What the results view gets back from the allotment endpoint, tagged so
/// rendering code pattern-matches instead of null-checking a duck-typed
/// blob.
#[derive(Debug, Clone, PartialEq)]
pub enum AllotmentOutcome {
    Rows(Vec<AllotmentRow>),
    Unavailable(String),
}

impl AllotmentOutcome {
    /// Classifies a raw backend response: a `filtered_results` array means
    /// rows, anything else is the no-result state.
    pub fn from_response(response: &Value) -> Self {
        match response.get("filtered_results") {
            Some(Value::Array(items)) => {
                let rows = items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect();
                AllotmentOutcome::Rows(rows)
            }
            _ => AllotmentOutcome::Unavailable("no filtered_results in response".to_string()),
        }
    }
}

/// Backend lookup used to populate the State/Course/Specialization option
/// lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupCategory {
    pub group_name: String,
    #[serde(default)]
    pub category_type: Vec<String>,
}

/// Option values for the group whose name matches `group` case-insensitively.
/// Empty when the lookup has no such group (or has not loaded).
pub fn options_for_group<'a>(groups: &'a [GroupCategory], group: &str) -> &'a [String] {
    groups
        .iter()
        .find(|g| g.group_name.eq_ignore_ascii_case(group))
        .map(|g| g.category_type.as_slice())
        .unwrap_or(&[])
}

pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    let first = digits.len() % 3;
    if first > 0 {
        out.push_str(&digits[..first]);
        if digits.len() > first {
            out.push(',');
        }
    }
    for (i, chunk) in digits[first..].as_bytes().chunks(3).enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_classifies_rows_in_order() {
        let response = json!({
            "filtered_results": [
                {"rank_no": 201, "allotted_institute": "AIIMS", "state": "Delhi", "candidate_category": "Open"},
                {"rank_no": "1450", "allotted_institute": "KEM", "state": "Maharashtra", "candidate_category": "EWS"},
            ]
        });
        match AllotmentOutcome::from_response(&response) {
            AllotmentOutcome::Rows(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].allotted_institute, "AIIMS");
                assert_eq!(rows[0].rank(), 201);
                assert_eq!(rows[1].rank(), 1450);
            }
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn outcome_without_results_array_is_unavailable() {
        let response = json!({"message": "processing"});
        assert!(matches!(
            AllotmentOutcome::from_response(&response),
            AllotmentOutcome::Unavailable(_)
        ));
    }

    #[test]
    fn extra_columns_ride_along() {
        let row: AllotmentRow = serde_json::from_value(json!({
            "rank_no": 7,
            "allotted_institute": "PGIMER",
            "state": "Chandigarh",
            "candidate_category": "SC",
            "round": "2",
        }))
        .unwrap();
        assert_eq!(row.extra.get("round"), Some(&json!("2")));
    }

    #[test]
    fn options_match_group_name_case_insensitively() {
        let groups = vec![
            GroupCategory {
                group_name: "State".to_string(),
                category_type: vec!["Delhi".to_string(), "Maharashtra".to_string()],
            },
            GroupCategory {
                group_name: "MD/MS".to_string(),
                category_type: vec!["M.D. (Radiology)".to_string()],
            },
        ];
        assert_eq!(options_for_group(&groups, "md/ms").len(), 1);
        assert_eq!(options_for_group(&groups, "state")[0], "Delhi");
        assert!(options_for_group(&groups, "DNB").is_empty());
    }

    #[test]
    fn thousands_grouping_matches_locale_string() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(15000), "15,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(-45230), "-45,230");
        assert_eq!(group_thousands(i64::MIN), "-9,223,372,036,854,775,808");
    }
}
