use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::models::admin::{ResultsFilter, SearchFilters, UserSearchRow};
use crate::services::auth::admin_token;
use crate::services::intake::internal;
use crate::state::AppState;
use crate::utils::respond::reject;

/// Pure narrowing over a loaded page of search rows: case-insensitive
/// substring on name/email, raw substring on phone, exact exam/category
/// match, result-presence match. The source is untouched and the function
/// is idempotent.
pub fn apply_filters(rows: &[UserSearchRow], filters: &SearchFilters) -> Vec<UserSearchRow> {
    let needle = filters.search.to_lowercase();
    rows.iter()
        .filter(|row| {
            if !needle.is_empty()
                && !row.name.to_lowercase().contains(&needle)
                && !row.email.to_lowercase().contains(&needle)
                && !row.phone.contains(&filters.search)
            {
                return false;
            }
            if let Some(exam) = &filters.exam {
                if &row.exam != exam {
                    return false;
                }
            }
            if let Some(category) = &filters.category {
                if &row.category != category {
                    return false;
                }
            }
            match filters.results {
                ResultsFilter::All => true,
                ResultsFilter::HasResults => row.results > 0,
                ResultsFilter::ZeroResults => row.results == 0,
            }
        })
        .cloned()
        .collect()
}

fn filters_from_query(query: &SearchListQuery) -> SearchFilters {
    let select = |value: &Option<String>, sentinel: &str| {
        value
            .as_deref()
            .filter(|v| !v.is_empty() && *v != sentinel)
            .map(str::to_string)
    };
    SearchFilters {
        search: query.search.clone().unwrap_or_default(),
        exam: select(&query.exam, "All Exams"),
        category: select(&query.category, "All Categories"),
        results: match query.results.as_deref() {
            Some("Has Results") => ResultsFilter::HasResults,
            Some("Zero Results") => ResultsFilter::ZeroResults,
            _ => ResultsFilter::All,
        },
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct SearchListQuery {
    pub search: Option<String>,
    pub exam: Option<String>,
    pub category: Option<String>,
    pub results: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// GET /api/admin/user-searches — fetch one backend page, narrow it with
/// the active filters and render the table rows.
pub async fn handle_list(
    State(state): State<AppState>,
    Query(query): Query<SearchListQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = admin_token(&state, &headers).await?;

    let path = format!(
        "/api/admin/user-searches/enhanced/?page={}&page_size={}",
        query.page.unwrap_or(1),
        query.page_size.unwrap_or(50),
    );
    let response = state
        .backend
        .get_json(&path, Some(&token))
        .await
        .map_err(|e| {
            error!("❌ Failed to load user searches: {}", e);
            reject(StatusCode::BAD_GATEWAY, e.to_string())
        })?;

    let rows: Vec<UserSearchRow> = response
        .get("data")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(UserSearchRow::from_backend).collect())
        .unwrap_or_default();

    let filters = filters_from_query(&query);
    let filtered = apply_filters(&rows, &filters);

    Ok(Json(json!({
        "data": filtered,
        "showing": filtered.len(),
        "total": rows.len(),
        "summary": response.get("summary").cloned().unwrap_or(Value::Null),
    })))
}

#[derive(Debug, serde::Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub filters: Value,
    /// Row count of the currently filtered set; an empty set has nothing
    /// to export.
    #[serde(default)]
    pub filtered_count: Option<u64>,
}

/// POST /api/admin/user-searches/export — delegate to the backend CSV
/// export with the active filter values. One export per session at a time.
pub async fn handle_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ExportRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = admin_token(&state, &headers).await?;
    let sid = crate::utils::respond::session_id(&headers).unwrap_or_default();

    if request.filtered_count == Some(0) {
        return Err(reject(StatusCode::BAD_REQUEST, "Nothing to export"));
    }
    // The guard releases the reservation on drop, so a cancelled request
    // cannot wedge the session in "export in progress".
    let Some(_export) = state.shared_state.begin_export(&sid) else {
        return Err(reject(StatusCode::CONFLICT, "Export already in progress"));
    };

    let result = state
        .backend
        .post_json(
            "/api/admin/user-searches/export-csv/",
            &json!({ "filters": request.filters }),
            Some(&token),
        )
        .await;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            error!("❌ CSV export failed: {}", e);
            Err(reject(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

/// GET /api/admin/user-searches/analytics — thin proxy.
pub async fn handle_analytics(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = admin_token(&state, &headers).await?;
    let path = format!(
        "/api/admin/user-searches/analytics/?days={}",
        query.days.unwrap_or(30)
    );
    state
        .backend
        .get_json(&path, Some(&token))
        .await
        .map(Json)
        .map_err(|e| internal(e))
}

#[derive(Debug, serde::Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, email: &str, phone: &str, exam: &str, category: &str, results: i64) -> UserSearchRow {
        UserSearchRow {
            id: 1,
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.to_string(),
            exam: exam.to_string(),
            rank: "100".to_string(),
            category: category.to_string(),
            state: "Delhi".to_string(),
            specialization: String::new(),
            course: "MD/MS".to_string(),
            search_time: String::new(),
            results,
            has_results: results > 0,
        }
    }

    fn sample_rows() -> Vec<UserSearchRow> {
        vec![
            row("Priya Shah", "priya@example.com", "9876543210", "NEET-PG", "OBC", 12),
            row("Arun Kumar", "arun@example.com", "9123456780", "NEET-SS", "General", 0),
            row("Meera Iyer", "meera@clinic.in", "9000011122", "NEET-PG", "SC", 4),
        ]
    }

    #[test]
    fn substring_matches_name_email_or_phone() {
        let rows = sample_rows();
        let filters = SearchFilters {
            search: "priya".to_string(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&rows, &filters).len(), 1);

        let filters = SearchFilters {
            search: "9123456".to_string(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&rows, &filters)[0].name, "Arun Kumar");

        let filters = SearchFilters {
            search: "clinic.in".to_string(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&rows, &filters)[0].name, "Meera Iyer");
    }

    #[test]
    fn exam_and_category_match_exactly() {
        let rows = sample_rows();
        let filters = SearchFilters {
            exam: Some("NEET-PG".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_filters(&rows, &filters).len(), 2);

        let filters = SearchFilters {
            exam: Some("NEET-PG".to_string()),
            category: Some("SC".to_string()),
            ..Default::default()
        };
        let filtered = apply_filters(&rows, &filters);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Meera Iyer");
    }

    #[test]
    fn results_presence_filters() {
        let rows = sample_rows();
        let has = apply_filters(
            &rows,
            &SearchFilters { results: ResultsFilter::HasResults, ..Default::default() },
        );
        assert_eq!(has.len(), 2);
        let zero = apply_filters(
            &rows,
            &SearchFilters { results: ResultsFilter::ZeroResults, ..Default::default() },
        );
        assert_eq!(zero.len(), 1);
        assert_eq!(zero[0].name, "Arun Kumar");
    }

    #[test]
    fn filtering_is_a_subset_and_idempotent() {
        let rows = sample_rows();
        let filters = SearchFilters {
            search: "a".to_string(),
            exam: Some("NEET-PG".to_string()),
            results: ResultsFilter::HasResults,
            ..Default::default()
        };
        let once = apply_filters(&rows, &filters);
        assert!(once.iter().all(|r| rows.contains(r)));
        let twice = apply_filters(&once, &filters);
        assert_eq!(once, twice);
    }

    #[test]
    fn sentinel_labels_mean_no_filter() {
        let query = SearchListQuery {
            search: None,
            exam: Some("All Exams".to_string()),
            category: Some("All Categories".to_string()),
            results: Some("All Results".to_string()),
            page: None,
            page_size: None,
        };
        let filters = filters_from_query(&query);
        assert!(filters.exam.is_none());
        assert!(filters.category.is_none());
        assert_eq!(filters.results, ResultsFilter::All);
        assert_eq!(apply_filters(&sample_rows(), &filters).len(), 3);
    }
}
