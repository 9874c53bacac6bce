use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::models::allotment::{group_thousands, AllotmentOutcome, AllotmentRow, GroupCategory};
use crate::models::intake::{ExamKind, IntakeForm, SubmissionPayload};
use crate::services::intake::{internal, parse_exam, reconcile_specialization};
use crate::session::{get_typed, keys, set_typed};
use crate::state::AppState;
use crate::utils::respond::{redirect, reject, session_id};

/// One college of the built-in sample list. This is the demo/empty-state
/// path for result pages with no live backend wired up, not a ranking
/// algorithm.
#[derive(Debug, Clone)]
pub struct College {
    pub id: u32,
    pub rank: i64,
    pub name: &'static str,
    pub location: &'static str,
    pub state: &'static str,
    pub specialization: &'static str,
    pub course: &'static str,
    pub category: &'static str,
}

pub fn sample_colleges() -> Vec<College> {
    const SAMPLE_SPECIALIZATION: &str = "M.D. (Anaesthesiology)";
    let rows = [
        (1, 20000, "All India Institute of Medical Sciences", "Ansari Nagar, New Delhi, 110029", "Delhi"),
        (2, 30000, "King Edward Memorial Hospital", "Parel, Mumbai, Maharashtra, 400012", "Maharashtra"),
        (3, 40000, "Postgraduate Institute of Medical Education and Research", "Sector 12, Chandigarh, 160012", "Chandigarh"),
        (4, 50000, "Jawaharlal Institute of Postgraduate Medical Education and Research", "Dhanvantari Nagar, Puducherry, 605006", "Puducherry"),
        (5, 60000, "Nizam's Institute of Medical Sciences", "Punjagutta, Hyderabad, Telangana, 500082", "Telangana"),
        (6, 70000, "Christian Medical College", "Vellore, Tamil Nadu, 632004", "Tamil Nadu"),
        (7, 80000, "Tata Memorial Hospital", "Parel, Mumbai, Maharashtra, 400012", "Maharashtra"),
        (8, 90000, "Lady Hardinge Medical College", "Connaught Place, New Delhi, 110001", "Delhi"),
        (9, 100000, "Sri Ramachandra Medical College", "Porur, Chennai, Tamil Nadu, 600116", "Tamil Nadu"),
        (10, 110000, "Kasturba Medical College", "Manipal, Karnataka, 576104", "Karnataka"),
        (11, 120000, "B.J. Medical College", "Sangamner Road, Pune, Maharashtra, 411001", "Maharashtra"),
    ];
    rows.iter()
        .map(|&(id, rank, name, location, state)| College {
            id,
            rank,
            name,
            location,
            state,
            specialization: SAMPLE_SPECIALIZATION,
            course: "MD/MS",
            category: "EWS",
        })
        .collect()
}

/// Fallback filter: rank is an ascending cutoff (college rank ≥ user
/// rank), state/specialization are equality-or-unset, course and category
/// compare exactly.
pub fn filter_colleges(colleges: &[College], form: &IntakeForm) -> Vec<College> {
    let user_rank: i64 = form.rank.trim().parse().unwrap_or(0);
    colleges
        .iter()
        .filter(|college| {
            college.rank >= user_rank
                && (form.state.is_empty() || college.state == form.state)
                && (form.specialization.is_empty() || college.specialization == form.specialization)
                && college.course == form.course
                && college.category == form.category
        })
        .cloned()
        .collect()
}

/// Display slice for one page. Pages are 1-based; a page index beyond the
/// end clamps to the last page, an empty set renders page 1 of 1.
pub fn paginate<T: Clone>(rows: &[T], page: usize, per_page: usize) -> (Vec<T>, usize, usize) {
    let per_page = per_page.max(1);
    let total_pages = rows.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(rows.len());
    (rows[start..end].to_vec(), page, total_pages)
}

fn api_row_json(index: usize, row: &AllotmentRow) -> Value {
    json!({
        "sr_no": index + 1,
        "rank": row.rank_display(),
        "college": row.allotted_institute,
        "state": row.state,
        "category": row.candidate_category,
    })
}

fn college_row_json(index: usize, college: &College) -> Value {
    json!({
        "sr_no": index + 1,
        "rank": group_thousands(college.rank),
        "college": college.name,
        "location": college.location,
        "state": college.state,
        "category": college.category,
    })
}

struct ResultsView {
    record: IntakeForm,
    stored_payload: Option<SubmissionPayload>,
    stored_result: Option<Value>,
}

/// Rehydrates the handoff state; `None` means there is nothing to show and
/// the caller must redirect to the intake route.
async fn load_view(state: &AppState, sid: &str, exam: ExamKind) -> anyhow::Result<Option<ResultsView>> {
    let store = state.sessions.as_ref();
    let Some(record) = get_typed::<IntakeForm>(store, sid, keys::PREDICTOR_DATA).await? else {
        return Ok(None);
    };
    Ok(Some(ResultsView {
        record,
        stored_payload: get_typed(store, sid, exam.form_key()).await?,
        stored_result: store.get(sid, exam.result_key()).await?,
    }))
}

/// Rows the page currently displays: the stored backend result when it has
/// a `filtered_results` array, else the locally filtered sample list.
fn displayed(view: &ResultsView) -> (Vec<Value>, &'static str) {
    if let Some(result) = &view.stored_result {
        if let AllotmentOutcome::Rows(rows) = AllotmentOutcome::from_response(result) {
            let rendered = rows
                .iter()
                .enumerate()
                .map(|(i, row)| api_row_json(i, row))
                .collect();
            return (rendered, "backend");
        }
    }
    let fallback = filter_colleges(&sample_colleges(), &view.record);
    let rendered = fallback
        .iter()
        .enumerate()
        .map(|(i, college)| college_row_json(i, college))
        .collect();
    (rendered, "fallback")
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

/// GET /api/predictor/{exam}/results — rehydrate and render. Backend rows
/// render in full, in array order; only the fallback list is paginated.
pub async fn handle_results(
    State(state): State<AppState>,
    Path(exam): Path<String>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let exam = parse_exam(&exam)?;
    let Some(sid) = session_id(&headers) else {
        return Ok(redirect("/"));
    };
    let Some(view) = load_view(&state, &sid, exam).await.map_err(internal)? else {
        return Ok(redirect("/"));
    };

    let (rows, source) = displayed(&view);
    let body = if source == "fallback" {
        let per_page = state.config.pagination.rows_per_page;
        let (page_rows, page, total_pages) = paginate(&rows, query.page.unwrap_or(1), per_page);
        json!({
            "user": view.record,
            "form": view.stored_payload,
            "source": source,
            "rows": page_rows,
            "total_rows": rows.len(),
            "page": page,
            "total_pages": total_pages,
        })
    } else {
        json!({
            "user": view.record,
            "form": view.stored_payload,
            "source": source,
            "total_rows": rows.len(),
            "rows": rows,
        })
    };
    Ok(Json(body))
}

/// POST /api/predictor/{exam}/update — re-query with the edited filter
/// snapshot. Stale responses (a newer update was issued meanwhile) are
/// discarded; a failed refresh keeps the prior rows.
pub async fn handle_update(
    State(state): State<AppState>,
    Path(exam): Path<String>,
    headers: HeaderMap,
    Json(snapshot): Json<IntakeForm>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let exam = parse_exam(&exam)?;
    let Some(sid) = session_id(&headers) else {
        return Ok(redirect("/"));
    };
    let Some(view) = load_view(&state, &sid, exam).await.map_err(internal)? else {
        return Ok(redirect("/"));
    };

    // Reconcile the edited snapshot against the live option lists before
    // querying; a lookup fetch failure leaves the snapshot as-is.
    let mut snapshot = snapshot;
    let groups: Option<Vec<GroupCategory>> = match state
        .backend
        .get_json("/api/group-categories/", None)
        .await
    {
        Ok(value) => serde_json::from_value(value).ok(),
        Err(_) => None,
    };
    reconcile_specialization(&mut snapshot, exam, groups.as_deref());

    let record = crate::services::intake::predictor_record(&snapshot, exam);
    let payload = SubmissionPayload::from_form(&record, exam);
    let payload_json = serde_json::to_value(&payload).map_err(|e| internal(e.into()))?;

    let seq_key = format!("{}:{}", sid, exam.allotment_category());
    let seq = state.shared_state.issue_update_seq(&seq_key);

    match state
        .backend
        .post_json("/api/allotment_tracker/", &payload_json, None)
        .await
    {
        Ok(response) => {
            // The claim holds the per-key apply lock across the session
            // writes, so a slower older response cannot land after a
            // newer one.
            let Some(commit) = state.shared_state.commit_update(&seq_key, seq).await else {
                info!("⏭️ Discarding stale update response (seq {})", seq);
                return Ok(Json(json!({ "stale": true })));
            };
            let store = state.sessions.as_ref();
            store
                .set(&sid, exam.result_key(), response.clone())
                .await
                .map_err(internal)?;
            set_typed(store, &sid, exam.form_key(), &payload)
                .await
                .map_err(internal)?;
            set_typed(store, &sid, keys::PREDICTOR_DATA, &record)
                .await
                .map_err(internal)?;
            commit.finish();

            let view = ResultsView {
                record,
                stored_payload: Some(payload),
                stored_result: Some(response),
            };
            let (rows, source) = displayed(&view);
            Ok(Json(json!({
                "source": source,
                "total_rows": rows.len(),
                "rows": rows,
            })))
        }
        Err(e) => {
            // No rows lost on a failed refresh: prior data stays stored.
            error!("❌ {} update call failed: {}", exam.allotment_category(), e);
            let (rows, source) = displayed(&view);
            Ok(Json(json!({
                "source": source,
                "total_rows": rows.len(),
                "rows": rows,
                "backend_error": e.to_string(),
            })))
        }
    }
}

/// GET /api/predictor/{exam}/export — the currently displayed rows as a
/// tabular CSV attachment.
pub async fn handle_export(
    State(state): State<AppState>,
    Path(exam): Path<String>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let exam = parse_exam(&exam)?;
    let Some(sid) = session_id(&headers) else {
        return Ok(redirect("/").into_response());
    };
    let Some(view) = load_view(&state, &sid, exam).await.map_err(internal)? else {
        return Ok(redirect("/").into_response());
    };

    let (rows, _) = displayed(&view);
    let csv = rows_to_csv(&rows).map_err(internal)?;
    let filename = format!("seat-predictor-{}.csv", exam.allotment_category().to_lowercase());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response())
}

pub fn rows_to_csv(rows: &[Value]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["Sr No", "Rank", "College", "State", "Category"])?;
    for row in rows {
        let cell = |key: &str| {
            row.get(key)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        };
        writer.write_record([
            cell("sr_no"),
            cell("rank"),
            cell("college"),
            cell("state"),
            cell("category"),
        ])?;
    }
    Ok(String::from_utf8(writer.into_inner()?)?)
}

#[derive(Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/predictor/{exam}/email — displayed rows plus the user's email
/// to the backend notification endpoint.
pub async fn handle_email(
    State(state): State<AppState>,
    Path(exam): Path<String>,
    headers: HeaderMap,
    Json(request): Json<EmailRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let exam = parse_exam(&exam)?;
    let Some(sid) = session_id(&headers) else {
        return Ok(redirect("/"));
    };
    let Some(view) = load_view(&state, &sid, exam).await.map_err(internal)? else {
        return Ok(redirect("/"));
    };

    let email = request
        .email
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| view.record.email.clone());
    if email.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "No email address on file"));
    }

    let (rows, _) = displayed(&view);
    let body = json!({
        "email": email,
        "exam": exam.display_name(),
        "rows": rows,
    });
    match state.backend.post_json("/api/email-results/", &body, None).await {
        Ok(_) => Ok(Json(json!({ "message": "Results emailed" }))),
        Err(e) => Err(reject(StatusCode::BAD_GATEWAY, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ss_demo_form(rank: &str, state: &str) -> IntakeForm {
        IntakeForm {
            rank: rank.to_string(),
            state: state.to_string(),
            course: "MD/MS".to_string(),
            category: "EWS".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn fallback_filter_applies_rank_cutoff_and_state() {
        let filtered = filter_colleges(&sample_colleges(), &ss_demo_form("15000", "Maharashtra"));
        // every sample rank exceeds 15000, so the cutoff excludes none;
        // state narrows to the three Maharashtra colleges
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|c| c.state == "Maharashtra"));
        assert!(filtered.iter().all(|c| c.rank >= 15000));
    }

    #[test]
    fn rank_cutoff_is_college_rank_at_least_user_rank() {
        let filtered = filter_colleges(&sample_colleges(), &ss_demo_form("95000", ""));
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|c| c.rank >= 95000));
    }

    #[test]
    fn empty_state_and_specialization_match_everything() {
        let filtered = filter_colleges(&sample_colleges(), &ss_demo_form("0", ""));
        assert_eq!(filtered.len(), sample_colleges().len());
    }

    #[test]
    fn course_and_category_compare_exactly() {
        let mut form = ss_demo_form("0", "");
        form.course = "DNB".to_string();
        assert!(filter_colleges(&sample_colleges(), &form).is_empty());

        let mut form = ss_demo_form("0", "");
        form.category.clear();
        assert!(filter_colleges(&sample_colleges(), &form).is_empty());
    }

    #[test]
    fn unparseable_rank_filters_as_zero() {
        let filtered = filter_colleges(&sample_colleges(), &ss_demo_form("", ""));
        assert_eq!(filtered.len(), sample_colleges().len());
    }

    #[test]
    fn pagination_slices_and_clamps() {
        let rows: Vec<u32> = (1..=25).collect();
        let (page_rows, page, total_pages) = paginate(&rows, 1, 10);
        assert_eq!((page_rows.len(), page, total_pages), (10, 1, 3));
        let (page_rows, page, _) = paginate(&rows, 3, 10);
        assert_eq!((page_rows.len(), page), (5, 3));
        // out-of-range page clamps to the last page
        let (page_rows, page, _) = paginate(&rows, 9, 10);
        assert_eq!((page_rows.len(), page), (5, 3));
        // empty set still renders page 1 of 1
        let (page_rows, page, total_pages) = paginate(&Vec::<u32>::new(), 1, 10);
        assert_eq!((page_rows.len(), page, total_pages), (0, 1, 1));
    }

    #[test]
    fn backend_rows_render_in_order_with_locale_ranks() {
        let view = ResultsView {
            record: IntakeForm::default(),
            stored_payload: None,
            stored_result: Some(json!({
                "filtered_results": [
                    {"rank_no": 15000, "allotted_institute": "KEM", "state": "Maharashtra", "candidate_category": "EWS"},
                    {"rank_no": 900, "allotted_institute": "AIIMS", "state": "Delhi", "candidate_category": "Open"},
                ]
            })),
        };
        let (rows, source) = displayed(&view);
        assert_eq!(source, "backend");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["rank"], "15,000");
        assert_eq!(rows[0]["sr_no"], 1);
        assert_eq!(rows[1]["college"], "AIIMS");
    }

    #[test]
    fn missing_result_falls_back_to_sample_list() {
        let view = ResultsView {
            record: ss_demo_form("15000", "Maharashtra"),
            stored_payload: None,
            stored_result: None,
        };
        let (rows, source) = displayed(&view);
        assert_eq!(source, "fallback");
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn result_without_rows_array_also_falls_back() {
        let view = ResultsView {
            record: ss_demo_form("15000", "Maharashtra"),
            stored_payload: None,
            stored_result: Some(json!({"message": "queued"})),
        };
        let (_, source) = displayed(&view);
        assert_eq!(source, "fallback");
    }

    #[test]
    fn update_lookup_payload_reconciles_snapshot() {
        // same deserialization target handle_update uses for the lookup
        let value = json!([
            {"group_name": "MD/MS", "category_type": ["M.D. (Radiology)"]},
            {"group_name": "DNB", "category_type": ["DNB (Family Medicine)"]},
        ]);
        let groups: Option<Vec<GroupCategory>> = serde_json::from_value(value).ok();
        assert!(groups.is_some());

        let mut snapshot = IntakeForm {
            course: "DNB".to_string(),
            specialization: "M.D. (Radiology)".to_string(),
            ..Default::default()
        };
        reconcile_specialization(&mut snapshot, ExamKind::NeetPg, groups.as_deref());
        assert!(snapshot.specialization.is_empty());
    }

    #[test]
    fn csv_export_covers_displayed_columns() {
        let rows = vec![json!({
            "sr_no": 1,
            "rank": "20,000",
            "college": "AIIMS",
            "state": "Delhi",
            "category": "EWS",
        })];
        let csv = rows_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Sr No,Rank,College,State,Category"));
        assert_eq!(lines.next(), Some("1,\"20,000\",AIIMS,Delhi,EWS"));
    }
}
