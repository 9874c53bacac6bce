use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::models::allotment::{options_for_group, GroupCategory};
use crate::models::intake::{validate, ExamKind, IntakeForm, SubmissionPayload};
use crate::session::{keys, set_typed};
use crate::state::AppState;
use crate::utils::respond::{reject, session_id};

pub const CATEGORY_OPTIONS: [&str; 10] = [
    "EWS", "EWS PwD", "OBC", "OBC PwD", "Open", "Open PwD", "SC", "SC PwD", "ST", "ST PwD",
];

pub const COURSE_OPTIONS: [&str; 2] = ["MD/MS", "DNB"];

/// The record the results pages rehydrate from. NEET-SS has no course or
/// category selection, so those fields travel empty for it.
pub fn predictor_record(form: &IntakeForm, exam: ExamKind) -> IntakeForm {
    let mut record = form.clone();
    record.exam = exam.display_name().to_string();
    if exam == ExamKind::NeetSs {
        record.course.clear();
        record.category.clear();
    }
    record
}

/// Dependent-option reconciliation: when the option list tied to the
/// selected course / qualifying group no longer contains the chosen
/// specialization, the specialization is cleared. `groups` is `None`
/// while the lookup has not loaded, and nothing is cleared then — a valid
/// value must never be dropped during the loading window.
pub fn reconcile_specialization(
    form: &mut IntakeForm,
    exam: ExamKind,
    groups: Option<&[GroupCategory]>,
) {
    let Some(groups) = groups else {
        return;
    };
    if form.specialization.is_empty() {
        return;
    }
    let options = options_for_group(groups, form.group_or_course(exam));
    if !options.iter().any(|o| o == &form.specialization) {
        form.specialization.clear();
    }
}

async fn fetch_group_categories(state: &AppState) -> Option<Vec<GroupCategory>> {
    match state.backend.get_json("/api/group-categories/", None).await {
        Ok(value) => serde_json::from_value(value).ok(),
        Err(e) => {
            error!("❌ Failed to fetch group categories: {}", e);
            None
        }
    }
}

/// GET /api/predictor/{exam}/options — dropdown data for the exam's filter
/// bar, recomputed from the backend lookup per request.
pub async fn handle_options(
    State(state): State<AppState>,
    Path(exam): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let exam = parse_exam(&exam)?;
    let groups = fetch_group_categories(&state)
        .await
        .ok_or_else(|| reject(StatusCode::BAD_GATEWAY, "Lookup data unavailable"))?;

    // Specialization options depend on the course/group stored for this
    // session, when there is one.
    let stored_form: Option<IntakeForm> = match session_id(&headers) {
        Some(sid) => crate::session::get_typed(state.sessions.as_ref(), &sid, keys::PREDICTOR_DATA)
            .await
            .unwrap_or(None),
        None => None,
    };
    let group_or_course = stored_form
        .as_ref()
        .map(|f| f.group_or_course(exam).to_string())
        .unwrap_or_default();

    Ok(Json(json!({
        "states": options_for_group(&groups, "state"),
        "specializations": options_for_group(&groups, &group_or_course),
        "courses": COURSE_OPTIONS,
        "categories": CATEGORY_OPTIONS,
    })))
}

/// POST /api/predictor/{exam}/submit — validate, store the handoff record,
/// query the allotment endpoint once and answer with the results route.
///
/// A backend failure does not fail the submission: the form still lands in
/// the session (the results view has a defined no-result state) and the
/// error message rides along for the caller to surface.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(exam): Path<String>,
    headers: HeaderMap,
    Json(form): Json<IntakeForm>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let exam = parse_exam(&exam)?;

    let errors = validate(&form, exam);
    if !errors.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": errors })),
        ));
    }

    let sid = session_id(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());
    let record = predictor_record(&form, exam);
    let payload = SubmissionPayload::from_form(&record, exam);

    let store = state.sessions.as_ref();
    set_typed(store, &sid, keys::PREDICTOR_DATA, &record)
        .await
        .map_err(internal)?;
    set_typed(store, &sid, exam.form_key(), &payload)
        .await
        .map_err(internal)?;

    let payload_json = serde_json::to_value(&payload).map_err(|e| internal(e.into()))?;
    let backend_error = match state
        .backend
        .post_json("/api/allotment_tracker/", &payload_json, None)
        .await
    {
        Ok(response) => {
            store
                .set(&sid, exam.result_key(), response)
                .await
                .map_err(internal)?;
            None
        }
        Err(e) => {
            error!("❌ {} submit call failed: {}", exam.allotment_category(), e);
            Some(e.to_string())
        }
    };

    info!(
        "📨 Intake submitted for {} (session {})",
        exam.display_name(),
        sid
    );
    let mut body = json!({
        "session_id": sid,
        "redirect": exam.results_route(),
    });
    if let Some(message) = backend_error {
        body["backend_error"] = json!(message);
    }
    Ok(Json(body))
}

pub fn parse_exam(segment: &str) -> Result<ExamKind, (StatusCode, Json<Value>)> {
    ExamKind::from_route(segment)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("Unknown exam: {segment}")))
}

pub fn internal(e: anyhow::Error) -> (StatusCode, Json<Value>) {
    error!("💥 Internal error: {:?}", e);
    reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<GroupCategory> {
        vec![
            GroupCategory {
                group_name: "MD/MS".to_string(),
                category_type: vec![
                    "M.D. (Anaesthesiology)".to_string(),
                    "M.D. (Radiology)".to_string(),
                ],
            },
            GroupCategory {
                group_name: "DNB".to_string(),
                category_type: vec!["DNB (Family Medicine)".to_string()],
            },
            GroupCategory {
                group_name: "Group A".to_string(),
                category_type: vec!["D.M. (Cardiology)".to_string()],
            },
        ]
    }

    fn pg_form(course: &str, specialization: &str) -> IntakeForm {
        IntakeForm {
            course: course.to_string(),
            specialization: specialization.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn course_switch_clears_foreign_specialization() {
        let mut form = pg_form("DNB", "M.D. (Radiology)");
        reconcile_specialization(&mut form, ExamKind::NeetPg, Some(&groups()));
        assert!(form.specialization.is_empty());
    }

    #[test]
    fn specialization_kept_when_still_offered() {
        let mut form = pg_form("MD/MS", "M.D. (Radiology)");
        reconcile_specialization(&mut form, ExamKind::NeetPg, Some(&groups()));
        assert_eq!(form.specialization, "M.D. (Radiology)");
    }

    #[test]
    fn group_name_match_is_case_insensitive() {
        let mut form = pg_form("md/ms", "M.D. (Radiology)");
        reconcile_specialization(&mut form, ExamKind::NeetPg, Some(&groups()));
        assert_eq!(form.specialization, "M.D. (Radiology)");
    }

    #[test]
    fn nothing_cleared_while_lookup_unloaded() {
        let mut form = pg_form("DNB", "M.D. (Radiology)");
        reconcile_specialization(&mut form, ExamKind::NeetPg, None);
        assert_eq!(form.specialization, "M.D. (Radiology)");
    }

    #[test]
    fn ss_reconciles_against_qualifying_group() {
        let mut form = IntakeForm {
            qualifying_group: "Group A".to_string(),
            specialization: "D.M. (Cardiology)".to_string(),
            ..Default::default()
        };
        reconcile_specialization(&mut form, ExamKind::NeetSs, Some(&groups()));
        assert_eq!(form.specialization, "D.M. (Cardiology)");

        form.qualifying_group = "Group B".to_string();
        reconcile_specialization(&mut form, ExamKind::NeetSs, Some(&groups()));
        assert!(form.specialization.is_empty());
    }

    #[test]
    fn ss_record_travels_without_course_or_category() {
        let form = IntakeForm {
            name: "A".to_string(),
            course: "MD/MS".to_string(),
            category: "EWS".to_string(),
            qualifying_group: "Group A".to_string(),
            ..Default::default()
        };
        let record = predictor_record(&form, ExamKind::NeetSs);
        assert_eq!(record.exam, "NEET SS");
        assert!(record.course.is_empty());
        assert!(record.category.is_empty());
        assert_eq!(record.qualifying_group, "Group A");

        let pg = predictor_record(&form, ExamKind::NeetPg);
        assert_eq!(pg.course, "MD/MS");
    }
}
