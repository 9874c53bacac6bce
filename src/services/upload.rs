use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::multipart;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::models::admin::{UploadIssue, UploadRecord};
use crate::services::auth::admin_token;
use crate::services::intake::internal;
use crate::state::AppState;
use crate::utils::respond::reject;

const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

/// Client-side pre-checks, run before any network call. A failure list
/// short-circuits the upload; the backend only ever sees files that
/// passed.
pub fn precheck_file(file_name: &str, size_bytes: u64, max_bytes: u64) -> Vec<UploadIssue> {
    let mut issues = Vec::new();

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        issues.push(UploadIssue::file_level(
            "file_type",
            format!(
                "Unsupported file type \"{}\": expected csv, xlsx or xls",
                file_name
            ),
        ));
    }

    if size_bytes > max_bytes {
        issues.push(UploadIssue::file_level(
            "file_size",
            format!(
                "File is {:.1} MB, the limit is {} MB",
                size_bytes as f64 / (1024.0 * 1024.0),
                max_bytes / (1024 * 1024)
            ),
        ));
    }

    issues
}

/// POST /api/admin/upload — multipart of `file`, `exam`, `year`. Pre-checks
/// first; passing files are forwarded as-is to the backend ingest
/// endpoint.
pub async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut parts: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = admin_token(&state, &headers).await?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut exam = String::new();
    let mut year = String::new();

    while let Some(field) = parts
        .next_field()
        .await
        .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;
                file = Some((name, bytes.to_vec()));
            }
            "exam" => {
                exam = field
                    .text()
                    .await
                    .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;
            }
            "year" => {
                year = field
                    .text()
                    .await
                    .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;
            }
            _ => {}
        }
    }

    let mut issues = Vec::new();
    if exam.is_empty() {
        issues.push(UploadIssue::file_level("exam", "Exam type is required"));
    }
    if year.is_empty() {
        issues.push(UploadIssue::file_level("year", "Year is required"));
    }
    let Some((file_name, bytes)) = file else {
        issues.push(UploadIssue::file_level("file", "No file attached"));
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": issues }))));
    };
    issues.extend(precheck_file(
        &file_name,
        bytes.len() as u64,
        state.config.upload.max_bytes,
    ));
    if !issues.is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": issues }))));
    }

    info!("📤 Forwarding upload {} ({} / {})", file_name, exam, year);
    let form = multipart::Form::new()
        .part(
            "file",
            multipart::Part::bytes(bytes).file_name(file_name.clone()),
        )
        .text("exam", exam)
        .text("year", year);

    match state
        .backend
        .post_multipart("/api/upload-excel/", form, Some(&token))
        .await
    {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            error!("❌ Upload forwarding failed: {}", e);
            Err(reject(StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

/// GET /api/admin/upload/history — upload-history rows from the backend.
pub async fn handle_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let token = admin_token(&state, &headers).await?;
    let response = state
        .backend
        .get_json("/api/admin/upload/history/", Some(&token))
        .await
        .map_err(|e| {
            error!("❌ Failed to load upload history: {}", e);
            reject(StatusCode::BAD_GATEWAY, e.to_string())
        })?;

    let records: Vec<UploadRecord> = response
        .get("upload_history")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    Ok(Json(json!({ "upload_history": records })))
}

/// POST /api/admin/upload/error-report — render a pre-validation (or
/// backend-reported) issue list as a downloadable CSV.
pub async fn handle_error_report(
    Json(issues): Json<Vec<UploadIssue>>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let csv = issues_to_csv(&issues).map_err(internal)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"upload-errors.csv\"".to_string(),
            ),
        ],
        csv,
    )
        .into_response())
}

pub fn issues_to_csv(issues: &[UploadIssue]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["Row", "Field", "Message"])?;
    for issue in issues {
        writer.write_record([
            issue.row.map(|r| r.to_string()).unwrap_or_default(),
            issue.field.clone(),
            issue.message.clone(),
        ])?;
    }
    Ok(String::from_utf8(writer.into_inner()?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN_MB: u64 = 10 * 1024 * 1024;

    #[test]
    fn txt_file_rejected_for_type_regardless_of_size() {
        let issues = precheck_file("data.txt", 10, TEN_MB);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "file_type");
    }

    #[test]
    fn oversized_csv_rejected_for_size() {
        let issues = precheck_file("data.csv", 11 * 1024 * 1024, TEN_MB);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "file_size");
    }

    #[test]
    fn small_csv_passes_prechecks() {
        assert!(precheck_file("data.csv", 1024 * 1024, TEN_MB).is_empty());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(precheck_file("EXPORT.XLSX", 100, TEN_MB).is_empty());
        assert!(precheck_file("legacy.XLS", 100, TEN_MB).is_empty());
    }

    #[test]
    fn extensionless_name_is_a_type_error() {
        let issues = precheck_file("data", 100, TEN_MB);
        assert_eq!(issues[0].field, "file_type");
    }

    #[test]
    fn oversized_wrong_type_reports_both() {
        let issues = precheck_file("dump.zip", 11 * 1024 * 1024, TEN_MB);
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["file_type", "file_size"]);
    }

    #[test]
    fn issue_list_renders_as_csv_report() {
        let issues = vec![
            UploadIssue { row: Some(12), field: "rank_no".to_string(), message: "not a number".to_string() },
            UploadIssue::file_level("file_size", "File is 11.0 MB, the limit is 10 MB"),
        ];
        let csv = issues_to_csv(&issues).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Row,Field,Message"));
        assert_eq!(lines.next(), Some("12,rank_no,not a number"));
        assert_eq!(
            lines.next(),
            Some(",file_size,\"File is 11.0 MB, the limit is 10 MB\"")
        );
    }
}
