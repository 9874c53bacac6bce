use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The two exam tracks served by the predictor. Each has its own filter
/// vocabulary (course/category for PG, qualifying group for SS) and its own
/// pair of session keys for the results handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExamKind {
    NeetPg,
    NeetSs,
}

impl ExamKind {
    pub fn allotment_category(&self) -> &'static str {
        match self {
            ExamKind::NeetPg => "NEET_PG",
            ExamKind::NeetSs => "NEET_SS",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ExamKind::NeetPg => "NEET PG",
            ExamKind::NeetSs => "NEET SS",
        }
    }

    pub fn form_key(&self) -> &'static str {
        match self {
            ExamKind::NeetPg => "neetPgForm",
            ExamKind::NeetSs => "neetSsForm",
        }
    }

    pub fn result_key(&self) -> &'static str {
        match self {
            ExamKind::NeetPg => "neetPgResult",
            ExamKind::NeetSs => "neetSsResult",
        }
    }

    pub fn results_route(&self) -> &'static str {
        match self {
            ExamKind::NeetPg => "/neet-pg",
            ExamKind::NeetSs => "/neet-ss",
        }
    }

    pub fn from_route(segment: &str) -> Option<Self> {
        match segment {
            "neet-pg" => Some(ExamKind::NeetPg),
            "neet-ss" => Some(ExamKind::NeetSs),
            _ => None,
        }
    }
}

/// Raw candidate form as the landing page collects it. Field names follow
/// the stored `predictorData` record so old sessions keep deserializing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntakeForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub rank: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "qualifyingGroup")]
    pub qualifying_group: String,
    #[serde(default)]
    pub exam: String,
}

impl IntakeForm {
    /// Sets one field by name. Unknown names are ignored rather than
    /// rejected, matching the forgiving form controller this replaces.
    pub fn set_field(&mut self, field: &str, value: &str) {
        match field {
            "name" => self.name = value.to_string(),
            "phone" => self.phone = value.to_string(),
            "email" => self.email = value.to_string(),
            "rank" => self.rank = value.to_string(),
            "state" => self.state = value.to_string(),
            "specialization" => self.specialization = value.to_string(),
            "course" => self.course = value.to_string(),
            "category" => self.category = value.to_string(),
            "qualifyingGroup" => self.qualifying_group = value.to_string(),
            _ => {}
        }
    }

    /// The filter the allotment endpoint keys on: course for NEET-PG,
    /// qualifying group for NEET-SS.
    pub fn group_or_course(&self, exam: ExamKind) -> &str {
        match exam {
            ExamKind::NeetPg => &self.course,
            ExamKind::NeetSs => &self.qualifying_group,
        }
    }
}

/// Backend-shaped projection of an [`IntakeForm`], built once per submit or
/// update and mirrored into the session for reload continuity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionPayload {
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub rank_no: i64,
    pub state: String,
    pub allotment_category: String,
    pub qualifying_group_or_course: String,
    pub specialization: String,
    pub category: String,
}

impl SubmissionPayload {
    pub fn from_form(form: &IntakeForm, exam: ExamKind) -> Self {
        SubmissionPayload {
            name: form.name.clone(),
            phone_number: form.phone.clone(),
            email: form.email.clone(),
            rank_no: form.rank.trim().parse().unwrap_or(0),
            state: form.state.clone(),
            allotment_category: exam.allotment_category().to_string(),
            qualifying_group_or_course: form.group_or_course(exam).to_string(),
            specialization: form.specialization.clone(),
            category: form.category.clone(),
        }
    }
}

pub type FieldErrors = HashMap<&'static str, String>;

/// Permissive shape check, not RFC compliance. Real validation is the
/// backend's job.
pub fn looks_like_email(value: &str) -> bool {
    let trimmed = value.trim();
    let Some(at) = trimmed.find('@') else {
        return false;
    };
    let (local, domain) = trimmed.split_at(at);
    let domain = &domain[1..];
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !trimmed.contains(char::is_whitespace)
}

/// Field-scoped validation. An empty map means the form may be submitted;
/// any entry blocks submission and is rendered inline next to its field.
pub fn validate(form: &IntakeForm, exam: ExamKind) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if form.name.trim().is_empty() {
        errors.insert("name", "Name is required".to_string());
    }
    if form.phone.trim().is_empty() {
        errors.insert("phone", "Phone number is required".to_string());
    }
    if form.email.trim().is_empty() {
        errors.insert("email", "Email is required".to_string());
    } else if !looks_like_email(&form.email) {
        errors.insert("email", "Enter a valid email address".to_string());
    }
    if form.rank.trim().is_empty() {
        errors.insert("rank", "Rank is required".to_string());
    } else if form.rank.trim().parse::<i64>().is_err() {
        errors.insert("rank", "Rank must be a number".to_string());
    }
    if form.specialization.trim().is_empty() {
        errors.insert("specialization", "Specialization is required".to_string());
    }

    match exam {
        ExamKind::NeetPg => {
            if form.state.trim().is_empty() {
                errors.insert("state", "State is required".to_string());
            }
        }
        ExamKind::NeetSs => {
            if form.qualifying_group.trim().is_empty() {
                errors.insert("qualifyingGroup", "Qualifying group is required".to_string());
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_pg_form() -> IntakeForm {
        IntakeForm {
            name: "Rajesh Das".to_string(),
            phone: "9876543210".to_string(),
            email: "rajesh@example.com".to_string(),
            rank: "15000".to_string(),
            state: "Maharashtra".to_string(),
            specialization: "M.D. (Radiology)".to_string(),
            course: "MD/MS".to_string(),
            category: "EWS".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_pg_form_passes() {
        assert!(validate(&filled_pg_form(), ExamKind::NeetPg).is_empty());
    }

    #[test]
    fn pg_requires_state_but_ss_does_not() {
        let mut form = filled_pg_form();
        form.state.clear();
        form.qualifying_group = "Group A".to_string();

        let pg_errors = validate(&form, ExamKind::NeetPg);
        assert!(pg_errors.contains_key("state"));

        let ss_errors = validate(&form, ExamKind::NeetSs);
        assert!(!ss_errors.contains_key("state"));
    }

    #[test]
    fn ss_requires_qualifying_group() {
        let mut form = filled_pg_form();
        form.qualifying_group.clear();
        let errors = validate(&form, ExamKind::NeetSs);
        assert_eq!(errors.get("qualifyingGroup").map(String::as_str), Some("Qualifying group is required"));
    }

    #[test]
    fn rank_must_be_numeric() {
        let mut form = filled_pg_form();
        form.rank = "about 15k".to_string();
        let errors = validate(&form, ExamKind::NeetPg);
        assert!(errors.contains_key("rank"));
    }

    #[test]
    fn email_shape_is_checked_permissively() {
        assert!(looks_like_email("a@b.co"));
        assert!(looks_like_email("first.last+tag@sub.domain.in"));
        assert!(!looks_like_email("not-an-email"));
        assert!(!looks_like_email("x@nodot"));
        assert!(!looks_like_email("spaced name@x.in"));
    }

    #[test]
    fn payload_renames_and_coerces_fields() {
        let payload = SubmissionPayload::from_form(&filled_pg_form(), ExamKind::NeetPg);
        assert_eq!(payload.phone_number, "9876543210");
        assert_eq!(payload.rank_no, 15000);
        assert_eq!(payload.allotment_category, "NEET_PG");
        assert_eq!(payload.qualifying_group_or_course, "MD/MS");
    }

    #[test]
    fn ss_payload_uses_qualifying_group() {
        let mut form = filled_pg_form();
        form.qualifying_group = "Group B".to_string();
        let payload = SubmissionPayload::from_form(&form, ExamKind::NeetSs);
        assert_eq!(payload.allotment_category, "NEET_SS");
        assert_eq!(payload.qualifying_group_or_course, "Group B");
    }

    #[test]
    fn set_field_ignores_unknown_names() {
        let mut form = IntakeForm::default();
        form.set_field("qualifyingGroup", "Group C");
        form.set_field("no_such_field", "x");
        assert_eq!(form.qualifying_group, "Group C");
    }
}
