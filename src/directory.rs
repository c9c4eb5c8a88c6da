//! Job directory: posting, skill-filtered listing and the job lifecycle.
//!
//! Expiry is derived. A job is active while `expired` is false and `now` lies
//! inside `[start_date, end_date]`; reads never write. [`sweep_expired`] is the
//! only path that latches the flag, apart from [`update`] which latches a
//! lapsed job before applying an edit so that moving the dates cannot reopen it.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{BoardError, BoardResult},
    matching,
    models::{Job, JobChanges, NewJob, Role, Salary},
    store::Store,
};

pub const TITLE_LEN: (usize, usize) = (3, 200);
pub const DESCRIPTION_LEN: (usize, usize) = (30, 5000);

/// Raw job fields as submitted by the client; every field is optional so the
/// same shape serves creation and partial updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub fixed_salary: Value,
    #[serde(default)]
    pub salary_from: Value,
    #[serde(default)]
    pub salary_to: Value,
    #[serde(default)]
    pub skills: Value,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub vacancies: Option<i32>,
    pub employment_type: Option<String>,
    pub location_type: Option<String>,
    pub expired: Option<bool>,
}

/// A job as shown to clients, with lifecycle flags evaluated at one instant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub id: Uuid,
    pub posted_by: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub country: String,
    pub city: String,
    pub location: String,
    pub fixed_salary: Option<i64>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub skills: Vec<String>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub expired: bool,
    pub active: bool,
    pub applicants: Vec<Uuid>,
    pub vacancies: i32,
    pub employment_type: String,
    pub location_type: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl JobView {
    pub fn at(job: Job, now: NaiveDateTime) -> Self {
        let expired = job.is_expired_at(now);
        let active = job.is_active_at(now);
        Self {
            id: job.id,
            posted_by: job.posted_by,
            title: job.title,
            description: job.description,
            category: job.category,
            country: job.country,
            city: job.city,
            location: job.location,
            fixed_salary: job.fixed_salary,
            salary_from: job.salary_from,
            salary_to: job.salary_to,
            skills: job.skills,
            start_date: job.start_date,
            end_date: job.end_date,
            expired,
            active,
            applicants: job.applicants,
            vacancies: job.vacancies,
            employment_type: job.employment_type,
            location_type: job.location_type,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

fn require_employer(user: &AuthenticatedUser) -> BoardResult<()> {
    if user.role != Role::Employer {
        return Err(BoardError::forbidden(
            "Job Seeker not allowed to access this resource.",
        ));
    }
    Ok(())
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn amount(raw: &Value, field: &str) -> BoardResult<Option<i64>> {
    let parsed = match raw {
        Value::Null => None,
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value.round() as i64)),
        Value::String(text) if text.trim().is_empty() => return Ok(None),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    match (raw, parsed) {
        (Value::Null, _) => Ok(None),
        (_, Some(value)) if value > 0 => Ok(Some(value)),
        (_, Some(_)) => Err(BoardError::validation(format!("{field} must be positive."))),
        (_, None) => Err(BoardError::validation(format!("{field} must be a number."))),
    }
}

fn parse_date(raw: &str, field: &str) -> BoardResult<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.naive_utc());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(parsed);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| BoardError::validation(format!("{field} is not a valid date.")))
}

fn optional_date(raw: &Option<String>, field: &str) -> BoardResult<Option<NaiveDateTime>> {
    match present(raw) {
        Some(text) => parse_date(&text, field).map(Some),
        None => Ok(None),
    }
}

/// Resolves the salary fields of `input`. `None` means the input names no
/// salary at all.
fn salary_from_input(input: &JobInput) -> BoardResult<Option<Salary>> {
    let fixed = amount(&input.fixed_salary, "fixedSalary")?;
    let from = amount(&input.salary_from, "salaryFrom")?;
    let to = amount(&input.salary_to, "salaryTo")?;
    match (fixed, from, to) {
        (None, None, None) => Ok(None),
        (Some(amount), None, None) => Ok(Some(Salary::Fixed { amount })),
        (Some(_), _, _) => Err(BoardError::validation(
            "Cannot Enter Fixed and Ranged Salary together.",
        )),
        (None, Some(from), Some(to)) if from > to => Err(BoardError::validation(
            "salaryFrom cannot be greater than salaryTo.",
        )),
        (None, Some(from), Some(to)) => Ok(Some(Salary::Range { from, to })),
        (None, _, _) => Err(BoardError::validation(
            "Please either provide fixed salary or ranged salary.",
        )),
    }
}

fn check_len(value: &str, (min, max): (usize, usize), label: &str) -> BoardResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(BoardError::validation(format!(
            "{label} must contain at least {min} Characters!"
        )));
    }
    if len > max {
        return Err(BoardError::validation(format!(
            "{label} cannot exceed {max} Characters!"
        )));
    }
    Ok(())
}

fn check_window(start: NaiveDateTime, end: NaiveDateTime) -> BoardResult<()> {
    if end <= start {
        return Err(BoardError::validation("endDate must be after startDate."));
    }
    Ok(())
}

fn check_vacancies(vacancies: i32) -> BoardResult<()> {
    if vacancies < 1 {
        return Err(BoardError::validation("vacancies must be at least 1."));
    }
    Ok(())
}

pub async fn post_job(
    store: &dyn Store,
    user: &AuthenticatedUser,
    input: JobInput,
    now: NaiveDateTime,
    default_duration_days: i64,
) -> BoardResult<Job> {
    require_employer(user)?;

    let (Some(title), Some(description), Some(category), Some(country), Some(city), Some(location)) = (
        present(&input.title),
        present(&input.description),
        present(&input.category),
        present(&input.country),
        present(&input.city),
        present(&input.location),
    ) else {
        return Err(BoardError::validation("Please provide full job details."));
    };

    let salary = salary_from_input(&input)?.ok_or_else(|| {
        BoardError::validation("Please either provide fixed salary or ranged salary.")
    })?;

    let skills = matching::skill_tokens(&input.skills);
    if skills.is_empty() {
        return Err(BoardError::validation(
            "Please provide at least one skill for this job.",
        ));
    }

    check_len(&title, TITLE_LEN, "Title")?;
    check_len(&description, DESCRIPTION_LEN, "Description")?;

    let start_date = optional_date(&input.start_date, "startDate")?.unwrap_or(now);
    let end_date = optional_date(&input.end_date, "endDate")?
        .unwrap_or(start_date + Duration::days(default_duration_days));
    check_window(start_date, end_date)?;

    let vacancies = input.vacancies.unwrap_or(1);
    check_vacancies(vacancies)?;

    let job = store
        .insert_job(NewJob {
            id: Uuid::new_v4(),
            posted_by: user.user_id,
            title,
            description,
            category,
            country,
            city,
            location,
            salary,
            skills,
            start_date,
            end_date,
            vacancies,
            employment_type: present(&input.employment_type).unwrap_or_default(),
            location_type: present(&input.location_type).unwrap_or_default(),
        })
        .await?;

    info!(job_id = %job.id, user_id = %user.user_id, skills = job.skills.len(), "job posted");
    Ok(job)
}

/// Active jobs whose skills match `requested`.
///
/// An empty request yields nothing. With `exclude_applicant`, jobs that user
/// already applied to are hidden, judged by both the application records and
/// the job's applicant set.
pub async fn list_active_by_skills(
    store: &dyn Store,
    requested: &[String],
    exclude_applicant: Option<Uuid>,
    now: NaiveDateTime,
) -> BoardResult<Vec<Job>> {
    let requested = matching::normalize_set(requested);
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let applied: HashSet<Uuid> = match exclude_applicant {
        Some(applicant_id) => store
            .list_applications_by_applicant(applicant_id)
            .await?
            .into_iter()
            .map(|application| application.job_id)
            .collect(),
        None => HashSet::new(),
    };

    let jobs = store
        .list_open_jobs(now)
        .await?
        .into_iter()
        .filter(|job| job.is_active_at(now))
        .filter(|job| {
            matching::matches_normalized(&requested, &matching::normalize_set(&job.skills))
        })
        .filter(|job| match exclude_applicant {
            Some(applicant_id) => {
                !applied.contains(&job.id) && !job.applicants.contains(&applicant_id)
            }
            None => true,
        })
        .collect();
    Ok(jobs)
}

pub async fn list_by_owner(store: &dyn Store, user: &AuthenticatedUser) -> BoardResult<Vec<Job>> {
    require_employer(user)?;
    Ok(store.list_jobs_by_owner(user.user_id).await?)
}

pub async fn get_by_id(store: &dyn Store, id: Uuid) -> BoardResult<Job> {
    store
        .find_job(id)
        .await?
        .ok_or_else(|| BoardError::not_found("Job not found."))
}

async fn owned_job(store: &dyn Store, user: &AuthenticatedUser, id: Uuid) -> BoardResult<Job> {
    require_employer(user)?;
    let job = store
        .find_job(id)
        .await?
        .ok_or_else(|| BoardError::not_found("OOPS! Job not found."))?;
    if job.posted_by != user.user_id {
        return Err(BoardError::forbidden("You can only manage your own jobs."));
    }
    Ok(job)
}

pub async fn update(
    store: &dyn Store,
    user: &AuthenticatedUser,
    id: Uuid,
    patch: JobInput,
    now: NaiveDateTime,
) -> BoardResult<Job> {
    let job = owned_job(store, user, id).await?;

    let title = present(&patch.title).unwrap_or(job.title.clone());
    let description = present(&patch.description).unwrap_or(job.description.clone());
    check_len(&title, TITLE_LEN, "Title")?;
    check_len(&description, DESCRIPTION_LEN, "Description")?;

    let salary = match salary_from_input(&patch)? {
        Some(salary) => salary,
        None => job
            .salary()
            .ok_or_else(|| BoardError::validation("Stored salary is inconsistent."))?,
    };

    let skills = if patch.skills.is_null() {
        job.skills.clone()
    } else {
        let skills = matching::skill_tokens(&patch.skills);
        if skills.is_empty() {
            return Err(BoardError::validation(
                "Please provide at least one skill for this job.",
            ));
        }
        skills
    };

    let start_date = optional_date(&patch.start_date, "startDate")?.unwrap_or(job.start_date);
    let end_date = optional_date(&patch.end_date, "endDate")?.unwrap_or(job.end_date);
    check_window(start_date, end_date)?;

    let vacancies = patch.vacancies.unwrap_or(job.vacancies);
    check_vacancies(vacancies)?;

    let expired = job.is_expired_at(now) || patch.expired.unwrap_or(false);

    let changes = JobChanges {
        title,
        description,
        category: present(&patch.category).unwrap_or(job.category),
        country: present(&patch.country).unwrap_or(job.country),
        city: present(&patch.city).unwrap_or(job.city),
        location: present(&patch.location).unwrap_or(job.location),
        salary,
        skills,
        start_date,
        end_date,
        expired,
        vacancies,
        employment_type: patch
            .employment_type
            .map(|value| value.trim().to_string())
            .unwrap_or(job.employment_type),
        location_type: patch
            .location_type
            .map(|value| value.trim().to_string())
            .unwrap_or(job.location_type),
    };

    let updated = store.update_job(id, changes).await?;
    info!(job_id = %id, user_id = %user.user_id, expired = updated.expired, "job updated");
    Ok(updated)
}

/// Removes the job. Applications that reference it are left in place.
pub async fn delete(store: &dyn Store, user: &AuthenticatedUser, id: Uuid) -> BoardResult<()> {
    owned_job(store, user, id).await?;
    if !store.delete_job(id).await? {
        return Err(BoardError::not_found("OOPS! Job not found."));
    }
    info!(job_id = %id, user_id = %user.user_id, "job deleted");
    Ok(())
}

/// Adds `user_id` to the job's applicant set; returns whether it was new.
pub async fn record_applicant(
    store: &dyn Store,
    job_id: Uuid,
    user_id: Uuid,
    now: NaiveDateTime,
) -> BoardResult<bool> {
    let job = get_by_id(store, job_id).await?;
    if !job.is_active_at(now) {
        return Err(BoardError::validation("Job is closed. You cannot apply."));
    }
    Ok(store.add_job_applicant(job_id, user_id).await?)
}

/// Latches `expired` on every lapsed job.
pub async fn sweep_expired(store: &dyn Store, now: NaiveDateTime) -> BoardResult<usize> {
    let latched = store.latch_expired_jobs(now).await?;
    if latched > 0 {
        info!(latched, "expired jobs latched");
    }
    Ok(latched)
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    pub(crate) fn employer() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            name: "Acme".into(),
            role: Role::Employer,
        }
    }

    pub(crate) fn seeker() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            name: "Sam".into(),
            role: Role::JobSeeker,
        }
    }

    pub(crate) fn job_input(skills: Value) -> JobInput {
        JobInput {
            title: Some("Frontend developer".into()),
            description: Some("Build and maintain the customer facing web application.".into()),
            category: Some("Engineering".into()),
            country: Some("India".into()),
            city: Some("Pune".into()),
            location: Some("Baner Road".into()),
            fixed_salary: json!(50000),
            skills,
            ..JobInput::default()
        }
    }

    #[tokio::test]
    async fn post_job_requires_exactly_one_salary_shape() {
        let store = MemoryStore::new();
        let owner = employer();
        let now = now();

        let mut both = job_input(json!(["React"]));
        both.salary_from = json!(10);
        both.salary_to = json!(20);
        let err = post_job(&store, &owner, both, now, 30).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot Enter Fixed and Ranged Salary together.");

        let mut neither = job_input(json!(["React"]));
        neither.fixed_salary = Value::Null;
        let err = post_job(&store, &owner, neither, now, 30).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please either provide fixed salary or ranged salary."
        );

        let mut ranged = job_input(json!("React, Node.js"));
        ranged.fixed_salary = Value::Null;
        ranged.salary_from = json!("1000");
        ranged.salary_to = json!(2000);
        let job = post_job(&store, &owner, ranged, now, 30).await.expect("ranged job");
        assert_eq!(job.salary(), Some(Salary::Range { from: 1000, to: 2000 }));
        assert_eq!(job.fixed_salary, None);
        assert_eq!(job.skills, vec!["React".to_string(), "Node.js".to_string()]);
        assert!(!job.expired);
        assert!(job.applicants.is_empty());
        assert_eq!(job.end_date, now + Duration::days(30));
    }

    #[tokio::test]
    async fn post_job_rejects_missing_skills_and_seekers() {
        let store = MemoryStore::new();
        let err = post_job(&store, &employer(), job_input(json!(" , ")), now(), 30)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please provide at least one skill for this job.");

        let err = post_job(&store, &seeker(), job_input(json!(["Rust"])), now(), 30)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Forbidden(_)));
    }

    #[tokio::test]
    async fn empty_request_lists_nothing() {
        let store = MemoryStore::new();
        post_job(&store, &employer(), job_input(json!(["React"])), now(), 30)
            .await
            .expect("job");
        let jobs = list_active_by_skills(&store, &[], None, now()).await.expect("list");
        assert!(jobs.is_empty());
        let jobs = list_active_by_skills(&store, &["!!".to_string()], None, now())
            .await
            .expect("list");
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn future_jobs_stay_hidden_until_their_window_opens() {
        let store = MemoryStore::new();
        let now = now();
        let mut input = job_input(json!(["ReactJS"]));
        input.start_date = Some((now + Duration::days(2)).format("%Y-%m-%d").to_string());
        input.end_date = Some((now + Duration::days(20)).format("%Y-%m-%d").to_string());
        post_job(&store, &employer(), input, now, 30).await.expect("job");

        let jobs = list_active_by_skills(&store, &["react".to_string()], None, now)
            .await
            .expect("list");
        assert!(jobs.is_empty());

        let later = now + Duration::days(3);
        let jobs = list_active_by_skills(&store, &["react".to_string()], None, later)
            .await
            .expect("list");
        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test]
    async fn applied_jobs_are_hidden_from_the_applicant() {
        let store = MemoryStore::new();
        let now = now();
        let job = post_job(&store, &employer(), job_input(json!(["Node"])), now, 30)
            .await
            .expect("job");
        let applicant = seeker();
        assert!(record_applicant(&store, job.id, applicant.user_id, now)
            .await
            .expect("record"));
        assert!(!record_applicant(&store, job.id, applicant.user_id, now)
            .await
            .expect("idempotent"));

        let hidden =
            list_active_by_skills(&store, &["node.js".to_string()], Some(applicant.user_id), now)
                .await
                .expect("list");
        assert!(hidden.is_empty());
        let visible = list_active_by_skills(&store, &["node.js".to_string()], None, now)
            .await
            .expect("list");
        assert_eq!(visible.len(), 1);
    }

    #[tokio::test]
    async fn lapsed_job_reads_expired_and_sweep_latches_it() {
        let store = MemoryStore::new();
        let posted_at = now() - Duration::days(40);
        let job = post_job(&store, &employer(), job_input(json!(["Go"])), posted_at, 30)
            .await
            .expect("job");
        let now = now();

        let read = get_by_id(&store, job.id).await.expect("read");
        assert!(!read.expired);
        assert!(JobView::at(read, now).expired);
        assert!(get_by_id(&store, job.id).await.expect("reread").is_expired_at(now));

        assert_eq!(sweep_expired(&store, now).await.expect("sweep"), 1);
        assert!(get_by_id(&store, job.id).await.expect("latched").expired);
        assert_eq!(sweep_expired(&store, now).await.expect("sweep again"), 0);

        let err = record_applicant(&store, job.id, Uuid::new_v4(), now)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Job is closed. You cannot apply.");
    }

    #[tokio::test]
    async fn editing_dates_cannot_reopen_a_lapsed_job() {
        let store = MemoryStore::new();
        let owner = employer();
        let posted_at = now() - Duration::days(40);
        let job = post_job(&store, &owner, job_input(json!(["Go"])), posted_at, 30)
            .await
            .expect("job");
        let now = now();

        let patch = JobInput {
            end_date: Some((now + Duration::days(10)).format("%Y-%m-%d").to_string()),
            ..JobInput::default()
        };
        let updated = update(&store, &owner, job.id, patch, now).await.expect("update");
        assert!(updated.expired);
        assert!(!updated.is_active_at(now));
    }

    #[tokio::test]
    async fn update_is_owner_only_and_renormalizes_skills() {
        let store = MemoryStore::new();
        let owner = employer();
        let job = post_job(&store, &owner, job_input(json!(["Go"])), now(), 30)
            .await
            .expect("job");

        let stranger = employer();
        let err = update(&store, &stranger, job.id, JobInput::default(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Forbidden(_)));

        let patch = JobInput {
            skills: json!("Rust, Tokio ,"),
            fixed_salary: Value::Null,
            salary_from: json!(100),
            salary_to: json!(200),
            ..JobInput::default()
        };
        let updated = update(&store, &owner, job.id, patch, now()).await.expect("update");
        assert_eq!(updated.skills, vec!["Rust".to_string(), "Tokio".to_string()]);
        assert_eq!(updated.salary(), Some(Salary::Range { from: 100, to: 200 }));
    }

    #[tokio::test]
    async fn listing_by_owner_includes_expired_jobs() {
        let store = MemoryStore::new();
        let owner = employer();
        post_job(&store, &owner, job_input(json!(["Go"])), now() - Duration::days(90), 30)
            .await
            .expect("old job");
        post_job(&store, &owner, job_input(json!(["Go"])), now(), 30)
            .await
            .expect("new job");
        post_job(&store, &employer(), job_input(json!(["Go"])), now(), 30)
            .await
            .expect("other job");

        assert_eq!(list_by_owner(&store, &owner).await.expect("mine").len(), 2);
        delete(&store, &owner, list_by_owner(&store, &owner).await.expect("mine")[0].id)
            .await
            .expect("delete");
        assert_eq!(list_by_owner(&store, &owner).await.expect("mine").len(), 1);
    }
}
