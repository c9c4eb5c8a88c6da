//! Application ledger: one application per (job seeker, job).
//!
//! The duplicate pre-check is only an early exit; the store's unique
//! constraint decides, and both paths report the same message.

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    directory,
    error::{BoardError, BoardResult},
    models::{Application, ApplicationStatus, NewApplication, ResumeRef, Role},
    realtime::{ApplicationNotice, RealtimeEvent, RealtimeHub},
    storage::ObjectStorage,
    store::{Store, StoreError},
    uploads::{self, Upload},
};

pub const ALREADY_APPLIED: &str = "You have already applied to this job.";

const NAME_LEN: (usize, usize) = (3, 100);
pub(crate) const EMAIL_MAX: usize = 255;
pub(crate) const PHONE_MAX: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInput {
    pub job_id: Option<Uuid>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStatus {
    Done,
    AlreadyClean,
    JobGone,
    Failed,
}

/// Result of a withdrawal: the application is gone whatever `applicant_cleanup`
/// says about the job's applicant set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawOutcome {
    pub application_id: Uuid,
    pub job_id: Uuid,
    pub applicant_cleanup: CleanupStatus,
}

fn require_role(user: &AuthenticatedUser, role: Role) -> BoardResult<()> {
    if user.role != role {
        return Err(BoardError::forbidden(format!(
            "{} not allowed to access this resource.",
            user.role
        )));
    }
    Ok(())
}

fn field(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub(crate) fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

struct Payload {
    name: String,
    email: String,
    phone: String,
    address: String,
    cover_letter: String,
}

fn validate_payload(input: &ApplicationInput) -> BoardResult<Payload> {
    let (Some(name), Some(email), Some(phone), Some(address), Some(cover_letter)) = (
        field(&input.name),
        field(&input.email),
        field(&input.phone),
        field(&input.address),
        field(&input.cover_letter),
    ) else {
        return Err(BoardError::validation("Please fill all fields."));
    };

    let len = name.chars().count();
    if len < NAME_LEN.0 {
        return Err(BoardError::validation("Name must contain at least 3 Characters!"));
    }
    if len > NAME_LEN.1 {
        return Err(BoardError::validation("Name cannot exceed 100 Characters!"));
    }
    if !looks_like_email(&email) {
        return Err(BoardError::validation("Please provide a valid Email!"));
    }
    if email.chars().count() > EMAIL_MAX {
        return Err(BoardError::validation("Email cannot exceed 255 Characters!"));
    }
    if phone.chars().count() > PHONE_MAX {
        return Err(BoardError::validation("Phone cannot exceed 50 Characters!"));
    }

    Ok(Payload {
        name,
        email,
        phone,
        address,
        cover_letter,
    })
}

async fn resolve_resume(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    applicant_id: Uuid,
    upload: Option<Upload>,
) -> BoardResult<ResumeRef> {
    if let Some(upload) = upload {
        uploads::check_resume(&upload)?;
        let original_name = upload.file_name.clone();
        let key = uploads::put(storage, uploads::RESUME_PREFIX, applicant_id, upload).await?;
        return Ok(ResumeRef {
            url: key,
            original_name,
        });
    }

    let user = store
        .find_user(applicant_id)
        .await?
        .ok_or_else(|| BoardError::not_found("User not found."))?;
    match user.resume_key {
        Some(key) => Ok(ResumeRef {
            original_name: user.resume_name.unwrap_or_else(|| key.clone()),
            url: key,
        }),
        None => Err(BoardError::validation(
            "Resume required. Please upload resume in Dashboard or attach it here.",
        )),
    }
}

pub async fn submit(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    hub: &RealtimeHub,
    user: &AuthenticatedUser,
    input: ApplicationInput,
    upload: Option<Upload>,
    now: NaiveDateTime,
) -> BoardResult<Application> {
    require_role(user, Role::JobSeeker)?;

    let job_id = input
        .job_id
        .ok_or_else(|| BoardError::validation("Job not provided!"))?;
    let job = store
        .find_job(job_id)
        .await?
        .ok_or_else(|| BoardError::not_found("Job not found!"))?;
    if !job.is_active_at(now) {
        return Err(BoardError::validation("Job is closed. You cannot apply."));
    }

    let payload = validate_payload(&input)?;

    if store
        .find_application_for(user.user_id, job_id)
        .await?
        .is_some()
    {
        return Err(BoardError::conflict(ALREADY_APPLIED));
    }

    let resume = resolve_resume(store, storage, user.user_id, upload).await?;

    let application = store
        .insert_application(NewApplication {
            id: Uuid::new_v4(),
            job_id,
            applicant_id: user.user_id,
            employer_id: job.posted_by,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
            cover_letter: payload.cover_letter,
            resume,
        })
        .await
        .map_err(insert_error)?;

    mirror_applicant(store, job_id, user.user_id, now).await;

    info!(
        application_id = %application.id,
        job_id = %job_id,
        user_id = %user.user_id,
        "application submitted"
    );
    hub.emit(
        application.employer_id,
        RealtimeEvent::ApplicationReceived(notice(&application)),
    );
    Ok(application)
}

/// Adds the applicant to the job's applicant set after the application is
/// stored. A failure is logged and leaves the application in place.
async fn mirror_applicant(
    store: &dyn Store,
    job_id: Uuid,
    user_id: Uuid,
    now: NaiveDateTime,
) -> bool {
    match directory::record_applicant(store, job_id, user_id, now).await {
        Ok(_) => true,
        Err(err) => {
            warn!(
                job_id = %job_id,
                user_id = %user_id,
                error = %err,
                "failed to record applicant on job"
            );
            false
        }
    }
}

fn insert_error(err: StoreError) -> BoardError {
    match err {
        StoreError::UniqueViolation(_) => BoardError::conflict(ALREADY_APPLIED),
        other => BoardError::Store(other),
    }
}

fn notice(application: &Application) -> ApplicationNotice {
    ApplicationNotice {
        application_id: application.id,
        job_id: application.job_id,
        applicant_id: application.applicant_id,
        status: application.status,
    }
}

pub async fn list_for_employer(
    store: &dyn Store,
    user: &AuthenticatedUser,
) -> BoardResult<Vec<Application>> {
    require_role(user, Role::Employer)?;
    Ok(store.list_applications_by_employer(user.user_id).await?)
}

pub async fn list_for_applicant(
    store: &dyn Store,
    user: &AuthenticatedUser,
) -> BoardResult<Vec<Application>> {
    require_role(user, Role::JobSeeker)?;
    Ok(store.list_applications_by_applicant(user.user_id).await?)
}

/// Deletes the application, then tries to drop the applicant from the job.
/// The second step never fails the withdrawal; its result is reported.
pub async fn withdraw(
    store: &dyn Store,
    hub: &RealtimeHub,
    user: &AuthenticatedUser,
    application_id: Uuid,
) -> BoardResult<WithdrawOutcome> {
    require_role(user, Role::JobSeeker)?;
    let application = store
        .find_application(application_id)
        .await?
        .ok_or_else(|| BoardError::not_found("Application not found!"))?;
    if application.applicant_id != user.user_id {
        return Err(BoardError::forbidden(
            "You can only withdraw your own applications.",
        ));
    }

    if !store.delete_application(application_id).await? {
        return Err(BoardError::not_found("Application not found!"));
    }

    let applicant_cleanup = match store
        .remove_job_applicant(application.job_id, application.applicant_id)
        .await
    {
        Ok(true) => CleanupStatus::Done,
        Ok(false) => CleanupStatus::AlreadyClean,
        Err(StoreError::NotFound) => CleanupStatus::JobGone,
        Err(err) => {
            warn!(
                job_id = %application.job_id,
                user_id = %application.applicant_id,
                error = %err,
                "failed to remove withdrawn applicant from job"
            );
            CleanupStatus::Failed
        }
    };

    info!(application_id = %application_id, user_id = %user.user_id, "application withdrawn");
    hub.emit(
        application.employer_id,
        RealtimeEvent::ApplicationWithdrawn(notice(&application)),
    );

    Ok(WithdrawOutcome {
        application_id,
        job_id: application.job_id,
        applicant_cleanup,
    })
}

pub async fn update_status(
    store: &dyn Store,
    hub: &RealtimeHub,
    user: &AuthenticatedUser,
    application_id: Uuid,
    status: ApplicationStatus,
) -> BoardResult<Application> {
    require_role(user, Role::Employer)?;
    let application = store
        .find_application(application_id)
        .await?
        .ok_or_else(|| BoardError::not_found("Application not found!"))?;
    if application.employer_id != user.user_id {
        return Err(BoardError::forbidden(
            "You can only review applications to your own jobs.",
        ));
    }

    let updated = store.set_application_status(application_id, status).await?;
    info!(
        application_id = %application_id,
        status = status.as_str(),
        "application status changed"
    );
    hub.emit(
        updated.applicant_id,
        RealtimeEvent::ApplicationStatus(notice(&updated)),
    );
    Ok(updated)
}

/// Short-lived download link for the application's resume.
pub async fn resume_link(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    user: &AuthenticatedUser,
    application_id: Uuid,
    ttl: Duration,
) -> BoardResult<(String, String)> {
    let application = store
        .find_application(application_id)
        .await?
        .ok_or_else(|| BoardError::not_found("Application not found!"))?;
    if application.applicant_id != user.user_id && application.employer_id != user.user_id {
        return Err(BoardError::forbidden(
            "You are not allowed to view this resume.",
        ));
    }
    let url = storage
        .presign_get_object(&application.resume.url, ttl)
        .await
        .map_err(BoardError::Storage)?;
    Ok((url, application.resume.original_name))
}
