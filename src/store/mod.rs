//! Persistence seam for the job board.
//!
//! [`Store`] is implemented by [`PgStore`] (diesel on PostgreSQL) and by
//! [`MemoryStore`]. Both enforce the same uniqueness rules: one application per
//! (applicant, job) and one connection per unordered pair of users. A violation
//! is reported as [`StoreError::UniqueViolation`] so callers can converge on a
//! single user-facing message whichever path detected the duplicate.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Application, ApplicationStatus, Connection, ConnectionStatus, Job, JobChanges, Message,
    NewApplication, NewJob, NewMessage, NewQuizResult, NewUser, ProfileChanges,
    QuizProfileUpdate, QuizResult, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(diesel::result::Error),
    #[error("database pool error: {0}")]
    Pool(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => StoreError::NotFound,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => StoreError::UniqueViolation(info.message().to_string()),
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<User>;

    async fn set_resume(&self, id: Uuid, key: &str, original_name: &str) -> StoreResult<User>;

    async fn set_profile_photo(&self, id: Uuid, key: &str) -> StoreResult<User>;

    /// Adds `other_id` to the user's accepted-connection set; no-op if present.
    async fn add_user_connection(&self, user_id: Uuid, other_id: Uuid) -> StoreResult<()>;

    async fn record_quiz_profile(
        &self,
        user_id: Uuid,
        update: QuizProfileUpdate,
    ) -> StoreResult<()>;

    async fn insert_job(&self, job: NewJob) -> StoreResult<Job>;

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>>;

    /// Jobs not latched as expired whose `[start_date, end_date]` contains `now`.
    async fn list_open_jobs(&self, now: NaiveDateTime) -> StoreResult<Vec<Job>>;

    /// Every job the owner ever posted, newest first.
    async fn list_jobs_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Job>>;

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> StoreResult<Job>;

    async fn delete_job(&self, id: Uuid) -> StoreResult<bool>;

    /// Returns `true` when the applicant was not yet in the set.
    async fn add_job_applicant(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    async fn remove_job_applicant(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    /// Sets `expired` on every job whose end date lies before `now`.
    async fn latch_expired_jobs(&self, now: NaiveDateTime) -> StoreResult<usize>;

    async fn insert_application(&self, application: NewApplication)
        -> StoreResult<Application>;

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>>;

    async fn find_application_for(
        &self,
        applicant_id: Uuid,
        job_id: Uuid,
    ) -> StoreResult<Option<Application>>;

    async fn list_applications_by_employer(
        &self,
        employer_id: Uuid,
    ) -> StoreResult<Vec<Application>>;

    async fn list_applications_by_applicant(
        &self,
        applicant_id: Uuid,
    ) -> StoreResult<Vec<Application>>;

    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Application>;

    async fn delete_application(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_connection(
        &self,
        requester_id: Uuid,
        recipient_id: Uuid,
    ) -> StoreResult<Connection>;

    async fn find_connection(&self, id: Uuid) -> StoreResult<Option<Connection>>;

    /// The connection between two users, in either direction.
    async fn find_connection_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<Connection>>;

    async fn update_connection(
        &self,
        id: Uuid,
        requester_id: Uuid,
        recipient_id: Uuid,
        status: ConnectionStatus,
    ) -> StoreResult<Connection>;

    /// Pending connections addressed to `user_id`, newest first.
    async fn list_incoming_requests(&self, user_id: Uuid) -> StoreResult<Vec<Connection>>;

    async fn list_accepted_connections(&self, user_id: Uuid) -> StoreResult<Vec<Connection>>;

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message>;

    /// The newest `limit` messages exchanged by `a` and `b` strictly before
    /// `before`, returned oldest first.
    async fn list_messages_between(
        &self,
        a: Uuid,
        b: Uuid,
        limit: usize,
        before: Option<NaiveDateTime>,
    ) -> StoreResult<Vec<Message>>;

    async fn insert_quiz_result(&self, result: NewQuizResult) -> StoreResult<QuizResult>;

    async fn attach_quiz_matches(
        &self,
        id: Uuid,
        match_count: i32,
        matched_job_ids: Vec<Uuid>,
        details: Value,
    ) -> StoreResult<QuizResult>;

    async fn latest_quiz_result(&self, user_id: Uuid) -> StoreResult<Option<QuizResult>>;
}
