use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Job Seeker")]
    JobSeeker,
    #[serde(rename = "Employer")]
    Employer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::JobSeeker => "Job Seeker",
            Role::Employer => "Employer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Job Seeker" => Ok(Role::JobSeeker),
            "Employer" => Ok(Role::Employer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Submitted,
    Reviewing,
    Shortlisted,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "submitted" => Ok(ApplicationStatus::Submitted),
            "reviewing" => Ok(ApplicationStatus::Reviewing),
            "shortlisted" => Ok(ApplicationStatus::Shortlisted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "hired" => Ok(ApplicationStatus::Hired),
            other => Err(format!("unknown application status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Declined,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Declined => "declined",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ConnectionStatus::Pending),
            "accepted" => Ok(ConnectionStatus::Accepted),
            "declined" => Ok(ConnectionStatus::Declined),
            other => Err(format!("unknown connection status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    #[serde(rename = "qId")]
    pub question_id: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub match_count: i32,
    pub matched_job_ids: Vec<Uuid>,
    pub skills_selected: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub skills: Vec<String>,
    pub about: String,
    pub company_description: String,
    pub hiring_roles: Vec<String>,
    pub resume_key: Option<String>,
    pub resume_name: Option<String>,
    pub profile_photo_key: Option<String>,
    pub connections: Vec<Uuid>,
    pub quiz_completed: bool,
    pub quiz_answers: Vec<QuizAnswer>,
    pub quiz_summary: Option<QuizSummary>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub skills: Option<Vec<String>>,
    pub about: Option<String>,
    pub company_description: Option<String>,
    pub hiring_roles: Option<Vec<String>>,
}

/// What the quiz writes back onto the user's profile.
#[derive(Debug, Clone)]
pub struct QuizProfileUpdate {
    pub skills: Vec<String>,
    pub answers: Vec<QuizAnswer>,
    pub summary: QuizSummary,
}

/// Identity fields safe to show to other users.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub skills: Vec<String>,
    pub profile_photo_key: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            skills: user.skills.clone(),
            profile_photo_key: user.profile_photo_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Salary {
    Fixed { amount: i64 },
    Range { from: i64, to: i64 },
}

#[derive(Debug, Clone)]
pub struct Job {
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
    pub applicants: Vec<Uuid>,
    pub vacancies: i32,
    pub employment_type: String,
    pub location_type: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Job {
    /// Lapsed jobs count as expired even before the sweep latches the flag.
    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        self.expired || self.end_date < now
    }

    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        !self.expired && self.start_date <= now && now <= self.end_date
    }

    pub fn salary(&self) -> Option<Salary> {
        match (self.fixed_salary, self.salary_from, self.salary_to) {
            (Some(amount), None, None) => Some(Salary::Fixed { amount }),
            (None, Some(from), Some(to)) => Some(Salary::Range { from, to }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub id: Uuid,
    pub posted_by: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub country: String,
    pub city: String,
    pub location: String,
    pub salary: Salary,
    pub skills: Vec<String>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub vacancies: i32,
    pub employment_type: String,
    pub location_type: String,
}

/// A fully-resolved replacement for the mutable fields of a job.
#[derive(Debug, Clone)]
pub struct JobChanges {
    pub title: String,
    pub description: String,
    pub category: String,
    pub country: String,
    pub city: String,
    pub location: String,
    pub salary: Salary,
    pub skills: Vec<String>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub expired: bool,
    pub vacancies: i32,
    pub employment_type: String,
    pub location_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRef {
    pub url: String,
    pub original_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub employer_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub cover_letter: String,
    pub resume: ResumeRef,
    pub status: ApplicationStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub employer_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub cover_letter: String,
    pub resume: ResumeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub status: ConnectionStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Connection {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.recipient_id == user_id
    }

    pub fn other_party(&self, user_id: Uuid) -> Uuid {
        if self.requester_id == user_id {
            self.recipient_id
        } else {
            self.requester_id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "sender")]
    pub sender_id: Uuid,
    #[serde(rename = "receiver")]
    pub receiver_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub answers: Vec<QuizAnswer>,
    pub skills_selected: Vec<String>,
    pub match_count: i32,
    pub matched_job_ids: Vec<Uuid>,
    pub details: serde_json::Value,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewQuizResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub answers: Vec<QuizAnswer>,
    pub skills_selected: Vec<String>,
}
