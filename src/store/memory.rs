use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Application, ApplicationStatus, Connection, ConnectionStatus, Job, JobChanges, Message,
    NewApplication, NewJob, NewMessage, NewQuizResult, NewUser, ProfileChanges,
    QuizProfileUpdate, QuizResult, Salary, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    jobs: HashMap<Uuid, Job>,
    applications: HashMap<Uuid, Application>,
    connections: Vec<Connection>,
    messages: Vec<Message>,
    quiz_results: Vec<QuizResult>,
}

/// Process-local store. Records live only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn salary_columns(salary: Salary) -> (Option<i64>, Option<i64>, Option<i64>) {
    match salary {
        Salary::Fixed { amount } => (Some(amount), None, None),
        Salary::Range { from, to } => (None, Some(from), Some(to)),
    }
}

fn is_pair(connection: &Connection, a: Uuid, b: Uuid) -> bool {
    (connection.requester_id == a && connection.recipient_id == b)
        || (connection.requester_id == b && connection.recipient_id == a)
}

fn newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> NaiveDateTime,
{
    items.sort_by(|left, right| key(right).cmp(&key(left)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let timestamp = now();
        let record = User {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            role: user.role,
            skills: Vec::new(),
            about: String::new(),
            company_description: String::new(),
            hiring_roles: Vec::new(),
            resume_key: None,
            resume_name: None,
            profile_photo_key: None,
            connections: Vec::new(),
            quiz_completed: false,
            quiz_answers: Vec::new(),
            quiz_summary: None,
            created_at: timestamp,
            updated_at: timestamp,
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(users)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(skills) = changes.skills {
            user.skills = skills;
        }
        if let Some(about) = changes.about {
            user.about = about;
        }
        if let Some(description) = changes.company_description {
            user.company_description = description;
        }
        if let Some(roles) = changes.hiring_roles {
            user.hiring_roles = roles;
        }
        user.updated_at = now();
        Ok(user.clone())
    }

    async fn set_resume(&self, id: Uuid, key: &str, original_name: &str) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.resume_key = Some(key.to_string());
        user.resume_name = Some(original_name.to_string());
        user.updated_at = now();
        Ok(user.clone())
    }

    async fn set_profile_photo(&self, id: Uuid, key: &str) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.profile_photo_key = Some(key.to_string());
        user.updated_at = now();
        Ok(user.clone())
    }

    async fn add_user_connection(&self, user_id: Uuid, other_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        if !user.connections.contains(&other_id) {
            user.connections.push(other_id);
            user.updated_at = now();
        }
        Ok(())
    }

    async fn record_quiz_profile(
        &self,
        user_id: Uuid,
        update: QuizProfileUpdate,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.quiz_completed = true;
        user.skills = update.skills;
        user.quiz_answers = update.answers;
        user.quiz_summary = Some(update.summary);
        user.updated_at = now();
        Ok(())
    }

    async fn insert_job(&self, job: NewJob) -> StoreResult<Job> {
        let (fixed_salary, salary_from, salary_to) = salary_columns(job.salary);
        let timestamp = now();
        let record = Job {
            id: job.id,
            posted_by: job.posted_by,
            title: job.title,
            description: job.description,
            category: job.category,
            country: job.country,
            city: job.city,
            location: job.location,
            fixed_salary,
            salary_from,
            salary_to,
            skills: job.skills,
            start_date: job.start_date,
            end_date: job.end_date,
            expired: false,
            applicants: Vec::new(),
            vacancies: job.vacancies,
            employment_type: job.employment_type,
            location_type: job.location_type,
            created_at: timestamp,
            updated_at: timestamp,
        };
        self.tables
            .write()
            .await
            .jobs
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        Ok(self.tables.read().await.jobs.get(&id).cloned())
    }

    async fn list_open_jobs(&self, now: NaiveDateTime) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .tables
            .read()
            .await
            .jobs
            .values()
            .filter(|job| job.is_active_at(now))
            .cloned()
            .collect();
        newest_first(&mut jobs, |job| job.created_at);
        Ok(jobs)
    }

    async fn list_jobs_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .tables
            .read()
            .await
            .jobs
            .values()
            .filter(|job| job.posted_by == owner_id)
            .cloned()
            .collect();
        newest_first(&mut jobs, |job| job.created_at);
        Ok(jobs)
    }

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> StoreResult<Job> {
        let mut tables = self.tables.write().await;
        let job = tables.jobs.get_mut(&id).ok_or(StoreError::NotFound)?;
        let (fixed_salary, salary_from, salary_to) = salary_columns(changes.salary);
        job.title = changes.title;
        job.description = changes.description;
        job.category = changes.category;
        job.country = changes.country;
        job.city = changes.city;
        job.location = changes.location;
        job.fixed_salary = fixed_salary;
        job.salary_from = salary_from;
        job.salary_to = salary_to;
        job.skills = changes.skills;
        job.start_date = changes.start_date;
        job.end_date = changes.end_date;
        job.expired = job.expired || changes.expired;
        job.vacancies = changes.vacancies;
        job.employment_type = changes.employment_type;
        job.location_type = changes.location_type;
        job.updated_at = now();
        Ok(job.clone())
    }

    async fn delete_job(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.jobs.remove(&id).is_some())
    }

    async fn add_job_applicant(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let job = tables.jobs.get_mut(&job_id).ok_or(StoreError::NotFound)?;
        if job.applicants.contains(&user_id) {
            return Ok(false);
        }
        job.applicants.push(user_id);
        Ok(true)
    }

    async fn remove_job_applicant(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let job = tables.jobs.get_mut(&job_id).ok_or(StoreError::NotFound)?;
        let before = job.applicants.len();
        job.applicants.retain(|applicant| *applicant != user_id);
        Ok(job.applicants.len() != before)
    }

    async fn latch_expired_jobs(&self, now: NaiveDateTime) -> StoreResult<usize> {
        let mut tables = self.tables.write().await;
        let mut latched = 0;
        for job in tables.jobs.values_mut() {
            if !job.expired && job.end_date < now {
                job.expired = true;
                job.updated_at = now;
                latched += 1;
            }
        }
        Ok(latched)
    }

    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> StoreResult<Application> {
        let mut tables = self.tables.write().await;
        if tables.applications.values().any(|existing| {
            existing.applicant_id == application.applicant_id
                && existing.job_id == application.job_id
        }) {
            return Err(StoreError::UniqueViolation(
                "applications_applicant_job_key".into(),
            ));
        }
        let timestamp = now();
        let record = Application {
            id: application.id,
            job_id: application.job_id,
            applicant_id: application.applicant_id,
            employer_id: application.employer_id,
            name: application.name,
            email: application.email,
            phone: application.phone,
            address: application.address,
            cover_letter: application.cover_letter,
            resume: application.resume,
            status: ApplicationStatus::Submitted,
            created_at: timestamp,
            updated_at: timestamp,
        };
        tables.applications.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn find_application_for(
        &self,
        applicant_id: Uuid,
        job_id: Uuid,
    ) -> StoreResult<Option<Application>> {
        Ok(self
            .tables
            .read()
            .await
            .applications
            .values()
            .find(|app| app.applicant_id == applicant_id && app.job_id == job_id)
            .cloned())
    }

    async fn list_applications_by_employer(
        &self,
        employer_id: Uuid,
    ) -> StoreResult<Vec<Application>> {
        let mut apps: Vec<Application> = self
            .tables
            .read()
            .await
            .applications
            .values()
            .filter(|app| app.employer_id == employer_id)
            .cloned()
            .collect();
        newest_first(&mut apps, |app| app.created_at);
        Ok(apps)
    }

    async fn list_applications_by_applicant(
        &self,
        applicant_id: Uuid,
    ) -> StoreResult<Vec<Application>> {
        let mut apps: Vec<Application> = self
            .tables
            .read()
            .await
            .applications
            .values()
            .filter(|app| app.applicant_id == applicant_id)
            .cloned()
            .collect();
        newest_first(&mut apps, |app| app.created_at);
        Ok(apps)
    }

    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Application> {
        let mut tables = self.tables.write().await;
        let app = tables
            .applications
            .get_mut(&id)
            .ok_or(StoreError::NotFound)?;
        app.status = status;
        app.updated_at = now();
        Ok(app.clone())
    }

    async fn delete_application(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.applications.remove(&id).is_some())
    }

    async fn insert_connection(
        &self,
        requester_id: Uuid,
        recipient_id: Uuid,
    ) -> StoreResult<Connection> {
        let mut tables = self.tables.write().await;
        if tables
            .connections
            .iter()
            .any(|existing| is_pair(existing, requester_id, recipient_id))
        {
            return Err(StoreError::UniqueViolation("connections_pair_idx".into()));
        }
        let timestamp = now();
        let record = Connection {
            id: Uuid::new_v4(),
            requester_id,
            recipient_id,
            status: ConnectionStatus::Pending,
            created_at: timestamp,
            updated_at: timestamp,
        };
        tables.connections.push(record.clone());
        Ok(record)
    }

    async fn find_connection(&self, id: Uuid) -> StoreResult<Option<Connection>> {
        Ok(self
            .tables
            .read()
            .await
            .connections
            .iter()
            .find(|connection| connection.id == id)
            .cloned())
    }

    async fn find_connection_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<Connection>> {
        Ok(self
            .tables
            .read()
            .await
            .connections
            .iter()
            .find(|connection| is_pair(connection, a, b))
            .cloned())
    }

    async fn update_connection(
        &self,
        id: Uuid,
        requester_id: Uuid,
        recipient_id: Uuid,
        status: ConnectionStatus,
    ) -> StoreResult<Connection> {
        let mut tables = self.tables.write().await;
        let connection = tables
            .connections
            .iter_mut()
            .find(|connection| connection.id == id)
            .ok_or(StoreError::NotFound)?;
        connection.requester_id = requester_id;
        connection.recipient_id = recipient_id;
        connection.status = status;
        connection.updated_at = now();
        Ok(connection.clone())
    }

    async fn list_incoming_requests(&self, user_id: Uuid) -> StoreResult<Vec<Connection>> {
        let mut incoming: Vec<Connection> = self
            .tables
            .read()
            .await
            .connections
            .iter()
            .rev()
            .filter(|connection| {
                connection.recipient_id == user_id
                    && connection.status == ConnectionStatus::Pending
            })
            .cloned()
            .collect();
        incoming.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(incoming)
    }

    async fn list_accepted_connections(&self, user_id: Uuid) -> StoreResult<Vec<Connection>> {
        Ok(self
            .tables
            .read()
            .await
            .connections
            .iter()
            .filter(|connection| {
                connection.involves(user_id) && connection.status == ConnectionStatus::Accepted
            })
            .cloned()
            .collect())
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message> {
        let record = Message {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            read: false,
            created_at: now(),
        };
        self.tables.write().await.messages.push(record.clone());
        Ok(record)
    }

    async fn list_messages_between(
        &self,
        a: Uuid,
        b: Uuid,
        limit: usize,
        before: Option<NaiveDateTime>,
    ) -> StoreResult<Vec<Message>> {
        let tables = self.tables.read().await;
        let mut page: Vec<Message> = tables
            .messages
            .iter()
            .rev()
            .filter(|message| {
                (message.sender_id == a && message.receiver_id == b)
                    || (message.sender_id == b && message.receiver_id == a)
            })
            .filter(|message| before.map_or(true, |cursor| message.created_at < cursor))
            .take(limit)
            .cloned()
            .collect();
        page.reverse();
        Ok(page)
    }

    async fn insert_quiz_result(&self, result: NewQuizResult) -> StoreResult<QuizResult> {
        let record = QuizResult {
            id: result.id,
            user_id: result.user_id,
            answers: result.answers,
            skills_selected: result.skills_selected,
            match_count: 0,
            matched_job_ids: Vec::new(),
            details: Value::Object(Default::default()),
            created_at: now(),
        };
        self.tables.write().await.quiz_results.push(record.clone());
        Ok(record)
    }

    async fn attach_quiz_matches(
        &self,
        id: Uuid,
        match_count: i32,
        matched_job_ids: Vec<Uuid>,
        details: Value,
    ) -> StoreResult<QuizResult> {
        let mut tables = self.tables.write().await;
        let result = tables
            .quiz_results
            .iter_mut()
            .find(|result| result.id == id)
            .ok_or(StoreError::NotFound)?;
        result.match_count = match_count;
        result.matched_job_ids = matched_job_ids;
        result.details = details;
        Ok(result.clone())
    }

    async fn latest_quiz_result(&self, user_id: Uuid) -> StoreResult<Option<QuizResult>> {
        Ok(self
            .tables
            .read()
            .await
            .quiz_results
            .iter()
            .filter(|result| result.user_id == user_id)
            .max_by_key(|result| result.created_at)
            .cloned())
    }
}
