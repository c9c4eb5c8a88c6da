use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::{dsl::exists, pg::PgConnection, prelude::*, select, sql_types};
use serde_json::Value;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::db::PgPool;
use crate::models::{
    Application, ApplicationStatus, Connection, ConnectionStatus, Job, JobChanges, Message,
    NewApplication, NewJob, NewMessage, NewQuizResult, NewUser, ProfileChanges, QuizAnswer,
    QuizProfileUpdate, QuizResult, QuizSummary, ResumeRef, Salary, User,
};
use crate::schema::{applications, connections, jobs, messages, quiz_results, users};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs blocking diesel work off the async executor.
    async fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| StoreError::Pool(err.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|err| StoreError::Pool(format!("database task failed: {err}")))?
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

#[derive(Queryable)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    password_hash: String,
    role: String,
    skills: Vec<String>,
    about: String,
    company_description: String,
    hiring_roles: Vec<String>,
    resume_key: Option<String>,
    resume_name: Option<String>,
    profile_photo_key: Option<String>,
    connections: Vec<Uuid>,
    quiz_completed: bool,
    quiz_answers: Value,
    quiz_summary: Option<Value>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse().map_err(StoreError::Corrupt)?;
        let quiz_answers: Vec<QuizAnswer> = serde_json::from_value(row.quiz_answers)
            .map_err(|err| StoreError::Corrupt(format!("quiz answers: {err}")))?;
        let quiz_summary = row
            .quiz_summary
            .map(serde_json::from_value::<QuizSummary>)
            .transpose()
            .map_err(|err| StoreError::Corrupt(format!("quiz summary: {err}")))?;
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            role,
            skills: row.skills,
            about: row.about,
            company_description: row.company_description,
            hiring_roles: row.hiring_roles,
            resume_key: row.resume_key,
            resume_name: row.resume_name,
            profile_photo_key: row.profile_photo_key,
            connections: row.connections,
            quiz_completed: row.quiz_completed,
            quiz_answers,
            quiz_summary,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    password_hash: String,
    role: String,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = users)]
struct ProfileChangeset {
    name: Option<String>,
    skills: Option<Vec<String>>,
    about: Option<String>,
    company_description: Option<String>,
    hiring_roles: Option<Vec<String>>,
}

#[derive(Queryable)]
struct JobRow {
    id: Uuid,
    posted_by: Uuid,
    title: String,
    description: String,
    category: String,
    country: String,
    city: String,
    location: String,
    fixed_salary: Option<i64>,
    salary_from: Option<i64>,
    salary_to: Option<i64>,
    skills: Vec<String>,
    start_date: NaiveDateTime,
    end_date: NaiveDateTime,
    expired: bool,
    applicants: Vec<Uuid>,
    vacancies: i32,
    employment_type: String,
    location_type: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            posted_by: row.posted_by,
            title: row.title,
            description: row.description,
            category: row.category,
            country: row.country,
            city: row.city,
            location: row.location,
            fixed_salary: row.fixed_salary,
            salary_from: row.salary_from,
            salary_to: row.salary_to,
            skills: row.skills,
            start_date: row.start_date,
            end_date: row.end_date,
            expired: row.expired,
            applicants: row.applicants,
            vacancies: row.vacancies,
            employment_type: row.employment_type,
            location_type: row.location_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = jobs)]
struct NewJobRow {
    id: Uuid,
    posted_by: Uuid,
    title: String,
    description: String,
    category: String,
    country: String,
    city: String,
    location: String,
    fixed_salary: Option<i64>,
    salary_from: Option<i64>,
    salary_to: Option<i64>,
    skills: Vec<String>,
    start_date: NaiveDateTime,
    end_date: NaiveDateTime,
    vacancies: i32,
    employment_type: String,
    location_type: String,
}

#[derive(AsChangeset)]
#[diesel(table_name = jobs, treat_none_as_null = true)]
struct JobChangeset {
    title: String,
    description: String,
    category: String,
    country: String,
    city: String,
    location: String,
    fixed_salary: Option<i64>,
    salary_from: Option<i64>,
    salary_to: Option<i64>,
    skills: Vec<String>,
    start_date: NaiveDateTime,
    end_date: NaiveDateTime,
    expired: bool,
    vacancies: i32,
    employment_type: String,
    location_type: String,
    updated_at: NaiveDateTime,
}

#[derive(Queryable)]
struct ApplicationRow {
    id: Uuid,
    job_id: Uuid,
    applicant_id: Uuid,
    employer_id: Uuid,
    name: String,
    email: String,
    phone: String,
    address: String,
    cover_letter: String,
    resume_url: String,
    resume_name: String,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = StoreError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Application {
            id: row.id,
            job_id: row.job_id,
            applicant_id: row.applicant_id,
            employer_id: row.employer_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            cover_letter: row.cover_letter,
            resume: ResumeRef {
                url: row.resume_url,
                original_name: row.resume_name,
            },
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = applications)]
struct NewApplicationRow {
    id: Uuid,
    job_id: Uuid,
    applicant_id: Uuid,
    employer_id: Uuid,
    name: String,
    email: String,
    phone: String,
    address: String,
    cover_letter: String,
    resume_url: String,
    resume_name: String,
    status: String,
}

#[derive(Queryable)]
struct ConnectionRow {
    id: Uuid,
    requester_id: Uuid,
    recipient_id: Uuid,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<ConnectionRow> for Connection {
    type Error = StoreError;

    fn try_from(row: ConnectionRow) -> Result<Self, Self::Error> {
        Ok(Connection {
            id: row.id,
            requester_id: row.requester_id,
            recipient_id: row.recipient_id,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = connections)]
struct NewConnectionRow {
    id: Uuid,
    requester_id: Uuid,
    recipient_id: Uuid,
    status: String,
}

#[derive(Queryable)]
struct MessageRow {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
    read: bool,
    created_at: NaiveDateTime,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: row.content,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = messages)]
struct NewMessageRow {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
}

#[derive(Queryable)]
struct QuizResultRow {
    id: Uuid,
    user_id: Uuid,
    answers: Value,
    skills_selected: Vec<String>,
    match_count: i32,
    matched_job_ids: Vec<Uuid>,
    details: Value,
    created_at: NaiveDateTime,
}

impl TryFrom<QuizResultRow> for QuizResult {
    type Error = StoreError;

    fn try_from(row: QuizResultRow) -> Result<Self, Self::Error> {
        let answers = serde_json::from_value(row.answers)
            .map_err(|err| StoreError::Corrupt(format!("quiz answers: {err}")))?;
        Ok(QuizResult {
            id: row.id,
            user_id: row.user_id,
            answers,
            skills_selected: row.skills_selected,
            match_count: row.match_count,
            matched_job_ids: row.matched_job_ids,
            details: row.details,
            created_at: row.created_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = quiz_results)]
struct NewQuizResultRow {
    id: Uuid,
    user_id: Uuid,
    answers: Value,
    skills_selected: Vec<String>,
}

fn load_user(conn: &mut PgConnection, id: Uuid) -> StoreResult<User> {
    users::table.find(id).first::<UserRow>(conn)?.try_into()
}

fn load_job(conn: &mut PgConnection, id: Uuid) -> StoreResult<Job> {
    Ok(jobs::table.find(id).first::<JobRow>(conn)?.into())
}

fn user_exists(conn: &mut PgConnection, id: Uuid) -> StoreResult<bool> {
    Ok(select(exists(users::table.find(id))).get_result(conn)?)
}

fn job_exists(conn: &mut PgConnection, id: Uuid) -> StoreResult<bool> {
    Ok(select(exists(jobs::table.find(id))).get_result(conn)?)
}

fn collect<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        self.with_conn(move |conn| {
            let row = NewUserRow {
                id: user.id,
                name: user.name,
                email: user.email.trim().to_lowercase(),
                phone: user.phone,
                password_hash: user.password_hash,
                role: user.role.as_str().to_string(),
            };
            diesel::insert_into(users::table).values(&row).execute(conn)?;
            load_user(conn, row.id)
        })
        .await
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.with_conn(move |conn| {
            users::table
                .find(id)
                .first::<UserRow>(conn)
                .optional()?
                .map(User::try_from)
                .transpose()
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        self.with_conn(move |conn| {
            users::table
                .filter(users::email.eq(email))
                .first::<UserRow>(conn)
                .optional()?
                .map(User::try_from)
                .transpose()
        })
        .await
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let ids = ids.to_vec();
        self.with_conn(move |conn| {
            let rows: Vec<UserRow> = users::table.filter(users::id.eq_any(ids)).load(conn)?;
            collect(rows)
        })
        .await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.with_conn(|conn| {
            let rows: Vec<UserRow> = users::table.order(users::name.asc()).load(conn)?;
            collect(rows)
        })
        .await
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> StoreResult<User> {
        self.with_conn(move |conn| {
            let changeset = ProfileChangeset {
                name: changes.name,
                skills: changes.skills,
                about: changes.about,
                company_description: changes.company_description,
                hiring_roles: changes.hiring_roles,
            };
            let updated = diesel::update(users::table.find(id))
                .set((&changeset, users::updated_at.eq(now())))
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            load_user(conn, id)
        })
        .await
    }

    async fn set_resume(&self, id: Uuid, key: &str, original_name: &str) -> StoreResult<User> {
        let key = key.to_string();
        let original_name = original_name.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(users::table.find(id))
                .set((
                    users::resume_key.eq(Some(key)),
                    users::resume_name.eq(Some(original_name)),
                    users::updated_at.eq(now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            load_user(conn, id)
        })
        .await
    }

    async fn set_profile_photo(&self, id: Uuid, key: &str) -> StoreResult<User> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(users::table.find(id))
                .set((
                    users::profile_photo_key.eq(Some(key)),
                    users::updated_at.eq(now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            load_user(conn, id)
        })
        .await
    }

    async fn add_user_connection(&self, user_id: Uuid, other_id: Uuid) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let updated = diesel::sql_query(
                "UPDATE users SET connections = array_append(connections, $1), updated_at = NOW() \
                 WHERE id = $2 AND NOT ($1 = ANY(connections))",
            )
            .bind::<sql_types::Uuid, _>(other_id)
            .bind::<sql_types::Uuid, _>(user_id)
            .execute(conn)?;
            if updated == 0 && !user_exists(conn, user_id)? {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn record_quiz_profile(
        &self,
        user_id: Uuid,
        update: QuizProfileUpdate,
    ) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let answers = serde_json::to_value(&update.answers)
                .map_err(|err| StoreError::Corrupt(format!("quiz answers: {err}")))?;
            let summary = serde_json::to_value(&update.summary)
                .map_err(|err| StoreError::Corrupt(format!("quiz summary: {err}")))?;
            let updated = diesel::update(users::table.find(user_id))
                .set((
                    users::quiz_completed.eq(true),
                    users::skills.eq(update.skills),
                    users::quiz_answers.eq(answers),
                    users::quiz_summary.eq(Some(summary)),
                    users::updated_at.eq(now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn insert_job(&self, job: NewJob) -> StoreResult<Job> {
        self.with_conn(move |conn| {
            let (fixed_salary, salary_from, salary_to) = salary_columns(job.salary);
            let row = NewJobRow {
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
                vacancies: job.vacancies,
                employment_type: job.employment_type,
                location_type: job.location_type,
            };
            diesel::insert_into(jobs::table).values(&row).execute(conn)?;
            load_job(conn, row.id)
        })
        .await
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        self.with_conn(move |conn| {
            Ok(jobs::table
                .find(id)
                .first::<JobRow>(conn)
                .optional()?
                .map(Job::from))
        })
        .await
    }

    async fn list_open_jobs(&self, now: NaiveDateTime) -> StoreResult<Vec<Job>> {
        self.with_conn(move |conn| {
            let rows: Vec<JobRow> = jobs::table
                .filter(jobs::expired.eq(false))
                .filter(jobs::start_date.le(now))
                .filter(jobs::end_date.ge(now))
                .order(jobs::created_at.desc())
                .load(conn)?;
            Ok(rows.into_iter().map(Job::from).collect())
        })
        .await
    }

    async fn list_jobs_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Job>> {
        self.with_conn(move |conn| {
            let rows: Vec<JobRow> = jobs::table
                .filter(jobs::posted_by.eq(owner_id))
                .order(jobs::created_at.desc())
                .load(conn)?;
            Ok(rows.into_iter().map(Job::from).collect())
        })
        .await
    }

    async fn update_job(&self, id: Uuid, changes: JobChanges) -> StoreResult<Job> {
        self.with_conn(move |conn| {
            let (fixed_salary, salary_from, salary_to) = salary_columns(changes.salary);
            let changeset = JobChangeset {
                title: changes.title,
                description: changes.description,
                category: changes.category,
                country: changes.country,
                city: changes.city,
                location: changes.location,
                fixed_salary,
                salary_from,
                salary_to,
                skills: changes.skills,
                start_date: changes.start_date,
                end_date: changes.end_date,
                expired: changes.expired,
                vacancies: changes.vacancies,
                employment_type: changes.employment_type,
                location_type: changes.location_type,
                updated_at: now(),
            };
            let updated = diesel::update(jobs::table.find(id))
                .set(&changeset)
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            load_job(conn, id)
        })
        .await
    }

    async fn delete_job(&self, id: Uuid) -> StoreResult<bool> {
        self.with_conn(move |conn| Ok(diesel::delete(jobs::table.find(id)).execute(conn)? > 0))
            .await
    }

    async fn add_job_applicant(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.with_conn(move |conn| {
            let updated = diesel::sql_query(
                "UPDATE jobs SET applicants = array_append(applicants, $1), updated_at = NOW() \
                 WHERE id = $2 AND NOT ($1 = ANY(applicants))",
            )
            .bind::<sql_types::Uuid, _>(user_id)
            .bind::<sql_types::Uuid, _>(job_id)
            .execute(conn)?;
            if updated == 0 && !job_exists(conn, job_id)? {
                return Err(StoreError::NotFound);
            }
            Ok(updated > 0)
        })
        .await
    }

    async fn remove_job_applicant(&self, job_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.with_conn(move |conn| {
            let updated = diesel::sql_query(
                "UPDATE jobs SET applicants = array_remove(applicants, $1), updated_at = NOW() \
                 WHERE id = $2 AND $1 = ANY(applicants)",
            )
            .bind::<sql_types::Uuid, _>(user_id)
            .bind::<sql_types::Uuid, _>(job_id)
            .execute(conn)?;
            if updated == 0 && !job_exists(conn, job_id)? {
                return Err(StoreError::NotFound);
            }
            Ok(updated > 0)
        })
        .await
    }

    async fn latch_expired_jobs(&self, now: NaiveDateTime) -> StoreResult<usize> {
        self.with_conn(move |conn| {
            Ok(diesel::update(
                jobs::table
                    .filter(jobs::expired.eq(false))
                    .filter(jobs::end_date.lt(now)),
            )
            .set((jobs::expired.eq(true), jobs::updated_at.eq(now)))
            .execute(conn)?)
        })
        .await
    }

    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> StoreResult<Application> {
        self.with_conn(move |conn| {
            let row = NewApplicationRow {
                id: application.id,
                job_id: application.job_id,
                applicant_id: application.applicant_id,
                employer_id: application.employer_id,
                name: application.name,
                email: application.email,
                phone: application.phone,
                address: application.address,
                cover_letter: application.cover_letter,
                resume_url: application.resume.url,
                resume_name: application.resume.original_name,
                status: ApplicationStatus::Submitted.as_str().to_string(),
            };
            diesel::insert_into(applications::table)
                .values(&row)
                .execute(conn)?;
            applications::table
                .find(row.id)
                .first::<ApplicationRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn find_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        self.with_conn(move |conn| {
            applications::table
                .find(id)
                .first::<ApplicationRow>(conn)
                .optional()?
                .map(Application::try_from)
                .transpose()
        })
        .await
    }

    async fn find_application_for(
        &self,
        applicant_id: Uuid,
        job_id: Uuid,
    ) -> StoreResult<Option<Application>> {
        self.with_conn(move |conn| {
            applications::table
                .filter(applications::applicant_id.eq(applicant_id))
                .filter(applications::job_id.eq(job_id))
                .first::<ApplicationRow>(conn)
                .optional()?
                .map(Application::try_from)
                .transpose()
        })
        .await
    }

    async fn list_applications_by_employer(
        &self,
        employer_id: Uuid,
    ) -> StoreResult<Vec<Application>> {
        self.with_conn(move |conn| {
            let rows: Vec<ApplicationRow> = applications::table
                .filter(applications::employer_id.eq(employer_id))
                .order(applications::created_at.desc())
                .load(conn)?;
            collect(rows)
        })
        .await
    }

    async fn list_applications_by_applicant(
        &self,
        applicant_id: Uuid,
    ) -> StoreResult<Vec<Application>> {
        self.with_conn(move |conn| {
            let rows: Vec<ApplicationRow> = applications::table
                .filter(applications::applicant_id.eq(applicant_id))
                .order(applications::created_at.desc())
                .load(conn)?;
            collect(rows)
        })
        .await
    }

    async fn set_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> StoreResult<Application> {
        self.with_conn(move |conn| {
            let updated = diesel::update(applications::table.find(id))
                .set((
                    applications::status.eq(status.as_str()),
                    applications::updated_at.eq(now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            applications::table
                .find(id)
                .first::<ApplicationRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn delete_application(&self, id: Uuid) -> StoreResult<bool> {
        self.with_conn(move |conn| {
            Ok(diesel::delete(applications::table.find(id)).execute(conn)? > 0)
        })
        .await
    }

    async fn insert_connection(
        &self,
        requester_id: Uuid,
        recipient_id: Uuid,
    ) -> StoreResult<Connection> {
        self.with_conn(move |conn| {
            let row = NewConnectionRow {
                id: Uuid::new_v4(),
                requester_id,
                recipient_id,
                status: ConnectionStatus::Pending.as_str().to_string(),
            };
            diesel::insert_into(connections::table)
                .values(&row)
                .execute(conn)?;
            connections::table
                .find(row.id)
                .first::<ConnectionRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn find_connection(&self, id: Uuid) -> StoreResult<Option<Connection>> {
        self.with_conn(move |conn| {
            connections::table
                .find(id)
                .first::<ConnectionRow>(conn)
                .optional()?
                .map(Connection::try_from)
                .transpose()
        })
        .await
    }

    async fn find_connection_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<Connection>> {
        self.with_conn(move |conn| {
            connections::table
                .filter(
                    connections::requester_id
                        .eq(a)
                        .and(connections::recipient_id.eq(b))
                        .or(connections::requester_id
                            .eq(b)
                            .and(connections::recipient_id.eq(a))),
                )
                .first::<ConnectionRow>(conn)
                .optional()?
                .map(Connection::try_from)
                .transpose()
        })
        .await
    }

    async fn update_connection(
        &self,
        id: Uuid,
        requester_id: Uuid,
        recipient_id: Uuid,
        status: ConnectionStatus,
    ) -> StoreResult<Connection> {
        self.with_conn(move |conn| {
            let updated = diesel::update(connections::table.find(id))
                .set((
                    connections::requester_id.eq(requester_id),
                    connections::recipient_id.eq(recipient_id),
                    connections::status.eq(status.as_str()),
                    connections::updated_at.eq(now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            connections::table
                .find(id)
                .first::<ConnectionRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn list_incoming_requests(&self, user_id: Uuid) -> StoreResult<Vec<Connection>> {
        self.with_conn(move |conn| {
            let rows: Vec<ConnectionRow> = connections::table
                .filter(connections::recipient_id.eq(user_id))
                .filter(connections::status.eq(ConnectionStatus::Pending.as_str()))
                .order(connections::created_at.desc())
                .load(conn)?;
            collect(rows)
        })
        .await
    }

    async fn list_accepted_connections(&self, user_id: Uuid) -> StoreResult<Vec<Connection>> {
        self.with_conn(move |conn| {
            let rows: Vec<ConnectionRow> = connections::table
                .filter(connections::status.eq(ConnectionStatus::Accepted.as_str()))
                .filter(
                    connections::requester_id
                        .eq(user_id)
                        .or(connections::recipient_id.eq(user_id)),
                )
                .order(connections::updated_at.desc())
                .load(conn)?;
            collect(rows)
        })
        .await
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message> {
        self.with_conn(move |conn| {
            let row = NewMessageRow {
                id: message.id,
                sender_id: message.sender_id,
                receiver_id: message.receiver_id,
                content: message.content,
            };
            diesel::insert_into(messages::table)
                .values(&row)
                .execute(conn)?;
            Ok(messages::table.find(row.id).first::<MessageRow>(conn)?.into())
        })
        .await
    }

    async fn list_messages_between(
        &self,
        a: Uuid,
        b: Uuid,
        limit: usize,
        before: Option<NaiveDateTime>,
    ) -> StoreResult<Vec<Message>> {
        self.with_conn(move |conn| {
            let mut query = messages::table
                .filter(
                    messages::sender_id
                        .eq(a)
                        .and(messages::receiver_id.eq(b))
                        .or(messages::sender_id.eq(b).and(messages::receiver_id.eq(a))),
                )
                .into_boxed();
            if let Some(cursor) = before {
                query = query.filter(messages::created_at.lt(cursor));
            }
            let mut rows: Vec<MessageRow> = query
                .order(messages::created_at.desc())
                .limit(i64::try_from(limit).unwrap_or(i64::MAX))
                .load(conn)?;
            rows.reverse();
            Ok(rows.into_iter().map(Message::from).collect())
        })
        .await
    }

    async fn insert_quiz_result(&self, result: NewQuizResult) -> StoreResult<QuizResult> {
        self.with_conn(move |conn| {
            let answers = serde_json::to_value(&result.answers)
                .map_err(|err| StoreError::Corrupt(format!("quiz answers: {err}")))?;
            let row = NewQuizResultRow {
                id: result.id,
                user_id: result.user_id,
                answers,
                skills_selected: result.skills_selected,
            };
            diesel::insert_into(quiz_results::table)
                .values(&row)
                .execute(conn)?;
            quiz_results::table
                .find(row.id)
                .first::<QuizResultRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn attach_quiz_matches(
        &self,
        id: Uuid,
        match_count: i32,
        matched_job_ids: Vec<Uuid>,
        details: Value,
    ) -> StoreResult<QuizResult> {
        self.with_conn(move |conn| {
            let updated = diesel::update(quiz_results::table.find(id))
                .set((
                    quiz_results::match_count.eq(match_count),
                    quiz_results::matched_job_ids.eq(matched_job_ids),
                    quiz_results::details.eq(details),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            quiz_results::table
                .find(id)
                .first::<QuizResultRow>(conn)?
                .try_into()
        })
        .await
    }

    async fn latest_quiz_result(&self, user_id: Uuid) -> StoreResult<Option<QuizResult>> {
        self.with_conn(move |conn| {
            quiz_results::table
                .filter(quiz_results::user_id.eq(user_id))
                .order(quiz_results::created_at.desc())
                .first::<QuizResultRow>(conn)
                .optional()?
                .map(QuizResult::try_from)
                .transpose()
        })
        .await
    }
}
