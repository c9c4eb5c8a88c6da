use std::env;

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use diesel::connection::SimpleConnection;
use jobboard::db::{self, PgPool};
use jobboard::models::{
    ConnectionStatus, NewApplication, NewJob, NewUser, ResumeRef, Role, Salary,
};
use jobboard::store::{PgStore, Store, StoreError};
use tokio::sync::Mutex;
use uuid::Uuid;

static DB_LOCK: Mutex<()> = Mutex::const_new(());

async fn open() -> Result<Option<(PgStore, PgPool)>> {
    let Ok(url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping postgres store test");
        return Ok(None);
    };
    let pool = db::init_pool_with_size(&url, 2)?;
    let setup = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        db::run_migrations(&setup)?;
        let mut conn = setup
            .get()
            .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
        conn.batch_execute(
            "TRUNCATE quiz_results, messages, connections, applications, jobs, users CASCADE",
        )?;
        Ok(())
    })
    .await??;
    Ok(Some((PgStore::new(pool.clone()), pool)))
}

fn user(email: &str, role: Role) -> NewUser {
    NewUser {
        id: Uuid::new_v4(),
        name: "Tester".into(),
        email: email.into(),
        phone: "555".into(),
        password_hash: "hash".into(),
        role,
    }
}

fn job(owner: Uuid, end_in_days: i64) -> NewJob {
    let now = Utc::now().naive_utc();
    NewJob {
        id: Uuid::new_v4(),
        posted_by: owner,
        title: "Rust developer".into(),
        description: "Build the services that keep the board running.".into(),
        category: "Engineering".into(),
        country: "India".into(),
        city: "Pune".into(),
        location: "Baner".into(),
        salary: Salary::Range { from: 10, to: 20 },
        skills: vec!["Rust".into()],
        start_date: now - Duration::days(2),
        end_date: now + Duration::days(end_in_days),
        vacancies: 1,
        employment_type: String::new(),
        location_type: String::new(),
    }
}

#[tokio::test]
async fn postgres_store_enforces_uniqueness_and_applicant_set() -> Result<()> {
    let _lock = DB_LOCK.lock().await;
    let Some((store, _pool)) = open().await? else {
        return Ok(());
    };

    let employer = store.insert_user(user("boss@example.com", Role::Employer)).await?;
    let seeker = store.insert_user(user("seeker@example.com", Role::JobSeeker)).await?;
    let err = store
        .insert_user(user("SEEKER@example.com", Role::JobSeeker))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)));

    let open_job = store.insert_job(job(employer.id, 5)).await?;
    assert_eq!(open_job.salary(), Some(Salary::Range { from: 10, to: 20 }));

    let application = NewApplication {
        id: Uuid::new_v4(),
        job_id: open_job.id,
        applicant_id: seeker.id,
        employer_id: employer.id,
        name: "Seeker".into(),
        email: "seeker@example.com".into(),
        phone: "555".into(),
        address: "Street".into(),
        cover_letter: "Hello".into(),
        resume: ResumeRef {
            url: "resumes/key".into(),
            original_name: "cv.pdf".into(),
        },
    };
    store.insert_application(application.clone()).await?;
    let err = store
        .insert_application(NewApplication {
            id: Uuid::new_v4(),
            ..application
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)));

    assert!(store.add_job_applicant(open_job.id, seeker.id).await?);
    assert!(!store.add_job_applicant(open_job.id, seeker.id).await?);
    assert!(store.remove_job_applicant(open_job.id, seeker.id).await?);
    assert!(!store.remove_job_applicant(open_job.id, seeker.id).await?);
    assert!(matches!(
        store.add_job_applicant(Uuid::new_v4(), seeker.id).await,
        Err(StoreError::NotFound)
    ));

    let connection = store.insert_connection(seeker.id, employer.id).await?;
    assert_eq!(connection.status, ConnectionStatus::Pending);
    assert!(matches!(
        store.insert_connection(employer.id, seeker.id).await,
        Err(StoreError::UniqueViolation(_))
    ));
    Ok(())
}

#[tokio::test]
async fn postgres_store_latches_lapsed_jobs() -> Result<()> {
    let _lock = DB_LOCK.lock().await;
    let Some((store, _pool)) = open().await? else {
        return Ok(());
    };

    let employer = store.insert_user(user("boss@example.com", Role::Employer)).await?;
    let lapsed = store.insert_job(job(employer.id, -1)).await?;
    let live = store.insert_job(job(employer.id, 3)).await?;
    let now = Utc::now().naive_utc();

    let open_ids: Vec<Uuid> = store.list_open_jobs(now).await?.iter().map(|j| j.id).collect();
    assert_eq!(open_ids, vec![live.id]);

    assert_eq!(store.latch_expired_jobs(now).await?, 1);
    assert_eq!(store.latch_expired_jobs(now).await?, 0);
    let reloaded = store.find_job(lapsed.id).await?.expect("job");
    assert!(reloaded.expired);
    Ok(())
}
