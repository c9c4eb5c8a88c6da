//! CSV summary of a quiz submission, written to object storage.

use std::{fmt::Write as _, time::Duration};

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::{
    models::{Job, QuizResult, User},
    storage::{inline_content_disposition, ObjectStorage},
};

pub const REPORT_PREFIX: &str = "reports";

fn cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row(out: &mut String, cells: &[&str]) {
    let line = cells.iter().map(|value| cell(value)).collect::<Vec<_>>().join(",");
    let _ = writeln!(out, "{line}");
}

pub fn render_csv(
    user: &User,
    result: &QuizResult,
    jobs: &[Job],
    generated_at: NaiveDateTime,
) -> String {
    let mut out = String::new();
    row(&mut out, &["User Name", &user.name]);
    row(&mut out, &["User Email", &user.email]);
    row(&mut out, &["Date", &generated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()]);
    out.push('\n');

    row(&mut out, &["Question Id", "Answer"]);
    for answer in &result.answers {
        row(&mut out, &[&answer.question_id, &answer.answer]);
    }
    out.push('\n');

    row(&mut out, &["Skills Selected", &result.skills_selected.join("; ")]);
    row(&mut out, &["Matched Job Count", &jobs.len().to_string()]);
    out.push('\n');

    row(&mut out, &["Job Id", "Title", "Location", "Required Skills"]);
    for job in jobs {
        let location = format!("{}, {}", job.city, job.country);
        row(
            &mut out,
            &[&job.id.to_string(), &job.title, &location, &job.skills.join("|")],
        );
    }
    out
}

/// Stores the report and returns a time-limited link to it.
pub async fn write_report(
    storage: &dyn ObjectStorage,
    user: &User,
    result: &QuizResult,
    jobs: &[Job],
    generated_at: NaiveDateTime,
    ttl: Duration,
) -> Result<String> {
    let file_name = format!(
        "quiz-report-{}-{}.csv",
        user.id,
        generated_at.and_utc().timestamp_millis()
    );
    let key = format!("{REPORT_PREFIX}/{file_name}");
    let body = render_csv(user, result, jobs, generated_at);
    storage
        .put_object(
            &key,
            body.into_bytes(),
            Some("text/csv; charset=utf-8".to_string()),
            inline_content_disposition(&file_name),
        )
        .await?;
    storage.presign_get_object(&key, ttl).await
}
