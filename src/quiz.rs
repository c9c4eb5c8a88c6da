//! Skills quiz: canonicalizes answers, matches jobs and records a snapshot.

use std::{collections::HashSet, time::Duration};

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    directory::{self, JobView},
    error::{BoardError, BoardResult},
    matching,
    models::{NewQuizResult, QuizAnswer, QuizProfileUpdate, QuizResult, QuizSummary},
    report,
    storage::ObjectStorage,
    store::Store,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub result: QuizResult,
    pub jobs: Vec<JobView>,
    pub report_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizReport {
    pub match_count: usize,
    pub skills: Vec<String>,
    pub matched_job_ids: Vec<Uuid>,
    pub jobs: Vec<JobView>,
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn answer_from_item(item: &Value) -> Option<QuizAnswer> {
    match item {
        Value::Null => None,
        Value::Object(fields) => Some(QuizAnswer {
            question_id: text(fields.get("qId")),
            answer: text(fields.get("answer")),
        }),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed @ Value::Object(_)) => answer_from_item(&parsed),
            _ => Some(QuizAnswer {
                question_id: String::new(),
                answer: raw.trim().to_string(),
            }),
        },
        other => Some(QuizAnswer {
            question_id: String::new(),
            answer: other.to_string(),
        }),
    }
}

fn collect_answers(raw: &Value) -> Vec<QuizAnswer> {
    match raw {
        Value::Array(items) => items.iter().filter_map(answer_from_item).collect(),
        Value::String(raw) => {
            let parsed = serde_json::from_str::<Value>(raw)
                .or_else(|_| serde_json::from_str::<Value>(&raw.replace('\'', "\"")));
            match parsed {
                Ok(value @ (Value::Array(_) | Value::Object(_) | Value::String(_))) => {
                    if let Value::Object(_) = value {
                        answer_from_item(&value).into_iter().collect()
                    } else {
                        collect_answers(&value)
                    }
                }
                _ if raw.trim().is_empty() => Vec::new(),
                _ => vec![QuizAnswer {
                    question_id: String::new(),
                    answer: raw.trim().to_string(),
                }],
            }
        }
        Value::Object(_) => answer_from_item(raw).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Canonical answer list: structured pairs, JSON strings and bare strings all
/// become `{qId, answer}`. The first answer per question id wins; answers
/// without an id are deduplicated by their text; fully empty answers are
/// dropped.
pub fn normalize_answers(raw: &Value) -> Vec<QuizAnswer> {
    let mut seen = HashSet::new();
    collect_answers(raw)
        .into_iter()
        .filter(|answer| !(answer.question_id.is_empty() && answer.answer.is_empty()))
        .filter(|answer| {
            let key = if answer.question_id.is_empty() {
                format!("answer:{}", answer.answer)
            } else {
                format!("question:{}", answer.question_id)
            };
            seen.insert(key)
        })
        .collect()
}

pub async fn submit(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    user: &AuthenticatedUser,
    raw_answers: &Value,
    raw_skills: &Value,
    now: NaiveDateTime,
    report_ttl: Duration,
) -> BoardResult<QuizOutcome> {
    let account = store
        .find_user(user.user_id)
        .await?
        .ok_or_else(|| BoardError::not_found("User not found."))?;

    let answers = normalize_answers(raw_answers);
    let skills = matching::skill_tokens(raw_skills);

    let recorded = store
        .insert_quiz_result(NewQuizResult {
            id: Uuid::new_v4(),
            user_id: user.user_id,
            answers: answers.clone(),
            skills_selected: skills.clone(),
        })
        .await?;

    let jobs = directory::list_active_by_skills(store, &skills, None, now).await?;
    let matched_job_ids: Vec<Uuid> = jobs.iter().map(|job| job.id).collect();
    let match_count = i32::try_from(jobs.len()).unwrap_or(i32::MAX);
    let details = json!({ "matchedAt": now.and_utc().to_rfc3339() });

    let result = store
        .attach_quiz_matches(recorded.id, match_count, matched_job_ids.clone(), details)
        .await?;

    store
        .record_quiz_profile(
            user.user_id,
            QuizProfileUpdate {
                skills: skills.clone(),
                answers,
                summary: QuizSummary {
                    match_count,
                    matched_job_ids,
                    skills_selected: skills,
                },
            },
        )
        .await?;

    let report_url =
        match report::write_report(storage, &account, &result, &jobs, now, report_ttl).await {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(user_id = %user.user_id, error = %err, "failed to write quiz report");
                None
            }
        };

    info!(
        user_id = %user.user_id,
        quiz_id = %result.id,
        match_count,
        "quiz submitted"
    );
    Ok(QuizOutcome {
        result,
        jobs: jobs.into_iter().map(|job| JobView::at(job, now)).collect(),
        report_url,
    })
}

/// Re-runs matching for the latest stored skill selection.
pub async fn latest_report(
    store: &dyn Store,
    user: &AuthenticatedUser,
    now: NaiveDateTime,
) -> BoardResult<Option<QuizReport>> {
    let Some(latest) = store.latest_quiz_result(user.user_id).await? else {
        return Ok(None);
    };
    let jobs = directory::list_active_by_skills(store, &latest.skills_selected, None, now).await?;
    Ok(Some(QuizReport {
        match_count: jobs.len(),
        skills: latest.skills_selected,
        matched_job_ids: jobs.iter().map(|job| job.id).collect(),
        jobs: jobs.into_iter().map(|job| JobView::at(job, now)).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use anyhow::anyhow;
    use async_trait::async_trait;

    use super::*;
    use crate::{
        auth::jwt::JwtService,
        config::AppConfig,
        connections::tests::member,
        directory::{
            now,
            tests::{employer, job_input},
        },
        models::Role,
        storage::FsStorage,
        store::MemoryStore,
    };

    #[test]
    fn answers_from_every_shape_become_pairs() {
        let raw = json!([
            {"qId": "q1", "answer": "Frontend"},
            "{\"qId\":\"q2\",\"answer\":\"React\"}",
            "free text",
            {"qId": "q1", "answer": "Backend"},
            "free text",
            null,
            {"qId": "", "answer": ""}
        ]);
        let answers = normalize_answers(&raw);
        let pairs: Vec<(&str, &str)> = answers
            .iter()
            .map(|a| (a.question_id.as_str(), a.answer.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("q1", "Frontend"), ("q2", "React"), ("", "free text")]
        );
    }

    #[test]
    fn answers_may_arrive_as_a_json_string() {
        let answers = normalize_answers(&json!("[{'qId':'q9','answer':'Yes'}]"));
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].question_id, "q9");
        assert_eq!(normalize_answers(&json!("just words"))[0].answer, "just words");
        assert!(normalize_answers(&json!(42)).is_empty());
    }

    struct FailingStorage {
        called: AtomicBool,
    }

    #[async_trait]
    impl ObjectStorage for FailingStorage {
        async fn put_object(
            &self,
            _key: &str,
            _bytes: Vec<u8>,
            _content_type: Option<String>,
            _content_disposition: Option<String>,
        ) -> anyhow::Result<()> {
            self.called.store(true, Ordering::SeqCst);
            Err(anyhow!("disk full"))
        }

        async fn presign_get_object(&self, _key: &str, _ttl: Duration) -> anyhow::Result<String> {
            Err(anyhow!("unreachable"))
        }

        async fn get_object(&self, _key: &str) -> anyhow::Result<Vec<u8>> {
            Err(anyhow!("unreachable"))
        }

        async fn delete_object(&self, _key: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn quiz_matches_loosely_and_updates_the_profile() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().expect("tempdir");
        let jwt = JwtService::from_config(&AppConfig::for_tests("quiz")).expect("jwt");
        let storage = FsStorage::new(dir.path(), jwt, "/files");
        let seeker = member(&store, "Sam", Role::JobSeeker).await;

        let matching_job =
            directory::post_job(&store, &employer(), job_input(json!(["ReactJS", "MongoDB"])), now(), 30)
                .await
                .expect("job");
        directory::post_job(&store, &employer(), job_input(json!(["Golang"])), now(), 30)
            .await
            .expect("other job");

        let outcome = submit(
            &store,
            &storage,
            &seeker,
            &json!([{"qId": "q1", "answer": "Frontend"}]),
            &json!(["React"]),
            now(),
            Duration::from_secs(60),
        )
        .await
        .expect("quiz");

        assert_eq!(outcome.jobs.len(), 1);
        assert_eq!(outcome.jobs[0].id, matching_job.id);
        assert_eq!(outcome.result.matched_job_ids, vec![matching_job.id]);
        assert_eq!(outcome.result.match_count, 1);
        assert!(outcome.report_url.is_some());

        let profile = store.find_user(seeker.user_id).await.expect("find").expect("user");
        assert!(profile.quiz_completed);
        assert_eq!(profile.skills, vec!["React".to_string()]);
        assert_eq!(
            profile.quiz_summary.expect("summary").matched_job_ids,
            vec![matching_job.id]
        );

        let report = latest_report(&store, &seeker, now())
            .await
            .expect("report")
            .expect("present");
        assert_eq!(report.match_count, 1);
        assert_eq!(report.skills, vec!["React".to_string()]);
    }

    #[tokio::test]
    async fn report_failure_never_fails_the_quiz() {
        let store = MemoryStore::new();
        let storage = FailingStorage {
            called: AtomicBool::new(false),
        };
        let seeker = member(&store, "Sam", Role::JobSeeker).await;

        let outcome = submit(
            &store,
            &storage,
            &seeker,
            &json!([]),
            &json!("Rust, Go"),
            now(),
            Duration::from_secs(60),
        )
        .await
        .expect("quiz");
        assert!(storage.called.load(Ordering::SeqCst));
        assert!(outcome.report_url.is_none());
        assert!(outcome.jobs.is_empty());
    }

    #[tokio::test]
    async fn report_is_absent_before_any_quiz() {
        let store = MemoryStore::new();
        let seeker = member(&store, "Sam", Role::JobSeeker).await;
        assert!(latest_report(&store, &seeker, now()).await.expect("report").is_none());
    }
}
