mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{json_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn quiz_snapshot_feeds_profile_and_listing() -> Result<()> {
    let app = TestApp::new()?;
    let employer = app.register("Acme", "hr@acme.test", "Employer").await?;
    let seeker = app.register("Sam Seeker", "sam@example.com", "Job Seeker").await?;
    let react_job = app
        .post_job(&employer.token, "Frontend developer", json!(["ReactJS", "MongoDB"]))
        .await?;
    app.post_job(&employer.token, "Go developer", json!(["Golang"]))
        .await?;

    let response = app.get("/api/v1/quiz/report", Some(&seeker.token)).await?;
    let body = json_body(response).await?;
    assert!(body["report"].is_null());

    let response = app
        .post_json(
            "/api/v1/quiz",
            &json!({
                "answers": [{"qId": "q1", "answer": "Frontend"}, "{\"qId\":\"q2\",\"answer\":\"UI\"}"],
                "skillsSelected": ["React"],
            }),
            Some(&seeker.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await?;
    assert_eq!(body["matchCount"], 1);
    assert_eq!(body["matchedJobIds"], json!([react_job.to_string()]));
    let report_url = body["reportUrl"].as_str().expect("report url");
    assert!(report_url.starts_with("https://fake-storage/reports/quiz-report-"));

    let reports = app.storage().keys_with_prefix("reports/").await;
    assert_eq!(reports.len(), 1);
    let stored = app.storage().get(&reports[0]).await.expect("report object");
    let csv = String::from_utf8(stored.bytes)?;
    assert!(csv.contains("Sam Seeker"));
    assert!(csv.contains(&react_job.to_string()));

    let response = app.get("/api/v1/profile/me", Some(&seeker.token)).await?;
    let body = json_body(response).await?;
    assert_eq!(body["user"]["quizCompleted"], true);
    assert_eq!(body["user"]["skills"], json!(["React"]));
    assert_eq!(body["user"]["quizAnswers"].as_array().map(Vec::len), Some(2));

    let response = app.get("/api/v1/job/getall", Some(&seeker.token)).await?;
    let body = json_body(response).await?;
    assert_eq!(body["jobs"][0]["id"], react_job.to_string());

    let response = app.get("/api/v1/quiz/report", Some(&seeker.token)).await?;
    let body = json_body(response).await?;
    assert_eq!(body["report"]["matchCount"], 1);
    assert_eq!(body["report"]["skills"], json!(["React"]));
    Ok(())
}
