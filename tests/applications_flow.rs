mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{json_body, FilePart, Member, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

fn resume_file() -> FilePart<'static> {
    FilePart {
        field: "resume",
        file_name: "cv.pdf",
        content_type: "application/pdf",
        bytes: b"%PDF-1.4 cv",
    }
}

async fn apply(
    app: &TestApp,
    seeker: &Member,
    job_id: Uuid,
    file: Option<FilePart<'_>>,
) -> Result<hyper::Response<axum::body::Body>> {
    let job_id = job_id.to_string();
    app.post_multipart(
        "/api/v1/application/post",
        &[
            ("jobId", job_id.as_str()),
            ("name", "Sam Seeker"),
            ("email", "sam@example.com"),
            ("phone", "5550101"),
            ("address", "12 Main Street"),
            ("coverLetter", "I would love to help."),
        ],
        file,
        &seeker.token,
    )
    .await
}

fn ids(body: &Value, field: &str) -> Vec<String> {
    body[field]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn apply_once_then_job_is_hidden_from_listing() -> Result<()> {
    let app = TestApp::new()?;
    let employer = app.register("Acme", "hr@acme.test", "Employer").await?;
    let seeker = app.register("Sam Seeker", "sam@example.com", "Job Seeker").await?;
    let job_id = app
        .post_job(&employer.token, "Rust developer", json!(["Rust"]))
        .await?;

    let response = app.get("/api/v1/job/getall?skills=rust", Some(&seeker.token)).await?;
    assert_eq!(ids(&json_body(response).await?, "jobs"), vec![job_id.to_string()]);

    let response = apply(&app, &seeker, job_id, None).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(
        body["error"],
        "Resume required. Please upload resume in Dashboard or attach it here."
    );

    let response = apply(&app, &seeker, job_id, Some(resume_file())).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await?;
    assert_eq!(body["application"]["status"], "submitted");
    assert_eq!(body["application"]["resume"]["originalName"], "cv.pdf");

    let response = apply(&app, &seeker, job_id, Some(resume_file())).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await?;
    assert_eq!(body["error"], "You have already applied to this job.");

    let response = app.get("/api/v1/job/getall?skills=rust", Some(&seeker.token)).await?;
    assert!(ids(&json_body(response).await?, "jobs").is_empty());

    let response = app.get("/api/v1/job/getall?skills=rust", None).await?;
    assert_eq!(ids(&json_body(response).await?, "jobs"), vec![job_id.to_string()]);

    let response = app.get(&format!("/api/v1/job/{job_id}"), None).await?;
    let body = json_body(response).await?;
    assert_eq!(body["job"]["applicants"], json!([seeker.id.to_string()]));
    Ok(())
}

#[tokio::test]
async fn employer_reviews_and_seeker_withdraws() -> Result<()> {
    let app = TestApp::new()?;
    let employer = app.register("Acme", "hr@acme.test", "Employer").await?;
    let seeker = app.register("Sam Seeker", "sam@example.com", "Job Seeker").await?;
    let stranger = app.register("Eve Other", "eve@example.com", "Employer").await?;
    let job_id = app
        .post_job(&employer.token, "Rust developer", json!(["Rust"]))
        .await?;

    let response = apply(&app, &seeker, job_id, Some(resume_file())).await?;
    let body = json_body(response).await?;
    let application_id = body["application"]["id"].as_str().expect("id").to_string();

    let response = app
        .get("/api/v1/application/employer/getall", Some(&employer.token))
        .await?;
    assert_eq!(ids(&json_body(response).await?, "applications"), vec![application_id.clone()]);

    let response = app
        .get("/api/v1/application/employer/getall", Some(&seeker.token))
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .put_json(
            &format!("/api/v1/application/status/{application_id}"),
            &json!({"status": "shortlisted"}),
            Some(&employer.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["application"]["status"], "shortlisted");

    let response = app
        .get(
            &format!("/api/v1/application/{application_id}/resume"),
            Some(&employer.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert!(body["url"]
        .as_str()
        .is_some_and(|url| url.starts_with("https://fake-storage/resumes/")));

    let response = app
        .get(
            &format!("/api/v1/application/{application_id}/resume"),
            Some(&stranger.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .delete(
            &format!("/api/v1/application/delete/{application_id}"),
            Some(&seeker.token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["outcome"]["applicantCleanup"], "done");

    let response = app
        .get("/api/v1/application/jobseeker/getall", Some(&seeker.token))
        .await?;
    assert!(ids(&json_body(response).await?, "applications").is_empty());

    let response = app.get("/api/v1/job/getall?skills=rust", Some(&seeker.token)).await?;
    assert_eq!(ids(&json_body(response).await?, "jobs"), vec![job_id.to_string()]);
    Ok(())
}
