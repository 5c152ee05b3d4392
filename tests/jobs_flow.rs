mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, json_body, TestApp};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use serde_json::{json, Value};
use uuid::Uuid;

fn job_payload(title: &str) -> Value {
    json!({
        "title": title,
        "salary": 90000,
        "deadline": "2030-01-15T00:00:00Z",
        "description": "build and run backend services",
        "qualifications": "three years of rust",
    })
}

async fn provider_with_token(app: &TestApp, email: &str) -> Result<(Uuid, String)> {
    let user_id = app.insert_user(email, "s3cret1", "jobProvider", true).await?;
    let provider_id = app.insert_job_provider(user_id, "Initech").await?;
    let token = app.login_token(email, "s3cret1").await?;
    Ok((provider_id, token))
}

async fn seeker_with_alert(app: &TestApp, email: &str, alert_title: &str) -> Result<Uuid> {
    let user_id = app.insert_user(email, "s3cret1", "jobSeeker", true).await?;
    let seeker_id = app.insert_job_seeker(user_id, "Ada").await?;
    app.insert_alert(seeker_id, alert_title).await?;
    Ok(seeker_id)
}

#[tokio::test]
async fn job_creation_notifies_seekers_with_matching_alerts() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (provider_id, token) = provider_with_token(&app, "boss@example.com").await?;
    let seeker_id = seeker_with_alert(&app, "ada@example.com", "Rust Engineer").await?;
    let other_seeker = seeker_with_alert(&app, "bob@example.com", "Accountant").await?;

    let response = app
        .post_json(
            &format!("/api/v1/jobproviders/{provider_id}/jobs"),
            &job_payload("Rust Engineer"),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response.into_body()).await?;
    assert_eq!(body["data"]["job_type"], json!("fullTime"));
    let job_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    assert_eq!(app.notification_count(seeker_id).await?, 1);
    assert_eq!(app.notification_count(other_seeker).await?, 0);

    // The matching seeker can read the notification through the nested route.
    let response = app
        .get(&format!("/api/v1/jobseekers/{seeker_id}/notifications"), None)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await?;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["data"][0]["job_id"], json!(job_id));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn alert_matching_is_whitespace_exact() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (provider_id, token) = provider_with_token(&app, "boss@example.com").await?;
    let seeker_id = seeker_with_alert(&app, "ada@example.com", "Rust Engineer").await?;

    // Trailing space in the job title, so no alert matches.
    let response = app
        .post_json(
            &format!("/api/v1/jobproviders/{provider_id}/jobs"),
            &job_payload("Rust Engineer "),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response.into_body()).await?;
    assert_eq!(body["data"]["title"], json!("Rust Engineer "));

    assert_eq!(app.notification_count(seeker_id).await?, 0);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn every_matching_alert_yields_its_own_notification() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (provider_id, token) = provider_with_token(&app, "boss@example.com").await?;
    let user_id = app
        .insert_user("keen@example.com", "s3cret1", "jobSeeker", true)
        .await?;
    let seeker_id = app.insert_job_seeker(user_id, "Ada").await?;
    app.insert_alert(seeker_id, "Rust Engineer").await?;
    app.insert_alert(seeker_id, "Rust Engineer").await?;

    let response = app
        .post_json(
            &format!("/api/v1/jobproviders/{provider_id}/jobs"),
            &job_payload("Rust Engineer"),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    assert_eq!(app.notification_count(seeker_id).await?, 2);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn notification_failures_do_not_block_job_creation() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (provider_id, token) = provider_with_token(&app, "boss@example.com").await?;
    let seeker_id = seeker_with_alert(&app, "ada@example.com", "Rust Engineer").await?;

    // Make every notification insert fail.
    app.with_conn(|conn| {
        conn.batch_execute(
            "ALTER TABLE notifications ADD CONSTRAINT notifications_poisoned CHECK (false);",
        )?;
        Ok(())
    })
    .await?;

    let response = app
        .post_json(
            &format!("/api/v1/jobproviders/{provider_id}/jobs"),
            &job_payload("Rust Engineer"),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(app.notification_count(seeker_id).await?, 0);

    app.with_conn(|conn| {
        conn.batch_execute("ALTER TABLE notifications DROP CONSTRAINT notifications_poisoned;")?;
        Ok(())
    })
    .await?;

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn standalone_job_creation_takes_the_provider_from_the_body() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (provider_id, token) = provider_with_token(&app, "boss@example.com").await?;
    let (_rival_provider, rival_token) = provider_with_token(&app, "rival@example.com").await?;

    let mut payload = job_payload("Rust Engineer");
    payload["job_provider_id"] = json!(provider_id);

    // Only the provider's owner (or an admin) may post under it.
    let response = app
        .post_json("/api/v1/jobs", &payload, Some(&rival_token))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.post_json("/api/v1/jobs", &payload, Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response.into_body()).await?;
    assert_eq!(body["data"]["job_provider_id"], json!(provider_id));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn job_creation_requires_owning_the_provider() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (provider_id, _token) = provider_with_token(&app, "boss@example.com").await?;
    let (_other_provider, other_token) = provider_with_token(&app, "rival@example.com").await?;

    let response = app
        .post_json(
            &format!("/api/v1/jobproviders/{provider_id}/jobs"),
            &job_payload("Rust Engineer"),
            Some(&other_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The ownership check comes before field validation, so a non-owner
    // posting garbage still sees 401, not 400.
    let mut payload = job_payload("   ");
    payload["job_type"] = json!("weekend");
    let response = app
        .post_json(
            &format!("/api/v1/jobproviders/{provider_id}/jobs"),
            &payload,
            Some(&other_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn job_updates_are_owner_or_admin_only() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (provider_id, token) = provider_with_token(&app, "boss@example.com").await?;
    let (_rival_provider, rival_token) = provider_with_token(&app, "rival@example.com").await?;
    app.insert_user("root@example.com", "s3cret1", "admin", true)
        .await?;

    let response = app
        .post_json(
            &format!("/api/v1/jobproviders/{provider_id}/jobs"),
            &job_payload("Rust Engineer"),
            Some(&token),
        )
        .await?;
    let body = json_body(response.into_body()).await?;
    let job_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let response = app
        .put_json(
            &format!("/api/v1/jobs/{job_id}"),
            &json!({ "salary": 1 }),
            Some(&rival_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .put_json(
            &format!("/api/v1/jobs/{job_id}"),
            &json!({ "salary": 95000, "job_type": "partTime" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await?;
    assert_eq!(body["data"]["salary"], json!(95000));
    assert_eq!(body["data"]["job_type"], json!("partTime"));

    let admin_token = app.login_token("root@example.com", "s3cret1").await?;
    let response = app
        .delete(&format!("/api/v1/jobs/{job_id}"), Some(&admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn job_validation_rejects_unknown_type_and_blank_title() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (provider_id, token) = provider_with_token(&app, "boss@example.com").await?;

    let mut payload = job_payload("Rust Engineer");
    payload["job_type"] = json!("weekend");
    let response = app
        .post_json(
            &format!("/api/v1/jobproviders/{provider_id}/jobs"),
            &payload,
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            &format!("/api/v1/jobproviders/{provider_id}/jobs"),
            &job_payload("   "),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn deleting_provider_removes_only_its_jobs() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let (provider_id, token) = provider_with_token(&app, "boss@example.com").await?;
    let (other_provider, other_token) = provider_with_token(&app, "rival@example.com").await?;

    app.post_json(
        &format!("/api/v1/jobproviders/{provider_id}/jobs"),
        &job_payload("Rust Engineer"),
        Some(&token),
    )
    .await?;
    app.post_json(
        &format!("/api/v1/jobproviders/{other_provider}/jobs"),
        &job_payload("Accountant"),
        Some(&other_token),
    )
    .await?;

    let response = app
        .delete(&format!("/api/v1/jobproviders/{provider_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let remaining = app
        .with_conn(move |conn| {
            use jobboard::schema::jobs;
            let titles: Vec<String> = jobs::table.select(jobs::title).load(conn)?;
            Ok(titles)
        })
        .await?;
    assert_eq!(remaining, vec!["Accountant".to_string()]);

    app.cleanup().await?;
    Ok(())
}
