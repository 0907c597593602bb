mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

// Anonymous callers must get an authentication denial on every label and
// note operation, whether or not the referenced id exists, without storage
// ever being consulted.

#[tokio::test]
async fn anonymous_label_requests_are_denied() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let detail = format!(
        "{}/api/labels/8e5a1c1e-0000-4000-8000-000000000001",
        server.base_url
    );

    let res = client
        .get(format!("{}/api/labels", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    let res = client
        .post(format!("{}/api/labels", server.base_url))
        .json(&json!({ "title": "label_1" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(&detail).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .patch(&detail)
        .json(&json!({ "title": "label_update" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.delete(&detail).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn anonymous_note_and_whoami_requests_are_denied() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/notes", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn invalid_bearer_tokens_are_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Garbage token
    let res = client
        .get(format!("{}/api/labels", server.base_url))
        .header("Authorization", "Bearer rubbish43254353453")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Wrong scheme
    let res = client
        .get(format!("{}/api/labels", server.base_url))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
