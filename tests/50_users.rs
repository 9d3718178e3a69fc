mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::json;

fn registration(username: &str) -> serde_json::Value {
    json!({
        "username": username,
        "password": "password",
        "firstName": "First",
        "lastName": "Last",
        "email": format!("{}@example.com", username)
    })
}

#[tokio::test]
async fn register_then_use_the_token() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let username = common::unique("u");

    let res = server.client.post(server.url("/auth/register")).json(&registration(&username)).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["data"]["token"].as_str().context("token")?.to_string();

    let res = server
        .client
        .get(server.url(&format!("/users/{}", username)))
        .bearer_auth(&token)
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({
            "username": username,
            "firstName": "First",
            "lastName": "Last",
            "email": format!("{}@example.com", username),
            "isAdmin": false,
            "applications": []
        })
    );

    let res = server.client.post(server.url("/auth/register")).json(&registration(&username)).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], format!("Duplicate username: {}", username));
    Ok(())
}

#[tokio::test]
async fn token_requires_valid_credentials() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let username = common::create_user(server.pool(), false).await?;

    let res = server
        .client
        .post(server.url("/auth/token"))
        .json(&json!({ "username": username, "password": "password1" }))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].is_string());

    for (user, password) in [(username.as_str(), "wrong"), ("no-such-user", "password1")] {
        let res = server
            .client
            .post(server.url("/auth/token"))
            .json(&json!({ "username": user, "password": password }))
            .send()
            .await?;
        let (status, body) = common::read(res).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid username/password");
    }
    Ok(())
}

#[tokio::test]
async fn admins_create_and_list_users() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let username = common::unique("a");

    let mut body = registration(&username);
    body["isAdmin"] = json!(true);

    let res = server
        .client
        .post(server.url("/users"))
        .bearer_auth(server.admin_token())
        .json(&body)
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["isAdmin"], true);
    assert!(body["data"]["user"].get("password").is_none());
    assert!(body["data"]["token"].is_string());

    let res = server.client.get(server.url("/users")).bearer_auth(server.admin_token()).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().context("users")?;
    assert!(users.iter().any(|u| u["username"] == username.as_str()));
    Ok(())
}

#[tokio::test]
async fn users_update_themselves_but_not_their_keys() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let username = common::create_user(server.pool(), false).await?;
    let token = server.token(&username, false);
    let path = format!("/users/{}", username);

    let res = server
        .client
        .patch(server.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "firstName": "New", "password": "new-password" }))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["firstName"], "New");
    assert!(body["data"].get("password").is_none());

    let res = server
        .client
        .post(server.url("/auth/token"))
        .json(&json!({ "username": username, "password": "new-password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    for patch in [json!({ "username": "other" }), json!({ "isAdmin": true })] {
        let res = server.client.patch(server.url(&path)).bearer_auth(&token).json(&patch).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", patch);
    }
    Ok(())
}

#[tokio::test]
async fn null_fields_are_rejected_and_nothing_changes() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let username = common::create_user(server.pool(), false).await?;
    let token = server.token(&username, false);
    let path = format!("/users/{}", username);

    for patch in [
        json!({ "firstName": null }),
        json!({ "lastName": "Changed", "email": null }),
        json!({ "password": null }),
    ] {
        let res = server.client.patch(server.url(&path)).bearer_auth(&token).json(&patch).send().await?;
        let (status, body) = common::read(res).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", patch);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    let (_, body) = common::read(server.client.get(server.url(&path)).bearer_auth(&token).send().await?).await?;
    assert_eq!(body["data"]["firstName"], "Test");
    assert_eq!(body["data"]["lastName"], "User");
    Ok(())
}

#[tokio::test]
async fn missing_users_are_not_found() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let missing = common::unique("nobody");
    let path = format!("/users/{}", missing);

    let res = server
        .client
        .patch(server.url(&path))
        .bearer_auth(server.admin_token())
        .json(&json!({ "firstName": "Ghost" }))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("No user: {}", missing));

    let res = server.client.delete(server.url(&path)).bearer_auth(server.admin_token()).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("No user: {}", missing));
    Ok(())
}

#[tokio::test]
async fn missing_user_cannot_apply_to_existing_job() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let handle = common::create_company(server.pool()).await?;
    let missing = common::unique("nobody");

    let res = server
        .client
        .post(server.url("/jobs"))
        .bearer_auth(server.admin_token())
        .json(&json!({ "title": "Open", "salary": 100, "companyHandle": handle }))
        .send()
        .await?;
    let job_id = common::read(res).await?.1["data"]["id"].as_i64().context("job id")?;

    let res = server
        .client
        .post(server.url(&format!("/users/{}/jobs/{}", missing, job_id)))
        .bearer_auth(server.admin_token())
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("No user: {}", missing));
    Ok(())
}

#[tokio::test]
async fn apply_to_job_is_recorded_once() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let username = common::create_user(server.pool(), false).await?;
    let handle = common::create_company(server.pool()).await?;
    let token = server.token(&username, false);

    let res = server
        .client
        .post(server.url("/jobs"))
        .bearer_auth(server.admin_token())
        .json(&json!({ "title": "Applied", "salary": 100, "companyHandle": handle }))
        .send()
        .await?;
    let job_id = common::read(res).await?.1["data"]["id"].as_i64().context("job id")?;

    let apply = format!("/users/{}/jobs/{}", username, job_id);
    for _ in 0..2 {
        let res = server.client.post(server.url(&apply)).bearer_auth(&token).send().await?;
        let (status, body) = common::read(res).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({ "applied": job_id }));
    }

    let res = server
        .client
        .get(server.url(&format!("/users/{}", username)))
        .bearer_auth(&token)
        .send()
        .await?;
    let (_, body) = common::read(res).await?;
    assert_eq!(body["data"]["applications"], json!([job_id]));
    Ok(())
}

#[tokio::test]
async fn applying_to_missing_job_is_not_found() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let username = common::create_user(server.pool(), false).await?;

    let res = server
        .client
        .post(server.url(&format!("/users/{}/jobs/0", username)))
        .bearer_auth(server.token(&username, false))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No job: 0");
    Ok(())
}

#[tokio::test]
async fn delete_self_then_user_is_gone() -> Result<()> {
    let Some(pool) = common::database().await else { return Ok(()) };
    let server = common::spawn_app(pool).await?;
    let username = common::create_user(server.pool(), false).await?;
    let path = format!("/users/{}", username);

    let res = server
        .client
        .delete(server.url(&path))
        .bearer_auth(server.token(&username, false))
        .send()
        .await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "deleted": username }));

    let res = server.client.get(server.url(&path)).bearer_auth(server.admin_token()).send().await?;
    let (status, body) = common::read(res).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("No user: {}", username));
    Ok(())
}
