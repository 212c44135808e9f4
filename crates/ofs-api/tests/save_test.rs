//! `/save` integration tests.
//!
//! Run with: `cargo test -p ofs-api --test save_test`

mod helpers;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use helpers::{
    png_data_uri, setup_production_test_app, setup_test_app, setup_test_app_without_archive,
    PRIMARY_BASE_URL,
};
use ofs_storage::Storage;
use std::time::Duration;

fn key_from_url(url: &str) -> &str {
    url.strip_prefix(PRIMARY_BASE_URL)
        .and_then(|rest| rest.strip_prefix('/'))
        .expect("URL under primary base")
}

#[tokio::test]
async fn test_save_inline_png_via_post_form() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/save")
        .form(&[("data", png_data_uri())])
        .await;

    response.assert_status_ok();
    let url = response.text();
    assert!(url.ends_with(".png"), "{url}");

    let key = key_from_url(&url);
    assert_eq!(key.len(), 8 + ".png".len());
    let stored = app.primary.download(key).await.unwrap();
    assert_eq!(stored.data.as_ref(), STANDARD.decode(helpers::PNG_BASE64).unwrap().as_slice());
    assert_eq!(stored.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_save_inline_png_via_get_query() {
    let app = setup_test_app_without_archive();

    let response = app
        .client()
        .get("/save")
        .add_query_param("data", png_data_uri())
        .await;

    response.assert_status_ok();
    assert!(response.text().starts_with(PRIMARY_BASE_URL));
    assert_eq!(app.primary.upload_count(), 1);
}

#[tokio::test]
async fn test_save_inline_png_larger_than_axum_default_body_limit() {
    let app = setup_test_app_without_archive();

    let mut image = STANDARD.decode(helpers::PNG_BASE64).unwrap();
    image.resize(2 * 1024 * 1024 + 512 * 1024, 0);
    let data = format!("data:image/png;base64,{}", STANDARD.encode(&image));

    let response = app.client().post("/save").form(&[("data", data)]).await;

    response.assert_status_ok();
    let url = response.text();
    assert!(url.ends_with(".png"), "{url}");
    let stored = app.primary.download(key_from_url(&url)).await.unwrap();
    assert_eq!(stored.data.len(), image.len());
}

#[tokio::test]
async fn test_archive_copy_is_written_in_background() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/save")
        .form(&[("data", png_data_uri())])
        .await;
    response.assert_status_ok();
    let url = response.text();
    let key = key_from_url(&url).to_string();

    let queue = app.state.archive.as_ref().unwrap();
    assert!(queue.wait_idle(Duration::from_secs(5)).await);

    let archive = app.archive.as_ref().unwrap();
    assert_eq!(archive.upload_count(), 1);

    let stats = app.client().get("/archive/stats").await;
    stats.assert_status_ok();
    let body: serde_json::Value = stats.json();
    assert_eq!(body["enabled"], true);
    assert_eq!(body["backend"], "memory");
    assert_eq!(body["submitted"], 1);
    assert_eq!(body["stored"], 1);
    assert_eq!(body["in_flight"], 0);

    let today = Utc::now().date_naive();
    let candidates = [today, today.pred_opt().unwrap()]
        .map(|date| ofs_services::archive_key("ofs", date, &key));
    let mut found = false;
    for candidate in &candidates {
        found |= archive.exists(candidate).await.unwrap();
    }
    assert!(found, "no archive copy at {candidates:?}");
}

#[tokio::test]
async fn test_missing_or_blank_data_is_a_client_error() {
    let app = setup_test_app();

    for response in [
        app.client().post("/save").form(&[("data", "   ")]).await,
        app.client().post("/save").form(&[("other", "x")]).await,
        app.client().get("/save").await,
    ] {
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "INVALID_INPUT");
        assert_eq!(body["error"], "No data received.");
    }

    assert_eq!(app.primary.upload_count(), 0);
}

#[tokio::test]
async fn test_unsupported_media_type_is_rejected() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/save")
        .form(&[("data", "data:text/plain;base64,aGk=")])
        .await;

    assert_eq!(response.status_code(), 415);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");
    assert_eq!(app.primary.upload_count(), 0);
    assert_eq!(app.state.archive.as_ref().unwrap().stats().submitted, 0);
}

#[tokio::test]
async fn test_malformed_payload_is_a_decode_error() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/save")
        .form(&[("data", "data:image/png;base64,***")])
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DECODE_ERROR");
    assert_eq!(app.primary.upload_count(), 0);
}

#[tokio::test]
async fn test_production_config_hides_error_details() {
    let app = setup_production_test_app();

    for response in [
        app.client()
            .post("/save")
            .form(&[("data", "data:image/png;base64,***")])
            .await,
        app.client().post("/save").text("data=plain").await,
    ] {
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert!(body["code"].is_string());
        assert!(body.get("details").is_none(), "{body}");
        assert!(body.get("error_type").is_none(), "{body}");
    }
}

#[tokio::test]
async fn test_remote_reference_is_fetched() {
    let mut remote = mockito::Server::new_async().await;
    remote
        .mock("GET", "/photo.jpg")
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body([0xff_u8, 0xd8, 0xff, 0xe0])
        .create_async()
        .await;

    let app = setup_test_app();
    let response = app
        .client()
        .post("/save")
        .form(&[("data", format!("{}/photo.jpg", remote.url()))])
        .await;

    response.assert_status_ok();
    let url = response.text();
    assert!(url.ends_with(".jpg"), "{url}");
    let stored = app.primary.download(key_from_url(&url)).await.unwrap();
    assert_eq!(stored.data.as_ref(), &[0xff, 0xd8, 0xff, 0xe0]);
}

#[tokio::test]
async fn test_failed_remote_fetch_is_bad_gateway() {
    let mut remote = mockito::Server::new_async().await;
    remote
        .mock("GET", "/missing.png")
        .with_status(404)
        .create_async()
        .await;

    let app = setup_test_app();
    let response = app
        .client()
        .post("/save")
        .form(&[("data", format!("{}/missing.png", remote.url()))])
        .await;

    assert_eq!(response.status_code(), 502);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "REMOTE_FETCH_ERROR");
    assert!(body.get("url").is_none());
    assert_eq!(app.primary.upload_count(), 0);
}

#[tokio::test]
async fn test_archive_stats_without_archive() {
    let app = setup_test_app_without_archive();

    let response = app.client().get("/archive/stats").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body, serde_json::json!({ "enabled": false }));
}
