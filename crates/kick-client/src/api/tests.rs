use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;

use super::channels::interpret_channel_response;
use super::request::{RawResponse, body_preview};
use super::*;
use crate::{ErrorKind, KickError};

fn raw(status: u16, content_type: &str, body: &str) -> RawResponse {
    RawResponse {
        status,
        content_type: content_type.into(),
        body: body.into(),
    }
}

const LIVE_BODY: &str = r#"{
    "id": 1,
    "user_id": 4242,
    "slug": "streamer",
    "user": {"id": 4242, "username": "Streamer"},
    "chatroom": {"id": 668},
    "livestream": {
        "session_title": "Late night",
        "viewer_count": 1520,
        "categories": [{"name": "Just Chatting"}, {"name": "IRL"}]
    }
}"#;

#[test]
fn live_channel_maps_all_fields() {
    let info = interpret_channel_response("streamer", raw(200, "application/json", LIVE_BODY))
        .unwrap();
    assert_eq!(
        info,
        ChannelInfo {
            username: "Streamer".into(),
            title: "Late night".into(),
            viewers: 1520,
            category: "Just Chatting".into(),
            is_live: true,
            chatroom_id: Some(668),
            user_id: Some(4242),
        }
    );
}

#[test]
fn offline_channel_keeps_chatroom() {
    let body = r#"{"user": {"username": "Quiet"}, "chatroom": {"id": 77}, "livestream": null}"#;
    let info = interpret_channel_response("quiet", raw(200, "application/json", body)).unwrap();
    assert!(!info.is_live);
    assert_eq!(info.title, "Offline");
    assert_eq!(info.viewers, 0);
    assert_eq!(info.category, "N/A");
    assert_eq!(info.chatroom_id, Some(77));
}

#[test]
fn empty_livestream_object_is_offline() {
    let body = r#"{"user": {"username": "Quiet"}, "chatroom": {"id": 77}, "livestream": {}}"#;
    let info = interpret_channel_response("quiet", raw(200, "application/json", body)).unwrap();
    assert!(!info.is_live);
    assert_eq!(info.title, "Offline");
    assert_eq!(info.chatroom_id, Some(77));
}

#[test]
fn missing_user_falls_back_to_slug() {
    let info = interpret_channel_response("someone", raw(200, "application/json", "{}")).unwrap();
    assert_eq!(info.username, "someone");
    assert_eq!(info.chatroom_id, None);
}

#[test]
fn live_without_categories_reports_na() {
    let body = r#"{"chatroom": {"id": 1}, "livestream": {"session_title": "t"}}"#;
    let info = interpret_channel_response("x", raw(200, "application/json", body)).unwrap();
    assert!(info.is_live);
    assert_eq!(info.category, "N/A");
    assert_eq!(info.viewers, 0);
}

#[test]
fn html_with_json_content_type_is_upstream_error_with_preview() {
    let body = "<!DOCTYPE html>\n<html><body>Just a moment...</body></html>";
    let err = interpret_channel_response("x", raw(200, "application/json", body)).unwrap_err();
    match &err {
        KickError::Upstream {
            status, preview, ..
        } => {
            assert_eq!(*status, 200);
            assert!(preview.starts_with("<!DOCTYPE html> <html>"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Upstream);
}

#[test]
fn server_error_is_upstream() {
    let err = interpret_channel_response("x", raw(503, "text/html", "busy")).unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(matches!(err, KickError::Upstream { .. }));
}

#[test]
fn preview_is_truncated_and_single_line() {
    let body = "a\n".repeat(300);
    let preview = body_preview(&body);
    assert_eq!(preview.chars().count(), PREVIEW_CHARS);
    assert!(!preview.contains('\n'));
}

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn not_found_is_single_request_with_status_404() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/channels/{slug}",
            get(
                |State(hits): State<Arc<AtomicUsize>>, Path(_slug): Path<String>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::NOT_FOUND, "not found")
                },
            ),
        )
        .with_state(hits.clone());
    let base = spawn_server(router).await;

    let client = KickApiClient::with_base_url(reqwest::Client::new(), base);
    let err = client.get_channel_info("ghost").await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(matches!(err, KickError::ChannelNotFound { ref slug } if slug == "ghost"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sends_browser_headers_and_parses_live_channel() {
    let router = Router::new().route(
        "/channels/{slug}",
        get(|headers: axum::http::HeaderMap| async move {
            let ua = headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let referer = headers
                .get(header::REFERER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if !ua.starts_with("Mozilla/5.0") || referer != "https://kick.com/streamer" {
                return (StatusCode::FORBIDDEN, "bot").into_response();
            }
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                LIVE_BODY,
            )
                .into_response()
        }),
    );
    let base = spawn_server(router).await;

    let client = KickApiClient::with_base_url(reqwest::Client::new(), format!("{base}/"));
    let info = client.get_channel_info("streamer").await.unwrap();
    assert!(info.is_live);
    assert_eq!(info.chatroom_id, Some(668));
}

#[tokio::test]
async fn refused_connection_is_connectivity_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = KickApiClient::with_base_url(reqwest::Client::new(), format!("http://{addr}"));
    let err = client.get_channel_info("x").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);
}
