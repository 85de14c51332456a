//! API integration tests
//!
//! Tests for HTTP API endpoints using axum's test utilities.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{body_to_json, body_to_string, EncoderMode, FakeEncoder, FakeProber, TestHarness};
use serde_json::json;
use tower::ServiceExt;

fn init_request(path: &str) -> Request<Body> {
    Request::post("/api/init")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "videoPath": path }).to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Initialize `path` and return the JSON response.
async fn init(h: &TestHarness, path: &std::path::Path) -> serde_json::Value {
    let response = h
        .router()
        .oneshot(init_request(&path.to_string_lossy()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_to_json(response.into_body()).await
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = TestHarness::new();
    let response = h.router().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "ok");
}

#[tokio::test]
async fn test_api_health_endpoint() {
    let h = TestHarness::new();
    let response = h.router().oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["tasks"], 0);
}

#[tokio::test]
async fn test_init_returns_task_details() {
    let h = TestHarness::new();
    let source = h.media_file("movie.mkv");

    let json = init(&h, &source).await;

    assert_eq!(json["success"], true);
    let id = json["videoId"].as_str().unwrap();
    assert_eq!(id.len(), 32);
    assert_eq!(json["m3u8Url"], format!("/hls/{id}.m3u8"));
    assert_eq!(json["videoInfo"]["duration"], 25.0);
    assert_eq!(json["videoInfo"]["totalSegments"], 3);
    assert_eq!(json["videoInfo"]["width"], 1280);
    assert_eq!(json["videoInfo"]["codec"], "h264");
    assert!(json["videoInfo"]["mtime"].as_u64().is_some());
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let h = TestHarness::new();
    let source = h.media_file("movie.mkv");

    let first = init(&h, &source).await;
    let second = init(&h, &source).await;

    assert_eq!(first["videoId"], second["videoId"]);
    assert_eq!(first["videoInfo"], second["videoInfo"]);
    assert_eq!(h.prober.calls(), 1);
    assert_eq!(h.registry().len(), 1);
}

#[tokio::test]
async fn test_init_missing_file_returns_404() {
    let h = TestHarness::new();
    let missing = h.media.path().join("nope.mkv");

    let response = h
        .router()
        .oneshot(init_request(&missing.to_string_lossy()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "file_not_found");
    assert!(h.registry().is_empty());
    assert_eq!(h.prober.calls(), 0);
}

#[tokio::test]
async fn test_init_empty_path_returns_400() {
    let h = TestHarness::new();
    let response = h.router().oneshot(init_request("  ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_init_probe_failure_returns_500() {
    let h = TestHarness::with_fakes(FakeProber::failing(), FakeEncoder::new(EncoderMode::Write));
    let source = h.media_file("broken.mkv");

    let response = h
        .router()
        .oneshot(init_request(&source.to_string_lossy()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "probe_error");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Invalid data found"));
    assert!(h.registry().is_empty());
}

#[tokio::test]
async fn test_manifest_unknown_id_returns_404() {
    let h = TestHarness::new();
    let response = h
        .router()
        .oneshot(get("/hls/0123456789abcdef0123456789abcdef.m3u8"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manifest_lists_all_segments() {
    let h = TestHarness::new();
    let source = h.media_file("movie.mkv");
    let json = init(&h, &source).await;
    let url = json["m3u8Url"].as_str().unwrap();
    let id = json["videoId"].as_str().unwrap();

    let response = h.router().oneshot(get(url)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(headers[header::PRAGMA], "no-cache");
    assert_eq!(headers[header::EXPIRES], "0");

    let body = body_to_string(response.into_body()).await;
    let token = json["videoInfo"]["mtime"].as_u64().unwrap();
    assert!(body.starts_with("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n"));
    assert!(body.contains("#EXT-X-MEDIA-SEQUENCE:0"));
    assert_eq!(body.matches("#EXTINF:10.000,").count(), 2);
    assert!(body.contains("#EXTINF:5.000,"));
    assert!(body.contains(&format!("/hls/{id}/segment-2.ts?v={token}")));
    assert!(body.trim_end().ends_with("#EXT-X-ENDLIST"));

    // The manifest is persisted in the cache directory too.
    let on_disk = std::fs::read_to_string(h.cache.path().join(format!("{id}.m3u8"))).unwrap();
    assert_eq!(on_disk, body);
}

#[tokio::test]
async fn test_segment_is_encoded_once_and_served() {
    let h = TestHarness::new();
    let source = h.media_file("movie.mkv");
    let json = init(&h, &source).await;
    let id = json["videoId"].as_str().unwrap();
    let uri = format!("/hls/{id}/segment-2.ts?v=123");

    let response = h.router().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp2t");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    assert!(headers.contains_key(header::ETAG));
    assert!(headers[header::LAST_MODIFIED]
        .to_str()
        .unwrap()
        .ends_with(" GMT"));

    let body = body_to_string(response.into_body()).await;
    assert_eq!(body, "segment 2 offset 20.000 duration 5.000");
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        body.len().to_string().as_str()
    );

    // Served from cache the second time.
    let again = h.router().oneshot(get(&uri)).await.unwrap();
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(again.headers()[header::ETAG], headers[header::ETAG]);
    assert_eq!(h.encoder.calls(), 1);
}

#[tokio::test]
async fn test_segment_out_of_range_returns_404() {
    let h = TestHarness::new();
    let source = h.media_file("movie.mkv");
    let json = init(&h, &source).await;
    let id = json["videoId"].as_str().unwrap();

    let response = h
        .router()
        .oneshot(get(&format!("/hls/{id}/segment-3.ts")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(h.encoder.calls(), 0);
}

#[tokio::test]
async fn test_segment_unknown_task_returns_404() {
    let h = TestHarness::new();
    let response = h
        .router()
        .oneshot(get("/hls/deadbeef/segment-0.ts"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "task_not_found");
}

#[tokio::test]
async fn test_segment_bad_name_returns_400() {
    let h = TestHarness::new();
    let source = h.media_file("movie.mkv");
    let json = init(&h, &source).await;
    let id = json["videoId"].as_str().unwrap();

    let response = h
        .router()
        .oneshot(get(&format!("/hls/{id}/init.mp4")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transcode_failure_is_permanent() {
    let h = TestHarness::with_fakes(FakeProber::new(25.0), FakeEncoder::new(EncoderMode::Fail));
    let source = h.media_file("movie.mkv");
    let json = init(&h, &source).await;
    let id = json["videoId"].as_str().unwrap();
    let uri = format!("/hls/{id}/segment-1.ts");

    for _ in 0..3 {
        let response = h.router().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["code"], "transcode_error");
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("Conversion failed!"));
    }
    assert_eq!(h.encoder.calls(), 1);
}

#[tokio::test]
async fn test_missing_output_is_distinct_error() {
    let h = TestHarness::with_fakes(
        FakeProber::new(25.0),
        FakeEncoder::new(EncoderMode::NoOutput),
    );
    let source = h.media_file("movie.mkv");
    let json = init(&h, &source).await;
    let id = json["videoId"].as_str().unwrap();

    let response = h
        .router()
        .oneshot(get(&format!("/hls/{id}/segment-0.ts")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "segment_file_missing");
}

#[tokio::test]
async fn test_cleanup_discards_tasks_and_files() {
    let h = TestHarness::new();
    let source = h.media_file("movie.mkv");
    let json = init(&h, &source).await;
    let id = json["videoId"].as_str().unwrap().to_string();

    let response = h
        .router()
        .oneshot(get(&format!("/hls/{id}/segment-0.ts")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.cache_files().len(), 2);

    let response = h
        .router()
        .oneshot(Request::post("/api/cleanup").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["deletedFiles"], 2);

    assert!(h.cache_files().is_empty());
    assert!(h.registry().is_empty());

    let response = h
        .router()
        .oneshot(get(&format!("/hls/{id}.m3u8")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cleanup_recovers_failed_segments() {
    let h = TestHarness::with_fakes(FakeProber::new(25.0), FakeEncoder::new(EncoderMode::Fail));
    let source = h.media_file("movie.mkv");
    let json = init(&h, &source).await;
    let id = json["videoId"].as_str().unwrap().to_string();
    let uri = format!("/hls/{id}/segment-0.ts");

    let _ = h.router().oneshot(get(&uri)).await.unwrap();
    let _ = h.registry().cleanup().await.unwrap();
    init(&h, &source).await;
    let _ = h.router().oneshot(get(&uri)).await.unwrap();

    assert_eq!(h.encoder.calls(), 2);
}

#[tokio::test]
async fn test_task_status_endpoint() {
    let h = TestHarness::new();
    let source = h.media_file("movie.mkv");
    let json = init(&h, &source).await;
    let id = json["videoId"].as_str().unwrap();

    let _ = h
        .router()
        .oneshot(get(&format!("/hls/{id}/segment-1.ts")))
        .await
        .unwrap();

    let response = h
        .router()
        .oneshot(get(&format!("/api/tasks/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["videoId"], id);
    assert_eq!(json["segments"]["ready"], 1);
    assert_eq!(json["segments"]["pending"], 2);

    let response = h.router().oneshot(get("/api/tasks")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let response = h.router().oneshot(get("/api/tasks/unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tools_endpoint_lists_ffmpeg_and_ffprobe() {
    let h = TestHarness::new();
    let response = h.router().oneshot(get("/api/tools")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["ffmpeg", "ffprobe"]);
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let h = TestHarness::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/init")
        .header(header::ORIGIN, "http://player.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = h.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
