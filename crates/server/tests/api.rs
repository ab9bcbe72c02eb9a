//! In-process HTTP tests driving the router with `tower::ServiceExt`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::codecs::gif::GifEncoder;
use image::{Delay, DynamicImage, Frame, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use server::{build_router, ServerConfig, ServerState};
use sharkid::{BackendConfig, Recognizer, SharkIdConfig, StoreConfig};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

fn shark(seed: u32) -> RgbImage {
    RgbImage::from_fn(240, 150, |x, y| {
        if (60..180).contains(&x) && (40..110).contains(&y) {
            if (x * 7 + y * 13 + seed * 31) % (11 + seed % 5) < 3 {
                Rgb([60 + (seed * 17 % 80) as u8, 50, 40])
            } else {
                Rgb([215, 205 - (seed % 30) as u8, 185])
            }
        } else {
            Rgb([12, 72, 128])
        }
    })
}

fn png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn gif(pattern: &[bool]) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        let frames = pattern.iter().map(|&with_subject| {
            let img = if with_subject {
                shark(3)
            } else {
                RgbImage::from_pixel(240, 150, Rgb([12, 72, 128]))
            };
            Frame::from_parts(
                DynamicImage::ImageRgb8(img).to_rgba8(),
                0,
                0,
                Delay::from_numer_denom_ms(100, 1),
            )
        });
        encoder.encode_frames(frames).unwrap();
    }
    bytes
}

fn app_with(pipeline: SharkIdConfig) -> Router {
    let recognizer = Recognizer::from_config(&pipeline).unwrap();
    let state = ServerState::with_recognizer(ServerConfig::default(), Arc::new(recognizer));
    build_router(Arc::new(state))
}

fn app() -> Router {
    app_with(SharkIdConfig::default())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn post(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_reports_catalog_size() {
    let app = app();
    let (status, json) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["embedding_count"], 0);
    assert_eq!(json["embedding_dim"], 106);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn detect_finds_subject_and_nulls_on_open_water() {
    let app = app();
    let (status, json) = send(&app, post("/detect", png(&shark(1)))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["subject_box"]["w"].as_f64().unwrap() > 0.0);
    assert!(json["zone_box"].is_object());

    let water = RgbImage::from_pixel(240, 150, Rgb([12, 72, 128]));
    let (status, json) = send(&app, post("/detect", png(&water))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["subject_box"].is_null());
    assert!(json["zone_box"].is_null());
}

#[tokio::test]
async fn empty_and_unreadable_bodies_are_client_errors() {
    let app = app();
    for uri in ["/detect", "/classify", "/embeddings?individual_id=a", "/process-video"] {
        let (status, json) = send(&app, post(uri, Vec::new())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"]["code"], "EMPTY_BODY", "{uri}");
    }

    let (status, json) = send(&app, post("/classify", b"not an image".to_vec())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "UNREADABLE_IMAGE");
}

#[tokio::test]
async fn stored_individual_is_classified_first() {
    let app = app();
    for (seed, id) in [(1, "shark-1"), (7, "shark-7")] {
        let uri = format!("/embeddings?individual_id={id}&display_name=Fin{seed}&photo_id=p{seed}");
        let (status, json) = send(&app, post(&uri, png(&shark(seed)))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "stored");
        assert_eq!(json["individual_id"], id);
        assert_eq!(json["embedding_dim"], 106);
    }

    let (status, json) = send(&app, post("/classify", png(&shark(7)))).await;
    assert_eq!(status, StatusCode::OK);
    let candidates = json["candidates"].as_array().unwrap();
    assert_eq!(candidates[0]["individual_id"], "shark-7");
    assert_eq!(candidates[0]["display_name"], "Fin7");
    assert!(candidates[0]["score"].as_f64().unwrap() > 0.99);

    let (_, json) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(json["embedding_count"], 2);
}

#[tokio::test]
async fn malformed_parameters_are_bad_requests() {
    let app = app();
    let body = png(&shark(2));
    for uri in [
        "/classify?subject_x=0.1&subject_y=0.1",
        "/classify?orientation=sideways",
        "/classify?zone_x=abc&zone_y=0&zone_w=1&zone_h=1",
        "/classify?subject_x=0.1&subject_y=0.1&subject_w=1.5&subject_h=0.5",
    ] {
        let (status, json) = send(&app, post(uri, body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"]["code"], "BAD_REQUEST", "{uri}");
    }

    let (status, _) = send(&app, post("/embeddings?display_name=x", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn annotated_boxes_are_accepted() {
    let app = app();
    let uri = "/embeddings?individual_id=a&display_name=A&orientation=left\
               &subject_x=0.25&subject_y=0.25&subject_w=0.5&subject_h=0.5\
               &zone_x=0.3&zone_y=0.2&zone_w=0.4&zone_h=0.6";
    let (status, _) = send(&app, post(uri, png(&shark(4)))).await;
    assert_eq!(status, StatusCode::OK);

    let uri = "/classify?orientation=face_left\
               &subject_x=0.25&subject_y=0.25&subject_w=0.5&subject_h=0.5\
               &zone_x=0.3&zone_y=0.2&zone_w=0.4&zone_h=0.6";
    let (status, json) = send(&app, post(uri, png(&shark(4)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["candidates"][0]["individual_id"], "a");
}

#[tokio::test]
async fn gif_upload_yields_frames_with_candidates() {
    let app = app();
    let (status, _) = send(
        &app,
        post("/embeddings?individual_id=diver&display_name=D", png(&shark(3))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 10 fps and a 2 s interval: every 20th frame is inspected.
    let mut pattern = vec![false; 41];
    pattern[0] = true;
    pattern[40] = true;
    let request = Request::builder()
        .method("POST")
        .uri("/process-video?classify=true")
        .header(header::CONTENT_TYPE, "image/gif")
        .body(Body::from(gif(&pattern)))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    let frames = json["frames"].as_array().unwrap();
    assert_eq!(frames[0]["frame_index"], 0);
    assert_eq!(frames[1]["frame_index"], 40);
    assert_eq!(frames[1]["timestamp_sec"], 4.0);
    assert!(!frames[0]["jpeg_bytes"].as_str().unwrap().is_empty());
    assert_eq!(frames[0]["candidates"][0]["individual_id"], "diver");
}

#[tokio::test]
async fn unreadable_video_is_an_empty_list() {
    let request = Request::builder()
        .method("POST")
        .uri("/process-video")
        .header(header::CONTENT_TYPE, "video/mp4")
        .body(Body::from(vec![0u8; 64]))
        .unwrap();
    let (status, json) = send(&app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
    assert!(json["frames"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn catalog_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = SharkIdConfig::default();
    pipeline.store = StoreConfig::new().with_backend(BackendConfig::file(dir.path().join("e.bin")));

    let first = app_with(pipeline.clone());
    let (status, _) = send(
        &first,
        post("/embeddings?individual_id=keep&display_name=K", png(&shark(5))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    drop(first);

    let second = app_with(pipeline);
    let (_, json) = send(
        &second,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(json["embedding_count"], 1);
}

#[tokio::test]
async fn unknown_route_and_disabled_metrics_are_404() {
    let app = app();
    let (status, json) = send(
        &app,
        Request::builder().uri("/nope").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        Request::builder().uri("/metrics").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
