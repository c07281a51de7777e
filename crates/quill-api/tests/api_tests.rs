//! API Integration Tests
//!
//! Drive the full router over an in-memory store.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use quill_api::auth::jwt::{generate_token_at, unix_now, JwtConfig};
use quill_api::create_router_for_testing;
use quill_api::testing::TEST_JWT_SECRET;
use serde_json::Value;
use std::io::Cursor;
use tower::ServiceExt;

const EMAIL: &str = "a@example.com";
const PASSWORD: &str = "abc123";

fn encode_form(fields: &[(&str, &str)]) -> String {
    fn escape(s: &str) -> String {
        s.replace('%', "%25")
            .replace('&', "%26")
            .replace('=', "%3D")
            .replace('+', "%2B")
            .replace(' ', "+")
    }
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Helper to create a urlencoded form request
fn form_request(method: &str, uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(encode_form(fields)))
        .unwrap()
}

/// Attach the bearer header and the session cookie
fn with_session(mut request: Request<Body>, bearer: &str, cookie: &str) -> Request<Body> {
    let headers = request.headers_mut();
    headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {bearer}").parse().unwrap(),
    );
    headers.insert(header::COOKIE, format!("token={cookie}").parse().unwrap());
    request
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn register(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        form_request(
            "POST",
            "/api/users/register",
            &[("username", username), ("password", password)],
        ),
    )
    .await
}

/// Register and log in; returns the issued token
async fn login_token(app: &Router) -> String {
    let (status, _) = register(app, EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        app,
        form_request(
            "POST",
            "/api/users/login",
            &[("username", EMAIL), ("password", PASSWORD)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["token"].as_str().unwrap().to_string()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn multipart_request(field: &str, filename: Option<&str>, content: &[u8]) -> Request<Body> {
    let boundary = "quill-test-boundary";
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    if filename.is_some() {
        body.extend_from_slice(b"Content-Type: image/png\r\n");
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/images")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let app = create_router_for_testing();
    let request = Request::builder().uri("/ready").body(Body::empty()).unwrap();

    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["store"], "memory");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = create_router_for_testing();
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();

    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/users/login"].is_object());
    assert!(json["paths"]["/api/posts"].is_object());
}

// =============================================================================
// Registration and Login Tests
// =============================================================================

#[tokio::test]
async fn test_register_returns_profile_without_hash() {
    let app = create_router_for_testing();

    let (status, json) = register(&app, EMAIL, PASSWORD).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "User created successfully");
    assert_eq!(json["data"]["username"], EMAIL);
    assert!(json["data"]["id"].is_number());

    let text = json.to_string();
    assert!(!text.contains("password"));
    assert!(!text.contains("$argon2"));
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let app = create_router_for_testing();
    register(&app, EMAIL, PASSWORD).await;

    let (status, json) = register(&app, EMAIL, "other456").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Email has already taken");
}

#[tokio::test]
async fn test_register_reports_first_violated_rule() {
    let app = create_router_for_testing();

    let (status, json) = register(&app, "not-an-email", "x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid email");

    let (_, json) = register(&app, EMAIL, "ab1").await;
    assert_eq!(json["message"], "String must contain at least 6 character(s)");

    let (_, json) = register(&app, EMAIL, "onlyletters").await;
    assert_eq!(
        json["message"],
        "Password must contain at least one letter, one number, and can include special characters"
    );
}

#[tokio::test]
async fn test_register_rejects_json_body() {
    let app = create_router_for_testing();
    let request = Request::builder()
        .method("POST")
        .uri("/api/users/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"a@example.com","password":"abc123"}"#))
        .unwrap();

    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_login_sets_cookie_and_returns_token() {
    let app = create_router_for_testing();
    register(&app, EMAIL, PASSWORD).await;

    let response = app
        .clone()
        .oneshot(form_request(
            "POST",
            "/api/users/login",
            &[("username", EMAIL), ("password", PASSWORD)],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    let token = json["token"].as_str().unwrap();

    assert_eq!(json["payload"]["username"], EMAIL);
    let exp = json["payload"]["exp"].as_u64().unwrap();
    let now = unix_now().unwrap();
    assert!(exp > now && exp <= now + 60);

    assert!(cookie.starts_with(&format!("token={token}")));
    assert!(cookie.contains("Max-Age=60"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("Path=/"));
    assert!(!cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = create_router_for_testing();
    register(&app, EMAIL, PASSWORD).await;

    let (unknown_status, unknown) = send(
        &app,
        form_request(
            "POST",
            "/api/users/login",
            &[("username", "nobody@example.com"), ("password", PASSWORD)],
        ),
    )
    .await;
    let (wrong_status, wrong) = send(
        &app,
        form_request(
            "POST",
            "/api/users/login",
            &[("username", EMAIL), ("password", "wrong123")],
        ),
    )
    .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, wrong_status);
    assert_eq!(unknown, wrong);
    assert_eq!(wrong["message"], "User or Password incorrect");
}

// =============================================================================
// Access Guard Tests
// =============================================================================

#[tokio::test]
async fn test_protected_post_with_matching_session() {
    let app = create_router_for_testing();
    let token = login_token(&app).await;

    let request = with_session(
        form_request("POST", "/api/posts", &[("title", "Hello"), ("content", "World")]),
        &token,
        &token,
    );
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Post created successfully");
    assert_eq!(json["data"]["title"], "Hello");
    assert!(json["data"]["createdAt"].is_string());
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let app = create_router_for_testing();
    login_token(&app).await;

    let (status, json) = send(
        &app,
        form_request("POST", "/api/posts", &[("title", "t"), ("content", "c")]),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Unauthorized");
}

#[tokio::test]
async fn test_cookie_mismatch_rejected() {
    let app = create_router_for_testing();
    let token = login_token(&app).await;

    let request = with_session(
        form_request("POST", "/api/posts", &[("title", "t"), ("content", "c")]),
        &token,
        "some-other-token",
    );
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Bearer alone, no cookie
    let mut request = form_request("POST", "/api/posts", &[("title", "t"), ("content", "c")]);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_foreign_signature_rejected() {
    let app = create_router_for_testing();
    let foreign = JwtConfig::new("some-other-secret", 60);
    let (_, token) = generate_token_at(&foreign, EMAIL, unix_now().unwrap()).unwrap();

    let request = with_session(
        Request::builder()
            .uri("/api/posts")
            .body(Body::empty())
            .unwrap(),
        &token,
        &token,
    );
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = create_router_for_testing();
    let config = JwtConfig::new(TEST_JWT_SECRET, 60);
    // Issued 61 seconds ago, so exp is already in the past
    let (_, token) = generate_token_at(&config, EMAIL, unix_now().unwrap() - 61).unwrap();

    let request = with_session(
        form_request("POST", "/api/posts", &[("title", "t"), ("content", "c")]),
        &token,
        &token,
    );
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Unauthorized");
}

#[tokio::test]
async fn test_all_rejections_look_the_same() {
    let app = create_router_for_testing();
    let token = login_token(&app).await;

    let missing = send(
        &app,
        Request::builder().uri("/api/posts").body(Body::empty()).unwrap(),
    )
    .await;
    let mismatch = send(
        &app,
        with_session(
            Request::builder().uri("/api/posts").body(Body::empty()).unwrap(),
            &token,
            "x",
        ),
    )
    .await;

    assert_eq!(missing, mismatch);
}

// =============================================================================
// Posts API Tests
// =============================================================================

#[tokio::test]
async fn test_posts_crud_flow() {
    let app = create_router_for_testing();
    let token = login_token(&app).await;

    for (title, content) in [("First", "one"), ("Second", "two"), ("First", "again")] {
        let request = with_session(
            form_request("POST", "/api/posts", &[("title", title), ("content", content)]),
            &token,
            &token,
        );
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
    }

    // List, oldest first
    let (status, json) = send(
        &app,
        with_session(
            Request::builder().uri("/api/posts").body(Body::empty()).unwrap(),
            &token,
            &token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Posts retrieved successfully");
    let posts = json["data"].as_array().unwrap();
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0]["content"], "one");
    assert_eq!(posts[2]["content"], "again");
    let first_id = posts[0]["id"].as_i64().unwrap().to_string();

    // Exact title filter
    let (_, json) = send(
        &app,
        with_session(
            Request::builder()
                .uri("/api/posts/First")
                .body(Body::empty())
                .unwrap(),
            &token,
            &token,
        ),
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    // Update
    let (status, json) = send(
        &app,
        with_session(
            form_request(
                "PUT",
                "/api/posts",
                &[("id", first_id.as_str()), ("title", "Edited"), ("content", "changed")],
            ),
            &token,
            &token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Post updated successfully");
    assert_eq!(json["data"]["title"], "Edited");

    // Delete returns the removed post
    let (status, json) = send(
        &app,
        with_session(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/posts/{first_id}"))
                .body(Body::empty())
                .unwrap(),
            &token,
            &token,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Post deleted successfully");
    assert_eq!(json["data"]["content"], "changed");
}

#[tokio::test]
async fn test_post_failures_share_generic_message() {
    let app = create_router_for_testing();
    let token = login_token(&app).await;

    let delete_missing = with_session(
        Request::builder()
            .method("DELETE")
            .uri("/api/posts/999")
            .body(Body::empty())
            .unwrap(),
        &token,
        &token,
    );
    let (status, json) = send(&app, delete_missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Posts not found");
    assert_eq!(json["data"], serde_json::json!([]));

    let update_bad_id = with_session(
        form_request(
            "PUT",
            "/api/posts",
            &[("id", "abc"), ("title", "t"), ("content", "c")],
        ),
        &token,
        &token,
    );
    let (status, json) = send(&app, update_bad_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Posts not found");
    assert_eq!(json["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_api_responses_carry_security_headers() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(Request::builder().uri("/api/posts").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
}

// =============================================================================
// Image Upload Tests
// =============================================================================

#[tokio::test]
async fn test_image_upload_compresses_and_stores() {
    let app = create_router_for_testing();
    let token = login_token(&app).await;

    let request = with_session(
        multipart_request("image", Some("photo.png"), &png_bytes(1600, 900)),
        &token,
        &token,
    );
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "File uploaded and compressed successfully");

    use base64::Engine;
    let stored = json["data"]["image"].as_str().unwrap();
    let jpeg = base64::engine::general_purpose::STANDARD
        .decode(stored)
        .unwrap();
    assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (800, 450));
}

#[tokio::test]
async fn test_image_upload_requires_file_field() {
    let app = create_router_for_testing();
    let token = login_token(&app).await;

    // Text part under the right name
    let request = with_session(multipart_request("image", None, b"hello"), &token, &token);
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid file");

    // File under the wrong name
    let request = with_session(
        multipart_request("picture", Some("a.png"), &png_bytes(10, 10)),
        &token,
        &token,
    );
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid file");
}

#[tokio::test]
async fn test_image_upload_rejects_garbage() {
    let app = create_router_for_testing();
    let token = login_token(&app).await;

    let request = with_session(
        multipart_request("image", Some("fake.png"), b"definitely not an image"),
        &token,
        &token,
    );
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_tall_narrow_image_refused_without_crashing() {
    let app = create_router_for_testing();
    let token = login_token(&app).await;

    // A few KB on the wire, but 800x16000000 once scaled to the target width
    let img = image::GrayImage::from_pixel(1, 20_000, image::Luma([7]));
    let mut tall = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut tall), ImageFormat::Png)
        .unwrap();

    let request = with_session(
        multipart_request("image", Some("tall.png"), &tall),
        &token,
        &token,
    );
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    // Still serving afterwards
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_image_upload_requires_session() {
    let app = create_router_for_testing();

    let (status, _) = send(
        &app,
        multipart_request("image", Some("a.png"), &png_bytes(10, 10)),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
