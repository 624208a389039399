use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, file_contents, EchoResponse, UploadReceipt, BYTES_BODY, LINES_BODY, TEXT_BODY};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_headers_and_body() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/echo")
                .header(http::header::CONTENT_TYPE, "application/json")
                .header("x-forum", "one")
                .header("x-forum", "two")
                .body(r#"{"topic":3}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: EchoResponse = body_json(resp).await;
    assert_eq!(echo.method, "PATCH");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.header("content-type"), Some("application/json"));
    assert_eq!(echo.headers["x-forum"], vec!["one", "two"]);
    assert_eq!(echo.body, r#"{"topic":3}"#);
}

#[tokio::test]
async fn echo_accepts_every_verb() {
    for method in ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"] {
        let resp = app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/echo")
                    .body(String::new())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{method}");
        let echo: EchoResponse = body_json(resp).await;
        assert_eq!(echo.method, method);
    }
}

#[tokio::test]
async fn echo_head_has_empty_body() {
    let resp = app()
        .oneshot(Request::builder().method("HEAD").uri("/echo").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());
}

// --- status ---

#[tokio::test]
async fn status_route_answers_requested_code() {
    for code in [200u16, 204, 404, 418, 500, 503] {
        let resp = app().oneshot(get(&format!("/status/{code}"))).await.unwrap();
        assert_eq!(resp.status().as_u16(), code);
    }
}

#[tokio::test]
async fn status_route_rejects_bad_code() {
    let resp = app().oneshot(get("/status/not-a-code")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- fixed bodies ---

#[tokio::test]
async fn fixed_bodies_are_served() {
    let resp = app().oneshot(get("/text")).await.unwrap();
    assert_eq!(body_bytes(resp).await, TEXT_BODY.as_bytes());

    let resp = app().oneshot(get("/lines")).await.unwrap();
    assert_eq!(body_bytes(resp).await, LINES_BODY.as_bytes());

    let resp = app().oneshot(get("/bytes")).await.unwrap();
    assert_eq!(
        resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "application/octet-stream"
    );
    assert_eq!(body_bytes(resp).await, BYTES_BODY);
}

#[tokio::test]
async fn latin1_declares_its_charset() {
    let resp = app().oneshot(get("/latin1")).await.unwrap();
    assert_eq!(
        resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=iso-8859-1"
    );
    assert_eq!(&body_bytes(resp).await[..], &[b'c', b'a', b'f', 0xe9]);
}

// --- upload ---

#[tokio::test]
async fn upload_lists_multipart_parts() {
    let boundary = "forum-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         hello\r\n\
         --{boundary}--\r\n"
    );
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let receipt: UploadReceipt = body_json(resp).await;
    assert_eq!(receipt.method, "POST");
    assert_eq!(receipt.parts.len(), 1);
    let part = &receipt.parts[0];
    assert_eq!(part.name, "file");
    assert_eq!(part.file_name.as_deref(), Some("notes.txt"));
    assert_eq!(part.content_type.as_deref(), Some("text/plain"));
    assert_eq!(part.body, "hello");
    assert_eq!(part.size, 5);
}

#[tokio::test]
async fn upload_without_multipart_is_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body("{}".to_string())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

// --- files ---

#[tokio::test]
async fn files_serve_deterministic_content() {
    let resp = app().oneshot(get("/files/report.txt")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, file_contents("report.txt").as_bytes());
}

#[tokio::test]
async fn missing_files_are_not_found() {
    let resp = app().oneshot(get("/files/missing.txt")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
