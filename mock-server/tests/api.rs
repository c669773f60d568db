use axum::http::{self, header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, AuthResponse, Task, TaskList};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Routers share their state across clones, so every call sees earlier writes.
async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<&str>) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(body.unwrap_or_default().to_string()).unwrap()
}

fn session_cookie(response: &axum::response::Response) -> String {
    let raw = response.headers()[header::SET_COOKIE].to_str().unwrap();
    raw.split(';').next().unwrap().to_string()
}

async fn error_code(response: axum::response::Response) -> String {
    let body: serde_json::Value = body_json(response).await;
    body["error"]["code"].as_str().unwrap().to_string()
}

/// Sign up `email` and return (user id, cookie pair).
async fn sign_up(app: &Router, email: &str) -> (String, String) {
    let body = format!(r#"{{"email":"{email}","password":"password123"}}"#);
    let resp = send(app, request("POST", "/auth/signup", None, Some(&body))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let cookie = session_cookie(&resp);
    let auth: AuthResponse = body_json(resp).await;
    (auth.user.id.to_string(), cookie)
}

// --- health ---

#[tokio::test]
async fn health_reports_ok() {
    let resp = send(&app(), request("GET", "/health", None, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

// --- auth ---

#[tokio::test]
async fn sign_up_sets_cookie_and_returns_user() {
    let app = app();
    let resp = send(
        &app,
        request(
            "POST",
            "/auth/signup",
            None,
            Some(r#"{"email":"Ada@Example.com","password":"password123"}"#),
        ),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("HttpOnly"));
    let auth: AuthResponse = body_json(resp).await;
    assert_eq!(auth.user.email, "ada@example.com");
    assert!(set_cookie.contains(&auth.access_token));
}

#[tokio::test]
async fn duplicate_sign_up_conflicts() {
    let app = app();
    sign_up(&app, "a@b.com").await;
    let resp = send(
        &app,
        request(
            "POST",
            "/auth/signup",
            None,
            Some(r#"{"email":"A@B.com","password":"password123"}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(resp).await, "CONFLICT");
}

#[tokio::test]
async fn sign_up_validates_payload() {
    let app = app();
    for body in [
        r#"{"email":"not-an-email","password":"password123"}"#,
        r#"{"email":"a@b.com","password":"short"}"#,
        r#"{"email":"a@b.com"}"#,
    ] {
        let resp = send(&app, request("POST", "/auth/signup", None, Some(body))).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn sign_in_with_wrong_password_is_unauthorized() {
    let app = app();
    sign_up(&app, "a@b.com").await;
    let resp = send(
        &app,
        request(
            "POST",
            "/auth/signin",
            None,
            Some(r#"{"email":"a@b.com","password":"wrong-password"}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "Invalid credentials");
    assert!(body["error"]["details"].is_null());
}

#[tokio::test]
async fn sign_in_validates_email() {
    let resp = send(
        &app(),
        request(
            "POST",
            "/auth/signin",
            None,
            Some(r#"{"email":"not-an-email","password":"password123"}"#),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn auth_attempts_are_rate_limited() {
    let app = app();
    sign_up(&app, "a@b.com").await;
    let body = r#"{"email":"a@b.com","password":"wrong-password"}"#;
    // sign-up above used one attempt of the window
    for _ in 0..9 {
        let resp = send(&app, request("POST", "/auth/signin", None, Some(body))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let resp = send(&app, request("POST", "/auth/signin", None, Some(body))).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
    assert_eq!(body["error"]["message"], "Too many requests. Please try again later.");

    let signup = r#"{"email":"c@d.com","password":"password123"}"#;
    let resp = send(&app, request("POST", "/auth/signup", None, Some(signup))).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn sign_out_invalidates_session() {
    let app = app();
    let (uid, cookie) = sign_up(&app, "a@b.com").await;

    let resp = send(&app, request("POST", "/auth/signout", Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    let uri = format!("/users/{uid}/tasks");
    let resp = send(&app, request("GET", &uri, Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_out_without_session_is_unauthorized() {
    let resp = send(&app(), request("POST", "/auth/signout", None, None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- task access control ---

#[tokio::test]
async fn tasks_require_cookie() {
    let app = app();
    let (uid, _) = sign_up(&app, "a@b.com").await;
    let resp = send(&app, request("GET", &format!("/users/{uid}/tasks"), None, None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, "UNAUTHORIZED");
}

#[tokio::test]
async fn other_users_tasks_are_forbidden() {
    let app = app();
    let (alice, _) = sign_up(&app, "alice@b.com").await;
    let (_, bob_cookie) = sign_up(&app, "bob@b.com").await;

    let uri = format!("/users/{alice}/tasks");
    let resp = send(&app, request("GET", &uri, Some(&bob_cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(resp).await, "FORBIDDEN");
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let app = app();
    let (uid, cookie) = sign_up(&app, "a@b.com").await;
    let uri = format!("/users/{uid}/tasks/00000000-0000-0000-0000-000000000000/complete");
    let resp = send(&app, request("PATCH", &uri, Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(
        body,
        serde_json::json!({"error": {"code": "NOT_FOUND", "message": "Task not found", "details": null}})
    );
}

#[tokio::test]
async fn create_task_validates_title() {
    let app = app();
    let (uid, cookie) = sign_up(&app, "a@b.com").await;
    let uri = format!("/users/{uid}/tasks");
    let long = format!(r#"{{"title":"{}"}}"#, "x".repeat(256));
    for body in [r#"{"title":"   "}"#, long.as_str(), r#"{"description":"x"}"#] {
        let resp = send(&app, request("POST", &uri, Some(&cookie), Some(body))).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn list_rejects_out_of_range_limit() {
    let app = app();
    let (uid, cookie) = sign_up(&app, "a@b.com").await;
    for query in ["limit=0", "limit=101", "offset=-1"] {
        let uri = format!("/users/{uid}/tasks?{query}");
        let resp = send(&app, request("GET", &uri, Some(&cookie), None)).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{query}");
    }
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    let app = app();
    let (uid, cookie) = sign_up(&app, "a@b.com").await;
    let cookie = Some(cookie.as_str());
    let tasks_uri = format!("/users/{uid}/tasks");

    // create two; the newer one lists first
    let resp = send(
        &app,
        request("POST", &tasks_uri, cookie, Some(r#"{"title":"  Walk dog ","description":null}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let first: Task = body_json(resp).await;
    assert_eq!(first.title, "Walk dog");
    assert!(!first.is_completed);

    let resp = send(
        &app,
        request("POST", &tasks_uri, cookie, Some(r#"{"title":"Feed cat","description":"twice"}"#)),
    )
    .await;
    let second: Task = body_json(resp).await;

    let resp = send(&app, request("GET", &tasks_uri, cookie, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: TaskList = body_json(resp).await;
    assert_eq!(list.total, 2);
    let ids: Vec<_> = list.tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    // pagination
    let resp = send(&app, request("GET", &format!("{tasks_uri}?limit=1&offset=1"), cookie, None)).await;
    let page: TaskList = body_json(resp).await;
    assert_eq!(page.total, 2);
    assert_eq!(page.tasks.len(), 1);
    assert_eq!(page.tasks[0].id, first.id);

    // get
    let task_uri = format!("{tasks_uri}/{}", first.id);
    let resp = send(&app, request("GET", &task_uri, cookie, None)).await;
    let fetched: Task = body_json(resp).await;
    assert_eq!(fetched, first);

    // update, description only
    let resp = send(&app, request("PUT", &task_uri, cookie, Some(r#"{"description":"around the block"}"#))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = body_json(resp).await;
    assert_eq!(updated.title, "Walk dog");
    assert_eq!(updated.description.as_deref(), Some("around the block"));
    assert!(updated.updated_at >= first.updated_at);

    // toggle twice
    let toggle_uri = format!("{task_uri}/complete");
    let resp = send(&app, request("PATCH", &toggle_uri, cookie, None)).await;
    let toggled: Task = body_json(resp).await;
    assert!(toggled.is_completed);
    let resp = send(&app, request("PATCH", &toggle_uri, cookie, None)).await;
    let toggled: Task = body_json(resp).await;
    assert!(!toggled.is_completed);

    // delete
    let resp = send(&app, request("DELETE", &task_uri, cookie, None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&app, request("GET", &task_uri, cookie, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&app, request("DELETE", &task_uri, cookie, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, request("GET", &tasks_uri, cookie, None)).await;
    let list: TaskList = body_json(resp).await;
    assert_eq!(list.total, 1);
}
