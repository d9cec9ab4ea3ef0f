//! Integration tests for the Airside Forms HTTP API

use airside_forms::api::{create_router, AppState};
use airside_forms::core::SessionClaims;
use airside_forms::models::{AppConfig, NewUser, Role, SubRole, User};
use airside_forms::storage::Store;
use airside_forms::utils::constants::{MAX_UPLOAD_BYTES, UPLOAD_BODY_LIMIT};
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

const PASSWORD: &str = "rahasia123";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    mesin: SubRole,
    listrik: SubRole,
    superadmin: User,
    admin: User,
    admin2: User,
    teknisi1: User,
    teknisi2: User,
    _uploads: TempDir,
}

fn setup() -> TestApp {
    setup_with(|_| {})
}

fn setup_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let mut config = AppConfig::for_testing(uploads.path().join("uploads"));
    configure(&mut config);

    let store = Store::open_in_memory().unwrap();
    let mesin = store.insert_sub_role("Teknisi Mesin", None).unwrap();
    let listrik = store.insert_sub_role("Teknisi Listrik", None).unwrap();

    // Low cost keeps the suite fast; verify works for any cost
    let hash = bcrypt::hash(PASSWORD, 4).unwrap();
    let user = |username: &str, role: Role, sub_role: Option<&SubRole>| {
        store
            .insert_user(&NewUser {
                name: format!("User {username}"),
                username: username.to_string(),
                password_hash: hash.clone(),
                role,
                sub_role_id: sub_role.map(|s| s.id.clone()),
                is_active: true,
            })
            .unwrap()
    };

    let superadmin = user("superadmin", Role::Superadmin, None);
    let admin = user("admin", Role::Admin, None);
    let admin2 = user("admin2", Role::Admin, None);
    let teknisi1 = user("teknisi1", Role::Teknisi, Some(&mesin));
    let teknisi2 = user("teknisi2", Role::Teknisi, Some(&listrik));

    let state = Arc::new(AppState::new(store, config));
    TestApp {
        router: create_router(state.clone()),
        state,
        mesin,
        listrik,
        superadmin,
        admin,
        admin2,
        teknisi1,
        teknisi2,
        _uploads: uploads,
    }
}

impl TestApp {
    fn token(&self, user: &User) -> String {
        let sub_role_name = self.state.store.sub_role_name_of(user).unwrap();
        let claims = SessionClaims::for_user(user, sub_role_name, self.state.sessions.ttl());
        self.state.sessions.issue(&claims).unwrap()
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, json)
    }

    async fn get(&self, uri: &str, user: Option<&User>) -> (StatusCode, Value) {
        let (status, _, json) = self.call(request(Method::GET, uri, user.map(|u| self.token(u)), None)).await;
        (status, json)
    }

    async fn send(&self, method: Method, uri: &str, user: &User, body: Value) -> (StatusCode, Value) {
        let (status, _, json) = self
            .call(request(method, uri, Some(self.token(user)), Some(body)))
            .await;
        (status, json)
    }

    /// Create a form as `owner`, returning (form id, question ids)
    async fn create_form(&self, owner: &User, sub_role: Option<&SubRole>) -> (String, Vec<String>) {
        let (status, json) = self
            .send(Method::POST, "/forms", owner, form_body("Checklist Genset", sub_role))
            .await;
        assert_eq!(status, StatusCode::OK, "{json}");

        let questions = json["data"]["questions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|q| q["id"].as_str().unwrap().to_string())
            .collect();
        (json["data"]["id"].as_str().unwrap().to_string(), questions)
    }
}

fn request(method: Method, uri: &str, token: Option<String>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn form_body(title: &str, sub_role: Option<&SubRole>) -> Value {
    json!({
        "title": title,
        "subRoleId": sub_role.map(|s| s.id.clone()),
        "questions": [
            { "type": "short_text", "label": "Nomor Unit", "required": true },
            { "type": "multiple_choice", "label": "Kondisi", "options": ["Baik", "Rusak"], "required": true },
            { "type": "rating", "label": "Kebersihan", "rating_max": 5 }
        ]
    })
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    request(
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
}

// ============================================
// Health & auth
// ============================================

#[tokio::test]
async fn test_health_is_public() {
    let app = setup();
    let (status, json) = app.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = setup();
    let (status, headers, json) = app.call(login_request("teknisi1", PASSWORD)).await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["user"]["role"], "teknisi");
    assert_eq!(json["data"]["user"]["sub_role_name"], "Teknisi Mesin");

    let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    // Cookie alone is enough for later requests
    let token = json["data"]["token"].as_str().unwrap();
    let me = Request::builder()
        .uri("/auth/me")
        .header(header::COOKIE, format!("session={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, json) = app.call(me).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["username"], "teknisi1");
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = setup();
    let (status, _, json) = app.call(login_request("admin", "salah-total")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "AUTH_INVALID_CREDENTIALS");
    assert_eq!(json["error"]["message"], "Password salah");
}

#[tokio::test]
async fn test_inactive_account_cannot_login() {
    let app = setup();
    app.state.store.set_user_active(&app.admin2.id, false).unwrap();

    let (status, _, json) = app.call(login_request("admin2", PASSWORD)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "AUTH_ACCOUNT_INACTIVE");
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = setup_with(|config| config.login_attempts_per_minute = 2);

    for _ in 0..2 {
        let (status, _, _) = app.call(login_request("admin", "salah-total")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, headers, json) = app.call(login_request("admin", PASSWORD)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "RATE_LIMITED");
    assert!(headers.contains_key("retry-after"));
}

// ============================================
// Route gate
// ============================================

#[tokio::test]
async fn test_protected_routes_need_session() {
    let app = setup();

    for uri in ["/dashboard", "/forms", "/my-forms", "/admin/users", "/auth/me", "/sub-roles"] {
        let (status, json) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(json["error"]["message"], "Unauthorized");
    }

    let browser = Request::builder()
        .uri("/dashboard")
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = app.call(browser).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers.get(header::LOCATION).unwrap(), "/login");
}

/// Captures formatted log output for assertions
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_gate_rejections_are_logged() {
    let app = setup();
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (status, _) = app.get("/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/admin/users", Some(&app.admin)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Request completed"), "{output}");
    assert!(output.contains("status=401"), "{output}");
    assert!(output.contains("status=403"), "{output}");
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let app = setup();
    let (status, _, _) = app
        .call(request(Method::GET, "/dashboard", Some("not-a-jwt".into()), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleted_user_session_is_rejected() {
    let app = setup();
    let (form_id, questions) = app.create_form(&app.admin, Some(&app.mesin)).await;

    app.state.store.delete_user(&app.teknisi1.id).unwrap();
    let answers = json!({ "answers": [
        { "questionId": questions[0], "value": "GS-01" },
        { "questionId": questions[1], "value": "Baik" }
    ]});
    let (status, json) = app
        .send(Method::POST, &format!("/my-forms/{form_id}/responses"), &app.teknisi1, answers)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["message"], "Unauthorized");
    assert_eq!(app.state.store.count_responses().unwrap(), 0);

    app.state.store.delete_user(&app.admin2.id).unwrap();
    let (status, _) = app
        .send(Method::POST, "/forms", &app.admin2, form_body("Yatim", None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.state.store.count_forms(None).unwrap(), 1);
}

#[tokio::test]
async fn test_admin_routes_are_superadmin_only() {
    let app = setup();

    let (status, _) = app.get("/admin/users", Some(&app.admin)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/forms", Some(&app.teknisi1)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut browser = request(Method::GET, "/admin/users", Some(app.token(&app.admin)), None);
    browser
        .headers_mut()
        .insert(header::ACCEPT, "text/html".parse().unwrap());
    let (status, headers, _) = app.call(browser).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers.get(header::LOCATION).unwrap(), "/dashboard");

    let (status, json) = app.get("/admin/users", Some(&app.superadmin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 5);
}

// ============================================
// Dashboard
// ============================================

#[tokio::test]
async fn test_dashboard_depends_on_role() {
    let app = setup();
    app.create_form(&app.admin, Some(&app.mesin)).await;

    let (_, json) = app.get("/dashboard", Some(&app.superadmin)).await;
    assert_eq!(json["data"]["role"], "superadmin");
    assert_eq!(json["data"]["total_users"], 5);
    assert_eq!(json["data"]["total_sub_roles"], 2);

    let (_, json) = app.get("/dashboard", Some(&app.admin2)).await;
    assert_eq!(json["data"]["role"], "admin");
    assert_eq!(json["data"]["my_forms"], 0);

    let (_, json) = app.get("/dashboard", Some(&app.teknisi1)).await;
    assert_eq!(json["data"]["role"], "teknisi");
    assert_eq!(json["data"]["available_forms"], 1);
    assert_eq!(json["data"]["sub_role_name"], "Teknisi Mesin");
}

// ============================================
// Forms
// ============================================

#[tokio::test]
async fn test_admin_only_sees_own_forms() {
    let app = setup();
    let (form_id, _) = app.create_form(&app.admin, Some(&app.mesin)).await;
    let uri = format!("/forms/{form_id}");

    let (status, _) = app.get(&uri, Some(&app.admin2)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app.get("/forms", Some(&app.admin2)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].as_array().unwrap().is_empty());

    let (status, _) = app
        .send(Method::DELETE, &uri, &app.admin2, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app.get(&uri, Some(&app.superadmin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["questions"].as_array().unwrap().len(), 3);

    let (_, json) = app.get("/forms", Some(&app.admin)).await;
    assert_eq!(json["data"][0]["question_count"], 3);
}

#[tokio::test]
async fn test_form_validation_errors() {
    let app = setup();

    let (status, json) = app
        .send(Method::POST, "/forms", &app.admin, json!({ "title": " ", "questions": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Judul form diperlukan");
    assert_eq!(json["error"]["details"], "title");

    let (status, json) = app
        .send(
            Method::POST,
            "/forms",
            &app.admin,
            json!({ "title": "Kosong", "subRoleId": "tidak-ada", "questions": [{ "type": "date", "label": "Tanggal" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Sub-role tidak ditemukan");
}

#[tokio::test]
async fn test_update_replaces_questions() {
    let app = setup();
    let (form_id, _) = app.create_form(&app.admin, None).await;

    let (status, json) = app
        .send(
            Method::PUT,
            &format!("/forms/{form_id}"),
            &app.admin,
            json!({ "title": "Checklist Baru", "questions": [{ "type": "time", "label": "Jam Cek" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["title"], "Checklist Baru");
    assert_eq!(json["data"]["questions"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["questions"][0]["type"], "time");
}

#[tokio::test]
async fn test_toggle_form_status_flips() {
    let app = setup();
    let (form_id, _) = app.create_form(&app.admin, Some(&app.mesin)).await;
    let uri = format!("/forms/{form_id}/toggle");

    let (status, json) = app.send(Method::POST, &uri, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["is_active"], false);

    // Inactive forms disappear from the technician list
    let (_, json) = app.get("/my-forms", Some(&app.teknisi1)).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let (_, json) = app.send(Method::POST, &uri, &app.admin, json!({})).await;
    assert_eq!(json["data"]["is_active"], true);

    let (_, json) = app.get("/my-forms", Some(&app.teknisi1)).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

// ============================================
// Technician flow
// ============================================

#[tokio::test]
async fn test_teknisi_outside_sub_role_is_forbidden() {
    let app = setup();
    let (form_id, questions) = app.create_form(&app.admin, Some(&app.mesin)).await;

    let (status, json) = app.get(&format!("/my-forms/{form_id}"), Some(&app.teknisi2)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["message"], "Form tidak tersedia untuk Anda");

    let answers = json!({ "answers": [
        { "questionId": questions[0], "value": "GS-01" },
        { "questionId": questions[1], "value": "Baik" }
    ]});
    let (status, _) = app
        .send(Method::POST, &format!("/my-forms/{form_id}/responses"), &app.teknisi2, answers)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, json) = app.get("/my-forms", Some(&app.teknisi2)).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let (status, _) = app.get(&format!("/my-forms/{form_id}"), Some(&app.teknisi1)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_required_question_blocks_submission() {
    let app = setup();
    let (form_id, questions) = app.create_form(&app.admin, Some(&app.mesin)).await;
    let uri = format!("/my-forms/{form_id}/responses");

    let partial = json!({ "answers": [{ "questionId": questions[1], "value": "Baik" }] });
    let (status, json) = app.send(Method::POST, &uri, &app.teknisi1, partial).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Pertanyaan \"Nomor Unit\" wajib diisi");
    assert_eq!(app.state.store.count_responses().unwrap(), 0);

    let invalid = json!({ "answers": [
        { "questionId": questions[0], "value": "GS-01" },
        { "questionId": questions[1], "value": "Meledak" }
    ]});
    let (status, _) = app.send(Method::POST, &uri, &app.teknisi1, invalid).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let complete = json!({ "answers": [
        { "questionId": questions[0], "value": "GS-01" },
        { "questionId": questions[1], "value": "Baik" },
        { "questionId": questions[2], "value": "4" }
    ]});
    let (status, json) = app.send(Method::POST, &uri, &app.teknisi1, complete).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert!(json["data"]["response_id"].is_string());
}

#[tokio::test]
async fn test_checkbox_answer_must_be_a_list() {
    let app = setup();
    let body = json!({
        "title": "Perlengkapan Harian",
        "subRoleId": app.mesin.id,
        "questions": [
            { "type": "checkboxes", "label": "Perlengkapan", "options": ["Helm", "Rompi"] }
        ]
    });
    let (status, json) = app.send(Method::POST, "/forms", &app.admin, body).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let form_id = json["data"]["id"].as_str().unwrap().to_string();
    let question_id = json["data"]["questions"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/my-forms/{form_id}/responses");

    let loose = json!({ "answers": [{ "questionId": question_id, "value": "Helm" }] });
    let (status, json) = app.send(Method::POST, &uri, &app.teknisi1, loose).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Jawaban untuk \"Perlengkapan\" tidak valid");
    assert_eq!(app.state.store.count_responses().unwrap(), 0);

    let listed = json!({ "answers": [{ "questionId": question_id, "value": ["Helm", "Rompi"] }] });
    let (status, json) = app.send(Method::POST, &uri, &app.teknisi1, listed).await;
    assert_eq!(status, StatusCode::OK, "{json}");
}

#[tokio::test]
async fn test_responses_are_private() {
    let app = setup();
    let (form_id, questions) = app.create_form(&app.admin, Some(&app.mesin)).await;

    let answers = json!({ "answers": [
        { "questionId": questions[0], "value": "GS-02" },
        { "questionId": questions[1], "value": "Rusak" },
        { "questionId": questions[2], "value": "2" }
    ]});
    let (_, json) = app
        .send(Method::POST, &format!("/my-forms/{form_id}/responses"), &app.teknisi1, answers)
        .await;
    let response_id = json["data"]["response_id"].as_str().unwrap().to_string();

    // Author
    let (status, json) = app.get("/my-responses", Some(&app.teknisi1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["form"]["title"], "Checklist Genset");
    let (status, _) = app.get(&format!("/my-responses/{response_id}"), Some(&app.teknisi1)).await;
    assert_eq!(status, StatusCode::OK);

    // Another technician
    let (status, _) = app.get(&format!("/my-responses/{response_id}"), Some(&app.teknisi2)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Form owner vs another admin
    let form_response = format!("/forms/{form_id}/responses/{response_id}");
    let (status, json) = app.get(&form_response, Some(&app.admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["user"]["username"], "teknisi1");
    let (status, _) = app.get(&form_response, Some(&app.admin2)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app.get(&format!("/forms/{form_id}/responses"), Some(&app.admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["responses"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_form_analytics() {
    let app = setup();
    let (form_id, questions) = app.create_form(&app.admin, Some(&app.mesin)).await;
    let uri = format!("/my-forms/{form_id}/responses");

    for (kondisi, rating) in [("Baik", "5"), ("Baik", "4"), ("Rusak", "4")] {
        let answers = json!({ "answers": [
            { "questionId": questions[0], "value": "GS-01" },
            { "questionId": questions[1], "value": kondisi },
            { "questionId": questions[2], "value": rating }
        ]});
        let (status, _) = app.send(Method::POST, &uri, &app.teknisi1, answers).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = app.get(&format!("/forms/{form_id}/analytics"), Some(&app.admin)).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["total_responses"], 3);

    let stats = &json["data"]["question_stats"];
    assert_eq!(stats[0]["stats"]["type"], "text");
    assert_eq!(stats[0]["stats"]["count"], 3);
    assert_eq!(stats[1]["stats"]["data"][0]["name"], "Baik");
    assert_eq!(stats[1]["stats"]["data"][0]["value"], 2);
    assert_eq!(stats[1]["stats"]["data"][0]["percentage"], 66.67);
    assert_eq!(stats[2]["stats"]["average"], 4.33);

    let (status, _) = app.get(&format!("/forms/{form_id}/analytics"), Some(&app.admin2)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================
// Users & sub-roles
// ============================================

#[tokio::test]
async fn test_create_user_validation_and_conflict() {
    let app = setup();

    let (status, json) = app
        .send(
            Method::POST,
            "/admin/users",
            &app.superadmin,
            json!({ "name": "Budi", "username": "teknisi1", "password": "rahasia", "role": "teknisi" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], "Username sudah terdaftar");

    let (status, json) = app
        .send(
            Method::POST,
            "/admin/users",
            &app.superadmin,
            json!({ "name": "Budi", "username": "budi", "password": "123", "role": "teknisi" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Password minimal 6 karakter");

    // Sub-role dropped for non-teknisi
    let (status, json) = app
        .send(
            Method::POST,
            "/admin/users",
            &app.superadmin,
            json!({ "name": "Sari", "username": "sari", "password": "rahasia", "role": "admin", "subRoleId": app.listrik.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert!(json["data"]["sub_role_id"].is_null());
    assert!(json["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_update_user_keeps_or_clears_sub_role() {
    let app = setup();
    let uri = format!("/admin/users/{}", app.teknisi1.id);

    // subRoleId absent: kept
    let (status, json) = app
        .send(Method::PUT, &uri, &app.superadmin, json!({ "name": "Teknisi Satu" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["name"], "Teknisi Satu");
    assert_eq!(json["data"]["sub_role_id"], app.mesin.id.as_str());

    // Empty password leaves the old one in place
    let (status, json) = app
        .send(
            Method::PUT,
            &uri,
            &app.superadmin,
            json!({ "subRoleId": app.listrik.id, "password": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["sub_role"]["name"], "Teknisi Listrik");
    let (status, _, _) = app.call(login_request("teknisi1", PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);

    // subRoleId null: cleared
    let (status, json) = app
        .send(Method::PUT, &uri, &app.superadmin, json!({ "subRoleId": null }))
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert!(json["data"]["sub_role_id"].is_null());

    // Non-teknisi role drops the sub-role
    let (status, json) = app
        .send(
            Method::PUT,
            &format!("/admin/users/{}", app.teknisi2.id),
            &app.superadmin,
            json!({ "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["role"], "admin");
    assert!(json["data"]["sub_role_id"].is_null());
}

#[tokio::test]
async fn test_update_user_conflict_and_missing() {
    let app = setup();

    let (status, json) = app
        .send(
            Method::PUT,
            &format!("/admin/users/{}", app.teknisi1.id),
            &app.superadmin,
            json!({ "username": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], "Username sudah terdaftar");

    // Same username as before is not a conflict
    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/admin/users/{}", app.teknisi1.id),
            &app.superadmin,
            json!({ "username": "teknisi1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .send(Method::PUT, "/admin/users/nope", &app.superadmin, json!({ "name": "Siapa" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "User tidak ditemukan");
}

#[tokio::test]
async fn test_superadmin_cannot_delete_self() {
    let app = setup();
    let uri = format!("/admin/users/{}", app.superadmin.id);
    let (status, json) = app.send(Method::DELETE, &uri, &app.superadmin, json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "Tidak dapat menghapus akun sendiri");
}

#[tokio::test]
async fn test_toggle_user_status_flips() {
    let app = setup();
    let uri = format!("/admin/users/{}/toggle", app.teknisi2.id);

    let (status, json) = app.send(Method::POST, &uri, &app.superadmin, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["is_active"], false);

    let (status, _, _) = app.call(login_request("teknisi2", PASSWORD)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, json) = app.send(Method::POST, &uri, &app.superadmin, json!({})).await;
    assert_eq!(json["data"]["is_active"], true);

    let (status, _) = app
        .send(Method::POST, "/admin/users/nope/toggle", &app.superadmin, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sub_role_with_users_cannot_be_deleted() {
    let app = setup();

    let (status, json) = app
        .send(Method::DELETE, &format!("/admin/sub-roles/{}", app.mesin.id), &app.superadmin, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        json["error"]["message"],
        "Tidak dapat menghapus. Masih ada 1 user dengan sub-role ini."
    );

    let (status, json) = app
        .send(
            Method::POST,
            "/admin/sub-roles",
            &app.superadmin,
            json!({ "name": "Teknisi HVAC", "description": "Pendingin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let hvac = json["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::DELETE, &format!("/admin/sub-roles/{hvac}"), &app.superadmin, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.get("/sub-roles", Some(&app.teknisi1)).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_sub_role() {
    let app = setup();
    let uri = format!("/admin/sub-roles/{}", app.mesin.id);

    let (status, json) = app
        .send(
            Method::PUT,
            &uri,
            &app.superadmin,
            json!({ "name": "Teknisi Mesin", "description": "Genset & pompa" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["description"], "Genset & pompa");

    let (status, json) = app
        .send(Method::PUT, &uri, &app.superadmin, json!({ "name": "Teknisi Listrik" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], "Nama sub-role sudah ada");

    let (status, json) = app
        .send(Method::PUT, "/admin/sub-roles/nope", &app.superadmin, json!({ "name": "Teknisi Baru" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "Sub-role tidak ditemukan");
}

// ============================================
// Upload
// ============================================

fn multipart(field: &str, filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "airside-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

impl TestApp {
    async fn upload(&self, field: &str, filename: &str, content: &[u8]) -> (StatusCode, Value) {
        let (content_type, body) = multipart(field, filename, content);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(&self.teknisi1)))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let (status, _, json) = self.call(request).await;
        (status, json)
    }
}

#[tokio::test]
async fn test_upload_policy() {
    let app = setup();

    let (status, json) = app.upload("file", "script.sh", b"#!/bin/sh").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "File type not allowed");

    let (status, json) = app.upload("lampiran", "foto.png", b"png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "No file provided");
}

#[tokio::test]
async fn test_upload_is_served_back() {
    let app = setup();

    let (status, json) = app.upload("file", "panel.png", b"png-bytes").await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["filename"], "panel.png");
    let url = json["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    let (status, _) = app.get(&url, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, &url, Some(app.token(&app.teknisi1)), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"png-bytes");
}

#[tokio::test]
async fn test_upload_rejects_oversize_files() {
    let app = setup();

    // Over the policy limit, still under the request body limit
    let content = vec![0u8; MAX_UPLOAD_BYTES + 1];
    let (status, json) = app.upload("file", "besar.pdf", &content).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "File size exceeds 10MB limit");

    // Over the request body limit
    let content = vec![0u8; UPLOAD_BODY_LIMIT + 1];
    let (status, json) = app.upload("file", "lebih-besar.pdf", &content).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "File size exceeds 10MB limit");
}
