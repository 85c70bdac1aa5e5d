//! End-to-end tests: the full route table mounted over an in-memory
//! database, driven through HTTP.

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test;
use actix_web::web::Data;
use actix_web::{App, Error};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use vacsched::auth::password::hash_password;
use vacsched::config::Config;
use vacsched::db::MIGRATOR;
use vacsched::routes;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        access_token_ttl: 1800,
        rate_login_per_min: 0,
        rate_protected_per_min: 0,
        api_prefix: String::new(),
    }
}

/// Roles admin/hr/employee (ids 1/2/3), one employee (id 1) and an
/// admin account `root` / `secret` bound to it.
async fn seed_admin(pool: &SqlitePool) {
    sqlx::query("INSERT INTO roles (name) VALUES ('admin'), ('hr'), ('employee')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO employees (last_name, first_name, hire_date, is_active)
         VALUES ('Root', 'Admin', '2020-01-01', 1)",
    )
    .execute(pool)
    .await
    .unwrap();
    let digest = hash_password("secret").unwrap();
    sqlx::query(
        "INSERT INTO users (login, password, role_id, employee_id, is_active)
         VALUES ('root', ?, 1, 1, 1)",
    )
    .bind(&digest)
    .execute(pool)
    .await
    .unwrap();
}

macro_rules! test_app {
    ($pool:expr, $config:expr) => {{
        let config = $config.clone();
        test::init_service(
            App::new()
                .app_data(Data::new($pool.clone()))
                .app_data(Data::new(config.clone()))
                .configure(move |cfg| routes::configure(cfg, config.clone())),
        )
        .await
    }};
}

async fn login_token<S, B>(app: &S, login: &str, password: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "login": login, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK, "login should succeed");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

fn authed(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.insert_header(("Authorization", format!("Bearer {token}")))
}

async fn post_json<S, B>(app: &S, token: &str, uri: &str, body: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let req = authed(test::TestRequest::post().uri(uri), token)
        .set_json(body)
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    (status, test::read_body_json(resp).await)
}

async fn put_json<S, B>(app: &S, token: &str, uri: &str, body: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let req = authed(test::TestRequest::put().uri(uri), token)
        .set_json(body)
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    (status, test::read_body_json(resp).await)
}

async fn get_json<S, B>(app: &S, token: &str, uri: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let req = authed(test::TestRequest::get().uri(uri), token).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    (status, test::read_body_json(resp).await)
}

async fn delete_json<S, B>(app: &S, token: &str, uri: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
    B::Error: std::fmt::Debug,
{
    let req = authed(test::TestRequest::delete().uri(uri), token).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    (status, test::read_body_json(resp).await)
}

fn employee_payload(last_name: &str) -> Value {
    json!({
        "last_name": last_name,
        "first_name": "Test",
        "middle_name": null,
        "hire_date": "2022-01-10",
        "dismissal_date": null,
        "display_color": null,
        "is_active": true,
        "department_id": null,
        "position_id": null,
        "rank_id": null,
        "supervisor_id": null
    })
}

// --- registries -----------------------------------------------------------

#[actix_web::test]
async fn registry_duplicate_name_yields_one_conflict() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (status, body) =
        post_json(&app, &token, "/departments", json!({ "name": "Engineering" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Engineering");

    let (status, body) =
        post_json(&app, &token, "/departments", json!({ "name": "Engineering" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
    assert!(body["detail"].as_str().unwrap().contains("Engineering"));
}

#[actix_web::test]
async fn registry_rename_rules() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (_, eng) = post_json(&app, &token, "/positions", json!({ "name": "Engineer" })).await;
    let (_, _qa) = post_json(&app, &token, "/positions", json!({ "name": "QA" })).await;
    let id = eng["id"].as_i64().unwrap();

    // Renaming to its own name is not a conflict.
    let (status, _) = put_json(
        &app,
        &token,
        &format!("/positions/{id}"),
        json!({ "name": "Engineer" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Renaming onto another row's name is.
    let (status, _) = put_json(
        &app,
        &token,
        &format!("/positions/{id}"),
        json!({ "name": "QA" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Empty names never pass validation.
    let (status, _) = post_json(&app, &token, "/positions", json!({ "name": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = delete_json(&app, &token, &format!("/positions/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = delete_json(&app, &token, &format!("/positions/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- employees ------------------------------------------------------------

#[actix_web::test]
async fn employee_unknown_references_are_rejected() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let mut payload = employee_payload("Orphan");
    payload["supervisor_id"] = json!(999);
    let (status, body) = post_json(&app, &token, "/employees", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Supervisor"));

    let mut payload = employee_payload("Orphan");
    payload["department_id"] = json!(42);
    let (status, body) = post_json(&app, &token, "/employees", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Department"));
}

#[actix_web::test]
async fn supervisor_cycles_are_rejected() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (_, e1) = post_json(&app, &token, "/employees", employee_payload("Alpha")).await;
    let e1_id = e1["id"].as_i64().unwrap();

    let mut sub = employee_payload("Beta");
    sub["supervisor_id"] = json!(e1_id);
    let (_, e2) = post_json(&app, &token, "/employees", sub).await;
    let e2_id = e2["id"].as_i64().unwrap();

    // Alpha reporting to its own report closes a loop.
    let mut update = employee_payload("Alpha");
    update["supervisor_id"] = json!(e2_id);
    let (status, _) = put_json(&app, &token, &format!("/employees/{e1_id}"), update).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Self-supervision is the degenerate loop.
    let mut update = employee_payload("Alpha");
    update["supervisor_id"] = json!(e1_id);
    let (status, _) = put_json(&app, &token, &format!("/employees/{e1_id}"), update).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn employee_delete_cascades_account_and_detaches_reports() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (_, boss) = post_json(&app, &token, "/employees", employee_payload("Boss")).await;
    let boss_id = boss["id"].as_i64().unwrap();

    let mut sub = employee_payload("Report");
    sub["supervisor_id"] = json!(boss_id);
    let (_, sub) = post_json(&app, &token, "/employees", sub).await;
    let sub_id = sub["id"].as_i64().unwrap();

    let (status, account) = post_json(
        &app,
        &token,
        "/users",
        json!({
            "login": "cascade_boss",
            "password": "pw",
            "role_id": 3,
            "employee_id": boss_id
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let account_id = account["id"].as_i64().unwrap();

    let (status, _) = delete_json(&app, &token, &format!("/employees/{boss_id}")).await;
    assert_eq!(status, StatusCode::OK);

    // The bound account went with the employee.
    let (status, _) = get_json(&app, &token, &format!("/users/{account_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The report is detached, not dangling.
    let (status, sub) = get_json(&app, &token, &format!("/employees/{sub_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sub["supervisor_id"].is_null());
}

#[actix_web::test]
async fn employee_expand_embeds_requested_relations() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (_, dept) = post_json(&app, &token, "/departments", json!({ "name": "Design" })).await;
    let dept_id = dept["id"].as_i64().unwrap();

    let (_, boss) = post_json(&app, &token, "/employees", employee_payload("Chief")).await;
    let boss_id = boss["id"].as_i64().unwrap();

    let mut member = employee_payload("Member");
    member["department_id"] = json!(dept_id);
    member["supervisor_id"] = json!(boss_id);
    let (_, member) = post_json(&app, &token, "/employees", member).await;
    let member_id = member["id"].as_i64().unwrap();

    let (status, detail) = get_json(
        &app,
        &token,
        &format!("/employees/{member_id}?expand=department,supervisor,subordinates"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["department"]["name"], "Design");
    assert_eq!(detail["supervisor"]["last_name"], "Chief");
    assert_eq!(detail["subordinates"].as_array().unwrap().len(), 0);
    // Unrequested relations stay absent.
    assert!(detail.get("position").is_none());

    let (status, _) = get_json(
        &app,
        &token,
        &format!("/employees/{member_id}?expand=manager"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Direct reports listing sees exactly the one member.
    let (status, reports) =
        get_json(&app, &token, &format!("/employees/supervisor/{boss_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let reports = reports.as_array().unwrap().clone();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["id"], json!(member_id));
}

// --- auth -----------------------------------------------------------------

#[actix_web::test]
async fn unknown_login_and_wrong_password_are_indistinguishable() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "login": "ghost", "password": "whatever" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key("WWW-Authenticate"));
    let unknown_login: Value = test::read_body_json(resp).await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "login": "root", "password": "wrong" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key("WWW-Authenticate"));
    let wrong_password: Value = test::read_body_json(resp).await;

    assert_eq!(unknown_login, wrong_password);
}

#[actix_web::test]
async fn inactive_account_cannot_login() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    sqlx::query("UPDATE users SET is_active = 0 WHERE login = 'root'")
        .execute(&pool)
        .await
        .unwrap();
    let config = test_config();
    let app = test_app!(pool, config);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "login": "root", "password": "secret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Inactive account");
}

#[actix_web::test]
async fn protected_routes_challenge_without_valid_token() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);

    let req = test::TestRequest::get().uri("/employees").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key("WWW-Authenticate"));

    let req = test::TestRequest::get()
        .uri("/employees")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn deactivation_invalidates_existing_tokens() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let admin = login_token(&app, "root", "secret").await;

    let (_, emp) = post_json(&app, &admin, "/employees", employee_payload("Worker")).await;
    let (status, account) = post_json(
        &app,
        &admin,
        "/users",
        json!({
            "login": "deact_worker",
            "password": "pw",
            "role_id": 3,
            "employee_id": emp["id"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let worker_token = login_token(&app, "deact_worker", "pw").await;
    let (status, _) = get_json(&app, &worker_token, "/employees").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = put_json(
        &app,
        &admin,
        &format!("/users/{}", account["id"]),
        json!({ "is_active": false }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The token still verifies but the subject is now inactive.
    let (status, body) = get_json(&app, &worker_token, "/employees").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Inactive account");
}

#[actix_web::test]
async fn user_administration_is_admin_only() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let admin = login_token(&app, "root", "secret").await;

    let (_, emp) = post_json(&app, &admin, "/employees", employee_payload("Clerk")).await;
    let (status, _) = post_json(
        &app,
        &admin,
        "/users",
        json!({
            "login": "forbid_hr",
            "password": "pw",
            "role_id": 2,
            "employee_id": emp["id"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let hr_token = login_token(&app, "forbid_hr", "pw").await;

    let (_, emp2) = post_json(&app, &hr_token, "/employees", employee_payload("Other")).await;
    let (status, body) = post_json(
        &app,
        &hr_token,
        "/users",
        json!({
            "login": "forbid_other",
            "password": "pw",
            "role_id": 3,
            "employee_id": emp2["id"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status"], 403);
}

// --- users ----------------------------------------------------------------

#[actix_web::test]
async fn user_creation_checks_references_and_binding() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let admin = login_token(&app, "root", "secret").await;

    let (_, emp) = post_json(&app, &admin, "/employees", employee_payload("Bound")).await;
    let emp_id = emp["id"].as_i64().unwrap();

    let (status, _) = post_json(
        &app,
        &admin,
        "/users",
        json!({ "login": "bind_a", "password": "pw", "role_id": 99, "employee_id": emp_id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        &admin,
        "/users",
        json!({ "login": "bind_a", "password": "pw", "role_id": 3, "employee_id": 999 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        &admin,
        "/users",
        json!({ "login": "bind_a", "password": "pw", "role_id": 3, "employee_id": emp_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // 1:1 binding: a second account for the same employee is a conflict.
    let (status, _) = post_json(
        &app,
        &admin,
        "/users",
        json!({ "login": "bind_b", "password": "pw", "role_id": 3, "employee_id": emp_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Taken login is a conflict as well.
    let (_, emp2) = post_json(&app, &admin, "/employees", employee_payload("Second")).await;
    let (status, _) = post_json(
        &app,
        &admin,
        "/users",
        json!({ "login": "bind_a", "password": "pw", "role_id": 3, "employee_id": emp2["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn user_partial_update_touches_only_sent_fields() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let admin = login_token(&app, "root", "secret").await;

    let (_, emp) = post_json(&app, &admin, "/employees", employee_payload("Partial")).await;
    let (_, account) = post_json(
        &app,
        &admin,
        "/users",
        json!({ "login": "partial_a", "password": "pw", "role_id": 3, "employee_id": emp["id"] }),
    )
    .await;
    let id = account["id"].as_i64().unwrap();

    let (status, updated) = put_json(
        &app,
        &admin,
        &format!("/users/{id}"),
        json!({ "role_id": 2 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role_id"], 2);
    assert_eq!(updated["role_name"], "hr");
    // Absent fields stay untouched.
    assert_eq!(updated["login"], "partial_a");
    assert_eq!(updated["is_active"], true);

    let (status, updated) = put_json(
        &app,
        &admin,
        &format!("/users/{id}"),
        json!({ "login": "partial_renamed" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["login"], "partial_renamed");

    // The old credentials stop working, the new login still does.
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "login": "partial_a", "password": "pw" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    login_token(&app, "partial_renamed", "pw").await;
}

// --- vacations ------------------------------------------------------------

#[actix_web::test]
async fn vacation_round_trip_preserves_fields() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (_, emp) = post_json(&app, &token, "/employees", employee_payload("Traveler")).await;
    let emp_id = emp["id"].as_i64().unwrap();

    let (status, created) = post_json(
        &app,
        &token,
        "/vacations",
        json!({
            "employee_id": emp_id,
            "start_date": "2025-06-01",
            "end_date": "2025-06-14",
            "main_vacation_days": 14
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) = get_json(&app, &token, &format!("/vacations/employee/{emp_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap().clone();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], created["id"]);
    assert_eq!(list[0]["start_date"], "2025-06-01");
    assert_eq!(list[0]["end_date"], "2025-06-14");
    assert_eq!(list[0]["main_vacation_days"], 14);

    // Overlap is allowed by design.
    let (status, _) = post_json(
        &app,
        &token,
        "/vacations",
        json!({
            "employee_id": emp_id,
            "start_date": "2025-06-07",
            "end_date": "2025-06-21",
            "main_vacation_days": 14
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[actix_web::test]
async fn vacation_validation_rules() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (_, emp) = post_json(&app, &token, "/employees", employee_payload("Strict")).await;
    let emp_id = emp["id"].as_i64().unwrap();

    let (status, _) = post_json(
        &app,
        &token,
        "/vacations",
        json!({
            "employee_id": emp_id,
            "start_date": "2025-06-14",
            "end_date": "2025-06-01",
            "main_vacation_days": 14
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        &token,
        "/vacations",
        json!({
            "employee_id": emp_id,
            "start_date": "2025-06-01",
            "end_date": "2025-06-14",
            "main_vacation_days": -1
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        &token,
        "/vacations",
        json!({
            "employee_id": 999,
            "start_date": "2025-06-01",
            "end_date": "2025-06-14",
            "main_vacation_days": 14
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn boss_view_returns_direct_reports_only() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (_, boss) = post_json(&app, &token, "/employees", employee_payload("Director")).await;
    let boss_id = boss["id"].as_i64().unwrap();

    let mut direct = employee_payload("Direct");
    direct["supervisor_id"] = json!(boss_id);
    let (_, direct) = post_json(&app, &token, "/employees", direct).await;
    let direct_id = direct["id"].as_i64().unwrap();

    let mut grand = employee_payload("Grand");
    grand["supervisor_id"] = json!(direct_id);
    let (_, grand) = post_json(&app, &token, "/employees", grand).await;
    let grand_id = grand["id"].as_i64().unwrap();

    for id in [direct_id, grand_id] {
        let (status, _) = post_json(
            &app,
            &token,
            "/vacations",
            json!({
                "employee_id": id,
                "start_date": "2025-07-01",
                "end_date": "2025-07-10",
                "main_vacation_days": 10
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, rows) = get_json(&app, &token, &format!("/vacations/boss/{boss_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap().clone();
    assert_eq!(rows.len(), 1, "grand-subordinates must not appear");
    assert_eq!(rows[0]["employee_id"], json!(direct_id));
    assert_eq!(rows[0]["last_name"], "Direct");
    // Unset color falls back to the neutral default; no department yields null.
    assert_eq!(rows[0]["display_color"], "#ffffff");
    assert!(rows[0]["department_name"].is_null());
}

#[actix_web::test]
async fn department_view_denormalizes_staffing_fields() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (_, dept) = post_json(&app, &token, "/departments", json!({ "name": "Engineering" })).await;
    let dept_id = dept["id"].as_i64().unwrap();

    let mut emp = employee_payload("Scheduled");
    emp["department_id"] = json!(dept_id);
    let (_, emp) = post_json(&app, &token, "/employees", emp).await;
    let emp_id = emp["id"].as_i64().unwrap();

    let (status, _) = post_json(
        &app,
        &token,
        "/vacations",
        json!({
            "employee_id": emp_id,
            "start_date": "2025-06-01",
            "end_date": "2025-06-14",
            "main_vacation_days": 14
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, rows) =
        get_json(&app, &token, &format!("/vacations/department/{dept_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["department_name"], "Engineering");
    assert_eq!(rows[0]["main_vacation_days"], 14);
    // Absent staffing fields surface as null rather than failing the row.
    assert!(rows[0]["rank_name"].is_null());
    assert!(rows[0]["position_name"].is_null());
}

// --- schedule export ------------------------------------------------------

#[actix_web::test]
async fn schedule_export_streams_a_document() {
    let pool = test_pool().await;
    seed_admin(&pool).await;
    let config = test_config();
    let app = test_app!(pool, config);
    let token = login_token(&app, "root", "secret").await;

    let (_, dept) = post_json(&app, &token, "/departments", json!({ "name": "Export" })).await;
    let dept_id = dept["id"].as_i64().unwrap();

    let mut emp = employee_payload("Exported");
    emp["department_id"] = json!(dept_id);
    let (_, emp) = post_json(&app, &token, "/employees", emp).await;

    let (status, _) = post_json(
        &app,
        &token,
        "/vacations",
        json!({
            "employee_id": emp["id"],
            "start_date": "2025-06-01",
            "end_date": "2025-06-14",
            "main_vacation_days": 14
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let req = authed(
        test::TestRequest::post()
            .uri(&format!("/generate/vacation-schedule?department_id={dept_id}&year=2025")),
        &token,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "application/msword"
    );
    let disposition = resp
        .headers()
        .get("Content-Disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("2025"));
    let body = test::read_body(resp).await;
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("Export"));
    assert!(body.contains("Exported"));

    // No rows inside the requested year.
    let req = authed(
        test::TestRequest::post()
            .uri(&format!("/generate/vacation-schedule?department_id={dept_id}&year=1999")),
        &token,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Unknown department.
    let req = authed(
        test::TestRequest::post()
            .uri("/generate/vacation-schedule?department_id=999&year=2025"),
        &token,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
