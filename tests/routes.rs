use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};

use teamcrm::domain::auth::AuthenticatedUser;
use teamcrm::domain::duplicates::DuplicateSettings;
use teamcrm::domain::sla::SlaPolicy;
use teamcrm::models::config::{DatabaseSettings, ServerConfig};
use teamcrm::repository::DieselRepository;
use teamcrm::routes;
use teamcrm::services::hooks::HookRegistry;

mod common;

const SECRET: &str = "routes-test-secret";

fn server_config() -> ServerConfig {
    ServerConfig {
        address: "127.0.0.1".to_string(),
        port: 0,
        database_url: String::new(),
        database: DatabaseSettings::default(),
        secret: SECRET.to_string(),
        sweep_interval_secs: 300,
        sla: SlaPolicy::default(),
        duplicates: DuplicateSettings::default(),
    }
}

fn bearer(user: &AuthenticatedUser) -> (header::HeaderName, String) {
    let token = encode(
        &Header::default(),
        user,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

macro_rules! app {
    ($test_db:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(DieselRepository::new($test_db.pool())))
                .app_data(web::Data::new(HookRegistry::default()))
                .app_data(web::Data::new(server_config()))
                .app_data(routes::json_config())
                .service(web::scope("/api/v1").configure(routes::configure)),
        )
        .await
    };
}

#[actix_web::test]
async fn test_requests_without_token_are_rejected() {
    let test_db = common::TestDb::new("test_routes_no_token.db");
    let app = app!(test_db);

    let req = test::TestRequest::get().uri("/api/v1/leads").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let test_db = common::TestDb::new("test_routes_bad_token.db");
    let app = app!(test_db);

    let token = encode(
        &Header::default(),
        &common::admin(1),
        &EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();
    let req = test::TestRequest::get()
        .uri("/api/v1/leads")
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_create_and_list_leads() {
    let test_db = common::TestDb::new("test_routes_leads.db");
    let app = app!(test_db);
    let user = common::user(1, "rep@example.com", &["crm"]);

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .insert_header(bearer(&user))
        .set_json(json!({ "name": "Jane Roe", "email": "JANE@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let lead: Value = test::read_body_json(resp).await;
    assert_eq!(lead["status"], "new");

    let req = test::TestRequest::get()
        .uri("/api/v1/leads?page=1")
        .insert_header(bearer(&user))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Jane Roe");

    let other_team = common::user(2, "rep@other.example.com", &["crm"]);
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/leads/{}", lead["id"]))
        .insert_header(bearer(&other_team))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_invalid_payloads_answer_unprocessable() {
    let test_db = common::TestDb::new("test_routes_invalid.db");
    let app = app!(test_db);
    let user = common::user(1, "rep@example.com", &["crm"]);

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .insert_header(bearer(&user))
        .set_json(json!({ "name": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::post()
        .uri("/api/v1/leads")
        .insert_header(bearer(&user))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_admin_operations_need_admin_role() {
    let test_db = common::TestDb::new("test_routes_roles.db");
    let app = app!(test_db);

    let req = test::TestRequest::post()
        .uri("/api/v1/members")
        .insert_header(bearer(&common::user(1, "rep@example.com", &["crm"])))
        .set_json(json!({ "name": "Bob", "email": "bob@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/v1/members")
        .insert_header(bearer(&common::admin(1)))
        .set_json(json!({ "name": "Bob", "email": "bob@example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn test_csv_import_and_conversion_flow() {
    let test_db = common::TestDb::new("test_routes_import.db");
    let app = app!(test_db);
    let user = common::user(1, "rep@example.com", &["crm"]);

    let req = test::TestRequest::post()
        .uri("/api/v1/leads/import")
        .insert_header(bearer(&user))
        .insert_header((header::CONTENT_TYPE, "text/csv"))
        .set_payload("name,company_name,country\nJane Roe,Acme,DE\nJohn Doe,,FR\n")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let summary: Value = test::read_body_json(resp).await;
    assert_eq!(summary["imported"], 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/leads")
        .insert_header(bearer(&user))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    let lead_id = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|lead| lead["name"] == "Jane Roe")
        .map(|lead| lead["id"].clone())
        .unwrap();

    let convert = || {
        test::TestRequest::post()
            .uri(&format!("/api/v1/leads/{lead_id}/convert"))
            .insert_header(bearer(&user))
            .set_json(json!({ "opportunity_name": "Pilot", "amount_cents": 1000 }))
            .to_request()
    };
    let resp = test::call_service(&app, convert()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, convert()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_lead_merge_keeps_selected_fields_and_retires_duplicate() {
    let test_db = common::TestDb::new("test_routes_lead_merge.db");
    let app = app!(test_db);
    let admin = common::admin(1);

    let mut ids = Vec::new();
    for body in [
        json!({ "name": "Jane Roe", "email": "jane@old.example.com" }),
        json!({ "name": "J. Roe", "email": "jane@new.example.com", "phone": "+1 415 555 2671" }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/leads")
            .insert_header(bearer(&admin))
            .set_json(body)
            .to_request();
        let lead: Value = test::call_and_read_body_json(&app, req).await;
        ids.push(lead["id"].clone());
    }

    let merge = || {
        test::TestRequest::post()
            .uri("/api/v1/leads/merge")
            .insert_header(bearer(&admin))
            .set_json(json!({
                "primary_id": ids[0],
                "duplicate_id": ids[1],
                "fields": { "email": "duplicate", "phone": "duplicate" }
            }))
            .to_request()
    };

    let resp = test::call_service(&app, merge()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!(outcome["outcome"], "merged");
    assert_eq!(outcome["name"], "Jane Roe");
    assert_eq!(outcome["email"], "jane@new.example.com");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/leads/{}", ids[1]))
        .insert_header(bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(&app, merge()).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!(outcome["reason"], "duplicate_deleted");
}
