//! Integration tests for the HTTP API
//!
//! Requests go through the router with `tower::ServiceExt::oneshot`; the
//! crawl endpoint runs against a wiremock listing site.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use chrono::NaiveDate;
use job_harvest::config::Config;
use job_harvest::server::{create_app, AppState, USER_ID_HEADER};
use job_harvest::storage::{SqliteStorage, Storage};
use job_harvest::JobListing;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str, db_path: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.site.listing_path = "/jobs/list".to_string();
    config.output.database_path = db_path.display().to_string();
    config.crawler.max_retries = 1;
    config.crawler.retry_delay_ms = 10;
    config.crawler.page_delay_ms = 0;
    config
}

fn listing(n: u32, region: &str, tech_stack: Option<&str>) -> JobListing {
    let at = NaiveDate::from_ymd_opt(2024, 11, 1)
        .unwrap()
        .and_hms_opt(9, 0, n)
        .unwrap();
    JobListing {
        job_group: "91,92".to_string(),
        badge: None,
        company_name: Some(format!("Company {}", n)),
        title: Some(format!("Job {}", n)),
        deadline: None,
        address_main: Some(region.to_string()),
        address_total: Some(region.to_string()),
        experience: Some("Junior".to_string()),
        education: None,
        employment_type: None,
        salary: None,
        tech_stack: tech_stack.map(str::to_string),
        created_at: at,
        crawled_at: at,
        url: Some(format!("https://jobs.example.com/view/{}", n)),
        description: format!("Description {}", n),
    }
}

/// Seeds a database with five listings and returns its app
fn seeded_app(dir: &TempDir) -> axum::Router {
    let db_path = dir.path().join("jobs.db");
    let mut store = SqliteStorage::new(&db_path).unwrap();
    store.insert_job(&listing(1, "Seoul", Some("Rust, SQL"))).unwrap();
    store.insert_job(&listing(2, "Seoul", Some("Rust"))).unwrap();
    store.insert_job(&listing(3, "Busan", Some("Java"))).unwrap();
    store.insert_job(&listing(4, "Seoul", None)).unwrap();
    store.insert_job(&listing(5, "Incheon", Some("Rust, Go"))).unwrap();

    let config = test_config("https://jobs.example.com", &db_path);
    create_app(AppState::new(config, "test-hash"))
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    read_json(app, request).await
}

/// Sends a request as `user` (if any) with an optional JSON body
async fn send(
    app: axum::Router,
    method: Method,
    uri: &str,
    user: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    read_json(app, request).await
}

async fn read_json(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get_json(seeded_app(&dir), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_list_jobs_default_page() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get_json(seeded_app(&dir), "/jobs").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["pagination"]["currentPage"], 1);
    assert_eq!(json["pagination"]["pageSize"], 20);
    assert_eq!(json["pagination"]["totalItems"], 5);

    // newest first by default
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 5);
    assert_eq!(data[0]["title"], "Job 5");
    assert!(data[0]["id"].is_number());
}

#[tokio::test]
async fn test_list_jobs_pagination_and_sort() {
    let dir = TempDir::new().unwrap();
    let (_, json) = get_json(seeded_app(&dir), "/jobs?page=2&size=2&sort=title&order=asc").await;

    assert_eq!(json["pagination"]["currentPage"], 2);
    assert_eq!(json["pagination"]["pageSize"], 2);
    assert_eq!(json["pagination"]["totalItems"], 5);

    let titles: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Job 3", "Job 4"]);
}

#[tokio::test]
async fn test_list_jobs_filters() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);

    let (_, by_region) = get_json(app.clone(), "/jobs?region=Seoul").await;
    assert_eq!(by_region["pagination"]["totalItems"], 3);

    let (_, by_stack) = get_json(app.clone(), "/jobs?region=Seoul&tech_stack=Rust").await;
    assert_eq!(by_stack["pagination"]["totalItems"], 2);

    let (_, by_keyword) = get_json(app, "/jobs?keyword=Company%203").await;
    assert_eq!(by_keyword["pagination"]["totalItems"], 1);
    assert_eq!(by_keyword["data"][0]["address_main"], "Busan");
}

#[tokio::test]
async fn test_list_jobs_invalid_params_fall_back() {
    let dir = TempDir::new().unwrap();
    let (status, json) =
        get_json(seeded_app(&dir), "/jobs?page=zero&size=500&sort=views&order=sideways").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pagination"]["currentPage"], 1);
    assert_eq!(json["pagination"]["pageSize"], 100);
    assert_eq!(json["data"][0]["title"], "Job 5");
}

#[tokio::test]
async fn test_get_job_with_related() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get_json(seeded_app(&dir), "/jobs/2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["job"]["title"], "Job 2");
    assert_eq!(json["data"]["job"]["description"], "Description 2");

    // listings whose stack contains "Rust", excluding job 2 itself
    let related: Vec<i64> = json["data"]["related_jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["id"].as_i64().unwrap())
        .collect();
    assert_eq!(related.len(), 2);
    assert!(related.contains(&1));
    assert!(related.contains(&5));
}

#[tokio::test]
async fn test_get_job_without_stack_has_no_related() {
    let dir = TempDir::new().unwrap();
    let (_, json) = get_json(seeded_app(&dir), "/jobs/4").await;

    assert_eq!(json["data"]["related_jobs"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_get_job_not_found() {
    let dir = TempDir::new().unwrap();
    let (status, json) = get_json(seeded_app(&dir), "/jobs/999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], "error");
    assert_eq!(json["code"], "JOB_NOT_FOUND");
}

#[tokio::test]
async fn test_crawl_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jobs/list"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="item_recruit">
                <h2 class="job_tit"><a href="/view/1" title="Crawled Job">x</a></h2>
            </div>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/list"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/view/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<div class="job_summary">Hi</div>"#),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("jobs.db");
    let mut config = test_config(&server.uri(), &db_path);
    config.crawler.max_pages = 2;
    let app = create_app(AppState::new(config, "test-hash"));

    let (status, json) = get_json(app.clone(), "/crawl").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["saved"], 1);
    assert_eq!(json["data"]["message"], "Crawled 1 jobs successfully");
    assert_eq!(json["data"]["stop_reason"], "page_limit_reached");

    // a second trigger finds nothing new
    let (_, again) = get_json(app.clone(), "/crawl").await;
    assert_eq!(again["data"]["saved"], 0);

    let (_, jobs) = get_json(app, "/jobs").await;
    assert_eq!(jobs["pagination"]["totalItems"], 1);
    assert_eq!(jobs["data"][0]["description"], "Hi");
}

#[tokio::test]
async fn test_crawl_endpoint_survives_site_outage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let app = create_app(AppState::new(
        test_config(&server.uri(), &dir.path().join("jobs.db")),
        "test-hash",
    ));

    let (status, json) = get_json(app, "/crawl").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["saved"], 0);
    assert_eq!(json["data"]["stop_reason"], "page_fetch_exhausted");
}

#[tokio::test]
async fn test_notifications_return_newest_five() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);

    let (status, created) = send(
        app.clone(),
        Method::POST,
        "/jobs",
        None,
        Some(json!({
            "title": "Fresh Job",
            "company_name": "Fresh Co",
            "url": "https://jobs.example.com/view/fresh",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = get_json(app, "/jobs/notifications").await;
    assert_eq!(status, StatusCode::OK);

    let recent = json["data"]["recent_jobs"].as_array().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0]["id"], created["data"]["id"]);
    assert_eq!(recent[0]["title"], "Fresh Job");
    assert_eq!(recent[1]["title"], "Job 5");
    assert_eq!(recent[4]["title"], "Job 2");
    assert!(recent[0]["created_at"].is_string());
}

#[tokio::test]
async fn test_create_job() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);

    let (status, json) = send(
        app.clone(),
        Method::POST,
        "/jobs",
        None,
        Some(json!({
            "title": "Manual Job",
            "company_name": "Manual Co",
            "url": "/view/77?utm_source=mail",
            "tech_stack": "Rust",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["message"], "Job created successfully");

    let id = json["data"]["id"].as_i64().unwrap();
    let (_, job) = get_json(app, &format!("/jobs/{}", id)).await;
    assert_eq!(job["data"]["job"]["url"], "https://jobs.example.com/view/77");
    assert_eq!(job["data"]["job"]["description"], "");
}

#[tokio::test]
async fn test_create_job_requires_fields() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);

    let (status, json) = send(
        app.clone(),
        Method::POST,
        "/jobs",
        None,
        Some(json!({ "title": "No company" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "MISSING_FIELDS");
    assert_eq!(json["message"], "Missing required fields: company_name, url");

    let (status, json) = send(app, Method::POST, "/jobs", None, Some(json!("not an object"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_create_job_rejects_known_url() {
    let dir = TempDir::new().unwrap();
    let (status, json) = send(
        seeded_app(&dir),
        Method::POST,
        "/jobs",
        None,
        Some(json!({
            "title": "Copy",
            "company_name": "Company 1",
            "url": "https://jobs.example.com/view/1#again",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DUPLICATE_JOB");
}

#[tokio::test]
async fn test_delete_job() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);

    let (status, json) = send(app.clone(), Method::DELETE, "/jobs/3", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["message"], "Job deleted successfully");

    let (status, _) = get_json(app.clone(), "/jobs/3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(app, Method::DELETE, "/jobs/3", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "JOB_NOT_FOUND");
}

#[tokio::test]
async fn test_bookmarks_need_a_user() {
    let dir = TempDir::new().unwrap();
    let (status, json) = send(seeded_app(&dir), Method::GET, "/bookmarks", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_bookmark_toggle() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);
    let toggle = |app: axum::Router| {
        send(app, Method::POST, "/bookmarks", Some(7), Some(json!({ "job_id": 2 })))
    };

    let (status, json) = toggle(app.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["message"], "Bookmark added successfully");
    assert_eq!(json["data"]["bookmarked"], true);

    let (_, listed) = send(app.clone(), Method::GET, "/bookmarks", Some(7), None).await;
    assert_eq!(listed["pagination"]["pageSize"], 10);
    assert_eq!(listed["pagination"]["totalItems"], 1);
    assert_eq!(listed["data"][0]["job_id"], 2);
    assert_eq!(listed["data"][0]["title"], "Job 2");

    // bookmarks are per user
    let (_, other) = send(app.clone(), Method::GET, "/bookmarks", Some(8), None).await;
    assert_eq!(other["pagination"]["totalItems"], 0);

    let (status, json) = toggle(app.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["message"], "Bookmark removed successfully");

    let (_, listed) = send(app, Method::GET, "/bookmarks", Some(7), None).await;
    assert_eq!(listed["pagination"]["totalItems"], 0);
}

#[tokio::test]
async fn test_bookmark_validation() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);

    let (status, json) =
        send(app.clone(), Method::POST, "/bookmarks", Some(7), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "JOB_ID_REQUIRED");

    let (status, json) =
        send(app, Method::POST, "/bookmarks", Some(7), Some(json!({ "job_id": 999 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "JOB_NOT_FOUND");
}

#[tokio::test]
async fn test_deleting_job_drops_its_bookmarks() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);

    send(app.clone(), Method::POST, "/bookmarks", Some(7), Some(json!({ "job_id": 4 }))).await;
    send(app.clone(), Method::DELETE, "/jobs/4", None, None).await;

    let (_, listed) = send(app, Method::GET, "/bookmarks", Some(7), None).await;
    assert_eq!(listed["pagination"]["totalItems"], 0);
}

#[tokio::test]
async fn test_application_lifecycle() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);
    let body = json!({ "job_id": 1, "resume_url": "https://cv.example.com/7" });

    let (status, json) =
        send(app.clone(), Method::POST, "/applications", Some(7), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["message"], "Application submitted successfully");
    let id = json["data"]["id"].as_i64().unwrap();

    let (status, json) =
        send(app.clone(), Method::POST, "/applications", Some(7), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DUPLICATE_APPLICATION");

    let (_, listed) = send(app.clone(), Method::GET, "/applications", Some(7), None).await;
    let applications = listed["data"]["applications"].as_array().unwrap();
    assert_eq!(applications.len(), 1);
    assert_eq!(applications[0]["status"], "applied");
    assert_eq!(applications[0]["title"], "Job 1");
    assert_eq!(applications[0]["resume_url"], "https://cv.example.com/7");

    // another user cannot cancel it
    let uri = format!("/applications/{}", id);
    let (status, json) = send(app.clone(), Method::DELETE, &uri, Some(8), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "APPLICATION_NOT_FOUND");

    let (status, json) = send(app.clone(), Method::DELETE, &uri, Some(7), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["message"], "Application canceled successfully");

    let (status, json) = send(app.clone(), Method::DELETE, &uri, Some(7), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_APPLICATION_STATUS");

    let (_, applied) =
        send(app.clone(), Method::GET, "/applications?status=applied", Some(7), None).await;
    assert_eq!(applied["data"]["applications"], Value::Array(vec![]));

    let (_, canceled) =
        send(app, Method::GET, "/applications?status=canceled&order=asc", Some(7), None).await;
    assert_eq!(canceled["data"]["applications"][0]["status"], "canceled");
    assert!(canceled["data"]["applications"][0]["canceled_at"].is_string());
}

#[tokio::test]
async fn test_application_validation() {
    let dir = TempDir::new().unwrap();
    let app = seeded_app(&dir);

    let (status, json) =
        send(app.clone(), Method::POST, "/applications", Some(7), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "JOB_ID_REQUIRED");

    let (status, _) =
        send(app.clone(), Method::POST, "/applications", None, Some(json!({ "job_id": 1 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) =
        send(app, Method::GET, "/applications?status=pending", Some(7), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST");
}
