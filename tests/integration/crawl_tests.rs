//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the listing site and run the
//! full crawl cycle end-to-end against a temporary SQLite database.

use job_harvest::config::Config;
use job_harvest::crawler::run_crawl;
use job_harvest::storage::{JobQuery, RunStatus, SqliteStorage, Storage};
use job_harvest::DoneReason;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/jobs/list";

/// Creates a fast test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.site.listing_path = LISTING_PATH.to_string();
    config.output.database_path = db_path.display().to_string();
    config.crawler.max_retries = 2;
    config.crawler.retry_delay_ms = 10;
    config.crawler.page_delay_ms = 0;
    config.crawler.request_timeout_secs = 1;
    config
}

/// One job card linking to `/view/{id}`
fn card(id: u32) -> String {
    format!(
        r#"<div class="item_recruit">
            <strong class="corp_name"><a href="/company/{id}" title="Company {id}">Company {id}</a></strong>
            <h2 class="job_tit"><a href="/view/{id}" title="Job {id}">Job {id}</a></h2>
            <span class="date" title="2030-01-{day:02}">~ 01/{day:02}</span>
            <span class="work_place">Seoul</span>
            <span class="career">Junior</span>
            <div class="job_sector"><span>Rust</span><span>SQL</span></div>
        </div>"#,
        id = id,
        day = id % 28 + 1
    )
}

fn page(cards: &[String]) -> String {
    format!("<html><body>{}</body></html>", cards.join("\n"))
}

async fn mount_page(server: &MockServer, number: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", number.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_details(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/view/\d+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="job_summary"> Build things. </div>"#),
        )
        .mount(server)
        .await;
}

fn open_store(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("jobs.db")).expect("Failed to open storage")
}

fn stored_urls(store: &SqliteStorage) -> Vec<String> {
    let query = JobQuery {
        size: JobQuery::MAX_SIZE,
        ..JobQuery::default()
    };
    let (jobs, _) = store.list_jobs(&query).unwrap();
    jobs.into_iter()
        .filter_map(|job| job.listing.url)
        .collect()
}

#[tokio::test]
async fn test_full_crawl_to_page_limit() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card(1), card(2)])).await;
    mount_page(&server, 2, page(&[card(3)])).await;
    mount_page(&server, 3, page(&[])).await;
    mount_details(&server).await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let mut config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));
    config.crawler.max_pages = 3;

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();

    assert_eq!(report.reason, DoneReason::PageLimitReached);
    assert_eq!(report.saved_count(), 3);
    assert_eq!(report.totals.pages_fetched, 3);
    assert_eq!(store.count_jobs().unwrap(), 3);

    // Saved in page order, cards in document order
    let titles: Vec<_> = report
        .saved
        .iter()
        .map(|l| l.title.clone().unwrap())
        .collect();
    assert_eq!(titles, vec!["Job 1", "Job 2", "Job 3"]);

    let first = &report.saved[0];
    assert_eq!(first.description, "Build things.");
    assert_eq!(first.tech_stack.as_deref(), Some("Rust, SQL"));
    assert_eq!(first.company_name.as_deref(), Some("Company 1"));
    assert_eq!(first.url.as_deref(), Some(format!("{}/view/1", server.uri()).as_str()));
}

#[tokio::test]
async fn test_empty_page_does_not_end_run() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[])).await;
    mount_page(&server, 2, page(&[card(5)])).await;
    mount_details(&server).await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let mut config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));
    config.crawler.max_pages = 2;

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();

    assert_eq!(report.reason, DoneReason::PageLimitReached);
    assert_eq!(report.totals.pages_fetched, 2);
    assert_eq!(report.saved_count(), 1);
    assert_eq!(report.saved[0].title.as_deref(), Some("Job 5"));
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card(1), card(2), card(3)])).await;
    mount_page(&server, 2, page(&[])).await;
    mount_details(&server).await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));

    let first = run_crawl(&config, "test-hash", &mut store).await.unwrap();
    assert_eq!(first.saved_count(), 3);

    let second = run_crawl(&config, "test-hash", &mut store).await.unwrap();
    assert_eq!(second.saved_count(), 0);
    assert_eq!(second.totals.duplicates_skipped, 3);
    assert_eq!(store.count_jobs().unwrap(), 3);

    // url stays unique in the table
    let mut urls = stored_urls(&store);
    let before = urls.len();
    urls.sort();
    urls.dedup();
    assert_eq!(urls.len(), before);
}

#[tokio::test]
async fn test_quota_stops_mid_page() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card(1), card(2), card(3)])).await;
    mount_details(&server).await;

    // page 2 must never be requested
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[card(4)])))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let mut config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));
    config.crawler.max_jobs = 2;

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();

    assert_eq!(report.reason, DoneReason::QuotaReached);
    assert_eq!(report.saved_count(), 2);
    assert_eq!(store.count_jobs().unwrap(), 2);
}

#[tokio::test]
async fn test_zero_quota_fetches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let mut config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));
    config.crawler.max_jobs = 0;

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();
    assert_eq!(report.reason, DoneReason::QuotaReached);
    assert_eq!(report.totals.pages_fetched, 0);
}

#[tokio::test]
async fn test_exhausted_page_fetch_ends_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));

    let report = run_crawl(&config, "test-hash", &mut store)
        .await
        .expect("a failed page fetch is not a run error");

    assert_eq!(report.reason, DoneReason::PageFetchExhausted);
    assert_eq!(report.saved_count(), 0);
    assert_eq!(report.totals.pages_fetched, 0);
}

#[tokio::test]
async fn test_failure_on_later_page_keeps_earlier_saves() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card(1)])).await;
    mount_details(&server).await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();

    assert_eq!(report.reason, DoneReason::PageFetchExhausted);
    assert_eq!(report.saved_count(), 1);
    assert_eq!(store.count_jobs().unwrap(), 1);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let mut config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));
    config.crawler.max_retries = 3;

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();
    assert_eq!(report.reason, DoneReason::PageFetchExhausted);
}

#[tokio::test]
async fn test_page_limit() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card(1)])).await;
    mount_details(&server).await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page(&[card(2)])))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let mut config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));
    config.crawler.max_pages = 1;

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();
    assert_eq!(report.reason, DoneReason::PageLimitReached);
    assert_eq!(report.saved_count(), 1);
}

#[tokio::test]
async fn test_detail_timeout_saves_without_description() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card(1)])).await;
    mount_page(&server, 2, page(&[])).await;
    Mock::given(method("GET"))
        .and(path("/view/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="job_summary">Too late</div>"#)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();

    assert_eq!(report.saved_count(), 1);
    assert_eq!(report.saved[0].description, "");

    let (jobs, _) = store.list_jobs(&JobQuery::default()).unwrap();
    assert_eq!(jobs[0].listing.description, "");
}

#[tokio::test]
async fn test_duplicate_url_on_same_page() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card(1), card(1), card(2)])).await;
    mount_page(&server, 2, page(&[])).await;

    // the repeated card is skipped before its detail page is fetched
    for id in [1, 2] {
        Mock::given(method("GET"))
            .and(path(format!("/view/{}", id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<div class="job_summary">Once</div>"#),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();

    assert_eq!(report.saved_count(), 2);
    assert_eq!(report.totals.duplicates_skipped, 1);
    assert_eq!(store.count_jobs().unwrap(), 2);
}

#[tokio::test]
async fn test_missing_tag_container_stored_as_null() {
    let server = MockServer::start().await;
    let bare = r#"<div class="item_recruit">
        <h2 class="job_tit"><a href="/view/9" title="No tags">No tags</a></h2>
    </div>"#
        .to_string();
    mount_page(&server, 1, page(&[bare])).await;
    mount_page(&server, 2, page(&[])).await;
    mount_details(&server).await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));

    run_crawl(&config, "test-hash", &mut store).await.unwrap();

    let (jobs, _) = store.list_jobs(&JobQuery::default()).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].listing.tech_stack, None);
}

#[tokio::test]
async fn test_cards_without_usable_link_are_saved() {
    let server = MockServer::start().await;
    let unlinked = r#"<div class="item_recruit">
        <strong class="corp_name"><a title="Mystery Co">Mystery Co</a></strong>
    </div>"#
        .to_string();
    let scripted = r#"<div class="item_recruit">
        <h2 class="job_tit"><a href="javascript:void(0)" title="Scripted Job">x</a></h2>
    </div>"#
        .to_string();
    mount_page(&server, 1, page(&[unlinked, scripted, card(1)])).await;

    // only the linked card has a detail page to fetch
    Mock::given(method("GET"))
        .and(path_regex(r"^/view/\d+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="job_summary"> Build things. </div>"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let mut config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));
    config.crawler.max_pages = 1;

    let report = run_crawl(&config, "test-hash", &mut store).await.unwrap();

    assert_eq!(report.saved_count(), 3);
    assert_eq!(report.totals.cards_skipped, 0);
    assert_eq!(store.count_jobs().unwrap(), 3);

    let (jobs, _) = store.list_jobs(&JobQuery::default()).unwrap();
    let unkeyed: Vec<_> = jobs.iter().filter(|job| job.listing.url.is_none()).collect();
    assert_eq!(unkeyed.len(), 2);
    assert!(unkeyed.iter().all(|job| job.listing.description.is_empty()));
    assert!(unkeyed
        .iter()
        .any(|job| job.listing.company_name.as_deref() == Some("Mystery Co")));
    assert!(unkeyed
        .iter()
        .any(|job| job.listing.title.as_deref() == Some("Scripted Job")));
}

#[tokio::test]
async fn test_run_ledger_and_json_dump() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page(&[card(1), card(2)])).await;
    mount_page(&server, 2, page(&[])).await;
    mount_details(&server).await;

    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let mut config = create_test_config(&server.uri(), &dir.path().join("jobs.db"));
    config.crawler.max_pages = 2;
    let dump_path = dir.path().join("dump").join("jobs.json");
    config.output.json_path = Some(dump_path.display().to_string());

    run_crawl(&config, "ledger-hash", &mut store).await.unwrap();

    let run = store.get_latest_run().unwrap().expect("run recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "ledger-hash");
    assert_eq!(run.stop_reason, Some(DoneReason::PageLimitReached));
    assert_eq!(run.totals.jobs_saved, 2);
    assert_eq!(run.totals.pages_fetched, 2);
    assert!(run.finished_at.is_some());

    let dumped: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&dump_path).unwrap()).unwrap();
    assert_eq!(dumped.as_array().unwrap().len(), 2);
    assert_eq!(dumped[0]["title"], "Job 1");
}

#[tokio::test]
async fn test_invalid_base_url_fails_run() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);
    let config = create_test_config("ftp://jobs.example.com", &dir.path().join("jobs.db"));

    let result = run_crawl(&config, "test-hash", &mut store).await;
    assert!(result.is_err());

    let run = store.get_latest_run().unwrap().expect("run recorded");
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_message.is_some());
}
