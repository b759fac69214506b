//! Integration tests for the bulk loader
//!
//! These tests use wiremock to create mock HTTP servers and run whole loads
//! end-to-end through the reqwest transport.

use bulk_html_loader::config::load_config;
use bulk_html_loader::loader::UserData;
use bulk_html_loader::output::LoadSummary;
use bulk_html_loader::{BulkHtmlLoader, ItemStatus, LoaderError, LoaderItem, QueueEntry};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(title: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            r#"<html><head><title>{}</title><script>track()</script></head>
            <body><h1>{}</h1><p class="lead">Lead paragraph</p></body></html>"#,
            title, title
        ))
        .insert_header("content-type", "text/html")
}

/// Mounts a 200 page at each of `paths` and returns their URLs
async fn mount_pages(server: &MockServer, paths: &[&str]) -> Vec<String> {
    for p in paths {
        Mock::given(method("GET"))
            .and(path(*p))
            .respond_with(page(p.trim_start_matches('/')))
            .mount(server)
            .await;
    }

    paths
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect()
}

#[tokio::test]
async fn test_all_pages_load() {
    let server = MockServer::start().await;
    let urls = mount_pages(&server, &["/one", "/two", "/three"]).await;

    let loader = BulkHtmlLoader::new().unwrap();
    let items = loader.load(urls.clone()).await.unwrap();

    assert_eq!(items.len(), 3);
    for (item, url) in items.iter().zip(&urls) {
        assert_eq!(item.url(), url.as_str());
        assert_eq!(item.status(), ItemStatus::Complete);
        assert!(item.error().is_none());

        let document = item.result().expect("complete item has a document");
        assert!(document.title().is_some());
        assert!(document.query("script").unwrap().is_empty());
        assert_eq!(
            document.select_text("p.lead").unwrap(),
            vec!["Lead paragraph".to_string()]
        );
    }

    assert_eq!(loader.progress_string(), "3/3");
    assert_eq!(loader.stats().errors(), 0);
}

#[tokio::test]
async fn test_not_found_page_is_retried_then_errors() {
    let server = MockServer::start().await;
    let mut urls = mount_pages(&server, &["/one", "/three"]).await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(4)
        .mount(&server)
        .await;
    urls.insert(1, format!("{}/missing", server.uri()));

    let warnings = Rc::new(Cell::new(0));
    let errors = Rc::new(Cell::new(0));
    let warning_count = Rc::clone(&warnings);
    let error_count = Rc::clone(&errors);

    let loader = BulkHtmlLoader::new()
        .unwrap()
        .on_warning(move |item| {
            warning_count.set(warning_count.get() + 1);
            async move { item }
        })
        .on_error(move |item| {
            error_count.set(error_count.get() + 1);
            async move { item }
        });

    let items = loader.load(urls).await.unwrap();

    assert_eq!(items[0].status(), ItemStatus::Complete);
    assert_eq!(items[2].status(), ItemStatus::Complete);

    let failed = &items[1];
    assert_eq!(failed.status(), ItemStatus::Error);
    assert_eq!(failed.attempts_made(), 4);
    assert_eq!(failed.error().and_then(|e| e.code()), Some(404));
    assert_eq!(failed.error().map(|e| e.description()), Some("Not Found"));
    assert!(failed.result().is_none());

    assert_eq!(warnings.get(), 3);
    assert_eq!(errors.get(), 1);

    let summary = LoadSummary::from_items(&items);
    assert_eq!(summary.count(ItemStatus::Complete), 2);
    assert_eq!(summary.count(ItemStatus::Error), 1);
    assert_eq!(summary.total_attempts, 6);
    assert_eq!(summary.failure_summary.get("404 Not Found"), Some(&1));
}

#[tokio::test]
async fn test_single_connection_never_overlaps() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(page("slow").set_delay(Duration::from_millis(20)))
        .mount(&server)
        .await;

    let urls: Vec<String> = (0..5)
        .map(|i| format!("{}/page/{}", server.uri(), i))
        .collect();

    let max_seen = Rc::new(Cell::new(0));
    let observed = Rc::clone(&max_seen);

    let loader = BulkHtmlLoader::new()
        .unwrap()
        .max_concurrent_connections(1)
        .on_change(move |_item, loader| {
            let open = loader.stats().open_connections();
            observed.set(observed.get().max(open));
        });

    let items = loader.load(urls).await.unwrap();

    assert!(items.iter().all(|i| i.status() == ItemStatus::Complete));
    assert_eq!(loader.stats().peak_open_connections(), 1);
    assert_eq!(max_seen.get(), 1);
    assert_eq!(loader.stats().open_connections(), 0);
}

#[tokio::test]
async fn test_load_twice_fails() {
    let server = MockServer::start().await;
    let urls = mount_pages(&server, &["/one"]).await;

    let loader = BulkHtmlLoader::new().unwrap();
    loader.load(urls.clone()).await.unwrap();

    let second = loader.load(urls).await;
    assert!(matches!(second, Err(LoaderError::AlreadyLoaded)));
}

#[tokio::test]
async fn test_slow_page_times_out_with_growing_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(page("slow").set_delay(Duration::from_millis(1000)))
        .mount(&server)
        .await;

    let loader = BulkHtmlLoader::new()
        .unwrap()
        .http_timeout(Duration::from_millis(50))
        .timeout_increment(Duration::from_millis(10))
        .max_retries(1);

    let items = loader
        .load([format!("{}/slow", server.uri())])
        .await
        .unwrap();
    let item = &items[0];

    assert_eq!(item.status(), ItemStatus::Error);
    assert_eq!(item.attempts_made(), 2);
    assert_eq!(item.error().and_then(|e| e.code()), Some(408));
    assert_eq!(item.error().map(|e| e.description()), Some("Request Timeout"));
    assert_eq!(item.timeout_budget(), Duration::from_millis(70));
}

#[tokio::test]
async fn test_requests_carry_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/default"))
        .and(header_exists("user-agent"))
        .respond_with(page("default"))
        .mount(&server)
        .await;

    let loader = BulkHtmlLoader::new().unwrap();
    let items = loader
        .load([format!("{}/default", server.uri())])
        .await
        .unwrap();
    assert_eq!(items[0].status(), ItemStatus::Complete);

    Mock::given(method("GET"))
        .and(path("/custom"))
        .and(header("user-agent", "TestAgent/1.0"))
        .respond_with(page("custom"))
        .mount(&server)
        .await;

    let loader = BulkHtmlLoader::new()
        .unwrap()
        .user_agents(vec!["TestAgent/1.0".to_string()])
        .max_retries(0);
    let items = loader
        .load([format!("{}/custom", server.uri())])
        .await
        .unwrap();
    assert_eq!(items[0].status(), ItemStatus::Complete);
}

#[tokio::test]
async fn test_mixed_queue_keeps_user_data_and_order() {
    let server = MockServer::start().await;
    let urls = mount_pages(&server, &["/plain", "/tagged"]).await;

    let mut data = UserData::new();
    data.insert("country".to_string(), json!("Australia"));
    let tagged = LoaderItem::with_data(urls[1].clone(), data).unwrap();

    let queue = vec![QueueEntry::from(urls[0].clone()), QueueEntry::from(tagged)];

    let loader = BulkHtmlLoader::new().unwrap();
    let items = loader.load(queue).await.unwrap();

    assert_eq!(items[0].url(), urls[0]);
    assert!(items[0].user_data().is_empty());
    assert_eq!(items[1].url(), urls[1]);
    assert_eq!(items[1].user_data()["country"], json!("Australia"));
}

#[tokio::test]
async fn test_completion_hook_can_defer() {
    let server = MockServer::start().await;
    let urls = mount_pages(&server, &["/a", "/b", "/c", "/d"]).await;

    let saved = Rc::new(RefCell::new(Vec::new()));
    let store = Rc::clone(&saved);

    let loader = BulkHtmlLoader::new()
        .unwrap()
        .max_concurrent_connections(2)
        .on_item_load_complete(move |mut item| {
            let store = Rc::clone(&store);
            async move {
                // Simulated persistence
                tokio::time::sleep(Duration::from_millis(10)).await;
                store.borrow_mut().push(item.url().to_string());
                item.user_data_mut()
                    .insert("saved".to_string(), json!(true));
                item
            }
        });

    let items = loader.load(urls.clone()).await.unwrap();

    let mut saved = saved.borrow().clone();
    saved.sort();
    let mut expected = urls;
    expected.sort();
    assert_eq!(saved, expected);

    assert!(items.iter().all(|i| i.user_data()["saved"] == json!(true)));
    assert_eq!(loader.stats().peak_open_connections(), 2);
}

#[tokio::test]
async fn test_errors_reduce_connections_when_enabled() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let urls: Vec<String> = (0..3)
        .map(|i| format!("{}/down/{}", server.uri(), i))
        .collect();

    let loader = BulkHtmlLoader::new()
        .unwrap()
        .max_concurrent_connections(3)
        .max_retries(0)
        .reduce_connections_on_error(true);

    let items = loader.load(urls).await.unwrap();

    assert!(items.iter().all(|i| i.status() == ItemStatus::Error));
    assert_eq!(loader.max_connections(), 1);
    assert!(loader.to_string().ends_with("max conn: 1"));
}

#[tokio::test]
async fn test_unreachable_host_is_contained() {
    let loader = BulkHtmlLoader::new()
        .unwrap()
        .max_retries(1)
        .http_timeout(Duration::from_secs(2));

    // Nothing listens on the discard port of loopback
    let items = loader.load(["http://127.0.0.1:9/"]).await.unwrap();
    let item = &items[0];

    assert_eq!(item.status(), ItemStatus::Error);
    assert_eq!(item.attempts_made(), 2);
    assert!(item.error().is_some());
    assert_eq!(loader.stats().warnings(), 1);
    assert_eq!(loader.stats().errors(), 1);
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let server = MockServer::start().await;
    let target = mount_pages(&server, &["/final"]).await;

    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", target[0].as_str()))
        .mount(&server)
        .await;

    let loader = BulkHtmlLoader::new().unwrap();
    let items = loader
        .load([format!("{}/moved", server.uri())])
        .await
        .unwrap();

    assert_eq!(items[0].status(), ItemStatus::Complete);
    assert_eq!(
        items[0].result().and_then(|doc| doc.title()),
        Some("final".to_string())
    );
}

#[tokio::test]
async fn test_loader_from_config_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", "ConfiguredAgent/2.0"))
        .respond_with(page("configured"))
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[loader]
max-concurrent-connections = 2
http-timeout-ms = 3000
max-retries = 0
verbose = true

[user-agent]
agents = ["ConfiguredAgent/2.0"]
"#
    )
    .unwrap();
    file.flush().unwrap();

    let config = load_config(file.path()).unwrap();
    let loader = BulkHtmlLoader::from_config(config).unwrap();

    assert_eq!(loader.config().max_concurrent_connections, 2);
    assert_eq!(loader.config().max_attempts(), 1);

    let urls: Vec<String> = (0..3)
        .map(|i| format!("{}/cfg/{}", server.uri(), i))
        .collect();
    let items = loader.load(urls).await.unwrap();

    assert!(items.iter().all(|i| i.status() == ItemStatus::Complete));
    assert_eq!(loader.stats().peak_open_connections(), 2);
}
