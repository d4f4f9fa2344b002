mod common;

use async_trait::async_trait;
use common::{chat_provider, registry, FakeTransport, Reply};
use seeker::llm::{Orchestrator, SummarizeError};
use seeker::pipeline::Summarizer;
use seeker::search::{Category, Query, ResultDetails, SearchError, SearchProvider, SearchResult};
use seeker::search_log::{SearchLog, SearchLogEntry};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const A_GEN: &str = "http://a.test/chat/completions";

/// Search provider that returns canned results and remembers queries
struct CannedSearch {
    results: Result<Vec<SearchResult>, String>,
    seen: Mutex<Vec<Query>>,
}

impl CannedSearch {
    fn ok(results: Vec<SearchResult>) -> Arc<Self> {
        Arc::new(Self {
            results: Ok(results),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            results: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SearchProvider for CannedSearch {
    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SearchError> {
        self.seen.lock().unwrap().push(query.clone());
        self.results.clone().map_err(SearchError::Api)
    }
}

fn web_result(title: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        link: format!("https://example.com/{}", title.to_lowercase()),
        details: ResultDetails::Web {
            snippet: format!("About {title}"),
        },
    }
}

fn summarizer(search: Arc<CannedSearch>, transport: &FakeTransport) -> Summarizer {
    let orchestrator = Orchestrator::new(
        registry(vec![chat_provider("a")]),
        Arc::new(transport.clone()),
    );
    Summarizer::new(search, orchestrator)
}

/// The log write is detached; poll until it lands.
async fn wait_for_entries(log: &SearchLog, count: usize) -> Vec<SearchLogEntry> {
    for _ in 0..100 {
        let entries = log.entries().unwrap();
        if entries.len() >= count {
            return entries;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    log.entries().unwrap()
}

#[tokio::test]
async fn summarizes_results_and_logs_serving_provider() {
    let dir = TempDir::new().unwrap();
    let log = SearchLog::new(dir.path(), 1024 * 1024);

    let transport = FakeTransport::new();
    transport.script(A_GEN, vec![Reply::chat("## Summary\nRust is fast.")]);

    let search = CannedSearch::ok(vec![web_result("Rust"), web_result("Tokio")]);
    let summarizer = summarizer(search.clone(), &transport).with_search_log(log.clone());

    let summary = summarizer
        .summarize(
            &Query::new("rust", Category::Web),
            "a",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.response.provider, "a");
    assert_eq!(summary.response.text, "## Summary\nRust is fast.");
    assert_eq!(summary.results.len(), 2);
    assert_eq!(search.seen.lock().unwrap().len(), 1);

    let calls = transport.calls();
    let user = calls[0].body.as_ref().unwrap()["messages"][1]["content"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(user.contains("Query: \"rust\" (web)"));
    assert!(user.contains("https://example.com/tokio"));

    let entries = wait_for_entries(&log, 1).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].query, "rust");
    assert_eq!(entries[0].source, "web");
    assert_eq!(entries[0].ai_provider, "a");
}

#[tokio::test]
async fn failed_summary_is_logged_as_unavailable() {
    let dir = TempDir::new().unwrap();
    let log = SearchLog::new(dir.path(), 1024 * 1024);

    let transport = FakeTransport::new();
    transport.script(A_GEN, vec![Reply::Status(401, "bad key".into())]);

    let summarizer = summarizer(CannedSearch::ok(vec![web_result("Rust")]), &transport)
        .with_search_log(log.clone());
    let err = summarizer
        .summarize(
            &Query::new("rust", Category::News),
            "a",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SummarizeError::Exhausted { .. }));

    let entries = wait_for_entries(&log, 1).await;
    assert_eq!(entries[0].source, "news");
    assert_eq!(entries[0].ai_provider, "unavailable");
}

#[tokio::test]
async fn empty_results_skip_the_llm() {
    let transport = FakeTransport::new();
    let summarizer = summarizer(CannedSearch::ok(Vec::new()), &transport);

    let err = summarizer
        .summarize(
            &Query::new("nothing", Category::Web),
            "a",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SummarizeError::NoResults));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn search_errors_propagate() {
    let transport = FakeTransport::new();
    let summarizer = summarizer(CannedSearch::failing("HTTP 500"), &transport);

    let err = summarizer
        .summarize(
            &Query::new("rust", Category::Web),
            "a",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SummarizeError::Search(SearchError::Api(_))));
    assert!(err.to_string().contains("HTTP 500"));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn cancelled_request_is_not_logged() {
    let dir = TempDir::new().unwrap();
    let log = SearchLog::new(dir.path(), 1024 * 1024);

    let transport = FakeTransport::new();
    let search = CannedSearch::ok(vec![web_result("Rust")]);
    let summarizer = summarizer(search.clone(), &transport).with_search_log(log.clone());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = summarizer
        .summarize(&Query::new("rust", Category::Web), "a", &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SummarizeError::Cancelled));
    assert!(search.seen.lock().unwrap().is_empty());
    assert!(transport.calls().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(log.entries().unwrap().is_empty());
}

#[tokio::test]
async fn unwritable_log_never_fails_the_summary() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "plain file").unwrap();
    let log = SearchLog::new(blocker.join("logs"), 1024 * 1024);

    let transport = FakeTransport::new();
    transport.script(A_GEN, vec![Reply::chat("still fine")]);

    let summarizer = summarizer(CannedSearch::ok(vec![web_result("Rust")]), &transport)
        .with_search_log(log.clone());
    let summary = summarizer
        .summarize(
            &Query::new("rust", Category::Web),
            "a",
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(summary.response.text, "still fine");

    let handle = log.record_query("rust", "web", "a").unwrap();
    handle.await.unwrap();

    assert!(log.append(&SearchLogEntry::new("rust", "web", "a")).is_err());
    assert!(log.entries().unwrap().is_empty());
}
