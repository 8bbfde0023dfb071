//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use corpus_crawler::config::{
    Config, CrawlerConfig, InputConfig, OutputConfig, PolitenessConfig, UserAgentConfig,
};
use corpus_crawler::crawler::crawl;
use corpus_crawler::{CrawlError, DocumentRecord};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "TestBot/1.0.0 (+https://example.com/contact; test@example.com)";

/// Creates a test configuration writing into `workspace`
fn create_test_config(workspace: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 4,
            request_timeout_secs: 5,
            minimum_crawl_delay_ms: 0,
            max_pages: None,
            idle_timeout_secs: Some(1),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        politeness: PolitenessConfig { cache_capacity: 16 },
        input: InputConfig {
            seed_file: workspace.join("seeds.txt").display().to_string(),
        },
        output: OutputConfig {
            corpus_dir: workspace.join("corpus").display().to_string(),
        },
    }
}

fn write_seeds(config: &Config, seeds: &[String]) {
    std::fs::write(&config.input.seed_file, seeds.join("\n")).unwrap();
}

fn corpus_files(config: &Config) -> Vec<PathBuf> {
    std::fs::read_dir(&config.output.corpus_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_robots_disallowed_link_is_never_fetched() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /about\n"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/about">About</a></body></html>"#.to_string(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<p>about</p>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let workspace = TempDir::new().unwrap();
    let config = create_test_config(workspace.path());
    write_seeds(&config, &[format!("{}/", base_url)]);

    let stats = crawl(&config, None).await.unwrap();

    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.written, 1);
    assert_eq!(stats.links_enqueued, 0);

    let files = corpus_files(&config);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].extension().unwrap(), "warc");

    let record = DocumentRecord::parse(&std::fs::read(&files[0]).unwrap()).unwrap();
    assert_eq!(record.url().as_str(), format!("{}/", base_url));
    assert_eq!(record.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(
        record.body(),
        br#"<html><body><a href="/about">About</a></body></html>"#
    );
    assert_eq!(
        files[0].file_stem().unwrap().to_str().unwrap(),
        record.id().to_string()
    );
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(&mock_server, "User-agent: *\nAllow: /\n").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><body>
            <a href="{}/page1">Page 1</a>
            <a href="page2#section">Page 2</a>
            <a href="https://other.invalid/">Elsewhere</a>
            </body></html>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    for page in ["/page1", "/page2"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html(r#"<a href="/">Home</a><a href="/page1">1</a>"#.to_string()))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let workspace = TempDir::new().unwrap();
    let config = create_test_config(workspace.path());
    write_seeds(&config, &[format!("{}/", base_url)]);

    let stats = crawl(&config, None).await.unwrap();

    assert_eq!(stats.written, 3);
    assert_eq!(corpus_files(&config).len(), 3);
    // The off-site link is enqueued, then abandoned when its robots.txt fails
    assert_eq!(stats.links_enqueued, 3);
    assert_eq!(stats.robots_failures, 1);
}

#[tokio::test]
async fn test_crawl_delay_spaces_requests() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(&mock_server, "User-agent: *\nCrawl-delay: 1\n").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/a">A</a><a href="/b">B</a>"#.to_string(),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("<p>a</p>".to_string()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<p>b</p>".to_string()))
        .mount(&mock_server)
        .await;

    let workspace = TempDir::new().unwrap();
    let config = create_test_config(workspace.path());
    write_seeds(&config, &[format!("{}/", base_url)]);

    let start = Instant::now();
    let stats = crawl(&config, None).await.unwrap();

    assert_eq!(stats.written, 3);
    // Three dispatches to one domain with a one second delay
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn test_unavailable_robots_blocks_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>home</p>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let workspace = TempDir::new().unwrap();
    let config = create_test_config(workspace.path());
    write_seeds(&config, &[format!("{}/", base_url)]);

    let stats = crawl(&config, None).await.unwrap();

    assert_eq!(stats.robots_failures, 1);
    assert_eq!(stats.written, 0);
    assert!(corpus_files(&config).is_empty());
}

#[tokio::test]
async fn test_content_type_handling() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(&mock_server, "User-agent: *\nAllow: /\n").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/image.png">Image</a><a href="/feed.xml">Feed</a>"#.to_string(),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/image.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, b'P', b'N', b'G'])
                .insert_header("content-type", "image/png"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<?xml version=\"1.0\"?><feed/>")
                .insert_header("content-type", "application/xml"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let workspace = TempDir::new().unwrap();
    let config = create_test_config(workspace.path());
    write_seeds(&config, &[format!("{}/", base_url)]);

    let stats = crawl(&config, None).await.unwrap();

    assert_eq!(stats.dispatched, 3);
    assert_eq!(stats.written, 2);
    assert_eq!(stats.rejected, 1);
}

#[tokio::test]
async fn test_corpus_dir_is_cleared_on_start() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(&mock_server, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>home</p>".to_string()))
        .mount(&mock_server)
        .await;

    let workspace = TempDir::new().unwrap();
    let config = create_test_config(workspace.path());
    std::fs::create_dir_all(&config.output.corpus_dir).unwrap();
    std::fs::write(Path::new(&config.output.corpus_dir).join("stale.warc"), b"old").unwrap();
    write_seeds(&config, &[format!("{}/", base_url)]);

    crawl(&config, None).await.unwrap();

    let files = corpus_files(&config);
    assert_eq!(files.len(), 1);
    assert_ne!(files[0].file_name().unwrap(), "stale.warc");
}

#[tokio::test]
async fn test_missing_seed_file_is_fatal() {
    let workspace = TempDir::new().unwrap();
    let config = create_test_config(workspace.path());

    let result = crawl(&config, None).await;
    assert!(matches!(result, Err(CrawlError::Seeds { .. })));
}

#[tokio::test]
async fn test_seed_override() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_robots(&mock_server, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/override"))
        .respond_with(html("<p>override</p>".to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let workspace = TempDir::new().unwrap();
    let config = create_test_config(workspace.path());
    let override_path = workspace.path().join("other-seeds.txt");
    std::fs::write(&override_path, format!("# override\n{}/override\n", base_url)).unwrap();

    let stats = crawl(&config, Some(&override_path)).await.unwrap();
    assert_eq!(stats.written, 1);
}
