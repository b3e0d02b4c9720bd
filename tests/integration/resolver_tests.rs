use crate::common::{create_test_config, domain_of, write_domains};
use sitemap_survey::crawler::{EntryPointResolver, Fetcher, Scheduler};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_resolver(dir: &std::path::Path) -> EntryPointResolver {
    let config = create_test_config(dir);
    let fetcher = Arc::new(Fetcher::new(&config).expect("Failed to build fetcher"));
    EntryPointResolver::new(
        fetcher,
        Scheduler::new(&config.crawler),
        &config.crawler.scheme,
        &config.crawler.candidate_paths,
    )
}

#[tokio::test]
async fn test_first_existing_candidate_wins() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = create_resolver(dir.path());
    let domain = domain_of(&server);

    let entry = resolver.resolve(&domain).await;
    assert_eq!(
        entry.map(|u| u.to_string()),
        Some(format!("{}/robots.txt", server.uri()))
    );
}

#[tokio::test]
async fn test_fallback_to_second_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = create_resolver(dir.path());

    let entry = resolver.resolve(&domain_of(&server)).await;
    assert_eq!(
        entry.map(|u| u.to_string()),
        Some(format!("{}/sitemap.xml", server.uri()))
    );
}

#[tokio::test]
async fn test_redirect_below_400_counts_as_existing() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = create_resolver(dir.path());

    let entry = resolver.resolve(&domain_of(&server)).await;
    assert!(entry.unwrap().as_str().ends_with("/sitemap.xml"));
}

#[tokio::test]
async fn test_nothing_found() {
    // Unmatched requests get wiremock's default 404
    let server = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let resolver = create_resolver(dir.path());

    assert_eq!(resolver.resolve(&domain_of(&server)).await, None);
}

#[tokio::test]
async fn test_unreachable_domain() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = create_resolver(dir.path());

    // Nothing listens on port 1
    assert_eq!(resolver.resolve("127.0.0.1:1").await, None);
}

#[tokio::test]
async fn test_resolve_all_keys_by_homepage() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let domain = domain_of(&server);
    let (_, requested) = write_domains(&config, &[&domain, "127.0.0.1:1"]);

    let resolver = create_resolver(dir.path());
    let entries = resolver.resolve_all(&requested).await;

    assert_eq!(entries.len(), 2);
    assert_eq!(
        entries[&format!("http://{}", domain)].as_ref().map(|u| u.to_string()),
        Some(format!("{}/robots.txt", server.uri()))
    );
    assert_eq!(entries["http://127.0.0.1:1"], None);
}

#[tokio::test]
async fn test_resolve_all_keeps_unbuildable_domains() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = create_resolver(dir.path());
    let requested = vec![sitemap_survey::RequestedDomain {
        line: 4,
        domain: "bad domain".to_string(),
    }];

    let entries = resolver.resolve_all(&requested).await;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[&resolver.homepage_key("bad domain")], None);
}
