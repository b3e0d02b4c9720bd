use crate::common::{create_test_config, domain_of, write_domains, FakeDns};
use sitemap_survey::config::FieldGroupEntry;
use sitemap_survey::crawler::{crawl, run_survey, SurveyOptions};
use sitemap_survey::output::SchemaError;
use sitemap_survey::record::CACHED_COPY;
use sitemap_survey::{PageKind, SurveyError};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOMEPAGE: &str = r#"<html><head>
    <title>Mock Widgets</title>
    <meta name="description" content="Widgets and more">
    </head><body>
    <a href="tel:09 555 0100">Call</a>
    <a href="https://facebook.com/mockwidgets">Facebook</a>
    <footer><p>© 2022 Mock Widgets Ltd</p></footer>
    </body></html>"#;

const ABOUT_US: &str = r#"<html><body>
    <a href="tel:0800 555 000">Freephone</a>
    <a href="https://instagram.com/mockwidgets">Instagram</a>
    </body></html>"#;

fn urlset(locs: &[String]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("  <url><loc>{}</loc></url>\n", loc))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>",
        entries
    )
}

async fn mount_get(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// A site with robots.txt listing a sitemap that lists an about-us page
async fn mount_full_site(server: &MockServer, robots_rules: &str) {
    let base = server.uri();

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    mount_get(
        server,
        "/robots.txt",
        format!("{}\nSitemap: {}/sitemap.xml\n", robots_rules, base),
    )
    .await;
    mount_get(
        server,
        "/sitemap.xml",
        urlset(&[
            format!("{}/", base),
            format!("{}/about-us", base),
            format!("{}/products/widget", base),
        ]),
    )
    .await;
    mount_get(server, "/", HOMEPAGE.to_string()).await;
    mount_get(server, "/about-us", ABOUT_US.to_string()).await;
}

fn read_table(path: &str) -> Vec<csv::StringRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .expect("Failed to open table");
    reader.records().map(|r| r.expect("Bad CSV row")).collect()
}

fn column(table: &[csv::StringRecord], field: &str) -> usize {
    table[1]
        .iter()
        .position(|name| name == field)
        .unwrap_or_else(|| panic!("no column {}", field))
}

#[tokio::test]
async fn test_end_to_end_two_domains() {
    let full = MockServer::start().await;
    mount_full_site(&full, "User-agent: *\nAllow: /").await;
    let empty = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let full_domain = domain_of(&full);
    let empty_domain = domain_of(&empty);
    let (range, requested) = write_domains(&config, &[&full_domain, &empty_domain]);

    let dns = Arc::new(FakeDns::answering("mock.example.net"));
    let stats = run_survey(&config, range, &requested, SurveyOptions::default(), dns.clone())
        .await
        .expect("Survey failed");

    assert_eq!(stats.domains_requested, 2);
    assert_eq!(stats.records_by_kind.get(&PageKind::Homepage), Some(&1));
    assert_eq!(stats.records_by_kind.get(&PageKind::AboutUs), Some(&1));
    assert_eq!(stats.rows_written, 2);
    assert_eq!(stats.empty_rows, 1);
    assert_eq!(dns.calls(), 2, "one lookup per record");

    // Records file: one line per record
    let records = std::fs::read_to_string(&config.output.records_path).unwrap();
    assert_eq!(records.lines().count(), 2);

    // Resolution cache written for the range
    let cache_file = dir
        .path()
        .join("resolution")
        .join(format!("entry_points_{}_{}.json", range.start, range.end));
    assert!(cache_file.exists());

    let table = read_table(&config.output.table_path);
    assert_eq!(table.len(), 4, "two header rows plus one row per domain");
    assert_eq!(&table[1][0], "line");
    assert_eq!(&table[1][1], "website");

    let first = &table[2];
    assert_eq!(&first[0], "4");
    assert_eq!(&first[1], full_domain.as_str());

    let page_types: Vec<String> =
        serde_json::from_str(&first[column(&table, "page_type")]).unwrap();
    assert_eq!(page_types, vec!["homepage", "about-us"]);

    let phones: Vec<String> =
        serde_json::from_str(&first[column(&table, "phone_numbers")]).unwrap();
    assert_eq!(phones, vec!["09 555 0100", "0800 555 000"]);

    let referers: Vec<String> = serde_json::from_str(&first[column(&table, "referer")]).unwrap();
    assert_eq!(referers, vec![format!("{}/sitemap.xml", full.uri())]);

    let titles: Vec<String> = serde_json::from_str(&first[column(&table, "title")]).unwrap();
    assert_eq!(titles, vec!["Mock Widgets"]);

    let reverse: Vec<String> =
        serde_json::from_str(&first[column(&table, "reverse_dns_lookup")]).unwrap();
    assert_eq!(reverse, vec!["mock.example.net"]);

    let second = &table[3];
    assert_eq!(&second[0], "5");
    assert_eq!(&second[1], empty_domain.as_str());
    assert!(second.iter().skip(2).all(str::is_empty));
}

#[tokio::test]
async fn test_cascade_to_second_candidate() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "/sitemap.xml", urlset(&[format!("{}/contact-us", base)])).await;
    mount_get(&server, "/contact-us", "<p>Contact</p>".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.resolve_entry_points = false;
    let domain = domain_of(&server);
    let (range, requested) = write_domains(&config, &[&domain]);

    let dns = Arc::new(FakeDns::answering("mock.example.net"));
    let report = crawl(&config, range, &requested, SurveyOptions::default(), dns)
        .await
        .expect("Crawl failed");

    assert_eq!(report.stats.entry_points_resolved, 1);
    let contact = report
        .records
        .iter()
        .find(|r| r.kind() == PageKind::AboutUs)
        .expect("No contact record");
    assert_eq!(contact.url, format!("{}/contact-us", base));
    assert_eq!(contact.referer, Some(format!("{}/sitemap.xml", base)));
    assert_eq!(contact.level, 2);

    // Homepage 404s, so it yields no record
    assert!(report.records.iter().all(|r| r.kind() != PageKind::Homepage));
    assert!(!dir.path().join("resolution").exists());
}

#[tokio::test]
async fn test_exhausted_candidates() {
    let server = MockServer::start().await;
    mount_get(&server, "/", HOMEPAGE.to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.resolve_entry_points = false;
    let (range, requested) = write_domains(&config, &[&domain_of(&server)]);

    let report = crawl(
        &config,
        range,
        &requested,
        SurveyOptions::default(),
        Arc::new(FakeDns::answering("mock.example.net")),
    )
    .await
    .expect("Crawl failed");

    assert_eq!(report.stats.entry_points_missing, 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].kind(), PageKind::Homepage);
}

#[tokio::test]
async fn test_unreachable_domain_still_gets_row() {
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let (range, requested) = write_domains(&config, &["127.0.0.1:1"]);

    let stats = run_survey(
        &config,
        range,
        &requested,
        SurveyOptions::default(),
        Arc::new(FakeDns::answering("unused")),
    )
    .await
    .expect("Survey failed");

    assert_eq!(stats.total_records(), 0);
    assert_eq!(stats.entry_points_missing, 1);

    let table = read_table(&config.output.table_path);
    assert_eq!(table.len(), 3);
    assert_eq!(&table[2][1], "127.0.0.1:1");
}

#[tokio::test]
async fn test_robots_disallow_skips_page() {
    let server = MockServer::start().await;
    mount_full_site(&server, "User-agent: TestBot\nDisallow: /about-us").await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let (range, requested) = write_domains(&config, &[&domain_of(&server)]);

    let report = crawl(
        &config,
        range,
        &requested,
        SurveyOptions::default(),
        Arc::new(FakeDns::answering("mock.example.net")),
    )
    .await
    .expect("Crawl failed");

    assert!(report.records.iter().all(|r| r.kind() != PageKind::AboutUs));
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_cache_mode_uses_sentinel() {
    let server = MockServer::start().await;
    mount_full_site(&server, "User-agent: *\nAllow: /").await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.http_cache.enabled = true;
    config.http_cache.directory = dir.path().join("httpcache").display().to_string();
    let (range, requested) = write_domains(&config, &[&domain_of(&server)]);

    let dns = Arc::new(FakeDns::answering("mock.example.net"));
    let report = crawl(&config, range, &requested, SurveyOptions::default(), dns.clone())
        .await
        .expect("Crawl failed");

    let kinds: Vec<PageKind> = report.records.iter().map(|r| r.kind()).collect();
    assert!(kinds.contains(&PageKind::Homepage));
    assert!(kinds.contains(&PageKind::AboutUs));

    for record in &report.records {
        assert_eq!(record.hosting.ip_address, CACHED_COPY, "{}", record.url);
        assert_eq!(record.hosting.protocol, CACHED_COPY, "{}", record.url);
        assert_eq!(record.hosting.ssl_certificate, CACHED_COPY, "{}", record.url);
        assert_eq!(record.hosting.reverse_dns_lookup, CACHED_COPY, "{}", record.url);
    }
    assert_eq!(dns.calls(), 0);
}

#[tokio::test]
async fn test_response_cache_serves_second_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOMEPAGE))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.resolve_entry_points = false;
    config.http_cache.enabled = true;
    config.http_cache.directory = dir.path().join("httpcache").display().to_string();
    let (range, requested) = write_domains(&config, &[&domain_of(&server)]);

    for _ in 0..2 {
        let report = crawl(
            &config,
            range,
            &requested,
            SurveyOptions::default(),
            Arc::new(FakeDns::answering("unused")),
        )
        .await
        .expect("Crawl failed");
        assert_eq!(report.records.len(), 1);
    }
}

#[tokio::test]
async fn test_resolution_cache_reused_until_fresh() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let (range, requested) = write_domains(&config, &[&domain_of(&server)]);

    for fresh in [false, false, true] {
        crawl(
            &config,
            range,
            &requested,
            SurveyOptions { fresh },
            Arc::new(FakeDns::answering("unused")),
        )
        .await
        .expect("Crawl failed");
    }
}

#[tokio::test]
async fn test_failed_reverse_lookup_drops_only_that_record() {
    let server = MockServer::start().await;
    mount_full_site(&server, "User-agent: *\nAllow: /").await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path());
    let (range, requested) = write_domains(&config, &[&domain_of(&server)]);

    let report = crawl(
        &config,
        range,
        &requested,
        SurveyOptions::default(),
        Arc::new(FakeDns::failing_first(1, "mock.example.net")),
    )
    .await
    .expect("Crawl failed");

    assert_eq!(report.stats.dropped_records, 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].hosting.reverse_dns_lookup, "mock.example.net");
}

#[tokio::test]
async fn test_schema_mismatch_fails_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.field_groups = vec![FieldGroupEntry {
        name: "General".to_string(),
        fields: vec!["title".to_string()],
    }];
    let (range, requested) = write_domains(&config, &["127.0.0.1:1"]);

    let result = run_survey(
        &config,
        range,
        &requested,
        SurveyOptions::default(),
        Arc::new(FakeDns::answering("unused")),
    )
    .await;

    assert!(matches!(
        result,
        Err(SurveyError::Schema(SchemaError::MissingFields(_)))
    ));
    assert!(!std::path::Path::new(&config.output.table_path).exists());
    assert!(!std::path::Path::new(&config.output.records_path).exists());
    assert!(!dir.path().join("resolution").exists());
}

#[tokio::test]
async fn test_redirected_homepage_joins_requested_row() {
    let target = MockServer::start().await;
    mount_get(&target, "/", HOMEPAGE.to_string()).await;

    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/", target.uri()).as_str()),
        )
        .mount(&origin)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.resolve_entry_points = false;
    let origin_domain = domain_of(&origin);
    let (range, requested) = write_domains(&config, &[&origin_domain]);

    let stats = run_survey(
        &config,
        range,
        &requested,
        SurveyOptions::default(),
        Arc::new(FakeDns::answering("mock.example.net")),
    )
    .await
    .expect("Survey failed");

    assert_eq!(stats.records_by_kind.get(&PageKind::Homepage), Some(&1));
    assert_eq!(stats.rows_written, 1);
    assert_eq!(stats.empty_rows, 0);

    let records = std::fs::read_to_string(&config.output.records_path).unwrap();
    let record: serde_json::Value = serde_json::from_str(records.lines().next().unwrap()).unwrap();
    assert_eq!(record["website"], origin_domain.as_str());
    assert_eq!(record["url"], format!("{}/", target.uri()).as_str());

    let table = read_table(&config.output.table_path);
    assert_eq!(&table[2][1], origin_domain.as_str());
    let titles: Vec<String> = serde_json::from_str(&table[2][column(&table, "title")]).unwrap();
    assert_eq!(titles, vec!["Mock Widgets"]);
}

#[tokio::test]
async fn test_refused_entry_leg_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.resolve_entry_points = false;
    let (range, requested) = write_domains(&config, &["127.0.0.1:1"]);

    let stats = run_survey(
        &config,
        range,
        &requested,
        SurveyOptions::default(),
        Arc::new(FakeDns::answering("unused")),
    )
    .await
    .expect("Survey failed");

    assert_eq!(stats.entry_points_aborted, 1);
    assert_eq!(stats.entry_points_missing, 0);
    assert_eq!(stats.entry_points_resolved, 0);
    assert_eq!(stats.total_records(), 0);
    assert_eq!(stats.rows_written, 1);
    assert_eq!(stats.empty_rows, 1);
}

/// robots.txt lists a sitemap index whose only child lists an about-us page
async fn mount_indexed_site(server: &MockServer, child_fetches: u64) {
    let base = server.uri();

    mount_get(
        server,
        "/robots.txt",
        format!("User-agent: *\nAllow: /\nSitemap: {}/sitemap_index.xml\n", base),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n  <sitemap><loc>{}/pages.xml</loc></sitemap>\n</sitemapindex>",
            base
        )))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pages.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(urlset(&[format!("{}/about-us", base)])),
        )
        .expect(child_fetches)
        .mount(server)
        .await;
    mount_get(server, "/about-us", ABOUT_US.to_string()).await;
}

#[tokio::test]
async fn test_sitemap_index_children_followed() {
    let server = MockServer::start().await;
    mount_indexed_site(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.resolve_entry_points = false;
    config.crawler.sitemap_follow = vec![r"/pages\.xml$".to_string()];
    let (range, requested) = write_domains(&config, &[&domain_of(&server)]);

    let report = crawl(
        &config,
        range,
        &requested,
        SurveyOptions::default(),
        Arc::new(FakeDns::answering("mock.example.net")),
    )
    .await
    .expect("Crawl failed");

    let about = report
        .records
        .iter()
        .find(|r| r.kind() == PageKind::AboutUs)
        .expect("No about-us record");
    assert_eq!(about.referer, Some(format!("{}/pages.xml", server.uri())));
}

#[tokio::test]
async fn test_sitemap_follow_filters_index_children() {
    let server = MockServer::start().await;
    mount_indexed_site(&server, 0).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.resolve_entry_points = false;
    config.crawler.sitemap_follow = vec![r"/archive/".to_string()];
    let (range, requested) = write_domains(&config, &[&domain_of(&server)]);

    let report = crawl(
        &config,
        range,
        &requested,
        SurveyOptions::default(),
        Arc::new(FakeDns::answering("mock.example.net")),
    )
    .await
    .expect("Crawl failed");

    assert_eq!(report.stats.entry_points_resolved, 1);
    assert!(report.records.iter().all(|r| r.kind() != PageKind::AboutUs));
}
