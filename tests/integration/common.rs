use async_trait::async_trait;
use sitemap_survey::config::{
    Config, CrawlerConfig, ExtractionConfig, HttpCacheConfig, OutputConfig, UserAgentConfig,
    WaybackConfig,
};
use sitemap_survey::record::{LookupError, ReverseDns};
use sitemap_survey::{DomainList, DomainRange, RequestedDomain};
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::MockServer;

/// Domain-list header rows preceding the data lines
const HEADER: &str = "# survey domains\n# source: test\n# ---\n";

/// Creates a test configuration writing everything under `dir`
pub fn create_test_config(dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            domain_list: dir.join("domains.txt").display().to_string(),
            scheme: "http".to_string(),
            candidate_paths: vec!["/robots.txt".to_string(), "/sitemap.xml".to_string()],
            resolve_entry_points: true,
            sitemap_follow: Vec::new(),
            obey_robots: true,
            max_concurrent_requests: 8,
            max_concurrent_requests_per_ip: 8,
            request_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            records_path: dir.join("records.jsonl").display().to_string(),
            table_path: dir.join("table.csv").display().to_string(),
            resolution_cache_dir: dir.join("resolution").display().to_string(),
        },
        extraction: ExtractionConfig::default(),
        http_cache: HttpCacheConfig::default(),
        wayback: WaybackConfig::default(),
        field_groups: Vec::new(),
    }
}

/// Domain used for a mock server: its `host:port`
pub fn domain_of(server: &MockServer) -> String {
    server.address().to_string()
}

/// Writes the domain list for `config` and returns the requested slice
pub fn write_domains(config: &Config, domains: &[&str]) -> (DomainRange, Vec<RequestedDomain>) {
    let content = format!("{}{}\n", HEADER, domains.join("\n"));
    std::fs::write(&config.crawler.domain_list, content).expect("Failed to write domain list");

    let list = DomainList::load(Path::new(&config.crawler.domain_list))
        .expect("Failed to load domain list");
    let range = list
        .range("4", &(4 + domains.len()).to_string())
        .expect("Invalid range");
    let requested = list.slice(range);
    (range, requested)
}

/// Reverse DNS stand-in; the first `failures` lookups fail
pub struct FakeDns {
    pub answer: Option<&'static str>,
    pub failures: usize,
    pub calls: AtomicUsize,
}

impl FakeDns {
    pub fn answering(answer: &'static str) -> Self {
        Self {
            answer: Some(answer),
            failures: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(failures: usize, answer: &'static str) -> Self {
        Self {
            answer: Some(answer),
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReverseDns for FakeDns {
    async fn lookup(&self, ip: IpAddr) -> Result<Option<String>, LookupError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(LookupError::Resolve {
                ip,
                message: "SERVFAIL".to_string(),
            });
        }
        Ok(self.answer.map(str::to_string))
    }
}
