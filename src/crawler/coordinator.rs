//! Crawl coordinator
//!
//! Dispatch runs as a set of independent tasks. Each task fetches one
//! resource and returns the records it built plus follow-up tasks; the
//! coordinator spawns the follow-ups and stops once the set drains.

use super::classifier::PageClassifier;
use super::fetcher::{FetchOutcome, FetchedPage, Fetcher};
use super::parser::parse_sitemap;
use super::scheduler::Scheduler;
use crate::output::CrawlStatistics;
use crate::record::{build_record, HandlerContext, NetworkFieldPolicy, PageKind, PageRecord, ReverseDns};
use crate::robots::{self, ParsedRobots};
use crate::state::{EntryEvent, EntryState};
use crate::url::website_identity;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// One unit of dispatch work
///
/// Every task carries the website identity of the requested domain it was
/// spawned for; records take their join key from it.
#[derive(Debug, Clone)]
pub enum CrawlTask {
    /// A domain's homepage; always issued once per domain
    Homepage { homepage: Url, website: String },

    /// A domain's entry-point leg at a given cascade state
    EntryPoint {
        domain: String,
        website: String,
        candidates: Arc<Vec<Url>>,
        state: EntryState,
    },

    /// A sitemap discovered through robots.txt or a sitemap index
    Sitemap {
        url: Url,
        website: String,
        robots: Option<Arc<ParsedRobots>>,
    },

    /// A sitemap-listed page matched by a classifier rule
    Page {
        url: Url,
        website: String,
        kind: PageKind,
        referer: String,
    },
}

impl CrawlTask {
    /// The homepage task of a requested domain
    pub fn homepage(domain: &str, homepage: Url) -> Self {
        Self::Homepage {
            homepage,
            website: website_identity(domain),
        }
    }

    /// Starts an entry-point leg at the candidate with the given index
    pub fn entry_point(
        domain: &str,
        candidates: Vec<Url>,
        first: usize,
    ) -> crate::Result<Self> {
        let state = EntryState::Start.next(EntryEvent::Issued(first), candidates.len())?;
        Ok(Self::EntryPoint {
            domain: domain.to_string(),
            website: website_identity(domain),
            candidates: Arc::new(candidates),
            state,
        })
    }

    /// URL this task fetches
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Homepage { homepage, .. } => Some(homepage),
            Self::EntryPoint {
                candidates, state, ..
            } => state.pending_candidate().and_then(|i| candidates.get(i)),
            Self::Sitemap { url, .. } | Self::Page { url, .. } => Some(url),
        }
    }
}

/// Everything a finished task hands back to the coordinator
#[derive(Debug, Default)]
pub struct TaskOutcome {
    pub records: Vec<PageRecord>,
    pub follow_ups: Vec<CrawlTask>,
    pub stats: CrawlStatistics,
}

/// Records and statistics of a drained crawl
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub records: Vec<PageRecord>,
    pub stats: CrawlStatistics,
}

/// Shared, read-only state every task needs
pub struct CrawlContext {
    pub fetcher: Arc<Fetcher>,
    pub scheduler: Scheduler,
    pub classifier: PageClassifier,
    pub policy: NetworkFieldPolicy,
    pub dns: Arc<dyn ReverseDns>,
    pub social_platforms: Vec<String>,
    /// Sitemap-index children are followed only if they match one of these (empty = all)
    pub sitemap_follow: Vec<Regex>,
    pub obey_robots: bool,
    /// Agent token robots.txt rules are evaluated for
    pub robots_agent: String,
}

/// Coordinator drains the task set
pub struct Coordinator {
    context: Arc<CrawlContext>,
}

impl Coordinator {
    pub fn new(context: CrawlContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    /// Runs the seed tasks and everything they lead to
    ///
    /// Each URL is fetched at most once per run.
    pub async fn run(&self, seeds: Vec<CrawlTask>) -> CrawlReport {
        let mut tasks = JoinSet::new();
        let mut seen = HashSet::new();
        let mut report = CrawlReport::default();
        let mut completed = 0usize;

        for task in seeds {
            self.spawn(&mut tasks, &mut seen, task);
        }

        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            match joined {
                Ok(outcome) => {
                    report.records.extend(outcome.records);
                    report.stats.merge(&outcome.stats);
                    for task in outcome.follow_ups {
                        self.spawn(&mut tasks, &mut seen, task);
                    }
                }
                Err(e) => tracing::error!("Crawl task failed: {}", e),
            }

            if completed % 100 == 0 {
                tracing::info!(
                    "Progress: {} tasks done, {} records, {} in flight",
                    completed,
                    report.records.len(),
                    tasks.len()
                );
            }
        }

        report.stats.requests_issued = self.context.scheduler.requests_issued();
        tracing::info!(
            "Crawl drained: {} records from {} requests",
            report.records.len(),
            report.stats.requests_issued
        );
        report
    }

    fn spawn(
        &self,
        tasks: &mut JoinSet<TaskOutcome>,
        seen: &mut HashSet<String>,
        task: CrawlTask,
    ) {
        let Some(url) = task.url() else {
            tracing::error!("Dropping task with nothing to fetch: {:?}", task);
            return;
        };
        if !seen.insert(url.to_string()) {
            tracing::debug!("Already scheduled: {}", url);
            return;
        }

        let context = Arc::clone(&self.context);
        tasks.spawn(async move { context.execute(task).await });
    }
}

impl CrawlContext {
    /// Fetches one resource and handles the outcome
    pub async fn execute(&self, task: CrawlTask) -> TaskOutcome {
        match task {
            CrawlTask::Homepage { homepage, website } => {
                self.fetch_page(&homepage, &website, PageKind::Homepage, None).await
            }
            CrawlTask::EntryPoint {
                domain,
                website,
                candidates,
                state,
            } => self.fetch_entry_point(domain, website, candidates, state).await,
            CrawlTask::Sitemap { url, website, robots } => {
                self.fetch_sitemap(&url, &website, robots).await
            }
            CrawlTask::Page {
                url,
                website,
                kind,
                referer,
            } => self.fetch_page(&url, &website, kind, Some(&referer)).await,
        }
    }

    async fn fetch(&self, url: &Url) -> Option<FetchOutcome> {
        let _permit = self.scheduler.acquire(url).await?;
        Some(self.fetcher.fetch(url).await)
    }

    async fn fetch_page(
        &self,
        url: &Url,
        website: &str,
        kind: PageKind,
        referer: Option<&str>,
    ) -> TaskOutcome {
        let mut outcome = TaskOutcome::default();

        match self.fetch(url).await {
            Some(FetchOutcome::Success(page)) => {
                match self.build(kind, &page, website, referer).await {
                    Some(record) => {
                        tracing::debug!("Built {} record for {}", kind, record.url);
                        outcome.stats.record_page(kind);
                        outcome.records.push(record);
                    }
                    None => outcome.stats.dropped_records += 1,
                }
            }
            Some(other) => self.log_failure(url, other, &mut outcome.stats),
            None => {}
        }

        outcome
    }

    /// Runs the handler chain; `None` if the record had to be dropped
    async fn build(
        &self,
        kind: PageKind,
        page: &FetchedPage,
        website: &str,
        referer: Option<&str>,
    ) -> Option<PageRecord> {
        let hosting = match self.policy.hosting(&page.connection, self.dns.as_ref()).await {
            Ok(hosting) => hosting,
            Err(e) => {
                tracing::error!("Dropping record for {}: {}", page.url, e);
                return None;
            }
        };

        let context = HandlerContext {
            website,
            social_platforms: &self.social_platforms,
            hosting: &hosting,
        };
        Some(build_record(kind, page, referer, &context))
    }

    async fn fetch_entry_point(
        &self,
        domain: String,
        website: String,
        candidates: Arc<Vec<Url>>,
        state: EntryState,
    ) -> TaskOutcome {
        let mut outcome = TaskOutcome::default();
        let Some(url) = state.pending_candidate().and_then(|i| candidates.get(i)).cloned() else {
            tracing::error!("Entry-point leg for {} has no pending candidate ({})", domain, state);
            return outcome;
        };

        let (event, page) = match self.fetch(&url).await {
            Some(FetchOutcome::Success(page)) => (EntryEvent::Fetched, Some(page)),
            Some(FetchOutcome::HttpError { status_code: 404 }) => {
                tracing::debug!("{} not found", url);
                (EntryEvent::NotFound, None)
            }
            Some(FetchOutcome::ConnectionRefused { error }) => {
                tracing::debug!("Connection refused for {}: {}", url, error);
                (EntryEvent::ConnectionRefused, None)
            }
            Some(other) => {
                self.log_failure(&url, other, &mut outcome.stats);
                (EntryEvent::Failed, None)
            }
            None => return outcome,
        };

        let next = match state.next(event, candidates.len()) {
            Ok(next) => next,
            Err(e) => {
                tracing::error!("{} ({})", e, domain);
                return outcome;
            }
        };

        match (next, page) {
            (EntryState::Pending { .. }, _) => {
                outcome.follow_ups.push(CrawlTask::EntryPoint {
                    domain,
                    website,
                    candidates,
                    state: next,
                });
            }
            (EntryState::Resolved { .. }, Some(page)) => {
                tracing::debug!("Entry point for {} is {}", domain, url);
                outcome.stats.record_entry(next);
                outcome.follow_ups = if robots::is_robots_url(&url) {
                    self.robots_sitemaps(&page, &website)
                } else {
                    self.sitemap_tasks(&page.body, &url, &website, None)
                };
            }
            _ => {
                tracing::debug!("Entry-point leg for {} ended {}", domain, next);
                outcome.stats.record_entry(next);
            }
        }

        outcome
    }

    async fn fetch_sitemap(
        &self,
        url: &Url,
        website: &str,
        robots: Option<Arc<ParsedRobots>>,
    ) -> TaskOutcome {
        let mut outcome = TaskOutcome::default();

        match self.fetch(url).await {
            Some(FetchOutcome::Success(page)) => {
                outcome.follow_ups = self.sitemap_tasks(&page.body, url, website, robots);
            }
            Some(other) => self.log_failure(url, other, &mut outcome.stats),
            None => {}
        }

        outcome
    }

    /// Sitemap tasks for every `Sitemap:` line of a fetched robots.txt
    ///
    /// Listed sitemaps are always fetched; `sitemap-follow` only filters
    /// the children of sitemap indexes.
    fn robots_sitemaps(&self, page: &FetchedPage, website: &str) -> Vec<CrawlTask> {
        let robots = Arc::new(ParsedRobots::from_content(&page.body));
        let sitemaps = robots.sitemaps(&page.url);
        tracing::debug!("{} lists {} sitemaps", page.url, sitemaps.len());

        sitemaps
            .into_iter()
            .map(|url| CrawlTask::Sitemap {
                url,
                website: website.to_string(),
                robots: Some(Arc::clone(&robots)),
            })
            .collect()
    }

    /// Page tasks for rule-matched entries, sitemap tasks for followed index entries
    fn sitemap_tasks(
        &self,
        body: &str,
        sitemap_url: &Url,
        website: &str,
        robots: Option<Arc<ParsedRobots>>,
    ) -> Vec<CrawlTask> {
        let parsed = parse_sitemap(body);
        let mut tasks = Vec::new();

        for child in parsed.sitemaps {
            if self.follows(&child) {
                tasks.push(CrawlTask::Sitemap {
                    url: child,
                    website: website.to_string(),
                    robots: robots.clone(),
                });
            }
        }

        for page in parsed.pages {
            let Some(kind) = self.classifier.matching_rule(&page) else {
                continue;
            };
            if self.obey_robots
                && !robots::is_allowed(robots.as_deref(), page.as_str(), &self.robots_agent)
            {
                tracing::debug!("{} disallowed by robots.txt", page);
                continue;
            }
            tasks.push(CrawlTask::Page {
                url: page,
                website: website.to_string(),
                kind,
                referer: sitemap_url.to_string(),
            });
        }

        tracing::debug!("{} yielded {} tasks", sitemap_url, tasks.len());
        tasks
    }

    fn follows(&self, url: &Url) -> bool {
        let follow = self.sitemap_follow.is_empty()
            || self.sitemap_follow.iter().any(|re| re.is_match(url.as_str()));
        if !follow {
            tracing::debug!("Not following sitemap {}", url);
        }
        follow
    }

    fn log_failure(&self, url: &Url, outcome: FetchOutcome, stats: &mut CrawlStatistics) {
        match outcome {
            FetchOutcome::Success(_) => {}
            FetchOutcome::HttpError { status_code } => {
                tracing::debug!("{} returned HTTP {}", url, status_code);
                stats.failed_fetches += 1;
            }
            FetchOutcome::ConnectionRefused { error } => {
                tracing::debug!("Connection refused for {}: {}", url, error);
            }
            FetchOutcome::NetworkError { error } => {
                tracing::warn!("Abandoning {}: {}", url, error);
                stats.failed_fetches += 1;
            }
        }
    }
}
