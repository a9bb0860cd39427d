//! Per-unit pipeline run by each worker task: fetch, build, cache

use crate::crawler::cache::SubmissionCache;
use crate::crawler::extract::RecordBuilder;
use crate::crawler::fetcher::{FetchOutcome, Fetcher};
use crate::tracker::CrawlUnit;
use std::sync::Arc;

/// What became of one crawl unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitDisposition {
    /// A record was handed to the submission cache
    Reported,
    /// The response was not parseable and was dropped
    Skipped,
    /// No response was received and the unit was dropped
    Failed,
}

/// Shared state for all worker tasks
pub struct CrawlWorker {
    fetcher: Fetcher,
    builder: RecordBuilder,
    cache: Arc<SubmissionCache>,
}

impl CrawlWorker {
    pub fn new(fetcher: Fetcher, builder: RecordBuilder, cache: Arc<SubmissionCache>) -> Self {
        Self {
            fetcher,
            builder,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<SubmissionCache> {
        &self.cache
    }

    /// Processes one unit
    ///
    /// Skipped and failed units are not reported to the tracker; it re-issues
    /// or expires them on its own.
    pub async fn process(&self, unit: CrawlUnit) -> UnitDisposition {
        match self.fetcher.fetch(&unit.url).await {
            FetchOutcome::Success(page) => {
                let record = self.builder.build(&page);
                tracing::info!(
                    "{} {} ({} outlinks, {} embeds)",
                    record.status_code,
                    record.url,
                    record.discovered_outlinks.len(),
                    record.discovered_embeds.len()
                );
                self.cache.add(record).await;
                UnitDisposition::Reported
            }
            FetchOutcome::Skipped(reason) => {
                tracing::debug!("Skipped {}: {}", unit.url, reason);
                UnitDisposition::Skipped
            }
            FetchOutcome::Failed(reason) => {
                tracing::debug!("Dropped {}: {}", unit.url, reason);
                UnitDisposition::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdentityConfig, TrackerConfig};
    use crate::tracker::TrackerClient;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn worker_for(server: &MockServer, threshold: usize) -> CrawlWorker {
        let tracker_config = TrackerConfig {
            host: server.uri(),
            username: "tester".to_string(),
            ..TrackerConfig::default()
        };
        let tracker = Arc::new(TrackerClient::new(&tracker_config, "TestAgent").unwrap());
        let cache = Arc::new(SubmissionCache::new(tracker, threshold));
        let fetcher = Fetcher::new("TestAgent", Duration::from_secs(5)).unwrap();
        let builder = RecordBuilder::new(&IdentityConfig::default(), "tester");
        CrawlWorker::new(fetcher, builder, cache)
    }

    #[tokio::test]
    async fn test_success_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
            .mount(&server)
            .await;

        let worker = worker_for(&server, 10);
        let unit = CrawlUnit::new(format!("{}/page", server.uri()));

        assert_eq!(worker.process(unit).await, UnitDisposition::Reported);
        assert_eq!(worker.cache().pending(), 1);
    }

    #[tokio::test]
    async fn test_skip_and_failure_add_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "application/pdf"))
            .mount(&server)
            .await;

        let worker = worker_for(&server, 10);

        let skipped = worker
            .process(CrawlUnit::new(format!("{}/file.pdf", server.uri())))
            .await;
        let failed = worker.process(CrawlUnit::new("not a url")).await;

        assert_eq!(skipped, UnitDisposition::Skipped);
        assert_eq!(failed, UnitDisposition::Failed);
        assert_eq!(worker.cache().pending(), 0);
    }
}
