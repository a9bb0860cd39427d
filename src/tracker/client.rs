//! HTTP client for the tracker's job endpoints

use crate::config::TrackerConfig;
use crate::tracker::types::{CrawlUnit, QueueResponse, SubmissionBatch, SubmitResponse};
use crate::tracker::{TrackerError, TrackerResult};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// Typed client for claiming and submitting work
#[derive(Debug, Clone)]
pub struct TrackerClient {
    client: Client,
    base: String,
    username: String,
}

impl TrackerClient {
    /// Builds a tracker client
    ///
    /// # Arguments
    ///
    /// * `config` - Tracker host, username and request timeout
    /// * `user_agent` - User-Agent sent with every tracker request
    pub fn new(config: &TrackerConfig, user_agent: &str) -> TrackerResult<Self> {
        Url::parse(&config.host).map_err(|e| TrackerError::InvalidUrl(e.to_string()))?;

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(config.request_timeout())
            .connect_timeout(config.request_timeout().min(Duration::from_secs(10)))
            .build()?;

        Ok(Self {
            client,
            base: config.host.trim_end_matches('/').to_string(),
            username: config.username.clone(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Claims up to `amount` URLs from `GET /jobs/queue`
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<CrawlUnit>)` - Units issued to this worker, possibly empty
    /// * `Err(TrackerError)` - Transport failure, non-2xx status or undecodable body
    pub async fn claim(&self, amount: usize) -> TrackerResult<Vec<CrawlUnit>> {
        let response = self
            .client
            .get(format!("{}/jobs/queue", self.base))
            .query(&[
                ("amount", amount.to_string()),
                ("username", self.username.clone()),
            ])
            .send()
            .await?;

        let body = read_success_body(response, "/jobs/queue").await?;
        let queue: QueueResponse = serde_json::from_str(&body)?;
        Ok(queue.into_units())
    }

    /// Submits a batch of results to `POST /jobs/submit`
    ///
    /// A reply of `{"success": false}` is turned into [`TrackerError::Rejected`]
    /// carrying the tracker's error codes.
    pub async fn submit(&self, batch: &SubmissionBatch) -> TrackerResult<()> {
        let response = self
            .client
            .post(format!("{}/jobs/submit", self.base))
            .query(&[("username", self.username.as_str())])
            .json(batch)
            .send()
            .await?;

        let body = read_success_body(response, "/jobs/submit").await?;
        let reply: SubmitResponse = serde_json::from_str(&body)?;

        if reply.success {
            Ok(())
        } else {
            Err(TrackerError::Rejected(reply.error))
        }
    }
}

async fn read_success_body(response: Response, endpoint: &'static str) -> TrackerResult<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(TrackerError::Status {
            endpoint,
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}
