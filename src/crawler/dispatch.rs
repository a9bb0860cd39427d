//! Dispatch loop - keeps the worker pool full
//!
//! Each cycle moves through three phases:
//! - DRAIN: reap finished worker tasks
//! - REPLENISH: claim units from the tracker once the local backlog is empty
//! - DISPATCH: spawn one task per unit for as long as worker slots are free
//!
//! Worker slots are semaphore permits. A task owns its permit for its whole
//! lifetime, so the number of in-flight units can never exceed the pool size.

use crate::config::Config;
use crate::crawler::backoff::Backoff;
use crate::crawler::cache::SubmissionCache;
use crate::crawler::extract::RecordBuilder;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::worker::CrawlWorker;
use crate::tracker::{CrawlUnit, TrackerClient};
use crate::CrawlyError;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// What a single dispatch cycle achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// This many units were handed to new worker tasks
    Dispatched(usize),
    /// The tracker had no work for us
    Idle,
    /// The tracker could not be reached or answered garbage
    TrackerUnavailable,
}

/// Owner of the worker pool
pub struct Dispatcher {
    tracker: Arc<TrackerClient>,
    worker: Arc<CrawlWorker>,
    slots: Arc<Semaphore>,
    capacity: usize,
    tasks: JoinSet<()>,
    backlog: VecDeque<CrawlUnit>,
    backoff: Backoff,
    running_on_empty: bool,
}

impl Dispatcher {
    /// Wires up tracker client, fetcher, result builder and submission cache
    pub fn new(config: &Config) -> Result<Self, CrawlyError> {
        let tracker = Arc::new(TrackerClient::new(
            &config.tracker,
            &config.identity.user_agent,
        )?);
        let cache = Arc::new(SubmissionCache::new(
            Arc::clone(&tracker),
            config.crawler.submit_threshold as usize,
        ));
        let fetcher = Fetcher::new(&config.identity.user_agent, config.crawler.fetch_timeout())?
            .with_max_body_bytes(config.crawler.max_body_len());
        let builder = RecordBuilder::new(&config.identity, &config.tracker.username);
        let worker = Arc::new(CrawlWorker::new(fetcher, builder, cache));
        let backoff = Backoff::new(config.crawler.backoff_initial(), config.crawler.backoff_max());

        Ok(Self::from_parts(
            tracker,
            worker,
            config.crawler.pool_size as usize,
            backoff,
        ))
    }

    /// Assembles a dispatcher from already built parts
    pub fn from_parts(
        tracker: Arc<TrackerClient>,
        worker: Arc<CrawlWorker>,
        capacity: usize,
        backoff: Backoff,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            tracker,
            worker,
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            tasks: JoinSet::new(),
            backlog: VecDeque::new(),
            backoff,
            running_on_empty: false,
        }
    }

    pub fn cache(&self) -> Arc<SubmissionCache> {
        Arc::clone(self.worker.cache())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of worker slots currently held by running tasks
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Units claimed from the tracker but not dispatched yet
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// True after a claim came back empty while no task was running
    ///
    /// Cleared as soon as work is dispatched again.
    pub fn is_running_on_empty(&self) -> bool {
        self.running_on_empty
    }

    /// Runs dispatch cycles until `shutdown` completes
    ///
    /// Failed or empty claims are retried after an exponential backoff that
    /// resets as soon as work arrives. In-flight tasks are abandoned on
    /// shutdown; the caller is expected to flush the submission cache.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("Dispatching with a pool of {} workers", self.capacity);

        loop {
            let outcome = tokio::select! {
                _ = &mut shutdown => None,
                outcome = self.cycle() => Some(outcome),
            };

            let Some(outcome) = outcome else {
                break;
            };

            match outcome {
                CycleOutcome::Dispatched(_) => self.backoff.reset(),
                CycleOutcome::Idle | CycleOutcome::TrackerUnavailable => {
                    let delay = self.backoff.next_delay();
                    tracing::debug!("Polling tracker again in {:?}", delay);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!(
            "Dispatch stopped with {} tasks in flight and {} units unstarted",
            self.in_flight(),
            self.backlog.len()
        );
    }

    /// Runs one DRAIN, REPLENISH, DISPATCH cycle
    ///
    /// Waits for a free worker slot before doing anything else, so the tracker
    /// is only asked for work when there is room for it.
    pub async fn cycle(&mut self) -> CycleOutcome {
        self.reap();

        let Ok(first_slot) = Arc::clone(&self.slots).acquire_owned().await else {
            return CycleOutcome::Idle;
        };

        if self.backlog.is_empty() {
            // The slot we hold counts as free capacity
            let amount = self.slots.available_permits() + 1;
            match self.tracker.claim(amount).await {
                Ok(units) => {
                    for unit in units {
                        if unit.url.trim().is_empty() {
                            tracing::warn!("Tracker issued an empty URL, skipping");
                        } else {
                            self.backlog.push_back(unit);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to claim work from tracker: {}", e);
                    return CycleOutcome::TrackerUnavailable;
                }
            }

            if self.backlog.is_empty() {
                self.running_on_empty = self.tasks.is_empty();
                if self.running_on_empty {
                    tracing::info!("Running on empty: no work in flight and none issued");
                }
                return CycleOutcome::Idle;
            }
        }

        let mut dispatched = 0;
        let mut next_slot = Some(first_slot);
        while let Some(slot) = next_slot
            .take()
            .or_else(|| Arc::clone(&self.slots).try_acquire_owned().ok())
        {
            let Some(unit) = self.backlog.pop_front() else {
                break;
            };
            self.spawn(unit, slot);
            dispatched += 1;
        }

        self.running_on_empty = false;
        tracing::debug!(
            "Dispatched {} units ({} in flight, {} in backlog)",
            dispatched,
            self.in_flight(),
            self.backlog.len()
        );
        CycleOutcome::Dispatched(dispatched)
    }

    fn spawn(&mut self, unit: CrawlUnit, slot: OwnedSemaphorePermit) {
        let worker = Arc::clone(&self.worker);
        self.tasks.spawn(async move {
            let _slot = slot;
            worker.process(unit).await;
        });
    }

    /// Retires finished tasks without waiting
    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                if e.is_panic() {
                    tracing::error!("Worker task panicked: {}", e);
                }
            }
        }
    }
}
