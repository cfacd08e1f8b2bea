//! Cohort scheduling of batch requests
//!
//! Ids are cut into consecutive batches; batches are run `parallel_batches` at
//! a time, and each cohort must finish before the next starts. A pause sits
//! between cohorts so a large mailbox does not run into the per-user quota.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::broadcast;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::gmail::BatchExecutor;
use crate::retry::Sleeper;
use crate::types::{Event, MessageDetail, Progress};

/// Drives the batch executor over a whole id list
pub struct BatchOrchestrator {
    executor: Arc<BatchExecutor>,
    sleeper: Arc<dyn Sleeper>,
    config: PipelineConfig,
    event_tx: broadcast::Sender<Event>,
}

impl BatchOrchestrator {
    /// Create an orchestrator publishing progress on `event_tx`
    pub fn new(
        executor: Arc<BatchExecutor>,
        sleeper: Arc<dyn Sleeper>,
        config: PipelineConfig,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            executor,
            sleeper,
            config,
            event_tx,
        }
    }

    /// Retrieve details for every id
    ///
    /// A [`Event::Progress`] is published after each cohort. The first batch
    /// error fails the whole run; details of earlier cohorts are discarded.
    ///
    /// # Errors
    /// Whatever the executor returned for the failing batch.
    pub async fn run(&self, token: &str, ids: &[String]) -> Result<Vec<MessageDetail>> {
        let batch_size = self.config.batch_size.max(1);
        let parallel = self.config.parallel_batches.max(1);

        let batches: Vec<&[String]> = ids.chunks(batch_size).collect();
        let group_delay = self.config.group_delay(batches.len());
        let cohort_count = batches.len().div_ceil(parallel);

        tracing::info!(
            ids = ids.len(),
            batches = batches.len(),
            parallel,
            group_delay_ms = group_delay.as_millis(),
            "Retrieving message details"
        );

        let mut details: Vec<MessageDetail> = Vec::with_capacity(ids.len());

        for (index, cohort) in batches.chunks(parallel).enumerate() {
            let results = try_join_all(
                cohort
                    .iter()
                    .map(|batch| self.executor.execute(token, batch)),
            )
            .await
            .inspect_err(|e| {
                tracing::error!(cohort = index, error = %e, "Batch cohort failed")
            })?;

            for batch_details in results {
                details.extend(batch_details);
            }

            let progress = Progress::new(details.len(), ids.len());
            tracing::debug!(
                cohort = index,
                processed = progress.processed,
                total = progress.total,
                percentage = progress.percentage,
                "cohort complete"
            );
            self.event_tx.send(progress.into()).ok();

            if index + 1 < cohort_count {
                self.sleeper.sleep(group_delay).await;
            }
        }

        Ok(details)
    }
}
