//! Batch orchestration: the sink's emit entry point.
//!
//! [`Sink::emit_batch`] receives one flush cycle's worth of raw records
//! from the scheduler and drives them to the backend:
//!
//! 1. Empty input returns immediately — zero remote calls.
//! 2. With group routing enabled, records are partitioned into buckets by
//!    routing key (buckets ordered by first occurrence); otherwise the
//!    whole cycle is one bucket for the configured group.
//! 3. Per bucket: prepare the destination, sort records ascending by
//!    timestamp, transform each, then carve and publish batches strictly
//!    sequentially — the sequence token threads from each upload into the
//!    next.
//!
//! No error escapes `emit_batch`. A destination that cannot be prepared
//! costs that bucket its records for this cycle; everything is diagnosed
//! on the `tracing` channel and the host's logging call never fails.
//!
//! The entire body runs under a single-flight async lock: destination
//! state (stream name, sequence token, readiness) is not safe under
//! concurrent emits, so a second caller waits for the first to finish.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::batch::Batcher;
use crate::client::CloudWatchLogs;
use crate::config::{ConfigError, SinkConfig};
use crate::lifecycle::Destination;
use crate::record::LogRecord;
use crate::render::{self, EventRenderer};
use crate::stream_name::StreamNameProvider;
use crate::transform::transform;
use crate::uploader::publish_batch;

/// Batching log sink for a CloudWatch-compatible backend.
pub struct Sink {
    client: Arc<dyn CloudWatchLogs>,
    config: SinkConfig,
    renderer: Arc<dyn EventRenderer>,
    provider: Arc<dyn StreamNameProvider>,
    batcher: Batcher,
    destinations: Mutex<HashMap<String, Destination>>,
    cancel: CancellationToken,
}

impl Sink {
    /// Creates a sink from a validated configuration.
    ///
    /// `renderer` overrides the built-in [`MessageFormat`](crate::config::MessageFormat)
    /// choice; supplying both is rejected.
    pub fn new(
        client: Arc<dyn CloudWatchLogs>,
        config: SinkConfig,
        provider: Arc<dyn StreamNameProvider>,
        renderer: Option<Arc<dyn EventRenderer>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let renderer = render::resolve(config.format, renderer)?;

        Ok(Sink {
            client,
            config,
            renderer,
            provider,
            batcher: Batcher::default(),
            destinations: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        })
    }

    /// The sink's configuration snapshot.
    #[must_use]
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Token cancelling in-flight backoff waits, for prompt shutdown.
    ///
    /// Cancellation is cooperative: a batch waiting out a backoff is
    /// dropped, while an in-flight request completes naturally.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads one flush cycle's records. Never returns an error and never
    /// panics on backend misbehavior; failed batches are dropped with a
    /// diagnostic.
    pub async fn emit_batch(&self, records: Vec<LogRecord>) {
        if records.is_empty() {
            return;
        }

        // Single-flight: destination state must not see concurrent emits.
        let mut destinations = self.destinations.lock().await;

        for (group, bucket) in self.partition(records) {
            let dest = destinations
                .entry(group.clone())
                .or_insert_with(|| Destination::new(group));

            self.emit_bucket(dest, bucket).await;
        }
    }

    /// Prepares one destination and drives its bucket through the
    /// batcher/uploader loop.
    async fn emit_bucket(&self, dest: &mut Destination, mut bucket: Vec<LogRecord>) {
        if let Err(e) = dest
            .ensure_ready(&*self.client, &self.config, &*self.provider)
            .await
        {
            error!(
                "SINK | failed to prepare log group {:?}, dropping {} events for this cycle: {e}",
                dest.group(),
                bucket.len()
            );
            return;
        }

        // Uploads must be ordered by timestamp; the sort is stable so
        // equal timestamps keep their arrival order.
        bucket.sort_by_key(|record| record.timestamp);

        let mut queue: VecDeque<_> = bucket
            .iter()
            .map(|record| transform(record, &*self.renderer))
            .collect();

        let mut first = true;
        while !queue.is_empty() {
            if !first {
                if let Some(delay) = self.config.inter_batch_delay {
                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            debug!(
                                "SINK | cancelled between batches, dropping {} pending events",
                                queue.len()
                            );
                            return;
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
            first = false;

            let batch = self.batcher.next_batch(&mut queue);
            publish_batch(
                &*self.client,
                dest,
                &batch,
                &self.config,
                &*self.provider,
                &self.cancel,
            )
            .await;
        }
    }

    /// Groups records into ordered buckets keyed by destination group.
    ///
    /// Bucket order is the order each group first occurs in the input, so
    /// a cycle without routing (or with no routed records) degenerates to
    /// one bucket for the configured group.
    fn partition(&self, records: Vec<LogRecord>) -> Vec<(String, Vec<LogRecord>)> {
        if !self.config.group_routing {
            return vec![(self.config.log_group_name.clone(), records)];
        }

        let mut buckets: Vec<(String, Vec<LogRecord>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in records {
            let group = record
                .routing_key
                .clone()
                .unwrap_or_else(|| self.config.log_group_name.clone());

            match index.get(&group) {
                Some(&i) => buckets[i].1.push(record),
                None => {
                    index.insert(group.clone(), buckets.len());
                    buckets.push((group, vec![record]));
                }
            }
        }

        buckets
    }
}
