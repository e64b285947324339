//! Upload driver: submits one batch and absorbs the backend's failure modes.
//!
//! The backend's failures are not uniformly retriable, so each class gets
//! its own recovery path:
//!
//! | Error class | Recovery | Attempt budget |
//! |---|---|---|
//! | service unavailable | exponential backoff, resubmit | consumed |
//! | resource not found | repair group/stream, resubmit | kept (configurable) |
//! | invalid sequence token | refresh token, else rotate stream | consumed |
//! | data already accepted | refresh token, else rotate stream | consumed |
//! | invalid parameter | drop the batch | — |
//! | anything else | drop the batch | — |
//!
//! The driver never propagates an error: a batch either lands or is
//! dropped with a diagnostic. Backoff waits race the sink's cancellation
//! token so shutdown is not held up by a struggling backend; an in-flight
//! request is left to finish naturally.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::client::{ClientError, CloudWatchLogs};
use crate::config::SinkConfig;
use crate::constants::BACKOFF_BASE;
use crate::lifecycle::Destination;
use crate::record::InputLogEvent;
use crate::stream_name::StreamNameProvider;

/// Submits `batch` to `dest`, retrying per error class up to the
/// configured attempt ceiling (`0..=retry_attempts` attempt indices).
///
/// Stream rotation mutates `dest`, so later batches of the same flush
/// target the rotated stream.
pub async fn publish_batch(
    client: &dyn CloudWatchLogs,
    dest: &mut Destination,
    batch: &[InputLogEvent],
    config: &SinkConfig,
    provider: &dyn StreamNameProvider,
    cancel: &CancellationToken,
) {
    if batch.is_empty() {
        return;
    }

    let max_attempts = u32::from(config.retry_attempts);
    let mut attempt: u32 = 0;

    loop {
        let result = client
            .put_log_events(dest.group(), dest.stream(), dest.sequence_token(), batch)
            .await;

        match result {
            Ok(response) => {
                dest.set_sequence_token(response.next_sequence_token);
                return;
            }

            Err(ClientError::ServiceUnavailable(e)) => {
                debug!("SINK | service unavailable, attempt {attempt}: {e}");
                let backoff = BACKOFF_BASE * 2u32.saturating_pow(attempt);
                attempt += 1;
                if attempt > max_attempts {
                    break;
                }
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("SINK | cancelled during backoff, dropping batch of {} events", batch.len());
                        return;
                    }
                    () = tokio::time::sleep(backoff) => {}
                }
            }

            Err(ClientError::ResourceNotFound(e)) => {
                // Not a rate problem: the destination structure needs
                // repairing, after which the same stream name is retried.
                warn!("SINK | log group or stream missing, repairing: {e}");
                if let Err(repair_err) = dest.repair(client, config).await {
                    error!(
                        "SINK | failed to repair destination, dropping batch of {} events: {repair_err}",
                        batch.len()
                    );
                    return;
                }
                if config.structural_recovery_counts_attempt {
                    attempt += 1;
                    if attempt > max_attempts {
                        break;
                    }
                }
            }

            Err(
                skew @ (ClientError::InvalidSequenceToken(_) | ClientError::DataAlreadyAccepted(_)),
            ) => {
                warn!("SINK | sequence token rejected, attempt {attempt}: {skew}");
                if let Err(refresh_err) = dest.refresh_sequence_token(client).await {
                    warn!(
                        "SINK | failed to refresh sequence token, rotating stream: {refresh_err}"
                    );
                    if let Err(rotate_err) = dest.rotate_stream(client, provider).await {
                        error!(
                            "SINK | failed to rotate stream, dropping batch of {} events: {rotate_err}",
                            batch.len()
                        );
                        return;
                    }
                }
                attempt += 1;
                if attempt > max_attempts {
                    break;
                }
            }

            Err(fatal @ ClientError::InvalidParameter(_)) => {
                error!(
                    "SINK | malformed upload request, dropping batch of {} events: {fatal}",
                    batch.len()
                );
                return;
            }

            Err(other) => {
                error!(
                    "SINK | unexpected upload failure, dropping batch of {} events: {other}",
                    batch.len()
                );
                return;
            }
        }
    }

    error!(
        "SINK | retry budget exhausted after {attempt} attempts, dropping batch of {} events",
        batch.len()
    );
}
