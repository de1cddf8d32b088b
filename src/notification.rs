//! Push payload delivery for the scheduled jobs.
//!
//! Posts the notification payload as JSON to each subscriber endpoint. A
//! 404/410 response means the endpoint is permanently gone: the caller must
//! delete that subscription row so it is never retried. Any other failure is
//! counted and skipped — one bad subscriber never aborts the batch.

use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::types::{NotificationPayload, PushSubscription};

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The endpoint no longer exists; the subscription should be removed.
    #[error("Subscription endpoint is gone")]
    Gone,

    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Send one payload to one subscription endpoint.
pub async fn send_push(
    client: &Client,
    sub: &PushSubscription,
    payload: &NotificationPayload,
) -> Result<(), DeliveryError> {
    let response = client
        .post(&sub.endpoint)
        .json(payload)
        .send()
        .await
        .map_err(|e| DeliveryError::Failed(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    if endpoint_is_gone(status) {
        return Err(DeliveryError::Gone);
    }
    Err(DeliveryError::Failed(format!(
        "endpoint returned {status}"
    )))
}

/// Outcome of a broadcast. `gone` holds subscription ids whose endpoints no
/// longer exist; the caller deletes those rows.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub sent: u32,
    pub failed: u32,
    pub gone: Vec<String>,
}

/// Deliver one payload to every subscription, catching per-subscriber
/// failures.
pub async fn broadcast(
    client: &Client,
    subs: &[PushSubscription],
    payload: &NotificationPayload,
) -> BroadcastOutcome {
    let mut outcome = BroadcastOutcome::default();
    for sub in subs {
        match send_push(client, sub, payload).await {
            Ok(()) => outcome.sent += 1,
            Err(DeliveryError::Gone) => {
                log::info!("Subscription {} endpoint gone, marking for removal", sub.id);
                outcome.gone.push(sub.id.clone());
            }
            Err(DeliveryError::Failed(reason)) => {
                log::warn!("Delivery to subscription {} failed: {reason}", sub.id);
                outcome.failed += 1;
            }
        }
    }
    outcome
}

fn endpoint_is_gone(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gone_statuses_trigger_cleanup() {
        assert!(endpoint_is_gone(StatusCode::NOT_FOUND));
        assert!(endpoint_is_gone(StatusCode::GONE));
        assert!(!endpoint_is_gone(StatusCode::BAD_REQUEST));
        assert!(!endpoint_is_gone(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!endpoint_is_gone(StatusCode::TOO_MANY_REQUESTS));
    }
}
