//! Idempotent delivery of approval notifications.
//!
//! Events are derived from saved state, so a retried save or a replayed
//! decision can produce the same event more than once. The dispatcher
//! remembers delivered [`EventKey`]s in a bounded `moka` cache and drops
//! repeats; failed deliveries are not remembered, so the next dispatch of
//! the same event tries again.

use std::sync::Arc;

use async_trait::async_trait;
use claimflow_core::workflow::{ApprovalEvent, EventKey};
use claimflow_shared::NotificationConfig;
use moka::sync::Cache;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by a notification sink.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The downstream channel refused or lost the message.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Destination for approval notifications (email, chat, queue...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one event to its recipient.
    async fn deliver(&self, event: &ApprovalEvent) -> Result<(), NotificationError>;
}

/// Sink that writes each notification to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationSink;

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn deliver(&self, event: &ApprovalEvent) -> Result<(), NotificationError> {
        match event {
            ApprovalEvent::ApproverAssigned {
                expense_id,
                step_order,
                approver_id,
            } => info!(
                %expense_id,
                step_order,
                recipient = %approver_id,
                "expense claim awaiting approval"
            ),
            ApprovalEvent::ClaimFinalized {
                expense_id,
                submitter_id,
                status,
                ..
            } => info!(
                %expense_id,
                %status,
                recipient = %submitter_id,
                "expense claim finalized"
            ),
        }
        Ok(())
    }
}

/// Result of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The sink accepted the event.
    Delivered,
    /// The event was already delivered and was skipped.
    Duplicate,
    /// The sink failed; the event will be retried on the next dispatch.
    Failed,
}

/// Deduplicating front for a [`NotificationSink`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn NotificationSink>,
    delivered: Cache<EventKey, ()>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher whose dedupe window follows `config`.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>, config: &NotificationConfig) -> Self {
        let delivered = Cache::builder()
            .max_capacity(config.dedupe_capacity)
            .time_to_live(config.dedupe_ttl())
            .build();

        Self { sink, delivered }
    }

    /// Delivers `event` unless an event with the same key already went out.
    ///
    /// Sink failures are logged and reported, never propagated: the claim's
    /// state is already saved and must not be rolled back over a
    /// notification.
    pub async fn dispatch(&self, event: &ApprovalEvent) -> DispatchOutcome {
        let key = event.key();
        if self.delivered.contains_key(&key) {
            debug!(
                expense_id = %key.expense_id,
                step_order = key.step_order,
                "notification already delivered"
            );
            return DispatchOutcome::Duplicate;
        }

        match self.sink.deliver(event).await {
            Ok(()) => {
                self.delivered.insert(key, ());
                DispatchOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    expense_id = %key.expense_id,
                    step_order = key.step_order,
                    error = %e,
                    "notification delivery failed"
                );
                DispatchOutcome::Failed
            }
        }
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("delivered", &self.delivered.entry_count())
            .finish_non_exhaustive()
    }
}
