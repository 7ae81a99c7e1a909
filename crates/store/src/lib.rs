//! Repository boundary and orchestration for Claimflow.
//!
//! This crate provides:
//! - The `ExpenseApprovalRepository` abstraction with optimistic concurrency
//! - An in-memory repository and rule catalog
//! - Idempotent notification dispatch
//! - `ApprovalService`, which runs load → decide → save with bounded retry

pub mod catalog;
pub mod memory;
pub mod notify;
pub mod repository;
pub mod service;

#[cfg(test)]
mod test_support;

pub use catalog::RuleCatalog;
pub use memory::InMemoryApprovalRepository;
pub use notify::{
    DispatchOutcome, NotificationDispatcher, NotificationError, NotificationSink,
    TracingNotificationSink,
};
pub use repository::{ApprovalFilter, ExpenseApprovalRepository};
pub use service::{ApprovalService, DecisionReceipt};
