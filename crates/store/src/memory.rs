//! In-memory approval repository.
//!
//! Backs tests and the replay tool. Each claim lives in its own `DashMap`
//! shard entry, so the version check and the write happen under one lock.

use async_trait::async_trait;
use claimflow_core::workflow::{ExpenseApproval, WorkflowError};
use claimflow_shared::ExpenseId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::repository::{ApprovalFilter, ExpenseApprovalRepository};

/// Approval repository held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryApprovalRepository {
    approvals: DashMap<ExpenseId, ExpenseApproval>,
}

impl InMemoryApprovalRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.approvals.len()
    }

    /// Returns true if no claim is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.approvals.is_empty()
    }
}

#[async_trait]
impl ExpenseApprovalRepository for InMemoryApprovalRepository {
    async fn insert(&self, approval: &ExpenseApproval) -> Result<(), WorkflowError> {
        match self.approvals.entry(approval.expense_id()) {
            Entry::Occupied(_) => Err(WorkflowError::ApprovalAlreadyExists(
                approval.expense_id(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(approval.clone());
                Ok(())
            }
        }
    }

    async fn load(&self, expense_id: ExpenseId) -> Result<ExpenseApproval, WorkflowError> {
        self.approvals
            .get(&expense_id)
            .map(|entry| entry.value().clone())
            .ok_or(WorkflowError::ApprovalNotFound(expense_id))
    }

    async fn save(&self, approval: &ExpenseApproval) -> Result<ExpenseApproval, WorkflowError> {
        let expense_id = approval.expense_id();
        let mut stored = self
            .approvals
            .get_mut(&expense_id)
            .ok_or(WorkflowError::ApprovalNotFound(expense_id))?;

        if stored.version() != approval.version() {
            return Err(WorkflowError::ConcurrentModification {
                expense_id,
                expected: approval.version(),
                actual: stored.version(),
            });
        }
        // Terminal claims are frozen at the storage boundary too.
        if stored.is_finalized() {
            return Err(WorkflowError::AlreadyFinalized {
                expense_id,
                status: stored.status(),
            });
        }

        let saved = approval.clone().with_version(approval.version() + 1);
        *stored = saved.clone();
        Ok(saved)
    }

    async fn list(&self, filter: &ApprovalFilter) -> Result<Vec<ExpenseApproval>, WorkflowError> {
        let mut approvals: Vec<ExpenseApproval> = self
            .approvals
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        approvals.sort_by_key(|a| (a.created_at(), a.expense_id()));
        Ok(approvals)
    }
}
