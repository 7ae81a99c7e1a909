//! Approval orchestration over a repository.
//!
//! `ApprovalService` is the single writer path for claims: it resolves the
//! rule at submission, runs every decision through the engine as a
//! load → decide → save round, and dispatches notifications only after a
//! save has succeeded.

use std::sync::Arc;

use claimflow_core::workflow::{
    ApprovalEvent, ApprovalStatus, ApprovalWorkflowEngine, Decision, ExpenseApproval,
    ExpenseSubmission, RuleResolver, Submitter, WorkflowError,
};
use claimflow_shared::{ExpenseId, UserId, WorkflowConfig};
use tracing::{debug, info, warn};

use crate::catalog::RuleCatalog;
use crate::notify::NotificationDispatcher;
use crate::repository::{ApprovalFilter, ExpenseApprovalRepository};

/// Outcome of a successful [`ApprovalService::decide`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionReceipt {
    /// The claim as stored after the call.
    pub approval: ExpenseApproval,
    /// True when the same decision had already been recorded and nothing
    /// was written.
    pub replayed: bool,
    /// Number of load/decide/save rounds used.
    pub attempts: u32,
}

/// Runs the approval workflow against a repository.
pub struct ApprovalService<R> {
    repository: Arc<R>,
    catalog: Arc<RuleCatalog>,
    dispatcher: NotificationDispatcher,
    max_save_attempts: u32,
}

impl<R: ExpenseApprovalRepository> ApprovalService<R> {
    /// Creates a new service.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        catalog: Arc<RuleCatalog>,
        dispatcher: NotificationDispatcher,
        config: &WorkflowConfig,
    ) -> Self {
        Self {
            repository,
            catalog,
            dispatcher,
            max_save_attempts: config.max_save_attempts.max(1),
        }
    }

    /// Returns the rule catalog this service resolves against.
    #[must_use]
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Starts the workflow for a submitted claim.
    ///
    /// # Errors
    ///
    /// * `RuleNotFound` if no rule of the company covers the claim
    /// * `Configuration` if the manager policy cannot be applied
    /// * `ApprovalAlreadyExists` if the claim was already submitted
    pub async fn submit(
        &self,
        expense: &ExpenseSubmission,
        submitter: &Submitter,
    ) -> Result<ExpenseApproval, WorkflowError> {
        let rules = self.catalog.rules_for(expense.company_id);
        let rule = RuleResolver::resolve(expense.company_id, submitter, expense, &rules)?;
        let approval = ApprovalWorkflowEngine::start(expense, &rule);

        self.repository.insert(&approval).await?;

        info!(
            expense_id = %approval.expense_id(),
            rule_id = %rule.id(),
            steps = approval.rule().steps.len(),
            "expense claim submitted"
        );
        self.notify(&approval).await;

        Ok(approval)
    }

    /// Records `actor`'s decision on a claim.
    ///
    /// Conflicting writers are retried up to the configured number of
    /// rounds, each starting from a fresh load. Repeating a decision that is
    /// already recorded succeeds with `replayed` set and writes nothing.
    ///
    /// # Errors
    ///
    /// * `ApprovalNotFound` if the claim has no workflow
    /// * `NotCurrentApprover` if `actor` is not assigned to the current step
    /// * `AlreadyFinalized` if the claim is terminal and `actor` did not
    ///   make this exact decision
    /// * `ConcurrencyExhausted` if every round lost a concurrent write
    pub async fn decide(
        &self,
        expense_id: ExpenseId,
        actor: UserId,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<DecisionReceipt, WorkflowError> {
        for attempt in 1..=self.max_save_attempts {
            let current = self.repository.load(expense_id).await?;

            let next = match ApprovalWorkflowEngine::record_decision(
                &current,
                actor,
                decision,
                comment.clone(),
            ) {
                Ok(next) => next,
                Err(e) if is_replay(&current, actor, decision) => {
                    debug!(%expense_id, %actor, error = %e, "decision already recorded");
                    // The earlier call may have failed before notifying.
                    self.notify(&current).await;
                    return Ok(DecisionReceipt {
                        approval: current,
                        replayed: true,
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e),
            };

            match self.repository.save(&next).await {
                Ok(saved) => {
                    info!(
                        %expense_id,
                        %actor,
                        decision = %decision.status(),
                        status = %saved.status(),
                        version = saved.version(),
                        "approval decision recorded"
                    );
                    self.notify(&saved).await;
                    return Ok(DecisionReceipt {
                        approval: saved,
                        replayed: false,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_retryable() => {
                    warn!(%expense_id, attempt, error = %e, "concurrent modification, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(WorkflowError::ConcurrencyExhausted {
            expense_id,
            attempts: self.max_save_attempts,
        })
    }

    /// Returns the current state of a claim.
    ///
    /// # Errors
    ///
    /// `ApprovalNotFound` if the claim has no workflow.
    pub async fn approval(&self, expense_id: ExpenseId) -> Result<ExpenseApproval, WorkflowError> {
        self.repository.load(expense_id).await
    }

    /// Lists the Pending claims waiting on `approver`, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn queue_for(&self, approver: UserId) -> Result<Vec<ExpenseApproval>, WorkflowError> {
        self.repository
            .list(&ApprovalFilter {
                status: Some(ApprovalStatus::Pending),
                current_approver: Some(approver),
                ..ApprovalFilter::default()
            })
            .await
    }

    /// Lists every claim submitted by `submitter`, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn history_for(
        &self,
        submitter: UserId,
    ) -> Result<Vec<ExpenseApproval>, WorkflowError> {
        self.repository
            .list(&ApprovalFilter {
                submitter_id: Some(submitter),
                ..ApprovalFilter::default()
            })
            .await
    }

    async fn notify(&self, approval: &ExpenseApproval) {
        if let Some(event) = ApprovalEvent::for_state(approval) {
            self.dispatcher.dispatch(&event).await;
        }
    }
}

/// True if `actor` already recorded exactly `decision` on this claim.
fn is_replay(approval: &ExpenseApproval, actor: UserId, decision: Decision) -> bool {
    approval
        .recorded_decision_by(actor)
        .is_some_and(|recorded| recorded.status == decision.status())
}
