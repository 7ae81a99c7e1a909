//! Scenario file format and runner.

use std::sync::Arc;

use anyhow::{Context, bail};
use serde::Deserialize;
use tracing::{info, warn};

use claimflow_core::workflow::{
    ApprovalRule, ApprovalStatus, Decision, ExpenseApproval, ExpenseSubmission, Submitter,
};
use claimflow_shared::{AppConfig, UserId};
use claimflow_store::{
    ApprovalService, InMemoryApprovalRepository, NotificationDispatcher, RuleCatalog,
    TracingNotificationSink,
};

/// A recorded approval session.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Free text logged before the run.
    #[serde(default)]
    pub description: Option<String>,
    /// Rules of the expense's company; validated on load.
    pub rules: Vec<ApprovalRule>,
    /// Who submits the claim.
    pub submitter: Submitter,
    /// The claim.
    pub expense: ExpenseSubmission,
    /// Decisions, applied in order.
    #[serde(default)]
    pub decisions: Vec<DecisionInput>,
    /// Fails the run if the claim ends in another status.
    #[serde(default)]
    pub expected_status: Option<ApprovalStatus>,
}

/// One approver action.
#[derive(Debug, Deserialize)]
pub struct DecisionInput {
    pub actor: UserId,
    pub decision: Decision,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Outcome of a replay.
#[derive(Debug)]
pub struct ReplayReport {
    /// Final state of the claim.
    pub approval: ExpenseApproval,
    /// Decisions the workflow accepted, replays included.
    pub applied: usize,
    /// Decisions the workflow refused.
    pub refused: usize,
}

/// Submits the scenario's claim and applies its decisions.
///
/// Refused decisions are logged and skipped so a scenario can show the
/// calls the workflow turns away.
pub async fn run(scenario: &Scenario, config: &AppConfig) -> anyhow::Result<ReplayReport> {
    let catalog = Arc::new(RuleCatalog::new());
    for rule in &scenario.rules {
        catalog.register(rule.clone());
    }
    let dispatcher =
        NotificationDispatcher::new(Arc::new(TracingNotificationSink), &config.notifications);
    let service = ApprovalService::new(
        Arc::new(InMemoryApprovalRepository::new()),
        catalog,
        dispatcher,
        &config.workflow,
    );

    let expense_id = scenario.expense.expense_id;
    service
        .submit(&scenario.expense, &scenario.submitter)
        .await
        .context("Submission failed")?;

    let mut applied = 0;
    let mut refused = 0;
    for (index, input) in scenario.decisions.iter().enumerate() {
        let call = index + 1;
        match service
            .decide(expense_id, input.actor, input.decision, input.comment.clone())
            .await
        {
            Ok(receipt) => {
                applied += 1;
                info!(
                    call,
                    actor = %input.actor,
                    status = %receipt.approval.status(),
                    approved_pct = receipt.approval.approval_percentage(),
                    replayed = receipt.replayed,
                    "decision applied"
                );
            }
            Err(e) => {
                refused += 1;
                warn!(call, actor = %input.actor, code = e.error_code(), error = %e, "decision refused");
            }
        }
    }

    let approval = service.approval(expense_id).await?;
    if let Some(expected) = scenario.expected_status
        && approval.status() != expected
    {
        bail!("expected claim to end {expected}, got {}", approval.status());
    }

    Ok(ReplayReport {
        approval,
        applied,
        refused,
    })
}
