//! Property-based tests for ApprovalWorkflowEngine.
//!
//! Each case builds a random rule, then lets the current approver act with a
//! random verdict until the claim is terminal, checking the state machine's
//! invariants after every transition.

use claimflow_shared::{CompanyId, ExpenseId, UserId};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use crate::workflow::engine::{ApprovalWorkflowEngine, ExpenseApproval};
use crate::workflow::error::WorkflowError;
use crate::workflow::evaluator::ApprovalStepEvaluator;
use crate::workflow::rule::{ApprovalRule, ApprovalStep, NewApprovalRule};
use crate::workflow::types::{ApprovalStatus, Decision, ExpenseSubmission, RejectionReason};

/// Strategy for generating random decisions.
fn arb_decision() -> impl Strategy<Value = Decision> {
    prop_oneof![3 => Just(Decision::Approve), 1 => Just(Decision::Reject)]
}

/// Strategy for `(required flags, threshold, verdicts)`; one verdict per step
/// so every run can reach a terminal state.
fn arb_run() -> impl Strategy<Value = (Vec<bool>, Option<u8>, Vec<Decision>)> {
    (1usize..=8).prop_flat_map(|len| {
        (
            prop::collection::vec(any::<bool>(), len),
            prop_oneof![Just(None), (1u8..=100).prop_map(Some)],
            prop::collection::vec(arb_decision(), len),
        )
    })
}

fn start(required: &[bool], threshold: Option<u8>) -> ExpenseApproval {
    let company_id = CompanyId::new();
    let rule = ApprovalRule::new(NewApprovalRule {
        id: None,
        company_id,
        name: "Generated".to_string(),
        description: None,
        is_manager_default_approver: false,
        min_approval_percentage: threshold,
        priority: 0,
        categories: vec![],
        min_amount: None,
        max_amount: None,
        steps: required
            .iter()
            .zip(1u32..)
            .map(|(&is_required, step_order)| ApprovalStep {
                step_order,
                approver_id: UserId::new(),
                is_required,
            })
            .collect(),
    })
    .unwrap();
    let expense = ExpenseSubmission {
        expense_id: ExpenseId::new(),
        company_id,
        submitter_id: UserId::new(),
        amount: dec!(99.95),
        currency: "USD".to_string(),
        category: "Office".to_string(),
    };
    ApprovalWorkflowEngine::start(&expense, &rule)
}

/// Drives a claim to completion, returning every intermediate state.
fn drive(approval: ExpenseApproval, verdicts: &[Decision]) -> Vec<ExpenseApproval> {
    let mut states = vec![approval];
    for verdict in verdicts {
        let current = states.last().unwrap();
        let Some(actor) = current.current_approver() else {
            break;
        };
        let next = ApprovalWorkflowEngine::record_decision(current, actor, *verdict, None).unwrap();
        states.push(next);
    }
    states
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every run terminates within one decision per step.
    #[test]
    fn prop_runs_terminate((required, threshold, verdicts) in arb_run()) {
        let states = drive(start(&required, threshold), &verdicts);
        let last = states.last().unwrap();
        prop_assert!(last.is_finalized());
        prop_assert!(states.len() <= required.len() + 1);
    }

    /// currentStepOrder never decreases.
    #[test]
    fn prop_current_step_is_monotone((required, threshold, verdicts) in arb_run()) {
        let states = drive(start(&required, threshold), &verdicts);
        for pair in states.windows(2) {
            prop_assert!(pair[1].current_step_order() >= pair[0].current_step_order());
        }
    }

    /// Decisions are only ever made in ascending step order, and nothing is
    /// decided after the step that finalized the claim.
    #[test]
    fn prop_history_is_a_prefix_walk((required, threshold, verdicts) in arb_run()) {
        let states = drive(start(&required, threshold), &verdicts);
        let last = states.last().unwrap();
        let decided: Vec<u32> = last.decision_history().map(|d| d.step_order).collect();
        prop_assert!(decided.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(decided.iter().all(|o| *o <= last.current_step_order()));
        prop_assert_eq!(decided.last().copied(), Some(last.current_step_order()));
    }

    /// Without a threshold, the claim is Approved iff every required step
    /// approved, and a required rejection stops the claim on the spot.
    #[test]
    fn prop_no_threshold_outcome(
        (required, _threshold, verdicts) in arb_run(),
    ) {
        prop_assume!(required.iter().any(|r| *r));
        let states = drive(start(&required, None), &verdicts);
        let last = states.last().unwrap();

        let required_approved = last
            .rule()
            .steps
            .iter()
            .zip(last.decisions())
            .filter(|(s, _)| s.is_required)
            .all(|(_, d)| d.status == ApprovalStatus::Approved);

        prop_assert_eq!(last.status() == ApprovalStatus::Approved, required_approved);
        if let Some(RejectionReason::RequiredStepRejected { step_order }) = last.rejection_reason() {
            prop_assert_eq!(step_order, last.current_step_order());
        }
    }

    /// With a threshold, Approved implies the quorum was met without a veto.
    #[test]
    fn prop_threshold_outcome(
        (required, _threshold, verdicts) in arb_run(),
        percentage in 1u8..=100,
    ) {
        let states = drive(start(&required, Some(percentage)), &verdicts);
        let last = states.last().unwrap();
        let total = last.decisions().len();

        if last.status() == ApprovalStatus::Approved {
            prop_assert!(ApprovalStepEvaluator::meets_threshold(last.approved_count(), total, percentage));
            prop_assert!(ApprovalStepEvaluator::required_rejection(&last.rule().steps, last.decisions()).is_none());
        }
        // Every earlier state was still short of the quorum.
        for state in &states[..states.len() - 1] {
            prop_assert!(!ApprovalStepEvaluator::meets_threshold(state.approved_count(), total, percentage));
        }
    }

    /// Replaying an already-recorded decision fails and leaves totals alone.
    #[test]
    fn prop_replay_does_not_change_totals((required, threshold, verdicts) in arb_run()) {
        let states = drive(start(&required, threshold), &verdicts);
        for pair in states.windows(2) {
            let (before, after) = (&pair[0], &pair[1]);
            let recorded = after
                .decision_history()
                .find(|d| d.step_order == before.current_step_order())
                .unwrap();
            let verdict = if recorded.status == ApprovalStatus::Approved {
                Decision::Approve
            } else {
                Decision::Reject
            };

            let replay = ApprovalWorkflowEngine::record_decision(after, recorded.approver_id, verdict, None);
            prop_assert!(replay.is_err());
            prop_assert_eq!(after.decision_history().count(), before.decision_history().count() + 1);
        }
    }

    /// Anyone but the current approver is turned away.
    #[test]
    fn prop_only_current_approver_may_act((required, threshold, _verdicts) in arb_run()) {
        let approval = start(&required, threshold);
        let current = approval.current_step_order();

        for step in approval.rule().steps.iter().filter(|s| s.step_order != current) {
            let result = ApprovalWorkflowEngine::record_decision(&approval, step.approver_id, Decision::Approve, None);
            let is_not_current = matches!(
                result,
                Err(WorkflowError::NotCurrentApprover { step_order, .. }) if step_order == current
            );
            prop_assert!(is_not_current);
        }
    }

    /// Terminal claims accept nothing further.
    #[test]
    fn prop_terminal_claims_are_frozen((required, threshold, verdicts) in arb_run()) {
        let states = drive(start(&required, threshold), &verdicts);
        let last = states.last().unwrap();

        for step in &last.rule().steps {
            let result = ApprovalWorkflowEngine::record_decision(last, step.approver_id, Decision::Approve, None);
            let is_finalized = matches!(result, Err(WorkflowError::AlreadyFinalized { .. }));
            prop_assert!(is_finalized);
        }
    }
}
