//! Property-based tests for ApprovalStepEvaluator.
//!
//! These tests pin down the quorum arithmetic and required-step policy
//! independently of how the engine sequences steps.

use claimflow_shared::UserId;
use proptest::prelude::*;

use crate::workflow::evaluator::{ApprovalStepEvaluator, StepOutcome};
use crate::workflow::rule::ApprovalStep;
use crate::workflow::types::{ApprovalStatus, RejectionReason, StepDecision};

/// Strategy for a claim decided up to some step: `(required flags, statuses, decided_step)`.
///
/// Steps before and including `decided_step` are decided, later ones Pending,
/// mirroring the engine's strictly sequential progress.
fn arb_progress() -> impl Strategy<Value = (Vec<bool>, Vec<ApprovalStatus>, u32)> {
    (1usize..=8).prop_flat_map(|len| {
        (
            prop::collection::vec(any::<bool>(), len),
            prop::collection::vec(any::<bool>(), len),
            1..=len,
        )
            .prop_map(|(required, approvals, decided)| {
                let statuses = approvals
                    .iter()
                    .enumerate()
                    .map(|(i, &approved)| match (i < decided, approved) {
                        (false, _) => ApprovalStatus::Pending,
                        (true, true) => ApprovalStatus::Approved,
                        (true, false) => ApprovalStatus::Rejected,
                    })
                    .collect();
                (required, statuses, u32::try_from(decided).unwrap())
            })
    })
}

/// Strategy for an optional quorum threshold.
fn arb_threshold() -> impl Strategy<Value = Option<u8>> {
    prop_oneof![Just(None), (1u8..=100).prop_map(Some)]
}

fn build(required: &[bool], statuses: &[ApprovalStatus]) -> (Vec<ApprovalStep>, Vec<StepDecision>) {
    required
        .iter()
        .zip(statuses)
        .zip(1u32..)
        .map(|((&is_required, &status), step_order)| {
            let approver_id = UserId::new();
            let mut decision = StepDecision::pending(step_order, approver_id);
            decision.status = status;
            (
                ApprovalStep {
                    step_order,
                    approver_id,
                    is_required,
                },
                decision,
            )
        })
        .unzip()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any rejected required step vetoes the claim, whatever the threshold.
    #[test]
    fn prop_required_rejection_is_absolute_veto(
        (required, statuses, decided) in arb_progress(),
        threshold in arb_threshold(),
    ) {
        let (steps, decisions) = build(&required, &statuses);
        let first_veto = steps
            .iter()
            .zip(&decisions)
            .find(|(s, d)| s.is_required && d.status == ApprovalStatus::Rejected)
            .map(|(s, _)| s.step_order);

        let outcome = ApprovalStepEvaluator::evaluate(&steps, &decisions, threshold, decided);

        if let Some(step_order) = first_veto {
            prop_assert_eq!(
                outcome,
                StepOutcome::Rejected(RejectionReason::RequiredStepRejected { step_order })
            );
        } else {
            let is_veto = matches!(
                outcome,
                StepOutcome::Rejected(RejectionReason::RequiredStepRejected { .. })
            );
            prop_assert!(!is_veto);
        }
    }

    /// Continue always points forward, at a step that is still Pending.
    #[test]
    fn prop_continue_moves_forward_to_pending_step(
        (required, statuses, decided) in arb_progress(),
        threshold in arb_threshold(),
    ) {
        let (steps, decisions) = build(&required, &statuses);

        if let StepOutcome::Continue(next) =
            ApprovalStepEvaluator::evaluate(&steps, &decisions, threshold, decided)
        {
            prop_assert!(next > decided);
            prop_assert_eq!(decisions[next as usize - 1].status, ApprovalStatus::Pending);
        }
    }

    /// With a threshold, Approved happens exactly when the quorum is met and
    /// no required step rejected.
    #[test]
    fn prop_threshold_approval_matches_quorum(
        (required, statuses, decided) in arb_progress(),
        percentage in 1u8..=100,
    ) {
        let (steps, decisions) = build(&required, &statuses);
        let approved = statuses.iter().filter(|s| **s == ApprovalStatus::Approved).count();
        let vetoed = ApprovalStepEvaluator::required_rejection(&steps, &decisions).is_some();

        let outcome = ApprovalStepEvaluator::evaluate(&steps, &decisions, Some(percentage), decided);

        let expected = !vetoed
            && ApprovalStepEvaluator::meets_threshold(approved, statuses.len(), percentage);
        prop_assert_eq!(outcome == StepOutcome::Approved, expected);
    }

    /// Without a threshold, a rule with required steps is Approved exactly
    /// when every required step approved.
    #[test]
    fn prop_no_threshold_approval_needs_every_required_step(
        (required, statuses, decided) in arb_progress(),
    ) {
        prop_assume!(required.iter().any(|r| *r));
        let (steps, decisions) = build(&required, &statuses);

        let outcome = ApprovalStepEvaluator::evaluate(&steps, &decisions, None, decided);

        let all_required_approved = required
            .iter()
            .zip(&statuses)
            .filter(|(r, _)| **r)
            .all(|(_, s)| *s == ApprovalStatus::Approved);
        prop_assert_eq!(outcome == StepOutcome::Approved, all_required_approved);
    }

    /// The threshold check agrees with exact rational comparison.
    #[test]
    fn prop_meets_threshold_is_exact(
        total in 1usize..=50,
        approved_seed in 0usize..=50,
        percentage in 1u8..=100,
    ) {
        let approved = approved_seed.min(total);
        let met = ApprovalStepEvaluator::meets_threshold(approved, total, percentage);
        // approved / total >= percentage / 100, cross-multiplied in u128
        let exact = (approved as u128) * 100 >= u128::from(percentage) * (total as u128);
        prop_assert_eq!(met, exact);
    }

    /// More approvals never lose a quorum that fewer approvals reached.
    #[test]
    fn prop_meets_threshold_is_monotone(
        total in 1usize..=50,
        approved_seed in 0usize..50,
        percentage in 1u8..=100,
    ) {
        let approved = approved_seed.min(total - 1);
        if ApprovalStepEvaluator::meets_threshold(approved, total, percentage) {
            prop_assert!(ApprovalStepEvaluator::meets_threshold(approved + 1, total, percentage));
        }
    }

    /// The displayed percentage never overstates the quorum check.
    #[test]
    fn prop_displayed_percentage_is_floor(
        total in 1usize..=50,
        approved_seed in 0usize..=50,
    ) {
        let approved = approved_seed.min(total);
        let shown = ApprovalStepEvaluator::approval_percentage(approved, total);
        prop_assert!(ApprovalStepEvaluator::meets_threshold(approved, total, shown.max(1)) || shown == 0);
        prop_assert!(shown <= 100);
    }
}
