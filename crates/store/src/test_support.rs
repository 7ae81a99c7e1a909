use claimflow_core::workflow::{
    ApprovalRule, ApprovalStep, ApprovalWorkflowEngine, ExpenseApproval, ExpenseSubmission,
    NewApprovalRule,
};
use claimflow_shared::{CompanyId, ExpenseId, UserId};
use rust_decimal_macros::dec;

pub fn users<const N: usize>() -> [UserId; N] {
    std::array::from_fn(|_| UserId::new())
}

pub fn expense(company_id: CompanyId, submitter_id: UserId) -> ExpenseSubmission {
    ExpenseSubmission {
        expense_id: ExpenseId::new(),
        company_id,
        submitter_id,
        amount: dec!(240.00),
        currency: "USD".to_string(),
        category: "Travel".to_string(),
    }
}

pub fn rule(
    company_id: CompanyId,
    percentage: Option<u8>,
    steps: &[(UserId, bool)],
) -> ApprovalRule {
    ApprovalRule::new(NewApprovalRule {
        id: None,
        company_id,
        name: "Travel approvals".to_string(),
        description: None,
        is_manager_default_approver: false,
        min_approval_percentage: percentage,
        priority: 10,
        categories: vec![],
        min_amount: None,
        max_amount: None,
        steps: steps
            .iter()
            .zip(1u32..)
            .map(|(&(approver_id, is_required), step_order)| ApprovalStep {
                step_order,
                approver_id,
                is_required,
            })
            .collect(),
    })
    .unwrap()
}

pub fn started(steps: &[(UserId, bool)]) -> ExpenseApproval {
    let company_id = CompanyId::new();
    let rule = rule(company_id, None, steps);
    ApprovalWorkflowEngine::start(&expense(company_id, UserId::new()), &rule)
}
