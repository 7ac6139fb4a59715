use indexmap::IndexMap;

use crate::error::{LedgerError, Result};
use crate::schemas::{Expense, Group, MemberId};

/// Member id -> signed balance, in group-membership order.
/// Positive means the member is owed money, negative means they owe.
pub type Balances = IndexMap<MemberId, f64>;

/// Tolerance below which an amount is considered settled.
pub const EPSILON: f64 = 0.01;

pub fn round_to_2_decimals(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

pub fn compute_balances(group: &Group, expenses: &[Expense]) -> Balances {
    let mut balances: Balances = group.members.iter().map(|m| (m.clone(), 0.0)).collect();
    for expense in expenses.iter().filter(|e| e.group_id == group.id) {
        match balances.get_mut(&expense.payer) {
            Some(balance) => *balance += expense.amount,
            None => tracing::debug!(
                expense = %expense.id,
                payer = %expense.payer,
                "skipping payer outside of group"
            ),
        }
        for split in &expense.split_details {
            match balances.get_mut(&split.member) {
                Some(balance) => *balance -= split.amount_owed,
                None => tracing::debug!(
                    expense = %expense.id,
                    member = %split.member,
                    "skipping split entry outside of group"
                ),
            }
        }
    }
    for balance in balances.values_mut() {
        *balance = round_to_2_decimals(*balance);
    }
    balances
}

/// Converts a non-negative amount to whole cents, rejecting values that do not fit in `i64`.
pub fn amount_in_cents(amount: f64) -> Result<i64> {
    let cents = (amount * 100.0).round();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if !cents.is_finite() || cents < 0.0 || cents >= i64::MAX as f64 {
        return Err(LedgerError::validation(
            "amount must be a non-negative number within range",
        ));
    }
    Ok(cents as i64)
}

/// Rejects expenses whose split does not add up to the amount.
pub fn validate_expense(expense: &Expense) -> Result<()> {
    if !expense.amount.is_finite() || expense.amount < 0.0 {
        return Err(LedgerError::validation(
            "amount must be a non-negative number",
        ));
    }
    if expense.split_details.is_empty() {
        return Err(LedgerError::validation("expense has no split details"));
    }
    if expense
        .split_details
        .iter()
        .any(|s| !s.amount_owed.is_finite() || s.amount_owed < 0.0)
    {
        return Err(LedgerError::validation(
            "split amounts must be non-negative numbers",
        ));
    }
    let split_total: f64 = expense.split_details.iter().map(|s| s.amount_owed).sum();
    if (split_total - expense.amount).abs() > EPSILON {
        return Err(LedgerError::validation(format!(
            "split total {:.2} does not match amount {:.2}",
            split_total, expense.amount
        )));
    }
    Ok(())
}
