use serde::{Deserialize, Serialize};

use crate::balance::{round_to_2_decimals, Balances, EPSILON};
use crate::schemas::MemberId;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Transaction {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: f64,
}

#[derive(Clone, Debug)]
struct PersonalBalance {
    id: MemberId,
    remaining: f64,
}

/// Greedy two-pointer matching of debtors against creditors.
///
/// Both sides are visited in the iteration order of `balances` (group-membership
/// order), so the same ledger always produces the same plan. Which debtor ends up
/// paying which creditor depends on that order; the totals do not.
pub fn plan_settlement(balances: &Balances) -> Vec<Transaction> {
    let mut debtors = Vec::new();
    let mut creditors = Vec::new();
    for (id, &balance) in balances {
        if balance < -EPSILON {
            debtors.push(PersonalBalance {
                id: id.clone(),
                remaining: -balance,
            });
        } else if balance > EPSILON {
            creditors.push(PersonalBalance {
                id: id.clone(),
                remaining: balance,
            });
        }
    }

    let mut transactions = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < debtors.len() && j < creditors.len() {
        let debtor = &mut debtors[i];
        let creditor = &mut creditors[j];
        let amount = round_to_2_decimals(debtor.remaining.min(creditor.remaining));
        if amount > 0.0 {
            transactions.push(Transaction {
                from: debtor.id.clone(),
                to: creditor.id.clone(),
                amount,
            });
        }
        debtor.remaining -= amount;
        creditor.remaining -= amount;
        if debtor.remaining.abs() <= EPSILON {
            i += 1;
        }
        if creditor.remaining.abs() <= EPSILON {
            j += 1;
        }
    }
    tracing::debug!(
        debtors = debtors.len(),
        creditors = creditors.len(),
        transactions = transactions.len(),
        "planned settlement"
    );
    transactions
}
