use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type MemberId = String;
pub type GroupId = String;

/// Description that marks an expense as a recorded payoff between two members.
pub const SETTLEMENT_DESCRIPTION: &str = "Settlement";
pub const DEFAULT_CATEGORY: &str = "Other";

pub fn new_id() -> String {
    ObjectId::new().to_hex()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub members: Vec<MemberId>,
}

impl Group {
    pub fn has_member(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SplitDetail {
    pub member: MemberId,
    pub amount_owed: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub payer: MemberId,
    pub group_id: GroupId,
    #[serde(default = "default_category")]
    pub category: String,
    pub split_details: Vec<SplitDetail>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Builds a regular expense split equally over every member of `group`.
    ///
    /// The amount is handled in whole cents: each member owes `total / n` cents and the
    /// first `total % n` members (in membership order) carry one extra cent, so the split
    /// always adds up to the rounded amount. The payer carries their own share.
    pub fn equal_split(
        group: &Group,
        description: String,
        amount: f64,
        payer: MemberId,
        category: Option<String>,
    ) -> Expense {
        let total_cents = (amount * 100.0).round() as i64;
        let count = group.members.len() as i64;
        let split_details = if count == 0 {
            Vec::new()
        } else {
            let base = total_cents / count;
            let remainder = total_cents % count;
            group
                .members
                .iter()
                .enumerate()
                .map(|(index, member)| {
                    let extra = if (index as i64) < remainder { 1 } else { 0 };
                    SplitDetail {
                        member: member.clone(),
                        amount_owed: (base + extra) as f64 / 100.0,
                    }
                })
                .collect()
        };
        Expense {
            id: new_id(),
            description,
            amount: total_cents as f64 / 100.0,
            payer,
            group_id: group.id.clone(),
            category: category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(default_category),
            split_details,
            created_at: Utc::now(),
        }
    }

    /// Builds the ledger record for `payer` handing `amount` over to `payee`.
    pub fn settlement(group_id: GroupId, payer: MemberId, payee: MemberId, amount: f64) -> Expense {
        Expense {
            id: new_id(),
            description: SETTLEMENT_DESCRIPTION.to_string(),
            amount,
            payer,
            group_id,
            category: default_category(),
            split_details: vec![SplitDetail {
                member: payee,
                amount_owed: amount,
            }],
            created_at: Utc::now(),
        }
    }

    pub fn is_settlement(&self) -> bool {
        self.description == SETTLEMENT_DESCRIPTION
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Notification {
    pub id: String,
    pub member: MemberId,
    pub message: String,
    pub read: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(member: MemberId, message: String) -> Notification {
        Notification {
            id: new_id(),
            member,
            message,
            read: false,
            created_at: Utc::now(),
        }
    }
}
