use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::balance::{
    amount_in_cents, compute_balances, round_to_2_decimals, validate_expense, Balances,
};
use crate::error::{LedgerError, Result};
use crate::schemas::{new_id, Expense, Group, Member, MemberId, Notification};
use crate::settlement::{plan_settlement, Transaction};
use crate::store::{JoinOutcome, LedgerStore};

/// Notifications returned per listing.
pub const NOTIFICATION_LIMIT: usize = 10;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SpendingSummary {
    pub total_spent: f64,
    pub by_category: IndexMap<String, f64>,
}

/// Group bookkeeping on top of a [`LedgerStore`].
///
/// Nothing is cached: balances and plans are recomputed from the full expense
/// history on every call.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn register_member(&self, name: &str) -> Result<Member> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("member name must not be empty"));
        }
        let member = Member {
            id: new_id(),
            name: name.to_string(),
        };
        self.store.insert_member(member.clone()).await?;
        tracing::info!(member = %member.id, "registered member");
        Ok(member)
    }

    pub async fn get_member(&self, id: &str) -> Result<Member> {
        self.store
            .find_member(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("member {}", id)))
    }

    pub async fn list_members(&self) -> Result<Vec<Member>> {
        self.store.list_members().await
    }

    /// Creates a group from `creator` (when acting as a member) plus `members`.
    /// Duplicates are dropped; every id must belong to a registered member.
    pub async fn create_group(
        &self,
        name: &str,
        creator: Option<&str>,
        members: &[MemberId],
    ) -> Result<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("group name must not be empty"));
        }
        let mut ids: Vec<MemberId> = Vec::new();
        for id in creator.into_iter().chain(members.iter().map(String::as_str)) {
            if !ids.iter().any(|m| m == id) {
                ids.push(id.to_string());
            }
        }
        if ids.is_empty() {
            return Err(LedgerError::validation("a group needs at least one member"));
        }
        for id in &ids {
            self.get_member(id).await?;
        }
        let group = Group {
            id: new_id(),
            name: name.to_string(),
            members: ids,
        };
        self.store.insert_group(group.clone()).await?;
        tracing::info!(group = %group.id, members = group.members.len(), "created group");
        Ok(group)
    }

    pub async fn get_group(&self, id: &str) -> Result<Group> {
        self.store
            .find_group(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("group {}", id)))
    }

    pub async fn list_groups(&self, member: Option<&str>) -> Result<Vec<Group>> {
        self.store.list_groups(member).await
    }

    pub async fn join_group(&self, group_id: &str, member: &str) -> Result<Group> {
        self.get_member(member).await?;
        match self.store.add_group_member(group_id, member).await? {
            JoinOutcome::Joined => {
                tracing::info!(group = %group_id, member = %member, "member joined group");
                self.get_group(group_id).await
            }
            JoinOutcome::AlreadyMember => Err(LedgerError::Conflict(format!(
                "member {} already belongs to group {}",
                member, group_id
            ))),
            JoinOutcome::GroupMissing => {
                Err(LedgerError::not_found(format!("group {}", group_id)))
            }
        }
    }

    /// Records a regular expense split equally over the whole group.
    pub async fn add_expense(
        &self,
        group_id: &str,
        description: &str,
        amount: f64,
        payer: &str,
        category: Option<String>,
    ) -> Result<Expense> {
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerError::validation("description must not be empty"));
        }
        let group = self.get_group(group_id).await?;
        if !group.has_member(payer) {
            return Err(LedgerError::not_found(format!(
                "member {} in group {}",
                payer, group_id
            )));
        }
        amount_in_cents(amount)?;
        let expense = Expense::equal_split(
            &group,
            description.to_string(),
            amount,
            payer.to_string(),
            category,
        );
        validate_expense(&expense)?;
        self.store.insert_expense(expense.clone()).await?;
        tracing::info!(
            group = %group_id,
            expense = %expense.id,
            amount = expense.amount,
            "added expense"
        );

        let payer_name = self.display_name(payer).await?;
        for member in group.members.iter().filter(|m| *m != payer) {
            let message = format!(
                "{} added \"{}\" ({:.2}) in {}",
                payer_name, expense.description, expense.amount, group.name
            );
            self.notify(member, message).await?;
        }
        Ok(expense)
    }

    pub async fn list_expenses(&self, group_id: &str) -> Result<Vec<Expense>> {
        self.get_group(group_id).await?;
        self.store.list_expenses(group_id).await
    }

    pub async fn compute_balances(&self, group_id: &str) -> Result<Balances> {
        let group = self.get_group(group_id).await?;
        let expenses = self.store.list_expenses(group_id).await?;
        Ok(compute_balances(&group, &expenses))
    }

    pub async fn plan_settlement(&self, group_id: &str) -> Result<Vec<Transaction>> {
        let balances = self.compute_balances(group_id).await?;
        Ok(plan_settlement(&balances))
    }

    /// Appends a settlement record for `payer` paying `payee`.
    ///
    /// Any positive amount is accepted, even one larger than what is currently owed.
    pub async fn record_settlement(
        &self,
        group_id: &str,
        payer: &str,
        payee: &str,
        amount: f64,
    ) -> Result<Expense> {
        // Sub-cent amounts round to nothing and are rejected like zero.
        let cents = amount_in_cents(amount)?;
        if cents == 0 {
            return Err(LedgerError::validation("settlement amount must be positive"));
        }
        let group = self.get_group(group_id).await?;
        for member in [payer, payee] {
            if !group.has_member(member) {
                return Err(LedgerError::not_found(format!(
                    "member {} in group {}",
                    member, group_id
                )));
            }
        }
        if payer == payee {
            return Err(LedgerError::validation(
                "payer and payee must be different members",
            ));
        }
        let expense = Expense::settlement(
            group.id.clone(),
            payer.to_string(),
            payee.to_string(),
            cents as f64 / 100.0,
        );
        validate_expense(&expense)?;
        self.store.insert_expense(expense.clone()).await?;
        tracing::info!(
            group = %group_id,
            payer = %payer,
            payee = %payee,
            amount = expense.amount,
            "recorded settlement"
        );

        let payer_name = self.display_name(payer).await?;
        let message = format!(
            "{} paid you {:.2} in {}",
            payer_name, expense.amount, group.name
        );
        self.notify(payee, message).await?;
        Ok(expense)
    }

    /// Totals regular expenses per category, in the order categories first appear.
    pub async fn spending_summary(&self, group_id: &str) -> Result<SpendingSummary> {
        let expenses = self.list_expenses(group_id).await?;
        let mut by_category: IndexMap<String, f64> = IndexMap::new();
        for expense in expenses.iter().filter(|e| !e.is_settlement()) {
            *by_category.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
        }
        for total in by_category.values_mut() {
            *total = round_to_2_decimals(*total);
        }
        let total_spent = round_to_2_decimals(by_category.values().sum());
        Ok(SpendingSummary {
            total_spent,
            by_category,
        })
    }

    pub async fn notifications(&self, member: &str) -> Result<Vec<Notification>> {
        self.store
            .list_notifications(member, NOTIFICATION_LIMIT)
            .await
    }

    pub async fn mark_notification_read(&self, id: &str, member: &str) -> Result<()> {
        if self.store.mark_notification_read(id, member).await? {
            Ok(())
        } else {
            Err(LedgerError::not_found(format!("notification {}", id)))
        }
    }

    /// Creates three members and a group holding them when the store has no members yet.
    pub async fn seed_if_empty(&self) -> Result<bool> {
        if self.store.count_members().await? > 0 {
            tracing::info!("store already has data, skipping demo seed");
            return Ok(false);
        }
        let mut ids = Vec::new();
        for name in ["Arushi", "Rahul", "Sneha"] {
            ids.push(self.register_member(name).await?.id);
        }
        self.create_group("Chemical Engineers", None, &ids).await?;
        tracing::info!("seeded demo members and group");
        Ok(true)
    }

    async fn display_name(&self, member: &str) -> Result<String> {
        Ok(self
            .store
            .find_member(member)
            .await?
            .map(|m| m.name)
            .unwrap_or_else(|| member.to_string()))
    }

    async fn notify(&self, member: &str, message: String) -> Result<()> {
        self.store
            .insert_notification(Notification::new(member.to_string(), message))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::EPSILON;
    use crate::store::InMemoryStore;

    struct Fixture {
        ledger: Ledger,
        group: Group,
        a: MemberId,
        b: MemberId,
        c: MemberId,
    }

    async fn fixture() -> Fixture {
        let ledger = Ledger::new(Arc::new(InMemoryStore::new()));
        let a = ledger.register_member("Arushi").await.unwrap().id;
        let b = ledger.register_member("Rahul").await.unwrap().id;
        let c = ledger.register_member("Sneha").await.unwrap().id;
        let group = ledger
            .create_group("Trip", Some(&a), &[b.clone(), c.clone()])
            .await
            .unwrap();
        Fixture {
            ledger,
            group,
            a,
            b,
            c,
        }
    }

    fn tx(from: &str, to: &str, amount: f64) -> Transaction {
        Transaction {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        }
    }

    #[tokio::test]
    async fn expense_then_settlement_scenario() {
        let f = fixture().await;
        let g = &f.group.id;
        f.ledger.add_expense(g, "Hotel", 90.0, &f.a, None).await.unwrap();

        let balances = f.ledger.compute_balances(g).await.unwrap();
        assert_eq!(balances[&f.a], 60.0);
        assert_eq!(balances[&f.b], -30.0);
        assert_eq!(balances[&f.c], -30.0);
        assert_eq!(
            f.ledger.plan_settlement(g).await.unwrap(),
            vec![tx(&f.b, &f.a, 30.0), tx(&f.c, &f.a, 30.0)]
        );

        let settlement = f.ledger.record_settlement(g, &f.b, &f.a, 30.0).await.unwrap();
        assert!(settlement.is_settlement());

        let balances = f.ledger.compute_balances(g).await.unwrap();
        assert_eq!(balances[&f.a], 30.0);
        assert_eq!(balances[&f.b], 0.0);
        assert_eq!(balances[&f.c], -30.0);
        assert_eq!(
            f.ledger.plan_settlement(g).await.unwrap(),
            vec![tx(&f.c, &f.a, 30.0)]
        );
    }

    #[tokio::test]
    async fn recording_every_planned_transaction_settles_the_group() {
        let f = fixture().await;
        let g = &f.group.id;
        f.ledger.add_expense(g, "Fuel", 100.0, &f.a, None).await.unwrap();
        f.ledger.add_expense(g, "Food", 47.11, &f.b, Some("Food".into())).await.unwrap();
        f.ledger.add_expense(g, "Tickets", 212.9, &f.c, Some("Travel".into())).await.unwrap();
        f.ledger.record_settlement(g, &f.a, &f.c, 5.0).await.unwrap();

        let plan = f.ledger.plan_settlement(g).await.unwrap();
        assert_eq!(plan, f.ledger.plan_settlement(g).await.unwrap());
        for t in &plan {
            f.ledger.record_settlement(g, &t.from, &t.to, t.amount).await.unwrap();
        }

        let balances = f.ledger.compute_balances(g).await.unwrap();
        assert!(balances.values().all(|b| b.abs() <= EPSILON), "{:?}", balances);
        assert!(f.ledger.plan_settlement(g).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_invalid_settlements() {
        let f = fixture().await;
        let g = &f.group.id;
        for amount in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                f.ledger.record_settlement(g, &f.b, &f.a, amount).await,
                Err(LedgerError::Validation(_))
            ));
        }
        assert!(matches!(
            f.ledger.record_settlement("missing", &f.b, &f.a, 10.0).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            f.ledger.record_settlement(g, "stranger", &f.a, 10.0).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            f.ledger.record_settlement(g, &f.a, &f.a, 10.0).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(f.ledger.list_expenses(g).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sub_cent_settlements_are_rejected_without_side_effects() {
        let f = fixture().await;
        let g = &f.group.id;
        for amount in [0.004, 0.0049, 1e-9] {
            assert!(matches!(
                f.ledger.record_settlement(g, &f.b, &f.a, amount).await,
                Err(LedgerError::Validation(_))
            ));
        }
        assert!(f.ledger.list_expenses(g).await.unwrap().is_empty());
        assert!(f.ledger.notifications(&f.a).await.unwrap().is_empty());

        let half_cent = f.ledger.record_settlement(g, &f.b, &f.a, 0.005).await.unwrap();
        assert_eq!(half_cent.amount, 0.01);
    }

    #[tokio::test]
    async fn amounts_beyond_cent_range_are_rejected() {
        let f = fixture().await;
        let g = &f.group.id;
        for amount in [1e20, 1e17, f64::INFINITY] {
            assert!(matches!(
                f.ledger.add_expense(g, "Yacht", amount, &f.a, None).await,
                Err(LedgerError::Validation(_))
            ));
            assert!(matches!(
                f.ledger.record_settlement(g, &f.b, &f.a, amount).await,
                Err(LedgerError::Validation(_))
            ));
        }
        assert!(f.ledger.list_expenses(g).await.unwrap().is_empty());
        let balances = f.ledger.compute_balances(g).await.unwrap();
        assert!(balances.values().all(|b| *b == 0.0));
    }

    #[tokio::test]
    async fn over_settlement_flips_the_debt() {
        let f = fixture().await;
        let g = &f.group.id;
        f.ledger.add_expense(g, "Hotel", 90.0, &f.a, None).await.unwrap();
        f.ledger.record_settlement(g, &f.b, &f.a, 50.0).await.unwrap();

        let balances = f.ledger.compute_balances(g).await.unwrap();
        assert_eq!(balances[&f.a], 10.0);
        assert_eq!(balances[&f.b], 20.0);
        assert_eq!(balances[&f.c], -30.0);
    }

    #[tokio::test]
    async fn add_expense_validates_input() {
        let f = fixture().await;
        let g = &f.group.id;
        assert!(matches!(
            f.ledger.add_expense(g, "  ", 10.0, &f.a, None).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            f.ledger.add_expense(g, "Snacks", -3.0, &f.a, None).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            f.ledger.add_expense(g, "Snacks", 3.0, "stranger", None).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            f.ledger.add_expense("missing", "Snacks", 3.0, &f.a, None).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn groups_include_creator_and_reject_double_joins() {
        let f = fixture().await;
        assert_eq!(f.group.members, vec![f.a.clone(), f.b.clone(), f.c.clone()]);

        let d = f.ledger.register_member("Dev").await.unwrap().id;
        let joined = f.ledger.join_group(&f.group.id, &d).await.unwrap();
        assert_eq!(joined.members.last(), Some(&d));
        assert!(matches!(
            f.ledger.join_group(&f.group.id, &d).await,
            Err(LedgerError::Conflict(_))
        ));
        assert!(matches!(
            f.ledger.join_group("missing", &d).await,
            Err(LedgerError::NotFound(_))
        ));

        let solo = f.ledger.create_group("Solo", Some(&d), &[d.clone()]).await.unwrap();
        assert_eq!(solo.members, vec![d.clone()]);
        assert_eq!(f.ledger.list_groups(Some(&d)).await.unwrap().len(), 2);
        assert!(matches!(
            f.ledger.create_group("Ghosts", None, &["nobody".to_string()]).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            f.ledger.create_group("Empty", None, &[]).await,
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn summary_excludes_settlements() {
        let f = fixture().await;
        let g = &f.group.id;
        f.ledger.add_expense(g, "Pizza", 30.0, &f.a, Some("Food".into())).await.unwrap();
        f.ledger.add_expense(g, "Cab", 12.5, &f.b, Some("Travel".into())).await.unwrap();
        f.ledger.add_expense(g, "Sushi", 20.25, &f.c, Some("Food".into())).await.unwrap();
        f.ledger.add_expense(g, "Soap", 4.0, &f.c, None).await.unwrap();
        f.ledger.record_settlement(g, &f.b, &f.a, 10.0).await.unwrap();

        let summary = f.ledger.spending_summary(g).await.unwrap();
        assert_eq!(summary.total_spent, 66.75);
        let categories: Vec<_> = summary
            .by_category
            .iter()
            .map(|(c, t)| (c.as_str(), *t))
            .collect();
        assert_eq!(categories, vec![("Food", 50.25), ("Travel", 12.5), ("Other", 4.0)]);
    }

    #[tokio::test]
    async fn notifies_other_members_and_payees() {
        let f = fixture().await;
        let g = &f.group.id;
        f.ledger.add_expense(g, "Hotel", 90.0, &f.a, None).await.unwrap();
        f.ledger.record_settlement(g, &f.b, &f.a, 30.0).await.unwrap();

        let for_a = f.ledger.notifications(&f.a).await.unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].message, "Rahul paid you 30.00 in Trip");

        let for_b = f.ledger.notifications(&f.b).await.unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].message, "Arushi added \"Hotel\" (90.00) in Trip");
        assert!(!for_b[0].read);

        assert!(matches!(
            f.ledger.mark_notification_read(&for_b[0].id, &f.a).await,
            Err(LedgerError::NotFound(_))
        ));
        f.ledger.mark_notification_read(&for_b[0].id, &f.b).await.unwrap();
        assert!(f.ledger.notifications(&f.b).await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn notification_listing_is_capped() {
        let f = fixture().await;
        for i in 0..12 {
            let description = format!("Round {}", i);
            f.ledger
                .add_expense(&f.group.id, &description, 3.0, &f.a, None)
                .await
                .unwrap();
        }
        let notes = f.ledger.notifications(&f.b).await.unwrap();
        assert_eq!(notes.len(), NOTIFICATION_LIMIT);
        assert!(notes[0].message.contains("Round 11"));
    }

    #[tokio::test]
    async fn seeds_only_an_empty_store() {
        let ledger = Ledger::new(Arc::new(InMemoryStore::new()));
        assert!(ledger.seed_if_empty().await.unwrap());
        assert!(!ledger.seed_if_empty().await.unwrap());
        assert_eq!(ledger.list_members().await.unwrap().len(), 3);
        let groups = ledger.list_groups(None).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
    }
}
