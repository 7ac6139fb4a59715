use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{JoinOutcome, LedgerStore};
use crate::error::Result;
use crate::schemas::{Expense, Group, Member, Notification};

#[derive(Default)]
struct Collections {
    members: Vec<Member>,
    groups: Vec<Group>,
    expenses: Vec<Expense>,
    notifications: Vec<Notification>,
}

/// Store kept in process memory, used for tests and for running without MongoDB.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_member(&self, member: Member) -> Result<()> {
        self.collections.write().await.members.push(member);
        Ok(())
    }

    async fn find_member(&self, id: &str) -> Result<Option<Member>> {
        let collections = self.collections.read().await;
        Ok(collections.members.iter().find(|m| m.id == id).cloned())
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.collections.read().await.members.clone())
    }

    async fn count_members(&self) -> Result<u64> {
        Ok(self.collections.read().await.members.len() as u64)
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        self.collections.write().await.groups.push(group);
        Ok(())
    }

    async fn find_group(&self, id: &str) -> Result<Option<Group>> {
        let collections = self.collections.read().await;
        Ok(collections.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn list_groups(&self, member: Option<&str>) -> Result<Vec<Group>> {
        let collections = self.collections.read().await;
        Ok(collections
            .groups
            .iter()
            .filter(|g| member.map_or(true, |m| g.has_member(m)))
            .cloned()
            .collect())
    }

    async fn add_group_member(&self, group_id: &str, member: &str) -> Result<JoinOutcome> {
        let mut collections = self.collections.write().await;
        let Some(group) = collections.groups.iter_mut().find(|g| g.id == group_id) else {
            return Ok(JoinOutcome::GroupMissing);
        };
        if group.has_member(member) {
            return Ok(JoinOutcome::AlreadyMember);
        }
        group.members.push(member.to_string());
        Ok(JoinOutcome::Joined)
    }

    async fn insert_expense(&self, expense: Expense) -> Result<()> {
        self.collections.write().await.expenses.push(expense);
        Ok(())
    }

    async fn list_expenses(&self, group_id: &str) -> Result<Vec<Expense>> {
        let collections = self.collections.read().await;
        Ok(collections
            .expenses
            .iter()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn insert_notification(&self, notification: Notification) -> Result<()> {
        self.collections
            .write()
            .await
            .notifications
            .push(notification);
        Ok(())
    }

    async fn list_notifications(&self, member: &str, limit: usize) -> Result<Vec<Notification>> {
        let collections = self.collections.read().await;
        // Insertion order is creation order, so walking backwards gives newest first.
        Ok(collections
            .notifications
            .iter()
            .rev()
            .filter(|n| n.member == member)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: &str, member: &str) -> Result<bool> {
        let mut collections = self.collections.write().await;
        match collections
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.member == member)
        {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
