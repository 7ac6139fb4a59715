use async_trait::async_trait;

use crate::error::Result;
use crate::schemas::{Expense, Group, Member, Notification};

mod memory;
mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

/// Outcome of appending a member to a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    GroupMissing,
}

/// Document persistence behind the ledger. Expenses are append-only.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_member(&self, member: Member) -> Result<()>;
    async fn find_member(&self, id: &str) -> Result<Option<Member>>;
    async fn list_members(&self) -> Result<Vec<Member>>;
    async fn count_members(&self) -> Result<u64>;

    async fn insert_group(&self, group: Group) -> Result<()>;
    async fn find_group(&self, id: &str) -> Result<Option<Group>>;
    /// Groups containing `member`, or every group when `member` is `None`.
    async fn list_groups(&self, member: Option<&str>) -> Result<Vec<Group>>;
    async fn add_group_member(&self, group_id: &str, member: &str) -> Result<JoinOutcome>;

    async fn insert_expense(&self, expense: Expense) -> Result<()>;
    /// Expenses of a group in creation order.
    async fn list_expenses(&self, group_id: &str) -> Result<Vec<Expense>>;

    async fn insert_notification(&self, notification: Notification) -> Result<()>;
    /// Newest first, at most `limit` entries.
    async fn list_notifications(&self, member: &str, limit: usize) -> Result<Vec<Notification>>;
    /// Returns false when no notification with that id belongs to `member`.
    async fn mark_notification_read(&self, id: &str, member: &str) -> Result<bool>;
}
