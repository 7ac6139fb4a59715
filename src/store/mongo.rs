use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{ClientOptions, FindOptions},
    Client, Collection, Database,
};

use super::{JoinOutcome, LedgerStore};
use crate::error::Result;
use crate::schemas::{Expense, Group, Member, Notification};

/// MongoDB-backed store, one collection per record type.
#[derive(Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;
        Ok(Self::new(client.database(database)))
    }

    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn members(&self) -> Collection<Member> {
        self.database.collection("Members")
    }

    fn groups(&self) -> Collection<Group> {
        self.database.collection("Groups")
    }

    fn expenses(&self) -> Collection<Expense> {
        self.database.collection("Expenses")
    }

    fn notifications(&self) -> Collection<Notification> {
        self.database.collection("Notifications")
    }
}

#[async_trait]
impl LedgerStore for MongoStore {
    async fn insert_member(&self, member: Member) -> Result<()> {
        self.members().insert_one(member, None).await?;
        Ok(())
    }

    async fn find_member(&self, id: &str) -> Result<Option<Member>> {
        Ok(self.members().find_one(doc! { "id": id }, None).await?)
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        let cursor = self.members().find(doc! {}, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_members(&self) -> Result<u64> {
        Ok(self.members().count_documents(doc! {}, None).await?)
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        self.groups().insert_one(group, None).await?;
        Ok(())
    }

    async fn find_group(&self, id: &str) -> Result<Option<Group>> {
        Ok(self.groups().find_one(doc! { "id": id }, None).await?)
    }

    async fn list_groups(&self, member: Option<&str>) -> Result<Vec<Group>> {
        let filter = match member {
            Some(member) => doc! { "members": member },
            None => doc! {},
        };
        let cursor = self.groups().find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn add_group_member(&self, group_id: &str, member: &str) -> Result<JoinOutcome> {
        // The $ne guard keeps the push idempotent within a single document update.
        let result = self
            .groups()
            .update_one(
                doc! { "id": group_id, "members": { "$ne": member } },
                doc! { "$push": { "members": member } },
                None,
            )
            .await?;
        if result.matched_count > 0 {
            return Ok(JoinOutcome::Joined);
        }
        match self.find_group(group_id).await? {
            Some(_) => Ok(JoinOutcome::AlreadyMember),
            None => Ok(JoinOutcome::GroupMissing),
        }
    }

    async fn insert_expense(&self, expense: Expense) -> Result<()> {
        self.expenses().insert_one(expense, None).await?;
        Ok(())
    }

    async fn list_expenses(&self, group_id: &str) -> Result<Vec<Expense>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();
        let cursor = self
            .expenses()
            .find(doc! { "group_id": group_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_notification(&self, notification: Notification) -> Result<()> {
        self.notifications().insert_one(notification, None).await?;
        Ok(())
    }

    async fn list_notifications(&self, member: &str, limit: usize) -> Result<Vec<Notification>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .limit(limit as i64)
            .build();
        let cursor = self
            .notifications()
            .find(doc! { "member": member }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn mark_notification_read(&self, id: &str, member: &str) -> Result<bool> {
        let result = self
            .notifications()
            .update_one(
                doc! { "id": id, "member": member },
                doc! { "$set": { "read": true } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}
