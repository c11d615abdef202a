mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Editor, NewSubscriber, NewsletterId, Pagination, Subscriber, SubscriberEmail,
    SubscriberStatus, SubscriptionToken, TokenPurpose,
};

#[derive(Debug)]
pub enum CreateOutcome {
    Created(Subscriber),
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub subscriber_id: Uuid,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl TokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    AlreadyConsumed,
    NotFound,
    Expired,
    StatusConflict(SubscriberStatus),
}

#[derive(Debug, Clone)]
pub struct SubscriberPage {
    pub items: Vec<Subscriber>,
    pub total: i64,
}

#[async_trait]
pub trait NewsletterDirectory: Send + Sync {
    async fn newsletter_exists(&self, newsletter_id: &NewsletterId) -> anyhow::Result<bool>;

    async fn find_editor(&self, external_id: &str) -> anyhow::Result<Option<Editor>>;

    async fn is_owner(&self, editor_id: Uuid, newsletter_id: &NewsletterId)
    -> anyhow::Result<bool>;
}

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    async fn create_pending(
        &self,
        new_subscriber: &NewSubscriber,
        now: DateTime<Utc>,
    ) -> anyhow::Result<CreateOutcome>;

    /// Returns the live (Pending or Active) subscriber for the pair if there is
    /// one, otherwise the most recent unsubscribed one.
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
        newsletter_id: &NewsletterId,
    ) -> anyhow::Result<Option<Subscriber>>;

    async fn find_by_id(&self, subscriber_id: Uuid) -> anyhow::Result<Option<Subscriber>>;

    async fn update_status(&self, subscriber_id: Uuid, status: SubscriberStatus)
    -> anyhow::Result<()>;

    async fn list_active(
        &self,
        newsletter_id: &NewsletterId,
        page: Pagination,
    ) -> anyhow::Result<SubscriberPage>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn issue(
        &self,
        subscriber_id: Uuid,
        purpose: TokenPurpose,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<SubscriptionToken>;

    async fn resolve(&self, token: &SubscriptionToken) -> anyhow::Result<Option<TokenRecord>>;

    /// Redeems `token` for `purpose`: checks it is unconsumed and unexpired,
    /// applies `purpose.transition()` to the bound subscriber and marks the
    /// token consumed. Either all of it happens or none of it does.
    async fn consume(
        &self,
        token: &SubscriptionToken,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ConsumeOutcome>;
}
