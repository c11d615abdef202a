use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    ConsumeOutcome, CreateOutcome, NewsletterDirectory, SubscriberPage, SubscriberRepository,
    TokenRecord, TokenStore,
};
use crate::domain::{
    Editor, NewSubscriber, NewsletterId, Pagination, Subscriber, SubscriberEmail,
    SubscriberStatus, SubscriptionToken, TokenPurpose,
};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    newsletter_id: String,
    status: String,
    subscribed_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = anyhow::Error;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        Ok(Subscriber {
            id: row.id,
            email: SubscriberEmail::parse(row.email).map_err(anyhow::Error::msg)?,
            newsletter_id: NewsletterId::parse(&row.newsletter_id).map_err(anyhow::Error::msg)?,
            status: SubscriberStatus::parse(&row.status).map_err(anyhow::Error::msg)?,
            subscribed_at: row.subscribed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    subscriber_id: Uuid,
    purpose: String,
    expires_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct RedemptionRow {
    subscriber_id: Uuid,
    purpose: String,
    expires_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
    status: String,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl NewsletterDirectory for PostgresStore {
    #[tracing::instrument(name = "Checking that a newsletter exists", skip(self))]
    async fn newsletter_exists(&self, newsletter_id: &NewsletterId) -> anyhow::Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM newsletters WHERE id = $1)")
                .bind(newsletter_id.as_ref())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    #[tracing::instrument(name = "Looking up an editor", skip(self))]
    async fn find_editor(&self, external_id: &str) -> anyhow::Result<Option<Editor>> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM editors WHERE external_id = $1")
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id.map(|id| Editor { id }))
    }

    #[tracing::instrument(name = "Checking newsletter ownership", skip(self))]
    async fn is_owner(
        &self,
        editor_id: Uuid,
        newsletter_id: &NewsletterId,
    ) -> anyhow::Result<bool> {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM newsletters WHERE id = $1 AND editor_id = $2)",
        )
        .bind(newsletter_id.as_ref())
        .bind(editor_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(owned)
    }
}

#[async_trait]
impl SubscriberRepository for PostgresStore {
    #[tracing::instrument(name = "Saving new subscriber details in the database", skip(self))]
    async fn create_pending(
        &self,
        new_subscriber: &NewSubscriber,
        now: DateTime<Utc>,
    ) -> anyhow::Result<CreateOutcome> {
        let inserted = sqlx::query_as::<_, SubscriberRow>(
            r#"
            INSERT INTO subscribers (id, email, newsletter_id, status, subscribed_at)
            VALUES ($1, $2, $3, 'pending', $4)
            RETURNING id, email, newsletter_id, status, subscribed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_subscriber.email.as_ref())
        .bind(new_subscriber.newsletter_id.as_ref())
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(CreateOutcome::Created(row.try_into()?)),
            // subscribers_live_email_idx
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(e).context("Failed to insert a new subscriber."),
        }
    }

    #[tracing::instrument(name = "Trying to find existing subscriber by email", skip(self))]
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
        newsletter_id: &NewsletterId,
    ) -> anyhow::Result<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, newsletter_id, status, subscribed_at
            FROM subscribers
            WHERE newsletter_id = $1 AND email = $2
            ORDER BY status IN ('pending', 'active') DESC, subscribed_at DESC
            LIMIT 1
            "#,
        )
        .bind(newsletter_id.as_ref())
        .bind(email.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subscriber::try_from).transpose()
    }

    #[tracing::instrument(name = "Fetching subscriber by id", skip(self))]
    async fn find_by_id(&self, subscriber_id: Uuid) -> anyhow::Result<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, newsletter_id, status, subscribed_at
            FROM subscribers
            WHERE id = $1
            "#,
        )
        .bind(subscriber_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subscriber::try_from).transpose()
    }

    #[tracing::instrument(name = "Updating subscriber status", skip(self))]
    async fn update_status(
        &self,
        subscriber_id: Uuid,
        status: SubscriberStatus,
    ) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE subscribers SET status = $2 WHERE id = $1")
            .bind(subscriber_id)
            .bind(status.as_ref())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("No subscriber with id {subscriber_id}");
        }
        Ok(())
    }

    #[tracing::instrument(name = "Listing active subscribers", skip(self))]
    async fn list_active(
        &self,
        newsletter_id: &NewsletterId,
        page: Pagination,
    ) -> anyhow::Result<SubscriberPage> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscribers WHERE newsletter_id = $1 AND status = 'active'",
        )
        .bind(newsletter_id.as_ref())
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, newsletter_id, status, subscribed_at
            FROM subscribers
            WHERE newsletter_id = $1 AND status = 'active'
            ORDER BY subscribed_at, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(newsletter_id.as_ref())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Subscriber::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SubscriberPage { items, total })
    }
}

#[async_trait]
impl TokenStore for PostgresStore {
    #[tracing::instrument(name = "Saving new subscription token", skip(self))]
    async fn issue(
        &self,
        subscriber_id: Uuid,
        purpose: TokenPurpose,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<SubscriptionToken> {
        let token = SubscriptionToken::generate();
        sqlx::query(
            r#"
            INSERT INTO subscription_tokens (token, subscriber_id, purpose, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(token.as_ref())
        .bind(subscriber_id)
        .bind(purpose.as_ref())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    #[tracing::instrument(name = "Resolving subscription token", skip(self))]
    async fn resolve(&self, token: &SubscriptionToken) -> anyhow::Result<Option<TokenRecord>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT subscriber_id, purpose, expires_at, consumed_at
            FROM subscription_tokens
            WHERE token = $1
            "#,
        )
        .bind(token.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(TokenRecord {
                subscriber_id: row.subscriber_id,
                purpose: TokenPurpose::parse(&row.purpose).map_err(anyhow::Error::msg)?,
                expires_at: row.expires_at,
                consumed: row.consumed_at.is_some(),
            })
        })
        .transpose()
    }

    #[tracing::instrument(name = "Redeeming subscription token", skip(self))]
    async fn consume(
        &self,
        token: &SubscriptionToken,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ConsumeOutcome> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .context("Failed to acquire a Postgres connection from the pool.")?;

        // Locks both the token and its subscriber until commit.
        let row = sqlx::query_as::<_, RedemptionRow>(
            r#"
            SELECT t.subscriber_id, t.purpose, t.expires_at, t.consumed_at, s.status
            FROM subscription_tokens t
            JOIN subscribers s ON s.id = t.subscriber_id
            WHERE t.token = $1
            FOR UPDATE
            "#,
        )
        .bind(token.as_ref())
        .fetch_optional(&mut *transaction)
        .await?;

        let Some(row) = row else {
            return Ok(ConsumeOutcome::NotFound);
        };
        if TokenPurpose::parse(&row.purpose).map_err(anyhow::Error::msg)? != purpose {
            return Ok(ConsumeOutcome::NotFound);
        }
        if row.consumed_at.is_some() {
            return Ok(ConsumeOutcome::AlreadyConsumed);
        }
        if now >= row.expires_at {
            return Ok(ConsumeOutcome::Expired);
        }

        let current = SubscriberStatus::parse(&row.status).map_err(anyhow::Error::msg)?;
        let transition = purpose.transition();
        if !transition.allows(current) {
            return Ok(ConsumeOutcome::StatusConflict(current));
        }

        sqlx::query("UPDATE subscribers SET status = $2 WHERE id = $1")
            .bind(row.subscriber_id)
            .bind(transition.to.as_ref())
            .execute(&mut *transaction)
            .await?;
        sqlx::query("UPDATE subscription_tokens SET consumed_at = $2 WHERE token = $1")
            .bind(token.as_ref())
            .bind(now)
            .execute(&mut *transaction)
            .await?;

        transaction
            .commit()
            .await
            .context("Failed to commit the token redemption.")?;
        Ok(ConsumeOutcome::Consumed)
    }
}
