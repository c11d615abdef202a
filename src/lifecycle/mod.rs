mod errors;

pub use errors::LifecycleError;

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::context::RequestContext;
use crate::domain::{
    NewSubscriber, NewsletterId, Subscriber, SubscriberEmail, SubscriberStatus,
    SubscriptionToken, TokenPurpose,
};
use crate::notifier::SubscriptionNotifier;
use crate::repository::{
    ConsumeOutcome, CreateOutcome, NewsletterDirectory, SubscriberRepository, TokenRecord,
    TokenStore,
};

#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    pub confirmation_ttl: Duration,
    pub unsubscribe_ttl: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            confirmation_ttl: Duration::hours(48),
            unsubscribe_ttl: Duration::days(365),
        }
    }
}

pub struct SubscriptionLifecycle {
    newsletters: Arc<dyn NewsletterDirectory>,
    subscribers: Arc<dyn SubscriberRepository>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn SubscriptionNotifier>,
    clock: Arc<dyn Clock>,
    policy: TokenPolicy,
}

impl SubscriptionLifecycle {
    pub fn new(
        newsletters: Arc<dyn NewsletterDirectory>,
        subscribers: Arc<dyn SubscriberRepository>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn SubscriptionNotifier>,
        clock: Arc<dyn Clock>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            newsletters,
            subscribers,
            tokens,
            notifier,
            clock,
            policy,
        }
    }

    #[tracing::instrument(
        name = "Adding a new subscriber",
        skip(self, ctx, email),
        fields(subscriber_email = %email, subscriber_id = tracing::field::Empty)
    )]
    pub async fn subscribe(
        &self,
        ctx: &RequestContext,
        email: String,
        newsletter_id: &str,
    ) -> Result<Subscriber, LifecycleError> {
        let new_subscriber =
            NewSubscriber::parse(email, newsletter_id).map_err(LifecycleError::ValidationError)?;

        let newsletter_exists = ctx
            .run(self.newsletters.newsletter_exists(&new_subscriber.newsletter_id))
            .await?
            .context("Failed to look up the newsletter.")?;
        if !newsletter_exists {
            return Err(LifecycleError::NewsletterNotFound);
        }

        let now = self.clock.now();
        let subscriber = match ctx
            .run(self.subscribers.create_pending(&new_subscriber, now))
            .await?
            .context("Failed to store the new subscriber.")?
        {
            CreateOutcome::Created(subscriber) => subscriber,
            CreateOutcome::AlreadyExists => return Err(LifecycleError::AlreadySubscribed),
        };
        tracing::Span::current().record("subscriber_id", tracing::field::display(subscriber.id));

        let mut guard = RetireOnDrop {
            subscribers: self.subscribers.clone(),
            subscriber_id: Some(subscriber.id),
        };
        if let Err(e) = self.issue_and_dispatch(ctx, &subscriber, now).await {
            retire(self.subscribers.as_ref(), subscriber.id).await;
            guard.disarm();
            return Err(e);
        }
        guard.disarm();

        Ok(subscriber)
    }

    async fn issue_and_dispatch(
        &self,
        ctx: &RequestContext,
        subscriber: &Subscriber,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        let confirm_token = ctx
            .run(self.tokens.issue(
                subscriber.id,
                TokenPurpose::Confirm,
                now + self.policy.confirmation_ttl,
            ))
            .await?
            .context("Failed to issue a confirmation token.")?;
        let unsubscribe_token = ctx
            .run(self.tokens.issue(
                subscriber.id,
                TokenPurpose::Unsubscribe,
                now + self.policy.unsubscribe_ttl,
            ))
            .await?
            .context("Failed to issue an unsubscribe token.")?;

        ctx.run(
            self.notifier
                .send_confirmation(subscriber, &confirm_token, &unsubscribe_token),
        )
        .await?
        .context("Failed to dispatch the confirmation message.")?;

        Ok(())
    }

    #[tracing::instrument(name = "Confirming a pending subscriber", skip(self, ctx, token))]
    pub async fn confirm(&self, ctx: &RequestContext, token: &str) -> Result<(), LifecycleError> {
        let token = SubscriptionToken::parse(token).map_err(LifecycleError::ValidationError)?;
        let now = self.clock.now();

        let record = self.resolve(ctx, &token, TokenPurpose::Confirm, now).await?;
        let subscriber = self.token_subject(ctx, &record).await?;
        match subscriber.status {
            SubscriberStatus::Pending => {}
            SubscriberStatus::Active => return Err(LifecycleError::AlreadyConfirmed),
            SubscriberStatus::Unsubscribed => return Err(LifecycleError::InvalidOrExpiredToken),
        }

        let outcome = ctx
            .run(self.tokens.consume(&token, TokenPurpose::Confirm, now))
            .await?
            .context("Failed to redeem the confirmation token.")?;
        match outcome {
            ConsumeOutcome::Consumed => {
                tracing::info!(subscriber_id = %subscriber.id, "Subscription confirmed");
                Ok(())
            }
            // Lost a race against a concurrent confirmation of the same token.
            ConsumeOutcome::AlreadyConsumed
            | ConsumeOutcome::StatusConflict(SubscriberStatus::Active) => {
                Err(LifecycleError::AlreadyConfirmed)
            }
            ConsumeOutcome::StatusConflict(_)
            | ConsumeOutcome::NotFound
            | ConsumeOutcome::Expired => Err(LifecycleError::InvalidOrExpiredToken),
        }
    }

    #[tracing::instrument(name = "Unsubscribing by token", skip(self, ctx, token))]
    pub async fn unsubscribe_by_token(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> Result<(), LifecycleError> {
        let token = SubscriptionToken::parse(token).map_err(LifecycleError::ValidationError)?;
        let now = self.clock.now();

        let record = self
            .resolve(ctx, &token, TokenPurpose::Unsubscribe, now)
            .await?;
        let subscriber = self.token_subject(ctx, &record).await?;
        if subscriber.status == SubscriberStatus::Unsubscribed {
            return Ok(());
        }

        let outcome = ctx
            .run(self.tokens.consume(&token, TokenPurpose::Unsubscribe, now))
            .await?
            .context("Failed to redeem the unsubscribe token.")?;
        match outcome {
            ConsumeOutcome::Consumed => {
                tracing::info!(subscriber_id = %subscriber.id, "Subscriber unsubscribed");
                Ok(())
            }
            ConsumeOutcome::AlreadyConsumed
            | ConsumeOutcome::StatusConflict(SubscriberStatus::Unsubscribed) => Ok(()),
            ConsumeOutcome::StatusConflict(_)
            | ConsumeOutcome::NotFound
            | ConsumeOutcome::Expired => Err(LifecycleError::InvalidOrExpiredToken),
        }
    }

    #[tracing::instrument(
        name = "Unsubscribing by email address",
        skip(self, ctx, email),
        fields(subscriber_email = %email)
    )]
    pub async fn unsubscribe_by_identity(
        &self,
        ctx: &RequestContext,
        email: String,
        newsletter_id: &str,
    ) -> Result<(), LifecycleError> {
        let email = SubscriberEmail::parse(email).map_err(LifecycleError::ValidationError)?;
        let newsletter_id =
            NewsletterId::parse(newsletter_id).map_err(LifecycleError::ValidationError)?;

        let subscriber = ctx
            .run(self.subscribers.find_by_email(&email, &newsletter_id))
            .await?
            .context("Failed to look up the subscriber.")?
            .ok_or(LifecycleError::SubscriptionNotFound)?;

        if subscriber.status != SubscriberStatus::Unsubscribed {
            ctx.run(
                self.subscribers
                    .update_status(subscriber.id, SubscriberStatus::Unsubscribed),
            )
            .await?
            .context("Failed to unsubscribe the subscriber.")?;
        }

        Ok(())
    }

    async fn resolve(
        &self,
        ctx: &RequestContext,
        token: &SubscriptionToken,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord, LifecycleError> {
        ctx.run(self.tokens.resolve(token))
            .await?
            .context("Failed to resolve the subscription token.")?
            .filter(|record| record.purpose == purpose && !record.is_expired(now))
            .ok_or(LifecycleError::InvalidOrExpiredToken)
    }

    async fn token_subject(
        &self,
        ctx: &RequestContext,
        record: &TokenRecord,
    ) -> Result<Subscriber, LifecycleError> {
        ctx.run(self.subscribers.find_by_id(record.subscriber_id))
            .await?
            .context("Failed to fetch the subscriber bound to the token.")?
            .ok_or(LifecycleError::InvalidOrExpiredToken)
    }
}

async fn retire(subscribers: &dyn SubscriberRepository, subscriber_id: Uuid) {
    if let Err(e) = subscribers
        .update_status(subscriber_id, SubscriberStatus::Unsubscribed)
        .await
    {
        tracing::error!(
            error.cause_chain = ?e,
            %subscriber_id,
            "Failed to retire an incomplete subscription"
        );
    }
}

/// Retires the subscriber in the background if `subscribe` is dropped
/// before its tokens were dispatched.
struct RetireOnDrop {
    subscribers: Arc<dyn SubscriberRepository>,
    subscriber_id: Option<Uuid>,
}

impl RetireOnDrop {
    fn disarm(&mut self) {
        self.subscriber_id = None;
    }
}

impl Drop for RetireOnDrop {
    fn drop(&mut self) {
        let Some(subscriber_id) = self.subscriber_id.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let subscribers = self.subscribers.clone();
                handle.spawn(async move { retire(subscribers.as_ref(), subscriber_id).await });
            }
            Err(_) => tracing::error!(
                %subscriber_id,
                "No runtime left to retire an abandoned subscription"
            ),
        }
    }
}
