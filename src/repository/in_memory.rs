use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    ConsumeOutcome, CreateOutcome, NewsletterDirectory, SubscriberPage, SubscriberRepository,
    TokenRecord, TokenStore,
};
use crate::domain::{
    Editor, NewSubscriber, NewsletterId, Pagination, Subscriber, SubscriberEmail,
    SubscriberStatus, SubscriptionToken, TokenPurpose,
};

#[derive(Default)]
struct State {
    editors: HashMap<String, Editor>,
    newsletters: HashMap<NewsletterId, Uuid>,
    // Insertion order doubles as subscription order.
    subscribers: Vec<Subscriber>,
    tokens: HashMap<String, TokenRecord>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    fail_token_issuance: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_editor(&self, external_id: &str) -> Editor {
        let editor = Editor { id: Uuid::new_v4() };
        self.state()
            .editors
            .insert(external_id.to_string(), editor.clone());
        editor
    }

    pub fn add_newsletter(&self, newsletter_id: &NewsletterId, owner: &Editor) {
        self.state()
            .newsletters
            .insert(newsletter_id.clone(), owner.id);
    }

    pub fn fail_token_issuance(&self, fail: bool) {
        self.fail_token_issuance.store(fail, Ordering::SeqCst);
    }

    pub fn subscribers(&self) -> Vec<Subscriber> {
        self.state().subscribers.clone()
    }

    pub fn tokens_for(&self, subscriber_id: Uuid) -> Vec<TokenRecord> {
        self.state()
            .tokens
            .values()
            .filter(|record| record.subscriber_id == subscriber_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NewsletterDirectory for InMemoryStore {
    async fn newsletter_exists(&self, newsletter_id: &NewsletterId) -> anyhow::Result<bool> {
        Ok(self.state().newsletters.contains_key(newsletter_id))
    }

    async fn find_editor(&self, external_id: &str) -> anyhow::Result<Option<Editor>> {
        Ok(self.state().editors.get(external_id).cloned())
    }

    async fn is_owner(
        &self,
        editor_id: Uuid,
        newsletter_id: &NewsletterId,
    ) -> anyhow::Result<bool> {
        Ok(self.state().newsletters.get(newsletter_id) == Some(&editor_id))
    }
}

#[async_trait]
impl SubscriberRepository for InMemoryStore {
    async fn create_pending(
        &self,
        new_subscriber: &NewSubscriber,
        now: DateTime<Utc>,
    ) -> anyhow::Result<CreateOutcome> {
        let mut state = self.state();
        let duplicate = state.subscribers.iter().any(|s| {
            s.newsletter_id == new_subscriber.newsletter_id
                && s.email == new_subscriber.email
                && s.status.is_live()
        });
        if duplicate {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            email: new_subscriber.email.clone(),
            newsletter_id: new_subscriber.newsletter_id.clone(),
            status: SubscriberStatus::Pending,
            subscribed_at: now,
        };
        state.subscribers.push(subscriber.clone());
        Ok(CreateOutcome::Created(subscriber))
    }

    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
        newsletter_id: &NewsletterId,
    ) -> anyhow::Result<Option<Subscriber>> {
        let state = self.state();
        let mut matching = state
            .subscribers
            .iter()
            .filter(|s| &s.newsletter_id == newsletter_id && &s.email == email);

        let found = match matching.clone().find(|s| s.status.is_live()) {
            Some(live) => Some(live),
            None => matching.next_back(),
        };
        Ok(found.cloned())
    }

    async fn find_by_id(&self, subscriber_id: Uuid) -> anyhow::Result<Option<Subscriber>> {
        Ok(self
            .state()
            .subscribers
            .iter()
            .find(|s| s.id == subscriber_id)
            .cloned())
    }

    async fn update_status(
        &self,
        subscriber_id: Uuid,
        status: SubscriberStatus,
    ) -> anyhow::Result<()> {
        let mut state = self.state();
        let subscriber = state
            .subscribers
            .iter_mut()
            .find(|s| s.id == subscriber_id)
            .ok_or_else(|| anyhow::anyhow!("No subscriber with id {subscriber_id}"))?;
        subscriber.status = status;
        Ok(())
    }

    async fn list_active(
        &self,
        newsletter_id: &NewsletterId,
        page: Pagination,
    ) -> anyhow::Result<SubscriberPage> {
        let state = self.state();
        let active: Vec<&Subscriber> = state
            .subscribers
            .iter()
            .filter(|s| &s.newsletter_id == newsletter_id && s.status == SubscriberStatus::Active)
            .collect();

        let items = active
            .iter()
            .skip(usize::try_from(page.offset)?)
            .take(usize::try_from(page.limit)?)
            .map(|s| (*s).clone())
            .collect();

        Ok(SubscriberPage {
            items,
            total: i64::try_from(active.len())?,
        })
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn issue(
        &self,
        subscriber_id: Uuid,
        purpose: TokenPurpose,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<SubscriptionToken> {
        if self.fail_token_issuance.load(Ordering::SeqCst) {
            anyhow::bail!("Token issuance is switched off");
        }

        let token = SubscriptionToken::generate();
        self.state().tokens.insert(
            token.as_ref().to_string(),
            TokenRecord {
                subscriber_id,
                purpose,
                expires_at,
                consumed: false,
            },
        );
        Ok(token)
    }

    async fn resolve(&self, token: &SubscriptionToken) -> anyhow::Result<Option<TokenRecord>> {
        Ok(self.state().tokens.get(token.as_ref()).cloned())
    }

    async fn consume(
        &self,
        token: &SubscriptionToken,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ConsumeOutcome> {
        let mut guard = self.state();
        let state = &mut *guard;

        let record = match state.tokens.get_mut(token.as_ref()) {
            Some(record) if record.purpose == purpose => record,
            _ => return Ok(ConsumeOutcome::NotFound),
        };
        if record.consumed {
            return Ok(ConsumeOutcome::AlreadyConsumed);
        }
        if record.is_expired(now) {
            return Ok(ConsumeOutcome::Expired);
        }

        let subscriber = state
            .subscribers
            .iter_mut()
            .find(|s| s.id == record.subscriber_id)
            .ok_or_else(|| anyhow::anyhow!("Token is bound to a missing subscriber"))?;

        let transition = purpose.transition();
        if !transition.allows(subscriber.status) {
            return Ok(ConsumeOutcome::StatusConflict(subscriber.status));
        }

        subscriber.status = transition.to;
        record.consumed = true;
        Ok(ConsumeOutcome::Consumed)
    }
}
