use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Subscriber, SubscriberEmail, SubscriptionToken};
use crate::email_client::EmailClient;

const CONFIRMATION_TEMPLATE: &str = include_str!("../views/confirm_subscription.html");

#[async_trait]
pub trait SubscriptionNotifier: Send + Sync {
    async fn send_confirmation(
        &self,
        subscriber: &Subscriber,
        confirm_token: &SubscriptionToken,
        unsubscribe_token: &SubscriptionToken,
    ) -> anyhow::Result<()>;
}

pub fn confirmation_link(base_url: &str, token: &SubscriptionToken) -> String {
    format!(
        "{}/subscribers/confirm?token={}",
        base_url.trim_end_matches('/'),
        token.as_ref()
    )
}

pub fn unsubscribe_link(base_url: &str, token: &SubscriptionToken) -> String {
    format!(
        "{}/subscriptions/unsubscribe?token={}",
        base_url.trim_end_matches('/'),
        token.as_ref()
    )
}

pub struct EmailNotifier {
    email_client: EmailClient,
    base_url: String,
}

impl EmailNotifier {
    pub fn new(email_client: EmailClient, base_url: String) -> Self {
        Self {
            email_client,
            base_url,
        }
    }
}

fn confirmation_text(newsletter: &str, confirm_link: &str, unsubscribe_link: &str) -> String {
    format!(
        "Thanks for subscribing to {newsletter}!\n\n\
         Please confirm your subscription by visiting the link below:\n\n\
         {confirm_link}\n\n\
         Changed your mind? Unsubscribe at any time:\n\n\
         {unsubscribe_link}\n\n\
         If you did not request this subscription, you can safely ignore this email.\n"
    )
}

fn confirmation_html(
    newsletter: &str,
    confirm_link: &str,
    unsubscribe_link: &str,
) -> Result<String, tera::Error> {
    let mut ctx = tera::Context::new();
    ctx.insert("newsletter", newsletter);
    ctx.insert("confirm_link", confirm_link);
    ctx.insert("unsubscribe_link", unsubscribe_link);
    // Links go in unescaped; tokens are alphanumeric.
    tera::Tera::one_off(CONFIRMATION_TEMPLATE, &ctx, false)
}

#[async_trait]
impl SubscriptionNotifier for EmailNotifier {
    #[tracing::instrument(
        name = "Sending a confirmation email to a new subscriber",
        skip(self, subscriber),
        fields(subscriber_id = %subscriber.id)
    )]
    async fn send_confirmation(
        &self,
        subscriber: &Subscriber,
        confirm_token: &SubscriptionToken,
        unsubscribe_token: &SubscriptionToken,
    ) -> anyhow::Result<()> {
        let confirm_link = confirmation_link(&self.base_url, confirm_token);
        let unsubscribe_link = unsubscribe_link(&self.base_url, unsubscribe_token);
        let newsletter = subscriber.newsletter_id.as_ref();

        let html = confirmation_html(newsletter, &confirm_link, &unsubscribe_link)
            .context("Failed to render the confirmation email.")?;
        let text = confirmation_text(newsletter, &confirm_link, &unsubscribe_link);

        self.email_client
            .send_email(
                &subscriber.email,
                &format!("Confirm your subscription to {newsletter}"),
                &html,
                &text,
            )
            .await
            .context("Failed to send a confirmation email.")
    }
}

#[derive(Debug, Clone)]
pub struct SentConfirmation {
    pub subscriber_id: Uuid,
    pub email: SubscriberEmail,
    pub confirm_token: SubscriptionToken,
    pub unsubscribe_token: SubscriptionToken,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentConfirmation>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn sent_guard(&self) -> MutexGuard<'_, Vec<SentConfirmation>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sent(&self) -> Vec<SentConfirmation> {
        self.sent_guard().clone()
    }

    pub fn last(&self) -> Option<SentConfirmation> {
        self.sent_guard().last().cloned()
    }

    pub fn fail_dispatch(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionNotifier for RecordingNotifier {
    async fn send_confirmation(
        &self,
        subscriber: &Subscriber,
        confirm_token: &SubscriptionToken,
        unsubscribe_token: &SubscriptionToken,
    ) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("Dispatch is switched off");
        }
        self.sent_guard().push(SentConfirmation {
            subscriber_id: subscriber.id,
            email: subscriber.email.clone(),
            confirm_token: confirm_token.clone(),
            unsubscribe_token: unsubscribe_token.clone(),
        });
        Ok(())
    }
}
