use std::sync::Arc;

use anyhow::Context;

use crate::context::{Cancelled, RequestContext};
use crate::domain::{NewsletterId, Pagination, Subscriber};
use crate::errors::{ErrorKind, error_chain_fmt};
use crate::repository::{NewsletterDirectory, SubscriberRepository};

#[derive(thiserror::Error)]
pub enum ListingError {
    #[error("Authentication is required.")]
    Unauthorized,
    #[error("The newsletter does not exist.")]
    NotFound,
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl ListingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ListingError::Unauthorized => ErrorKind::Unauthorized,
            ListingError::NotFound => ErrorKind::NotFound,
            ListingError::ValidationError(_) => ErrorKind::Validation,
            ListingError::Cancelled(_) => ErrorKind::Cancelled,
            ListingError::UnexpectedError(_) => ErrorKind::Internal,
        }
    }
}

impl std::fmt::Debug for ListingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Debug, Clone)]
pub struct ActiveSubscribersPage {
    pub items: Vec<Subscriber>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub struct SubscriberListing {
    newsletters: Arc<dyn NewsletterDirectory>,
    subscribers: Arc<dyn SubscriberRepository>,
}

impl SubscriberListing {
    pub fn new(
        newsletters: Arc<dyn NewsletterDirectory>,
        subscribers: Arc<dyn SubscriberRepository>,
    ) -> Self {
        Self {
            newsletters,
            subscribers,
        }
    }

    #[tracing::instrument(
        name = "Listing active subscribers",
        skip(self, ctx),
        fields(editor_id = tracing::field::Empty)
    )]
    pub async fn list_active_subscribers(
        &self,
        ctx: &RequestContext,
        identity: &str,
        newsletter_id: &str,
        limit: Option<&str>,
        offset: Option<&str>,
    ) -> Result<ActiveSubscribersPage, ListingError> {
        if identity.trim().is_empty() {
            return Err(ListingError::Unauthorized);
        }
        let editor = ctx
            .run(self.newsletters.find_editor(identity))
            .await?
            .context("Failed to look up the editor.")?
            .ok_or(ListingError::Unauthorized)?;
        tracing::Span::current().record("editor_id", tracing::field::display(editor.id));

        // A malformed identifier cannot name a newsletter the editor owns.
        let newsletter_id = NewsletterId::parse(newsletter_id).map_err(|_| ListingError::NotFound)?;
        let owns_newsletter = ctx
            .run(self.newsletters.is_owner(editor.id, &newsletter_id))
            .await?
            .context("Failed to check newsletter ownership.")?;
        if !owns_newsletter {
            return Err(ListingError::NotFound);
        }

        let pagination = Pagination::parse(limit, offset).map_err(ListingError::ValidationError)?;
        let page = ctx
            .run(self.subscribers.list_active(&newsletter_id, pagination))
            .await?
            .context("Failed to list active subscribers.")?;

        Ok(ActiveSubscribersPage {
            items: page.items,
            total: page.total,
            limit: pagination.limit,
            offset: pagination.offset,
        })
    }
}
