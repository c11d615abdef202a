use crate::context::Cancelled;
use crate::errors::{ErrorKind, error_chain_fmt};

#[derive(thiserror::Error)]
pub enum LifecycleError {
    #[error("{0}")]
    ValidationError(String),
    #[error("The newsletter does not exist.")]
    NewsletterNotFound,
    #[error("No subscription exists for this email address.")]
    SubscriptionNotFound,
    #[error("This email address is already subscribed to the newsletter.")]
    AlreadySubscribed,
    #[error("The subscription has already been confirmed.")]
    AlreadyConfirmed,
    #[error("The token is invalid or has expired.")]
    InvalidOrExpiredToken,
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::ValidationError(_) => ErrorKind::Validation,
            LifecycleError::NewsletterNotFound | LifecycleError::SubscriptionNotFound => {
                ErrorKind::NotFound
            }
            LifecycleError::AlreadySubscribed | LifecycleError::AlreadyConfirmed => {
                ErrorKind::Conflict
            }
            LifecycleError::InvalidOrExpiredToken => ErrorKind::InvalidOrExpiredToken,
            LifecycleError::Cancelled(_) => ErrorKind::Cancelled,
            LifecycleError::UnexpectedError(_) => ErrorKind::Internal,
        }
    }
}

impl std::fmt::Debug for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
