mod new_subscriber;
mod newsletter_id;
mod pagination;
mod subscriber;
mod subscriber_email;
mod subscriber_status;
mod subscription_token;

pub use new_subscriber::NewSubscriber;
pub use newsletter_id::NewsletterId;
pub use pagination::{DEFAULT_LIMIT, MAX_LIMIT, Pagination};
pub use subscriber::{Editor, Subscriber};
pub use subscriber_email::SubscriberEmail;
pub use subscriber_status::{StatusTransition, SubscriberStatus};
pub use subscription_token::{SubscriptionToken, TokenPurpose};
