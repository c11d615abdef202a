mod health_check;
mod helpers;
mod subscribers;
mod subscriptions;
mod subscriptions_confirm;
mod unsubscribe;

pub use health_check::health_check;
pub use helpers::RequestTimeout;
pub use subscribers::list_subscribers;
pub use subscriptions::{subscribe, unsubscribe_by_email};
pub use subscriptions_confirm::confirm;
pub use unsubscribe::unsubscribe;
