use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{NewsletterId, SubscriberEmail, SubscriberStatus};

#[derive(Debug, Clone, serde::Serialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub newsletter_id: NewsletterId,
    pub status: SubscriberStatus,
    #[serde(skip)]
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    pub id: Uuid,
}
