use super::{NewsletterId, SubscriberEmail};

#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub newsletter_id: NewsletterId,
}

impl NewSubscriber {
    pub fn parse(email: String, newsletter_id: &str) -> Result<Self, String> {
        let newsletter_id = NewsletterId::parse(newsletter_id)?;
        let email = SubscriberEmail::parse(email)?;
        Ok(Self {
            email,
            newsletter_id,
        })
    }
}
