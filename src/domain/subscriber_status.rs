#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberStatus {
    Pending,
    Active,
    Unsubscribed,
}

impl SubscriberStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, SubscriberStatus::Pending | SubscriberStatus::Active)
    }

    pub fn parse(status: &str) -> Result<SubscriberStatus, String> {
        match status {
            "pending" => Ok(SubscriberStatus::Pending),
            "active" => Ok(SubscriberStatus::Active),
            "unsubscribed" => Ok(SubscriberStatus::Unsubscribed),
            other => Err(format!("{other} is not a valid subscriber status")),
        }
    }
}

impl AsRef<str> for SubscriberStatus {
    fn as_ref(&self) -> &str {
        match self {
            SubscriberStatus::Pending => "pending",
            SubscriberStatus::Active => "active",
            SubscriberStatus::Unsubscribed => "unsubscribed",
        }
    }
}

/// A guarded status change: applied only while the subscriber is in one of
/// the `from` states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: &'static [SubscriberStatus],
    pub to: SubscriberStatus,
}

impl StatusTransition {
    pub const CONFIRM: StatusTransition = StatusTransition {
        from: &[SubscriberStatus::Pending],
        to: SubscriberStatus::Active,
    };

    pub const UNSUBSCRIBE: StatusTransition = StatusTransition {
        from: &[SubscriberStatus::Pending, SubscriberStatus::Active],
        to: SubscriberStatus::Unsubscribed,
    };

    pub fn allows(&self, current: SubscriberStatus) -> bool {
        self.from.contains(&current)
    }
}
