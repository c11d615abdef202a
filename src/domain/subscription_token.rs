use rand::{Rng, distr::Alphanumeric};
use unicode_segmentation::UnicodeSegmentation;

use super::StatusTransition;

const GENERATED_LENGTH: usize = 25;
const MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    Confirm,
    Unsubscribe,
}

impl TokenPurpose {
    pub fn parse(purpose: &str) -> Result<Self, String> {
        match purpose {
            "confirm" => Ok(TokenPurpose::Confirm),
            "unsubscribe" => Ok(TokenPurpose::Unsubscribe),
            other => Err(format!("{other} is not a valid token purpose")),
        }
    }

    pub fn transition(&self) -> StatusTransition {
        match self {
            TokenPurpose::Confirm => StatusTransition::CONFIRM,
            TokenPurpose::Unsubscribe => StatusTransition::UNSUBSCRIBE,
        }
    }
}

impl AsRef<str> for TokenPurpose {
    fn as_ref(&self) -> &str {
        match self {
            TokenPurpose::Confirm => "confirm",
            TokenPurpose::Unsubscribe => "unsubscribe",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(String);

impl SubscriptionToken {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let token = std::iter::repeat_with(|| rng.sample(Alphanumeric))
            .map(char::from)
            .take(GENERATED_LENGTH)
            .collect();
        Self(token)
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("The subscription token is missing.".to_string());
        }

        let is_too_long = s.graphemes(true).count() > MAX_LENGTH;
        let has_forbidden_chars = s.chars().any(|c| !c.is_ascii_alphanumeric());

        if is_too_long || has_forbidden_chars {
            Err("The subscription token is malformed.".to_string())
        } else {
            Ok(Self(s.to_string()))
        }
    }
}

impl AsRef<str> for SubscriptionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Tokens are bearer secrets; keep them out of logs.
impl std::fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SubscriptionToken(..)")
    }
}
