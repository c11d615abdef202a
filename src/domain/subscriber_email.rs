use validator::ValidateEmail;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(s: String) -> Result<Self, String> {
        let candidate = s.trim().to_lowercase();
        if candidate.is_empty() {
            return Err("The subscriber email is empty.".to_string());
        }
        if !candidate.validate_email() || !has_dotted_domain(&candidate) {
            return Err(format!("{s} is not a valid subscriber email."));
        }
        Ok(Self(candidate))
    }
}

fn has_dotted_domain(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((_, domain)) => domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2,
        None => false,
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
