const MAX_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct NewsletterId(String);

impl NewsletterId {
    pub fn parse(segment: &str) -> Result<Self, String> {
        let segment = segment.trim();
        let is_empty = segment.is_empty();
        let is_too_long = segment.chars().count() > MAX_LENGTH;
        let has_forbidden_chars = segment
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        if is_empty || is_too_long || has_forbidden_chars {
            Err(format!("{segment:?} is not a valid newsletter identifier."))
        } else {
            Ok(Self(segment.to_string()))
        }
    }
}

impl AsRef<str> for NewsletterId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NewsletterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
