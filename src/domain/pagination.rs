pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Parses raw query-string values. Absent or empty values fall back to the
    /// defaults; `limit` above [`MAX_LIMIT`] is clamped.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, String> {
        let limit = match supplied(limit) {
            None => DEFAULT_LIMIT,
            Some(raw) => match raw.parse::<i64>() {
                Ok(value) if value > 0 => value.min(MAX_LIMIT),
                _ => return Err(format!("limit must be a positive integer, got {raw:?}")),
            },
        };
        let offset = match supplied(offset) {
            None => 0,
            Some(raw) => match raw.parse::<i64>() {
                Ok(value) if value >= 0 => value,
                _ => return Err(format!("offset must be a non-negative integer, got {raw:?}")),
            },
        };

        Ok(Self { limit, offset })
    }
}

fn supplied(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}
