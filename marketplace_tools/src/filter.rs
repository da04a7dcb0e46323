use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};

/// A half-open slice of time that a sync pass wants to query, serialised for the remote API
/// as `field:[start..end]` with epoch-second bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn filter(&self, field: &str) -> FilterExpr {
        FilterExpr(format!("{field}:[{}..{}]", self.start.timestamp(), self.end.timestamp()))
    }
}

/// A server-side filter expression of the form `field:[start..end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr(String);

impl FilterExpr {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FilterExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
