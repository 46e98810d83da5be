//! Listing projection: ownership plus the paid placement fields.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::user::UserId;
use crate::error::DomainError;

/// Identifier of a published listing (owned by the listing service).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ListingId(i64);

impl ListingId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ListingId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A listing as seen by the order engine.
///
/// Only `top_start_time`, `top_end_time` and `refresh_time` are written here,
/// and only while fulfilling a paid order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub user_id: UserId,
    pub title: String,
    pub top_start_time: Option<DateTime<Utc>>,
    pub top_end_time: Option<DateTime<Utc>>,
    pub refresh_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Adds `hours` of top placement.
    ///
    /// A window that is still running is extended past its current end, so
    /// stacked purchases accumulate. An expired or missing window restarts at
    /// `now`. The listing is left untouched when the new end is not a
    /// representable time.
    pub fn extend_top_window(
        &mut self,
        now: DateTime<Utc>,
        hours: i32,
    ) -> Result<(), DomainError> {
        let duration = Duration::hours(i64::from(hours));
        let (start, end) = match self.top_end_time {
            Some(end) if end > now => (self.top_start_time.unwrap_or(now), end),
            _ => (now, now),
        };
        let end = end
            .checked_add_signed(duration)
            .ok_or(DomainError::TopWindowOverflow)?;

        self.top_start_time = Some(start);
        self.top_end_time = Some(end);
        self.updated_at = now;
        Ok(())
    }

    /// Bumps the listing's recency.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.refresh_time = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Listing {
        Listing {
            id: ListingId::new(7),
            user_id: UserId::new(1),
            title: "Warehouse picker".to_string(),
            top_start_time: None,
            top_end_time: None,
            refresh_time: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_window_starts_now() {
        let now = Utc::now();
        let mut l = listing();
        l.extend_top_window(now, 72).unwrap();
        assert_eq!(l.top_start_time, Some(now));
        assert_eq!(l.top_end_time, Some(now + Duration::hours(72)));
    }

    #[test]
    fn test_active_window_is_merged() {
        let now = Utc::now();
        let mut l = listing();
        let started = now - Duration::hours(1);
        l.top_start_time = Some(started);
        l.top_end_time = Some(now + Duration::hours(2));

        l.extend_top_window(now, 3).unwrap();

        assert_eq!(l.top_start_time, Some(started));
        assert_eq!(l.top_end_time, Some(now + Duration::hours(5)));
    }

    #[test]
    fn test_expired_window_restarts() {
        let now = Utc::now();
        let mut l = listing();
        l.top_start_time = Some(now - Duration::hours(10));
        l.top_end_time = Some(now - Duration::hours(1));

        l.extend_top_window(now, 24).unwrap();

        assert_eq!(l.top_start_time, Some(now));
        assert_eq!(l.top_end_time, Some(now + Duration::hours(24)));
    }

    #[test]
    fn test_stacked_window_past_max_time_is_refused() {
        let now = Utc::now();
        let mut l = listing();
        l.extend_top_window(now, i32::MAX).unwrap();
        let before = l.clone();

        let err = l.extend_top_window(now, i32::MAX).unwrap_err();

        assert!(matches!(err, DomainError::TopWindowOverflow));
        assert_eq!(l.top_start_time, before.top_start_time);
        assert_eq!(l.top_end_time, before.top_end_time);
        assert_eq!(l.updated_at, before.updated_at);
    }

    #[test]
    fn test_ownership() {
        let l = listing();
        assert!(l.is_owned_by(UserId::new(1)));
        assert!(!l.is_owned_by(UserId::new(2)));
    }
}
