//! # Rotation Policy
//!
//! Decides whether a credential is inside its rotation window.
//!
//! A credential with no known expiry is never rotated automatically. One
//! with an expiry is due once the whole days left before it expires, rounded
//! down, no longer exceed the overlap window (`expirationOverlapDays`).
//! Already expired credentials are always due.

use crate::constants::MILLIS_PER_DAY;
use chrono::{DateTime, Utc};

/// Whole days left before `expires_on`, rounded down
///
/// Negative once the credential has expired.
#[must_use]
pub fn days_to_expire(expires_on: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_on - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Whether a credential expiring at `expires_on` should be rotated at `now`
///
/// `overlap_days` defaults to 0 when unset, meaning rotation only happens
/// once the credential is about to expire or has expired.
#[must_use]
pub fn should_rotate(
    expires_on: Option<DateTime<Utc>>,
    overlap_days: Option<i64>,
    now: DateTime<Utc>,
) -> bool {
    let Some(expires_on) = expires_on else {
        return false;
    };

    days_to_expire(expires_on, now) <= overlap_days.unwrap_or(0)
}
