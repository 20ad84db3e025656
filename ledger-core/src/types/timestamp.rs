//! Store-native timestamps
//!
//! A timestamp is a `{seconds, nanoseconds}` pair, ordered lexicographically.
//! Rules compare timestamps for exact equality against the store's commit time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Store timestamp
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub seconds: i64,
    /// Sub-second nanoseconds, always in `0..1_000_000_000`
    pub nanoseconds: i32,
}

impl Timestamp {
    /// Build from a raw `{seconds, nanoseconds}` pair
    pub fn from_parts(seconds: i64, nanoseconds: i64) -> LedgerResult<Self> {
        if !(0..NANOS_PER_SECOND as i64).contains(&nanoseconds) {
            return Err(LedgerError::InvalidNanoseconds { nanoseconds });
        }
        Ok(Self {
            seconds,
            nanoseconds: nanoseconds as i32,
        })
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    /// A timestamp one nanosecond before now.
    ///
    /// Used by tests to show that a self-assigned timestamp is never accepted
    /// as the store's "now".
    pub fn not_now() -> Self {
        Self::now().shifted_nanos(-1)
    }

    /// Shift by a (possibly negative) number of nanoseconds
    pub fn shifted_nanos(&self, delta: i64) -> Self {
        let total = self.seconds as i128 * NANOS_PER_SECOND + self.nanoseconds as i128 + delta as i128;
        Self {
            seconds: total.div_euclid(NANOS_PER_SECOND) as i64,
            nanoseconds: total.rem_euclid(NANOS_PER_SECOND) as i32,
        }
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos() as i32,
        }
    }

    pub fn to_datetime(&self) -> LedgerResult<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds as u32).ok_or(
            LedgerError::TimestampOutOfRange {
                seconds: self.seconds,
            },
        )
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(&dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_rejects_out_of_range_nanos() {
        assert!(Timestamp::from_parts(10, 999_999_999).is_ok());
        assert!(matches!(
            Timestamp::from_parts(10, 1_000_000_000),
            Err(LedgerError::InvalidNanoseconds { .. })
        ));
        assert!(Timestamp::from_parts(10, -1).is_err());
    }

    #[test]
    fn test_shift_borrows_from_seconds() {
        let ts = Timestamp::from_parts(100, 0).unwrap();
        let shifted = ts.shifted_nanos(-1);
        assert_eq!(shifted.seconds, 99);
        assert_eq!(shifted.nanoseconds, 999_999_999);
        assert_eq!(shifted.shifted_nanos(1), ts);
    }

    #[test]
    fn test_not_now_is_strictly_earlier() {
        let before = Timestamp::now();
        let not_now = Timestamp::not_now();
        assert!(not_now < Timestamp::now());
        assert!(not_now >= before.shifted_nanos(-1));
    }

    #[test]
    fn test_datetime_conversion() {
        let ts = Timestamp::from_parts(1_700_000_000, 123_456_789).unwrap();
        let dt = ts.to_datetime().unwrap();
        assert_eq!(Timestamp::from(dt), ts);
        assert_eq!(ts.to_string(), "1700000000.123456789");
    }

    #[test]
    fn test_ordering() {
        let a = Timestamp::from_parts(1, 500).unwrap();
        let b = Timestamp::from_parts(2, 0).unwrap();
        let c = Timestamp::from_parts(2, 1).unwrap();
        assert!(a < b && b < c);
    }
}
