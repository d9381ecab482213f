//! Nanosecond-precision timestamps with format-tagged encoding and fallback
//! decoding.
//!
//! # Overview
//!
//! Timestamps travel over the wire in many shapes: Unix seconds, Unix
//! nanoseconds, RFC 3339 strings, legacy RFC 822/1123 layouts, or whatever a
//! human typed into a form. This crate provides a [`TimeValue`] that pairs a
//! nanosecond-precision [`Timestamp`] with a [`Format`] selecting how it is
//! encoded, and a [`Resolver`] that decodes any of the above without an
//! explicit type tag.
//!
//! Encoding is a direct function of the timestamp and its format. Decoding
//! follows a fixed precedence, stopping at the first success:
//!
//! 1. a base-10 integer literal (quoted or not) is a Unix timestamp: a
//!    19-digit literal counts nanoseconds, anything else counts seconds,
//! 2. an empty token or `null` decodes to "no value",
//! 3. a strict layout ([`Format::Rfc3339`] by default),
//! 4. a [`LooseDateInterpreter`], [`Approxidate`] by default.
//!
//! Document (BSON) envelopes carry native numbers whose literal width is
//! lost, so they use a magnitude threshold instead of the digit count: see
//! [`Resolver::resolve_bson`].
//!
//! # Design choices and limitations
//!
//! Numeric nanosecond encoding is limited to the range of an `i64` count of
//! nanoseconds, i.e. 1677-09-21 to 2262-04-11. The 19-digit rule only
//! recognizes nanosecond literals from 2001-09-09 onwards; older nanosecond
//! timestamps are shorter and decode as seconds.
//!
//! Time zones are never stored: every textual layout is rendered in UTC.
//!
//! # Features flags
//!
//! ### Serialization
//!
//! `TimeValue` implements the text envelope contract through `serde` when the
//! `serde` feature is activated (the default). Deserialization requires a
//! self-describing format such as JSON.
//!
//! ### BSON
//!
//! Conversions to and from `bson::Bson` are available with the `bson`
//! feature (the default).
//!
//! # Examples
//!
//! ```
//! use flex_time::{Format, Resolver, TimeValue, Timestamp};
//!
//! let t = Timestamp::new(1_438_883_568, 790_859_087);
//!
//! let value = TimeValue::new(t, Format::TimestampNano);
//! assert_eq!(value.encode_text().unwrap(), "1438883568790859087");
//!
//! let value = value.with_format(Format::Rfc3339Nano);
//! assert_eq!(value.encode_text().unwrap(), r#""2015-08-06T17:52:48.790859087Z""#);
//!
//! let resolver = Resolver::default();
//! assert_eq!(resolver.resolve_text("1438883568790859087"), Ok(Some(t)));
//! assert_eq!(resolver.resolve_text("null"), Ok(None));
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod approxidate;
#[cfg(feature = "bson")]
mod document;
mod errors;
mod format;
mod interpret;
mod resolve;
#[cfg(feature = "serde")]
mod serde_impls;
mod value;

use core::fmt;
use std::time::{Duration, SystemTime};

pub use approxidate::Approxidate;
pub use errors::{Error, InterpretError};
pub use format::Format;
pub use interpret::{Deadline, LooseDateInterpreter, LooseInstant};
pub use resolve::{
    Resolver, ResolverConfig, NANO_MAGNITUDE_THRESHOLD, NANO_TIMESTAMP_DIGITS,
};
#[cfg(feature = "serde")]
pub use serde_impls::ResolveSeed;
pub use value::{SharedTimeValue, TimeValue};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Nanosecond-precision point in time relative to the Unix epoch
/// (1970-01-01 00:00:00 UTC).
///
/// A timestamp is represented as a 64-bit signed number of seconds and a
/// positive number of nanoseconds. The nanoseconds always point towards the
/// future, even for dates in the past of the epoch.
///
/// # Examples
///
/// ```
/// use flex_time::Timestamp;
///
/// // 2015-08-06 17:52:48.790859087 UTC.
/// let t = Timestamp::new(1_438_883_568, 790_859_087);
///
/// assert_eq!(t.as_secs(), 1_438_883_568);
/// assert_eq!(t.subsec_nanos(), 790_859_087);
/// assert_eq!(t.unix_nanos(), Ok(1_438_883_568_790_859_087));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Timestamp {
    /// The number of whole seconds in the future (if positive) or in the past
    /// (if negative) of the Unix epoch.
    ///
    /// The automatic derivation of `PartialOrd` relies on lexicographical
    /// comparison so `secs` must be declared before `nanos`.
    secs: i64,
    /// The sub-second number of nanoseconds in the future of `secs`.
    nanos: u32,
}

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Self = Self { secs: 0, nanos: 0 };

    /// The minimum possible timestamp.
    pub const MIN: Self = Self {
        secs: i64::MIN,
        nanos: 0,
    };

    /// The maximum possible timestamp.
    pub const MAX: Self = Self {
        secs: i64::MAX,
        nanos: NANOS_PER_SEC - 1,
    };

    /// Creates a timestamp from Unix seconds and a sub-second number of
    /// nanoseconds.
    ///
    /// # Panics
    ///
    /// This constructor will panic if the number of nanoseconds is greater
    /// than or equal to 1 second. See [`from_parts`](Self::from_parts) for a
    /// normalizing version.
    pub const fn new(secs: i64, subsec_nanos: u32) -> Self {
        assert!(
            subsec_nanos < NANOS_PER_SEC,
            "invalid number of nanoseconds"
        );

        Self {
            secs,
            nanos: subsec_nanos,
        }
    }

    /// Creates a timestamp from Unix seconds and an arbitrary, possibly
    /// negative, number of nanoseconds.
    ///
    /// Whole seconds in excess of the nanoseconds are carried over to the
    /// seconds. Returns `None` if the result is outside the representable
    /// range.
    ///
    /// # Examples
    ///
    /// ```
    /// use flex_time::Timestamp;
    ///
    /// assert_eq!(
    ///     Timestamp::from_parts(1_420_062_680, 9_999_999_999),
    ///     Some(Timestamp::new(1_420_062_689, 999_999_999))
    /// );
    /// assert_eq!(
    ///     Timestamp::from_parts(10, -1),
    ///     Some(Timestamp::new(9, 999_999_999))
    /// );
    /// ```
    pub const fn from_parts(secs: i64, nanos: i64) -> Option<Self> {
        let carry = nanos.div_euclid(NANOS_PER_SEC as i64);
        let nanos = nanos.rem_euclid(NANOS_PER_SEC as i64) as u32;

        match secs.checked_add(carry) {
            Some(secs) => Some(Self { secs, nanos }),
            None => None,
        }
    }

    /// Creates a timestamp from a number of nanoseconds since the epoch.
    pub const fn from_unix_nanos(nanos: i64) -> Self {
        Self {
            secs: nanos.div_euclid(NANOS_PER_SEC as i64),
            nanos: nanos.rem_euclid(NANOS_PER_SEC as i64) as u32,
        }
    }

    /// Creates a timestamp from a number of milliseconds since the epoch.
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self {
            secs: millis.div_euclid(1000),
            nanos: millis.rem_euclid(1000) as u32 * 1_000_000,
        }
    }

    /// Creates a timestamp from the system clock.
    ///
    /// Returns an error if the timestamp is outside the representable range.
    pub fn now() -> Result<Self, Error> {
        Self::from_system_time(&SystemTime::now())
    }

    /// Creates a timestamp from a `SystemTime`.
    ///
    /// Returns an error if the timestamp is outside the representable range.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, SystemTime};
    /// use flex_time::Timestamp;
    ///
    /// let system_time = SystemTime::UNIX_EPOCH - Duration::new(3, 500_000_000);
    /// assert_eq!(
    ///     Timestamp::from_system_time(&system_time),
    ///     Ok(Timestamp::new(-4, 500_000_000))
    /// );
    /// ```
    pub fn from_system_time(system_time: &SystemTime) -> Result<Self, Error> {
        match system_time.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(elapsed) => {
                let secs = i64::try_from(elapsed.as_secs()).map_err(|_| Error::Overflow)?;

                Ok(Self::new(secs, elapsed.subsec_nanos()))
            }
            Err(err) => {
                let before = err.duration();
                let secs = i64::try_from(before.as_secs()).map_err(|_| Error::Overflow)?;

                Self::from_parts(-secs, -(before.subsec_nanos() as i64)).ok_or(Error::Overflow)
            }
        }
    }

    /// Creates a timestamp from a `chrono::DateTime`.
    ///
    /// `chrono` reports leap seconds as a nanosecond count of 1 second or
    /// more; these are carried over to the seconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::DateTime;
    /// use flex_time::Timestamp;
    ///
    /// let date_time = DateTime::parse_from_rfc3339("2015-08-06T19:52:48.5+02:00").unwrap();
    /// assert_eq!(
    ///     Timestamp::from_chrono_date_time(&date_time),
    ///     Ok(Timestamp::new(1_438_883_568, 500_000_000))
    /// );
    /// ```
    pub fn from_chrono_date_time<Tz: chrono::TimeZone>(
        date_time: &chrono::DateTime<Tz>,
    ) -> Result<Self, Error> {
        Self::from_parts(
            date_time.timestamp(),
            date_time.timestamp_subsec_nanos() as i64,
        )
        .ok_or(Error::Overflow)
    }

    /// Returns the number of whole seconds since the epoch.
    ///
    /// Seconds are always rounded towards `-∞`.
    pub const fn as_secs(&self) -> i64 {
        self.secs
    }

    /// Returns the sub-second fractional part in nanoseconds.
    pub const fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    /// Returns the number of nanoseconds since the epoch.
    ///
    /// Returns [`Error::Overflow`] outside the range
    /// 1677-09-21T00:12:43.145224192Z to 2262-04-11T23:47:16.854775807Z.
    pub const fn unix_nanos(&self) -> Result<i64, Error> {
        if let Some(nanos) = self.secs.checked_mul(NANOS_PER_SEC as i64) {
            if let Some(nanos) = nanos.checked_add(self.nanos as i64) {
                return Ok(nanos);
            }
        }

        Err(Error::Overflow)
    }

    /// Returns a `SystemTime` based on the timestamp.
    ///
    /// Returns an error if the timestamp cannot be represented by the
    /// platform's `SystemTime`.
    pub fn to_system_time(&self) -> Result<SystemTime, Error> {
        if self.secs >= 0 {
            SystemTime::UNIX_EPOCH.checked_add(Duration::new(self.secs as u64, self.nanos))
        } else {
            SystemTime::UNIX_EPOCH
                .checked_sub(Duration::from_secs(self.secs.unsigned_abs()))
                .and_then(|t| t.checked_add(Duration::new(0, self.nanos)))
        }
        .ok_or(Error::Overflow)
    }

    /// Returns a UTC `chrono::DateTime` based on the timestamp.
    ///
    /// Returns an error if the timestamp is outside the range supported by
    /// `chrono`.
    pub fn to_chrono_date_time(&self) -> Result<chrono::DateTime<chrono::Utc>, Error> {
        chrono::DateTime::from_timestamp(self.secs, self.nanos).ok_or(Error::Overflow)
    }
}

impl fmt::Display for Timestamp {
    /// Formats the timestamp as an RFC 3339 UTC date-time with as many
    /// fractional digits as needed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Format::Rfc3339Nano.render(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{}.{:09}s", self.secs, self.nanos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality() {
        let t0 = Timestamp::new(123, 123_456_789);
        let t1 = Timestamp::new(123, 123_456_789);
        let t2 = Timestamp::new(123, 123_456_790);
        let t3 = Timestamp::new(124, 123_456_789);

        assert_eq!(t0, t1);
        assert_ne!(t0, t2);
        assert_ne!(t0, t3);
    }

    #[test]
    fn ordering() {
        let t0 = Timestamp::new(0, 1);
        let t1 = Timestamp::new(1, 0);
        let t2 = Timestamp::new(-1, 999_999_999);

        assert!(t1 > t0);
        assert!(t0 > t2);
    }

    #[test]
    #[should_panic]
    fn invalid() {
        Timestamp::new(123, 1_000_000_000);
    }

    #[test]
    fn from_parts_normalizes() {
        assert_eq!(
            Timestamp::from_parts(1_420_062_680, 9_999_999_999),
            Some(Timestamp::new(1_420_062_689, 999_999_999))
        );
        assert_eq!(
            Timestamp::from_parts(0, -1_500_000_000),
            Some(Timestamp::new(-2, 500_000_000))
        );
        assert_eq!(
            Timestamp::from_parts(5, 0),
            Some(Timestamp::new(5, 0))
        );
        assert_eq!(Timestamp::from_parts(i64::MAX, NANOS_PER_SEC as i64), None);
        assert_eq!(Timestamp::from_parts(i64::MIN, -1), None);
    }

    #[test]
    fn unix_nanos_round_trip() {
        let t = Timestamp::from_unix_nanos(1_438_883_568_790_859_087);
        assert_eq!(t, Timestamp::new(1_438_883_568, 790_859_087));
        assert_eq!(t.unix_nanos(), Ok(1_438_883_568_790_859_087));

        let t = Timestamp::from_unix_nanos(-1);
        assert_eq!(t, Timestamp::new(-1, 999_999_999));
        assert_eq!(t.unix_nanos(), Ok(-1));

        assert_eq!(
            Timestamp::from_unix_nanos(i64::MIN).unix_nanos(),
            Ok(i64::MIN)
        );
        assert_eq!(
            Timestamp::from_unix_nanos(i64::MAX).unix_nanos(),
            Ok(i64::MAX)
        );
    }

    #[test]
    fn unix_nanos_overflow() {
        assert_eq!(Timestamp::new(9_300_000_000, 0).unix_nanos(), Err(Error::Overflow));
        assert_eq!(Timestamp::MIN.unix_nanos(), Err(Error::Overflow));
        assert_eq!(Timestamp::MAX.unix_nanos(), Err(Error::Overflow));
    }

    #[test]
    fn from_unix_millis() {
        assert_eq!(
            Timestamp::from_unix_millis(1_438_883_568_790),
            Timestamp::new(1_438_883_568, 790_000_000)
        );
        assert_eq!(
            Timestamp::from_unix_millis(-1),
            Timestamp::new(-1, 999_000_000)
        );
    }

    #[test]
    fn now_smoke() {
        const START_OF_2022: i64 = 1_640_995_200;
        const START_OF_2100: i64 = 4_102_444_800;

        let now_secs = Timestamp::now().unwrap().as_secs();

        assert!(now_secs > START_OF_2022);
        assert!(now_secs < START_OF_2100);
    }

    #[test]
    fn system_time_round_trip() {
        for t in [
            Timestamp::new(978_352_496, 789_000_000),
            Timestamp::new(-1, 999_999_999),
            Timestamp::new(-978_352_496, 1),
            Timestamp::EPOCH,
        ] {
            let system_time = t.to_system_time().unwrap();
            assert_eq!(Timestamp::from_system_time(&system_time), Ok(t));
        }
    }

    #[test]
    fn from_system_time() {
        let system_time = SystemTime::UNIX_EPOCH + Duration::new(978_352_496, 789_000_000);

        assert_eq!(
            Timestamp::from_system_time(&system_time),
            Ok(Timestamp::new(978_352_496, 789_000_000))
        );
    }

    #[test]
    fn chrono_round_trip() {
        let date_time = chrono::DateTime::parse_from_rfc3339("2001-01-01T12:34:56.789Z").unwrap();
        let t = Timestamp::from_chrono_date_time(&date_time).unwrap();

        assert_eq!(t, Timestamp::new(978_352_496, 789_000_000));
        assert_eq!(t.to_chrono_date_time().unwrap(), date_time);
    }

    #[test]
    fn chrono_out_of_range() {
        assert_eq!(Timestamp::MAX.to_chrono_date_time(), Err(Error::Overflow));
    }

    #[test]
    fn display() {
        assert_eq!(
            Timestamp::new(1_438_883_568, 790_859_087).to_string(),
            "2015-08-06T17:52:48.790859087Z"
        );
        assert_eq!(
            Timestamp::new(1_438_883_568, 0).to_string(),
            "2015-08-06T17:52:48Z"
        );
    }
}
