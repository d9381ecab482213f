//! Text envelope support through `serde`.

use core::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, Visitor};
use serde::ser::{self, Serialize, Serializer};

use crate::resolve::from_digit_width;
use crate::{
    Error, Format, LooseDateInterpreter, Resolver, SharedTimeValue, TimeValue, Timestamp,
};

impl<'de> serde::Deserialize<'de> for Timestamp {
    /// Decodes the `secs`/`nanos` pair, carrying excess or negative
    /// nanoseconds into the seconds.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(rename = "Timestamp")]
        struct Parts {
            secs: i64,
            nanos: i64,
        }

        let parts = Parts::deserialize(deserializer)?;

        Timestamp::from_parts(parts.secs, parts.nanos)
            .ok_or_else(|| de::Error::custom(Error::Overflow))
    }
}

impl Serialize for TimeValue {
    /// Serializes `None` for no value, an `i64` for numeric formats and a
    /// string for textual layouts.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(instant) = self.instant() else {
            return serializer.serialize_none();
        };

        match self.format() {
            Format::Timestamp => serializer.serialize_i64(instant.as_secs()),
            Format::TimestampNano => {
                let nanos = instant.unix_nanos().map_err(ser::Error::custom)?;
                serializer.serialize_i64(nanos)
            }
            format => {
                let rendered = format.render(&instant).map_err(ser::Error::custom)?;
                serializer.serialize_str(&rendered)
            }
        }
    }
}

impl Serialize for SharedTimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot()
            .map_err(ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for TimeValue {
    /// Decodes with the default [`Resolver`] and tags the result with
    /// [`Format::Timestamp`].
    ///
    /// Use [`ResolveSeed`] to pick the resolver and the format.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let resolver = Resolver::default();

        ResolveSeed::new(&resolver, Format::default()).deserialize(deserializer)
    }
}

/// Stateful deserializer decoding a [`TimeValue`] with a given resolver and
/// output format.
///
/// Integers follow the digit-width rule of
/// [`Resolver::resolve_text`], strings are resolved as already unquoted text
/// and unit or `None` decode to no value.
///
/// # Examples
///
/// ```
/// use serde::de::DeserializeSeed;
/// use flex_time::{Format, ResolveSeed, Resolver, TimeValue, Timestamp};
///
/// let resolver = Resolver::default();
/// let seed = ResolveSeed::new(&resolver, Format::Rfc3339Nano);
///
/// let mut de = serde_json::Deserializer::from_str("1438883568790859087");
/// let value = seed.deserialize(&mut de).unwrap();
///
/// assert_eq!(value, TimeValue::new(Timestamp::new(1_438_883_568, 790_859_087), Format::Rfc3339Nano));
/// ```
#[derive(Debug)]
pub struct ResolveSeed<'a, I> {
    resolver: &'a Resolver<I>,
    format: Format,
}

impl<'a, I> ResolveSeed<'a, I> {
    /// Creates a seed.
    pub fn new(resolver: &'a Resolver<I>, format: Format) -> Self {
        Self { resolver, format }
    }
}

impl<'a, I> Clone for ResolveSeed<'a, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, I> Copy for ResolveSeed<'a, I> {}

impl<'de, 'a, I: LooseDateInterpreter> DeserializeSeed<'de> for ResolveSeed<'a, I> {
    type Value = TimeValue;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<TimeValue, D::Error> {
        let instant = deserializer.deserialize_any(TokenVisitor {
            resolver: self.resolver,
        })?;

        Ok(match instant {
            Some(instant) => TimeValue::new(instant, self.format),
            None => TimeValue::none(self.format),
        })
    }
}

struct TokenVisitor<'a, I> {
    resolver: &'a Resolver<I>,
}

impl<'de, 'a, I: LooseDateInterpreter> Visitor<'de> for TokenVisitor<'a, I> {
    type Value = Option<Timestamp>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer timestamp, a date string or null")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(from_digit_width(value, digit_count(value.unsigned_abs()))))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        let signed = i64::try_from(value).map_err(|_| E::custom(Error::Overflow))?;

        Ok(Some(from_digit_width(signed, digit_count(value))))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        self.resolver.resolve_unquoted(value).map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

fn digit_count(value: u64) -> usize {
    value.checked_ilog10().map_or(1, |log| log as usize + 1)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        ts: TimeValue,
    }

    fn decode(json: &str) -> TimeValue {
        serde_json::from_str::<Record>(json).unwrap().ts
    }

    fn encode(ts: TimeValue) -> String {
        serde_json::to_string(&Record { ts }).unwrap()
    }

    #[test]
    fn nano_round_trip() {
        for (json, expected) in [
            (
                r#"{"ts":1417773080000001234}"#,
                Timestamp::new(1_417_773_080, 1_234),
            ),
            (
                r#"{"ts":1417791080003300000}"#,
                Timestamp::new(1_417_791_080, 3_300_000),
            ),
            (
                r#"{"ts":1420019480100000000}"#,
                Timestamp::new(1_420_019_480, 100_000_000),
            ),
            (
                r#"{"ts":1420062689999999999}"#,
                Timestamp::new(1_420_062_689, 999_999_999),
            ),
        ] {
            let ts = decode(json);
            assert_eq!(ts.instant(), Some(expected));
            assert_eq!(encode(ts.with_format(Format::TimestampNano)), json);
        }
    }

    #[test]
    fn null() {
        let ts = decode(r#"{"ts":null}"#);
        assert!(ts.is_none());
        assert_eq!(encode(ts), r#"{"ts":null}"#);

        assert!(decode(r#"{"ts":""}"#).is_none());
        assert!(decode(r#"{"ts":"null"}"#).is_none());
    }

    #[test]
    fn rfc3339_string() {
        let ts = decode(r#"{"ts":"2015-08-06T12:17:25.881396749Z"}"#);
        assert_eq!(ts.instant(), Some(Timestamp::new(1_438_863_445, 881_396_749)));
        assert_eq!(
            encode(ts.with_format(Format::TimestampNano)),
            r#"{"ts":1438863445881396749}"#
        );
        assert_eq!(
            encode(ts.with_format(Format::Rfc3339Nano)),
            r#"{"ts":"2015-08-06T12:17:25.881396749Z"}"#
        );
    }

    #[test]
    fn quoted_seconds() {
        let ts = decode(r#"{"ts":"141779108"}"#);
        assert_eq!(ts.instant(), Some(Timestamp::new(141_779_108, 0)));
        assert_eq!(
            encode(ts.with_format(Format::TimestampNano)),
            r#"{"ts":141779108000000000}"#
        );
    }

    #[test]
    fn bare_seconds() {
        let ts = decode(r#"{"ts":141779108}"#);
        assert_eq!(ts, TimeValue::new(Timestamp::new(141_779_108, 0), Format::Timestamp));
        assert_eq!(encode(ts), r#"{"ts":141779108}"#);

        assert_eq!(
            decode(r#"{"ts":-86400}"#).instant(),
            Some(Timestamp::new(-86_400, 0))
        );
        assert_eq!(decode(r#"{"ts":0}"#).instant(), Some(Timestamp::EPOCH));
    }

    #[test]
    fn loose_strings() {
        for (json, expected) in [
            (
                r#"{"ts":"2014-12-05 09:51:20.939152 -0500"}"#,
                Timestamp::new(1_417_791_080, 939_152_000),
            ),
            (
                r#"{"ts":"09:51:20.939152pm 2014-31-12"}"#,
                Timestamp::new(1_420_062_680, 939_152_000),
            ),
        ] {
            let ts = decode(json);
            assert_eq!(ts.instant(), Some(expected), "{json}");
        }
    }

    #[test]
    fn rejects() {
        assert!(serde_json::from_str::<Record>(r#"{"ts":"not a date"}"#).is_err());
        assert!(serde_json::from_str::<Record>(r#"{"ts":1.5}"#).is_err());
        assert!(serde_json::from_str::<Record>(r#"{"ts":true}"#).is_err());
        assert!(serde_json::from_str::<Record>(r#"{"ts":18446744073709551615}"#).is_err());
    }

    #[test]
    fn textual_layouts() {
        let t = Timestamp::new(1_438_883_568, 790_859_087);

        assert_eq!(
            encode(TimeValue::new(t, Format::Ansic)),
            r#"{"ts":"Thu Aug  6 17:52:48 2015"}"#
        );
        assert_eq!(
            encode(TimeValue::new(t, Format::Rfc822Z)),
            r#"{"ts":"06 Aug 15 17:52 +0000"}"#
        );
    }

    #[test]
    fn encode_overflow() {
        let ts = TimeValue::new(Timestamp::MAX, Format::TimestampNano);
        assert!(serde_json::to_string(&ts).is_err());
    }

    #[test]
    fn shared_value() {
        let shared = SharedTimeValue::new(TimeValue::new(
            Timestamp::new(141_779_108, 999),
            Format::Timestamp,
        ));
        assert_eq!(serde_json::to_string(&shared).unwrap(), "141779108");

        shared.set_nano(true);
        assert_eq!(serde_json::to_string(&shared).unwrap(), "141779108000000999");
    }

    #[test]
    fn seed_with_custom_resolver() {
        use crate::{InterpretError, LooseInstant};

        let resolver = Resolver::new(|_: &str| -> Result<LooseInstant, InterpretError> {
            Ok(LooseInstant {
                secs: 42,
                micros: 5,
            })
        });
        let seed = ResolveSeed::new(&resolver, Format::Kitchen);

        let mut de = serde_json::Deserializer::from_str(r#""whenever""#);
        assert_eq!(
            seed.deserialize(&mut de).unwrap(),
            TimeValue::new(Timestamp::new(42, 5_000), Format::Kitchen)
        );

        let mut de = serde_json::Deserializer::from_str("null");
        assert_eq!(seed.deserialize(&mut de).unwrap(), TimeValue::none(Format::Kitchen));
    }

    #[test]
    fn timestamp_fields() {
        let t = Timestamp::new(1_438_883_568, 790_859_087);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"secs":1438883568,"nanos":790859087}"#);
        assert_eq!(serde_json::from_str::<Timestamp>(&json).unwrap(), t);

        let carried: Timestamp =
            serde_json::from_str(r#"{"secs":0,"nanos":1500000000}"#).unwrap();
        assert_eq!(carried, Timestamp::new(1, 500_000_000));
        assert_eq!(carried.subsec_nanos(), 500_000_000);
        assert!(carried > Timestamp::new(1, 0));

        assert_eq!(
            serde_json::from_str::<Timestamp>(r#"{"secs":10,"nanos":-1}"#).unwrap(),
            Timestamp::new(9, 999_999_999)
        );
        assert!(serde_json::from_str::<Timestamp>(
            r#"{"secs":9223372036854775807,"nanos":1000000000}"#
        )
        .is_err());
    }

    #[test]
    fn digit_counts() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(1_438_883_568_790_859_087), 19);
        assert_eq!(digit_count(u64::MAX), 20);
    }
}
