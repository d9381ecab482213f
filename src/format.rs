//! Presentation formats.

use core::fmt::{self, Write as _};
use core::str::FromStr;

use chrono::{DateTime, NaiveDateTime};

use crate::{Error, Timestamp};

/// Output format selected for a [`TimeValue`](crate::TimeValue).
///
/// The set of formats is closed and their discriminants are stable, so they
/// may be persisted as integers (see [`TryFrom<u8>`](#impl-TryFrom%3Cu8%3E-for-Format)).
///
/// All textual layouts are rendered in UTC. The example outputs below are for
/// 2015-08-06 17:52:48.790859087 UTC.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Format {
    /// Unix seconds, sub-second digits dropped: `1438883568`.
    #[default]
    Timestamp = 0,
    /// Unix nanoseconds: `1438883568790859087`.
    TimestampNano = 1,
    /// `Thu Aug  6 17:52:48 2015`.
    Ansic = 2,
    /// `Thu Aug  6 17:52:48 UTC 2015`.
    UnixDate = 3,
    /// `Thu Aug 06 17:52:48 +0000 2015`.
    RubyDate = 4,
    /// `06 Aug 15 17:52 UTC`.
    Rfc822 = 5,
    /// `06 Aug 15 17:52 +0000`.
    Rfc822Z = 6,
    /// `Thursday, 06-Aug-15 17:52:48 UTC`.
    Rfc850 = 7,
    /// `Thu, 06 Aug 2015 17:52:48 UTC`.
    Rfc1123 = 8,
    /// `Thu, 06 Aug 2015 17:52:48 +0000`.
    Rfc1123Z = 9,
    /// `2015-08-06T17:52:48Z`.
    Rfc3339 = 10,
    /// `2015-08-06T17:52:48.790859087Z`, with trailing zeros of the fraction
    /// trimmed and no fraction at all for whole seconds.
    Rfc3339Nano = 11,
    /// `5:52PM`.
    Kitchen = 12,
}

impl Format {
    /// All formats, in discriminant order.
    pub const ALL: [Format; 13] = [
        Format::Timestamp,
        Format::TimestampNano,
        Format::Ansic,
        Format::UnixDate,
        Format::RubyDate,
        Format::Rfc822,
        Format::Rfc822Z,
        Format::Rfc850,
        Format::Rfc1123,
        Format::Rfc1123Z,
        Format::Rfc3339,
        Format::Rfc3339Nano,
        Format::Kitchen,
    ];

    /// Returns whether the format is an integer count since the epoch rather
    /// than a textual layout.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Format::Timestamp | Format::TimestampNano)
    }

    /// Returns the canonical lowercase name of the format.
    pub const fn name(self) -> &'static str {
        match self {
            Format::Timestamp => "timestamp",
            Format::TimestampNano => "timestampnano",
            Format::Ansic => "ansic",
            Format::UnixDate => "unixdate",
            Format::RubyDate => "rubydate",
            Format::Rfc822 => "rfc822",
            Format::Rfc822Z => "rfc822z",
            Format::Rfc850 => "rfc850",
            Format::Rfc1123 => "rfc1123",
            Format::Rfc1123Z => "rfc1123z",
            Format::Rfc3339 => "rfc3339",
            Format::Rfc3339Nano => "rfc3339nano",
            Format::Kitchen => "kitchen",
        }
    }

    /// The `chrono` layout for textual formats rendered by pattern.
    const fn layout(self) -> Option<&'static str> {
        match self {
            Format::Timestamp | Format::TimestampNano | Format::Rfc3339Nano => None,
            Format::Ansic => Some("%a %b %e %H:%M:%S %Y"),
            Format::UnixDate => Some("%a %b %e %H:%M:%S UTC %Y"),
            Format::RubyDate => Some("%a %b %d %H:%M:%S %z %Y"),
            Format::Rfc822 => Some("%d %b %y %H:%M UTC"),
            Format::Rfc822Z => Some("%d %b %y %H:%M %z"),
            Format::Rfc850 => Some("%A, %d-%b-%y %H:%M:%S UTC"),
            Format::Rfc1123 => Some("%a, %d %b %Y %H:%M:%S UTC"),
            Format::Rfc1123Z => Some("%a, %d %b %Y %H:%M:%S %z"),
            Format::Rfc3339 => Some("%Y-%m-%dT%H:%M:%SZ"),
            Format::Kitchen => Some("%-I:%M%p"),
        }
    }

    /// Renders a timestamp without any envelope quoting.
    ///
    /// Returns [`Error::Overflow`] if the timestamp cannot be expressed in
    /// the format: nanoseconds beyond the range of an `i64`, or a date
    /// outside the calendar range supported by `chrono`.
    ///
    /// # Examples
    ///
    /// ```
    /// use flex_time::{Format, Timestamp};
    ///
    /// let t = Timestamp::new(1_438_883_568, 790_859_087);
    ///
    /// assert_eq!(Format::Timestamp.render(&t).unwrap(), "1438883568");
    /// assert_eq!(Format::Rfc1123Z.render(&t).unwrap(), "Thu, 06 Aug 2015 17:52:48 +0000");
    /// ```
    pub fn render(self, timestamp: &Timestamp) -> Result<String, Error> {
        match self {
            Format::Timestamp => Ok(timestamp.as_secs().to_string()),
            Format::TimestampNano => timestamp.unix_nanos().map(|nanos| nanos.to_string()),
            Format::Rfc3339Nano => {
                let date_time = timestamp.to_chrono_date_time()?;
                let mut out = String::with_capacity(30);
                write!(out, "{}", date_time.format("%Y-%m-%dT%H:%M:%S"))
                    .map_err(|_| Error::InvalidFormat)?;

                let nanos = timestamp.subsec_nanos();
                if nanos != 0 {
                    let digits = format!("{:09}", nanos);
                    out.push('.');
                    out.push_str(digits.trim_end_matches('0'));
                }
                out.push('Z');

                Ok(out)
            }
            Format::Ansic
            | Format::UnixDate
            | Format::RubyDate
            | Format::Rfc822
            | Format::Rfc822Z
            | Format::Rfc850
            | Format::Rfc1123
            | Format::Rfc1123Z
            | Format::Rfc3339
            | Format::Kitchen => {
                let layout = self.layout().ok_or(Error::InvalidFormat)?;
                let date_time = timestamp.to_chrono_date_time()?;
                let mut out = String::with_capacity(32);
                write!(out, "{}", date_time.format(layout)).map_err(|_| Error::InvalidFormat)?;

                Ok(out)
            }
        }
    }

    /// Strictly parses a string rendered with this format.
    ///
    /// Layouts that carry an offset accept any offset; the others are read as
    /// UTC. Two-digit years follow `chrono`'s convention (69-99 map to the
    /// 20th century). [`Format::Kitchen`] carries no date and never parses.
    ///
    /// # Examples
    ///
    /// ```
    /// use flex_time::{Format, Timestamp};
    ///
    /// assert_eq!(
    ///     Format::Rfc3339.parse("2015-08-06T19:52:48+02:00"),
    ///     Some(Timestamp::new(1_438_883_568, 0))
    /// );
    /// assert_eq!(Format::Rfc3339.parse("Thu Aug  6 17:52:48 2015"), None);
    /// ```
    pub fn parse(self, text: &str) -> Option<Timestamp> {
        match self {
            Format::Timestamp => text.parse().ok().map(|secs| Timestamp::new(secs, 0)),
            Format::TimestampNano => text.parse().ok().map(Timestamp::from_unix_nanos),
            Format::Rfc3339 | Format::Rfc3339Nano => DateTime::parse_from_rfc3339(text)
                .ok()
                .and_then(|date_time| Timestamp::from_chrono_date_time(&date_time).ok()),
            Format::RubyDate | Format::Rfc822Z | Format::Rfc1123Z => {
                let layout = self.layout()?;
                DateTime::parse_from_str(text, layout)
                    .ok()
                    .and_then(|date_time| Timestamp::from_chrono_date_time(&date_time).ok())
            }
            Format::Ansic | Format::UnixDate | Format::Rfc822 | Format::Rfc850 | Format::Rfc1123 => {
                let layout = self.layout()?;
                NaiveDateTime::parse_from_str(text, layout)
                    .ok()
                    .and_then(|date_time| Timestamp::from_chrono_date_time(&date_time.and_utc()).ok())
            }
            Format::Kitchen => None,
        }
    }
}

impl TryFrom<u8> for Format {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Format::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::InvalidFormat)
    }
}

impl TryFrom<i32> for Format {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| Error::InvalidFormat)
            .and_then(Format::try_from)
    }
}

impl From<Format> for u8 {
    fn from(format: Format) -> Self {
        format as u8
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    /// Parses a canonical format name, ignoring ASCII case and `-`/`_`
    /// separators (`"RFC3339-nano"` is `Rfc3339Nano`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Format::ALL
            .into_iter()
            .find(|format| format.name() == normalized)
            .ok_or(Error::InvalidFormat)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Format {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Format {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2015-08-06 17:52:48.790859087 UTC, a Thursday.
    const T: Timestamp = Timestamp::new(1_438_883_568, 790_859_087);

    #[test]
    fn render_all_layouts() {
        let expected = [
            (Format::Timestamp, "1438883568"),
            (Format::TimestampNano, "1438883568790859087"),
            (Format::Ansic, "Thu Aug  6 17:52:48 2015"),
            (Format::UnixDate, "Thu Aug  6 17:52:48 UTC 2015"),
            (Format::RubyDate, "Thu Aug 06 17:52:48 +0000 2015"),
            (Format::Rfc822, "06 Aug 15 17:52 UTC"),
            (Format::Rfc822Z, "06 Aug 15 17:52 +0000"),
            (Format::Rfc850, "Thursday, 06-Aug-15 17:52:48 UTC"),
            (Format::Rfc1123, "Thu, 06 Aug 2015 17:52:48 UTC"),
            (Format::Rfc1123Z, "Thu, 06 Aug 2015 17:52:48 +0000"),
            (Format::Rfc3339, "2015-08-06T17:52:48Z"),
            (Format::Rfc3339Nano, "2015-08-06T17:52:48.790859087Z"),
            (Format::Kitchen, "5:52PM"),
        ];

        // Every format must have an expected rendering.
        assert_eq!(expected.len(), Format::ALL.len());
        for (format, output) in expected {
            assert_eq!(format.render(&T).unwrap(), output, "{format}");
        }
    }

    #[test]
    fn rfc3339_nano_trims_fraction() {
        let t = Timestamp::new(1_438_883_568, 500_000_000);
        assert_eq!(
            Format::Rfc3339Nano.render(&t).unwrap(),
            "2015-08-06T17:52:48.5Z"
        );

        let t = Timestamp::new(1_438_883_568, 1_000);
        assert_eq!(
            Format::Rfc3339Nano.render(&t).unwrap(),
            "2015-08-06T17:52:48.000001Z"
        );

        let t = Timestamp::new(1_438_883_568, 0);
        assert_eq!(
            Format::Rfc3339Nano.render(&t).unwrap(),
            "2015-08-06T17:52:48Z"
        );
    }

    #[test]
    fn morning_kitchen() {
        // 2015-08-06 09:05:00 UTC.
        let t = Timestamp::new(1_438_851_900, 0);
        assert_eq!(Format::Kitchen.render(&t).unwrap(), "9:05AM");
    }

    #[test]
    fn pre_epoch() {
        // 1969-12-31 23:59:59.5 UTC.
        let t = Timestamp::new(-1, 500_000_000);
        assert_eq!(Format::Timestamp.render(&t).unwrap(), "-1");
        assert_eq!(Format::TimestampNano.render(&t).unwrap(), "-500000000");
        assert_eq!(
            Format::Rfc3339Nano.render(&t).unwrap(),
            "1969-12-31T23:59:59.5Z"
        );
    }

    #[test]
    fn render_overflow() {
        assert_eq!(
            Format::TimestampNano.render(&Timestamp::MAX),
            Err(Error::Overflow)
        );
        assert_eq!(Format::Rfc3339.render(&Timestamp::MAX), Err(Error::Overflow));
        assert_eq!(
            Format::Timestamp.render(&Timestamp::MAX).unwrap(),
            i64::MAX.to_string()
        );
    }

    #[test]
    fn parse_own_output() {
        // 2015-08-16 17:52:48.790859087 UTC, a two-digit day of the month.
        const T: Timestamp = Timestamp::new(1_439_747_568, 790_859_087);

        let whole_secs = Timestamp::new(T.as_secs(), 0);
        for format in [
            Format::Ansic,
            Format::UnixDate,
            Format::RubyDate,
            Format::Rfc1123,
            Format::Rfc1123Z,
            Format::Rfc3339,
            Format::Timestamp,
        ] {
            let text = format.render(&T).unwrap();
            assert_eq!(format.parse(&text), Some(whole_secs), "{format}");
        }
        for format in [Format::Rfc3339Nano, Format::TimestampNano] {
            let text = format.render(&T).unwrap();
            assert_eq!(format.parse(&text), Some(T), "{format}");
        }
        assert_eq!(Format::Kitchen.parse("5:52PM"), None);
    }

    #[test]
    fn discriminants() {
        for (idx, format) in Format::ALL.into_iter().enumerate() {
            assert_eq!(u8::from(format) as usize, idx);
            assert_eq!(Format::try_from(idx as u8), Ok(format));
        }
        assert_eq!(Format::try_from(13u8), Err(Error::InvalidFormat));
        assert_eq!(Format::try_from(-1i32), Err(Error::InvalidFormat));
        assert_eq!(Format::try_from(10i32), Ok(Format::Rfc3339));
    }

    #[test]
    fn names() {
        for format in Format::ALL {
            assert_eq!(format.to_string().parse::<Format>(), Ok(format));
        }
        assert_eq!("RFC3339-nano".parse::<Format>(), Ok(Format::Rfc3339Nano));
        assert_eq!("Unix_Date".parse::<Format>(), Ok(Format::UnixDate));
        assert_eq!("iso8601".parse::<Format>(), Err(Error::InvalidFormat));
    }

    #[test]
    fn numeric_formats() {
        let numeric: Vec<_> = Format::ALL.into_iter().filter(|f| f.is_numeric()).collect();
        assert_eq!(numeric, [Format::Timestamp, Format::TimestampNano]);
    }
}
