//! Format-tagged temporal values.

use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::{Error, Format, LooseDateInterpreter, Resolver, Timestamp};

/// The text envelope's null marker.
const NULL_MARKER: &str = "null";

/// A timestamp, or the absence of one, tagged with its output format.
///
/// The format only affects encoding. Changing it produces a new value and
/// never alters other copies.
///
/// # Examples
///
/// ```
/// use flex_time::{Format, TimeValue, Timestamp};
///
/// let t = Timestamp::new(1_438_883_568, 790_859_087);
///
/// let secs = TimeValue::new(t, Format::Timestamp);
/// let nanos = secs.with_format(Format::TimestampNano);
///
/// assert_eq!(secs.encode_text().unwrap(), "1438883568");
/// assert_eq!(nanos.encode_text().unwrap(), "1438883568790859087");
/// assert_eq!(secs.instant(), nanos.instant());
///
/// assert_eq!(TimeValue::none(Format::Rfc3339).encode_text().unwrap(), "null");
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TimeValue {
    instant: Option<Timestamp>,
    format: Format,
}

impl TimeValue {
    /// Creates a value holding a timestamp.
    pub const fn new(instant: Timestamp, format: Format) -> Self {
        Self {
            instant: Some(instant),
            format,
        }
    }

    /// Creates a value holding no timestamp.
    pub const fn none(format: Format) -> Self {
        Self {
            instant: None,
            format,
        }
    }

    /// Returns the timestamp, if any.
    pub const fn instant(&self) -> Option<Timestamp> {
        self.instant
    }

    /// Returns `true` if the value holds no timestamp.
    pub const fn is_none(&self) -> bool {
        self.instant.is_none()
    }

    /// Returns the output format.
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Returns a copy of this value with another output format.
    #[must_use]
    pub const fn with_format(self, format: Format) -> Self {
        Self {
            instant: self.instant,
            format,
        }
    }

    /// Renders the timestamp without any envelope quoting.
    ///
    /// Returns `Ok(None)` if the value holds no timestamp.
    pub fn render(&self) -> Result<Option<String>, Error> {
        self.instant
            .map(|instant| self.format.render(&instant))
            .transpose()
    }

    /// Encodes the value as a text-envelope token.
    ///
    /// The token is `null` if no timestamp is held, a bare integer for
    /// numeric formats, and a double-quoted string for textual layouts.
    ///
    /// # Errors
    ///
    /// [`Error::Overflow`] if the timestamp cannot be expressed in the
    /// format (see [`Format::render`]).
    pub fn encode_text(&self) -> Result<String, Error> {
        match self.render()? {
            None => Ok(NULL_MARKER.to_owned()),
            Some(rendered) if self.format.is_numeric() => Ok(rendered),
            // Layouts never contain characters that need escaping.
            Some(rendered) => Ok(format!("\"{rendered}\"")),
        }
    }

    /// Replaces the timestamp with the one decoded from a text-envelope
    /// token, keeping the format.
    ///
    /// The value is left untouched on error.
    ///
    /// # Examples
    ///
    /// ```
    /// use flex_time::{Format, Resolver, TimeValue, Timestamp};
    ///
    /// let resolver = Resolver::default();
    /// let mut value = TimeValue::none(Format::Rfc3339Nano);
    ///
    /// value.update_from_text("1438883568790859087", &resolver).unwrap();
    /// assert_eq!(value.instant(), Some(Timestamp::new(1_438_883_568, 790_859_087)));
    /// assert_eq!(value.format(), Format::Rfc3339Nano);
    ///
    /// value.update_from_text("null", &resolver).unwrap();
    /// assert!(value.is_none());
    /// ```
    pub fn update_from_text<I: LooseDateInterpreter>(
        &mut self,
        token: &str,
        resolver: &Resolver<I>,
    ) -> Result<(), Error> {
        self.set_instant(resolver.resolve_text(token)?);

        Ok(())
    }

    pub(crate) fn set_instant(&mut self, instant: Option<Timestamp>) {
        self.instant = instant;
    }

    /// Decodes a text-envelope token into a value with the given format.
    pub fn decode_text<I: LooseDateInterpreter>(
        token: &str,
        format: Format,
        resolver: &Resolver<I>,
    ) -> Result<Self, Error> {
        let instant = resolver.resolve_text(token)?;

        Ok(Self { instant, format })
    }
}

impl From<Timestamp> for TimeValue {
    fn from(instant: Timestamp) -> Self {
        Self::new(instant, Format::default())
    }
}

impl fmt::Display for TimeValue {
    /// Writes the rendered timestamp, or `null`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instant {
            None => f.write_str(NULL_MARKER),
            Some(instant) => match self.format.render(&instant) {
                Ok(rendered) => f.write_str(&rendered),
                Err(_) => fmt::Display::fmt(&instant, f),
            },
        }
    }
}

/// A [`TimeValue`] whose format can be switched through a shared reference.
///
/// This supports callers that mark an existing value as nanosecond-precision
/// without rebuilding it. The format is held in an atomic cell accessed with
/// relaxed ordering: an encode running concurrently with a switch observes
/// either the old or the new format, never a mix of both, and no ordering
/// with other memory operations is implied. Prefer
/// [`TimeValue::with_format`] wherever a copy will do.
///
/// # Examples
///
/// ```
/// use flex_time::{Format, SharedTimeValue, TimeValue, Timestamp};
///
/// let t = Timestamp::new(1_438_883_568, 790_859_087);
/// let shared = SharedTimeValue::new(TimeValue::new(t, Format::Timestamp));
///
/// shared.set_nano(true);
/// assert_eq!(shared.encode_text().unwrap(), "1438883568790859087");
///
/// shared.set_nano(false);
/// assert_eq!(shared.encode_text().unwrap(), "1438883568");
/// ```
#[derive(Debug)]
pub struct SharedTimeValue {
    instant: Option<Timestamp>,
    format: AtomicU8,
}

impl SharedTimeValue {
    /// Creates a shared value.
    pub fn new(value: TimeValue) -> Self {
        Self {
            instant: value.instant,
            format: AtomicU8::new(value.format.into()),
        }
    }

    /// Returns the timestamp, if any.
    pub fn instant(&self) -> Option<Timestamp> {
        self.instant
    }

    /// Selects Unix nanoseconds (`true`) or Unix seconds (`false`).
    pub fn set_nano(&self, nano: bool) {
        let format = if nano {
            Format::TimestampNano
        } else {
            Format::Timestamp
        };
        self.set_format(format);
    }

    /// Selects the output format.
    pub fn set_format(&self, format: Format) {
        self.format.store(format.into(), Ordering::Relaxed);
    }

    /// Returns the current output format.
    pub fn format(&self) -> Result<Format, Error> {
        Format::try_from(self.format.load(Ordering::Relaxed))
    }

    /// Returns a plain value with the current format.
    pub fn snapshot(&self) -> Result<TimeValue, Error> {
        Ok(TimeValue {
            instant: self.instant,
            format: self.format()?,
        })
    }

    /// Encodes the value with the format current at the time of the call.
    ///
    /// See [`TimeValue::encode_text`].
    pub fn encode_text(&self) -> Result<String, Error> {
        self.snapshot()?.encode_text()
    }
}

impl From<TimeValue> for SharedTimeValue {
    fn from(value: TimeValue) -> Self {
        Self::new(value)
    }
}

impl Clone for SharedTimeValue {
    fn clone(&self) -> Self {
        Self {
            instant: self.instant,
            format: AtomicU8::new(self.format.load(Ordering::Relaxed)),
        }
    }
}
