//! Document (BSON) envelope support.

use bson::Bson;
use tracing::{debug, trace};

use crate::resolve::from_magnitude;
use crate::{Error, LooseDateInterpreter, Resolver, TimeValue, Timestamp};

/// Largest `f64` magnitude that converts to an `i64` without saturating.
const MAX_INTEGRAL_DOUBLE: f64 = 9_223_372_036_854_774_784.0;

impl<I: LooseDateInterpreter> Resolver<I> {
    /// Decodes a document field.
    ///
    /// - native dates are taken as is (millisecond precision),
    /// - `null` and `undefined` are "no value",
    /// - integers, and doubles without a fractional part, are Unix
    ///   nanoseconds above [`NANO_MAGNITUDE_THRESHOLD`], Unix seconds
    ///   otherwise,
    /// - an empty string is "no value", any other string is decoded like
    ///   unquoted text with [`resolve_unquoted`](Self::resolve_unquoted).
    ///
    /// Other element types are rejected with [`Error::InvalidFormat`].
    ///
    /// Numbers are not decoded like text: a document number does not carry
    /// the width of its literal, hence the magnitude threshold in place of
    /// the digit count.
    ///
    /// [`NANO_MAGNITUDE_THRESHOLD`]: crate::NANO_MAGNITUDE_THRESHOLD
    ///
    /// # Examples
    ///
    /// ```
    /// use bson::Bson;
    /// use flex_time::{Resolver, Timestamp};
    ///
    /// let resolver = Resolver::default();
    ///
    /// assert_eq!(
    ///     resolver.resolve_bson(&Bson::Int64(141_779_108_000_000_999)),
    ///     Ok(Some(Timestamp::new(141_779_108, 999)))
    /// );
    /// assert_eq!(
    ///     resolver.resolve_bson(&Bson::Int64(141_779_108)),
    ///     Ok(Some(Timestamp::new(141_779_108, 0)))
    /// );
    /// assert_eq!(resolver.resolve_bson(&Bson::String(String::new())), Ok(None));
    /// ```
    pub fn resolve_bson(&self, value: &Bson) -> Result<Option<Timestamp>, Error> {
        match value {
            Bson::DateTime(date_time) => {
                trace!("decoded native date");

                Ok(Some(Timestamp::from_unix_millis(
                    date_time.timestamp_millis(),
                )))
            }
            Bson::Null | Bson::Undefined => Ok(None),
            Bson::Int32(number) => Ok(Some(from_magnitude(i64::from(*number)))),
            Bson::Int64(number) => Ok(Some(from_magnitude(*number))),
            Bson::Double(number)
                if number.fract() == 0.0 && number.abs() <= MAX_INTEGRAL_DOUBLE =>
            {
                Ok(Some(from_magnitude(*number as i64)))
            }
            Bson::String(text) if text.is_empty() => Ok(None),
            Bson::String(text) => self.resolve_unquoted(text),
            other => {
                debug!(element_type = ?other.element_type(), "unsupported document field");

                Err(Error::InvalidFormat)
            }
        }
    }
}

impl TimeValue {
    /// Replaces the timestamp with the one decoded from a document field,
    /// keeping the format.
    ///
    /// The value is left untouched on error. See
    /// [`Resolver::resolve_bson`].
    pub fn update_from_bson<I: LooseDateInterpreter>(
        &mut self,
        value: &Bson,
        resolver: &Resolver<I>,
    ) -> Result<(), Error> {
        self.set_instant(resolver.resolve_bson(value)?);

        Ok(())
    }

    /// Encodes the value as a document field.
    ///
    /// The field is `null` if no timestamp is held and a string rendered with
    /// the value's format otherwise, numeric formats included.
    ///
    /// # Examples
    ///
    /// ```
    /// use bson::Bson;
    /// use flex_time::{Format, TimeValue, Timestamp};
    ///
    /// let t = Timestamp::new(141_779_108, 999);
    ///
    /// assert_eq!(
    ///     TimeValue::new(t, Format::TimestampNano).to_bson(),
    ///     Ok(Bson::String("141779108000000999".into()))
    /// );
    /// assert_eq!(TimeValue::none(Format::Rfc3339).to_bson(), Ok(Bson::Null));
    /// ```
    pub fn to_bson(&self) -> Result<Bson, Error> {
        Ok(match self.render()? {
            Some(rendered) => Bson::String(rendered),
            None => Bson::Null,
        })
    }
}

impl TryFrom<TimeValue> for Bson {
    type Error = Error;

    fn try_from(value: TimeValue) -> Result<Self, Self::Error> {
        value.to_bson()
    }
}
