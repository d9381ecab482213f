//! Fallback decoding of untagged tokens.

use tracing::{debug, trace};

use crate::{Approxidate, Error, Format, LooseDateInterpreter, Timestamp};

/// Number of decimal digits of an integer literal read as Unix nanoseconds.
///
/// Unix nanoseconds have 19 digits from 2001-09-09 to 2262-04-11, while Unix
/// seconds have at most 11 digits until the year 5138, so the two never
/// collide.
pub const NANO_TIMESTAMP_DIGITS: usize = 19;

/// Value above which a native document number is read as Unix nanoseconds
/// rather than seconds.
///
/// Unlike [`NANO_TIMESTAMP_DIGITS`], this threshold does not depend on the
/// literal width, which native numbers do not preserve.
pub const NANO_MAGNITUDE_THRESHOLD: i64 = 5_000_000_000;

/// Resolver settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ResolverConfig {
    /// Layout tried after the integer and null rules and before the loose
    /// interpreter.
    pub strict_format: Format,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strict_format: Format::Rfc3339,
        }
    }
}

/// Decodes untagged tokens into timestamps.
///
/// A resolver holds no mutable state and can be shared freely between
/// threads as long as its interpreter can. `Ok(None)` stands for an explicit
/// "no value" (`null` or an empty token), which is not an error.
///
/// # Examples
///
/// ```
/// use flex_time::{Resolver, Timestamp};
///
/// let resolver = Resolver::default();
///
/// assert_eq!(
///     resolver.resolve_text("1438883568"),
///     Ok(Some(Timestamp::new(1_438_883_568, 0)))
/// );
/// assert_eq!(
///     resolver.resolve_text(r#""1438883568790859087""#),
///     Ok(Some(Timestamp::new(1_438_883_568, 790_859_087)))
/// );
/// assert_eq!(
///     resolver.resolve_text(r#""2015-08-06T17:52:48Z""#),
///     Ok(Some(Timestamp::new(1_438_883_568, 0)))
/// );
/// assert_eq!(resolver.resolve_text(r#""""#), Ok(None));
/// ```
#[derive(Clone, Debug)]
pub struct Resolver<I = Approxidate> {
    interpreter: I,
    config: ResolverConfig,
}

impl<I: LooseDateInterpreter> Resolver<I> {
    /// Creates a resolver with the default configuration.
    pub fn new(interpreter: I) -> Self {
        Self::with_config(interpreter, ResolverConfig::default())
    }

    /// Creates a resolver with a custom configuration.
    pub fn with_config(interpreter: I, config: ResolverConfig) -> Self {
        Self {
            interpreter,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Returns the loose date interpreter.
    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    /// Decodes a raw text-envelope token.
    ///
    /// One leading and one trailing `"` are stripped, then the attempts
    /// below are made in order, the first success winning:
    ///
    /// 1. an `i64` literal is a Unix timestamp in nanoseconds if it has
    ///    exactly [`NANO_TIMESTAMP_DIGITS`] digits, in seconds otherwise,
    /// 2. an empty token or `null` is "no value",
    /// 3. the configured strict layout,
    /// 4. the loose date interpreter.
    ///
    /// Returns [`Error::InterpreterFailure`] if the interpreter rejects the
    /// token, or [`Error::Overflow`] if the instant it reports cannot be
    /// represented.
    pub fn resolve_text(&self, token: &str) -> Result<Option<Timestamp>, Error> {
        let content = token.strip_prefix('"').unwrap_or(token);
        let content = content.strip_suffix('"').unwrap_or(content);

        self.resolve_unquoted(content)
    }

    /// Decodes a token whose envelope quoting was already removed.
    ///
    /// This is [`resolve_text`](Self::resolve_text) without the quote
    /// stripping step.
    pub fn resolve_unquoted(&self, content: &str) -> Result<Option<Timestamp>, Error> {
        if let Ok(value) = content.parse::<i64>() {
            let digits = content.bytes().filter(u8::is_ascii_digit).count();
            trace!(digits, "decoded integer literal");

            return Ok(Some(from_digit_width(value, digits)));
        }

        if content.is_empty() || content == "null" {
            trace!("decoded null marker");

            return Ok(None);
        }

        if let Some(timestamp) = self.config.strict_format.parse(content) {
            trace!(format = %self.config.strict_format, "decoded strict layout");

            return Ok(Some(timestamp));
        }

        debug!(
            input_len = content.len(),
            "falling back to the loose date interpreter"
        );
        let instant = self.interpreter.interpret(content)?;

        instant.to_timestamp().map(Some).ok_or(Error::Overflow)
    }
}

impl Default for Resolver {
    /// Creates a resolver using [`Approxidate`] and the default
    /// configuration.
    fn default() -> Self {
        Self::new(Approxidate)
    }
}

/// Reads an integer literal of the given digit count as a Unix timestamp.
pub(crate) fn from_digit_width(value: i64, digits: usize) -> Timestamp {
    if digits == NANO_TIMESTAMP_DIGITS {
        Timestamp::from_unix_nanos(value)
    } else {
        Timestamp::new(value, 0)
    }
}

/// Reads a native number as a Unix timestamp.
///
/// Negative numbers are always seconds.
#[cfg_attr(not(feature = "bson"), allow(dead_code))]
pub(crate) fn from_magnitude(value: i64) -> Timestamp {
    if value > NANO_MAGNITUDE_THRESHOLD {
        Timestamp::from_unix_nanos(value)
    } else {
        Timestamp::new(value, 0)
    }
}
