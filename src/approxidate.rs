//! Default loose date interpreter.
//!
//! The input is scanned left to right and every token (a word, a number, a
//! group of numbers joined by a separator, or a numeric zone offset) fills in
//! whichever calendar field it plausibly designates.

use chrono::{DateTime, Datelike, NaiveDate, Timelike};

use crate::{InterpretError, LooseDateInterpreter, LooseInstant};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Sundays",
    "Mondays",
    "Tuesdays",
    "Wednesdays",
    "Thursdays",
    "Fridays",
    "Saturdays",
];

/// Zone abbreviations with their UTC offset in hours and whether they denote
/// daylight saving time (one extra hour).
const ZONES: [(&str, i32, bool); 44] = [
    ("IDLW", -12, false),
    ("NT", -11, false),
    ("CAT", -10, false),
    ("HST", -10, false),
    ("HDT", -10, true),
    ("YST", -9, false),
    ("YDT", -9, true),
    ("PST", -8, false),
    ("PDT", -8, true),
    ("MST", -7, false),
    ("MDT", -7, true),
    ("CST", -6, false),
    ("CDT", -6, true),
    ("EST", -5, false),
    ("EDT", -5, true),
    ("AST", -3, false),
    ("ADT", -3, true),
    ("WAT", -1, false),
    ("GMT", 0, false),
    ("UTC", 0, false),
    ("Z", 0, false),
    ("WET", 0, false),
    ("BST", 0, true),
    ("CET", 1, false),
    ("MET", 1, false),
    ("MEWT", 1, false),
    ("MEST", 1, true),
    ("CEST", 1, true),
    ("MESZ", 1, true),
    ("FWT", 1, false),
    ("FST", 1, true),
    ("EET", 2, false),
    ("EEST", 2, true),
    ("WAST", 7, false),
    ("WADT", 7, true),
    ("CCT", 8, false),
    ("JST", 9, false),
    ("EAST", 10, false),
    ("EADT", 10, true),
    ("GST", 10, false),
    ("NZT", 12, false),
    ("NZST", 12, false),
    ("NZDT", 12, true),
    ("IDLE", 12, false),
];

/// Interpreter for loosely formatted absolute dates.
///
/// Accepted inputs include `2014-12-05 09:51:20.939152 -0500`,
/// `09:51:20.939152pm 2014-31-12`, `Thu Aug  6 17:52:48 UTC 2015`,
/// `06 Aug 15 17:52 +0000`, `Thursday, 06-Aug-15 17:52:48 UTC`,
/// `2014.12.05`, `12/05/2014 9:51 PST`, bare Unix seconds (nine digits or
/// more) and `@1438883568 +0000`.
///
/// Two-digit years from `70` to `99` are read as 1970-1999 and those from
/// `00` to `37` as 2000-2037.
///
/// Parsing is deterministic: an input without zone information is read as
/// UTC, and a missing time of day means midnight. A year, a month and a day
/// must all be recognized. Sub-second digits beyond microseconds are
/// truncated.
///
/// # Examples
///
/// ```
/// use flex_time::{Approxidate, LooseDateInterpreter, LooseInstant};
///
/// // 2014-12-31 21:51:20.939152 UTC.
/// assert_eq!(
///     Approxidate.interpret("09:51:20.939152pm 2014-31-12"),
///     Ok(LooseInstant { secs: 1_420_062_680, micros: 939_152 })
/// );
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Approxidate;

impl LooseDateInterpreter for Approxidate {
    fn interpret(&self, input: &str) -> Result<LooseInstant, InterpretError> {
        let bytes = input.as_bytes();

        if let Some(secs) = bytes.strip_prefix(b"@").and_then(object_header_date) {
            return Ok(LooseInstant { secs, micros: 0 });
        }

        let mut fields = Fields::default();
        let mut pos = 0;
        while pos < bytes.len() {
            let rest = &bytes[pos..];
            let c = rest[0];
            if c == b'\n' {
                break;
            }

            let consumed = if c.is_ascii_alphabetic() {
                fields.match_alpha(rest)
            } else if c.is_ascii_digit() {
                fields.match_digit(rest)
            } else if (c == b'-' || c == b'+') && starts_with_digit(&rest[1..]) {
                fields.match_zone_offset(rest)
            } else {
                0
            };
            pos += consumed.max(1);
        }

        fields.into_instant(input)
    }
}

/// Calendar fields collected while scanning.
#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u8>,
    day: Option<u8>,
    hour: Option<u8>,
    minute: Option<u8>,
    second: Option<u8>,
    micros: u32,
    offset_mins: Option<i32>,
    /// The fields come from Unix seconds and are already UTC.
    utc: bool,
}

impl Fields {
    fn is_blank(&self) -> bool {
        self.year.is_none()
            && self.month.is_none()
            && self.day.is_none()
            && self.hour.is_none()
            && self.minute.is_none()
            && self.second.is_none()
    }

    /// Month, weekday, zone name or AM/PM marker.
    fn match_alpha(&mut self, input: &[u8]) -> usize {
        for (idx, name) in MONTH_NAMES.iter().enumerate() {
            let matched = match_name(input, name);
            if matched >= 3 {
                self.month = Some(idx as u8 + 1);
                // `Aug-15`: the dash is a date separator, not a zone offset.
                if input.get(matched) == Some(&b'-') && starts_with_digit(&input[matched + 1..]) {
                    return matched + 1;
                }
                return matched;
            }
        }

        // Weekdays carry no information once the date is known.
        for name in WEEKDAY_NAMES {
            let matched = match_name(input, name);
            if matched >= 3 {
                return matched;
            }
        }

        for (name, hours, dst) in ZONES {
            let matched = match_name(input, name);
            if matched >= 3 || matched == name.len() {
                // A numeric offset always takes precedence over a zone name.
                if self.offset_mins.is_none() {
                    self.offset_mins = Some(60 * (hours + dst as i32));
                }
                return matched;
            }
        }

        if match_name(input, "PM") == 2 {
            self.hour = self.hour.map(|hour| hour % 12 + 12);
            return 2;
        }
        if match_name(input, "AM") == 2 {
            self.hour = self.hour.map(|hour| hour % 12);
            return 2;
        }

        1 + input[1..]
            .iter()
            .take_while(|c| c.is_ascii_alphabetic())
            .count()
    }

    /// A number: Unix seconds, a date, a time, a year, a day, a month or an
    /// `hhmm` offset, guessed from its width and from what is already known.
    fn match_digit(&mut self, input: &[u8]) -> usize {
        let (num, len) = leading_number(input);

        // Nine digits or more on a blank slate are Unix seconds. Eight-digit
        // numbers are left alone since they may be YYYYMMDD dates.
        if num >= 100_000_000 && self.is_blank() {
            let date_time = i64::try_from(num)
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            if let Some(date_time) = date_time {
                self.year = Some(date_time.year());
                self.month = Some(date_time.month() as u8);
                self.day = Some(date_time.day() as u8);
                self.hour = Some(date_time.hour() as u8);
                self.minute = Some(date_time.minute() as u8);
                self.second = Some(date_time.second() as u8);
                self.utc = true;
                return len;
            }
        }

        if let Some(&sep @ (b':' | b'.' | b'/' | b'-')) = input.get(len) {
            if starts_with_digit(&input[len + 1..]) {
                let matched = self.match_multi_number(num, sep, input, len);
                if matched > 0 {
                    return matched;
                }
            }
        }

        if len == 4 {
            if num <= 1400 && self.offset_mins.is_none() {
                self.offset_mins = Some((num / 100 * 60 + num % 100) as i32);
            } else if num > 1900 && num < 2100 {
                self.year = Some(num as i32);
            }
            return len;
        }

        // Days and months are one or two digits.
        if len > 2 {
            return len;
        }

        // A day of month takes precedence: "01 Apr 05" is April 1st, 2005.
        if num > 0 && num < 32 && self.day.is_none() {
            self.day = Some(num as u8);
            return len;
        }

        // A two-digit year: "06 Aug 15" is August 6th, 2015.
        if len == 2 && self.year.is_none() {
            if num >= 70 {
                self.year = Some(1900 + num as i32);
                return len;
            }
            if num <= 37 && self.day.is_some() && (num < 10 || self.month.is_some()) {
                self.year = Some(2000 + num as i32);
                return len;
            }
        }

        if num > 0 && num < 13 && self.month.is_none() {
            self.month = Some(num as u8);
        }

        len
    }

    /// `num<sep>num[<sep>num[.frac]]` where `input[len]` is the separator.
    ///
    /// Returns the number of bytes consumed, or 0 if the group is neither a
    /// valid time nor a valid date.
    fn match_multi_number(&mut self, num: u64, sep: u8, input: &[u8], len: usize) -> usize {
        let mut pos = len + 1;
        let (num2, len2) = leading_number(&input[pos..]);
        pos += len2;

        let mut num3 = None;
        let mut micros = 0;
        if input.get(pos) == Some(&sep) && starts_with_digit(&input[pos + 1..]) {
            let (value, len3) = leading_number(&input[pos + 1..]);
            pos += 1 + len3;
            num3 = Some(value);

            if input.get(pos) == Some(&b'.') {
                let digits = input[pos + 1..]
                    .iter()
                    .take_while(|c| c.is_ascii_digit())
                    .count();
                micros = fraction_micros(&input[pos + 1..pos + 1 + digits]);
                pos += 1 + digits;
            }
        }

        let matched = match sep {
            b':' => {
                let sec = num3.unwrap_or(0);
                if num < 25 && num2 < 60 && sec <= 60 {
                    self.hour = Some(num as u8);
                    self.minute = Some(num2 as u8);
                    self.second = Some(sec as u8);
                    self.micros = micros;
                    true
                } else {
                    false
                }
            }
            _ => {
                // yyyy-mm-dd, then yyyy-dd-mm.
                (num > 70 && (self.set_date(Some(num), Some(num2), num3)
                    || self.set_date(Some(num), num3, Some(num2))))
                    // mm/dd/yy[yy], unless dotted.
                    || (sep != b'.' && self.set_date(num3, Some(num), Some(num2)))
                    // dd.mm.yy[yy] or dd/mm/yy[yy].
                    || self.set_date(num3, Some(num2), Some(num))
                    // mm.dd.yy.
                    || (sep == b'.' && self.set_date(num3, Some(num), Some(num2)))
            }
        };

        if matched {
            pos
        } else {
            0
        }
    }

    /// Sets the date if the month and day are plausible and the year, when
    /// given, can be read as a year.
    fn set_date(&mut self, year: Option<u64>, month: Option<u64>, day: Option<u64>) -> bool {
        let (Some(month), Some(day)) = (month, day) else {
            return false;
        };
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return false;
        }
        let year = match year {
            None => None,
            Some(year @ 1970..=2099) => Some(year as i32),
            Some(year @ 71..=99) => Some(1900 + year as i32),
            Some(year @ 0..=37) => Some(2000 + year as i32),
            Some(_) => return false,
        };

        self.month = Some(month as u8);
        self.day = Some(day as u8);
        if year.is_some() {
            self.year = year;
        }

        true
    }

    /// `+hh`, `+hhmm` or `+hh:mm`, with either sign.
    fn match_zone_offset(&mut self, input: &[u8]) -> usize {
        let (value, len) = leading_number(&input[1..]);
        let mut end = 1 + len;

        let (hours, mins) = if len == 4 {
            (value / 100, value % 100)
        } else if len != 2 {
            (value, 99)
        } else if input.get(end) == Some(&b':') {
            let (mins, mins_len) = leading_number(&input[end + 1..]);
            end += 1 + mins_len;
            if end - 1 != 5 {
                (value, 99)
            } else {
                (value, mins)
            }
        } else {
            (value, 0)
        };

        if mins < 60 && hours < 24 {
            let offset = (hours * 60 + mins) as i32;
            self.offset_mins = Some(if input[0] == b'-' { -offset } else { offset });
        }

        end
    }

    fn into_instant(self, input: &str) -> Result<LooseInstant, InterpretError> {
        let (Some(year), Some(month), Some(day)) = (self.year, self.month, self.day) else {
            return Err(InterpretError::Unrecognized(input.to_owned()));
        };

        let midnight = NaiveDate::from_ymd_opt(year, month.into(), day.into())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or(InterpretError::OutOfRange)?;

        // Added as-is so that `24:00:00` and leap seconds spill over.
        let mut secs = midnight.and_utc().timestamp()
            + i64::from(self.hour.unwrap_or(0)) * 3600
            + i64::from(self.minute.unwrap_or(0)) * 60
            + i64::from(self.second.unwrap_or(0));
        if !self.utc {
            secs -= self.offset_mins.unwrap_or(0) as i64 * 60;
        }

        Ok(LooseInstant {
            secs,
            micros: self.micros as i64,
        })
    }
}

/// Case-insensitive prefix match of `input` against `name`.
///
/// Returns the number of matching bytes, or 0 if the match stops on an
/// alphanumeric byte of `input`.
fn match_name(input: &[u8], name: &str) -> usize {
    let name = name.as_bytes();
    let mut matched = 0;

    for &c in input {
        match name.get(matched) {
            Some(n) if n.eq_ignore_ascii_case(&c) => matched += 1,
            _ if c.is_ascii_alphanumeric() => return 0,
            _ => break,
        }
    }

    matched
}

/// Parses the leading decimal digits, saturating on overflow.
fn leading_number(input: &[u8]) -> (u64, usize) {
    let len = input.iter().take_while(|c| c.is_ascii_digit()).count();
    let value = input[..len].iter().fold(0u64, |acc, c| {
        acc.saturating_mul(10).saturating_add((c - b'0') as u64)
    });

    (value, len)
}

fn starts_with_digit(input: &[u8]) -> bool {
    input.first().map_or(false, u8::is_ascii_digit)
}

/// Reads up to six fractional digits as microseconds.
fn fraction_micros(digits: &[u8]) -> u32 {
    let mut micros = 0;
    let mut weight = 100_000;
    for c in digits.iter().take(6) {
        micros += (c - b'0') as u32 * weight;
        weight /= 10;
    }

    micros
}

/// `<secs> <+|-><hhmm>`, the raw form used by version control headers.
fn object_header_date(input: &[u8]) -> Option<i64> {
    if !starts_with_digit(input) {
        return None;
    }
    let (stamp, len) = leading_number(input);
    let rest = &input[len..];
    if rest.first() != Some(&b' ') || !matches!(rest.get(1), Some(b'+' | b'-')) {
        return None;
    }
    let offset = &rest[2..];
    let (_, offset_len) = leading_number(offset);
    if offset_len != 4 || !matches!(offset.get(4), None | Some(b'\n')) {
        return None;
    }

    i64::try_from(stamp).ok()
}
