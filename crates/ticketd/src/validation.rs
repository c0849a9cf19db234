//! Syntax predicates for request arguments.
//!
//! Everything here is pure. Calendar checks are deliberately shallow: a day of
//! 31 is accepted for every month, and the year is only required to be four
//! digits.

/// Shortest accepted event capacity.
pub const MIN_CAPACITY: u16 = 10;
/// Largest accepted event capacity.
pub const MAX_CAPACITY: u16 = 999;
/// Largest number of seats one reservation may take.
pub const MAX_SEATS: u16 = 999;
/// Longest accepted event name.
pub const MAX_EVENT_NAME_LEN: usize = 10;
/// Longest accepted attachment file name.
pub const MAX_FILE_NAME_LEN: usize = 24;

/// Exactly six ASCII digits.
#[must_use]
pub fn valid_account_id(uid: &str) -> bool {
    uid.len() == 6 && uid.bytes().all(|byte| byte.is_ascii_digit())
}

/// Exactly eight ASCII alphanumerics.
#[must_use]
pub fn valid_secret(secret: &str) -> bool {
    secret.len() == 8 && secret.bytes().all(|byte| byte.is_ascii_alphanumeric())
}

/// One to ten ASCII alphanumerics.
#[must_use]
pub fn valid_event_name(name: &str) -> bool {
    (1..=MAX_EVENT_NAME_LEN).contains(&name.len())
        && name.bytes().all(|byte| byte.is_ascii_alphanumeric())
}

/// Checks a `dd-mm-yyyy` date together with an `hh:mm[:ss]` time.
#[must_use]
pub fn valid_date_time(date: &str, time: &str) -> bool {
    DateFields::parse(date).is_some() && TimeFields::parse(time).is_some()
}

/// Attachment names are kept to a portable subset so they can never escape
/// the event's attachment directory.
#[must_use]
pub fn valid_file_name(name: &str) -> bool {
    (1..=MAX_FILE_NAME_LEN).contains(&name.len())
        && name != "."
        && name != ".."
        && name
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-'))
}

/// Parses a capacity in `10..=999`.
#[must_use]
pub fn parse_capacity(token: &str) -> Option<u16> {
    parse_decimal(token)
        .and_then(|value| u16::try_from(value).ok())
        .filter(|value| (MIN_CAPACITY..=MAX_CAPACITY).contains(value))
}

/// Parses a seat count in `1..=999`.
#[must_use]
pub fn parse_seats(token: &str) -> Option<u16> {
    parse_decimal(token)
        .and_then(|value| u16::try_from(value).ok())
        .filter(|value| (1..=MAX_SEATS).contains(value))
}

/// Parses an attachment size in `1..=max_bytes`.
#[must_use]
pub fn parse_file_size(token: &str, max_bytes: u64) -> Option<u64> {
    parse_decimal(token).filter(|value| (1..=max_bytes).contains(value))
}

/// Parses a non-empty run of ASCII digits.
#[must_use]
pub fn parse_decimal(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Numeric fields of a syntactically valid `dd-mm-yyyy` date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFields {
    /// Day of month, `1..=31`.
    pub day: u8,
    /// Month, `1..=12`.
    pub month: u8,
    /// Four-digit year.
    pub year: u16,
}

impl DateFields {
    /// Parses and range-checks a date.
    #[must_use]
    pub fn parse(date: &str) -> Option<Self> {
        let [d1, d2, b'-', m1, m2, b'-', y1, y2, y3, y4] = *date.as_bytes() else {
            return None;
        };
        let day = two_digits(d1, d2)?;
        let month = two_digits(m1, m2)?;
        let year = u16::from(two_digits(y1, y2)?) * 100 + u16::from(two_digits(y3, y4)?);
        ((1..=31).contains(&day) && (1..=12).contains(&month)).then_some(Self { day, month, year })
    }
}

/// Numeric fields of a syntactically valid `hh:mm[:ss]` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFields {
    /// Hour, `0..=23`.
    pub hour: u8,
    /// Minute, `0..=59`.
    pub minute: u8,
    /// Second, `0..=59`; zero when the time omits seconds.
    pub second: u8,
}

impl TimeFields {
    /// Parses and range-checks a time.
    #[must_use]
    pub fn parse(time: &str) -> Option<Self> {
        let (hour, minute, second) = match *time.as_bytes() {
            [h1, h2, b':', m1, m2] => (two_digits(h1, h2)?, two_digits(m1, m2)?, 0),
            [h1, h2, b':', m1, m2, b':', s1, s2] => (
                two_digits(h1, h2)?,
                two_digits(m1, m2)?,
                two_digits(s1, s2)?,
            ),
            _ => return None,
        };
        (hour <= 23 && minute <= 59 && second <= 59).then_some(Self {
            hour,
            minute,
            second,
        })
    }
}

fn two_digits(tens: u8, units: u8) -> Option<u8> {
    (tens.is_ascii_digit() && units.is_ascii_digit())
        .then(|| (tens - b'0') * 10 + (units - b'0'))
}
