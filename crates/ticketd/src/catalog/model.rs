//! Records held by the catalog.

use std::fmt;

use crate::validation::{self, parse_decimal};

/// Six-digit account identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(String);

impl AccountId {
    /// Accepts exactly six ASCII digits.
    #[must_use]
    pub fn parse(uid: &str) -> Option<Self> {
        validation::valid_account_id(uid).then(|| Self(uid.to_owned()))
    }

    /// Identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event identifier in `001..=999`, rendered with three digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u16);

impl EventId {
    /// Lowest identifier.
    pub const FIRST: u16 = 1;
    /// Highest identifier.
    pub const LAST: u16 = 999;

    /// Wraps a number in `1..=999`.
    #[must_use]
    pub fn new(value: u16) -> Option<Self> {
        (Self::FIRST..=Self::LAST).contains(&value).then_some(Self(value))
    }

    /// Accepts exactly three ASCII digits naming a value in `001..=999`.
    #[must_use]
    pub fn parse(eid: &str) -> Option<Self> {
        if eid.len() != 3 {
            return None;
        }
        parse_decimal(eid)
            .and_then(|value| u16::try_from(value).ok())
            .and_then(Self::new)
    }

    /// Numeric value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Identifier.
    pub id: AccountId,
    /// Plaintext secret.
    pub secret: String,
    /// Session flag. Never persisted.
    pub logged_in: bool,
}

impl Account {
    /// New account, logged out.
    #[must_use]
    pub const fn new(id: AccountId, secret: String) -> Self {
        Self {
            id,
            secret,
            logged_in: false,
        }
    }
}

/// A ticketed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Identifier.
    pub id: EventId,
    /// Account that created the event.
    pub owner: AccountId,
    /// Display name.
    pub name: String,
    /// `dd-mm-yyyy`.
    pub date: String,
    /// `hh:mm` or `hh:mm:ss`.
    pub time: String,
    /// Seat capacity.
    pub capacity: u16,
    /// Seats reserved so far; never above `capacity`.
    pub reserved: u16,
    /// Set once the owner closes the event.
    pub closed: bool,
    /// Attachment file name.
    pub file_name: String,
    /// Attachment size in bytes.
    pub file_size: u64,
}

impl Event {
    /// Seats still available.
    #[must_use]
    pub const fn available(&self) -> u16 {
        self.capacity.saturating_sub(self.reserved)
    }
}

/// One accepted reservation. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Account that reserved.
    pub account: AccountId,
    /// Event reserved for.
    pub event: EventId,
    /// Seats taken.
    pub seats: u16,
    /// `dd-mm-yyyy hh:mm:ss`, UTC, as stored.
    pub timestamp: String,
}
