//! Event lifecycle states.
//!
//! An event's state is never stored. It is derived from the recorded
//! attributes and the current instant every time it is needed.

use std::fmt;

use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::catalog::Event;
use crate::validation::{DateFields, TimeFields};

/// Lifecycle state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// The scheduled instant has been reached.
    Past,
    /// Seats are available.
    Open,
    /// Every seat is reserved.
    SoldOut,
    /// The owner closed the event.
    Closed,
}

impl EventState {
    /// Numeric code used on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Past => 0,
            Self::Open => 1,
            Self::SoldOut => 2,
            Self::Closed => 3,
        }
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current UTC instant.
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Computes the state of `event` at `now`.
///
/// Precedence is Past, then Closed, then SoldOut, then Open. An event whose
/// date or time cannot be interpreted counts as Past.
#[must_use]
pub fn compute_state(event: &Event, now: OffsetDateTime) -> EventState {
    match scheduled_instant(&event.date, &event.time) {
        Some(instant) if instant > now => {}
        _ => return EventState::Past,
    }
    if event.closed {
        EventState::Closed
    } else if event.reserved >= event.capacity {
        EventState::SoldOut
    } else {
        EventState::Open
    }
}

/// Interprets `dd-mm-yyyy` and `hh:mm[:ss]` as a UTC instant.
///
/// Days past the end of the month roll over into the next one, so
/// `31-02-2099` lands in early March.
#[must_use]
pub fn scheduled_instant(date: &str, time: &str) -> Option<OffsetDateTime> {
    let day = DateFields::parse(date)?;
    let clock = TimeFields::parse(time)?;
    let month = Month::try_from(day.month).ok()?;
    let first_of_month = Date::from_calendar_date(i32::from(day.year), month, 1).ok()?;
    let offset = Duration::days(i64::from(day.day) - 1)
        + Duration::hours(i64::from(clock.hour))
        + Duration::minutes(i64::from(clock.minute))
        + Duration::seconds(i64::from(clock.second));
    PrimitiveDateTime::new(first_of_month, Time::MIDNIGHT)
        .checked_add(offset)
        .map(PrimitiveDateTime::assume_utc)
}
