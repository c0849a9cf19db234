//! Seat accounting for reservations.

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::catalog::{AccountId, Catalog, CatalogError, EventId, Reservation};
use crate::lifecycle::{EventState, compute_state};
use crate::validation::parse_seats;

/// Layout of reservation timestamps, `dd-mm-yyyy hh:mm:ss`.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]-[month]-[year] [hour]:[minute]:[second]");
/// Date half of [`TIMESTAMP_FORMAT`].
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]-[month]-[year]");
/// Time half of [`TIMESTAMP_FORMAT`].
pub const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

/// Outcome of a well-formed reservation attempt on a reservable event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Seats were taken and the reservation recorded.
    Accepted,
    /// Not enough seats remain; carries the exact number still available.
    Rejected {
        /// Seats still available.
        available: u16,
    },
}

/// Reasons a reservation attempt is refused before seats are counted.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No event carries the identifier.
    #[error("event {0} does not exist")]
    UnknownEvent(EventId),
    /// The event already took place.
    #[error("event {0} is past")]
    Past(EventId),
    /// The owner closed the event.
    #[error("event {0} is closed")]
    Closed(EventId),
    /// Every seat is taken.
    #[error("event {0} is sold out")]
    SoldOut(EventId),
    /// The seat count is not in `1..=999`.
    #[error("invalid seat count '{0}'")]
    InvalidSeats(String),
    /// The timestamp could not be rendered.
    #[error("failed to format reservation timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    /// The mutation could not be persisted.
    #[error(transparent)]
    Storage(#[from] CatalogError),
}

/// Attempts to reserve `seats` of `event` for `account` at `now`.
///
/// Checks run in order: event state (past, closed, sold out), seat syntax,
/// then remaining capacity. On acceptance the event's reserved count grows by
/// `seats`, an immutable reservation is appended, and both the events and
/// reservations snapshots are rewritten. A rejection leaves the catalog
/// untouched.
///
/// # Errors
///
/// Returns a [`LedgerError`] for every refusal other than insufficient seats,
/// and [`LedgerError::Storage`] when the accepted reservation cannot be
/// persisted. The in-memory mutation is kept in that case.
pub fn reserve(
    catalog: &mut Catalog,
    account: &AccountId,
    event_id: EventId,
    seats: &str,
    now: OffsetDateTime,
) -> Result<ReserveOutcome, LedgerError> {
    let event = catalog
        .event_mut(event_id)
        .ok_or(LedgerError::UnknownEvent(event_id))?;
    match compute_state(event, now) {
        EventState::Past => return Err(LedgerError::Past(event_id)),
        EventState::Closed => return Err(LedgerError::Closed(event_id)),
        EventState::SoldOut => return Err(LedgerError::SoldOut(event_id)),
        EventState::Open => {}
    }
    let count = parse_seats(seats).ok_or_else(|| LedgerError::InvalidSeats(seats.to_owned()))?;
    let available = event.available();
    if count > available {
        return Ok(ReserveOutcome::Rejected { available });
    }

    let timestamp = now.format(TIMESTAMP_FORMAT)?;
    event.reserved += count;
    catalog.append_reservation(Reservation {
        account: account.clone(),
        event: event_id,
        seats: count,
        timestamp,
    });
    catalog.save_events()?;
    catalog.save_reservations()?;
    Ok(ReserveOutcome::Accepted)
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;
    use ticket_config::StoragePaths;
    use time::macros::datetime;

    use super::*;
    use crate::catalog::Event;

    const NOW: OffsetDateTime = datetime!(2050-06-01 12:30:05 UTC);

    struct Ledger {
        _dir: TempDir,
        catalog: Catalog,
        owner: AccountId,
        event: EventId,
    }

    #[fixture]
    fn ledger() -> Ledger {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
        let storage = StoragePaths::new(root.join("data"), root.join("data/attachments"));
        storage.prepare_filesystem().expect("prepare storage");
        let mut catalog = Catalog::new(storage);
        let owner = AccountId::parse("123456").expect("valid uid");
        let event = EventId::new(1).expect("valid id");
        catalog.insert_event(Event {
            id: event,
            owner: owner.clone(),
            name: "TEST".to_owned(),
            date: "03-03-2099".to_owned(),
            time: "10:00".to_owned(),
            capacity: 15,
            reserved: 0,
            closed: false,
            file_name: "pic.jpg".to_owned(),
            file_size: 5,
        });
        Ledger {
            _dir: dir,
            catalog,
            owner,
            event,
        }
    }

    fn reserved(ledger: &Ledger) -> u16 {
        ledger
            .catalog
            .event(ledger.event)
            .map_or(0, |event| event.reserved)
    }

    #[rstest]
    fn rejects_more_than_capacity_without_touching_seats(mut ledger: Ledger) {
        let outcome = reserve(&mut ledger.catalog, &ledger.owner, ledger.event, "16", NOW)
            .expect("reserve");
        assert_eq!(outcome, ReserveOutcome::Rejected { available: 15 });
        assert_eq!(reserved(&ledger), 0);
        assert!(ledger.catalog.reservations().is_empty());
    }

    #[rstest]
    fn accepts_then_reports_exact_remainder(mut ledger: Ledger) {
        let first = reserve(&mut ledger.catalog, &ledger.owner, ledger.event, "10", NOW)
            .expect("reserve");
        assert_eq!(first, ReserveOutcome::Accepted);
        let second = reserve(&mut ledger.catalog, &ledger.owner, ledger.event, "6", NOW)
            .expect("reserve");
        assert_eq!(second, ReserveOutcome::Rejected { available: 5 });
        assert_eq!(reserved(&ledger), 10);
    }

    #[rstest]
    fn accepted_reservation_is_persisted_with_timestamp(mut ledger: Ledger) {
        reserve(&mut ledger.catalog, &ledger.owner, ledger.event, "3", NOW).expect("reserve");
        let mut fresh = Catalog::new(ledger.catalog.storage().clone());
        fresh.reload_all().expect("reload");
        let stored = fresh.reservations().first().cloned().expect("one reservation");
        assert_eq!(stored.seats, 3);
        assert_eq!(stored.timestamp, "01-06-2050 12:30:05");
        assert_eq!(fresh.event(ledger.event).map(|e| e.reserved), Some(3));
    }

    #[rstest]
    fn filling_the_event_makes_it_sold_out(mut ledger: Ledger) {
        reserve(&mut ledger.catalog, &ledger.owner, ledger.event, "15", NOW).expect("reserve");
        let error = reserve(&mut ledger.catalog, &ledger.owner, ledger.event, "1", NOW)
            .expect_err("sold out");
        assert!(matches!(error, LedgerError::SoldOut(_)));
    }

    #[rstest]
    fn state_is_checked_before_seat_syntax(mut ledger: Ledger) {
        if let Some(event) = ledger.catalog.event_mut(ledger.event) {
            event.closed = true;
        }
        let error = reserve(&mut ledger.catalog, &ledger.owner, ledger.event, "0", NOW)
            .expect_err("closed");
        assert!(matches!(error, LedgerError::Closed(_)));
    }

    #[rstest]
    fn past_event_is_refused(mut ledger: Ledger) {
        let later = datetime!(2100-01-01 00:00 UTC);
        let error = reserve(&mut ledger.catalog, &ledger.owner, ledger.event, "1", later)
            .expect_err("past");
        assert!(matches!(error, LedgerError::Past(_)));
    }

    #[rstest]
    #[case::zero("0")]
    #[case::too_many("1000")]
    #[case::text("many")]
    fn malformed_seat_counts_are_refused(mut ledger: Ledger, #[case] seats: &str) {
        let error = reserve(&mut ledger.catalog, &ledger.owner, ledger.event, seats, NOW)
            .expect_err("invalid seats");
        assert!(matches!(error, LedgerError::InvalidSeats(_)));
    }

    #[rstest]
    fn unknown_event_is_refused(mut ledger: Ledger) {
        let missing = EventId::new(2).expect("valid id");
        let error = reserve(&mut ledger.catalog, &ledger.owner, missing, "1", NOW)
            .expect_err("unknown");
        assert!(matches!(error, LedgerError::UnknownEvent(_)));
    }
}
