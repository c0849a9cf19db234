//! Datagram channel handlers: session management and personal listings.

use ticket_wire::{Credentials, DatagramOpcode, DatagramRequest, Reply, Status};
use time::{OffsetDateTime, PrimitiveDateTime};

use super::{DispatchError, authenticate, check_secret, failure_reply};
use crate::catalog::{Account, AccountId, Catalog};
use crate::ledger::{DATE_FORMAT, TIME_FORMAT, TIMESTAMP_FORMAT};
use crate::lifecycle::compute_state;
use crate::validation::{valid_account_id, valid_secret};

const UNKNOWN_DATE: &str = "00-00-0000";
const UNKNOWN_TIME: &str = "00:00:00";

pub(super) fn handle(catalog: &mut Catalog, request: &DatagramRequest, now: OffsetDateTime) -> Reply {
    let code = request.opcode.reply_code();
    let credentials = &request.credentials;
    let outcome = match request.opcode {
        DatagramOpcode::Login => login(catalog, credentials),
        DatagramOpcode::Logout => logout(catalog, credentials),
        DatagramOpcode::Unregister => unregister(catalog, credentials),
        DatagramOpcode::MyEvents => my_events(catalog, credentials, now),
        DatagramOpcode::MyReservations => my_reservations(catalog, credentials),
    };
    outcome.unwrap_or_else(|failure| failure_reply(code, &failure))
}

fn check_syntax(credentials: &Credentials) -> Result<(), DispatchError> {
    if valid_account_id(&credentials.uid) && valid_secret(&credentials.secret) {
        Ok(())
    } else {
        Err(DispatchError::syntax("uid or secret is malformed"))
    }
}

fn login(catalog: &mut Catalog, credentials: &Credentials) -> Result<Reply, DispatchError> {
    let code = DatagramOpcode::Login.reply_code();
    catalog.reload_accounts()?;
    check_syntax(credentials)?;
    let Some(id) = AccountId::parse(&credentials.uid) else {
        return Err(DispatchError::syntax("uid is malformed"));
    };

    if let Some(account) = catalog.account_mut(&id) {
        check_secret(account, &credentials.secret)?;
        account.logged_in = true;
        return Ok(Reply::new(code, Status::Ok));
    }

    let mut account = Account::new(id, credentials.secret.clone());
    account.logged_in = true;
    catalog.insert_account(account);
    catalog.save_accounts()?;
    Ok(Reply::new(code, Status::Reg))
}

fn logout(catalog: &mut Catalog, credentials: &Credentials) -> Result<Reply, DispatchError> {
    catalog.reload_accounts()?;
    check_syntax(credentials)?;
    let account = authenticate(catalog, credentials)?;
    account.logged_in = false;
    Ok(Reply::new(DatagramOpcode::Logout.reply_code(), Status::Ok))
}

fn unregister(catalog: &mut Catalog, credentials: &Credentials) -> Result<Reply, DispatchError> {
    catalog.reload_accounts()?;
    let id = authenticate(catalog, credentials)?.id.clone();
    catalog.remove_account(&id);
    catalog.save_accounts()?;
    Ok(Reply::new(DatagramOpcode::Unregister.reply_code(), Status::Ok))
}

fn my_events(
    catalog: &mut Catalog,
    credentials: &Credentials,
    now: OffsetDateTime,
) -> Result<Reply, DispatchError> {
    catalog.reload_accounts()?;
    catalog.reload_events()?;
    let owner = authenticate(catalog, credentials)?.id.clone();

    let mut fields = Vec::new();
    for event in catalog.events().filter(|event| event.owner == owner) {
        fields.push(event.id.to_string());
        fields.push(compute_state(event, now).to_string());
    }
    if fields.is_empty() {
        return Err(DispatchError::NothingToList);
    }
    Ok(Reply::new(DatagramOpcode::MyEvents.reply_code(), Status::Ok).with_fields(fields))
}

fn my_reservations(
    catalog: &mut Catalog,
    credentials: &Credentials,
) -> Result<Reply, DispatchError> {
    catalog.reload_accounts()?;
    catalog.reload_reservations()?;
    let account = authenticate(catalog, credentials)?.id.clone();

    let mut mine: Vec<_> = catalog
        .reservations()
        .iter()
        .filter(|reservation| reservation.account == account)
        .map(|reservation| {
            let accepted_at =
                PrimitiveDateTime::parse(&reservation.timestamp, TIMESTAMP_FORMAT).ok();
            (reservation.event, accepted_at, reservation.seats)
        })
        .collect();
    if mine.is_empty() {
        return Err(DispatchError::NothingToList);
    }
    mine.sort_by_key(|&(event, accepted_at, _)| (event, accepted_at));

    let mut fields = Vec::with_capacity(mine.len() * 4);
    for (event, accepted_at, seats) in mine {
        let (date, time) = match accepted_at {
            Some(instant) => (
                instant.date().format(DATE_FORMAT)?,
                instant.time().format(TIME_FORMAT)?,
            ),
            None => (UNKNOWN_DATE.to_owned(), UNKNOWN_TIME.to_owned()),
        };
        fields.extend([event.to_string(), date, time, seats.to_string()]);
    }
    Ok(Reply::new(DatagramOpcode::MyReservations.reply_code(), Status::Ok).with_fields(fields))
}
