//! Stream channel handlers: event lifecycle, reservations and attachments.

use std::fs::File;
use std::io::Read;

use ticket_wire::{CreateHeader, Credentials, PayloadFrame, Reply, ReplyCode, Status, StreamRequest};
use time::OffsetDateTime;

use super::{DispatchError, authenticate, check_secret, check_session, failure_reply, find_account};
use crate::catalog::{AttachmentError, Catalog, Event, EventId};
use crate::ledger::{self, ReserveOutcome};
use crate::lifecycle::{EventState, compute_state};
use crate::validation::{
    parse_capacity, parse_file_size, valid_date_time, valid_event_name, valid_file_name,
    valid_secret,
};

/// What to send back on the connection.
#[derive(Debug)]
pub(super) enum StreamResponse {
    /// A single reply line.
    Line(Reply),
    /// A reply header followed by an attachment payload.
    Download {
        header: Reply,
        frame: PayloadFrame,
        file: File,
    },
}

/// Per-request inputs other than the request itself.
pub(super) struct StreamContext {
    pub(super) now: OffsetDateTime,
    pub(super) max_attachment_bytes: u64,
}

pub(super) fn handle<R: Read>(
    catalog: &mut Catalog,
    request: &StreamRequest,
    payload: &mut R,
    context: &StreamContext,
) -> StreamResponse {
    let code = request.opcode().reply_code();
    let outcome = match request {
        StreamRequest::ChangeSecret {
            uid,
            old_secret,
            new_secret,
        } => change_secret(catalog, uid, old_secret, new_secret),
        StreamRequest::Create(header) => create(catalog, header, payload, context),
        StreamRequest::List => list(catalog, context.now),
        StreamRequest::Close {
            credentials,
            event_id,
        } => close(catalog, credentials, event_id, context.now),
        StreamRequest::Reserve {
            credentials,
            event_id,
            seats,
        } => reserve(catalog, credentials, event_id, seats, context.now),
        StreamRequest::Show { event_id } => return show(catalog, event_id),
    };
    StreamResponse::Line(outcome.unwrap_or_else(|failure| failure_reply(code, &failure)))
}

fn change_secret(
    catalog: &mut Catalog,
    uid: &str,
    old_secret: &str,
    new_secret: &str,
) -> Result<Reply, DispatchError> {
    catalog.reload_accounts()?;
    let account = find_account(catalog, uid)?;
    check_session(account)?;
    check_secret(account, old_secret)?;
    if !valid_secret(new_secret) {
        return Err(DispatchError::syntax("new secret is malformed"));
    }
    new_secret.clone_into(&mut account.secret);
    catalog.save_accounts()?;
    Ok(Reply::new(ReplyCode::ChangeSecret, Status::Ok))
}

fn create<R: Read>(
    catalog: &mut Catalog,
    header: &CreateHeader,
    payload: &mut R,
    context: &StreamContext,
) -> Result<Reply, DispatchError> {
    catalog.reload_accounts()?;
    catalog.reload_events()?;
    let owner = authenticate(catalog, &header.credentials)?.id.clone();

    if !valid_event_name(&header.name) {
        return Err(DispatchError::syntax("event name is malformed"));
    }
    if !valid_date_time(&header.date, &header.time) {
        return Err(DispatchError::syntax("event date or time is malformed"));
    }
    let capacity = parse_capacity(&header.capacity)
        .ok_or_else(|| DispatchError::syntax("capacity is out of range"))?;
    if !valid_file_name(&header.file_name) {
        return Err(DispatchError::syntax("attachment name is malformed"));
    }
    let file_size = parse_file_size(&header.file_size, context.max_attachment_bytes)
        .ok_or_else(|| DispatchError::syntax("attachment size is out of range"))?;

    let attachments = catalog.attachments().clone();
    let staged = attachments.stage(PayloadFrame::new(file_size), payload)?;
    PayloadFrame::read_terminator(payload)
        .map_err(|source| AttachmentError::Transfer { source })?;

    let id = catalog
        .allocate_event_id()
        .ok_or(DispatchError::IdentifiersExhausted)?;
    let received = staged.size();
    attachments.commit(staged, id, &header.file_name)?;
    catalog.insert_event(Event {
        id,
        owner,
        name: header.name.clone(),
        date: header.date.clone(),
        time: header.time.clone(),
        capacity,
        reserved: 0,
        closed: false,
        file_name: header.file_name.clone(),
        file_size: received,
    });
    catalog.save_events()?;
    Ok(Reply::new(ReplyCode::Create, Status::Ok).with_field(id))
}

fn list(catalog: &mut Catalog, now: OffsetDateTime) -> Result<Reply, DispatchError> {
    catalog.reload_events()?;
    let mut fields = Vec::new();
    for event in catalog.events() {
        fields.extend([
            event.id.to_string(),
            event.name.clone(),
            compute_state(event, now).to_string(),
            event.date.clone(),
            event.time.clone(),
        ]);
    }
    if fields.is_empty() {
        return Err(DispatchError::NothingToList);
    }
    Ok(Reply::new(ReplyCode::List, Status::Ok).with_fields(fields))
}

fn lookup_event(catalog: &Catalog, event_id: &str) -> Result<EventId, DispatchError> {
    EventId::parse(event_id)
        .filter(|id| catalog.event(*id).is_some())
        .ok_or_else(|| DispatchError::UnknownEvent {
            event: event_id.to_owned(),
        })
}

fn close(
    catalog: &mut Catalog,
    credentials: &Credentials,
    event_id: &str,
    now: OffsetDateTime,
) -> Result<Reply, DispatchError> {
    catalog.reload_accounts()?;
    catalog.reload_events()?;
    let caller = authenticate(catalog, credentials)?.id.clone();
    let id = lookup_event(catalog, event_id)?;
    let Some(event) = catalog.event_mut(id) else {
        return Err(DispatchError::UnknownEvent {
            event: event_id.to_owned(),
        });
    };
    if event.owner != caller {
        return Err(DispatchError::NotOwner(id));
    }
    match compute_state(event, now) {
        EventState::Past => return Err(DispatchError::Past(id)),
        EventState::Closed => return Err(DispatchError::Closed(id)),
        EventState::SoldOut => return Err(DispatchError::SoldOut(id)),
        EventState::Open => {}
    }
    event.closed = true;
    catalog.save_events()?;
    Ok(Reply::new(ReplyCode::Close, Status::Ok))
}

fn reserve(
    catalog: &mut Catalog,
    credentials: &Credentials,
    event_id: &str,
    seats: &str,
    now: OffsetDateTime,
) -> Result<Reply, DispatchError> {
    catalog.reload_accounts()?;
    catalog.reload_events()?;
    catalog.reload_reservations()?;
    let account = authenticate(catalog, credentials)?.id.clone();
    let id = lookup_event(catalog, event_id)?;
    let reply = match ledger::reserve(catalog, &account, id, seats, now)? {
        ReserveOutcome::Accepted => Reply::new(ReplyCode::Reserve, Status::Acc),
        ReserveOutcome::Rejected { available } => {
            Reply::new(ReplyCode::Reserve, Status::Rej).with_field(available)
        }
    };
    Ok(reply)
}

fn show(catalog: &mut Catalog, event_id: &str) -> StreamResponse {
    match download(catalog, event_id) {
        Ok(response) => response,
        Err(failure) => StreamResponse::Line(failure_reply(ReplyCode::Show, &failure)),
    }
}

fn download(catalog: &mut Catalog, event_id: &str) -> Result<StreamResponse, DispatchError> {
    catalog.reload_events()?;
    let id = lookup_event(catalog, event_id)?;
    let Some(event) = catalog.event(id) else {
        return Err(DispatchError::UnknownEvent {
            event: event_id.to_owned(),
        });
    };
    let file = catalog
        .attachments()
        .open(id, &event.file_name, event.file_size)?;
    let header = Reply::new(ReplyCode::Show, Status::Ok).with_fields([
        event.owner.to_string(),
        event.name.clone(),
        event.date.clone(),
        event.time.clone(),
        event.capacity.to_string(),
        event.reserved.to_string(),
        event.file_name.clone(),
        event.file_size.to_string(),
    ]);
    Ok(StreamResponse::Download {
        header,
        frame: PayloadFrame::new(event.file_size),
        file,
    })
}
