//! Error types for request dispatch.
//!
//! Handlers fail with a [`DispatchError`]. Which status a failure is reported
//! with depends on the command: an unknown account is `UNR` for a logout but
//! `NID` for a secret change, so the mapping takes the reply code into
//! account.

use std::io;

use thiserror::Error;

use ticket_wire::{FrameError, ReplyCode, Status};

use crate::catalog::{AttachmentError, CatalogError, EventId};
use crate::ledger::LedgerError;

/// Request-level failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A token is missing, malformed or out of range.
    #[error("malformed request: {reason}")]
    Syntax {
        /// What was wrong.
        reason: String,
    },
    /// No account carries the identifier.
    #[error("unknown account")]
    UnknownAccount,
    /// The secret does not match the account.
    #[error("wrong secret")]
    WrongSecret,
    /// The account has no active session.
    #[error("account is not logged in")]
    NotLoggedIn,
    /// No event carries the identifier.
    #[error("unknown event '{event}'")]
    UnknownEvent {
        /// Identifier as requested.
        event: String,
    },
    /// The caller does not own the event.
    #[error("event {0} belongs to another account")]
    NotOwner(EventId),
    /// The event already took place.
    #[error("event {0} is past")]
    Past(EventId),
    /// The event is closed.
    #[error("event {0} is closed")]
    Closed(EventId),
    /// The event is sold out.
    #[error("event {0} is sold out")]
    SoldOut(EventId),
    /// A listing came up empty.
    #[error("nothing to list")]
    NothingToList,
    /// All event identifiers are in use.
    #[error("event identifiers exhausted")]
    IdentifiersExhausted,
    /// Attachment upload or download failed.
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    /// A snapshot could not be read or written.
    #[error(transparent)]
    Storage(#[from] CatalogError),
    /// The reservation timestamp could not be rendered.
    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl DispatchError {
    /// Builds a syntax error.
    #[must_use]
    pub fn syntax(reason: impl Into<String>) -> Self {
        Self::Syntax {
            reason: reason.into(),
        }
    }

    /// Status reported for this failure in reply to `code`.
    #[must_use]
    pub const fn status_for(&self, code: ReplyCode) -> Status {
        match self {
            Self::Syntax { .. } => match code {
                ReplyCode::Show => Status::Nok,
                _ => Status::Err,
            },
            Self::UnknownAccount => match code {
                ReplyCode::Logout | ReplyCode::Unregister => Status::Unr,
                ReplyCode::ChangeSecret => Status::Nid,
                ReplyCode::Login | ReplyCode::Close => Status::Nok,
                _ => Status::Nlg,
            },
            Self::WrongSecret => match code {
                ReplyCode::Login | ReplyCode::ChangeSecret | ReplyCode::Close => Status::Nok,
                ReplyCode::MyEvents | ReplyCode::MyReservations => Status::Nlg,
                _ => Status::Wrp,
            },
            Self::NotLoggedIn => match code {
                ReplyCode::Logout | ReplyCode::Unregister => Status::Nok,
                _ => Status::Nlg,
            },
            Self::UnknownEvent { .. } => match code {
                ReplyCode::Close => Status::Noe,
                _ => Status::Nok,
            },
            Self::NotOwner(_) => Status::Eow,
            Self::Past(_) => Status::Pst,
            Self::Closed(_) => match code {
                ReplyCode::Close => Status::Clo,
                _ => Status::Cls,
            },
            Self::SoldOut(_) => Status::Sld,
            Self::NothingToList
            | Self::IdentifiersExhausted
            | Self::Attachment(_)
            | Self::Storage(_)
            | Self::Timestamp(_) => Status::Nok,
        }
    }

    /// True for failures of the server itself rather than of the request.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Attachment(
                AttachmentError::CreateDirectory { .. }
                    | AttachmentError::Stage { .. }
                    | AttachmentError::Persist { .. }
            ) | Self::Storage(_)
                | Self::Timestamp(_)
        )
    }
}

impl From<LedgerError> for DispatchError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::UnknownEvent(event) => Self::UnknownEvent {
                event: event.to_string(),
            },
            LedgerError::Past(event) => Self::Past(event),
            LedgerError::Closed(event) => Self::Closed(event),
            LedgerError::SoldOut(event) => Self::SoldOut(event),
            LedgerError::InvalidSeats(seats) => Self::syntax(format!("invalid seat count '{seats}'")),
            LedgerError::Timestamp(source) => Self::Timestamp(source),
            LedgerError::Storage(source) => Self::Storage(source),
        }
    }
}

/// Failures while writing a reply back to a stream client.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Writing the reply line failed.
    #[error("failed to write reply: {0}")]
    Io(#[from] io::Error),
    /// Streaming the attachment failed.
    #[error("failed to stream attachment: {0}")]
    Frame(#[from] FrameError),
}
