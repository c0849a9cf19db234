//! Reply lines shared by both channels.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

use crate::errors::DecodeError;

/// Leading token of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum ReplyCode {
    /// Answers `LIN`.
    #[strum(serialize = "RLI")]
    Login,
    /// Answers `LOU`.
    #[strum(serialize = "RLO")]
    Logout,
    /// Answers `UNR`.
    #[strum(serialize = "RUR")]
    Unregister,
    /// Answers `LME`.
    #[strum(serialize = "RME")]
    MyEvents,
    /// Answers `LMR`.
    #[strum(serialize = "RMR")]
    MyReservations,
    /// Answers `CPS`.
    #[strum(serialize = "RCP")]
    ChangeSecret,
    /// Answers `CRE`.
    #[strum(serialize = "RCE")]
    Create,
    /// Answers `LST`.
    #[strum(serialize = "RLS")]
    List,
    /// Answers `CLS`.
    #[strum(serialize = "RCL")]
    Close,
    /// Answers `RID`.
    #[strum(serialize = "RRI")]
    Reserve,
    /// Answers `SED`.
    #[strum(serialize = "RSE")]
    Show,
    /// Bare error for requests that could not be recognised.
    #[strum(serialize = "ERR")]
    Error,
}

/// Outcome token following the reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Status {
    /// Success.
    Ok,
    /// New account registered and logged in.
    Reg,
    /// Command-specific failure.
    Nok,
    /// Malformed request.
    Err,
    /// Unknown account (`LOU`, `UNR`).
    Unr,
    /// Wrong secret.
    Wrp,
    /// Not logged in.
    Nlg,
    /// Unknown account (`CPS`).
    Nid,
    /// No such event.
    Noe,
    /// Event not owned by the caller.
    Eow,
    /// Event already took place.
    Pst,
    /// Event already closed (`CLS`).
    Clo,
    /// Event sold out.
    Sld,
    /// Event closed (`RID`).
    Cls,
    /// Reservation accepted.
    Acc,
    /// Reservation rejected; the remaining seats follow.
    Rej,
}

/// A complete reply: code, optional status and trailing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: ReplyCode,
    status: Option<Status>,
    fields: Vec<String>,
}

impl Reply {
    /// Reply carrying a status and no fields.
    #[must_use]
    pub const fn new(code: ReplyCode, status: Status) -> Self {
        Self {
            code,
            status: Some(status),
            fields: Vec::new(),
        }
    }

    /// The bare `ERR` reply sent for unrecognised stream requests.
    #[must_use]
    pub const fn error() -> Self {
        Self {
            code: ReplyCode::Error,
            status: None,
            fields: Vec::new(),
        }
    }

    /// Appends one field.
    #[must_use]
    pub fn with_field(mut self, field: impl ToString) -> Self {
        self.fields.push(field.to_string());
        self
    }

    /// Appends several fields.
    #[must_use]
    pub fn with_fields<I, T>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.fields
            .extend(fields.into_iter().map(|field| field.to_string()));
        self
    }

    /// Reply code.
    #[must_use]
    pub const fn code(&self) -> ReplyCode {
        self.code
    }

    /// Status, absent only for the bare error reply.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        self.status
    }

    /// Fields following the status.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Newline-terminated reply line.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }

    /// Reply header followed by a single space, ready for a payload.
    #[must_use]
    pub fn to_payload_header(&self) -> String {
        format!("{self} ")
    }

    /// Parses a reply line as a client receives it.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Empty`] for blank lines,
    /// [`DecodeError::UnknownReply`] for unknown codes and
    /// [`DecodeError::UnknownStatus`] for unknown statuses.
    pub fn parse(line: &str) -> Result<Self, DecodeError> {
        let mut tokens = line.split_ascii_whitespace();
        let code_token = tokens.next().ok_or(DecodeError::Empty)?;
        let code: ReplyCode = code_token
            .parse()
            .map_err(|_| DecodeError::UnknownReply(code_token.to_owned()))?;
        let status = match tokens.next() {
            Some(token) => Some(
                token
                    .parse::<Status>()
                    .map_err(|_| DecodeError::UnknownStatus(token.to_owned()))?,
            ),
            None => None,
        };
        Ok(Self {
            code,
            status,
            fields: tokens.map(ToOwned::to_owned).collect(),
        })
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(status) = self.status {
            write!(f, " {status}")?;
        }
        for field in &self.fields {
            write!(f, " {field}")?;
        }
        Ok(())
    }
}
