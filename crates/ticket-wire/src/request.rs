//! Typed requests for both command channels.
//!
//! Arguments are carried as raw tokens. Syntax rules (identifier lengths,
//! date formats, numeric ranges) belong to the server, which must answer each
//! violation with a command-specific status rather than a decode failure.

use std::io::Read;

use strum::{Display, EnumString, IntoStaticStr};

use crate::errors::{DecodeError, TokenError};
use crate::reply::ReplyCode;
use crate::token::TokenReader;

/// Opcodes accepted on the datagram channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum DatagramOpcode {
    /// Log in, registering unseen identifiers.
    #[strum(serialize = "LIN")]
    Login,
    /// Log out.
    #[strum(serialize = "LOU")]
    Logout,
    /// Remove the account.
    #[strum(serialize = "UNR")]
    Unregister,
    /// List events owned by the account.
    #[strum(serialize = "LME")]
    MyEvents,
    /// List reservations made by the account.
    #[strum(serialize = "LMR")]
    MyReservations,
}

impl DatagramOpcode {
    /// Reply code answering this opcode.
    #[must_use]
    pub const fn reply_code(self) -> ReplyCode {
        match self {
            Self::Login => ReplyCode::Login,
            Self::Logout => ReplyCode::Logout,
            Self::Unregister => ReplyCode::Unregister,
            Self::MyEvents => ReplyCode::MyEvents,
            Self::MyReservations => ReplyCode::MyReservations,
        }
    }
}

/// Account identifier and secret exactly as sent by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Account identifier token.
    pub uid: String,
    /// Secret token.
    pub secret: String,
}

impl Credentials {
    /// Builds credentials from raw tokens.
    #[must_use]
    pub fn new(uid: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            secret: secret.into(),
        }
    }
}

/// A decoded datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatagramRequest {
    /// Command to run.
    pub opcode: DatagramOpcode,
    /// Credentials that accompany every datagram command.
    pub credentials: Credentials,
}

impl DatagramRequest {
    /// Builds a request.
    #[must_use]
    pub const fn new(opcode: DatagramOpcode, credentials: Credentials) -> Self {
        Self {
            opcode,
            credentials,
        }
    }

    /// Decodes one datagram.
    ///
    /// Missing credential tokens decode as empty strings so the handler can
    /// answer with its own syntax status.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Empty`] for blank input,
    /// [`DecodeError::InvalidUtf8`] for non UTF-8 input and
    /// [`DecodeError::UnknownCommand`] for opcodes outside the datagram
    /// vocabulary. The server drops such datagrams without replying.
    pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(datagram).map_err(|_| DecodeError::InvalidUtf8)?;
        let mut tokens = text.split_ascii_whitespace();
        let opcode_token = tokens.next().ok_or(DecodeError::Empty)?;
        let opcode: DatagramOpcode = opcode_token
            .parse()
            .map_err(|_| DecodeError::UnknownCommand(opcode_token.to_owned()))?;
        let uid = tokens.next().unwrap_or_default();
        let secret = tokens.next().unwrap_or_default();
        Ok(Self::new(opcode, Credentials::new(uid, secret)))
    }

    /// Encodes the request as a newline-terminated line.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{} {} {}\n",
            self.opcode, self.credentials.uid, self.credentials.secret
        )
    }
}

/// Opcodes accepted on the stream channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum StreamOpcode {
    /// Change the account secret.
    #[strum(serialize = "CPS")]
    ChangeSecret,
    /// Create an event with an attachment.
    #[strum(serialize = "CRE")]
    Create,
    /// List every event.
    #[strum(serialize = "LST")]
    List,
    /// Close an event.
    #[strum(serialize = "CLS")]
    Close,
    /// Reserve seats.
    #[strum(serialize = "RID")]
    Reserve,
    /// Show an event and download its attachment.
    #[strum(serialize = "SED")]
    Show,
}

impl StreamOpcode {
    /// Reply code answering this opcode.
    #[must_use]
    pub const fn reply_code(self) -> ReplyCode {
        match self {
            Self::ChangeSecret => ReplyCode::ChangeSecret,
            Self::Create => ReplyCode::Create,
            Self::List => ReplyCode::List,
            Self::Close => ReplyCode::Close,
            Self::Reserve => ReplyCode::Reserve,
            Self::Show => ReplyCode::Show,
        }
    }
}

/// Header of a `CRE` request. The attachment payload follows on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateHeader {
    /// Owner credentials.
    pub credentials: Credentials,
    /// Event name.
    pub name: String,
    /// Event date, `dd-mm-yyyy`.
    pub date: String,
    /// Event time, `hh:mm` or `hh:mm:ss`.
    pub time: String,
    /// Seat capacity.
    pub capacity: String,
    /// Attachment file name.
    pub file_name: String,
    /// Declared attachment size in bytes.
    pub file_size: String,
}

/// A decoded stream request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRequest {
    /// `CPS uid old new`.
    ChangeSecret {
        /// Account identifier.
        uid: String,
        /// Current secret.
        old_secret: String,
        /// Replacement secret.
        new_secret: String,
    },
    /// `CRE uid pass name date time capacity fname fsize` and a payload.
    Create(CreateHeader),
    /// `LST`.
    List,
    /// `CLS uid pass eid`.
    Close {
        /// Caller credentials.
        credentials: Credentials,
        /// Event identifier.
        event_id: String,
    },
    /// `RID uid pass eid seats`.
    Reserve {
        /// Caller credentials.
        credentials: Credentials,
        /// Event identifier.
        event_id: String,
        /// Requested seats.
        seats: String,
    },
    /// `SED eid`.
    Show {
        /// Event identifier.
        event_id: String,
    },
}

impl StreamRequest {
    /// Opcode of this request.
    #[must_use]
    pub const fn opcode(&self) -> StreamOpcode {
        match self {
            Self::ChangeSecret { .. } => StreamOpcode::ChangeSecret,
            Self::Create(_) => StreamOpcode::Create,
            Self::List => StreamOpcode::List,
            Self::Close { .. } => StreamOpcode::Close,
            Self::Reserve { .. } => StreamOpcode::Reserve,
            Self::Show { .. } => StreamOpcode::Show,
        }
    }

    /// Decodes a request header from the stream.
    ///
    /// Reading stops right after the last header token, so for `CRE` the
    /// reader is positioned at the first payload byte.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Empty`] when the stream ends before an opcode,
    /// [`DecodeError::UnknownCommand`] for unknown opcodes,
    /// [`DecodeError::Opcode`] when the opcode cannot be read, and
    /// [`DecodeError::MissingArgument`] or [`DecodeError::Token`] when an
    /// argument is absent or unreadable.
    pub fn decode<R: Read>(reader: &mut TokenReader<R>) -> Result<Self, DecodeError> {
        let opcode_token = reader
            .next_token()
            .map_err(DecodeError::Opcode)?
            .ok_or(DecodeError::Empty)?;
        let opcode: StreamOpcode = opcode_token
            .parse()
            .map_err(|_| DecodeError::UnknownCommand(opcode_token))?;
        let mut args = Arguments { reader, opcode };

        let request = match opcode {
            StreamOpcode::ChangeSecret => Self::ChangeSecret {
                uid: args.take("uid")?,
                old_secret: args.take("old_secret")?,
                new_secret: args.take("new_secret")?,
            },
            StreamOpcode::Create => Self::Create(CreateHeader {
                credentials: args.credentials()?,
                name: args.take("name")?,
                date: args.take("date")?,
                time: args.take("time")?,
                capacity: args.take("capacity")?,
                file_name: args.take("file_name")?,
                file_size: args.take("file_size")?,
            }),
            StreamOpcode::List => Self::List,
            StreamOpcode::Close => Self::Close {
                credentials: args.credentials()?,
                event_id: args.take("event_id")?,
            },
            StreamOpcode::Reserve => Self::Reserve {
                credentials: args.credentials()?,
                event_id: args.take("event_id")?,
                seats: args.take("seats")?,
            },
            StreamOpcode::Show => Self::Show {
                event_id: args.take("event_id")?,
            },
        };
        Ok(request)
    }

    /// Encodes the request header as a client sends it.
    ///
    /// Every request is newline-terminated except `CRE`, whose header ends
    /// with a single space; the caller then sends the payload and a newline.
    #[must_use]
    pub fn encode(&self) -> String {
        let opcode = self.opcode();
        match self {
            Self::ChangeSecret {
                uid,
                old_secret,
                new_secret,
            } => format!("{opcode} {uid} {old_secret} {new_secret}\n"),
            Self::Create(header) => format!(
                "{opcode} {} {} {} {} {} {} {} {} ",
                header.credentials.uid,
                header.credentials.secret,
                header.name,
                header.date,
                header.time,
                header.capacity,
                header.file_name,
                header.file_size
            ),
            Self::List => format!("{opcode}\n"),
            Self::Close {
                credentials,
                event_id,
            } => format!(
                "{opcode} {} {} {event_id}\n",
                credentials.uid, credentials.secret
            ),
            Self::Reserve {
                credentials,
                event_id,
                seats,
            } => format!(
                "{opcode} {} {} {event_id} {seats}\n",
                credentials.uid, credentials.secret
            ),
            Self::Show { event_id } => format!("{opcode} {event_id}\n"),
        }
    }
}

struct Arguments<'a, R> {
    reader: &'a mut TokenReader<R>,
    opcode: StreamOpcode,
}

impl<R: Read> Arguments<'_, R> {
    fn take(&mut self, argument: &'static str) -> Result<String, DecodeError> {
        match self.reader.next_token() {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(DecodeError::MissingArgument {
                opcode: self.opcode,
                argument,
            }),
            Err(source) => Err(self.token_error(source)),
        }
    }

    fn credentials(&mut self) -> Result<Credentials, DecodeError> {
        let uid = self.take("uid")?;
        let secret = self.take("secret")?;
        Ok(Credentials { uid, secret })
    }

    const fn token_error(&self, source: TokenError) -> DecodeError {
        DecodeError::Token {
            opcode: self.opcode,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use rstest::rstest;

    use super::*;

    fn reader(input: &str) -> TokenReader<Cursor<Vec<u8>>> {
        TokenReader::new(Cursor::new(input.as_bytes().to_vec()))
    }

    #[rstest]
    #[case::login("LIN 123456 abcdef12\n", DatagramOpcode::Login)]
    #[case::logout("LOU 123456 abcdef12\n", DatagramOpcode::Logout)]
    #[case::unregister("UNR 123456 abcdef12", DatagramOpcode::Unregister)]
    #[case::my_events("  LME\t123456  abcdef12\n", DatagramOpcode::MyEvents)]
    #[case::my_reservations("LMR 123456 abcdef12\n", DatagramOpcode::MyReservations)]
    fn decodes_datagram_commands(#[case] input: &str, #[case] opcode: DatagramOpcode) {
        let request = DatagramRequest::decode(input.as_bytes()).expect("datagram should decode");
        assert_eq!(request.opcode, opcode);
        assert_eq!(request.credentials, Credentials::new("123456", "abcdef12"));
    }

    #[test]
    fn missing_datagram_arguments_decode_as_empty() {
        let request = DatagramRequest::decode(b"LIN 123456\n").expect("datagram should decode");
        assert_eq!(request.credentials, Credentials::new("123456", ""));
    }

    #[rstest]
    #[case::empty("", "empty")]
    #[case::blank(" \n", "empty")]
    #[case::unknown("FOO 123456 abcdef12\n", "unknown")]
    #[case::lowercase("lin 123456 abcdef12\n", "unknown")]
    fn rejects_unusable_datagrams(#[case] input: &str, #[case] kind: &str) {
        let error = DatagramRequest::decode(input.as_bytes()).expect_err("datagram should fail");
        match kind {
            "empty" => assert!(matches!(error, DecodeError::Empty)),
            _ => assert!(matches!(error, DecodeError::UnknownCommand(_))),
        }
    }

    #[test]
    fn rejects_non_utf8_datagram() {
        let error = DatagramRequest::decode(&[0x4c, 0xff, 0x4e]).expect_err("datagram should fail");
        assert!(matches!(error, DecodeError::InvalidUtf8));
    }

    #[test]
    fn datagram_encoding_is_a_single_line() {
        let request = DatagramRequest::new(
            DatagramOpcode::MyReservations,
            Credentials::new("123456", "abcdef12"),
        );
        assert_eq!(request.encode(), "LMR 123456 abcdef12\n");
    }

    #[test]
    fn create_header_leaves_payload_unread() {
        let mut stream = reader("CRE 123456 abcdef12 TEST 03-03-2099 10:00 15 pic.jpg 5 hello\n");
        let request = StreamRequest::decode(&mut stream).expect("header should decode");
        let StreamRequest::Create(header) = request else {
            panic!("expected a create request");
        };
        assert_eq!(header.credentials, Credentials::new("123456", "abcdef12"));
        assert_eq!(header.name, "TEST");
        assert_eq!(header.file_size, "5");

        let mut rest = String::new();
        stream
            .get_mut()
            .read_to_string(&mut rest)
            .expect("remaining bytes should be readable");
        assert_eq!(rest, "hello\n");
    }

    #[rstest]
    #[case::list("LST\n", StreamRequest::List)]
    #[case::show("SED 001\n", StreamRequest::Show { event_id: "001".to_owned() })]
    #[case::close(
        "CLS 123456 abcdef12 001\n",
        StreamRequest::Close {
            credentials: Credentials::new("123456", "abcdef12"),
            event_id: "001".to_owned(),
        }
    )]
    #[case::reserve(
        "RID 123456 abcdef12 001 16\n",
        StreamRequest::Reserve {
            credentials: Credentials::new("123456", "abcdef12"),
            event_id: "001".to_owned(),
            seats: "16".to_owned(),
        }
    )]
    #[case::change_secret(
        "CPS 123456 abcdef12 zyxwvu98\n",
        StreamRequest::ChangeSecret {
            uid: "123456".to_owned(),
            old_secret: "abcdef12".to_owned(),
            new_secret: "zyxwvu98".to_owned(),
        }
    )]
    fn decodes_stream_headers(#[case] input: &str, #[case] expected: StreamRequest) {
        let request = StreamRequest::decode(&mut reader(input)).expect("header should decode");
        assert_eq!(request, expected);
        assert_eq!(request.encode(), input);
    }

    #[test]
    fn reports_first_missing_argument() {
        let error = StreamRequest::decode(&mut reader("RID 123456 abcdef12\n"))
            .expect_err("header should fail");
        assert!(matches!(
            error,
            DecodeError::MissingArgument {
                opcode: StreamOpcode::Reserve,
                argument: "event_id"
            }
        ));
        assert_eq!(error.opcode(), Some(StreamOpcode::Reserve));
    }

    #[test]
    fn oversized_argument_is_attributed_to_the_command() {
        let long = "9".repeat(2048);
        let error = StreamRequest::decode(&mut reader(&format!("SED {long}\n")))
            .expect_err("header should fail");
        assert_eq!(error.opcode(), Some(StreamOpcode::Show));
    }

    #[rstest]
    #[case::unknown("XYZ 1 2\n")]
    #[case::empty("")]
    fn unknown_or_missing_opcode_has_no_command(#[case] input: &str) {
        let error = StreamRequest::decode(&mut reader(input)).expect_err("header should fail");
        assert_eq!(error.opcode(), None);
    }

    #[test]
    fn create_encoding_ends_with_a_space() {
        let request = StreamRequest::Create(CreateHeader {
            credentials: Credentials::new("123456", "abcdef12"),
            name: "TEST".to_owned(),
            date: "03-03-2099".to_owned(),
            time: "10:00".to_owned(),
            capacity: "15".to_owned(),
            file_name: "pic.jpg".to_owned(),
            file_size: "5".to_owned(),
        });
        assert_eq!(
            request.encode(),
            "CRE 123456 abcdef12 TEST 03-03-2099 10:00 15 pic.jpg 5 "
        );
    }
}
