//! Flat snapshot files, one record per line.
//!
//! Loads replace a collection wholesale. Lines that do not parse are set
//! aside and written back verbatim by the next save, so a damaged record is
//! never silently dropped. Saves rewrite the whole file through a temporary
//! sibling that is renamed over the snapshot.

use std::fs;
use std::io::{self, BufWriter, Write};

use camino::Utf8Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

use super::CATALOG_TARGET;
use super::errors::SnapshotError;
use super::model::{Account, AccountId, Event, EventId, Reservation};
use crate::validation::{parse_decimal, valid_secret};

/// Reasons a snapshot line is rejected.
#[derive(Debug, Error)]
pub(crate) enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid {field} '{value}'")]
    InvalidField { field: &'static str, value: String },
}

impl RecordError {
    fn invalid(field: &'static str, value: &str) -> Self {
        Self::InvalidField {
            field,
            value: value.to_owned(),
        }
    }
}

/// A record that round-trips through one snapshot line.
pub(crate) trait SnapshotRecord: Sized {
    /// Collection name used in diagnostics.
    const COLLECTION: &'static str;

    fn parse(line: &str) -> Result<Self, RecordError>;

    fn render(&self) -> String;
}

/// Contents of one snapshot file.
#[derive(Debug)]
pub(crate) struct Loaded<T> {
    pub(crate) records: Vec<T>,
    pub(crate) unparsed: Vec<String>,
}

/// Reads every record. A missing file is an empty collection.
pub(crate) fn load<T: SnapshotRecord>(path: &Utf8Path) -> Result<Loaded<T>, SnapshotError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(Loaded {
                records: Vec::new(),
                unparsed: Vec::new(),
            });
        }
        Err(source) => {
            return Err(SnapshotError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut records = Vec::new();
    let mut unparsed = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match T::parse(line) {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(
                    target: CATALOG_TARGET,
                    collection = T::COLLECTION,
                    path = %path,
                    line = index + 1,
                    reason = %error,
                    "keeping malformed snapshot record aside"
                );
                unparsed.push(line.to_owned());
            }
        }
    }
    Ok(Loaded { records, unparsed })
}

/// Rewrites the snapshot with exactly `records`, followed by the `unparsed`
/// lines as they were read.
pub(crate) fn save<'a, T, I>(
    path: &Utf8Path,
    records: I,
    unparsed: &[String],
) -> Result<(), SnapshotError>
where
    T: SnapshotRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let write_error = |source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    };
    let directory = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let staging = NamedTempFile::new_in(directory).map_err(write_error)?;
    {
        let mut writer = BufWriter::new(staging.as_file());
        for record in records {
            writeln!(writer, "{}", record.render()).map_err(write_error)?;
        }
        for line in unparsed {
            writeln!(writer, "{line}").map_err(write_error)?;
        }
        writer.flush().map_err(write_error)?;
    }
    staging
        .persist(path)
        .map_err(|error| write_error(error.error))?;
    Ok(())
}

impl SnapshotRecord for Account {
    const COLLECTION: &'static str = "accounts";

    fn parse(line: &str) -> Result<Self, RecordError> {
        let [uid, secret] = fields(line)?;
        let id = AccountId::parse(uid).ok_or_else(|| RecordError::invalid("uid", uid))?;
        if !valid_secret(secret) {
            return Err(RecordError::invalid("secret", secret));
        }
        Ok(Self::new(id, secret.to_owned()))
    }

    fn render(&self) -> String {
        format!("{} {}", self.id, self.secret)
    }
}

impl SnapshotRecord for Event {
    const COLLECTION: &'static str = "events";

    fn parse(line: &str) -> Result<Self, RecordError> {
        let [
            eid,
            owner,
            name,
            date,
            time,
            capacity_field,
            reserved_field,
            closed,
            file_name,
            file_size,
        ] = fields(line)?;
        let capacity = small_number("capacity", capacity_field)?;
        let reserved = small_number("reserved", reserved_field)?;
        if reserved > capacity {
            return Err(RecordError::invalid("reserved", reserved_field));
        }
        Ok(Self {
            id: EventId::parse(eid).ok_or_else(|| RecordError::invalid("eid", eid))?,
            owner: AccountId::parse(owner).ok_or_else(|| RecordError::invalid("owner", owner))?,
            name: name.to_owned(),
            date: date.to_owned(),
            time: time.to_owned(),
            capacity,
            reserved,
            closed: match closed {
                "0" => false,
                "1" => true,
                other => return Err(RecordError::invalid("closed", other)),
            },
            file_name: file_name.to_owned(),
            file_size: parse_decimal(file_size)
                .ok_or_else(|| RecordError::invalid("fsize", file_size))?,
        })
    }

    fn render(&self) -> String {
        format!(
            "{} {} {} {} {} {} {} {} {} {}",
            self.id,
            self.owner,
            self.name,
            self.date,
            self.time,
            self.capacity,
            self.reserved,
            u8::from(self.closed),
            self.file_name,
            self.file_size
        )
    }
}

impl SnapshotRecord for Reservation {
    const COLLECTION: &'static str = "reservations";

    fn parse(line: &str) -> Result<Self, RecordError> {
        let mut parts = line.splitn(4, ' ');
        let (Some(uid), Some(eid), Some(seats), Some(timestamp)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            let found = line.split(' ').count();
            return Err(RecordError::FieldCount { expected: 4, found });
        };
        Ok(Self {
            account: AccountId::parse(uid).ok_or_else(|| RecordError::invalid("uid", uid))?,
            event: EventId::parse(eid).ok_or_else(|| RecordError::invalid("eid", eid))?,
            seats: small_number("seats", seats)?,
            timestamp: timestamp.trim().to_owned(),
        })
    }

    fn render(&self) -> String {
        format!(
            "{} {} {} {}",
            self.account, self.event, self.seats, self.timestamp
        )
    }
}

fn fields<const N: usize>(line: &str) -> Result<[&str; N], RecordError> {
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    let found = tokens.len();
    <[&str; N]>::try_from(tokens).map_err(|_| RecordError::FieldCount { expected: N, found })
}

fn small_number(field: &'static str, value: &str) -> Result<u16, RecordError> {
    parse_decimal(value)
        .and_then(|number| u16::try_from(number).ok())
        .ok_or_else(|| RecordError::invalid(field, value))
}
