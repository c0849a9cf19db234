//! The in-memory catalog of accounts, events and reservations.
//!
//! The catalog is authoritative while the server runs. Each collection is
//! backed by one snapshot file; handlers reload the collections they touch
//! before using them and save whatever they mutate. This is only sound because
//! requests are processed strictly one at a time.
//!
//! Snapshot lines that fail to parse are carried alongside each collection and
//! written back on save. An event identifier at the start of such a line stays
//! taken.

mod attachments;
mod errors;
mod model;
mod snapshot;

use std::collections::{BTreeMap, BTreeSet};

use camino::Utf8Path;

use ticket_config::StoragePaths;
use tracing::debug;

pub use attachments::{AttachmentStore, StagedAttachment};
pub use errors::{AttachmentError, CatalogError, SnapshotError};
pub use model::{Account, AccountId, Event, EventId, Reservation};

use snapshot::{Loaded, SnapshotRecord};

pub(crate) const CATALOG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::catalog");

/// Record counts, used for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCounts {
    /// Registered accounts.
    pub accounts: usize,
    /// Events ever created.
    pub events: usize,
    /// Reservations ever accepted.
    pub reservations: usize,
}

/// Accounts, events and reservations, plus the attachment store.
#[derive(Debug)]
pub struct Catalog {
    storage: StoragePaths,
    attachments: AttachmentStore,
    accounts: BTreeMap<AccountId, Account>,
    events: BTreeMap<EventId, Event>,
    reservations: Vec<Reservation>,
    unparsed: Unparsed,
}

/// Snapshot lines that did not parse, kept per collection.
#[derive(Debug, Default)]
struct Unparsed {
    accounts: Vec<String>,
    events: Vec<String>,
    reservations: Vec<String>,
    event_ids: BTreeSet<EventId>,
}

impl Catalog {
    /// Empty catalog over `storage`. Nothing is read until a reload.
    #[must_use]
    pub fn new(storage: StoragePaths) -> Self {
        let attachments = AttachmentStore::new(storage.attachment_dir());
        Self {
            storage,
            attachments,
            accounts: BTreeMap::new(),
            events: BTreeMap::new(),
            reservations: Vec::new(),
            unparsed: Unparsed::default(),
        }
    }

    /// Reloads every collection.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Load`] when a snapshot cannot be read.
    pub fn reload_all(&mut self) -> Result<(), CatalogError> {
        self.reload_accounts()?;
        self.reload_events()?;
        self.reload_reservations()
    }

    /// Replaces accounts with the snapshot contents.
    ///
    /// Session flags are not persisted: an account keeps the flag it had in
    /// memory before the reload, and newly seen accounts start logged out.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Load`] when the snapshot cannot be read.
    pub fn reload_accounts(&mut self) -> Result<(), CatalogError> {
        let Loaded { records, unparsed } = load::<Account>(&self.storage.accounts_path())?;
        let mut accounts = BTreeMap::new();
        for mut account in records {
            account.logged_in = self
                .accounts
                .get(&account.id)
                .is_some_and(|previous| previous.logged_in);
            accounts.insert(account.id.clone(), account);
        }
        self.accounts = accounts;
        self.unparsed.accounts = unparsed;
        Ok(())
    }

    /// Replaces events with the snapshot contents.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Load`] when the snapshot cannot be read.
    pub fn reload_events(&mut self) -> Result<(), CatalogError> {
        let Loaded { records, unparsed } = load::<Event>(&self.storage.events_path())?;
        self.events = records
            .into_iter()
            .map(|event| (event.id, event))
            .collect();
        self.unparsed.event_ids = unparsed
            .iter()
            .filter_map(|line| line.split_whitespace().next())
            .filter_map(EventId::parse)
            .collect();
        self.unparsed.events = unparsed;
        Ok(())
    }

    /// Replaces reservations with the snapshot contents.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Load`] when the snapshot cannot be read.
    pub fn reload_reservations(&mut self) -> Result<(), CatalogError> {
        let Loaded { records, unparsed } =
            load::<Reservation>(&self.storage.reservations_path())?;
        self.reservations = records;
        self.unparsed.reservations = unparsed;
        Ok(())
    }

    /// Rewrites the accounts snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Save`] when the snapshot cannot be written.
    pub fn save_accounts(&self) -> Result<(), CatalogError> {
        save(
            &self.storage.accounts_path(),
            self.accounts.values(),
            &self.unparsed.accounts,
        )
    }

    /// Rewrites the events snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Save`] when the snapshot cannot be written.
    pub fn save_events(&self) -> Result<(), CatalogError> {
        save(
            &self.storage.events_path(),
            self.events.values(),
            &self.unparsed.events,
        )
    }

    /// Rewrites the reservations snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Save`] when the snapshot cannot be written.
    pub fn save_reservations(&self) -> Result<(), CatalogError> {
        save(
            &self.storage.reservations_path(),
            self.reservations.iter(),
            &self.unparsed.reservations,
        )
    }

    /// Account lookup.
    #[must_use]
    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    /// Mutable account lookup.
    pub fn account_mut(&mut self, id: &AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(id)
    }

    /// Adds or replaces an account.
    pub fn insert_account(&mut self, account: Account) {
        self.accounts.insert(account.id.clone(), account);
    }

    /// Removes an account. Its events and reservations stay.
    pub fn remove_account(&mut self, id: &AccountId) -> Option<Account> {
        self.accounts.remove(id)
    }

    /// Event lookup.
    #[must_use]
    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    /// Mutable event lookup.
    pub fn event_mut(&mut self, id: EventId) -> Option<&mut Event> {
        self.events.get_mut(&id)
    }

    /// Every event, ordered by identifier.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Lowest identifier in `001..=999` not held by any event.
    ///
    /// Identifiers are never reclaimed because events are never removed. An
    /// identifier leading an unparsable events line counts as held.
    #[must_use]
    pub fn allocate_event_id(&self) -> Option<EventId> {
        (EventId::FIRST..=EventId::LAST)
            .filter_map(EventId::new)
            .find(|id| !self.events.contains_key(id) && !self.unparsed.event_ids.contains(id))
    }

    /// Adds an event.
    pub fn insert_event(&mut self, event: Event) {
        self.events.insert(event.id, event);
    }

    /// Every reservation in acceptance order.
    #[must_use]
    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Records an accepted reservation.
    pub fn append_reservation(&mut self, reservation: Reservation) {
        self.reservations.push(reservation);
    }

    /// Attachment storage.
    #[must_use]
    pub const fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    /// Snapshot locations.
    #[must_use]
    pub const fn storage(&self) -> &StoragePaths {
        &self.storage
    }

    /// Current record counts.
    #[must_use]
    pub fn counts(&self) -> CatalogCounts {
        CatalogCounts {
            accounts: self.accounts.len(),
            events: self.events.len(),
            reservations: self.reservations.len(),
        }
    }
}

fn load<T: SnapshotRecord>(path: &Utf8Path) -> Result<Loaded<T>, CatalogError> {
    let loaded = snapshot::load(path).map_err(|source| CatalogError::Load {
        collection: T::COLLECTION,
        source,
    })?;
    debug!(
        target: CATALOG_TARGET,
        collection = T::COLLECTION,
        records = loaded.records.len(),
        unparsed = loaded.unparsed.len(),
        "collection reloaded"
    );
    Ok(loaded)
}

fn save<'a, T, I>(path: &Utf8Path, records: I, unparsed: &[String]) -> Result<(), CatalogError>
where
    T: SnapshotRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    snapshot::save(path, records, unparsed).map_err(|source| CatalogError::Save {
        collection: T::COLLECTION,
        source,
    })
}
