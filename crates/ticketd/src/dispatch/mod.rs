//! Request dispatch for both command channels.
//!
//! The [`Dispatcher`] owns the catalog. Datagram handlers turn one decoded
//! datagram into one reply line; stream handlers may additionally consume an
//! uploaded attachment or produce one for download. Every failure is a
//! [`DispatchError`], reported with the status its command prescribes.

mod datagram;
mod errors;
mod router;
mod stream;

use ticket_wire::{Credentials, Reply, ReplyCode};
use tracing::{debug, error};

use crate::catalog::{Account, AccountId, Catalog};

pub use errors::{DispatchError, StreamError};
pub use router::Dispatcher;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Looks up an account by its raw identifier token.
fn find_account<'c>(catalog: &'c mut Catalog, uid: &str) -> Result<&'c mut Account, DispatchError> {
    let Some(id) = AccountId::parse(uid) else {
        return Err(DispatchError::UnknownAccount);
    };
    catalog
        .account_mut(&id)
        .ok_or(DispatchError::UnknownAccount)
}

fn check_secret(account: &Account, secret: &str) -> Result<(), DispatchError> {
    if account.secret == secret {
        Ok(())
    } else {
        Err(DispatchError::WrongSecret)
    }
}

const fn check_session(account: &Account) -> Result<(), DispatchError> {
    if account.logged_in {
        Ok(())
    } else {
        Err(DispatchError::NotLoggedIn)
    }
}

/// Account lookup, secret check and session check, in that order.
fn authenticate<'c>(
    catalog: &'c mut Catalog,
    credentials: &Credentials,
) -> Result<&'c mut Account, DispatchError> {
    let account = find_account(catalog, &credentials.uid)?;
    check_secret(account, &credentials.secret)?;
    check_session(account)?;
    Ok(account)
}

/// Reports a handler failure with the status `code` prescribes for it.
fn failure_reply(code: ReplyCode, failure: &DispatchError) -> Reply {
    let status = failure.status_for(code);
    if failure.is_internal() {
        error!(
            target: DISPATCH_TARGET,
            reply = %code,
            status = %status,
            error = %failure,
            "request failed"
        );
    } else {
        debug!(
            target: DISPATCH_TARGET,
            reply = %code,
            status = %status,
            reason = %failure,
            "request refused"
        );
    }
    Reply::new(code, status)
}
