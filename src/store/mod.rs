//-
// Copyright (c) 2020, 2023, Jason Lingle
//
// This file is part of Unsnooze.
//
// Unsnooze is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Unsnooze is distributed in the hope that  it will be useful, but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Unsnooze. If not, see <http://www.gnu.org/licenses/>.

//! Access to the mail store.
//!
//! Unsnooze never touches mail storage directly. Everything goes through the
//! `MailStore` trait, which in production is backed by `doveadm`.

use std::io::BufRead;
use std::path::Path;

use crate::support::error::Error;

pub mod doveadm;

/// Receives a streamed mail store response.
pub type Consumer<'a> = &'a mut dyn FnMut(&mut dyn BufRead) -> Result<(), Error>;

/// The operations Unsnooze needs from the mail store.
///
/// Every operation reports failure of the underlying store (as opposed to
/// failure of `Consumer`, which is passed through) as
/// `Error::StoreCommand`.
pub trait MailStore {
    /// List all users known to the store.
    fn list_users(&mut self) -> Result<Vec<String>, Error>;

    /// List mailboxes whose name matches `pattern`.
    ///
    /// If `user` is `None`, mailboxes of all users are listed, and each line
    /// is `user mailbox`. Otherwise, only the mailboxes of `user` are listed,
    /// one name per line.
    fn list_mailboxes(
        &mut self,
        user: Option<&str>,
        pattern: &str,
    ) -> Result<Vec<String>, Error>;

    /// Find all messages in `folder` which have a `header` header, passing
    /// `uid:` and `hdr.<header>:` lines for each to `consumer`.
    fn fetch_headers(
        &mut self,
        user: &str,
        folder: &str,
        header: &str,
        consumer: Consumer<'_>,
    ) -> Result<(), Error>;

    /// Pass the full text of message `uid` in `folder` to `consumer`.
    fn fetch_message(
        &mut self,
        user: &str,
        folder: &str,
        uid: &str,
        consumer: Consumer<'_>,
    ) -> Result<(), Error>;

    /// Save the message stored in the file at `path` into `mailbox`.
    fn save_message(
        &mut self,
        user: &str,
        mailbox: &str,
        path: &Path,
    ) -> Result<(), Error>;

    /// Permanently remove message `uid` from `folder`.
    fn expunge_message(
        &mut self,
        user: &str,
        folder: &str,
        uid: &str,
    ) -> Result<(), Error>;
}
