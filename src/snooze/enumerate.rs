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

//! Finding every snooze folder to process and running the waker on each.

use chrono::prelude::*;
use log::{debug, error, info, warn};

use super::unsnooze::{FolderWaker, WakeOptions};
use crate::store::MailStore;
use crate::support::error::Error;

/// Which users to process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserSelection {
    /// Every user with a snooze folder, except those listed.
    All { exclude: Vec<String> },
    /// Only the listed users.
    Only(Vec<String>),
}

impl UserSelection {
    /// Build a selection from the `--users` and `--exclude` options, which
    /// cannot be combined.
    pub fn new(
        users: Vec<String>,
        exclude: Vec<String>,
    ) -> Result<Self, Error> {
        match (users.is_empty(), exclude.is_empty()) {
            (false, false) => Err(Error::ConflictingSelection),
            (false, true) => Ok(UserSelection::Only(users)),
            (true, _) => Ok(UserSelection::All { exclude }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnoozeFolderEntry {
    pub user: String,
    pub mailbox: String,
}

/// Parse one line of an all-users mailbox listing.
///
/// Blank lines yield `None`. Any line that isn't exactly `user mailbox` is an
/// error.
pub fn parse_listing_line(
    line: &str,
) -> Result<Option<SnoozeFolderEntry>, Error> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => Ok(None),
        (Some(user), Some(mailbox), None) => Ok(Some(SnoozeFolderEntry {
            user: user.to_owned(),
            mailbox: mailbox.to_owned(),
        })),
        _ => Err(Error::MalformedListing(line.to_owned())),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnoozeFolders {
    pub entries: Vec<SnoozeFolderEntry>,
    /// Explicitly selected users whose mailboxes could not be listed.
    pub unlisted_users: Vec<String>,
}

/// List every snooze folder named `mbox` belonging to the users selected by
/// `selection`.
///
/// When listing all users, any failure is an error. When users are named
/// explicitly, a user whose mailboxes can't be listed is logged and recorded
/// in `unlisted_users`, and the rest are still listed.
pub fn snooze_folders(
    store: &mut impl MailStore,
    selection: &UserSelection,
    mbox: &str,
) -> Result<SnoozeFolders, Error> {
    let mut entries = Vec::new();
    let mut unlisted_users = Vec::new();

    match *selection {
        UserSelection::All { ref exclude } => {
            for line in store.list_mailboxes(None, mbox)? {
                let entry = match parse_listing_line(&line)? {
                    Some(entry) => entry,
                    None => continue,
                };

                if exclude.contains(&entry.user) {
                    debug!("skipping excluded user {}", entry.user);
                } else {
                    entries.push(entry);
                }
            }
        }

        UserSelection::Only(ref users) => {
            match store.list_users() {
                Ok(known) => {
                    for user in users {
                        if !known.iter().any(|k| k.trim() == user.as_str()) {
                            warn!("{} is not a known user", user);
                        }
                    }
                }
                Err(e) => debug!("unable to list users: {}", e),
            }

            for user in users {
                let lines = match store.list_mailboxes(Some(user), mbox) {
                    Ok(lines) => lines,
                    Err(e) => {
                        error!("unable to list mailboxes of {}: {}", user, e);
                        unlisted_users.push(user.clone());
                        continue;
                    }
                };

                for line in lines {
                    let mailbox = line.trim();
                    if !mailbox.is_empty() {
                        entries.push(SnoozeFolderEntry {
                            user: user.clone(),
                            mailbox: mailbox.to_owned(),
                        });
                    }
                }
            }
        }
    }

    Ok(SnoozeFolders {
        entries,
        unlisted_users,
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// The number of snooze folders examined.
    pub folders: usize,
    /// The number of messages woken.
    pub woken: usize,
    /// The number of folders where processing was aborted by an error, plus
    /// the number of selected users whose folders could not be listed.
    pub failed: usize,
}

/// Process every selected snooze folder, one at a time.
///
/// `clock` is consulted once per folder, immediately before it is scanned.
///
/// A failure within one folder is logged and ends processing of that folder
/// only; anything left is picked up by the next run. Failure to enumerate the
/// folders at all is returned as an error.
pub fn wake_all<Tz: TimeZone>(
    store: &mut impl MailStore,
    selection: &UserSelection,
    mbox: &str,
    options: &WakeOptions,
    mut clock: impl FnMut() -> DateTime<Tz>,
) -> Result<RunSummary, Error> {
    let folders = snooze_folders(store, selection, mbox)?;
    let mut summary = RunSummary {
        failed: folders.unlisted_users.len(),
        ..RunSummary::default()
    };

    for entry in &folders.entries {
        debug!("processing {} {}", entry.user, entry.mailbox);
        summary.folders += 1;

        match FolderWaker::new(store, options, &entry.user, &entry.mailbox)
            .wake_expired(clock())
        {
            Ok(n) => summary.woken += n,
            Err(e) => {
                error!("{}", e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "woke {} message(s) in {} folder(s), {} folder(s) failed",
        summary.woken, summary.folders, summary.failed
    );
    Ok(summary)
}
