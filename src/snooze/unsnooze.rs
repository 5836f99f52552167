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

//! Returning expired messages to the mailboxes they were snoozed from.
//!
//! Each message goes through fetch, rewrite, save, then expunge. There is no
//! way to make this atomic with `doveadm`, so the one rule which must hold is
//! that the original is never expunged unless the save into the destination
//! succeeded. Being interrupted between the two leaves a duplicate, which is
//! far better than losing the message.

use std::io;
use std::path::PathBuf;

use chrono::prelude::*;
use log::{info, warn};

use super::rewrite::{rewrite, ScratchMessage};
use super::scan::{scan_folder, ExpiredMessage};
use crate::store::MailStore;
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

#[derive(Clone, Debug)]
pub struct WakeOptions {
    /// Where to put messages whose original mailbox can't be saved to.
    pub inbox: String,
    /// Where to stage rewritten messages. `None` for the system temporary
    /// directory.
    pub staging_dir: Option<PathBuf>,
    /// If true, only report what would be woken.
    pub dry_run: bool,
}

impl Default for WakeOptions {
    fn default() -> Self {
        WakeOptions {
            inbox: "INBOX".to_owned(),
            staging_dir: None,
            dry_run: false,
        }
    }
}

/// Wakes messages within a single snooze folder of a single user.
pub struct FolderWaker<'a, S> {
    store: &'a mut S,
    options: &'a WakeOptions,
    user: &'a str,
    folder: &'a str,
    log_prefix: LogPrefix,
}

impl<'a, S: MailStore> FolderWaker<'a, S> {
    pub fn new(
        store: &'a mut S,
        options: &'a WakeOptions,
        user: &'a str,
        folder: &'a str,
    ) -> Self {
        FolderWaker {
            store,
            options,
            user,
            folder,
            log_prefix: LogPrefix::new(user).with_folder(folder),
        }
    }

    /// Scan the folder and wake every message whose wake time is before
    /// `now`.
    ///
    /// Processing stops at the first message which cannot be woken, since
    /// whatever caused that is likely to affect the rest as well. Returns the
    /// number of messages woken (or that would be woken, for a dry run).
    pub fn wake_expired<Tz: TimeZone>(
        &mut self,
        now: DateTime<Tz>,
    ) -> Result<usize, Error> {
        let expired =
            scan_folder(&mut *self.store, self.user, self.folder, now)?;
        if expired.is_empty() {
            return Ok(0);
        }

        if self.options.dry_run {
            for message in &expired {
                info!(
                    "{} would wake UID {} into {}",
                    self.log_prefix,
                    message.uid,
                    self.target(message)
                );
            }
            return Ok(expired.len());
        }

        info!(
            "{} unsnoozing {} message(s)",
            self.log_prefix,
            expired.len()
        );
        for message in &expired {
            self.wake(message)?;
        }

        Ok(expired.len())
    }

    /// Wake the single message `message`.
    pub fn wake(&mut self, message: &ExpiredMessage) -> Result<(), Error> {
        let log_prefix = self.log_prefix.with_uid(&message.uid);

        let scratch = self
            .fetch_rewritten(&message.uid)
            .map_err(|e| self.context("fetch", message, e))?;

        let saved_to = self
            .save(&log_prefix, message, &scratch)
            .map_err(|e| self.context("save", message, e))?;

        if let Err(e) = scratch.close() {
            warn!("{} failed to remove staged copy: {}", log_prefix, e);
        }

        self.store
            .expunge_message(self.user, self.folder, &message.uid)
            .map_err(|e| self.context("expunge", message, e))?;

        info!("{} woken into {}", log_prefix, saved_to);
        Ok(())
    }

    fn target<'m>(&'m self, message: &'m ExpiredMessage) -> &'m str {
        message
            .from_folder
            .as_deref()
            .unwrap_or(&self.options.inbox)
    }

    fn fetch_rewritten(&mut self, uid: &str) -> Result<ScratchMessage, Error> {
        let staging_dir = self.options.staging_dir.as_deref();
        let mut scratch = None;
        self.store.fetch_message(self.user, self.folder, uid, &mut |r| {
            scratch = Some(rewrite(r, staging_dir)?);
            Ok(())
        })?;

        scratch.ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "mail store returned no message text",
            ))
        })
    }

    /// Save `scratch` into the message's original mailbox, falling back to
    /// the inbox. Returns the mailbox it ended up in.
    fn save(
        &mut self,
        log_prefix: &LogPrefix,
        message: &ExpiredMessage,
        scratch: &ScratchMessage,
    ) -> Result<String, Error> {
        let inbox = &self.options.inbox;
        let target = match message.from_folder {
            Some(ref from) => from,
            None => {
                warn!(
                    "{} has no original mailbox, waking into {}",
                    log_prefix, inbox
                );
                inbox
            }
        };

        match self.store.save_message(self.user, target, scratch.path()) {
            Ok(()) => Ok(target.to_owned()),
            Err(e) if !target.eq_ignore_ascii_case(inbox) => {
                warn!(
                    "{} failed to save into {} ({}), trying {}",
                    log_prefix, target, e, inbox
                );
                self.store.save_message(self.user, inbox, scratch.path())?;
                Ok(inbox.to_owned())
            }
            Err(e) => Err(e),
        }
    }

    fn context(
        &self,
        step: &'static str,
        message: &ExpiredMessage,
        e: Error,
    ) -> Error {
        Error::Unsnooze {
            step,
            user: self.user.to_owned(),
            folder: self.folder.to_owned(),
            uid: message.uid.clone(),
            source: Box::new(e),
        }
    }
}
