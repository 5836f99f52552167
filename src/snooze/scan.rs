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

//! Finding snoozed messages whose wake time has passed.

use std::io::BufRead;
use std::mem;

use chrono::prelude::*;
use log::debug;

use super::marker::{SnoozeMarker, SNOOZE_HEADER};
use crate::store::MailStore;
use crate::support::error::Error;

/// A message which is due to be woken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpiredMessage {
    pub uid: String,
    /// The mailbox the message was snoozed from, if the marker says.
    pub from_folder: Option<String>,
}

#[derive(Debug)]
enum State {
    AwaitingUid,
    HaveUid(String),
    InHeader { uid: String, value: String },
}

/// A push parser for the output of a `uid hdr.<header>` fetch.
///
/// The input is a sequence of `uid: N` lines, each followed by a
/// `hdr.<header>: value` line whose value may be folded over further lines.
/// Any other line ends the current message.
#[derive(Debug)]
pub struct ExpiryScanner<Tz: TimeZone> {
    now: DateTime<Tz>,
    /// `hdr.<header>:`, lower-cased.
    header_prefix: String,
    state: State,
    expired: Vec<ExpiredMessage>,
}

impl<Tz: TimeZone> ExpiryScanner<Tz> {
    /// Create a scanner which looks for `header`, considering any wake time
    /// strictly before `now` to be expired.
    pub fn new(header: &str, now: DateTime<Tz>) -> Self {
        ExpiryScanner {
            now,
            header_prefix: format!("hdr.{}:", header.to_ascii_lowercase()),
            state: State::AwaitingUid,
            expired: vec![],
        }
    }

    pub fn push_line(&mut self, line: &str) {
        match mem::replace(&mut self.state, State::AwaitingUid) {
            State::InHeader { uid, mut value } => {
                if line.starts_with(' ') || line.starts_with('\t') {
                    value.push('\n');
                    value.push_str(line);
                    self.state = State::InHeader { uid, value };
                    return;
                }

                self.finish_message(uid, &value);
            }

            State::HaveUid(uid) => {
                if let Some(value) = self.header_value(line) {
                    self.state = State::InHeader {
                        uid,
                        value: value.to_owned(),
                    };
                    return;
                }
            }

            State::AwaitingUid => (),
        }

        if let Some(uid) = line.strip_prefix("uid:") {
            let uid = uid.trim();
            if !uid.is_empty() {
                self.state = State::HaveUid(uid.to_owned());
            }
        }
    }

    /// Finish scanning, returning the expired messages in the order they
    /// were encountered.
    pub fn finish(mut self) -> Vec<ExpiredMessage> {
        if let State::InHeader { uid, value } =
            mem::replace(&mut self.state, State::AwaitingUid)
        {
            self.finish_message(uid, &value);
        }

        self.expired
    }

    fn header_value<'a>(&self, line: &'a str) -> Option<&'a str> {
        let n = self.header_prefix.len();
        match line.get(..n) {
            Some(prefix) if prefix.eq_ignore_ascii_case(&self.header_prefix) => {
                Some(line[n..].trim_start())
            }
            _ => None,
        }
    }

    fn finish_message(&mut self, uid: String, value: &str) {
        let marker = SnoozeMarker::parse(value);
        if marker.until().is_none() {
            debug!("UID {} has no usable wake time, ignoring", uid);
            return;
        }

        if marker.is_expired(&self.now) {
            if marker.is_woken() {
                // Woken before, but the expunge never happened
                debug!("UID {} is already marked woken", uid);
            }
            self.expired.push(ExpiredMessage {
                uid,
                from_folder: marker.from().map(str::to_owned),
            });
        }
    }
}

/// Scan a complete `uid hdr.<header>` fetch response from `reader`.
///
/// Lines which are not valid UTF-8 are decoded lossily; at worst, this makes
/// a marker unparsable, which just means the message isn't woken.
pub fn scan<Tz: TimeZone>(
    mut reader: impl BufRead,
    header: &str,
    now: DateTime<Tz>,
) -> Result<Vec<ExpiredMessage>, Error> {
    let mut scanner = ExpiryScanner::new(header, now);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if 0 == reader.read_until(b'\n', &mut buf)? {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        scanner.push_line(line.trim_end_matches(|c| '\r' == c || '\n' == c));
    }

    Ok(scanner.finish())
}

/// Ask the mail store for all snoozed messages in `folder`, and determine
/// which ones are due to be woken as of `now`.
pub fn scan_folder<Tz: TimeZone>(
    store: &mut impl MailStore,
    user: &str,
    folder: &str,
    now: DateTime<Tz>,
) -> Result<Vec<ExpiredMessage>, Error> {
    let mut expired = Vec::new();
    store.fetch_headers(user, folder, SNOOZE_HEADER, &mut |r| {
        expired = scan(r, SNOOZE_HEADER, now.clone())?;
        Ok(())
    })?;
    Ok(expired)
}
