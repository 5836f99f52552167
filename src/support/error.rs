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

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Line {0} of message is not valid UTF-8")]
    Decode(usize),
    #[error("{op} failed ({status}): {}", .args.join(" "))]
    StoreCommand {
        op: &'static str,
        args: Vec<String>,
        status: ExitStatus,
    },
    #[error("{step} of UID {uid} in {user}/{folder}: {source}")]
    Unsnooze {
        step: &'static str,
        user: String,
        folder: String,
        uid: String,
        #[source]
        source: Box<Error>,
    },
    #[error("--users and --exclude cannot be used together")]
    ConflictingSelection,
    #[error("Malformed mailbox listing line: {0:?}")]
    MalformedListing(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
