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

//! Rewriting a snoozed message into the form it is returned to its mailbox
//! in.

use std::borrow::Cow;
use std::fs;
use std::io::{self, BufRead, BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::NamedTempFile;

use super::marker::{add_woken, SNOOZE_HEADER};
use crate::mime::stream::{self, Visitor};
use crate::support::error::Error;

/// The pseudo-header `doveadm fetch` puts before the message text.
const FETCH_TEXT_FIELD: &str = "text";

/// A rewritten message staged on disk, ready to be handed to the mail store.
///
/// The file is removed when this is dropped or `close()`d.
#[derive(Debug)]
pub struct ScratchMessage {
    file: NamedTempFile,
}

impl ScratchMessage {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the staged file, reporting any failure to do so.
    pub fn close(self) -> Result<(), Error> {
        self.file.close()?;
        Ok(())
    }
}

/// Read a message from `reader` and write it into a new `ScratchMessage` in
/// `staging_dir` (or the system temporary directory), with the snooze header
/// marked as woken.
pub fn rewrite(
    reader: impl BufRead,
    staging_dir: Option<&Path>,
) -> Result<ScratchMessage, Error> {
    stream::parse(reader, RewriteFilter::new(staging_dir)?)?
}

/// A `Visitor` which copies the message it is fed into a `ScratchMessage`,
/// adding the `woken` flag to the snooze header on the way through.
#[derive(Debug)]
pub struct RewriteFilter {
    out: Option<BufWriter<NamedTempFile>>,
    /// Whether any real header has been written. A message without one
    /// means the store had nothing to give us.
    have_header: bool,
}

impl RewriteFilter {
    pub fn new(staging_dir: Option<&Path>) -> Result<Self, Error> {
        let file = match staging_dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        // The mail store reads the file as the mail user, not as us
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o666))?;

        Ok(RewriteFilter {
            out: Some(BufWriter::new(file)),
            have_header: false,
        })
    }

    fn write(
        &mut self,
        f: impl FnOnce(&mut BufWriter<NamedTempFile>) -> io::Result<()>,
    ) -> Result<(), Result<ScratchMessage, Error>> {
        match self.out {
            Some(ref mut out) => f(out).map_err(|e| Err(e.into())),
            None => Err(Err(finished())),
        }
    }
}

fn finished() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::Other,
        "RewriteFilter used after end()",
    ))
}

impl Visitor for RewriteFilter {
    type Output = Result<ScratchMessage, Error>;

    fn header(&mut self, name: &str, value: &str) -> Result<(), Self::Output> {
        if FETCH_TEXT_FIELD == name {
            return Ok(());
        }

        let value = if SNOOZE_HEADER.eq_ignore_ascii_case(name) {
            add_woken(value)
        } else {
            Cow::Borrowed(value)
        };

        self.have_header = true;
        if value.is_empty() || value.starts_with('\n') {
            self.write(|out| writeln!(out, "{}:{}", name, value))
        } else {
            self.write(|out| writeln!(out, "{}: {}", name, value))
        }
    }

    fn start_body(&mut self) -> Result<(), Self::Output> {
        self.write(|out| writeln!(out))
    }

    fn body_line(&mut self, line: &str) -> Result<(), Self::Output> {
        self.write(|out| writeln!(out, "{}", line))
    }

    fn end(&mut self) -> Self::Output {
        let out = self.out.take().ok_or_else(finished)?;
        if !self.have_header {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "mail store returned no message text",
            )));
        }

        let file = out.into_inner().map_err(|e| e.into_error())?;
        Ok(ScratchMessage { file })
    }
}
