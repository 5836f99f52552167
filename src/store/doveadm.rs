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

//! `MailStore` implementation which drives Dovecot's `doveadm` tool.

use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use super::{Consumer, MailStore};
use crate::support::error::Error;

#[derive(Debug, Clone)]
pub struct Doveadm {
    program: PathBuf,
}

impl Doveadm {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Doveadm {
            program: program.into(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        debug!("running {} {}", self.program.display(), args.join(" "));
        let mut cmd = Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null());
        cmd
    }

    /// Run `doveadm` with `args`, streaming its standard output through
    /// `consumer`.
    ///
    /// If `consumer` fails, the child is still waited for, but the consumer's
    /// error takes precedence over the exit status.
    fn stream(
        &self,
        op: &'static str,
        args: &[&str],
        consumer: Consumer<'_>,
    ) -> Result<(), Error> {
        let mut child = self.command(args).stdout(Stdio::piped()).spawn()?;

        let result = match child.stdout.take() {
            Some(stdout) => {
                let mut reader = BufReader::new(stdout);
                let result = consumer(&mut reader);
                // Drain whatever the consumer didn't want so the child
                // doesn't block on a full pipe.
                let _ = io::copy(&mut reader, &mut io::sink());
                result
            }
            None => Ok(()),
        };

        let status = child.wait()?;
        result?;
        check(op, args, status)
    }

    /// Run `doveadm` with `args`, waiting for it to finish and returning its
    /// standard output.
    fn output(&self, op: &'static str, args: &[&str]) -> Result<String, Error> {
        let mut out = String::new();
        self.stream(op, args, &mut |r: &mut dyn BufRead| {
            r.read_to_string(&mut out)?;
            Ok(())
        })?;
        Ok(out)
    }

    fn run(&self, op: &'static str, args: &[&str]) -> Result<(), Error> {
        let status = self.command(args).status()?;
        check(op, args, status)
    }
}

fn check(
    op: &'static str,
    args: &[&str],
    status: std::process::ExitStatus,
) -> Result<(), Error> {
    if status.success() {
        Ok(())
    } else {
        debug!("{} exited with {}", op, status);
        Err(Error::StoreCommand {
            op,
            args: args.iter().map(|&s| s.to_owned()).collect(),
            status,
        })
    }
}

fn lines(output: String) -> Vec<String> {
    output.lines().map(str::to_owned).collect()
}

impl MailStore for Doveadm {
    fn list_users(&mut self) -> Result<Vec<String>, Error> {
        self.output("user", &["user", "*"]).map(lines)
    }

    fn list_mailboxes(
        &mut self,
        user: Option<&str>,
        pattern: &str,
    ) -> Result<Vec<String>, Error> {
        let output = match user {
            None => self.output(
                "mailbox list",
                &["mailbox", "list", "-A", "mailbox", pattern],
            ),
            Some(user) => self.output(
                "mailbox list",
                &["mailbox", "list", "-u", user, "mailbox", pattern],
            ),
        }?;
        Ok(lines(output))
    }

    fn fetch_headers(
        &mut self,
        user: &str,
        folder: &str,
        header: &str,
        consumer: Consumer<'_>,
    ) -> Result<(), Error> {
        let fields = format!("uid hdr.{}", header);
        self.stream(
            "fetch",
            &[
                "fetch", "-u", user, &fields, "mailbox", folder, "header",
                header, "",
            ],
            consumer,
        )
    }

    fn fetch_message(
        &mut self,
        user: &str,
        folder: &str,
        uid: &str,
        consumer: Consumer<'_>,
    ) -> Result<(), Error> {
        self.stream(
            "fetch",
            &["fetch", "-u", user, "text", "mailbox", folder, "uid", uid],
            consumer,
        )
    }

    fn save_message(
        &mut self,
        user: &str,
        mailbox: &str,
        path: &Path,
    ) -> Result<(), Error> {
        let path = path.to_string_lossy();
        self.run("save", &["save", "-u", user, "-m", mailbox, &path])
    }

    fn expunge_message(
        &mut self,
        user: &str,
        folder: &str,
        uid: &str,
    ) -> Result<(), Error> {
        self.run(
            "expunge",
            &["expunge", "-u", user, "mailbox", folder, "uid", uid],
        )
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    use tempfile::TempDir;

    use super::*;

    /// Create a fake `doveadm` which logs its arguments to `args.log` and
    /// then runs `body`.
    fn fake_doveadm(dir: &TempDir, body: &str) -> Doveadm {
        let path = dir.path().join("doveadm");
        let log = dir.path().join("args.log");
        let mut f = fs::File::create(&path).unwrap();
        write!(
            f,
            "#! /bin/sh\nprintf '%s|' \"$@\" >> '{}'\necho >> '{}'\n{}\n",
            log.display(),
            log.display(),
            body
        )
        .unwrap();
        drop(f);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .unwrap();
        Doveadm::new(path)
    }

    fn logged_args(dir: &TempDir) -> Vec<String> {
        fs::read_to_string(dir.path().join("args.log"))
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn list_mailboxes_all_users() {
        let dir = TempDir::new().unwrap();
        let mut store = fake_doveadm(
            &dir,
            "echo 'alice Snoozed'; echo 'bob Snoozed'",
        );

        assert_eq!(
            vec!["alice Snoozed".to_owned(), "bob Snoozed".to_owned()],
            store.list_mailboxes(None, "Snoozed").unwrap()
        );
        assert_eq!(
            vec!["mailbox|list|-A|mailbox|Snoozed|".to_owned()],
            logged_args(&dir)
        );
    }

    #[test]
    fn fetch_headers_argument_shape() {
        let dir = TempDir::new().unwrap();
        let mut store =
            fake_doveadm(&dir, "echo 'uid: 3'; echo 'hdr.x-snoozed: x'");

        let mut seen = String::new();
        store
            .fetch_headers("alice", "Snoozed", "X-Snoozed", &mut |r| {
                r.read_to_string(&mut seen)?;
                Ok(())
            })
            .unwrap();

        assert_eq!("uid: 3\nhdr.x-snoozed: x\n", seen);
        assert_eq!(
            vec!["fetch|-u|alice|uid hdr.X-Snoozed|mailbox|Snoozed|\
                  header|X-Snoozed||"
                .to_owned()],
            logged_args(&dir)
        );
    }

    #[test]
    fn save_and_expunge_argument_shape() {
        let dir = TempDir::new().unwrap();
        let mut store = fake_doveadm(&dir, "true");

        store
            .save_message("alice", "INBOX", Path::new("/tmp/msg"))
            .unwrap();
        store.expunge_message("alice", "Snoozed", "42").unwrap();

        assert_eq!(
            vec![
                "save|-u|alice|-m|INBOX|/tmp/msg|".to_owned(),
                "expunge|-u|alice|mailbox|Snoozed|uid|42|".to_owned(),
            ],
            logged_args(&dir)
        );
    }

    #[test]
    fn nonzero_exit_is_store_command_error() {
        let dir = TempDir::new().unwrap();
        let mut store = fake_doveadm(&dir, "echo partial; exit 68");

        match store.fetch_message("alice", "Snoozed", "7", &mut |r| {
            io::copy(r, &mut io::sink())?;
            Ok(())
        }) {
            Err(Error::StoreCommand { op, args, status }) => {
                assert_eq!("fetch", op);
                assert_eq!(
                    vec![
                        "fetch", "-u", "alice", "text", "mailbox", "Snoozed",
                        "uid", "7",
                    ],
                    args
                );
                assert_eq!(Some(68), status.code());
            }
            r => panic!("Unexpected result: {:?}", r),
        }
    }

    #[test]
    fn consumer_error_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let mut store = fake_doveadm(&dir, "echo hello; exit 1");

        let result = store.fetch_message("alice", "Snoozed", "7", &mut |_| {
            Err(Error::Decode(1))
        });
        assert_matches!(Err(Error::Decode(1)), result);
    }
}
