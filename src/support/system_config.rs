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

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::Error;

/// The snooze mailbox name used when neither the command line nor the
/// configuration names one.
pub const DEFAULT_SNOOZE_MBOX: &str = "Snoozed";

/// The system-wide configuration for Unsnooze.
///
/// This is stored in a file named `unsnooze.toml` under the configuration
/// root, which is typically `/usr/local/etc/unsnooze` or `/etc/unsnooze`.
/// Every field has a default, so running without any configuration file at
/// all is fine for a stock Dovecot install.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SystemConfig {
    /// The name of the mailbox snoozed messages are held in.
    ///
    /// This must match the mailbox the webmail plugin moves messages into
    /// when snoozing them. Overridden by `--mbox`.
    #[serde(default)]
    pub snooze_mbox: Option<String>,

    /// The mailbox to save a woken message into if saving to its original
    /// mailbox fails (e.g. because the user has since deleted it).
    #[serde(default = "default_inbox")]
    pub inbox: String,

    #[serde(default)]
    pub doveadm: DoveadmConfig,

    #[serde(default)]
    pub staging: StagingConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            snooze_mbox: None,
            inbox: default_inbox(),
            doveadm: DoveadmConfig::default(),
            staging: StagingConfig::default(),
        }
    }
}

fn default_inbox() -> String {
    "INBOX".to_owned()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DoveadmConfig {
    /// The `doveadm` binary to run. Looked up in `PATH` if not absolute.
    pub path: PathBuf,
}

impl Default for DoveadmConfig {
    fn default() -> Self {
        DoveadmConfig {
            path: "doveadm".to_owned().into(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Where rewritten messages are written before being handed to
    /// `doveadm save`.
    ///
    /// `doveadm` typically drops privileges to the mail user before reading
    /// the file, so whatever directory is used here must be traversable by
    /// every mail user. If unset, the system temporary directory is used.
    pub dir: Option<PathBuf>,
}

impl SystemConfig {
    /// Load `unsnooze.toml` from `root`.
    ///
    /// If `required` is false, a missing file yields the default
    /// configuration. A file which exists but cannot be read or parsed is
    /// always an error.
    pub fn load(root: &Path, required: bool) -> Result<Self, Error> {
        let path = root.join("unsnooze.toml");
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if !required && io::ErrorKind::NotFound == e.kind() => {
                return Ok(SystemConfig::default());
            }
            Err(e) => {
                return Err(Error::Config(format!(
                    "Error reading '{}': {}",
                    path.display(),
                    e
                )))
            }
        };

        toml::from_slice(&data).map_err(|e| {
            Error::Config(format!(
                "Error in config file at '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Determine the snooze mailbox name, preferring `cli` if given.
    pub fn snooze_mbox(&self, cli: Option<&str>) -> String {
        cli.or_else(|| self.snooze_mbox.as_deref())
            .unwrap_or(DEFAULT_SNOOZE_MBOX)
            .to_owned()
    }
}
