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

use std::path::{Path, PathBuf};

use chrono::Utc;
use structopt::StructOpt;

use crate::snooze::enumerate::{wake_all, UserSelection};
use crate::snooze::unsnooze::WakeOptions;
use crate::store::doveadm::Doveadm;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

/// Wake snoozed messages whose time has come.
///
/// Every message in a snooze mailbox whose X-Snoozed header carries a wake
/// time in the past is moved back to the mailbox it was snoozed from (or to
/// INBOX if that no longer works), with "woken" added to the header so that
/// mail clients know it has been handled.
///
/// This is intended to be run periodically from cron as a user with
/// permission to run `doveadm` against every mail user.
#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Options {
    /// The name of the snooze mailbox
    /// [default: `snooze_mbox` from unsnooze.toml, or "Snoozed"]
    #[structopt(long)]
    mbox: Option<String>,

    /// Only process these users.
    #[structopt(long, min_values = 1)]
    users: Vec<String>,

    /// Process every user except these. Cannot be combined with --users.
    #[structopt(long, min_values = 1)]
    exclude: Vec<String>,

    /// The directory containing `unsnooze.toml` and `logging.toml`
    /// [default: /etc/unsnooze or /usr/local/etc/unsnooze]
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,

    /// Only report which messages would be woken.
    #[structopt(long)]
    dry_run: bool,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let options = Options::from_clap(&match Options::clap().get_matches_safe()
    {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    // An explicit --root must actually hold a configuration; the default
    // locations are just tried in order, with the built-in defaults as the
    // last resort.
    let (root, required) = match options.root {
        Some(ref root) => (Some(root.clone()), true),
        None => (
            ["/etc/unsnooze", "/usr/local/etc/unsnooze"]
                .iter()
                .map(PathBuf::from)
                .find(|root| root.join("unsnooze.toml").is_file()),
            false,
        ),
    };

    let system_config = match root {
        Some(ref root) => match SystemConfig::load(root, required) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                EX_CONFIG.exit()
            }
        },
        None => SystemConfig::default(),
    };

    init_logging(root.as_deref());

    let selection = match UserSelection::new(options.users, options.exclude) {
        Ok(selection) => selection,
        Err(e) => die!(EX_CONFIG, "{}", e),
    };

    let mbox = system_config.snooze_mbox(options.mbox.as_deref());
    let wake_options = WakeOptions {
        inbox: system_config.inbox,
        staging_dir: system_config.staging.dir,
        dry_run: options.dry_run,
    };
    let mut store = Doveadm::new(system_config.doveadm.path);

    match wake_all(&mut store, &selection, &mbox, &wake_options, Utc::now) {
        Ok(summary) if summary.failed > 0 => EX_TEMPFAIL.exit(),
        Ok(_) => (),
        Err(e) => die!(Sysexit::from(&e), "{}", e),
    }
}

fn init_logging(root: Option<&Path>) {
    if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        crate::init_simple_log();
        return;
    }

    let log_config_file = root.map(|root| root.join("logging.toml"));
    match log_config_file {
        Some(ref file) if file.is_file() => {
            log4rs::init_file(file, log4rs::file::Deserializers::default())
                .expect("Failed to initialise logging");
        }

        _ => {
            let formatter = syslog::Formatter3164 {
                facility: syslog::Facility::LOG_MAIL,
                hostname: None,
                process: env!("CARGO_PKG_NAME").to_owned(),
                pid: nix::unistd::getpid().as_raw(),
            };

            let logger =
                syslog::unix(formatter).expect("Failed to connect to syslog");
            log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
                .map(|_| log::set_max_level(log::LevelFilter::Info))
                .expect("Failed to initialise logging");
        }
    }
}
