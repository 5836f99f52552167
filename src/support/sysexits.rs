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

//! Constants from `sysexits.h`
//!
//! Unsnooze is normally run from cron, so these give the operator (or the
//! cron mailer) a coarse idea of what went wrong without reading the logs.

use super::error::Error;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Sysexit(pub i32);

pub const EX_USAGE: Sysexit = Sysexit(64);
pub const EX_DATAERR: Sysexit = Sysexit(65);
pub const EX_UNAVAILABLE: Sysexit = Sysexit(69);
pub const EX_IOERR: Sysexit = Sysexit(74);
pub const EX_TEMPFAIL: Sysexit = Sysexit(75);
pub const EX_CONFIG: Sysexit = Sysexit(78);

impl Sysexit {
    pub fn exit(self) -> ! {
        std::process::exit(self.0)
    }
}

impl From<&Error> for Sysexit {
    fn from(e: &Error) -> Self {
        match *e {
            Error::ConflictingSelection | Error::Config(_) => EX_CONFIG,
            Error::MalformedListing(_) | Error::Decode(_) => EX_DATAERR,
            Error::StoreCommand { .. } => EX_UNAVAILABLE,
            Error::Unsnooze { .. } => EX_TEMPFAIL,
            Error::Io(_) => EX_IOERR,
        }
    }
}

/// Log an error and exit with the given `Sysexit`.
macro_rules! die {
    ($ex:expr, $($stuff:tt)*) => {{
        log::error!($($stuff)*);
        $ex.exit()
    }}
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn configuration_errors_map_to_ex_config() {
        assert_eq!(EX_CONFIG, Sysexit::from(&Error::ConflictingSelection));
        assert_eq!(
            EX_CONFIG,
            Sysexit::from(&Error::Config("bad toml".to_owned()))
        );
        assert_eq!(
            EX_DATAERR,
            Sysexit::from(&Error::MalformedListing("a b c".to_owned()))
        );
    }
}
