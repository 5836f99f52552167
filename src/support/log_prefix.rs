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

use std::fmt;

/// Tracks text that should be included in at the start of every log statement
/// concerning a particular user, folder, or message.
#[derive(Clone, Debug)]
pub struct LogPrefix {
    user: String,
    folder: Option<String>,
    uid: Option<String>,
}

impl LogPrefix {
    pub fn new(user: &str) -> Self {
        Self {
            user: sanitise(user),
            folder: None,
            uid: None,
        }
    }

    pub fn with_folder(&self, folder: &str) -> Self {
        Self {
            user: self.user.clone(),
            folder: Some(sanitise(folder)),
            uid: None,
        }
    }

    pub fn with_uid(&self, uid: &str) -> Self {
        Self {
            uid: Some(sanitise(uid)),
            ..self.clone()
        }
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unsnooze[{}", self.user)?;
        if let Some(ref folder) = self.folder {
            write!(f, " {folder}")?;
        }
        if let Some(ref uid) = self.uid {
            write!(f, " uid={uid}")?;
        }
        write!(f, "]")
    }
}

fn sanitise(s: &str) -> String {
    let mut s = s.to_owned();
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
