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

//! The snooze wake-up process.
//!
//! Snoozing is done by the webmail client, which moves a message into the
//! snooze mailbox and tags it with an `X-Snoozed` header saying when to wake
//! it and where it came from. Everything here is about undoing that once the
//! time has come.

pub mod enumerate;
pub mod marker;
pub mod rewrite;
pub mod scan;
pub mod unsnooze;
