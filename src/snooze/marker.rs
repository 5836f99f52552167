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

//! Parsing and rewriting of the `X-Snoozed` header.
//!
//! The header looks like
//!
//! ```text
//! X-Snoozed: snoozed at Mon, 1 Jan 2024 00:00:00 +0000;
//!     until Tue, 2 Jan 2024 00:00:00 +0000; from INBOX
//! ```
//!
//! i.e., a `;`-separated list of segments, each of which is either a bare
//! flag (`woken`) or a token followed by a space and a value.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::prelude::*;

/// The name of the header carrying the snooze marker.
pub const SNOOZE_HEADER: &str = "X-Snoozed";

const WOKEN: &str = "woken";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkerValue {
    Text(String),
    Flag,
}

/// The parsed form of an `X-Snoozed` header value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnoozeMarker {
    tokens: BTreeMap<String, MarkerValue>,
}

impl SnoozeMarker {
    /// Parse `value`.
    ///
    /// This never fails; segments that make no sense simply produce tokens
    /// nobody looks at. If a token occurs more than once, the last one wins.
    pub fn parse(value: &str) -> Self {
        let mut tokens = BTreeMap::new();

        for segment in value.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            match segment.split_once(' ') {
                Some((token, rest)) => {
                    tokens.insert(
                        token.to_owned(),
                        MarkerValue::Text(rest.trim().to_owned()),
                    );
                }
                None => {
                    tokens.insert(segment.to_owned(), MarkerValue::Flag);
                }
            }
        }

        SnoozeMarker { tokens }
    }

    pub fn get(&self, token: &str) -> Option<&MarkerValue> {
        self.tokens.get(token)
    }

    fn text(&self, token: &str) -> Option<&str> {
        match self.get(token) {
            Some(MarkerValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// The time at which the message is to be woken.
    ///
    /// Returns `None` if there is no `until` token or it is not a valid RFC
    /// 2822 date.
    pub fn until(&self) -> Option<DateTime<FixedOffset>> {
        self.text("until")
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
    }

    /// The mailbox the message was snoozed from.
    pub fn from(&self) -> Option<&str> {
        self.text("from")
    }

    pub fn is_woken(&self) -> bool {
        self.tokens.contains_key(WOKEN)
    }

    /// Whether the wake time of this marker is strictly before `now`.
    ///
    /// A marker without a usable `until` is never expired.
    pub fn is_expired<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.until().map_or(false, |until| until < *now)
    }
}

/// Add the `woken` flag to the raw header value `value`.
///
/// The value is amended textually rather than re-encoded from a parsed
/// `SnoozeMarker`, so everything else in the header comes through exactly as
/// it was. If `woken` already occurs anywhere in the value, it is returned
/// unchanged, which makes this idempotent.
pub fn add_woken(value: &str) -> Cow<'_, str> {
    if value.contains(WOKEN) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("{};\n    {}", value, WOKEN))
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::support::chronox::*;

    const EXAMPLE: &str = "snoozed at Mon, 1 Jan 2024 00:00:00 +0000; \
                           until Tue, 2 Jan 2024 00:00:00 +0000; from INBOX";

    fn text(s: &str) -> MarkerValue {
        MarkerValue::Text(s.to_owned())
    }

    #[test]
    fn parse_example() {
        let marker = SnoozeMarker::parse(EXAMPLE);
        assert_eq!(
            Some(&text("at Mon, 1 Jan 2024 00:00:00 +0000")),
            marker.get("snoozed")
        );
        assert_eq!(
            Some(Utc.ymd_hmsx(2024, 1, 2, 0, 0, 0)),
            marker.until().map(|until| until.with_timezone(&Utc))
        );
        assert_eq!(Some("INBOX"), marker.from());
        assert!(!marker.is_woken());
    }

    #[test]
    fn parse_flags_and_folding() {
        let marker = SnoozeMarker::parse(
            "snoozed at Mon, 1 Jan 2024 00:00:00 +0000;\n    \
             until Tue, 2 Jan 2024 00:00:00 +0000;\n    \
             from Work/Projects;\n    woken;;  extra   thing  ",
        );
        assert_eq!(Some("Work/Projects"), marker.from());
        assert!(marker.is_woken());
        assert_eq!(Some(&MarkerValue::Flag), marker.get("woken"));
        assert_eq!(Some(&text("thing")), marker.get("extra"));
        assert!(marker.until().is_some());
    }

    #[test]
    fn last_duplicate_wins() {
        let marker = SnoozeMarker::parse("from A; from B; woken; woken x");
        assert_eq!(Some("B"), marker.from());
        assert_eq!(Some(&text("x")), marker.get("woken"));
    }

    #[test]
    fn bad_or_missing_until() {
        assert_eq!(None, SnoozeMarker::parse("from INBOX").until());
        assert_eq!(
            None,
            SnoozeMarker::parse("until next tuesday; from INBOX").until()
        );
        assert_eq!(None, SnoozeMarker::parse("until; from INBOX").until());
    }

    #[test]
    fn expiry_against_reference_clock() {
        let marker = SnoozeMarker::parse(EXAMPLE);
        assert!(marker.is_expired(&Utc.ymd_hmsx(2024, 1, 3, 0, 0, 0)));
        assert!(!marker.is_expired(&Utc.ymd_hmsx(2024, 1, 1, 12, 0, 0)));
        // Strictly earlier
        assert!(!marker.is_expired(&Utc.ymd_hmsx(2024, 1, 2, 0, 0, 0)));
        assert!(marker.is_expired(&Utc.ymd_hmsx(2024, 1, 2, 0, 0, 1)));

        let no_until = SnoozeMarker::parse("snoozed at whenever; from INBOX");
        assert!(!no_until.is_expired(&Utc.ymd_hmsx(9999, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn expiry_respects_zone_offset() {
        let marker = SnoozeMarker::parse("until Tue, 2 Jan 2024 08:00:00 +0200");
        assert!(marker.is_expired(&Utc.ymd_hmsx(2024, 1, 2, 6, 0, 1)));
        assert!(!marker.is_expired(&Utc.ymd_hmsx(2024, 1, 2, 5, 59, 59)));
    }

    #[test]
    fn add_woken_appends_flag() {
        assert_eq!(
            format!("{};\n    woken", EXAMPLE),
            add_woken(EXAMPLE).into_owned()
        );
        assert!(SnoozeMarker::parse(&add_woken(EXAMPLE)).is_woken());
    }

    #[test]
    fn add_woken_preserves_existing_flag() {
        let already = "until Tue, 2 Jan 2024 00:00:00 +0000; woken; from X";
        assert_matches!(Cow::Borrowed(_), add_woken(already));
        assert_eq!(already, add_woken(already));
    }

    proptest! {
        #[test]
        fn add_woken_is_idempotent(value in "[ -~\n]{0,80}") {
            let once = add_woken(&value).into_owned();
            let twice = add_woken(&once).into_owned();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn add_woken_preserves_other_tokens(
            from in "[A-Za-z0-9/.]{1,20}",
            extra in "[a-z]{1,8} [a-z0-9]{1,8}",
        ) {
            prop_assume!(!from.contains("woken") && !extra.contains("woken"));
            let (token, rest) = extra.split_once(' ').unwrap();
            prop_assume!("from" != token && "until" != token);
            let value = format!(
                "until Tue, 2 Jan 2024 00:00:00 +0000; from {}; {}",
                from, extra);
            let before = SnoozeMarker::parse(&value);
            let after = SnoozeMarker::parse(&add_woken(&value));

            prop_assert!(after.is_woken());
            prop_assert_eq!(before.from(), after.from());
            prop_assert_eq!(before.until(), after.until());
            prop_assert_eq!(
                Some(&MarkerValue::Text(rest.to_owned())),
                after.get(token));
        }
    }
}
