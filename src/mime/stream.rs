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

//! A line-oriented push parser which splits a raw message into its header
//! fields and body lines.
//!
//! This does not know anything about MIME structure. The body is just a
//! sequence of opaque lines, which is all that is needed to pass a message
//! through with selected headers rewritten.

use std::io::BufRead;
use std::str;

use crate::support::error::Error;

/// A visitor which receives events from the push parser.
///
/// The visitor is permitted to produce an output at any step, at which point
/// parsing stops. Methods return `Result<(), Output>` instead of
/// `Option<Output>` to enable use of the `?` operator and to get warnings if
/// results are ignored.
///
/// Methods are declared in the order they are usually called.
#[allow(unused_variables)]
pub trait Visitor {
    type Output;

    /// Called for each header found, after unfolding has been resolved.
    ///
    /// `value` has the whitespace following the colon removed. If the header
    /// was folded, each continuation line is appended verbatim (including its
    /// leading whitespace) after a `\n`.
    fn header(&mut self, name: &str, value: &str) -> Result<(), Self::Output> {
        Ok(())
    }

    /// Indicates that the blank line separating the headers from the body
    /// has been reached.
    fn start_body(&mut self) -> Result<(), Self::Output> {
        Ok(())
    }

    /// Called for each body line, without its line ending.
    fn body_line(&mut self, line: &str) -> Result<(), Self::Output> {
        Ok(())
    }

    /// Indicates that the end of the message has been reached.
    ///
    /// This is always the last method to be called.
    fn end(&mut self) -> Self::Output;
}

/// Run `visitor` over the message read from `reader`.
///
/// The message is consumed in a single forward pass; at most one line plus
/// the header currently being unfolded is held in memory.
///
/// An `Err` is only returned for failures reading the stream itself (I/O
/// errors or lines which are not UTF-8). Anything the visitor produces is
/// returned in `Ok`.
pub fn parse<V: Visitor>(
    mut reader: impl BufRead,
    visitor: V,
) -> Result<V::Output, Error> {
    let mut parser = Parser::new(visitor);
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if 0 == reader.read_until(b'\n', &mut buf)? {
            break;
        }
        line_no += 1;

        let line = str::from_utf8(&buf).map_err(|_| Error::Decode(line_no))?;
        let line = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);

        if let Err(output) = parser.push(line) {
            return Ok(output);
        }
    }

    Ok(parser.end())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Headers,
    Body,
}

struct Parser<V> {
    visitor: V,
    state: State,
    /// The header currently being accumulated, held until a line which is
    /// not a continuation of it is seen.
    pending: Option<(String, String)>,
}

impl<V: Visitor> Parser<V> {
    fn new(visitor: V) -> Self {
        Parser {
            visitor,
            state: State::Headers,
            pending: None,
        }
    }

    fn push(&mut self, line: &str) -> Result<(), V::Output> {
        if State::Body == self.state {
            return self.visitor.body_line(line);
        }

        if line.is_empty() {
            self.flush_header()?;
            self.state = State::Body;
            return self.visitor.start_body();
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, ref mut value)) = self.pending {
                value.push('\n');
                value.push_str(line);
                return Ok(());
            }
        }

        match split_header(line) {
            Some((name, value)) => {
                self.flush_header()?;
                self.pending = Some((name.to_owned(), value.to_owned()));
                Ok(())
            }
            // Neither a continuation nor a header. Such lines are dropped
            // without affecting the pending header.
            None => Ok(()),
        }
    }

    fn flush_header(&mut self) -> Result<(), V::Output> {
        match self.pending.take() {
            Some((name, value)) => self.visitor.header(&name, &value),
            None => Ok(()),
        }
    }

    fn end(mut self) -> V::Output {
        // A message consisting only of headers never sees the blank line, so
        // the last header would otherwise be lost.
        if let Err(output) = self.flush_header() {
            return output;
        }

        self.visitor.end()
    }
}

/// Split `line` into a header name and value at the first colon.
///
/// The name must be non-empty. Leading whitespace is removed from the value.
pub fn split_header(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    if 0 == colon {
        return None;
    }

    Some((&line[..colon], line[colon + 1..].trim_start()))
}

/// A `Visitor` which just records everything, so that the event sequence can
/// be inspected directly.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Header(String, String),
    StartBody,
    Body(String),
}

#[cfg(test)]
impl Visitor for Recorder {
    type Output = Vec<Event>;

    fn header(&mut self, name: &str, value: &str) -> Result<(), Self::Output> {
        self.events
            .push(Event::Header(name.to_owned(), value.to_owned()));
        Ok(())
    }

    fn start_body(&mut self) -> Result<(), Self::Output> {
        self.events.push(Event::StartBody);
        Ok(())
    }

    fn body_line(&mut self, line: &str) -> Result<(), Self::Output> {
        self.events.push(Event::Body(line.to_owned()));
        Ok(())
    }

    fn end(&mut self) -> Self::Output {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod test {
    use std::io::BufReader;

    use proptest::prelude::*;

    use super::*;

    fn parse_str(message: &str) -> Vec<Event> {
        // The small buffer forces lines to be split across reads
        parse(
            BufReader::with_capacity(4, message.as_bytes()),
            Recorder::default(),
        )
        .unwrap()
    }

    fn h(name: &str, value: &str) -> Event {
        Event::Header(name.to_owned(), value.to_owned())
    }

    fn b(line: &str) -> Event {
        Event::Body(line.to_owned())
    }

    #[test]
    fn simple_message() {
        assert_eq!(
            vec![
                h("From", "foo@bar.com"),
                h("Subject", "hello"),
                Event::StartBody,
                b("line 1"),
                b(""),
                b("line 3"),
            ],
            parse_str(
                "From: foo@bar.com\n\
                 Subject: hello\n\
                 \n\
                 line 1\n\
                 \n\
                 line 3\n"
            )
        );
    }

    #[test]
    fn dos_line_endings() {
        assert_eq!(
            vec![h("Subject", "hello"), Event::StartBody, b("body"), b("")],
            parse_str("Subject: hello\r\n\r\nbody\r\n\r\n")
        );
    }

    #[test]
    fn folded_headers_joined_with_newline() {
        assert_eq!(
            vec![
                h("Subject", "hello\n  there\n\tworld"),
                h("To", "x@y.com"),
                Event::StartBody,
            ],
            parse_str(
                "Subject: hello\n  there\n\tworld\nTo: x@y.com\n\n"
            )
        );
    }

    #[test]
    fn body_lines_never_interpreted_as_headers() {
        assert_eq!(
            vec![
                h("A", "b"),
                Event::StartBody,
                b("Subject: not a header"),
                b("  not a continuation"),
            ],
            parse_str("A: b\n\nSubject: not a header\n  not a continuation")
        );
    }

    #[test]
    fn value_whitespace_after_colon_is_trimmed() {
        assert_eq!(
            vec![h("A", "b"), h("C", ""), h("D", "e:f")],
            parse_str("A:    b\nC:\nD:e:f\n")
        );
    }

    // Quirk: lines in the header block which are neither continuations nor
    // headers are silently discarded, and do not terminate the pending
    // header, so a later continuation still attaches to it.
    #[test]
    fn malformed_header_lines_are_dropped() {
        assert_eq!(
            vec![
                h("A", "b\n continued"),
                h("C", "d"),
                Event::StartBody,
                b("body"),
            ],
            parse_str("A: b\ngarbage\n continued\n: no name\nC: d\n\nbody\n")
        );
    }

    #[test]
    fn continuation_without_header_parsed_as_header() {
        assert_eq!(
            vec![h("  X", "y\n  more"), Event::StartBody],
            parse_str("  junk\n  X: y\n  more\n\n")
        );
    }

    #[test]
    fn headers_only_message_flushes_last_header() {
        assert_eq!(
            vec![h("A", "b"), h("C", "d\n e")],
            parse_str("A: b\nC: d\n e")
        );
    }

    #[test]
    fn empty_message() {
        assert_eq!(Vec::<Event>::new(), parse_str(""));
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let result = parse(
            &b"A: b\nC: \xFF\n\nbody\n"[..],
            Recorder::default(),
        );
        assert_matches!(Err(Error::Decode(2)), result);
    }

    #[derive(Debug, Default)]
    struct StopAtBody {
        headers: usize,
    }

    impl Visitor for StopAtBody {
        type Output = usize;

        fn header(&mut self, _: &str, _: &str) -> Result<(), usize> {
            self.headers += 1;
            Ok(())
        }

        fn start_body(&mut self) -> Result<(), usize> {
            Err(self.headers)
        }

        fn body_line(&mut self, _: &str) -> Result<(), usize> {
            panic!("body_line called after early exit");
        }

        fn end(&mut self) -> usize {
            panic!("end called after early exit");
        }
    }

    #[test]
    fn visitor_can_stop_early() {
        assert_eq!(
            2,
            parse(&b"A: b\nC: d\n\nbody\n\xFF\n"[..], StopAtBody::default())
                .unwrap()
        );
    }

    proptest! {
        #[test]
        fn folded_headers_reconstruct_exactly(
            headers in prop::collection::vec(
                ("[A-Za-z][A-Za-z-]{0,10}",
                 "[!-~][ -~]{0,20}",
                 prop::collection::vec("[ \t][ -~]{0,20}", 0..3)),
                1..6),
            body in prop::collection::vec("[ -~]{0,30}", 0..5),
        ) {
            let mut text = String::new();
            for (name, value, continuations) in &headers {
                text.push_str(&format!("{}: {}\n", name, value));
                for c in continuations {
                    text.push_str(c);
                    text.push('\n');
                }
            }
            text.push('\n');
            for line in &body {
                text.push_str(line);
                text.push('\n');
            }

            let mut rebuilt = String::new();
            for event in parse_str(&text) {
                match event {
                    Event::Header(name, value) => {
                        rebuilt.push_str(&format!("{}: {}\n", name, value));
                    }
                    Event::StartBody => rebuilt.push('\n'),
                    Event::Body(line) => {
                        rebuilt.push_str(&line);
                        rebuilt.push('\n');
                    }
                }
            }

            prop_assert_eq!(text, rebuilt);
        }
    }
}
