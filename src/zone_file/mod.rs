// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Parsing of the [RFC 1035 § 5] zone file format.
//!
//! This module provides the [`Parser`] structure, which takes the text
//! of a zone file and can then be iterated over to read its records.
//! It is how zones are read before they are uploaded to the ledger.
//!
//! Errors are reported through the [`Error`] type, which carries the
//! line number. Iteration ends after an error is returned. `$INCLUDE`
//! directives are rejected, since uploads are single files.
//!
//! ```
//! use ensdns::rr::Type;
//! use ensdns::zone_file::Parser;
//!
//! const ZONE_FILE: &str = r#"
//! $ORIGIN example.eth.
//! $TTL 3600
//! @   IN SOA ns1 admin (
//!     1       ; SERIAL
//!     1h      ; REFRESH
//!     15m     ; RETRY
//!     1w      ; EXPIRE
//!     300     ; MINIMUM
//! )
//!     IN NS ns1
//! ns1 IN A 127.0.0.1
//!     IN AAAA ::1
//! "#;
//!
//! let mut parser = Parser::new(ZONE_FILE);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::SOA);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::NS);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::A);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::AAAA);
//! assert!(parser.next().is_none());
//! ```
//!
//! # A note about the implementation
//!
//! Zone files resist a clean split between lexer and parser. Escaping
//! applies in names and `<character-string>`s, but `\#` is a token of
//! its own, and an escaped space does not end a field while a plain one
//! does. So the lexer only splits logical lines into fields (handling
//! comments, parentheses and quotes) and leaves escape sequences in
//! place. The [`Parser`] decodes them once it knows what each field is.
//!
//! [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5

use crate::class::Class;
use crate::name::{Name, NameBuilder};
use crate::rr::{Rdata, Record, Ttl, Type};

pub mod error;
mod escape;
mod lexer;
mod rdata;

pub use error::{Error, ErrorKind, Result};
use lexer::{Field, Lexer, Line};

////////////////////////////////////////////////////////////////////////
// STRUCTURES                                                         //
////////////////////////////////////////////////////////////////////////

/// A parser for [RFC 1035 § 5] DNS zone files.
///
/// A [`Parser`] iterates over the records of the zone file text it was
/// given. See the [module-level documentation](self) for details and
/// example usage.
///
/// [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5
pub struct Parser<'a> {
    error: bool,
    lexer: Lexer<'a>,
    context: Context,
}

/// Tracks the parse context of a [`Parser`].
///
/// `@` stands for the origin set with `$ORIGIN`, and relative names
/// are completed with it. Omitted TTLs default to the `$TTL` value or
/// else the previous record's TTL. Omitted classes default to the
/// previous record's class, or IN for the first record. Omitted owners
/// default to the previous owner.
#[derive(Clone, Debug, Default)]
struct Context {
    origin: Option<Name>,
    previous_owner: Option<Name>,
    previous_ttl: Option<Ttl>,
    previous_class: Option<Class>,
    default_ttl: Option<Ttl>,
}

/// A record parsed from a zone file, as returned by [`Parser::next`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedRr {
    /// The line on which the record starts.
    pub line: usize,
    pub owner: Name,
    pub ttl: Ttl,
    pub class: Class,
    pub rr_type: Type,
    pub rdata: Rdata,
}

impl From<ParsedRr> for Record {
    fn from(parsed: ParsedRr) -> Self {
        Self {
            owner: parsed.owner,
            rr_type: parsed.rr_type,
            class: parsed.class,
            ttl: parsed.ttl,
            rdata: parsed.rdata,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// PARSER CONSTRUCTION AND ITERATION                                  //
////////////////////////////////////////////////////////////////////////

impl<'a> Parser<'a> {
    /// Creates a new [`Parser`] for the zone file `text`. No origin is
    /// set until a `$ORIGIN` directive appears.
    pub fn new(text: &'a str) -> Self {
        Self {
            error: false,
            lexer: Lexer::new(text),
            context: Context::default(),
        }
    }

    /// Creates a new [`Parser`] with an initial origin.
    pub fn with_origin(text: &'a str, origin: Name) -> Self {
        let mut parser = Self::new(text);
        parser.context.origin = Some(origin);
        parser
    }

    /// Parses a logical line, returning a record if it holds one.
    fn parse_line(&mut self, line: &Line) -> std::result::Result<Option<ParsedRr>, ErrorKind> {
        match line.fields.first() {
            None => Ok(None),
            Some(first) if !line.starts_with_blank && !first.quoted && first.text.starts_with('$') => {
                self.parse_directive(first.text, &line.fields[1..])?;
                Ok(None)
            }
            Some(_) => self.parse_record(line).map(Some),
        }
    }

    fn parse_directive(
        &mut self,
        directive: &str,
        args: &[Field],
    ) -> std::result::Result<(), ErrorKind> {
        if directive.eq_ignore_ascii_case("$INCLUDE") {
            return Err(ErrorKind::IncludeNotSupported);
        }
        let (arg, rest) = args.split_first().ok_or(ErrorKind::ExpectedEol)?;
        if !rest.is_empty() {
            return Err(ErrorKind::ExpectedEol);
        }
        if directive.eq_ignore_ascii_case("$ORIGIN") {
            self.context.origin = Some(parse_name(arg, self.context.origin.as_ref())?);
        } else if directive.eq_ignore_ascii_case("$TTL") {
            self.context.default_ttl = Some(Ttl::from(parse_ttl(arg.text)?));
        } else {
            return Err(ErrorKind::UnknownDirective);
        }
        Ok(())
    }

    fn parse_record(&mut self, line: &Line) -> std::result::Result<ParsedRr, ErrorKind> {
        let mut rest = line.fields.as_slice();
        let context = &mut self.context;

        let owner = if line.starts_with_blank {
            context
                .previous_owner
                .clone()
                .ok_or(ErrorKind::EmptyOwnerWithNoPrevious)?
        } else {
            let (field, tail) = rest.split_first().ok_or(ErrorKind::ExpectedName)?;
            rest = tail;
            parse_name(field, context.origin.as_ref())?
        };

        // The TTL and class may each be omitted, and may come in
        // either order.
        let mut ttl = None;
        let mut class = None;
        while let Some((field, tail)) = rest.split_first() {
            if field.quoted {
                break;
            } else if ttl.is_none() && field.text.starts_with(|c: char| c.is_ascii_digit()) {
                ttl = Some(Ttl::from(parse_ttl(field.text)?));
            } else if let (None, Ok(parsed)) = (class, field.text.parse::<Class>()) {
                class = Some(parsed);
            } else {
                break;
            }
            rest = tail;
        }

        let (field, rest) = rest.split_first().ok_or(ErrorKind::ExpectedType)?;
        let rr_type: Type = field.text.parse().map_err(ErrorKind::InvalidType)?;
        let ttl = ttl
            .or(context.default_ttl)
            .or(context.previous_ttl)
            .ok_or(ErrorKind::OmittedTtlWithNoDefaultOrPrevious)?;
        let class = class.or(context.previous_class).unwrap_or(Class::IN);
        let rdata = rdata::parse(rr_type, class, rest, context.origin.as_ref())?;

        context.previous_owner = Some(owner.clone());
        context.previous_ttl = Some(ttl);
        context.previous_class = Some(class);
        Ok(ParsedRr {
            line: line.number,
            owner,
            ttl,
            class,
            rr_type,
            rdata,
        })
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<ParsedRr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error {
            return None;
        }
        loop {
            let line = match self.lexer.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    self.error = true;
                    return Some(Err(e));
                }
            };
            match self.parse_line(&line) {
                Ok(Some(rr)) => return Some(Ok(rr)),
                Ok(None) => (),
                Err(kind) => {
                    self.error = true;
                    return Some(Err(Error::new(line.number, kind)));
                }
            }
        }
    }
}

/// Parses every record of the zone file `text`.
pub fn parse_records(text: &str) -> Result<Vec<Record>> {
    Parser::new(text)
        .map(|parsed| parsed.map(Record::from))
        .collect()
}

////////////////////////////////////////////////////////////////////////
// FIELD HELPERS                                                      //
////////////////////////////////////////////////////////////////////////

/// Parses a domain name field. `@` is the origin, and names without a
/// trailing dot are relative to it.
fn parse_name(field: &Field, origin: Option<&Name>) -> std::result::Result<Name, ErrorKind> {
    if field.quoted {
        return Err(ErrorKind::ExpectedName);
    }
    match field.text {
        "@" => origin.cloned().ok_or(ErrorKind::AtWhenOriginNotSet),
        "." => Ok(Name::root()),
        text => {
            let mut builder = NameBuilder::new();
            builder.push_text(text).map_err(ErrorKind::InvalidName)?;
            if builder.is_fully_qualified() {
                builder.finish().map_err(ErrorKind::InvalidName)
            } else {
                let origin = origin.ok_or(ErrorKind::PqdnWhenOriginNotSet)?;
                builder
                    .finish_with_suffix(origin)
                    .map_err(ErrorKind::InvalidName)
            }
        }
    }
}

/// Parses a TTL, either as plain seconds or with the BIND-style unit
/// suffixes `s`, `m`, `h`, `d` and `w` (e.g. `1h30m`). Digits after the
/// last unit count as seconds.
fn parse_ttl(text: &str) -> std::result::Result<u32, ErrorKind> {
    if text.is_empty() {
        return Err(ErrorKind::ExpectedTtl);
    }
    let mut total: u32 = 0;
    let mut value: Option<u32> = None;
    for octet in text.bytes() {
        if octet.is_ascii_digit() {
            let digit = (octet - b'0') as u32;
            value = Some(
                value
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or(ErrorKind::InvalidTtl)?,
            );
            continue;
        }
        let unit = match octet.to_ascii_lowercase() {
            b's' => 1,
            b'm' => 60,
            b'h' => 60 * 60,
            b'd' => 24 * 60 * 60,
            b'w' => 7 * 24 * 60 * 60,
            _ => return Err(ErrorKind::InvalidTtl),
        };
        let count = value.take().ok_or(ErrorKind::InvalidTtl)?;
        total = count
            .checked_mul(unit)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or(ErrorKind::InvalidTtl)?;
    }
    total
        .checked_add(value.unwrap_or(0))
        .ok_or(ErrorKind::InvalidTtl)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    fn parse_all(text: &str) -> Vec<ParsedRr> {
        Parser::new(text).collect::<Result<_>>().unwrap()
    }

    fn first_error(text: &str) -> Error {
        Parser::new(text)
            .find_map(|parsed| parsed.err())
            .unwrap()
    }

    #[test]
    fn origin_and_at_are_applied() {
        let records = parse_all(
            "$ORIGIN example.eth.\n\
             @ 300 IN A 10.0.0.1\n\
             www 300 IN CNAME @\n\
             $ORIGIN sub\n\
             host 300 IN A 10.0.0.2\n",
        );
        assert_eq!(records[0].owner, name("example.eth."));
        assert_eq!(records[1].owner, name("www.example.eth."));
        assert_eq!(records[1].rdata.octets(), name("example.eth.").wire_repr());
        assert_eq!(records[2].owner, name("host.sub.example.eth."));
        assert_eq!(records[2].line, 5);
    }

    #[test]
    fn with_origin_sets_initial_origin() {
        let records: Vec<_> = Parser::with_origin("www 60 A 10.0.0.1", name("example.eth."))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records[0].owner, name("www.example.eth."));
    }

    #[test]
    fn owner_ttl_and_class_are_inherited() {
        let records = parse_all(
            "$TTL 1h\n\
             a.eth. A 10.0.0.1\n\
             \x20      600 TXT hello\n\
             b.eth. CH 60 TXT world\n\
             c.eth. TXT again\n",
        );
        assert_eq!(records[0].ttl, Ttl::from(3600u32));
        assert_eq!(records[0].class, Class::IN);
        assert_eq!(records[1].owner, name("a.eth."));
        assert_eq!(records[1].ttl, Ttl::from(600u32));
        assert_eq!(records[2].class, Class::CH);
        assert_eq!(records[2].ttl, Ttl::from(60u32));
        assert_eq!(records[3].class, Class::CH);
        assert_eq!(records[3].ttl, Ttl::from(3600u32));
    }

    #[test]
    fn previous_ttl_is_used_without_default() {
        let records = parse_all("a.eth. 120 A 10.0.0.1\nb.eth. A 10.0.0.2\n");
        assert_eq!(records[1].ttl, Ttl::from(120u32));
    }

    #[test]
    fn records_span_parentheses() {
        let records = parse_all(
            "example.eth. 3600 IN SOA ns.example.eth. admin.example.eth. (\n\
             \x20   2023010101 ; serial\n\
             \x20   7200 3600 1209600 300 )\n\
             example.eth. 3600 IN NS ns.example.eth.\n",
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rr_type, Type::SOA);
        assert_eq!(records[1].line, 4);
    }

    #[test]
    fn records_convert_into_records() {
        let records = parse_records("a.eth. 60 IN TXT \"x y\"").unwrap();
        assert_eq!(records[0].to_string(), "a.eth. 60 IN TXT \\# 4 03782079");
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = first_error("a.eth. 60 A 10.0.0.1\n\nb.eth. 60 A bogus\n");
        assert_eq!(err.line(), 3);
        assert!(matches!(err.kind(), ErrorKind::InvalidIpv4(_)));
    }

    #[test]
    fn iteration_stops_after_an_error() {
        let mut parser = Parser::new("a.eth. 60 BOGUS x\nb.eth. 60 A 10.0.0.1\n");
        assert!(matches!(
            parser.next(),
            Some(Err(e)) if matches!(e.kind(), ErrorKind::InvalidType(_))
        ));
        assert!(parser.next().is_none());
    }

    #[test]
    fn include_is_rejected() {
        let err = first_error("$INCLUDE other.zone\n");
        assert_eq!(err.kind(), &ErrorKind::IncludeNotSupported);
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn context_errors() {
        assert_eq!(
            first_error("@ 60 A 10.0.0.1").kind(),
            &ErrorKind::AtWhenOriginNotSet
        );
        assert_eq!(
            first_error("www 60 A 10.0.0.1").kind(),
            &ErrorKind::PqdnWhenOriginNotSet
        );
        assert_eq!(
            first_error("  60 A 10.0.0.1").kind(),
            &ErrorKind::EmptyOwnerWithNoPrevious
        );
        assert_eq!(
            first_error("a.eth. A 10.0.0.1").kind(),
            &ErrorKind::OmittedTtlWithNoDefaultOrPrevious
        );
        assert_eq!(first_error("$FOO bar").kind(), &ErrorKind::UnknownDirective);
    }

    #[test]
    fn ttl_units() {
        assert_eq!(parse_ttl("300"), Ok(300));
        assert_eq!(parse_ttl("1h30m"), Ok(5400));
        assert_eq!(parse_ttl("1W2D"), Ok(777600));
        assert_eq!(parse_ttl("1m5"), Ok(65));
        assert_eq!(parse_ttl("h"), Err(ErrorKind::InvalidTtl));
        assert_eq!(parse_ttl("1x"), Err(ErrorKind::InvalidTtl));
        assert_eq!(parse_ttl("99999999999"), Err(ErrorKind::InvalidTtl));
    }

    #[test]
    fn escaped_names() {
        let records = parse_all("a\\.b.eth. 60 A 10.0.0.1");
        assert_eq!(records[0].owner.len(), 3);
    }
}
