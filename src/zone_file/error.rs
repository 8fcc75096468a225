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

//! Error types for zone file parsing.
//!
//! All syntax errors are recorded with an [`ErrorKind`] value, so that
//! calling code can match on them and messages stay consistent.

use std::fmt;
use std::net::AddrParseError;
use std::num::ParseIntError;

use crate::name;
use crate::rr::rdata::ReadRdataError;

/// A zone file syntax error, with the line on which it occurred.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    line: usize,
    kind: ErrorKind,
}

impl Error {
    pub(super) fn new(line: usize, kind: ErrorKind) -> Self {
        Self { line, kind }
    }

    /// Returns the line in the file at which the error occurred. Lines
    /// are numbered from 1.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the kind of syntax error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at line {}", self.kind, self.line)
    }
}

impl std::error::Error for Error {}

/// A result type for zone file parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// Kinds of zone file syntax errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    AtWhenOriginNotSet,
    CharacterStringTooLong,
    EmptyOwnerWithNoPrevious,
    EofBeforeCloseParen,
    EofInEscape,
    EofInQuotedString,
    EscapeNeedsThreeDigits,
    EscapeValueOutOfRange,
    ExpectedBackslashHash,
    ExpectedCharacterString,
    ExpectedEol,
    ExpectedHexRdata,
    ExpectedIpv4,
    ExpectedIpv6,
    ExpectedName,
    ExpectedRdataLen,
    ExpectedTtl,
    ExpectedType,
    ExpectedU16,
    ExpectedU32,
    IncludeNotSupported,
    InvalidHexDigit,
    InvalidInt(ParseIntError),
    InvalidIpv4(AddrParseError),
    InvalidIpv6(AddrParseError),
    InvalidName(name::Error),
    InvalidRdata(ReadRdataError),
    InvalidRdataLen,
    InvalidTtl,
    InvalidType(&'static str),
    NestedParens,
    OmittedTtlWithNoDefaultOrPrevious,
    PqdnWhenOriginNotSet,
    UnknownDirective,
    UnmatchedCloseParen,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::AtWhenOriginNotSet => f.write_str("cannot use @ when no origin is set"),
            Self::CharacterStringTooLong => f.write_str("<character-string> is too long"),
            Self::EmptyOwnerWithNoPrevious => {
                f.write_str("the owner cannot be empty when no previous owner is available")
            }
            Self::EofBeforeCloseParen => {
                f.write_str("reached end of file before close parenthesis")
            }
            Self::EofInEscape => f.write_str("reached end of file in escape sequence"),
            Self::EofInQuotedString => f.write_str("reached end of file in quoted string"),
            Self::EscapeNeedsThreeDigits => {
                f.write_str("invalid escape sequence: expected three decimal digits")
            }
            Self::EscapeValueOutOfRange => {
                f.write_str("invalid escape sequence: escaped octet value is out of range")
            }
            Self::ExpectedBackslashHash => {
                f.write_str("expected \\# (this type only supports the generic RDATA form)")
            }
            Self::ExpectedCharacterString => f.write_str("expected a <character-string>"),
            Self::ExpectedEol => f.write_str("expected the end of the line"),
            Self::ExpectedHexRdata => f.write_str("expected hexadecimal RDATA"),
            Self::ExpectedIpv4 => f.write_str("expected an IPv4 address"),
            Self::ExpectedIpv6 => f.write_str("expected an IPv6 address"),
            Self::ExpectedName => f.write_str("expected a domain name"),
            Self::ExpectedRdataLen => f.write_str("expected RDATA length"),
            Self::ExpectedTtl => f.write_str("expected a TTL"),
            Self::ExpectedType => f.write_str("expected an RR type"),
            Self::ExpectedU16 => f.write_str("expected an unsigned 16-bit integer"),
            Self::ExpectedU32 => f.write_str("expected an unsigned 32-bit integer"),
            Self::IncludeNotSupported => f.write_str("$INCLUDE is not supported"),
            Self::InvalidHexDigit => f.write_str("invalid hexadecimal digit"),
            Self::InvalidInt(ref int_err) => int_err.fmt(f),
            Self::InvalidIpv4(ref addr_err) => addr_err.fmt(f),
            Self::InvalidIpv6(ref addr_err) => addr_err.fmt(f),
            Self::InvalidName(name_err) => write!(f, "invalid name: {}", name_err),
            Self::InvalidRdata(rdata_err) => write!(f, "invalid RDATA: {}", rdata_err),
            Self::InvalidRdataLen => f.write_str("RDATA length does not match the data"),
            Self::InvalidTtl => f.write_str("invalid TTL"),
            Self::InvalidType(type_err) => type_err.fmt(f),
            Self::NestedParens => f.write_str("nested parentheses"),
            Self::OmittedTtlWithNoDefaultOrPrevious => {
                f.write_str("TTL omitted with no default TTL or previous TTL available")
            }
            Self::PqdnWhenOriginNotSet => {
                f.write_str("cannot use a partially qualified domain name when no origin is set")
            }
            Self::UnknownDirective => f.write_str("unknown directive"),
            Self::UnmatchedCloseParen => f.write_str("unmatched close parenthesis"),
        }
    }
}
