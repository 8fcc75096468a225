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

//! Implementation of data structures related to domain names.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::str::FromStr;

mod builder;
mod error;
mod label;
mod wire;
pub use builder::NameBuilder;
pub use error::Error;
pub use label::Label;

/// The maximum number of labels in a domain name.
const MAX_N_LABELS: usize = 128;

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
pub const MAX_LABEL_LEN: usize = 63;

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// An absolute domain name.
///
/// A `Name` holds the uncompressed on-the-wire representation of the
/// name, as defined in [RFC 1035 § 3.1], together with the offset of
/// each label within it. The last label is always the null label, so
/// the DNS root is a `Name` with exactly one label.
///
/// `Name`s can be constructed
///
/// * through the [`FromStr`] implementation;
/// * through a [`NameBuilder`];
/// * from uncompressed on-the-wire names through
///   [`Name::try_from_uncompressed`]; and
/// * from compressed on-the-wire names through
///   [`Name::try_from_compressed`].
///
/// Comparison and hashing are ASCII-case-insensitive, as required by
/// [RFC 4343].
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
/// [RFC 4343]: https://datatracker.ietf.org/doc/html/rfc4343
#[derive(Clone)]
pub struct Name {
    wire_repr: Box<[u8]>,
    label_offsets: Box<[u8]>,
}

/// Private helpers.
impl Name {
    /// Constructs a `Name` from parts that the caller has already
    /// validated.
    fn from_parts(wire_repr: &[u8], label_offsets: &[u8]) -> Self {
        debug_assert_eq!(wire_repr.last(), Some(&0));
        Self {
            wire_repr: wire_repr.into(),
            label_offsets: label_offsets.into(),
        }
    }

    /// Returns the offset of label `n` in the `Name`'s on-the-wire
    /// representation.
    fn label_offset(&self, n: usize) -> usize {
        self.label_offsets[n] as usize
    }
}

////////////////////////////////////////////////////////////////////////
// NAME PUBLIC API                                                    //
////////////////////////////////////////////////////////////////////////

#[allow(clippy::len_without_is_empty)] // A domain name is never empty!
impl Name {
    /// Returns the `Name` of the DNS root, `.`.
    pub fn root() -> Self {
        Self::from_parts(&[0], &[0])
    }

    /// Returns whether this `Name` is equal to or a subdomain of
    /// `other`.
    pub fn eq_or_subdomain_of(&self, other: &Name) -> bool {
        self.len() >= other.len()
            && self
                .labels()
                .rev()
                .zip(other.labels().rev())
                .all(|(a, b)| a == b)
    }

    /// Returns whether this `Name` is a subdomain of `other` and has at
    /// least one more label than it.
    pub fn strict_subdomain_of(&self, other: &Name) -> bool {
        self.len() > other.len() && self.eq_or_subdomain_of(other)
    }

    /// Returns whether the `Name` is the DNS root `.`.
    pub fn is_root(&self) -> bool {
        self.len() == 1
    }

    /// Returns whether the `Name` is a wildcard domain name (i.e.,
    /// whether its first label is `*`).
    pub fn is_wildcard(&self) -> bool {
        self.label(0).is_asterisk()
    }

    /// Returns label `n` of this `Name`. This panics if `n` is out of
    /// range.
    pub fn label(&self, n: usize) -> Label {
        let offset = self.label_offset(n);
        let len = self.wire_repr[offset] as usize;
        Label::from_unchecked(&self.wire_repr[offset + 1..offset + 1 + len])
    }

    /// Returns an iterator over labels in this `Name`, including the
    /// terminal null label.
    pub fn labels(&self) -> Labels {
        Labels {
            name: self,
            front: 0,
            back: self.len(),
        }
    }

    /// Returns the number of labels in this `Name`, including the
    /// terminal null label.
    pub fn len(&self) -> usize {
        self.label_offsets.len()
    }

    /// Makes all ASCII letters in this `Name` lowercase.
    pub fn make_ascii_lowercase(&mut self) {
        for i in 0..self.len() {
            let offset = self.label_offset(i);
            let len = self.wire_repr[offset] as usize;
            self.wire_repr[offset + 1..offset + 1 + len].make_ascii_lowercase();
        }
    }

    /// Returns the superdomain obtained by skipping the first `skip`
    /// labels of the `Name`, or `None` if there aren't enough labels.
    pub fn superdomain(&self, skip: usize) -> Option<Name> {
        if skip < self.len() {
            let base = self.label_offsets[skip];
            let label_offsets: Vec<u8> = self.label_offsets[skip..]
                .iter()
                .map(|offset| offset - base)
                .collect();
            Some(Self::from_parts(
                self.wire_repr_from(skip),
                &label_offsets,
            ))
        } else {
            None
        }
    }

    /// Tries to parse a compressed name present at index `start` of the
    /// provided buffer. Pointers are followed; indices given in
    /// pointers are treated as indices of `octets`, so generally one
    /// passes an entire DNS message (or an entire record blob) in
    /// `octets`. Two things are returned on success:
    ///
    /// * the new `Name`; and
    /// * the number of contiguous octets read at `start`. That is, the
    ///   number of octets to skip to reach the next field.
    pub fn try_from_compressed(octets: &[u8], start: usize) -> Result<(Self, usize), Error> {
        wire::parse_compressed_name(octets, start)
    }

    /// Tries to parse an uncompressed name present at the start of the
    /// provided buffer. Extra data after the name is ignored. On
    /// success, the `Name` is returned along with its length in octets.
    pub fn try_from_uncompressed(octets: &[u8]) -> Result<(Self, usize), Error> {
        wire::parse_uncompressed_name(octets)
    }

    /// Validates an uncompressed name present at the start of the
    /// provided buffer without constructing a `Name`. On success, the
    /// length of the name in octets is returned.
    pub fn validate_uncompressed(octets: &[u8]) -> Result<usize, Error> {
        wire::validate_uncompressed_name(octets)
    }

    /// Returns the (uncompressed) on-the-wire representation of the
    /// `Name`.
    pub fn wire_repr(&self) -> &[u8] {
        &self.wire_repr
    }

    /// Returns the (uncompressed) on-the-wire representation of the
    /// `Name` starting with the `n`-th label. If `n == self.len()`,
    /// this returns an empty slice; if `n > self.len()`, this panics.
    pub fn wire_repr_from(&self, n: usize) -> &[u8] {
        if n == self.len() {
            &[]
        } else {
            &self.wire_repr[self.label_offset(n)..]
        }
    }

    /// Returns the (uncompressed) on-the-wire representation of the
    /// first `n` labels of the `Name`. This will panic if
    /// `n > self.len()`.
    pub fn wire_repr_to(&self, n: usize) -> &[u8] {
        if n == self.len() {
            &self.wire_repr
        } else {
            &self.wire_repr[..self.label_offset(n)]
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.labels().take(self.len() - 1) {
            write!(f, "{}.", label)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.wire_repr.eq_ignore_ascii_case(&other.wire_repr)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for octet in self.wire_repr.iter() {
            state.write_u8(octet.to_ascii_lowercase());
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ITERATION OVER A NAME'S LABELS                                     //
////////////////////////////////////////////////////////////////////////

/// An iterator over the [`Label`]s in a [`Name`], constructed with
/// [`Name::labels`].
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    name: &'a Name,
    front: usize,
    back: usize,
}

impl<'a> Iterator for Labels<'a> {
    type Item = Label<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            self.front += 1;
            Some(self.name.label(self.front - 1))
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl DoubleEndedIterator for Labels<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.back > self.front {
            self.back -= 1;
            Some(self.name.label(self.back))
        } else {
            None
        }
    }
}

impl ExactSizeIterator for Labels<'_> {}

impl FusedIterator for Labels<'_> {}

////////////////////////////////////////////////////////////////////////
// PARSING OF NAMES FROM RUST STRINGS                                 //
////////////////////////////////////////////////////////////////////////

/// Allows for conversion of a Rust [`str`] into a [`Name`]. The passed
/// string must be strictly ASCII and fully qualified. Escape sequences
/// as defined by [RFC 4343 § 2.1] are supported.
///
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::StrEmpty);
        } else if s == "." {
            return Ok(Name::root());
        }
        let mut builder = NameBuilder::new();
        builder.push_text(s)?;
        builder.finish()
    }
}

/// Parses an escape sequence. We expect `remaining_octets` to start
/// with the octet immediately *after* the backslash that introduces the
/// escape sequence. The value and the number of octets consumed are
/// returned.
fn parse_escape(remaining_octets: &[u8]) -> Result<(u8, usize), Error> {
    match remaining_octets {
        [] => Err(Error::InvalidEscape),
        [h, t, o, ..] if h.is_ascii_digit() && t.is_ascii_digit() && o.is_ascii_digit() => {
            let value =
                100 * (h - b'0') as usize + 10 * (t - b'0') as usize + (o - b'0') as usize;
            u8::try_from(value)
                .map(|value| (value, 3))
                .or(Err(Error::InvalidEscape))
        }
        [d, ..] if d.is_ascii_digit() => Err(Error::InvalidEscape),
        [octet, ..] => Ok((*octet, 1)),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_expected_characteristics() {
        let root = Name::root();
        assert!(root.is_root());
        assert_eq!(root.len(), 1);
        assert_eq!(root.wire_repr(), &[0]);
        assert_eq!(root.to_string(), ".");
    }

    #[test]
    fn is_wildcard_works() {
        let wildcard: Name = "*.gateway.test.".parse().unwrap();
        let not_a_wildcard: Name = "gateway.test.".parse().unwrap();
        let inner_asterisk: Name = "x.*.gateway.test.".parse().unwrap();
        assert!(wildcard.is_wildcard());
        assert!(!not_a_wildcard.is_wildcard());
        assert!(!inner_asterisk.is_wildcard());
    }

    #[test]
    fn superdomain_works() {
        let subdomain: Name = "subdomain.example.test.".parse().unwrap();
        let domain: Name = "example.test.".parse().unwrap();
        let tld: Name = "test.".parse().unwrap();
        assert_eq!(subdomain.superdomain(0).as_ref(), Some(&subdomain));
        assert_eq!(subdomain.superdomain(1), Some(domain));
        assert_eq!(subdomain.superdomain(2), Some(tld));
        assert_eq!(subdomain.superdomain(3), Some(Name::root()));
        assert_eq!(subdomain.superdomain(4), None);
    }

    #[test]
    fn labels_iterator_works() {
        let name: Name = "a.b.example.test.".parse().unwrap();
        let labels: Vec<&[u8]> = name.labels().map(|l| l.octets()).collect();
        assert_eq!(labels, [&b"a"[..], b"b", b"example", b"test", b""]);
        let reversed: Vec<&[u8]> = name.labels().rev().map(|l| l.octets()).collect();
        assert_eq!(reversed, [&b""[..], b"test", b"example", b"b", b"a"]);
    }

    #[test]
    fn eq_or_subdomain_of_works() {
        let subdomain: Name = "subdomain.example.test.".parse().unwrap();
        let domain: Name = "example.test.".parse().unwrap();
        let root = Name::root();
        assert!(subdomain.eq_or_subdomain_of(&subdomain));
        assert!(subdomain.eq_or_subdomain_of(&domain));
        assert!(subdomain.eq_or_subdomain_of(&root));
        assert!(!domain.eq_or_subdomain_of(&subdomain));
        assert!(!root.eq_or_subdomain_of(&domain));

        let other: Name = "other.test.".parse().unwrap();
        assert!(!domain.eq_or_subdomain_of(&other));
    }

    #[test]
    fn strict_subdomain_of_works() {
        let host: Name = "ns1.ens.domains.".parse().unwrap();
        let suffix: Name = "ENS.domains.".parse().unwrap();
        assert!(host.strict_subdomain_of(&suffix));
        assert!(!suffix.strict_subdomain_of(&suffix));
    }

    #[test]
    fn comparison_is_case_insensitive() {
        use std::collections::HashSet;
        let lower: Name = "example.test.".parse().unwrap();
        let upper: Name = "EXAMPLE.Test.".parse().unwrap();
        assert_eq!(lower, upper);
        let set: HashSet<Name> = [lower, upper].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn wire_repr_from_and_to_work() {
        let name: Name = "a.bb.ccc.".parse().unwrap();
        assert_eq!(name.wire_repr_from(1), b"\x02bb\x03ccc\x00");
        assert_eq!(name.wire_repr_from(4), b"");
        assert_eq!(name.wire_repr_to(0), b"");
        assert_eq!(name.wire_repr_to(2), b"\x01a\x02bb");
    }

    #[test]
    fn fromstr_works() {
        let name: Name = "example.test.".parse().unwrap();
        assert_eq!(name.wire_repr(), b"\x07example\x04test\x00");
        assert_eq!(name.to_string(), "example.test.");
    }

    #[test]
    fn fromstr_rejects_bad_input() {
        assert_eq!("".parse::<Name>(), Err(Error::StrEmpty));
        assert_eq!("✈.aero.".parse::<Name>(), Err(Error::StrNotAscii));
        assert_eq!("non.fqdn".parse::<Name>(), Err(Error::NonNullTerminal));
        assert_eq!("a.b..c.".parse::<Name>(), Err(Error::NullNonTerminal));
        assert_eq!(
            "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx.".parse::<Name>(),
            Err(Error::LabelTooLong)
        );
    }

    #[test]
    fn fromstr_rejects_long_name() {
        let long = "x.".repeat(128);
        assert_eq!(long.parse::<Name>(), Err(Error::NameTooLong));
    }

    #[test]
    fn escaping_round_trips() {
        let escaped: Name = "\\000.\\\\\\..".parse().unwrap();
        assert_eq!(escaped.wire_repr(), b"\x01\x00\x02\\.\x00");
        assert_eq!(escaped.to_string(), "\\000.\\\\\\..");
        assert_eq!("\\00".parse::<Name>(), Err(Error::InvalidEscape));
        assert_eq!("\\256.".parse::<Name>(), Err(Error::InvalidEscape));
    }

    #[test]
    fn make_ascii_lowercase_works() {
        let mut name: Name = "UPPERCASE.Domain.Test.".parse().unwrap();
        name.make_ascii_lowercase();
        assert_eq!(name.wire_repr(), b"\x09uppercase\x06domain\x04test\x00");
    }
}
