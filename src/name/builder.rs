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

//! Implementation of the [`NameBuilder`] structure.

use arrayvec::ArrayVec;

use super::{parse_escape, Error, Name, MAX_LABEL_LEN, MAX_N_LABELS, MAX_WIRE_LEN};

/// A facility to build [`Name`]s octet by octet.
///
/// The `NameBuilder` constructs the on-the-wire representation and
/// label offset array for a [`Name`] using fixed-size internal buffers
/// that are long enough to accomodate any valid name, so building on
/// the stack needs only one final heap allocation.
///
/// A new `NameBuilder` starts with a single null label. If the build is
/// finished at this point, the name of the DNS root is constructed:
///
/// ```
/// use ensdns::name::{Name, NameBuilder};
/// assert_eq!(NameBuilder::new().finish().unwrap(), Name::root());
/// ```
///
/// A `Name` is finally constructed with [`NameBuilder::finish`], or with
/// [`NameBuilder::finish_with_suffix`] to make the name relative to an
/// origin (as when reading a zone file).
///
/// ```
/// use ensdns::name::{Name, NameBuilder};
/// let mut builder = NameBuilder::new();
/// builder.try_push_slice(b"www").unwrap();
/// let origin: Name = "example.eth.".parse().unwrap();
/// let name = builder.finish_with_suffix(&origin).unwrap();
/// assert_eq!(name, "www.example.eth.".parse().unwrap());
/// ```
pub struct NameBuilder {
    wire_repr: ArrayVec<u8, MAX_WIRE_LEN>,
    label_offsets: ArrayVec<u8, MAX_N_LABELS>,
    label_start: usize,
    label_len: u8,
}

impl NameBuilder {
    /// Constructs a new `NameBuilder`, which initially contains a
    /// single null label.
    pub fn new() -> Self {
        let mut wire_repr = ArrayVec::new();
        wire_repr.push(0);
        let mut label_offsets = ArrayVec::new();
        label_offsets.push(0);
        Self {
            wire_repr,
            label_offsets,
            label_start: 0,
            label_len: 0,
        }
    }

    /// Determines whether the name currently stored in the
    /// `NameBuilder` ends with the null label.
    pub fn is_fully_qualified(&self) -> bool {
        self.label_len == 0
    }

    /// Tries to add the given octet to the current label. In the error
    /// case, the `NameBuilder`'s state remains unchanged.
    pub fn try_push(&mut self, octet: u8) -> Result<(), Error> {
        if self.label_len >= (MAX_LABEL_LEN as u8) {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_push(octet).is_ok() {
            self.label_len += 1;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Tries to add the given slice to the current label. In the error
    /// case, the `NameBuilder`'s state remains unchanged.
    pub fn try_push_slice(&mut self, octets: &[u8]) -> Result<(), Error> {
        if (self.label_len as usize) + octets.len() > MAX_LABEL_LEN {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_extend_from_slice(octets).is_ok() {
            self.label_len += octets.len() as u8;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Appends text in master-file form: `.` separates labels and
    /// backslash escapes per RFC 4343 § 2.1 are decoded. The text must
    /// be ASCII.
    pub fn push_text(&mut self, text: &str) -> Result<(), Error> {
        let mut remaining_octets = text.as_bytes();
        while let Some(&octet) = remaining_octets.first() {
            if octet == b'\\' {
                let (value, consumed) = parse_escape(&remaining_octets[1..])?;
                self.try_push(value)?;
                remaining_octets = &remaining_octets[consumed + 1..];
            } else if octet == b'.' {
                self.next_label()?;
                remaining_octets = &remaining_octets[1..];
            } else if !octet.is_ascii() {
                return Err(Error::StrNotAscii);
            } else {
                self.try_push(octet)?;
                remaining_octets = &remaining_octets[1..];
            }
        }
        Ok(())
    }

    /// Writes out the length of the current label in the on-the-wire
    /// representation.
    fn update_label_len(&mut self) {
        self.wire_repr[self.label_start] = self.label_len;
    }

    /// Finishes the current label and starts a new one. Only the last
    /// label in a domain name may be null, so this fails if the current
    /// label is null.
    pub fn next_label(&mut self) -> Result<(), Error> {
        if self.is_fully_qualified() {
            Err(Error::NullNonTerminal)
        } else if self.wire_repr.is_full() {
            Err(Error::NameTooLong)
        } else {
            self.update_label_len();
            self.label_start = self.wire_repr.len();
            self.label_len = 0;

            // Neither push can fail: wire_repr has room, and a name
            // that fits in MAX_WIRE_LEN octets has at most
            // MAX_N_LABELS labels.
            self.wire_repr.push(0);
            self.label_offsets.push(self.label_start as u8);
            Ok(())
        }
    }

    /// Finishes the construction of the domain name. Since the last
    /// label of a domain name must be null, this fails if that is not
    /// the case.
    pub fn finish(self) -> Result<Name, Error> {
        if !self.is_fully_qualified() {
            Err(Error::NonNullTerminal)
        } else {
            Ok(Name::from_parts(&self.wire_repr, &self.label_offsets))
        }
    }

    /// Finishes the construction of the domain name by implicitly
    /// finishing the current label and then appending the labels of
    /// `suffix`. This fails if the current label is null or if the
    /// result would be too long.
    pub fn finish_with_suffix(mut self, suffix: &Name) -> Result<Name, Error> {
        if self.is_fully_qualified() {
            return Err(Error::NullNonTerminal);
        }
        self.update_label_len();
        let label_offset_base = self.wire_repr.len();
        self.wire_repr
            .try_extend_from_slice(suffix.wire_repr())
            .or(Err(Error::NameTooLong))?;
        for offset in suffix.label_offsets.iter() {
            self.label_offsets
                .try_push((label_offset_base + *offset as usize) as u8)
                .or(Err(Error::NameTooLong))?;
        }
        Ok(Name::from_parts(&self.wire_repr, &self.label_offsets))
    }
}

impl Default for NameBuilder {
    fn default() -> Self {
        Self::new()
    }
}
