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

//! Implementation of the [`Label`] type.

use std::fmt;
use std::hash::{Hash, Hasher};

use arrayvec::ArrayVec;

use super::MAX_LABEL_LEN;

/// A borrowed label of a [`Name`](super::Name).
///
/// Like [`Name`](super::Name), the [`PartialEq`], [`Eq`], and [`Hash`]
/// implementations are ASCII-case-insensitive.
#[derive(Clone, Copy)]
pub struct Label<'a> {
    octets: &'a [u8],
}

impl<'a> Label<'a> {
    pub(super) fn from_unchecked(octets: &'a [u8]) -> Self {
        debug_assert!(octets.len() <= MAX_LABEL_LEN);
        Self { octets }
    }

    /// Returns whether this is the single-octet label `*`.
    pub fn is_asterisk(&self) -> bool {
        self.octets == b"*"
    }

    /// Returns whether this is the null label.
    pub fn is_null(&self) -> bool {
        self.octets.is_empty()
    }

    /// Returns the length of the label (excluding the length octet).
    pub fn len(&self) -> usize {
        self.octets.len()
    }

    /// Returns the octets of the label.
    pub fn octets(&self) -> &'a [u8] {
        self.octets
    }

    /// Returns a copy of the label's octets with ASCII letters made
    /// lowercase. No heap allocation is performed.
    pub fn to_ascii_lowercase(&self) -> ArrayVec<u8, MAX_LABEL_LEN> {
        self.octets.iter().map(u8::to_ascii_lowercase).collect()
    }
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for octet in self.octets {
            if *octet == b'.' {
                f.write_str("\\.")?;
            } else if *octet == b'\\' {
                f.write_str("\\\\")?;
            } else if octet.is_ascii_graphic() {
                write!(f, "{}", *octet as char)?;
            } else {
                write!(f, "\\{:03}", *octet)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl PartialEq for Label<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.octets.eq_ignore_ascii_case(other.octets)
    }
}

impl Eq for Label<'_> {}

impl Hash for Label<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Keep this consistent with the case-insensitive Eq.
        state.write_usize(self.octets.len());
        for octet in self.octets {
            state.write_u8(octet.to_ascii_lowercase());
        }
    }
}
