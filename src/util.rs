// Copyright 2021 Matthew Ingwersen.
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

//! Crate-private utilities.

/// A wrapper around [`str`] references whose [`PartialEq`] and [`Eq`]
/// implementations are ASCII-case-insensitive.
pub struct Caseless<'a>(pub &'a str);

impl PartialEq for Caseless<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(other.0)
    }
}

impl Eq for Caseless<'_> {}

/// Defines a `u16` newtype for a DNS registry (classes, RR types, and
/// the like) with named constants, conversions, and the [RFC 3597 § 5]
/// textual forms (e.g. `TYPE65280`) for unnamed values.
///
/// ```ignore
/// mnemonic_u16! {
///     /// Doc comment.
///     pub struct Type, prefix "TYPE", unknown "unknown type" {
///         A = 1,
///         NS = 2,
///     }
/// }
/// ```
///
/// [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5
macro_rules! mnemonic_u16 {
    (
        $(#[$attr:meta])*
        pub struct $ty:ident, prefix $prefix:literal, unknown $unknown:literal {
            $($mnemonic:ident = $value:literal),* $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
        pub struct $ty(u16);

        #[allow(clippy::upper_case_acronyms)]
        impl $ty {
            $(pub const $mnemonic: Self = Self($value);)*

            fn mnemonic(&self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some(stringify!($mnemonic)),)*
                    _ => None,
                }
            }
        }

        impl From<u16> for $ty {
            fn from(value: u16) -> Self {
                Self(value)
            }
        }

        impl From<$ty> for u16 {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = &'static str;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                $(
                    if $crate::util::Caseless(text) == $crate::util::Caseless(stringify!($mnemonic)) {
                        return Ok(Self::$mnemonic);
                    }
                )*
                match text.get(..$prefix.len()) {
                    Some(prefix) if prefix.eq_ignore_ascii_case($prefix) => text[$prefix.len()..]
                        .parse::<u16>()
                        .map(Self)
                        .or(Err("value is not a valid unsigned 16-bit integer")),
                    _ => Err($unknown),
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match self.mnemonic() {
                    Some(mnemonic) => f.write_str(mnemonic),
                    None => write!(f, "{}{}", $prefix, self.0),
                }
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self)
            }
        }
    };
}

pub(crate) use mnemonic_u16;

/// Reads a big-endian `u16` at `index`, if there is room.
pub fn read_u16(octets: &[u8], index: usize) -> Option<u16> {
    octets
        .get(index..index + 2)
        .map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Reads a big-endian `u32` at `index`, if there is room.
pub fn read_u32(octets: &[u8], index: usize) -> Option<u32> {
    octets
        .get(index..index + 4)
        .map(|bytes| u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
