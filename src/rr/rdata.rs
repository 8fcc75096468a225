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

//! Implementation of the [`Rdata`] type and its type-specific layouts.

use std::fmt;

use super::Type;
use crate::class::Class;
use crate::name::{self, Name};

////////////////////////////////////////////////////////////////////////
// RDATA                                                              //
////////////////////////////////////////////////////////////////////////

/// The RDATA of a resource record.
///
/// `Rdata` always holds the *uncompressed* form: any domain names
/// embedded in it are stored in full, so that the same octets can be
/// written into any message or record blob with fresh compression.
/// The length never exceeds 65,535 octets.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Rdata(Box<[u8]>);

impl Rdata {
    /// Returns empty RDATA.
    pub fn empty() -> Self {
        Self(Box::new([]))
    }

    /// Returns whether the `Rdata` is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the length of the `Rdata`.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the underlying octets.
    pub fn octets(&self) -> &[u8] {
        &self.0
    }

    /// Reads RDATA of type `rr_type` in class `class` and of length
    /// `rdlength` starting at `message[cursor]`, decompressing any
    /// embedded names.
    ///
    /// Per [RFC 3597 § 4], only RR types defined by [RFC 1035] may
    /// carry compressed names, but receivers should also decompress
    /// SRV. Types whose layout is not known are accepted as opaque
    /// octets. If the remaining part of the message is shorter than
    /// `rdlength`, this fails with [`ReadRdataError::UnexpectedEom`].
    ///
    /// [RFC 1035]: https://datatracker.ietf.org/doc/html/rfc1035
    /// [RFC 3597 § 4]: https://datatracker.ietf.org/doc/html/rfc3597#section-4
    pub fn read(
        rr_type: Type,
        class: Class,
        message: &[u8],
        cursor: usize,
        rdlength: u16,
    ) -> Result<Self, ReadRdataError> {
        let end = cursor + rdlength as usize;
        if end > message.len() {
            return Err(ReadRdataError::UnexpectedEom);
        }
        let mut octets = Vec::with_capacity(rdlength as usize);
        walk(
            layout(rr_type, class),
            message,
            cursor,
            end,
            true,
            Some(&mut octets),
        )?;
        octets.try_into()
    }

    /// Checks that these (uncompressed) octets are valid RDATA for
    /// `rr_type` in class `class`.
    pub fn validate(&self, rr_type: Type, class: Class) -> Result<(), ReadRdataError> {
        walk(layout(rr_type, class), &self.0, 0, self.0.len(), false, None)
    }

    /// Returns the [`Component`]s of this `Rdata`, assuming that it is
    /// of type `rr_type` in class `class`.
    pub fn components(&self, rr_type: Type, class: Class) -> Result<Vec<Component>, ReadRdataError> {
        let mut components = Vec::new();
        let mut cursor = 0;
        for field in layout(rr_type, class) {
            let start = cursor;
            cursor = field.skip(&self.0, cursor, self.0.len(), false, None)?;
            let octets = &self.0[start..cursor];
            components.push(match field {
                Field::CompressibleName => Component::CompressibleName(parse_name(octets)?),
                Field::UncompressibleName => Component::UncompressibleName(parse_name(octets)?),
                _ => Component::Other(octets),
            });
        }
        Ok(components)
    }
}

impl TryFrom<Vec<u8>> for Rdata {
    type Error = ReadRdataError;

    fn try_from(octets: Vec<u8>) -> Result<Self, Self::Error> {
        if octets.len() > u16::MAX as usize {
            Err(ReadRdataError::TooLong)
        } else {
            Ok(Self(octets.into_boxed_slice()))
        }
    }
}

impl TryFrom<&[u8]> for Rdata {
    type Error = ReadRdataError;

    fn try_from(octets: &[u8]) -> Result<Self, Self::Error> {
        octets.to_vec().try_into()
    }
}

impl AsRef<[u8]> for Rdata {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Formats the RDATA in the generic [RFC 3597 § 5] form.
///
/// [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5
impl fmt::Display for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\\# {}", self.0.len())?;
        if !self.0.is_empty() {
            write!(f, " {}", hex::encode(&self.0))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

////////////////////////////////////////////////////////////////////////
// RDATA COMPONENTS                                                   //
////////////////////////////////////////////////////////////////////////

/// A piece of an [`Rdata`], as needed to write it with name
/// compression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Component<'a> {
    /// An embedded name that may be written compressed.
    CompressibleName(Name),

    /// An embedded name that must be written uncompressed.
    UncompressibleName(Name),

    /// Any other data, to be copied as is.
    Other(&'a [u8]),
}

/// One field of an RDATA layout.
#[derive(Clone, Copy, Debug)]
enum Field {
    CompressibleName,
    UncompressibleName,
    Fixed(usize),
    CharacterStrings,
    Rest,
}

/// Returns the layout of RDATA of type `rr_type` in class `class`.
fn layout(rr_type: Type, class: Class) -> &'static [Field] {
    use Field::*;
    match rr_type {
        Type::NS
        | Type::MD
        | Type::MF
        | Type::CNAME
        | Type::MB
        | Type::MG
        | Type::MR
        | Type::PTR => &[CompressibleName],
        Type::SOA => &[CompressibleName, CompressibleName, Fixed(20)],
        Type::MINFO => &[CompressibleName, CompressibleName],
        Type::MX => &[Fixed(2), CompressibleName],
        Type::HINFO => &[CharacterStrings],
        Type::TXT => &[CharacterStrings],
        Type::A if class == Class::IN => &[Fixed(4)],
        Type::AAAA if class == Class::IN => &[Fixed(16)],
        Type::SRV if class == Class::IN => &[Fixed(6), UncompressibleName],
        _ => &[Rest],
    }
}

impl Field {
    /// Reads this field at `cursor` (which must be less than or equal
    /// to `end`), appending its uncompressed form to `out` if given.
    /// Returns the cursor just past the field.
    fn skip(
        self,
        octets: &[u8],
        cursor: usize,
        end: usize,
        compressed: bool,
        out: Option<&mut Vec<u8>>,
    ) -> Result<usize, ReadRdataError> {
        let (next, name) = match self {
            Self::CompressibleName | Self::UncompressibleName => {
                let (name, len) = if compressed {
                    Name::try_from_compressed(octets, cursor)?
                } else {
                    Name::try_from_uncompressed(&octets[cursor..end])?
                };
                (cursor + len, Some(name))
            }
            Self::Fixed(len) => (cursor + len, None),
            Self::CharacterStrings => {
                let mut next = cursor;
                while next < end {
                    next += 1 + octets[next] as usize;
                }
                if next == cursor {
                    return Err(ReadRdataError::Malformed);
                }
                (next, None)
            }
            Self::Rest => (end, None),
        };
        if next > end {
            return Err(ReadRdataError::UnexpectedEom);
        }
        if let Some(out) = out {
            match name {
                Some(name) => out.extend_from_slice(name.wire_repr()),
                None => out.extend_from_slice(&octets[cursor..next]),
            }
        }
        Ok(next)
    }
}

/// Walks `layout` over `octets[start..end]`, which must be consumed
/// exactly.
fn walk(
    layout: &[Field],
    octets: &[u8],
    start: usize,
    end: usize,
    compressed: bool,
    mut out: Option<&mut Vec<u8>>,
) -> Result<(), ReadRdataError> {
    let mut cursor = start;
    for field in layout {
        cursor = field.skip(octets, cursor, end, compressed, out.as_deref_mut())?;
    }
    if cursor == end {
        Ok(())
    } else {
        Err(ReadRdataError::Malformed)
    }
}

fn parse_name(octets: &[u8]) -> Result<Name, ReadRdataError> {
    Ok(Name::try_from_uncompressed(octets)?.0)
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that RDATA is invalid for its type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReadRdataError {
    UnexpectedEom,
    InvalidName(name::Error),
    Malformed,
    TooLong,
}

impl From<name::Error> for ReadRdataError {
    fn from(err: name::Error) -> Self {
        Self::InvalidName(err)
    }
}

impl fmt::Display for ReadRdataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::UnexpectedEom => f.write_str("RDATA is shorter than its layout requires"),
            Self::InvalidName(err) => write!(f, "invalid name in RDATA: {}", err),
            Self::Malformed => f.write_str("RDATA does not match its type"),
            Self::TooLong => f.write_str("RDATA is longer than 65,535 octets"),
        }
    }
}

impl std::error::Error for ReadRdataError {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_decompresses_mx() {
        // "eth." at offset 0, then MX RDATA: preference 10, "mail" + ptr.
        let message = b"\x03eth\x00\x00\x0a\x04mail\xc0\x00";
        let rdata = Rdata::read(Type::MX, Class::IN, message, 5, 9).unwrap();
        assert_eq!(rdata.octets(), b"\x00\x0a\x04mail\x03eth\x00");
    }

    #[test]
    fn read_checks_rdlength() {
        let message = b"\x7f\x00\x00\x01";
        assert_eq!(
            Rdata::read(Type::A, Class::IN, message, 0, 5),
            Err(ReadRdataError::UnexpectedEom)
        );
        assert_eq!(
            Rdata::read(Type::A, Class::IN, message, 0, 3),
            Err(ReadRdataError::UnexpectedEom)
        );
    }

    #[test]
    fn read_rejects_name_running_past_rdata() {
        let message = b"\x03eth\x00";
        assert_eq!(
            Rdata::read(Type::CNAME, Class::IN, message, 0, 3),
            Err(ReadRdataError::UnexpectedEom)
        );
    }

    #[test]
    fn unknown_types_are_opaque() {
        let message = b"\xc0\x00\xff";
        let rdata = Rdata::read(Type::from(65280), Class::IN, message, 0, 3).unwrap();
        assert_eq!(rdata.octets(), message);
    }

    #[test]
    fn validate_checks_txt() {
        let good = Rdata::try_from(&b"\x02hi\x05there"[..]).unwrap();
        let bad = Rdata::try_from(&b"\x05hi"[..]).unwrap();
        assert_eq!(good.validate(Type::TXT, Class::IN), Ok(()));
        assert_eq!(
            bad.validate(Type::TXT, Class::IN),
            Err(ReadRdataError::UnexpectedEom)
        );
        assert_eq!(
            Rdata::empty().validate(Type::TXT, Class::IN),
            Err(ReadRdataError::Malformed)
        );
    }

    #[test]
    fn validate_rejects_trailing_data() {
        let rdata = Rdata::try_from(&b"\x03eth\x00\x00"[..]).unwrap();
        assert_eq!(
            rdata.validate(Type::NS, Class::IN),
            Err(ReadRdataError::Malformed)
        );
    }

    #[test]
    fn components_split_srv() {
        let rdata = Rdata::try_from(&b"\x00\x01\x00\x02\x00\x35\x02ns\x03eth\x00"[..]).unwrap();
        let components = rdata.components(Type::SRV, Class::IN).unwrap();
        assert_eq!(
            components,
            [
                Component::Other(b"\x00\x01\x00\x02\x00\x35"),
                Component::UncompressibleName("ns.eth.".parse().unwrap()),
            ]
        );
    }

    #[test]
    fn displays_generic_form() {
        let rdata = Rdata::try_from(&b"\x7f\x00\x00\x01"[..]).unwrap();
        assert_eq!(rdata.to_string(), "\\# 4 7f000001");
        assert_eq!(Rdata::empty().to_string(), "\\# 0");
    }
}
