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

//! Parsing of RDATA fields.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::slice;

use super::error::ErrorKind;
use super::escape::unescape;
use super::lexer::Field;
use super::{parse_name, parse_ttl};
use crate::class::Class;
use crate::name::Name;
use crate::rr::{Rdata, Type};

type Fields<'a, 'b> = slice::Iter<'b, Field<'a>>;

/// Parses the RDATA `fields` of a record of type `rr_type` in class
/// `class`. Names are relative to `origin`.
///
/// Types without a presentation format here must use the generic
/// `\# <length> <hex>` form of [RFC 3597 § 5], which any type accepts.
///
/// [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5
pub(super) fn parse(
    rr_type: Type,
    class: Class,
    fields: &[Field],
    origin: Option<&Name>,
) -> Result<Rdata, ErrorKind> {
    let mut fields = fields.iter();
    let mut octets = Vec::new();

    if fields.as_slice().first().map_or(false, Field::is_backslash_hash) {
        fields.next();
        parse_generic(&mut fields, &mut octets)?;
    } else {
        match rr_type {
            Type::A if class == Class::IN => {
                let field = next(&mut fields, ErrorKind::ExpectedIpv4)?;
                let addr: Ipv4Addr = field.text.parse().map_err(ErrorKind::InvalidIpv4)?;
                octets.extend_from_slice(&addr.octets());
            }
            Type::AAAA if class == Class::IN => {
                let field = next(&mut fields, ErrorKind::ExpectedIpv6)?;
                let addr: Ipv6Addr = field.text.parse().map_err(ErrorKind::InvalidIpv6)?;
                octets.extend_from_slice(&addr.octets());
            }
            Type::NS | Type::CNAME | Type::PTR => {
                push_name(&mut fields, origin, &mut octets)?;
            }
            Type::MX => {
                push_u16(&mut fields, &mut octets)?;
                push_name(&mut fields, origin, &mut octets)?;
            }
            Type::TXT => {
                push_character_string(&mut fields, &mut octets)?;
                while !fields.as_slice().is_empty() {
                    push_character_string(&mut fields, &mut octets)?;
                }
            }
            Type::SOA => {
                push_name(&mut fields, origin, &mut octets)?;
                push_name(&mut fields, origin, &mut octets)?;
                let serial = next(&mut fields, ErrorKind::ExpectedU32)?;
                let serial: u32 = serial.text.parse().map_err(ErrorKind::InvalidInt)?;
                octets.extend_from_slice(&serial.to_be_bytes());

                // REFRESH, RETRY, EXPIRE and MINIMUM may use TTL units.
                for _ in 0..4 {
                    let field = next(&mut fields, ErrorKind::ExpectedTtl)?;
                    octets.extend_from_slice(&parse_ttl(field.text)?.to_be_bytes());
                }
            }
            Type::SRV if class == Class::IN => {
                for _ in 0..3 {
                    push_u16(&mut fields, &mut octets)?;
                }
                push_name(&mut fields, origin, &mut octets)?;
            }
            _ => return Err(ErrorKind::ExpectedBackslashHash),
        }
    }

    if fields.next().is_some() {
        return Err(ErrorKind::ExpectedEol);
    }
    let rdata = Rdata::try_from(octets).map_err(ErrorKind::InvalidRdata)?;
    rdata
        .validate(rr_type, class)
        .map_err(ErrorKind::InvalidRdata)?;
    Ok(rdata)
}

fn next<'a, 'b>(fields: &mut Fields<'a, 'b>, missing: ErrorKind) -> Result<&'b Field<'a>, ErrorKind> {
    fields.next().ok_or(missing)
}

fn push_name(
    fields: &mut Fields,
    origin: Option<&Name>,
    octets: &mut Vec<u8>,
) -> Result<(), ErrorKind> {
    let field = next(fields, ErrorKind::ExpectedName)?;
    octets.extend_from_slice(parse_name(field, origin)?.wire_repr());
    Ok(())
}

fn push_u16(fields: &mut Fields, octets: &mut Vec<u8>) -> Result<(), ErrorKind> {
    let field = next(fields, ErrorKind::ExpectedU16)?;
    let value: u16 = field.text.parse().map_err(ErrorKind::InvalidInt)?;
    octets.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

fn push_character_string(fields: &mut Fields, octets: &mut Vec<u8>) -> Result<(), ErrorKind> {
    let field = next(fields, ErrorKind::ExpectedCharacterString)?;
    let string = unescape(field.text)?;
    let len = u8::try_from(string.len()).or(Err(ErrorKind::CharacterStringTooLong))?;
    octets.push(len);
    octets.extend_from_slice(&string);
    Ok(())
}

/// Parses `<length> <hex>...` after a `\#` field. The hex may be split
/// across any number of fields.
fn parse_generic(fields: &mut Fields, octets: &mut Vec<u8>) -> Result<(), ErrorKind> {
    let len = next(fields, ErrorKind::ExpectedRdataLen)?;
    let len: u16 = len.text.parse().map_err(ErrorKind::InvalidInt)?;
    let hex: String = fields.by_ref().map(|field| field.text).collect();
    if len > 0 && hex.is_empty() {
        return Err(ErrorKind::ExpectedHexRdata);
    }
    let decoded = hex::decode(hex).or(Err(ErrorKind::InvalidHexDigit))?;
    if decoded.len() != len as usize {
        return Err(ErrorKind::InvalidRdataLen);
    }
    octets.extend_from_slice(&decoded);
    Ok(())
}
