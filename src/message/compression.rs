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

//! Dictionary-based name compression ([RFC 1035 § 4.1.4]).
//!
//! The [`Compressor`] remembers where every name suffix it has written
//! starts, keyed by the exact on-the-wire octets of the suffix, so that
//! later occurrences can be replaced by a pointer. It is shared by the
//! message [`Writer`](super::Writer) and the record-blob
//! [`codec`](crate::codec); both hand it the buffer they write into.
//!
//! [RFC 1035 § 4.1.4]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4

use std::collections::HashMap;

use super::constants::POINTER_MAX;
use super::writer::{Error, Result};
use crate::name::Name;
use crate::rr::rdata::Component;
use crate::rr::Record;

/// A name-compression dictionary. Offsets are relative to the start of
/// the buffer passed to the write methods.
#[derive(Debug, Default)]
pub struct Compressor {
    offsets: HashMap<Box<[u8]>, u16>,
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `name` into `buf[cursor..limit]`, returning the cursor
    /// after it. If `compress` is set, the longest suffix already in
    /// the dictionary is replaced by a pointer. Either way, suffixes
    /// written in full are added to the dictionary when their offset
    /// fits in a pointer.
    ///
    /// On failure the buffer past `cursor` may have been modified, and
    /// the dictionary may point there. Callers that continue after an
    /// error must call [`Compressor::forget_from`].
    pub fn write_name(
        &mut self,
        buf: &mut [u8],
        mut cursor: usize,
        limit: usize,
        name: &Name,
        compress: bool,
    ) -> Result<usize> {
        let limit = limit.min(buf.len());
        for i in 0..name.len() - 1 {
            let suffix = name.wire_repr_from(i);
            if compress {
                if let Some(&pointer) = self.offsets.get(suffix) {
                    return write_octets(buf, cursor, limit, &(0xc000 | pointer).to_be_bytes());
                }
            }
            if cursor <= POINTER_MAX {
                self.offsets.insert(suffix.into(), cursor as u16);
            }
            let label = &name.wire_repr_to(i + 1)[name.wire_repr_to(i).len()..];
            cursor = write_octets(buf, cursor, limit, label)?;
        }
        write_octets(buf, cursor, limit, &[0])
    }

    /// Removes every dictionary entry at or after `cursor`. This undoes
    /// the effect of writes that were rolled back.
    pub fn forget_from(&mut self, cursor: usize) {
        self.offsets.retain(|_, offset| (*offset as usize) < cursor);
    }
}

/// Writes `record` into `buf[cursor..limit]` in the format of [RFC 1035
/// § 4.1.3], compressing the owner and any compressible names in the
/// RDATA. Returns the cursor after the record.
///
/// [RFC 1035 § 4.1.3]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.3
pub fn write_rr(
    compressor: &mut Compressor,
    buf: &mut [u8],
    cursor: usize,
    limit: usize,
    record: &Record,
) -> Result<usize> {
    let components = record
        .rdata
        .components(record.rr_type, record.class)
        .map_err(Error::InvalidRdata)?;

    let mut cursor = compressor.write_name(buf, cursor, limit, &record.owner, true)?;
    cursor = write_octets(buf, cursor, limit, &u16::from(record.rr_type).to_be_bytes())?;
    cursor = write_octets(buf, cursor, limit, &u16::from(record.class).to_be_bytes())?;
    cursor = write_octets(buf, cursor, limit, &u32::from(record.ttl).to_be_bytes())?;

    // RDLENGTH depends on compression, so it is filled in last.
    let rdlength_start = cursor;
    cursor = write_octets(buf, cursor, limit, &[0, 0])?;
    for component in components {
        cursor = match component {
            Component::CompressibleName(name) => {
                compressor.write_name(buf, cursor, limit, &name, true)?
            }
            Component::UncompressibleName(name) => {
                compressor.write_name(buf, cursor, limit, &name, false)?
            }
            Component::Other(octets) => write_octets(buf, cursor, limit, octets)?,
        };
    }
    let rdlength = (cursor - rdlength_start - 2) as u16;
    buf[rdlength_start..rdlength_start + 2].copy_from_slice(&rdlength.to_be_bytes());
    Ok(cursor)
}

/// Returns the length of `record` when written without compression,
/// an upper bound for its length as written by [`write_rr`].
pub fn uncompressed_len(record: &Record) -> usize {
    record.owner.wire_repr().len() + 10 + record.rdata.len()
}

/// Copies `octets` to `buf[cursor..]` if they fit before `limit`.
fn write_octets(buf: &mut [u8], cursor: usize, limit: usize, octets: &[u8]) -> Result<usize> {
    let end = cursor + octets.len();
    if end > limit {
        Err(Error::Truncation)
    } else {
        buf[cursor..end].copy_from_slice(octets);
        Ok(end)
    }
}
