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

//! Conversion between record lists and the record blobs stored on the
//! ledger.
//!
//! A blob is a plain concatenation of resource records in the format of
//! [RFC 1035 § 4.1.3], with no header and no counts. Names may be
//! compressed, with pointers taken as offsets into the blob. Blobs read
//! back from contract storage are often padded with zeros, so an
//! all-zero tail ends the blob just like its actual end does.
//!
//! [RFC 1035 § 4.1.3]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.3

use std::fmt;

use log::debug;

use crate::message::compression::{self, Compressor};
use crate::message::{reader, writer};
use crate::name;
use crate::rr::rdata::ReadRdataError;
use crate::rr::Record;

/// Decodes every record in `blob`.
///
/// If a record after the first runs off the end of the blob, the
/// records before it are returned. Any other problem is an error.
pub fn decode(blob: &[u8]) -> Result<Vec<Record>, Error> {
    let mut records = Vec::new();
    let mut cursor = 0;
    while !blob[cursor..].iter().all(|&octet| octet == 0) {
        match reader::read_rr_at(blob, cursor) {
            Ok((record, next)) => {
                records.push(record);
                cursor = next;
            }
            Err(err) if !records.is_empty() && is_truncation(err) => {
                debug!(
                    "Record blob truncated at offset {} after {} records: {}",
                    cursor,
                    records.len(),
                    err,
                );
                break;
            }
            Err(err) => return Err(Error::Read(err)),
        }
    }
    Ok(records)
}

/// Encodes `records` into a blob, compressing names.
///
/// The blob is never longer than the records written out without
/// compression, so that much space is allocated up front.
pub fn encode(records: &[Record]) -> Result<Vec<u8>, Error> {
    let bound = records.iter().map(compression::uncompressed_len).sum();
    let mut buf = vec![0; bound];
    let mut compressor = Compressor::new();
    let mut cursor = 0;
    for record in records {
        cursor = compression::write_rr(&mut compressor, &mut buf, cursor, bound, record)
            .map_err(Error::Write)?;
    }
    buf.truncate(cursor);
    Ok(buf)
}

fn is_truncation(err: reader::Error) -> bool {
    matches!(
        err,
        reader::Error::UnexpectedEomInField
            | reader::Error::InvalidOwner(name::Error::UnexpectedEom)
            | reader::Error::InvalidRdata(ReadRdataError::UnexpectedEom)
    )
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a record blob could not be decoded or
/// encoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    Read(reader::Error),
    Write(writer::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to decode record blob: {}", err),
            Self::Write(err) => write!(f, "failed to encode record blob: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read(err) => Some(err),
            Self::Write(err) => Some(err),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::rr::{Rdata, Ttl, Type};

    fn record(owner: &str, rr_type: Type, rdata: &[u8]) -> Record {
        Record {
            owner: owner.parse().unwrap(),
            rr_type,
            class: Class::IN,
            ttl: Ttl::from(3600u32),
            rdata: Rdata::try_from(rdata).unwrap(),
        }
    }

    fn sample_records() -> Vec<Record> {
        vec![
            record("example.eth.", Type::A, b"\x7f\x00\x00\x01"),
            record("www.example.eth.", Type::CNAME, b"\x07example\x03eth\x00"),
            record("example.eth.", Type::MX, b"\x00\x0a\x04mail\x07example\x03eth\x00"),
            record("example.eth.", Type::TXT, b"\x05hello"),
        ]
    }

    #[test]
    fn empty_blob_has_no_records() {
        assert_eq!(decode(b""), Ok(Vec::new()));
        assert_eq!(decode(&[0; 32]), Ok(Vec::new()));
    }

    #[test]
    fn encoded_records_decode_unchanged() {
        let records = sample_records();
        let blob = encode(&records).unwrap();
        assert_eq!(decode(&blob).unwrap(), records);
    }

    #[test]
    fn encode_compresses_repeated_suffixes() {
        let records = sample_records();
        let blob = encode(&records).unwrap();
        let uncompressed: usize = records.iter().map(compression::uncompressed_len).sum();
        assert!(blob.len() < uncompressed);

        // The second owner is "www" plus a pointer to the first owner.
        let second = &blob[27..];
        assert_eq!(&second[..6], b"\x03www\xc0\x00");
    }

    #[test]
    fn srv_targets_are_not_compressed() {
        let records = vec![
            record("example.eth.", Type::A, b"\x7f\x00\x00\x01"),
            record(
                "_sip._udp.example.eth.",
                Type::SRV,
                b"\x00\x01\x00\x02\x13\xc4\x07example\x03eth\x00",
            ),
        ];
        let blob = encode(&records).unwrap();
        assert!(blob.ends_with(b"\x13\xc4\x07example\x03eth\x00"));
        assert_eq!(decode(&blob).unwrap(), records);
    }

    #[test]
    fn case_is_preserved() {
        let records = vec![
            record("Example.eth.", Type::A, b"\x7f\x00\x00\x01"),
            record("www.example.eth.", Type::A, b"\x7f\x00\x00\x02"),
        ];
        let blob = encode(&records).unwrap();
        let decoded = decode(&blob).unwrap();
        assert_eq!(decoded[0].owner.to_string(), "Example.eth.");
        // Suffix matching is exact, so only "eth" was shared.
        assert_eq!(decoded[1].owner.to_string(), "www.example.eth.");
    }

    #[test]
    fn zero_padding_ends_the_blob() {
        let records = sample_records();
        let mut blob = encode(&records).unwrap();
        blob.extend_from_slice(&[0; 64]);
        assert_eq!(decode(&blob).unwrap(), records);
    }

    #[test]
    fn truncated_tail_returns_valid_prefix() {
        let records = sample_records();
        let blob = encode(&records).unwrap();
        let decoded = decode(&blob[..blob.len() - 3]).unwrap();
        assert_eq!(decoded, records[..3]);
    }

    #[test]
    fn truncated_first_record_is_an_error() {
        let blob = encode(&sample_records()).unwrap();
        assert!(matches!(decode(&blob[..8]), Err(Error::Read(_))));
    }

    #[test]
    fn bad_pointer_is_an_error() {
        // Owner is a pointer to itself.
        let blob = b"\xc0\x00\x00\x01\x00\x01\x00\x00\x00\x3c\x00\x00";
        assert!(matches!(decode(blob), Err(Error::Read(_))));
    }

    #[test]
    fn malformed_rdata_fails_encode() {
        let records = vec![record("example.eth.", Type::MX, b"\x00")];
        assert!(matches!(encode(&records), Err(Error::Write(_))));
    }
}
