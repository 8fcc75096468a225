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

//! Implementation of the [`Reader`] type to read on-the-wire DNS
//! messages.

use std::fmt;

use super::constants::*;
use super::{Opcode, Question, Rcode};
use crate::name::{self, Name};
use crate::rr::rdata::{Rdata, ReadRdataError};
use crate::rr::Record;
use crate::util;

////////////////////////////////////////////////////////////////////////
// READER                                                             //
////////////////////////////////////////////////////////////////////////

/// A "frame" around a buffer containing a DNS message that enables
/// reading the message data.
///
/// A `Reader` is constructed using its [`TryFrom`] implementation. Any
/// underlying buffer for a reader must contain at least a full DNS
/// message header of 12 octets; otherwise the construction will fail.
///
/// Since header information is in a fixed position, it can be read
/// at any time through the appropriate `Reader` methods. For reading
/// questions and RRs, the [`Reader::read_question`] and
/// [`Reader::read_rr`] methods are provided. These read using a cursor,
/// which is initially set to the first octet after the DNS header. They
/// must be called sequentially to read any questions, and then any
/// records, in the order they appear in the message.
#[derive(Eq, PartialEq)]
pub struct Reader<'a> {
    octets: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    /// Returns the 16-bit ID of the message.
    pub fn id(&self) -> u16 {
        u16::from_be_bytes([self.octets[ID_START], self.octets[ID_END - 1]])
    }

    /// Returns whether the QR (query response) bit is set.
    pub fn qr(&self) -> bool {
        (self.octets[QR_BYTE] & QR_MASK) != 0
    }

    /// Returns the message's opcode.
    pub fn opcode(&self) -> Opcode {
        Opcode::from((self.octets[OPCODE_BYTE] & OPCODE_MASK) >> OPCODE_SHIFT)
    }

    /// Returns whether the AA (authoritative answer) bit is set.
    pub fn aa(&self) -> bool {
        (self.octets[AA_BYTE] & AA_MASK) != 0
    }

    /// Returns whether the TC (truncation) bit is set.
    pub fn tc(&self) -> bool {
        (self.octets[TC_BYTE] & TC_MASK) != 0
    }

    /// Returns whether the RD (recursion desired) bit is set.
    pub fn rd(&self) -> bool {
        (self.octets[RD_BYTE] & RD_MASK) != 0
    }

    /// Returns whether the RA (recursion available) bit is set.
    pub fn ra(&self) -> bool {
        (self.octets[RA_BYTE] & RA_MASK) != 0
    }

    /// Returns the RCODE of the message.
    pub fn rcode(&self) -> Rcode {
        // Every four-bit value is a valid Rcode.
        Rcode::try_from(self.octets[RCODE_BYTE] & RCODE_MASK).unwrap_or(Rcode::ServFail)
    }

    /// Returns the number of questions in the message.
    pub fn qdcount(&self) -> u16 {
        self.header_u16(QDCOUNT_START)
    }

    /// Returns the number of answers in the message.
    pub fn ancount(&self) -> u16 {
        self.header_u16(ANCOUNT_START)
    }

    /// Returns the number of authority records in the message.
    pub fn nscount(&self) -> u16 {
        self.header_u16(NSCOUNT_START)
    }

    /// Returns the number of additional records in the message.
    pub fn arcount(&self) -> u16 {
        self.header_u16(ARCOUNT_START)
    }

    /// Reads a [`Question`] starting at the current cursor.
    ///
    /// This method is atomic, in that the cursor is not changed on
    /// failure.
    pub fn read_question(&mut self) -> Result<Question> {
        let (qname, qname_len) =
            Name::try_from_compressed(self.octets, self.cursor).map_err(Error::InvalidOwner)?;
        let qname_end = self.cursor + qname_len;
        let qtype = read_u16(self.octets, qname_end)?.into();
        let qclass = read_u16(self.octets, qname_end + 2)?.into();
        self.cursor = qname_end + 4;
        Ok(Question {
            qname,
            qtype,
            qclass,
        })
    }

    /// Reads a resource record at the current cursor, decompressing
    /// its owner and any names in its RDATA.
    ///
    /// This method is atomic, in that the cursor is not changed on
    /// failure.
    pub fn read_rr(&mut self) -> Result<Record> {
        let (record, cursor) = read_rr_at(self.octets, self.cursor)?;
        self.cursor = cursor;
        Ok(record)
    }

    fn header_u16(&self, start: usize) -> u16 {
        u16::from_be_bytes([self.octets[start], self.octets[start + 1]])
    }

    /// Returns whether the `Reader`'s cursor has reached the end of the
    /// message.
    pub fn at_eom(&self) -> bool {
        self.cursor >= self.octets.len()
    }
}

impl<'a> TryFrom<&'a [u8]> for Reader<'a> {
    type Error = Error;

    fn try_from(octets: &'a [u8]) -> Result<Self> {
        if octets.len() >= HEADER_SIZE {
            Ok(Self {
                octets,
                cursor: HEADER_SIZE,
            })
        } else {
            Err(Error::HeaderTooShort)
        }
    }
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Reader")
            .field("id", &self.id())
            .field("qr", &self.qr())
            .field("opcode", &self.opcode())
            .field("aa", &self.aa())
            .field("tc", &self.tc())
            .field("rd", &self.rd())
            .field("ra", &self.ra())
            .field("rcode", &self.rcode())
            .field("qdcount", &self.qdcount())
            .field("ancount", &self.ancount())
            .field("nscount", &self.nscount())
            .field("arcount", &self.arcount())
            .field("cursor", &self.cursor)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// RECORD PARSING                                                     //
////////////////////////////////////////////////////////////////////////

/// Reads a resource record at `octets[cursor]`, returning it along with
/// the cursor just past it. Compression pointers are interpreted as
/// offsets into `octets`, so this serves both whole DNS messages and
/// the record blobs of the [`codec`](crate::codec).
pub fn read_rr_at(octets: &[u8], cursor: usize) -> Result<(Record, usize)> {
    let (owner, owner_len) =
        Name::try_from_compressed(octets, cursor).map_err(Error::InvalidOwner)?;
    let owner_end = cursor + owner_len;
    let rr_type = read_u16(octets, owner_end)?.into();
    let class = read_u16(octets, owner_end + 2)?.into();
    let ttl = util::read_u32(octets, owner_end + 4)
        .ok_or(Error::UnexpectedEomInField)?
        .into();
    let rdlength = read_u16(octets, owner_end + 8)?;
    let rdata_start = owner_end + 10;
    let rdata = Rdata::read(rr_type, class, octets, rdata_start, rdlength)?;
    let record = Record {
        owner,
        rr_type,
        class,
        ttl,
        rdata,
    };
    Ok((record, rdata_start + rdlength as usize))
}

fn read_u16(octets: &[u8], index: usize) -> Result<u16> {
    util::read_u16(octets, index).ok_or(Error::UnexpectedEomInField)
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a [`Question`] or resource record could not
/// be read.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    HeaderTooShort,
    UnexpectedEomInField,
    InvalidOwner(name::Error),
    InvalidRdata(ReadRdataError),
}

impl From<ReadRdataError> for Error {
    fn from(err: ReadRdataError) -> Self {
        Self::InvalidRdata(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::HeaderTooShort => f.write_str("header too short"),
            Self::UnexpectedEomInField => f.write_str("unexpected end of message in field"),
            Self::InvalidOwner(err) => write!(f, "invalid owner: {}", err),
            Self::InvalidRdata(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible [`Reader`] methods.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
