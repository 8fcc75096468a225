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

//! Implementation of the [`Writer`] type to write on-the-wire DNS
//! messages.

use std::fmt;

use super::compression::{self, Compressor};
use super::constants::*;
use super::{ExtendedRcode, Opcode, Question, Rcode};
use crate::rr::rdata::ReadRdataError;
use crate::rr::{Record, Type};

////////////////////////////////////////////////////////////////////////
// WRITER                                                             //
////////////////////////////////////////////////////////////////////////

/// A "frame" around a buffer that serializes a DNS message into it.
///
/// A `Writer` is constructed using [`Writer::new`], which sets the
/// initial message size limit. The limit must leave room for a full
/// DNS message header of 12 octets, which is initially zeroed.
///
/// Header fields can be written at any time. Questions and records
/// are written sequentially at a cursor, so [`Writer::add_question`],
/// [`Writer::add_answer`], [`Writer::add_authority`], and
/// [`Writer::add_additional`] must be called in section order;
/// otherwise they fail with [`Error::OutOfOrder`]. Each of these is
/// atomic: on failure, the message is left as it was.
///
/// For EDNS messages, use [`Writer::set_edns`]. Space for the OPT
/// record is reserved, and the record itself is written by
/// [`Writer::finish`].
pub struct Writer<'a> {
    octets: &'a mut [u8],
    cursor: usize,
    limit: usize,
    available: usize,
    section: Section,
    qdcount: u16,
    ancount: u16,
    nscount: u16,
    arcount: u16,
    compressor: Compressor,
    edns: Option<Edns>,
}

/// The section of a DNS message a [`Writer`] is currently serializing.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum Section {
    Question,
    Answer,
    Authority,
    Additional,
}

/// EDNS parameters for the OPT record written by [`Writer::finish`].
#[derive(Clone, Copy, Debug)]
struct Edns {
    udp_payload_size: u16,
    extended_rcode_upper_bits: u8,
}

/// The size of an OPT record with no options: root owner (1), TYPE (2),
/// CLASS (2), TTL (4), and RDLENGTH (2).
const OPT_RECORD_SIZE: usize = 11;

impl<'a> Writer<'a> {
    /// Creates a new `Writer` over `octets`. The message size is
    /// limited to `limit` or `octets.len()`, whichever is smaller.
    pub fn new(octets: &'a mut [u8], limit: usize) -> Result<Self> {
        let limit = limit.min(octets.len());
        if limit < HEADER_SIZE {
            Err(Error::Truncation)
        } else {
            octets[..HEADER_SIZE].fill(0);
            Ok(Self {
                octets,
                cursor: HEADER_SIZE,
                limit,
                available: limit,
                section: Section::Question,
                qdcount: 0,
                ancount: 0,
                nscount: 0,
                arcount: 0,
                compressor: Compressor::new(),
                edns: None,
            })
        }
    }

    /// Changes the message size limit. The new limit is capped at the
    /// buffer length and never goes below what has already been
    /// written (plus any reserved OPT space).
    pub fn set_limit(&mut self, new_limit: usize) {
        let reserved = self.limit - self.available;
        self.limit = new_limit
            .min(self.octets.len())
            .max(self.cursor + reserved);
        self.available = self.limit - reserved;
    }

    /// Returns the message size limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_id(&mut self, id: u16) {
        self.octets[ID_START..ID_END].copy_from_slice(&id.to_be_bytes());
    }

    pub fn set_qr(&mut self, qr: bool) {
        self.set_flag(QR_BYTE, QR_MASK, qr);
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.octets[OPCODE_BYTE] &= !OPCODE_MASK;
        self.octets[OPCODE_BYTE] |= (u8::from(opcode) << OPCODE_SHIFT) & OPCODE_MASK;
    }

    /// Returns whether the AA (authoritative answer) bit is set.
    pub fn aa(&self) -> bool {
        self.octets[AA_BYTE] & AA_MASK != 0
    }

    pub fn set_aa(&mut self, aa: bool) {
        self.set_flag(AA_BYTE, AA_MASK, aa);
    }

    /// Returns whether the TC (truncation) bit is set.
    pub fn tc(&self) -> bool {
        self.octets[TC_BYTE] & TC_MASK != 0
    }

    pub fn set_tc(&mut self, tc: bool) {
        self.set_flag(TC_BYTE, TC_MASK, tc);
    }

    pub fn set_rd(&mut self, rd: bool) {
        self.set_flag(RD_BYTE, RD_MASK, rd);
    }

    /// Returns the (four-bit) RCODE currently set in the header.
    pub fn rcode(&self) -> Rcode {
        // Any four-bit value converts.
        Rcode::try_from(self.octets[RCODE_BYTE] & RCODE_MASK).unwrap_or(Rcode::ServFail)
    }

    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.octets[RCODE_BYTE] &= !RCODE_MASK;
        self.octets[RCODE_BYTE] |= u8::from(rcode) & RCODE_MASK;
        if let Some(ref mut edns) = self.edns {
            edns.extended_rcode_upper_bits = 0;
        }
    }

    /// Sets an RCODE that needs the EDNS extended RCODE bits. This
    /// fails if this is not an EDNS message.
    pub fn set_extended_rcode(&mut self, rcode: ExtendedRcode) -> Result<()> {
        let value = u16::from(rcode);
        let edns = self.edns.as_mut().ok_or(Error::NotEdns)?;
        edns.extended_rcode_upper_bits = (value >> 4) as u8;
        self.octets[RCODE_BYTE] &= !RCODE_MASK;
        self.octets[RCODE_BYTE] |= (value as u8) & RCODE_MASK;
        Ok(())
    }

    fn set_flag(&mut self, byte: usize, mask: u8, value: bool) {
        if value {
            self.octets[byte] |= mask;
        } else {
            self.octets[byte] &= !mask;
        }
    }

    /// Returns the current number of answer records in the message.
    pub fn ancount(&self) -> u16 {
        self.ancount
    }

    /// Adds a question to the message. This must be used before any
    /// resource records are added.
    pub fn add_question(&mut self, question: &Question) -> Result<()> {
        if self.section != Section::Question {
            return Err(Error::OutOfOrder);
        }
        let new_qdcount = self.qdcount.checked_add(1).ok_or(Error::CountOverflow)?;
        self.with_rollback(|this| {
            let mut cursor =
                this.compressor
                    .write_name(this.octets, this.cursor, this.available, &question.qname, true)?;
            for field in [u16::from(question.qtype), u16::from(question.qclass)] {
                if cursor + 2 > this.available {
                    return Err(Error::Truncation);
                }
                this.octets[cursor..cursor + 2].copy_from_slice(&field.to_be_bytes());
                cursor += 2;
            }
            this.cursor = cursor;
            Ok(())
        })?;
        self.qdcount = new_qdcount;
        Ok(())
    }

    /// Adds a record to the answer section.
    pub fn add_answer(&mut self, record: &Record) -> Result<()> {
        self.add_rr(Section::Answer, record)?;
        self.ancount += 1;
        Ok(())
    }

    /// Adds a record to the authority section.
    pub fn add_authority(&mut self, record: &Record) -> Result<()> {
        self.add_rr(Section::Authority, record)?;
        self.nscount += 1;
        Ok(())
    }

    /// Adds a record to the additional section.
    pub fn add_additional(&mut self, record: &Record) -> Result<()> {
        self.add_rr(Section::Additional, record)?;
        self.arcount += 1;
        Ok(())
    }

    /// Writes a record into `section` after checking ordering and the
    /// section's count. The caller bumps the count.
    fn add_rr(&mut self, section: Section, record: &Record) -> Result<()> {
        if section < self.section {
            return Err(Error::OutOfOrder);
        }
        let count = match section {
            Section::Question => self.qdcount,
            Section::Answer => self.ancount,
            Section::Authority => self.nscount,
            Section::Additional => self.arcount,
        };
        if count == u16::MAX {
            return Err(Error::CountOverflow);
        }
        self.with_rollback(|this| {
            this.section = section;
            this.cursor = compression::write_rr(
                &mut this.compressor,
                this.octets,
                this.cursor,
                this.available,
                record,
            )?;
            Ok(())
        })
    }

    /// Makes this an EDNS message. This reserves space at the end of
    /// the message for the OPT record, and fails if there is not enough
    /// room or if this is already an EDNS message.
    pub fn set_edns(&mut self, udp_payload_size: u16) -> Result<()> {
        if self.edns.is_some() {
            Err(Error::AlreadyEdns)
        } else if self.cursor + OPT_RECORD_SIZE > self.available {
            Err(Error::Truncation)
        } else {
            self.arcount = self.arcount.checked_add(1).ok_or(Error::CountOverflow)?;
            self.available -= OPT_RECORD_SIZE;
            self.edns = Some(Edns {
                udp_payload_size,
                extended_rcode_upper_bits: 0,
            });
            Ok(())
        }
    }

    /// Finishes writing the message, returning its final length.
    pub fn finish(mut self) -> usize {
        self.octets[QDCOUNT_START..QDCOUNT_END].copy_from_slice(&self.qdcount.to_be_bytes());
        self.octets[ANCOUNT_START..ANCOUNT_END].copy_from_slice(&self.ancount.to_be_bytes());
        self.octets[NSCOUNT_START..NSCOUNT_END].copy_from_slice(&self.nscount.to_be_bytes());
        self.octets[ARCOUNT_START..ARCOUNT_END].copy_from_slice(&self.arcount.to_be_bytes());

        // The space for the OPT record was reserved by set_edns.
        if let Some(edns) = self.edns {
            let opt = &mut self.octets[self.cursor..self.cursor + OPT_RECORD_SIZE];
            opt[0] = 0;
            opt[1..3].copy_from_slice(&u16::from(Type::OPT).to_be_bytes());
            opt[3..5].copy_from_slice(&edns.udp_payload_size.to_be_bytes());
            opt[5..9].copy_from_slice(&((edns.extended_rcode_upper_bits as u32) << 24).to_be_bytes());
            opt[9..11].fill(0);
            self.cursor += OPT_RECORD_SIZE;
        }
        self.cursor
    }

    /// Executes `f(self)`, rolling back the section, cursor, and
    /// compression dictionary if it fails.
    fn with_rollback<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let saved_section = self.section;
        let saved_cursor = self.cursor;
        let result = f(self);
        if result.is_err() {
            self.section = saved_section;
            self.cursor = saved_cursor;
            self.compressor.forget_from(saved_cursor);
        }
        result
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a [`Writer`] (or the record
/// [`codec`](crate::codec)) could not serialize something.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    /// Adding the question or resource record would overflow the
    /// corresponding 16-bit counter in the DNS header.
    CountOverflow,

    /// There is not enough room left in the buffer.
    Truncation,

    /// A question or resource record was added in the wrong place in
    /// the message.
    OutOfOrder,

    /// The RDATA of a record does not match its type.
    InvalidRdata(ReadRdataError),

    /// An attempt was made to set an extended RCODE on a non-EDNS
    /// message.
    NotEdns,

    /// An attempt was made to set up EDNS when EDNS is already enabled.
    AlreadyEdns,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::CountOverflow => f.write_str("record count would overflow"),
            Self::Truncation => f.write_str("message would be truncated"),
            Self::OutOfOrder => f.write_str("question or record serialized out of order"),
            Self::InvalidRdata(err) => write!(f, "invalid RDATA: {}", err),
            Self::NotEdns => f.write_str("not an EDNS message"),
            Self::AlreadyEdns => f.write_str("already an EDNS message"),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible [`Writer`] methods.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::{Qclass, Qtype, Reader};
    use super::*;
    use crate::class::Class;
    use crate::rr::{Rdata, Ttl};

    fn question() -> Question {
        Question {
            qname: "example.eth.".parse().unwrap(),
            qtype: Qtype::from(Type::A),
            qclass: Qclass::IN,
        }
    }

    fn a_record(last: u8) -> Record {
        Record {
            owner: "example.eth.".parse().unwrap(),
            rr_type: Type::A,
            class: Class::IN,
            ttl: Ttl::from(60u32),
            rdata: Rdata::try_from(&[192, 0, 2, last][..]).unwrap(),
        }
    }

    #[test]
    fn writes_readable_message() {
        let mut buf = [0; 512];
        let mut writer = Writer::new(&mut buf, 512).unwrap();
        writer.set_id(0x1234);
        writer.set_qr(true);
        writer.set_aa(true);
        writer.add_question(&question()).unwrap();
        writer.add_answer(&a_record(1)).unwrap();
        let len = writer.finish();

        // Owner compressed against the question: 12 + 17 + 2 + 10 + 4.
        assert_eq!(len, 45);
        let mut reader = Reader::try_from(&buf[..len]).unwrap();
        assert_eq!(reader.id(), 0x1234);
        assert!(reader.qr());
        assert!(reader.aa());
        assert_eq!(reader.read_question().unwrap(), question());
        assert_eq!(reader.read_rr().unwrap(), a_record(1));
        assert!(reader.at_eom());
    }

    #[test]
    fn out_of_order_is_rejected() {
        let mut buf = [0; 512];
        let mut writer = Writer::new(&mut buf, 512).unwrap();
        writer.add_answer(&a_record(1)).unwrap();
        assert_eq!(writer.add_question(&question()), Err(Error::OutOfOrder));
        writer.add_additional(&a_record(2)).unwrap();
        assert_eq!(writer.add_answer(&a_record(3)), Err(Error::OutOfOrder));
    }

    #[test]
    fn truncation_rolls_back() {
        let mut buf = [0; 512];
        let mut writer = Writer::new(&mut buf, 12 + 17 + 20).unwrap();
        writer.add_question(&question()).unwrap();
        writer.add_answer(&a_record(1)).unwrap();
        assert_eq!(writer.add_answer(&a_record(2)), Err(Error::Truncation));
        assert_eq!(writer.ancount(), 1);
        assert_eq!(writer.finish(), 45);
    }

    #[test]
    fn edns_reserves_and_writes_opt() {
        let mut buf = [0; 512];
        let mut writer = Writer::new(&mut buf, 512).unwrap();
        writer.set_edns(1232).unwrap();
        assert_eq!(writer.set_edns(1232), Err(Error::AlreadyEdns));
        writer.set_extended_rcode(ExtendedRcode::BadVers).unwrap();
        let len = writer.finish();
        assert_eq!(len, 12 + OPT_RECORD_SIZE);
        assert_eq!(&buf[10..12], &[0, 1]);
        assert_eq!(&buf[12..len], &[0, 0, 41, 0x04, 0xd0, 1, 0, 0, 0, 0, 0][..]);
    }

    #[test]
    fn set_limit_respects_buffer_and_cursor() {
        let mut buf = [0; 100];
        let mut writer = Writer::new(&mut buf, 50).unwrap();
        writer.set_limit(4096);
        assert_eq!(writer.limit(), 100);
        writer.set_limit(0);
        assert_eq!(writer.limit(), 12);
    }
}
