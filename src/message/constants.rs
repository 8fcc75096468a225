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

//! Offsets and masks for the fixed DNS message header
//! ([RFC 1035 § 4.1.1]).
//!
//! [RFC 1035 § 4.1.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1

pub const HEADER_SIZE: usize = 12;

pub const ID_START: usize = 0;
pub const ID_END: usize = ID_START + 2;

// The two flag octets. QR, OPCODE, AA, TC and RD share the first; RA
// and RCODE share the second.
const FLAGS_HIGH: usize = ID_END;
const FLAGS_LOW: usize = FLAGS_HIGH + 1;

pub const QR_BYTE: usize = FLAGS_HIGH;
pub const QR_MASK: u8 = 0b1000_0000;
pub const OPCODE_BYTE: usize = FLAGS_HIGH;
pub const OPCODE_MASK: u8 = 0b0111_1000;
pub const OPCODE_SHIFT: usize = OPCODE_MASK.trailing_zeros() as usize;
pub const AA_BYTE: usize = FLAGS_HIGH;
pub const AA_MASK: u8 = 0b0000_0100;
pub const TC_BYTE: usize = FLAGS_HIGH;
pub const TC_MASK: u8 = 0b0000_0010;
pub const RD_BYTE: usize = FLAGS_HIGH;
pub const RD_MASK: u8 = 0b0000_0001;
pub const RA_BYTE: usize = FLAGS_LOW;
pub const RA_MASK: u8 = 0b1000_0000;
pub const RCODE_BYTE: usize = FLAGS_LOW;
pub const RCODE_MASK: u8 = 0b0000_1111;

// Section counts, each a big-endian u16.
pub const QDCOUNT_START: usize = FLAGS_LOW + 1;
pub const QDCOUNT_END: usize = QDCOUNT_START + 2;
pub const ANCOUNT_START: usize = QDCOUNT_END;
pub const ANCOUNT_END: usize = ANCOUNT_START + 2;
pub const NSCOUNT_START: usize = ANCOUNT_END;
pub const NSCOUNT_END: usize = NSCOUNT_START + 2;
pub const ARCOUNT_START: usize = NSCOUNT_END;
pub const ARCOUNT_END: usize = ARCOUNT_START + 2;

/// The largest offset a compression pointer's 14 bits can hold. Names
/// written past it can't be pointed to.
pub const POINTER_MAX: usize = (1 << 14) - 1;
