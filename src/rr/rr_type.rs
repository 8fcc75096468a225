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

//! Provides the [`Type`] structure for DNS RR types.

use crate::message::Qtype;
use crate::util::mnemonic_u16;

mnemonic_u16! {
    /// Represents the RR type of a DNS record.
    ///
    /// An RR type is an unsigned 16-bit integer on the wire. Constants
    /// are provided for the types this crate knows the RDATA layout of,
    /// plus a few that show up in ordinary zone files.
    pub struct Type, prefix "TYPE", unknown "unknown type" {
        A = 1,
        NS = 2,
        MD = 3,
        MF = 4,
        CNAME = 5,
        SOA = 6,
        MB = 7,
        MG = 8,
        MR = 9,
        NULL = 10,
        WKS = 11,
        PTR = 12,
        HINFO = 13,
        MINFO = 14,
        MX = 15,
        TXT = 16,
        AAAA = 28,
        SRV = 33,
        DNAME = 39,
        OPT = 41,
        CAA = 257,
    }
}

impl From<Qtype> for Type {
    fn from(qtype: Qtype) -> Self {
        Self(qtype.into())
    }
}

impl Type {
    /// Returns whether a query of type `qtype` asks for records of
    /// this type. `ANY` matches every type.
    pub fn matches(self, qtype: Qtype) -> bool {
        qtype == Qtype::ANY || u16::from(qtype) == self.0
    }
}
