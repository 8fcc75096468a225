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

//! Data structures for DNS resource records.

use std::fmt;

use crate::class::Class;
use crate::name::Name;

pub mod rdata;
mod rr_type;
mod ttl;
pub use rdata::Rdata;
pub use rr_type::Type;
pub use ttl::Ttl;

/// A single resource record.
///
/// Records are what the ledger stores (as a blob, see
/// [`codec`](crate::codec)) and what the gateway answers with. The
/// [`Rdata`] is kept uncompressed.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Record {
    pub owner: Name,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: Ttl,
    pub rdata: Rdata,
}

impl Record {
    /// Returns a copy of this record owned by `owner` instead.
    pub fn with_owner(&self, owner: &Name) -> Self {
        Self {
            owner: owner.clone(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.owner, self.ttl, self.class, self.rr_type, self.rdata
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_owner_keeps_everything_else() {
        let record = Record {
            owner: "*.example.eth.".parse().unwrap(),
            rr_type: Type::A,
            class: Class::IN,
            ttl: Ttl::from(300u32),
            rdata: Rdata::try_from(&b"\x0a\x00\x00\x01"[..]).unwrap(),
        };
        let owner: Name = "www.example.eth.".parse().unwrap();
        let rewritten = record.with_owner(&owner);
        assert_eq!(rewritten.owner, owner);
        assert_eq!(rewritten.rdata, record.rdata);
        assert_eq!(
            rewritten.to_string(),
            "www.example.eth. 300 IN A \\# 4 0a000001"
        );
    }
}
