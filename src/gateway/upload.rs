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

//! Validation of zones before they are written to the ledger.

use super::Error;
use crate::authority::parse_authority_hostname;
use crate::ledger::Address;
use crate::name::Name;
use crate::rr::{Record, Type};

/// A zone ready to be written to the ledger.
///
/// The zone must have exactly one SOA record. Its owner is the zone
/// apex, and its MNAME must be an authority host name, which gives the
/// registry that holds the zone.
#[derive(Clone, Debug)]
pub struct Upload {
    apex: Name,
    registry: Address,
    records: Vec<Record>,
}

impl Upload {
    /// Validates `records` as a zone whose nameservers are named under
    /// `suffix`.
    pub fn from_records(records: Vec<Record>, suffix: &Name) -> Result<Self, Error> {
        let mut soas = records.iter().filter(|record| record.rr_type == Type::SOA);
        let soa = soas.next().ok_or(Error::NoSoa)?;
        if soas.next().is_some() {
            return Err(Error::MultipleSoa);
        }
        let (mname, _) = Name::try_from_uncompressed(soa.rdata.octets())
            .map_err(|_| Error::BadAuthorityFormat)?;
        let registry = parse_authority_hostname(&mname, suffix)?;
        Ok(Self {
            apex: soa.owner.clone(),
            registry,
            records,
        })
    }

    pub fn apex(&self) -> &Name {
        &self.apex
    }

    pub fn registry(&self) -> Address {
        self.registry
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::DEFAULT_SUFFIX;
    use crate::class::Class;
    use crate::rr::{Rdata, Ttl};

    const REGISTRY: &str = "314159265dd8dbb310642f98f50c066173c1259b";

    fn soa(owner: &str, mname: &str) -> Record {
        let mname: Name = mname.parse().unwrap();
        let mut rdata = mname.wire_repr().to_vec();
        rdata.extend_from_slice(b"\x05admin\x07example\x03eth\x00");
        rdata.extend_from_slice(&[0; 20]);
        Record {
            owner: owner.parse().unwrap(),
            rr_type: Type::SOA,
            class: Class::IN,
            ttl: Ttl::from(3600u32),
            rdata: Rdata::try_from(rdata).unwrap(),
        }
    }

    fn a(owner: &str) -> Record {
        Record {
            owner: owner.parse().unwrap(),
            rr_type: Type::A,
            class: Class::IN,
            ttl: Ttl::from(3600u32),
            rdata: Rdata::try_from(&b"\x0a\x00\x00\x01"[..]).unwrap(),
        }
    }

    fn suffix() -> Name {
        DEFAULT_SUFFIX.parse().unwrap()
    }

    #[test]
    fn soa_gives_apex_and_registry() {
        let mname = format!("{}.ens.domains.", REGISTRY);
        let upload =
            Upload::from_records(vec![a("www.example.eth."), soa("example.eth.", &mname)], &suffix())
                .unwrap();
        assert_eq!(upload.apex().to_string(), "example.eth.");
        assert_eq!(upload.registry(), REGISTRY.parse::<Address>().unwrap());
        assert_eq!(upload.records().len(), 2);
    }

    #[test]
    fn missing_soa_is_rejected() {
        assert!(matches!(
            Upload::from_records(vec![a("example.eth.")], &suffix()),
            Err(Error::NoSoa)
        ));
    }

    #[test]
    fn second_soa_is_rejected() {
        let mname = format!("{}.ens.domains.", REGISTRY);
        let records = vec![soa("example.eth.", &mname), soa("other.eth.", &mname)];
        assert!(matches!(
            Upload::from_records(records, &suffix()),
            Err(Error::MultipleSoa)
        ));
    }

    #[test]
    fn foreign_nameserver_is_rejected() {
        for mname in ["ns1.example.com.", "ns1.ens.domains."] {
            assert!(matches!(
                Upload::from_records(vec![soa("example.eth.", mname)], &suffix()),
                Err(Error::BadAuthorityFormat)
            ));
        }
    }
}
