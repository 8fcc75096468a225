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

//! Implementation of the [`Rcode`] and [`ExtendedRcode`] types.

use std::fmt;

////////////////////////////////////////////////////////////////////////
// RCODES                                                             //
////////////////////////////////////////////////////////////////////////

/// The four-bit RCODE value of the DNS message header ([RFC 1035 §
/// 4.1.1]). Variant names follow the IANA registry.
///
/// [RFC 1035 § 4.1.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Rcode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    YxDomain,
    YxRrset,
    NxRrset,
    NotAuth,
    NotZone,
    DsoTypeNi,
    Unassigned(u8),
}

const RCODE_NAMES: [(Rcode, u8, &str); 12] = [
    (Rcode::NoError, 0, "NOERROR"),
    (Rcode::FormErr, 1, "FORMERR"),
    (Rcode::ServFail, 2, "SERVFAIL"),
    (Rcode::NxDomain, 3, "NXDOMAIN"),
    (Rcode::NotImp, 4, "NOTIMP"),
    (Rcode::Refused, 5, "REFUSED"),
    (Rcode::YxDomain, 6, "YXDOMAIN"),
    (Rcode::YxRrset, 7, "YXRRSET"),
    (Rcode::NxRrset, 8, "NXRRSET"),
    (Rcode::NotAuth, 9, "NOTAUTH"),
    (Rcode::NotZone, 10, "NOTZONE"),
    (Rcode::DsoTypeNi, 11, "DSOTYPENI"),
];

impl TryFrom<u8> for Rcode {
    type Error = IntoRcodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=11 => Ok(RCODE_NAMES[value as usize].0),
            12..=15 => Ok(Self::Unassigned(value)),
            _ => Err(IntoRcodeError),
        }
    }
}

impl From<Rcode> for u8 {
    fn from(rcode: Rcode) -> Self {
        match rcode {
            Rcode::Unassigned(value) => value,
            _ => RCODE_NAMES
                .iter()
                .find(|(r, _, _)| *r == rcode)
                .map_or(0, |(_, value, _)| *value),
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match RCODE_NAMES.iter().find(|(r, _, _)| r == self) {
            Some((_, _, name)) => f.write_str(name),
            None => write!(f, "RCODE{}", u8::from(*self)),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// EXTENDED RCODES                                                    //
////////////////////////////////////////////////////////////////////////

/// An RCODE that needs the upper eight bits carried in the EDNS OPT
/// record ([RFC 6891 § 6.1.3]). Only BADVERS is ever generated here.
///
/// [RFC 6891 § 6.1.3]: https://datatracker.ietf.org/doc/html/rfc6891#section-6.1.3
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ExtendedRcode {
    BadVers,
}

impl From<ExtendedRcode> for u16 {
    fn from(rcode: ExtendedRcode) -> Self {
        match rcode {
            ExtendedRcode::BadVers => 16,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that the provided value is not a valid RCODE.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IntoRcodeError;

impl fmt::Display for IntoRcodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("not a valid RCODE")
    }
}

impl std::error::Error for IntoRcodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_agree() {
        for value in 0..16u8 {
            assert_eq!(u8::from(Rcode::try_from(value).unwrap()), value);
        }
        assert_eq!(Rcode::try_from(16), Err(IntoRcodeError));
    }

    #[test]
    fn displays_iana_names() {
        assert_eq!(Rcode::ServFail.to_string(), "SERVFAIL");
        assert_eq!(Rcode::Unassigned(14).to_string(), "RCODE14");
    }
}
