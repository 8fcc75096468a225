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

//! Implementation of types relating to DNS questions.

use std::fmt;
use std::str::FromStr;

use crate::class::Class;
use crate::name::Name;
use crate::rr::Type;
use crate::util::Caseless;

////////////////////////////////////////////////////////////////////////
// QUESTIONS                                                          //
////////////////////////////////////////////////////////////////////////

/// The question of a DNS query ([RFC 1035 § 4.1.2]).
///
/// The gateway answers each question of a message independently, so
/// nothing here assumes a single question per message.
///
/// [RFC 1035 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.2
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    pub qname: Name,
    pub qtype: Qtype,
    pub qclass: Qclass,
}

impl Question {
    /// Returns a copy of this question asking for `qtype` instead.
    pub fn with_qtype(&self, qtype: Qtype) -> Self {
        Self {
            qname: self.qname.clone(),
            qtype,
            qclass: self.qclass,
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.qname, self.qclass, self.qtype)
    }
}

////////////////////////////////////////////////////////////////////////
// QTYPES                                                             //
////////////////////////////////////////////////////////////////////////

/// The QTYPE of a DNS [question](Question).
///
/// QTYPE values include data TYPEs (see [`Type`]) as well as values
/// that ask for a range of TYPEs, like [`ANY`](Qtype::ANY).
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct Qtype(u16);

impl Qtype {
    // RFC 1995
    pub const IXFR: Self = Self(251);

    // RFC 1035
    pub const AXFR: Self = Self(252);
    pub const MAILB: Self = Self(253);
    pub const MAILA: Self = Self(254);
    pub const ANY: Self = Self(255);

    pub const CNAME: Self = Self(5);
}

impl From<u16> for Qtype {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Qtype> for u16 {
    fn from(qtype: Qtype) -> Self {
        qtype.0
    }
}

impl From<Type> for Qtype {
    fn from(rr_type: Type) -> Self {
        Self(rr_type.into())
    }
}

impl fmt::Display for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::IXFR => f.write_str("IXFR"),
            Self::AXFR => f.write_str("AXFR"),
            Self::MAILB => f.write_str("MAILB"),
            Self::MAILA => f.write_str("MAILA"),
            Self::ANY => f.write_str("ANY"),
            _ => Type::from(*self).fmt(f),
        }
    }
}

impl fmt::Debug for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for Qtype {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let caseless = Caseless(text);
        if caseless == Caseless("IXFR") {
            Ok(Self::IXFR)
        } else if caseless == Caseless("AXFR") {
            Ok(Self::AXFR)
        } else if caseless == Caseless("MAILB") {
            Ok(Self::MAILB)
        } else if caseless == Caseless("MAILA") {
            Ok(Self::MAILA)
        } else if caseless == Caseless("ANY") || text == "*" {
            Ok(Self::ANY)
        } else {
            Type::from_str(text).map(Into::into)
        }
    }
}

////////////////////////////////////////////////////////////////////////
// QCLASSES                                                           //
////////////////////////////////////////////////////////////////////////

/// The QCLASS of a DNS [question](Question): a [`Class`], or a value
/// like [`ANY`](Qclass::ANY) that asks for a group of classes.
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct Qclass(u16);

impl Qclass {
    pub const IN: Self = Self(1);

    // RFC 2136
    pub const NONE: Self = Self(254);

    // RFC 1035
    pub const ANY: Self = Self(255);
}

impl From<u16> for Qclass {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Qclass> for u16 {
    fn from(qclass: Qclass) -> Self {
        qclass.0
    }
}

impl From<Class> for Qclass {
    fn from(class: Class) -> Self {
        Self(class.into())
    }
}

impl fmt::Display for Qclass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::NONE => f.write_str("NONE"),
            Self::ANY => f.write_str("ANY"),
            _ => Class::from(*self).fmt(f),
        }
    }
}

impl fmt::Debug for Qclass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for Qclass {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let caseless = Caseless(text);
        if caseless == Caseless("NONE") {
            Ok(Self::NONE)
        } else if caseless == Caseless("ANY") || text == "*" {
            Ok(Self::ANY)
        } else {
            Class::from_str(text).map(Into::into)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qtype_parses_meta_types() {
        assert_eq!("*".parse::<Qtype>(), Ok(Qtype::ANY));
        assert_eq!("any".parse::<Qtype>(), Ok(Qtype::ANY));
        assert_eq!("CNAME".parse::<Qtype>(), Ok(Qtype::CNAME));
        assert_eq!(Qtype::from(Type::AAAA).to_string(), "AAAA");
    }

    #[test]
    fn qclass_parses_meta_classes_ignoring_case() {
        assert_eq!("none".parse::<Qclass>(), Ok(Qclass::NONE));
        assert_eq!("Any".parse::<Qclass>(), Ok(Qclass::ANY));
        assert_eq!("*".parse::<Qclass>(), Ok(Qclass::ANY));
        assert_eq!("in".parse::<Qclass>(), Ok(Qclass::IN));
        assert_eq!("mailb".parse::<Qtype>(), Ok(Qtype::MAILB));
    }

    #[test]
    fn question_displays() {
        let question = Question {
            qname: "www.example.eth.".parse().unwrap(),
            qtype: Qtype::from(Type::A),
            qclass: Qclass::IN,
        };
        assert_eq!(question.to_string(), "www.example.eth. IN A");
        assert_eq!(question.with_qtype(Qtype::CNAME).qtype, Qtype::CNAME);
    }
}
