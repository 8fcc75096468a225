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

//! Implementation of the [`Address`] type for ledger accounts and
//! contracts.

use std::fmt;
use std::str::FromStr;

/// A 20-octet ledger address.
///
/// The textual form is 40 hexadecimal digits, optionally preceded by
/// `0x`. Letters may be in either case; addresses are displayed in
/// lowercase with the `0x` prefix.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0; 20]);

    /// Returns whether this is the all-zero address, which the registry
    /// uses to mean "unset".
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(octets: [u8; 20]) -> Self {
        Self(octets)
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if digits.len() != 40 {
            return Err("address is not 40 hexadecimal digits");
        }
        let mut octets = [0; 20];
        hex::decode_to_slice(digits, &mut octets).or(Err("address is not hexadecimal"))?;
        Ok(Self(octets))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_prefix() {
        let text = "314159265dD8dbb310642f98f50C066173C1259b";
        let plain: Address = text.parse().unwrap();
        let prefixed: Address = format!("0x{}", text).parse().unwrap();
        assert_eq!(plain, prefixed);
        assert_eq!(
            plain.to_string(),
            "0x314159265dd8dbb310642f98f50c066173c1259b"
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz4159265dd8dbb310642f98f50c066173c1259b"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn zero_is_unset() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::default().is_zero());
        assert!(!Address::from([1; 20]).is_zero());
    }
}
