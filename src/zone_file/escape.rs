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

//! Decoding of escape sequences ([RFC 1035 § 5.1], [RFC 4343 § 2.1]).
//!
//! [RFC 1035 § 5.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.1
//! [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1

use super::error::ErrorKind;

/// Returns the octets of `text` with escape sequences decoded. `\DDD`
/// is the octet with decimal value `DDD`, and a backslash followed by
/// anything else is that octet.
pub(super) fn unescape(text: &str) -> Result<Vec<u8>, ErrorKind> {
    let mut octets = Vec::with_capacity(text.len());
    let mut remaining = text.as_bytes();
    while let Some((&octet, rest)) = remaining.split_first() {
        if octet != b'\\' {
            octets.push(octet);
            remaining = rest;
            continue;
        }
        match rest {
            [] => return Err(ErrorKind::EofInEscape),
            [first, ..] if first.is_ascii_digit() => {
                let digits = rest.get(..3).ok_or(ErrorKind::EscapeNeedsThreeDigits)?;
                if !digits.iter().all(u8::is_ascii_digit) {
                    return Err(ErrorKind::EscapeNeedsThreeDigits);
                }
                let value = digits
                    .iter()
                    .fold(0u16, |value, digit| 10 * value + (digit - b'0') as u16);
                octets.push(u8::try_from(value).or(Err(ErrorKind::EscapeValueOutOfRange))?);
                remaining = &rest[3..];
            }
            [escaped, tail @ ..] => {
                octets.push(*escaped);
                remaining = tail;
            }
        }
    }
    Ok(octets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_digits_and_other_octets() {
        assert_eq!(unescape("a\\032b\\\"c").unwrap(), b"a b\"c");
        assert_eq!(unescape("\\0234").unwrap(), b"\x174");
    }

    #[test]
    fn rejects_short_digit_escapes() {
        for text in ["\\0", "\\01", "\\0x1"] {
            assert_eq!(unescape(text), Err(ErrorKind::EscapeNeedsThreeDigits));
        }
        assert_eq!(unescape("abc\\"), Err(ErrorKind::EofInEscape));
    }

    #[test]
    fn rejects_values_out_of_range() {
        assert_eq!(unescape("\\256"), Err(ErrorKind::EscapeValueOutOfRange));
    }
}
