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

//! The subset of the Solidity contract ABI that the registry and
//! resolver contracts need.
//!
//! Calls are a four-octet selector followed by 32-octet words. Static
//! values occupy one word each in the head; dynamic `bytes` values
//! are represented in the head by an offset to a tail holding their
//! length and their padded contents.

use lazy_static::lazy_static;

use super::{Address, Error};
use crate::namehash::{keccak256, NodeId};

const WORD: usize = 32;

lazy_static! {
    pub static ref RESOLVER: [u8; 4] = selector("resolver(bytes32)");
    pub static ref TTL: [u8; 4] = selector("ttl(bytes32)");
    pub static ref SET_RESOLVER: [u8; 4] = selector("setResolver(bytes32,address)");
    pub static ref DNSRR: [u8; 4] = selector("dnsrr(bytes32)");
    pub static ref SET_DNSRR: [u8; 4] = selector("setDnsrr(bytes32,bytes)");
    pub static ref RR: [u8; 4] = selector("rr(bytes32,uint16,uint16,uint32)");
}

/// Returns the selector of a function: the first four octets of the
/// Keccak-256 hash of its signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// An argument of a contract call.
#[derive(Clone, Copy, Debug)]
pub enum Token<'a> {
    Node(NodeId),
    Address(Address),
    Uint(u64),
    Bytes(&'a [u8]),
}

/// Encodes a call to the function with `selector`.
pub fn encode_call(selector: [u8; 4], args: &[Token]) -> Vec<u8> {
    let head_len = args.len() * WORD;
    let mut head = Vec::with_capacity(4 + head_len);
    let mut tail = Vec::new();
    head.extend_from_slice(&selector);
    for arg in args {
        match *arg {
            Token::Node(node) => head.extend_from_slice(node.as_bytes()),
            Token::Address(address) => push_left_padded(&mut head, address.as_bytes()),
            Token::Uint(value) => push_left_padded(&mut head, &value.to_be_bytes()),
            Token::Bytes(octets) => {
                let offset = (head_len + tail.len()) as u64;
                push_left_padded(&mut head, &offset.to_be_bytes());
                push_left_padded(&mut tail, &(octets.len() as u64).to_be_bytes());
                tail.extend_from_slice(octets);
                tail.resize(tail.len() + padding(octets.len()), 0);
            }
        }
    }
    head.extend_from_slice(&tail);
    head
}

fn push_left_padded(buf: &mut Vec<u8>, octets: &[u8]) {
    buf.resize(buf.len() + WORD - octets.len(), 0);
    buf.extend_from_slice(octets);
}

fn padding(len: usize) -> usize {
    (WORD - len % WORD) % WORD
}

/// Reads values out of the return data of a call. Each method takes
/// the index of the head word that holds the value.
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8], Error> {
        offset
            .checked_add(WORD)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| invalid("return data too short"))
    }

    /// Reads an unsigned integer that must fit in 64 bits.
    pub fn uint(&self, index: usize) -> Result<u64, Error> {
        self.uint_at(index * WORD)
    }

    fn uint_at(&self, offset: usize) -> Result<u64, Error> {
        let word = self.word_at(offset)?;
        let (high, low) = word.split_at(WORD - 8);
        if high.iter().any(|&octet| octet != 0) {
            return Err(invalid("integer out of range"));
        }
        let mut octets = [0; 8];
        octets.copy_from_slice(low);
        Ok(u64::from_be_bytes(octets))
    }

    /// Reads a `uint16`.
    pub fn uint16(&self, index: usize) -> Result<u16, Error> {
        u16::try_from(self.uint(index)?).or(Err(invalid("uint16 out of range")))
    }

    pub fn address(&self, index: usize) -> Result<Address, Error> {
        let word = self.word_at(index * WORD)?;
        if word[..WORD - 20].iter().any(|&octet| octet != 0) {
            return Err(invalid("address out of range"));
        }
        let mut octets = [0; 20];
        octets.copy_from_slice(&word[WORD - 20..]);
        Ok(octets.into())
    }

    /// Reads a dynamic `bytes` value.
    pub fn bytes(&self, index: usize) -> Result<Vec<u8>, Error> {
        let offset = usize::try_from(self.uint(index)?).or(Err(invalid("offset out of range")))?;
        let len = usize::try_from(self.uint_at(offset)?).or(Err(invalid("length out of range")))?;
        let start = offset + WORD;
        start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| invalid("bytes run past the end of the return data"))
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidResponse(message.to_owned())
}
