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

//! Computation of ENS node identifiers.
//!
//! The registry indexes names by their *namehash* ([EIP-137]): the
//! root has the all-zero identifier, and a name `label.rest` has the
//! identifier `keccak256(namehash(rest) || keccak256(label))`.
//!
//! [EIP-137]: https://eips.ethereum.org/EIPS/eip-137

use std::fmt;

use sha3::{Digest, Keccak256};

use crate::name::Name;

/// A 32-octet ENS node identifier.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct NodeId([u8; 32]);

impl NodeId {
    /// The identifier of the root.
    pub const ZERO: Self = Self([0; 32]);

    /// Computes the identifier of a parsed domain name. The null label
    /// is skipped and ASCII letters are made lowercase first, so names
    /// that are equal under DNS rules map to the same node.
    pub fn of(name: &Name) -> Self {
        name.labels()
            .rev()
            .filter(|label| !label.is_null())
            .fold(Self::ZERO, |parent, label| {
                parent.child(&label.to_ascii_lowercase())
            })
    }

    /// Returns the identifier of the child of this node with the given
    /// label.
    pub fn child(&self, label: &[u8]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(self.0);
        hasher.update(keccak256(label));
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for NodeId {
    fn from(octets: [u8; 32]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

/// Computes the namehash of a textual name, octet for octet.
///
/// One trailing `.` is ignored, so `"eth"` and `"eth."` hash equally
/// and both `""` and `"."` hash to [`NodeId::ZERO`]. Empty interior
/// labels are hashed as empty labels.
pub fn namehash(name: &str) -> NodeId {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() {
        return NodeId::ZERO;
    }
    name.rsplit('.')
        .fold(NodeId::ZERO, |parent, label| parent.child(label.as_bytes()))
}

/// Computes the Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}
