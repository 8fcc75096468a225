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

//! The ledger side of the gateway: the registry and resolver contracts
//! that hold zone data.
//!
//! The [`Ledger`] trait is the interface the [`gateway`](crate::gateway)
//! uses. [`EthLedger`] implements it over Ethereum JSON-RPC; tests use
//! in-memory implementations.

use std::fmt;

use async_trait::async_trait;

use crate::class::Class;
use crate::message::{Qclass, Qtype};
use crate::namehash::NodeId;
use crate::rr::{Rdata, Type};

pub mod abi;
mod address;
mod eth;
#[cfg(test)]
pub mod memory;
mod rpc;
pub use address::Address;
pub use eth::EthLedger;
pub use rpc::RpcClient;

/// Access to the registry and resolver contracts.
///
/// Registry methods take the registry address; resolver methods take a
/// resolver address previously returned by [`Ledger::resolver_of`].
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Returns the resolver of `node`, or [`Address::ZERO`] if none is
    /// set.
    async fn resolver_of(&self, registry: Address, node: NodeId) -> Result<Address, Error>;

    /// Returns the TTL the registry holds for `node`.
    async fn ttl_of(&self, registry: Address, node: NodeId) -> Result<u64, Error>;

    /// Returns the record blob a resolver holds for `node`.
    async fn raw_records_of(&self, resolver: Address, node: NodeId) -> Result<Vec<u8>, Error>;

    /// Returns record number `index` of those matching `qtype` and
    /// `qclass` at `node`, or `None` past the last one.
    async fn record_at(
        &self,
        resolver: Address,
        node: NodeId,
        qtype: Qtype,
        qclass: Qclass,
        index: u32,
    ) -> Result<Option<IndexedRecord>, Error>;

    /// Replaces the record blob of `node`.
    async fn set_raw_records(
        &self,
        resolver: Address,
        node: NodeId,
        blob: &[u8],
    ) -> Result<TxHash, Error>;

    /// Sets the resolver of `node`.
    async fn set_resolver(
        &self,
        registry: Address,
        node: NodeId,
        resolver: Address,
    ) -> Result<TxHash, Error>;
}

/// A record as returned by [`Ledger::record_at`]: no owner or TTL, and
/// RDATA exactly as stored.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexedRecord {
    pub rr_type: Type,
    pub class: Class,
    pub rdata: Rdata,
}

/// The hash of a submitted transaction.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a ledger call failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// The request could not be sent or its reply could not be read.
    Transport(String),

    /// The ledger node replied with a non-success HTTP status.
    Http(u16),

    /// The ledger node returned a JSON-RPC error.
    Rpc { code: i64, message: String },

    /// The reply did not have the expected shape.
    InvalidResponse(String),

    /// No account was configured and the node manages none.
    NoAccount,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "ledger request failed: {}", message),
            Self::Http(status) => write!(f, "ledger node returned HTTP status {}", status),
            Self::Rpc { code, message } => write!(f, "ledger RPC error {}: {}", code, message),
            Self::InvalidResponse(message) => write!(f, "invalid ledger response: {}", message),
            Self::NoAccount => f.write_str("no account available to send transactions from"),
        }
    }
}

impl std::error::Error for Error {}
