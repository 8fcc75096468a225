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

//! An in-memory [`Ledger`] for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Address, Error, IndexedRecord, Ledger, TxHash};
use crate::class::Class;
use crate::message::{Qclass, Qtype};
use crate::namehash::NodeId;

/// A [`Ledger`] backed by hash maps. Every write is logged, and gets
/// a transaction hash made from its sequence number.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    resolvers: Mutex<HashMap<(Address, NodeId), Address>>,
    ttls: HashMap<(Address, NodeId), u64>,
    blobs: Mutex<HashMap<(Address, NodeId), Vec<u8>>>,
    indexed: HashMap<(Address, NodeId), Vec<IndexedRecord>>,
    writes: Mutex<Vec<String>>,
    failing: bool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_resolver(self, registry: Address, node: NodeId, resolver: Address) -> Self {
        lock(&self.resolvers).insert((registry, node), resolver);
        self
    }

    pub fn with_ttl(mut self, registry: Address, node: NodeId, ttl: u64) -> Self {
        self.ttls.insert((registry, node), ttl);
        self
    }

    pub fn with_blob(self, resolver: Address, node: NodeId, blob: Vec<u8>) -> Self {
        lock(&self.blobs).insert((resolver, node), blob);
        self
    }

    pub fn with_indexed(
        mut self,
        resolver: Address,
        node: NodeId,
        records: Vec<IndexedRecord>,
    ) -> Self {
        self.indexed.insert((resolver, node), records);
        self
    }

    pub fn blob(&self, resolver: Address, node: NodeId) -> Option<Vec<u8>> {
        lock(&self.blobs).get(&(resolver, node)).cloned()
    }

    /// Returns a description of every write so far, in order.
    pub fn writes(&self) -> Vec<String> {
        lock(&self.writes).clone()
    }

    fn check(&self) -> Result<(), Error> {
        if self.failing {
            Err(Error::Transport("connection refused".to_owned()))
        } else {
            Ok(())
        }
    }

    fn record_write(&self, description: String) -> TxHash {
        let mut writes = lock(&self.writes);
        writes.push(description);
        let mut hash = [0; 32];
        hash[31] = writes.len() as u8;
        TxHash(hash)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn resolver_of(&self, registry: Address, node: NodeId) -> Result<Address, Error> {
        self.check()?;
        Ok(lock(&self.resolvers)
            .get(&(registry, node))
            .copied()
            .unwrap_or_default())
    }

    async fn ttl_of(&self, registry: Address, node: NodeId) -> Result<u64, Error> {
        self.check()?;
        Ok(self.ttls.get(&(registry, node)).copied().unwrap_or(0))
    }

    async fn raw_records_of(&self, resolver: Address, node: NodeId) -> Result<Vec<u8>, Error> {
        self.check()?;
        Ok(self.blob(resolver, node).unwrap_or_default())
    }

    async fn record_at(
        &self,
        resolver: Address,
        node: NodeId,
        qtype: Qtype,
        qclass: Qclass,
        index: u32,
    ) -> Result<Option<IndexedRecord>, Error> {
        self.check()?;
        Ok(self
            .indexed
            .get(&(resolver, node))
            .into_iter()
            .flatten()
            .filter(|record| record.rr_type.matches(qtype))
            .filter(|record| qclass == Qclass::ANY || record.class == Class::from(qclass))
            .nth(index as usize)
            .cloned())
    }

    async fn set_raw_records(
        &self,
        resolver: Address,
        node: NodeId,
        blob: &[u8],
    ) -> Result<TxHash, Error> {
        self.check()?;
        lock(&self.blobs).insert((resolver, node), blob.to_vec());
        Ok(self.record_write(format!("set_raw_records {} {}", resolver, node)))
    }

    async fn set_resolver(
        &self,
        registry: Address,
        node: NodeId,
        resolver: Address,
    ) -> Result<TxHash, Error> {
        self.check()?;
        lock(&self.resolvers).insert((registry, node), resolver);
        Ok(self.record_write(format!("set_resolver {} {} {}", registry, node, resolver)))
    }
}
