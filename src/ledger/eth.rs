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

//! Implementation of [`Ledger`] over Ethereum JSON-RPC.

use async_trait::async_trait;
use log::debug;
use serde_json::json;

use super::abi::{self, Decoder, Token};
use super::rpc::{RpcClient, DEFAULT_TIMEOUT};
use super::{Address, Error, IndexedRecord, Ledger, TxHash};
use crate::class::Class;
use crate::message::{Qclass, Qtype};
use crate::namehash::NodeId;
use crate::rr::{Rdata, Type};

/// A [`Ledger`] reached through an Ethereum node's JSON-RPC interface.
///
/// Reads are `eth_call`s against the latest block. Writes are
/// `eth_sendTransaction`s, so the node must manage (and unlock) the
/// sending account. Without a configured account, the first one
/// reported by `eth_accounts` is used.
#[derive(Debug)]
pub struct EthLedger {
    rpc: RpcClient,
    from: Option<Address>,
}

impl EthLedger {
    pub fn new(url: &str, from: Option<Address>) -> Result<Self, Error> {
        Ok(Self {
            rpc: RpcClient::new(url, DEFAULT_TIMEOUT)?,
            from,
        })
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, Error> {
        let params = json!([{ "to": to.to_string(), "data": to_hex(&data) }, "latest"]);
        let result: String = self.rpc.call("eth_call", params).await?;
        from_hex(&result)
    }

    async fn send(&self, to: Address, data: Vec<u8>) -> Result<TxHash, Error> {
        let from = self.sender().await?;
        let params = json!([{
            "from": from.to_string(),
            "to": to.to_string(),
            "data": to_hex(&data),
        }]);
        let result: String = self.rpc.call("eth_sendTransaction", params).await?;
        let hash: [u8; 32] = from_hex(&result)?
            .try_into()
            .map_err(|_| Error::InvalidResponse("transaction hash is not 32 octets".to_owned()))?;
        debug!("Sent transaction {} from {} to {}", to_hex(&hash), from, to);
        Ok(TxHash(hash))
    }

    async fn sender(&self) -> Result<Address, Error> {
        if let Some(from) = self.from {
            return Ok(from);
        }
        let accounts: Vec<String> = self.rpc.call("eth_accounts", json!([])).await?;
        accounts
            .first()
            .ok_or(Error::NoAccount)?
            .parse()
            .map_err(|e: &str| Error::InvalidResponse(e.to_owned()))
    }
}

#[async_trait]
impl Ledger for EthLedger {
    async fn resolver_of(&self, registry: Address, node: NodeId) -> Result<Address, Error> {
        let data = abi::encode_call(*abi::RESOLVER, &[Token::Node(node)]);
        let result = self.call(registry, data).await?;
        Decoder::new(&result).address(0)
    }

    async fn ttl_of(&self, registry: Address, node: NodeId) -> Result<u64, Error> {
        let data = abi::encode_call(*abi::TTL, &[Token::Node(node)]);
        let result = self.call(registry, data).await?;
        Decoder::new(&result).uint(0)
    }

    async fn raw_records_of(&self, resolver: Address, node: NodeId) -> Result<Vec<u8>, Error> {
        let data = abi::encode_call(*abi::DNSRR, &[Token::Node(node)]);
        let result = self.call(resolver, data).await?;
        Decoder::new(&result).bytes(0)
    }

    async fn record_at(
        &self,
        resolver: Address,
        node: NodeId,
        qtype: Qtype,
        qclass: Qclass,
        index: u32,
    ) -> Result<Option<IndexedRecord>, Error> {
        let data = abi::encode_call(
            *abi::RR,
            &[
                Token::Node(node),
                Token::Uint(u16::from(qtype).into()),
                Token::Uint(u16::from(qclass).into()),
                Token::Uint(index.into()),
            ],
        );
        let result = self.call(resolver, data).await?;
        let decoder = Decoder::new(&result);
        let rr_type = decoder.uint16(0)?;
        if rr_type == 0 {
            return Ok(None);
        }
        let rdata = Rdata::try_from(decoder.bytes(2)?)
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        Ok(Some(IndexedRecord {
            rr_type: Type::from(rr_type),
            class: Class::from(decoder.uint16(1)?),
            rdata,
        }))
    }

    async fn set_raw_records(
        &self,
        resolver: Address,
        node: NodeId,
        blob: &[u8],
    ) -> Result<TxHash, Error> {
        let data = abi::encode_call(*abi::SET_DNSRR, &[Token::Node(node), Token::Bytes(blob)]);
        self.send(resolver, data).await
    }

    async fn set_resolver(
        &self,
        registry: Address,
        node: NodeId,
        resolver: Address,
    ) -> Result<TxHash, Error> {
        let data = abi::encode_call(
            *abi::SET_RESOLVER,
            &[Token::Node(node), Token::Address(resolver)],
        );
        self.send(registry, data).await
    }
}

fn to_hex(octets: &[u8]) -> String {
    format!("0x{}", hex::encode(octets))
}

fn from_hex(text: &str) -> Result<Vec<u8>, Error> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| Error::InvalidResponse(format!("bad hex data: {}", e)))
}
