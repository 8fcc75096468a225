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

//! The [`Gateway`], which answers DNS questions from ledger data and
//! writes zones to the ledger.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::authority::{self, find_authority, parse_authority_hostname, Transport};
use crate::codec;
use crate::ledger::{self, Address, Ledger, TxHash};
use crate::message::{Qtype, Question};
use crate::name::Name;
use crate::namehash::NodeId;
use crate::rr::{Record, Ttl};
use crate::zone::ZoneTree;

mod upload;
pub use upload::Upload;

/// The most records fetched for one question in indexed mode.
const MAX_INDEXED_RECORDS: u32 = 1024;

////////////////////////////////////////////////////////////////////////
// CONFIGURATION                                                      //
////////////////////////////////////////////////////////////////////////

/// How records are read from the ledger.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// Each zone is a single record blob at the node of its apex. The
    /// blob is decoded and searched with a [`ZoneTree`].
    #[default]
    Zone,

    /// Records are stored per name and fetched one at a time by type,
    /// class, and index.
    Indexed,
}

/// Where the registry address comes from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RegistrySource {
    /// Every name is looked up in this registry.
    Fixed(Address),

    /// The registry is named by the nameserver the DNS delegates the
    /// zone to (see [`authority`]).
    #[default]
    Discover,
}

/// The configuration of a [`Gateway`].
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub mode: Mode,
    pub registry: RegistrySource,

    /// The suffix of authority host names.
    pub suffix: Name,

    /// The servers the authority search starts from.
    pub servers: Vec<Name>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            registry: RegistrySource::default(),
            suffix: authority::DEFAULT_SUFFIX.parse().unwrap_or_else(|_| Name::root()),
            servers: authority::root_servers(),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// GATEWAY                                                            //
////////////////////////////////////////////////////////////////////////

/// Resolves questions against the ledger and uploads zones to it.
///
/// A `Gateway` holds no mutable state, so one instance is shared by
/// every query task.
pub struct Gateway {
    ledger: Arc<dyn Ledger>,
    transport: Arc<dyn Transport>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(ledger: Arc<dyn Ledger>, transport: Arc<dyn Transport>, config: GatewayConfig) -> Self {
        Self {
            ledger,
            transport,
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Answers `question`. The returned records are owned by the
    /// QNAME. An empty list means there is nothing to answer with.
    pub async fn resolve(&self, question: &Question) -> Result<Vec<Record>, Error> {
        debug!("Resolving {} in {:?} mode", question, self.config.mode);
        match self.config.mode {
            Mode::Zone => self.resolve_in_zone(question).await,
            Mode::Indexed => self.resolve_indexed(question).await,
        }
    }

    /// Returns the registry to use for `qname`, along with the name of
    /// the zone apex.
    async fn locate(&self, qname: &Name) -> Result<(Address, Name), Error> {
        match self.config.registry {
            RegistrySource::Fixed(registry) => Ok((registry, qname.clone())),
            RegistrySource::Discover => {
                let authority = find_authority(
                    self.transport.as_ref(),
                    &self.config.servers,
                    qname,
                    &self.config.suffix,
                )
                .await?;
                let registry = parse_authority_hostname(&authority.host, &self.config.suffix)?;
                debug!(
                    "Zone {} is served by {} (registry {})",
                    authority.owner, authority.host, registry
                );
                Ok((registry, authority.owner))
            }
        }
    }

    async fn resolver(&self, registry: Address, node: NodeId) -> Result<Address, Error> {
        let resolver = self.ledger.resolver_of(registry, node).await?;
        if resolver.is_zero() {
            Err(Error::NoResolver)
        } else {
            Ok(resolver)
        }
    }

    async fn resolve_in_zone(&self, question: &Question) -> Result<Vec<Record>, Error> {
        let (registry, apex) = self.locate(&question.qname).await?;
        let node = NodeId::of(&apex);
        let resolver = self.resolver(registry, node).await?;
        let blob = self.ledger.raw_records_of(resolver, node).await?;
        let records = codec::decode(&blob)?;
        debug!("Zone {} ({}) has {} records", apex, node, records.len());
        Ok(ZoneTree::build(records).resolve(question))
    }

    async fn resolve_indexed(&self, question: &Question) -> Result<Vec<Record>, Error> {
        let (registry, _) = self.locate(&question.qname).await?;
        let node = NodeId::of(&question.qname);
        let resolver = self.resolver(registry, node).await?;
        let ttl = Ttl::from(self.ledger.ttl_of(registry, node).await?);

        let answers = self
            .fetch_indexed(resolver, node, question, question.qtype, ttl)
            .await?;
        if answers.is_empty() && question.qtype != Qtype::CNAME && question.qtype != Qtype::ANY {
            self.fetch_indexed(resolver, node, question, Qtype::CNAME, ttl)
                .await
        } else {
            Ok(answers)
        }
    }

    async fn fetch_indexed(
        &self,
        resolver: Address,
        node: NodeId,
        question: &Question,
        qtype: Qtype,
        ttl: Ttl,
    ) -> Result<Vec<Record>, Error> {
        let mut records = Vec::new();
        for index in 0..MAX_INDEXED_RECORDS {
            let found = self
                .ledger
                .record_at(resolver, node, qtype, question.qclass, index)
                .await?;
            match found {
                Some(indexed) => records.push(Record {
                    owner: question.qname.clone(),
                    rr_type: indexed.rr_type,
                    class: indexed.class,
                    ttl,
                    rdata: indexed.rdata,
                }),
                None => return Ok(records),
            }
        }
        warn!(
            "Stopped reading records for {} {} after {}",
            question.qname, qtype, MAX_INDEXED_RECORDS
        );
        Ok(records)
    }

    /// Writes the records of `upload` to the ledger.
    ///
    /// If the zone apex has no resolver yet, it is set to
    /// `default_resolver` first; without one, this fails with
    /// [`Error::NoResolver`]. Returns the hash of the transaction that
    /// stores the records.
    pub async fn upload(
        &self,
        upload: &Upload,
        default_resolver: Option<Address>,
    ) -> Result<TxHash, Error> {
        let blob = codec::encode(upload.records())?;
        let registry = upload.registry();
        let node = NodeId::of(upload.apex());

        let mut folded = upload.apex().clone();
        folded.make_ascii_lowercase();
        if folded.wire_repr() != upload.apex().wire_repr() {
            warn!(
                "Zone apex {} has uppercase letters; storing it under the node of {}",
                upload.apex(),
                folded
            );
        }

        let mut resolver = self.ledger.resolver_of(registry, node).await?;
        if resolver.is_zero() {
            let default = default_resolver.ok_or(Error::NoResolver)?;
            let tx = self.ledger.set_resolver(registry, node, default).await?;
            info!(
                "Set resolver of {} to {} in transaction {}",
                upload.apex(),
                default,
                tx
            );
            resolver = default;
        }

        info!(
            "Setting {} records ({} octets) for {} at resolver {}",
            upload.records().len(),
            blob.len(),
            upload.apex(),
            resolver
        );
        Ok(self.ledger.set_raw_records(resolver, node, &blob).await?)
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a question could not be answered, or a zone
/// could not be uploaded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    Authority(authority::Error),
    Ledger(ledger::Error),
    Codec(codec::Error),

    /// The node has no resolver.
    NoResolver,

    /// The zone to upload has no SOA record.
    NoSoa,

    /// The zone to upload has more than one SOA record.
    MultipleSoa,

    /// A nameserver name does not encode a registry address.
    BadAuthorityFormat,
}

impl From<authority::Error> for Error {
    fn from(err: authority::Error) -> Self {
        match err {
            authority::Error::BadAuthorityFormat => Self::BadAuthorityFormat,
            err => Self::Authority(err),
        }
    }
}

impl From<ledger::Error> for Error {
    fn from(err: ledger::Error) -> Self {
        Self::Ledger(err)
    }
}

impl From<codec::Error> for Error {
    fn from(err: codec::Error) -> Self {
        Self::Codec(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Authority(err) => write!(f, "failed to find authority: {}", err),
            Self::Ledger(err) => err.fmt(f),
            Self::Codec(err) => err.fmt(f),
            Self::NoResolver => f.write_str("no resolver is set"),
            Self::NoSoa => f.write_str("zone has no SOA record"),
            Self::MultipleSoa => f.write_str("zone has more than one SOA record"),
            Self::BadAuthorityFormat => {
                f.write_str("nameserver name does not start with a 40-digit hexadecimal address")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Authority(err) => Some(err),
            Self::Ledger(err) => Some(err),
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }
}
