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

//! Discovery of the nameserver responsible for a name.
//!
//! Zones served from the ledger are delegated in the ordinary DNS to
//! nameservers named `<registry>.<suffix>`, where `<registry>` is the
//! hexadecimal address of the registry contract that holds the zone.
//! [`find_authority`] walks down the delegation chain from a set of
//! bootstrap servers until it meets such a nameserver, and
//! [`parse_authority_hostname`] recovers the registry address from its
//! name.

use std::fmt;

use log::debug;

use crate::ledger::Address;
use crate::message::Rcode;
use crate::name::Name;

mod transport;
pub use transport::{Reply, Transport, TransportError, UdpTransport, DEFAULT_TIMEOUT};

/// The DNS root servers, the default bootstrap servers.
pub const ROOT_SERVERS: [&str; 13] = [
    "a.root-servers.net.",
    "b.root-servers.net.",
    "c.root-servers.net.",
    "d.root-servers.net.",
    "e.root-servers.net.",
    "f.root-servers.net.",
    "g.root-servers.net.",
    "h.root-servers.net.",
    "i.root-servers.net.",
    "j.root-servers.net.",
    "k.root-servers.net.",
    "l.root-servers.net.",
    "m.root-servers.net.",
];

/// The default suffix of authority host names.
pub const DEFAULT_SUFFIX: &str = "ens.domains.";

/// The number of referrals followed before giving up.
const MAX_REFERRALS: usize = 32;

/// An NS record: `owner` is delegated to the nameserver `host`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AuthorityRecord {
    pub owner: Name,
    pub host: Name,
}

/// Returns [`ROOT_SERVERS`] as [`Name`]s.
pub fn root_servers() -> Vec<Name> {
    ROOT_SERVERS
        .iter()
        .filter_map(|server| server.parse().ok())
        .collect()
}

/// Finds the NS record delegating `name` to a nameserver under
/// `suffix`.
///
/// Servers are asked in order. A server that times out is skipped. A
/// server that replies with NS records of its own (a referral) replaces
/// the whole server list, and the search continues with the referred
/// servers only. A reply with no NS records moves the search on to the
/// next server. Any other failure ends the search.
pub async fn find_authority(
    transport: &dyn Transport,
    servers: &[Name],
    name: &Name,
    suffix: &Name,
) -> Result<AuthorityRecord, Error> {
    let mut servers = servers.to_vec();
    for _ in 0..=MAX_REFERRALS {
        let mut referral = None;
        for server in &servers {
            let reply = match transport.query_ns(server, name).await {
                Ok(reply) => reply,
                Err(TransportError::Timeout) => {
                    debug!("NS query for {} to {} timed out", name, server);
                    continue;
                }
                Err(err) => return Err(Error::Transport(err)),
            };
            if reply.rcode != Rcode::NoError {
                return Err(Error::ErrorResponse(reply.rcode));
            }
            if let Some(found) = reply
                .ns_records
                .iter()
                .find(|ns| ns.host.strict_subdomain_of(suffix))
            {
                debug!("Authority for {} is {}", name, found.host);
                return Ok(found.clone());
            }
            if !reply.ns_records.is_empty() {
                referral = Some(reply.ns_records.into_iter().map(|ns| ns.host).collect());
                break;
            }
        }
        match referral {
            Some(next) => servers = next,
            None => return Err(Error::NotFound),
        }
    }
    Err(Error::TooManyReferrals)
}

/// Extracts the registry address from an authority host name. The
/// first label must be exactly 40 hexadecimal digits, and the rest of
/// the name must be `suffix` or below it.
pub fn parse_authority_hostname(host: &Name, suffix: &Name) -> Result<Address, Error> {
    if !host.strict_subdomain_of(suffix) {
        return Err(Error::BadAuthorityFormat);
    }
    let label = host.label(0).octets();
    if label.len() != 40 || !label.iter().all(u8::is_ascii_hexdigit) {
        return Err(Error::BadAuthorityFormat);
    }
    std::str::from_utf8(label)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or(Error::BadAuthorityFormat)
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that no authority could be found for a name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    Transport(TransportError),
    ErrorResponse(Rcode),
    NotFound,
    TooManyReferrals,
    BadAuthorityFormat,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "NS query failed: {}", err),
            Self::ErrorResponse(rcode) => write!(f, "NS query answered with {}", rcode),
            Self::NotFound => f.write_str("all servers timed out"),
            Self::TooManyReferrals => f.write_str("too many referrals"),
            Self::BadAuthorityFormat => {
                f.write_str("nameserver name does not start with a 40-digit hexadecimal address")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    const REGISTRY: &str = "314159265dd8dbb310642f98f50c066173c1259b";

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    fn ns(owner: &str, host: &str) -> AuthorityRecord {
        AuthorityRecord {
            owner: name(owner),
            host: name(host),
        }
    }

    fn referral(records: Vec<AuthorityRecord>) -> Result<Reply, TransportError> {
        Ok(Reply {
            rcode: Rcode::NoError,
            ns_records: records,
        })
    }

    /// Answers from a fixed table keyed by server name, and records
    /// which servers were asked. Unknown servers time out.
    #[derive(Default)]
    struct MockTransport {
        replies: HashMap<String, Result<Reply, TransportError>>,
        asked: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn with(mut self, server: &str, reply: Result<Reply, TransportError>) -> Self {
            self.replies.insert(server.to_owned(), reply);
            self
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn query_ns(&self, server: &Name, _name: &Name) -> Result<Reply, TransportError> {
            let server = server.to_string();
            self.asked.lock().unwrap().push(server.clone());
            self.replies
                .get(&server)
                .cloned()
                .unwrap_or(Err(TransportError::Timeout))
        }
    }

    fn authority_host() -> String {
        format!("{}.ens.domains.", REGISTRY)
    }

    #[tokio::test]
    async fn follows_referrals_to_authority() {
        let transport = MockTransport::default()
            .with("b.root.", referral(vec![ns("eth.", "ns.tld.")]))
            .with(
                "ns.tld.",
                referral(vec![
                    ns("example.eth.", "ns.other."),
                    ns("example.eth.", &authority_host()),
                ]),
            );
        let found = find_authority(
            &transport,
            &[name("a.root."), name("b.root.")],
            &name("www.example.eth."),
            &name(DEFAULT_SUFFIX),
        )
        .await
        .unwrap();
        assert_eq!(found, ns("example.eth.", &authority_host()));
        assert_eq!(transport.asked(), ["a.root.", "b.root.", "ns.tld."]);
    }

    #[tokio::test]
    async fn referral_replaces_remaining_servers() {
        let transport = MockTransport::default()
            .with("a.root.", referral(vec![ns("eth.", "ns.tld.")]))
            .with(
                "b.root.",
                referral(vec![ns("example.eth.", &authority_host())]),
            );
        let result = find_authority(
            &transport,
            &[name("a.root."), name("b.root.")],
            &name("example.eth."),
            &name(DEFAULT_SUFFIX),
        )
        .await;
        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(transport.asked(), ["a.root.", "ns.tld."]);
    }

    #[tokio::test]
    async fn empty_reply_moves_to_next_server() {
        let transport = MockTransport::default()
            .with("a.root.", referral(Vec::new()))
            .with(
                "b.root.",
                referral(vec![ns("example.eth.", &authority_host())]),
            );
        let result = find_authority(
            &transport,
            &[name("a.root."), name("b.root.")],
            &name("example.eth."),
            &name(DEFAULT_SUFFIX),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn all_timeouts_is_not_found() {
        let transport = MockTransport::default();
        let result = find_authority(
            &transport,
            &root_servers(),
            &name("example.eth."),
            &name(DEFAULT_SUFFIX),
        )
        .await;
        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(transport.asked().len(), 13);
    }

    #[tokio::test]
    async fn error_rcode_is_fatal() {
        let transport = MockTransport::default().with(
            "a.root.",
            Ok(Reply {
                rcode: Rcode::NxDomain,
                ns_records: Vec::new(),
            }),
        );
        let result = find_authority(
            &transport,
            &[name("a.root."), name("b.root.")],
            &name("example.eth."),
            &name(DEFAULT_SUFFIX),
        )
        .await;
        assert_eq!(result, Err(Error::ErrorResponse(Rcode::NxDomain)));
    }

    #[tokio::test]
    async fn other_transport_errors_are_fatal() {
        let failure = TransportError::Other("connection refused".to_owned());
        let transport = MockTransport::default().with("a.root.", Err(failure.clone()));
        let result = find_authority(
            &transport,
            &[name("a.root."), name("b.root.")],
            &name("example.eth."),
            &name(DEFAULT_SUFFIX),
        )
        .await;
        assert_eq!(result, Err(Error::Transport(failure)));
    }

    #[tokio::test]
    async fn referral_loops_end() {
        let transport =
            MockTransport::default().with("a.root.", referral(vec![ns("eth.", "a.root.")]));
        let result = find_authority(
            &transport,
            &[name("a.root.")],
            &name("example.eth."),
            &name(DEFAULT_SUFFIX),
        )
        .await;
        assert_eq!(result, Err(Error::TooManyReferrals));
    }

    #[test]
    fn authority_hostname_gives_registry() {
        let suffix = name(DEFAULT_SUFFIX);
        let address = parse_authority_hostname(&name(&authority_host()), &suffix).unwrap();
        assert_eq!(address.to_string(), format!("0x{}", REGISTRY));
        let upper = authority_host().to_uppercase();
        assert_eq!(parse_authority_hostname(&name(&upper), &suffix), Ok(address));
    }

    #[test]
    fn bad_authority_hostnames_are_rejected() {
        let suffix = name(DEFAULT_SUFFIX);
        for host in [
            "ens.domains.",
            "ns1.ens.domains.",
            "314159265dd8dbb310642f98f50c066173c1259.ens.domains.",
            "314159265dd8dbb310642f98f50c066173c1259bb.ens.domains.",
            "zz4159265dd8dbb310642f98f50c066173c1259b.ens.domains.",
            "314159265dd8dbb310642f98f50c066173c1259b.example.com.",
        ] {
            assert_eq!(
                parse_authority_hostname(&name(host), &suffix),
                Err(Error::BadAuthorityFormat),
                "{}",
                host
            );
        }
    }

    #[test]
    fn root_servers_all_parse() {
        assert_eq!(root_servers().len(), ROOT_SERVERS.len());
    }
}
