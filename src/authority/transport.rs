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

//! Outbound NS queries used by the authority search.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::net::{lookup_host, UdpSocket};

use super::AuthorityRecord;
use crate::class::Class;
use crate::message::{Opcode, Qclass, Question, Rcode, Reader, Writer};
use crate::name::Name;
use crate::rr::Type;

/// The default time to wait for a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The largest reply accepted. Queries are sent without EDNS, so this
/// is the classic UDP limit.
const MAX_REPLY_SIZE: usize = 512;

/// Something that can ask a nameserver for the NS records of a name.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a non-recursive NS query for `name` to the nameserver
    /// `server`.
    async fn query_ns(&self, server: &Name, name: &Name) -> Result<Reply, TransportError>;
}

/// The parts of an NS reply that the authority search looks at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    pub rcode: Rcode,

    /// NS records from the answer and authority sections, in order.
    pub ns_records: Vec<AuthorityRecord>,
}

////////////////////////////////////////////////////////////////////////
// UDP TRANSPORT                                                      //
////////////////////////////////////////////////////////////////////////

/// A [`Transport`] that sends each query from a fresh UDP socket.
///
/// Server names are resolved with the system resolver. Replies whose
/// ID does not match the query are discarded; if no matching reply
/// arrives within the timeout, the query fails with
/// [`TransportError::Timeout`].
#[derive(Clone, Debug)]
pub struct UdpTransport {
    port: u16,
    timeout: Duration,
}

impl UdpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { port: 53, timeout }
    }

    /// Sends queries to `port` instead of 53.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn resolve_server(&self, server: &Name) -> Result<SocketAddr, TransportError> {
        let text = server.to_string();
        let host = text.strip_suffix('.').unwrap_or(&text).to_owned();
        lookup_host((host, self.port))
            .await
            .map_err(|e| TransportError::Other(format!("failed to resolve {}: {}", server, e)))?
            .next()
            .ok_or_else(|| TransportError::Other(format!("no addresses for {}", server)))
    }

    async fn exchange(&self, addr: SocketAddr, id: u16, query: &[u8]) -> Result<Reply, TransportError> {
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await.map_err(other)?;
        socket.connect(addr).await.map_err(other)?;
        socket.send(query).await.map_err(other)?;

        let mut buf = [0; MAX_REPLY_SIZE];
        loop {
            let len = socket.recv(&mut buf).await.map_err(other)?;
            match Reader::try_from(&buf[..len]) {
                Ok(reader) if reader.id() == id && reader.qr() => return parse_reply(reader),
                _ => debug!("Discarding unexpected UDP message from {}", addr),
            }
        }
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn query_ns(&self, server: &Name, name: &Name) -> Result<Reply, TransportError> {
        let id = rand::random();
        let mut buf = [0; MAX_REPLY_SIZE];
        let len = build_query(&mut buf, id, name)?;
        tokio::time::timeout(self.timeout, async {
            let addr = self.resolve_server(server).await?;
            debug!("Querying {} ({}) for {} NS", server, addr, name);
            self.exchange(addr, id, &buf[..len]).await
        })
        .await
        .map_err(|_| TransportError::Timeout)?
    }
}

/// Writes a non-recursive `name IN NS` query into `buf`, returning its
/// length.
fn build_query(buf: &mut [u8], id: u16, name: &Name) -> Result<usize, TransportError> {
    let limit = buf.len();
    let mut writer = Writer::new(buf, limit).map_err(other)?;
    writer.set_id(id);
    writer.set_opcode(Opcode::Query);
    writer.set_rd(false);
    writer
        .add_question(&Question {
            qname: name.clone(),
            qtype: Type::NS.into(),
            qclass: Qclass::from(Class::IN),
        })
        .map_err(other)?;
    Ok(writer.finish())
}

/// Extracts the RCODE and NS records of a reply.
fn parse_reply(mut reader: Reader) -> Result<Reply, TransportError> {
    for _ in 0..reader.qdcount() {
        reader.read_question().map_err(other)?;
    }
    let mut ns_records = Vec::new();
    let n_records = reader.ancount() as usize + reader.nscount() as usize;
    for _ in 0..n_records {
        let record = reader.read_rr().map_err(other)?;
        if record.rr_type == Type::NS {
            let (host, _) = Name::try_from_uncompressed(record.rdata.octets()).map_err(other)?;
            ns_records.push(AuthorityRecord {
                owner: record.owner,
                host,
            });
        }
    }
    Ok(Reply {
        rcode: reader.rcode(),
        ns_records,
    })
}

fn other(err: impl fmt::Display) -> TransportError {
    TransportError::Other(err.to_string())
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that an NS query failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TransportError {
    /// No reply arrived in time. The authority search moves on to the
    /// next server.
    Timeout,

    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("query timed out"),
            Self::Other(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Qtype;

    #[test]
    fn query_is_non_recursive_ns() {
        let mut buf = [0; MAX_REPLY_SIZE];
        let name: Name = "example.eth.".parse().unwrap();
        let len = build_query(&mut buf, 0x1234, &name).unwrap();
        let mut reader = Reader::try_from(&buf[..len]).unwrap();
        assert_eq!(reader.id(), 0x1234);
        assert!(!reader.qr());
        assert!(!reader.rd());
        assert_eq!(reader.qdcount(), 1);
        let question = reader.read_question().unwrap();
        assert_eq!(question.qname, name);
        assert_eq!(question.qtype, Qtype::from(Type::NS));
    }

    #[test]
    fn reply_ns_records_are_collected() {
        // Referral from a TLD server: one question, no answers, two NS
        // records in the authority section.
        let reply: &[u8] = b"\x12\x34\x80\x00\x00\x01\x00\x00\x00\x02\x00\x00\
            \x07example\x03eth\x00\x00\x02\x00\x01\
            \xc0\x0c\x00\x02\x00\x01\x00\x00\x0e\x10\x00\x06\x03ns1\xc0\x14\
            \xc0\x0c\x00\x02\x00\x01\x00\x00\x0e\x10\x00\x06\x03ns2\xc0\x14";
        let parsed = parse_reply(Reader::try_from(reply).unwrap()).unwrap();
        assert_eq!(parsed.rcode, Rcode::NoError);
        let hosts: Vec<String> = parsed.ns_records.iter().map(|r| r.host.to_string()).collect();
        assert_eq!(hosts, ["ns1.eth.", "ns2.eth."]);
        assert_eq!(parsed.ns_records[0].owner.to_string(), "example.eth.");
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // Nothing answers on the bound port.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = silent.local_addr().unwrap().port();
        let transport = UdpTransport::new(Duration::from_millis(50)).with_port(port);
        let server: Name = "127.0.0.1.".parse().unwrap();
        let name: Name = "example.eth.".parse().unwrap();
        assert_eq!(
            transport.query_ns(&server, &name).await,
            Err(TransportError::Timeout)
        );
    }
}
