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

//! The message-processing logic of the gateway's DNS front end.
//!
//! The [`Server`] structure is the heart of this module; see its
//! documentation for details.

use std::fmt;
use std::net::IpAddr;

use log::{debug, warn};

use crate::gateway::Gateway;
use crate::message::{writer, ExtendedRcode, Opcode, Rcode, Reader, Writer};
use crate::rr::Type;

/// The EDNS UDP payload size advertised by default. This follows the
/// DNS Flag Day 2020 recommendation.
pub const DEFAULT_EDNS_UDP_PAYLOAD_SIZE: u16 = 1232;

////////////////////////////////////////////////////////////////////////
// SERVER PUBLIC API AND CORE MESSAGE-HANDLING LOGIC                  //
////////////////////////////////////////////////////////////////////////

/// A DNS server answering from the ledger, abstracted from any
/// underlying network I/O provider.
///
/// The [`Server`] receives, parses, and responds to DNS messages
/// through the [`Server::handle_message`] method. An I/O provider (see
/// [`io`](crate::io)) is responsible for receiving these messages from
/// the network and then sending the responses that the [`Server`]
/// produces. Answers come from the [`Gateway`].
pub struct Server {
    gateway: Gateway,
    edns_udp_payload_size: u16,
}

impl Server {
    /// Creates a new [`Server`] answering through `gateway`.
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            edns_udp_payload_size: DEFAULT_EDNS_UDP_PAYLOAD_SIZE,
        }
    }

    /// Returns the [`Gateway`] that answers questions.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Returns the EDNS UDP payload size that the server advertises.
    pub fn edns_udp_payload_size(&self) -> u16 {
        self.edns_udp_payload_size
    }

    /// Sets the EDNS UDP payload size. Sizes below 512 octets are
    /// rejected.
    pub fn set_edns_udp_payload_size(&mut self, size: u16) -> Result<(), InvalidPayloadSizeError> {
        if size >= 512 {
            self.edns_udp_payload_size = size;
            Ok(())
        } else {
            Err(InvalidPayloadSizeError)
        }
    }

    /// Handles a received DNS message. This is the API through which
    /// I/O providers submit messages.
    ///
    /// `received_buf` contains the message received, and `received_info`
    /// provides additional information about it (see [`ReceivedInfo`]).
    /// `response_buf` is a buffer into which a response message may be
    /// serialized. For UDP transport, it must be at least
    /// [`Server::edns_udp_payload_size`] octets long; for TCP, 65,535
    /// octets. If it is shorter, this method panics.
    ///
    /// A [`Response`] is returned, signifying whether a response is to
    /// be sent and, if so, how long the response message written into
    /// `response_buf` is.
    pub async fn handle_message(
        &self,
        received_buf: &[u8],
        received_info: ReceivedInfo,
        response_buf: &mut [u8],
    ) -> Response {
        let min_response_buf_size = match received_info.transport {
            Transport::Tcp => u16::MAX as usize,
            Transport::Udp => self.edns_udp_payload_size as usize,
        };
        if response_buf.len() < min_response_buf_size {
            panic!("the response buffer is not large enough");
        }

        // Messages without a full header, and responses, are ignored.
        let mut received = match Reader::try_from(received_buf) {
            Ok(r) => r,
            Err(_) => return Response::None,
        };
        if received.qr() {
            return Response::None;
        }

        let response_size_limit = match received_info.transport {
            Transport::Tcp => u16::MAX as usize,
            Transport::Udp => 512,
        };
        let mut response = match Writer::new(response_buf, response_size_limit) {
            Ok(w) => w,
            Err(_) => return Response::None,
        };
        response.set_id(received.id());
        response.set_qr(true);
        response.set_opcode(received.opcode());
        if received.opcode() == Opcode::Query {
            // RD is only defined for opcode QUERY.
            response.set_rd(received.rd());
        }

        self.handle_query(&mut received, received_info, &mut response)
            .await;
        Response::Single(response.finish())
    }

    /// Continues [`Server::handle_message`] once the header of the
    /// response has been set up.
    async fn handle_query(
        &self,
        received: &mut Reader<'_>,
        received_info: ReceivedInfo,
        response: &mut Writer<'_>,
    ) {
        if received.opcode() != Opcode::Query {
            response.set_rcode(Rcode::NotImp);
            return;
        }

        let mut questions = Vec::with_capacity(received.qdcount() as usize);
        for _ in 0..received.qdcount() {
            let question = match received.read_question() {
                Ok(q) => q,
                Err(_) => {
                    response.set_rcode(Rcode::FormErr);
                    return;
                }
            };
            if response.add_question(&question).is_err() {
                response.set_rcode(Rcode::ServFail);
                return;
            }
            questions.push(question);
        }

        // RFC 6891 § 6.1.1 puts the OPT record in the additional
        // section, so seeing it earlier is a FORMERR.
        let an_plus_ns_count = received.ancount() as usize + received.nscount() as usize;
        for _ in 0..an_plus_ns_count {
            match received.read_rr() {
                Ok(rr) if rr.rr_type != Type::OPT => (),
                _ => {
                    response.set_rcode(Rcode::FormErr);
                    return;
                }
            }
        }

        let mut seen_opt = false;
        for _ in 0..received.arcount() {
            let rr = match received.read_rr() {
                Ok(rr) => rr,
                Err(_) => {
                    response.set_rcode(Rcode::FormErr);
                    return;
                }
            };
            if rr.rr_type != Type::OPT {
                continue;
            } else if seen_opt {
                response.set_rcode(Rcode::FormErr);
                return;
            }
            seen_opt = true;

            // Once an OPT record is seen the response is EDNS, even if
            // the OPT record is invalid (RFC 6891 § 7).
            if response.set_edns(self.edns_udp_payload_size).is_err() {
                response.set_rcode(Rcode::ServFail);
                return;
            }

            // Payload sizes below 512 are treated as 512
            // (RFC 6891 § 6.2.5).
            if received_info.transport == Transport::Udp {
                let their_limit = u16::from(rr.class);
                let negotiated_limit = their_limit.min(self.edns_udp_payload_size).max(512);
                response.set_limit(negotiated_limit as usize);
            }

            if !rr.owner.is_root() {
                response.set_rcode(Rcode::FormErr);
                return;
            }
            let version = (u32::from(rr.ttl) >> 16) as u8;
            if version != 0 {
                if response.set_extended_rcode(ExtendedRcode::BadVers).is_err() {
                    response.set_rcode(Rcode::ServFail);
                }
                return;
            }
        }

        if !received.at_eom() {
            response.set_rcode(Rcode::FormErr);
            return;
        }

        for question in &questions {
            let answers = match self.gateway.resolve(question).await {
                Ok(answers) => answers,
                Err(e) => {
                    warn!(
                        "Failed to resolve {} for {}: {}",
                        question, received_info.source, e
                    );
                    response.set_rcode(Rcode::ServFail);
                    return;
                }
            };
            for answer in &answers {
                match response.add_answer(answer) {
                    Ok(()) => (),
                    Err(writer::Error::Truncation) => {
                        debug!("Response to {} truncated", question);
                        response.set_tc(true);
                        return;
                    }
                    Err(e) => {
                        warn!("Failed to add {} to response: {}", answer, e);
                        response.set_rcode(Rcode::ServFail);
                        return;
                    }
                }
            }
            response.set_aa(true);
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Server")
            .field("gateway", &self.gateway)
            .field("edns_udp_payload_size", &self.edns_udp_payload_size)
            .finish()
    }
}

/// Provides network-related information about a received DNS message to
/// [`Server::handle_message`].
#[derive(Clone, Copy, Debug)]
pub struct ReceivedInfo {
    source: IpAddr,
    transport: Transport,
}

impl ReceivedInfo {
    /// Creates a new [`ReceivedInfo`].
    ///
    /// IPv4-mapped IPv6 addresses of the kind that dual-stack sockets
    /// produce (e.g. `::ffff:127.0.0.1`) are interpreted as IPv4
    /// addresses, so calling I/O code need not concern itself with
    /// this.
    pub fn new(source: IpAddr, transport: Transport) -> Self {
        Self {
            source: source.to_canonical(),
            transport,
        }
    }
}

/// Indicates the transport through which a DNS message was received.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Transport {
    Tcp,
    Udp,
}

/// Indicates to the caller of [`Server::handle_message`] what kind of
/// response needs to be sent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Response {
    /// A single response is to be sent. The response has been written
    /// into the provided buffer. The length of the response is
    /// included.
    Single(usize),

    /// No response is to be sent.
    None,
}

/// An error signaling that an EDNS UDP payload size below 512 octets
/// was requested.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InvalidPayloadSizeError;

impl fmt::Display for InvalidPayloadSizeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid EDNS UDP payload size (the minimum is 512 octets)")
    }
}

impl std::error::Error for InvalidPayloadSizeError {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    use super::*;
    use crate::authority::UdpTransport;
    use crate::class::Class;
    use crate::codec;
    use crate::gateway::{GatewayConfig, RegistrySource};
    use crate::ledger::memory::MemoryLedger;
    use crate::ledger::Address;
    use crate::message::{Qclass, Qtype, Question};
    use crate::name::Name;
    use crate::namehash::NodeId;
    use crate::rr::{Rdata, Record, Ttl};

    fn registry() -> Address {
        Address::from([0x22; 20])
    }

    fn resolver() -> Address {
        Address::from([0x11; 20])
    }

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    fn record(owner: &str, rr_type: Type, rdata: &[u8]) -> Record {
        Record {
            owner: name(owner),
            rr_type,
            class: Class::IN,
            ttl: Ttl::from(300u32),
            rdata: Rdata::try_from(rdata).unwrap(),
        }
    }

    fn question(qname: &str, rr_type: Type) -> Question {
        Question {
            qname: name(qname),
            qtype: Qtype::from(rr_type),
            qclass: Qclass::IN,
        }
    }

    /// Returns a ledger holding `records` as the zone of example.eth.
    fn ledger_with(records: &[Record]) -> MemoryLedger {
        let apex = NodeId::of(&name("example.eth."));
        MemoryLedger::new()
            .with_resolver(registry(), apex, resolver())
            .with_blob(resolver(), apex, codec::encode(records).unwrap())
    }

    fn server(ledger: MemoryLedger) -> Server {
        Server::new(Gateway::new(
            Arc::new(ledger),
            Arc::new(UdpTransport::default()),
            GatewayConfig {
                registry: RegistrySource::Fixed(registry()),
                ..GatewayConfig::default()
            },
        ))
    }

    fn default_server() -> Server {
        server(ledger_with(&[
            record("example.eth.", Type::A, b"\x0a\x00\x00\x01"),
            record("example.eth.", Type::A, b"\x0a\x00\x00\x02"),
        ]))
    }

    /// Builds a query, letting `f` adjust it before it is finished.
    fn query<F>(questions: &[Question], f: F) -> Vec<u8>
    where
        F: FnOnce(&mut Writer),
    {
        let mut buf = vec![0; 512];
        let mut writer = Writer::new(&mut buf, 512).unwrap();
        writer.set_id(0x1234);
        writer.set_opcode(Opcode::Query);
        writer.set_rd(true);
        for question in questions {
            writer.add_question(question).unwrap();
        }
        f(&mut writer);
        let len = writer.finish();
        buf.truncate(len);
        buf
    }

    async fn exchange(server: &Server, query: &[u8], transport: Transport) -> Option<Vec<u8>> {
        let received_info = ReceivedInfo::new(Ipv4Addr::LOCALHOST.into(), transport);
        let mut buf = vec![0; u16::MAX as usize];
        match server.handle_message(query, received_info, &mut buf).await {
            Response::Single(len) => Some(buf[..len].to_vec()),
            Response::None => None,
        }
    }

    #[test]
    fn set_edns_udp_payload_size_enforces_min() {
        let mut server = default_server();
        assert!(server.set_edns_udp_payload_size(256).is_err());
        assert!(server.set_edns_udp_payload_size(4096).is_ok());
        assert_eq!(server.edns_udp_payload_size(), 4096);
    }

    #[tokio::test]
    #[should_panic(expected = "the response buffer is not large enough")]
    async fn handle_message_rejects_short_buffers() {
        let server = default_server();
        let received_info = ReceivedInfo::new(Ipv4Addr::LOCALHOST.into(), Transport::Tcp);
        let mut not_quite_large_enough = [0; u16::MAX as usize - 1];
        server
            .handle_message(&[], received_info, &mut not_quite_large_enough)
            .await;
    }

    #[test]
    fn received_info_constructor_canonicalizes_ipv4_mapped_ipv6_addrs() {
        let ipv4_mapped_ipv6 = "::ffff:127.0.0.1".parse().unwrap();
        let received_info = ReceivedInfo::new(ipv4_mapped_ipv6, Transport::Udp);
        assert_eq!(received_info.source, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn answers_are_authoritative() {
        let server = default_server();
        let query = query(&[question("example.eth.", Type::A)], |_| ());
        let response = exchange(&server, &query, Transport::Udp).await.unwrap();
        let mut reader = Reader::try_from(response.as_slice()).unwrap();
        assert_eq!(reader.id(), 0x1234);
        assert!(reader.qr());
        assert!(reader.aa());
        assert!(reader.rd());
        assert!(!reader.tc());
        assert_eq!(reader.rcode(), Rcode::NoError);
        assert_eq!(reader.qdcount(), 1);
        assert_eq!(reader.ancount(), 2);
        assert_eq!(reader.read_question().unwrap(), question("example.eth.", Type::A));
        assert_eq!(
            reader.read_rr().unwrap(),
            record("example.eth.", Type::A, b"\x0a\x00\x00\x01")
        );
    }

    #[tokio::test]
    async fn every_question_is_answered() {
        let server = server(ledger_with(&[
            record("example.eth.", Type::A, b"\x0a\x00\x00\x01"),
            record("example.eth.", Type::TXT, b"\x02hi"),
        ]));
        let query = query(
            &[
                question("example.eth.", Type::A),
                question("example.eth.", Type::TXT),
            ],
            |_| (),
        );
        let response = exchange(&server, &query, Transport::Tcp).await.unwrap();
        let reader = Reader::try_from(response.as_slice()).unwrap();
        assert_eq!(reader.qdcount(), 2);
        assert_eq!(reader.ancount(), 2);
    }

    #[tokio::test]
    async fn resolution_failure_is_servfail() {
        let server = server(MemoryLedger::failing());
        let query = query(&[question("example.eth.", Type::A)], |_| ());
        let response = exchange(&server, &query, Transport::Udp).await.unwrap();
        let reader = Reader::try_from(response.as_slice()).unwrap();
        assert_eq!(reader.rcode(), Rcode::ServFail);
        assert!(!reader.aa());
        assert_eq!(reader.ancount(), 0);
    }

    #[tokio::test]
    async fn missing_resolver_is_servfail() {
        let server = server(MemoryLedger::new());
        let query = query(&[question("example.eth.", Type::A)], |_| ());
        let response = exchange(&server, &query, Transport::Udp).await.unwrap();
        let reader = Reader::try_from(response.as_slice()).unwrap();
        assert_eq!(reader.rcode(), Rcode::ServFail);
    }

    #[tokio::test]
    async fn responses_and_short_messages_are_ignored() {
        let server = default_server();
        let mut response = query(&[question("example.eth.", Type::A)], |w| w.set_qr(true));
        assert_eq!(exchange(&server, &response, Transport::Udp).await, None);
        response.truncate(11);
        assert_eq!(exchange(&server, &response, Transport::Udp).await, None);
    }

    #[tokio::test]
    async fn other_opcodes_are_not_implemented() {
        let server = default_server();
        let query = query(&[question("example.eth.", Type::A)], |w| {
            w.set_opcode(Opcode::Notify)
        });
        let response = exchange(&server, &query, Transport::Udp).await.unwrap();
        let reader = Reader::try_from(response.as_slice()).unwrap();
        assert_eq!(reader.rcode(), Rcode::NotImp);
        assert_eq!(reader.opcode(), Opcode::Notify);
        assert!(!reader.rd());
        assert_eq!(reader.qdcount(), 0);
    }

    #[tokio::test]
    async fn malformed_question_is_formerr() {
        let server = default_server();
        let mut query = query(&[], |_| ());
        query[5] = 1;
        query.extend_from_slice(b"\x07example");
        let response = exchange(&server, &query, Transport::Udp).await.unwrap();
        let reader = Reader::try_from(response.as_slice()).unwrap();
        assert_eq!(reader.rcode(), Rcode::FormErr);
    }

    #[tokio::test]
    async fn edns_is_echoed() {
        let server = default_server();
        let query = query(&[question("example.eth.", Type::A)], |w| {
            w.set_edns(4096).unwrap()
        });
        let response = exchange(&server, &query, Transport::Udp).await.unwrap();
        let mut reader = Reader::try_from(response.as_slice()).unwrap();
        assert_eq!(reader.rcode(), Rcode::NoError);
        assert_eq!(reader.arcount(), 1);
        reader.read_question().unwrap();
        reader.read_rr().unwrap();
        reader.read_rr().unwrap();
        let opt = reader.read_rr().unwrap();
        assert_eq!(opt.rr_type, Type::OPT);
        assert_eq!(u16::from(opt.class), DEFAULT_EDNS_UDP_PAYLOAD_SIZE);
    }

    #[tokio::test]
    async fn unknown_edns_version_is_badvers() {
        let server = default_server();
        let mut query = query(&[question("example.eth.", Type::A)], |w| {
            w.set_edns(4096).unwrap()
        });
        // The version is the second octet of the OPT record's TTL.
        let len = query.len();
        query[len - 5] = 1;
        let response = exchange(&server, &query, Transport::Udp).await.unwrap();
        let mut reader = Reader::try_from(response.as_slice()).unwrap();
        assert_eq!(reader.ancount(), 0);
        reader.read_question().unwrap();
        let opt = reader.read_rr().unwrap();
        assert_eq!(u32::from(opt.ttl) >> 24, 1);
    }

    #[tokio::test]
    async fn second_opt_is_formerr() {
        let server = default_server();
        let mut query = query(&[question("example.eth.", Type::A)], |w| {
            w.set_edns(4096).unwrap()
        });
        let len = query.len();
        let opt = query[len - 11..].to_vec();
        query.extend_from_slice(&opt);
        query[11] = 2;
        let response = exchange(&server, &query, Transport::Udp).await.unwrap();
        let reader = Reader::try_from(response.as_slice()).unwrap();
        assert_eq!(reader.rcode(), Rcode::FormErr);
    }

    #[tokio::test]
    async fn oversized_udp_response_is_truncated() {
        let mut txt = vec![63u8];
        txt.extend_from_slice(&[b'x'; 63]);
        let records: Vec<Record> = (0..20)
            .map(|_| record("example.eth.", Type::TXT, &txt))
            .collect();
        let server = server(ledger_with(&records));
        let query = query(&[question("example.eth.", Type::TXT)], |_| ());

        let response = exchange(&server, &query, Transport::Udp).await.unwrap();
        assert!(response.len() <= 512);
        let reader = Reader::try_from(response.as_slice()).unwrap();
        assert!(reader.tc());
        assert!(reader.ancount() < 20);

        let response = exchange(&server, &query, Transport::Tcp).await.unwrap();
        let reader = Reader::try_from(response.as_slice()).unwrap();
        assert!(!reader.tc());
        assert_eq!(reader.ancount(), 20);
    }
}
