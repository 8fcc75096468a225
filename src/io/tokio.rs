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

//! Implementation of the Tokio I/O provider.

// NOTE: I/O errors generally end the task that hit them. The
// run_with_respawning function acts as a supervisor that respawns the
// TCP acceptor and UDP receivers, possibly after a delay, if they exit
// with an error or a panic.

use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use crate::server::{ReceivedInfo, Response, Server, Transport};

/// A Tokio I/O provider.
///
/// This provider runs the server by spawning tasks on a Tokio runtime:
/// one per UDP message and one per TCP connection.
///
/// The `TokioIoProvider` supports graceful shutdown. To initiate a
/// graceful shutdown, use the [`TokioShutdownController`] returned by
/// [`TokioIoProvider::start`].
#[derive(Debug)]
pub struct TokioIoProvider {
    tcp_listeners: Vec<TcpListener>,
    udp_sockets: Vec<UdpSocket>,
}

impl TokioIoProvider {
    /// Creates a new `TokioIoProvider`. This call binds TCP and UDP
    /// sockets in preparation, but does not start the server. This
    /// function requires that the Tokio runtime be active.
    pub async fn bind<T, U>(tcp_addrs: T, udp_addrs: U) -> io::Result<Self>
    where
        T: IntoIterator<Item = SocketAddr>,
        U: IntoIterator<Item = SocketAddr>,
    {
        let mut tcp_listeners = Vec::new();
        for addr in tcp_addrs {
            tcp_listeners.push(TcpListener::bind(addr).await?);
        }
        let mut udp_sockets = Vec::new();
        for addr in udp_addrs {
            udp_sockets.push(UdpSocket::bind(addr).await?);
        }
        Ok(Self {
            tcp_listeners,
            udp_sockets,
        })
    }

    /// Returns the local addresses of the bound TCP listeners and then
    /// those of the UDP sockets. This is mostly useful when binding to
    /// port 0.
    pub fn local_addrs(&self) -> io::Result<(Vec<SocketAddr>, Vec<SocketAddr>)> {
        let tcp = self
            .tcp_listeners
            .iter()
            .map(TcpListener::local_addr)
            .collect::<io::Result<_>>()?;
        let udp = self
            .udp_sockets
            .iter()
            .map(UdpSocket::local_addr)
            .collect::<io::Result<_>>()?;
        Ok((tcp, udp))
    }

    /// Starts the server on the active Tokio runtime.
    ///
    /// The returned [`TokioShutdownController`] must be held as long as
    /// the server should be running, since dropping it triggers
    /// shutdown.
    pub fn start(self, server: &Arc<Server>) -> TokioShutdownController {
        let (shutdown_controller, shutdown_handle) = make_shutdown_channels();

        for tcp_listener in self.tcp_listeners {
            tokio::spawn(run_with_respawning(
                run_tcp_listener,
                shutdown_handle.clone(),
                server.clone(),
                Arc::new(tcp_listener),
            ));
        }

        for udp_socket in self.udp_sockets {
            tokio::spawn(run_with_respawning(
                run_udp_receiver,
                shutdown_handle.clone(),
                server.clone(),
                Arc::new(udp_socket),
            ));
        }

        shutdown_controller
    }
}

/// How long to wait between respawns of a task, so that tasks that
/// crash immediately do not spin.
const TASK_RESPAWN_DELAY: Duration = Duration::from_secs(1);

/// Runs a Tokio task, respawning it if it returns an I/O error, is
/// cancelled, or panics.
async fn run_with_respawning<F, G, S>(
    f: F,
    mut shutdown: ShutdownHandle,
    server: Arc<Server>,
    socket: S,
) where
    F: Fn(ShutdownHandle, Arc<Server>, S) -> G,
    G: Future<Output = io::Result<()>> + Send + 'static,
    S: Clone,
{
    loop {
        let last_spawn_time = Instant::now();
        match tokio::spawn(f(shutdown.clone(), server.clone(), socket.clone())).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => log_io_error(e),
            Err(_) => error!("Server task panicked; respawning"),
        }

        // Wait out the rest of the delay, but take shutdown requests
        // immediately.
        let since_last_spawn = last_spawn_time.elapsed();
        if let Some(duration_to_wait) = TASK_RESPAWN_DELAY.checked_sub(since_last_spawn) {
            tokio::select! {
                _ = shutdown.request_receiver.recv() => return,
                _ = tokio::time::sleep(duration_to_wait) => (),
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TCP                                                                //
////////////////////////////////////////////////////////////////////////

/// The TCP accept loop.
async fn run_tcp_listener(
    mut shutdown: ShutdownHandle,
    server: Arc<Server>,
    listener: Arc<TcpListener>,
) -> io::Result<()> {
    loop {
        let (client, client_addr) = tokio::select! {
            _ = shutdown.request_receiver.recv() => return Ok(()),
            res = listener.accept() => res?,
        };
        let shutdown = shutdown.clone();
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_tcp_connection(shutdown, &server, client, client_addr.ip()).await
            {
                log_io_error(e);
            }
        });
    }
}

/// Serves messages on a TCP connection until the client closes it,
/// stalls, or sends something unanswerable.
async fn handle_tcp_connection(
    mut shutdown: ShutdownHandle,
    server: &Server,
    mut socket: TcpStream,
    client_ip: IpAddr,
) -> io::Result<()> {
    let mut received_buf = vec![0; u16::MAX as usize];
    let mut response_buf = vec![0; 2 + u16::MAX as usize];

    loop {
        let received_len = match timeout(
            super::READ_MESSAGE_TIMEOUT,
            read_message_over_tcp(&mut socket, &mut received_buf),
        )
        .await
        {
            Ok(Ok(Some(len))) => len,
            Ok(Ok(None)) => return Ok(()),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                debug!("Closing stalled TCP connection from {}", client_ip);
                return Ok(());
            }
        };

        let response = server
            .handle_message(
                &received_buf[..received_len],
                ReceivedInfo::new(client_ip, Transport::Tcp),
                &mut response_buf[2..],
            )
            .await;
        match response {
            Response::Single(response_len) => {
                response_buf[..2].copy_from_slice(&(response_len as u16).to_be_bytes());
                socket.write_all(&response_buf[..2 + response_len]).await?;
            }

            // Nothing to say means the message was badly malformed, so
            // the connection is dropped.
            Response::None => return Ok(()),
        }

        if matches!(
            shutdown.request_receiver.try_recv(),
            Err(broadcast::error::TryRecvError::Closed)
        ) {
            return Ok(());
        }
    }
}

/// Reads one length-prefixed DNS message into `buf`, returning its
/// length, or `None` if the client closed the connection first.
async fn read_message_over_tcp(
    socket: &mut TcpStream,
    buf: &mut [u8],
) -> io::Result<Option<usize>> {
    let len = match socket.read_u16().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    match socket.read_exact(&mut buf[..len]).await {
        Ok(_) => Ok(Some(len)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

////////////////////////////////////////////////////////////////////////
// UDP                                                                //
////////////////////////////////////////////////////////////////////////

/// The UDP receive loop.
async fn run_udp_receiver(
    mut shutdown: ShutdownHandle,
    server: Arc<Server>,
    socket: Arc<UdpSocket>,
) -> io::Result<()> {
    let udp_payload_size = server.edns_udp_payload_size() as usize;

    loop {
        let mut received_buf = vec![0; udp_payload_size];
        let (received_len, src) = tokio::select! {
            _ = shutdown.request_receiver.recv() => return Ok(()),
            res = socket.recv_from(&mut received_buf) => res?,
        };

        // The wait sender moves into the task so that shutdown waits
        // for the response to go out.
        let wait_sender = shutdown.wait_sender.clone();
        let server = server.clone();
        let socket = socket.clone();
        tokio::spawn(async move {
            let mut response_buf = vec![0; udp_payload_size];
            let response = server
                .handle_message(
                    &received_buf[..received_len],
                    ReceivedInfo::new(src.ip(), Transport::Udp),
                    &mut response_buf,
                )
                .await;
            if let Response::Single(response_len) = response {
                if let Err(e) = socket.send_to(&response_buf[..response_len], src).await {
                    log_io_error(e);
                }
            }
            drop(wait_sender);
        });
    }
}

////////////////////////////////////////////////////////////////////////
// GRACEFUL SHUTDOWN                                                  //
////////////////////////////////////////////////////////////////////////

/// Controls the shutdown of a server's Tokio tasks.
///
/// Use [`TokioShutdownController::shut_down`] or its blocking variant,
/// [`TokioShutdownController::blocking_shut_down`], to initiate
/// shutdown and wait for its completion. Dropping the controller also
/// triggers shutdown, but does not wait for it to complete.
#[must_use]
#[derive(Debug)]
pub struct TokioShutdownController {
    request_sender: broadcast::Sender<()>,
    wait_receiver: mpsc::Receiver<()>,
}

impl TokioShutdownController {
    /// Requests that running server tasks shut down, and then waits for
    /// them to terminate.
    pub async fn shut_down(mut self) {
        drop(self.request_sender);
        let _ = self.wait_receiver.recv().await;
    }

    /// The blocking variant of [`TokioShutdownController::shut_down`].
    pub fn blocking_shut_down(mut self) {
        drop(self.request_sender);
        let _ = self.wait_receiver.blocking_recv();
    }
}

/// A handle held by tasks to interact with graceful shutdown.
///
/// Tasks learn that shutdown was requested when every sender attached
/// to `request_receiver` has closed. Holding `wait_sender` keeps the
/// shutdown from completing, so every server task owns one.
struct ShutdownHandle {
    request_receiver: broadcast::Receiver<()>,
    wait_sender: mpsc::Sender<()>,
}

impl Clone for ShutdownHandle {
    fn clone(&self) -> Self {
        // A resubscribed receiver misses queued values, which is fine:
        // the signal is the channel closing, not a value.
        Self {
            request_receiver: self.request_receiver.resubscribe(),
            wait_sender: self.wait_sender.clone(),
        }
    }
}

/// Produces a [`TokioShutdownController`] and an initial
/// [`ShutdownHandle`] connected to it.
fn make_shutdown_channels() -> (TokioShutdownController, ShutdownHandle) {
    let (request_sender, request_receiver) = broadcast::channel(1);
    let (wait_sender, wait_receiver) = mpsc::channel(1);
    let controller = TokioShutdownController {
        request_sender,
        wait_receiver,
    };
    let handle = ShutdownHandle {
        request_receiver,
        wait_sender,
    };
    (controller, handle)
}

fn log_io_error(e: io::Error) {
    error!("I/O error: {}", e);
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::authority::UdpTransport;
    use crate::class::Class;
    use crate::codec;
    use crate::gateway::{Gateway, GatewayConfig, RegistrySource};
    use crate::ledger::memory::MemoryLedger;
    use crate::ledger::Address;
    use crate::message::{Opcode, Qclass, Qtype, Question, Rcode, Reader, Writer};
    use crate::name::Name;
    use crate::namehash::NodeId;
    use crate::rr::{Rdata, Record, Ttl, Type};

    fn server() -> Arc<Server> {
        let registry = Address::from([0x22; 20]);
        let resolver = Address::from([0x11; 20]);
        let apex: Name = "example.eth.".parse().unwrap();
        let blob = codec::encode(&[Record {
            owner: apex.clone(),
            rr_type: Type::A,
            class: Class::IN,
            ttl: Ttl::from(300u32),
            rdata: Rdata::try_from(&b"\x0a\x00\x00\x01"[..]).unwrap(),
        }])
        .unwrap();
        let node = NodeId::of(&apex);
        let ledger = MemoryLedger::new()
            .with_resolver(registry, node, resolver)
            .with_blob(resolver, node, blob);
        Arc::new(Server::new(Gateway::new(
            Arc::new(ledger),
            Arc::new(UdpTransport::default()),
            GatewayConfig {
                registry: RegistrySource::Fixed(registry),
                ..GatewayConfig::default()
            },
        )))
    }

    fn query() -> Vec<u8> {
        let mut buf = vec![0; 512];
        let mut writer = Writer::new(&mut buf, 512).unwrap();
        writer.set_id(7);
        writer.set_opcode(Opcode::Query);
        writer
            .add_question(&Question {
                qname: "example.eth.".parse().unwrap(),
                qtype: Qtype::from(Type::A),
                qclass: Qclass::IN,
            })
            .unwrap();
        let len = writer.finish();
        buf.truncate(len);
        buf
    }

    fn check_response(response: &[u8]) {
        let reader = Reader::try_from(response).unwrap();
        assert_eq!(reader.id(), 7);
        assert_eq!(reader.rcode(), Rcode::NoError);
        assert_eq!(reader.ancount(), 1);
    }

    #[tokio::test]
    async fn serves_udp_and_tcp() {
        let loopback = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        let provider = TokioIoProvider::bind([loopback], [loopback]).await.unwrap();
        let (tcp_addrs, udp_addrs) = provider.local_addrs().unwrap();
        let controller = provider.start(&server());
        let query = query();

        let client = UdpSocket::bind(loopback).await.unwrap();
        client.send_to(&query, udp_addrs[0]).await.unwrap();
        let mut buf = [0; 512];
        let (len, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        check_response(&buf[..len]);

        let mut stream = TcpStream::connect(tcp_addrs[0]).await.unwrap();
        stream.write_u16(query.len() as u16).await.unwrap();
        stream.write_all(&query).await.unwrap();
        let len = stream.read_u16().await.unwrap() as usize;
        let mut buf = vec![0; len];
        stream.read_exact(&mut buf).await.unwrap();
        check_response(&buf);

        drop(stream);
        timeout(Duration::from_secs(5), controller.shut_down())
            .await
            .unwrap();
    }
}
