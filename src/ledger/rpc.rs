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

//! A small JSON-RPC 2.0 client over HTTP.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::debug;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Error;

/// The default timeout for a whole request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// A JSON-RPC client for one endpoint. Requests are never retried.
pub struct RpcClient {
    endpoint: Url,
    client: Client,
    id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, Error> {
        let endpoint = endpoint
            .parse()
            .map_err(|e| Error::Transport(format!("bad URL {}: {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self {
            endpoint,
            client,
            id: AtomicU64::new(1),
        })
    }

    /// Calls `method` with the (array or object) `params`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, Error> {
        let id = self.id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        debug!("RPC request {} to {}: {}", id, self.endpoint, method);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let parsed: RpcResponse<T> = serde_json::from_slice(&body)
            .map_err(|e| Error::InvalidResponse(format!("bad JSON-RPC reply: {}", e)))?;

        if let Some(err) = parsed.error {
            return Err(Error::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        parsed
            .result
            .ok_or_else(|| Error::InvalidResponse("reply has neither result nor error".to_owned()))
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// A one-shot HTTP server for tests. It answers every request on a
/// connection with `reply` as a JSON-RPC result and hands the request
/// bodies back through the returned channel.
#[cfg(test)]
pub(super) mod mock {
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    pub async fn serve(replies: Vec<Value>) -> (String, mpsc::UnboundedReceiver<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            for reply in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                let body = read_body(&mut stream).await;
                let request: Value = serde_json::from_slice(&body).unwrap();
                let id = request["id"].clone();
                let response = json!({"jsonrpc": "2.0", "id": id, "result": reply});
                let _ = requests_tx.send(request);
                let payload = response.to_string();
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n",
                    payload.len()
                );
                stream.write_all(head.as_bytes()).await.unwrap();
                stream.write_all(payload.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });
        (url, requests_rx)
    }

    async fn read_body(stream: &mut tokio::net::TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find(&buf, b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let len: usize = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .map(|value| value.trim().parse().unwrap())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    return buf[end + 4..end + 4 + len].to_vec();
                }
            }
            if n == 0 {
                panic!("connection closed before the request was complete");
            }
        }
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }
}
