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

//! I/O providers for running [`Server`s](crate::server::Server).
//!
//! The [`Server`](crate::server::Server) implements message processing
//! abstracted from network I/O. The provider here takes a
//! [`Server`](crate::server::Server) and acts as the intermediary
//! between Tokio's sockets on one hand and the server on the other.

use std::time::Duration;

mod tokio;

pub use self::tokio::{TokioIoProvider, TokioShutdownController};

/// How long a TCP client has to send a complete message before the
/// connection is closed.
const READ_MESSAGE_TIMEOUT: Duration = Duration::from_secs(10);
