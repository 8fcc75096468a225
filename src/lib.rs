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

//! A DNS gateway that serves zones stored on the Ethereum Name Service.
//!
//! Zones live on the ledger: the ENS registry maps a name's node (see
//! [`namehash`]) to a resolver contract, and the resolver holds the
//! zone's records as a blob of wire-format resource records (see
//! [`codec`]). The [`gateway`] finds which registry is authoritative
//! for a name by walking the DNS delegation chain from the root (see
//! [`authority`]), fetches and decodes the zone, and answers from a
//! [`zone`] tree. The [`server`] module turns this into DNS responses,
//! and [`io`] puts the server on the network.
//!
//! Zones are written with the same pieces in reverse: a [`zone_file`]
//! is parsed, checked, encoded and submitted through the [`ledger`].

pub mod authority;
pub mod class;
pub mod codec;
pub mod gateway;
pub mod io;
pub mod ledger;
pub mod message;
pub mod name;
pub mod namehash;
pub mod rr;
pub mod server;
pub mod zone;
pub mod zone_file;

mod util;
