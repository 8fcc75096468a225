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

//! Implements command-line argument parsing.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ensdns::ledger::Address;
use ensdns::name::Name;

use crate::config::ConfigMode;

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// A DNS gateway serving zones stored on the Ethereum Name Service
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the DNS server
    Serve(ServeArgs),

    /// Upload a zone file to the ledger
    Upload(UploadArgs),
}

#[derive(Debug, Parser)]
pub struct ServeArgs {
    /// Set the configuration file to use
    #[clap(
        long,
        conflicts_with_all = &[
            "bind", "ip", "port", "ledger", "mode", "registry", "suffix",
            "dns_timeout", "edns_udp_payload_size", "root_servers",
        ],
        value_name = "FILE"
    )]
    pub config: Option<PathBuf>,

    /// Set the server bind IP address and port
    #[clap(long, value_name = "IP:PORT")]
    pub bind: Option<SocketAddr>,

    /// Set the server bind IP address
    #[clap(long, conflicts_with = "bind", value_name = "IP")]
    pub ip: Option<IpAddr>,

    /// Set the server port
    #[clap(long, conflicts_with = "bind", value_name = "PORT")]
    pub port: Option<u16>,

    /// Set the Ethereum JSON-RPC endpoint
    #[clap(long, value_name = "URL")]
    pub ledger: Option<String>,

    /// Set how records are read from the ledger
    #[clap(long, value_enum)]
    pub mode: Option<ConfigMode>,

    /// Look every name up in this registry instead of finding it
    /// through the DNS
    #[clap(long, value_name = "ADDRESS")]
    pub registry: Option<Address>,

    /// Set the suffix of authority nameserver names
    #[clap(long, value_name = "NAME")]
    pub suffix: Option<Name>,

    /// Set the timeout for DNS queries, in seconds
    #[clap(long, value_name = "SECONDS")]
    pub dns_timeout: Option<u64>,

    /// Set the advertised EDNS UDP payload size
    #[clap(long, value_name = "OCTETS")]
    pub edns_udp_payload_size: Option<u16>,

    /// Set the servers that authority searches start from
    #[clap(long, value_delimiter = ',', value_name = "NAME,...")]
    pub root_servers: Vec<Name>,
}

#[derive(Debug, Parser)]
pub struct UploadArgs {
    /// The zone file to upload
    #[clap(value_name = "FILE")]
    pub file: PathBuf,

    /// Set the origin for relative names before any $ORIGIN
    #[clap(long, value_name = "NAME")]
    pub origin: Option<Name>,

    /// Set the Ethereum JSON-RPC endpoint
    #[clap(long, value_name = "URL", default_value = crate::config::DEFAULT_LEDGER_URL)]
    pub ledger: String,

    /// Send transactions from this account (default: the node's first
    /// account)
    #[clap(long, value_name = "ADDRESS")]
    pub account: Option<Address>,

    /// Set this resolver on the zone apex if it has none
    #[clap(long, value_name = "ADDRESS")]
    pub resolver: Option<Address>,

    /// Set the suffix of authority nameserver names
    #[clap(long, value_name = "NAME", default_value = ensdns::authority::DEFAULT_SUFFIX)]
    pub suffix: Name,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_defaults() {
        let args = Args::try_parse_from(["ensdns", "upload", "example.eth.zone"]).unwrap();
        let Command::Upload(upload) = args.command else {
            panic!("expected the upload command");
        };
        assert_eq!(upload.file, PathBuf::from("example.eth.zone"));
        assert_eq!(upload.ledger, crate::config::DEFAULT_LEDGER_URL);
        assert_eq!(upload.suffix, "ens.domains.".parse::<Name>().unwrap());
    }

    #[test]
    fn config_conflicts_with_options() {
        assert!(Args::try_parse_from(["ensdns", "serve", "--config", "a.toml", "--port", "5353"])
            .is_err());
        assert!(Args::try_parse_from(["ensdns", "serve", "--mode", "indexed"]).is_ok());
    }
}
