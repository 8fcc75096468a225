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

//! Implements the server configuration file.

use std::fmt::{self, Write};
use std::fs;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize};

use ensdns::authority;
use ensdns::gateway::{GatewayConfig, Mode, RegistrySource};
use ensdns::ledger::Address;
use ensdns::name::Name;
use ensdns::server::DEFAULT_EDNS_UDP_PAYLOAD_SIZE;

use crate::args::ServeArgs;

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Loads the server configuration from the file given by `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let raw_config =
        fs::read_to_string(path.as_ref()).context("failed to read the configuration file")?;
    let config: Config =
        toml::from_str(&raw_config).context("failed to parse the configuration file")?;
    log_config_summary(&config);
    Ok(config)
}

/// Loads the server configuration from the parsed command line
/// arguments given by `args`.
pub fn load_from_args(args: ServeArgs) -> Config {
    let bind = args.bind.unwrap_or_else(|| {
        let ip = args.ip.unwrap_or(DEFAULT_BIND_IP);
        let port = args.port.unwrap_or(DEFAULT_BIND_PORT);
        SocketAddr::new(ip, port)
    });
    let root_servers = if args.root_servers.is_empty() {
        default_root_servers()
    } else {
        args.root_servers.into_iter().map(ConfigName).collect()
    };

    let config = Config {
        bind,
        server: ServerConfig {
            edns_udp_payload_size: args
                .edns_udp_payload_size
                .unwrap_or(DEFAULT_EDNS_UDP_PAYLOAD_SIZE),
        },
        ledger: LedgerConfig {
            url: args.ledger.unwrap_or_else(default_ledger_url),
            account: None,
        },
        gateway: GatewayTomlConfig {
            mode: args.mode.unwrap_or_default(),
            registry: args.registry.map(ConfigAddress),
            suffix: args.suffix.map_or_else(default_suffix, ConfigName),
            dns_timeout: args.dns_timeout.unwrap_or_else(default_dns_timeout),
            root_servers,
        },
    };
    log_config_summary(&config);
    config
}

/// Summarizes the configuration in the log, if the debug log level is
/// enabled.
fn log_config_summary(config: &Config) {
    if !log_enabled!(Debug) {
        return;
    }

    let registry = match config.gateway.registry {
        Some(ref registry) => registry.0.to_string(),
        None => String::from("found through the DNS"),
    };
    let mut message = format!(
        "Configuration loaded:\n\
         Bind address:  {}\n\
         EDNS payload:  {}\n\
         Ledger:        {}\n\
         Mode:          {:?}\n\
         Registry:      {}\n\
         Suffix:        {}\n\
         DNS timeout:   {}s\n\
         Root servers:  ",
        config.bind,
        config.server.edns_udp_payload_size,
        config.ledger.url,
        config.gateway.mode,
        registry,
        config.gateway.suffix.0,
        config.gateway.dns_timeout,
    );
    for (i, server) in config.gateway.root_servers.iter().enumerate() {
        if i > 0 {
            message.push_str(", ");
        }
        let _ = write!(message, "{}", server.0);
    }
    debug!("{}", message);
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub gateway: GatewayTomlConfig,
}

const DEFAULT_BIND_IP: IpAddr = IpAddr::V6(Ipv6Addr::LOCALHOST);
const DEFAULT_BIND_PORT: u16 = 53;

fn default_bind() -> SocketAddr {
    SocketAddr::new(DEFAULT_BIND_IP, DEFAULT_BIND_PORT)
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: SERVER                                      //
////////////////////////////////////////////////////////////////////////

/// The configuration for server behavior/options.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_edns_udp_payload_size")]
    pub edns_udp_payload_size: u16,
}

fn default_edns_udp_payload_size() -> u16 {
    DEFAULT_EDNS_UDP_PAYLOAD_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            edns_udp_payload_size: default_edns_udp_payload_size(),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: LEDGER                                      //
////////////////////////////////////////////////////////////////////////

/// The default Ethereum JSON-RPC endpoint.
pub const DEFAULT_LEDGER_URL: &str = "http://localhost:8545";

/// The configuration of the Ethereum node connection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_url")]
    pub url: String,
    pub account: Option<ConfigAddress>,
}

fn default_ledger_url() -> String {
    DEFAULT_LEDGER_URL.to_owned()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            url: default_ledger_url(),
            account: None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: GATEWAY                                     //
////////////////////////////////////////////////////////////////////////

/// The configuration of name resolution.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayTomlConfig {
    #[serde(default)]
    pub mode: ConfigMode,
    pub registry: Option<ConfigAddress>,
    #[serde(default = "default_suffix")]
    pub suffix: ConfigName,
    #[serde(default = "default_dns_timeout")]
    pub dns_timeout: u64,
    #[serde(default = "default_root_servers")]
    pub root_servers: Vec<ConfigName>,
}

impl GatewayTomlConfig {
    /// Returns the DNS query timeout.
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout)
    }

    /// Converts this into the library's [`GatewayConfig`].
    pub fn to_gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            mode: self.mode.into(),
            registry: match self.registry {
                Some(ref registry) => RegistrySource::Fixed(registry.0),
                None => RegistrySource::Discover,
            },
            suffix: self.suffix.0.clone(),
            servers: self.root_servers.iter().map(|s| s.0.clone()).collect(),
        }
    }
}

impl Default for GatewayTomlConfig {
    fn default() -> Self {
        Self {
            mode: ConfigMode::default(),
            registry: None,
            suffix: default_suffix(),
            dns_timeout: default_dns_timeout(),
            root_servers: default_root_servers(),
        }
    }
}

/// A deserializable (and command-line parseable) mirror of
/// [`ensdns::gateway::Mode`].
#[derive(Clone, Copy, Debug, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConfigMode {
    #[default]
    Zone,
    Indexed,
}

impl From<ConfigMode> for Mode {
    fn from(config_mode: ConfigMode) -> Self {
        match config_mode {
            ConfigMode::Zone => Self::Zone,
            ConfigMode::Indexed => Self::Indexed,
        }
    }
}

fn default_suffix() -> ConfigName {
    ConfigName(GatewayConfig::default().suffix)
}

fn default_dns_timeout() -> u64 {
    authority::DEFAULT_TIMEOUT.as_secs()
}

fn default_root_servers() -> Vec<ConfigName> {
    authority::root_servers().into_iter().map(ConfigName).collect()
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER ENSDNS TYPES FOR SERDE                               //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type
/// from [`ensdns`], using its [`FromStr`](std::str::FromStr)
/// implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper over an [`ensdns`]
        /// type.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigName, Name, "domain name");
make_serde_wrapper!(ConfigAddress, Address, "address");

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
