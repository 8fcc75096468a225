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

//! Implements the `serve` command (i.e., running the server).

use std::fmt::Write;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info, warn};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::runtime;

use ensdns::authority::UdpTransport;
use ensdns::gateway::Gateway;
use ensdns::io::TokioIoProvider;
use ensdns::ledger::EthLedger;
use ensdns::server::Server;

use crate::args::ServeArgs;
use crate::config::{self, Config};

/// Runs the server.
pub fn run(args: ServeArgs) {
    env_logger::init_from_env(Env::new().default_filter_or("warn"));

    if let Err(e) = try_running(args) {
        report_failure("Failed to run:", &e);
        process::exit(1);
    }
    info!("Exiting with success.");
}

/// Logs `e` and its chain of causes at the error level.
pub fn report_failure(heading: &str, e: &anyhow::Error) {
    let mut message = String::from(heading);
    for (i, cause) in e.chain().enumerate() {
        let _ = write!(message, "\n[{}] {}", i + 1, cause);
    }
    message.push_str("\nExiting with failure.");
    error!("{}", message);
}

fn try_running(serve_args: ServeArgs) -> Result<()> {
    info!(
        "ENS DNS gateway v{}.{}.{} starting.",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        env!("CARGO_PKG_VERSION_PATCH"),
    );

    // Get the configuration, either from the file system or from the
    // command line arguments, as appropriate.
    let config = if let Some(ref config_path) = serve_args.config {
        info!("Loading the configuration from {}.", config_path.display());
        config::load_from_path(config_path).context("failed to load the configuration")?
    } else {
        info!("Loading the configuration from the command line.");
        config::load_from_args(serve_args)
    };

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the Tokio runtime")?;

    // Bind before anything talks to the ledger, so that a port conflict
    // fails fast.
    let io_provider = runtime
        .block_on(TokioIoProvider::bind([config.bind], [config.bind]))
        .context("failed to bind sockets")?;
    let server = make_server(&config)?;

    let mut signals = set_up_signal_handling().context("failed to set up signal handling")?;

    info!("Set-up is complete; starting the server.");
    let server = Arc::new(server);
    let controller = {
        let _guard = runtime.enter();
        io_provider.start(&server)
    };

    // Process incoming signals.
    if let Some(signal) = signals.forever().next() {
        let name = match signal {
            SIGINT => "SIGINT",
            SIGTERM => "SIGTERM",
            _ => "an unexpected signal",
        };
        info!("Received {}; shutting down.", name);
    } else {
        warn!("Signal handling stopped; shutting down.");
    }

    controller.blocking_shut_down();
    info!("Shutdown complete.");
    Ok(())
}

fn make_server(config: &Config) -> Result<Server> {
    let account = config.ledger.account.as_ref().map(|account| account.0);
    let ledger =
        EthLedger::new(&config.ledger.url, account).context("failed to set up the ledger")?;
    let transport = UdpTransport::new(config.gateway.dns_timeout());
    let gateway = Gateway::new(
        Arc::new(ledger),
        Arc::new(transport),
        config.gateway.to_gateway_config(),
    );

    let mut server = Server::new(gateway);
    server
        .set_edns_udp_payload_size(config.server.edns_udp_payload_size)
        .context("failed to set the EDNS UDP payload size")?;
    Ok(server)
}

fn set_up_signal_handling() -> Result<Signals> {
    let term_signals = &[SIGINT, SIGTERM];
    let already_terminating = Arc::new(AtomicBool::new(false));

    // This sets up signal handlers to exit immediately if a second
    // termination signal arrives before the process finishes shutting
    // down gracefully.
    for sig in term_signals {
        signal_hook::flag::register_conditional_shutdown(*sig, 1, already_terminating.clone())?;
        signal_hook::flag::register(*sig, already_terminating.clone())?;
    }

    Signals::new(term_signals).map_err(Into::into)
}
