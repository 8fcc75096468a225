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

//! Implements the `upload` command (i.e., writing a zone file to the
//! ledger).

use std::fs;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use env_logger::Env;
use log::info;
use tokio::runtime;

use ensdns::authority::UdpTransport;
use ensdns::gateway::{Gateway, GatewayConfig, Upload};
use ensdns::ledger::EthLedger;
use ensdns::rr::Record;
use ensdns::zone_file::Parser;

use crate::args::UploadArgs;
use crate::serve::report_failure;

/// Uploads a zone file.
pub fn run(args: UploadArgs) {
    env_logger::init_from_env(Env::new().default_filter_or("info"));

    match try_uploading(args) {
        Ok(tx) => println!("{}", tx),
        Err(e) => {
            report_failure("Failed to upload:", &e);
            process::exit(1);
        }
    }
}

fn try_uploading(args: UploadArgs) -> Result<String> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let parser = match args.origin {
        Some(origin) => Parser::with_origin(&text, origin),
        None => Parser::new(&text),
    };
    let records = parser
        .map(|parsed| parsed.map(Record::from))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse {}", args.file.display()))?;
    info!("Read {} records from {}.", records.len(), args.file.display());

    let upload = Upload::from_records(records, &args.suffix).context("invalid zone")?;
    info!(
        "Uploading zone {} to registry {}.",
        upload.apex(),
        upload.registry()
    );

    let ledger = EthLedger::new(&args.ledger, args.account).context("failed to set up the ledger")?;
    let config = GatewayConfig {
        suffix: args.suffix,
        ..GatewayConfig::default()
    };
    let gateway = Gateway::new(Arc::new(ledger), Arc::new(UdpTransport::default()), config);

    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the Tokio runtime")?;
    let tx = runtime
        .block_on(gateway.upload(&upload, args.resolver))
        .context("failed to write the zone to the ledger")?;
    Ok(tx.to_string())
}
