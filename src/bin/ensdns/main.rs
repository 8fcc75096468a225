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

//! The ENS DNS gateway command-line program.

mod args;
mod config;
mod serve;
mod upload;

use args::Command;

fn main() {
    let args = args::parse();
    match args.command {
        Command::Serve(serve_args) => serve::run(serve_args),
        Command::Upload(upload_args) => upload::run(upload_args),
    }
}
