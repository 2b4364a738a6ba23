// Copyright 2016 Pierre-Étienne Meunier
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use clap::Parser;
use robot_homing_server::{server, ServerConfig};

/// Guides a remote robot client to the origin and retrieves its secret
/// message over a TCP connection.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on. Must fall in (1023, 65353].
    port: u16,
}

fn validate_port(port: u16) -> anyhow::Result<u16> {
    if port <= 1023 || port > 65353 {
        anyhow::bail!("invalid port {port}: must be in (1023, 65353]");
    }
    Ok(port)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let port = validate_port(args.port)?;
    server::run(ServerConfig::new(port)).await
}
