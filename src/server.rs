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

//! The listener accept loop: binds a `TcpListener` and spawns one
//! `Session` task per accepted connection. This is the ambient host
//! layer the protocol core (framer/auth/navigator/session) is agnostic
//! to; it owns logging and process-level shutdown.

use std::time::Duration;

use tokio::net::TcpListener;

use crate::protocol;
use crate::session::Session;

/// Host-level configuration assembled by `main` before any session
/// exists: the listening port and the two idle-read timeouts.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub port: u16,
    pub base_timeout: Duration,
    pub recharge_timeout: Duration,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        ServerConfig {
            port,
            ..Default::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 0,
            base_timeout: protocol::BASE_TIMEOUT,
            recharge_timeout: protocol::RECHARGE_TIMEOUT,
        }
    }
}

/// Binds the listener and runs the accept loop until `Ctrl-C` is
/// received. Every accepted connection is handled by an independently
/// spawned task; sessions never share state with one another.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    log::info!("listening on port {}", config.port);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                log::info!("accepted connection from {peer}");
                let base_timeout = config.base_timeout;
                let recharge_timeout = config.recharge_timeout;
                tokio::spawn(async move {
                    let session = Session::with_timeouts(stream, base_timeout, recharge_timeout);
                    match session.run().await {
                        Ok(()) => log::info!("{peer}: session ended"),
                        Err(e) => log::warn!("{peer}: session ended: {e}"),
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("received shutdown signal, closing listener");
                return Ok(());
            }
        }
    }
}
