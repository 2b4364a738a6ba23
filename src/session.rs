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

//! Per-connection state machine: reads bytes, frames them, dispatches to
//! the authenticator or the navigator, and writes the resulting
//! directives. One `Session` is spawned per accepted connection.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::auth::{self, Authenticator};
use crate::error::{ProtocolError, SessionError};
use crate::framer::{FrameEvent, Framer};
use crate::navigator::{self, Navigator};
use crate::protocol;

/// What dispatching one frame to the authenticator/navigator produced.
enum DispatchOutcome {
    Continue,
    LoggedOut,
}

/// Owns one connection's buffer, phase, and navigation state.
pub struct Session<S> {
    stream: S,
    framer: Framer,
    auth: Authenticator,
    nav: Navigator,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self::with_timeouts(stream, protocol::BASE_TIMEOUT, protocol::RECHARGE_TIMEOUT)
    }

    pub fn with_timeouts(stream: S, base_timeout: Duration, recharge_timeout: Duration) -> Self {
        Session {
            stream,
            framer: Framer::with_timeouts(base_timeout, recharge_timeout),
            auth: Authenticator::new(),
            nav: Navigator::new(),
        }
    }

    /// Runs the session to completion: reads, frames, dispatches, and
    /// writes until a terminal result is reached. The underlying stream
    /// is shut down exactly once, regardless of which branch produced
    /// the terminal result.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let result = self.run_inner().await;
        let _ = self.stream.shutdown().await;
        result
    }

    async fn run_inner(&mut self) -> Result<(), SessionError> {
        let mut read_buf = [0u8; 1024];
        loop {
            let n = match tokio::time::timeout(self.framer.timeout(), self.stream.read(&mut read_buf))
                .await
            {
                Ok(Ok(0)) => return Ok(()),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(SessionError::Io(e)),
                Err(_elapsed) => return Err(SessionError::Timeout),
            };
            self.framer.feed(&read_buf[..n]);

            loop {
                let event = match self.framer.pop() {
                    Ok(event) => event,
                    Err(e) => {
                        self.write_protocol_error(e).await;
                        return Err(SessionError::Protocol(e));
                    }
                };
                let payload = match event {
                    Some(FrameEvent::Frame(payload)) => payload,
                    Some(FrameEvent::RechargeStarted) | Some(FrameEvent::RechargeEnded) => {
                        continue
                    }
                    None => break,
                };
                // A frame already delivered complete, terminator and all,
                // still has to obey its phase's length bound — not just
                // the dangling residual checked below.
                if payload.len() > self.current_expectation().max_payload() {
                    let e = ProtocolError::Syntax;
                    self.write_protocol_error(e).await;
                    return Err(SessionError::Protocol(e));
                }
                match self.dispatch(&payload).await {
                    Ok(DispatchOutcome::Continue) => {}
                    Ok(DispatchOutcome::LoggedOut) => return Ok(()),
                    Err(SessionError::Protocol(e)) => {
                        self.write_protocol_error(e).await;
                        return Err(SessionError::Protocol(e));
                    }
                    Err(other) => return Err(other),
                }
            }

            if let Err(e) = self.framer.check_bound(self.current_expectation()) {
                self.write_protocol_error(e).await;
                return Err(SessionError::Protocol(e));
            }
        }
    }

    /// The bound that applies to the next frame, based on which phase is
    /// currently active.
    fn current_expectation(&self) -> crate::framer::Expectation {
        if self.auth.is_authenticated() {
            self.nav.expectation()
        } else {
            self.auth.expectation()
        }
    }

    async fn dispatch(&mut self, payload: &[u8]) -> Result<DispatchOutcome, SessionError> {
        if !self.auth.is_authenticated() {
            match self.auth.on_frame(payload)? {
                auth::Outcome::KeyRequest => {
                    log::debug!("auth: username recorded, requesting key id");
                    self.write_message(protocol::KEY_REQUEST).await?;
                }
                auth::Outcome::ServerConfirmation(confirmation) => {
                    log::debug!("auth: key id accepted, sending confirmation");
                    self.write_message(&confirmation.to_string()).await?;
                }
                auth::Outcome::Authenticated => {
                    log::debug!("auth: confirmation matched, authenticated");
                    self.write_message(protocol::OK).await?;
                    self.write_message(protocol::TURN_LEFT).await?;
                }
            }
            return Ok(DispatchOutcome::Continue);
        }

        match self.nav.on_frame(payload)? {
            navigator::NavEvent::Directives(directives) => {
                for directive in directives {
                    self.write_message(directive.wire_message()).await?;
                }
                Ok(DispatchOutcome::Continue)
            }
            navigator::NavEvent::LoggedOut => {
                self.write_message(protocol::LOGOUT).await?;
                Ok(DispatchOutcome::LoggedOut)
            }
        }
    }

    async fn write_message(&mut self, text: &str) -> Result<(), std::io::Error> {
        let mut frame = Vec::with_capacity(text.len() + 2);
        frame.extend_from_slice(text.as_bytes());
        frame.extend_from_slice(&protocol::TERMINATOR);
        self.stream.write_all(&frame).await
    }

    /// Best-effort: a failed write here doesn't change the outcome,
    /// since the session is terminating either way.
    async fn write_protocol_error(&mut self, err: ProtocolError) {
        let _ = self.write_message(err.wire_message()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(payload: &str) -> Vec<u8> {
        let mut out = payload.as_bytes().to_vec();
        out.extend_from_slice(&protocol::TERMINATOR);
        out
    }

    #[tokio::test]
    async fn full_session_no_obstacles() {
        let (mut client, server) = tokio::io::duplex(4096);
        let session = Session::new(server);
        let handle = tokio::spawn(session.run());

        client.write_all(&framed("Mnau!")).await.unwrap();
        let mut buf = vec![0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], framed("107 KEY REQUEST").as_slice());

        client.write_all(&framed("1")).await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], framed("7001").as_slice());

        client.write_all(&framed("4259")).await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(
            &buf[..n],
            [framed("200 OK"), framed("103 TURN LEFT")].concat().as_slice()
        );

        client.write_all(&framed("OK 0 0")).await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], framed("105 GET MESSAGE").as_slice());

        client.write_all(&framed("Secret message.")).await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], framed("106 LOGOUT").as_slice());

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn wrong_confirmation_fails_login() {
        let (mut client, server) = tokio::io::duplex(4096);
        let session = Session::new(server);
        let handle = tokio::spawn(session.run());

        client.write_all(&framed("Mnau!")).await.unwrap();
        let mut buf = vec![0u8; 64];
        client.read(&mut buf).await.unwrap();
        client.write_all(&framed("1")).await.unwrap();
        client.read(&mut buf).await.unwrap();
        client.write_all(&framed("4258")).await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], framed("300 LOGIN FAILED").as_slice());

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SessionError::Protocol(_))));
    }

    #[tokio::test]
    async fn key_out_of_range() {
        let (mut client, server) = tokio::io::duplex(4096);
        let session = Session::new(server);
        let handle = tokio::spawn(session.run());

        client.write_all(&framed("Mnau!")).await.unwrap();
        let mut buf = vec![0u8; 64];
        client.read(&mut buf).await.unwrap();
        client.write_all(&framed("5")).await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], framed("303 KEY OUT OF RANGE").as_slice());

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SessionError::Protocol(_))));
    }

    #[tokio::test]
    async fn oversized_username_closes_with_syntax_error() {
        let (mut client, server) = tokio::io::duplex(4096);
        let session = Session::new(server);
        let handle = tokio::spawn(session.run());

        client.write_all(&[b'x'; 25]).await.unwrap();
        let mut buf = vec![0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], framed("301 SYNTAX ERROR").as_slice());

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SessionError::Protocol(_))));
    }

    #[tokio::test]
    async fn recharging_pause_is_transparent() {
        let (mut client, server) = tokio::io::duplex(4096);
        let session =
            Session::with_timeouts(server, Duration::from_millis(200), Duration::from_secs(5));
        let handle = tokio::spawn(session.run());

        client.write_all(&framed("Mnau!")).await.unwrap();
        let mut buf = vec![0u8; 64];
        client.read(&mut buf).await.unwrap();
        client.write_all(&framed("1")).await.unwrap();
        client.read(&mut buf).await.unwrap();
        client.write_all(&framed("4259")).await.unwrap();
        client.read(&mut buf).await.unwrap(); // "200 OK" + "103 TURN LEFT"

        client.write_all(&framed("OK 3 0")).await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], framed("102 MOVE").as_slice());

        // Recharge in the middle: no directive should appear for either
        // frame, and the next real directive should be unaffected.
        client.write_all(&framed("RECHARGING")).await.unwrap();
        client.write_all(&framed("FULL POWER")).await.unwrap();
        client.write_all(&framed("OK 4 0")).await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], framed("102 MOVE").as_slice());

        drop(client);
        let _ = handle.await.unwrap();
    }
}
