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

//! The 3-phase shared-secret handshake: username, key id, confirmation.

use crate::error::{AuthFailure, ProtocolError};
use crate::framer::Expectation;
use crate::protocol;

/// Where a session is in the handshake. `Authenticated` carries the
/// derived `hash` and chosen `key_id` forward for the navigator seed step
/// to reference if needed, though the navigator never reads them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Username,
    KeyId { username: Vec<u8> },
    Confirmation { hash: u16, key_id: usize },
    Authenticated,
}

/// A directive the authenticator wants written to the client, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Advance to `KEY_ID`, ask the client for its key id.
    KeyRequest,
    /// Advance to `CONFIRMATION`, send the computed server confirmation.
    ServerConfirmation(u16),
    /// Authentication succeeded: emit `200 OK` then seed the navigator
    /// with `103 TURN LEFT`.
    Authenticated,
}

/// Runs the handshake described in spec §4.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticator {
    phase: Phase,
}

impl Authenticator {
    pub fn new() -> Self {
        Authenticator {
            phase: Phase::Username,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase, Phase::Authenticated)
    }

    /// The framer bound that applies to the frame this phase is waiting
    /// on next.
    pub fn expectation(&self) -> Expectation {
        match self.phase {
            Phase::Username => Expectation::Username,
            Phase::KeyId { .. } => Expectation::KeyId,
            Phase::Confirmation { .. } => Expectation::Confirmation,
            Phase::Authenticated => unreachable!("authenticator is done once authenticated"),
        }
    }

    /// Computes `((sum of username bytes) * 1000) mod 65536`.
    fn hash_of(username: &[u8]) -> u16 {
        let sum: u32 = username.iter().map(|&b| b as u32).sum();
        ((sum * 1000) % 65536) as u16
    }

    /// Consumes one frame payload and advances the phase, or returns the
    /// protocol error to report back to the client.
    pub fn on_frame(&mut self, payload: &[u8]) -> Result<Outcome, ProtocolError> {
        match std::mem::replace(&mut self.phase, Phase::Username) {
            Phase::Username => {
                self.phase = Phase::KeyId {
                    username: payload.to_vec(),
                };
                Ok(Outcome::KeyRequest)
            }
            Phase::KeyId { username } => {
                let key_id = parse_decimal(payload).ok_or(ProtocolError::Syntax)?;
                if key_id > 4 {
                    return Err(ProtocolError::Auth(AuthFailure::KeyOutOfRange));
                }
                let hash = Self::hash_of(&username);
                let server_conf =
                    ((hash as u32 + protocol::SERVER_KEY[key_id] as u32) % 65536) as u16;
                self.phase = Phase::Confirmation { hash, key_id };
                Ok(Outcome::ServerConfirmation(server_conf))
            }
            Phase::Confirmation { hash, key_id } => {
                let client_conf = parse_decimal(payload).ok_or(ProtocolError::Syntax)?;
                if client_conf > 65535 {
                    return Err(ProtocolError::Syntax);
                }
                let client_key = protocol::CLIENT_KEY[key_id] as i64;
                let expected = (client_conf as i64 - client_key).rem_euclid(65536) as u16;
                if expected != hash {
                    return Err(ProtocolError::Auth(AuthFailure::LoginFailed));
                }
                self.phase = Phase::Authenticated;
                Ok(Outcome::Authenticated)
            }
            Phase::Authenticated => unreachable!("authenticator does not receive frames once authenticated"),
        }
    }
}

/// Parses a non-empty run of ASCII digits as a `usize`. Rejects a leading
/// `-` (authentication values are never signed) and anything non-decimal.
fn parse_decimal(payload: &[u8]) -> Option<usize> {
    if payload.is_empty() || !payload.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(payload).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_mnau_is_40500() {
        assert_eq!(Authenticator::hash_of(b"Mnau!"), 40500);
    }

    #[test]
    fn full_handshake_for_key_one() {
        let mut auth = Authenticator::new();
        assert_eq!(auth.on_frame(b"Mnau!"), Ok(Outcome::KeyRequest));
        assert_eq!(
            auth.on_frame(b"1"),
            Ok(Outcome::ServerConfirmation(7001))
        );
        assert_eq!(auth.on_frame(b"4259"), Ok(Outcome::Authenticated));
        assert!(auth.is_authenticated());
    }

    #[test]
    fn wrong_confirmation_fails_login() {
        let mut auth = Authenticator::new();
        auth.on_frame(b"Mnau!").unwrap();
        auth.on_frame(b"1").unwrap();
        assert_eq!(
            auth.on_frame(b"4258"),
            Err(ProtocolError::Auth(AuthFailure::LoginFailed))
        );
    }

    #[test]
    fn key_id_out_of_range() {
        let mut auth = Authenticator::new();
        auth.on_frame(b"Mnau!").unwrap();
        assert_eq!(
            auth.on_frame(b"5"),
            Err(ProtocolError::Auth(AuthFailure::KeyOutOfRange))
        );
    }

    #[test]
    fn non_decimal_key_id_is_syntax_error() {
        let mut auth = Authenticator::new();
        auth.on_frame(b"Mnau!").unwrap();
        assert_eq!(auth.on_frame(b"abc"), Err(ProtocolError::Syntax));
    }

    #[test]
    fn empty_key_id_is_syntax_error() {
        let mut auth = Authenticator::new();
        auth.on_frame(b"Mnau!").unwrap();
        assert_eq!(auth.on_frame(b""), Err(ProtocolError::Syntax));
    }
}
