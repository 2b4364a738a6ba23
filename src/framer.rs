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

//! Streaming frame extraction: buffers bytes, yields `\a\b`-terminated
//! frames, enforces the phase-specific residual bound, and absorbs the
//! `RECHARGING` / `FULL POWER` sub-protocol transparently.

use crate::error::ProtocolError;
use crate::protocol;
use std::time::Duration;

/// What length bound currently applies to the residual buffer. Chosen by
/// the session from its own phase/`picking_up` state and handed to
/// [`Framer::check_bound`] after every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Username,
    KeyId,
    Confirmation,
    Navigating,
    PickingUp,
}

impl Expectation {
    /// The maximum length a single extracted frame payload may have under
    /// this expectation, independent of any residual-buffer allowance.
    pub(crate) fn max_payload(self) -> usize {
        self.bounds().0
    }

    fn bounds(self) -> (usize, usize) {
        match self {
            Expectation::Username => (protocol::MAX_USERNAME_LEN, protocol::MAX_USERNAME_LEN + 1),
            Expectation::KeyId => (protocol::MAX_KEY_ID_LEN, protocol::MAX_KEY_ID_LEN + 1),
            Expectation::Confirmation => {
                (protocol::MAX_CONFIRMATION_LEN, protocol::MAX_CONFIRMATION_LEN + 1)
            }
            Expectation::Navigating => (protocol::MAX_NAV_LEN, protocol::MAX_NAV_LEN + 1),
            Expectation::PickingUp => (protocol::MAX_PICKUP_LEN, protocol::MAX_PICKUP_LEN + 1),
        }
    }
}

/// One thing a single `pop()` call produced.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameEvent {
    /// A complete, ordinary frame payload (terminator stripped).
    Frame(Vec<u8>),
    /// The client just started a recharging pause; no frame for the
    /// dispatcher, but the caller should widen its read timeout.
    RechargeStarted,
    /// The client just ended a recharging pause; the caller should
    /// restore the base timeout and resume whatever it was doing.
    RechargeEnded,
}

/// Owns the not-yet-framed byte tail for one session.
#[derive(Debug)]
pub struct Framer {
    buffer: Vec<u8>,
    recharging: bool,
    base_timeout: Duration,
    recharge_timeout: Duration,
}

impl Framer {
    pub fn new() -> Self {
        Self::with_timeouts(protocol::BASE_TIMEOUT, protocol::RECHARGE_TIMEOUT)
    }

    /// Builds a framer with non-default idle timeouts (used by the
    /// server's `ServerConfig` and by tests that want to avoid waiting
    /// out the real base/recharge durations).
    pub fn with_timeouts(base_timeout: Duration, recharge_timeout: Duration) -> Self {
        Framer {
            buffer: Vec::new(),
            recharging: false,
            base_timeout,
            recharge_timeout,
        }
    }

    pub fn recharging(&self) -> bool {
        self.recharging
    }

    /// The idle-read timeout that currently applies.
    pub fn timeout(&self) -> Duration {
        if self.recharging {
            self.recharge_timeout
        } else {
            self.base_timeout
        }
    }

    /// Appends freshly-read bytes to the residual buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Extracts and classifies the next complete frame, if any.
    ///
    /// `RECHARGING`/`FULL POWER` frames are consumed here and never
    /// reach the dispatcher; every other frame while recharging is a
    /// `Logic` error, as is `FULL POWER` while not recharging.
    pub fn pop(&mut self) -> Result<Option<FrameEvent>, ProtocolError> {
        let idx = match self
            .buffer
            .windows(2)
            .position(|w| w == protocol::TERMINATOR)
        {
            Some(idx) => idx,
            None => return Ok(None),
        };
        let payload: Vec<u8> = self.buffer.drain(..idx + 2).take(idx).collect();

        if self.recharging {
            return if payload == protocol::FULL_POWER.as_bytes() {
                self.recharging = false;
                Ok(Some(FrameEvent::RechargeEnded))
            } else {
                Err(ProtocolError::Logic)
            };
        }
        if payload == protocol::RECHARGING.as_bytes() {
            self.recharging = true;
            return Ok(Some(FrameEvent::RechargeStarted));
        }
        if payload == protocol::FULL_POWER.as_bytes() {
            return Err(ProtocolError::Logic);
        }
        Ok(Some(FrameEvent::Frame(payload)))
    }

    /// Checks the residual buffer against the applicable bound, per the
    /// table in spec §4.1. While recharging, the bound is always the
    /// generic 10-byte one regardless of the underlying phase.
    pub fn check_bound(&self, expectation: Expectation) -> Result<(), ProtocolError> {
        let expectation = if self.recharging {
            Expectation::Navigating
        } else {
            expectation
        };
        let (max_payload, max_residual_with_partial) = expectation.bounds();
        let partial_terminator = self.buffer.last() == Some(&protocol::TERMINATOR[0]);
        let limit = if partial_terminator {
            max_residual_with_partial
        } else {
            max_payload
        };
        if self.buffer.len() > limit {
            Err(ProtocolError::Syntax)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(payloads: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for p in payloads {
            out.extend_from_slice(p.as_bytes());
            out.extend_from_slice(&protocol::TERMINATOR);
        }
        out
    }

    #[test]
    fn extracts_frames_across_arbitrary_chunking() {
        let whole = framed(&["Mnau!", "1", "4259"]);
        for chunk_size in 1..=whole.len() {
            let mut framer = Framer::new();
            let mut got = Vec::new();
            for chunk in whole.chunks(chunk_size) {
                framer.feed(chunk);
                while let Some(FrameEvent::Frame(f)) = framer.pop().unwrap() {
                    got.push(f);
                }
            }
            assert_eq!(
                got,
                vec![b"Mnau!".to_vec(), b"1".to_vec(), b"4259".to_vec()],
                "chunk size {chunk_size}"
            );
        }
    }

    #[test]
    fn rejects_oversized_username_residual() {
        let mut framer = Framer::new();
        framer.feed(&[b'x'; 25]);
        assert!(framer.pop().unwrap().is_none());
        assert_eq!(
            framer.check_bound(Expectation::Username),
            Err(ProtocolError::Syntax)
        );
    }

    #[test]
    fn allows_partial_terminator_residual_exactly_at_bound() {
        let mut framer = Framer::new();
        let mut data = vec![b'x'; 18];
        data.push(protocol::TERMINATOR[0]);
        framer.feed(&data);
        assert!(framer.pop().unwrap().is_none());
        assert_eq!(framer.check_bound(Expectation::Username), Ok(()));
    }

    #[test]
    fn recharge_pair_is_transparent() {
        let mut framer = Framer::new();
        framer.feed(&framed(&["RECHARGING"]));
        assert_eq!(framer.pop().unwrap(), Some(FrameEvent::RechargeStarted));
        assert!(framer.recharging());
        assert_eq!(framer.timeout(), protocol::RECHARGE_TIMEOUT);

        framer.feed(&framed(&["FULL POWER"]));
        assert_eq!(framer.pop().unwrap(), Some(FrameEvent::RechargeEnded));
        assert!(!framer.recharging());
        assert_eq!(framer.timeout(), protocol::BASE_TIMEOUT);
    }

    #[test]
    fn second_recharging_is_logic_error() {
        let mut framer = Framer::new();
        framer.feed(&framed(&["RECHARGING"]));
        assert_eq!(framer.pop().unwrap(), Some(FrameEvent::RechargeStarted));
        framer.feed(&framed(&["RECHARGING"]));
        assert_eq!(framer.pop(), Err(ProtocolError::Logic));
    }

    #[test]
    fn unexpected_frame_while_recharging_is_logic_error() {
        let mut framer = Framer::new();
        framer.feed(&framed(&["RECHARGING"]));
        assert_eq!(framer.pop().unwrap(), Some(FrameEvent::RechargeStarted));
        framer.feed(&framed(&["OK 0 0"]));
        assert_eq!(framer.pop(), Err(ProtocolError::Logic));
    }

    #[test]
    fn full_power_without_recharging_is_logic_error() {
        let mut framer = Framer::new();
        framer.feed(&framed(&["FULL POWER"]));
        assert_eq!(framer.pop(), Err(ProtocolError::Logic));
    }
}
