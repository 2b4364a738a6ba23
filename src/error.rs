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

//! Typed terminal outcomes for a session. Every path that ends a session
//! produces one of these instead of panicking on peer-controlled input.

use crate::protocol;

/// The three wire-level error classes a protocol violation can belong to.
/// Each variant knows the exact byte string sent back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Malformed frame: wrong length, bad integer, wrong token count.
    #[error("syntax error")]
    Syntax,
    /// Violation of the recharging sub-protocol.
    #[error("logic error")]
    Logic,
    /// Authentication-specific failure.
    #[error("auth error: {0}")]
    Auth(AuthFailure),
}

/// The two ways authentication can fail; each has a distinct wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("login failed")]
    LoginFailed,
    #[error("key out of range")]
    KeyOutOfRange,
}

impl ProtocolError {
    /// The exact payload (sans terminator) sent to the client for this
    /// error, per spec §7.
    pub fn wire_message(&self) -> &'static str {
        match self {
            ProtocolError::Syntax => protocol::SYNTAX_ERROR,
            ProtocolError::Logic => protocol::LOGIC_ERROR,
            ProtocolError::Auth(AuthFailure::LoginFailed) => protocol::LOGIN_FAILED,
            ProtocolError::Auth(AuthFailure::KeyOutOfRange) => protocol::KEY_OUT_OF_RANGE,
        }
    }
}

/// Why a session's run loop returned.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The underlying stream failed on read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The idle-read timeout elapsed.
    #[error("idle timeout")]
    Timeout,
    /// A protocol violation was detected; the matching error frame has
    /// already been written (best-effort) before this is returned.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The client was logged out normally after delivering its message.
    #[error("session closed")]
    Closed,
}
