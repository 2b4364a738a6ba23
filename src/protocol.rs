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

//! Wire-level constants shared by every layer of the protocol core.

/// Two-byte frame terminator. A complete frame ends at the first `\a`
/// followed by `\b`; no valid frame payload ever contains this sequence.
pub const TERMINATOR: [u8; 2] = [0x07, 0x08];

/// Directives and status frames the server ever sends, as exact payload
/// bytes (the terminator is appended by the caller).
pub const OK: &str = "200 OK";
pub const MOVE: &str = "102 MOVE";
pub const TURN_LEFT: &str = "103 TURN LEFT";
pub const TURN_RIGHT: &str = "104 TURN RIGHT";
pub const GET_MESSAGE: &str = "105 GET MESSAGE";
pub const LOGOUT: &str = "106 LOGOUT";
pub const KEY_REQUEST: &str = "107 KEY REQUEST";
pub const LOGIN_FAILED: &str = "300 LOGIN FAILED";
pub const SYNTAX_ERROR: &str = "301 SYNTAX ERROR";
pub const LOGIC_ERROR: &str = "302 LOGIC ERROR";
pub const KEY_OUT_OF_RANGE: &str = "303 KEY OUT OF RANGE";

/// Recharging sub-protocol candidate frames.
pub const RECHARGING: &str = "RECHARGING";
pub const FULL_POWER: &str = "FULL POWER";

/// Per-username-hash server confirmation offsets, indexed by key id.
pub const SERVER_KEY: [u16; 5] = [23019, 32037, 18789, 16443, 18189];
/// Per-username-hash client confirmation offsets, indexed by key id.
pub const CLIENT_KEY: [u16; 5] = [32037, 29295, 13603, 29533, 21952];

/// Maximum username length, in bytes.
pub const MAX_USERNAME_LEN: usize = 18;
/// Maximum key-id payload length, in bytes (decimal digits of `key_id`).
pub const MAX_KEY_ID_LEN: usize = 3;
/// Maximum confirmation payload length, in bytes.
pub const MAX_CONFIRMATION_LEN: usize = 5;
/// Maximum `OK <x> <y>` payload length while navigating.
pub const MAX_NAV_LEN: usize = 10;
/// Maximum secret-message payload length while picking up.
pub const MAX_PICKUP_LEN: usize = 98;

/// Base idle-read timeout.
pub const BASE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);
/// Idle-read timeout while the client is recharging.
pub const RECHARGE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
