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

//! A TCP server that guides a remote robot client to the origin and
//! retrieves its secret message. The protocol core — framing,
//! authentication, and navigation — is independent of the listener and
//! logging layer in [`server`]; it operates on any `AsyncRead + AsyncWrite`
//! stream via [`Session`].

pub mod auth;
pub mod error;
pub mod framer;
pub mod navigator;
pub mod protocol;
pub mod server;
pub mod session;

pub use error::{ProtocolError, SessionError};
pub use server::{run, ServerConfig};
pub use session::Session;
