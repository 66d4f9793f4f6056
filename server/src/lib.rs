//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! # Mudlark Telnet Server Core
//!
//! The connection-handling heart of a multi-user, telnet-accessed text
//! server: a non-blocking [`Socket`] layer, per-connection telnet decoding
//! and line assembly ([`Connection`]), a registry of named
//! [`ConnectionState`]s with a veto-capable transition protocol, and a
//! single-threaded [`Reactor`] that multiplexes every live socket through
//! one wait-and-dispatch cycle per iteration.
//!
//! ## Concurrency model
//!
//! Everything runs on one task. State callbacks are synchronous, run to
//! completion inside a dispatch step, and must not block; the only
//! blocking point is the reactor's readiness wait, bounded by the
//! caller's timeout. No locks exist in this core because nothing is ever
//! shared across threads.
//!
//! ## Failure model
//!
//! Would-block I/O is not an error. Peer disconnects, hard I/O errors,
//! and buffer overflows are fatal only to the affected connection, which
//! is destroyed through an ordered cascade (secondary session aborted,
//! state detached via focus-lost, socket released) while the loop keeps
//! running. Only bind failure at startup is fatal to the reactor itself.
//!
//! ## Collaborators
//!
//! Game semantics stay outside: completed lines are interpreted by an
//! injected [`LineDispatcher`], credentials by an opaque
//! [`CredentialCheck`], and account storage by an [`AccountStore`].

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

pub mod ansi;
pub mod auth;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod editor;
pub mod error;
pub mod reactor;
pub mod socket;
pub mod state;
pub mod states;

pub use self::auth::{AccountStore, BcryptCredentials, CredentialCheck, MemoryAccounts, PlainCredentials};
pub use self::config::ServerConfig;
pub use self::connection::{CloseReason, ConnEvent, Connection, ConnectionId, SecondaryMode};
pub use self::dispatch::{BuiltinDispatcher, DispatchOutcome, LineDispatcher};
pub use self::editor::{EditorOutcome, EditorSession, WizardOutcome, WizardSession};
pub use self::error::{Result, ServerError};
pub use self::reactor::Reactor;
pub use self::socket::{IoStatus, ListenSocket, Socket};
pub use self::state::{
    ConnectionState, Focus, SessionContext, StateBehavior, StateFlags, StateRegistry,
    StateRegistryBuilder,
};
