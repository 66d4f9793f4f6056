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

//! Error types for the Mudlark server

use std::net::SocketAddr;
use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Mudlark server error types.
///
/// Per-connection trouble (would-block I/O, peer resets, buffer overflow)
/// never surfaces here; those are handled in place by closing the affected
/// connection. These errors are the fatal, startup-level kind.
#[derive(Debug, Error)]
pub enum ServerError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error from the codec layer
    #[error("protocol error: {0}")]
    Protocol(#[from] mudlark_telnetcodec::CodecError),

    /// Binding the listening socket failed at startup
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound
        addr: SocketAddr,
        /// The underlying OS error
        source: std::io::Error,
    },

    /// The state registry was built without exactly one initial state
    #[error("state registry has {count} initial states, expected exactly one")]
    InitialStateCount {
        /// How many states were flagged initial
        count: usize,
    },

    /// Two states were registered under the same name
    #[error("duplicate connection state name: {0}")]
    DuplicateState(String),
}
