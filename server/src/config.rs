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

//! Server configuration
//!
//! # Example
//!
//! ```
//! use mudlark_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::new("0.0.0.0:4000".parse().unwrap())
//!     .with_max_connections(512)
//!     .with_poll_timeout(Some(Duration::from_millis(250)));
//! ```

use mudlark_telnetcodec::WindowSize;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the reactor and every connection it creates.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind and listen on
    pub bind_address: SocketAddr,

    /// Maximum simultaneous connections; excess accepts are dropped
    pub max_connections: usize,

    /// Capacity of the in-progress input line buffer, in bytes.
    /// Filling it is fatal for that connection.
    pub input_capacity: usize,

    /// Capacity of the pending output buffer, in bytes. A print that
    /// would exceed it closes that connection.
    pub output_capacity: usize,

    /// Capacity of the telnet sub-negotiation scratch buffer
    pub subneg_capacity: usize,

    /// Window size assumed until NAWS negotiation lands
    pub default_window: WindowSize,

    /// Prompt text shown by states that display prompts
    pub prompt: String,

    /// How long one reactor cycle may block waiting for readiness.
    /// `None` blocks until something happens; the reactor imposes no
    /// implicit minimum.
    pub poll_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".parse().expect("static address"),
            max_connections: 256,
            input_capacity: 256,
            output_capacity: 16 * 1024,
            subneg_capacity: 64,
            default_window: WindowSize::default(),
            prompt: "> ".to_string(),
            poll_timeout: Some(Duration::from_millis(250)),
        }
    }
}

impl ServerConfig {
    /// Create a configuration bound to `addr` with default limits.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            bind_address: addr,
            ..Self::default()
        }
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the connection limit.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the input line buffer capacity.
    pub fn with_input_capacity(mut self, capacity: usize) -> Self {
        self.input_capacity = capacity;
        self
    }

    /// Set the output buffer capacity.
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    /// Set the sub-negotiation scratch capacity.
    pub fn with_subneg_capacity(mut self, capacity: usize) -> Self {
        self.subneg_capacity = capacity;
        self
    }

    /// Set the window size assumed before NAWS negotiation.
    pub fn with_default_window(mut self, window: WindowSize) -> Self {
        self.default_window = window;
        self
    }

    /// Set the prompt text.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the reactor poll timeout.
    pub fn with_poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let config = ServerConfig::default();
        assert_eq!(config.input_capacity, 256);
        assert_eq!(config.output_capacity, 16 * 1024);
        assert_eq!(config.default_window, WindowSize::new(80, 25));
        assert_eq!(config.prompt, "> ");
    }

    #[test]
    fn builder_chain() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap())
            .with_max_connections(8)
            .with_input_capacity(128)
            .with_output_capacity(4096)
            .with_prompt("] ")
            .with_poll_timeout(None);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.input_capacity, 128);
        assert_eq!(config.output_capacity, 4096);
        assert_eq!(config.prompt, "] ");
        assert!(config.poll_timeout.is_none());
    }
}
