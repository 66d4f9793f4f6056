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

//! Non-blocking TCP endpoint wrappers.
//!
//! [`Socket`] is a thin shell around a connected `tokio::net::TcpStream`:
//! readiness waiting for the reactor, non-blocking `try_read`/`try_write`
//! with a tri-state result, cumulative byte counters, and an idempotent
//! close. [`ListenSocket`] covers the bind/listen/accept side.

use crate::error::{Result, ServerError};
use std::io;
use std::net::SocketAddr;
use tokio::io::{Interest, Ready};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

/// Outcome of one non-blocking read or write attempt.
///
/// Would-block is not an error; it just means "nothing transferable right
/// now" and control returns to the reactor.
#[derive(Debug)]
pub enum IoStatus {
    /// This many bytes moved
    Transferred(usize),
    /// The operation would have blocked; zero bytes moved
    WouldBlock,
    /// Orderly EOF or an already-closed socket
    Closed,
    /// The OS reported a hard error (reset, broken pipe, ...)
    Failed(io::Error),
}

/// A connected, non-blocking TCP endpoint.
pub struct Socket {
    stream: TcpStream,
    peer_addr: SocketAddr,
    bytes_sent: u64,
    bytes_received: u64,
    open: bool,
}

impl Socket {
    /// Wrap an accepted stream.
    pub(crate) fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Socket {
            stream,
            peer_addr,
            bytes_sent: 0,
            bytes_received: 0,
            open: true,
        }
    }

    /// The remote address this socket is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Total bytes written to the peer so far.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Total bytes read from the peer so far.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Whether the socket is still open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Mark the socket closed. Safe to call twice; the file descriptor is
    /// released when the socket is dropped.
    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            debug!(peer = %self.peer_addr, "socket closed");
        }
    }

    /// Wait until the socket is ready for the given interest set.
    pub async fn ready(&self, interest: Interest) -> io::Result<Ready> {
        self.stream.ready(interest).await
    }

    /// Attempt a non-blocking read into `buf`.
    pub fn try_read(&mut self, buf: &mut [u8]) -> IoStatus {
        if !self.open {
            return IoStatus::Closed;
        }
        match self.stream.try_read(buf) {
            Ok(0) => IoStatus::Closed,
            Ok(n) => {
                self.bytes_received += n as u64;
                IoStatus::Transferred(n)
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => IoStatus::WouldBlock,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => IoStatus::WouldBlock,
            Err(err) => IoStatus::Failed(err),
        }
    }

    /// Attempt a non-blocking write of `buf`.
    pub fn try_write(&mut self, buf: &[u8]) -> IoStatus {
        if !self.open {
            return IoStatus::Closed;
        }
        match self.stream.try_write(buf) {
            Ok(0) => IoStatus::WouldBlock,
            Ok(n) => {
                self.bytes_sent += n as u64;
                IoStatus::Transferred(n)
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => IoStatus::WouldBlock,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => IoStatus::WouldBlock,
            Err(err) => IoStatus::Failed(err),
        }
    }
}

impl std::fmt::Debug for Socket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Socket")
            .field("peer_addr", &self.peer_addr)
            .field("open", &self.open)
            .field("bytes_sent", &self.bytes_sent)
            .field("bytes_received", &self.bytes_received)
            .finish()
    }
}

/// A bound, listening TCP socket.
pub struct ListenSocket {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ListenSocket {
    /// Bind and listen on `addr`. Failure here is a startup configuration
    /// error, fatal to the caller.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        Ok(ListenSocket {
            listener,
            local_addr,
        })
    }

    /// The address this listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept the next incoming connection.
    pub async fn accept(&self) -> io::Result<Socket> {
        let (stream, peer_addr) = self.listener.accept().await?;
        Ok(Socket::new(stream, peer_addr))
    }
}

/// Test helper: a connected (server socket, client stream) pair on
/// localhost.
#[cfg(test)]
pub(crate) async fn socket_pair() -> (Socket, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let client = TcpStream::connect(addr).await.expect("connect");
    let (stream, peer) = listener.accept().await.expect("accept");
    (Socket::new(stream, peer), client)
}
