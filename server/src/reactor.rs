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

//! The reactor: one single-threaded wait-and-dispatch loop multiplexing
//! the listener and every live connection.
//!
//! Each [`Reactor::run_once`] cycle waits for readiness across the whole
//! set, accepts, reads, dispatches state callbacks, flushes, and finally
//! sweeps out connections that closed during dispatch. Everything runs to
//! completion on the calling task; connection state is never touched from
//! anywhere else, so the whole core is lock-free.
//!
//! Per-connection failures are contained: a connection that overflows a
//! buffer, resets, or errors is marked, swept, and destroyed while the
//! loop keeps servicing everyone else.

use crate::config::ServerConfig;
use crate::connection::{ConnEvent, Connection, ConnectionId};
use crate::error::Result;
use crate::socket::{ListenSocket, Socket};
use crate::state::{self, SessionContext};
use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use mudlark_telnetcodec::{TelnetFrame, TelnetOption};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::Ready;
use tracing::{debug, error, info, warn};

/// The single-threaded connection multiplexer.
pub struct Reactor {
    listener: ListenSocket,
    connections: HashMap<ConnectionId, Connection>,
    context: SessionContext,
    config: ServerConfig,
    next_id: u64,
    shutdown: bool,
}

impl Reactor {
    /// Bind the listening socket and assemble the reactor. Bind failure
    /// is fatal; nothing else here can fail.
    pub async fn bind(config: ServerConfig, context: SessionContext) -> Result<Self> {
        let listener = ListenSocket::bind(config.bind_address).await?;
        info!(addr = %listener.local_addr(), "reactor listening");
        Ok(Reactor {
            listener,
            connections: HashMap::new(),
            context,
            config,
            next_id: 0,
            shutdown: false,
        })
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Look a live connection up by its generated name.
    pub fn find_by_name(&self, name: &str) -> Option<&Connection> {
        self.connections.values().find(|conn| conn.name() == name)
    }

    /// Ask the run loop to stop after the current cycle.
    pub fn request_shutdown(&mut self) {
        self.shutdown = true;
    }

    /// Run cycles with the configured poll timeout until shutdown is
    /// requested.
    pub async fn run(&mut self) -> Result<()> {
        while !self.shutdown {
            self.run_once(self.config.poll_timeout).await?;
        }
        Ok(())
    }

    /// One wait-and-dispatch cycle.
    ///
    /// `timeout` bounds only the readiness wait, exactly as given — the
    /// reactor imposes no implicit minimum, so callers can interleave
    /// periodic non-network work by passing something short. `None` waits
    /// until the listener or a connection becomes ready.
    pub async fn run_once(&mut self, timeout: Option<Duration>) -> Result<()> {
        // Emit due prompts so their bytes join this cycle's write interest.
        for conn in self.connections.values_mut() {
            conn.prompt();
        }

        let mut incoming: Option<io::Result<Socket>> = None;
        let mut wakes: Vec<(ConnectionId, Ready)> = Vec::new();
        {
            let mut readiness = FuturesUnordered::new();
            for (id, conn) in &self.connections {
                let interest = conn.interest();
                let socket = conn.socket();
                readiness.push(async move { (*id, socket.ready(interest).await) });
            }
            tokio::select! {
                accepted = self.listener.accept() => {
                    incoming = Some(accepted);
                }
                Some((id, ready)) = readiness.next() => {
                    wakes.push((id, flatten_ready(id, ready)));
                }
                () = sleep_for(timeout) => {}
            }
            // Collect whatever else is already ready without waiting again.
            while let Some(Some((id, ready))) = readiness.next().now_or_never() {
                wakes.push((id, flatten_ready(id, ready)));
            }
        }

        if let Some(accepted) = incoming {
            self.accept(accepted);
        }

        for (id, ready) in wakes {
            let Some(conn) = self.connections.get_mut(&id) else {
                continue;
            };
            if ready.is_readable() {
                let events = conn.receive();
                for event in events {
                    let Some(conn) = self.connections.get_mut(&id) else {
                        break;
                    };
                    match event {
                        ConnEvent::Line(line) => {
                            state::deliver_line(conn, &mut self.context, &line);
                        }
                        ConnEvent::EditorFinished(body) => {
                            info!(
                                connection = %conn.name(),
                                bytes = body.len(),
                                "editor session finished"
                            );
                            conn.println("Ok.");
                        }
                        ConnEvent::EditorAborted => {
                            conn.println("Edit aborted.");
                        }
                        ConnEvent::WizardFinished(fields) => {
                            info!(
                                connection = %conn.name(),
                                fields = fields.len(),
                                "wizard session finished"
                            );
                            conn.println("Done.");
                        }
                        ConnEvent::WizardAborted => {
                            conn.println("Cancelled.");
                        }
                    }
                }
            }
            if let Some(conn) = self.connections.get_mut(&id) {
                if ready.is_writable() {
                    conn.flush();
                }
            }
        }

        self.sweep();
        Ok(())
    }

    /// Wrap an accepted socket, pre-seed the standard negotiation
    /// (client-side echo on, window-size reports requested), and hand the
    /// connection to the registry's initial state.
    fn accept(&mut self, accepted: io::Result<Socket>) {
        let socket = match accepted {
            Ok(socket) => socket,
            Err(err) => {
                // Transient OS-level accept failure; the listener stays up
                error!(error = %err, "accept failed");
                return;
            }
        };
        if self.connections.len() >= self.config.max_connections {
            warn!(
                limit = self.config.max_connections,
                peer = %socket.peer_addr(),
                "connection limit reached, dropping incoming connection"
            );
            return;
        }
        self.next_id += 1;
        let id = ConnectionId::new(self.next_id);
        let mut conn = Connection::new(id, socket, &self.config);
        conn.send_frame(TelnetFrame::Wont(TelnetOption::Echo));
        conn.send_frame(TelnetFrame::Do(TelnetOption::Naws));
        let initial = self.context.registry.initial();
        state::transition(&mut conn, &mut self.context, &initial);
        self.connections.insert(id, conn);
    }

    /// Remove and destroy every connection that closed, lost its socket,
    /// or lost its state during dispatch.
    fn sweep(&mut self) {
        let dead: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_closing() || conn.state().is_none())
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            self.destroy(id);
        }
    }

    /// The ordered destruction cascade: abort any secondary session,
    /// detach from the current state via its focus-lost callback, then
    /// close and release the socket.
    fn destroy(&mut self, id: ConnectionId) {
        let Some(mut conn) = self.connections.remove(&id) else {
            return;
        };
        conn.abort_secondary();
        if let Some(current) = conn.state() {
            let _ = current.behavior().on_focus_lost(&mut conn, &mut self.context);
            conn.set_state(None);
        }
        conn.release();
        info!(
            connection = %conn.name(),
            host = conn.host(),
            reason = %conn
                .close_reason()
                .map(|reason| reason.to_string())
                .unwrap_or_else(|| "stateless".to_string()),
            "connection destroyed"
        );
    }

    /// Notify and destroy every live connection, then mark the loop for
    /// shutdown.
    pub fn shutdown(&mut self) {
        info!(connections = self.connections.len(), "reactor shutting down");
        let ids: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for id in ids {
            if let Some(conn) = self.connections.get_mut(&id) {
                conn.println("The river rises; the server is going down.");
                conn.flush();
            }
            self.destroy(id);
        }
        self.shutdown = true;
    }
}

/// A readiness error is surfaced as read-readiness so the connection's
/// own read path observes and records the failure.
fn flatten_ready(id: ConnectionId, ready: io::Result<Ready>) -> Ready {
    match ready {
        Ok(ready) => ready,
        Err(err) => {
            debug!(connection = %id, error = %err, "readiness wait failed");
            Ready::READABLE
        }
    }
}

async fn sleep_for(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}
