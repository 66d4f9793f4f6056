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

//! Connection states, their registry, and the transition protocol.
//!
//! A [`ConnectionState`] is a named, immutable behavior descriptor shared
//! by every connection currently in that state; the registry owns them for
//! process lifetime. Callbacks are synchronous and must not block — they
//! run to completion inside one reactor dispatch step.

use crate::auth::{AccountStore, CredentialCheck};
use crate::connection::Connection;
use crate::dispatch::LineDispatcher;
use crate::error::{Result, ServerError};
use mudlark_telnetcodec::{TelnetFrame, TelnetOption};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Verdict from a focus callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Proceed with the transition
    Accept,
    /// Veto it; the connection keeps its previous state
    Reject,
}

/// The capability interface a state implements.
///
/// All three callbacks are synchronous; a callback may print, request a
/// transition, or close the connection, but never block.
pub trait StateBehavior: Send + Sync {
    /// The connection just entered this state. Rejecting rolls the
    /// connection back to its previous state.
    fn on_focus(&self, _conn: &mut Connection, _ctx: &mut SessionContext) -> Focus {
        Focus::Accept
    }

    /// The connection is about to leave this state. Rejecting aborts the
    /// whole transition; this is the only veto point.
    fn on_focus_lost(&self, _conn: &mut Connection, _ctx: &mut SessionContext) -> Focus {
        Focus::Accept
    }

    /// A completed input line arrived while this state had focus.
    fn on_line(&self, conn: &mut Connection, ctx: &mut SessionContext, line: &str);
}

/// The three behavior flags a state carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateFlags {
    /// New connections start here; exactly one registered state sets this
    pub initial: bool,
    /// The state shows a prompt at idle points
    pub prompt: bool,
    /// Client-side echo is suppressed while in this state (password entry)
    pub quiet: bool,
}

/// A named, registry-owned connection state.
pub struct ConnectionState {
    name: String,
    flags: StateFlags,
    behavior: Box<dyn StateBehavior>,
}

impl ConnectionState {
    /// Create a state. It becomes immutable once registered.
    pub fn new(
        name: impl Into<String>,
        flags: StateFlags,
        behavior: Box<dyn StateBehavior>,
    ) -> Self {
        ConnectionState {
            name: name.into(),
            flags,
            behavior,
        }
    }

    /// The registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether new connections start in this state.
    pub fn is_initial(&self) -> bool {
        self.flags.initial
    }

    /// Whether this state shows a prompt at idle points.
    pub fn shows_prompt(&self) -> bool {
        self.flags.prompt
    }

    /// Whether client-side echo is suppressed in this state.
    pub fn is_quiet(&self) -> bool {
        self.flags.quiet
    }

    pub(crate) fn behavior(&self) -> &dyn StateBehavior {
        self.behavior.as_ref()
    }
}

impl std::fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionState")
            .field("name", &self.name)
            .field("initial", &self.flags.initial)
            .field("prompt", &self.flags.prompt)
            .field("quiet", &self.flags.quiet)
            .finish()
    }
}

/// Builder for the state registry.
#[derive(Default)]
pub struct StateRegistryBuilder {
    states: Vec<ConnectionState>,
}

impl StateRegistryBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        StateRegistryBuilder::default()
    }

    /// Register a state.
    pub fn register(mut self, state: ConnectionState) -> Self {
        self.states.push(state);
        self
    }

    /// Validate and build: names must be unique and exactly one state
    /// must be flagged initial.
    pub fn build(self) -> Result<StateRegistry> {
        let initial_count = self.states.iter().filter(|s| s.is_initial()).count();
        if initial_count != 1 {
            return Err(ServerError::InitialStateCount {
                count: initial_count,
            });
        }
        let mut states: HashMap<String, Arc<ConnectionState>> = HashMap::new();
        let mut initial = None;
        for state in self.states {
            let state = Arc::new(state);
            if state.is_initial() {
                initial = Some(state.clone());
            }
            if states
                .insert(state.name().to_string(), state.clone())
                .is_some()
            {
                return Err(ServerError::DuplicateState(state.name().to_string()));
            }
        }
        Ok(StateRegistry {
            states,
            initial: initial.expect("validated above"),
        })
    }
}

/// Name-indexed, read-only-after-load registry of connection states.
pub struct StateRegistry {
    states: HashMap<String, Arc<ConnectionState>>,
    initial: Arc<ConnectionState>,
}

impl StateRegistry {
    /// Look a state up by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<ConnectionState>> {
        self.states.get(name).cloned()
    }

    /// The single state new connections are assigned.
    pub fn initial(&self) -> Arc<ConnectionState> {
        self.initial.clone()
    }

    /// Number of registered states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the registry is empty (it never is once built).
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Everything state callbacks may reach, injected at reactor construction
/// and threaded by reference through each dispatch — never ambient.
pub struct SessionContext {
    /// The state registry, shared read-only
    pub registry: Arc<StateRegistry>,
    /// Account name → stored credential
    pub accounts: Box<dyn AccountStore>,
    /// Opaque credential comparison/digestion
    pub credentials: Box<dyn CredentialCheck>,
    /// The line dispatcher that interprets in-game commands
    pub dispatcher: Box<dyn LineDispatcher>,
}

impl SessionContext {
    /// Assemble a context.
    pub fn new(
        registry: Arc<StateRegistry>,
        accounts: Box<dyn AccountStore>,
        credentials: Box<dyn CredentialCheck>,
        dispatcher: Box<dyn LineDispatcher>,
    ) -> Self {
        SessionContext {
            registry,
            accounts,
            credentials,
            dispatcher,
        }
    }
}

/// Move `conn` to `target`, honoring the transition protocol:
///
/// 1. Same state → no-op, zero callbacks.
/// 2. The outgoing state's `on_focus_lost` may veto; the connection then
///    stays where it was.
/// 3. The incoming state's `on_focus` may reject; the connection rolls
///    back to the previous state.
/// 4. A change of the quiet flag emits exactly one echo negotiation:
///    WILL ECHO entering quiet (server-side echo), WONT ECHO leaving it.
pub fn transition(conn: &mut Connection, ctx: &mut SessionContext, target: &Arc<ConnectionState>) {
    if let Some(current) = conn.state() {
        if Arc::ptr_eq(&current, target) {
            return;
        }
    }

    let previous = conn.state();
    if let Some(current) = previous.clone() {
        if current.behavior().on_focus_lost(conn, ctx) == Focus::Reject {
            debug!(
                connection = %conn.name(),
                state = current.name(),
                "transition vetoed by focus-lost"
            );
            return;
        }
    }

    conn.set_state(Some(target.clone()));
    if target.behavior().on_focus(conn, ctx) == Focus::Reject {
        debug!(
            connection = %conn.name(),
            state = target.name(),
            "transition rejected by focus-gained, rolling back"
        );
        conn.set_state(previous);
        return;
    }

    let was_quiet = previous.map(|state| state.is_quiet()).unwrap_or(false);
    if target.is_quiet() && !was_quiet {
        conn.send_frame(TelnetFrame::Will(TelnetOption::Echo));
    } else if !target.is_quiet() && was_quiet {
        conn.send_frame(TelnetFrame::Wont(TelnetOption::Echo));
    }
}

/// Transition by registry name; a missing name is logged and ignored.
pub fn transition_to(conn: &mut Connection, ctx: &mut SessionContext, name: &str) {
    match ctx.registry.get(name) {
        Some(target) => transition(conn, ctx, &target),
        None => warn!(
            connection = %conn.name(),
            state = name,
            "transition to unknown state ignored"
        ),
    }
}

/// Hand a completed input line to the connection's current state.
pub fn deliver_line(conn: &mut Connection, ctx: &mut SessionContext, line: &str) {
    if let Some(state) = conn.state() {
        state.behavior().on_line(conn, ctx, line);
    } else {
        warn!(connection = %conn.name(), "line arrived with no current state");
    }
}
