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

//! The standard connection-state set: login, password entry, password
//! change, and play.
//!
//! Password-entry states are quiet: entering one makes the transition
//! protocol send WILL ECHO so the client stops local echo, and leaving
//! restores it with WONT ECHO.

use crate::connection::{CloseReason, Connection};
use crate::dispatch::DispatchOutcome;
use crate::error::Result;
use crate::state::{
    ConnectionState, Focus, SessionContext, StateBehavior, StateFlags, StateRegistry,
    StateRegistryBuilder, transition_to,
};
use std::sync::Arc;
use tracing::info;

/// Registry names for the standard states.
pub mod names {
    /// Initial state: asks for a character name
    pub const LOGIN: &str = "login";
    /// Quiet state: verifies an existing account's password
    pub const PASSWORD: &str = "password";
    /// Quiet state: takes a new password
    pub const NEW_PASSWORD: &str = "new-password";
    /// Quiet state: confirms the new password
    pub const CONFIRM_PASSWORD: &str = "confirm-password";
    /// Prompting state: lines go to the command dispatcher
    pub const PLAYING: &str = "playing";
}

const MAX_PASSWORD_ATTEMPTS: u8 = 3;
const MIN_PASSWORD_LEN: usize = 5;

const GREETING: &str = "\r\nMudlark rises from the riverbed.\r\n\r\n";

fn valid_name(name: &str) -> bool {
    (2..=16).contains(&name.len()) && name.chars().all(|ch| ch.is_ascii_alphanumeric())
}

/// Asks for a name; known names go to password verification, unknown
/// names stage account creation.
struct LoginState;

impl StateBehavior for LoginState {
    fn on_focus(&self, conn: &mut Connection, _ctx: &mut SessionContext) -> Focus {
        conn.print(GREETING);
        conn.print("By what name do you wish to be known? ");
        Focus::Accept
    }

    fn on_line(&self, conn: &mut Connection, ctx: &mut SessionContext, line: &str) {
        let name = line.trim();
        if name.is_empty() {
            conn.print("By what name do you wish to be known? ");
            return;
        }
        if !valid_name(name) {
            conn.println("Names are 2-16 letters or digits.");
            conn.print("By what name do you wish to be known? ");
            return;
        }
        let name = name.to_string();
        if ctx.accounts.contains(&name) {
            conn.session_mut().pending_name = Some(name);
            transition_to(conn, ctx, names::PASSWORD);
        } else {
            conn.println(&format!("New arrival, {}.", name));
            conn.session_mut().pending_name = Some(name);
            transition_to(conn, ctx, names::NEW_PASSWORD);
        }
    }
}

/// Verifies an existing account's password; three misses close the
/// connection.
struct PasswordState;

impl StateBehavior for PasswordState {
    fn on_focus(&self, conn: &mut Connection, _ctx: &mut SessionContext) -> Focus {
        conn.print("Password: ");
        Focus::Accept
    }

    fn on_line(&self, conn: &mut Connection, ctx: &mut SessionContext, line: &str) {
        let Some(name) = conn.session().pending_name.clone() else {
            transition_to(conn, ctx, names::LOGIN);
            return;
        };
        let stored = ctx.accounts.secret(&name);
        let matched = stored
            .map(|stored| ctx.credentials.matches(&stored, line))
            .unwrap_or(false);
        if matched {
            info!(connection = %conn.name(), account = %name, "login succeeded");
            conn.session_mut().account = Some(name.clone());
            conn.session_mut().pending_name = None;
            conn.session_mut().failed_attempts = 0;
            conn.println("");
            conn.println(&format!("Welcome back, {}.", name));
            transition_to(conn, ctx, names::PLAYING);
        } else {
            conn.session_mut().failed_attempts += 1;
            let attempts = conn.session().failed_attempts;
            info!(
                connection = %conn.name(),
                account = %name,
                attempts,
                "password mismatch"
            );
            if attempts >= MAX_PASSWORD_ATTEMPTS {
                conn.println("");
                conn.println("Too many attempts.");
                conn.request_close(CloseReason::Requested);
            } else {
                conn.println("");
                conn.println("Wrong password.");
                conn.print("Password: ");
            }
        }
    }
}

/// Takes a new password, for account creation and for in-game password
/// changes alike.
struct NewPasswordState;

impl StateBehavior for NewPasswordState {
    fn on_focus(&self, conn: &mut Connection, _ctx: &mut SessionContext) -> Focus {
        conn.print("New password: ");
        Focus::Accept
    }

    fn on_line(&self, conn: &mut Connection, ctx: &mut SessionContext, line: &str) {
        if line.len() < MIN_PASSWORD_LEN {
            conn.println("");
            conn.println(&format!(
                "Passwords need at least {} characters.",
                MIN_PASSWORD_LEN
            ));
            conn.print("New password: ");
            return;
        }
        match ctx.credentials.digest(line) {
            Some(digest) => {
                conn.session_mut().pending_secret = Some(digest);
                conn.println("");
                transition_to(conn, ctx, names::CONFIRM_PASSWORD);
            }
            None => {
                conn.println("");
                conn.println("That password cannot be used; try another.");
                conn.print("New password: ");
            }
        }
    }
}

/// Confirms the staged password and stores it.
struct ConfirmPasswordState;

impl StateBehavior for ConfirmPasswordState {
    fn on_focus(&self, conn: &mut Connection, _ctx: &mut SessionContext) -> Focus {
        conn.print("Retype password: ");
        Focus::Accept
    }

    fn on_line(&self, conn: &mut Connection, ctx: &mut SessionContext, line: &str) {
        let Some(pending) = conn.session().pending_secret.clone() else {
            transition_to(conn, ctx, names::LOGIN);
            return;
        };
        if !ctx.credentials.matches(&pending, line) {
            conn.println("");
            conn.println("Passwords do not match; let's try again.");
            conn.session_mut().pending_secret = None;
            transition_to(conn, ctx, names::NEW_PASSWORD);
            return;
        }
        let owner = conn
            .session()
            .pending_name
            .clone()
            .or_else(|| conn.session().account.clone());
        let Some(owner) = owner else {
            transition_to(conn, ctx, names::LOGIN);
            return;
        };
        ctx.accounts.store_secret(&owner, &pending);
        info!(connection = %conn.name(), account = %owner, "password stored");
        conn.session_mut().account = Some(owner.clone());
        conn.session_mut().pending_name = None;
        conn.session_mut().pending_secret = None;
        conn.println("");
        conn.println(&format!("Very well, {}.", owner));
        transition_to(conn, ctx, names::PLAYING);
    }
}

/// In-game command entry. The `password` line starts a password change;
/// everything else goes to the injected dispatcher.
struct PlayingState;

impl StateBehavior for PlayingState {
    fn on_focus(&self, conn: &mut Connection, _ctx: &mut SessionContext) -> Focus {
        conn.request_prompt();
        Focus::Accept
    }

    fn on_line(&self, conn: &mut Connection, ctx: &mut SessionContext, line: &str) {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("password") {
            conn.println("Changing your password.");
            transition_to(conn, ctx, names::NEW_PASSWORD);
            return;
        }
        match ctx.dispatcher.interpret(conn, trimmed) {
            DispatchOutcome::CloseRequested => {}
            DispatchOutcome::Handled | DispatchOutcome::Unknown => conn.request_prompt(),
        }
    }
}

/// Build the standard registry: login (initial), password, new-password,
/// confirm-password (all quiet), and playing (prompting).
pub fn standard_registry() -> Result<Arc<StateRegistry>> {
    let quiet = StateFlags {
        quiet: true,
        ..StateFlags::default()
    };
    let registry = StateRegistryBuilder::new()
        .register(ConnectionState::new(
            names::LOGIN,
            StateFlags {
                initial: true,
                ..StateFlags::default()
            },
            Box::new(LoginState),
        ))
        .register(ConnectionState::new(
            names::PASSWORD,
            quiet,
            Box::new(PasswordState),
        ))
        .register(ConnectionState::new(
            names::NEW_PASSWORD,
            quiet,
            Box::new(NewPasswordState),
        ))
        .register(ConnectionState::new(
            names::CONFIRM_PASSWORD,
            quiet,
            Box::new(ConfirmPasswordState),
        ))
        .register(ConnectionState::new(
            names::PLAYING,
            StateFlags {
                prompt: true,
                ..StateFlags::default()
            },
            Box::new(PlayingState),
        ))
        .build()?;
    Ok(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryAccounts, PlainCredentials};
    use crate::config::ServerConfig;
    use crate::connection::ConnectionId;
    use crate::dispatch::BuiltinDispatcher;
    use crate::socket::socket_pair;
    use crate::state::{deliver_line, transition};

    fn context(accounts: MemoryAccounts) -> SessionContext {
        SessionContext::new(
            standard_registry().expect("registry"),
            Box::new(accounts),
            Box::new(PlainCredentials),
            Box::new(BuiltinDispatcher),
        )
    }

    async fn fresh_connection(ctx: &mut SessionContext) -> (Connection, tokio::net::TcpStream) {
        let (socket, client) = socket_pair().await;
        let mut conn = Connection::new(ConnectionId::new(1), socket, &ServerConfig::default());
        let initial = ctx.registry.initial();
        transition(&mut conn, ctx, &initial);
        (conn, client)
    }

    fn output_text(conn: &Connection) -> String {
        String::from_utf8_lossy(conn.pending_output()).into_owned()
    }

    #[test]
    fn standard_registry_shape() {
        let registry = standard_registry().expect("registry");
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.initial().name(), names::LOGIN);
        assert!(registry.get(names::PASSWORD).unwrap().is_quiet());
        assert!(registry.get(names::PLAYING).unwrap().shows_prompt());
        assert!(!registry.get(names::PLAYING).unwrap().is_quiet());
    }

    #[tokio::test]
    async fn known_name_goes_to_password_state() {
        let mut ctx = context(MemoryAccounts::new().with_account("alice", "swordfish"));
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "alice");
        assert_eq!(conn.state().unwrap().name(), names::PASSWORD);
        assert!(output_text(&conn).contains("Password: "));
    }

    #[tokio::test]
    async fn unknown_name_stages_account_creation() {
        let mut ctx = context(MemoryAccounts::new());
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "bob");
        assert_eq!(conn.state().unwrap().name(), names::NEW_PASSWORD);
        assert!(output_text(&conn).contains("New arrival, bob."));
    }

    #[tokio::test]
    async fn bad_names_are_rejected() {
        let mut ctx = context(MemoryAccounts::new());
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "x");
        assert_eq!(conn.state().unwrap().name(), names::LOGIN);
        deliver_line(&mut conn, &mut ctx, "not a name!");
        assert_eq!(conn.state().unwrap().name(), names::LOGIN);
    }

    #[tokio::test]
    async fn correct_password_reaches_playing() {
        let mut ctx = context(MemoryAccounts::new().with_account("alice", "swordfish"));
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "alice");
        deliver_line(&mut conn, &mut ctx, "swordfish");
        assert_eq!(conn.state().unwrap().name(), names::PLAYING);
        assert_eq!(conn.session().account.as_deref(), Some("alice"));
        assert!(output_text(&conn).contains("Welcome back, alice."));
    }

    #[tokio::test]
    async fn three_wrong_passwords_close_the_connection() {
        let mut ctx = context(MemoryAccounts::new().with_account("alice", "swordfish"));
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "alice");
        for _ in 0..3 {
            deliver_line(&mut conn, &mut ctx, "wrong");
        }
        assert_eq!(conn.close_reason(), Some(CloseReason::Requested));
    }

    #[tokio::test]
    async fn account_creation_round_trip() {
        let mut ctx = context(MemoryAccounts::new());
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "bob");
        deliver_line(&mut conn, &mut ctx, "hunter22");
        assert_eq!(conn.state().unwrap().name(), names::CONFIRM_PASSWORD);
        deliver_line(&mut conn, &mut ctx, "hunter22");
        assert_eq!(conn.state().unwrap().name(), names::PLAYING);
        assert_eq!(ctx.accounts.secret("bob").as_deref(), Some("hunter22"));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let mut ctx = context(MemoryAccounts::new());
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "bob");
        deliver_line(&mut conn, &mut ctx, "abc");
        assert_eq!(conn.state().unwrap().name(), names::NEW_PASSWORD);
    }

    #[tokio::test]
    async fn mismatched_confirmation_restarts() {
        let mut ctx = context(MemoryAccounts::new());
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "bob");
        deliver_line(&mut conn, &mut ctx, "hunter22");
        deliver_line(&mut conn, &mut ctx, "different");
        assert_eq!(conn.state().unwrap().name(), names::NEW_PASSWORD);
        assert!(ctx.accounts.secret("bob").is_none());
    }

    #[tokio::test]
    async fn password_command_starts_change_flow() {
        let mut ctx = context(MemoryAccounts::new().with_account("alice", "swordfish"));
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "alice");
        deliver_line(&mut conn, &mut ctx, "swordfish");
        deliver_line(&mut conn, &mut ctx, "password");
        assert_eq!(conn.state().unwrap().name(), names::NEW_PASSWORD);
        deliver_line(&mut conn, &mut ctx, "newsecret");
        deliver_line(&mut conn, &mut ctx, "newsecret");
        assert_eq!(conn.state().unwrap().name(), names::PLAYING);
        assert_eq!(ctx.accounts.secret("alice").as_deref(), Some("newsecret"));
    }

    #[tokio::test]
    async fn playing_lines_reach_the_dispatcher() {
        let mut ctx = context(MemoryAccounts::new().with_account("alice", "swordfish"));
        let (mut conn, _client) = fresh_connection(&mut ctx).await;
        deliver_line(&mut conn, &mut ctx, "alice");
        deliver_line(&mut conn, &mut ctx, "swordfish");
        conn.flush();
        deliver_line(&mut conn, &mut ctx, "say hail");
        assert!(output_text(&conn).contains("You say, 'hail'"));
    }
}
