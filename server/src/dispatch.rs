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

//! The line dispatcher seam.
//!
//! The connection core does not know what a "command" is: once a
//! connection is playing, completed lines are handed to whatever
//! [`LineDispatcher`] was injected at construction. The built-in
//! dispatcher exists so the binary and the tests have a working seam, not
//! because this crate owns game semantics.

use crate::connection::{CloseReason, Connection};
use crate::editor::{EditorSession, WizardSession};

/// What the dispatcher did with a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The line was understood and acted on
    Handled,
    /// Nobody recognized the command
    Unknown,
    /// The connection should close (e.g. `quit`)
    CloseRequested,
}

/// Interprets one completed input line for a playing connection.
pub trait LineDispatcher: Send {
    /// Interpret `line`, acting on `conn` as needed.
    fn interpret(&mut self, conn: &mut Connection, line: &str) -> DispatchOutcome;
}

/// The minimal command set the server binary ships with.
#[derive(Debug, Default)]
pub struct BuiltinDispatcher;

impl LineDispatcher for BuiltinDispatcher {
    fn interpret(&mut self, conn: &mut Connection, line: &str) -> DispatchOutcome {
        let (verb, rest) = match line.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        match verb {
            "" => DispatchOutcome::Handled,
            "quit" | "logout" => {
                conn.println("Goodbye.");
                conn.request_close(CloseReason::Requested);
                DispatchOutcome::CloseRequested
            }
            "say" => {
                if rest.is_empty() {
                    conn.println("Say what?");
                } else {
                    conn.println(&format!("You say, '{}'", rest));
                }
                DispatchOutcome::Handled
            }
            "look" => {
                conn.println("You are adrift in the void between worlds.");
                DispatchOutcome::Handled
            }
            "write" => {
                conn.println("Compose your text. '.' finishes, '~' aborts, '-' deletes the last line.");
                conn.start_editor(EditorSession::new(64));
                DispatchOutcome::Handled
            }
            "forge" => {
                let wizard = WizardSession::new(vec![
                    ("name".to_string(), "Name the object: ".to_string()),
                    ("short".to_string(), "Short description: ".to_string()),
                    ("long".to_string(), "Long description: ".to_string()),
                ]);
                if let Some(prompt) = wizard.first_prompt() {
                    let prompt = prompt.to_string();
                    conn.println("Forging a new object; '~' cancels.");
                    conn.print(&prompt);
                }
                conn.start_wizard(wizard);
                DispatchOutcome::Handled
            }
            "color" => {
                match rest {
                    "on" => {
                        conn.set_color(true);
                        conn.println("Color enabled.");
                    }
                    "off" => {
                        conn.set_color(false);
                        conn.println("Color disabled.");
                    }
                    _ => conn.println("Usage: color <on|off>"),
                }
                DispatchOutcome::Handled
            }
            "stats" => {
                let line = format!(
                    "{} from {}: {} bytes out, {} bytes in, window {}",
                    conn.name(),
                    conn.host(),
                    conn.bytes_sent(),
                    conn.bytes_received(),
                    conn.window(),
                );
                conn.println(&line);
                DispatchOutcome::Handled
            }
            _ => {
                conn.println("Huh?");
                DispatchOutcome::Unknown
            }
        }
    }
}
