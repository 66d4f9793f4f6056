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

//! Secondary connection modes.
//!
//! While one of these is active on a connection it intercepts completed
//! input lines before the connection state sees them. A connection carries
//! at most one at a time, and the close cascade aborts whichever is active.

use tracing::warn;

/// What the editor did with a submitted line.
#[derive(Debug, PartialEq, Eq)]
pub enum EditorOutcome {
    /// Line consumed, session continues
    Continue,
    /// `.` received: the session is over and this is the composed body
    Finished(String),
    /// `~` received: the session is over and the text is discarded
    Aborted,
}

/// A line-collecting editor session.
///
/// Control lines: `.` alone finishes, `~` alone aborts, `-` alone deletes
/// the most recently entered line. Everything else is appended, up to a
/// line-count bound (extra lines are dropped with a warning).
#[derive(Debug)]
pub struct EditorSession {
    lines: Vec<String>,
    max_lines: usize,
}

impl EditorSession {
    /// Create an editor bounded to `max_lines` lines of text.
    pub fn new(max_lines: usize) -> Self {
        EditorSession {
            lines: Vec::new(),
            max_lines,
        }
    }

    /// Submit one completed input line to the editor.
    pub fn add_line(&mut self, line: &str) -> EditorOutcome {
        match line.trim_end() {
            "." => EditorOutcome::Finished(self.finish()),
            "~" => {
                self.abort();
                EditorOutcome::Aborted
            }
            "-" => {
                self.lines.pop();
                EditorOutcome::Continue
            }
            text => {
                if self.lines.len() >= self.max_lines {
                    warn!(max_lines = self.max_lines, "editor full, dropping line");
                } else {
                    self.lines.push(text.to_string());
                }
                EditorOutcome::Continue
            }
        }
    }

    /// Join the collected lines into the finished body.
    pub fn finish(&mut self) -> String {
        let mut body = self.lines.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        self.lines.clear();
        body
    }

    /// Discard everything collected so far.
    pub fn abort(&mut self) {
        self.lines.clear();
    }

    /// How many lines are currently buffered.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// What the wizard did with a submitted answer.
#[derive(Debug, PartialEq, Eq)]
pub enum WizardOutcome {
    /// Answer recorded; this is the next prompt to show
    Prompt(String),
    /// All steps answered: (key, answer) pairs in step order
    Finished(Vec<(String, String)>),
    /// `~` received: the session is over, answers discarded
    Aborted,
}

/// A step-driven prompt walker for object-creation flows.
///
/// Each step is a `(key, prompt)` pair; answers are collected in order and
/// returned as a field map when the last step completes.
#[derive(Debug)]
pub struct WizardSession {
    steps: Vec<(String, String)>,
    answers: Vec<(String, String)>,
    cursor: usize,
}

impl WizardSession {
    /// Create a wizard over the given `(key, prompt)` steps.
    pub fn new(steps: Vec<(String, String)>) -> Self {
        WizardSession {
            steps,
            answers: Vec::new(),
            cursor: 0,
        }
    }

    /// The prompt for the first step, if there is one.
    pub fn first_prompt(&self) -> Option<&str> {
        self.steps.first().map(|(_, prompt)| prompt.as_str())
    }

    /// Submit the answer to the current step.
    pub fn answer(&mut self, line: &str) -> WizardOutcome {
        if line.trim_end() == "~" {
            self.abort();
            return WizardOutcome::Aborted;
        }
        let Some((key, _)) = self.steps.get(self.cursor) else {
            return WizardOutcome::Finished(std::mem::take(&mut self.answers));
        };
        self.answers.push((key.clone(), line.to_string()));
        self.cursor += 1;
        match self.steps.get(self.cursor) {
            Some((_, prompt)) => WizardOutcome::Prompt(prompt.clone()),
            None => WizardOutcome::Finished(std::mem::take(&mut self.answers)),
        }
    }

    /// Discard all answers.
    pub fn abort(&mut self) {
        self.answers.clear();
        self.cursor = self.steps.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_collects_and_finishes() {
        let mut editor = EditorSession::new(16);
        assert_eq!(editor.add_line("first"), EditorOutcome::Continue);
        assert_eq!(editor.add_line("second"), EditorOutcome::Continue);
        assert_eq!(
            editor.add_line("."),
            EditorOutcome::Finished("first\nsecond\n".to_string())
        );
        assert_eq!(editor.line_count(), 0);
    }

    #[test]
    fn editor_delete_last_line() {
        let mut editor = EditorSession::new(16);
        editor.add_line("keep");
        editor.add_line("oops");
        assert_eq!(editor.add_line("-"), EditorOutcome::Continue);
        assert_eq!(
            editor.add_line("."),
            EditorOutcome::Finished("keep\n".to_string())
        );
    }

    #[test]
    fn editor_abort_discards() {
        let mut editor = EditorSession::new(16);
        editor.add_line("text");
        assert_eq!(editor.add_line("~"), EditorOutcome::Aborted);
        assert_eq!(editor.line_count(), 0);
    }

    #[test]
    fn editor_bounded() {
        let mut editor = EditorSession::new(2);
        editor.add_line("one");
        editor.add_line("two");
        editor.add_line("three");
        assert_eq!(editor.line_count(), 2);
    }

    #[test]
    fn wizard_walks_steps() {
        let mut wizard = WizardSession::new(vec![
            ("name".to_string(), "Name? ".to_string()),
            ("desc".to_string(), "Description? ".to_string()),
        ]);
        assert_eq!(wizard.first_prompt(), Some("Name? "));
        assert_eq!(
            wizard.answer("a sword"),
            WizardOutcome::Prompt("Description? ".to_string())
        );
        assert_eq!(
            wizard.answer("sharp"),
            WizardOutcome::Finished(vec![
                ("name".to_string(), "a sword".to_string()),
                ("desc".to_string(), "sharp".to_string()),
            ])
        );
    }

    #[test]
    fn wizard_abort_discards_answers() {
        let mut wizard = WizardSession::new(vec![("name".to_string(), "Name? ".to_string())]);
        assert_eq!(wizard.answer("~"), WizardOutcome::Aborted);
    }
}
