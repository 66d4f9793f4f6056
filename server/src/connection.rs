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

//! Per-client connection: socket ownership, telnet decoding, line
//! assembly, and bounded output buffering.
//!
//! A `Connection` is the unit of client identity while attached. It owns
//! its [`Socket`], its input/output buffers, and its embedded
//! [`TelnetCodec`]; it holds a non-owning handle to its current
//! [`ConnectionState`], which lives in the registry for process lifetime.
//!
//! Both buffers are bounded and overflow is fatal for the connection, by
//! policy: a peer that outruns the server gets dropped, the buffers never
//! grow past their declared capacity.

use crate::ansi::{LineWidth, strip_ansi_codes};
use crate::config::ServerConfig;
use crate::editor::{EditorOutcome, EditorSession, WizardOutcome, WizardSession};
use crate::socket::{IoStatus, Socket};
use crate::state::ConnectionState;
use bytes::{Buf, BufMut, BytesMut};
use metrics::{counter, gauge};
use mudlark_telnetcodec::{
    TelnetCodec, TelnetEvent, TelnetFrame, TelnetOption, WindowSize, consts,
};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tokio::io::Interest;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info, warn};

/// Unique identifier for a connection (monotonically increasing, never
/// reused while the process lives).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a new connection ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Why a connection is going away. Logged with the connection's name when
/// the reactor destroys it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the stream
    Eof,
    /// A read or write failed hard
    IoError,
    /// The input line buffer filled without a newline
    InputOverflow,
    /// A print would have exceeded the output buffer capacity
    OutputOverflow,
    /// A state or command asked for the close
    Requested,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Eof => write!(f, "EOF"),
            CloseReason::IoError => write!(f, "I/O error"),
            CloseReason::InputOverflow => write!(f, "input overflow"),
            CloseReason::OutputOverflow => write!(f, "output overflow"),
            CloseReason::Requested => write!(f, "requested"),
        }
    }
}

/// The optional secondary mode intercepting completed lines.
///
/// At most one is active at a time; the tagged enum makes the exclusivity
/// structural.
#[derive(Debug, Default)]
pub enum SecondaryMode {
    /// No secondary mode; lines go to the connection state
    #[default]
    None,
    /// A line-editor session is collecting text
    Editing(EditorSession),
    /// An object-creation wizard is walking its steps
    Creating(WizardSession),
}

/// Something `receive()` surfaced for the reactor to act on.
#[derive(Debug, PartialEq, Eq)]
pub enum ConnEvent {
    /// A completed input line, for the current state's line callback
    Line(String),
    /// The active editor finished; this is the composed body
    EditorFinished(String),
    /// The active editor was aborted by the user
    EditorAborted,
    /// The active wizard finished with its (key, answer) pairs
    WizardFinished(Vec<(String, String)>),
    /// The active wizard was aborted by the user
    WizardAborted,
}

/// Scratch the login/password states keep on the connection.
#[derive(Debug, Default)]
pub struct SessionData {
    /// The authenticated account name, once login completes
    pub account: Option<String>,
    /// Name offered at the login prompt, pending a password
    pub pending_name: Option<String>,
    /// Digested new password awaiting confirmation
    pub pending_secret: Option<String>,
    /// Consecutive failed password attempts
    pub failed_attempts: u8,
}

/// One attached client.
pub struct Connection {
    id: ConnectionId,
    name: String,
    host: String,
    socket: Socket,
    codec: TelnetCodec,
    staging: BytesMut,
    input: BytesMut,
    input_capacity: usize,
    output: BytesMut,
    output_capacity: usize,
    scratch: BytesMut,
    needs_prompt: bool,
    wrote_prompt: bool,
    prompt_text: String,
    color_enabled: bool,
    line_interrupted: bool,
    line_width: LineWidth,
    window: WindowSize,
    secondary: SecondaryMode,
    state: Option<Arc<ConnectionState>>,
    close_reason: Option<CloseReason>,
    session: SessionData,
}

impl Connection {
    /// Wrap an accepted socket into a connection with the configured
    /// buffer bounds. The connection starts with no state; the reactor
    /// assigns the registry's initial state through the transition
    /// protocol.
    pub fn new(id: ConnectionId, socket: Socket, config: &ServerConfig) -> Self {
        let host = socket.peer_addr().ip().to_string();
        info!(connection = %id, host = %host, "connection created");
        counter!("mudlark.connections.total").increment(1);
        gauge!("mudlark.connections.active").increment(1.0);
        Connection {
            id,
            name: id.to_string(),
            host,
            socket,
            codec: TelnetCodec::with_subneg_capacity(config.subneg_capacity),
            staging: BytesMut::new(),
            input: BytesMut::with_capacity(config.input_capacity),
            input_capacity: config.input_capacity,
            output: BytesMut::with_capacity(config.output_capacity),
            output_capacity: config.output_capacity,
            scratch: BytesMut::new(),
            needs_prompt: false,
            wrote_prompt: false,
            prompt_text: config.prompt.clone(),
            color_enabled: true,
            line_interrupted: false,
            line_width: LineWidth::new(),
            window: config.default_window,
            secondary: SecondaryMode::None,
            state: None,
            close_reason: None,
            session: SessionData::default(),
        }
    }

    /// This connection's id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The generated unique name, used as a lookup key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The remote host string.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The negotiated (or default) terminal window size.
    pub fn window(&self) -> WindowSize {
        self.window
    }

    /// Total bytes written to the peer.
    pub fn bytes_sent(&self) -> u64 {
        self.socket.bytes_sent()
    }

    /// Total bytes read from the peer.
    pub fn bytes_received(&self) -> u64 {
        self.socket.bytes_received()
    }

    /// The current state handle, if any.
    pub fn state(&self) -> Option<Arc<ConnectionState>> {
        self.state.clone()
    }

    /// Replace the current state handle. State callbacks are the
    /// transition protocol's business; this only swaps the pointer.
    pub(crate) fn set_state(&mut self, state: Option<Arc<ConnectionState>>) {
        self.state = state;
    }

    /// Login/password scratch, read-only.
    pub fn session(&self) -> &SessionData {
        &self.session
    }

    /// Login/password scratch, mutable.
    pub fn session_mut(&mut self) -> &mut SessionData {
        &mut self.session
    }

    /// Whether ANSI color sequences pass through to this client.
    pub fn color_enabled(&self) -> bool {
        self.color_enabled
    }

    /// Enable or disable ANSI color pass-through.
    pub fn set_color(&mut self, enabled: bool) {
        self.color_enabled = enabled;
    }

    /// Whether this connection is marked for teardown.
    pub fn is_closing(&self) -> bool {
        self.close_reason.is_some() || !self.socket.is_open()
    }

    /// The recorded close reason, if any.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Mark this connection for teardown. Idempotent, and safe to call
    /// from inside a state callback: the reactor re-checks liveness after
    /// every dispatch step and performs the actual destruction cascade
    /// between steps.
    pub fn request_close(&mut self, reason: CloseReason) {
        if self.close_reason.is_none() {
            info!(connection = %self.name, reason = %reason, "connection closing");
            self.close_reason = Some(reason);
        }
    }

    /// Readiness the reactor should wait for on behalf of this connection.
    pub fn interest(&self) -> Interest {
        if !self.output.is_empty() || self.needs_prompt {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        }
    }

    /// Borrow the underlying socket for readiness waiting.
    pub(crate) fn socket(&self) -> &Socket {
        &self.socket
    }

    /// Whether any output is waiting to be flushed.
    pub fn has_pending_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// The buffered-but-unflushed output bytes.
    pub fn pending_output(&self) -> &[u8] {
        &self.output
    }

    /// Whether a secondary mode is currently active.
    pub fn secondary_active(&self) -> bool {
        !matches!(self.secondary, SecondaryMode::None)
    }

    /// Begin a line-editor session. Refused (with a warning) if any
    /// secondary mode is already active.
    pub fn start_editor(&mut self, session: EditorSession) -> bool {
        if self.secondary_active() {
            warn!(connection = %self.name, "secondary mode already active, editor refused");
            return false;
        }
        self.secondary = SecondaryMode::Editing(session);
        true
    }

    /// Begin an object-creation wizard. Refused (with a warning) if any
    /// secondary mode is already active.
    pub fn start_wizard(&mut self, session: WizardSession) -> bool {
        if self.secondary_active() {
            warn!(connection = %self.name, "secondary mode already active, wizard refused");
            return false;
        }
        self.secondary = SecondaryMode::Creating(session);
        true
    }

    /// Abort whichever secondary mode is active, discarding its state.
    pub fn abort_secondary(&mut self) {
        match std::mem::take(&mut self.secondary) {
            SecondaryMode::None => {}
            SecondaryMode::Editing(mut session) => {
                session.abort();
                debug!(connection = %self.name, "editor session aborted");
            }
            SecondaryMode::Creating(mut wizard) => {
                wizard.abort();
                debug!(connection = %self.name, "wizard session aborted");
            }
        }
    }

    // ------------------------------------------------------------------
    // Input path
    // ------------------------------------------------------------------

    /// Read everything the socket has, run it through the telnet codec,
    /// and assemble completed lines. Returns the events the reactor must
    /// act on. EOF, hard read errors, and input-buffer overflow all mark
    /// the connection for teardown.
    pub fn receive(&mut self) -> Vec<ConnEvent> {
        let mut events = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match self.socket.try_read(&mut chunk) {
                IoStatus::Transferred(n) => {
                    self.staging.extend_from_slice(&chunk[..n]);
                }
                IoStatus::WouldBlock => break,
                IoStatus::Closed => {
                    self.request_close(CloseReason::Eof);
                    break;
                }
                IoStatus::Failed(err) => {
                    warn!(connection = %self.name, error = %err, "read failed");
                    self.request_close(CloseReason::IoError);
                    break;
                }
            }
        }

        loop {
            match self.codec.decode(&mut self.staging) {
                Ok(Some(event)) => {
                    if let Some(surfaced) = self.handle_protocol_event(event) {
                        events.push(surfaced);
                    }
                    if self.close_reason.is_some() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(connection = %self.name, error = %err, "protocol decode failed");
                    self.request_close(CloseReason::IoError);
                    break;
                }
            }
        }
        events
    }

    fn handle_protocol_event(&mut self, event: TelnetEvent) -> Option<ConnEvent> {
        match event {
            TelnetEvent::Data(byte) => self.handle_data_byte(byte),
            TelnetEvent::Command(consts::EC) => {
                let len = self.input.len();
                self.input.truncate(len.saturating_sub(1));
                None
            }
            TelnetEvent::Command(consts::EL) => {
                self.input.clear();
                None
            }
            TelnetEvent::Command(command) => {
                debug!(connection = %self.name, command, "ignoring telnet command");
                None
            }
            TelnetEvent::Negotiation(verb, option) => {
                debug!(connection = %self.name, %verb, %option, "client negotiation");
                None
            }
            TelnetEvent::Subnegotiation(TelnetOption::Naws, mut payload) => {
                match WindowSize::decode(&mut payload) {
                    Ok(window) => {
                        debug!(connection = %self.name, %window, "window size negotiated");
                        self.window = window;
                    }
                    Err(err) => {
                        warn!(connection = %self.name, error = %err, "bad NAWS payload ignored");
                    }
                }
                None
            }
            TelnetEvent::Subnegotiation(option, payload) => {
                debug!(
                    connection = %self.name,
                    %option,
                    len = payload.len(),
                    "ignoring subnegotiation"
                );
                None
            }
        }
    }

    fn handle_data_byte(&mut self, byte: u8) -> Option<ConnEvent> {
        match byte {
            consts::LF => self.complete_line(),
            consts::BS | consts::DEL => {
                let len = self.input.len();
                self.input.truncate(len.saturating_sub(1));
                None
            }
            0x20..=0x7E => {
                self.push_input(byte);
                None
            }
            // CR and every other non-printable byte is dropped
            _ => None,
        }
    }

    fn push_input(&mut self, byte: u8) {
        if self.input.len() >= self.input_capacity {
            error!(
                connection = %self.name,
                capacity = self.input_capacity,
                "input line buffer overflow, closing connection"
            );
            self.request_close(CloseReason::InputOverflow);
            return;
        }
        self.input.put_u8(byte);
        self.line_interrupted = false;
    }

    fn complete_line(&mut self) -> Option<ConnEvent> {
        let line = String::from_utf8_lossy(&self.input).into_owned();
        self.input.clear();
        self.line_interrupted = false;
        match std::mem::take(&mut self.secondary) {
            SecondaryMode::None => Some(ConnEvent::Line(line)),
            SecondaryMode::Editing(mut session) => match session.add_line(&line) {
                EditorOutcome::Continue => {
                    self.secondary = SecondaryMode::Editing(session);
                    None
                }
                EditorOutcome::Finished(body) => Some(ConnEvent::EditorFinished(body)),
                EditorOutcome::Aborted => Some(ConnEvent::EditorAborted),
            },
            SecondaryMode::Creating(mut wizard) => match wizard.answer(&line) {
                WizardOutcome::Prompt(prompt) => {
                    self.print(&prompt);
                    self.secondary = SecondaryMode::Creating(wizard);
                    None
                }
                WizardOutcome::Finished(fields) => Some(ConnEvent::WizardFinished(fields)),
                WizardOutcome::Aborted => Some(ConnEvent::WizardAborted),
            },
        }
    }

    // ------------------------------------------------------------------
    // Output path
    // ------------------------------------------------------------------

    /// Append text to the output buffer.
    ///
    /// ANSI sequences are stripped when color is disabled. If the peer is
    /// mid-line-entry and the current state prompts or is quiet, an
    /// interrupting line break goes out first so the text does not collide
    /// with the unfinished input. A print that would exceed the output
    /// capacity closes the connection instead of truncating.
    pub fn print(&mut self, text: &str) {
        if self.is_closing() {
            return;
        }
        let source: Cow<'_, str> = if self.color_enabled {
            Cow::Borrowed(text)
        } else {
            strip_ansi_codes(text)
        };
        let interrupt = !self.input.is_empty()
            && !self.line_interrupted
            && self
                .state
                .as_ref()
                .map(|state| state.shows_prompt() || state.is_quiet())
                .unwrap_or(false);

        self.scratch.clear();
        if interrupt {
            self.scratch.extend_from_slice(b"\r\n");
        }
        for &byte in source.as_bytes() {
            if byte == consts::IAC {
                self.scratch.put_u8(consts::IAC);
            }
            self.scratch.put_u8(byte);
        }
        self.append_scratch_to_output();
        if interrupt && self.close_reason.is_none() {
            self.line_interrupted = true;
        }
    }

    /// `print` plus a trailing CRLF.
    pub fn println(&mut self, text: &str) {
        self.print(text);
        self.print("\r\n");
    }

    /// Encode a telnet protocol frame into the output buffer, under the
    /// same capacity policy as text.
    pub fn send_frame(&mut self, frame: TelnetFrame) {
        if self.is_closing() {
            return;
        }
        self.scratch.clear();
        if let Err(err) = self.codec.encode(frame, &mut self.scratch) {
            warn!(connection = %self.name, error = %err, "frame encode failed");
            return;
        }
        self.append_scratch_to_output();
    }

    fn append_scratch_to_output(&mut self) {
        if self.output.len() + self.scratch.len() > self.output_capacity {
            error!(
                connection = %self.name,
                pending = self.output.len(),
                capacity = self.output_capacity,
                "output buffer overflow, closing connection"
            );
            self.request_close(CloseReason::OutputOverflow);
            return;
        }
        self.line_width.advance_all(&self.scratch);
        self.output.extend_from_slice(&self.scratch);
        self.wrote_prompt = false;
    }

    /// Write as much buffered output as the socket accepts and compact
    /// the buffer. When everything drained and the current state shows
    /// prompts, a prompt is requested for the next idle point.
    pub fn flush(&mut self) {
        if self.is_closing() {
            return;
        }
        let mut wrote = 0usize;
        while !self.output.is_empty() {
            match self.socket.try_write(&self.output) {
                IoStatus::Transferred(n) => {
                    self.output.advance(n);
                    wrote += n;
                }
                IoStatus::WouldBlock => break,
                IoStatus::Closed => {
                    self.request_close(CloseReason::Eof);
                    return;
                }
                IoStatus::Failed(err) => {
                    warn!(connection = %self.name, error = %err, "write failed");
                    self.request_close(CloseReason::IoError);
                    return;
                }
            }
        }
        if self.output.is_empty() {
            let shows_prompt = self
                .state
                .as_ref()
                .map(|state| state.shows_prompt())
                .unwrap_or(false);
            if wrote > 0 && !self.wrote_prompt && shows_prompt {
                self.needs_prompt = true;
            }
            self.wrote_prompt = false;
        }
    }

    /// Ask for a prompt at the next idle point.
    pub fn request_prompt(&mut self) {
        self.needs_prompt = true;
    }

    /// Emit the prompt if one is armed, the output buffer is idle, the
    /// state shows prompts, and no secondary mode owns the line.
    pub(crate) fn prompt(&mut self) {
        if !self.needs_prompt || self.is_closing() || !self.output.is_empty() {
            return;
        }
        self.needs_prompt = false;
        let shows_prompt = self
            .state
            .as_ref()
            .map(|state| state.shows_prompt())
            .unwrap_or(false);
        if !shows_prompt || self.secondary_active() {
            return;
        }
        let text = self.prompt_text.clone();
        self.print(&text);
        self.wrote_prompt = true;
    }

    /// Release the socket. Called once by the reactor's destruction
    /// cascade; safe to call again.
    pub(crate) fn release(&mut self) {
        if self.socket.is_open() {
            gauge!("mudlark.connections.active").decrement(1.0);
        }
        self.socket.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("state", &self.state.as_ref().map(|s| s.name().to_string()))
            .field("closing", &self.is_closing())
            .finish()
    }
}
