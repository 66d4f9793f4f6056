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

//! # Mudlark Telnet Protocol Codec
//!
//! A stateful, byte-oriented codec for the Telnet protocol (RFC 854),
//! built on `tokio_util::codec` and `bytes`. It is the protocol layer of
//! the Mudlark server: every connection embeds one [`TelnetCodec`] and
//! feeds it raw socket bytes.
//!
//! ## What it handles
//!
//! - **Data transmission**: application payload bytes with IAC (Interpret
//!   As Command) escaping — `IAC IAC` on the wire is one literal 0xFF byte.
//! - **Bare commands**: two-byte `IAC <command>` sequences such as Erase
//!   Character, Erase Line, Are You There. These complete as
//!   [`TelnetEvent::Command`] for the connection layer to interpret.
//! - **Option negotiation**: three-byte `IAC <DO|DONT|WILL|WONT> <option>`
//!   sequences, completing as [`TelnetEvent::Negotiation`].
//! - **Sub-negotiation**: `IAC SB <option> <payload…> IAC SE` blocks with
//!   payload IAC escaping and a bounded scratch buffer, completing as
//!   [`TelnetEvent::Subnegotiation`]. The NAWS window-size payload has a
//!   typed decoder in [`naws`].
//!
//! ## Resilience
//!
//! The decoder never fails on malformed input: unknown commands complete
//! as bare commands, unexpected bytes inside a sub-negotiation are dropped
//! with a warning, and oversized sub-negotiation payloads are truncated.
//! Errors are reserved for the I/O layer beneath the codec.
//!
//! ## Usage
//!
//! ```rust
//! use mudlark_telnetcodec::{TelnetCodec, TelnetEvent, TelnetFrame, TelnetOption};
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::BytesMut;
//!
//! let mut codec = TelnetCodec::new();
//!
//! // Ask the client to negotiate window size
//! let mut wire = BytesMut::new();
//! codec.encode(TelnetFrame::Do(TelnetOption::Naws), &mut wire).unwrap();
//!
//! // Decode inbound bytes one event at a time
//! let mut input = BytesMut::from(&b"hi"[..]);
//! while let Some(event) = codec.decode(&mut input).unwrap() {
//!     if let TelnetEvent::Data(byte) = event {
//!         print!("{}", byte as char);
//!     }
//! }
//! ```
//!
//! ## Thread safety
//!
//! `TelnetCodec` is not thread-safe; each connection owns its own instance.

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

mod codec;
pub mod consts;
mod event;
mod frame;
pub mod naws;
mod options;
mod result;

pub use self::codec::TelnetCodec;
pub use self::event::TelnetEvent;
pub use self::frame::TelnetFrame;
pub use self::naws::WindowSize;
pub use self::options::{TelnetCommand, TelnetOption};
pub use self::result::{CodecError, CodecResult};
