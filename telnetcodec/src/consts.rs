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

//! Telnet protocol byte constants (RFC 854).

/// Interpret As Command
pub const IAC: u8 = 255;
/// Negotiation: demand the other party disable an option
pub const DONT: u8 = 254;
/// Negotiation: request the other party enable an option
pub const DO: u8 = 253;
/// Negotiation: refuse to enable an option locally
pub const WONT: u8 = 252;
/// Negotiation: offer to enable an option locally
pub const WILL: u8 = 251;
/// Subnegotiation Begin
pub const SB: u8 = 250;
/// Go Ahead
pub const GA: u8 = 249;
/// Erase Line
pub const EL: u8 = 248;
/// Erase Character
pub const EC: u8 = 247;
/// Are You There
pub const AYT: u8 = 246;
/// Abort Output
pub const AO: u8 = 245;
/// Interrupt Process
pub const IP: u8 = 244;
/// Break
pub const BRK: u8 = 243;
/// Data Mark
pub const DM: u8 = 242;
/// No Operation
pub const NOP: u8 = 241;
/// Subnegotiation End
pub const SE: u8 = 240;

/// Carriage Return
pub const CR: u8 = b'\r';
/// Line Feed
pub const LF: u8 = b'\n';
/// Backspace
pub const BS: u8 = 0x08;
/// Delete
pub const DEL: u8 = 0x7F;
/// Escape (introduces ANSI sequences in the application payload)
pub const ESC: u8 = 0x1B;

/// Telnet option codes negotiated via DO/DONT/WILL/WONT.
pub mod option {
    /// Binary Transmission (RFC 856)
    pub const BINARY: u8 = 0;
    /// Echo (RFC 857)
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead (RFC 858)
    pub const SGA: u8 = 3;
    /// Status (RFC 859)
    pub const STATUS: u8 = 5;
    /// Terminal Type (RFC 1091)
    pub const TTYPE: u8 = 24;
    /// Negotiate About Window Size (RFC 1073)
    pub const NAWS: u8 = 31;
}
