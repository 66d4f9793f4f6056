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

use crate::options::{TelnetCommand, TelnetOption};
use bytes::BytesMut;

///
/// `TelnetEvent` is what the decoder yields to the application: either one
/// plain payload byte, or one completed protocol construct. Bytes consumed
/// while a construct is still in flight yield nothing.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetEvent {
    /// One application payload byte (IAC IAC has already collapsed to 0xFF)
    Data(u8),
    /// A bare two-byte command: IAC followed by EC, EL, AYT, NOP, GA, ...
    Command(u8),
    /// A completed three-byte negotiation: IAC verb option
    Negotiation(TelnetCommand, TelnetOption),
    /// A finished IAC SB option ... IAC SE block with its payload bytes
    Subnegotiation(TelnetOption, BytesMut),
}
