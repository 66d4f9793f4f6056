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

use crate::options::TelnetOption;
use bytes::BytesMut;

///
/// `TelnetFrame` is what the application hands to the encoder: payload
/// bytes (which get IAC-escaped on the wire) or protocol constructs
/// (which get their IAC prefix and framing added).
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetFrame {
    /// One application payload byte; 0xFF is doubled on the wire
    Data(u8),
    /// A bare command byte sent as IAC command
    Command(u8),
    /// IAC DO option
    Do(TelnetOption),
    /// IAC DONT option
    Dont(TelnetOption),
    /// IAC WILL option
    Will(TelnetOption),
    /// IAC WONT option
    Wont(TelnetOption),
    /// IAC SB option payload IAC SE, payload IACs doubled
    Subnegotiate(TelnetOption, BytesMut),
}
