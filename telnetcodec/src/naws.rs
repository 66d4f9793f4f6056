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

//! Negotiate About Window Size
//!

use crate::result::{CodecError, CodecResult};
use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, BufMut};

/// Terminal window dimensions carried by the NAWS option.
///
/// The wire format is four bytes, big-endian: two for columns followed by
/// two for rows. A payload of any other length is a protocol violation the
/// caller should log and ignore.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSize {
    /// Columns (characters per line)
    pub cols: u16,
    /// Rows (lines)
    pub rows: u16,
}

impl WindowSize {
    /// Create a new `WindowSize`.
    pub fn new(cols: u16, rows: u16) -> Self {
        WindowSize { cols, rows }
    }

    /// Decode a NAWS payload. The payload must be exactly 4 bytes.
    pub fn decode<T: Buf>(src: &mut T) -> CodecResult<WindowSize> {
        // NAWS format: WIDTH-HIGH WIDTH-LOW HEIGHT-HIGH HEIGHT-LOW
        if src.remaining() != 4 {
            return Err(CodecError::BadNaws {
                len: src.remaining(),
            });
        }
        Ok(WindowSize {
            cols: src.get_u16(),
            rows: src.get_u16(),
        })
    }

    /// Encode this `WindowSize` as its 4-byte big-endian payload.
    pub fn encode<T: BufMut>(&self, dst: &mut T) -> CodecResult<usize> {
        let mut writer = dst.writer();
        writer.write_u16::<BigEndian>(self.cols)?;
        writer.write_u16::<BigEndian>(self.rows)?;
        Ok(4)
    }
}

impl Default for WindowSize {
    /// The traditional 80×25 terminal, used until NAWS negotiation lands.
    fn default() -> Self {
        WindowSize { cols: 80, rows: 25 }
    }
}

impl std::fmt::Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}
