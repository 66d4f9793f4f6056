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

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors the codec can surface.
///
/// The decoder itself is resilient: malformed negotiation and oversized
/// sub-negotiation payloads are tolerated (logged and dropped) rather than
/// reported here. Errors are reserved for the I/O layer underneath the
/// codec and for argument decoders with a fixed wire format.
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A NAWS sub-negotiation payload with the wrong length
    #[error("NAWS payload must be exactly 4 bytes, got {len}")]
    BadNaws {
        /// The payload length actually received
        len: usize,
    },
}
