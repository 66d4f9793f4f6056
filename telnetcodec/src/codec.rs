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

use super::{TelnetEvent, TelnetFrame, consts};
use crate::options::{TelnetCommand, TelnetOption};
use crate::result::CodecError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Default capacity of the sub-negotiation scratch buffer. Payload bytes
/// beyond this are dropped with a warning; NAWS needs only four.
const DEFAULT_SUBNEG_CAPACITY: usize = 64;

/// A stateful codec for the Telnet protocol.
///
/// `TelnetCodec` decodes a raw byte stream into [`TelnetEvent`]s — plain
/// payload bytes, bare commands, completed DO/DONT/WILL/WONT negotiations,
/// and finished SB…SE sub-negotiation blocks — and encodes [`TelnetFrame`]s
/// back into wire bytes with IAC escaping. One instance is embedded in each
/// connection; the decoder state lives here between reads so protocol
/// sequences may arrive split across arbitrary TCP segment boundaries.
pub struct TelnetCodec {
    decoder_state: DecoderState,
    subneg_buffer: BytesMut,
    subneg_capacity: usize,
    subneg_truncated: bool,
}

impl TelnetCodec {
    /// Create a codec with the default sub-negotiation scratch capacity.
    pub fn new() -> TelnetCodec {
        TelnetCodec::default()
    }

    /// Create a codec with an explicit sub-negotiation scratch capacity.
    pub fn with_subneg_capacity(capacity: usize) -> TelnetCodec {
        TelnetCodec {
            subneg_capacity: capacity,
            ..TelnetCodec::default()
        }
    }

    /// Append a sub-negotiation payload byte, dropping it if the scratch
    /// buffer is full. Overflow is tolerated, never fatal.
    fn push_subneg(&mut self, byte: u8) {
        if self.subneg_buffer.len() < self.subneg_capacity {
            self.subneg_buffer.put_u8(byte);
        } else if !self.subneg_truncated {
            warn!(
                capacity = self.subneg_capacity,
                "subnegotiation payload exceeds scratch capacity, dropping excess"
            );
            self.subneg_truncated = true;
        }
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        TelnetCodec {
            decoder_state: DecoderState::NormalData,
            subneg_buffer: BytesMut::new(),
            subneg_capacity: DEFAULT_SUBNEG_CAPACITY,
            subneg_truncated: false,
        }
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetEvent;
    type Error = CodecError;

    /// Decode bytes from `src` into the next [`TelnetEvent`].
    ///
    /// The decoder consumes one byte at a time, advancing a small state
    /// machine:
    ///
    /// - `NormalData`: IAC enters command interpretation; anything else is
    ///   an application byte.
    /// - `InterpretAsCommand`: a second IAC is an escaped literal 0xFF;
    ///   DO/DONT/WILL/WONT remember the verb and await the option byte;
    ///   SB begins sub-negotiation; every other byte (EC, EL, AYT, NOP, …)
    ///   completes immediately as [`TelnetEvent::Command`].
    /// - `Negotiate`: the option byte completes the negotiation.
    /// - `Subnegotiate`: the first byte names the option; payload bytes
    ///   accumulate (bounded) with IAC-escape handling until IAC SE.
    ///   An IAC followed by anything other than SE or IAC inside a
    ///   sub-negotiation is malformed; the byte is dropped and collection
    ///   continues.
    ///
    /// Returns `Ok(None)` once `src` is exhausted mid-construct; feeding
    /// the remaining bytes later resumes exactly where parsing stopped.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TelnetEvent>, Self::Error> {
        while src.remaining() > 0 {
            let byte = src.get_u8();
            match (self.decoder_state, byte) {
                (DecoderState::NormalData, consts::IAC) => {
                    self.decoder_state = DecoderState::InterpretAsCommand;
                }
                (DecoderState::NormalData, _) => {
                    return Ok(Some(TelnetEvent::Data(byte)));
                }
                (DecoderState::InterpretAsCommand, consts::IAC) => {
                    // Escaped 0xFF: deliver one literal data byte
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::Data(consts::IAC)));
                }
                (DecoderState::InterpretAsCommand, consts::DO) => {
                    self.decoder_state = DecoderState::Negotiate(TelnetCommand::Do);
                }
                (DecoderState::InterpretAsCommand, consts::DONT) => {
                    self.decoder_state = DecoderState::Negotiate(TelnetCommand::Dont);
                }
                (DecoderState::InterpretAsCommand, consts::WILL) => {
                    self.decoder_state = DecoderState::Negotiate(TelnetCommand::Will);
                }
                (DecoderState::InterpretAsCommand, consts::WONT) => {
                    self.decoder_state = DecoderState::Negotiate(TelnetCommand::Wont);
                }
                (DecoderState::InterpretAsCommand, consts::SB) => {
                    self.subneg_buffer.clear();
                    self.subneg_truncated = false;
                    self.decoder_state = DecoderState::Subnegotiate;
                }
                (DecoderState::InterpretAsCommand, _) => {
                    // EC, EL, AYT, NOP, GA and anything unrecognized
                    // complete as a bare command for the caller to interpret
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::Command(byte)));
                }
                (DecoderState::Negotiate(command), _) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::Negotiation(
                        command,
                        TelnetOption::from_u8(byte),
                    )));
                }
                (DecoderState::Subnegotiate, _) => {
                    self.decoder_state = DecoderState::SubnegotiateArgument(byte);
                }
                (DecoderState::SubnegotiateArgument(option), consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateArgumentIAC(option);
                }
                (DecoderState::SubnegotiateArgument(_), _) => {
                    self.push_subneg(byte);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::SE) => {
                    self.decoder_state = DecoderState::NormalData;
                    let payload = self.subneg_buffer.split();
                    return Ok(Some(TelnetEvent::Subnegotiation(
                        TelnetOption::from_u8(option),
                        payload,
                    )));
                }
                (DecoderState::SubnegotiateArgumentIAC(option), consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateArgument(option);
                    self.push_subneg(consts::IAC);
                }
                (DecoderState::SubnegotiateArgumentIAC(option), _) => {
                    warn!(
                        byte = format_args!("{:#04X}", byte),
                        "unexpected command inside subnegotiation, dropping byte"
                    );
                    self.decoder_state = DecoderState::SubnegotiateArgument(option);
                }
            }
        }
        Ok(None)
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = CodecError;

    /// Encode one [`TelnetFrame`] into wire bytes, escaping IAC in payload
    /// data and bracketing sub-negotiation payloads in IAC SB … IAC SE.
    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            TelnetFrame::Data(ch) => {
                dst.reserve(2);
                if ch == consts::IAC {
                    dst.put_u8(consts::IAC);
                }
                dst.put_u8(ch);
            }
            TelnetFrame::Command(command) => {
                dst.reserve(2);
                dst.put_u8(consts::IAC);
                dst.put_u8(command);
            }
            TelnetFrame::Do(option) => {
                dst.reserve(3);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::DO);
                dst.put_u8(option.to_u8());
            }
            TelnetFrame::Dont(option) => {
                dst.reserve(3);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::DONT);
                dst.put_u8(option.to_u8());
            }
            TelnetFrame::Will(option) => {
                dst.reserve(3);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::WILL);
                dst.put_u8(option.to_u8());
            }
            TelnetFrame::Wont(option) => {
                dst.reserve(3);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::WONT);
                dst.put_u8(option.to_u8());
            }
            TelnetFrame::Subnegotiate(option, payload) => {
                dst.reserve(5 + payload.len() * 2);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SB);
                dst.put_u8(option.to_u8());
                for &byte in payload.iter() {
                    if byte == consts::IAC {
                        dst.put_u8(consts::IAC);
                    }
                    dst.put_u8(byte);
                }
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SE);
            }
        }
        Ok(())
    }
}

impl Encoder<&[u8]> for TelnetCodec {
    type Error = CodecError;

    /// Encode a run of application payload bytes, doubling any IAC.
    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        for &byte in item {
            if byte == consts::IAC {
                dst.put_u8(consts::IAC);
            }
            dst.put_u8(byte);
        }
        Ok(())
    }
}

impl Encoder<&str> for TelnetCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(item.as_bytes(), dst)
    }
}

///
/// Internal decoder state, advanced one byte at a time.
///
#[derive(Clone, Copy, Debug)]
enum DecoderState {
    /// Normal data
    NormalData,
    /// Received IAC, next byte is a command
    InterpretAsCommand,
    /// Received a negotiation verb, next byte is the option
    Negotiate(TelnetCommand),
    /// Received IAC SB, next byte names the option
    Subnegotiate,
    /// Collecting sub-negotiation payload bytes for an option
    SubnegotiateArgument(u8),
    /// Received IAC inside a sub-negotiation payload
    SubnegotiateArgumentIAC(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn decode_all(codec: &mut TelnetCodec, mut src: BytesMut) -> Vec<TelnetEvent> {
        let mut out = Vec::new();
        while let Some(event) = codec.decode(&mut src).expect("decode should not error") {
            out.push(event);
        }
        out
    }

    fn encode_frame(frame: TelnetFrame) -> BytesMut {
        let mut codec = TelnetCodec::new();
        let mut dst = BytesMut::new();
        codec.encode(frame, &mut dst).expect("encode ok");
        dst
    }

    #[test]
    fn decode_plain_data() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&b"Hello"[..]));
        assert_eq!(
            events,
            vec![
                TelnetEvent::Data(b'H'),
                TelnetEvent::Data(b'e'),
                TelnetEvent::Data(b'l'),
                TelnetEvent::Data(b'l'),
                TelnetEvent::Data(b'o'),
            ]
        );
    }

    #[test]
    fn decode_escaped_iac_is_one_data_byte() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&[consts::IAC, consts::IAC][..]));
        assert_eq!(events, vec![TelnetEvent::Data(consts::IAC)]);
    }

    #[test]
    fn decode_bare_commands() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            BytesMut::from(&[consts::IAC, consts::EC, consts::IAC, consts::EL][..]),
        );
        assert_eq!(
            events,
            vec![
                TelnetEvent::Command(consts::EC),
                TelnetEvent::Command(consts::EL),
            ]
        );
    }

    #[test]
    fn decode_unknown_command_completes_as_command() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(&mut codec, BytesMut::from(&[consts::IAC, 0x01][..]));
        assert_eq!(events, vec![TelnetEvent::Command(0x01)]);
    }

    #[test]
    fn decode_negotiation() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            BytesMut::from(&[consts::IAC, consts::DO, consts::option::NAWS][..]),
        );
        assert_eq!(
            events,
            vec![TelnetEvent::Negotiation(
                TelnetCommand::Do,
                TelnetOption::Naws
            )]
        );
    }

    #[test]
    fn decode_negotiation_split_across_reads() {
        let mut codec = TelnetCodec::new();
        let mut first = BytesMut::from(&[consts::IAC][..]);
        assert!(codec.decode(&mut first).expect("decode ok").is_none());
        let mut second = BytesMut::from(&[consts::WILL][..]);
        assert!(codec.decode(&mut second).expect("decode ok").is_none());
        let mut third = BytesMut::from(&[consts::option::ECHO][..]);
        assert_eq!(
            codec.decode(&mut third).expect("decode ok"),
            Some(TelnetEvent::Negotiation(
                TelnetCommand::Will,
                TelnetOption::Echo
            ))
        );
    }

    #[test]
    fn decode_subnegotiation_naws() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            BytesMut::from(
                &[
                    consts::IAC,
                    consts::SB,
                    consts::option::NAWS,
                    0x00,
                    0x50,
                    0x00,
                    0x19,
                    consts::IAC,
                    consts::SE,
                ][..],
            ),
        );
        assert_eq!(
            events,
            vec![TelnetEvent::Subnegotiation(
                TelnetOption::Naws,
                BytesMut::from(&[0x00, 0x50, 0x00, 0x19][..])
            )]
        );
    }

    #[test]
    fn decode_subnegotiation_with_escaped_iac() {
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            BytesMut::from(
                &[
                    consts::IAC,
                    consts::SB,
                    consts::option::STATUS,
                    0x01,
                    consts::IAC,
                    consts::IAC,
                    0x03,
                    consts::IAC,
                    consts::SE,
                ][..],
            ),
        );
        assert_eq!(
            events,
            vec![TelnetEvent::Subnegotiation(
                TelnetOption::Status,
                BytesMut::from(&[0x01, consts::IAC, 0x03][..])
            )]
        );
    }

    #[test]
    fn decode_malformed_subnegotiation_is_tolerated() {
        // IAC followed by a non-SE, non-IAC byte inside the payload is
        // dropped; the block still completes on the real IAC SE.
        let mut codec = TelnetCodec::new();
        let events = decode_all(
            &mut codec,
            BytesMut::from(
                &[
                    consts::IAC,
                    consts::SB,
                    consts::option::STATUS,
                    0x01,
                    consts::IAC,
                    0x07,
                    0x02,
                    consts::IAC,
                    consts::SE,
                ][..],
            ),
        );
        assert_eq!(
            events,
            vec![TelnetEvent::Subnegotiation(
                TelnetOption::Status,
                BytesMut::from(&[0x01, 0x02][..])
            )]
        );
    }

    #[test]
    fn decode_subnegotiation_overflow_drops_excess() {
        let mut codec = TelnetCodec::with_subneg_capacity(4);
        let mut wire = vec![consts::IAC, consts::SB, consts::option::STATUS];
        wire.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        wire.extend_from_slice(&[consts::IAC, consts::SE]);
        let events = decode_all(&mut codec, BytesMut::from(&wire[..]));
        assert_eq!(
            events,
            vec![TelnetEvent::Subnegotiation(
                TelnetOption::Status,
                BytesMut::from(&[1, 2, 3, 4][..])
            )]
        );
    }

    #[test]
    fn decode_two_subnegotiations_reuse_scratch() {
        let mut codec = TelnetCodec::new();
        let mut wire = Vec::new();
        for payload in [&[0x01u8, 0x02][..], &[0x03, 0x04][..]] {
            wire.extend_from_slice(&[consts::IAC, consts::SB, consts::option::STATUS]);
            wire.extend_from_slice(payload);
            wire.extend_from_slice(&[consts::IAC, consts::SE]);
        }
        let events = decode_all(&mut codec, BytesMut::from(&wire[..]));
        assert_eq!(
            events,
            vec![
                TelnetEvent::Subnegotiation(
                    TelnetOption::Status,
                    BytesMut::from(&[0x01, 0x02][..])
                ),
                TelnetEvent::Subnegotiation(
                    TelnetOption::Status,
                    BytesMut::from(&[0x03, 0x04][..])
                ),
            ]
        );
    }

    #[test]
    fn encode_data_iac_is_escaped() {
        let dst = encode_frame(TelnetFrame::Data(consts::IAC));
        assert_eq!(&dst[..], &[consts::IAC, consts::IAC]);
    }

    #[test]
    fn encode_negotiation_frames() {
        assert_eq!(
            &encode_frame(TelnetFrame::Will(TelnetOption::Echo))[..],
            &[consts::IAC, consts::WILL, consts::option::ECHO]
        );
        assert_eq!(
            &encode_frame(TelnetFrame::Wont(TelnetOption::Echo))[..],
            &[consts::IAC, consts::WONT, consts::option::ECHO]
        );
        assert_eq!(
            &encode_frame(TelnetFrame::Do(TelnetOption::Naws))[..],
            &[consts::IAC, consts::DO, consts::option::NAWS]
        );
        assert_eq!(
            &encode_frame(TelnetFrame::Dont(TelnetOption::SuppressGoAhead))[..],
            &[consts::IAC, consts::DONT, consts::option::SGA]
        );
    }

    #[test]
    fn encode_subnegotiation_escapes_payload_iac() {
        let dst = encode_frame(TelnetFrame::Subnegotiate(
            TelnetOption::Status,
            BytesMut::from(&[0x01, consts::IAC, 0x03][..]),
        ));
        assert_eq!(
            &dst[..],
            &[
                consts::IAC,
                consts::SB,
                consts::option::STATUS,
                0x01,
                consts::IAC,
                consts::IAC,
                0x03,
                consts::IAC,
                consts::SE,
            ]
        );
    }

    #[test]
    fn encode_str_escapes_and_passes_through() {
        let mut codec = TelnetCodec::new();
        let mut dst = BytesMut::new();
        codec.encode("ok\r\n", &mut dst).expect("encode ok");
        assert_eq!(&dst[..], b"ok\r\n");
    }

    #[test]
    fn wire_round_trip_through_encoder_and_decoder() {
        let mut codec = TelnetCodec::new();
        let mut wire = BytesMut::new();
        codec
            .encode(&b"mixed \xFF payload"[..], &mut wire)
            .expect("encode ok");
        let events = decode_all(&mut codec, wire);
        let bytes: Vec<u8> = events
            .into_iter()
            .map(|event| match event {
                TelnetEvent::Data(byte) => byte,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(&bytes[..], b"mixed \xFF payload");
    }
}
