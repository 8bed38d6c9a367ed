// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::endian::ByteOrder;
use crate::errors::{Error, Result};

use super::{emit_fallback, Fallback, TextDecoder, TextEncoder};

/// Incremental decoder state: a dangling byte awaiting its code-unit partner, and an unpaired
/// lead surrogate awaiting a trail.
#[derive(Debug, Default, Clone, Copy)]
struct Pending {
    byte: Option<u8>,
    lead: Option<u16>,
}

/// Incremental UTF-16 decoder for either byte order. Input may be split at any byte boundary,
/// including inside a code unit or between the halves of a surrogate pair. Unpaired surrogates
/// and a dangling byte at flush follow the fallback policy.
#[derive(Debug, Clone)]
pub struct Utf16Decoder {
    order: ByteOrder,
    fallback: Fallback,
    pending: Pending,
}

impl Utf16Decoder {
    /// Instantiates a new `Utf16Decoder` with the given byte order and fallback policy.
    pub fn new(order: ByteOrder, fallback: Fallback) -> Utf16Decoder {
        Utf16Decoder { order, fallback, pending: Default::default() }
    }

    fn emit_unit(
        &self,
        pending: &mut Pending,
        unit: u16,
        emit: &mut dyn FnMut(char),
    ) -> Result<()> {
        match (pending.lead.take(), unit) {
            (None, 0xd800..=0xdbff) => pending.lead = Some(unit),
            (None, 0xdc00..=0xdfff) => emit_fallback(self.fallback, emit)?,
            (None, _) => {
                if let Some(ch) = char::from_u32(u32::from(unit)) {
                    emit(ch);
                }
            }
            (Some(lead), 0xdc00..=0xdfff) => {
                let code =
                    0x1_0000 + ((u32::from(lead) - 0xd800) << 10) + (u32::from(unit) - 0xdc00);
                if let Some(ch) = char::from_u32(code) {
                    emit(ch);
                }
            }
            (Some(_), _) => {
                // The lead was unpaired; replace it, then reprocess this unit on its own.
                emit_fallback(self.fallback, emit)?;
                self.emit_unit(pending, unit, emit)?;
            }
        }
        Ok(())
    }

    fn run(&self, bytes: &[u8], flush: bool, emit: &mut dyn FnMut(char)) -> Result<Pending> {
        let mut pending = self.pending;

        for &byte in bytes {
            let unit = match pending.byte.take() {
                Some(first) => match self.order {
                    ByteOrder::LittleEndian => u16::from_le_bytes([first, byte]),
                    ByteOrder::BigEndian => u16::from_be_bytes([first, byte]),
                },
                None => {
                    pending.byte = Some(byte);
                    continue;
                }
            };

            self.emit_unit(&mut pending, unit, emit)?;
        }

        if flush {
            if pending.lead.take().is_some() {
                emit_fallback(self.fallback, emit)?;
            }
            if pending.byte.take().is_some() {
                emit_fallback(self.fallback, emit)?;
            }
        }

        Ok(pending)
    }
}

impl TextDecoder for Utf16Decoder {
    fn char_count(&self, bytes: &[u8], flush: bool) -> Result<usize> {
        let mut count = 0;
        self.run(bytes, flush, &mut |_| count += 1)?;
        Ok(count)
    }

    fn decode(&mut self, bytes: &[u8], out: &mut [char], flush: bool) -> Result<usize> {
        let required = self.char_count(bytes, flush)?;
        if out.len() < required {
            return Err(Error::OutputFull { required });
        }

        let mut at = 0;
        let pending = self.run(bytes, flush, &mut |ch| {
            out[at] = ch;
            at += 1;
        })?;
        self.pending = pending;

        Ok(at)
    }

    fn reset(&mut self) {
        self.pending = Default::default();
    }
}

/// UTF-16 encoder for either byte order. Stateless; every character is representable.
#[derive(Debug, Clone)]
pub struct Utf16Encoder {
    order: ByteOrder,
}

impl Utf16Encoder {
    /// Instantiates a new `Utf16Encoder` with the given byte order.
    pub fn new(order: ByteOrder) -> Utf16Encoder {
        Utf16Encoder { order }
    }
}

impl TextEncoder for Utf16Encoder {
    fn byte_count(&self, chars: &[char], _flush: bool) -> Result<usize> {
        Ok(chars.iter().map(|ch| ch.len_utf16() * 2).sum())
    }

    fn encode(&mut self, chars: &[char], out: &mut [u8], flush: bool) -> Result<usize> {
        let required = self.byte_count(chars, flush)?;
        if out.len() < required {
            return Err(Error::OutputFull { required });
        }

        let mut at = 0;
        let mut units = [0u16; 2];
        for &ch in chars {
            for &unit in ch.encode_utf16(&mut units).iter() {
                let bytes = match self.order {
                    ByteOrder::LittleEndian => unit.to_le_bytes(),
                    ByteOrder::BigEndian => unit.to_be_bytes(),
                };
                out[at..at + 2].copy_from_slice(&bytes);
                at += 2;
            }
        }

        Ok(at)
    }

    fn reset(&mut self) {}
}
