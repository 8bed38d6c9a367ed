// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::endian::ByteOrder;
use crate::errors::{Error, Result};

use super::{emit_fallback, Fallback, TextDecoder, TextEncoder};

/// Bytes of an incomplete code unit carried between calls.
#[derive(Debug, Default, Clone, Copy)]
struct Pending {
    bytes: [u8; 4],
    len: u8,
}

/// Incremental UTF-32 decoder for either byte order. Code units split across calls are carried
/// as pending state; values outside the Unicode scalar range follow the fallback policy.
#[derive(Debug, Clone)]
pub struct Utf32Decoder {
    order: ByteOrder,
    fallback: Fallback,
    pending: Pending,
}

impl Utf32Decoder {
    /// Instantiates a new `Utf32Decoder` with the given byte order and fallback policy.
    pub fn new(order: ByteOrder, fallback: Fallback) -> Utf32Decoder {
        Utf32Decoder { order, fallback, pending: Default::default() }
    }

    fn run(&self, bytes: &[u8], flush: bool, emit: &mut dyn FnMut(char)) -> Result<Pending> {
        let mut pending = self.pending;

        for &byte in bytes {
            pending.bytes[pending.len as usize] = byte;
            pending.len += 1;

            if pending.len == 4 {
                let unit = match self.order {
                    ByteOrder::LittleEndian => u32::from_le_bytes(pending.bytes),
                    ByteOrder::BigEndian => u32::from_be_bytes(pending.bytes),
                };
                match char::from_u32(unit) {
                    Some(ch) => emit(ch),
                    None => emit_fallback(self.fallback, emit)?,
                }
                pending.len = 0;
            }
        }

        if flush && pending.len > 0 {
            emit_fallback(self.fallback, emit)?;
            pending.len = 0;
        }

        Ok(pending)
    }
}

impl TextDecoder for Utf32Decoder {
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

/// UTF-32 encoder for either byte order. Stateless; every character is representable.
#[derive(Debug, Clone)]
pub struct Utf32Encoder {
    order: ByteOrder,
}

impl Utf32Encoder {
    /// Instantiates a new `Utf32Encoder` with the given byte order.
    pub fn new(order: ByteOrder) -> Utf32Encoder {
        Utf32Encoder { order }
    }
}

impl TextEncoder for Utf32Encoder {
    fn byte_count(&self, chars: &[char], _flush: bool) -> Result<usize> {
        Ok(chars.len() * 4)
    }

    fn encode(&mut self, chars: &[char], out: &mut [u8], flush: bool) -> Result<usize> {
        let required = self.byte_count(chars, flush)?;
        if out.len() < required {
            return Err(Error::OutputFull { required });
        }

        let mut at = 0;
        for &ch in chars {
            let bytes = match self.order {
                ByteOrder::LittleEndian => u32::from(ch).to_le_bytes(),
                ByteOrder::BigEndian => u32::from(ch).to_be_bytes(),
            };
            out[at..at + 4].copy_from_slice(&bytes);
            at += 4;
        }

        Ok(at)
    }

    fn reset(&mut self) {}
}
