// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::str;

use crate::errors::{Error, Result};

use super::{emit_fallback, Fallback, TextDecoder, TextEncoder};

/// Bytes of an incomplete sequence carried between calls.
#[derive(Debug, Default, Clone, Copy)]
struct Pending {
    bytes: [u8; 4],
    len: u8,
}

/// Expected sequence length for a lead byte. `None` for bytes that cannot begin a sequence,
/// including the overlong leads 0xc0 and 0xc1 and anything past 0xf4.
fn seq_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7f => Some(1),
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

/// Incremental UTF-8 decoder. A multi-byte sequence split across calls is carried as pending
/// state. Malformed sequences follow the fallback policy and decoding resynchronizes on the
/// next possible lead byte.
#[derive(Debug, Default, Clone)]
pub struct Utf8Decoder {
    fallback: Fallback,
    pending: Pending,
}

impl Utf8Decoder {
    /// Instantiates a new `Utf8Decoder` with the given fallback policy.
    pub fn new(fallback: Fallback) -> Utf8Decoder {
        Utf8Decoder { fallback, pending: Default::default() }
    }

    fn run(&self, bytes: &[u8], flush: bool, emit: &mut dyn FnMut(char)) -> Result<Pending> {
        let mut pending = self.pending;

        let mut at = 0;
        while at < bytes.len() {
            let byte = bytes[at];

            if pending.len == 0 {
                match seq_len(byte) {
                    Some(1) => emit(char::from(byte)),
                    Some(_) => {
                        pending.bytes[0] = byte;
                        pending.len = 1;
                    }
                    None => emit_fallback(self.fallback, emit)?,
                }
                at += 1;
            }
            else if (0x80..=0xbf).contains(&byte) {
                let want = seq_len(pending.bytes[0]).unwrap_or(0);

                pending.bytes[pending.len as usize] = byte;
                pending.len += 1;
                at += 1;

                if pending.len as usize == want {
                    // Validation catches overlong forms and surrogate code points.
                    match str::from_utf8(&pending.bytes[..want]) {
                        Ok(seq) => {
                            if let Some(ch) = seq.chars().next() {
                                emit(ch);
                            }
                        }
                        Err(_) => emit_fallback(self.fallback, emit)?,
                    }
                    pending.len = 0;
                }
            }
            else {
                // The sequence broke off; this byte starts over as a fresh lead.
                emit_fallback(self.fallback, emit)?;
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

impl TextDecoder for Utf8Decoder {
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

/// UTF-8 encoder. Stateless; every character is representable.
#[derive(Debug, Default, Clone)]
pub struct Utf8Encoder;

impl Utf8Encoder {
    /// Instantiates a new `Utf8Encoder`.
    pub fn new() -> Utf8Encoder {
        Default::default()
    }
}

impl TextEncoder for Utf8Encoder {
    fn byte_count(&self, chars: &[char], _flush: bool) -> Result<usize> {
        Ok(chars.iter().map(|ch| ch.len_utf8()).sum())
    }

    fn encode(&mut self, chars: &[char], out: &mut [u8], flush: bool) -> Result<usize> {
        let required = self.byte_count(chars, flush)?;
        if out.len() < required {
            return Err(Error::OutputFull { required });
        }

        let mut at = 0;
        for &ch in chars {
            at += ch.encode_utf8(&mut out[at..]).len();
        }

        Ok(at)
    }

    fn reset(&mut self) {}
}
