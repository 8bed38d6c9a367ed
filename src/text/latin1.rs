// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::{codec_error, Error, Result};

use super::{Fallback, TextDecoder, TextEncoder};

/// The byte substituted for characters ISO 8859-1 cannot represent.
const SUBSTITUTE: u8 = b'?';

/// ISO 8859-1 decoder. Every byte maps directly onto the first Unicode block, so decoding is
/// stateless and infallible.
#[derive(Debug, Default, Clone)]
pub struct Latin1Decoder;

impl Latin1Decoder {
    /// Instantiates a new `Latin1Decoder`.
    pub fn new() -> Latin1Decoder {
        Default::default()
    }
}

impl TextDecoder for Latin1Decoder {
    fn char_count(&self, bytes: &[u8], _flush: bool) -> Result<usize> {
        Ok(bytes.len())
    }

    fn decode(&mut self, bytes: &[u8], out: &mut [char], _flush: bool) -> Result<usize> {
        if out.len() < bytes.len() {
            return Err(Error::OutputFull { required: bytes.len() });
        }

        for (dst, &byte) in out.iter_mut().zip(bytes) {
            *dst = char::from(byte);
        }

        Ok(bytes.len())
    }

    fn reset(&mut self) {}
}

/// ISO 8859-1 encoder. Characters beyond U+00FF follow the fallback policy.
#[derive(Debug, Default, Clone)]
pub struct Latin1Encoder {
    fallback: Fallback,
}

impl Latin1Encoder {
    /// Instantiates a new `Latin1Encoder` with the given fallback policy.
    pub fn new(fallback: Fallback) -> Latin1Encoder {
        Latin1Encoder { fallback }
    }
}

impl TextEncoder for Latin1Encoder {
    fn byte_count(&self, chars: &[char], _flush: bool) -> Result<usize> {
        // Under the replacing policy an unrepresentable character still costs one byte.
        if self.fallback == Fallback::Strict && chars.iter().any(|&ch| u32::from(ch) > 0xff) {
            return codec_error("character is not representable in ISO 8859-1");
        }
        Ok(chars.len())
    }

    fn encode(&mut self, chars: &[char], out: &mut [u8], flush: bool) -> Result<usize> {
        let required = self.byte_count(chars, flush)?;
        if out.len() < required {
            return Err(Error::OutputFull { required });
        }

        for (dst, &ch) in out.iter_mut().zip(chars) {
            *dst = match u32::from(ch) {
                code if code <= 0xff => code as u8,
                _ => SUBSTITUTE,
            };
        }

        Ok(chars.len())
    }

    fn reset(&mut self) {}
}
