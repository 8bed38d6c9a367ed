// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `text` module defines the incremental text codec abstraction used by string
//! marshalling, along with codec implementations for common encodings.
//!
//! Codecs are incremental: a decoder carries partial multi-byte sequences across calls so
//! input may be split at arbitrary byte boundaries, and an encoder may carry state that a
//! final flushing call drains. Both sides take a [`Fallback`] policy at construction that
//! decides whether malformed or unrepresentable input is substituted or fails.

mod latin1;
mod utf16;
mod utf32;
mod utf8;

pub use latin1::{Latin1Decoder, Latin1Encoder};
pub use utf16::{Utf16Decoder, Utf16Encoder};
pub use utf32::{Utf32Decoder, Utf32Encoder};
pub use utf8::{Utf8Decoder, Utf8Encoder};

use crate::errors::{codec_error, Result};

/// Recovery policy for malformed input when decoding, or unrepresentable characters when
/// encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Substitute U+FFFD when decoding, or the encoding's substitute byte when encoding.
    #[default]
    Replace,
    /// Fail with a codec error.
    Strict,
}

/// Treatment of null characters encountered while reading a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullBehavior {
    /// Decode null characters like any other character.
    Ignore,
    /// Stop just past the first null terminator, excluding it from the result.
    Stop,
    /// Decode to the end, then drop the trailing run of null characters.
    TrimTrailing,
}

/// An incremental decoder from bytes to characters.
pub trait TextDecoder {
    /// Returns the number of characters [`decode`](TextDecoder::decode) would produce for
    /// `bytes`, without consuming them or disturbing the carried state.
    fn char_count(&self, bytes: &[u8], flush: bool) -> Result<usize>;

    /// Decodes `bytes` into `out`, returning the number of characters written. When `out` is
    /// too small the call fails with [`Error::OutputFull`](crate::errors::Error) carrying the
    /// required capacity, and the carried state is left untouched. `flush` drains the carried
    /// state at end of input.
    fn decode(&mut self, bytes: &[u8], out: &mut [char], flush: bool) -> Result<usize>;

    /// Drops any carried state.
    fn reset(&mut self);
}

/// An incremental encoder from characters to bytes.
pub trait TextEncoder {
    /// Returns the number of bytes [`encode`](TextEncoder::encode) would produce for `chars`.
    fn byte_count(&self, chars: &[char], flush: bool) -> Result<usize>;

    /// Encodes `chars` into `out`, returning the number of bytes written. When `out` is too
    /// small the call fails with [`Error::OutputFull`](crate::errors::Error) carrying the
    /// required capacity, and the carried state is left untouched.
    fn encode(&mut self, chars: &[char], out: &mut [u8], flush: bool) -> Result<usize>;

    /// Drops any carried state.
    fn reset(&mut self);
}

/// Byte length of one null terminator under `decoder`: the smallest number of zero bytes that
/// decodes to exactly one character. The decoder must hold no carried state when probed.
pub fn null_terminator_len(decoder: &dyn TextDecoder) -> Result<usize> {
    const ZEROS: [u8; 8] = [0; 8];

    for len in 1..=ZEROS.len() {
        if decoder.char_count(&ZEROS[..len], false)? == 1 {
            return Ok(len);
        }
    }

    codec_error("decoder never decoded a zero-byte prefix to a single character")
}

/// Emits a fallback for a malformed input unit, or fails under [`Fallback::Strict`].
pub(crate) fn emit_fallback(policy: Fallback, emit: &mut dyn FnMut(char)) -> Result<()> {
    match policy {
        Fallback::Replace => {
            emit(char::REPLACEMENT_CHARACTER);
            Ok(())
        }
        Fallback::Strict => codec_error("malformed byte sequence"),
    }
}
