// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;

use log::debug;

use crate::errors::{codec_error, Error, Result};
use crate::text::{null_terminator_len, NullBehavior, TextDecoder, TextEncoder};

use super::{notify, Backing, MarshalStream};

/// Result of [`MarshalStream::read_string`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadStringResult {
    /// The decoded text.
    pub text: String,
    /// Bytes consumed from the stream, including any terminator.
    pub bytes_consumed: u64,
    /// Whether a null character stopped the read.
    pub stopped_on_null: bool,
    /// Whether the source was exhausted.
    pub end_of_stream: bool,
}

/// Index of the first run of `len` consecutive zero bytes fully inside `buf`.
fn find_zero_run(buf: &[u8], len: usize) -> Option<usize> {
    if len == 0 || buf.len() < len {
        return None;
    }
    buf.windows(len).position(|window| window.iter().all(|&byte| byte == 0))
}

/// Count of zero bytes at the tail of `buf`.
fn trailing_zeros(buf: &[u8]) -> usize {
    buf.iter().rev().take_while(|&&byte| byte == 0).count()
}

/// Decodes `segment`, growing `chars` when the decoder reports it needs more room than the
/// fallback headroom provided.
fn decode_segment(
    decoder: &mut dyn TextDecoder,
    segment: &[u8],
    chars: &mut Vec<char>,
    flush: bool,
) -> Result<usize> {
    loop {
        match decoder.decode(segment, chars.as_mut_slice(), flush) {
            Ok(count) => return Ok(count),
            Err(Error::OutputFull { required }) => {
                if required <= chars.len() {
                    return codec_error("decoder demanded a buffer it already has");
                }
                debug!("growing string-read char buffer to {} units", required);
                chars.resize(required + cmp::max(required / 4, 4), '\0');
            }
            Err(err) => return Err(err),
        }
    }
}

/// Appends decoded characters to `text` under the selected null behavior. Sets `stopped` when a
/// null character ends a `Stop` read; the remaining characters of the pass are discarded.
fn append_chars(
    text: &mut String,
    decoded: &[char],
    behavior: NullBehavior,
    deferred_zeros: &mut usize,
    stopped: &mut bool,
) {
    match behavior {
        NullBehavior::Ignore => {
            text.extend(decoded.iter());
        }
        NullBehavior::Stop => {
            for &ch in decoded {
                if ch == '\0' {
                    *stopped = true;
                    break;
                }
                text.push(ch);
            }
        }
        NullBehavior::TrimTrailing => {
            for &ch in decoded {
                if ch == '\0' {
                    *deferred_zeros += 1;
                }
                else {
                    for _ in 0..*deferred_zeros {
                        text.push('\0');
                    }
                    *deferred_zeros = 0;
                    text.push(ch);
                }
            }
        }
    }
}

impl MarshalStream<'_> {
    /// Reads and decodes text from the stream.
    ///
    /// Decoding is incremental: multi-byte sequences may straddle refills, and at most
    /// `max_bytes` bytes are consumed (`None` is unbounded). The `null_behavior` selects what a
    /// null character does: `Ignore` decodes it like any other character, `TrimTrailing` drops
    /// the trailing run of nulls from the result, and `Stop` ends the read just past the first
    /// null terminator.
    ///
    /// Under `Stop`, the terminator is located without decoding beyond it. A candidate run of
    /// zero bytes the width of one code unit is detected in the staged window, the pass is cut
    /// one byte short of completing the run, and the remaining bytes are consumed one at a time
    /// so that the decoder itself confirms, at the exact code-unit boundary, whether the run is
    /// a terminator or merely zero bytes inside a wider character.
    ///
    /// The decoder is reset before use. Consumed bytes are delivered to read processors exactly
    /// once, in order.
    pub fn read_string(
        &mut self,
        decoder: &mut dyn TextDecoder,
        max_bytes: Option<u64>,
        null_behavior: NullBehavior,
    ) -> Result<ReadStringResult> {
        self.guard_readable()?;

        if self.dirty_write {
            self.flush_write()?;
        }

        decoder.reset();
        let nt_len = null_terminator_len(decoder)?;

        // Per-pass byte budget, and a char scratch sized for it plus headroom for decoder
        // fallback expansion.
        let base = match &self.backing {
            Backing::Fixed { .. } => 8192,
            _ => cmp::min(self.buf.len(), 8192),
        };
        let mut chars = vec!['\0'; base + cmp::max(base / 4, 4)];

        let mut text = String::new();
        let mut consumed: u64 = 0;
        let mut stopped_on_null = false;
        let mut end_of_stream = false;
        let mut deferred_zeros: usize = 0;

        // Count of zero bytes consumed toward a candidate terminator. While non-zero, bytes
        // are consumed one at a time until the decoder resolves the run.
        let mut zero_run: usize = 0;

        while !stopped_on_null {
            self.check_cancel()?;

            let remaining = match max_bytes {
                Some(max) => {
                    if max == consumed {
                        break;
                    }
                    Some(max - consumed)
                }
                None => None,
            };

            if !self.ensure_buffered(1)? {
                end_of_stream = true;
                break;
            }

            let (take, produced, seg_tail) = {
                let window = self.buffered();

                let mut take = cmp::min(window.len(), base);
                if let Some(left) = remaining {
                    if take as u64 > left {
                        take = left as usize;
                    }
                }

                if null_behavior == NullBehavior::Stop {
                    if zero_run > 0 && window[0] != 0 {
                        // The candidate run broke between passes.
                        zero_run = 0;
                    }
                    if zero_run > 0 {
                        take = 1;
                    }
                    else if let Some(at) = find_zero_run(&window[..take], nt_len) {
                        // Consume up to one byte short of the candidate run, so the decoder is
                        // consulted before the run could complete a null character.
                        take = cmp::max(at + nt_len - 1, 1);
                    }
                }

                let segment = &window[..take];
                let produced = decode_segment(decoder, segment, &mut chars, false)?;

                (take, produced, trailing_zeros(segment))
            };

            self.consume_notified(take);
            consumed += take as u64;

            if null_behavior == NullBehavior::Stop {
                zero_run = if seg_tail == take { zero_run + take } else { seg_tail };
            }

            append_chars(&mut text, &chars[..produced], null_behavior, &mut deferred_zeros, &mut stopped_on_null);
        }

        if !stopped_on_null {
            let produced = decode_segment(decoder, &[], &mut chars, true)?;
            append_chars(&mut text, &chars[..produced], null_behavior, &mut deferred_zeros, &mut stopped_on_null);
        }

        // Deferred trailing nulls are dropped at finalization.

        Ok(ReadStringResult { text, bytes_consumed: consumed, stopped_on_null, end_of_stream })
    }

    /// Encodes `text` to the stream, optionally appending an encoded null terminator, and
    /// returns the total number of bytes written.
    ///
    /// Encoding proceeds in passes sized from the terminator width. When the stream buffer is
    /// large enough, passes encode directly into its free tail; otherwise a scratch buffer is
    /// allocated and pushed through [`write`](MarshalStream::write). A pass whose output
    /// overflows is halved and retried until it fits or cannot shrink further. The final pass
    /// flushes the encoder's carried state.
    pub fn write_string(
        &mut self,
        encoder: &mut dyn TextEncoder,
        text: &str,
        with_null: bool,
    ) -> Result<u64> {
        self.guard_writable()?;
        self.begin_write()?;

        let nt_len = encoder.byte_count(&['\0'], false)?;
        if nt_len == 0 || nt_len > 8 {
            return codec_error("encoder reported an unusable terminator width");
        }

        let reserve = nt_len * 3;
        let threshold = reserve * 100;

        let chars: Vec<char> = text.chars().collect();
        let mut total: u64 = 0;
        let mut at = 0;

        if self.buf.len() >= threshold {
            // Encode directly into the staging buffer's free tail.
            loop {
                self.check_cancel()?;

                let free = self.buf.len() - self.buf_len;
                if free < reserve {
                    self.flush_write()?;
                    self.dirty_write = true;
                    continue;
                }

                let remaining = chars.len() - at;
                let mut attempt = cmp::min(free / reserve, remaining);
                let written = loop {
                    match encoder.encode(
                        &chars[at..at + attempt],
                        &mut self.buf[self.buf_len..],
                        attempt == remaining,
                    ) {
                        Ok(count) => break count,
                        Err(Error::OutputFull { .. }) if attempt > 1 => attempt /= 2,
                        Err(Error::OutputFull { .. }) if self.buf_len > 0 => {
                            // A single character needs more room than the tail offers.
                            self.flush_write()?;
                            self.dirty_write = true;
                        }
                        Err(err) => return Err(err),
                    }
                };

                notify(&self.write_procs, &self.buf[self.buf_len..self.buf_len + written]);
                self.buf_len += written;
                total += written as u64;
                at += attempt;

                if at >= chars.len() {
                    break;
                }
            }
        }
        else {
            let mut scratch = vec![0u8; threshold];
            loop {
                self.check_cancel()?;

                let remaining = chars.len() - at;
                let mut attempt = cmp::min(scratch.len() / reserve, remaining);
                let written = loop {
                    match encoder.encode(&chars[at..at + attempt], &mut scratch, attempt == remaining)
                    {
                        Ok(count) => break count,
                        Err(Error::OutputFull { .. }) if attempt > 1 => attempt /= 2,
                        Err(err) => return Err(err),
                    }
                };

                self.write(&scratch[..written])?;
                total += written as u64;
                at += attempt;

                if at >= chars.len() {
                    break;
                }
            }
        }

        if with_null {
            let zeros = [0u8; 8];
            self.write(&zeros[..nt_len])?;
            total += nt_len as u64;
        }

        Ok(total)
    }
}
