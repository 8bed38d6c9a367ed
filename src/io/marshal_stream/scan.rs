// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;

use crate::errors::{argument_error, callback_error, Result};
use crate::io::{ByteSource, Caps};

use super::{write_all, Backing, MarshalStream};

/// Outcome of [`MarshalStream::match_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    /// Whether the full pattern matched.
    pub matched: bool,
    /// Bytes consumed from the stream: the pattern length on a match, otherwise the matched
    /// prefix that was compared and consumed before the mismatch.
    pub consumed: u64,
}

/// Outcome of the [`MarshalStream::scan`] family of operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    /// Bytes skipped over (and copied to the destination, when one was provided) before the
    /// match or stop condition.
    pub bytes_skipped: u64,
    /// Whether the scan callback reported a match.
    pub matched: bool,
    /// Whether the source was exhausted before a match and before the byte budget ran out.
    pub end_of_stream: bool,
}

enum ScanSink<'a> {
    None,
    Buf { buf: &'a mut [u8], written: usize },
    Stream(&'a mut dyn ByteSource),
}

impl ScanSink<'_> {
    fn cap(&self) -> Option<u64> {
        match self {
            ScanSink::Buf { buf, written } => Some((buf.len() - *written) as u64),
            _ => None,
        }
    }

    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            ScanSink::None => Ok(()),
            ScanSink::Buf { buf, written } => {
                buf[*written..*written + bytes.len()].copy_from_slice(bytes);
                *written += bytes.len();
                Ok(())
            }
            ScanSink::Stream(dst) => write_all(&mut **dst, bytes),
        }
    }
}

impl MarshalStream<'_> {
    /// Compares the next stream bytes against `pattern`.
    ///
    /// An empty pattern trivially matches. Bytes are consumed, and delivered to read
    /// processors, as they match; on a match the position has advanced by the full pattern
    /// length. On a mismatch the position has advanced only by the matched prefix, because
    /// refills cannot be rolled back on an unseekable source; the first differing byte is left
    /// unconsumed.
    pub fn match_bytes(&mut self, pattern: &[u8]) -> Result<MatchResult> {
        self.guard_readable()?;

        if self.dirty_write {
            self.flush_write()?;
        }

        let mut consumed: u64 = 0;
        let mut remaining = pattern;

        while !remaining.is_empty() {
            self.check_cancel()?;

            if !self.ensure_buffered(1)? {
                return Ok(MatchResult { matched: false, consumed });
            }

            let window = self.buffered();
            let len = cmp::min(window.len(), remaining.len());
            let matched_len = window[..len]
                .iter()
                .zip(&remaining[..len])
                .take_while(|(a, b)| a == b)
                .count();

            self.consume_notified(matched_len);
            consumed += matched_len as u64;

            if matched_len < len {
                return Ok(MatchResult { matched: false, consumed });
            }

            remaining = &remaining[len..];
        }

        Ok(MatchResult { matched: true, consumed })
    }

    /// Scans forward until `scan_fn` reports a match, the byte budget runs out, or the source
    /// is exhausted.
    ///
    /// Each iteration stages at least `min_window` bytes (fewer near end-of-stream), then calls
    /// `scan_fn` with the readable window. The callback returns 0 to stop with a match, or a
    /// count of bytes to skip; anything beyond the window it was shown is a contract
    /// violation. Skipped bytes are consumed, delivered to read processors, and counted against
    /// `max_bytes` (`None` is unbounded).
    pub fn scan<F>(&mut self, min_window: usize, max_bytes: Option<u64>, scan_fn: F) -> Result<ScanResult>
    where
        F: FnMut(&[u8]) -> usize,
    {
        self.scan_inner(min_window, max_bytes, scan_fn, &mut ScanSink::None)
    }

    /// Like [`scan`](MarshalStream::scan), additionally copying every skipped byte into `dst`
    /// in stream order. The destination's free space further bounds the scan.
    pub fn scan_into<F>(
        &mut self,
        min_window: usize,
        max_bytes: Option<u64>,
        scan_fn: F,
        dst: &mut [u8],
    ) -> Result<ScanResult>
    where
        F: FnMut(&[u8]) -> usize,
    {
        self.scan_inner(min_window, max_bytes, scan_fn, &mut ScanSink::Buf { buf: dst, written: 0 })
    }

    /// Like [`scan`](MarshalStream::scan), additionally streaming every skipped byte to `dst`
    /// in stream order.
    pub fn scan_to<F>(
        &mut self,
        min_window: usize,
        max_bytes: Option<u64>,
        scan_fn: F,
        dst: &mut dyn ByteSource,
    ) -> Result<ScanResult>
    where
        F: FnMut(&[u8]) -> usize,
    {
        if !dst.caps().contains(Caps::WRITE) {
            return argument_error("scan destination is not writable");
        }
        self.scan_inner(min_window, max_bytes, scan_fn, &mut ScanSink::Stream(dst))
    }

    fn scan_inner<F>(
        &mut self,
        min_window: usize,
        max_bytes: Option<u64>,
        mut scan_fn: F,
        dst: &mut ScanSink<'_>,
    ) -> Result<ScanResult>
    where
        F: FnMut(&[u8]) -> usize,
    {
        self.guard_readable()?;

        if self.dirty_write {
            self.flush_write()?;
        }

        if min_window == 0 {
            return argument_error("scan window must be at least one byte");
        }
        if !matches!(self.backing, Backing::Fixed { .. }) && min_window > self.buf.len() {
            return argument_error("scan window exceeds the buffer capacity");
        }

        // The destination buffer, when present, further bounds the scan.
        let mut budget = match (max_bytes, dst.cap()) {
            (Some(max), Some(cap)) => Some(cmp::min(max, cap)),
            (Some(max), None) => Some(max),
            (None, cap) => cap,
        };

        let mut skipped: u64 = 0;

        loop {
            self.check_cancel()?;

            if budget == Some(0) {
                return Ok(ScanResult { bytes_skipped: skipped, matched: false, end_of_stream: false });
            }

            // Near end-of-stream the window may come up short; the callback still sees the
            // tail so the final bytes can be inspected.
            self.ensure_buffered(min_window)?;

            let step = {
                let window = self.buffered();
                if window.is_empty() {
                    return Ok(ScanResult {
                        bytes_skipped: skipped,
                        matched: false,
                        end_of_stream: true,
                    });
                }

                let len = match budget {
                    Some(left) => cmp::min(window.len() as u64, left) as usize,
                    None => window.len(),
                };

                let step = scan_fn(&window[..len]);
                if step == 0 {
                    return Ok(ScanResult { bytes_skipped: skipped, matched: true, end_of_stream: false });
                }
                if step > len {
                    return callback_error("scan callback skipped beyond its window");
                }

                dst.push(&window[..step])?;
                step
            };

            self.consume_notified(step);
            skipped += step as u64;
            if let Some(left) = &mut budget {
                *left -= step as u64;
            }
        }
    }
}
