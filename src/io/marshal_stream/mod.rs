// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;
use std::io;
use std::mem;
use std::rc::Rc;

use log::warn;
use smallvec::SmallVec;

use crate::errors::{
    argument_error, end_of_stream_error, unsupported_error, Error, Result,
};

use super::{ByteSource, CancelToken, Caps, ProcessorRef, SeekFrom};

mod scan;
mod text_io;

pub use scan::{MatchResult, ScanResult};
pub use text_io::ReadStringResult;

/// Default capacity of the internal staging buffer in bytes.
pub const DEFAULT_BUFFER_LEN: usize = 16 * 1024;

/// `MarshalStreamOptions` specifies the buffering and teardown behaviour of a source-backed
/// [`MarshalStream`].
pub struct MarshalStreamOptions {
    /// Capacity of the internal staging buffer. Zero selects [`DEFAULT_BUFFER_LEN`].
    pub buffer_len: usize,
    /// If set, the underlying source is closed when the stream is closed or dropped.
    pub own_source: bool,
    /// Optional cooperative cancellation flag polled by long-running operations.
    pub cancel: Option<CancelToken>,
}

impl Default for MarshalStreamOptions {
    fn default() -> Self {
        MarshalStreamOptions { buffer_len: DEFAULT_BUFFER_LEN, own_source: true, cancel: None }
    }
}

enum Backing<'s> {
    /// An external byte source with its own cursor.
    Source { inner: Box<dyn ByteSource + 's>, own: bool },
    /// An immutable in-memory view; there is no underlying source and no staging buffer.
    Fixed { view: &'s [u8] },
    /// The stream has been closed and the backing released.
    Detached,
}

/// A `MarshalStream` is a buffered, bidirectional stream for marshalling binary data.
///
/// In source mode the stream wraps a [`ByteSource`] and maintains a staging buffer that is
/// shared between directions: it holds either prefetched read bytes or pending write bytes,
/// never both. Direction changes are transparent. A write flushes read staging (rewinding the
/// source past unread prefetch, which requires a seekable source when prefetched bytes remain),
/// a read flushes write staging, and the logical [`position`](MarshalStream::position) is
/// preserved across both transitions.
///
/// In fixed mode the stream wraps an immutable byte view. Reads are served from the view
/// without copying into a staging buffer, seeking past the end is permitted, and writes are
/// unsupported.
///
/// The prefetched window is exposed by [`buffered`](MarshalStream::buffered), which together
/// with [`ensure_buffered`](MarshalStream::ensure_buffered) enables zero-copy in-place parsing;
/// `match_bytes`, `scan`, and `read_string` build on it.
pub struct MarshalStream<'s> {
    backing: Backing<'s>,
    /// Capability snapshot taken from the source at construction.
    caps: Caps,
    /// Staging buffer; empty in fixed mode.
    buf: Box<[u8]>,
    /// Count of valid bytes in `buf`: prefetched read bytes, or pending write bytes.
    buf_len: usize,
    /// Next unread index within `buf` while read-staged. Always 0 while write-staged.
    read_off: usize,
    /// `buf[..buf_len]` holds unpersisted write bytes rather than prefetched read bytes.
    dirty_write: bool,
    /// Best-known absolute position of the underlying cursor.
    src_pos: u64,
    /// Logical position in fixed mode; may point past the end of the view.
    fixed_pos: u64,
    read_procs: SmallVec<[ProcessorRef; 2]>,
    write_procs: SmallVec<[ProcessorRef; 2]>,
    cancel: Option<CancelToken>,
}

/// Delivers `bytes` to every processor in `procs`, in registration order.
fn notify(procs: &[ProcessorRef], bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    for proc in procs {
        proc.borrow_mut().process(bytes);
    }
}

/// Writes all of `bytes` to `dst`, retrying on interruption.
fn write_all(dst: &mut dyn ByteSource, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        match dst.write(bytes) {
            Ok(0) => {
                return Err(Error::IoError(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "sink accepted no bytes",
                )))
            }
            Ok(count) => bytes = &bytes[count..],
            Err(Error::IoError(ref err)) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Writes all of `bytes` to an underlying source, advancing the stream's record of its cursor.
fn drain_to_source(
    inner: &mut (dyn ByteSource + '_),
    src_pos: &mut u64,
    mut bytes: &[u8],
) -> Result<()> {
    while !bytes.is_empty() {
        match inner.write(bytes) {
            Ok(0) => {
                return Err(Error::IoError(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "sink accepted no bytes",
                )))
            }
            Ok(count) => {
                *src_pos += count as u64;
                bytes = &bytes[count..];
            }
            Err(Error::IoError(ref err)) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn add_signed(base: u64, delta: i64) -> Result<u64> {
    match base.checked_add_signed(delta) {
        Some(pos) => Ok(pos),
        None => argument_error("seek target is out of range"),
    }
}

impl<'s> MarshalStream<'s> {
    /// Instantiates a new source-backed `MarshalStream`, snapshotting the source's
    /// capabilities.
    pub fn new(source: Box<dyn ByteSource + 's>, options: MarshalStreamOptions) -> Self {
        let caps = source.caps();

        let buffer_len =
            if options.buffer_len == 0 { DEFAULT_BUFFER_LEN } else { options.buffer_len };

        MarshalStream {
            backing: Backing::Source { inner: source, own: options.own_source },
            caps,
            buf: vec![0; buffer_len].into_boxed_slice(),
            buf_len: 0,
            read_off: 0,
            dirty_write: false,
            src_pos: 0,
            fixed_pos: 0,
            read_procs: SmallVec::new(),
            write_procs: SmallVec::new(),
            cancel: options.cancel,
        }
    }

    /// Wraps an immutable byte view in a fixed-mode `MarshalStream`. The view is borrowed and
    /// never written; the stream is readable and seekable.
    pub fn from_view(view: &'s [u8]) -> Self {
        MarshalStream {
            backing: Backing::Fixed { view },
            caps: Caps::READ | Caps::SEEK,
            buf: Box::default(),
            buf_len: 0,
            read_off: 0,
            dirty_write: false,
            src_pos: 0,
            fixed_pos: 0,
            read_procs: SmallVec::new(),
            write_procs: SmallVec::new(),
            cancel: None,
        }
    }

    /// Returns true once the stream has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.backing, Backing::Detached)
    }

    /// Returns true if reads are currently possible: the stream is open, the backing is
    /// readable, and no write processor is registered.
    pub fn can_read(&self) -> bool {
        !self.is_closed() && self.caps.contains(Caps::READ) && self.write_procs.is_empty()
    }

    /// Returns true if writes are currently possible: the stream is open, the backing is
    /// writable, and no read processor is registered.
    pub fn can_write(&self) -> bool {
        !self.is_closed() && self.caps.contains(Caps::WRITE) && self.read_procs.is_empty()
    }

    /// Returns true if seeks are currently possible: the stream is open, the backing is
    /// seekable, and no processor of either direction is registered.
    pub fn can_seek(&self) -> bool {
        !self.is_closed()
            && self.caps.contains(Caps::SEEK)
            && self.read_procs.is_empty()
            && self.write_procs.is_empty()
    }

    fn guard_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Disposed)
        }
        else {
            Ok(())
        }
    }

    fn guard_readable(&self) -> Result<()> {
        self.guard_open()?;
        if !self.caps.contains(Caps::READ) {
            return unsupported_error("stream is not readable");
        }
        if !self.write_procs.is_empty() {
            return unsupported_error("reading is disabled while a write processor is registered");
        }
        Ok(())
    }

    fn guard_writable(&self) -> Result<()> {
        self.guard_open()?;
        if !self.caps.contains(Caps::WRITE) {
            return unsupported_error("stream is not writable");
        }
        if !self.read_procs.is_empty() {
            return unsupported_error("writing is disabled while a read processor is registered");
        }
        Ok(())
    }

    fn guard_seekable(&self) -> Result<()> {
        self.guard_open()?;
        if !self.caps.contains(Caps::SEEK) {
            return unsupported_error("stream is not seekable");
        }
        if !self.read_procs.is_empty() || !self.write_procs.is_empty() {
            return unsupported_error("seeking is disabled while a processor is registered");
        }
        Ok(())
    }

    fn check_cancel(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    fn fixed_view(&self) -> Option<&'s [u8]> {
        match self.backing {
            Backing::Fixed { view } => Some(view),
            _ => None,
        }
    }

    /// The logical stream position.
    ///
    /// While read-staged this is the underlying position minus the prefetched-but-unread count;
    /// while write-staged it is the underlying position plus the pending write count. On a
    /// source that has never been seeked, positions are relative to the source's cursor at
    /// construction until the first absolute seek reports the true offset.
    pub fn position(&self) -> u64 {
        match &self.backing {
            Backing::Fixed { .. } => self.fixed_pos,
            _ => {
                if self.dirty_write {
                    self.src_pos + self.buf_len as u64
                }
                else {
                    self.src_pos - (self.buf_len - self.read_off) as u64
                }
            }
        }
    }

    /// Sets the logical position. Equivalent to seeking from the start; a target within the
    /// currently buffered window moves only the read cursor.
    pub fn set_position(&mut self, pos: u64) -> Result<u64> {
        self.seek(SeekFrom::Start(pos))
    }

    /// Returns the stream length in bytes, if cheaply available.
    pub fn byte_len(&self) -> Option<u64> {
        match &self.backing {
            Backing::Fixed { view } => Some(view.len() as u64),
            Backing::Source { inner, .. } => inner.byte_len(),
            Backing::Detached => None,
        }
    }

    /// The number of readable bytes available without touching the source.
    pub fn buffered_len(&self) -> usize {
        self.buffered().len()
    }

    /// The live readable window: prefetched bytes in source mode, or the remainder of the view
    /// in fixed mode. Empty while write-staged. The window is only grown by
    /// [`ensure_buffered`](MarshalStream::ensure_buffered) or a read.
    pub fn buffered(&self) -> &[u8] {
        match &self.backing {
            Backing::Fixed { view } => {
                let pos = cmp::min(self.fixed_pos, view.len() as u64) as usize;
                &view[pos..]
            }
            _ => {
                if self.dirty_write {
                    &[]
                }
                else {
                    &self.buf[self.read_off..self.buf_len]
                }
            }
        }
    }

    /// Advances the read cursor, returning to idle when the staging is fully drained.
    #[inline(always)]
    fn consume(&mut self, len: usize) {
        self.read_off += len;
        if self.read_off == self.buf_len {
            self.read_off = 0;
            self.buf_len = 0;
        }
    }

    /// Delivers the next `len` readable bytes to the read processors and consumes them.
    fn consume_notified(&mut self, len: usize) {
        match &self.backing {
            Backing::Fixed { view } => {
                let pos = cmp::min(self.fixed_pos, view.len() as u64) as usize;
                notify(&self.read_procs, &view[pos..pos + len]);
                self.fixed_pos += len as u64;
            }
            _ => {
                notify(&self.read_procs, &self.buf[self.read_off..self.read_off + len]);
                self.consume(len);
            }
        }
    }

    /// Issues one read on the source into the staging buffer's free tail, retrying on
    /// interruption. Returns the number of bytes added; zero only at end-of-stream.
    fn fill_once(&mut self) -> Result<usize> {
        let Backing::Source { inner, .. } = &mut self.backing else {
            return Ok(0);
        };

        loop {
            match inner.read(&mut self.buf[self.buf_len..]) {
                Ok(count) => {
                    self.buf_len += count;
                    self.src_pos += count as u64;
                    return Ok(count);
                }
                Err(Error::IoError(ref err)) if err.kind() == io::ErrorKind::Interrupted => {
                    continue
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Reads directly from the source into `buf`, bypassing the staging buffer.
    fn read_source(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Backing::Source { inner, .. } = &mut self.backing else {
            return Ok(0);
        };

        loop {
            match inner.read(buf) {
                Ok(count) => {
                    self.src_pos += count as u64;
                    return Ok(count);
                }
                Err(Error::IoError(ref err)) if err.kind() == io::ErrorKind::Interrupted => {
                    continue
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Reads up-to `dst.len()` bytes into `dst`, returning the number read.
    ///
    /// Partial reads are intentional: the caller receives what the staging buffer already holds
    /// plus at most one refill of the source. Returns `Ok(0)` only for an empty `dst` or at
    /// end-of-stream. Pending write staging is flushed first.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        self.guard_readable()?;

        if dst.is_empty() {
            return Ok(0);
        }

        if self.dirty_write {
            self.flush_write()?;
        }

        if let Some(view) = self.fixed_view() {
            let pos = cmp::min(self.fixed_pos, view.len() as u64) as usize;
            let count = cmp::min(dst.len(), view.len() - pos);
            notify(&self.read_procs, &view[pos..pos + count]);
            dst[..count].copy_from_slice(&view[pos..pos + count]);
            self.fixed_pos += count as u64;
            return Ok(count);
        }

        if self.buf_len == self.read_off {
            self.buf_len = 0;
            self.read_off = 0;
            if self.fill_once()? == 0 {
                return Ok(0);
            }
        }

        let count = cmp::min(dst.len(), self.buf_len - self.read_off);
        notify(&self.read_procs, &self.buf[self.read_off..self.read_off + count]);
        dst[..count].copy_from_slice(&self.buf[self.read_off..self.read_off + count]);
        self.consume(count);

        Ok(count)
    }

    /// Reads a single byte, or `None` at end-of-stream.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Reads exactly `dst.len()` bytes, or fails with an end-of-stream error.
    pub fn read_exact(&mut self, dst: &mut [u8]) -> Result<()> {
        let mut at = 0;
        while at < dst.len() {
            match self.read(&mut dst[at..])? {
                0 => return end_of_stream_error(),
                count => at += count,
            }
        }
        Ok(())
    }

    /// Guarantees at least `len` readable bytes are staged, or returns `Ok(false)` if the
    /// source is exhausted first.
    ///
    /// `len` must not exceed the buffer capacity in source mode. Unread bytes may be shifted to
    /// the front of the buffer to make room. Pending write staging is flushed first. The call
    /// is idempotent once satisfied.
    pub fn ensure_buffered(&mut self, len: usize) -> Result<bool> {
        self.guard_readable()?;

        if self.dirty_write {
            self.flush_write()?;
        }

        if len == 0 {
            return Ok(true);
        }

        if let Some(view) = self.fixed_view() {
            return Ok(self.fixed_pos + len as u64 <= view.len() as u64);
        }

        if len > self.buf.len() {
            return argument_error("requested window exceeds the buffer capacity");
        }

        while self.buf_len - self.read_off < len {
            if self.read_off > 0 {
                self.buf.copy_within(self.read_off..self.buf_len, 0);
                self.buf_len -= self.read_off;
                self.read_off = 0;
            }
            if self.fill_once()? == 0 {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Enters write staging, draining any prefetched read bytes first.
    fn begin_write(&mut self) -> Result<()> {
        if self.dirty_write {
            return Ok(());
        }
        if self.buf_len != 0 || self.read_off != 0 {
            self.flush_read()?;
        }
        self.dirty_write = true;
        Ok(())
    }

    /// Writes all of `src` to the stream.
    ///
    /// Small writes coalesce in the staging buffer; once `src` meets or exceeds the buffer
    /// capacity with nothing staged, it is written directly to the source without an extra
    /// copy. Prefetched read bytes are drained first, which requires a seekable source when any
    /// remain unread. The bytes are delivered to write processors before batching.
    pub fn write(&mut self, src: &[u8]) -> Result<()> {
        self.guard_writable()?;
        self.begin_write()?;

        notify(&self.write_procs, src);

        self.stage_write(src)
    }

    /// Writes a single byte.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte])
    }

    fn stage_write(&mut self, mut src: &[u8]) -> Result<()> {
        let cap = self.buf.len();

        while !src.is_empty() {
            if self.buf_len > 0 || src.len() < cap {
                let count = cmp::min(cap - self.buf_len, src.len());
                self.buf[self.buf_len..self.buf_len + count].copy_from_slice(&src[..count]);
                self.buf_len += count;
                src = &src[count..];

                if self.buf_len == cap {
                    self.flush_write()?;
                    self.dirty_write = true;
                }
            }
            else {
                // Large write with nothing staged: bypass the buffer entirely.
                let Backing::Source { inner, .. } = &mut self.backing else {
                    return unsupported_error("stream is not writable");
                };
                drain_to_source(inner.as_mut(), &mut self.src_pos, src)?;
                src = &[];
            }
        }

        Ok(())
    }

    /// Rewinds the source past any prefetched-but-unread bytes and resets the staging buffer.
    /// Requires a seekable source when unread bytes remain. A no-op in fixed mode or while
    /// write-staged.
    pub fn flush_read(&mut self) -> Result<()> {
        self.guard_open()?;

        if matches!(self.backing, Backing::Fixed { .. }) || self.dirty_write {
            return Ok(());
        }

        let unread = self.buf_len - self.read_off;
        if unread > 0 {
            if !self.caps.contains(Caps::SEEK) {
                return unsupported_error("cannot drop prefetched bytes on an unseekable source");
            }
            let Backing::Source { inner, .. } = &mut self.backing else {
                return Ok(());
            };
            self.src_pos = inner.seek(SeekFrom::Current(-(unread as i64)))?;
        }

        self.buf_len = 0;
        self.read_off = 0;

        Ok(())
    }

    /// Writes staged bytes through to the source and leaves write staging. A no-op unless
    /// write-staged.
    pub fn flush_write(&mut self) -> Result<()> {
        self.guard_open()?;

        if !self.dirty_write {
            return Ok(());
        }

        if self.buf_len > 0 {
            let Backing::Source { inner, .. } = &mut self.backing else {
                return unsupported_error("stream is not writable");
            };
            drain_to_source(inner.as_mut(), &mut self.src_pos, &self.buf[..self.buf_len])?;
            self.buf_len = 0;
        }

        self.dirty_write = false;

        Ok(())
    }

    /// Flushes whichever staging is active.
    pub fn flush(&mut self) -> Result<()> {
        if self.dirty_write {
            self.flush_write()
        }
        else {
            self.flush_read()
        }
    }

    /// Seeks to a new logical position and returns it.
    ///
    /// A target inside the currently prefetched window moves only the read cursor and does not
    /// touch the source. Otherwise the source is seeked and the window is invalidated. Fixed
    /// mode permits seeking past the end of the view.
    pub fn seek(&mut self, from: SeekFrom) -> Result<u64> {
        self.guard_seekable()?;

        if self.dirty_write {
            self.flush_write()?;
        }

        if let Some(view) = self.fixed_view() {
            let target = match from {
                SeekFrom::Start(pos) => pos,
                SeekFrom::Current(delta) => add_signed(self.fixed_pos, delta)?,
                SeekFrom::End(delta) => add_signed(view.len() as u64, delta)?,
            };
            self.fixed_pos = target;
            return Ok(target);
        }

        let target = match from {
            SeekFrom::Start(pos) => pos,
            SeekFrom::Current(delta) => add_signed(self.position(), delta)?,
            SeekFrom::End(delta) => match self.byte_len() {
                Some(len) => add_signed(len, delta)?,
                None => {
                    let Backing::Source { inner, .. } = &mut self.backing else {
                        return unsupported_error("stream length is unknown");
                    };
                    let pos = inner.seek(SeekFrom::End(delta))?;
                    self.src_pos = pos;
                    self.buf_len = 0;
                    self.read_off = 0;
                    return Ok(pos);
                }
            },
        };

        // O(1) seek within the prefetched window: only the read cursor moves.
        let win_start = self.src_pos - self.buf_len as u64;
        if target >= win_start && target <= self.src_pos {
            self.read_off = (target - win_start) as usize;
            return Ok(target);
        }

        let Backing::Source { inner, .. } = &mut self.backing else {
            return unsupported_error("stream is not seekable");
        };
        let pos = inner.seek(SeekFrom::Start(target))?;
        self.src_pos = pos;
        self.buf_len = 0;
        self.read_off = 0;

        Ok(pos)
    }

    /// Truncates or extends the stream to `len` bytes. Requires a seekable and writable
    /// backing; staged bytes are flushed first.
    pub fn set_byte_len(&mut self, len: u64) -> Result<()> {
        self.guard_seekable()?;
        self.guard_writable()?;
        self.flush()?;

        let Backing::Source { inner, .. } = &mut self.backing else {
            return unsupported_error("fixed-mode streams cannot be resized");
        };
        inner.set_byte_len(len)
    }

    /// Reads and discards up-to `count` bytes, returning the number skipped. Skipped bytes are
    /// delivered to read processors in order.
    pub fn skip(&mut self, count: u64) -> Result<u64> {
        self.guard_readable()?;

        if self.dirty_write {
            self.flush_write()?;
        }

        if let Some(view) = self.fixed_view() {
            let pos = cmp::min(self.fixed_pos, view.len() as u64) as usize;
            let take = cmp::min(count, (view.len() - pos) as u64) as usize;
            notify(&self.read_procs, &view[pos..pos + take]);
            self.fixed_pos += take as u64;
            return Ok(take as u64);
        }

        let mut left = count;
        while left > 0 {
            self.check_cancel()?;

            if self.buf_len == self.read_off {
                self.buf_len = 0;
                self.read_off = 0;
                if self.fill_once()? == 0 {
                    break;
                }
            }

            let take = cmp::min(left, (self.buf_len - self.read_off) as u64) as usize;
            notify(&self.read_procs, &self.buf[self.read_off..self.read_off + take]);
            self.consume(take);
            left -= take as u64;
        }

        Ok(count - left)
    }

    /// Copies everything from the current position through to end-of-stream into `dst`,
    /// returning the number of bytes copied.
    ///
    /// Prefetched bytes are drained first; the remainder streams through a scratch buffer of at
    /// least `max(scratch_min, capacity)` bytes without re-buffering. Every copied byte is
    /// delivered to read processors.
    pub fn copy_to(&mut self, dst: &mut dyn ByteSource, scratch_min: usize) -> Result<u64> {
        self.guard_readable()?;

        if self.dirty_write {
            self.flush_write()?;
        }

        if !dst.caps().contains(Caps::WRITE) {
            return unsupported_error("copy destination is not writable");
        }

        if let Some(view) = self.fixed_view() {
            let pos = cmp::min(self.fixed_pos, view.len() as u64) as usize;
            let rest = &view[pos..];
            notify(&self.read_procs, rest);
            write_all(dst, rest)?;
            self.fixed_pos += rest.len() as u64;
            return Ok(rest.len() as u64);
        }

        let mut total: u64 = 0;

        if self.buf_len > self.read_off {
            let staged = &self.buf[self.read_off..self.buf_len];
            notify(&self.read_procs, staged);
            write_all(dst, staged)?;
            total += staged.len() as u64;
            self.buf_len = 0;
            self.read_off = 0;
        }

        let mut scratch = vec![0u8; cmp::max(scratch_min, self.buf.len())];
        loop {
            self.check_cancel()?;

            let count = self.read_source(&mut scratch)?;
            if count == 0 {
                break;
            }
            notify(&self.read_procs, &scratch[..count]);
            write_all(dst, &scratch[..count])?;
            total += count as u64;
        }

        Ok(total)
    }

    /// Registers a read processor. Fails if the identical handle is already registered. While
    /// any read processor is registered the stream is neither writable nor seekable.
    pub fn add_read_processor(&mut self, processor: ProcessorRef) -> Result<()> {
        self.guard_open()?;
        if self.read_procs.iter().any(|p| Rc::ptr_eq(p, &processor)) {
            return argument_error("processor is already registered");
        }
        self.read_procs.push(processor);
        Ok(())
    }

    /// Removes a previously registered read processor, restoring capabilities immediately.
    /// Returns whether the handle was registered.
    pub fn remove_read_processor(&mut self, processor: &ProcessorRef) -> bool {
        match self.read_procs.iter().position(|p| Rc::ptr_eq(p, processor)) {
            Some(at) => {
                self.read_procs.remove(at);
                true
            }
            None => false,
        }
    }

    /// Registers a write processor. Fails if the identical handle is already registered. While
    /// any write processor is registered the stream is neither readable nor seekable.
    pub fn add_write_processor(&mut self, processor: ProcessorRef) -> Result<()> {
        self.guard_open()?;
        if self.write_procs.iter().any(|p| Rc::ptr_eq(p, &processor)) {
            return argument_error("processor is already registered");
        }
        self.write_procs.push(processor);
        Ok(())
    }

    /// Removes a previously registered write processor, restoring capabilities immediately.
    /// Returns whether the handle was registered.
    pub fn remove_write_processor(&mut self, processor: &ProcessorRef) -> bool {
        match self.write_procs.iter().position(|p| Rc::ptr_eq(p, processor)) {
            Some(at) => {
                self.write_procs.remove(at);
                true
            }
            None => false,
        }
    }

    /// Flushes pending writes, detaches the backing, and closes the source when owned.
    ///
    /// Idempotent: later calls return `Ok` without effect, and every other operation fails with
    /// a disposed error. Dropping the stream performs a best-effort close.
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.backing, Backing::Detached) {
            Backing::Detached | Backing::Fixed { .. } => {
                self.reset_state();
                Ok(())
            }
            Backing::Source { mut inner, own } => {
                let mut result = Ok(());

                if self.dirty_write && self.buf_len > 0 {
                    result =
                        drain_to_source(inner.as_mut(), &mut self.src_pos, &self.buf[..self.buf_len]);
                }
                if own {
                    let closed = inner.close();
                    if result.is_ok() {
                        result = closed;
                    }
                }

                self.reset_state();
                result
            }
        }
    }

    /// Flushes pending writes and detaches, returning the underlying source of a source-backed
    /// stream. Fixed-mode streams return `None`.
    pub fn into_inner(mut self) -> Result<Option<Box<dyn ByteSource + 's>>> {
        if self.dirty_write {
            self.flush_write()?;
        }
        match mem::replace(&mut self.backing, Backing::Detached) {
            Backing::Source { inner, .. } => Ok(Some(inner)),
            _ => Ok(None),
        }
    }

    fn reset_state(&mut self) {
        self.buf = Box::default();
        self.buf_len = 0;
        self.read_off = 0;
        self.dirty_write = false;
    }
}

impl Drop for MarshalStream<'_> {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(err) = self.close() {
                warn!("failed to close marshal stream cleanly: {}", err);
            }
        }
    }
}

impl<'s> ByteSource for MarshalStream<'s> {
    fn caps(&self) -> Caps {
        let mut caps = Caps::empty();
        if self.can_read() {
            caps |= Caps::READ;
        }
        if self.can_write() {
            caps |= Caps::WRITE;
        }
        if self.can_seek() {
            caps |= Caps::SEEK;
        }
        caps
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        MarshalStream::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        MarshalStream::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        MarshalStream::flush(self)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        MarshalStream::seek(self, pos)
    }

    fn byte_len(&self) -> Option<u64> {
        MarshalStream::byte_len(self)
    }

    fn set_byte_len(&mut self, len: u64) -> Result<()> {
        MarshalStream::set_byte_len(self, len)
    }

    fn close(&mut self) -> Result<()> {
        MarshalStream::close(self)
    }
}

impl io::Read for MarshalStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        MarshalStream::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Write for MarshalStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        MarshalStream::write(self, buf).map_err(io::Error::from)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        MarshalStream::flush(self).map_err(io::Error::from)
    }
}

impl io::Seek for MarshalStream<'_> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        MarshalStream::seek(self, pos).map_err(io::Error::from)
    }
}

#[cfg(test)]
pub(super) mod tests_support {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::io::Processor;

    /// A processor that records everything it observes.
    #[derive(Default)]
    pub struct Recorder {
        pub bytes: Vec<u8>,
    }

    impl Processor for Recorder {
        fn process(&mut self, buf: &[u8]) {
            self.bytes.extend_from_slice(buf);
        }
    }

    pub fn recorder() -> Rc<RefCell<Recorder>> {
        Rc::new(RefCell::new(Recorder::default()))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use crate::endian::ByteOrder;
    use crate::errors::{Error, Result};
    use crate::io::{ByteCountSink, ByteSource, Caps, ProcessorRef, ReadOnlySource, SeekFrom};

    use super::tests_support::recorder;
    use super::{MarshalStream, MarshalStreamOptions};

    /// Generate a random vector of bytes of the specified length using a PRNG.
    fn generate_random_bytes(len: usize) -> Box<[u8]> {
        let mut lcg: u32 = 0xec57c4bf;

        let mut bytes = vec![0; len];

        for quad in bytes.chunks_mut(4) {
            lcg = lcg.wrapping_mul(1664525).wrapping_add(1013904223);
            for (dest, src) in quad.iter_mut().zip(&lcg.to_ne_bytes()) {
                *dest = *src;
            }
        }

        bytes.into_boxed_slice()
    }

    fn options(buffer_len: usize) -> MarshalStreamOptions {
        MarshalStreamOptions { buffer_len, ..Default::default() }
    }

    /// A source wrapper that counts the operations reaching the inner source.
    struct Tracker<S: ByteSource> {
        inner: S,
        reads: Rc<Cell<usize>>,
        seeks: Rc<Cell<usize>>,
    }

    impl<S: ByteSource> Tracker<S> {
        fn new(inner: S) -> (Self, Rc<Cell<usize>>, Rc<Cell<usize>>) {
            let reads = Rc::new(Cell::new(0));
            let seeks = Rc::new(Cell::new(0));
            (Tracker { inner, reads: reads.clone(), seeks: seeks.clone() }, reads, seeks)
        }
    }

    impl<S: ByteSource> ByteSource for Tracker<S> {
        fn caps(&self) -> Caps {
            self.inner.caps()
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.reads.set(self.reads.get() + 1);
            self.inner.read(buf)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.inner.write(buf)
        }

        fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
            self.seeks.set(self.seeks.get() + 1);
            self.inner.seek(pos)
        }

        fn byte_len(&self) -> Option<u64> {
            self.inner.byte_len()
        }
    }

    /// An unseekable source that reads from one buffer and appends writes to a shared other.
    struct RwPipe {
        input: Cursor<Vec<u8>>,
        output: Rc<std::cell::RefCell<Vec<u8>>>,
    }

    impl RwPipe {
        fn new(input: &[u8]) -> (RwPipe, Rc<std::cell::RefCell<Vec<u8>>>) {
            let output = Rc::new(std::cell::RefCell::new(Vec::new()));
            (RwPipe { input: Cursor::new(input.to_vec()), output: output.clone() }, output)
        }
    }

    impl ByteSource for RwPipe {
        fn caps(&self) -> Caps {
            Caps::READ | Caps::WRITE
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            Ok(std::io::Read::read(&mut self.input, buf)?)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.output.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    #[test]
    fn verify_sequential_reads() {
        let data = generate_random_bytes(3 * 4096 + 11);

        let source = Cursor::new(data.to_vec());
        let mut stream = MarshalStream::new(Box::new(source), options(256));

        // Single bytes across many refills.
        for &byte in &data[..1500] {
            assert_eq!(stream.read_byte().unwrap(), Some(byte));
        }

        stream.skip(17).unwrap();

        // Chunked exact reads straddling refill boundaries.
        let mut at = 1517;
        let mut buf = [0u8; 97];
        while at + buf.len() <= data.len() {
            stream.read_exact(&mut buf).unwrap();
            assert_eq!(&buf[..], &data[at..at + buf.len()]);
            at += buf.len();
        }

        // Drain the tail and observe end-of-stream.
        let mut tail = vec![0u8; 128];
        let mut drained = 0;
        loop {
            let count = stream.read(&mut tail).unwrap();
            if count == 0 {
                break;
            }
            drained += count;
        }
        assert_eq!(at + drained, data.len());
        assert_eq!(stream.read_byte().unwrap(), None);
    }

    #[test]
    fn verify_empty_read_does_not_touch_source() {
        let (tracker, reads, _) = Tracker::new(Cursor::new(vec![1u8, 2, 3]));
        let mut stream = MarshalStream::new(Box::new(tracker), options(64));

        assert_eq!(stream.read(&mut []).unwrap(), 0);
        assert_eq!(reads.get(), 0);
    }

    #[test]
    fn verify_write_then_read_back() {
        let order = ByteOrder::BigEndian;
        let values: Vec<u32> = (0..2000u32).map(|v| v.wrapping_mul(0x9e37_79b9)).collect();

        let mut stream = MarshalStream::new(Box::new(Cursor::new(Vec::new())), options(128));

        let mut span = [0u8; 4];
        for &value in &values {
            order.write_u32(value, &mut span).unwrap();
            stream.write(&span).unwrap();
        }

        assert_eq!(stream.position(), 4 * values.len() as u64);

        stream.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(stream.position(), 0);

        for &value in &values {
            stream.read_exact(&mut span).unwrap();
            assert_eq!(order.read_u32(&span).unwrap(), value);
        }
    }

    #[test]
    fn verify_read_write_read_transition() {
        let mut stream =
            MarshalStream::new(Box::new(Cursor::new(b"abcdefgh".to_vec())), options(64));

        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");

        // The write lands at the logical position even though bytes were prefetched.
        stream.write(b"XY").unwrap();
        assert_eq!(stream.position(), 4);

        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ef");

        stream.seek(SeekFrom::Start(0)).unwrap();
        let mut all = [0u8; 8];
        stream.read_exact(&mut all).unwrap();
        assert_eq!(&all, b"abXYefgh");
    }

    #[test]
    fn verify_position_identity() {
        let data = generate_random_bytes(512);
        let mut stream = MarshalStream::new(Box::new(Cursor::new(data.to_vec())), options(64));

        assert_eq!(stream.position(), 0);

        let mut buf = [0u8; 10];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(stream.position(), 10);

        stream.ensure_buffered(32).unwrap();
        assert_eq!(stream.position(), 10);

        stream.skip(5).unwrap();
        assert_eq!(stream.position(), 15);

        stream.write(b"zz").unwrap();
        assert_eq!(stream.position(), 17);

        stream.flush().unwrap();
        assert_eq!(stream.position(), 17);
    }

    #[test]
    fn verify_seek_within_buffer_is_buffer_only() {
        let data = generate_random_bytes(256);
        let (tracker, _, seeks) = Tracker::new(Cursor::new(data.to_vec()));
        let mut stream = MarshalStream::new(Box::new(tracker), options(128));

        // Prefetch a full window, then hop around inside it.
        assert!(stream.ensure_buffered(128).unwrap());
        stream.skip(100).unwrap();

        assert_eq!(stream.seek(SeekFrom::Start(40)).unwrap(), 40);
        assert_eq!(stream.seek(SeekFrom::Current(30)).unwrap(), 70);
        assert_eq!(stream.position(), 70);

        // The position setter is seek-from-start and shares the buffer-only fast path.
        assert_eq!(stream.set_position(64).unwrap(), 64);
        assert_eq!(stream.set_position(70).unwrap(), 70);
        assert_eq!(seeks.get(), 0);

        assert_eq!(stream.read_byte().unwrap(), Some(data[70]));

        // Outside the window the source must move.
        stream.seek(SeekFrom::Start(200)).unwrap();
        assert_eq!(seeks.get(), 1);
        assert_eq!(stream.read_byte().unwrap(), Some(data[200]));
    }

    #[test]
    fn verify_ensure_buffered_bounds() {
        let mut stream = MarshalStream::new(Box::new(Cursor::new(vec![0u8; 100])), options(64));

        assert!(stream.ensure_buffered(0).unwrap());
        assert!(stream.ensure_buffered(64).unwrap());
        assert!(matches!(stream.ensure_buffered(65), Err(Error::InvalidArgument(_))));

        stream.skip(90).unwrap();

        // Only 10 bytes remain; a full window can no longer be staged.
        assert!(!stream.ensure_buffered(64).unwrap());
        assert_eq!(stream.buffered_len(), 10);
        assert_eq!(stream.position(), 90);
    }

    #[test]
    fn verify_skip_matches_read() {
        let data = generate_random_bytes(1000);

        let mut skipper = MarshalStream::new(Box::new(Cursor::new(data.to_vec())), options(64));
        let mut reader = MarshalStream::new(Box::new(Cursor::new(data.to_vec())), options(64));

        let skip_tap = recorder();
        let read_tap = recorder();
        skipper.add_read_processor(skip_tap.clone() as ProcessorRef).unwrap();
        reader.add_read_processor(read_tap.clone() as ProcessorRef).unwrap();

        assert_eq!(skipper.skip(700).unwrap(), 700);
        let mut scratch = vec![0u8; 700];
        reader.read_exact(&mut scratch).unwrap();

        assert_eq!(skipper.position(), reader.position());
        assert_eq!(skip_tap.borrow().bytes, read_tap.borrow().bytes);

        // Skipping past the end reports the short count.
        assert_eq!(skipper.skip(1000).unwrap(), 300);
    }

    #[test]
    fn verify_read_processor_sees_every_byte_once() {
        let data = generate_random_bytes(4096 + 13);
        let mut stream = MarshalStream::new(Box::new(Cursor::new(data.to_vec())), options(128));

        let tap = recorder();
        stream.add_read_processor(tap.clone() as ProcessorRef).unwrap();

        // Mix consumption styles.
        let mut buf = [0u8; 33];
        stream.read_exact(&mut buf).unwrap();
        stream.skip(517).unwrap();
        while stream.read(&mut buf).unwrap() != 0 {}

        assert_eq!(tap.borrow().bytes.as_slice(), &data[..]);
    }

    #[test]
    fn verify_write_processor_sees_every_byte_once() {
        let data = generate_random_bytes(700);
        let mut stream = MarshalStream::new(Box::new(Cursor::new(Vec::new())), options(64));

        let tap = recorder();
        stream.add_write_processor(tap.clone() as ProcessorRef).unwrap();

        // Small coalesced writes and a large pass-through write.
        stream.write(&data[..50]).unwrap();
        stream.write(&data[50..60]).unwrap();
        stream.write(&data[60..]).unwrap();
        stream.flush().unwrap();

        assert_eq!(tap.borrow().bytes.as_slice(), &data[..]);

        let inner = stream.into_inner().unwrap().unwrap();
        drop(inner);
    }

    #[test]
    fn verify_processor_capability_masking() {
        let mut stream = MarshalStream::new(Box::new(Cursor::new(vec![0u8; 16])), options(16));

        let tap = recorder();
        let handle = tap as ProcessorRef;
        stream.add_read_processor(handle.clone()).unwrap();

        assert!(stream.can_read());
        assert!(!stream.can_write());
        assert!(!stream.can_seek());
        assert!(matches!(stream.write(b"x"), Err(Error::Unsupported(_))));
        assert!(matches!(stream.seek(SeekFrom::Start(0)), Err(Error::Unsupported(_))));

        assert!(stream.remove_read_processor(&handle));
        assert!(!stream.remove_read_processor(&handle));
        assert!(stream.can_write());
        assert!(stream.can_seek());
    }

    #[test]
    fn verify_duplicate_processor_rejected() {
        let mut stream = MarshalStream::new(Box::new(Cursor::new(vec![0u8; 16])), options(16));

        let handle = recorder() as ProcessorRef;
        stream.add_read_processor(handle.clone()).unwrap();
        assert!(matches!(
            stream.add_read_processor(handle.clone()),
            Err(Error::InvalidArgument(_))
        ));

        // The same handle may observe the other direction, however.
        stream.remove_read_processor(&handle);
        stream.add_write_processor(handle).unwrap();
    }

    #[test]
    fn verify_unseekable_write_transition() {
        let (pipe, output) = RwPipe::new(b"abcd");
        let mut stream = MarshalStream::new(Box::new(pipe), options(16));

        // Prefetch, leaving unread bytes staged: the direction change must fail.
        assert!(stream.ensure_buffered(4).unwrap());
        assert!(matches!(stream.write(b"zz"), Err(Error::Unsupported(_))));

        // Drain the prefetch; with nothing staged the transition is permitted.
        stream.skip(4).unwrap();
        stream.write(b"zz").unwrap();
        stream.flush().unwrap();
        assert_eq!(output.borrow().as_slice(), b"zz");
    }

    #[test]
    fn verify_fixed_mode() {
        let data = b"fixed mode view";
        let mut stream = MarshalStream::from_view(data);

        assert!(stream.can_read());
        assert!(stream.can_seek());
        assert!(!stream.can_write());
        assert_eq!(stream.byte_len(), Some(data.len() as u64));

        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"fixed");

        // Seeking past the end is allowed; reads there return nothing.
        assert_eq!(stream.seek(SeekFrom::End(10)).unwrap(), data.len() as u64 + 10);
        assert_eq!(stream.position(), data.len() as u64 + 10);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);

        stream.seek(SeekFrom::Start(6)).unwrap();
        assert_eq!(stream.buffered(), &data[6..]);

        assert!(matches!(stream.write(b"no"), Err(Error::Unsupported(_))));
        stream.flush().unwrap();
    }

    #[test]
    fn verify_copy_to_counts_and_taps() {
        let data = generate_random_bytes(3000);
        let mut stream = MarshalStream::new(Box::new(Cursor::new(data.to_vec())), options(256));

        let tap = recorder();
        stream.add_read_processor(tap.clone() as ProcessorRef).unwrap();

        // Prefetch a little first so the drain path is exercised too.
        stream.ensure_buffered(100).unwrap();

        let mut sink = ByteCountSink::new();
        let copied = stream.copy_to(&mut sink, 512).unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(sink.count(), data.len() as u64);
        assert_eq!(tap.borrow().bytes.as_slice(), &data[..]);
    }

    #[test]
    fn verify_close_latches() {
        let mut stream = MarshalStream::new(Box::new(Cursor::new(vec![0u8; 8])), options(16));

        stream.close().unwrap();
        stream.close().unwrap();

        let mut buf = [0u8; 1];
        assert!(matches!(stream.read(&mut buf), Err(Error::Disposed)));
        assert!(matches!(stream.write(b"x"), Err(Error::Disposed)));
        assert!(matches!(stream.seek(SeekFrom::Start(0)), Err(Error::Disposed)));
        assert!(!stream.can_read());
        assert!(!stream.can_write());
        assert!(!stream.can_seek());
    }

    #[test]
    fn verify_close_flushes_pending_writes() {
        let (pipe, output) = RwPipe::new(b"");
        let mut stream = MarshalStream::new(Box::new(pipe), options(64));

        stream.write(b"pending bytes").unwrap();
        assert!(output.borrow().is_empty());

        // Not flushed yet; close must push the staged bytes out.
        stream.close().unwrap();
        assert_eq!(output.borrow().as_slice(), b"pending bytes");
    }

    #[test]
    fn verify_drop_flushes_pending_writes() {
        let (pipe, output) = RwPipe::new(b"");

        {
            let mut stream = MarshalStream::new(Box::new(pipe), options(64));
            stream.write(b"dropped").unwrap();
        }

        assert_eq!(output.borrow().as_slice(), b"dropped");
    }

    #[test]
    fn verify_cancellation_is_observed() {
        let token = crate::io::CancelToken::new();
        let options = MarshalStreamOptions {
            buffer_len: 16,
            cancel: Some(token.clone()),
            ..Default::default()
        };
        let mut stream =
            MarshalStream::new(Box::new(Cursor::new(vec![0u8; 1024])), options);

        assert_eq!(stream.skip(10).unwrap(), 10);

        token.cancel();
        assert!(matches!(stream.skip(10), Err(Error::Cancelled)));
        assert!(matches!(
            stream.copy_to(&mut ByteCountSink::new(), 0),
            Err(Error::Cancelled)
        ));

        // Plain reads are not a suspension point and still work.
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 4);
    }

    #[test]
    fn verify_set_byte_len() {
        let mut stream = MarshalStream::new(Box::new(Cursor::new(vec![0u8; 32])), options(16));

        stream.set_byte_len(8).unwrap();
        assert_eq!(stream.byte_len(), Some(8));

        stream.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(stream.skip(100).unwrap(), 8);
    }

    #[test]
    fn verify_large_write_passthrough() {
        let data = generate_random_bytes(1024);
        let (tracker, reads, _) = Tracker::new(Cursor::new(Vec::new()));
        let mut stream = MarshalStream::new(Box::new(tracker), options(64));

        // Larger than the buffer with nothing staged: a single direct write.
        stream.write(&data).unwrap();
        assert_eq!(stream.position(), data.len() as u64);
        assert_eq!(reads.get(), 0);

        stream.seek(SeekFrom::Start(0)).unwrap();
        let mut back = vec![0u8; data.len()];
        stream.read_exact(&mut back).unwrap();
        assert_eq!(back.as_slice(), &data[..]);
    }

    #[test]
    fn verify_non_seekable_source_reads() {
        let data = generate_random_bytes(500);
        let source = ReadOnlySource::new(&data[..]);
        let mut stream = MarshalStream::new(Box::new(source), options(64));

        assert!(stream.can_read());
        assert!(!stream.can_seek());
        assert!(!stream.can_write());

        let mut buf = vec![0u8; data.len()];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf.as_slice(), &data[..]);
        assert!(matches!(stream.seek(SeekFrom::Start(0)), Err(Error::Unsupported(_))));
    }

    #[test]
    fn verify_random_chunked_reads() {
        let data = generate_random_bytes(64 * 1024);
        let mut stream =
            MarshalStream::new(Box::new(Cursor::new(data.to_vec())), options(1024));

        let mut rng = SmallRng::seed_from_u64(0x5ca1_ab1e);
        let mut at = 0;
        let mut buf = [0u8; 257];

        while at < data.len() {
            let want = rng.gen_range(1..=buf.len());
            let count = stream.read(&mut buf[..want]).unwrap();
            assert!(count > 0);
            assert_eq!(&buf[..count], &data[at..at + count]);
            at += count;
        }

        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }
}
