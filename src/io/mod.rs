// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module implements composable byte-level I/O for binary marshalling.
//!
//! The central type is [`MarshalStream`], a buffered bidirectional stream over any
//! [`ByteSource`], or over a fixed in-memory byte view. Everything else in this module exists to
//! compose with it: [`ScopedSource`] caps the bytes readable from a source, [`ByteCountSink`]
//! measures writes without storing them, and [`Processor`]s tap the bytes crossing a stream in
//! either direction.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io;
use std::rc::Rc;

use bitflags::bitflags;

use crate::errors::Result;

mod count_sink;
mod marshal_stream;
mod scoped_source;

pub use count_sink::ByteCountSink;
pub use marshal_stream::{
    MarshalStream, MarshalStreamOptions, MatchResult, ReadStringResult, ScanResult,
    DEFAULT_BUFFER_LEN,
};
pub use scoped_source::ScopedSource;

pub use std::io::SeekFrom;

bitflags! {
    /// The capability set of a [`ByteSource`]. A [`MarshalStream`] snapshots these at
    /// construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Caps: u8 {
        /// The source can service reads.
        const READ = 1 << 0;
        /// The source can service writes.
        const WRITE = 1 << 1;
        /// The source has a single movable cursor.
        const SEEK = 1 << 2;
    }
}

/// `ByteSource` is the contract between a [`MarshalStream`] and its backing.
///
/// A source advertises a capability set and provides default implementations that fail for
/// anything it did not opt into, so an implementation only defines the operations its
/// capabilities cover. Reads are blocking and return `Ok(0)` only at end-of-stream.
pub trait ByteSource {
    /// Returns the capability set of this source.
    fn caps(&self) -> Caps;

    /// Reads up-to `buf.len()` bytes into `buf`, returning the number read. `Ok(0)` signals
    /// end-of-stream for a non-empty `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let _ = buf;
        crate::errors::unsupported_error("source is not readable")
    }

    /// Writes up-to `buf.len()` bytes from `buf`, returning the number accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let _ = buf;
        crate::errors::unsupported_error("source is not writable")
    }

    /// Forces any buffered writes through to their final destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Moves the cursor, returning the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let _ = pos;
        crate::errors::unsupported_error("source is not seekable")
    }

    /// Returns the length in bytes, if cheaply available.
    fn byte_len(&self) -> Option<u64> {
        None
    }

    /// Truncates or extends the source to `len` bytes.
    fn set_byte_len(&mut self, len: u64) -> Result<()> {
        let _ = len;
        crate::errors::unsupported_error("source does not support length changes")
    }

    /// Releases the source. Called at most once, by an owning stream during teardown.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl ByteSource for File {
    /// A regular file is seekable; FIFOs and character devices are not. Note that this queries
    /// the file descriptor and may be moderately expensive.
    fn caps(&self) -> Caps {
        let seekable = self.metadata().map(|m| m.is_file()).unwrap_or(false);

        let caps = Caps::READ | Caps::WRITE;

        if seekable {
            caps | Caps::SEEK
        }
        else {
            caps
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(io::Read::read(self, buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(io::Write::write(self, buf)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(io::Write::flush(self)?)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(io::Seek::seek(self, pos)?)
    }

    fn byte_len(&self) -> Option<u64> {
        self.metadata().ok().map(|m| m.len())
    }

    fn set_byte_len(&mut self, len: u64) -> Result<()> {
        Ok(self.set_len(len)?)
    }

    fn close(&mut self) -> Result<()> {
        Ok(io::Write::flush(self)?)
    }
}

impl ByteSource for io::Cursor<Vec<u8>> {
    fn caps(&self) -> Caps {
        Caps::READ | Caps::WRITE | Caps::SEEK
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(io::Read::read(self, buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(io::Write::write(self, buf)?)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(io::Seek::seek(self, pos)?)
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.get_ref().len() as u64)
    }

    fn set_byte_len(&mut self, len: u64) -> Result<()> {
        if len > usize::MAX as u64 {
            return crate::errors::argument_error("length exceeds addressable memory");
        }
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }
}

impl ByteSource for io::Cursor<&[u8]> {
    fn caps(&self) -> Caps {
        Caps::READ | Caps::SEEK
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(io::Read::read(self, buf)?)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(io::Seek::seek(self, pos)?)
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.get_ref().len() as u64)
    }
}

/// `ReadOnlySource` wraps any reader in an unseekable, read-only [`ByteSource`].
pub struct ReadOnlySource<R: io::Read> {
    inner: R,
}

impl<R: io::Read> ReadOnlySource<R> {
    /// Instantiates a new `ReadOnlySource<R>` by taking ownership and wrapping the provided
    /// `Read`er.
    pub fn new(inner: R) -> Self {
        ReadOnlySource { inner }
    }

    /// Gets a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Gets a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwraps this `ReadOnlySource<R>`, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: io::Read> ByteSource for ReadOnlySource<R> {
    fn caps(&self) -> Caps {
        Caps::READ
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.inner.read(buf)?)
    }
}

/// A `Processor` observes the bytes crossing a [`MarshalStream`] in one direction.
///
/// The stream promises each registered processor every relevant byte exactly once, in stream
/// order: a read processor sees precisely the bytes consumed by callers (including bytes
/// consumed by skip, match, scan, and string reads), and a write processor sees precisely the
/// bytes handed to the write operations, before batching.
pub trait Processor {
    /// Called with each span of observed bytes.
    fn process(&mut self, buf: &[u8]);
}

/// Shared handle under which a [`Processor`] is registered. Identity (`Rc::ptr_eq`) keys the
/// stream's processor sets.
pub type ProcessorRef = Rc<RefCell<dyn Processor>>;

/// A cooperative cancellation flag.
///
/// Cloned handles share one flag. Long-running stream operations (copies, scans, string reads
/// and writes) poll the flag between passes and fail with a cancellation error once it is
/// raised, leaving the stream in a valid mode.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Rc<Cell<bool>>,
}

impl CancelToken {
    /// Creates a new, unraised token.
    pub fn new() -> CancelToken {
        Default::default()
    }

    /// Raises the flag. Irrevocable.
    pub fn cancel(&self) {
        self.flag.set(true);
    }

    /// Returns true if the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.flag.get()
    }
}
