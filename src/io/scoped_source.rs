// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp;

use crate::errors::Result;

use super::{ByteSource, Caps};

/// A `ScopedSource` restricts the number of bytes read from an inner source to a specified
/// limit. Once the limit is reached further reads return zero without consulting the source.
pub struct ScopedSource<S: ByteSource> {
    inner: S,
    max_readable: u64,
    read: u64,
}

impl<S: ByteSource> ScopedSource<S> {
    /// Instantiates a new `ScopedSource` delivering at most `max_readable` bytes of `inner`.
    pub fn new(inner: S, max_readable: u64) -> Self {
        ScopedSource { inner, max_readable, read: 0 }
    }

    /// Returns an immutable reference to the inner source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner source.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Converts the `ScopedSource` into the inner source.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Returns the number of bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    /// Returns the number of bytes still deliverable under the cap.
    pub fn bytes_available(&self) -> u64 {
        self.max_readable - self.read
    }
}

impl<S: ByteSource> ByteSource for ScopedSource<S> {
    fn caps(&self) -> Caps {
        // A scope caps reads only; writing or seeking through it would desynchronize the count.
        self.inner.caps() & Caps::READ
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let limit = cmp::min(self.bytes_available(), buf.len() as u64) as usize;

        if limit == 0 {
            return Ok(0);
        }

        let count = self.inner.read(&mut buf[..limit])?;
        self.read += count as u64;

        Ok(count)
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.max_readable)
    }
}
