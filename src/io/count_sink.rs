// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::errors::Result;

use super::{ByteSource, Caps};

/// A `ByteCountSink` is a write-only, unseekable sink that discards its input and accumulates
/// the number of bytes accepted. Useful for measuring the marshalled size of a structure
/// without materializing it.
#[derive(Debug, Default)]
pub struct ByteCountSink {
    count: u64,
}

impl ByteCountSink {
    /// Instantiates a sink with a zeroed counter.
    pub fn new() -> ByteCountSink {
        Default::default()
    }

    /// Total number of bytes accepted so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl ByteSource for ByteCountSink {
    fn caps(&self) -> Caps {
        Caps::WRITE
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.count += buf.len() as u64;
        Ok(buf.len())
    }
}
