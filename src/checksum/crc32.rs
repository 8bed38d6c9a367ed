// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use once_cell::sync::Lazy;

use crate::io::Processor;

/// Lookup table for the reflected IEEE polynomial, built once on first use.
static CRC32_TABLE: Lazy<[u32; 256]> = Lazy::new(|| {
    let mut table = [0u32; 256];

    for (i, entry) in table.iter_mut().enumerate() {
        let mut crc = i as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xedb8_8320 } else { crc >> 1 };
        }
        *entry = crc;
    }

    table
});

/// CRC-32 (IEEE) over all bytes processed.
///
/// Implements [`Processor`], so it can be registered on a
/// [`MarshalStream`](crate::io::MarshalStream) to checksum every byte crossing the stream in
/// one direction.
#[derive(Debug, Clone)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// Instantiates a new `Crc32`.
    pub fn new() -> Crc32 {
        Crc32 { state: u32::MAX }
    }

    /// Processes `buf` into the checksum state.
    pub fn update(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.state = (self.state >> 8) ^ CRC32_TABLE[((self.state ^ u32::from(byte)) & 0xff) as usize];
        }
    }

    /// The checksum of all bytes processed so far.
    pub fn crc(&self) -> u32 {
        !self.state
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Crc32::new()
    }
}

impl Processor for Crc32 {
    fn process(&mut self, buf: &[u8]) {
        self.update(buf);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    use crate::io::{MarshalStream, ProcessorRef};

    use super::Crc32;

    #[test]
    fn verify_crc32_check_value() {
        let mut crc = Crc32::new();
        crc.update(b"123456789");
        assert_eq!(crc.crc(), 0xcbf4_3926);
    }

    #[test]
    fn verify_crc32_is_incremental() {
        let mut whole = Crc32::new();
        whole.update(b"the quick brown fox");

        let mut parts = Crc32::new();
        parts.update(b"the quick");
        parts.update(b" brown fox");

        assert_eq!(whole.crc(), parts.crc());
    }

    #[test]
    fn verify_crc32_as_stream_processor() {
        let data = b"checksum me through the stream tap";

        let mut stream =
            MarshalStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());

        let crc = Rc::new(RefCell::new(Crc32::new()));
        stream.add_read_processor(crc.clone() as ProcessorRef).unwrap();

        let mut buf = [0u8; 7];
        while stream.read(&mut buf).unwrap() != 0 {}

        let mut direct = Crc32::new();
        direct.update(data);

        assert_eq!(crc.borrow().crc(), direct.crc());
    }
}
