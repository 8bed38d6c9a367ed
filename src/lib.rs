// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! marshal-io provides low-level primitives for marshalling binary data between in-memory
//! values and byte streams.
//!
//! The heart of the crate is [`io::MarshalStream`], a buffered bidirectional stream that
//! exposes its live read buffer for zero-copy parsing (peek, match, scan) and provides
//! encoding-aware string reading and writing with null-terminator semantics. Around it sit an
//! endian-aware scalar codec ([`endian`]), stream adapters ([`io::ScopedSource`],
//! [`io::ByteCountSink`]), incremental text codecs ([`text`]), and checksum processors
//! ([`checksum`]).

pub mod checksum;
pub mod endian;
pub mod errors;
pub mod io;
pub mod text;
