// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `checksum` module provides implementations of common error-detecting codes that plug
//! into a stream's processor tap.

mod crc32;

pub use crc32::Crc32;
