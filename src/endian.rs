// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `endian` module implements an endian-aware scalar codec over byte spans.
//!
//! Every operation is span-centric: scalars are read from, and written to, plain byte slices.
//! Reads and writes fail when the span is shorter than the scalar. Floating-point values are
//! transported through their raw bit patterns so that byte-order handling is shared with the
//! equal-width integer.

use crate::errors::{argument_error, Result};

/// Byte order under which scalars are marshalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least-significant byte first.
    LittleEndian,
    /// Most-significant byte first.
    BigEndian,
}

#[inline(always)]
fn span<const N: usize>(buf: &[u8]) -> Result<[u8; N]> {
    match buf.first_chunk::<N>() {
        Some(bytes) => Ok(*bytes),
        None => argument_error("buffer too short for scalar"),
    }
}

#[inline(always)]
fn span_mut<const N: usize>(buf: &mut [u8]) -> Result<&mut [u8; N]> {
    match buf.first_chunk_mut::<N>() {
        Some(bytes) => Ok(bytes),
        None => argument_error("buffer too short for scalar"),
    }
}

impl ByteOrder {
    /// The byte order of the host.
    pub const NATIVE: ByteOrder = if cfg!(target_endian = "big") {
        ByteOrder::BigEndian
    }
    else {
        ByteOrder::LittleEndian
    };

    /// Returns true if this is the host byte order.
    #[inline(always)]
    pub fn is_native(self) -> bool {
        self == ByteOrder::NATIVE
    }

    /// Reads an unsigned 8-bit integer from the start of `buf`.
    #[inline(always)]
    pub fn read_u8(self, buf: &[u8]) -> Result<u8> {
        Ok(span::<1>(buf)?[0])
    }

    /// Reads a signed 8-bit integer from the start of `buf`.
    #[inline(always)]
    pub fn read_i8(self, buf: &[u8]) -> Result<i8> {
        Ok(self.read_u8(buf)? as i8)
    }

    /// Reads an unsigned 16-bit integer from the start of `buf`.
    #[inline(always)]
    pub fn read_u16(self, buf: &[u8]) -> Result<u16> {
        let bytes = span::<2>(buf)?;
        Ok(match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
            ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        })
    }

    /// Reads a signed 16-bit integer from the start of `buf`.
    #[inline(always)]
    pub fn read_i16(self, buf: &[u8]) -> Result<i16> {
        Ok(self.read_u16(buf)? as i16)
    }

    /// Reads an unsigned 32-bit integer from the start of `buf`.
    #[inline(always)]
    pub fn read_u32(self, buf: &[u8]) -> Result<u32> {
        let bytes = span::<4>(buf)?;
        Ok(match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
        })
    }

    /// Reads a signed 32-bit integer from the start of `buf`.
    #[inline(always)]
    pub fn read_i32(self, buf: &[u8]) -> Result<i32> {
        Ok(self.read_u32(buf)? as i32)
    }

    /// Reads an unsigned 64-bit integer from the start of `buf`.
    #[inline(always)]
    pub fn read_u64(self, buf: &[u8]) -> Result<u64> {
        let bytes = span::<8>(buf)?;
        Ok(match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(bytes),
            ByteOrder::BigEndian => u64::from_be_bytes(bytes),
        })
    }

    /// Reads a signed 64-bit integer from the start of `buf`.
    #[inline(always)]
    pub fn read_i64(self, buf: &[u8]) -> Result<i64> {
        Ok(self.read_u64(buf)? as i64)
    }

    /// Reads a 32-bit IEEE-754 floating-point value from the start of `buf`.
    #[inline(always)]
    pub fn read_f32(self, buf: &[u8]) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32(buf)?))
    }

    /// Reads a 64-bit IEEE-754 floating-point value from the start of `buf`.
    #[inline(always)]
    pub fn read_f64(self, buf: &[u8]) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64(buf)?))
    }

    /// Writes an unsigned 8-bit integer to the start of `buf`.
    #[inline(always)]
    pub fn write_u8(self, value: u8, buf: &mut [u8]) -> Result<()> {
        span_mut::<1>(buf)?[0] = value;
        Ok(())
    }

    /// Writes a signed 8-bit integer to the start of `buf`.
    #[inline(always)]
    pub fn write_i8(self, value: i8, buf: &mut [u8]) -> Result<()> {
        self.write_u8(value as u8, buf)
    }

    /// Writes an unsigned 16-bit integer to the start of `buf`.
    #[inline(always)]
    pub fn write_u16(self, value: u16, buf: &mut [u8]) -> Result<()> {
        *span_mut::<2>(buf)? = match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        };
        Ok(())
    }

    /// Writes a signed 16-bit integer to the start of `buf`.
    #[inline(always)]
    pub fn write_i16(self, value: i16, buf: &mut [u8]) -> Result<()> {
        self.write_u16(value as u16, buf)
    }

    /// Writes an unsigned 32-bit integer to the start of `buf`.
    #[inline(always)]
    pub fn write_u32(self, value: u32, buf: &mut [u8]) -> Result<()> {
        *span_mut::<4>(buf)? = match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        };
        Ok(())
    }

    /// Writes a signed 32-bit integer to the start of `buf`.
    #[inline(always)]
    pub fn write_i32(self, value: i32, buf: &mut [u8]) -> Result<()> {
        self.write_u32(value as u32, buf)
    }

    /// Writes an unsigned 64-bit integer to the start of `buf`.
    #[inline(always)]
    pub fn write_u64(self, value: u64, buf: &mut [u8]) -> Result<()> {
        *span_mut::<8>(buf)? = match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        };
        Ok(())
    }

    /// Writes a signed 64-bit integer to the start of `buf`.
    #[inline(always)]
    pub fn write_i64(self, value: i64, buf: &mut [u8]) -> Result<()> {
        self.write_u64(value as u64, buf)
    }

    /// Writes a 32-bit IEEE-754 floating-point value to the start of `buf`.
    #[inline(always)]
    pub fn write_f32(self, value: f32, buf: &mut [u8]) -> Result<()> {
        self.write_u32(value.to_bits(), buf)
    }

    /// Writes a 64-bit IEEE-754 floating-point value to the start of `buf`.
    #[inline(always)]
    pub fn write_f64(self, value: f64, buf: &mut [u8]) -> Result<()> {
        self.write_u64(value.to_bits(), buf)
    }
}

/// Reverses the byte order of a 16-bit integer.
#[inline(always)]
pub fn swap_u16(value: u16) -> u16 {
    value.swap_bytes()
}

/// Reverses the byte order of a 32-bit integer.
#[inline(always)]
pub fn swap_u32(value: u32) -> u32 {
    value.swap_bytes()
}

/// Reverses the byte order of a 64-bit integer.
#[inline(always)]
pub fn swap_u64(value: u64) -> u64 {
    value.swap_bytes()
}
