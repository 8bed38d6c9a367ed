// marshal-io
// Copyright (c) 2025 The marshal-io Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error;
use std::fmt;
use std::io;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by marshal-io.
#[derive(Debug)]
pub enum Error {
    /// The stream was closed before the operation started.
    Disposed,
    /// The backing, or the current stream state, does not support the operation.
    Unsupported(&'static str),
    /// An argument was outside its valid domain.
    InvalidArgument(&'static str),
    /// An I/O error occurred while reading, writing, or seeking the underlying source.
    IoError(io::Error),
    /// A cooperative cancellation was observed.
    Cancelled,
    /// A text codec rejected its input, or misbehaved.
    CodecError(&'static str),
    /// A codec output buffer was too small. `required` is the capacity needed to retry.
    OutputFull {
        /// Output capacity, in the codec's output units, that would let the call succeed.
        required: usize,
    },
    /// A scan callback violated its contract.
    CallbackError(&'static str),
    /// The underlying source ended before an exact-length operation completed.
    EndOfStream,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Disposed => {
                write!(f, "stream has been closed")
            }
            Error::Unsupported(msg) => {
                write!(f, "unsupported operation: {}", msg)
            }
            Error::InvalidArgument(msg) => {
                write!(f, "invalid argument: {}", msg)
            }
            Error::IoError(ref err) => {
                write!(f, "io error: {}", err)
            }
            Error::Cancelled => {
                write!(f, "operation was cancelled")
            }
            Error::CodecError(msg) => {
                write!(f, "codec error: {}", msg)
            }
            Error::OutputFull { required } => {
                write!(f, "codec output buffer too small: {} units required", required)
            }
            Error::CallbackError(msg) => {
                write!(f, "callback error: {}", msg)
            }
            Error::EndOfStream => {
                write!(f, "unexpected end of stream")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::EndOfStream,
            _ => Error::IoError(err),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::IoError(err) => err,
            Error::EndOfStream => io::Error::new(io::ErrorKind::UnexpectedEof, "end of stream"),
            err => io::Error::new(io::ErrorKind::Other, err.to_string()),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create an unsupported operation error.
pub fn unsupported_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::Unsupported(msg))
}

/// Convenience function to create an invalid argument error.
pub fn argument_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::InvalidArgument(msg))
}

/// Convenience function to create a codec error.
pub fn codec_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::CodecError(msg))
}

/// Convenience function to create a callback contract error.
pub fn callback_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::CallbackError(msg))
}

/// Convenience function to create an end-of-stream error.
pub fn end_of_stream_error<T>() -> Result<T> {
    Err(Error::EndOfStream)
}
