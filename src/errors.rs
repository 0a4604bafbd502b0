// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::parse::{ControllerId, LineOffset, ParseIdError};
use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IOError;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to acquire an output line.
///
/// Every variant means the same thing to the caller: no handle was
/// produced and nothing is left claimed.  The kind only tells which step
/// gave up.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Debug)]
pub enum ErrorKind {
    InvalidControllerText(ParseIdError),
    InvalidLineText(ParseIdError),
    ControllerOpen {
        controller: ControllerId,
        cause: BoxError,
    },
    LineQuery {
        controller: ControllerId,
        offset: LineOffset,
        cause: BoxError,
    },
    LineRequest {
        controller: ControllerId,
        offset: LineOffset,
        cause: BoxError,
    },
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// `true` when the caller's text was rejected before touching hardware.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidControllerText(_) | ErrorKind::InvalidLineText(_)
        )
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error { kind }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::InvalidControllerText(err) => {
                write!(f, "Unable to handle gpiochip entry: {}", err)
            }
            ErrorKind::InvalidLineText(err) => write!(f, "Unable to handle line entry: {}", err),
            ErrorKind::ControllerOpen { controller, cause } => {
                write!(f, "Failed to open gpiochip{}: {}", controller, cause)
            }
            ErrorKind::LineQuery {
                controller,
                offset,
                cause,
            } => write!(
                f,
                "Failed to query line {} on gpiochip{}: {}",
                offset, controller, cause
            ),
            ErrorKind::LineRequest {
                controller,
                offset,
                cause,
            } => write!(
                f,
                "Failed to request line {} on gpiochip{} as output: {}",
                offset, controller, cause
            ),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::InvalidControllerText(err) | ErrorKind::InvalidLineText(err) => Some(err),
            ErrorKind::ControllerOpen { cause, .. }
            | ErrorKind::LineQuery { cause, .. }
            | ErrorKind::LineRequest { cause, .. } => Some(&**cause),
        }
    }
}

/// Which character device ioctl failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlKind {
    ChipInfo,
    LineInfo,
    LineHandle,
    GetLine,
    SetLine,
}

/// Errors raised by the `/dev/gpiochipN` backend.
#[derive(Debug)]
pub struct DeviceError {
    kind: DeviceErrorKind,
}

#[derive(Debug)]
pub enum DeviceErrorKind {
    Io(IOError),
    Ioctl { kind: IoctlKind, cause: nix::Error },
    InvalidRequest(usize, usize),
    Offset(u32),
    TooManyLines(usize),
}

impl DeviceError {
    pub fn kind(&self) -> &DeviceErrorKind {
        &self.kind
    }
}

pub(crate) fn ioctl_err(kind: IoctlKind, cause: nix::Error) -> DeviceError {
    DeviceError {
        kind: DeviceErrorKind::Ioctl { kind, cause },
    }
}

pub(crate) fn invalid_err(n_lines: usize, n_values: usize) -> DeviceError {
    DeviceError {
        kind: DeviceErrorKind::InvalidRequest(n_lines, n_values),
    }
}

pub(crate) fn offset_err(offset: u32) -> DeviceError {
    DeviceError {
        kind: DeviceErrorKind::Offset(offset),
    }
}

pub(crate) fn too_many_lines_err(n_lines: usize) -> DeviceError {
    DeviceError {
        kind: DeviceErrorKind::TooManyLines(n_lines),
    }
}

impl fmt::Display for IoctlKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IoctlKind::ChipInfo => write!(f, "get chip info"),
            IoctlKind::LineInfo => write!(f, "get line info"),
            IoctlKind::LineHandle => write!(f, "get line handle"),
            IoctlKind::GetLine => write!(f, "get line value"),
            IoctlKind::SetLine => write!(f, "set line value"),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            DeviceErrorKind::Io(err) => err.fmt(f),
            DeviceErrorKind::Ioctl { cause, kind } => {
                write!(f, "Ioctl to {} failed: {}", kind, cause)
            }
            DeviceErrorKind::InvalidRequest(n_lines, n_values) => write!(
                f,
                "Invalid request: {} values requested to be set but only {} lines are open",
                n_values, n_lines
            ),
            DeviceErrorKind::Offset(offset) => write!(f, "Offset {} is out of range", offset),
            DeviceErrorKind::TooManyLines(n_lines) => write!(
                f,
                "Invalid request: {} lines requested, expected 1 to {}",
                n_lines,
                crate::ffi::GPIOHANDLES_MAX
            ),
        }
    }
}

impl StdError for DeviceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            DeviceErrorKind::Io(err) => Some(err),
            DeviceErrorKind::Ioctl { kind: _, cause } => Some(cause),
            _ => None,
        }
    }
}

impl From<IOError> for DeviceError {
    fn from(err: IOError) -> DeviceError {
        DeviceError {
            kind: DeviceErrorKind::Io(err),
        }
    }
}
