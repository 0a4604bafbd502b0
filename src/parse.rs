// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Strict parsing of controller ids and line offsets.
//!
//! Both identifiers usually arrive as free-form text (sysfs attributes,
//! config entries, command line arguments).  Only a complete, sign-free
//! run of decimal digits that fits in a `u32` is accepted: `"3"` and
//! `"007"` parse, while `""`, `"+3"`, `" 3"`, `"3a"` and `"0x3"` do not.

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

/// Why an identifier string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseIdReason {
    /// The string was empty.
    Empty,
    /// A byte that is not an ASCII digit was found at `position`.
    InvalidDigit { position: usize },
    /// The digits describe a value larger than `u32::MAX`.
    Overflow,
}

/// A rejected controller id or line offset string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    input: String,
    reason: ParseIdReason,
}

impl ParseIdError {
    /// The text that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn reason(&self) -> ParseIdReason {
        self.reason
    }
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.reason {
            ParseIdReason::Empty => write!(f, "empty string"),
            ParseIdReason::InvalidDigit { position } => write!(
                f,
                "{:?} is not a decimal number (unexpected character at byte {})",
                self.input, position
            ),
            ParseIdReason::Overflow => write!(f, "{:?} is out of range", self.input),
        }
    }
}

impl StdError for ParseIdError {}

fn parse_u32_strict(s: &str) -> Result<u32, ParseIdError> {
    let fail = |reason| ParseIdError {
        input: s.to_owned(),
        reason,
    };

    if s.is_empty() {
        return Err(fail(ParseIdReason::Empty));
    }

    // `u32::from_str` alone would let a leading '+' through
    if let Some(position) = s.bytes().position(|b| !b.is_ascii_digit()) {
        return Err(fail(ParseIdReason::InvalidDigit { position }));
    }

    s.bytes()
        .try_fold(0u32, |acc, b| {
            acc.checked_mul(10)?.checked_add(u32::from(b - b'0'))
        })
        .ok_or_else(|| fail(ParseIdReason::Overflow))
}

/// Number of a GPIO controller, as in `/dev/gpiochip<N>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControllerId(u32);

impl ControllerId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ControllerId {
    fn from(id: u32) -> Self {
        ControllerId(id)
    }
}

impl FromStr for ControllerId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u32_strict(s).map(ControllerId)
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Offset of a line within its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineOffset(u32);

impl LineOffset {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for LineOffset {
    fn from(offset: u32) -> Self {
        LineOffset(offset)
    }
}

impl FromStr for LineOffset {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u32_strict(s).map(LineOffset)
    }
}

impl fmt::Display for LineOffset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
