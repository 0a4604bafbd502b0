// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `gpio-handle` crate turns a pair of textual identifiers, a GPIO
//! controller number and a line offset, into an exclusively owned handle
//! on that one line configured as an output and driven low.
//!
//! It is meant for monitoring daemons that drive a single pin (a fan fault
//! or power-good line, say) whose location comes from configuration text
//! and is therefore untrusted.  The text is parsed strictly, the line's
//! current configuration is read from the kernel and kept, only the
//! direction is switched to output, and the line is requested through the
//! [GPIO character device
//! ABI](https://www.kernel.org/doc/Documentation/ABI/testing/gpio-cdev).
//!
//! Any failure, from malformed text to a line that is already claimed by
//! someone else, yields no handle and leaves nothing claimed.
//!
//! # Examples
//!
//! ```no_run
//! use gpio_handle::{acquire_output_line, CdevBackend};
//!
//! // /dev/gpiochip0, line 17, starts out driven low
//! let backend = CdevBackend::default();
//! if let Some(handle) = acquire_output_line(&backend, "0", "17", "fan-monitor") {
//!     handle.set_value(1).ok();
//!     // the line is released when `handle` goes out of scope
//! }
//! ```
//!
//! When the caller wants to know which step failed, use
//! [`try_acquire_output_line`]:
//!
//! ```no_run
//! use gpio_handle::{try_acquire_output_line, CdevBackend};
//!
//! # fn main() -> Result<(), gpio_handle::Error> {
//! let backend = CdevBackend::new().with_dev_dir("/dev");
//! let handle = try_acquire_output_line(&backend, "1", "4", "power-good")?;
//! println!("holding {:?}", handle.offsets());
//! # Ok(()) }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

use bitflags::bitflags;

mod errors;

mod ffi;

pub mod cdev;
pub mod parse;

pub use cdev::{CdevBackend, Chip, LineHandle, LineInfo, LineRequestFlags};
pub use errors::{BoxError, DeviceError, DeviceErrorKind, Error, ErrorKind, IoctlKind, Result};
pub use parse::{ControllerId, LineOffset, ParseIdError, ParseIdReason};

bitflags! {
    /// Line configuration as reported by the controller.
    ///
    /// The bit positions are those of the kernel's line info flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LineFlags: u32 {
        const KERNEL = (1 << 0);
        const IS_OUT = (1 << 1);
        const ACTIVE_LOW = (1 << 2);
        const OPEN_DRAIN = (1 << 3);
        const OPEN_SOURCE = (1 << 4);
        const BIAS_PULL_UP = (1 << 5);
        const BIAS_PULL_DOWN = (1 << 6);
        const BIAS_DISABLE = (1 << 7);
    }
}

/// One line of a handle request and the value it starts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub offset: LineOffset,
    pub value: u8,
}

impl LineRequest {
    pub fn new(offset: LineOffset, value: u8) -> Self {
        LineRequest { offset, value }
    }

    /// Request `offset` starting at logical 0.
    pub fn output_low(offset: LineOffset) -> Self {
        Self::new(offset, 0)
    }
}

/// Access to GPIO controllers.
///
/// [`CdevBackend`] talks to the kernel; other implementations exist mostly
/// for tests.  A backend must enforce that a line is held by at most one
/// handle at a time, and a handle must release its lines when dropped.
pub trait Backend {
    /// An opened controller, only kept for the duration of one acquisition.
    type Controller;
    /// An exclusive grant on requested lines.
    type Handle;
    type Error: std::error::Error + Send + Sync + 'static;

    fn open_controller(
        &self,
        id: ControllerId,
    ) -> std::result::Result<Self::Controller, Self::Error>;

    fn line_flags(
        &self,
        controller: &Self::Controller,
        offset: LineOffset,
    ) -> std::result::Result<LineFlags, Self::Error>;

    fn request_handle(
        &self,
        controller: &Self::Controller,
        flags: LineFlags,
        lines: &[LineRequest],
        consumer: &str,
    ) -> std::result::Result<Self::Handle, Self::Error>;
}

/// Acquire line `line_text` of controller `controller_text` as an output
/// driven low, reporting which step failed.
///
/// Both strings must be plain decimal numbers (see [`parse`]); they are
/// checked before any hardware is touched, the controller first.  The
/// line keeps every flag the controller reports for it except that its
/// direction is forced to output.
///
/// Failures are returned, not logged.
pub fn try_acquire_output_line<B: Backend>(
    backend: &B,
    controller_text: &str,
    line_text: &str,
    consumer: &str,
) -> Result<B::Handle> {
    let controller: ControllerId = controller_text
        .parse()
        .map_err(ErrorKind::InvalidControllerText)?;
    let offset: LineOffset = line_text.parse().map_err(ErrorKind::InvalidLineText)?;

    let chip = backend
        .open_controller(controller)
        .map_err(|e| ErrorKind::ControllerOpen {
            controller,
            cause: Box::new(e),
        })?;

    let flags = backend
        .line_flags(&chip, offset)
        .map_err(|e| ErrorKind::LineQuery {
            controller,
            offset,
            cause: Box::new(e),
        })?;

    let handle = backend
        .request_handle(
            &chip,
            flags | LineFlags::IS_OUT,
            &[LineRequest::output_low(offset)],
            consumer,
        )
        .map_err(|e| ErrorKind::LineRequest {
            controller,
            offset,
            cause: Box::new(e),
        })?;

    Ok(handle)
}

/// Acquire line `line_text` of controller `controller_text` as an output
/// driven low.
///
/// Same as [`try_acquire_output_line`], except that every failure collapses
/// into `None` after a single error is logged through the `log` facade.
/// A `None` has had no effect on the system; retrying is up to the caller.
pub fn acquire_output_line<B: Backend>(
    backend: &B,
    controller_text: &str,
    line_text: &str,
    consumer: &str,
) -> Option<B::Handle> {
    match try_acquire_output_line(backend, controller_text, line_text, consumer) {
        Ok(handle) => {
            log::debug!(
                "acquired line {} on gpiochip{} as {:?}",
                line_text,
                controller_text,
                consumer
            );
            Some(handle)
        }
        Err(e) => {
            log::error!("Unable to set up GPIO handle: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fmt;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Open(u32),
        Flags(u32),
        Request(LineFlags, Vec<LineRequest>, String),
    }

    #[derive(Debug)]
    struct MockError(&'static str);

    impl fmt::Display for MockError {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for MockError {}

    struct Mock {
        flags: LineFlags,
        fail_open: bool,
        fail_flags: bool,
        fail_request: bool,
        calls: RefCell<Vec<Call>>,
    }

    impl Default for Mock {
        fn default() -> Self {
            Mock {
                flags: LineFlags::empty(),
                fail_open: false,
                fail_flags: false,
                fail_request: false,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Mock {
        fn with_flags(flags: LineFlags) -> Self {
            Mock {
                flags,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl Backend for Mock {
        type Controller = u32;
        type Handle = (u32, LineOffset);
        type Error = MockError;

        fn open_controller(&self, id: ControllerId) -> std::result::Result<u32, MockError> {
            self.calls.borrow_mut().push(Call::Open(id.get()));
            if self.fail_open {
                return Err(MockError("no such chip"));
            }
            Ok(id.get())
        }

        fn line_flags(
            &self,
            _controller: &u32,
            offset: LineOffset,
        ) -> std::result::Result<LineFlags, MockError> {
            self.calls.borrow_mut().push(Call::Flags(offset.get()));
            if self.fail_flags {
                return Err(MockError("offset out of range"));
            }
            Ok(self.flags)
        }

        fn request_handle(
            &self,
            controller: &u32,
            flags: LineFlags,
            lines: &[LineRequest],
            consumer: &str,
        ) -> std::result::Result<(u32, LineOffset), MockError> {
            self.calls
                .borrow_mut()
                .push(Call::Request(flags, lines.to_vec(), consumer.to_owned()));
            if self.fail_request {
                return Err(MockError("device or resource busy"));
            }
            Ok((*controller, lines[0].offset))
        }
    }

    #[test]
    fn invalid_controller_text_touches_nothing() {
        let mock = Mock::default();
        let err = try_acquire_output_line(&mock, "abc123", "5", "test").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidControllerText(_)));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn invalid_line_text_touches_nothing() {
        let mock = Mock::default();
        let err = try_acquire_output_line(&mock, "0", "notanumber", "test").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidLineText(_)));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn controller_reported_first_when_both_invalid() {
        let mock = Mock::default();
        let err = try_acquire_output_line(&mock, "", "-1", "test").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidControllerText(_)));
    }

    #[test]
    fn open_failure_stops_there() {
        let mock = Mock {
            fail_open: true,
            ..Default::default()
        };
        let err = try_acquire_output_line(&mock, "9999", "0", "test").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ControllerOpen { .. }));
        assert!(!err.is_invalid_input());
        assert_eq!(mock.calls(), vec![Call::Open(9999)]);
    }

    #[test]
    fn query_failure_stops_there() {
        let mock = Mock {
            fail_flags: true,
            ..Default::default()
        };
        let err = try_acquire_output_line(&mock, "0", "512", "test").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LineQuery { .. }));
        assert_eq!(mock.calls(), vec![Call::Open(0), Call::Flags(512)]);
    }

    #[test]
    fn request_failure_is_reported() {
        let mock = Mock {
            fail_request: true,
            ..Default::default()
        };
        let err = try_acquire_output_line(&mock, "0", "3", "test").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LineRequest { .. }));
        assert_eq!(mock.calls().len(), 3);
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    fn requests_single_line_low_with_output_forced() {
        let mock = Mock::with_flags(LineFlags::BIAS_PULL_UP);
        let handle = try_acquire_output_line(&mock, "0", "3", "phosphor-hwmon").unwrap();
        assert_eq!(handle, (0, LineOffset::from(3)));
        assert_eq!(
            mock.calls(),
            vec![
                Call::Open(0),
                Call::Flags(3),
                Call::Request(
                    LineFlags::IS_OUT | LineFlags::BIAS_PULL_UP,
                    vec![LineRequest::output_low(LineOffset::from(3))],
                    "phosphor-hwmon".to_owned()
                ),
            ]
        );
    }

    #[test]
    fn only_the_output_bit_changes() {
        for bits in 0..=0xffu32 {
            let queried = LineFlags::from_bits_truncate(bits);
            let mock = Mock::with_flags(queried);
            try_acquire_output_line(&mock, "1", "2", "test").unwrap();

            let requested = match mock.calls().pop() {
                Some(Call::Request(flags, _, _)) => flags,
                other => panic!("unexpected call {:?}", other),
            };
            assert!(requested.contains(LineFlags::IS_OUT));
            assert_eq!(requested - LineFlags::IS_OUT, queried - LineFlags::IS_OUT);
        }
    }

    #[test]
    fn flat_variant_collapses_failures() {
        let mock = Mock {
            fail_request: true,
            ..Default::default()
        };
        assert!(acquire_output_line(&mock, "0", "3", "test").is_none());
        assert!(acquire_output_line(&Mock::default(), "0", "3 ", "test").is_none());
        assert!(acquire_output_line(&Mock::default(), "0", "3", "test").is_some());
    }
}
