// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Linux GPIO character device backend (`/dev/gpiochipN`, uapi v1).

use crate::errors::{
    invalid_err, ioctl_err, offset_err, too_many_lines_err, DeviceError, IoctlKind,
};
use crate::{ffi, Backend, ControllerId, LineFlags, LineOffset, LineRequest};
use bitflags::bitflags;
use std::fs::File;
use std::mem;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, DeviceError>;

bitflags! {
    /// Flags handed to the kernel when requesting a line handle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LineRequestFlags: u32 {
        const INPUT = (1 << 0);
        const OUTPUT = (1 << 1);
        const ACTIVE_LOW = (1 << 2);
        const OPEN_DRAIN = (1 << 3);
        const OPEN_SOURCE = (1 << 4);
        const BIAS_PULL_UP = (1 << 5);
        const BIAS_PULL_DOWN = (1 << 6);
        const BIAS_DISABLE = (1 << 7);
    }
}

impl From<LineFlags> for LineRequestFlags {
    /// Carry a line's reported configuration over to a handle request.
    ///
    /// `KERNEL` is informational only and is dropped.  `IS_OUT` selects
    /// between `OUTPUT` and `INPUT`; the remaining bits share positions.
    fn from(flags: LineFlags) -> Self {
        let shared = flags.difference(LineFlags::KERNEL | LineFlags::IS_OUT);
        let direction = if flags.contains(LineFlags::IS_OUT) {
            LineRequestFlags::OUTPUT
        } else {
            LineRequestFlags::INPUT
        };
        LineRequestFlags::from_bits_truncate(shared.bits()) | direction
    }
}

fn c_field(buf: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

// Leaves room for the terminating NUL.
fn copy_label(dst: &mut [libc::c_char], label: &str) {
    let n = label.len().min(dst.len().saturating_sub(1));
    for (d, &b) in dst.iter_mut().zip(&label.as_bytes()[..n]) {
        *d = b as libc::c_char;
    }
    if let Some(nul) = dst.get_mut(n) {
        *nul = 0;
    }
}

/// An open GPIO chip.
#[derive(Debug)]
pub struct Chip {
    file: File,
    path: PathBuf,
    name: String,
    label: String,
    lines: u32,
}

impl Chip {
    /// Open the GPIO Chip at the provided path (/dev/gpiochip<N>)
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Chip> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut info: ffi::gpiochip_info = unsafe { mem::zeroed() };
        unsafe { ffi::gpio_get_chipinfo_ioctl(file.as_raw_fd(), &mut info) }
            .map_err(|e| ioctl_err(IoctlKind::ChipInfo, e))?;

        Ok(Chip {
            file,
            path: path.to_path_buf(),
            name: c_field(&info.name),
            label: c_field(&info.label),
            lines: info.lines,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_lines(&self) -> u32 {
        self.lines
    }

    /// Read the current configuration of the line at `offset`.
    pub fn line_info(&self, offset: u32) -> Result<LineInfo> {
        if offset >= self.lines {
            return Err(offset_err(offset));
        }

        let mut info = ffi::gpioline_info {
            line_offset: offset,
            flags: 0,
            name: [0; ffi::GPIO_MAX_NAME_SIZE],
            consumer: [0; ffi::GPIO_MAX_NAME_SIZE],
        };
        unsafe { ffi::gpio_get_lineinfo_ioctl(self.file.as_raw_fd(), &mut info) }
            .map_err(|e| ioctl_err(IoctlKind::LineInfo, e))?;

        Ok(LineInfo {
            offset: LineOffset::from(offset),
            flags: LineFlags::from_bits_truncate(info.flags),
            name: non_empty(c_field(&info.name)),
            consumer: non_empty(c_field(&info.consumer)),
        })
    }

    /// Request a handle on one or more lines of this chip.
    ///
    /// Each line starts at its requested value.  The kernel refuses the
    /// request if any of the lines is already held, in which case nothing
    /// is claimed.
    pub fn request_lines(
        &self,
        flags: LineRequestFlags,
        lines: &[LineRequest],
        consumer: &str,
    ) -> Result<LineHandle> {
        if lines.is_empty() || lines.len() > ffi::GPIOHANDLES_MAX {
            return Err(too_many_lines_err(lines.len()));
        }

        let mut request = ffi::gpiohandle_request {
            lineoffsets: [0; ffi::GPIOHANDLES_MAX],
            flags: flags.bits(),
            default_values: [0; ffi::GPIOHANDLES_MAX],
            consumer_label: [0; ffi::GPIO_MAX_NAME_SIZE],
            lines: lines.len() as u32,
            fd: 0,
        };
        for (i, line) in lines.iter().enumerate() {
            let offset = line.offset.get();
            if offset >= self.lines {
                return Err(offset_err(offset));
            }
            request.lineoffsets[i] = offset;
            request.default_values[i] = line.value;
        }
        copy_label(&mut request.consumer_label, consumer);

        unsafe { ffi::gpio_get_linehandle_ioctl(self.file.as_raw_fd(), &mut request) }
            .map_err(|e| ioctl_err(IoctlKind::LineHandle, e))?;

        Ok(LineHandle {
            file: unsafe { File::from_raw_fd(request.fd) },
            offsets: lines.iter().map(|line| line.offset).collect(),
            flags,
            consumer: consumer.to_owned(),
        })
    }
}

/// Snapshot of a line's configuration as reported by the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo {
    pub offset: LineOffset,
    pub flags: LineFlags,
    pub name: Option<String>,
    pub consumer: Option<String>,
}

/// Exclusive handle on requested lines.
///
/// The lines stay claimed for as long as the handle lives; dropping it
/// closes the file descriptor and the kernel releases them.
#[derive(Debug)]
pub struct LineHandle {
    file: File,
    offsets: Vec<LineOffset>,
    flags: LineRequestFlags,
    consumer: String,
}

impl LineHandle {
    pub fn offsets(&self) -> &[LineOffset] {
        &self.offsets
    }

    pub fn flags(&self) -> LineRequestFlags {
        self.flags
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Values of all lines, in request order.
    pub fn get_values(&self) -> Result<Vec<u8>> {
        let mut data = ffi::gpiohandle_data {
            values: [0; ffi::GPIOHANDLES_MAX],
        };
        unsafe { ffi::gpiohandle_get_line_values_ioctl(self.file.as_raw_fd(), &mut data) }
            .map_err(|e| ioctl_err(IoctlKind::GetLine, e))?;
        Ok(data.values[..self.offsets.len()].to_vec())
    }

    /// Set all lines at once; `values` must have one entry per line.
    pub fn set_values(&self, values: &[u8]) -> Result<()> {
        if values.len() != self.offsets.len() {
            return Err(invalid_err(self.offsets.len(), values.len()));
        }

        let mut data = ffi::gpiohandle_data {
            values: [0; ffi::GPIOHANDLES_MAX],
        };
        data.values[..values.len()].copy_from_slice(values);
        unsafe { ffi::gpiohandle_set_line_values_ioctl(self.file.as_raw_fd(), &mut data) }
            .map_err(|e| ioctl_err(IoctlKind::SetLine, e))?;
        Ok(())
    }

    /// Value of the first requested line.
    pub fn get_value(&self) -> Result<u8> {
        let values = self.get_values()?;
        Ok(values[0])
    }

    /// Drive the first requested line, leaving any others as they are.
    pub fn set_value(&self, value: u8) -> Result<()> {
        if self.offsets.len() == 1 {
            return self.set_values(&[value]);
        }
        let mut values = self.get_values()?;
        values[0] = value;
        self.set_values(&values)
    }
}

impl AsRawFd for LineHandle {
    fn as_raw_fd(&self) -> std::os::unix::io::RawFd {
        self.file.as_raw_fd()
    }
}

const DEFAULT_DEV_DIR: &str = "/dev";

/// Opens controllers as `<dev_dir>/gpiochip<N>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdevBackend {
    dev_dir: PathBuf,
}

impl Default for CdevBackend {
    fn default() -> Self {
        CdevBackend {
            dev_dir: PathBuf::from(DEFAULT_DEV_DIR),
        }
    }
}

impl CdevBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for chip device nodes somewhere other than `/dev`.
    pub fn with_dev_dir(mut self, dev_dir: impl Into<PathBuf>) -> Self {
        self.dev_dir = dev_dir.into();
        self
    }

    pub fn dev_dir(&self) -> &Path {
        &self.dev_dir
    }

    pub fn chip_path(&self, id: ControllerId) -> PathBuf {
        self.dev_dir.join(format!("gpiochip{}", id))
    }
}

impl Backend for CdevBackend {
    type Controller = Chip;
    type Handle = LineHandle;
    type Error = DeviceError;

    fn open_controller(&self, id: ControllerId) -> Result<Chip> {
        let chip = Chip::new(self.chip_path(id))?;
        log::trace!(
            "opened {} ({:?}, {:?}, {} lines)",
            chip.path().display(),
            chip.name(),
            chip.label(),
            chip.num_lines()
        );
        Ok(chip)
    }

    fn line_flags(&self, chip: &Chip, offset: LineOffset) -> Result<LineFlags> {
        Ok(chip.line_info(offset.get())?.flags)
    }

    fn request_handle(
        &self,
        chip: &Chip,
        flags: LineFlags,
        lines: &[LineRequest],
        consumer: &str,
    ) -> Result<LineHandle> {
        chip.request_lines(LineRequestFlags::from(flags), lines, consumer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeviceErrorKind;

    #[test]
    fn request_flags_follow_line_flags() {
        assert_eq!(
            LineRequestFlags::from(LineFlags::empty()),
            LineRequestFlags::INPUT
        );
        assert_eq!(
            LineRequestFlags::from(LineFlags::IS_OUT | LineFlags::BIAS_PULL_UP),
            LineRequestFlags::OUTPUT | LineRequestFlags::BIAS_PULL_UP
        );
        assert_eq!(
            LineRequestFlags::from(
                LineFlags::KERNEL
                    | LineFlags::IS_OUT
                    | LineFlags::ACTIVE_LOW
                    | LineFlags::OPEN_DRAIN
            ),
            LineRequestFlags::OUTPUT | LineRequestFlags::ACTIVE_LOW | LineRequestFlags::OPEN_DRAIN
        );
    }

    #[test]
    fn request_flags_never_mix_directions() {
        for bits in 0..=0xffu32 {
            let req = LineRequestFlags::from(LineFlags::from_bits_truncate(bits));
            assert!(req.contains(LineRequestFlags::INPUT) != req.contains(LineRequestFlags::OUTPUT));
        }
    }

    #[test]
    fn label_is_truncated_and_terminated() {
        let mut buf = [0x7f as libc::c_char; ffi::GPIO_MAX_NAME_SIZE];
        copy_label(&mut buf, "phosphor-hwmon");
        assert_eq!(c_field(&buf), "phosphor-hwmon");

        let long = "x".repeat(40);
        copy_label(&mut buf, &long);
        assert_eq!(c_field(&buf).len(), ffi::GPIO_MAX_NAME_SIZE - 1);
        assert_eq!(buf[ffi::GPIO_MAX_NAME_SIZE - 1], 0);
    }

    #[test]
    fn c_field_stops_at_nul() {
        let mut buf = [0 as libc::c_char; 8];
        for (d, &b) in buf.iter_mut().zip(b"gpio\0zz") {
            *d = b as libc::c_char;
        }
        assert_eq!(c_field(&buf), "gpio");
        assert_eq!(non_empty(c_field(&[0; 4])), None);
    }

    #[test]
    fn chip_paths() {
        let backend = CdevBackend::default();
        assert_eq!(backend.chip_path(ControllerId::from(0)), Path::new("/dev/gpiochip0"));

        let backend = CdevBackend::new().with_dev_dir("/tmp/fake-dev");
        assert_eq!(
            backend.chip_path(ControllerId::from(12)),
            Path::new("/tmp/fake-dev/gpiochip12")
        );
    }

    #[test]
    fn missing_chip_is_an_io_error() {
        let err = Chip::new("/nonexistent/gpiochip9999").unwrap_err();
        assert!(matches!(err.kind(), DeviceErrorKind::Io(_)));
    }

    #[test]
    fn non_gpio_device_fails_chip_info() {
        let err = Chip::new("/dev/null").unwrap_err();
        match err.kind() {
            DeviceErrorKind::Ioctl { kind, .. } => assert_eq!(*kind, IoctlKind::ChipInfo),
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
