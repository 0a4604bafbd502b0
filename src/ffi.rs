// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! GPIO character device uapi (v1), see `include/uapi/linux/gpio.h`.

#![allow(non_camel_case_types)]

pub const GPIOHANDLES_MAX: usize = 64;
pub const GPIO_MAX_NAME_SIZE: usize = 32;

// struct gpiochip_info
#[repr(C)]
pub struct gpiochip_info {
    pub name: [libc::c_char; GPIO_MAX_NAME_SIZE],
    pub label: [libc::c_char; GPIO_MAX_NAME_SIZE],
    pub lines: u32,
}

// struct gpioline_info
#[repr(C)]
pub struct gpioline_info {
    pub line_offset: u32,
    pub flags: u32,
    pub name: [libc::c_char; GPIO_MAX_NAME_SIZE],
    pub consumer: [libc::c_char; GPIO_MAX_NAME_SIZE],
}

// struct gpiohandle_request
#[repr(C)]
pub struct gpiohandle_request {
    pub lineoffsets: [u32; GPIOHANDLES_MAX],
    pub flags: u32,
    pub default_values: [u8; GPIOHANDLES_MAX],
    pub consumer_label: [libc::c_char; GPIO_MAX_NAME_SIZE],
    pub lines: u32,
    pub fd: libc::c_int,
}

// struct gpiohandle_data
#[repr(C)]
pub struct gpiohandle_data {
    pub values: [u8; GPIOHANDLES_MAX],
}

nix::ioctl_read!(gpio_get_chipinfo_ioctl, 0xB4, 0x01, gpiochip_info);
nix::ioctl_readwrite!(gpio_get_lineinfo_ioctl, 0xB4, 0x02, gpioline_info);
nix::ioctl_readwrite!(gpio_get_linehandle_ioctl, 0xB4, 0x03, gpiohandle_request);

nix::ioctl_readwrite!(gpiohandle_get_line_values_ioctl, 0xB4, 0x08, gpiohandle_data);
nix::ioctl_readwrite!(gpiohandle_set_line_values_ioctl, 0xB4, 0x09, gpiohandle_data);
