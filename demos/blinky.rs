// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use gpio_handle::{acquire_output_line, CdevBackend};
use quicli::prelude::*;
use std::thread::sleep;
use std::time::{Duration, Instant};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip number (N in /dev/gpiochipN)
    chip: String,
    /// The offset of the GPIO line for the provided chip
    line: String,
    /// Period in milliseconds
    period_ms: u64,
    /// Duration over which to blink in milliseconds
    duration_ms: u64,
}

fn do_main(args: Cli) -> std::result::Result<(), gpio_handle::DeviceError> {
    // acquire_output_line has already logged why
    let handle = match acquire_output_line(&CdevBackend::default(), &args.chip, &args.line, "blinky")
    {
        Some(handle) => handle,
        None => return Ok(()),
    };

    let duration = Duration::from_millis(args.duration_ms);
    let start_time = Instant::now();
    while start_time.elapsed() < duration {
        sleep(Duration::from_millis(args.period_ms));
        handle.set_value(1)?;
        sleep(Duration::from_millis(args.period_ms));
        handle.set_value(0)?;
    }

    Ok(())
}

fn main() -> CliResult {
    env_logger::init();
    let args = Cli::from_args();
    do_main(args).or_else(|e| {
        error!("{:?}", e);
        Ok(())
    })
}
