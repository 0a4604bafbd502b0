// Copyright (c) 2018 The rust-gpio-cdev Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use gpio_handle::{try_acquire_output_line, CdevBackend};
use quicli::prelude::*;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The gpiochip number (N in /dev/gpiochipN)
    chip: String,
    /// The offset of the GPIO line for the provided chip
    line: String,
    /// The value to write once the line is held low
    value: u8,
    /// Directory holding the gpiochip device nodes
    #[structopt(long = "dev-dir", default_value = "/dev")]
    dev_dir: String,
}

fn do_main(args: Cli) -> anyhow::Result<()> {
    let backend = CdevBackend::new().with_dev_dir(&args.dev_dir);

    // NOTE: the line comes up driven low. The handle must be owned by a
    // variable for as long as the line is used; dropping it releases the
    // line and the pin will appear to do nothing.
    let handle = try_acquire_output_line(&backend, &args.chip, &args.line, "driveoutput")?;
    handle.set_value(args.value)?;

    println!("Output being driven... Enter to exit");
    let mut buf = String::new();
    ::std::io::stdin().read_line(&mut buf)?;

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
