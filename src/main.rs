//! Emulates a USB portal over a serial link to a bridging microcontroller.

use std::path::PathBuf;
use std::process::{self, ExitCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Error};
use argh::FromArgs;
use log::{error, info, warn};

use portalsim::descriptors::PORTAL;
use portalsim::portal::Portal;
use portalsim::responder::{Responder, ResponderOptions};
use portalsim::settings::Settings;
use portalsim::transport::{DEFAULT_BAUD, SerialTransport};

#[derive(FromArgs)]
/// Answer the bridge's enumeration requests as a USB portal would.
struct Args {
    /// serial device of the bridge (default: last used, else /dev/ttyUSB0)
    #[argh(option, short = 'd')]
    device: Option<PathBuf>,
    /// baud rate of the serial line (default: 57600)
    #[argh(option, short = 'b', default = "DEFAULT_BAUD")]
    baud: u32,
    /// stall device qualifier requests instead of ignoring them
    #[argh(switch)]
    stall_qualifier: bool,
    /// log every packet sent and received
    #[argh(switch, short = 'v')]
    verbose: bool,
    /// do not remember the device for next time
    #[argh(switch)]
    no_save: bool,
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    let mut settings = Settings::load();
    let device = settings.device(args.device.as_deref());

    let transport = SerialTransport::open(&device, args.baud)
        .with_context(|| format!("Failed to open {}", device.display()))?;

    if !args.no_save {
        settings.last_device = Some(device.clone());
        settings.save();
    }

    let options = ResponderOptions {
        stall_device_qualifier: args.stall_qualifier,
    };
    let mut portal = Portal::new(transport, Responder::new(&PORTAL, options));
    info!("Emulating portal on {} at {} baud",
          portal.transport().path().display(), args.baud);

    // Stop at the next packet boundary on the first Ctrl-C, immediately on
    // the second.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        if !r.swap(false, Ordering::SeqCst) {
            process::exit(130);
        }
    }).context("Failed to set Ctrl-C handler")?;

    let result = portal.run(&running);
    match &result {
        Ok(()) => info!("Interrupted, stopping"),
        Err(error) if error.is_unclassified() =>
            error!("No handling for this input, stopping"),
        Err(_) => {},
    }
    if let Err(e) = portal.disconnect() {
        warn!("Failed to disconnect: {e}");
    }
    result.context("Portal stopped")
}
