//! # ELEVIO Command Line
//!
//! Drives single I/O operations against the configured driver, dumps the
//! state of every channel, or watches the elevator panel.
//!
//! # Usage
//!
//! ```bash
//! # Light the stop lamp on the simulator
//! elevio --simulate set LIGHT_STOP
//!
//! # Drive the motor on the real rig
//! elevio --config /etc/elevio/elevio.toml --driver comedi write MOTOR 2800
//!
//! # Every channel as JSON
//! elevio -s --json status
//!
//! # Log button presses and floor arrivals until Ctrl-C
//! elevio -v watch
//! ```

use clap::{Parser, Subcommand};
use elevio_common::channel::Channel;
use elevio_common::config::IoConfig;
use elevio_common::consts::{DEFAULT_CONFIG_PATH, IO_SERVICE_NAME};
use elevio_common::driver::{AnalogValue, IoError};
use elevio_common::elevator::MotorDirection;
use elevio_common::orders::CabState;
use elevio_hal::clock::SystemClock;
use elevio_hal::core::IoCore;
use elevio_hal::driver_registry::DriverRegistry;
use elevio_hal::elevator::{Elevator, ElevatorEvent, InputPoller};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

/// ELEVIO - digital/analog I/O for the elevator rig
#[derive(Parser, Debug)]
#[command(name = "elevio")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Digital/analog I/O core with pluggable drivers")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file (defaults to /etc/elevio/elevio.toml
    /// when present, built-in defaults otherwise)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Force the simulation driver
    #[arg(short = 's', long)]
    simulate: bool,

    /// Driver to load (overrides driver.name)
    #[arg(short, long, conflicts_with = "simulate")]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs and results in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize the driver and report success
    Init,
    /// Drive a digital output high
    Set {
        /// Channel (name, 0x30e, 0x300+14 or decimal)
        channel: Channel,
    },
    /// Drive a digital output low
    Clear {
        /// Channel (name, 0x30e, 0x300+14 or decimal)
        channel: Channel,
    },
    /// Drive an analog output
    Write {
        /// Channel (name, 0x100 or decimal)
        channel: Channel,
        /// Level to write
        value: AnalogValue,
    },
    /// Read a digital line
    ReadBit {
        /// Channel (name, 0x204 or decimal)
        channel: Channel,
    },
    /// Read an analog line
    ReadAnalog {
        /// Channel (name, 0x100 or decimal)
        channel: Channel,
    },
    /// Read every channel of the layout
    Status,
    /// Poll the elevator panel and log events until Ctrl-C
    Watch,
    /// List the drivers built into this binary
    Drivers,
}

fn main() {
    if let Err(e) = run() {
        error!("{} failed: {}", IO_SERVICE_NAME, e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = IoConfig::load_or_default(args.config.as_deref(), Path::new(DEFAULT_CONFIG_PATH));
    let level = match &config {
        _ if args.verbose => Level::DEBUG,
        Ok(config) => config.shared.log_level.into(),
        Err(_) => Level::INFO,
    };
    setup_tracing(&args, level);
    let mut config = config?;

    debug!("ELEVIO v{} starting", env!("CARGO_PKG_VERSION"));

    if args.simulate {
        config.driver.name = "simulation".to_string();
    } else if let Some(name) = &args.driver {
        config.driver.name = name.clone();
    }

    let registry = DriverRegistry::with_builtin_drivers();
    match args.command {
        Command::Drivers => {
            for name in registry.list_drivers() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Watch => watch(IoCore::new(config, &registry)?, args.json),
        command => {
            let mut core = IoCore::new(config, &registry)?;
            core.init()?;
            execute(&mut core, command, args.json)?;
            core.shutdown()?;
            Ok(())
        }
    }
}

/// Run a one-shot command on an initialized core.
fn execute(core: &mut IoCore, command: Command, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Init => {
            info!("Driver '{}' initialized", core.driver_name());
            println!("ok");
        }
        Command::Set { channel } => core.set_bit(channel)?,
        Command::Clear { channel } => core.clear_bit(channel)?,
        Command::Write { channel, value } => core.write_analog(channel, value)?,
        Command::ReadBit { channel } => println!("{}", u8::from(core.read_bit(channel)?)),
        Command::ReadAnalog { channel } => println!("{}", core.read_analog(channel)?),
        Command::Status => {
            let snapshot = core.snapshot()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                for reading in &snapshot {
                    println!(
                        "{:<10} {:<18} {:<6} {:<7} {:<6} {}",
                        reading.channel,
                        reading.name.unwrap_or("-"),
                        reading.port,
                        reading.kind,
                        reading.direction,
                        reading.value
                    );
                }
            }
        }
        // Long-running and registry commands are dispatched by run()
        Command::Watch | Command::Drivers => {}
    }
    Ok(())
}

/// Initialize the elevator panel and report events until Ctrl-C.
fn watch(core: IoCore, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !core.config().elevator.enabled {
        return Err("elevator panel is disabled (elevator.enabled = false)".into());
    }
    let poll_interval = core.config().elevator.poll_interval();

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    let mut elevator = Elevator::new(core, Arc::new(SystemClock));
    elevator.init()?;

    let mut poller = InputPoller::new();
    let mut cab = CabState::idle_at(elevator.floor_sensor()?.unwrap_or(0));
    info!("Watching elevator panel every {:?}", poll_interval);
    while running.load(Ordering::SeqCst) {
        for event in poller.poll(&mut elevator)? {
            if json {
                println!("{}", serde_json::to_string(&event)?);
            } else {
                info!("{:?}", event);
            }
            track_order(&mut elevator, &mut cab, event)?;
        }
        std::thread::sleep(poll_interval);
    }

    elevator.set_motor_direction(MotorDirection::Stop)?;
    elevator.core_mut().shutdown()?;
    info!("Watch stopped");
    Ok(())
}

/// Keep the order book and its lamps in step with a panel event.
///
/// The cab is driven by hand while watching, so every arrival serves the
/// orders of that floor.
fn track_order(elevator: &mut Elevator, cab: &mut CabState, event: ElevatorEvent) -> Result<(), IoError> {
    match event {
        ElevatorEvent::ButtonPressed { kind, floor } => {
            if cab.orders.add(kind, floor) {
                elevator.set_button_lamp(kind, floor, true)?;
            }
        }
        ElevatorEvent::FloorReached { floor } => {
            cab.last_floor = floor;
            if cab.should_stop() && !cab.orders.clear_floor(floor).is_empty() {
                elevator.set_order_lamps(&cab.orders)?;
            }
            if !cab.orders.is_empty() {
                info!("Next direction from floor {}: {:?}", floor, cab.next_direction());
            }
        }
        ElevatorEvent::StopPressed => {}
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
