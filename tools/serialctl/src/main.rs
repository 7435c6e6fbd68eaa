//! serialctl - Host walkthrough for the serial identifier driver
//!
//! Commands:
//! - `serialctl demo` - Load the driver in-process and walk the lifecycle
//! - `serialctl info` - Show device naming and parameter defaults
//!
//! The demo reproduces the usual manual session against the real device
//! node: open it read-only, read the identifier, watch a second opener
//! bounce off the busy gate, then update the identifier through the
//! privileged attribute and read it back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use chardev::{AccessMode, DeviceRegistry, Error};
use serialnum_driver::{
    ModuleParams, SerialModule, ATTR_NAME, CLASS_NAME, DEVICE_NAME, SERIAL_LEN,
};

#[derive(Parser)]
#[command(name = "serialctl")]
#[command(version)]
#[command(about = "Serial identifier driver walkthrough", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the driver in-process and walk the full device lifecycle
    Demo {
        /// TOML file with module parameters (keys: debug, one_shot)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Loader-style parameter override, e.g. one_shot=0 (repeatable)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Serial number to store through the sysfs attribute
        #[arg(long, default_value = "CRYPTO-77")]
        serial: String,
    },

    /// Show device naming and parameter defaults
    Info,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            config,
            params,
            serial,
        } => {
            let params = resolve_params(config.as_deref(), &params)?;
            env_logger::Builder::new()
                .filter_level(if params.debug {
                    LevelFilter::Debug
                } else {
                    LevelFilter::Info
                })
                .init();
            demo(params, serial.as_bytes())?;
        }

        Commands::Info => {
            show_info();
        }
    }

    Ok(())
}

/// Config file first, then loader-style overrides on top
fn resolve_params(config: Option<&Path>, overrides: &[String]) -> anyhow::Result<ModuleParams> {
    let mut params = match config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("cannot parse config file {}", path.display()))?
        }
        None => ModuleParams::default(),
    };

    for token in overrides {
        params
            .apply(token)
            .with_context(|| format!("bad --param {token}"))?;
    }
    Ok(params)
}

fn demo(params: ModuleParams, serial: &[u8]) -> anyhow::Result<()> {
    println!("module parameters: {params:?}");

    let registry = DeviceRegistry::new();
    let module = SerialModule::init(&registry, params).context("driver load failed")?;
    println!(
        "loaded: node '{}' (major {}), attribute '{ATTR_NAME}'",
        module.node_name(),
        module.major()
    );

    // Read the identifier the way `cat` would
    let mut session = registry
        .open(module.node_name(), AccessMode::ReadOnly)
        .context("open failed")?;
    let mut buf = [0u8; SERIAL_LEN];
    session.read(&mut buf).context("read failed")?;
    println!("identifier: {}", printable(&buf));

    // A second opener bounces off the busy gate
    match registry.open(module.node_name(), AccessMode::ReadOnly) {
        Err(Error::Busy) => println!("second open while held: busy, as expected"),
        Err(other) => println!("second open while held: unexpected error: {other}"),
        Ok(_) => println!("second open while held: unexpectedly succeeded"),
    }
    drop(session);

    // Privileged update through the attribute file
    let written = registry
        .attr_store(module.node_name(), ATTR_NAME, serial)
        .context("attribute store failed")?;
    println!("stored {written} bytes via '{ATTR_NAME}'");

    let mut session = registry
        .open(module.node_name(), AccessMode::ReadOnly)
        .context("reopen failed")?;
    session.read(&mut buf).context("reread failed")?;
    println!("identifier: {}", printable(&buf));

    // Oversized payloads are rejected without touching the buffer
    let oversized = vec![b'F'; SERIAL_LEN + 1];
    match registry.attr_store(module.node_name(), ATTR_NAME, &oversized) {
        Err(Error::PayloadTooLarge { len, capacity }) => {
            println!("oversized store rejected ({len} > {capacity})");
        }
        other => println!("oversized store: unexpected result: {other:?}"),
    }

    Ok(())
}

fn show_info() {
    println!("device name:    {DEVICE_NAME}");
    println!("device class:   {CLASS_NAME}");
    println!("device node:    {CLASS_NAME}_{DEVICE_NAME}");
    println!("attribute:      {ATTR_NAME} (write-only, privileged)");
    println!("capacity:       {SERIAL_LEN} bytes");
    println!("parameters:     {:?}", ModuleParams::default());
}

/// Render a buffer with non-printable bytes as dots
fn printable(buf: &[u8]) -> String {
    buf.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
