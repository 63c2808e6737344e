//! Selection collaborator: CLI surface, device enumeration and the
//! interactive picks, plus the engine's input re-acquisition hook.

use std::io::{self, Write as _};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;

use crate::config::BridgeConfig;
use crate::input::gamepad::GamepadSource;
use crate::input::hidpad::HidPadSource;
use crate::input::keymouse::KeyMouseSource;
use crate::input::{InputError, InputSelector, InputSource};
use crate::transport::{HidTransport, SerialTransport, Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    Serial,
    Hid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputKind {
    Gamepad,
    Hidpad,
    Keymouse,
}

/// Bridge a gamepad or keyboard+mouse to a console microcontroller.
#[derive(Debug, Parser)]
#[command(name = "padbridge", version)]
pub struct BridgeArgs {
    /// Serial port name; skips the interactive pick
    #[arg(long)]
    pub port: Option<String>,

    /// Serial baud rate (overrides the config file)
    #[arg(long)]
    pub baud: Option<u32>,

    /// Transport backend carrying the report stream
    #[arg(long, value_enum, default_value_t = TransportKind::Serial)]
    pub transport: TransportKind,

    /// Input source variant
    #[arg(long, value_enum, default_value_t = InputKind::Gamepad)]
    pub input: InputKind,

    /// Input device index; skips the interactive pick
    #[arg(long)]
    pub index: Option<usize>,

    /// Pause streaming while no window title contains this string
    #[arg(long)]
    pub window: Option<String>,

    /// Take the first enumerated port and device, never prompt
    #[arg(long)]
    pub auto: bool,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Open the transport the arguments ask for.
pub fn open_transport(
    args: &BridgeArgs,
    config: &BridgeConfig,
) -> Result<Box<dyn Transport>, TransportError> {
    match args.transport {
        TransportKind::Serial => {
            let port = resolve_port(args)?;
            let baud = args.baud.unwrap_or(config.baud);
            Ok(Box::new(SerialTransport::open(&port, baud)?))
        }
        TransportKind::Hid => Ok(Box::new(HidTransport::open(
            config.mcu_vendor_id,
            config.mcu_product_id,
        )?)),
    }
}

fn resolve_port(args: &BridgeArgs) -> Result<String, TransportError> {
    if let Some(port) = &args.port {
        return Ok(port.clone());
    }

    let names: Vec<String> = serialport::available_ports()?
        .into_iter()
        .map(|port| port.port_name)
        .collect();
    if names.is_empty() {
        return Err(TransportError::Connection(
            "serial".into(),
            "no serial ports found".into(),
        ));
    }

    if args.auto {
        info!("Auto-selected serial port {}", names[0]);
        return Ok(names[0].clone());
    }

    prompt_pick("serial port", &names)
        .map(|index| names[index].clone())
        .ok_or_else(|| TransportError::Connection("serial".into(), "no port selected".into()))
}

/// List `options` and read an index from stdin.
fn prompt_pick(what: &str, options: &[String]) -> Option<usize> {
    println!("Available {what}s:");
    for (index, name) in options.iter().enumerate() {
        println!("  {index}: {name}");
    }
    print!("Pick {what} index: ");
    io::stdout().flush().ok()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line).ok()?;
    let index = line.trim().parse::<usize>().ok()?;
    (index < options.len()).then_some(index)
}

/// Resolved input choice. Also the engine's [`InputSelector`]: recovery
/// re-runs the same policy to acquire a fresh source instance.
pub struct InputSelection {
    kind: InputKind,
    index: Option<usize>,
    auto: bool,
    mouse_divisor: f32,
    hidpad_vendor_id: u16,
    hidpad_product_id: u16,
}

impl InputSelection {
    pub fn new(args: &BridgeArgs, config: &BridgeConfig) -> Self {
        Self {
            kind: args.input,
            index: args.index,
            auto: args.auto,
            mouse_divisor: config.mouse_divisor,
            hidpad_vendor_id: config.hidpad_vendor_id,
            hidpad_product_id: config.hidpad_product_id,
        }
    }

    fn pick_index(&self, names: &[String], what: &str) -> Result<usize, InputError> {
        if let Some(index) = self.index {
            return Ok(index);
        }
        if names.is_empty() {
            return Err(InputError::NoDevice(format!("no {what} connected")));
        }
        if self.auto {
            return Ok(0);
        }
        prompt_pick(what, names).ok_or_else(|| InputError::NoDevice(format!("no {what} selected")))
    }
}

impl InputSelector for InputSelection {
    fn acquire(&mut self) -> Result<Box<dyn InputSource>, InputError> {
        match self.kind {
            InputKind::Gamepad => {
                let names = GamepadSource::enumerate()?;
                let index = self.pick_index(&names, "gamepad")?;
                Ok(Box::new(GamepadSource::open(index)?))
            }
            InputKind::Hidpad => {
                let names =
                    HidPadSource::enumerate(self.hidpad_vendor_id, self.hidpad_product_id)?;
                let index = self.pick_index(&names, "HID pad")?;
                Ok(Box::new(HidPadSource::open(
                    index,
                    self.hidpad_vendor_id,
                    self.hidpad_product_id,
                )?))
            }
            InputKind::Keymouse => Ok(Box::new(KeyMouseSource::new(self.mouse_divisor)?)),
        }
    }
}
