//! Operator console for a device's wireless configuration.
//!
//! Talks to the device over UDP and reads commands from stdin.
//!
//! # Usage
//!
//! ```bash
//! WIFI_BRIDGE_DEVICE=192.168.4.1:14555 cargo run --bin wifi-bridge-console
//! ```
//!
//! # Environment
//!
//! - `WIFI_BRIDGE_CONFIG` - JSON configuration file (optional)
//! - `WIFI_BRIDGE_DEVICE` - device address (default `127.0.0.1:14555`)
//! - `WIFI_BRIDGE_BIND` - local bind address (default `0.0.0.0:14550`)
//! - `RUST_LOG` - log filter (default `info`)

use log::{error, info, warn};
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wifi_bridge::config::{validate_password, BridgeConfig, ProtocolConfig};
use wifi_bridge::console::{
    format_event, format_saved_networks, format_scanned_networks, format_status, ConsoleCommand,
    HELP_TEXT,
};
use wifi_bridge::service::Intent;
use wifi_bridge::settings::JsonFileStore;
use wifi_bridge::{BridgeController, BridgeHandle, BridgeService, UdpTransport};

const CONFIG_ENV: &str = "WIFI_BRIDGE_CONFIG";
const DEVICE_ENV: &str = "WIFI_BRIDGE_DEVICE";
const BIND_ENV: &str = "WIFI_BRIDGE_BIND";

const DEFAULT_DEVICE_ADDR: &str = "127.0.0.1:14555";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:14550";

/// Inbound frame queue depth.
const INBOUND_QUEUE_SIZE: usize = 64;

fn address_from_env(key: &str, default: &str) -> SocketAddr {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    match value.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid {} address {:?}: {}", key, value, e);
            std::process::exit(1);
        }
    }
}

fn load_config() -> BridgeConfig {
    let Ok(path) = env::var(CONFIG_ENV) else {
        return BridgeConfig::default();
    };
    match BridgeConfig::load(Path::new(&path)) {
        Ok(config) => {
            info!("Loaded configuration from {}", path);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn open_settings(config: &BridgeConfig) -> JsonFileStore {
    match &config.settings_path {
        Some(path) => JsonFileStore::open(path),
        None => match JsonFileStore::open_default() {
            Ok(store) => store,
            Err(e) => {
                error!("Cannot locate settings file: {}", e);
                std::process::exit(1);
            }
        },
    }
}

/// Run one console line. Returns `false` when the operator asked to quit.
async fn run_command(handle: &BridgeHandle, protocol: &ProtocolConfig, line: &str) -> bool {
    match ConsoleCommand::parse(line) {
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Help => println!("{}", HELP_TEXT),
        ConsoleCommand::List => print!("{}", format_saved_networks(&handle.snapshot())),
        ConsoleCommand::Scanned => print!("{}", format_scanned_networks(&handle.snapshot())),
        ConsoleCommand::Default { ssid: None } => {
            let snapshot = handle.snapshot();
            if snapshot.default_network.is_empty() {
                println!("No default network set");
            } else {
                println!("Default network: {}", snapshot.default_network);
            }
        }
        ConsoleCommand::Status => {
            print!("{}", format_status(&handle.snapshot()));
            if let Err(e) = handle.request_status().await {
                println!("Error: {}", e);
            }
        }
        ConsoleCommand::Save {
            ssid,
            kind,
            password,
        } => match validate_password(&password, kind, protocol) {
            Ok(()) => {
                send_intent(
                    handle,
                    Intent::SaveNetwork {
                        ssid,
                        kind,
                        password,
                    },
                )
                .await
            }
            Err(e) => println!("Error: {}", e),
        },
        ConsoleCommand::Unknown(message) => {
            if !message.is_empty() {
                println!("{}", message);
            }
        }
        command => {
            if let Some(intent) = command.into_intent() {
                send_intent(handle, intent).await;
            }
        }
    }
    true
}

async fn send_intent(handle: &BridgeHandle, intent: Intent) {
    if let Err(e) = handle.send(intent).await {
        println!("Error: {}", e);
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("=== WiFi Bridge Console starting ===");

    let config = load_config();
    let device = address_from_env(DEVICE_ENV, DEFAULT_DEVICE_ADDR);
    let bind = address_from_env(BIND_ENV, DEFAULT_BIND_ADDR);
    let settings = open_settings(&config);
    info!("Settings file: {:?}", settings.path());

    let transport = match UdpTransport::bind(bind, device).await {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to open transport: {}", e);
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_SIZE);
    let receiver = transport.spawn_receiver(inbound_tx, cancel.clone());

    let controller = BridgeController::new(transport, settings, &config);
    let (handle, service) = BridgeService::spawn(controller, inbound_rx, cancel.clone());

    // Print notifications as they arrive
    let mut events = handle.subscribe();
    let printer_cancel = cancel.clone();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = printer_cancel.cancelled() => break,

                result = events.recv() => match result {
                    Ok(event) => println!("{}", format_event(&event)),
                    Err(RecvError::Lagged(n)) => warn!("Missed {} notifications", n),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    // Learn the device state before the first prompt
    if let Err(e) = handle.request_status().await {
        warn!("Status request failed: {}", e);
    }
    if let Err(e) = handle.refresh_saved_networks().await {
        warn!("Refresh failed: {}", e);
    }

    println!("Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }

            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !run_command(&handle, &config.protocol, &line).await {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            },
        }
    }

    cancel.cancel();
    let _ = service.await;
    let _ = receiver.await;
    let _ = printer.await;
    info!("Console stopped");
}
