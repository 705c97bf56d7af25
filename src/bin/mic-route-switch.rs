//! Mic Route Switch
//!
//! Routes the configured microphone to output A, or to output B while the
//! hotkey is held (or after it is toggled).
//!
//! Usage:
//!   mic-route-switch list
//!   mic-route-switch [--config PATH]

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mic_route_switch::{
    audio::{
        device::{
            default_input_device, find_cable_inputs, find_input_device, find_output_device,
            pair_cable_outputs, CABLE_INSTALL_HINT,
        },
        list_devices, AudioDevice, CpalBackend,
    },
    hotkey::KeyboardHook,
    AppConfig, RoutingSession, SessionDevices, SessionStatus, SharedHotkeySettings,
};

enum Command {
    List,
    Run { config: Option<PathBuf> },
}

fn parse_args() -> Result<Command> {
    let mut args = std::env::args().skip(1);
    let mut config = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "list" => return Ok(Command::List),
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    Ok(Command::Run { config })
}

fn print_devices() {
    println!("\n=== Available Audio Devices ===");
    for device in list_devices() {
        let device_type = match (device.is_input, device.is_output) {
            (true, true) => "Input/Output",
            (true, false) => "Input",
            (false, true) => "Output",
            _ => "Unknown",
        };
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {} ({}){}:", device.name, device_type, default_marker);
        println!("    Sample rates: {:?}", device.sample_rates);
        println!("    Channels: {:?}", device.channels);
    }
    println!();
}

fn resolve_devices(config: &AppConfig) -> Result<SessionDevices<AudioDevice>> {
    let input = match &config.audio.input_device {
        Some(name) => find_input_device(name)?,
        None => default_input_device()?,
    };

    let (output_a, output_b) = match (&config.audio.output_a, &config.audio.output_b) {
        (Some(a), Some(b)) => (find_output_device(a)?, find_output_device(b)?),
        (a, b) => {
            let cables = find_cable_inputs();
            let Some((cable_a, cable_b)) = pair_cable_outputs(&cables) else {
                tracing::error!("{CABLE_INSTALL_HINT}");
                bail!("no output devices configured and no CABLE Input devices found");
            };
            tracing::info!(count = cables.len(), "found CABLE Input devices");
            let output_a = match a {
                Some(name) => find_output_device(name)?,
                None => cable_a,
            };
            let output_b = match b {
                Some(name) => find_output_device(name)?,
                None => cable_b,
            };
            (output_a, output_b)
        }
    };

    tracing::info!(
        input = %input.name,
        output_a = %output_a.name,
        output_b = %output_b.name,
        "devices resolved"
    );

    Ok(SessionDevices {
        input,
        output_a,
        output_b,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = match parse_args()? {
        Command::List => {
            print_devices();
            return Ok(());
        }
        Command::Run { config } => config,
    };

    tracing::info!("Starting Mic Route Switch");

    let config = match &config_path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load()?,
    };

    let devices = resolve_devices(&config)?;
    let settings = SharedHotkeySettings::new(config.hotkey_settings());
    let backend = CpalBackend::new(config.audio.output_buffer_frames);

    let status = Arc::new(|status: SessionStatus| match &status {
        SessionStatus::Failed { reason } => tracing::error!(%reason, "session failed"),
        other => tracing::info!(status = %other, "session status"),
    });

    // The hook runs for the whole process, independent of routing
    let mut hook = KeyboardHook::new();
    match hook.install() {
        Ok(()) => tracing::info!(hotkey = %settings.get(), "hotkey active"),
        Err(e) => tracing::warn!(error = %e, "hotkeys disabled, routing stays on A"),
    }

    let mut session = RoutingSession::start(
        &backend,
        &devices,
        settings.clone(),
        config.session_options(),
        status,
    )
    .context("failed to start routing session")?;
    let subscription = hook.subscribe(session.key_handler());

    tracing::info!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    hook.unsubscribe(subscription);
    hook.uninstall();
    session.stop();

    let stats = session.stats();
    println!("\n=== Session Statistics ===");
    println!("  Chunks routed to A: {}", stats.router.routed_a);
    println!("  Chunks routed to B: {}", stats.router.routed_b);
    println!("  Dropped (A/B):      {}/{}", stats.router.dropped_a, stats.router.dropped_b);
    println!("  Underruns (A/B):    {}/{}", stats.router.underruns_a, stats.router.underruns_b);
    println!("  Callback faults:    {}", stats.callback_faults);

    Ok(())
}
