//! gridlink - bridge live sim telemetry to a serial device.
//!
//! Opens the named serial port at a fixed 115200/8N1, subscribes to a
//! telemetry source, and forwards each snapshot as newline-terminated
//! ASCII. Run with no port argument to list the ports present on this
//! machine.

mod console;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gridlink_serial::{BridgeConfig, BridgeError, SerialBridge, SerialTransport, available_port_names};
use gridlink_telemetry::{SimulatedSource, StreamIntervals, TelemetrySource, UdpSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Built-in simulated laps; no game required.
    Sim,
    /// Listen for telemetry datagrams on a UDP port.
    Udp,
}

#[derive(Parser, Debug)]
#[command(name = "gridlink")]
#[command(version)]
#[command(about = "Bridge live sim telemetry to a serial device as line-based ASCII")]
#[command(long_about = "
gridlink forwards live telemetry snapshots (fuel, rpm, tyre wear, best
lap time) to a microcontroller or dashboard display over a serial port,
one ASCII line per value, at 115200 baud 8N1.

Run without arguments to list the serial ports on this machine. While
the bridge runs, press q (or Ctrl-C) to shut down cleanly.
")]
struct Cli {
    /// Serial port/device to open (omit to list available ports)
    port: Option<String>,

    /// Telemetry source to bridge
    #[arg(long, value_enum, default_value_t = SourceKind::Sim)]
    source: SourceKind,

    /// UDP listen port for --source udp
    #[arg(long, default_value_t = 9996)]
    udp_port: u16,

    /// Static info cadence in milliseconds
    #[arg(long, default_value_t = 1000)]
    static_interval_ms: u64,

    /// Physics cadence in milliseconds
    #[arg(long, default_value_t = 100)]
    physics_interval_ms: u64,

    /// Graphics cadence in milliseconds
    #[arg(long, default_value_t = 300)]
    graphics_interval_ms: u64,

    /// Inbound drain tick in milliseconds
    #[arg(long, default_value_t = 1000)]
    drain_tick_ms: u64,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            intervals: StreamIntervals {
                static_info: Duration::from_millis(self.static_interval_ms),
                physics: Duration::from_millis(self.physics_interval_ms),
                graphics: Duration::from_millis(self.graphics_interval_ms),
            },
            drain_tick: Duration::from_millis(self.drain_tick_ms),
        }
    }

    fn make_source(&self) -> Arc<dyn TelemetrySource> {
        match self.source {
            SourceKind::Sim => Arc::new(SimulatedSource::new()),
            SourceKind::Udp => Arc::new(UdpSource::new(self.udp_port)),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("gridlink={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        let exit_code = match e.downcast_ref::<BridgeError>() {
            Some(BridgeError::PortOpen { .. }) => 2,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(port) = cli.port.clone() else {
        return list_ports();
    };

    info!(port = %port, "opening serial port");
    let (writer_half, reader_half) = SerialTransport::open(&port)?;

    let source = cli.make_source();
    let mut bridge =
        SerialBridge::start(source, writer_half, reader_half, cli.bridge_config()).await?;

    info!("bridge running; press q to quit");
    let writer = bridge.writer().clone();
    let stop = bridge.stop_signal();
    let loop_result = tokio::task::spawn_blocking(move || console::run_loop(writer, stop)).await?;

    bridge.shutdown().await;
    bridge.join_dispatch().await;
    loop_result
}

/// List-mode: every currently available port name, one per line, then
/// exit successfully without opening anything.
fn list_ports() -> Result<()> {
    let names = available_port_names()?;
    for name in names {
        println!("{name}");
    }
    Ok(())
}
