use anyhow::{Context, Result};
use clap::Parser;
use padlink_bus::{BackendKind, Bus, BusId};
use padlink_gamepad::{
    NotificationFn, StandardButton, TargetHandle, TargetOptions, UserData,
};
use padlink_protocol::TargetType;
use std::f64::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const TICK: Duration = Duration::from_millis(16);
/// Ticks per stick revolution, about two seconds.
const REVOLUTION: u64 = 120;
/// Ticks each face button stays held.
const HOLD: u64 = 30;

const FACE: [StandardButton; 4] =
    [StandardButton::A, StandardButton::B, StandardButton::X, StandardButton::Y];

#[derive(Parser)]
#[command(name = "padlink", about = "padlink CLI tools")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
    #[arg(long, value_enum, default_value = "vigem", global = true)]
    backend: BackendArg,
    /// Path to ViGEmClient.dll.
    #[arg(long, global = true)]
    library: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Cmd {
    /// Check that the bus driver is reachable.
    Probe,
    /// Plug a pad and wiggle it.
    Demo {
        #[arg(long, value_enum, default_value = "x360")]
        pad: PadKind,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PadKind {
    X360,
    Ds4,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum BackendArg {
    Vigem,
    Mock,
}

/// Stick position and held face button at `tick`.
fn sweep(tick: u64) -> (f64, f64, StandardButton) {
    let angle = TAU * (tick % REVOLUTION) as f64 / REVOLUTION as f64;
    let face = FACE[((tick / HOLD) % FACE.len() as u64) as usize];
    (angle.cos(), angle.sin(), face)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(true)
        .compact()
        .init();

    let cli = Cli::parse();
    let backend = match cli.backend {
        BackendArg::Vigem => BackendKind::Vigem,
        BackendArg::Mock => BackendKind::Mock,
    };
    let bus = Bus::open_kind(backend, cli.library.as_deref()).context("bus unavailable")?;

    match cli.cmd {
        Cmd::Probe => {
            info!(bus = %bus.id(), ?backend, "bus reachable");
            println!("ok");
        }
        Cmd::Demo { pad, seconds } => {
            let kind = match pad {
                PadKind::X360 => TargetType::Xbox360Wired,
                PadKind::Ds4 => TargetType::DualShock4Wired,
            };
            demo(bus, kind, Duration::from_secs(seconds)).await?;
        }
    }
    Ok(())
}

async fn demo(bus: Arc<Bus>, kind: TargetType, length: Duration) -> Result<()> {
    let mut pad = padlink_gamepad::create(bus, kind, &TargetOptions::default())?;
    let index = pad.target().index().ok();
    info!(target_id = %pad.target().id(), %kind, ?index, "pad plugged in");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let on_feedback: Arc<NotificationFn> = Arc::new(
        move |_: BusId, _: TargetHandle, large: u8, small: u8, led: u8, _: &UserData| {
            let _ = tx.send((large, small, led));
        },
    );
    pad.register_notification(on_feedback)?;

    let mut ticker = tokio::time::interval(TICK);
    let deadline = tokio::time::sleep(length);
    tokio::pin!(deadline);
    let mut tick = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (x, y, face) = sweep(tick);
                for b in FACE {
                    pad.set_button(b, b == face);
                }
                pad.left_joystick_float(x, y);
                pad.update()?;
                tick += 1;
            }
            Some((large, small, led)) = rx.recv() => {
                info!(large, small, led, "feedback");
            }
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted");
                break;
            }
        }
    }

    pad.reset();
    pad.update()?;
    pad.close()?;
    info!(ticks = tick, "demo finished");
    Ok(())
}
