//! Doorward host simulator.
//!
//! Runs the access controller against simulated peripherals. The flash
//! sector lives in an image file, and the admin link is either the console
//! or a real serial port.

mod host;
mod sim;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doorward_core::TimingConfig;
use doorward_core::constants::STORAGE_SECTOR_SIZE;
use doorward_hardware::mock::{
    MockIndicator, MockIndicatorHandle, MockKeypadMatrix, MockKeypadMatrixHandle, MockLock,
    MockLockHandle, MockMfrc522, MockMfrc522Handle, MockMotion, MockMotionHandle, MockTone,
    MockWatchdog,
};
use doorward_hardware::{BuzzerAlarm, Clock, SerialTransport};
use doorward_keypad::KeypadScanner;
use doorward_security::{Appliance, Board, InterruptContext, Peripherals};
use doorward_storage::{RECORD_SIZE, SecurityConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc as async_mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::host::{ConsoleTransport, FileFlash, HostClock, SerialPortTransport};
use crate::sim::{KeyTyper, SimCommand};

#[derive(Parser)]
#[command(name = "doorward")]
#[command(about = "Host simulation of the doorward access controller", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller
    Run(RunArgs),

    /// Print the configuration held in a flash image
    Inspect {
        /// Flash image path
        #[arg(short, long, default_value = "doorward-flash.bin")]
        image: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Flash image path, created on first run
    #[arg(short, long, default_value = "doorward-flash.bin")]
    image: PathBuf,

    /// Serial device for the admin link instead of the console
    #[arg(short, long)]
    serial: Option<String>,

    /// Baud rate for --serial
    #[arg(short, long, default_value_t = 9_600)]
    baud: u32,
}

struct HostBoard;

impl Board for HostBoard {
    type Clock = HostClock;
    type Lock = MockLock;
    type Alarm = BuzzerAlarm<MockTone>;
    type Indicator = MockIndicator;
    type Motion = MockMotion;
    type CardBus = MockMfrc522;
    type Flash = FileFlash;
    type AdminPort = Box<dyn SerialTransport>;
    type Watchdog = MockWatchdog;
}

/// Handles on the simulated peripherals.
struct Simulation {
    motion: MockMotionHandle,
    reader: MockMfrc522Handle,
    keys: MockKeypadMatrixHandle,
    lock: MockLockHandle,
    indicator: MockIndicatorHandle,
    tone: Arc<MockTone>,
    typer: KeyTyper,
}

impl Simulation {
    fn apply(&mut self, command: SimCommand, appliance: &Appliance<HostBoard>) {
        match command {
            SimCommand::Motion => {
                info!("Simulated motion");
                self.motion.trigger();
            }
            SimCommand::Card(uid) => {
                info!(uid = %uid, "Simulated card placed");
                self.reader.present_uid(uid.value());
            }
            SimCommand::NoCard => {
                info!("Simulated card removed");
                self.reader.remove_card();
            }
            SimCommand::Keys(keys) => self.typer.enqueue(keys),
            SimCommand::Status => {
                let now = appliance.clock().now_millis();
                let snapshot = appliance.manager().snapshot(now);
                match serde_json::to_string(&snapshot) {
                    Ok(json) => println!("{json}"),
                    Err(err) => warn!(error = %err, "Snapshot serialization failed"),
                }
                println!(
                    "lock={} indicator={} buzzer={} card_stats={:?}",
                    if self.lock.is_open() { "open" } else { "closed" },
                    if self.indicator.is_lit() { "on" } else { "off" },
                    if self.tone.is_sounding() {
                        format!("{}Hz@{}%", self.tone.frequency(), self.tone.duty())
                    } else {
                        "silent".to_string()
                    },
                    appliance.card().stats(),
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Inspect { image } => inspect(&image),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    info!("Starting doorward simulator v{}", doorward_core::VERSION);

    let flash = FileFlash::open(&args.image)
        .with_context(|| format!("opening flash image {}", args.image.display()))?;

    let (console_tx, console_rx) = mpsc::channel::<u8>();
    let admin_on_console = args.serial.is_none();
    let admin_port: Box<dyn SerialTransport> = match &args.serial {
        Some(path) => {
            let port = SerialPortTransport::open(path, args.baud)
                .with_context(|| format!("opening serial port {path}"))?;
            info!(port = %path, baud = args.baud, "Admin link on serial port");
            Box::new(port)
        }
        None => Box::new(ConsoleTransport::new(console_rx)),
    };

    let tone = Arc::new(MockTone::new());
    let (alarm, mute) = BuzzerAlarm::new(Arc::clone(&tone));
    let (lock, lock_handle) = MockLock::new();
    let (indicator, indicator_handle) = MockIndicator::new();
    let (motion, motion_handle) = MockMotion::new();
    let (card_bus, reader) = MockMfrc522::new();
    let (matrix, keys) = MockKeypadMatrix::new();
    let (watchdog, _watchdog_handle) = MockWatchdog::new();
    let scanner = Arc::new(KeypadScanner::new());

    let mut appliance = Appliance::start(
        Peripherals::<HostBoard> {
            clock: HostClock::new(),
            lock,
            alarm,
            indicator,
            motion,
            card_bus,
            flash,
            admin_port,
            watchdog,
            scanner: Arc::clone(&scanner),
        },
        TimingConfig::default(),
    );
    let mut interrupt = InterruptContext::new(scanner, matrix, mute);
    let mut sim = Simulation {
        motion: motion_handle,
        reader,
        keys,
        lock: lock_handle,
        indicator: indicator_handle,
        tone,
        typer: KeyTyper::new(),
    };

    let (line_tx, mut line_rx) = async_mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_millis(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Type !motion, !card <hex>, !nocard, !keys <keys> or !status");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                interrupt.tick();
                sim.typer.tick(&sim.keys);
                appliance.run_once();
            }
            line = line_rx.recv() => {
                let Some(line) = line else {
                    info!("Console closed");
                    break;
                };
                match SimCommand::parse(&line) {
                    Some(Ok(command)) => sim.apply(command, &appliance),
                    Some(Err(err)) => warn!("{err:#}"),
                    None if admin_on_console => {
                        for byte in line.bytes().chain(std::iter::once(b'\r')) {
                            // The receiver lives as long as the appliance.
                            let _ = console_tx.send(byte);
                        }
                    }
                    None => warn!("Admin link is on the serial port; console line ignored"),
                }
            }
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    info!(
        synced = appliance.store().is_in_sync(),
        image = %appliance.store().flash().path().display(),
        "Simulator stopped"
    );
    Ok(())
}

fn inspect(image: &Path) -> Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("reading flash image {}", image.display()))?;
    let record: &[u8; RECORD_SIZE] = bytes
        .get(..RECORD_SIZE)
        .and_then(|head| head.try_into().ok())
        .with_context(|| {
            format!(
                "image is {} bytes, expected a {STORAGE_SECTOR_SIZE}-byte sector",
                bytes.len()
            )
        })?;

    let decoded = SecurityConfig::decode(record).context("decoding configuration record")?;
    let ids: Vec<String> = decoded
        .config
        .identifiers()
        .map(|uid| uid.to_string())
        .collect();

    println!("image: {}", image.display());
    if decoded.repaired.is_empty() {
        println!("record: valid ({RECORD_SIZE} bytes)");
    } else {
        let fields: Vec<String> = decoded.repaired.iter().map(ToString::to_string).collect();
        println!(
            "record: marker valid, will reset on boot: {}",
            fields.join(", ")
        );
    }
    println!("authorized cards: {}", ids.len());
    for id in ids {
        println!("  {id}");
    }
    Ok(())
}
