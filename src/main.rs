//! DevCare agent CLI
//!
//! Posture, typing stress and break reminders for people at a keyboard.

use anyhow::Context;
use clap::{Parser, Subcommand};
use devcare_agent::{
    agent::Agent, collector::check_permission, config::Config, PRIVACY_NOTICE, VERSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "devcare")]
#[command(version = VERSION)]
#[command(about = "Posture, typing stress and break reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the agent and its local HTTP server
    Start {
        /// Port for the HTTP server (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Minutes between break suggestions (overrides config)
        #[arg(long)]
        break_interval: Option<i64>,

        /// Do not install the system key hook
        #[arg(long)]
        no_keyboard: bool,
    },

    /// Show configuration and permission status
    Status,

    /// Show configuration as JSON
    Config,

    /// Persist a new default break interval
    SetInterval {
        /// Minutes between break suggestions
        minutes: i64,
    },

    /// Display the privacy notice
    Privacy,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start {
            port,
            break_interval,
            no_keyboard,
        } => cmd_start(port, break_interval, no_keyboard),
        Commands::Status => {
            cmd_status();
            Ok(())
        }
        Commands::Config => {
            cmd_config();
            Ok(())
        }
        Commands::SetInterval { minutes } => cmd_set_interval(minutes),
        Commands::Privacy => {
            cmd_privacy();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("devcare_agent=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_start(
    port: Option<u16>,
    break_interval: Option<i64>,
    no_keyboard: bool,
) -> anyhow::Result<()> {
    println!("DevCare Agent v{VERSION}");
    println!();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    if let Some(port) = port {
        config.server_port = port;
    }
    if let Some(minutes) = break_interval {
        config.break_interval_minutes = minutes;
    }
    if no_keyboard {
        config.capture_keyboard = false;
    }

    if config.capture_keyboard && !check_permission() {
        eprintln!("Warning: Input Monitoring permission not granted.");
        eprintln!("Typing analysis will only use key presses pushed to /ingest/key.");
        eprintln!();
        eprintln!("To grant permission:");
        eprintln!("1. Open System Settings > Privacy & Security");
        eprintln!("2. Select 'Input Monitoring'");
        eprintln!("3. Add this application to the allowed list");
        eprintln!("4. Restart the application");
        eprintln!();
        config.capture_keyboard = false;
    }

    let mut agent = Agent::new(config.clone()).context("Invalid configuration")?;
    agent.start()?;

    println!("Agent running:");
    println!(
        "  Keyboard capture: {}",
        if config.capture_keyboard {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("  Break interval: {} min", config.break_interval_minutes);
    println!(
        "  Calibration: first {} pose frames",
        config.calibration_frames
    );

    #[cfg(feature = "server")]
    let server = {
        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        let (addr, shutdown_tx) = runtime.block_on(devcare_agent::server::run(
            devcare_agent::server::ServerConfig::new(config.server_port),
            agent.handle(),
        ))?;
        println!("  Dashboard API: http://{addr}/status");
        (runtime, shutdown_tx)
    };

    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    println!();
    println!("Stopping...");

    #[cfg(feature = "server")]
    {
        let (runtime, shutdown_tx) = server;
        let _ = shutdown_tx.send(());
        runtime.shutdown_timeout(Duration::from_secs(2));
    }

    agent.shutdown();

    println!();
    println!("{}", agent.activity().summary());
    Ok(())
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("DevCare Agent Status");
    println!("====================");
    println!();

    let has_permission = check_permission();
    println!(
        "Input Monitoring Permission: {}",
        if has_permission {
            "Granted ✓"
        } else {
            "Not Granted ✗"
        }
    );
    println!();

    println!("Configuration:");
    println!(
        "  Keyboard capture: {}",
        if config.capture_keyboard {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("  Break interval: {} min", config.break_interval_minutes);
    println!("  Publish interval: {}s", config.publish_interval.as_secs());
    println!("  Calibration frames: {}", config.calibration_frames);
    println!("  Smoothing window: {}", config.smoothing_window);
    println!("  Server port: {}", config.server_port);
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_set_interval(minutes: i64) -> anyhow::Result<()> {
    let mut config = Config::load().unwrap_or_default();
    config.break_interval_minutes = minutes;
    config.save()?;

    println!("Break interval set to {minutes} minutes.");
    Ok(())
}

fn cmd_privacy() {
    println!("{PRIVACY_NOTICE}");
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
