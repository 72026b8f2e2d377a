//! DevCare Agent - posture, typing stress and break reminders.
//!
//! This library fuses two local signals, body landmarks from a pose model
//! and key press timing, into a single state snapshot for a dashboard.
//!
//! # Privacy Guarantees
//!
//! - **No images**: only landmark coordinates reach the engine
//! - **No key content**: a key press is reduced to a timestamp and a
//!   backspace flag
//! - **No storage**: everything lives in memory for the session
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DevCare Agent                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐                           │
//! │  │ Pose frames │──▶│   Posture   │──┐                        │
//! │  └─────────────┘   └─────────────┘  │   ┌─────────────┐      │
//! │  ┌─────────────┐   ┌─────────────┐  ├──▶│ StateStore  │──▶ HTTP
//! │  │  Key hook   │──▶│   Typing    │──┤   │ (snapshot)  │      │
//! │  └─────────────┘   └─────────────┘  │   └─────────────┘      │
//! │                    ┌─────────────┐  │                        │
//! │                    │   Breaks    │──┘                        │
//! │                    └─────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use devcare_agent::{agent::Agent, config::Config};
//!
//! let mut agent = Agent::new(Config::default()).expect("valid config");
//! agent.start().expect("Failed to start agent");
//!
//! // Feed frames from a pose model through agent.handle().submit_frame(..)
//! let snapshot = agent.store().snapshot();
//! println!("posture {}", snapshot.posture);
//! ```

pub mod activity;
pub mod agent;
pub mod collector;
pub mod config;
pub mod core;
pub mod error;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use activity::{ActivityLog, ActivityStats, SharedActivityLog};
pub use agent::{Agent, AgentHandle};
pub use collector::{Collector, CollectorConfig, KeyPressEvent};
pub use config::{Config, ConfigError};
pub use crate::core::{
    BreakScheduler, Insights, LandmarkFrame, PostureScoreEngine, StateSnapshot, StateStore,
    StressAggregator, StressLevel, TypingStressEngine,
};
pub use error::{CollectorError, ControlError, FrameError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy notice that can be displayed to users.
pub const PRIVACY_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                DEVCARE AGENT - PRIVACY NOTICE                    ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This agent watches posture and typing rhythm to suggest breaks. ║
║                                                                  ║
║  ✓ WHAT WE USE:                                                  ║
║    • Body landmark positions from your local pose model          ║
║    • When keys are pressed (timing only)                         ║
║    • Whether a key press was a backspace                         ║
║                                                                  ║
║  ✗ WHAT WE NEVER CAPTURE:                                        ║
║    • Camera images or video                                      ║
║    • Which keys you press (no passwords, messages, etc.)         ║
║    • What applications you use                                   ║
║    • Any screen content                                          ║
║                                                                  ║
║  All data stays in memory on this machine and is discarded       ║
║  when the agent stops.                                           ║
║                                                                  ║
║  You can view the agent's activity counters anytime at:          ║
║    GET /activity                                                 ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
