//! Key press collection for the DevCare agent.
//!
//! Platform-specific implementations reduce every key press to a timestamp
//! and a backspace flag before it leaves the hook.

pub mod types;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(not(target_os = "macos"))]
pub mod noop;

pub use crate::error::CollectorError;
pub use types::{CollectorConfig, KeyPressEvent, BACKSPACE_KEYCODE};

#[cfg(target_os = "macos")]
pub use macos::{check_permission, MacOSCollector};

/// Platform-agnostic collector type alias
#[cfg(target_os = "macos")]
pub type Collector = MacOSCollector;

#[cfg(not(target_os = "macos"))]
pub use noop::{check_permission, NoopCollector};

/// Platform-agnostic collector type alias
#[cfg(not(target_os = "macos"))]
pub type Collector = NoopCollector;
