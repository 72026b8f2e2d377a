//! macOS key collection using a CGEvent tap.
//!
//! Requires Input Monitoring permission. Only key-down events are observed
//! and each is reduced to a backspace flag inside the callback.

use crate::collector::types::{CollectorConfig, KeyPressEvent};
use crate::error::CollectorError;
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    CallbackResult, EventField,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// The macOS key collector.
pub struct MacOSCollector {
    config: CollectorConfig,
    sender: Sender<KeyPressEvent>,
    receiver: Receiver<KeyPressEvent>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl MacOSCollector {
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(config.channel_capacity.max(1));

        Self {
            config,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start the event tap on a background thread.
    ///
    /// With `capture_keyboard` off the collector only marks itself running;
    /// the channel still accepts externally produced events.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);

        if !self.config.capture_keyboard {
            return Ok(());
        }

        let sender = self.sender.clone();
        let running = self.running.clone();

        let handle = thread::spawn(move || {
            if let Err(e) = run_event_loop(sender, running.clone()) {
                tracing::warn!("Key event loop stopped: {}", e);
            }
            running.store(false, Ordering::SeqCst);
        });

        self.thread_handle = Some(handle);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn receiver(&self) -> &Receiver<KeyPressEvent> {
        &self.receiver
    }

    /// Sender for key presses produced outside the tap.
    pub fn sender(&self) -> Sender<KeyPressEvent> {
        self.sender.clone()
    }

    pub fn try_recv(&self) -> Option<KeyPressEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for MacOSCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_event_loop(
    sender: Sender<KeyPressEvent>,
    running: Arc<AtomicBool>,
) -> Result<(), CollectorError> {
    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        move |_proxy, event_type, event: &CGEvent| {
            if let Some(key) = process_cg_event(event_type, event) {
                // Never block the tap; drop the event if the channel is full.
                let _ = sender.try_send(key);
            }
            CallbackResult::Keep
        },
    )
    .map_err(|_| CollectorError::TapCreationFailed)?;

    let source = tap
        .mach_port()
        .create_runloop_source(0)
        .map_err(|_| CollectorError::RunLoopSourceFailed)?;

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
    }
    tap.enable();

    while running.load(Ordering::SeqCst) {
        CFRunLoop::run_in_mode(
            unsafe { kCFRunLoopCommonModes },
            std::time::Duration::from_millis(100),
            false,
        );
    }

    Ok(())
}

/// Reduce a key-down to a [`KeyPressEvent`]. The key code is read only to
/// compare against backspace and is not retained.
fn process_cg_event(event_type: CGEventType, event: &CGEvent) -> Option<KeyPressEvent> {
    match event_type {
        CGEventType::KeyDown => {
            let keycode = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
            Some(KeyPressEvent::from_keycode(keycode))
        }
        _ => None,
    }
}

/// Check whether a passive key tap can be created, which macOS only
/// allows once Input Monitoring permission is granted.
pub fn check_permission() -> bool {
    CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        |_proxy, _type, _event| CallbackResult::Keep,
    )
    .is_ok()
}
