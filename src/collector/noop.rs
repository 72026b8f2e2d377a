//! Non-macOS (noop) key collector.
//!
//! No system hook is installed; the channel stays open so key presses can
//! still be pushed in through [`NoopCollector::sender`].

use crate::collector::types::{CollectorConfig, KeyPressEvent};
use crate::error::CollectorError;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A collector that never captures system events.
pub struct NoopCollector {
    _config: CollectorConfig,
    sender: Sender<KeyPressEvent>,
    receiver: Receiver<KeyPressEvent>,
    running: Arc<AtomicBool>,
}

impl NoopCollector {
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(config.channel_capacity.max(1));
        Self {
            _config: config,
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the collector as running.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn receiver(&self) -> &Receiver<KeyPressEvent> {
        &self.receiver
    }

    /// Sender for key presses produced outside the collector.
    pub fn sender(&self) -> Sender<KeyPressEvent> {
        self.sender.clone()
    }

    pub fn try_recv(&self) -> Option<KeyPressEvent> {
        self.receiver.try_recv().ok()
    }
}

/// There is no Input Monitoring permission gate off macOS.
pub fn check_permission() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_twice_fails() {
        let mut collector = NoopCollector::new(CollectorConfig::default());
        collector.start().unwrap();
        assert!(matches!(collector.start(), Err(CollectorError::AlreadyRunning)));
        collector.stop();
        assert!(!collector.is_running());
    }

    #[test]
    fn test_external_sender_feeds_receiver() {
        let collector = NoopCollector::new(CollectorConfig::default());
        collector.sender().send(KeyPressEvent::new(true)).unwrap();

        let event = collector.try_recv().unwrap();
        assert!(event.is_backspace);
        assert!(collector.try_recv().is_none());
    }
}
