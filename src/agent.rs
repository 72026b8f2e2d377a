//! Agent runtime: producer loops, the publisher and shutdown.
//!
//! ```text
//! pose model ──▶ frame channel ──▶ pose loop ──▶ PostureScoreEngine ─┐
//! key hook   ──▶ key channel   ──▶ key loop  ──▶ TypingStressEngine ─┤
//!                                                                    ▼
//!                                      publisher (every interval) ─▶ StateStore
//! ```

use crate::activity::{create_shared_log, SharedActivityLog};
use crate::collector::{Collector, KeyPressEvent};
use crate::config::Config;
use crate::core::breaks::{BreakRecord, BreakScheduler};
use crate::core::landmarks::LandmarkFrame;
use crate::core::posture::{PostureOutcome, PostureScoreEngine};
use crate::core::state::StateStore;
use crate::core::typing::TypingStressEngine;
use crate::error::ControlError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Capacity of the pose frame queue.
pub const FRAME_CHANNEL_CAPACITY: usize = 256;

/// How often idle loops re-check the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cloneable handle for feeding and controlling a running agent.
#[derive(Clone)]
pub struct AgentHandle {
    store: Arc<StateStore>,
    activity: SharedActivityLog,
    frames: Sender<LandmarkFrame>,
    keys: Sender<KeyPressEvent>,
    instance_id: Uuid,
}

impl AgentHandle {
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn activity(&self) -> &SharedActivityLog {
        &self.activity
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Queue a pose frame for scoring. Returns false if the queue was full
    /// and the frame was dropped.
    pub fn submit_frame(&self, frame: LandmarkFrame) -> bool {
        match self.frames.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.activity.record_frame_dropped();
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Queue a key press. Returns false if it could not be queued.
    pub fn submit_key(&self, event: KeyPressEvent) -> bool {
        self.keys.try_send(event).is_ok()
    }

    pub fn record_break(&self) -> BreakRecord {
        self.activity.record_break();
        self.store.record_break()
    }

    pub fn reset_statistics(&self) {
        self.store.reset_statistics();
    }

    pub fn set_break_interval(&self, minutes: i64) -> Result<(), ControlError> {
        self.store.set_break_interval(minutes)
    }

    pub fn reset_calibration(&self) {
        self.store.reset_calibration();
    }

    pub fn reset_typing(&self) {
        self.store.reset_typing();
    }
}

/// Owns the engines and the threads that drive them.
pub struct Agent {
    config: Config,
    handle: AgentHandle,
    frame_rx: Receiver<LandmarkFrame>,
    collector: Collector,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Agent {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let posture = PostureScoreEngine::new(config.posture_config());
        let typing = TypingStressEngine::new(config.typing_window_secs);
        let breaks = BreakScheduler::new().with_interval(config.break_interval_minutes)?;
        let store = Arc::new(StateStore::new(posture, typing, breaks));

        let (frames, frame_rx) = bounded(FRAME_CHANNEL_CAPACITY);
        let collector = Collector::new(config.collector_config());

        let handle = AgentHandle {
            store,
            activity: create_shared_log(),
            frames,
            keys: collector.sender(),
            instance_id: Uuid::new_v4(),
        };

        Ok(Self {
            config,
            handle,
            frame_rx,
            collector,
            running: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        })
    }

    pub fn handle(&self) -> AgentHandle {
        self.handle.clone()
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.handle.store
    }

    pub fn activity(&self) -> &SharedActivityLog {
        &self.handle.activity
    }

    /// Sender for key presses produced outside the system hook.
    pub fn key_sender(&self) -> Sender<KeyPressEvent> {
        self.handle.keys.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the key hook and spawn the pose, key and publisher threads.
    ///
    /// A key hook failure is logged and the agent keeps running on
    /// externally submitted key presses.
    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            anyhow::bail!("Agent is already running");
        }

        if let Err(e) = self.collector.start() {
            tracing::warn!("Key capture unavailable: {}", e);
        }

        self.threads.push(self.spawn_pose_loop()?);
        self.threads.push(self.spawn_key_loop()?);
        self.threads.push(self.spawn_publisher()?);

        tracing::info!(
            instance_id = %self.handle.instance_id,
            publish_interval_ms = self.config.publish_interval.as_millis() as u64,
            "Agent started"
        );
        Ok(())
    }

    /// Stop all loops and wait for them to exit.
    pub fn shutdown(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.collector.stop();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Agent thread panicked during shutdown");
            }
        }
        tracing::info!("Agent stopped");
    }

    fn spawn_pose_loop(&self) -> std::io::Result<JoinHandle<()>> {
        let frames = self.frame_rx.clone();
        let posture = self.handle.store.posture_engine();
        let activity = Arc::clone(&self.handle.activity);
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("devcare-pose".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    let frame = match frames.recv_timeout(POLL_INTERVAL) {
                        Ok(frame) => frame,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    };
                    let outcome = posture
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .score(&frame);
                    match outcome {
                        PostureOutcome::Calibrating { .. } | PostureOutcome::Scored { .. } => {
                            activity.record_frame_scored()
                        }
                        PostureOutcome::Rejected => activity.record_frame_rejected(),
                        PostureOutcome::Fallback => activity.record_frame_failed(),
                    }
                }
            })
    }

    fn spawn_key_loop(&self) -> std::io::Result<JoinHandle<()>> {
        let keys = self.collector.receiver().clone();
        let typing = self.handle.store.typing_engine();
        let activity = Arc::clone(&self.handle.activity);
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("devcare-keys".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    let event = match keys.recv_timeout(POLL_INTERVAL) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    };
                    typing
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .on_key_at(event.is_backspace, event.timestamp);
                    activity.record_key_press();
                }
            })
    }

    fn spawn_publisher(&self) -> std::io::Result<JoinHandle<()>> {
        let store = Arc::clone(&self.handle.store);
        let activity = Arc::clone(&self.handle.activity);
        let running = Arc::clone(&self.running);
        let interval = self.config.publish_interval;

        thread::Builder::new()
            .name("devcare-publisher".to_string())
            .spawn(move || {
                tracing::debug!("Publisher started");
                while running.load(Ordering::SeqCst) {
                    let deadline = Instant::now() + interval;
                    let snapshot = store.publish();
                    activity.record_snapshot_published();
                    tracing::trace!(posture = snapshot.posture, stress = %snapshot.stress, "Snapshot published");

                    while running.load(Ordering::SeqCst) {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            break;
                        }
                        thread::sleep(remaining.min(POLL_INTERVAL));
                    }
                }
                tracing::debug!("Publisher stopped");
            })
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.shutdown();
    }
}
