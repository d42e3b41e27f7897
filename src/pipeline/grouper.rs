//! Grouping task.
//!
//! Owns the shared [`OutputBuffer`] and the conjunction-window timer. The
//! timer is an explicit deadline inside the task's select loop: every
//! arriving frame cancels and re-arms it, and only this task ever touches
//! the buffer, so a deferred flush can never race a buffer mutation.

use crate::notation::buffer::{DisplayEvent, GroupingSettings, OutputBuffer};
use crate::notation::TokenClasses;
use crate::persistence::Tunables;
use crate::pipeline::DeviceFrame;
use chrono::Local;
use statum::{machine, state};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// Grouper errors
#[derive(Debug, thiserror::Error)]
pub enum GrouperError {
    #[error("Failed to emit display event: {0}")]
    EventSendError(String),
}

// Grouper lifecycle states
#[state]
#[derive(Debug, Clone)]
pub enum GrouperState {
    Configuring,
    Grouping,
}

#[machine]
#[derive(Debug)]
pub struct NotationGrouper<S: GrouperState> {
    // The grouping policy and its pending state
    buffer: OutputBuffer,

    // Frames from the poller
    frame_receiver: mpsc::Receiver<DeviceFrame>,

    // Display events to the renderer
    event_sender: mpsc::Sender<DisplayEvent>,

    // Live tunables from the settings UI
    settings_rx: watch::Receiver<Tunables>,

    // Armed deferred-flush deadline, None while pending is empty
    deadline: Option<Instant>,

    // Tick of the most recent frame, stamped onto timer flushes
    last_tick: u64,
}

impl NotationGrouper<Configuring> {
    pub fn create(
        classes: TokenClasses,
        frame_receiver: mpsc::Receiver<DeviceFrame>,
        event_sender: mpsc::Sender<DisplayEvent>,
        settings_rx: watch::Receiver<Tunables>,
    ) -> Self {
        let settings = settings_rx.borrow().grouping_settings();
        info!("Creating notation grouper with settings: {:?}", settings);
        let buffer = OutputBuffer::new(classes, settings);

        Self::new(buffer, frame_receiver, event_sender, settings_rx, None, 0)
    }

    pub fn activate(self) -> NotationGrouper<Grouping> {
        info!("Notation grouper entering grouping state");
        self.transition()
    }
}

impl NotationGrouper<Grouping> {
    /// Runs until cancelled or the frame channel closes.
    pub async fn run_until_shutdown(
        mut self,
        cancel: CancellationToken,
    ) -> Result<(), GrouperError> {
        let mut settings_alive = true;
        loop {
            // select! evaluates the sleep future even when the branch is
            // disabled, so an unarmed deadline gets a far-future stand-in.
            let flush_at = self
                .deadline
                .unwrap_or_else(|| Instant::now() + std::time::Duration::from_secs(3600));

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Grouper cancelled, shutting down");
                    return Ok(());
                }

                maybe_frame = self.frame_receiver.recv() => {
                    match maybe_frame {
                        Some(frame) => self.on_frame(frame)?,
                        None => {
                            info!("Frame channel closed, grouper finishing");
                            return Ok(());
                        }
                    }
                }

                _ = tokio::time::sleep_until(flush_at), if self.deadline.is_some() => {
                    self.on_deadline()?;
                }

                changed = self.settings_rx.changed(), if settings_alive => {
                    match changed {
                        Ok(_) => {
                            let settings =
                                self.settings_rx.borrow_and_update().grouping_settings();
                            info!("Applying updated grouping settings: {:?}", settings);
                            self.buffer.update_settings(settings);
                        }
                        Err(_) => {
                            debug!("Settings channel closed, keeping current settings");
                            settings_alive = false;
                        }
                    }
                }
            }
        }
    }

    fn on_frame(&mut self, frame: DeviceFrame) -> Result<(), GrouperError> {
        debug!(
            "Ingesting frame from device {} at tick {}: {:?}",
            frame.device, frame.tick, frame.tokens
        );
        self.last_tick = frame.tick;

        let outcome = self.buffer.ingest(&frame.tokens, Local::now(), frame.tick);
        for event in outcome.events {
            self.emit(event)?;
        }

        if outcome.rearm {
            let window = self.settings_rx.borrow().conjunction_window_std();
            self.deadline = Some(Instant::now() + window);
        }
        Ok(())
    }

    fn on_deadline(&mut self) -> Result<(), GrouperError> {
        self.deadline = None;
        if let Some(line) = self.buffer.flush(Local::now(), self.last_tick) {
            self.emit(DisplayEvent::Line(line))?;
        }
        Ok(())
    }

    fn emit(&self, event: DisplayEvent) -> Result<(), GrouperError> {
        match self.event_sender.try_send(event) {
            Ok(_) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("Display channel full, dropping event {:?}", event);
                Ok(())
            }
            Err(e) => {
                error!("Failed to emit display event: {}", e);
                Err(GrouperError::EventSendError(e.to_string()))
            }
        }
    }
}

// Public interface for spawning and running the grouper
pub struct GrouperHandle {
    event_receiver: Option<mpsc::Receiver<DisplayEvent>>,
}

impl GrouperHandle {
    pub fn spawn(
        classes: TokenClasses,
        frame_receiver: mpsc::Receiver<DeviceFrame>,
        settings_rx: watch::Receiver<Tunables>,
        cancel: CancellationToken,
    ) -> Self {
        let (event_sender, event_receiver) = mpsc::channel(64);

        let grouper =
            NotationGrouper::create(classes, frame_receiver, event_sender, settings_rx).activate();

        tokio::spawn(async move {
            if let Err(e) = grouper.run_until_shutdown(cancel).await {
                error!("Grouper task terminated with error: {}", e);
            }
        });

        Self {
            event_receiver: Some(event_receiver),
        }
    }

    /// Takes the display event receiver; call once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DisplayEvent>> {
        self.event_receiver.take()
    }
}
