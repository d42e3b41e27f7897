//! Unified handle for the poller/grouper task pair.

use crate::notation::buffer::DisplayEvent;
use crate::notation::TokenClasses;
use crate::persistence::{NotationTables, Tunables};
use crate::pipeline::grouper::{GrouperError, GrouperHandle};
use crate::pipeline::poller::{PollerError, PollerHandle, PollerStatus};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Poller error: {0}")]
    PollerError(#[from] PollerError),

    #[error("Grouper error: {0}")]
    GrouperError(#[from] GrouperError),

    #[error("Initialization error: {0}")]
    InitializationError(String),
}

/// Public handle for the complete input-to-notation pipeline.
pub struct PipelineHandle {
    tick_receiver: watch::Receiver<u64>,
    status_receiver: watch::Receiver<PollerStatus>,
}

impl PipelineHandle {
    /// Spawns both pipeline tasks and returns the display event stream.
    pub fn spawn(
        tables: NotationTables,
        settings_rx: watch::Receiver<Tunables>,
        cancel: CancellationToken,
    ) -> Result<(Self, mpsc::Receiver<DisplayEvent>), PipelineError> {
        info!("Initializing notation pipeline");

        let classes = TokenClasses::from_tables(
            &tables.directions,
            &tables.dashes,
            &tables.gestures,
        );

        let (frame_sender, frame_receiver) = mpsc::channel(256);
        debug!("Created frame channel with buffer capacity 256");

        let mut grouper = GrouperHandle::spawn(
            classes,
            frame_receiver,
            settings_rx.clone(),
            cancel.clone(),
        );
        let events = grouper.take_events().ok_or_else(|| {
            PipelineError::InitializationError("Display event stream already taken".to_string())
        })?;
        info!("Notation grouper spawned successfully");

        let poller = PollerHandle::spawn(tables, settings_rx, frame_sender, cancel)?;
        info!("Input poller spawned successfully");

        Ok((
            Self {
                tick_receiver: poller.subscribe_tick(),
                status_receiver: poller.subscribe_status(),
            },
            events,
        ))
    }

    pub fn subscribe_tick(&self) -> watch::Receiver<u64> {
        self.tick_receiver.clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PollerStatus> {
        self.status_receiver.clone()
    }
}
