//! Gamepad poll loop.
//!
//! Drives the whole pipeline: once per tick every connected device is
//! snapshot in the standard button/axis order, run through its
//! [`DeviceRuntime`], and any resulting token set is forwarded to the
//! grouper. Connect/disconnect events maintain the device registry, with the
//! mapping heuristic applied once at connect time.

use crate::device::mapping::{DeviceMapping, MappingHint};
use crate::device::runtime::{DeviceRegistry, DeviceRuntime, FramePolicy};
use crate::device::snapshot::{ButtonSnapshot, DeviceSnapshot};
use crate::notation::detector::PatternDetector;
use crate::notation::direction::DirectionResolver;
use crate::persistence::{NotationTables, Tunables};
use crate::pipeline::DeviceFrame;
use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs, MappingSource};
use statum::{machine, state};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Snapshot button order, matching the standard mapping's indices 0-15.
const STANDARD_BUTTON_ORDER: [Button; 16] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

/// Snapshot axis order for slots 0-5; extras are appended after these.
const STANDARD_AXIS_ORDER: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
];

/// Connection state published for the UI status line.
#[derive(Clone, Debug, Default)]
pub struct PollerStatus {
    pub connected: usize,
}

// Poller errors
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("Failed to initialize poller: {0}")]
    InitializationError(String),
}

// Poller lifecycle states
#[state]
#[derive(Debug, Clone)]
pub enum PollState {
    Initializing,
    Polling,
}

#[machine]
#[derive(Debug)]
pub struct InputPoller<S: PollState> {
    // Gilrs context
    gilrs: Gilrs,

    // Runtime state per connected device
    registry: DeviceRegistry<GamepadId>,

    // Shared notation tables, fixed for the process lifetime
    tables: NotationTables,

    // Derived per-tick machinery, rebuilt on settings changes
    resolver: DirectionResolver,
    policy: FramePolicy,

    // Live tunables from the settings UI
    settings_rx: watch::Receiver<Tunables>,

    // Channel to the grouper
    frame_sender: mpsc::Sender<DeviceFrame>,

    // Frame counter broadcast for age display
    tick_sender: watch::Sender<u64>,

    // Connection status broadcast
    status_sender: watch::Sender<PollerStatus>,

    tick: u64,
}

impl InputPoller<Initializing> {
    pub fn create(
        tables: NotationTables,
        settings_rx: watch::Receiver<Tunables>,
        frame_sender: mpsc::Sender<DeviceFrame>,
        tick_sender: watch::Sender<u64>,
        status_sender: watch::Sender<PollerStatus>,
    ) -> Result<Self, PollerError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(PollerError::InitializationError(e.to_string()));
            }
        };

        let tunables = settings_rx.borrow().clone();
        let resolver = tunables.direction_resolver(&tables);
        let policy = tunables.frame_policy();

        Ok(Self::new(
            gilrs,
            DeviceRegistry::new(),
            tables,
            resolver,
            policy,
            settings_rx,
            frame_sender,
            tick_sender,
            status_sender,
            0,
        ))
    }

    /// Registers already-connected gamepads and transitions to Polling.
    pub fn initialize(mut self) -> InputPoller<Polling> {
        let present: Vec<GamepadId> = self.gilrs.gamepads().map(|(id, _)| id).collect();
        if present.is_empty() {
            info!("No gamepad connected, waiting for one");
        } else {
            info!("Found {} gamepad(s) at startup", present.len());
        }
        for id in present {
            self.register_device(id);
        }
        self.publish_status();

        info!("Input poller initialized, transitioning to Polling state");
        self.transition()
    }
}

impl<S: PollState> InputPoller<S> {
    fn register_device(&mut self, id: GamepadId) {
        let gamepad = self.gilrs.gamepad(id);
        let hint = mapping_hint(&gamepad);
        let shape = snapshot_gamepad(&gamepad);
        let mapping = DeviceMapping::select(hint, shape.axes.len());
        info!(
            "Gamepad {} ({}) registered with '{}' mapping",
            id,
            gamepad.name(),
            mapping.name()
        );

        let tunables = self.settings_rx.borrow().clone();
        let detector = PatternDetector::new(
            self.tables.dashes.clone(),
            self.tables.gestures.clone(),
            tunables.detector_settings(),
        );
        self.registry
            .connect(id, DeviceRuntime::new(mapping, detector, &shape));
    }

    fn publish_status(&self) {
        let _ = self.status_sender.send(PollerStatus {
            connected: self.registry.len(),
        });
    }

    fn apply_settings(&mut self, tunables: &Tunables) {
        info!("Applying updated tunables to poller: {:?}", tunables);
        self.resolver = tunables.direction_resolver(&self.tables);
        self.policy = tunables.frame_policy();
        let detector_settings = tunables.detector_settings();
        for runtime in self.registry.runtimes_mut() {
            runtime
                .detector_mut()
                .update_settings(detector_settings.clone());
        }
    }
}

impl InputPoller<Polling> {
    /// Runs the poll loop until cancelled.
    pub async fn run_poll_loop(mut self, cancel: CancellationToken) -> Result<(), PollerError> {
        let mut tunables = self.settings_rx.borrow().clone();
        info!(
            "Starting poll loop at {} Hz (0 = uncapped)",
            tunables.target_poll_hz
        );
        let mut interval = tokio::time::interval(tunables.poll_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Poll loop cancelled, shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.poll_once();

                    if self.settings_rx.has_changed().unwrap_or(false) {
                        let updated = self.settings_rx.borrow_and_update().clone();
                        self.apply_settings(&updated);
                        if updated.poll_interval() != tunables.poll_interval() {
                            info!("Poll rate changed to {} Hz", updated.target_poll_hz);
                            interval = tokio::time::interval(updated.poll_interval());
                            interval.set_missed_tick_behavior(
                                tokio::time::MissedTickBehavior::Skip,
                            );
                        }
                        tunables = updated;
                    }
                }
            }
        }
    }

    /// One tick: drain connect/disconnect events, then snapshot and process
    /// every registered device within the same logical frame.
    fn poll_once(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    self.register_device(id);
                    self.publish_status();
                }
                EventType::Disconnected => {
                    self.registry.disconnect(id);
                    self.publish_status();
                }
                _ => {
                    // Button/axis deltas are read from the state snapshot,
                    // not from the event stream.
                }
            }
        }

        self.tick += 1;
        let _ = self.tick_sender.send(self.tick);

        if self.registry.is_empty() {
            return;
        }

        let now = Local::now();
        for id in self.registry.ids() {
            let snapshot = snapshot_gamepad(&self.gilrs.gamepad(id));
            let Some(runtime) = self.registry.get_mut(id) else {
                continue;
            };
            let tokens = runtime.process(snapshot, now, &self.resolver, &self.policy);
            if tokens.is_empty() {
                continue;
            }

            debug!("Gamepad {} produced tokens {:?} at tick {}", id, tokens, self.tick);
            let frame = DeviceFrame {
                device: id.to_string(),
                tokens,
                tick: self.tick,
            };
            if let Err(e) = self.frame_sender.try_send(frame) {
                warn!("Dropping frame, grouper queue full or closed: {}", e);
            }
        }
    }
}

fn mapping_hint(gamepad: &Gamepad<'_>) -> MappingHint {
    match gamepad.mapping_source() {
        MappingSource::SdlMappings => MappingHint::Standard,
        MappingSource::Driver | MappingSource::None => MappingHint::Unknown,
    }
}

/// Builds a snapshot in the standard order.
///
/// gilrs reports stick up as positive y; the notation tables use the
/// screen-down convention, so both stick y axes are negated here. Axes the
/// standard order does not cover (hat switches on older DirectInput pads)
/// are appended after slot 5 in stable code order.
fn snapshot_gamepad(gamepad: &Gamepad<'_>) -> DeviceSnapshot {
    let mut buttons = Vec::with_capacity(STANDARD_BUTTON_ORDER.len());
    for button in STANDARD_BUTTON_ORDER {
        let data = gamepad.button_data(button);
        buttons.push(ButtonSnapshot {
            pressed: data.map(|d| d.is_pressed()).unwrap_or(false),
            value: data.map(|d| d.value()).unwrap_or(0.0),
        });
    }

    let mut axes = Vec::with_capacity(STANDARD_AXIS_ORDER.len() + 2);
    for (slot, axis) in STANDARD_AXIS_ORDER.iter().enumerate() {
        let value = gamepad.axis_data(*axis).map(|d| d.value()).unwrap_or(0.0);
        let flip = matches!(slot, 1 | 3);
        axes.push(if flip { -value } else { value });
    }

    let known: Vec<u32> = STANDARD_AXIS_ORDER
        .iter()
        .filter_map(|axis| gamepad.axis_code(*axis))
        .map(|code| code.into_u32())
        .collect();
    let mut extras: Vec<(u32, f32)> = gamepad
        .state()
        .axes()
        .map(|(code, data)| (code.into_u32(), data.value()))
        .filter(|(code, _)| !known.contains(code))
        .collect();
    extras.sort_by_key(|(code, _)| *code);
    axes.extend(extras.into_iter().map(|(_, value)| value));

    DeviceSnapshot { buttons, axes }
}

// Public interface for spawning and running the poller
pub struct PollerHandle {
    tick_receiver: watch::Receiver<u64>,
    status_receiver: watch::Receiver<PollerStatus>,
}

impl PollerHandle {
    pub fn spawn(
        tables: NotationTables,
        settings_rx: watch::Receiver<Tunables>,
        frame_sender: mpsc::Sender<DeviceFrame>,
        cancel: CancellationToken,
    ) -> Result<Self, PollerError> {
        let (tick_sender, tick_receiver) = watch::channel(0);
        let (status_sender, status_receiver) = watch::channel(PollerStatus::default());

        let poller = InputPoller::create(
            tables,
            settings_rx,
            frame_sender,
            tick_sender,
            status_sender,
        )?;
        info!("Successfully created InputPoller instance");

        tokio::spawn(async move {
            let polling = poller.initialize();
            if let Err(e) = polling.run_poll_loop(cancel).await {
                error!("Poller task terminated with error: {}", e);
            }
        });

        Ok(Self {
            tick_receiver,
            status_receiver,
        })
    }

    pub fn subscribe_tick(&self) -> watch::Receiver<u64> {
        self.tick_receiver.clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PollerStatus> {
        self.status_receiver.clone()
    }
}
