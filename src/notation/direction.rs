//! Direction normalization for D-pad and analog stick input.
//!
//! Both sources reduce to an integer vector (dx, dy) with components in
//! {-1, 0, 1} and screen-down positive y, which is then looked up in the
//! 9-entry direction table. A non-neutral D-pad always wins over the stick;
//! there is no blending between the two.

use crate::device::mapping::{DeviceMapping, DpadLayout};
use crate::device::snapshot::DeviceSnapshot;
use crate::notation::NEUTRAL_NUM;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One normalized direction: numpad-style compass code plus display symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct CompassPoint {
    pub num: u8,
    pub symbol: String,
}

impl CompassPoint {
    pub fn is_neutral(&self) -> bool {
        self.num == NEUTRAL_NUM
    }
}

/// One row of the direction table.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct DirectionEntry {
    pub dx: i8,
    pub dy: i8,
    pub num: u8,
    pub symbol: String,
}

/// The 9-entry table mapping integer direction vectors to compass points.
///
/// Covers every (dx, dy) with components in {-1, 0, 1}; a lookup that misses
/// anyway degrades to neutral rather than propagating an undefined direction.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(transparent)]
pub struct DirectionTable {
    entries: Vec<DirectionEntry>,
}

impl DirectionTable {
    pub fn entries(&self) -> &[DirectionEntry] {
        &self.entries
    }

    pub fn resolve(&self, dx: i8, dy: i8) -> CompassPoint {
        match self
            .entries
            .iter()
            .find(|e| e.dx == dx && e.dy == dy)
            .map(|e| CompassPoint {
                num: e.num,
                symbol: e.symbol.clone(),
            }) {
            Some(point) => point,
            None => {
                warn!("No direction table entry for ({}, {}), treating as neutral", dx, dy);
                self.neutral()
            }
        }
    }

    pub fn neutral(&self) -> CompassPoint {
        self.entries
            .iter()
            .find(|e| e.num == NEUTRAL_NUM)
            .map(|e| CompassPoint {
                num: e.num,
                symbol: e.symbol.clone(),
            })
            .unwrap_or(CompassPoint {
                num: NEUTRAL_NUM,
                symbol: String::new(),
            })
    }
}

impl Default for DirectionTable {
    fn default() -> Self {
        let entry = |dx: i8, dy: i8, num: u8, symbol: &str| DirectionEntry {
            dx,
            dy,
            num,
            symbol: symbol.to_string(),
        };
        Self {
            entries: vec![
                entry(0, -1, 8, "↑"),
                entry(1, -1, 9, "↗"),
                entry(1, 0, 6, "→"),
                entry(1, 1, 3, "↘"),
                entry(0, 1, 2, "↓"),
                entry(-1, 1, 1, "↙"),
                entry(-1, 0, 4, "←"),
                entry(-1, -1, 7, "↖"),
                entry(0, 0, 5, "⭐"),
            ],
        }
    }
}

/// Resolves one device snapshot to a single compass point.
#[derive(Clone, Debug)]
pub struct DirectionResolver {
    table: DirectionTable,
    axis_deadzone: f32,
    hat_tolerance: f32,
}

impl DirectionResolver {
    pub fn new(table: DirectionTable, axis_deadzone: f32, hat_tolerance: f32) -> Self {
        Self {
            table,
            axis_deadzone,
            hat_tolerance,
        }
    }

    /// D-pad first; the stick is only consulted while the D-pad is neutral.
    pub fn resolve(&self, mapping: &DeviceMapping, snapshot: &DeviceSnapshot) -> CompassPoint {
        let (dx, dy) = self.dpad_vector(mapping, snapshot);
        if dx != 0 || dy != 0 {
            return self.table.resolve(dx, dy);
        }
        let (dx, dy) = self.stick_vector(snapshot);
        self.table.resolve(dx, dy)
    }

    fn dpad_vector(&self, mapping: &DeviceMapping, snapshot: &DeviceSnapshot) -> (i8, i8) {
        match mapping.dpad() {
            DpadLayout::Buttons {
                up,
                down,
                left,
                right,
            } => {
                let pressed = |idx: usize| snapshot.button_pressed(idx) as i8;
                (pressed(*right) - pressed(*left), pressed(*down) - pressed(*up))
            }
            DpadLayout::HatAxis { axis, positions } => {
                let Some(value) = snapshot.axis(*axis) else {
                    return (0, 0);
                };
                // Hat switches report discrete levels; match within a band
                // instead of comparing floats exactly.
                positions
                    .iter()
                    .find(|p| (value - p.level).abs() <= self.hat_tolerance)
                    .map(|p| (p.dx, p.dy))
                    .unwrap_or((0, 0))
            }
        }
    }

    fn stick_vector(&self, snapshot: &DeviceSnapshot) -> (i8, i8) {
        let component = |value: f32| {
            if value.abs() > self.axis_deadzone {
                value.signum() as i8
            } else {
                0
            }
        };
        (
            component(snapshot.axis(0).unwrap_or(0.0)),
            component(snapshot.axis(1).unwrap_or(0.0)),
        )
    }
}
