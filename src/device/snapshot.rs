//! Polled device state.
//!
//! A snapshot is one non-blocking read of everything the pipeline needs from
//! a controller: per-button pressed flags and analog values, and the axis
//! list in the standard order (left stick x/y, right stick x/y, triggers,
//! then any non-standard extras such as hat axes).

/// State of one button at poll time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ButtonSnapshot {
    pub pressed: bool,
    pub value: f32,
}

/// State of one device at poll time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceSnapshot {
    pub buttons: Vec<ButtonSnapshot>,
    pub axes: Vec<f32>,
}

impl DeviceSnapshot {
    /// An all-released snapshot with the given shape, used as the previous
    /// state of a freshly connected device.
    pub fn resting(button_count: usize, axis_count: usize) -> Self {
        Self {
            buttons: vec![ButtonSnapshot::default(); button_count],
            axes: vec![0.0; axis_count],
        }
    }

    pub fn button_pressed(&self, index: usize) -> bool {
        self.buttons.get(index).map(|b| b.pressed).unwrap_or(false)
    }

    pub fn button_value(&self, index: usize) -> f32 {
        self.buttons.get(index).map(|b| b.value).unwrap_or(0.0)
    }

    pub fn axis(&self, index: usize) -> Option<f32> {
        self.axes.get(index).copied()
    }
}
