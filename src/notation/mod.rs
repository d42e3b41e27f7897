//! Core input-notation pipeline: direction resolution, temporal pattern
//! detection, per-frame token assembly and display grouping.
//!
//! Everything in this module is pure state-in/state-out logic driven by
//! explicit timestamps, so it can be exercised without hardware or a runtime.
//!
//! # Data flow
//!
//! ```text
//! DeviceSnapshot ──► DirectionResolver ──► PatternDetector ──► compose_frame
//!                         (compass)        (dash / motion)      (token set)
//!                                                                   │
//!                                                                   ▼
//!                                                             OutputBuffer
//! ```

pub mod buffer;
pub mod detector;
pub mod direction;
pub mod frame;

pub use buffer::{DisplayEvent, DisplayLine, GroupingSettings, OutputBuffer, OutputGroup};
pub use detector::{DashTable, DetectedPattern, DetectorSettings, GestureTemplate, PatternDetector};
pub use direction::{CompassPoint, DirectionResolver, DirectionTable};
pub use frame::{compose_frame, FrameSignals, PrimaryRule};

use std::collections::HashSet;

/// Numpad code for the neutral (centered) direction.
pub const NEUTRAL_NUM: u8 = 5;

/// Token displayed when a press or release happens with no direction held.
pub const NEUTRAL_MARKER: &str = "N";

/// Token classification derived from the configured tables.
///
/// The grouping policy needs to know which tokens count as "directional"
/// (direction symbols, dashes and motions) without re-deriving that from the
/// tables on every frame.
#[derive(Clone, Debug)]
pub struct TokenClasses {
    directional: HashSet<String>,
    dashes: HashSet<String>,
}

impl TokenClasses {
    pub fn from_tables(
        directions: &DirectionTable,
        dashes: &DashTable,
        gestures: &[GestureTemplate],
    ) -> Self {
        let mut directional: HashSet<String> = directions
            .entries()
            .iter()
            .map(|e| e.symbol.clone())
            .collect();
        let dash_symbols: HashSet<String> =
            dashes.entries().iter().map(|e| e.symbol.clone()).collect();
        directional.extend(dash_symbols.iter().cloned());
        directional.extend(gestures.iter().map(|g| g.symbol.clone()));

        Self {
            directional,
            dashes: dash_symbols,
        }
    }

    /// Direction, dash or motion symbol.
    pub fn is_directional(&self, token: &str) -> bool {
        self.directional.contains(token)
    }

    pub fn is_dash(&self, token: &str) -> bool {
        self.dashes.contains(token)
    }

    pub fn is_neutral_marker(token: &str) -> bool {
        token == NEUTRAL_MARKER
    }

    /// Directional tokens and the neutral marker never share a display line,
    /// so the buffer mostly cares about this combined class.
    pub fn is_directional_or_neutral(&self, token: &str) -> bool {
        self.is_directional(token) || Self::is_neutral_marker(token)
    }
}

impl Default for TokenClasses {
    fn default() -> Self {
        Self::from_tables(
            &DirectionTable::default(),
            &DashTable::default(),
            &detector::default_gestures(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classes_cover_all_table_symbols() {
        let classes = TokenClasses::default();

        for entry in DirectionTable::default().entries() {
            assert!(
                classes.is_directional(&entry.symbol),
                "direction symbol {} must be directional",
                entry.symbol
            );
        }
        assert!(classes.is_directional("→→"));
        assert!(classes.is_dash("←←"));
        assert!(classes.is_directional("⬊"));
        assert!(!classes.is_dash("⬊"));
    }

    #[test]
    fn neutral_marker_is_not_directional_but_counts_for_exclusivity() {
        let classes = TokenClasses::default();

        assert!(!classes.is_directional(NEUTRAL_MARKER));
        assert!(TokenClasses::is_neutral_marker(NEUTRAL_MARKER));
        assert!(classes.is_directional_or_neutral(NEUTRAL_MARKER));
        assert!(!classes.is_directional_or_neutral("A"));
    }
}
