//! Temporal pattern detection over the per-device direction history.
//!
//! The detector is fed exactly once per direction change. It keeps a short
//! timestamped history and recognizes two patterns:
//!
//! * **Dash** - direction → neutral → same direction within the dash window,
//!   restricted to the dashable compass codes (left/right).
//! * **Motion** - the reduced history (neutral dropped, consecutive repeats
//!   collapsed) ends with one of a gesture template's accepted subsequences.
//!
//! Motions are checked before dashes, and any successful match clears the
//! history so a held gesture cannot re-trigger on the next change.

use crate::notation::NEUTRAL_NUM;
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// How many history samples the dash pattern spans.
const DASH_SPAN: usize = 3;

/// One direction change with the time it was observed.
#[derive(Clone, Debug)]
pub struct DirectionSample {
    pub num: u8,
    pub at: DateTime<Local>,
}

/// A named motion defined by one or more accepted compass-code subsequences.
///
/// Sequences omit neutral and collapsed duplicates, e.g. a quarter-circle
/// forward is `[2, 3, 6]` with `[2, 6]` accepted for a skipped diagonal.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GestureTemplate {
    pub name: String,
    pub symbol: String,
    pub sequences: Vec<Vec<u8>>,
}

pub fn default_gestures() -> Vec<GestureTemplate> {
    vec![
        GestureTemplate {
            name: "QCF".to_string(),
            symbol: "⬊".to_string(),
            sequences: vec![vec![2, 3, 6], vec![2, 6]],
        },
        GestureTemplate {
            name: "QCB".to_string(),
            symbol: "⬋".to_string(),
            sequences: vec![vec![2, 1, 4], vec![2, 4]],
        },
    ]
}

/// Compass codes that can be dashed, with their doubled-arrow symbols.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct DashEntry {
    pub num: u8,
    pub symbol: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(transparent)]
pub struct DashTable {
    entries: Vec<DashEntry>,
}

impl DashTable {
    pub fn entries(&self) -> &[DashEntry] {
        &self.entries
    }

    pub fn symbol(&self, num: u8) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.num == num)
            .map(|e| e.symbol.as_str())
    }
}

impl Default for DashTable {
    fn default() -> Self {
        Self {
            entries: vec![
                DashEntry {
                    num: 4,
                    symbol: "←←".to_string(),
                },
                DashEntry {
                    num: 6,
                    symbol: "→→".to_string(),
                },
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct DetectorSettings {
    pub dash_window: Duration,
    pub history_cap: usize,
    pub motions_enabled: bool,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            dash_window: Duration::milliseconds(300),
            history_cap: 8,
            motions_enabled: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DetectedPattern {
    Dash(String),
    Motion(String),
}

/// Rolling direction history plus the dash/motion matchers over it.
#[derive(Clone, Debug)]
pub struct PatternDetector {
    history: VecDeque<DirectionSample>,
    dash_table: DashTable,
    templates: Vec<GestureTemplate>,
    settings: DetectorSettings,
}

impl PatternDetector {
    pub fn new(
        dash_table: DashTable,
        templates: Vec<GestureTemplate>,
        settings: DetectorSettings,
    ) -> Self {
        Self {
            history: VecDeque::with_capacity(settings.history_cap),
            dash_table,
            templates,
            settings,
        }
    }

    pub fn update_settings(&mut self, settings: DetectorSettings) {
        self.settings = settings;
    }

    /// Records one direction change and reports a detected pattern, if any.
    ///
    /// The sample is pushed before matching, so a motion whose final
    /// direction is this change fires immediately. Motion takes precedence
    /// over dash; a match of either kind clears the history.
    pub fn on_direction_change(
        &mut self,
        num: u8,
        at: DateTime<Local>,
    ) -> Option<DetectedPattern> {
        self.history.push_back(DirectionSample { num, at });
        while self.history.len() > self.settings.history_cap {
            self.history.pop_front();
        }

        if self.settings.motions_enabled {
            if let Some(symbol) = self.match_motion() {
                debug!("Motion detected: {}", symbol);
                self.history.clear();
                return Some(DetectedPattern::Motion(symbol));
            }
        }

        if let Some(symbol) = self.match_dash() {
            debug!("Dash detected: {}", symbol);
            self.history.clear();
            return Some(DetectedPattern::Dash(symbol));
        }

        None
    }

    /// Drops all accumulated history, e.g. on reconnect.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn match_dash(&self) -> Option<String> {
        if self.history.len() < DASH_SPAN {
            return None;
        }
        let start = self.history.len() - DASH_SPAN;
        let first = &self.history[start];
        let middle = &self.history[start + 1];
        let last = &self.history[start + 2];

        let symbol = self.dash_table.symbol(last.num)?;
        let is_pattern = last.num == first.num && middle.num == NEUTRAL_NUM;
        let in_window = last.at - first.at <= self.settings.dash_window;

        if is_pattern && in_window {
            Some(symbol.to_string())
        } else {
            None
        }
    }

    fn match_motion(&self) -> Option<String> {
        let sequence = self.reduced_sequence();
        if sequence.len() < 2 {
            return None;
        }

        // Template order is the tie-break: the first configured gesture with
        // a matching tail wins.
        for template in &self.templates {
            for pattern in &template.sequences {
                if sequence.len() >= pattern.len() && sequence.ends_with(pattern) {
                    return Some(template.symbol.clone());
                }
            }
        }
        None
    }

    /// History as compass codes with neutral dropped and immediate repeats
    /// collapsed, e.g. [2, 2, 5, 3, 6, 6] → [2, 3, 6].
    fn reduced_sequence(&self) -> Vec<u8> {
        let mut sequence = Vec::with_capacity(self.history.len());
        let mut last: Option<u8> = None;
        for sample in &self.history {
            if sample.num == NEUTRAL_NUM || last == Some(sample.num) {
                continue;
            }
            sequence.push(sample.num);
            last = Some(sample.num);
        }
        sequence
    }

    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(motions: bool) -> PatternDetector {
        PatternDetector::new(
            DashTable::default(),
            default_gestures(),
            DetectorSettings {
                motions_enabled: motions,
                ..Default::default()
            },
        )
    }

    fn feed(
        detector: &mut PatternDetector,
        start: DateTime<Local>,
        steps: &[(u8, i64)],
    ) -> Vec<DetectedPattern> {
        steps
            .iter()
            .filter_map(|(num, offset)| {
                detector.on_direction_change(*num, start + Duration::milliseconds(*offset))
            })
            .collect()
    }

    #[test]
    fn right_dash_within_window() {
        let mut detector = detector(false);
        let t0 = Local::now();

        let detected = feed(&mut detector, t0, &[(6, 0), (5, 50), (6, 120)]);
        assert_eq!(detected, vec![DetectedPattern::Dash("→→".to_string())]);
        assert_eq!(detector.history_len(), 0, "history cleared after dash");
    }

    #[test]
    fn dash_outside_window_is_ignored() {
        let mut detector = detector(false);
        let t0 = Local::now();

        let detected = feed(&mut detector, t0, &[(6, 0), (5, 200), (6, 350)]);
        assert!(detected.is_empty());
    }

    #[test]
    fn up_is_not_dashable() {
        let mut detector = detector(false);
        let t0 = Local::now();

        let detected = feed(&mut detector, t0, &[(8, 0), (5, 50), (8, 100)]);
        assert!(detected.is_empty());
    }

    #[test]
    fn dash_does_not_chain_into_a_second_dash() {
        let mut detector = detector(false);
        let t0 = Local::now();

        // After the first dash the history is empty, so the trailing
        // neutral/right pair alone must not dash again.
        let detected = feed(
            &mut detector,
            t0,
            &[(6, 0), (5, 40), (6, 80), (5, 120), (6, 160)],
        );
        assert_eq!(detected.len(), 1);
    }

    #[test]
    fn dash_uses_most_recent_three_samples() {
        let mut detector = detector(false);
        let t0 = Local::now();

        // Old unrelated changes must not block the dash at the tail.
        let detected = feed(
            &mut detector,
            t0,
            &[(2, 0), (8, 30), (4, 60), (5, 90), (4, 140)],
        );
        assert_eq!(detected, vec![DetectedPattern::Dash("←←".to_string())]);
    }

    #[test]
    fn quarter_circle_forward_full_and_reduced() {
        let t0 = Local::now();

        let mut full = detector(true);
        let detected = feed(&mut full, t0, &[(2, 0), (3, 40), (6, 80)]);
        assert_eq!(detected, vec![DetectedPattern::Motion("⬊".to_string())]);
        assert_eq!(full.history_len(), 0, "history cleared after motion");

        let mut skipped = detector(true);
        let detected = feed(&mut skipped, t0, &[(2, 0), (6, 60)]);
        assert_eq!(detected, vec![DetectedPattern::Motion("⬊".to_string())]);
    }

    #[test]
    fn quarter_circle_back() {
        let mut detector = detector(true);
        let t0 = Local::now();

        let detected = feed(&mut detector, t0, &[(2, 0), (1, 40), (4, 80)]);
        assert_eq!(detected, vec![DetectedPattern::Motion("⬋".to_string())]);
    }

    #[test]
    fn reversed_quarter_circle_matches_nothing() {
        let mut detector = detector(true);
        let t0 = Local::now();

        let detected = feed(&mut detector, t0, &[(6, 0), (3, 40), (2, 80)]);
        assert!(detected.is_empty());
    }

    #[test]
    fn motions_ignored_when_disabled() {
        let mut detector = detector(false);
        let t0 = Local::now();

        let detected = feed(&mut detector, t0, &[(2, 0), (3, 40), (6, 80)]);
        assert!(detected.is_empty());
    }

    #[test]
    fn neutral_and_repeats_are_reduced_before_matching() {
        let mut detector = detector(true);
        let t0 = Local::now();

        // 2, (neutral), 2 again, 3, 6: reduces to [2, 3, 6].
        let detected = feed(
            &mut detector,
            t0,
            &[(2, 0), (5, 20), (2, 40), (3, 60), (6, 80)],
        );
        assert_eq!(detected, vec![DetectedPattern::Motion("⬊".to_string())]);
    }

    #[test]
    fn first_template_wins_on_overlap() {
        let overlapping = vec![
            GestureTemplate {
                name: "first".to_string(),
                symbol: "one".to_string(),
                sequences: vec![vec![2, 6]],
            },
            GestureTemplate {
                name: "second".to_string(),
                symbol: "two".to_string(),
                sequences: vec![vec![2, 6]],
            },
        ];
        let mut detector = PatternDetector::new(
            DashTable::default(),
            overlapping,
            DetectorSettings {
                motions_enabled: true,
                ..Default::default()
            },
        );
        let t0 = Local::now();

        let detected = feed(&mut detector, t0, &[(2, 0), (6, 40)]);
        assert_eq!(detected, vec![DetectedPattern::Motion("one".to_string())]);
    }

    #[test]
    fn history_is_bounded_by_cap() {
        let mut detector = detector(false);
        let t0 = Local::now();

        let steps: Vec<(u8, i64)> = (0..20)
            .map(|i| (if i % 2 == 0 { 8 } else { 2 }, i * 10))
            .collect();
        feed(&mut detector, t0, &steps);
        assert!(detector.history_len() <= 8);
    }

    #[test]
    fn motion_takes_precedence_over_dash() {
        // Down then right completes a QCF before the right dash pattern can
        // even form; the subsequent neutral/right pair alone is too short to
        // dash, so exactly one motion and no dash comes out.
        let mut detector = detector(true);
        let t0 = Local::now();

        let detected = feed(&mut detector, t0, &[(2, 0), (6, 40), (5, 80), (6, 120)]);
        assert_eq!(detected, vec![DetectedPattern::Motion("⬊".to_string())]);
    }
}
