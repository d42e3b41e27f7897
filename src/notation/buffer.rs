//! Display grouping for frame token sets.
//!
//! Incoming frames accumulate in a pending list of groups until a flush turns
//! them into one immutable display line. Flushes happen eagerly (a dash always
//! opens a fresh line, two directional inputs never share one) or deferred,
//! when the conjunction-window timer owned by the grouper task fires.
//!
//! Retraction is the optional inverse: if a new frame arrives just after a
//! flush while nothing is pending, the last line is taken back (the renderer
//! is told to drop it) and its groups become pending again so the new tokens
//! can conjoin with it.

use crate::notation::TokenClasses;
use chrono::{DateTime, Duration, Local};
use tracing::debug;

/// One displayed unit: a single token or a set considered simultaneous.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputGroup {
    Single(String),
    Simultaneous(Vec<String>),
}

impl OutputGroup {
    pub fn tokens(&self) -> &[String] {
        match self {
            OutputGroup::Single(token) => std::slice::from_ref(token),
            OutputGroup::Simultaneous(tokens) => tokens,
        }
    }
}

/// An immutable, flushed sequence of groups plus its creation tick.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayLine {
    pub groups: Vec<OutputGroup>,
    pub tick: u64,
}

/// What the renderer receives from the grouping policy.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayEvent {
    /// A new line to prepend to the history.
    Line(DisplayLine),
    /// Take back the most recently displayed line (retraction).
    Retract,
}

#[derive(Clone, Debug)]
pub struct GroupingSettings {
    pub conjunction_window: Duration,
    pub retraction: bool,
}

impl Default for GroupingSettings {
    fn default() -> Self {
        Self {
            conjunction_window: Duration::milliseconds(50),
            retraction: false,
        }
    }
}

/// Outcome of ingesting one frame token set.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub events: Vec<DisplayEvent>,
    /// The deferred flush must be cancelled and re-armed.
    pub rearm: bool,
}

#[derive(Clone, Debug)]
struct FlushedLine {
    groups: Vec<OutputGroup>,
    at: DateTime<Local>,
}

/// Pending display groups and the policy deciding when they become a line.
#[derive(Clone, Debug)]
pub struct OutputBuffer {
    pending: Vec<OutputGroup>,
    last_flush: Option<FlushedLine>,
    classes: TokenClasses,
    settings: GroupingSettings,
}

impl OutputBuffer {
    pub fn new(classes: TokenClasses, settings: GroupingSettings) -> Self {
        Self {
            pending: Vec::new(),
            last_flush: None,
            classes,
            settings,
        }
    }

    pub fn update_settings(&mut self, settings: GroupingSettings) {
        self.settings = settings;
    }

    pub fn pending_is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Applies the grouping rules to one frame token set, in order:
    /// retraction, dash flush, directional exclusivity, append, re-arm.
    pub fn ingest(
        &mut self,
        tokens: &[String],
        now: DateTime<Local>,
        tick: u64,
    ) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();
        if tokens.is_empty() {
            return outcome;
        }

        if self.settings.retraction && self.pending.is_empty() {
            self.try_retract(now, &mut outcome);
        }

        let has_dash = tokens.iter().any(|t| self.classes.is_dash(t));
        let has_directional = tokens
            .iter()
            .any(|t| self.classes.is_directional_or_neutral(t));

        if has_dash {
            // A dash always starts a fresh line, closing out whatever
            // direction preceded it.
            self.flush_into(now, tick, &mut outcome);
        } else if has_directional && self.pending_has_directional_or_neutral() {
            // Two directional inputs never share a line.
            self.flush_into(now, tick, &mut outcome);
        }

        self.append(tokens);
        outcome.rearm = true;
        outcome
    }

    /// Deferred flush, called when the conjunction-window timer fires.
    /// Flushing an empty pending list is a no-op.
    pub fn flush(&mut self, now: DateTime<Local>, tick: u64) -> Option<DisplayLine> {
        if self.pending.is_empty() {
            return None;
        }
        let groups = std::mem::take(&mut self.pending);
        self.last_flush = Some(FlushedLine {
            groups: groups.clone(),
            at: now,
        });
        debug!("Flushed {} group(s) at tick {}", groups.len(), tick);
        Some(DisplayLine { groups, tick })
    }

    fn try_retract(&mut self, now: DateTime<Local>, outcome: &mut IngestOutcome) {
        let within_window = self
            .last_flush
            .as_ref()
            .is_some_and(|f| now - f.at < self.settings.conjunction_window);
        if !within_window {
            return;
        }
        let flushed = self.last_flush.take().expect("checked above");
        debug!("Retracting last flushed line to conjoin new input");
        outcome.events.push(DisplayEvent::Retract);
        self.pending = flushed.groups;
    }

    fn flush_into(&mut self, now: DateTime<Local>, tick: u64, outcome: &mut IngestOutcome) {
        if let Some(line) = self.flush(now, tick) {
            outcome.events.push(DisplayEvent::Line(line));
        }
    }

    fn append(&mut self, tokens: &[String]) {
        let mut unique: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !unique.contains(token) {
                unique.push(token.clone());
            }
        }

        let single_directional_collision = unique.len() == 1
            && self.pending_has_directional()
            && self.classes.is_directional(&unique[0]);

        if unique.len() == 1 && !single_directional_collision {
            self.pending.push(OutputGroup::Single(unique.remove(0)));
        } else {
            self.pending.push(OutputGroup::Simultaneous(unique));
        }
    }

    fn pending_has_directional(&self) -> bool {
        self.pending
            .iter()
            .any(|g| g.tokens().iter().any(|t| self.classes.is_directional(t)))
    }

    fn pending_has_directional_or_neutral(&self) -> bool {
        self.pending.iter().any(|g| {
            g.tokens()
                .iter()
                .any(|t| self.classes.is_directional_or_neutral(t))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(retraction: bool) -> OutputBuffer {
        OutputBuffer::new(
            TokenClasses::default(),
            GroupingSettings {
                conjunction_window: Duration::milliseconds(50),
                retraction,
            },
        )
    }

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn single(token: &str) -> OutputGroup {
        OutputGroup::Single(token.to_string())
    }

    #[test]
    fn empty_flush_is_a_no_op() {
        let mut buffer = buffer(false);
        assert!(buffer.flush(Local::now(), 1).is_none());
        assert!(buffer.flush(Local::now(), 2).is_none());
    }

    #[test]
    fn buttons_within_window_share_one_line() {
        let mut buffer = buffer(false);
        let t0 = Local::now();

        let first = buffer.ingest(&strings(&["A"]), t0, 1);
        assert!(first.events.is_empty());
        assert!(first.rearm);

        let second = buffer.ingest(&strings(&["B"]), t0 + Duration::milliseconds(20), 2);
        assert!(second.events.is_empty(), "no directional conflict, no flush");

        let line = buffer.flush(t0 + Duration::milliseconds(70), 4).unwrap();
        assert_eq!(line.groups, vec![single("A"), single("B")]);
    }

    #[test]
    fn timer_expiry_splits_buttons_into_two_lines() {
        // The timer is owned by the grouper task; here its firing is the
        // explicit flush between the two arrivals.
        let mut buffer = buffer(false);
        let t0 = Local::now();

        buffer.ingest(&strings(&["A"]), t0, 1);
        let first = buffer.flush(t0 + Duration::milliseconds(50), 3).unwrap();
        assert_eq!(first.groups, vec![single("A")]);

        buffer.ingest(&strings(&["B"]), t0 + Duration::milliseconds(120), 7);
        let second = buffer.flush(t0 + Duration::milliseconds(170), 10).unwrap();
        assert_eq!(second.groups, vec![single("B")]);
    }

    #[test]
    fn directional_exclusivity_closes_the_old_line_untouched() {
        let mut buffer = buffer(false);
        let t0 = Local::now();

        buffer.ingest(&strings(&["→", "A"]), t0, 1);
        let outcome = buffer.ingest(&strings(&["↓"]), t0 + Duration::milliseconds(10), 2);

        assert_eq!(outcome.events.len(), 1);
        let DisplayEvent::Line(line) = &outcome.events[0] else {
            panic!("expected a flushed line");
        };
        assert_eq!(
            line.groups,
            vec![OutputGroup::Simultaneous(strings(&["→", "A"]))],
            "old line closes with exactly its pre-existing tokens"
        );

        let rest = buffer.flush(t0 + Duration::milliseconds(60), 4).unwrap();
        assert_eq!(rest.groups, vec![single("↓")]);
    }

    #[test]
    fn neutral_marker_counts_for_exclusivity() {
        let mut buffer = buffer(false);
        let t0 = Local::now();

        buffer.ingest(&strings(&["N", "A"]), t0, 1);
        let outcome = buffer.ingest(&strings(&["→"]), t0 + Duration::milliseconds(10), 2);
        assert_eq!(outcome.events.len(), 1, "N and → never share a line");
    }

    #[test]
    fn button_then_direction_share_a_line() {
        let mut buffer = buffer(false);
        let t0 = Local::now();

        buffer.ingest(&strings(&["A"]), t0, 1);
        let outcome = buffer.ingest(&strings(&["→"]), t0 + Duration::milliseconds(10), 2);
        assert!(outcome.events.is_empty(), "button-only pending does not flush");

        let line = buffer.flush(t0 + Duration::milliseconds(60), 4).unwrap();
        assert_eq!(line.groups, vec![single("A"), single("→")]);
    }

    #[test]
    fn dash_flushes_pending_before_being_added() {
        let mut buffer = buffer(false);
        let t0 = Local::now();

        buffer.ingest(&strings(&["→"]), t0, 1);
        let outcome = buffer.ingest(&strings(&["→→"]), t0 + Duration::milliseconds(10), 2);

        assert_eq!(outcome.events.len(), 1);
        let DisplayEvent::Line(line) = &outcome.events[0] else {
            panic!("expected a flushed line");
        };
        assert_eq!(line.groups, vec![single("→")]);

        let dash_line = buffer.flush(t0 + Duration::milliseconds(60), 4).unwrap();
        assert_eq!(dash_line.groups, vec![single("→→")]);
    }

    #[test]
    fn dash_into_empty_pending_emits_nothing_early() {
        let mut buffer = buffer(false);
        let outcome = buffer.ingest(&strings(&["→→"]), Local::now(), 1);
        assert!(outcome.events.is_empty());
        assert!(outcome.rearm);
    }

    #[test]
    fn duplicate_tokens_in_one_frame_are_deduplicated() {
        let mut buffer = buffer(false);
        let t0 = Local::now();

        buffer.ingest(&strings(&["A", "A"]), t0, 1);
        let line = buffer.flush(t0 + Duration::milliseconds(60), 3).unwrap();
        assert_eq!(line.groups, vec![single("A")]);
    }

    #[test]
    fn simultaneous_tokens_stay_one_group() {
        let mut buffer = buffer(false);
        let t0 = Local::now();

        buffer.ingest(&strings(&["↓", "A", "B"]), t0, 1);
        let line = buffer.flush(t0 + Duration::milliseconds(60), 3).unwrap();
        assert_eq!(
            line.groups,
            vec![OutputGroup::Simultaneous(strings(&["↓", "A", "B"]))]
        );
    }

    #[test]
    fn retraction_reopens_a_just_closed_line() {
        let mut buffer = buffer(true);
        let t0 = Local::now();

        buffer.ingest(&strings(&["A"]), t0, 1);
        buffer.flush(t0 + Duration::milliseconds(50), 3).unwrap();

        // Next frame lands inside the conjunction window after the flush.
        let outcome = buffer.ingest(&strings(&["B"]), t0 + Duration::milliseconds(80), 5);
        assert_eq!(outcome.events, vec![DisplayEvent::Retract]);

        let line = buffer.flush(t0 + Duration::milliseconds(140), 8).unwrap();
        assert_eq!(line.groups, vec![single("A"), single("B")]);
    }

    #[test]
    fn retraction_expires_with_the_window() {
        let mut buffer = buffer(true);
        let t0 = Local::now();

        buffer.ingest(&strings(&["A"]), t0, 1);
        buffer.flush(t0 + Duration::milliseconds(50), 3).unwrap();

        let outcome = buffer.ingest(&strings(&["B"]), t0 + Duration::milliseconds(150), 9);
        assert!(outcome.events.is_empty());

        let line = buffer.flush(t0 + Duration::milliseconds(210), 12).unwrap();
        assert_eq!(line.groups, vec![single("B")]);
    }

    #[test]
    fn retraction_only_fires_once_per_flush() {
        let mut buffer = buffer(true);
        let t0 = Local::now();

        buffer.ingest(&strings(&["A"]), t0, 1);
        buffer.flush(t0 + Duration::milliseconds(50), 3).unwrap();

        let first = buffer.ingest(&strings(&["B"]), t0 + Duration::milliseconds(60), 4);
        assert_eq!(first.events, vec![DisplayEvent::Retract]);

        // Pending is non-empty now, so the next arrival cannot retract again.
        let second = buffer.ingest(&strings(&["X"]), t0 + Duration::milliseconds(70), 5);
        assert!(second.events.is_empty());
    }

    #[test]
    fn disabled_retraction_never_retracts() {
        let mut buffer = buffer(false);
        let t0 = Local::now();

        buffer.ingest(&strings(&["A"]), t0, 1);
        buffer.flush(t0 + Duration::milliseconds(50), 3).unwrap();

        let outcome = buffer.ingest(&strings(&["B"]), t0 + Duration::milliseconds(60), 4);
        assert!(outcome.events.is_empty());
    }
}
