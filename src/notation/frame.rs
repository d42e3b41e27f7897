//! Per-frame token assembly.
//!
//! One poll tick produces a set of edge signals (direction change, detected
//! pattern, press/release edges). This module turns those signals into the
//! frame's ordered token set. The primary directional token is chosen by an
//! explicit ordered rule list so the priority cascade stays auditable and
//! testable rule by rule.

use crate::notation::detector::DetectedPattern;
use crate::notation::direction::CompassPoint;
use crate::notation::NEUTRAL_MARKER;

/// Edge signals derived from one device for one poll tick.
#[derive(Clone, Debug)]
pub struct FrameSignals {
    pub current: CompassPoint,
    pub direction_changed: bool,
    pub pattern: Option<DetectedPattern>,
    /// Any mapped non-D-pad button went from released to pressed.
    pub any_new_press: bool,
    /// A non-directional button release with no press this tick.
    pub qualifying_release: bool,
    /// Names of newly pressed non-directional buttons, in mapped-index order.
    pub pressed_buttons: Vec<String>,
    pub show_neutrals: bool,
}

/// Rules for the primary (directional) token, evaluated in declaration order.
/// The first rule whose guard passes supplies the token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimaryRule {
    /// A motion completed this tick.
    Motion,
    /// A dash completed this tick.
    Dash,
    /// The direction changed to a non-neutral compass point.
    DirectionChange,
    /// The direction returned to neutral with no simultaneous press.
    NeutralReturn,
    /// A qualifying release happened while resting at neutral.
    NeutralRelease,
    /// A button press while a direction is held attaches that direction.
    HeldDirection,
}

pub const PRIMARY_RULES: [PrimaryRule; 6] = [
    PrimaryRule::Motion,
    PrimaryRule::Dash,
    PrimaryRule::DirectionChange,
    PrimaryRule::NeutralReturn,
    PrimaryRule::NeutralRelease,
    PrimaryRule::HeldDirection,
];

fn rule_token(rule: PrimaryRule, signals: &FrameSignals) -> Option<String> {
    match rule {
        PrimaryRule::Motion => match &signals.pattern {
            Some(DetectedPattern::Motion(symbol)) => Some(symbol.clone()),
            _ => None,
        },
        PrimaryRule::Dash => match &signals.pattern {
            Some(DetectedPattern::Dash(symbol)) => Some(symbol.clone()),
            _ => None,
        },
        PrimaryRule::DirectionChange => {
            if signals.direction_changed && !signals.current.is_neutral() {
                Some(signals.current.symbol.clone())
            } else {
                None
            }
        }
        PrimaryRule::NeutralReturn => {
            if signals.direction_changed
                && signals.current.is_neutral()
                && !signals.any_new_press
                && signals.show_neutrals
            {
                Some(NEUTRAL_MARKER.to_string())
            } else {
                None
            }
        }
        PrimaryRule::NeutralRelease => {
            if signals.qualifying_release
                && !signals.any_new_press
                && !signals.direction_changed
                && signals.current.is_neutral()
                && signals.show_neutrals
            {
                Some(NEUTRAL_MARKER.to_string())
            } else {
                None
            }
        }
        PrimaryRule::HeldDirection => {
            if signals.any_new_press && !signals.current.is_neutral() {
                Some(signals.current.symbol.clone())
            } else {
                None
            }
        }
    }
}

/// Evaluates the rule list and returns the winning rule, if any.
pub fn primary_token(signals: &FrameSignals) -> Option<(String, PrimaryRule)> {
    PRIMARY_RULES
        .iter()
        .find_map(|rule| rule_token(*rule, signals).map(|token| (token, *rule)))
}

/// Composes the full ordered token set for one tick.
///
/// The primary directional token comes first, followed by newly pressed
/// button names. Buttons pressed with no directional context get the neutral
/// marker prepended (when neutrals are shown). An empty result means no
/// qualifying edge occurred this tick.
pub fn compose_frame(signals: &FrameSignals) -> Vec<String> {
    let primary = primary_token(signals);

    let mut tokens = Vec::with_capacity(1 + signals.pressed_buttons.len());
    if let Some((token, _)) = &primary {
        tokens.push(token.clone());
    }
    tokens.extend(signals.pressed_buttons.iter().cloned());

    if primary.is_none() && !signals.pressed_buttons.is_empty() && signals.show_neutrals {
        tokens.insert(0, NEUTRAL_MARKER.to_string());
    }

    tokens
}
