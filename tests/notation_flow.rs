//! End-to-end pipeline scenarios driven through real snapshots, with the
//! grouper's deferred flush simulated by explicit flush calls at the times
//! the conjunction-window timer would fire.

use chrono::{DateTime, Duration, Local};
use comboscope::device::mapping::DeviceMapping;
use comboscope::device::runtime::{DeviceRuntime, FramePolicy};
use comboscope::device::snapshot::DeviceSnapshot;
use comboscope::notation::buffer::{DisplayLine, GroupingSettings, OutputBuffer, OutputGroup};
use comboscope::notation::detector::{default_gestures, DashTable, DetectorSettings, PatternDetector};
use comboscope::notation::direction::{DirectionResolver, DirectionTable};
use comboscope::notation::TokenClasses;

fn resolver() -> DirectionResolver {
    DirectionResolver::new(DirectionTable::default(), 0.7, 0.1)
}

fn runtime(motions: bool) -> DeviceRuntime {
    let shape = DeviceSnapshot::resting(16, 6);
    DeviceRuntime::new(
        DeviceMapping::standard(),
        PatternDetector::new(
            DashTable::default(),
            default_gestures(),
            DetectorSettings {
                motions_enabled: motions,
                ..Default::default()
            },
        ),
        &shape,
    )
}

fn buffer() -> OutputBuffer {
    OutputBuffer::new(TokenClasses::default(), GroupingSettings::default())
}

fn dpad(pressed: &[usize]) -> DeviceSnapshot {
    let mut snapshot = DeviceSnapshot::resting(16, 6);
    for &idx in pressed {
        snapshot.buttons[idx].pressed = true;
    }
    snapshot
}

fn stick(x: f32, y: f32, buttons: &[usize]) -> DeviceSnapshot {
    let mut snapshot = dpad(buttons);
    snapshot.axes[0] = x;
    snapshot.axes[1] = y;
    snapshot
}

/// Runs snapshots through the runtime and buffer, returning the displayed
/// lines. Every buffer arrival is followed by a simulated timer flush one
/// conjunction window later, unless the next snapshot lands inside it.
fn drive(
    runtime: &mut DeviceRuntime,
    buffer: &mut OutputBuffer,
    policy: &FramePolicy,
    start: DateTime<Local>,
    steps: &[(i64, DeviceSnapshot)],
) -> Vec<DisplayLine> {
    let resolver = resolver();
    let window = Duration::milliseconds(50);
    let mut lines = Vec::new();
    let mut armed_at: Option<DateTime<Local>> = None;
    let mut tick = 0u64;

    for (offset, snapshot) in steps {
        let now = start + Duration::milliseconds(*offset);
        tick += 1;

        // Fire the deferred flush if its deadline passed before this step.
        if let Some(at) = armed_at {
            if now - at >= window {
                if let Some(line) = buffer.flush(at + window, tick) {
                    lines.push(line);
                }
                armed_at = None;
            }
        }

        let tokens = runtime.process(snapshot.clone(), now, &resolver, policy);
        if tokens.is_empty() {
            continue;
        }
        let outcome = buffer.ingest(&tokens, now, tick);
        for event in outcome.events {
            if let comboscope::notation::buffer::DisplayEvent::Line(line) = event {
                lines.push(line);
            } else {
                lines.pop();
            }
        }
        if outcome.rearm {
            armed_at = Some(now);
        }
    }

    // Drain the final pending flush.
    if armed_at.is_some() {
        if let Some(line) = buffer.flush(start + Duration::milliseconds(10_000), tick + 1) {
            lines.push(line);
        }
    }
    lines
}

fn single(token: &str) -> OutputGroup {
    OutputGroup::Single(token.to_string())
}

#[test]
fn dpad_dash_closes_the_stray_direction_line() {
    let mut runtime = runtime(false);
    let mut buffer = buffer();
    let policy = FramePolicy {
        show_neutrals: false,
        ..Default::default()
    };
    let t0 = Local::now();

    // Right at 0ms, neutral at 50ms, Right again at 120ms: a dash.
    let lines = drive(
        &mut runtime,
        &mut buffer,
        &policy,
        t0,
        &[(0, dpad(&[15])), (50, dpad(&[])), (120, dpad(&[15]))],
    );

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].groups, vec![single("→")]);
    assert_eq!(
        lines.last().unwrap().groups,
        vec![single("→→")],
        "the newest line is exactly the dash"
    );
}

#[test]
fn dash_with_neutrals_shown_still_ends_on_the_dash_line() {
    let mut runtime = runtime(false);
    let mut buffer = buffer();
    let policy = FramePolicy::default();
    let t0 = Local::now();

    let lines = drive(
        &mut runtime,
        &mut buffer,
        &policy,
        t0,
        &[(0, dpad(&[15])), (50, dpad(&[])), (120, dpad(&[15]))],
    );

    // The return to neutral gets its own marker line in between, but the
    // newest line is still exactly the dash.
    assert_eq!(lines.last().unwrap().groups, vec![single("→→")]);
    assert!(lines
        .iter()
        .any(|line| line.groups == vec![single("N")]));
}

#[test]
fn stick_quarter_circle_with_button_shares_one_line() {
    let mut runtime = runtime(true);
    let mut buffer = buffer();
    let policy = FramePolicy {
        show_neutrals: false,
        ..Default::default()
    };
    let t0 = Local::now();

    // Down, down-right, then right plus the A button: the motion completes
    // on the final change and the button joins it on one line.
    let lines = drive(
        &mut runtime,
        &mut buffer,
        &policy,
        t0,
        &[
            (0, stick(0.0, 1.0, &[])),
            (40, stick(1.0, 1.0, &[])),
            (80, stick(1.0, 0.0, &[0])),
        ],
    );

    assert_eq!(
        lines.last().unwrap().groups,
        vec![OutputGroup::Simultaneous(vec![
            "⬊".to_string(),
            "A".to_string()
        ])]
    );
}

#[test]
fn buttons_mashed_within_the_window_conjoin() {
    let mut runtime = runtime(false);
    let mut buffer = buffer();
    let policy = FramePolicy {
        show_neutrals: false,
        ..Default::default()
    };
    let t0 = Local::now();

    let lines = drive(
        &mut runtime,
        &mut buffer,
        &policy,
        t0,
        &[(0, dpad(&[0])), (20, dpad(&[0, 1])), (40, dpad(&[0, 1, 3]))],
    );

    assert_eq!(lines.len(), 1, "one conjoined line: {:?}", lines);
    assert_eq!(
        lines[0].groups,
        vec![single("A"), single("B"), single("Y")]
    );
}
