mod support;

use controller_core::controller::EdgeOutcome;
use controller_core::debounce::{Bounce, InputLine};
use controller_core::state::Effect;

use support::Rig;

fn accepted(rig: &mut Rig, line: InputLine, gaps: &[u32]) -> usize {
    let mut count = usize::from(rig.press(line).is_accepted());
    for gap in gaps {
        rig.wait(*gap);
        count += usize::from(rig.press(line).is_accepted());
    }
    count
}

#[test]
fn edges_49ms_apart_count_once() {
    let mut rig = Rig::new();
    assert_eq!(accepted(&mut rig, InputLine::Countdown10, &[49]), 1);
}

#[test]
fn edges_50ms_apart_count_twice() {
    let mut rig = Rig::new();
    assert_eq!(accepted(&mut rig, InputLine::Countdown10, &[50]), 2);
}

#[test]
fn contact_bounce_toggles_power_once() {
    let mut rig = Rig::new();
    assert_eq!(
        accepted(&mut rig, InputLine::PowerToggle, &[3, 7, 12, 20]),
        1
    );
    assert!(!rig.controller.snapshot().power_active);
}

#[test]
fn rejection_reports_elapsed_time() {
    let mut rig = Rig::new();
    rig.press(InputLine::Countdown20);
    rig.wait(31);

    assert_eq!(
        rig.press(InputLine::Countdown20),
        EdgeOutcome::Rejected(Bounce {
            line: InputLine::Countdown20,
            elapsed_ms: 31,
        })
    );
}

#[test]
fn lines_do_not_share_windows() {
    let mut rig = Rig::new();

    let power = rig.press(InputLine::PowerToggle);
    let trigger = rig.press(InputLine::Countdown30);

    assert!(power.is_accepted());
    // Accepted by the debouncer, then refused by the powered-off controller.
    assert!(matches!(
        trigger,
        EdgeOutcome::Applied {
            effect: Effect::Ignored(_),
            ..
        }
    ));
}
