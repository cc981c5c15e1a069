//! Property-based tests for the stack engine
//!
//! Random walks through the real flows against an in-memory backend check:
//! - Structural invariants hold after every accepted event
//! - Every settled state leaves the top frame free to take input
//! - Programming errors never surface from user input
//! - Cancel unwinds one frame at a time back to the root
//! - Input for a stale frame changes nothing but the screen

use super::{Button, Event, FlowId, FrameId, Input};
use crate::runtime::testing::Harness;
use proptest::prelude::*;

/// One thing a user can do in front of the current screen
#[derive(Debug, Clone)]
enum Action {
    /// Choose the n-th offered option, modulo the number of options
    Choose(usize),
    Type(String),
    Restart,
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Trash duty".to_string()),
        Just("01.01.2030 08:00".to_string()),
        Just("2030-01-01".to_string()),
        Just("7".to_string()),
        Just("0".to_string()),
        Just("@boris_m".to_string()),
        Just(String::new()),
        "[a-z ]{1,12}",
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        6 => (0usize..12).prop_map(Action::Choose),
        3 => arb_text().prop_map(Action::Type),
        1 => Just(Action::Restart),
    ]
}

fn apply(h: &mut Harness, action: Action) -> Result<(), super::TransitionError> {
    match action {
        Action::Choose(n) => {
            let options = h.options();
            if options.is_empty() {
                return Ok(());
            }
            let input = options[n % options.len()].input.clone();
            let frame = h.stack().top_id();
            h.send(Event::Input { frame, input })
        }
        Action::Type(text) => h.text(&text),
        Action::Restart => h.send(Event::Start),
    }
}

fn walked(actions: Vec<Action>) -> Harness {
    let mut h = Harness::new();
    h.start();
    for action in actions {
        let _ = apply(&mut h, action);
    }
    h
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_invariants_hold_on_random_walks(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut h = Harness::new();
        h.start();

        for action in actions {
            let depth_before = h.stack().depth();
            match apply(&mut h, action) {
                Ok(()) => {
                    prop_assert!(h.stack().check_invariants().is_ok(), "{:?}", h.flows());
                    let top = h.stack().top();
                    prop_assert!(top.is_some_and(|f| f.ops().awaiting().is_none()));
                    let flows = h.flows();
                    prop_assert_eq!(flows.first(), Some(&FlowId::Home));
                }
                Err(e) => {
                    prop_assert!(!e.is_fatal(), "fatal error from user input: {}", e);
                    prop_assert_eq!(h.stack().depth(), depth_before);
                }
            }
        }
    }

    #[test]
    fn prop_cancel_unwinds_to_root(actions in proptest::collection::vec(arb_action(), 0..30)) {
        let mut h = walked(actions);
        let presses = h.stack().depth() - 1;

        for _ in 0..presses {
            if h.stack().depth() == 1 {
                break;
            }
            let before = h.stack().depth();
            prop_assert!(h.press(Button::Cancel).is_ok());
            prop_assert!(h.stack().depth() < before);
        }
        prop_assert_eq!(h.flows(), vec![FlowId::Home]);
    }

    #[test]
    fn prop_stale_input_changes_nothing(
        actions in proptest::collection::vec(arb_action(), 0..30),
        text in arb_text(),
    ) {
        let mut h = walked(actions);
        let before = serde_json::to_string(h.stack()).unwrap();
        let screens = h.screen_count();
        let saves = h.store.saves();

        // Ids start at 1, so frame 0 never existed
        let stale = Event::Input {
            frame: Some(FrameId(0)),
            input: Input::Text(text),
        };
        let result = h.send(stale);

        let is_stale = matches!(result, Err(super::TransitionError::StaleFrame { .. }));
        prop_assert!(is_stale);
        prop_assert_eq!(serde_json::to_string(h.stack()).unwrap(), before);
        prop_assert_eq!(h.store.saves(), saves);
        // One screen repeating the current view with the reason
        prop_assert_eq!(h.screen_count(), screens + 1);
        prop_assert_eq!(h.last_screen().frame, h.stack().top_id());
        prop_assert_eq!(h.notices().len(), 1);
    }
}
