extern crate padcore;

#[macro_export]
macro_rules! key_sequence_test {
    (keyboard: $keyboard:expr, sequence: [$([$row:expr, $col:expr, $pressed:expr, $delay:expr]),* $(,)?], expected_events: [$($event:expr),* $(,)?]) => {{
        let mut keyboard = $keyboard;
        let sequence = vec![
            $(
                $crate::common::TestKeyPress {
                    row: $row,
                    col: $col,
                    pressed: $pressed,
                    delay: $delay,
                },
            )*
        ];
        let expected_events: Vec<padcore::event::OutputEvent> = vec![$($event),*];

        let events = $crate::common::run_key_sequence_test(&mut keyboard, &sequence);
        assert_eq!(events, expected_events, "Expected {:?} but actually {:?}", expected_events, events);
    }};
}

/// `KeyDown` of a keycode
#[macro_export]
macro_rules! down {
    ($key: ident) => {
        padcore::event::OutputEvent::KeyDown(padcore::types::keycode::KeyCode::$key)
    };
}

/// `KeyUp` of a keycode
#[macro_export]
macro_rules! up {
    ($key: ident) => {
        padcore::event::OutputEvent::KeyUp(padcore::types::keycode::KeyCode::$key)
    };
}

/// `LayerChanged` with the new top layer
#[macro_export]
macro_rules! layer_changed {
    ($layer: expr) => {
        padcore::event::OutputEvent::LayerChanged($layer)
    };
}
