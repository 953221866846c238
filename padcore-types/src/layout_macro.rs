//! Shorthands for writing keymaps in Rust.

/// Create a layer in keymap
#[macro_export]
macro_rules! layer {
    ([$([$($x: expr), +]), +]) => {
        [$([$($x), +]),+]
    };
}

/// Create a normal key. For example, `k!(A)` represents `KeymapEntry::EmitKey(Stroke::new(KeyCode::A))`
#[macro_export]
macro_rules! k {
    ($k: ident) => {
        $crate::action::KeymapEntry::EmitKey($crate::action::Stroke::new($crate::keycode::KeyCode::$k))
    };
}

/// Create a key with modifiers, e.g. `wm!(C, CTRL)` for ctrl+c
#[macro_export]
macro_rules! wm {
    ($k: ident, $m: ident) => {
        $crate::action::KeymapEntry::EmitKey($crate::action::Stroke::with_modifiers(
            $crate::keycode::KeyCode::$k,
            $crate::modifier::$m,
        ))
    };
}

/// Create an entry by variant name, e.g. `a!(NoOp)`
#[macro_export]
macro_rules! a {
    ($a: ident) => {
        $crate::action::KeymapEntry::$a
    };
}

/// Create a momentary layer action. For example, `mo!(1)` activates layer 1 while held.
#[macro_export]
macro_rules! mo {
    ($x: literal) => {
        $crate::action::KeymapEntry::ActivateLayer($x, $crate::action::LayerMode::Momentary)
    };
}

/// Create a layer toggle action
#[macro_export]
macro_rules! tg {
    ($x: literal) => {
        $crate::action::KeymapEntry::ActivateLayer($x, $crate::action::LayerMode::Toggle)
    };
}

/// Create an oneshot layer key in keymap
#[macro_export]
macro_rules! osl {
    ($x: literal) => {
        $crate::action::KeymapEntry::ActivateLayer($x, $crate::action::LayerMode::OneShot)
    };
}

/// Create a layer switch action: deactivate every layer but the base one and activate `n`
#[macro_export]
macro_rules! to {
    ($x: literal) => {
        $crate::action::KeymapEntry::ActivateLayer($x, $crate::action::LayerMode::To)
    };
}

/// Create a macro tapping the given keys in order.
///
/// Panics if more than [`MACRO_MAX_LEN`](crate::action::MACRO_MAX_LEN) keys are given.
#[macro_export]
macro_rules! mac {
    ($($k: ident),+ $(,)?) => {
        match $crate::action::KeymapEntry::run_macro(&[$($crate::action::Stroke::new($crate::keycode::KeyCode::$k)),+]) {
            Some(entry) => entry,
            None => panic!("macro is longer than MACRO_MAX_LEN"),
        }
    };
}

/// Create an encoder action: counter-clockwise, clockwise and button entries
#[macro_export]
macro_rules! encoder {
    ($counter_clockwise: expr, $clockwise: expr) => {
        $crate::action::EncoderAction::new($counter_clockwise, $clockwise, $crate::action::KeymapEntry::NoOp)
    };
    ($counter_clockwise: expr, $clockwise: expr, $button: expr) => {
        $crate::action::EncoderAction::new($counter_clockwise, $clockwise, $button)
    };
}
